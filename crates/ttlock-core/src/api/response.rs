//! Response decoding shared by the token endpoint and every API operation.
//!
//! TTLock reports failures in the body: each response carries an `errcode`
//! (0 on success, sometimes omitted entirely) and an `errmsg`. HTTP status
//! codes are still checked first for proxies and gateways that fail before
//! the platform answers.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::ApiError;

/// Send a prepared request. Transport failures surface as
/// [`ApiError::NetworkError`].
pub(crate) async fn send(endpoint: &str, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
    debug!(endpoint, "Sending TTLock request");
    request
        .send()
        .await
        .map_err(ApiError::from)
        .with_context(|| format!("Failed to send request to {}", endpoint))
}

/// Check if response is successful, returning an error with body if not.
pub(crate) async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_status(status, &body).into())
    }
}

/// Map the embedded `errcode` to an error, or `Ok` when it is 0 or absent.
///
/// The code is read on its own, so a null or oddly typed `errmsg` next to it
/// cannot hide a failure.
pub(crate) fn check_errcode(body: &[u8]) -> Result<(), ApiError> {
    // Bodies that are not JSON objects are left for the typed decode to reject.
    let Ok(Value::Object(fields)) = serde_json::from_slice::<Value>(body) else {
        return Ok(());
    };

    let errcode = fields.get("errcode").and_then(errcode_value).unwrap_or(0);
    if errcode == 0 {
        return Ok(());
    }
    let errmsg = fields
        .get("errmsg")
        .and_then(Value::as_str)
        .unwrap_or_default();
    Err(ApiError::from_errcode(errcode, errmsg))
}

/// `errcode` is normally a JSON number; some gateways send it as a string.
fn errcode_value(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Decode a response body into `T` after checking its `errcode`.
pub(crate) fn decode<T: DeserializeOwned>(endpoint: &str, body: &[u8]) -> Result<T> {
    check_errcode(body)?;
    serde_json::from_slice(body)
        .with_context(|| format!("Failed to parse JSON response from {}", endpoint))
}

/// Read the full body of a checked response and decode it.
pub(crate) async fn read_json<T: DeserializeOwned>(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<T> {
    let response = check_response(response).await?;
    let body = response
        .bytes()
        .await
        .with_context(|| format!("Failed to read response body from {}", endpoint))?;
    decode(endpoint, &body)
}
