//! Calls against the `oauth2/token` endpoint.
//!
//! The same endpoint serves both grants: the password grant at bootstrap
//! and the refresh grant used by the renewal task.

use anyhow::{Context, Result};
use async_trait::async_trait;
use md5::{Digest, Md5};
use reqwest::Client;
use serde::Deserialize;

use super::{Credential, TokenRenewer};
use crate::api::response::{read_json, send};
use crate::config::ClientConfig;

const TOKEN_PATH: &str = "/oauth2/token";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    uid: i64,
    expires_in: i64,
}

impl From<TokenResponse> for Credential {
    fn from(resp: TokenResponse) -> Self {
        Credential::new(resp.access_token, resp.refresh_token, resp.uid, resp.expires_in)
    }
}

/// Hash a plain-text password the way the token endpoint expects:
/// MD5, as 32 lowercase hex characters.
pub fn hash_password(password: &str) -> String {
    hex::encode(Md5::digest(password.as_bytes()))
}

/// Client for the token endpoint.
/// Clone is cheap - it shares the connection pool of the API client.
#[derive(Clone)]
pub struct TokenClient {
    client: Client,
    endpoint: String,
    client_id: String,
    client_secret: String,
}

impl TokenClient {
    pub fn new(client: Client, config: &ClientConfig) -> Self {
        Self {
            client,
            endpoint: format!("{}{}", config.api_root(), TOKEN_PATH),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }

    /// Obtain the first credential with the account's username and password.
    pub async fn acquire(&self, username: &str, password: &str) -> Result<Credential> {
        let hashed = hash_password(password);
        self.request(&[
            ("clientId", self.client_id.as_str()),
            ("clientSecret", self.client_secret.as_str()),
            ("username", username),
            ("password", hashed.as_str()),
        ])
        .await
        .context("Failed to acquire access token")
    }

    /// Exchange a refresh token for a new credential.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Credential> {
        self.request(&[
            ("clientId", self.client_id.as_str()),
            ("clientSecret", self.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
        .context("Failed to refresh access token")
    }

    async fn request(&self, form: &[(&str, &str)]) -> Result<Credential> {
        let response = send(TOKEN_PATH, self.client.post(&self.endpoint).form(form)).await?;
        let token: TokenResponse = read_json(TOKEN_PATH, response).await?;
        Ok(token.into())
    }
}

#[async_trait]
impl TokenRenewer for TokenClient {
    async fn renew(&self, refresh_token: &str) -> Result<Credential> {
        self.refresh(refresh_token).await
    }
}
