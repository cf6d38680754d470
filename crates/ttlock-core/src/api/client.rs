//! API client for the TTLock Open Platform.
//!
//! `TtlockClient::connect` performs the password grant, installs the
//! resulting credential and starts background renewal. Every operation
//! afterwards stamps its request with whatever access token is current.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use futures::Stream;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::auth::{
    Credential, CredentialStore, RenewalExit, RenewalHandle, RenewalScheduler, TokenClient,
};
use crate::config::ClientConfig;
use crate::models::{
    Lock, LockDetail, LockListQuery, Passcode, PasscodeListQuery, PasscodeOrder, RandomPasscode,
    RandomPasscodeRequest, SendKeyRequest, SentKey,
};

use super::pagination::{paginate, Page, DEFAULT_PAGE_SIZE};
use super::response::{read_json, send};
use super::ApiError;

// ============================================================================
// Endpoints
// ============================================================================

const LOCK_LIST_PATH: &str = "/v3/lock/list";
const LOCK_DETAIL_PATH: &str = "/v3/lock/detail";
const PASSCODE_GET_PATH: &str = "/v3/keyboardPwd/get";
const PASSCODE_LIST_PATH: &str = "/v3/lock/listKeyboardPwd";
const KEY_SEND_PATH: &str = "/v3/key/send";

type Params = Vec<(&'static str, String)>;

/// Client for the TTLock cloud API.
///
/// Owns its renewal task: dropping the client stops renewal. Share it across
/// tasks behind an `Arc`.
pub struct TtlockClient {
    client: Client,
    base_url: String,
    client_id: String,
    store: Arc<CredentialStore>,
    renewal: RenewalHandle,
}

impl TtlockClient {
    /// Acquire the first credential and start renewal.
    ///
    /// Fails when the configuration is incomplete or the password grant is
    /// rejected; no client exists in that case.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        let tokens = TokenClient::new(client.clone(), &config);
        let credential = tokens.acquire(&config.username, &config.password).await?;
        info!(
            uid = credential.uid,
            expires_in = credential.expires_in,
            "Acquired TTLock access token"
        );

        let store = Arc::new(CredentialStore::new(credential));
        let renewal =
            RenewalScheduler::new(Arc::clone(&store), Arc::new(tokens), config.renewal.clone())
                .spawn();

        Ok(Self {
            client,
            base_url: config.api_root().to_string(),
            client_id: config.client_id,
            store,
            renewal,
        })
    }

    /// The access token to use right now.
    ///
    /// Fails with [`ApiError::CredentialDead`] once renewal has given up.
    pub fn access_token(&self) -> Result<String> {
        if self.store.is_dead() {
            return Err(ApiError::CredentialDead.into());
        }
        Ok(self.store.access_token())
    }

    /// Snapshot of the current credential.
    ///
    /// Fails with [`ApiError::CredentialDead`] once renewal has given up, the
    /// same as [`access_token`](Self::access_token).
    pub fn credential(&self) -> Result<Arc<Credential>> {
        if self.store.is_dead() {
            return Err(ApiError::CredentialDead.into());
        }
        Ok(self.store.read())
    }

    /// Number of renewed credentials installed since bootstrap.
    pub fn renewals(&self) -> u64 {
        self.store.generation()
    }

    /// Stop background renewal and wait for the task to end.
    pub async fn shutdown(self) -> Option<RenewalExit> {
        self.renewal.shutdown().await
    }

    // ------------------------------------------------------------------------
    // Locks
    // ------------------------------------------------------------------------

    /// One page of the locks on the account.
    pub async fn lock_list(&self, query: &LockListQuery) -> Result<Page<Lock>> {
        self.get(LOCK_LIST_PATH, query.to_params()).await
    }

    pub async fn lock_detail(&self, lock_id: i64) -> Result<LockDetail> {
        self.get(LOCK_DETAIL_PATH, vec![("lockId", lock_id.to_string())])
            .await
    }

    /// Every lock on the account, fetched page by page as the stream is
    /// consumed.
    pub fn locks(
        &self,
        alias: Option<String>,
        group_id: Option<i64>,
    ) -> impl Stream<Item = Result<Lock>> + '_ {
        paginate(move |page_no| {
            let query = LockListQuery {
                page_no,
                page_size: DEFAULT_PAGE_SIZE,
                lock_alias: alias.clone(),
                group_id,
            };
            async move { self.lock_list(&query).await }
        })
    }

    // ------------------------------------------------------------------------
    // Passcodes
    // ------------------------------------------------------------------------

    /// Have the cloud generate a passcode for a lock.
    pub async fn random_passcode(&self, request: &RandomPasscodeRequest) -> Result<RandomPasscode> {
        self.post_form(PASSCODE_GET_PATH, request.to_params()).await
    }

    pub async fn passcode_list(&self, query: &PasscodeListQuery) -> Result<Page<Passcode>> {
        self.get(PASSCODE_LIST_PATH, query.to_params()).await
    }

    /// Every passcode of a lock, fetched page by page as the stream is
    /// consumed.
    pub fn passcodes(
        &self,
        lock_id: i64,
        order: PasscodeOrder,
        search: Option<String>,
    ) -> impl Stream<Item = Result<Passcode>> + '_ {
        paginate(move |page_no| {
            let query = PasscodeListQuery {
                lock_id,
                page_no,
                page_size: DEFAULT_PAGE_SIZE,
                order_by: order,
                search: search.clone(),
            };
            async move { self.passcode_list(&query).await }
        })
    }

    // ------------------------------------------------------------------------
    // Keys
    // ------------------------------------------------------------------------

    /// Send an eKey to another user.
    pub async fn send_key(&self, request: &SendKeyRequest) -> Result<SentKey> {
        self.post_form(KEY_SEND_PATH, request.to_params()).await
    }

    // ------------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------------

    /// Prefix endpoint parameters with the client id and current token, and
    /// append the request date.
    fn signed(&self, params: Params) -> Result<Params> {
        let mut signed = Vec::with_capacity(params.len() + 3);
        signed.push(("clientId", self.client_id.clone()));
        signed.push(("accessToken", self.access_token()?));
        signed.extend(params);
        signed.push(("date", Utc::now().timestamp_millis().to_string()));
        Ok(signed)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, params: Params) -> Result<T> {
        let query = self.signed(params)?;
        let url = format!("{}{}", self.base_url, path);
        let response = send(path, self.client.get(&url).query(&query)).await?;
        read_json(path, response).await
    }

    async fn post_form<T: DeserializeOwned>(&self, path: &str, params: Params) -> Result<T> {
        let form = self.signed(params)?;
        let url = format!("{}{}", self.base_url, path);
        let response = send(path, self.client.post(&url).form(&form)).await?;
        read_json(path, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{is_error_code, ErrorCode};
    use crate::models::{PasscodeType, SendKeyOptions};
    use chrono::TimeZone;
    use futures::{StreamExt, TryStreamExt};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn config(server: &MockServer) -> ClientConfig {
        ClientConfig::new("cid", "csecret", "alice", "123456").with_base_url(server.uri())
    }

    async fn mount_password_grant(server: &MockServer, expires_in: i64) {
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains("username=alice"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "uid": 1234,
                "expires_in": expires_in,
            })))
            .mount(server)
            .await;
    }

    async fn connected(server: &MockServer) -> TtlockClient {
        init_tracing();
        mount_password_grant(server, 7_776_000).await;
        TtlockClient::connect(config(server)).await.expect("Failed to connect")
    }

    fn lock_json(id: i64) -> serde_json::Value {
        json!({"lockId": id, "lockName": format!("M201_{}", id), "lockAlias": "", "hasGateway": 0})
    }

    #[tokio::test]
    async fn test_connect_installs_bootstrap_credential() {
        let server = MockServer::start().await;
        let client = connected(&server).await;

        assert_eq!(client.access_token().unwrap(), "access-1");
        assert_eq!(client.credential().unwrap().uid, 1234);
        assert_eq!(client.renewals(), 0);
        // Repeated reads with no renewal in between are identical.
        assert_eq!(client.access_token().unwrap(), client.access_token().unwrap());
    }

    #[tokio::test]
    async fn test_connect_fails_on_bad_password() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"errcode": 10007, "errmsg": "invalid account or invalid password"})),
            )
            .mount(&server)
            .await;

        let err = TtlockClient::connect(config(&server)).await.err().expect("connect should fail");
        assert!(is_error_code(&err, ErrorCode::InvalidUsernameOrPassword));
    }

    #[tokio::test]
    async fn test_connect_times_out_on_hung_token_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({
                        "access_token": "access-1",
                        "refresh_token": "refresh-1",
                        "uid": 1234,
                        "expires_in": 7200,
                    }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let config = ClientConfig {
            request_timeout_secs: 1,
            ..config(&server)
        };
        let err = TtlockClient::connect(config).await.err().expect("connect should time out");
        assert!(matches!(
            err.downcast_ref::<ApiError>(),
            Some(ApiError::NetworkError(e)) if e.is_timeout()
        ));
    }

    #[tokio::test]
    async fn test_connect_rejects_incomplete_config() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = ClientConfig::new("", "csecret", "alice", "123456").with_base_url(server.uri());
        assert!(TtlockClient::connect(config).await.is_err());
    }

    #[tokio::test]
    async fn test_lock_list_sends_signed_query() {
        let server = MockServer::start().await;
        let client = connected(&server).await;
        Mock::given(method("GET"))
            .and(path("/v3/lock/list"))
            .and(query_param("clientId", "cid"))
            .and(query_param("accessToken", "access-1"))
            .and(query_param("pageNo", "1"))
            .and(query_param("pageSize", "20"))
            .and(query_param("lockAlias", "front"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "list": [lock_json(1), lock_json(2)],
                "pageNo": 1,
                "pageSize": 20,
                "pages": 1,
                "total": 2,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let query = LockListQuery {
            lock_alias: Some("front".into()),
            ..LockListQuery::default()
        };
        let page = client.lock_list(&query).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.list[1].display_name(), "M201_2");

        let requests = server.received_requests().await.unwrap_or_default();
        let list_request = requests
            .iter()
            .find(|r| r.url.path() == "/v3/lock/list")
            .expect("lock list request");
        assert!(list_request.url.query_pairs().any(|(k, _)| k == "date"));
    }

    #[tokio::test]
    async fn test_lock_detail() {
        let server = MockServer::start().await;
        let client = connected(&server).await;
        Mock::given(method("GET"))
            .and(path("/v3/lock/detail"))
            .and(query_param("lockId", "3396"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "lockId": 3396,
                "noKeyPwd": "1234567",
                "autoLockTime": 5,
            })))
            .mount(&server)
            .await;

        let detail = client.lock_detail(3396).await.unwrap();
        assert_eq!(detail.no_key_pwd, "1234567");
        assert!(detail.auto_lock_enabled());
    }

    #[tokio::test]
    async fn test_token_unauthorized_on_operation_path() {
        let server = MockServer::start().await;
        let client = connected(&server).await;
        Mock::given(method("GET"))
            .and(path("/v3/lock/detail"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errcode": 10004, "errmsg": ""})))
            .mount(&server)
            .await;

        let err = client.lock_detail(1).await.unwrap_err();
        assert!(is_error_code(&err, ErrorCode::TokenUnauthorized));
    }

    #[tokio::test]
    async fn test_random_passcode_posts_form() {
        let server = MockServer::start().await;
        let client = connected(&server).await;
        Mock::given(method("POST"))
            .and(path("/v3/keyboardPwd/get"))
            .and(body_string_contains("accessToken=access-1"))
            .and(body_string_contains("lockId=7"))
            .and(body_string_contains("keyboardPwdType=2"))
            .and(body_string_contains("keyboardPwdName=Cleaner"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"keyboardPwd": "48291733", "keyboardPwdId": 55})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let request = RandomPasscodeRequest {
            lock_id: 7,
            kind: PasscodeType::Permanent,
            name: Some("Cleaner".into()),
            start: Utc.with_ymd_and_hms(2024, 2, 14, 14, 0, 0).unwrap(),
            end: None,
        };
        let passcode = client.random_passcode(&request).await.unwrap();
        assert_eq!(passcode.keyboard_pwd, "48291733");
        assert_eq!(passcode.keyboard_pwd_id, 55);
    }

    #[tokio::test]
    async fn test_send_key_posts_options() {
        let server = MockServer::start().await;
        let client = connected(&server).await;
        Mock::given(method("POST"))
            .and(path("/v3/key/send"))
            .and(body_string_contains("receiverUsername=bob"))
            .and(body_string_contains("keyName=Guest"))
            .and(body_string_contains("remoteEnable=1"))
            .and(body_string_contains("keyRight=0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"keyId": 991})))
            .expect(1)
            .mount(&server)
            .await;

        let start = Utc.with_ymd_and_hms(2024, 2, 14, 14, 0, 0).unwrap();
        let request = SendKeyRequest {
            lock_id: 7,
            receiver_username: "bob".into(),
            key_name: "Guest".into(),
            start,
            end: start + chrono::Duration::days(1),
            options: SendKeyOptions {
                remote_enable: Some(true),
                key_right: Some(false),
                ..Default::default()
            },
        };
        let sent = client.send_key(&request).await.unwrap();
        assert_eq!(sent.key_id, 991);
    }

    #[tokio::test]
    async fn test_locks_stream_walks_pages() {
        let server = MockServer::start().await;
        let client = connected(&server).await;
        for (page_no, ids) in [(1, vec![1, 2]), (2, vec![3])] {
            Mock::given(method("GET"))
                .and(path("/v3/lock/list"))
                .and(query_param("pageNo", page_no.to_string()))
                .and(query_param("pageSize", "200"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "list": ids.into_iter().map(lock_json).collect::<Vec<_>>(),
                    "pageNo": page_no,
                    "pageSize": 200,
                    "pages": 2,
                    "total": 3,
                })))
                .expect(1)
                .mount(&server)
                .await;
        }

        let locks: Vec<Lock> = client.locks(None, None).try_collect().await.unwrap();
        let ids: Vec<i64> = locks.iter().map(|l| l.lock_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_passcodes_stream_stops_on_empty_page() {
        let server = MockServer::start().await;
        let client = connected(&server).await;
        Mock::given(method("GET"))
            .and(path("/v3/lock/listKeyboardPwd"))
            .and(query_param("lockId", "7"))
            .and(query_param("orderBy", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "list": [],
                "pageNo": 1,
                "pageSize": 200,
                "pages": 4,
                "total": 0,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let passcodes: Vec<Passcode> = client
            .passcodes(7, PasscodeOrder::CreatedDescending, None)
            .try_collect()
            .await
            .unwrap();
        assert!(passcodes.is_empty());
    }

    #[tokio::test]
    async fn test_stream_error_ends_stream() {
        let server = MockServer::start().await;
        let client = connected(&server).await;
        Mock::given(method("GET"))
            .and(path("/v3/lock/list"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"errcode": -2018, "errmsg": "no permission"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let items: Vec<Result<Lock>> = client.locks(None, None).collect().await;
        assert_eq!(items.len(), 1);
        let err = items.into_iter().next().unwrap().unwrap_err();
        assert!(is_error_code(&err, ErrorCode::PermissionDenied));
    }

    #[tokio::test]
    async fn test_dead_credential_blocks_operations() {
        let server = MockServer::start().await;
        let client = connected(&server).await;
        Mock::given(method("GET"))
            .and(path("/v3/lock/detail"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"lockId": 1})))
            .expect(0)
            .mount(&server)
            .await;

        client.store.mark_dead();

        let err = client.access_token().unwrap_err();
        assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::CredentialDead)));
        let err = client.credential().unwrap_err();
        assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::CredentialDead)));
        let err = client.lock_detail(1).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::CredentialDead)));
    }

    #[tokio::test]
    async fn test_background_renewal_replaces_token() {
        let server = MockServer::start().await;
        init_tracing();
        // A 2 second token is renewed after 1 second.
        mount_password_grant(&server, 2).await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "access-2",
                "refresh_token": "refresh-2",
                "uid": 1234,
                "expires_in": 7200,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = TtlockClient::connect(config(&server)).await.unwrap();
        assert_eq!(client.access_token().unwrap(), "access-1");

        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        while client.renewals() == 0 {
            assert!(tokio::time::Instant::now() < deadline, "token was never renewed");
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        assert_eq!(client.access_token().unwrap(), "access-2");
        assert_eq!(client.credential().unwrap().refresh_token, "refresh-2");
        assert_eq!(client.renewals(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_renewal() {
        let server = MockServer::start().await;
        let client = connected(&server).await;
        assert_eq!(client.shutdown().await, Some(RenewalExit::Cancelled));
    }
}
