//! Client for the TTLock smart-lock cloud (Open Platform v3).
//!
//! The core of the crate is the credential lifecycle: `TtlockClient::connect`
//! acquires an access token with the account password, keeps it in a shared
//! [`CredentialStore`](auth::CredentialStore) and renews it in the background
//! before it expires. API operations read the current token at call time.
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! use futures::TryStreamExt;
//! use ttlock_core::{ClientConfig, TtlockClient};
//!
//! let client = TtlockClient::connect(ClientConfig::from_env()?).await?;
//! let locks: Vec<_> = client.locks(None, None).try_collect().await?;
//! for lock in &locks {
//!     println!("{} ({}%)", lock.display_name(), lock.electric_quantity);
//! }
//! client.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{is_error_code, ApiError, ErrorCode, Page, TtlockClient};
pub use auth::{Credential, CredentialStore, Escalation, RenewalPolicy};
pub use config::{ClientConfig, Region};
