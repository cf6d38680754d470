//! Credential lifecycle for the TTLock cloud.
//!
//! This module provides:
//! - `Credential`: An access/refresh token pair and its validity
//! - `CredentialStore`: The shared, always-current credential
//! - `TokenClient`: Password and refresh grants against `oauth2/token`
//! - `RenewalScheduler`: Background task that refreshes before expiry
//!
//! Tokens live for the duration the platform reports (typically days) and
//! are renewed halfway through that window, never sleeping more than a day.

pub mod credential;
pub mod renewal;
pub mod store;
pub mod token;

pub use credential::Credential;
pub use renewal::{
    Escalation, RenewalExit, RenewalHandle, RenewalPolicy, RenewalScheduler, TokenRenewer,
};
pub use store::CredentialStore;
pub use token::{hash_password, TokenClient};
