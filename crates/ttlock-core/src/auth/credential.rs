use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One access/refresh token pair as issued by the `oauth2/token` endpoint.
///
/// A credential is never edited in place. Renewal produces a new value that
/// replaces the old one wholesale in the [`CredentialStore`](super::CredentialStore).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    pub uid: i64,
    /// Lifetime of the access token in seconds, counted from `issued_at`.
    pub expires_in: i64,
    pub issued_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(access_token: String, refresh_token: String, uid: i64, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            uid,
            expires_in,
            issued_at: Utc::now(),
        }
    }

    /// The declared validity window, negative values clamped to zero.
    pub fn validity(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.expires_in.max(0) as u64)
    }

    /// When the access token runs out. Lifetimes too large to represent
    /// saturate at the latest representable instant.
    pub fn expires_at(&self) -> DateTime<Utc> {
        Duration::try_seconds(self.expires_in.max(0))
            .and_then(|validity| self.issued_at.checked_add_signed(validity))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at()
    }

    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at() - Utc::now()
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        self.time_until_expiry().num_minutes().max(0)
    }
}

// Tokens stay out of logs and panic messages.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("uid", &self.uid)
            .field("expires_in", &self.expires_in)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}
