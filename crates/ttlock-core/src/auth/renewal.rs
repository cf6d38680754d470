//! Background renewal of the access token.
//!
//! One task per client keeps the [`CredentialStore`] populated:
//!
//! 1. read the current credential and compute `min(expires_in / 2, 24h)`
//! 2. sleep for that long without holding any lock
//! 3. exchange the refresh token for a new credential, up to 3 attempts
//!    spaced 2 seconds apart, then install it and go back to 1
//!
//! When every attempt fails the task escalates according to
//! [`Escalation`] and stops. The owning client cancels the task through
//! [`RenewalHandle`] when it is dropped.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{Credential, CredentialStore};

/// Longest the scheduler sleeps between renewals, whatever the token lifetime.
const MAX_RENEWAL_SLEEP_SECS: u64 = 24 * 60 * 60;

/// Shortest sleep, so a zero `expires_in` cannot turn the loop into a spin.
const MIN_RENEWAL_SLEEP_SECS: u64 = 1;

/// Attempts per renewal before escalating.
const RENEWAL_ATTEMPTS: u32 = 3;

/// Fixed pause between failed attempts.
const RENEWAL_RETRY_DELAY_SECS: u64 = 2;

/// Exchanges a refresh token for a fresh credential.
#[async_trait]
pub trait TokenRenewer: Send + Sync {
    async fn renew(&self, refresh_token: &str) -> Result<Credential>;
}

/// What happens once every renewal attempt has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Escalation {
    /// Put the store in its dead state; every later operation fails with
    /// `ApiError::CredentialDead`.
    #[default]
    MarkDead,
    /// Abort the whole process.
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenewalPolicy {
    pub max_sleep: Duration,
    pub min_sleep: Duration,
    pub attempts: u32,
    pub retry_delay: Duration,
    pub on_exhausted: Escalation,
}

impl Default for RenewalPolicy {
    fn default() -> Self {
        Self {
            max_sleep: Duration::from_secs(MAX_RENEWAL_SLEEP_SECS),
            min_sleep: Duration::from_secs(MIN_RENEWAL_SLEEP_SECS),
            attempts: RENEWAL_ATTEMPTS,
            retry_delay: Duration::from_secs(RENEWAL_RETRY_DELAY_SECS),
            on_exhausted: Escalation::MarkDead,
        }
    }
}

impl RenewalPolicy {
    /// How long to wait before renewing a credential: half its validity,
    /// capped at `max_sleep` and floored at `min_sleep`.
    pub fn sleep_for(&self, credential: &Credential) -> Duration {
        (credential.validity() / 2)
            .min(self.max_sleep)
            .max(self.min_sleep)
    }

    /// Attempts actually made per renewal. A zero budget still tries once.
    pub fn effective_attempts(&self) -> u32 {
        self.attempts.max(1)
    }
}

/// How the renewal task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalExit {
    Cancelled,
    Exhausted,
}

enum Renewal {
    Renewed(Credential),
    Exhausted { attempts: u32, error: anyhow::Error },
    Cancelled,
}

pub struct RenewalScheduler {
    store: Arc<CredentialStore>,
    renewer: Arc<dyn TokenRenewer>,
    policy: RenewalPolicy,
    cancel: CancellationToken,
}

impl RenewalScheduler {
    pub fn new(
        store: Arc<CredentialStore>,
        renewer: Arc<dyn TokenRenewer>,
        policy: RenewalPolicy,
    ) -> Self {
        Self {
            store,
            renewer,
            policy,
            cancel: CancellationToken::new(),
        }
    }

    /// Spawn the renewal loop onto the current Tokio runtime.
    pub fn spawn(self) -> RenewalHandle {
        let cancel = self.cancel.clone();
        let task = tokio::spawn(self.run());
        RenewalHandle {
            cancel,
            task: Some(task),
        }
    }

    /// Run the renewal loop until it is cancelled or escalates.
    pub async fn run(self) -> RenewalExit {
        loop {
            let current = self.store.read();
            let wait = self.policy.sleep_for(&current);
            debug!(
                wait_secs = wait.as_secs(),
                expires_in = current.expires_in,
                "Next access token renewal scheduled"
            );

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("Token renewal cancelled");
                    return RenewalExit::Cancelled;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            match self.renew_with_retry(&current.refresh_token).await {
                Renewal::Renewed(next) => {
                    let uid = next.uid;
                    let expires_in = next.expires_in;
                    let generation = self.store.replace(next);
                    info!(uid, expires_in, generation, "Access token renewed");
                }
                Renewal::Cancelled => {
                    debug!("Token renewal cancelled");
                    return RenewalExit::Cancelled;
                }
                Renewal::Exhausted { attempts, error } => {
                    self.escalate(attempts, error);
                    return RenewalExit::Exhausted;
                }
            }
        }
    }

    async fn renew_with_retry(&self, refresh_token: &str) -> Renewal {
        let attempts = self.policy.effective_attempts();
        let mut last_error = None;

        for attempt in 1..=attempts {
            let result = tokio::select! {
                _ = self.cancel.cancelled() => return Renewal::Cancelled,
                result = self.renewer.renew(refresh_token) => result,
            };

            match result {
                Ok(next) => return Renewal::Renewed(next),
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts = attempts,
                        error = %format!("{:#}", e),
                        "Access token renewal attempt failed"
                    );
                    last_error = Some(e);
                }
            }

            if attempt < attempts {
                tokio::select! {
                    _ = self.cancel.cancelled() => return Renewal::Cancelled,
                    _ = tokio::time::sleep(self.policy.retry_delay) => {}
                }
            }
        }

        Renewal::Exhausted {
            attempts,
            error: last_error.unwrap_or_else(|| anyhow::anyhow!("No renewal attempt was made")),
        }
    }

    fn escalate(&self, attempts: u32, err: anyhow::Error) {
        error!(
            attempts,
            policy = ?self.policy.on_exhausted,
            error = %format!("{:#}", err),
            "Access token renewal exhausted"
        );
        match self.policy.on_exhausted {
            Escalation::MarkDead => self.store.mark_dead(),
            Escalation::Abort => std::process::abort(),
        }
    }
}

/// Owned handle to a running renewal task. Dropping it cancels the task.
pub struct RenewalHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<RenewalExit>>,
}

impl RenewalHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map(|t| t.is_finished()).unwrap_or(true)
    }

    /// Cancel the task and wait for it to wind down.
    pub async fn shutdown(mut self) -> Option<RenewalExit> {
        self.cancel.cancel();
        self.wait().await
    }

    /// Wait for the task to end on its own, without cancelling it.
    pub async fn join(mut self) -> Option<RenewalExit> {
        self.wait().await
    }

    async fn wait(&mut self) -> Option<RenewalExit> {
        let task = self.task.take()?;
        match task.await {
            Ok(exit) => Some(exit),
            Err(e) => {
                warn!(error = %e, "Token renewal task panicked");
                None
            }
        }
    }
}

impl Drop for RenewalHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
