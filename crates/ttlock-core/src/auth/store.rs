use std::sync::Arc;

use parking_lot::RwLock;

use super::Credential;

/// Holds the single live [`Credential`] of a client.
///
/// Readers take a shared lock just long enough to clone an `Arc`, so they
/// always see a whole credential, never half of an update. The write lock is
/// held only for the pointer swap; network calls happen outside it.
pub struct CredentialStore {
    inner: RwLock<StoreState>,
}

struct StoreState {
    current: Arc<Credential>,
    /// Bumped on every replace; starts at 0 for the bootstrap credential.
    generation: u64,
    /// Set once renewal is exhausted. Never cleared.
    dead: bool,
}

impl CredentialStore {
    pub fn new(initial: Credential) -> Self {
        Self {
            inner: RwLock::new(StoreState {
                current: Arc::new(initial),
                generation: 0,
                dead: false,
            }),
        }
    }

    /// Snapshot of the current credential.
    pub fn read(&self) -> Arc<Credential> {
        Arc::clone(&self.inner.read().current)
    }

    /// The access token to stamp on an outgoing request.
    pub fn access_token(&self) -> String {
        self.inner.read().current.access_token.clone()
    }

    /// Atomically install a new credential and return the new generation.
    pub fn replace(&self, next: Credential) -> u64 {
        let next = Arc::new(next);
        let mut state = self.inner.write();
        state.current = next;
        state.generation += 1;
        state.generation
    }

    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    /// Enter the terminal state after renewal has been exhausted.
    pub fn mark_dead(&self) {
        self.inner.write().dead = true;
    }

    pub fn is_dead(&self) -> bool {
        self.inner.read().dead
    }
}
