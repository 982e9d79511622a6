use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::store::{Credential, CredentialStore, MemoryStore};
use crate::error::Result;

/// What a request saw of the session when it was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub generation: u64,
    pub token: Option<String>,
}

/// Result of [`SessionContext::expire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryOutcome {
    /// This call cleared the session; the caller owns the side effects.
    Recovered,
    /// The session was already expired.
    AlreadyExpired,
    /// The session changed after the request was issued (re-login, logout
    /// or an earlier expiry).
    Stale,
}

#[derive(Debug, Default)]
struct SessionState {
    credential: Option<Credential>,
    // bumped by set, clear and a recovering expire
    generation: u64,
    expired: bool,
}

/// Shared session handed to the gateway.
///
/// All mutation goes through `set`, `clear` and `expire`, each of which
/// updates the in-memory state and the backing store under one lock. The
/// store is called synchronously, see [`super::FileStore`].
#[derive(Clone)]
pub struct SessionContext {
    state: Arc<Mutex<SessionState>>,
    store: Arc<dyn CredentialStore>,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SessionContext")
            .field("authenticated", &state.credential.is_some())
            .field("generation", &state.generation)
            .field("expired", &state.expired)
            .finish()
    }
}

impl SessionContext {
    /// Opens a session over `store`, restoring any persisted credential.
    pub fn new(store: Arc<dyn CredentialStore>) -> Result<Self> {
        let credential = store.load()?;
        if credential.is_some() {
            log::info!("Restored persisted credential");
        }

        Ok(Self {
            state: Arc::new(Mutex::new(SessionState {
                credential,
                ..SessionState::default()
            })),
            store,
        })
    }

    /// Session over a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::default())),
            store: Arc::new(MemoryStore::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores a freshly issued credential (login).
    pub fn set(&self, credential: Credential) -> Result<()> {
        let mut state = self.lock();
        self.store.save(&credential)?;

        state.credential = Some(credential);
        state.generation += 1;
        state.expired = false;

        log::info!("Session credential set (generation {})", state.generation);
        Ok(())
    }

    /// Drops the credential without any user-facing side effect (logout).
    pub fn clear(&self) -> Result<()> {
        let mut state = self.lock();
        self.store.clear()?;

        state.credential = None;
        state.generation += 1;
        state.expired = false;

        log::info!("Session cleared (generation {})", state.generation);
        Ok(())
    }

    /// Expires the session on behalf of a request issued under `observed`.
    ///
    /// The credential is always dropped. Only the first caller for a given
    /// generation gets [`ExpiryOutcome::Recovered`]; every concurrent,
    /// repeated or stale call gets an outcome without user-facing side
    /// effects. Never fails: a store error is logged and the in-memory
    /// credential is dropped regardless.
    pub fn expire(&self, observed: &SessionSnapshot) -> ExpiryOutcome {
        let mut state = self.lock();

        let outcome = if state.generation != observed.generation {
            ExpiryOutcome::Stale
        } else if state.expired {
            ExpiryOutcome::AlreadyExpired
        } else {
            ExpiryOutcome::Recovered
        };

        if state.credential.is_some() || outcome == ExpiryOutcome::Recovered {
            if let Err(err) = self.store.clear() {
                log::error!("Failed to clear persisted credential: {}", err);
            }
            state.credential = None;
        }

        if outcome == ExpiryOutcome::Recovered {
            state.generation += 1;
            state.expired = true;
        }

        outcome
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        SessionSnapshot {
            generation: state.generation,
            token: state.credential.as_ref().map(|c| c.token.clone()),
        }
    }

    pub fn credential(&self) -> Option<Credential> {
        self.lock().credential.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.lock().credential.as_ref().map(|c| c.token.clone())
    }

    pub fn role(&self) -> Option<String> {
        self.lock().credential.as_ref().and_then(|c| c.role.clone())
    }

    pub fn user_id(&self) -> Option<String> {
        self.lock().credential.as_ref().and_then(|c| c.user_id.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().credential.is_some()
    }

    /// True between an expiry and the next `set`/`clear`.
    pub fn is_expired(&self) -> bool {
        self.lock().expired
    }
}
