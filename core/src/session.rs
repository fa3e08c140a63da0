//! Session store: the single owner of the authentication credential.
//!
//! `login` and `logout` are the only mutators. Both take the same write lock,
//! so a user-initiated login racing a gateway-initiated logout resolves to
//! whichever call lands last.
//!
//! Every effective transition advances the session epoch. Consumers that need
//! to know whether the identity changed underneath them (the gateway for
//! in-flight requests, the permission resolver for committed capabilities)
//! compare epochs instead of tokens.

use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use solguard_keyring_store::KeyringStore;

use crate::config::CREDENTIAL_SERVICE;
use crate::config::TOKEN_KEY;

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub token: Option<String>,
    pub epoch: u64,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

#[derive(Debug, Default)]
struct SessionState {
    token: Option<String>,
    epoch: u64,
}

/// Where (and under which key) the credential is persisted.
#[derive(Debug, Clone)]
pub struct CredentialPersistence {
    backend: Arc<dyn KeyringStore>,
    service: String,
    key: String,
}

impl CredentialPersistence {
    pub fn new(backend: Arc<dyn KeyringStore>) -> Self {
        Self {
            backend,
            service: CREDENTIAL_SERVICE.to_string(),
            key: TOKEN_KEY.to_string(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    fn load(&self) -> Option<String> {
        match self.backend.load(&self.service, &self.key) {
            Ok(token) => token.filter(|t| !t.trim().is_empty()),
            Err(err) => {
                tracing::warn!("failed to load persisted session credential: {err}");
                None
            }
        }
    }

    fn save(&self, token: &str) {
        if let Err(err) = self.backend.save(&self.service, &self.key, token) {
            tracing::warn!("failed to persist session credential: {err}");
        }
    }

    fn delete(&self) {
        if let Err(err) = self.backend.delete(&self.service, &self.key) {
            tracing::warn!("failed to remove persisted session credential: {err}");
        }
    }
}

/// Process-wide session state, shared by reference (`Arc<SessionStore>`).
#[derive(Debug, Default)]
pub struct SessionStore {
    state: RwLock<SessionState>,
    persistence: Option<CredentialPersistence>,
}

impl SessionStore {
    /// Memory-only store, starting logged out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store backed by `persistence`, starting logged out.
    ///
    /// Call [`SessionStore::restore`] to pick up a credential saved by an
    /// earlier process.
    pub fn with_persistence(persistence: CredentialPersistence) -> Self {
        Self {
            state: RwLock::new(SessionState::default()),
            persistence: Some(persistence),
        }
    }

    /// Loads a persisted credential, if any. Returns whether one was found.
    pub fn restore(&self) -> bool {
        let Some(persistence) = &self.persistence else {
            return false;
        };
        let Some(token) = persistence.load() else {
            return false;
        };
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.token = Some(token);
        state.epoch += 1;
        tracing::info!("restored persisted session");
        true
    }

    /// Stores `token` and marks the identity authenticated.
    ///
    /// A blank token cannot authenticate anyone and is treated as a logout.
    pub fn login(&self, token: impl Into<String>) {
        let token = token.into();
        if token.trim().is_empty() {
            tracing::warn!("ignoring login with an empty credential");
            self.logout();
            return;
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(persistence) = &self.persistence {
            persistence.save(&token);
        }
        state.token = Some(token);
        state.epoch += 1;
        tracing::info!(epoch = state.epoch, "session established");
    }

    /// Clears the credential. Calling it while logged out is a no-op.
    pub fn logout(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.token.is_none() {
            return;
        }
        Self::clear(&mut state, self.persistence.as_ref());
    }

    /// Logs out only if no login/logout happened since `epoch`.
    ///
    /// Returns whether the session was torn down by this call.
    pub fn logout_if_epoch(&self, epoch: u64) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.epoch != epoch || state.token.is_none() {
            return false;
        }
        Self::clear(&mut state, self.persistence.as_ref());
        true
    }

    pub fn current_token(&self) -> Option<String> {
        self.read(|state| state.token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read(|state| state.token.is_some())
    }

    /// Monotonic counter advanced by every effective login/logout.
    pub fn epoch(&self) -> u64 {
        self.read(|state| state.epoch)
    }

    /// Token and epoch read under one lock.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.read(|state| SessionSnapshot {
            token: state.token.clone(),
            epoch: state.epoch,
        })
    }

    fn clear(state: &mut SessionState, persistence: Option<&CredentialPersistence>) {
        if let Some(persistence) = persistence {
            persistence.delete();
        }
        state.token = None;
        state.epoch += 1;
        tracing::info!(epoch = state.epoch, "session torn down");
    }

    fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }
}
