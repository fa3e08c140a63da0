//! Credential storage backends for the persisted session token.
//!
//! The dashboard client persists exactly one secret across restarts: the
//! session credential. This crate abstracts where that secret lives so the
//! session layer can be handed an OS keyring in production and an in-memory
//! map in tests.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Mutex;
use std::sync::PoisonError;

use keyring::Entry;
use thiserror::Error;

/// Errors raised by a credential backend.
#[derive(Debug, Error)]
pub enum CredentialStoreError {
    /// The platform keyring rejected the operation.
    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// Any other backend failure (file I/O, encoding, ...).
    #[error("{0}")]
    Other(String),
}

impl CredentialStoreError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// A place to keep one secret per `(service, account)` pair.
pub trait KeyringStore: Debug + Send + Sync {
    /// Returns the stored secret, or `None` when nothing is stored.
    fn load(&self, service: &str, account: &str) -> Result<Option<String>, CredentialStoreError>;

    /// Stores `value`, replacing any previous secret.
    fn save(&self, service: &str, account: &str, value: &str) -> Result<(), CredentialStoreError>;

    /// Removes the secret. Returns `true` if something was deleted.
    fn delete(&self, service: &str, account: &str) -> Result<bool, CredentialStoreError>;
}

/// Backend on top of the operating system keyring.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultKeyringStore;

impl KeyringStore for DefaultKeyringStore {
    fn load(&self, service: &str, account: &str) -> Result<Option<String>, CredentialStoreError> {
        let entry = Entry::new(service, account)?;
        match entry.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => {
                tracing::debug!("keyring load failed for {service}/{account}: {err}");
                Err(err.into())
            }
        }
    }

    fn save(&self, service: &str, account: &str, value: &str) -> Result<(), CredentialStoreError> {
        let entry = Entry::new(service, account)?;
        entry.set_password(value)?;
        Ok(())
    }

    fn delete(&self, service: &str, account: &str) -> Result<bool, CredentialStoreError> {
        let entry = Entry::new(service, account)?;
        match entry.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

/// Process-local backend. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryKeyringStore {
    entries: Mutex<HashMap<(String, String), String>>,
}

impl MemoryKeyringStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored secrets.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyringStore for MemoryKeyringStore {
    fn load(&self, service: &str, account: &str) -> Result<Option<String>, CredentialStoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .get(&(service.to_string(), account.to_string()))
            .cloned())
    }

    fn save(&self, service: &str, account: &str, value: &str) -> Result<(), CredentialStoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            (service.to_string(), account.to_string()),
            value.to_string(),
        );
        Ok(())
    }

    fn delete(&self, service: &str, account: &str) -> Result<bool, CredentialStoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .remove(&(service.to_string(), account.to_string()))
            .is_some())
    }
}
