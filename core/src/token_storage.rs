//! File-backed credential storage.
//!
//! For hosts without a usable OS keyring. Secrets live in
//! `<home>/session.json`, keyed by `service/account`, readable by the owner
//! only on Unix.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use solguard_keyring_store::CredentialStoreError;
use solguard_keyring_store::KeyringStore;

/// Default filename for persisted credentials.
pub const SESSION_FILE: &str = "session.json";

/// On-disk format.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    /// Map of `service/account` to secret.
    #[serde(default)]
    entries: HashMap<String, String>,
    /// Schema version for migration.
    #[serde(default = "default_version")]
    version: u32,
}

fn default_version() -> u32 {
    1
}

/// [`KeyringStore`] implementation on a JSON file.
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    file_path: PathBuf,
}

impl FileTokenStorage {
    /// Storage at `<home>/session.json`.
    pub fn in_home(home: &Path) -> Self {
        Self::with_path(home.join(SESSION_FILE))
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { file_path: path }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn read_file(&self) -> Result<SessionFile, CredentialStoreError> {
        if !self.file_path.exists() {
            return Ok(SessionFile::default());
        }
        let content = fs::read_to_string(&self.file_path).map_err(io_error)?;
        serde_json::from_str(&content)
            .map_err(|e| CredentialStoreError::other(format!("corrupt session file: {e}")))
    }

    fn write_file(&self, file: &SessionFile) -> Result<(), CredentialStoreError> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        let content = serde_json::to_string_pretty(file)
            .map_err(|e| CredentialStoreError::other(e.to_string()))?;
        fs::write(&self.file_path, content).map_err(io_error)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&self.file_path, permissions).map_err(io_error)?;
        }

        Ok(())
    }
}

fn entry_key(service: &str, account: &str) -> String {
    format!("{service}/{account}")
}

fn io_error(err: std::io::Error) -> CredentialStoreError {
    CredentialStoreError::other(format!("session file I/O error: {err}"))
}

impl KeyringStore for FileTokenStorage {
    fn load(&self, service: &str, account: &str) -> Result<Option<String>, CredentialStoreError> {
        let file = self.read_file()?;
        Ok(file.entries.get(&entry_key(service, account)).cloned())
    }

    fn save(&self, service: &str, account: &str, value: &str) -> Result<(), CredentialStoreError> {
        let mut file = self.read_file()?;
        file.entries
            .insert(entry_key(service, account), value.to_string());
        self.write_file(&file)
    }

    fn delete(&self, service: &str, account: &str) -> Result<bool, CredentialStoreError> {
        let mut file = self.read_file()?;
        let removed = file.entries.remove(&entry_key(service, account)).is_some();
        if removed {
            self.write_file(&file)?;
        }
        Ok(removed)
    }
}
