//! Credential storage for the claude.ai session key and organization ID.
//!
//! The refresher only reads and writes secrets by key name through
//! [`SecretStore`]. Two implementations ship with the crate:
//! - [`FileSecretStore`]: JSON map at `$XDG_CONFIG_HOME/claude-usage-bar/credentials.json`
//!   (mode 0600), with `CLAUDE_SESSION_KEY` / `CLAUDE_ORG_ID` taking precedence
//! - [`MemorySecretStore`]: process-local, for embedding and tests
//!
//! # Security
//!
//! Secrets are never logged. Only key names appear in tracing output.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

use crate::config::xdg;

/// Secret key holding the session cookie value.
pub const SECRET_KEY_SESSION: &str = "claude-usage.sessionKey";

/// Secret key holding the organization UUID.
pub const SECRET_KEY_ORG_ID: &str = "claude-usage.organizationId";

/// Environment variable that overrides the stored session key.
pub const ENV_VAR_SESSION_KEY: &str = "CLAUDE_SESSION_KEY";

/// Environment variable that overrides the stored organization ID.
pub const ENV_VAR_ORG_ID: &str = "CLAUDE_ORG_ID";

/// Errors that can occur when persisting credentials.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// I/O error when reading or writing the credential file.
    #[error("I/O error accessing credentials at {path}: {source}")]
    Io {
        /// Credential file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The credential file exists but is not a JSON string map.
    #[error("Failed to parse credentials: {0}")]
    Parse(String),
}

/// Key/value secret storage provided by the host.
pub trait SecretStore {
    /// Returns the secret for `key`, or `None` when unset.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value.
    fn store(&self, key: &str, value: &str) -> Result<(), CredentialError>;

    /// Removes `key`. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<(), CredentialError>;
}

/// A complete credential pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Value of the `sessionKey` cookie.
    pub session_key: String,
    /// Organization UUID.
    pub org_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("session_key", &"<redacted>")
            .field("org_id", &self.org_id)
            .finish()
    }
}

/// Which part of the credential pair is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingCredentials {
    /// Neither secret is set.
    Both,
    /// Only the organization ID is set.
    SessionKey,
    /// Only the session key is set.
    OrgId,
}

impl MissingCredentials {
    /// Short noun used in the `Missing {label}` status text.
    pub fn label(self) -> &'static str {
        match self {
            MissingCredentials::Both => "credentials",
            MissingCredentials::SessionKey => "session key",
            MissingCredentials::OrgId => "org ID",
        }
    }
}

impl std::fmt::Display for MissingCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Missing {}", self.label())
    }
}

/// Read both secrets; empty values count as missing.
pub fn load_credentials<K: SecretStore + ?Sized>(
    store: &K,
) -> Result<Credentials, MissingCredentials> {
    let non_empty = |key: &str| store.get(key).filter(|v| !v.is_empty());

    match (non_empty(SECRET_KEY_SESSION), non_empty(SECRET_KEY_ORG_ID)) {
        (Some(session_key), Some(org_id)) => Ok(Credentials {
            session_key,
            org_id,
        }),
        (None, None) => Err(MissingCredentials::Both),
        (None, Some(_)) => Err(MissingCredentials::SessionKey),
        (Some(_), None) => Err(MissingCredentials::OrgId),
    }
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// Secrets persisted as a JSON object in a single owner-only file.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    path: PathBuf,
    use_env: bool,
}

impl FileSecretStore {
    /// Store at the default XDG location, honoring environment overrides.
    pub fn new() -> Self {
        Self {
            path: xdg::credentials_path(),
            use_env: true,
        }
    }

    /// Store at an explicit path without environment overrides.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            use_env: false,
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn env_override(&self, key: &str) -> Option<String> {
        if !self.use_env {
            return None;
        }
        let var = match key {
            SECRET_KEY_SESSION => ENV_VAR_SESSION_KEY,
            SECRET_KEY_ORG_ID => ENV_VAR_ORG_ID,
            _ => return None,
        };
        std::env::var(var).ok().filter(|v| !v.is_empty())
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, CredentialError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(CredentialError::Io {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };
        serde_json::from_str(&content).map_err(|e| CredentialError::Parse(e.to_string()))
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), CredentialError> {
        let io_error = |source| CredentialError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            xdg::ensure_dir(parent).map_err(io_error)?;
        }

        let json =
            serde_json::to_string_pretty(map).map_err(|e| CredentialError::Parse(e.to_string()))?;
        fs::write(&self.path, json).map_err(io_error)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
                .map_err(io_error)?;
        }

        Ok(())
    }
}

impl Default for FileSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.env_override(key) {
            return Some(value);
        }

        match self.read_map() {
            Ok(mut map) => map.remove(key),
            Err(e) => {
                tracing::warn!(error = %e, "credential file unreadable, treating as empty");
                None
            }
        }
    }

    fn store(&self, key: &str, value: &str) -> Result<(), CredentialError> {
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)?;
        tracing::debug!(key, "secret stored");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CredentialError> {
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
            tracing::debug!(key, "secret deleted");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local secret store.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: Mutex<BTreeMap<String, String>>,
}

impl MemorySecretStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with a full credential pair.
    pub fn with_credentials(session_key: &str, org_id: &str) -> Self {
        let store = Self::new();
        store.insert(SECRET_KEY_SESSION, session_key);
        store.insert(SECRET_KEY_ORG_ID, org_id);
        store
    }

    fn insert(&self, key: &str, value: &str) {
        self.secrets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, key: &str) -> Option<String> {
        self.secrets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn store(&self, key: &str, value: &str) -> Result<(), CredentialError> {
        self.insert(key, value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CredentialError> {
        self.secrets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }
}
