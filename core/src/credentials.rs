use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::auth::{ServiceAccountCredentials, ServiceAccountKey};
use crate::errors::{ChatError, ChatResult};

/// Environment variable ambient Google tooling reads the key file path from
pub const CREDENTIALS_ENV_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const DEFAULT_CREDENTIALS_FILE: &str = "gcp_service_key.json";

/// Turns the service-key secret into usable credentials.
///
/// The blob is written verbatim to `path`, optionally advertised through
/// [`CREDENTIALS_ENV_VAR`], then read back and validated. The resolved
/// [`ServiceAccountCredentials`] are what the generation client receives.
#[derive(Debug, Clone)]
pub struct CredentialLoader {
    path: PathBuf,
    export_env: bool,
}

impl Default for CredentialLoader {
    fn default() -> Self {
        Self::new(PathBuf::from(DEFAULT_CREDENTIALS_FILE), true)
    }
}

impl CredentialLoader {
    pub fn new(path: PathBuf, export_env: bool) -> Self {
        Self { path, export_env }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the credential blob to disk after checking that it is JSON
    pub fn persist(&self, service_key_json: &str) -> ChatResult<PathBuf> {
        serde_json::from_str::<serde_json::Value>(service_key_json).map_err(|e| {
            ChatError::CredentialError(format!("service key is not valid JSON: {}", e))
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, service_key_json)?;

        debug!("Wrote service key to {}", self.path.display());
        Ok(self.path.clone())
    }

    /// Points [`CREDENTIALS_ENV_VAR`] at `path`.
    ///
    /// Mutates the process environment: call before any other thread exists.
    pub fn export_env(path: &Path) {
        env::set_var(CREDENTIALS_ENV_VAR, path);
        debug!("{} set to {}", CREDENTIALS_ENV_VAR, path.display());
    }

    /// Reads a key file back and builds credentials from it
    pub fn resolve(path: &Path) -> ChatResult<ServiceAccountCredentials> {
        let content = fs::read_to_string(path).map_err(|e| {
            ChatError::CredentialError(format!(
                "could not read credential file {}: {}",
                path.display(),
                e
            ))
        })?;

        let key: ServiceAccountKey = serde_json::from_str(&content).map_err(|e| {
            ChatError::CredentialError(format!("credential file is not a service-account key: {}", e))
        })?;

        ServiceAccountCredentials::from_key(key)
    }

    /// persist, optionally export, resolve
    pub fn load(&self, service_key_json: &str) -> ChatResult<ServiceAccountCredentials> {
        let path = self.persist(service_key_json)?;
        if self.export_env {
            Self::export_env(&path);
        }

        let credentials = Self::resolve(&path)?;
        info!(client_email = %credentials.client_email(), "Service-account credentials loaded");
        Ok(credentials)
    }
}
