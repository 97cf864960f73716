use crate::errors::{ChatError, ChatResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_LOCATION: &str = "global";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-001";
pub const DEFAULT_PROFILE_NAME: &str = "Marcos Bernardino";
pub const DEFAULT_SECRETS_FILE: &str = "secrets.toml";

/// `[key]` section: the service-account credential blob
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct KeySection {
    pub service_key: Option<String>,
}

/// `[google_cloud]` section: where generation requests go
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct GoogleCloudSection {
    pub datastore: Option<String>,
    pub project: Option<String>,
    pub location: Option<String>,
    pub model: Option<String>,
    pub api_endpoint: Option<String>,
}

/// `[google_drive]` section: sidebar assets
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct GoogleDriveSection {
    pub image_url: Option<String>,
    pub cv_url: Option<String>,
}

/// `[profile]` section: who the résumé belongs to
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ProfileSection {
    pub name: Option<String>,
    pub tagline: Option<String>,
}

/// Raw secret inputs, as read from `secrets.toml` or the environment.
///
/// Every field is optional here; [`AppConfig::resolve`] applies defaults and
/// decides which gaps are fatal.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Secrets {
    pub key: KeySection,
    pub google_cloud: GoogleCloudSection,
    pub google_drive: GoogleDriveSection,
    pub profile: ProfileSection,
}

impl Secrets {
    /// Loads secrets from a file if it exists, otherwise returns empty secrets
    pub fn load_from_file(path: &Path) -> ChatResult<Self> {
        if !path.exists() {
            debug!("No secrets file at {}", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ChatError::ConfigError(format!("Failed to read secrets file: {}", e))
        })?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ChatResult<Self> {
        toml::from_str(content)
            .map_err(|e| ChatError::ConfigError(format!("Failed to parse secrets file: {}", e)))
    }

    /// Reads `RESUME_CHAT_*` environment variables, loading `.env` first
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            key: KeySection {
                service_key: lookup("RESUME_CHAT_SERVICE_KEY"),
            },
            google_cloud: GoogleCloudSection {
                datastore: lookup("RESUME_CHAT_DATASTORE"),
                project: lookup("RESUME_CHAT_PROJECT"),
                location: lookup("RESUME_CHAT_LOCATION"),
                model: lookup("RESUME_CHAT_MODEL"),
                api_endpoint: lookup("RESUME_CHAT_API_ENDPOINT"),
            },
            google_drive: GoogleDriveSection {
                image_url: lookup("RESUME_CHAT_IMAGE_URL"),
                cv_url: lookup("RESUME_CHAT_CV_URL"),
            },
            profile: ProfileSection {
                name: lookup("RESUME_CHAT_PROFILE_NAME"),
                tagline: lookup("RESUME_CHAT_TAGLINE"),
            },
        }
    }

    /// Merges these secrets with another set, preferring values from the other set if present
    pub fn merge(&self, other: &Self) -> Self {
        fn pick(ours: &Option<String>, theirs: &Option<String>) -> Option<String> {
            theirs.clone().or_else(|| ours.clone())
        }

        Self {
            key: KeySection {
                service_key: pick(&self.key.service_key, &other.key.service_key),
            },
            google_cloud: GoogleCloudSection {
                datastore: pick(&self.google_cloud.datastore, &other.google_cloud.datastore),
                project: pick(&self.google_cloud.project, &other.google_cloud.project),
                location: pick(&self.google_cloud.location, &other.google_cloud.location),
                model: pick(&self.google_cloud.model, &other.google_cloud.model),
                api_endpoint: pick(
                    &self.google_cloud.api_endpoint,
                    &other.google_cloud.api_endpoint,
                ),
            },
            google_drive: GoogleDriveSection {
                image_url: pick(&self.google_drive.image_url, &other.google_drive.image_url),
                cv_url: pick(&self.google_drive.cv_url, &other.google_drive.cv_url),
            },
            profile: ProfileSection {
                name: pick(&self.profile.name, &other.profile.name),
                tagline: pick(&self.profile.tagline, &other.profile.tagline),
            },
        }
    }
}

/// Resolved application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub service_key: Option<String>,
    pub datastore: Option<String>,
    pub project: Option<String>,
    pub location: String,
    pub model: String,
    pub api_endpoint: Option<String>,
    pub image_url: Option<String>,
    pub cv_url: Option<String>,
    pub profile_name: String,
    pub tagline: String,
}

impl AppConfig {
    /// Applies defaults to merged secrets. Blank values count as absent.
    pub fn resolve(secrets: Secrets) -> Self {
        fn non_blank(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }

        let profile_name = non_blank(secrets.profile.name)
            .unwrap_or_else(|| DEFAULT_PROFILE_NAME.to_string());
        let tagline = non_blank(secrets.profile.tagline).unwrap_or_else(|| {
            format!(
                "Ask questions about the professional or academic life of {}",
                profile_name
            )
        });

        Self {
            service_key: non_blank(secrets.key.service_key),
            datastore: non_blank(secrets.google_cloud.datastore),
            project: non_blank(secrets.google_cloud.project),
            location: non_blank(secrets.google_cloud.location)
                .unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
            model: non_blank(secrets.google_cloud.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_endpoint: non_blank(secrets.google_cloud.api_endpoint),
            image_url: non_blank(secrets.google_drive.image_url),
            cv_url: non_blank(secrets.google_drive.cv_url),
            profile_name,
            tagline,
        }
    }

    /// Loads the secrets file, overlays the environment and resolves defaults
    pub fn load(secrets_path: &Path) -> ChatResult<Self> {
        let from_file = Secrets::load_from_file(secrets_path)?;
        let merged = from_file.merge(&Secrets::from_env());
        Ok(Self::resolve(merged))
    }

    pub fn require_service_key(&self) -> ChatResult<&str> {
        self.service_key.as_deref().ok_or_else(|| {
            ChatError::CredentialError("no service key configured under [key].service_key".into())
        })
    }

    pub fn require_datastore(&self) -> ChatResult<&str> {
        self.datastore.as_deref().ok_or_else(|| {
            ChatError::ConfigError("no datastore configured under [google_cloud].datastore".into())
        })
    }
}

/// Default location of the secrets file: `./secrets.toml` when present,
/// otherwise `~/.config/resume-chat/secrets.toml`.
pub fn default_secrets_path() -> PathBuf {
    let local = PathBuf::from(DEFAULT_SECRETS_FILE);
    if local.exists() {
        return local;
    }

    dirs::home_dir()
        .map(|home| home.join(".config").join("resume-chat").join(DEFAULT_SECRETS_FILE))
        .unwrap_or(local)
}
