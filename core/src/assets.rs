use reqwest::Client;
use tracing::{debug, warn};

use crate::config::AppConfig;

/// Outcome of fetching the sidebar picture
#[derive(Debug, Clone, PartialEq)]
pub enum ImageStatus {
    Loaded {
        bytes: usize,
        content_type: Option<String>,
    },
    /// No image URL configured
    Missing,
    Failed(String),
}

/// Static sidebar content
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileAssets {
    pub name: String,
    pub image_url: Option<String>,
    pub cv_url: Option<String>,
}

impl ProfileAssets {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            name: config.profile_name.clone(),
            image_url: config.image_url.clone(),
            cv_url: config.cv_url.clone(),
        }
    }

    pub fn download_link(&self) -> Option<&str> {
        self.cv_url.as_deref()
    }

    /// Downloads the profile image; failures are reported, never raised
    pub async fn fetch_image(&self, client: &Client) -> ImageStatus {
        let Some(url) = self.image_url.as_deref() else {
            return ImageStatus::Missing;
        };

        let response = match client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Profile image request failed");
                return ImageStatus::Failed(e.to_string());
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Profile image request rejected");
            return ImageStatus::Failed(format!("HTTP {}", status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        match response.bytes().await {
            Ok(body) => {
                debug!(bytes = body.len(), "Profile image loaded");
                ImageStatus::Loaded {
                    bytes: body.len(),
                    content_type,
                }
            }
            Err(e) => ImageStatus::Failed(e.to_string()),
        }
    }
}
