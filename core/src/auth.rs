use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::errors::{ChatError, ChatResult};

pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens are refreshed this long before they actually expire
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Something that can hand out OAuth bearer tokens for Google APIs
#[async_trait]
pub trait TokenSource: Send + Sync + fmt::Debug {
    async fn access_token(&self) -> ChatResult<String>;
}

/// A pre-issued token, used as-is
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> ChatResult<String> {
        Ok(self.0.clone())
    }
}

/// Typed view of a Google service-account key file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Service-account credentials exchanging signed JWT assertions for access tokens
pub struct ServiceAccountCredentials {
    client: Client,
    client_email: String,
    private_key_id: Option<String>,
    project_id: Option<String>,
    token_uri: String,
    signing_key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

impl fmt::Debug for ServiceAccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountCredentials")
            .field("client_email", &self.client_email)
            .field("project_id", &self.project_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountCredentials {
    /// Validates the key and prepares the RS256 signer
    pub fn from_key(key: ServiceAccountKey) -> ChatResult<Self> {
        if key.key_type != "service_account" {
            return Err(ChatError::CredentialError(format!(
                "expected a service_account key, found '{}'",
                key.key_type
            )));
        }

        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            ChatError::CredentialError(format!("invalid private key: {}", e))
        })?;

        Ok(Self {
            client: Client::new(),
            client_email: key.client_email,
            private_key_id: key.private_key_id,
            project_id: key.project_id,
            token_uri: key.token_uri.unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            signing_key,
            cached: Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    /// Builds the signed assertion sent to the token endpoint
    pub(crate) fn signed_assertion(&self, now: DateTime<Utc>) -> ChatResult<String> {
        let iat = now.timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: CLOUD_PLATFORM_SCOPE,
            aud: &self.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        Ok(encode(&header, &claims, &self.signing_key)?)
    }

    async fn fetch_token(&self) -> ChatResult<CachedToken> {
        let now = Utc::now();
        let assertion = self.signed_assertion(now)?;

        debug!(client_email = %self.client_email, "Requesting access token");
        let response = self
            .client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| ChatError::AuthError(format!("Failed to reach token endpoint: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "Token exchange rejected");
            return Err(ChatError::AuthError(format!(
                "token endpoint returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let token = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| ChatError::AuthError(format!("Failed to parse token response: {}", e)))?;

        // Tokens never outlive the assertion that minted them
        let lifetime = token
            .expires_in
            .unwrap_or(ASSERTION_LIFETIME_SECS)
            .clamp(0, ASSERTION_LIFETIME_SECS);
        Ok(CachedToken {
            token: token.access_token,
            expires_at: now + Duration::seconds(lifetime),
        })
    }
}

#[async_trait]
impl TokenSource for ServiceAccountCredentials {
    async fn access_token(&self) -> ChatResult<String> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS) < token.expires_at {
                return Ok(token.token.clone());
            }
        }

        let fresh = self.fetch_token().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }
}
