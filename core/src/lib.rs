// Core of the résumé chat:
// - Secrets and configuration loading
// - Service-account credentials and OAuth tokens
// - Vertex AI request/response types and client
// - Answer generation, transcript and session handling

pub mod assets;
pub mod auth;
pub mod client;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod generator;
pub mod session;
pub mod transcript;
pub mod types;

pub use assets::{ImageStatus, ProfileAssets};
pub use auth::{ServiceAccountCredentials, ServiceAccountKey, StaticToken, TokenSource};
pub use client::{ContentGenerator, VertexClient, VertexConfig};
pub use config::{AppConfig, Secrets};
pub use credentials::CredentialLoader;
pub use errors::{ChatError, ChatResult};
pub use generator::{AnswerGenerator, GenerationSettings, FALLBACK_ANSWER};
pub use session::{ChatSession, Reply};
pub use transcript::{Role, Transcript, Turn};
