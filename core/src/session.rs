use std::sync::Arc;

use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::client::{VertexClient, VertexConfig};
use crate::config::AppConfig;
use crate::credentials::CredentialLoader;
use crate::errors::{ChatError, ChatResult};
use crate::generator::{AnswerGenerator, GenerationSettings};
use crate::transcript::{Role, Transcript, Turn};

pub const CREDENTIALS_HALT_MESSAGE: &str =
    "Credentials not found. Check that they are configured correctly.";
pub const CONFIG_HALT_MESSAGE: &str =
    "Configuration incomplete. Check the project and datastore settings.";

/// Prefix of the assistant text substituted for a failed generation call
pub const GENERATION_ERROR_PREFIX: &str = "An error occurred while generating the answer";

/// Where a session stands once startup has run
enum SessionState {
    Ready(AnswerGenerator),
    Halted(String),
}

/// Loads credentials and wires the Vertex client for one session
pub fn connect(config: &AppConfig, loader: &CredentialLoader) -> ChatResult<AnswerGenerator> {
    let service_key = config.require_service_key()?;
    let credentials = loader.load(service_key)?;

    let project = config
        .project
        .clone()
        .or_else(|| credentials.project_id().map(str::to_string))
        .ok_or_else(|| {
            ChatError::ConfigError(
                "no project configured and the service key has no project_id".to_string(),
            )
        })?;
    let datastore = config.require_datastore()?;

    let client = VertexClient::new(
        VertexConfig {
            project,
            location: config.location.clone(),
            model: config.model.clone(),
            api_endpoint: config.api_endpoint.clone(),
        },
        Arc::new(credentials),
    );

    Ok(AnswerGenerator::new(
        Arc::new(client),
        GenerationSettings::for_profile(&config.profile_name, datastore),
    ))
}

/// The assistant turn recorded by [`ChatSession::ask`]
#[derive(Debug, Clone, Copy)]
pub struct Reply<'a> {
    pub turn: &'a Turn,
    /// The generation call failed and `turn` carries the error text
    pub failed: bool,
}

fn halt_message(error: &ChatError) -> String {
    let headline = match error {
        ChatError::ConfigError(_) => CONFIG_HALT_MESSAGE,
        _ => CREDENTIALS_HALT_MESSAGE,
    };
    format!("{} ({})", headline, error)
}

/// One user's conversation: owns its transcript and its generator
pub struct ChatSession {
    id: Uuid,
    state: SessionState,
    transcript: Transcript,
    halt_reported: bool,
}

impl ChatSession {
    /// Runs `connect` once; a failure halts the session for good
    pub fn start<F>(connect: F) -> Self
    where
        F: FnOnce() -> ChatResult<AnswerGenerator>,
    {
        let id = Uuid::new_v4();
        let state = match connect() {
            Ok(generator) => {
                info!(session = %id, "Session ready");
                SessionState::Ready(generator)
            }
            Err(e) => {
                error!(session = %id, error = %e, "Session setup failed, halting session");
                SessionState::Halted(halt_message(&e))
            }
        };

        Self {
            id,
            state,
            transcript: Transcript::new(),
            halt_reported: false,
        }
    }

    pub fn is_halted(&self) -> bool {
        matches!(self.state, SessionState::Halted(_))
    }

    /// The blocking error, handed out only the first time it is asked for
    pub fn take_blocking_error(&mut self) -> Option<String> {
        match &self.state {
            SessionState::Halted(message) if !self.halt_reported => {
                self.halt_reported = true;
                Some(message.clone())
            }
            _ => None,
        }
    }

    /// Title and description are only shown before the first turn
    pub fn show_header(&self) -> bool {
        self.transcript.is_empty()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Records the question, asks the model and records whatever comes back.
    ///
    /// Generation failures become the assistant's reply text; the only error
    /// returned is [`ChatError::SessionHalted`], before anything is recorded.
    pub async fn ask(&mut self, question: &str) -> ChatResult<Reply<'_>> {
        let generator = match &self.state {
            SessionState::Ready(generator) => generator,
            SessionState::Halted(message) => {
                return Err(ChatError::SessionHalted(message.clone()));
            }
        };

        self.transcript.append(Role::User, question);

        let span = info_span!("turn", session = %self.id, turn = self.transcript.len());
        let (text, failed) = match generator.generate(question).instrument(span).await {
            Ok(answer) => (answer, false),
            Err(e) => {
                warn!(session = %self.id, error = %e, "Generation failed");
                (format!("{}: {}", GENERATION_ERROR_PREFIX, e), true)
            }
        };

        Ok(Reply {
            turn: self.transcript.append(Role::Assistant, text),
            failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secrets;
    use crate::generator::tests::{text_response, ScriptedBackend};
    use crate::generator::FALLBACK_ANSWER;
    use crate::types::GenerateContentResponse;
    use std::sync::atomic::Ordering;

    fn ready(backend: Arc<ScriptedBackend>) -> ChatSession {
        ChatSession::start(|| {
            Ok(AnswerGenerator::new(
                backend,
                GenerationSettings::for_profile("Marcos Bernardino", "projects/p/dataStores/cv"),
            ))
        })
    }

    #[tokio::test]
    async fn test_turns_alternate_in_submission_order() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Ok(text_response("a1")),
            Err(ChatError::RequestError("boom".into())),
            Ok(GenerateContentResponse::default()),
        ]));
        let mut session = ready(backend);
        assert!(session.show_header());

        for question in ["q1", "q2", "q3"] {
            session.ask(question).await.unwrap();
        }
        assert!(!session.show_header());

        let turns = session.transcript().all();
        assert_eq!(turns.len(), 6);
        for (i, pair) in turns.chunks(2).enumerate() {
            assert_eq!(pair[0].role(), Role::User);
            assert_eq!(pair[0].content(), format!("q{}", i + 1));
            assert_eq!(pair[1].role(), Role::Assistant);
        }
        assert_eq!(turns[1].content(), "a1");
        assert_eq!(turns[5].content(), FALLBACK_ANSWER);
    }

    #[tokio::test]
    async fn test_generation_error_becomes_reply() {
        let backend = Arc::new(ScriptedBackend::new(vec![Err(ChatError::HttpError {
            status_code: 500,
            message: "backend exploded".into(),
        })]));
        let mut session = ready(backend);

        let reply = session.ask("Hello?").await.unwrap();
        assert!(reply.failed);
        assert_eq!(reply.turn.role(), Role::Assistant);
        assert!(reply.turn.content().starts_with(GENERATION_ERROR_PREFIX));
        assert!(reply.turn.content().contains("backend exploded"));

        // still usable afterwards
        session.ask("Again?").await.unwrap();
        assert_eq!(session.transcript().len(), 4);
    }

    #[tokio::test]
    async fn test_answer_echoing_error_wording_is_not_a_failure() {
        let text = format!("{}: none, the model just quoted it.", GENERATION_ERROR_PREFIX);
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(text_response(&text))]));
        let mut session = ready(backend);

        let reply = session.ask("Quote the error message").await.unwrap();
        assert!(!reply.failed);
        assert_eq!(reply.turn.content(), text);
    }

    #[tokio::test]
    async fn test_certification_question_scenario() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(text_response(
            "Marcos holds Google Cloud and AWS certifications.",
        ))]));
        let mut session = ready(backend.clone());

        session.ask("What certifications does Marcos have?").await.unwrap();

        let turns = session.transcript().all();
        assert_eq!(turns[0].role(), Role::User);
        assert_eq!(turns[0].content(), "What certifications does Marcos have?");
        assert_eq!(turns[1].role(), Role::Assistant);
        assert!(!turns[1].content().is_empty());
        assert_ne!(turns[1].content(), FALLBACK_ANSWER);

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].contents.len(), 1);
    }

    #[tokio::test]
    async fn test_halted_session_never_calls_backend() {
        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let mut session =
            ChatSession::start(|| Err(ChatError::CredentialError("no key".into())));

        assert!(session.is_halted());
        let message = session.take_blocking_error().unwrap();
        assert!(message.starts_with(CREDENTIALS_HALT_MESSAGE));
        assert!(message.contains("no key"));
        assert_eq!(session.take_blocking_error(), None);

        let err = session.ask("Anyone there?").await.unwrap_err();
        assert!(matches!(err, ChatError::SessionHalted(_)));
        assert!(session.transcript().is_empty());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_connect_without_service_key_halts() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::resolve(Secrets::default());
        let loader = CredentialLoader::new(dir.path().join("key.json"), false);

        let session = ChatSession::start(|| connect(&config, &loader));
        assert!(session.is_halted());
        assert!(!loader.path().exists());
    }

    #[test]
    fn test_connect_uses_key_project() {
        let dir = tempfile::tempdir().unwrap();
        let mut secrets = Secrets::default();
        secrets.key.service_key = Some(crate::auth::tests::FIXTURE_KEY.to_string());
        secrets.google_cloud.datastore = Some("projects/p/dataStores/cv".to_string());
        let config = AppConfig::resolve(secrets);
        let loader = CredentialLoader::new(dir.path().join("key.json"), false);

        let generator = connect(&config, &loader).unwrap();
        assert_eq!(generator.settings().datastore, "projects/p/dataStores/cv");
        assert!(loader.path().exists());
    }

    #[test]
    fn test_missing_datastore_halts_with_config_message() {
        let dir = tempfile::tempdir().unwrap();
        let mut secrets = Secrets::default();
        secrets.key.service_key = Some(crate::auth::tests::FIXTURE_KEY.to_string());
        let config = AppConfig::resolve(secrets);
        let loader = CredentialLoader::new(dir.path().join("key.json"), false);

        let mut session = ChatSession::start(|| connect(&config, &loader));
        let message = session.take_blocking_error().unwrap();
        assert!(message.starts_with(CONFIG_HALT_MESSAGE));
        assert!(message.contains("datastore"));
    }
}
