use std::sync::Arc;

use tracing::{debug, warn};

use crate::client::ContentGenerator;
use crate::errors::ChatResult;
use crate::types::*;

/// Shown when the model produced nothing readable
pub const FALLBACK_ANSWER: &str = "answer not found";

pub const TEMPERATURE: f32 = 0.2;
pub const TOP_P: f32 = 0.95;
pub const MAX_OUTPUT_TOKENS: u32 = 8192;

/// Builds the persona the model plays while answering about `name`'s résumé
pub fn persona_instruction(name: &str) -> String {
    format!(
        r#"You are an intelligent assistant specialised in résumé analysis and professional presentation. Answer every question with accuracy, clarity and professionalism, making sure the answer leaves a positive impression of {name}.

The reference document is the résumé of {name}. It contains detailed information about their career, technical and interpersonal skills, certifications, academic background, relevant experience and projects.

How to structure your answers:

Give clear and objective answers, always highlighting the skills, achievements and strengths of {name}.

Use a persuasive and professional approach, emphasising strong points and relevant experience.

Where applicable, mention practical examples or results to reinforce credibility.

If a specific piece of information is not available in the document, answer diplomatically and reinforce the overall qualifications of {name}.

Key points to value:

Professional experience: highlight roles, responsibilities and achievements.

Technical skills: show knowledge of tools, languages and methodologies.

Certifications and education: mention degrees and courses that add credibility.

Projects and initiatives: cite notable work or relevant contributions.

Soft skills: stress interpersonal abilities and workplace strengths.

Your tone should be professional yet approachable and engaging. Balance objectivity and enthusiasm so the message is clear and impactful.

When giving links, keep any underscores that appear in them."#
    )
}

/// Fixed per-deployment request parameters
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub system_instruction: String,
    pub datastore: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl GenerationSettings {
    pub fn for_profile(name: &str, datastore: impl Into<String>) -> Self {
        Self {
            system_instruction: persona_instruction(name),
            datastore: datastore.into(),
            temperature: TEMPERATURE,
            top_p: TOP_P,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        }
    }
}

/// Answers one question per call; nothing is cached between calls
#[derive(Clone)]
pub struct AnswerGenerator {
    backend: Arc<dyn ContentGenerator>,
    settings: GenerationSettings,
}

impl AnswerGenerator {
    pub fn new(backend: Arc<dyn ContentGenerator>, settings: GenerationSettings) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Creates the request for a single user turn
    pub fn build_request(&self, question: &str) -> GenerateContentRequest {
        let safety_settings = HarmCategory::ALL
            .iter()
            .map(|category| SafetySetting {
                category: *category,
                threshold: HarmBlockThreshold::Off,
            })
            .collect();

        GenerateContentRequest {
            contents: vec![Content::user(question)],
            system_instruction: Some(Content::instruction(
                self.settings.system_instruction.clone(),
            )),
            tools: vec![Tool::vertex_ai_search(self.settings.datastore.clone())],
            safety_settings,
            generation_config: Some(GenerationConfig {
                temperature: Some(self.settings.temperature),
                top_p: Some(self.settings.top_p),
                max_output_tokens: Some(self.settings.max_output_tokens),
                response_modalities: vec!["TEXT".to_string()],
            }),
        }
    }

    /// Transport and API failures propagate; empty responses become [`FALLBACK_ANSWER`]
    pub async fn generate(&self, question: &str) -> ChatResult<String> {
        let request = self.build_request(question);
        let response = self.backend.generate_content(request).await?;

        let answer = response.extract_answer();
        if !matches!(answer, ExtractedAnswer::Text(_)) {
            warn!(
                shape = ?answer,
                finish_reason = response.finish_reason().unwrap_or("unknown"),
                "No answer text in response"
            );
        } else {
            debug!("Answer received");
        }

        Ok(answer.into_text_or(FALLBACK_ANSWER))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::errors::ChatError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays canned results and records every request it sees
    pub(crate) struct ScriptedBackend {
        replies: Mutex<Vec<ChatResult<GenerateContentResponse>>>,
        pub(crate) requests: Mutex<Vec<GenerateContentRequest>>,
        pub(crate) calls: AtomicUsize,
    }

    impl ScriptedBackend {
        pub(crate) fn new(mut replies: Vec<ChatResult<GenerateContentResponse>>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                requests: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ContentGenerator for ScriptedBackend {
        async fn generate_content(
            &self,
            request: GenerateContentRequest,
        ) -> ChatResult<GenerateContentResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(GenerateContentResponse::default()))
        }
    }

    pub(crate) fn text_response(text: &str) -> GenerateContentResponse {
        serde_json::from_value(json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
        }))
        .unwrap()
    }

    fn generator(backend: Arc<ScriptedBackend>) -> AnswerGenerator {
        AnswerGenerator::new(
            backend,
            GenerationSettings::for_profile("Marcos Bernardino", "projects/p/dataStores/cv"),
        )
    }

    #[test]
    fn test_request_shape() {
        let generator = generator(Arc::new(ScriptedBackend::new(vec![])));
        let body = serde_json::to_value(generator.build_request("Where did he study?")).unwrap();

        assert_eq!(
            body["contents"],
            json!([{ "role": "user", "parts": [{ "text": "Where did he study?" }] }])
        );
        assert!(body["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Marcos Bernardino"));
        assert_eq!(
            body["tools"],
            json!([{ "retrieval": { "vertexAiSearch": { "datastore": "projects/p/dataStores/cv" } } }])
        );

        let config = &body["generationConfig"];
        assert!((config["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
        assert!((config["topP"].as_f64().unwrap() - 0.95).abs() < 1e-6);
        assert_eq!(config["maxOutputTokens"], 8192);
        assert_eq!(config["responseModalities"], json!(["TEXT"]));

        let safety = body["safetySettings"].as_array().unwrap();
        assert_eq!(safety.len(), 4);
        assert!(safety.iter().all(|s| s["threshold"] == "OFF"));
    }

    #[tokio::test]
    async fn test_generate_returns_first_text() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(text_response("He holds an AWS certification."))]));
        let answer = generator(backend.clone()).generate("Certifications?").await.unwrap();
        assert_eq!(answer, "He holds an AWS certification.");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_candidates_use_fallback() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(GenerateContentResponse::default())]));
        let answer = generator(backend).generate("Anything?").await.unwrap();
        assert_eq!(answer, FALLBACK_ANSWER);
    }

    #[tokio::test]
    async fn test_backend_error_propagates() {
        let backend = Arc::new(ScriptedBackend::new(vec![Err(ChatError::HttpError {
            status_code: 503,
            message: "unavailable".into(),
        })]));
        let err = generator(backend).generate("Anything?").await.unwrap_err();
        assert!(matches!(err, ChatError::HttpError { status_code: 503, .. }));
    }

    #[tokio::test]
    async fn test_identical_questions_are_not_cached() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Ok(text_response("one")),
            Ok(text_response("two")),
        ]));
        let generator = generator(backend.clone());
        assert_eq!(generator.generate("same").await.unwrap(), "one");
        assert_eq!(generator.generate("same").await.unwrap(), "two");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }
}
