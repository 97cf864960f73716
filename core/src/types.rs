use serde::{Deserialize, Serialize};

/// Request body for Vertex AI `generateContent`
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub safety_settings: Vec<SafetySetting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// Content structure for requests and responses
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part::text(text)],
        }
    }

    /// System instructions carry no role
    pub fn instruction(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }
}

/// Part structure for a piece of content.
///
/// Only text is sent; other part kinds the model may return are kept as raw
/// JSON so they do not break parsing.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<serde_json::Value>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            function_call: None,
        }
    }
}

/// Tool attachment; only retrieval grounding is used here
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Tool {
    pub retrieval: Retrieval,
}

impl Tool {
    /// Grounds answers in a Vertex AI Search datastore
    pub fn vertex_ai_search(datastore: impl Into<String>) -> Self {
        Self {
            retrieval: Retrieval {
                vertex_ai_search: VertexAiSearch {
                    datastore: datastore.into(),
                },
            },
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Retrieval {
    pub vertex_ai_search: VertexAiSearch,
}

/// Fully-qualified datastore resource name
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct VertexAiSearch {
    pub datastore: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmCategory {
    HarmCategoryHateSpeech,
    HarmCategoryDangerousContent,
    HarmCategorySexuallyExplicit,
    HarmCategoryHarassment,
}

impl HarmCategory {
    pub const ALL: [HarmCategory; 4] = [
        HarmCategory::HarmCategoryHateSpeech,
        HarmCategory::HarmCategoryDangerousContent,
        HarmCategory::HarmCategorySexuallyExplicit,
        HarmCategory::HarmCategoryHarassment,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold {
    BlockLowAndAbove,
    BlockMediumAndAbove,
    BlockOnlyHigh,
    BlockNone,
    Off,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

/// Generation configuration options
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub response_modalities: Vec<String>,
}

/// Response from Vertex AI
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// Candidate in the response
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// What could be read out of a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedAnswer {
    Text(String),
    NoCandidate,
    NoContent,
    NoParts,
    /// The first part exists but carries no text (e.g. a function call)
    NoText,
}

impl ExtractedAnswer {
    pub fn into_text_or(self, fallback: &str) -> String {
        match self {
            ExtractedAnswer::Text(text) => text,
            ExtractedAnswer::NoCandidate
            | ExtractedAnswer::NoContent
            | ExtractedAnswer::NoParts
            | ExtractedAnswer::NoText => fallback.to_string(),
        }
    }
}

impl GenerateContentResponse {
    /// Reads the first text part of the first candidate
    pub fn extract_answer(&self) -> ExtractedAnswer {
        let Some(candidate) = self.candidates.first() else {
            return ExtractedAnswer::NoCandidate;
        };
        let Some(content) = candidate.content.as_ref() else {
            return ExtractedAnswer::NoContent;
        };
        let Some(part) = content.parts.first() else {
            return ExtractedAnswer::NoParts;
        };

        match &part.text {
            Some(text) => ExtractedAnswer::Text(text.clone()),
            None => ExtractedAnswer::NoText,
        }
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.candidates.first()?.finish_reason.as_deref()
    }
}
