pub mod prompt;

use async_openai::{
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use crate::client::{status_error, AnalysisBackend, AnalysisOutcome};
use crate::credential::Credential;
use crate::domain::AnalysisResult;
use crate::error::AnalysisError;
use crate::request::{HttpMethod, RequestDescriptor};
use crate::transport::{Transport, TransportRequest, TransportResponse};

pub use prompt::build_prompt;

/// Gemini's OpenAI-compatible endpoint
pub const DEFAULT_LLM_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_LLM_MODEL: &str = "gemini-2.5-flash";

/// Asks a chat model directly for a markdown report, using the session's
/// credential as the model API key.
///
/// The chat call goes through the crate's `Transport` rather than the
/// async-openai client, so the HTTP status reaches the shared status table
/// and nothing is retried behind the engine's back.
#[derive(Clone)]
pub struct LlmAnalyst {
    transport: Arc<dyn Transport>,
    base_url: Url,
    model: String,
}

/// `{"error": {...}}`, or Gemini's `[{"error": {...}}]`
#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Single(ErrorEnvelope),
    List(Vec<ErrorEnvelope>),
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorMessage,
}

#[derive(Deserialize)]
struct ErrorMessage {
    message: String,
}

impl LlmAnalyst {
    pub fn new(transport: Arc<dyn Transport>, base_url: Url, model: String) -> Self {
        Self {
            transport,
            base_url,
            model,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn completions_url(&self) -> Result<Url, AnalysisError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AnalysisError::ServiceUnavailable {
                status: None,
                message: format!("base URL {} cannot carry a path", self.base_url),
            })?
            .pop_if_empty()
            .extend(["chat", "completions"]);
        Ok(url)
    }

    pub fn chat_request(&self, user_input: &str) -> Result<CreateChatCompletionRequest, OpenAIError> {
        CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([
                ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(prompt::SYSTEM_PROMPT)
                        .build()?,
                ),
                ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(user_input)
                        .build()?,
                ),
            ])
            .build()
    }

    async fn chat(&self, credential: &Credential, user_input: &str) -> Result<String, AnalysisError> {
        info!("🤖 [LLM] Sending request to LLM (Model: {})...", self.model);

        let request = self
            .chat_request(user_input)
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;
        let body = serde_json::to_value(&request)
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

        let response = self
            .transport
            .send(TransportRequest {
                method: HttpMethod::Post,
                url: self.completions_url()?,
                headers: vec![(
                    "Authorization".to_string(),
                    format!("Bearer {}", credential.expose()),
                )],
                body: Some(body),
            })
            .await?;

        let text = interpret_chat_response(response)?;
        info!("🤖 [LLM] Response received.");
        Ok(text)
    }
}

/// First choice's text for a 2xx reply; otherwise the shared status table
/// applied to the real status, with the provider's error message as detail.
pub fn interpret_chat_response(response: TransportResponse) -> Result<String, AnalysisError> {
    if response.is_success() {
        let completion: CreateChatCompletionResponse = serde_json::from_str(&response.body)
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;
        return Ok(completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default());
    }

    let detail = match serde_json::from_str::<ErrorBody>(&response.body) {
        Ok(ErrorBody::Single(e)) => Some(e.error.message),
        Ok(ErrorBody::List(list)) => list.into_iter().next().map(|e| e.error.message),
        Err(_) => None,
    };
    warn!("🤖 [LLM] HTTP {} from model: {:?}", response.status, detail);
    Err(status_error(response.status, detail))
}

#[async_trait]
impl AnalysisBackend for LlmAnalyst {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn execute(
        &self,
        descriptor: &RequestDescriptor,
        credential: Option<&Credential>,
    ) -> AnalysisOutcome {
        let Some(credential) = credential else {
            return Err(AnalysisError::MissingCredential);
        };

        let prompt = build_prompt(&descriptor.target, descriptor.feedback.as_deref());
        let text = self.chat(credential, &prompt).await.map_err(|e| {
            warn!("🤖 [LLM] Request for {} failed: {}", descriptor.target, e);
            e
        })?;

        if text.trim().is_empty() {
            return Err(AnalysisError::MalformedResponse(
                "model returned no analysis".to_string(),
            ));
        }
        Ok(AnalysisResult::FormattedText(text))
    }
}
