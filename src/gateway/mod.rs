mod anthropic;
mod content;
mod google;
mod openai;
mod scripted;

use crate::config::non_empty_env;
use crate::types::Provider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

pub use anthropic::AnthropicProvider;
pub use content::{
    into_content, parse_question_array, parse_topics, strip_code_fences, ParsedQuestions,
};
pub use google::GoogleProvider;
pub use openai::OpenAiProvider;
pub use scripted::ScriptedGateway;

/// Result type for provider operations
pub type LlmResult<T> = Result<T, LlmError>;

/// Errors that can occur while talking to a text generation provider
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("{0}")]
    ApiError(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Response parsing failed: {0}")]
    ParseError(String),
}

/// Request sent to a single provider
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// API key supplied by the players or preloaded from the environment
    pub credential: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Transport timeout; `None` waits for the provider indefinitely
    pub timeout: Option<Duration>,
}

/// Response from a provider
#[derive(Debug, Clone)]
pub struct GenerateResponse {
    /// The generated text
    pub text: String,
    pub metadata: ResponseMetadata,
}

/// Metadata about the provider response
#[derive(Debug, Clone)]
pub struct ResponseMetadata {
    pub provider: Provider,
    /// Model name used
    pub model: String,
    /// Latency in milliseconds
    pub latency_ms: u64,
}

/// Trait that all text generation providers must implement
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate text for the given prompt
    async fn generate(&self, request: GenerateRequest) -> LlmResult<GenerateResponse>;

    /// Which provider this is
    fn provider(&self) -> Provider;
}

/// Request accepted by the content gateway.
///
/// Also the wire format of `POST /api/generate`; the `apiKey` and
/// `isTextResponse` aliases accept payloads from older browser clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayRequest {
    #[serde(default, alias = "apiKey")]
    pub credential: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default, alias = "isTextResponse")]
    pub expects_plain_text: bool,
    #[serde(default)]
    pub provider: Provider,
}

/// Response of the content gateway: `content` on success, `error` otherwise
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GatewayResponse {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: Some(content.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            content: None,
            error: Some(error.into()),
        }
    }
}

/// The external text generation service as seen by the game
#[async_trait]
pub trait ContentGateway: Send + Sync {
    async fn generate(&self, request: GatewayRequest) -> GatewayResponse;
}

/// Error returned when credential or prompt is blank
pub const MISSING_INPUT_ERROR: &str = "Missing API key or prompt";

/// Gateway that routes each request to the provider it names
pub struct ProviderGateway {
    providers: Vec<Box<dyn LlmProvider>>,
    max_tokens: u32,
    temperature: f32,
    timeout: Option<Duration>,
}

impl ProviderGateway {
    pub fn new(providers: Vec<Box<dyn LlmProvider>>, config: &GatewayConfig) -> Self {
        Self {
            providers,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: config.timeout,
        }
    }

    fn find(&self, provider: Provider) -> Option<&dyn LlmProvider> {
        self.providers
            .iter()
            .find(|p| p.provider() == provider)
            .map(|p| p.as_ref())
    }
}

#[async_trait]
impl ContentGateway for ProviderGateway {
    async fn generate(&self, request: GatewayRequest) -> GatewayResponse {
        let credential = request.credential.trim();
        if credential.is_empty() || request.prompt.trim().is_empty() {
            return GatewayResponse::failed(MISSING_INPUT_ERROR);
        }

        let Some(provider) = self.find(request.provider) else {
            return GatewayResponse::failed(format!(
                "Provider '{}' not configured",
                request.provider
            ));
        };

        let generate_request = GenerateRequest {
            credential: credential.to_string(),
            prompt: request.prompt,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.timeout,
        };

        match provider.generate(generate_request).await {
            Ok(response) => {
                tracing::info!(
                    "Provider {} ({}) answered in {}ms",
                    response.metadata.provider,
                    response.metadata.model,
                    response.metadata.latency_ms
                );
                GatewayResponse::ok(response.text)
            }
            Err(e) => {
                tracing::error!("Provider {} failed: {}", request.provider, e);
                GatewayResponse::failed(e.to_string())
            }
        }
    }
}

/// Await `fut`, bounded by `timeout` when one is configured
pub(crate) async fn with_timeout<T, E>(
    timeout: Option<Duration>,
    fut: impl Future<Output = Result<T, E>>,
) -> LlmResult<T>
where
    E: std::fmt::Display,
{
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| LlmError::Timeout(limit))?,
        None => fut.await,
    };
    result.map_err(|e| LlmError::ApiError(e.to_string()))
}

/// Pull `error.message` out of a provider error body, falling back to `fallback`
pub(crate) fn provider_error_message(body: &str, fallback: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| fallback.to_string())
}

/// Configuration for the providers
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub google_model: String,
    pub anthropic_model: String,
    pub openai_model: String,
    /// API keys preloaded from the environment, by provider
    pub preloaded_credentials: HashMap<Provider, String>,
    /// Transport timeout; none by default so slow generations are not cut off
    pub timeout: Option<Duration>,
    pub max_tokens: u32,
    pub temperature: f32,
}

const DEFAULT_GOOGLE_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            google_model: DEFAULT_GOOGLE_MODEL.to_string(),
            anthropic_model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            preloaded_credentials: HashMap::new(),
            timeout: None,
            max_tokens: 1024,
            temperature: 0.7,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mut preloaded_credentials = HashMap::new();
        for (provider, var) in [
            (Provider::Google, "GOOGLE_API_KEY"),
            (Provider::Anthropic, "ANTHROPIC_API_KEY"),
            (Provider::OpenAi, "OPENAI_API_KEY"),
        ] {
            if let Some(key) = non_empty_env(var) {
                preloaded_credentials.insert(provider, key);
            }
        }

        Self {
            google_model: non_empty_env("GOOGLE_MODEL").unwrap_or(defaults.google_model),
            anthropic_model: non_empty_env("ANTHROPIC_MODEL").unwrap_or(defaults.anthropic_model),
            openai_model: non_empty_env("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            preloaded_credentials,
            timeout: non_empty_env("LLM_TIMEOUT")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs),
            max_tokens: non_empty_env("LLM_MAX_TOKENS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_tokens),
            temperature: defaults.temperature,
        }
    }

    /// Build a gateway that can reach all three providers
    pub fn build_gateway(&self) -> ProviderGateway {
        let providers: Vec<Box<dyn LlmProvider>> = vec![
            Box::new(GoogleProvider::new(self.google_model.clone())),
            Box::new(AnthropicProvider::new(self.anthropic_model.clone())),
            Box::new(OpenAiProvider::new(self.openai_model.clone())),
        ];
        ProviderGateway::new(providers, self)
    }
}
