use super::*;
use async_openai::{
    config::OpenAIConfig,
    types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    Client,
};
use std::time::Instant;

/// OpenAI chat completions provider
pub struct OpenAiProvider {
    model: String,
}

impl OpenAiProvider {
    pub fn new(model: String) -> Self {
        Self { model }
    }

    /// OpenAI keys are issued with an `sk-` prefix
    fn validate_key(credential: &str) -> LlmResult<()> {
        if credential.starts_with("sk-") {
            Ok(())
        } else {
            Err(LlmError::ConfigError(
                "Invalid OpenAI API key format. Please check your API key.".to_string(),
            ))
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate(&self, request: GenerateRequest) -> LlmResult<GenerateResponse> {
        Self::validate_key(&request.credential)?;
        let start = Instant::now();

        // Credentials come per request, so the client is too
        let client = Client::with_config(OpenAIConfig::new().with_api_key(request.credential));

        let mut req_builder = CreateChatCompletionRequestArgs::default();
        req_builder
            .model(&self.model)
            .messages([ChatCompletionRequestUserMessageArgs::default()
                .content(request.prompt)
                .build()
                .map_err(|e| LlmError::ApiError(e.to_string()))?
                .into()])
            .max_tokens(request.max_tokens)
            .temperature(request.temperature);

        let chat_request = req_builder
            .build()
            .map_err(|e| LlmError::ApiError(e.to_string()))?;

        let response = with_timeout(request.timeout, client.chat().create(chat_request)).await?;

        let text = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| LlmError::ParseError("No content in response".to_string()))?;

        Ok(GenerateResponse {
            text,
            metadata: ResponseMetadata {
                provider: Provider::OpenAi,
                model: self.model.clone(),
                latency_ms: start.elapsed().as_millis() as u64,
            },
        })
    }

    fn provider(&self) -> Provider {
        Provider::OpenAi
    }
}
