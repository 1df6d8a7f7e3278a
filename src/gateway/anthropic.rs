use super::*;
use std::time::Instant;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic messages API provider
pub struct AnthropicProvider {
    url: String,
    model: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(model: String) -> Self {
        Self {
            url: ANTHROPIC_API_URL.to_string(),
            model,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn generate(&self, request: GenerateRequest) -> LlmResult<GenerateResponse> {
        let start = Instant::now();

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![Message {
                role: "user",
                content: request.prompt,
            }],
        };

        let response = with_timeout(
            request.timeout,
            self.client
                .post(&self.url)
                .header("x-api-key", &request.credential)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&body)
                .send(),
        )
        .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError(provider_error_message(
                &body,
                &format!("Anthropic API error (status {})", status),
            )));
        }

        let messages: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;

        let text = messages
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| LlmError::ParseError("No text content in response".to_string()))?;

        Ok(GenerateResponse {
            text,
            metadata: ResponseMetadata {
                provider: Provider::Anthropic,
                model: self.model.clone(),
                latency_ms: start.elapsed().as_millis() as u64,
            },
        })
    }

    fn provider(&self) -> Provider {
        Provider::Anthropic
    }
}
