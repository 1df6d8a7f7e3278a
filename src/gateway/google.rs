use super::*;
use std::time::Instant;

const GOOGLE_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini provider
pub struct GoogleProvider {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl GoogleProvider {
    pub fn new(model: String) -> Self {
        Self {
            base_url: GOOGLE_API_BASE.to_string(),
            model,
            client: reqwest::Client::new(),
        }
    }

    /// Google AI Studio keys start with `AIza`
    fn validate_key(credential: &str) -> LlmResult<()> {
        if credential.starts_with("AIza") {
            Ok(())
        } else {
            Err(LlmError::ConfigError(
                "Invalid Google API key format. Please check your API key.".to_string(),
            ))
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[async_trait]
impl LlmProvider for GoogleProvider {
    async fn generate(&self, request: GenerateRequest) -> LlmResult<GenerateResponse> {
        Self::validate_key(&request.credential)?;
        let start = Instant::now();

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: request.prompt,
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let response = with_timeout(
            request.timeout,
            self.client
                .post(&url)
                .query(&[("key", request.credential.as_str())])
                .json(&body)
                .send(),
        )
        .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError(provider_error_message(
                &body,
                &format!("Google API error (status {})", status),
            )));
        }

        let gemini: GeminiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;

        let text = gemini
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| LlmError::ParseError("No candidates in response".to_string()))?;

        Ok(GenerateResponse {
            text,
            metadata: ResponseMetadata {
                provider: Provider::Google,
                model: self.model.clone(),
                latency_ms: start.elapsed().as_millis() as u64,
            },
        })
    }

    fn provider(&self) -> Provider {
        Provider::Google
    }
}
