//! Direct LLM provider client
//!
//! Talks to Anthropic or OpenAI-compatible chat APIs (DeepSeek, etc) when no
//! application endpoint sits in between. Images are sent as content blocks
//! and structured output is requested per provider.

use crate::core::error::{Result, WireError};
use crate::llm::backend::{InferenceBackend, InferenceRequest, InferenceResponse};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// API format type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ApiFormat {
    Anthropic,
    OpenAI,
}

impl ApiFormat {
    /// Detect API format from URL
    fn detect(url: &str) -> Self {
        if url.contains("anthropic.com") {
            ApiFormat::Anthropic
        } else {
            // DeepSeek, OpenAI, and other compatible APIs use OpenAI format
            ApiFormat::OpenAI
        }
    }

    fn from_preference(preference: &str) -> Option<Self> {
        match preference.to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Some(ApiFormat::Anthropic),
            "openai" | "gpt" | "deepseek" => Some(ApiFormat::OpenAI),
            _ => None,
        }
    }
}

pub struct LlmClient {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    api_format: ApiFormat,
}

impl LlmClient {
    pub fn new(api_key: String, api_url: String, model: String) -> Self {
        let api_format = ApiFormat::detect(&api_url);
        Self {
            client: Client::new(),
            api_key,
            api_url,
            model,
            api_format,
        }
    }

    /// Force a format regardless of what the URL suggests
    pub fn with_format(mut self, api_format: ApiFormat) -> Self {
        self.api_format = api_format;
        self
    }

    /// Create a client from environment variables
    ///
    /// Required: the variable named by `key_var`
    /// Optional: LLM_API_URL (defaults to Anthropic API)
    /// Optional: LLM_MODEL (defaults to claude-3-haiku-20240307)
    pub fn from_env(key_var: &str) -> Result<Self> {
        let api_key = std::env::var(key_var)
            .map_err(|_| WireError::Config(format!("{} not set", key_var)))?;
        let api_url = std::env::var("LLM_API_URL")
            .unwrap_or_else(|_| "https://api.anthropic.com/v1/messages".into());
        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| "claude-3-haiku-20240307".into());

        Ok(Self::new(api_key, api_url, model))
    }

    /// Format for one request; a recognised provider preference wins over the URL
    fn format_for(&self, request: &InferenceRequest) -> ApiFormat {
        request
            .provider_preference
            .as_deref()
            .and_then(ApiFormat::from_preference)
            .unwrap_or(self.api_format)
    }

    async fn complete_anthropic(&self, request: &InferenceRequest) -> Result<InferenceResponse> {
        let mut system = request.system_prompt.clone();
        if let (true, Some(schema)) = (request.use_structured_output, &request.json_schema) {
            system.push_str(&format!(
                "\n\nRespond only with JSON matching this schema:\n{}",
                schema
            ));
        }

        let text = request.user_input.joined();
        let content = if request.images().is_empty() {
            AnthropicContent::Text(text)
        } else {
            let mut parts: Vec<AnthropicPart> = request
                .images()
                .iter()
                .filter_map(|uri| parse_data_uri(uri))
                .map(|(media_type, data)| AnthropicPart::Image {
                    source: ImageSource {
                        kind: "base64".into(),
                        media_type,
                        data,
                    },
                })
                .collect();
            parts.push(AnthropicPart::Text { text });
            AnthropicContent::Parts(parts)
        };

        let body = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: 8192,
            system,
            messages: vec![AnthropicMessage {
                role: "user".into(),
                content,
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(WireError::RemoteCall(format!("API error: {}", error_text)));
        }

        let completion: AnthropicResponse = response.json().await?;
        let text = completion
            .content
            .into_iter()
            .find_map(|c| c.text)
            .ok_or_else(|| WireError::RemoteCall("Empty response".into()))?;

        Ok(into_response(text, request.use_structured_output))
    }

    async fn complete_openai(&self, request: &InferenceRequest) -> Result<InferenceResponse> {
        // Model-specific max_tokens limits
        let max_tokens = if self.model.contains("reasoner") {
            32768
        } else {
            8192
        };

        let text = request.user_input.joined();
        let user_content = if request.images().is_empty() {
            OpenAIContent::Text(text)
        } else {
            let mut parts = vec![OpenAIPart::Text { text }];
            parts.extend(request.images().iter().map(|uri| OpenAIPart::ImageUrl {
                image_url: ImageUrl { url: uri.clone() },
            }));
            OpenAIContent::Parts(parts)
        };

        let response_format = match (request.use_structured_output, &request.json_schema) {
            (true, Some(schema)) => Some(json!({
                "type": "json_schema",
                "json_schema": { "name": "rows", "schema": schema, "strict": true }
            })),
            (true, None) => Some(json!({ "type": "json_object" })),
            _ => None,
        };

        let body = OpenAIRequest {
            model: self.model.clone(),
            max_tokens,
            messages: vec![
                OpenAIMessage {
                    role: "system".into(),
                    content: OpenAIContent::Text(request.system_prompt.clone()),
                },
                OpenAIMessage {
                    role: "user".into(),
                    content: user_content,
                },
            ],
            response_format,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(WireError::RemoteCall(format!("API error: {}", error_text)));
        }

        let completion: OpenAIResponse = response.json().await?;
        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| WireError::RemoteCall("Empty response".into()))?;

        Ok(into_response(text, request.use_structured_output))
    }
}

#[async_trait]
impl InferenceBackend for LlmClient {
    async fn infer(&self, request: &InferenceRequest) -> Result<InferenceResponse> {
        match self.format_for(request) {
            ApiFormat::Anthropic => self.complete_anthropic(request).await,
            ApiFormat::OpenAI => self.complete_openai(request).await,
        }
    }
}

/// Text becomes structured data only when it was asked for and parses as JSON
fn into_response(text: String, structured: bool) -> InferenceResponse {
    let structured_data = if structured {
        serde_json::from_str::<Value>(text.trim()).ok()
    } else {
        None
    };
    InferenceResponse {
        response: text,
        structured_data,
        error: None,
    }
}

/// Split `data:<media>;base64,<payload>`
fn parse_data_uri(uri: &str) -> Option<(String, String)> {
    let rest = uri.strip_prefix("data:")?;
    let (header, data) = rest.split_once(',')?;
    let media_type = header.strip_suffix(";base64")?;
    Some((media_type.to_string(), data.to_string()))
}

// Anthropic API format
#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<AnthropicMessage>,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: String,
    content: AnthropicContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum AnthropicContent {
    Text(String),
    Parts(Vec<AnthropicPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicPart {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    kind: String,
    media_type: String,
    data: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

// OpenAI-compatible API format (DeepSeek, OpenAI, etc.)
#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Serialize)]
struct OpenAIMessage {
    role: String,
    content: OpenAIContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum OpenAIContent {
    Text(String),
    Parts(Vec<OpenAIPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAIPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = LlmClient::new(
            "test-key".into(),
            "https://api.example.com".into(),
            "test-model".into(),
        );
        assert_eq!(client.api_key, "test-key");
        assert_eq!(client.api_url, "https://api.example.com");
        assert_eq!(client.model, "test-model");
        assert_eq!(client.api_format, ApiFormat::OpenAI);
    }

    #[test]
    fn test_from_env_missing_key() {
        let result = LlmClient::from_env("CANVAS_WIRE_TEST_UNSET_KEY");
        assert!(matches!(result, Err(WireError::Config(_))));
    }

    #[test]
    fn test_provider_preference_overrides_url() {
        let client = LlmClient::new(
            "k".into(),
            "https://api.anthropic.com/v1/messages".into(),
            "m".into(),
        );
        let mut request = InferenceRequest::new("s", "u");
        assert_eq!(client.format_for(&request), ApiFormat::Anthropic);

        request.provider_preference = Some("openai".into());
        assert_eq!(client.format_for(&request), ApiFormat::OpenAI);

        request.provider_preference = Some("unknown".into());
        assert_eq!(client.format_for(&request), ApiFormat::Anthropic);
    }

    #[test]
    fn test_parse_data_uri() {
        assert_eq!(
            parse_data_uri("data:image/png;base64,AAAA"),
            Some(("image/png".to_string(), "AAAA".to_string()))
        );
        assert_eq!(parse_data_uri("https://example.com/a.png"), None);
    }

    #[test]
    fn test_image_parts_serialize() {
        let part = AnthropicPart::Image {
            source: ImageSource {
                kind: "base64".into(),
                media_type: "image/jpeg".into(),
                data: "xyz".into(),
            },
        };
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["source"]["type"], "base64");

        let part = OpenAIPart::ImageUrl {
            image_url: ImageUrl { url: "data:image/png;base64,AA".into() },
        };
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["type"], "image_url");
    }

    #[test]
    fn test_structured_text_becomes_data() {
        let response = into_response(r#"{"rows": []}"#.into(), true);
        assert!(response.structured_data.is_some());

        let response = into_response(r#"{"rows": []}"#.into(), false);
        assert!(response.structured_data.is_none());
    }
}
