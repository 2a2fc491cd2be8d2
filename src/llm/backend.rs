//! Inference request/response model and the backend seam

use crate::core::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One prompt body or several, as the remote endpoint accepts either
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserInput {
    Single(String),
    Many(Vec<String>),
}

impl UserInput {
    /// Everything as one newline-joined body
    pub fn joined(&self) -> String {
        match self {
            UserInput::Single(s) => s.clone(),
            UserInput::Many(parts) => parts.join("\n"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceRequest {
    pub system_prompt: String,
    pub user_input: UserInput,
    /// Images as data URIs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<Vec<String>>,
    #[serde(default)]
    pub use_structured_output: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_preference: Option<String>,
}

impl InferenceRequest {
    pub fn new(system_prompt: impl Into<String>, user_input: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_input: UserInput::Single(user_input.into()),
            image_data: None,
            use_structured_output: false,
            json_schema: None,
            provider_preference: None,
        }
    }

    pub fn images(&self) -> &[String] {
        self.image_data.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceResponse {
    #[serde(default)]
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InferenceResponse {
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            ..Default::default()
        }
    }
}

/// Remote inference call consumed by the orchestrator
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    async fn infer(&self, request: &InferenceRequest) -> Result<InferenceResponse>;
}
