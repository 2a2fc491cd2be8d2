//! Inference backends and prompt shaping

pub mod backend;
pub mod client;
pub mod endpoint;
pub mod prompt;

pub use backend::{InferenceBackend, InferenceRequest, InferenceResponse, UserInput};
pub use client::{ApiFormat, LlmClient};
pub use endpoint::EndpointClient;

use crate::core::config::{BackendConfig, BackendKind};
use crate::core::error::{Result, WireError};
use std::sync::Arc;

/// Build the backend named by the configuration
pub fn backend_from_config(config: &BackendConfig) -> Result<Arc<dyn InferenceBackend>> {
    let backend: Arc<dyn InferenceBackend> = match config.kind {
        BackendKind::Endpoint => Arc::new(EndpointClient::new(config.url.clone())),
        BackendKind::Anthropic | BackendKind::OpenAI => {
            let api_key = std::env::var(&config.api_key_env)
                .map_err(|_| WireError::Config(format!("{} not set", config.api_key_env)))?;
            let format = if config.kind == BackendKind::Anthropic {
                ApiFormat::Anthropic
            } else {
                ApiFormat::OpenAI
            };
            Arc::new(
                LlmClient::new(api_key, config.url.clone(), config.model.clone())
                    .with_format(format),
            )
        }
    };
    tracing::info!("Using {:?} inference backend at {}", config.kind, config.url);
    Ok(backend)
}
