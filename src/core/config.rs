//! Runtime configuration with documented defaults
//!
//! All tunable strings and thresholds used by the resolver, the table
//! merge engine and the orchestrator are collected here.

use crate::core::error::{Result, WireError};
use serde::Deserialize;
use std::path::Path;

/// Configuration for the binding runtime
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    // === RESOLVER ===
    /// Reserved prefix that preview/run mode puts in front of component ids
    pub run_prefix: String,

    /// Radius (canvas units) around a last-known position within which a
    /// live element's center counts as the same component
    pub proximity_radius: f32,

    /// Class token carried by composite AI-generated containers
    pub ai_container_class: String,

    /// Class token of the inner wrapper that generated content is rendered into
    pub secondary_container_class: String,

    /// Attribute that carries the logical id of an element inside a composite block
    pub internal_id_attribute: String,

    // === TABLE ===
    /// Marker written into output cells while a call is in flight
    pub loading_marker: String,

    /// Skeleton rows synthesized when the output table is empty
    pub placeholder_rows: usize,

    // === OUTPUT ===
    /// Also patch written text straight into the live tree. The keyed state
    /// write always happens; this mirror is a compatibility shim only.
    pub mirror_to_live_tree: bool,

    // === MESSAGES ===
    /// Written to the output when no input produced a value
    pub empty_input_message: String,

    /// Written to the output when the remote call fails
    pub failure_message: String,

    // === BACKEND ===
    pub backend: BackendConfig,
}

/// Which inference backend to talk to and how
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub url: String,
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub provider_preference: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The application's own inference endpoint
    Endpoint,
    Anthropic,
    OpenAI,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Endpoint,
            url: "http://localhost:3000/api/ai".into(),
            model: "claude-3-haiku-20240307".into(),
            api_key_env: "LLM_API_KEY".into(),
            provider_preference: None,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            run_prefix: "run-".into(),
            proximity_radius: 50.0,
            ai_container_class: "ai-component".into(),
            secondary_container_class: "ai-generated-content".into(),
            internal_id_attribute: "data-internal-id".into(),

            loading_marker: "Loading...".into(),
            placeholder_rows: 3,

            mirror_to_live_tree: true,

            empty_input_message: "Please enter some text in the input fields before running \
                                  this functionality."
                .into(),
            failure_message: "Sorry, something went wrong while processing your request. \
                              Please try again."
                .into(),

            backend: BackendConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; missing fields keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RuntimeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.proximity_radius <= 0.0 {
            return Err(WireError::Config(format!(
                "proximity_radius ({}) must be positive",
                self.proximity_radius
            )));
        }

        if self.placeholder_rows == 0 {
            return Err(WireError::Config("placeholder_rows must be at least 1".into()));
        }

        if self.loading_marker.is_empty() {
            return Err(WireError::Config("loading_marker must not be empty".into()));
        }

        if self.empty_input_message.is_empty() || self.failure_message.is_empty() {
            return Err(WireError::Config("user-facing messages must not be empty".into()));
        }

        Ok(())
    }
}
