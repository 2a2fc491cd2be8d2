use thiserror::Error;

#[derive(Error, Debug)]
pub enum WireError {
    #[error("No live component found for id: {0}")]
    ResolutionFailure(String),

    #[error("Functionality '{0}' produced no usable input")]
    EmptyInput(String),

    #[error("Remote call failed: {0}")]
    RemoteCall(String),

    #[error("Structured response could not be parsed: {0}")]
    StructuredParse(String),

    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl From<toml::de::Error> for WireError {
    fn from(e: toml::de::Error) -> Self {
        WireError::Config(e.to_string())
    }
}

impl From<reqwest::Error> for WireError {
    fn from(e: reqwest::Error) -> Self {
        WireError::RemoteCall(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WireError>;
