pub mod config;
pub mod error;
pub mod types;

pub use config::{BackendConfig, BackendKind, RuntimeConfig};
pub use error::{Result, WireError};
