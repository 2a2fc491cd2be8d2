//! Functionality descriptors - the saved binding contract
//!
//! A descriptor wires an ordered set of input components, one output and one
//! trigger to a system prompt. Descriptors are produced and persisted by the
//! editor; this crate only reads them.

use crate::core::error::{Result, WireError};
use crate::core::types::Vec2;
use crate::table::TableData;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Saved binding of input/output/trigger ids plus prompt and column selections
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionalityDescriptor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub input_ids: Vec<String>,
    #[serde(default)]
    pub output_id: Option<String>,
    #[serde(default)]
    pub trigger_id: Option<String>,
    /// Selected columns per tabular input (component or uploaded document id)
    #[serde(default)]
    pub input_selected_columns: AHashMap<String, Vec<String>>,
    /// Selected columns per tabular output id
    #[serde(default)]
    pub output_selected_columns: AHashMap<String, Vec<String>>,
    #[serde(default)]
    pub uploaded_documents: Vec<UploadedDocument>,
    /// Last canvas position the editor recorded for each bound id
    #[serde(default)]
    pub last_known_positions: AHashMap<String, Vec2>,
    #[serde(default)]
    pub provider_preference: Option<String>,
}

/// A tabular document uploaded into the descriptor rather than placed on the canvas
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedDocument {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub data: TableData,
}

impl UploadedDocument {
    /// One-line summary placed in front of the document's rows
    pub fn summary(&self) -> String {
        format!(
            "Document \"{}\" ({} columns, {} rows)",
            self.name,
            self.data.headers.len(),
            self.data.rows.len()
        )
    }
}

impl FunctionalityDescriptor {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn document(&self, id: &str) -> Option<&UploadedDocument> {
        self.uploaded_documents.iter().find(|d| d.id == id)
    }

    pub fn input_columns(&self, input_id: &str) -> &[String] {
        self.input_selected_columns
            .get(input_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Selected output columns; empty unless the output is tabular
    pub fn output_columns(&self) -> &[String] {
        self.output_id
            .as_ref()
            .and_then(|id| self.output_selected_columns.get(id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn last_known_position(&self, id: &str) -> Option<Vec2> {
        self.last_known_positions.get(id).copied()
    }

    /// Require the output id; every merge and write targets it
    pub fn require_output(&self) -> Result<&str> {
        self.output_id
            .as_deref()
            .ok_or_else(|| WireError::InvalidDescriptor(format!("'{}' has no output", self.name)))
    }

    /// Require the trigger id for click-driven execution
    pub fn require_trigger(&self) -> Result<&str> {
        self.trigger_id
            .as_deref()
            .ok_or_else(|| WireError::InvalidDescriptor(format!("'{}' has no trigger", self.name)))
    }
}
