//! Element model for the live component tree

use crate::core::types::Rect;
use crate::table::TableData;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Type classification of a live element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
    #[default]
    Input,
    TextArea,
    Checkbox,
    ImageUpload,
    Table,
    /// Composite AI-generated block whose children are internal components
    AiComponent,
    Text,
    Button,
    Container,
}

impl ComponentKind {
    /// Classification token, as used by the type-and-name heuristic
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Input => "input",
            ComponentKind::TextArea => "textarea",
            ComponentKind::Checkbox => "checkbox",
            ComponentKind::ImageUpload => "image-upload",
            ComponentKind::Table => "table",
            ComponentKind::AiComponent => "ai-component",
            ComponentKind::Text => "text",
            ComponentKind::Button => "button",
            ComponentKind::Container => "container",
        }
    }

    /// Field-like kinds hold their content in `value` rather than `text`
    pub fn is_field(&self) -> bool {
        matches!(self, ComponentKind::Input | ComponentKind::TextArea)
    }

    pub fn is_tabular(&self) -> bool {
        matches!(self, ComponentKind::Table)
    }
}

/// Properties of a single element, without its children
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementProps {
    pub id: String,
    pub kind: ComponentKind,
    pub classes: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub bounds: Rect,
    /// Raw value of a field
    pub value: String,
    pub checked: bool,
    /// Uploaded images as data URIs
    pub images: Vec<String>,
    pub table: Option<TableData>,
    /// Diagnostic rendered in place of a table's rows
    pub status: Option<String>,
    /// Visible text content
    pub text: String,
    pub disabled: bool,
    /// Spinner shown in place of the content
    pub loading: bool,
}

impl ElementProps {
    pub fn new(id: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            id: id.into(),
            kind,
            ..Default::default()
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// Serializable element tree as produced by the editor's renderer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementSpec {
    #[serde(flatten)]
    pub props: ElementProps,
    #[serde(default)]
    pub children: Vec<ElementSpec>,
}

impl ElementSpec {
    pub fn new(id: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            props: ElementProps::new(id, kind),
            children: Vec::new(),
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.props.classes.push(class.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.props.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.props.bounds = bounds;
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.props.value = value.into();
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.props.text = text.into();
        self
    }

    pub fn with_checked(mut self, checked: bool) -> Self {
        self.props.checked = checked;
        self
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.props.images = images;
        self
    }

    pub fn with_table(mut self, table: TableData) -> Self {
        self.props.table = Some(table);
        self
    }

    pub fn with_child(mut self, child: ElementSpec) -> Self {
        self.children.push(child);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_from_json() {
        let json = r#"{
            "id": "ai-component-1",
            "kind": "ai-component",
            "classes": ["ai-component"],
            "children": [
                {"id": "summary", "kind": "text", "attributes": {"data-internal-id": "summary"}}
            ]
        }"#;
        let spec: ElementSpec = serde_json::from_str(json).unwrap();

        assert_eq!(spec.props.kind, ComponentKind::AiComponent);
        assert!(spec.props.has_class("ai-component"));
        assert_eq!(spec.children.len(), 1);
        assert_eq!(spec.children[0].props.kind, ComponentKind::Text);
    }

    #[test]
    fn test_kind_tokens() {
        assert_eq!(ComponentKind::ImageUpload.as_str(), "image-upload");
        assert!(ComponentKind::TextArea.is_field());
        assert!(!ComponentKind::Text.is_field());
        assert!(ComponentKind::Table.is_tabular());
    }
}
