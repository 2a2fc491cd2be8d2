//! Input gathering - reads a value out of every bound input

use crate::canvas::{Canvas, ComponentKind, Node};
use crate::core::config::RuntimeConfig;
use crate::core::error::Result;
use crate::descriptor::{FunctionalityDescriptor, UploadedDocument};
use crate::resolver::{ComponentResolver, ResolveContext};
use crate::table::TableData;

/// Values extracted from the inputs of one execution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectedInput {
    /// One entry per input that produced text, in input order
    pub parts: Vec<String>,
    /// Data URIs from image uploads
    pub images: Vec<String>,
}

impl CollectedInput {
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty() && self.images.is_empty()
    }

    /// Prompt body sent to the backend
    pub fn body(&self) -> String {
        self.parts.join("\n")
    }
}

/// Resolve every input id and extract its value.
///
/// Uploaded document ids bypass the resolver. Any other id that does not
/// resolve aborts collection with `ResolutionFailure`.
pub fn collect_inputs(
    descriptor: &FunctionalityDescriptor,
    canvas: &Canvas,
    resolver: &ComponentResolver,
    config: &RuntimeConfig,
) -> Result<CollectedInput> {
    let mut collected = CollectedInput::default();

    for input_id in &descriptor.input_ids {
        if let Some(document) = descriptor.document(input_id) {
            if let Some(text) = document_text(document, descriptor.input_columns(input_id)) {
                collected.parts.push(text);
            }
            continue;
        }

        let ctx = ResolveContext {
            canvas,
            config,
            last_known: descriptor.last_known_position(input_id),
        };
        let handle = resolver.resolve_required(input_id, &ctx)?;
        let Some(node) = canvas.get(&handle) else {
            continue;
        };
        extract(node, descriptor.input_columns(input_id), &mut collected);
    }

    tracing::debug!(
        "Collected {} input values and {} images for '{}'",
        collected.parts.len(),
        collected.images.len(),
        descriptor.name
    );
    Ok(collected)
}

fn extract(node: &Node, columns: &[String], collected: &mut CollectedInput) {
    let props = &node.props;
    match props.kind {
        ComponentKind::Input | ComponentKind::TextArea => push_trimmed(&props.value, collected),
        ComponentKind::Checkbox => {
            collected
                .parts
                .push(if props.checked { "Yes" } else { "No" }.to_string());
        }
        ComponentKind::ImageUpload => collected.images.extend(props.images.iter().cloned()),
        ComponentKind::Table => {
            if let Some(table) = &props.table {
                let rows = table.format_rows(selected_or_all(table, columns));
                if !rows.is_empty() {
                    collected.parts.push(rows.join("\n"));
                }
            }
        }
        ComponentKind::AiComponent
        | ComponentKind::Text
        | ComponentKind::Button
        | ComponentKind::Container => push_trimmed(&props.text, collected),
    }
}

fn push_trimmed(value: &str, collected: &mut CollectedInput) {
    let value = value.trim();
    if !value.is_empty() {
        collected.parts.push(value.to_string());
    }
}

/// No column selection means every column
fn selected_or_all<'a>(table: &'a TableData, columns: &'a [String]) -> &'a [String] {
    if columns.is_empty() {
        table.headers.as_slice()
    } else {
        columns
    }
}

fn document_text(document: &UploadedDocument, columns: &[String]) -> Option<String> {
    let rows = document
        .data
        .format_rows(selected_or_all(&document.data, columns));
    if rows.is_empty() {
        return None;
    }
    Some(format!("{}\n{}", document.summary(), rows.join("\n")))
}

/// Per-row input taken from the output table's own non-output columns.
///
/// Used when no bound input produced a value but the output table already
/// has rows to fill.
pub fn tabular_fallback(output_table: &TableData, output_columns: &[String]) -> Vec<String> {
    if output_columns.is_empty() || output_table.rows.is_empty() {
        return Vec::new();
    }
    let context: Vec<String> = output_table
        .headers
        .iter()
        .filter(|h| !output_columns.contains(h))
        .cloned()
        .collect();
    output_table.format_rows(&context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{AppState, ElementSpec};
    use crate::core::error::WireError;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn people() -> TableData {
        TableData::new(
            strings(&["Name", "Age", "Status"]),
            vec![strings(&["Alice", "30", ""]), strings(&["Bob", "41", ""])],
        )
    }

    fn canvas() -> Canvas {
        Canvas::mount(
            &[
                ElementSpec::new("input-1", ComponentKind::Input).with_value("  hello  "),
                ElementSpec::new("checkbox-1", ComponentKind::Checkbox).with_checked(true),
                ElementSpec::new("image-upload-1", ComponentKind::ImageUpload)
                    .with_images(strings(&["data:image/png;base64,AAAA"])),
                ElementSpec::new("table-1", ComponentKind::Table).with_table(people()),
                ElementSpec::new("input-2", ComponentKind::Input),
            ],
            &AppState::new(),
        )
    }

    fn descriptor(inputs: &[&str]) -> FunctionalityDescriptor {
        FunctionalityDescriptor {
            name: "test".into(),
            input_ids: strings(inputs),
            ..Default::default()
        }
    }

    fn collect(descriptor: &FunctionalityDescriptor) -> Result<CollectedInput> {
        collect_inputs(
            descriptor,
            &canvas(),
            &ComponentResolver::new(),
            &RuntimeConfig::default(),
        )
    }

    #[test]
    fn test_values_by_kind() {
        let mut d = descriptor(&["input-1", "checkbox-1", "image-upload-1", "table-1"]);
        d.input_selected_columns
            .insert("table-1".into(), strings(&["Name", "Age"]));

        let collected = collect(&d).unwrap();

        assert_eq!(
            collected.parts,
            vec![
                "hello".to_string(),
                "Yes".to_string(),
                "[Name: Alice], [Age: 30]\n[Name: Bob], [Age: 41]".to_string(),
            ]
        );
        assert_eq!(collected.images, strings(&["data:image/png;base64,AAAA"]));
    }

    #[test]
    fn test_unchecked_checkbox_is_no() {
        let canvas = Canvas::mount(
            &[ElementSpec::new("checkbox-1", ComponentKind::Checkbox)],
            &AppState::new(),
        );
        let collected = collect_inputs(
            &descriptor(&["checkbox-1"]),
            &canvas,
            &ComponentResolver::new(),
            &RuntimeConfig::default(),
        )
        .unwrap();

        assert_eq!(collected.parts, strings(&["No"]));
    }

    #[test]
    fn test_empty_field_yields_nothing() {
        let collected = collect(&descriptor(&["input-2"])).unwrap();
        assert!(collected.is_empty());
    }

    #[test]
    fn test_unresolvable_input_aborts() {
        let result = collect(&descriptor(&["input-1", "missing-thing"]));
        assert!(matches!(result, Err(WireError::ResolutionFailure(_))));
    }

    #[test]
    fn test_document_input_gets_summary() {
        let mut d = descriptor(&["doc-1"]);
        d.uploaded_documents.push(UploadedDocument {
            id: "doc-1".into(),
            name: "people.csv".into(),
            data: people(),
        });
        d.input_selected_columns.insert("doc-1".into(), strings(&["Name"]));

        let collected = collect(&d).unwrap();
        assert_eq!(
            collected.body(),
            "Document \"people.csv\" (3 columns, 2 rows)\n[Name: Alice]\n[Name: Bob]"
        );
    }

    #[test]
    fn test_tabular_fallback_uses_context_columns() {
        let rows = tabular_fallback(&people(), &strings(&["Status"]));
        assert_eq!(rows, strings(&["[Name: Alice], [Age: 30]", "[Name: Bob], [Age: 41]"]));

        assert!(tabular_fallback(&TableData::default(), &strings(&["Status"])).is_empty());
        assert!(tabular_fallback(&people(), &[]).is_empty());
    }
}
