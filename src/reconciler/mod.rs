//! Output reconciliation - decides how and where a finished result is written
//!
//! The keyed application state is the single source of truth: every write
//! goes there and the live tree is re-rendered from it. Tabular handles are
//! handed to the table merge engine; plain handles get a text write. Plain
//! text aimed at a tabular handle becomes its status line.

use crate::canvas::{ComponentKind, Handle, NodeId, Surface};
use crate::table::{merge_table_data, AiRow, TableData};

/// Result to be written to an output component
#[derive(Debug, Clone, PartialEq)]
pub enum OutputPayload {
    /// Plain text for text-capable outputs
    Text(String),
    /// AI rows to merge into `base`, the table as it was before the call
    Rows {
        base: TableData,
        rows: Vec<AiRow>,
        columns: Vec<String>,
    },
    /// A complete table written as-is (loading snapshots and reverts)
    Table(TableData),
}

#[derive(Debug, Clone)]
pub struct OutputReconciler {
    /// Also patch text into the live tree directly (compatibility shim only)
    mirror_to_live_tree: bool,
}

impl Default for OutputReconciler {
    fn default() -> Self {
        Self {
            mirror_to_live_tree: true,
        }
    }
}

impl OutputReconciler {
    pub fn new(mirror_to_live_tree: bool) -> Self {
        Self {
            mirror_to_live_tree,
        }
    }

    pub fn write_output(&self, surface: &Surface, handle: &Handle, payload: &OutputPayload) {
        if handle.kind.is_tabular() {
            self.write_table(surface, handle, payload);
        } else {
            let text = match payload {
                OutputPayload::Text(text) => text.clone(),
                OutputPayload::Rows { base, rows, columns } => {
                    let table = merge_table_data(base, rows, columns);
                    table.format_rows(&table.headers).join("\n")
                }
                OutputPayload::Table(table) => table.format_rows(&table.headers).join("\n"),
            };
            self.write_text(surface, handle, &text);
        }
    }

    fn write_table(&self, surface: &Surface, handle: &Handle, payload: &OutputPayload) {
        let table = match payload {
            OutputPayload::Rows { base, rows, columns } => merge_table_data(base, rows, columns),
            OutputPayload::Table(table) => table.clone(),
            OutputPayload::Text(message) => {
                // Rows stay as they are; the message shows as the table's status
                tracing::debug!("Status on tabular output '{}': {}", handle.id, message);
                surface.state_mut().set_status(&handle.id, message.as_str());
                surface.render();
                return;
            }
        };

        tracing::debug!(
            "Writing {} rows x {} columns to '{}'",
            table.rows.len(),
            table.headers.len(),
            handle.id
        );
        surface.state_mut().set_table(&handle.id, table);
        surface.render();
    }

    fn write_text(&self, surface: &Surface, handle: &Handle, text: &str) {
        {
            let mut state = surface.state_mut();
            state.set_text(&handle.id, text);
            // A parent-level re-render only picks up changes keyed by the parent
            if let Some(parent) = &handle.parent {
                state.set_child_text(parent, &handle.id, text);
            }
        }
        surface.render();

        if self.mirror_to_live_tree {
            mirror_text(surface, handle, text);
        }
        tracing::debug!("Wrote {} chars to '{}'", text.len(), handle.id);
    }
}

/// Compatibility shim: patch text-bearing descendants of the live node.
///
/// Not load-bearing. The state write above is what survives re-renders; this
/// only covers descendants the state render does not address.
fn mirror_text(surface: &Surface, handle: &Handle, text: &str) {
    let mut canvas = surface.canvas_mut();
    let Some(node) = canvas.get(handle) else {
        return;
    };
    if node.props.kind.is_field() {
        return;
    }

    let targets: Vec<NodeId> = canvas
        .descendants(handle.node)
        .filter(|(_, n)| n.props.kind == ComponentKind::Text)
        .map(|(index, _)| index)
        .collect();

    for index in targets {
        canvas.node_mut(index).props.text = text.to_string();
    }
}
