//! Keyed application state
//!
//! Output writes land here first; every mount of the canvas renders from this
//! map, so written results survive remounts.

use crate::table::TableData;
use ahash::{AHashMap, AHashSet};

/// State stored under one component id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentState {
    pub text: Option<String>,
    pub table: Option<TableData>,
    /// Text of internal components, keyed by child id (composite parents only)
    pub children: AHashMap<String, String>,
    /// Diagnostic shown in place of a table's results; cleared by the next table write
    pub status: Option<String>,
}

/// Table as it was before the first of the in-flight executions that target it
#[derive(Debug, Clone)]
struct PreCall {
    table: TableData,
    holders: usize,
}

#[derive(Debug, Default)]
pub struct AppState {
    components: AHashMap<String, ComponentState>,
    loading: AHashSet<String>,
    pre_call: AHashMap<String, PreCall>,
    revision: u64,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&ComponentState> {
        self.components.get(id)
    }

    pub fn text(&self, id: &str) -> Option<&str> {
        self.components.get(id).and_then(|s| s.text.as_deref())
    }

    pub fn table(&self, id: &str) -> Option<&TableData> {
        self.components.get(id).and_then(|s| s.table.as_ref())
    }

    pub fn child_text(&self, parent_id: &str, child_id: &str) -> Option<&str> {
        self.components
            .get(parent_id)
            .and_then(|s| s.children.get(child_id))
            .map(String::as_str)
    }

    pub fn set_text(&mut self, id: &str, text: impl Into<String>) {
        self.entry(id).text = Some(text.into());
        self.revision += 1;
    }

    pub fn set_child_text(&mut self, parent_id: &str, child_id: &str, text: impl Into<String>) {
        self.entry(parent_id)
            .children
            .insert(child_id.to_string(), text.into());
        self.revision += 1;
    }

    pub fn set_table(&mut self, id: &str, table: TableData) {
        let entry = self.entry(id);
        entry.table = Some(table);
        entry.status = None;
        self.revision += 1;
    }

    pub fn status(&self, id: &str) -> Option<&str> {
        self.components.get(id).and_then(|s| s.status.as_deref())
    }

    pub fn set_status(&mut self, id: &str, status: impl Into<String>) {
        self.entry(id).status = Some(status.into());
        self.revision += 1;
    }

    /// Pre-call table held for `output_id` by an execution still in flight
    pub fn pre_call_table(&self, output_id: &str) -> Option<&TableData> {
        self.pre_call.get(output_id).map(|p| &p.table)
    }

    /// Hold the pre-call table for `output_id` and return the one to use as base.
    ///
    /// The first holder's table wins; later holders get it back instead of
    /// their own, which may already show another execution's loading rows.
    pub fn hold_pre_call(&mut self, output_id: &str, table: TableData) -> TableData {
        let held = self
            .pre_call
            .entry(output_id.to_string())
            .or_insert(PreCall { table, holders: 0 });
        held.holders += 1;
        held.table.clone()
    }

    /// Drop one hold; the table is forgotten once the last holder releases it
    pub fn release_pre_call(&mut self, output_id: &str) {
        if let Some(held) = self.pre_call.get_mut(output_id) {
            held.holders = held.holders.saturating_sub(1);
            if held.holders == 0 {
                self.pre_call.remove(output_id);
            }
        }
    }

    pub fn set_loading(&mut self, id: &str, loading: bool) {
        if loading {
            self.loading.insert(id.to_string());
        } else {
            self.loading.remove(id);
        }
    }

    pub fn is_loading(&self, id: &str) -> bool {
        self.loading.contains(id)
    }

    /// Count of content writes, bumped on every text or table update
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn entry(&mut self, id: &str) -> &mut ComponentState {
        self.components.entry(id.to_string()).or_default()
    }
}
