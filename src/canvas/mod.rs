//! Live component tree
//!
//! The canvas is an arena of elements stored in document (pre-)order. It is
//! rebuilt on every mount from the editor's element specs plus the keyed
//! application state; each mount bumps the generation so handles taken from
//! an earlier mount are detectably stale.

pub mod element;
pub mod events;
pub mod state;

pub use element::{ComponentKind, ElementProps, ElementSpec};
pub use events::{Listener, Subscription, TriggerRegistry};
pub use state::{AppState, ComponentState};

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Index of a node within one canvas generation
pub type NodeId = usize;

#[derive(Debug, Clone)]
pub struct Node {
    pub props: ElementProps,
    pub parent: Option<NodeId>,
    /// One past the last node of this node's subtree
    subtree_end: NodeId,
    /// `disabled` as authored, before loading state is rendered over it
    authored_disabled: bool,
}

/// Resolved, live reference to an element plus its type classification
#[derive(Debug, Clone, PartialEq)]
pub struct Handle {
    pub node: NodeId,
    pub generation: u64,
    /// Live id of the element
    pub id: String,
    pub kind: ComponentKind,
    /// Id of the enclosing composite AI container, for internal components
    pub parent: Option<String>,
}

impl Handle {
    pub fn is_internal(&self) -> bool {
        self.parent.is_some()
    }
}

#[derive(Debug, Default)]
pub struct Canvas {
    nodes: Vec<Node>,
    generation: u64,
}

impl Canvas {
    /// Build a canvas from element specs and render the application state into it
    pub fn mount(specs: &[ElementSpec], state: &AppState) -> Self {
        let mut canvas = Canvas::default();
        canvas.remount(specs, state);
        canvas
    }

    /// Replace the tree; all handles from the previous generation become stale
    pub fn remount(&mut self, specs: &[ElementSpec], state: &AppState) {
        self.nodes.clear();
        for spec in specs {
            self.push(spec, None);
        }
        self.generation += 1;
        self.apply_state(state);
        tracing::debug!(
            "Mounted canvas generation {} with {} nodes",
            self.generation,
            self.nodes.len()
        );
    }

    fn push(&mut self, spec: &ElementSpec, parent: Option<NodeId>) {
        let id = self.nodes.len();
        self.nodes.push(Node {
            props: spec.props.clone(),
            parent,
            subtree_end: id + 1,
            authored_disabled: spec.props.disabled,
        });
        for child in &spec.children {
            self.push(child, Some(id));
        }
        self.nodes[id].subtree_end = self.nodes.len();
    }

    /// Render keyed state (content, internal child content, loading) onto the tree
    pub fn apply_state(&mut self, state: &AppState) {
        for index in 0..self.nodes.len() {
            let container = self.container_of(index).map(|c| self.nodes[c].props.id.clone());
            let node = &mut self.nodes[index];
            let id = node.props.id.clone();

            if let Some(component) = state.get(&id) {
                if node.props.kind.is_tabular() {
                    if let Some(table) = &component.table {
                        node.props.table = Some(table.clone());
                    }
                    node.props.status = component.status.clone();
                }
                if let Some(text) = &component.text {
                    set_content(&mut node.props, text);
                }
            }

            if let Some(text) = container.and_then(|parent| state.child_text(&parent, &id)) {
                set_content(&mut node.props, text);
            }

            node.props.loading = state.is_loading(&id);
            node.props.disabled = node.authored_disabled || node.props.loading;
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    /// All nodes in document order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate()
    }

    /// Strict descendants of `id` in document order
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &Node)> {
        let end = self.nodes[id].subtree_end;
        self.nodes[id + 1..end]
            .iter()
            .enumerate()
            .map(move |(offset, node)| (id + 1 + offset, node))
    }

    /// Nearest ancestor that is a composite AI container
    pub fn container_of(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.nodes[id].parent;
        while let Some(parent) = current {
            if self.nodes[parent].props.kind == ComponentKind::AiComponent {
                return Some(parent);
            }
            current = self.nodes[parent].parent;
        }
        None
    }

    pub fn handle(&self, id: NodeId) -> Handle {
        let props = &self.nodes[id].props;
        Handle {
            node: id,
            generation: self.generation,
            id: props.id.clone(),
            kind: props.kind,
            parent: self.container_of(id).map(|c| self.nodes[c].props.id.clone()),
        }
    }

    /// Look up a handle's node; `None` once the canvas has been remounted
    pub fn get(&self, handle: &Handle) -> Option<&Node> {
        if handle.generation != self.generation {
            return None;
        }
        self.nodes.get(handle.node)
    }

    pub fn get_mut(&mut self, handle: &Handle) -> Option<&mut Node> {
        if handle.generation != self.generation {
            return None;
        }
        self.nodes.get_mut(handle.node)
    }
}

fn set_content(props: &mut ElementProps, text: &str) {
    if props.kind.is_field() {
        props.value = text.to_string();
    } else {
        props.text = text.to_string();
    }
}

/// Shared view: live canvas, keyed state and trigger listeners.
///
/// Cloning is cheap; all clones observe the same view.
#[derive(Clone, Default)]
pub struct Surface {
    canvas: Arc<RwLock<Canvas>>,
    state: Arc<RwLock<AppState>>,
    triggers: TriggerRegistry,
}

impl Surface {
    pub fn new(specs: &[ElementSpec]) -> Self {
        let surface = Self::default();
        surface.remount(specs);
        surface
    }

    /// Rebuild the live tree from specs, rendering the current state into it
    pub fn remount(&self, specs: &[ElementSpec]) {
        let state = self.state();
        self.canvas_mut().remount(specs, &state);
    }

    pub fn canvas(&self) -> RwLockReadGuard<'_, Canvas> {
        self.canvas.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn canvas_mut(&self) -> RwLockWriteGuard<'_, Canvas> {
        self.canvas.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> RwLockReadGuard<'_, AppState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state_mut(&self) -> RwLockWriteGuard<'_, AppState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn triggers(&self) -> &TriggerRegistry {
        &self.triggers
    }

    /// Re-render the current state onto the live tree
    pub fn render(&self) {
        let state = self.state();
        self.canvas_mut().apply_state(&state);
    }

    /// Set or clear the loading indication for an id and re-render
    pub fn set_loading(&self, id: &str, loading: bool) {
        self.state_mut().set_loading(id, loading);
        self.render();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableData;

    fn specs() -> Vec<ElementSpec> {
        vec![
            ElementSpec::new("input-1", ComponentKind::Input).with_value("hello"),
            ElementSpec::new("ai-1", ComponentKind::AiComponent)
                .with_class("ai-component")
                .with_child(
                    ElementSpec::new("wrapper", ComponentKind::Container)
                        .with_child(ElementSpec::new("summary", ComponentKind::Text)),
                ),
            ElementSpec::new("button-1", ComponentKind::Button).with_text("Run"),
        ]
    }

    #[test]
    fn test_document_order_and_descendants() {
        let canvas = Canvas::mount(&specs(), &AppState::new());
        let ids: Vec<&str> = canvas.iter().map(|(_, n)| n.props.id.as_str()).collect();
        assert_eq!(ids, ["input-1", "ai-1", "wrapper", "summary", "button-1"]);

        let inner: Vec<&str> = canvas
            .descendants(1)
            .map(|(_, n)| n.props.id.as_str())
            .collect();
        assert_eq!(inner, ["wrapper", "summary"]);
    }

    #[test]
    fn test_internal_handle_has_parent() {
        let canvas = Canvas::mount(&specs(), &AppState::new());
        let handle = canvas.handle(3);
        assert_eq!(handle.id, "summary");
        assert_eq!(handle.parent.as_deref(), Some("ai-1"));
        assert!(!canvas.handle(0).is_internal());
    }

    #[test]
    fn test_remount_invalidates_handles() {
        let mut canvas = Canvas::mount(&specs(), &AppState::new());
        let handle = canvas.handle(0);
        assert!(canvas.get(&handle).is_some());

        canvas.remount(&specs(), &AppState::new());
        assert!(canvas.get(&handle).is_none());
    }

    #[test]
    fn test_state_survives_remount() {
        let surface = Surface::new(&specs());
        {
            let mut state = surface.state_mut();
            state.set_text("input-1", "from state");
            state.set_child_text("ai-1", "summary", "written");
        }
        surface.remount(&specs());

        let canvas = surface.canvas();
        assert_eq!(canvas.node(0).props.value, "from state");
        assert_eq!(canvas.node(3).props.text, "written");
    }

    #[test]
    fn test_table_state_rendered() {
        let table_spec = vec![ElementSpec::new("table-1", ComponentKind::Table)];
        let mut state = AppState::new();
        state.set_table("table-1", TableData::new(vec!["A".into()], vec![vec!["1".into()]]));

        let canvas = Canvas::mount(&table_spec, &state);
        assert_eq!(canvas.node(0).props.table.as_ref().unwrap().rows.len(), 1);
    }

    #[test]
    fn test_loading_disables_and_restores() {
        let surface = Surface::new(&specs());
        surface.set_loading("button-1", true);
        {
            let canvas = surface.canvas();
            assert!(canvas.node(4).props.loading);
            assert!(canvas.node(4).props.disabled);
        }

        surface.set_loading("button-1", false);
        let canvas = surface.canvas();
        assert!(!canvas.node(4).props.loading);
        assert!(!canvas.node(4).props.disabled);
        assert_eq!(canvas.node(4).props.text, "Run");
    }
}
