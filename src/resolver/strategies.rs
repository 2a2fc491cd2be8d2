//! Individual resolution strategies
//!
//! Each strategy is a pure function over the live tree. Within a strategy the
//! first match in document order wins.

use super::ResolveContext;
use crate::canvas::{Canvas, ComponentKind, Handle, Node, NodeId};

/// 1. Exact id match
pub fn exact_id(id: &str, ctx: &ResolveContext<'_>) -> Option<Handle> {
    find(ctx.canvas, |node| node.props.id == id)
}

/// 2. Reserved run-prefix convention, in either direction
pub fn run_prefix(id: &str, ctx: &ResolveContext<'_>) -> Option<Handle> {
    let prefix = ctx.config.run_prefix.as_str();
    if prefix.is_empty() {
        return None;
    }

    let candidate = match id.strip_prefix(prefix) {
        Some(bare) => bare.to_string(),
        None => format!("{}{}", prefix, id),
    };
    find(ctx.canvas, |node| node.props.id == candidate)
}

/// 3. Coarse type token (text before the first separator) against kind and class tokens
pub fn type_and_name(id: &str, ctx: &ResolveContext<'_>) -> Option<Handle> {
    let (token, _) = id.split_once(['-', '_'])?;
    let token = token.to_lowercase();
    if token.len() < 2 {
        return None;
    }

    find(ctx.canvas, |node| {
        node.props.kind.as_str().contains(&token)
            || node
                .props
                .classes
                .iter()
                .any(|class| class.to_lowercase().contains(&token))
    })
}

/// 4. Element whose center lies within the configured radius of the last known position
pub fn proximity(_id: &str, ctx: &ResolveContext<'_>) -> Option<Handle> {
    let position = ctx.last_known?;
    let radius = ctx.config.proximity_radius;

    find(ctx.canvas, |node| {
        let bounds = node.props.bounds;
        bounds.width > 0.0
            && bounds.height > 0.0
            && bounds.center().distance(&position) <= radius
    })
}

/// 5. Internal component: locate the parent composite, then search its subtree
pub fn internal_component(id: &str, ctx: &ResolveContext<'_>) -> Option<Handle> {
    let canvas = ctx.canvas;
    let config = ctx.config;

    let containers: Vec<NodeId> = canvas
        .iter()
        .filter(|(_, node)| {
            node.props.kind == ComponentKind::AiComponent
                || node.props.has_class(&config.ai_container_class)
        })
        .map(|(index, _)| index)
        .collect();

    // Prefer containers whose id prefixes the target id; fall back to all of them
    let prefixed: Vec<NodeId> = containers
        .iter()
        .copied()
        .filter(|&c| {
            let parent_id = &canvas.node(c).props.id;
            id.len() > parent_id.len() && id.starts_with(parent_id.as_str())
        })
        .collect();
    let candidates = if prefixed.is_empty() { containers } else { prefixed };

    for container in candidates {
        let parent_id = canvas.node(container).props.id.clone();
        let local = local_id(id, &parent_id);

        let hit = canvas
            .descendants(container)
            .find(|(_, node)| {
                node.props.id == id
                    || matches_attribute(node, &config.internal_id_attribute, id)
                    || matches_attribute(node, &config.internal_id_attribute, local)
            })
            .map(|(index, _)| index)
            .or_else(|| {
                canvas
                    .descendants(container)
                    .filter(|(_, node)| node.props.has_class(&config.secondary_container_class))
                    .find_map(|(inner, _)| {
                        canvas
                            .descendants(inner)
                            .find(|(_, node)| {
                                node.props.id == local
                                    || matches_attribute(node, &config.internal_id_attribute, local)
                            })
                            .map(|(index, _)| index)
                    })
            });

        if let Some(index) = hit {
            let mut handle = canvas.handle(index);
            handle.parent = Some(parent_id);
            return Some(handle);
        }
    }

    None
}

/// 6. Ids compared with separators stripped and case folded
pub fn normalized_id(id: &str, ctx: &ResolveContext<'_>) -> Option<Handle> {
    let target = normalize(id);
    if target.is_empty() {
        return None;
    }
    find(ctx.canvas, |node| normalize(&node.props.id) == target)
}

/// 7. Any element whose id, attribute value or class token contains the target
pub fn global_scan(id: &str, ctx: &ResolveContext<'_>) -> Option<Handle> {
    if id.is_empty() {
        return None;
    }
    find(ctx.canvas, |node| {
        node.props.id.contains(id)
            || node.props.attributes.values().any(|v| v.contains(id))
            || node.props.classes.iter().any(|c| c.contains(id))
    })
}

fn find(canvas: &Canvas, predicate: impl Fn(&Node) -> bool) -> Option<Handle> {
    canvas
        .iter()
        .find(|(_, node)| predicate(node))
        .map(|(index, _)| canvas.handle(index))
}

fn matches_attribute(node: &Node, attribute: &str, value: &str) -> bool {
    node.props.attributes.get(attribute).is_some_and(|v| v == value)
}

/// Child part of an internal id named `<parent><separator><child>`
fn local_id<'a>(id: &'a str, parent_id: &str) -> &'a str {
    id.strip_prefix(parent_id)
        .map(|rest| rest.trim_start_matches(['-', '_', ':', '/']))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(id)
}

fn normalize(id: &str) -> String {
    id.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{AppState, ComponentKind, ElementSpec};
    use crate::core::config::RuntimeConfig;
    use crate::core::types::{Rect, Vec2};

    fn ctx<'a>(canvas: &'a Canvas, config: &'a RuntimeConfig) -> ResolveContext<'a> {
        ResolveContext {
            canvas,
            config,
            last_known: None,
        }
    }

    fn mount(specs: Vec<ElementSpec>) -> Canvas {
        Canvas::mount(&specs, &AppState::new())
    }

    #[test]
    fn test_exact_id() {
        let canvas = mount(vec![
            ElementSpec::new("input-1", ComponentKind::Input),
            ElementSpec::new("input-2", ComponentKind::Input),
        ]);
        let config = RuntimeConfig::default();

        assert_eq!(exact_id("input-2", &ctx(&canvas, &config)).unwrap().node, 1);
        assert!(exact_id("input-3", &ctx(&canvas, &config)).is_none());
    }

    #[test]
    fn test_run_prefix_both_directions() {
        let canvas = mount(vec![
            ElementSpec::new("run-input-1", ComponentKind::Input),
            ElementSpec::new("button-1", ComponentKind::Button),
        ]);
        let config = RuntimeConfig::default();

        assert_eq!(run_prefix("input-1", &ctx(&canvas, &config)).unwrap().id, "run-input-1");
        assert_eq!(run_prefix("run-button-1", &ctx(&canvas, &config)).unwrap().id, "button-1");
    }

    #[test]
    fn test_type_and_name_by_kind_and_class() {
        let canvas = mount(vec![
            ElementSpec::new("a", ComponentKind::Text),
            ElementSpec::new("b", ComponentKind::Checkbox),
            ElementSpec::new("c", ComponentKind::Container).with_class("Fancy-Slider"),
        ]);
        let config = RuntimeConfig::default();

        assert_eq!(type_and_name("checkbox-99", &ctx(&canvas, &config)).unwrap().id, "b");
        assert_eq!(type_and_name("slider_4", &ctx(&canvas, &config)).unwrap().id, "c");
        assert!(type_and_name("checkbox", &ctx(&canvas, &config)).is_none());
    }

    #[test]
    fn test_proximity_radius() {
        let canvas = mount(vec![
            ElementSpec::new("far", ComponentKind::Button).with_bounds(Rect::new(500.0, 500.0, 20.0, 20.0)),
            ElementSpec::new("near", ComponentKind::Button).with_bounds(Rect::new(100.0, 100.0, 20.0, 20.0)),
        ]);
        let config = RuntimeConfig::default();
        let mut context = ctx(&canvas, &config);

        assert!(proximity("button-1", &context).is_none());

        context.last_known = Some(Vec2::new(130.0, 120.0));
        assert_eq!(proximity("button-1", &context).unwrap().id, "near");

        context.last_known = Some(Vec2::new(300.0, 300.0));
        assert!(proximity("button-1", &context).is_none());
    }

    #[test]
    fn test_internal_component_by_attribute_and_secondary_container() {
        let canvas = mount(vec![
            ElementSpec::new("ai-7", ComponentKind::AiComponent).with_child(
                ElementSpec::new("ai-7-body", ComponentKind::Container)
                    .with_class("ai-generated-content")
                    .with_child(ElementSpec::new("result", ComponentKind::Text))
                    .with_child(
                        ElementSpec::new("x", ComponentKind::Input)
                            .with_attribute("data-internal-id", "query"),
                    ),
            ),
        ]);
        let config = RuntimeConfig::default();

        let by_attr = internal_component("query", &ctx(&canvas, &config)).unwrap();
        assert_eq!(by_attr.id, "x");
        assert_eq!(by_attr.parent.as_deref(), Some("ai-7"));

        let by_local = internal_component("ai-7-result", &ctx(&canvas, &config)).unwrap();
        assert_eq!(by_local.id, "result");
        assert!(by_local.is_internal());
    }

    #[test]
    fn test_internal_component_class_only_container() {
        let canvas = mount(vec![ElementSpec::new("block", ComponentKind::Container)
            .with_class("ai-component")
            .with_child(ElementSpec::new("inner", ComponentKind::Text))]);
        let config = RuntimeConfig::default();

        let handle = internal_component("inner", &ctx(&canvas, &config)).unwrap();
        assert_eq!(handle.parent.as_deref(), Some("block"));
    }

    #[test]
    fn test_normalized_id() {
        let canvas = mount(vec![ElementSpec::new("Text_Area-2", ComponentKind::TextArea)]);
        let config = RuntimeConfig::default();

        assert!(normalized_id("textarea2", &ctx(&canvas, &config)).is_some());
        assert!(normalized_id("--", &ctx(&canvas, &config)).is_none());
    }

    #[test]
    fn test_global_scan() {
        let canvas = mount(vec![
            ElementSpec::new("wrapper", ComponentKind::Container),
            ElementSpec::new("el", ComponentKind::Text).with_attribute("data-component-id", "output-42"),
        ]);
        let config = RuntimeConfig::default();

        assert_eq!(global_scan("output-42", &ctx(&canvas, &config)).unwrap().id, "el");
        assert!(global_scan("", &ctx(&canvas, &config)).is_none());
    }
}
