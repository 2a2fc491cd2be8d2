//! Component resolution - maps logical ids from descriptors to live handles
//!
//! Descriptors keep the ids that were current when the binding was saved,
//! while every re-render may regenerate the concrete tree. Resolution tries a
//! fixed, ordered list of strategies and returns the first hit; there is no
//! ranking across strategies.

pub mod strategies;

use crate::canvas::{Canvas, Handle};
use crate::core::config::RuntimeConfig;
use crate::core::error::{Result, WireError};
use crate::core::types::Vec2;
use derive_more::Display;

/// Read-only inputs shared by every strategy
pub struct ResolveContext<'a> {
    pub canvas: &'a Canvas,
    pub config: &'a RuntimeConfig,
    /// Last canvas position recorded for the id, if any
    pub last_known: Option<Vec2>,
}

pub type Strategy = fn(&str, &ResolveContext<'_>) -> Option<Handle>;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    #[display(fmt = "exact-id")]
    ExactId,
    #[display(fmt = "run-prefix")]
    RunPrefix,
    #[display(fmt = "type-and-name")]
    TypeAndName,
    #[display(fmt = "proximity")]
    Proximity,
    #[display(fmt = "internal-component")]
    InternalComponent,
    #[display(fmt = "normalized-id")]
    NormalizedId,
    #[display(fmt = "global-scan")]
    GlobalScan,
}

/// A successful resolution and the strategy that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub handle: Handle,
    pub strategy: StrategyKind,
}

/// Ordered, first-match-wins composition of resolution strategies
pub struct ComponentResolver {
    strategies: Vec<(StrategyKind, Strategy)>,
}

impl Default for ComponentResolver {
    fn default() -> Self {
        Self {
            strategies: vec![
                (StrategyKind::ExactId, strategies::exact_id as Strategy),
                (StrategyKind::RunPrefix, strategies::run_prefix as Strategy),
                (StrategyKind::TypeAndName, strategies::type_and_name as Strategy),
                (StrategyKind::Proximity, strategies::proximity as Strategy),
                (StrategyKind::InternalComponent, strategies::internal_component as Strategy),
                (StrategyKind::NormalizedId, strategies::normalized_id as Strategy),
                (StrategyKind::GlobalScan, strategies::global_scan as Strategy),
            ],
        }
    }
}

impl ComponentResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver with a custom strategy list, tried in the given order
    pub fn with_strategies(strategies: Vec<(StrategyKind, Strategy)>) -> Self {
        Self { strategies }
    }

    pub fn resolve(&self, id: &str, ctx: &ResolveContext<'_>) -> Option<Resolution> {
        let resolution = self.strategies.iter().find_map(|(kind, strategy)| {
            strategy(id, ctx).map(|handle| Resolution {
                handle,
                strategy: *kind,
            })
        });

        match &resolution {
            Some(r) => tracing::debug!("Resolved '{}' to '{}' via {}", id, r.handle.id, r.strategy),
            None => tracing::debug!("No live component for '{}'", id),
        }
        resolution
    }

    /// Resolve or fail with `ResolutionFailure`
    pub fn resolve_required(&self, id: &str, ctx: &ResolveContext<'_>) -> Result<Handle> {
        self.resolve(id, ctx)
            .map(|r| r.handle)
            .ok_or_else(|| WireError::ResolutionFailure(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{AppState, ComponentKind, ElementSpec};
    use crate::core::types::Rect;

    #[test]
    fn test_exact_match_beats_proximity() {
        let specs = vec![
            ElementSpec::new("near", ComponentKind::Button).with_bounds(Rect::new(0.0, 0.0, 40.0, 40.0)),
            ElementSpec::new("button-1", ComponentKind::Button)
                .with_bounds(Rect::new(900.0, 900.0, 40.0, 40.0)),
        ];
        let canvas = Canvas::mount(&specs, &AppState::new());
        let config = RuntimeConfig::default();
        let ctx = ResolveContext {
            canvas: &canvas,
            config: &config,
            last_known: Some(Vec2::new(20.0, 20.0)),
        };

        let resolution = ComponentResolver::new().resolve("button-1", &ctx).unwrap();
        assert_eq!(resolution.handle.id, "button-1");
        assert_eq!(resolution.strategy, StrategyKind::ExactId);
    }

    #[test]
    fn test_falls_through_to_later_strategies() {
        let specs = vec![ElementSpec::new("run-output-3", ComponentKind::Text)];
        let canvas = Canvas::mount(&specs, &AppState::new());
        let config = RuntimeConfig::default();
        let ctx = ResolveContext {
            canvas: &canvas,
            config: &config,
            last_known: None,
        };

        let resolution = ComponentResolver::new().resolve("output-3", &ctx).unwrap();
        assert_eq!(resolution.strategy, StrategyKind::RunPrefix);
    }

    #[test]
    fn test_unresolvable_is_resolution_failure() {
        let canvas = Canvas::mount(&[], &AppState::new());
        let config = RuntimeConfig::default();
        let ctx = ResolveContext {
            canvas: &canvas,
            config: &config,
            last_known: None,
        };

        let result = ComponentResolver::new().resolve_required("input-1", &ctx);
        assert!(matches!(result, Err(WireError::ResolutionFailure(id)) if id == "input-1"));
    }

    #[test]
    fn test_internal_ids_through_full_order() {
        let specs = vec![ElementSpec::new("ai-7", ComponentKind::AiComponent).with_child(
            ElementSpec::new("ai-7-body", ComponentKind::Container)
                .with_child(ElementSpec::new("result", ComponentKind::Text))
                .with_child(
                    ElementSpec::new("x", ComponentKind::Input).with_attribute("data-internal-id", "query"),
                ),
        )];
        let canvas = Canvas::mount(&specs, &AppState::new());
        let config = RuntimeConfig::default();
        let ctx = ResolveContext {
            canvas: &canvas,
            config: &config,
            last_known: None,
        };
        let resolver = ComponentResolver::new();

        // The "ai" type token matches the container before the internal lookup runs
        let prefixed = resolver.resolve("ai-7-result", &ctx).unwrap();
        assert_eq!(prefixed.strategy, StrategyKind::TypeAndName);
        assert_eq!(prefixed.handle.id, "ai-7");
        assert!(!prefixed.handle.is_internal());

        let by_attr = resolver.resolve("query", &ctx).unwrap();
        assert_eq!(by_attr.strategy, StrategyKind::InternalComponent);
        assert_eq!(by_attr.handle.id, "x");
        assert_eq!(by_attr.handle.parent.as_deref(), Some("ai-7"));
    }

    #[test]
    fn test_custom_strategy_order() {
        let specs = vec![ElementSpec::new("InputOne", ComponentKind::Input)];
        let canvas = Canvas::mount(&specs, &AppState::new());
        let config = RuntimeConfig::default();
        let ctx = ResolveContext {
            canvas: &canvas,
            config: &config,
            last_known: None,
        };

        let resolver = ComponentResolver::with_strategies(vec![(
            StrategyKind::NormalizedId,
            strategies::normalized_id as Strategy,
        )]);
        assert!(resolver.resolve("input-one", &ctx).is_some());
        assert!(resolver.resolve("input-two", &ctx).is_none());
    }
}
