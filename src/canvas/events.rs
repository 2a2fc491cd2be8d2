//! Trigger subscriptions with explicit disposers

use ahash::AHashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

pub type Listener = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    by_component: AHashMap<String, Vec<(u64, Listener)>>,
}

/// Click listeners keyed by live component id
#[derive(Clone, Default)]
pub struct TriggerRegistry {
    inner: Arc<Mutex<Listeners>>,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; it stays active until the subscription is disposed or dropped
    pub fn subscribe(&self, component_id: &str, listener: Listener) -> Subscription {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.next_id += 1;
        let id = inner.next_id;
        inner
            .by_component
            .entry(component_id.to_string())
            .or_default()
            .push((id, listener));

        Subscription {
            registry: Arc::downgrade(&self.inner),
            component_id: component_id.to_string(),
            id,
        }
    }

    /// Invoke every listener for `component_id`, returning how many ran
    pub fn dispatch(&self, component_id: &str) -> usize {
        let listeners: Vec<Listener> = {
            let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner
                .by_component
                .get(component_id)
                .map(|ls| ls.iter().map(|(_, l)| Arc::clone(l)).collect())
                .unwrap_or_default()
        };

        for listener in &listeners {
            listener();
        }
        listeners.len()
    }

    pub fn listener_count(&self, component_id: &str) -> usize {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.by_component.get(component_id).map_or(0, Vec::len)
    }
}

/// Disposer returned by [`TriggerRegistry::subscribe`]
pub struct Subscription {
    registry: Weak<Mutex<Listeners>>,
    component_id: String,
    id: u64,
}

impl Subscription {
    pub fn component_id(&self) -> &str {
        &self.component_id
    }

    pub fn dispose(self) {
        // Drop does the work
    }

    fn remove(&self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut inner = registry.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(listeners) = inner.by_component.get_mut(&self.component_id) {
            listeners.retain(|(id, _)| *id != self.id);
            if listeners.is_empty() {
                inner.by_component.remove(&self.component_id);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}
