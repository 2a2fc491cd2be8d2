//! Mounted functionality: trigger subscription plus pending-result pickup
//!
//! A runtime lives as long as the view that shows its components. Teardown
//! disposes its listeners but leaves in-flight operations in the shared
//! store, where the next mount for the same output picks them up.

use super::{ExecutionReport, Executor};
use crate::canvas::{Listener, Subscription};
use crate::descriptor::FunctionalityDescriptor;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct FunctionalityRuntime {
    executor: Executor,
    descriptor: Arc<FunctionalityDescriptor>,
    subscriptions: Vec<Subscription>,
    consumer: Option<JoinHandle<()>>,
    reports: Option<mpsc::UnboundedReceiver<ExecutionReport>>,
}

impl FunctionalityRuntime {
    /// Subscribe to the trigger and claim any pending result for the output.
    ///
    /// Must be called from within a tokio runtime for pending results to be
    /// consumed and for trigger clicks to start executions.
    pub fn mount(executor: Executor, descriptor: FunctionalityDescriptor) -> Self {
        let descriptor = Arc::new(descriptor);
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut subscriptions = Vec::new();

        match descriptor.trigger_id.as_deref() {
            Some(trigger_id) => {
                let live_id = {
                    let canvas = executor.surface().canvas();
                    executor
                        .resolve_live(&canvas, &descriptor, trigger_id)
                        .map(|h| h.id)
                        .unwrap_or_else(|| trigger_id.to_string())
                };
                let listener = trigger_listener(executor.clone(), Arc::clone(&descriptor), sender);
                subscriptions.push(executor.surface().triggers().subscribe(&live_id, listener));
                tracing::debug!("'{}' listening on trigger '{}'", descriptor.name, live_id);
            }
            None => tracing::warn!(
                "'{}' has no trigger; it only runs when executed directly",
                descriptor.name
            ),
        }

        let consumer = consume_pending(&executor, &descriptor);

        Self {
            executor,
            descriptor,
            subscriptions,
            consumer,
            reports: Some(receiver),
        }
    }

    pub fn descriptor(&self) -> &FunctionalityDescriptor {
        &self.descriptor
    }

    /// Execute once without going through the trigger
    pub async fn run(&self) -> ExecutionReport {
        self.executor.execute_functionality(&self.descriptor).await
    }

    /// Reports of trigger-started executions, in completion order
    pub fn take_reports(&mut self) -> Option<mpsc::UnboundedReceiver<ExecutionReport>> {
        self.reports.take()
    }

    /// Task delivering a pending result claimed at mount, if there was one
    pub fn take_consumer(&mut self) -> Option<JoinHandle<()>> {
        self.consumer.take()
    }

    pub fn is_subscribed(&self) -> bool {
        !self.subscriptions.is_empty()
    }

    /// Live id the trigger listener is attached to
    pub fn trigger_id(&self) -> Option<&str> {
        self.subscriptions.first().map(Subscription::component_id)
    }

    /// Dispose every listener. Executions already started keep running.
    pub fn teardown(mut self) {
        for subscription in self.subscriptions.drain(..) {
            tracing::debug!("Disposing listener on '{}'", subscription.component_id());
            subscription.dispose();
        }
        tracing::debug!("Tore down runtime for '{}'", self.descriptor.name);
    }
}

fn trigger_listener(
    executor: Executor,
    descriptor: Arc<FunctionalityDescriptor>,
    reports: mpsc::UnboundedSender<ExecutionReport>,
) -> Listener {
    let listener: Listener = Arc::new(move || {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("Trigger for '{}' fired outside a tokio runtime", descriptor.name);
            return;
        };
        let executor = executor.clone();
        let descriptor = Arc::clone(&descriptor);
        let reports = reports.clone();
        runtime.spawn(async move {
            let report = executor.execute_functionality(&descriptor).await;
            // Nobody listening is fine
            let _ = reports.send(report);
        });
    });
    listener
}

/// Claim the pending operation for the output if its handle is live now
fn consume_pending(
    executor: &Executor,
    descriptor: &Arc<FunctionalityDescriptor>,
) -> Option<JoinHandle<()>> {
    let output_id = descriptor.output_id.clone()?;
    if !executor.store().contains(&output_id) {
        return None;
    }

    let live = {
        let canvas = executor.surface().canvas();
        executor.resolve_live(&canvas, descriptor, &output_id).is_some()
    };
    if !live {
        tracing::debug!("Pending result for '{}' waits for a live output", output_id);
        return None;
    }
    if tokio::runtime::Handle::try_current().is_err() {
        tracing::warn!("Cannot consume pending result for '{}' outside a tokio runtime", output_id);
        return None;
    }

    let writer = executor.clone();
    let settled_descriptor = Arc::clone(descriptor);
    let settled_id = output_id.clone();
    let handle = executor.store().consume(&output_id, move |result| {
        writer.write_settled(&settled_descriptor, &settled_id, result);
    })?;

    tracing::info!("'{}' picked up pending result for '{}'", descriptor.name, output_id);
    Some(handle)
}
