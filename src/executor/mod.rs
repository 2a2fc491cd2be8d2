//! Execution orchestrator
//!
//! One execution: collect inputs through the resolver, show loading, call
//! the inference backend, then hand the result to the reconciler. Every
//! settled result is published through the pending operation store so a
//! runtime mounted after a remount can still receive it.

pub mod inputs;
pub mod phase;
pub mod runtime;

pub use inputs::{collect_inputs, tabular_fallback, CollectedInput};
pub use phase::{ExecutionPhase, PhaseTrail};
pub use runtime::FunctionalityRuntime;

use crate::canvas::{Canvas, Handle, Surface};
use crate::core::config::RuntimeConfig;
use crate::core::error::{Result, WireError};
use crate::core::types::ExecutionId;
use crate::descriptor::FunctionalityDescriptor;
use crate::llm::backend::{InferenceBackend, InferenceRequest, InferenceResponse, UserInput};
use crate::llm::prompt;
use crate::pending::{Delivery, PendingCompletion, PendingOperationStore, PendingResult};
use crate::reconciler::{OutputPayload, OutputReconciler};
use crate::resolver::{ComponentResolver, ResolveContext};
use crate::table::{loading_snapshot, parse_rows, rows_from_value, AiRow, TableData};
use std::sync::Arc;

/// How an execution ended
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// The backend answered and the answer was delivered
    Success,
    /// No input produced a value; the diagnostic message was written
    EmptyInput,
    /// Remote failure answered with a canned domain answer
    FallbackAnswer,
    /// Remote failure answered with the generic failure message
    FailureMessage,
    /// Tabular output restored to its pre-call state
    Reverted(String),
    /// Stopped before any network I/O
    Aborted(String),
}

/// Where the final payload went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    /// Written to the live output by this execution
    Written,
    /// A runtime already consuming the pending operation writes it
    HandedOff,
    /// No live output; left in the store for the next runtime to consume
    Deferred,
}

#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub id: ExecutionId,
    pub trail: PhaseTrail,
    pub outcome: ExecutionOutcome,
    pub delivery: Option<DeliveryState>,
}

impl ExecutionReport {
    fn new() -> Self {
        Self {
            id: ExecutionId::new(),
            trail: PhaseTrail::new(),
            outcome: ExecutionOutcome::Aborted("not started".into()),
            delivery: None,
        }
    }

    fn finish(mut self, outcome: ExecutionOutcome, delivery: Option<DeliveryState>) -> Self {
        self.trail.advance(ExecutionPhase::Idle);
        self.outcome = outcome;
        self.delivery = delivery;
        self
    }
}

/// Everything an execution needs, read from the live tree before any await
struct ExecutionPlan {
    output_id: String,
    tabular: bool,
    output_columns: Vec<String>,
    /// Output table before this execution, or an overlapping one, touched it
    base: TableData,
    input: CollectedInput,
    /// Live ids that show loading while the call is in flight
    loading_ids: Vec<String>,
    /// Keeps `base` available to overlapping executions until this one ends
    _pre_call: Option<PreCallHold>,
}

/// Releases this execution's hold on the output's pre-call table on drop
struct PreCallHold {
    surface: Surface,
    output_id: String,
}

impl Drop for PreCallHold {
    fn drop(&mut self) {
        self.surface.state_mut().release_pre_call(&self.output_id);
    }
}

/// Clears loading indication on drop, whatever path the execution took
struct LoadingGuard {
    surface: Surface,
    ids: Vec<String>,
}

impl LoadingGuard {
    fn set(surface: &Surface, ids: Vec<String>) -> Self {
        for id in &ids {
            surface.set_loading(id, true);
        }
        Self {
            surface: surface.clone(),
            ids,
        }
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        for id in &self.ids {
            self.surface.set_loading(id, false);
        }
    }
}

/// Composes resolver, backend, pending store and reconciler.
///
/// Cloning is cheap; clones share the store, surface and backend.
#[derive(Clone)]
pub struct Executor {
    backend: Arc<dyn InferenceBackend>,
    store: PendingOperationStore,
    surface: Surface,
    resolver: Arc<ComponentResolver>,
    reconciler: OutputReconciler,
    config: Arc<RuntimeConfig>,
}

impl Executor {
    pub fn new(
        backend: Arc<dyn InferenceBackend>,
        store: PendingOperationStore,
        surface: Surface,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            backend,
            store,
            surface,
            resolver: Arc::new(ComponentResolver::new()),
            reconciler: OutputReconciler::new(config.mirror_to_live_tree),
            config: Arc::new(config),
        }
    }

    pub fn with_resolver(mut self, resolver: ComponentResolver) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn store(&self) -> &PendingOperationStore {
        &self.store
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Run one execution of `descriptor` to completion
    pub async fn execute_functionality(&self, descriptor: &FunctionalityDescriptor) -> ExecutionReport {
        let mut report = ExecutionReport::new();
        tracing::info!("Execution {} of '{}' started", report.id, descriptor.name);
        report.trail.advance(ExecutionPhase::InputCollection);

        let mut plan = match self.plan(descriptor) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!("Execution {} aborted: {}", report.id, e);
                return report.finish(ExecutionOutcome::Aborted(e.to_string()), None);
            }
        };

        if plan.input.is_empty() && plan.tabular {
            plan.input.parts = tabular_fallback(&plan.base, &plan.output_columns);
            if !plan.input.parts.is_empty() {
                tracing::debug!(
                    "Using {} rows of the output table as input",
                    plan.input.parts.len()
                );
            }
        }

        if plan.input.is_empty() {
            report.trail.advance(ExecutionPhase::EmptyInputError);
            let reason = WireError::EmptyInput(descriptor.name.clone());
            tracing::info!("Execution {}: {}, skipping remote call", report.id, reason);
            let message = OutputPayload::Text(self.config.empty_input_message.clone());
            let delivery = self.write_current(descriptor, &plan.output_id, &message);
            return report.finish(ExecutionOutcome::EmptyInput, Some(delivery));
        }

        report.trail.advance(ExecutionPhase::AwaitingResponse);
        let loading = LoadingGuard::set(&self.surface, std::mem::take(&mut plan.loading_ids));

        if plan.tabular {
            let snapshot = loading_snapshot(
                &plan.base,
                &plan.output_columns,
                &self.config.loading_marker,
                self.config.placeholder_rows,
            );
            self.write_current(descriptor, &plan.output_id, &OutputPayload::Table(snapshot));
        }

        let completion = self.store.register(&plan.output_id);
        let request = self.build_request(descriptor, &plan);

        tracing::debug!(
            "Execution {}: calling backend ({} chars, {} images, structured: {})",
            report.id,
            plan.input.body().len(),
            plan.input.images.len(),
            request.use_structured_output
        );
        let result = self.backend.infer(&request).await;

        let (payload, outcome) = match result {
            Ok(response) => {
                report.trail.advance(ExecutionPhase::Success);
                report.trail.advance(ExecutionPhase::Reconciling);
                self.success_payload(&plan, response)
            }
            Err(e) => {
                tracing::warn!("Execution {}: remote call failed: {}", report.id, e);
                report.trail.advance(ExecutionPhase::Failure);
                report.trail.advance(ExecutionPhase::FallbackOrError);
                self.failure_payload(&plan)
            }
        };

        let delivery = self.deliver(descriptor, &plan.output_id, completion, &payload);
        drop(loading);

        tracing::info!(
            "Execution {} finished: {:?} ({:?})",
            report.id,
            outcome,
            delivery
        );
        report.finish(outcome, Some(delivery))
    }

    /// Resolve inputs and classify the output without holding locks across awaits
    fn plan(&self, descriptor: &FunctionalityDescriptor) -> Result<ExecutionPlan> {
        let output_id = descriptor.require_output()?.to_string();
        // Held across the canvas read so no snapshot lands between the two
        let mut state = self.surface.state_mut();
        let canvas = self.surface.canvas();

        let input = collect_inputs(descriptor, &canvas, &self.resolver, &self.config)?;
        let output = self.resolve_live(&canvas, descriptor, &output_id);

        let output_columns = descriptor.output_columns().to_vec();
        let tabular =
            !output_columns.is_empty() || output.as_ref().is_some_and(|h| h.kind.is_tabular());

        let current = output
            .as_ref()
            .and_then(|h| canvas.get(h))
            .and_then(|node| node.props.table.clone())
            .or_else(|| state.table(&output_id).cloned())
            .unwrap_or_default();
        let (base, pre_call) = if tabular {
            let base = state.hold_pre_call(&output_id, current);
            let hold = PreCallHold {
                surface: self.surface.clone(),
                output_id: output_id.clone(),
            };
            (base, Some(hold))
        } else {
            (current, None)
        };

        let trigger = descriptor
            .trigger_id
            .as_deref()
            .map(|id| self.live_id(&canvas, descriptor, id));
        let output_live = output.map(|h| h.id).unwrap_or_else(|| output_id.clone());
        let loading_ids = trigger.into_iter().chain(Some(output_live)).collect();

        Ok(ExecutionPlan {
            output_id,
            tabular,
            output_columns,
            base,
            input,
            loading_ids,
            _pre_call: pre_call,
        })
    }

    fn build_request(&self, descriptor: &FunctionalityDescriptor, plan: &ExecutionPlan) -> InferenceRequest {
        let structured = plan.tabular && !plan.output_columns.is_empty();
        InferenceRequest {
            system_prompt: prompt::prepare_system_prompt(&descriptor.system_prompt),
            user_input: UserInput::Single(plan.input.body()),
            image_data: (!plan.input.images.is_empty()).then(|| plan.input.images.clone()),
            use_structured_output: structured,
            json_schema: structured.then(|| prompt::rows_schema(&plan.output_columns)),
            provider_preference: descriptor
                .provider_preference
                .clone()
                .or_else(|| self.config.backend.provider_preference.clone()),
        }
    }

    fn success_payload(
        &self,
        plan: &ExecutionPlan,
        response: InferenceResponse,
    ) -> (OutputPayload, ExecutionOutcome) {
        if !plan.tabular {
            return (OutputPayload::Text(response.response), ExecutionOutcome::Success);
        }

        match structured_rows(&response) {
            Ok(rows) => {
                let columns = if plan.output_columns.is_empty() {
                    response_columns(&plan.base, &rows)
                } else {
                    plan.output_columns.clone()
                };
                let payload = OutputPayload::Rows {
                    base: plan.base.clone(),
                    rows,
                    columns,
                };
                (payload, ExecutionOutcome::Success)
            }
            Err(e) => {
                tracing::warn!("Reverting '{}' to its pre-call state: {}", plan.output_id, e);
                (
                    OutputPayload::Table(plan.base.clone()),
                    ExecutionOutcome::Reverted(e.to_string()),
                )
            }
        }
    }

    fn failure_payload(&self, plan: &ExecutionPlan) -> (OutputPayload, ExecutionOutcome) {
        if plan.tabular {
            return (
                OutputPayload::Table(plan.base.clone()),
                ExecutionOutcome::Reverted("remote call failed".into()),
            );
        }

        match prompt::insurance_fallback(&plan.input.body()) {
            Some(answer) => (
                OutputPayload::Text(answer.to_string()),
                ExecutionOutcome::FallbackAnswer,
            ),
            None => (
                OutputPayload::Text(self.config.failure_message.clone()),
                ExecutionOutcome::FailureMessage,
            ),
        }
    }

    /// Publish a settled result and deliver it exactly once.
    ///
    /// A live output is written here unless a consumer already claimed the
    /// operation. Without a live output the settled entry stays in the store.
    /// The writer is chosen before the result is published so a consumer can
    /// never settle first and leave this caller writing a second time.
    fn deliver(
        &self,
        descriptor: &FunctionalityDescriptor,
        output_id: &str,
        completion: PendingCompletion,
        payload: &OutputPayload,
    ) -> DeliveryState {
        let handle = {
            let canvas = self.surface.canvas();
            self.resolve_live(&canvas, descriptor, output_id)
        };
        let Some(handle) = handle else {
            completion.resolve(payload.clone());
            tracing::debug!("No live output for '{}', result left pending", output_id);
            return DeliveryState::Deferred;
        };

        let delivery = self.store.take_delivery(output_id, completion.token());
        completion.resolve(payload.clone());
        match delivery {
            Delivery::Caller => {
                self.reconciler.write_output(&self.surface, &handle, payload);
                DeliveryState::Written
            }
            Delivery::Consumer => DeliveryState::HandedOff,
        }
    }

    /// Write to the output as it resolves right now, bypassing the store
    fn write_current(
        &self,
        descriptor: &FunctionalityDescriptor,
        output_id: &str,
        payload: &OutputPayload,
    ) -> DeliveryState {
        let handle = {
            let canvas = self.surface.canvas();
            self.resolve_live(&canvas, descriptor, output_id)
        };
        match handle {
            Some(handle) => {
                self.reconciler.write_output(&self.surface, &handle, payload);
                DeliveryState::Written
            }
            None => {
                tracing::warn!("Output '{}' not found, dropping direct write", output_id);
                DeliveryState::Deferred
            }
        }
    }

    /// Write a result settled by an earlier execution, as consumed by a runtime
    pub(crate) fn write_settled(
        &self,
        descriptor: &FunctionalityDescriptor,
        output_id: &str,
        result: PendingResult,
    ) {
        let payload = match result {
            Ok(payload) => payload,
            Err(reason) => {
                tracing::warn!("Pending operation for '{}' failed: {}", output_id, reason);
                OutputPayload::Text(self.config.failure_message.clone())
            }
        };
        self.write_current(descriptor, output_id, &payload);
    }

    /// Resolve an id to a handle in the current tree, if any strategy finds one
    pub fn resolve_live(
        &self,
        canvas: &Canvas,
        descriptor: &FunctionalityDescriptor,
        id: &str,
    ) -> Option<Handle> {
        let ctx = ResolveContext {
            canvas,
            config: &self.config,
            last_known: descriptor.last_known_position(id),
        };
        self.resolver.resolve(id, &ctx).map(|r| r.handle)
    }

    /// Live id for a logical id, falling back to the logical id itself
    fn live_id(&self, canvas: &Canvas, descriptor: &FunctionalityDescriptor, id: &str) -> String {
        self.resolve_live(canvas, descriptor, id)
            .map(|h| h.id)
            .unwrap_or_else(|| id.to_string())
    }
}

/// Rows from schema-constrained data, else from a lenient parse of the text
fn structured_rows(response: &InferenceResponse) -> Result<Vec<AiRow>> {
    if let Some(data) = &response.structured_data {
        match rows_from_value(data) {
            Ok(rows) => return Ok(rows),
            Err(e) => tracing::debug!("Structured data rejected, parsing text: {}", e),
        }
    }
    if response.response.trim().is_empty() {
        return Err(WireError::StructuredParse("empty response".into()));
    }
    parse_rows(&response.response)
}

/// Output columns for a table with no column selection: existing headers the
/// rows fill, then new keys in sorted order
fn response_columns(base: &TableData, rows: &[AiRow]) -> Vec<String> {
    let mut columns: Vec<String> = base
        .headers
        .iter()
        .filter(|h| rows.iter().any(|row| row.contains_key(*h)))
        .cloned()
        .collect();

    let mut extra: Vec<String> = rows
        .iter()
        .flat_map(|row| row.keys())
        .filter(|k| !base.headers.contains(*k))
        .cloned()
        .collect();
    extra.sort();
    extra.dedup();

    columns.extend(extra);
    columns
}
