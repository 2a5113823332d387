//! Top-level LRO resolution
//!
//! [`LroEngine`] borrows a type graph and an annotation store and answers,
//! per operation, whether it is long-running and how a client drives it.
//! The stages live next to their own logic:
//! - final_step: final-operation references and links
//! - monitor_step: the three status-monitor strategies
//! - final_state: final-state-via classification and override validation

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::context::LroContext;
use super::final_state::{FinalStateResolution, validate_final_state};
use super::monitor::ResultNames;
use super::steps::{FinalStateValue, FinalStep, LroMetadata, ResponseModel, StatusMonitorStep};
use crate::annotations::AnnotationStore;
use crate::diagnostics::{Diagnosed, DiagnosticCollector, dedupe};
use crate::graph::{OperationId, PropertyId, ShapeId, TypeGraph};

/// Knobs that change how metadata is derived
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Replace the computed final state with a valid explicit override
    pub honor_final_state_override: bool,
    /// Result and error property names used when none is marked
    pub names: ResultNames,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            honor_final_state_override: true,
            names: ResultNames::default(),
        }
    }
}

/// Resolves LRO metadata over an immutable graph and annotation snapshot.
///
/// The engine holds only shared references, so one instance may serve any
/// number of threads.
pub struct LroEngine<'a, G: ?Sized, A: ?Sized> {
    pub(super) graph: &'a G,
    pub(super) annotations: &'a A,
    pub(super) options: EngineOptions,
}

impl<'a, G, A> LroEngine<'a, G, A>
where
    G: TypeGraph + ?Sized,
    A: AnnotationStore + ?Sized,
{
    pub fn new(graph: &'a G, annotations: &'a A) -> Self {
        Self::with_options(graph, annotations, EngineOptions::default())
    }

    pub fn with_options(graph: &'a G, annotations: &'a A, options: EngineOptions) -> Self {
        Self {
            graph,
            annotations,
            options,
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn is_long_running(&self, op: OperationId) -> bool {
        self.get_lro_metadata(op).value.is_some()
    }

    /// Metadata for one operation, `None` when it is not long-running.
    ///
    /// Diagnostics found along the way are returned with the value, each
    /// reported once.
    pub fn get_lro_metadata(&self, op: OperationId) -> Diagnosed<Option<LroMetadata>> {
        let mut collector = DiagnosticCollector::new();
        let metadata = self.resolve(op, &mut collector);
        Diagnosed::new(metadata, dedupe(collector.into_vec()))
    }

    /// Metadata for every long-running operation, in declaration order
    pub fn analyze_all(&self) -> Diagnosed<Vec<LroMetadata>> {
        let mut collector = DiagnosticCollector::new();
        let mut results = Vec::new();
        for op in self.graph.operations() {
            if let Some(metadata) = collector.pipe(self.get_lro_metadata(op)) {
                results.push(metadata);
            }
        }
        log::debug!("{} long-running operations found", results.len());
        Diagnosed::new(results, dedupe(collector.into_vec()))
    }

    fn resolve(&self, op: OperationId, collector: &mut DiagnosticCollector) -> Option<LroMetadata> {
        let name = self.graph.operation(op).qualified_name();
        let Some(original) = self.graph.success_response(op) else {
            log::trace!("{}: no success response", name);
            return None;
        };

        let ctx = LroContext::new(op, original);
        let ctx = self.process_final_reference(op, ctx);
        let ctx = self.process_final_link(op, ctx);

        let (ctx, reference) = self.process_status_monitor_reference(op, ctx);
        if let Some(reference) = reference {
            log::debug!("{}: status monitor by reference", name);
            let target = reference.target.operation;
            let monitor = reference.response_model;
            let ctx = LroContext {
                status_monitor_step: Some(StatusMonitorStep::Reference(reference)),
                ..ctx
            };
            let ctx = self.process_final_reference(target, ctx);
            let ctx = self.process_final_link(target, ctx);
            let polling_step = collector.pipe(self.reference_polling_step(&ctx, monitor));
            let ctx = LroContext { polling_step, ..ctx };
            return self.create_lro_metadata(ctx, collector);
        }

        if let Some(ctx) = collector.pipe(self.process_status_monitor_link(op, &ctx)) {
            return self.create_lro_metadata(ctx, collector);
        }

        if let Some(ctx) = collector.pipe(self.process_self_polling(op, &ctx)) {
            return self.create_lro_metadata(ctx, collector);
        }

        log::trace!("{}: not long-running", name);
        None
    }

    fn create_lro_metadata(
        &self,
        ctx: LroContext<'a>,
        collector: &mut DiagnosticCollector,
    ) -> Option<LroMetadata> {
        let FinalStateResolution {
            final_state,
            model,
            ctx,
        } = collector.pipe(self.get_final_state_via(ctx));
        let op = ctx.operation;
        let polling = ctx.polling_step?;
        let envelope = polling.response_model;

        let logical_path = match &ctx.final_step {
            Some(FinalStep::PollingSuccessProperty(step)) => {
                Some(self.graph.property(step.target).name.clone())
            }
            _ => None,
        };
        let (final_result, final_envelope_result) = match &ctx.final_step {
            Some(FinalStep::PollingSuccessProperty(_)) => (model, ResponseModel::Shape(envelope)),
            Some(FinalStep::NoPollingResult) => (ResponseModel::Void, ResponseModel::Void),
            _ => (model, model),
        };

        let final_state_via = self.final_state_override(op).unwrap_or(final_state);
        log::debug!(
            "{}: final state via {}",
            self.graph.operation(op).qualified_name(),
            final_state_via
        );

        Some(LroMetadata {
            operation: op,
            logical_result: model.as_shape().unwrap_or(envelope),
            final_state_via,
            status_monitor_step: ctx.status_monitor_step,
            polling_info: polling,
            final_step: ctx.final_step,
            envelope_result: envelope,
            final_result,
            final_envelope_result,
            logical_path: logical_path.clone(),
            final_result_path: logical_path,
        })
    }

    /// An explicit override that is valid for the operation; invalid ones
    /// are reported where annotations are loaded
    fn final_state_override(&self, op: OperationId) -> Option<FinalStateValue> {
        if !self.options.honor_final_state_override {
            return None;
        }
        let value = self.annotations.final_state_override(op)?;
        validate_final_state(self.graph, op, value).ignore_diagnostics()
    }

    /// Depth-first search over the operation's response shapes and their
    /// body shapes for the first shape with a property matching `matches`
    pub(super) fn find_response_shape(
        &self,
        op: OperationId,
        matches: impl Fn(PropertyId) -> bool,
    ) -> Option<ShapeId> {
        let mut visited = HashSet::new();
        let mut pending = self.graph.response_shapes(op);
        pending.reverse();
        while let Some(shape) = pending.pop() {
            if !visited.insert(shape) {
                continue;
            }
            if self.graph.properties(shape).into_iter().any(&matches) {
                return Some(shape);
            }
            if let Some(body) = self.graph.body_shape(shape) {
                pending.push(body);
            }
        }
        None
    }
}
