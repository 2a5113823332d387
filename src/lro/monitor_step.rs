//! Status-monitor strategies
//!
//! Tried in order by the engine, first match wins:
//! 1. an explicit polling-operation reference
//! 2. a polling link in the response (explicit link metadata or a marked
//!    pollingLocation property)
//! 3. the operation's own response carrying a marked status property

use super::context::LroContext;
use super::engine::LroEngine;
use super::links::{create_operation_link, create_operation_reference, resolve_operation_location};
use super::monitor::{StatusMonitorInfo, get_status_monitor_info, status_monitor_with_status};
use super::states::marked_property_states;
use super::steps::{
    FinalOperationLink, FinalOperationReference, FinalStep, NextOperationLink,
    NextOperationReference, OperationLink, PollingOperationStep, PollingSuccessProperty,
    ResponseModel, StatusMonitorStep,
};
use crate::annotations::{AnnotationStore, LinkKind, OperationLinkMetadata};
use crate::diagnostics::{Diagnosed, DiagnosticCollector};
use crate::graph::{OperationId, PropertyId, ShapeId, TypeGraph};

/// What following a polling link leads to
#[derive(Debug, Clone)]
struct StatusMonitorLinks {
    link: OperationLink,
    info: StatusMonitorInfo,
    final_link: Option<OperationLink>,
    final_model: Option<ResponseModel>,
}

/// Status monitor recorded on a polling link that has a full parameter map
fn polling_link_monitor(link: Option<&OperationLinkMetadata>) -> Option<&StatusMonitorInfo> {
    let link = link?;
    link.parameter_map.as_ref()?;
    link.result.as_ref()?.status_monitor.as_ref()
}

impl<'a, G, A> LroEngine<'a, G, A>
where
    G: TypeGraph + ?Sized,
    A: AnnotationStore + ?Sized,
{
    //=== Strategy 1: reference ===

    /// Look for an explicit polling-operation link on `op`.
    ///
    /// The returned context records the polling link and may gain a final
    /// step even when no reference results.
    pub(super) fn process_status_monitor_reference(
        &self,
        op: OperationId,
        ctx: LroContext<'a>,
    ) -> (LroContext<'a>, Option<NextOperationReference>) {
        let annotations: &'a A = self.annotations;
        let Some(polling) = annotations.operation_link(op, LinkKind::Polling) else {
            return (ctx, None);
        };
        let ctx = LroContext {
            polling_operation_link: Some(polling),
            ..ctx
        };
        let Some(target) = create_operation_reference(self.graph, polling) else {
            log::trace!(
                "{}: polling link to {} has unresolved parameters",
                self.graph.operation(op).qualified_name(),
                self.graph.operation(polling.linked_operation).qualified_name()
            );
            return (ctx, None);
        };

        let final_reference = annotations
            .operation_link(op, LinkKind::Final)
            .and_then(|link| {
                let shape = link.result.as_ref()?.shape?;
                let target = create_operation_reference(self.graph, link)?;
                Some(FinalStep::Reference(FinalOperationReference {
                    response_model: ResponseModel::Shape(shape),
                    target,
                }))
            });
        let ctx = ctx.with_final_step(final_reference);

        let success = polling
            .result
            .as_ref()
            .and_then(|result| result.status_monitor.as_ref())
            .and_then(|info| {
                let prop = info.success_property?;
                let shape = self.graph.property(prop).ty.as_shape()?;
                Some(FinalStep::PollingSuccessProperty(PollingSuccessProperty {
                    response_model: shape,
                    target: prop,
                    source_property: Some(prop),
                }))
            });
        let ctx = ctx.with_final_step(success);

        let reference = polling
            .result
            .as_ref()
            .and_then(|result| result.shape)
            .map(|response_model| NextOperationReference {
                response_model,
                target,
            });
        (ctx, reference)
    }

    /// Polling step for a referenced status monitor: the monitor recorded on
    /// the polling link, else the referenced response shape itself
    pub(super) fn reference_polling_step(
        &self,
        ctx: &LroContext<'a>,
        monitor: ShapeId,
    ) -> Diagnosed<Option<PollingOperationStep>> {
        if let Some(info) = polling_link_monitor(ctx.polling_operation_link) {
            return Diagnosed::clean(Some(info.polling_step()));
        }
        get_status_monitor_info(self.graph, self.annotations, monitor, &self.options.names)
            .map(|info| info.map(|info| info.polling_step()))
    }

    //=== Strategy 2: link ===

    pub(super) fn process_status_monitor_link(
        &self,
        op: OperationId,
        ctx: &LroContext<'a>,
    ) -> Diagnosed<Option<LroContext<'a>>> {
        let mut collector = DiagnosticCollector::new();
        let recorded = ctx.polling_operation_link.and_then(|polling| {
            let info = polling.result.as_ref()?.status_monitor.clone()?;
            let link = polling.link?;
            Some(StatusMonitorLinks {
                link,
                info,
                final_link: None,
                final_model: None,
            })
        });
        let links = match recorded {
            Some(links) => Some(links),
            None => collector.pipe(self.status_monitor_links(op)),
        };
        let Some(links) = links else {
            log::trace!("{}: no status monitor link", self.graph.operation(op).qualified_name());
            return collector.wrap(None);
        };

        log::debug!(
            "{}: status monitor {} via {}",
            self.graph.operation(op).qualified_name(),
            self.graph.shape(links.info.monitor_type).name,
            self.graph.property_label(links.link.property)
        );
        let final_step = match (links.final_link, links.final_model) {
            (Some(target), Some(response_model)) => Some(FinalStep::Link(FinalOperationLink {
                response_model,
                target,
            })),
            _ => match (links.info.success_property, links.info.success_type) {
                (Some(target), ResponseModel::Shape(response_model)) => {
                    Some(FinalStep::PollingSuccessProperty(PollingSuccessProperty {
                        response_model,
                        target,
                        source_property: Some(links.link.property),
                    }))
                }
                _ => None,
            },
        };

        let ctx = LroContext {
            polling_step: Some(links.info.polling_step()),
            status_monitor_step: Some(StatusMonitorStep::Link(NextOperationLink {
                response_model: links.info.monitor_type,
                target: links.link,
            })),
            ..ctx.clone()
        };
        collector.wrap(Some(ctx.with_final_step(final_step)))
    }

    /// Links found on the first response shape holding a polling or final
    /// location property
    fn status_monitor_links(&self, op: OperationId) -> Diagnosed<Option<StatusMonitorLinks>> {
        let is_link = |prop: PropertyId| {
            self.annotations.is_polling_location(prop) || self.annotations.is_final_location(prop)
        };
        match self.find_response_shape(op, is_link) {
            Some(shape) => self.status_monitor_links_from_shape(shape),
            None => Diagnosed::clean(None),
        }
    }

    fn status_monitor_links_from_shape(
        &self,
        shape: ShapeId,
    ) -> Diagnosed<Option<StatusMonitorLinks>> {
        let graph = self.graph;
        let annotations = self.annotations;
        let properties = graph.properties(shape);

        let mut polling: Vec<PropertyId> = properties
            .iter()
            .copied()
            .filter(|prop| annotations.is_polling_location(*prop))
            .collect();
        // status monitor links win over stepwise polling of the body
        if polling.len() > 1 {
            let headers: Vec<PropertyId> =
                polling.iter().copied().filter(|prop| !graph.is_body(*prop)).collect();
            if !headers.is_empty() {
                polling = headers;
            }
        }
        let Some(&polling_prop) = polling.first() else {
            return Diagnosed::clean(None);
        };

        let mut collector = DiagnosticCollector::new();
        let info = match annotations.polling_location_info(polling_prop) {
            Some(options) => Some(options.info.clone()),
            None => match resolve_operation_location(graph, annotations, polling_prop)
                .and_then(|model| model.as_shape())
            {
                Some(monitor) => collector.pipe(get_status_monitor_info(
                    graph,
                    annotations,
                    monitor,
                    &self.options.names,
                )),
                None => None,
            },
        };
        let Some(info) = info else {
            log::trace!(
                "{}: polling link does not lead to a status monitor",
                graph.property_label(polling_prop)
            );
            return collector.wrap(None);
        };

        let is_final = |prop: &PropertyId| annotations.is_final_location(*prop);
        let mut finals: Vec<PropertyId> = properties.iter().copied().filter(is_final).collect();
        if finals.len() != 1 {
            finals = graph
                .properties(info.monitor_type)
                .into_iter()
                .filter(is_final)
                .collect();
        }
        let final_link = match finals.as_slice() {
            [single] => Some(create_operation_link(graph, *single)),
            _ => None,
        };
        let final_model = final_link
            .and_then(|link| resolve_operation_location(graph, annotations, link.property));

        collector.wrap(Some(StatusMonitorLinks {
            link: create_operation_link(graph, polling_prop),
            info,
            final_link,
            final_model,
        }))
    }

    //=== Strategy 3: self-polling ===

    /// The operation's own response is the status monitor. Requires the
    /// status property, or its enum or union type, to be marked explicitly.
    pub(super) fn process_self_polling(
        &self,
        op: OperationId,
        ctx: &LroContext<'a>,
    ) -> Diagnosed<Option<LroContext<'a>>> {
        let with_step = |step: PollingOperationStep| LroContext {
            polling_step: Some(step),
            ..ctx.clone()
        };
        if let Some(info) = polling_link_monitor(ctx.polling_operation_link) {
            return Diagnosed::clean(Some(with_step(info.polling_step())));
        }

        for shape in self.graph.response_shapes(op) {
            let status = self
                .graph
                .properties(shape)
                .into_iter()
                .find(|prop| marked_property_states(self.graph, self.annotations, *prop).is_some());
            let Some(status) = status else {
                continue;
            };
            let info = status_monitor_with_status(
                self.graph,
                self.annotations,
                shape,
                status,
                &self.options.names,
            );
            let (info, diagnostics) = info.into_parts();
            if let Some(info) = info {
                log::debug!(
                    "{}: polls its own response {}",
                    self.graph.operation(op).qualified_name(),
                    self.graph.shape(shape).name
                );
                return Diagnosed::new(Some(with_step(info.polling_step())), diagnostics);
            }
        }
        Diagnosed::clean(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{Annotations, StatusTarget};
    use crate::graph::{ApiGraph, HttpVerb, StatusCode, TypeRef};
    use crate::lro::steps::LinkLocation;

    struct Fixture {
        graph: ApiGraph,
        annotations: Annotations,
        op: OperationId,
        accepted: ShapeId,
        monitor: ShapeId,
        widget: ShapeId,
        header: PropertyId,
        result: PropertyId,
    }

    /// POST returning 202 with an Operation-Location header pointing at a
    /// status monitor `{status, result: Widget}`
    fn fixture() -> Fixture {
        let mut graph = ApiGraph::new();
        let states = graph
            .add_enum("OperationState", &["Running", "Succeeded", "Failed", "Canceled"])
            .unwrap();
        let widget = graph.add_shape("Widget").unwrap();
        graph.add_field(widget, "name", graph.string_type()).unwrap();
        let monitor = graph.add_shape("WidgetStatus").unwrap();
        graph.add_field(monitor, "status", TypeRef::Enum(states)).unwrap();
        let result = graph.add_field(monitor, "result", TypeRef::Shape(widget)).unwrap();
        let location = graph.resource_location_of(monitor);
        let accepted = graph.add_shape("Accepted").unwrap();
        let header = graph
            .add_header(
                accepted,
                "operationLocation",
                "Operation-Location",
                TypeRef::Scalar(location),
            )
            .unwrap();
        let op = graph.add_operation("process", HttpVerb::Post, "/widgets:process").unwrap();
        graph.add_response(op, StatusCode::Code(202), TypeRef::Shape(accepted));

        let mut annotations = Annotations::new();
        annotations.mark_polling_location(header);
        Fixture {
            graph,
            annotations,
            op,
            accepted,
            monitor,
            widget,
            header,
            result,
        }
    }

    #[test]
    fn test_link_strategy_finds_status_monitor() {
        let f = fixture();
        let engine = LroEngine::new(&f.graph, &f.annotations);
        let ctx = LroContext::new(f.op, f.accepted);
        let ctx = engine
            .process_status_monitor_link(f.op, &ctx)
            .ignore_diagnostics()
            .expect("link strategy should match");

        let polling = ctx.polling_step.expect("polling step");
        assert_eq!(polling.response_model, f.monitor);
        assert_eq!(polling.termination_status.succeeded_state, vec!["Succeeded"]);
        match ctx.status_monitor_step {
            Some(StatusMonitorStep::Link(step)) => {
                assert_eq!(step.response_model, f.monitor);
                assert_eq!(step.target.location, LinkLocation::ResponseHeader);
                assert_eq!(step.target.property, f.header);
            }
            other => panic!("unexpected status monitor step {:?}", other),
        }
        assert_eq!(
            ctx.final_step,
            Some(FinalStep::PollingSuccessProperty(PollingSuccessProperty {
                response_model: f.widget,
                target: f.result,
                source_property: Some(f.header),
            }))
        );
    }

    #[test]
    fn test_link_strategy_without_marker_misses() {
        let mut f = fixture();
        f.annotations = Annotations::new();
        let engine = LroEngine::new(&f.graph, &f.annotations);
        let ctx = LroContext::new(f.op, f.accepted);
        assert!(engine.process_status_monitor_link(f.op, &ctx).value.is_none());
    }

    #[test]
    fn test_self_polling_requires_marker() {
        let mut graph = ApiGraph::new();
        let states = graph.add_enum("ProvisioningState", &["Succeeded", "Failed"]).unwrap();
        let resource = graph.add_shape("Resource").unwrap();
        let status = graph.add_field(resource, "status", TypeRef::Enum(states)).unwrap();
        let op = graph.add_operation("create", HttpVerb::Put, "/resources/{name}").unwrap();
        graph.add_response(op, StatusCode::Code(201), TypeRef::Shape(resource));

        let mut annotations = Annotations::new();
        {
            let engine = LroEngine::new(&graph, &annotations);
            let ctx = LroContext::new(op, resource);
            assert!(engine.process_self_polling(op, &ctx).value.is_none());
        }

        annotations.mark_lro_status(StatusTarget::Enum(states));
        let engine = LroEngine::new(&graph, &annotations);
        let ctx = LroContext::new(op, resource);
        let ctx = engine
            .process_self_polling(op, &ctx)
            .ignore_diagnostics()
            .expect("self polling should match");
        let polling = ctx.polling_step.expect("polling step");
        assert_eq!(polling.response_model, resource);
        assert_eq!(polling.termination_status.property, status);
        assert!(ctx.status_monitor_step.is_none());
    }
}
