//! Final-state-via classification
//!
//! Maps the resolved steps plus the operation's resource lifecycle kind to
//! the strategy a client uses to detect completion and fetch the result.
//! Rules are evaluated in a fixed order and the first match wins.

use super::context::LroContext;
use super::engine::LroEngine;
use super::links::is_matching_get_operation;
use super::monitor::get_status_monitor_info;
use super::steps::{
    FinalStateValue, FinalStep, LinkLocation, OperationLink, OperationReference, ResponseModel,
    StatusMonitorStep,
};
use crate::annotations::AnnotationStore;
use crate::diagnostics::{Diagnosed, Diagnostic, DiagnosticCode, DiagnosticCollector};
use crate::graph::{
    HttpVerb, OperationId, PropertyId, ResourceOperation, ResourceOperationKind, ShapeId, TypeGraph,
};

/// Classifier output: the strategy, the logical result, and the context
/// (which may have gained a `noPollingResult` final step)
#[derive(Debug, Clone)]
pub(super) struct FinalStateResolution<'a> {
    pub final_state: FinalStateValue,
    pub model: ResponseModel,
    pub ctx: LroContext<'a>,
}

/// The graph's lifecycle classification, else one derived from the verb:
/// PUT creates or replaces the success body, DELETE deletes
pub fn logical_resource_operation<G: TypeGraph + ?Sized>(
    graph: &G,
    op: OperationId,
    model: ShapeId,
) -> Option<ResourceOperation> {
    if let Some(resource) = graph.resource_operation(op) {
        return Some(resource);
    }
    let resource_type = graph.body_shape(model).unwrap_or(model);
    let kind = match graph.operation(op).verb {
        HttpVerb::Delete => ResourceOperationKind::Delete,
        HttpVerb::Put => ResourceOperationKind::CreateOrReplace,
        _ => return None,
    };
    Some(ResourceOperation {
        kind,
        resource_type: Some(resource_type),
    })
}

/// Classify a link header by its canonical name, ignoring case
pub fn final_state_from_header<G: TypeGraph + ?Sized>(
    graph: &G,
    prop: PropertyId,
) -> FinalStateValue {
    let Some(name) = graph.header_name(prop) else {
        return FinalStateValue::CustomLink;
    };
    match name.to_lowercase().as_str() {
        "operation-location" => FinalStateValue::OperationLocation,
        "azure-asyncoperation" | "azureasyncoperation" => FinalStateValue::AzureAsyncOperation,
        "location" => FinalStateValue::Location,
        _ => FinalStateValue::CustomLink,
    }
}

fn status_from_link<G: TypeGraph + ?Sized>(graph: &G, link: &OperationLink) -> FinalStateValue {
    match link.location {
        LinkLocation::ResponseBody => FinalStateValue::CustomLink,
        LinkLocation::ResponseHeader => final_state_from_header(graph, link.property),
        LinkLocation::SelfLink => FinalStateValue::OriginalUri,
    }
}

fn status_from_reference<G: TypeGraph + ?Sized>(
    graph: &G,
    source: OperationId,
    reference: &OperationReference,
) -> FinalStateValue {
    if is_matching_get_operation(graph, source, reference.operation) {
        FinalStateValue::OriginalUri
    } else {
        FinalStateValue::CustomOperationReference
    }
}

fn status_from_monitor_step<G: TypeGraph + ?Sized>(
    graph: &G,
    source: OperationId,
    step: &StatusMonitorStep,
) -> FinalStateValue {
    match step {
        StatusMonitorStep::Link(link) => status_from_link(graph, &link.target),
        StatusMonitorStep::Reference(reference) => {
            status_from_reference(graph, source, &reference.target)
        }
    }
}

/// Check an explicit final-state override against the operation.
///
/// `original-uri` is only meaningful for PUT and PATCH. Header-based values
/// need a non-error response that declares the matching header. Anything
/// else is rejected.
pub fn validate_final_state<G: TypeGraph + ?Sized>(
    graph: &G,
    op: OperationId,
    value: FinalStateValue,
) -> Diagnosed<Option<FinalStateValue>> {
    let operation = graph.operation(op);
    let target = operation.qualified_name();

    if value == FinalStateValue::OriginalUri {
        if matches!(operation.verb, HttpVerb::Put | HttpVerb::Patch) {
            return Diagnosed::clean(Some(value));
        }
        return Diagnosed::new(
            None,
            vec![Diagnostic::new(
                DiagnosticCode::InvalidFinalState,
                target,
                "The final state value 'original-uri' can only be used in http PUT or PATCH operations",
            )],
        );
    }

    let Some(header) = value.header_name() else {
        return Diagnosed::new(
            None,
            vec![Diagnostic::new(
                DiagnosticCode::InvalidFinalState,
                target,
                format!(
                    "The final state value '{}' is not valid for this operation. It must be one of 'original-uri', 'location', 'azure-async-operation' or 'operation-location'.",
                    value
                ),
            )],
        );
    };

    let declared = graph.response_shapes(op).into_iter().any(|shape| {
        graph.properties(shape).into_iter().any(|prop| {
            graph
                .header_name(prop)
                .is_some_and(|name| name.eq_ignore_ascii_case(header))
        })
    });
    if declared {
        return Diagnosed::clean(Some(value));
    }
    Diagnosed::new(
        None,
        vec![Diagnostic::new(
            DiagnosticCode::InvalidFinalState,
            target,
            format!(
                "The final state value '{}' requires a '{}' header in the operation responses.",
                value, header
            ),
        )],
    )
}

impl<'a, G, A> LroEngine<'a, G, A>
where
    G: TypeGraph + ?Sized,
    A: AnnotationStore + ?Sized,
{
    pub(super) fn get_final_state_via(
        &self,
        ctx: LroContext<'a>,
    ) -> Diagnosed<FinalStateResolution<'a>> {
        let graph = self.graph;
        let op = ctx.operation;
        let resource = logical_resource_operation(graph, op, ctx.original_model);
        let kind = resource.map(|resource| resource.kind);
        let action = graph.is_action(op);

        let mut final_state = FinalStateValue::OriginalUri;
        let mut model = ResponseModel::Shape(ctx.original_model);
        if action || kind == Some(ResourceOperationKind::Delete) {
            final_state = FinalStateValue::OperationLocation;
            model = ResponseModel::Shape(
                ctx.polling_step
                    .as_ref()
                    .map(|step| step.response_model)
                    .unwrap_or(ctx.original_model),
            );
        }

        // 1: an explicit final step
        let create_or_replace = kind == Some(ResourceOperationKind::CreateOrReplace);
        let classified = match &ctx.final_step {
            None | Some(FinalStep::NoPollingResult) => None,
            Some(FinalStep::PollingSuccessProperty(_)) if create_or_replace => None,
            Some(step) => {
                let state = match (step, &ctx.status_monitor_step) {
                    (FinalStep::PollingSuccessProperty(_), Some(monitor)) => match monitor {
                        StatusMonitorStep::Link(link) => {
                            final_state_from_header(graph, link.target.property)
                        }
                        StatusMonitorStep::Reference(_) => {
                            FinalStateValue::CustomOperationReference
                        }
                    },
                    (FinalStep::PollingSuccessProperty(_), None) => FinalStateValue::OriginalUri,
                    (FinalStep::Link(link), _) => status_from_link(graph, &link.target),
                    (FinalStep::Reference(reference), _) => {
                        status_from_reference(graph, op, &reference.target)
                    }
                    (FinalStep::NoPollingResult, _) => FinalStateValue::OriginalUri,
                };
                Some((state, step.response_model()))
            }
        };
        if let Some((final_state, model)) = classified {
            log::debug!("{}: final state from final step", graph.operation(op).qualified_name());
            return Diagnosed::clean(FinalStateResolution {
                final_state,
                model,
                ctx,
            });
        }

        // 2: resource create-or-replace
        if let Some(ResourceOperation {
            kind: ResourceOperationKind::CreateOrReplace,
            resource_type: Some(resource_type),
        }) = resource
        {
            return Diagnosed::clean(FinalStateResolution {
                final_state: FinalStateValue::OriginalUri,
                model: ResponseModel::Shape(resource_type),
                ctx,
            });
        }

        // 3: actions, deletes and unclassified operations with a status monitor
        let mut collector = DiagnosticCollector::new();
        let monitored = match &ctx.status_monitor_step {
            Some(_) => {
                let polled = ctx.polling_step.is_some();
                action
                    || (kind == Some(ResourceOperationKind::Delete) && polled)
                    || (!action && resource.is_none() && polled)
            }
            None => false,
        };
        let mut ctx = ctx;
        if let Some(step) = ctx.status_monitor_step.as_ref().filter(|_| monitored) {
            let info = collector.pipe(get_status_monitor_info(
                graph,
                self.annotations,
                step.response_model(),
                &self.options.names,
            ));
            if let Some(info) = info {
                model = info.success_type;
                final_state = status_from_monitor_step(graph, op, step);
                if ctx.final_step.is_none() && info.success_property.is_none() {
                    ctx = ctx.with_final_step(Some(FinalStep::NoPollingResult));
                }
            }
        }

        collector.wrap(FinalStateResolution {
            final_state,
            model,
            ctx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ApiGraph, StatusCode, TypeRef};

    fn operation(graph: &mut ApiGraph, verb: HttpVerb, headers: &[&str]) -> OperationId {
        let shape = graph.add_shape("Response").unwrap();
        for header in headers {
            graph.add_header(shape, header, header, graph.string_type()).unwrap();
        }
        let op = graph.add_operation("op", verb, "/things/{id}").unwrap();
        graph.add_response(op, StatusCode::Code(202), TypeRef::Shape(shape));
        op
    }

    #[test]
    fn test_header_names_are_case_insensitive() {
        let mut graph = ApiGraph::new();
        let shape = graph.add_shape("Headers").unwrap();
        let string = graph.string_type();
        let cases = [
            ("Operation-Location", FinalStateValue::OperationLocation),
            ("AZURE-ASYNCOPERATION", FinalStateValue::AzureAsyncOperation),
            ("AzureAsyncOperation", FinalStateValue::AzureAsyncOperation),
            ("location", FinalStateValue::Location),
            ("Retry-After", FinalStateValue::CustomLink),
        ];
        for (index, (header, expected)) in cases.iter().enumerate() {
            let prop = graph
                .add_header(shape, &format!("h{}", index), header, string.clone())
                .unwrap();
            assert_eq!(final_state_from_header(&graph, prop), *expected, "{}", header);
        }
        let body = graph.add_field(shape, "link", string).unwrap();
        assert_eq!(final_state_from_header(&graph, body), FinalStateValue::CustomLink);
    }

    #[test]
    fn test_logical_resource_operation_from_verb() {
        let mut graph = ApiGraph::new();
        let shape = graph.add_shape("Thing").unwrap();
        let put = graph.add_operation("put", HttpVerb::Put, "/things/{id}").unwrap();
        let post = graph.add_operation("post", HttpVerb::Post, "/things").unwrap();
        let resource = logical_resource_operation(&graph, put, shape).unwrap();
        assert_eq!(resource.kind, ResourceOperationKind::CreateOrReplace);
        assert_eq!(resource.resource_type, Some(shape));
        assert!(logical_resource_operation(&graph, post, shape).is_none());

        graph.set_resource(post, ResourceOperationKind::Action, None);
        let resource = logical_resource_operation(&graph, post, shape).unwrap();
        assert_eq!(resource.kind, ResourceOperationKind::Action);
    }

    #[test]
    fn test_original_uri_only_for_put_or_patch() {
        let mut graph = ApiGraph::new();
        let op = operation(&mut graph, HttpVerb::Post, &[]);
        let result = validate_final_state(&graph, op, FinalStateValue::OriginalUri);
        assert!(result.value.is_none());
        assert!(result.has(DiagnosticCode::InvalidFinalState));

        let mut graph = ApiGraph::new();
        let op = operation(&mut graph, HttpVerb::Patch, &[]);
        let result = validate_final_state(&graph, op, FinalStateValue::OriginalUri);
        assert_eq!(result.value, Some(FinalStateValue::OriginalUri));
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_header_value_requires_declared_header() {
        let mut graph = ApiGraph::new();
        let op = operation(&mut graph, HttpVerb::Post, &["Operation-Location"]);
        let ok = validate_final_state(&graph, op, FinalStateValue::OperationLocation);
        assert_eq!(ok.value, Some(FinalStateValue::OperationLocation));

        let missing = validate_final_state(&graph, op, FinalStateValue::Location);
        assert!(missing.value.is_none());
        assert!(missing.has(DiagnosticCode::InvalidFinalState));

        let custom = validate_final_state(&graph, op, FinalStateValue::CustomLink);
        assert!(custom.value.is_none());
        assert!(custom.has(DiagnosticCode::InvalidFinalState));
    }
}
