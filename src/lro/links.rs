//! Links and references between operations
//!
//! Turns annotated properties into [`OperationLink`]s, resolved operation
//! links into [`OperationReference`]s, and resolves an explicit
//! polling/final operation link against the source and target operations
//! (parameter map, result shape, status monitor).

use std::collections::HashSet;

use indexmap::IndexMap;

use super::monitor::{ResultNames, extract_status_monitor_info};
use super::states::find_lro_status_property;
use super::steps::{
    FinalOperationLink, LinkLocation, OperationLink, OperationReference, ParameterLocation,
    ParameterSource, ResponseModel,
};
use crate::annotations::{
    AnnotationStore, LinkKind, OperationLinkMetadata, PropertyMap, ResultInfo, SourceKind,
};
use crate::diagnostics::{Diagnosed, Diagnostic, DiagnosticCode, DiagnosticCollector};
use crate::graph::{HttpVerb, OperationId, PropertyId, ShapeId, TypeGraph, TypeRef};

/// Header that always carries a polling link
const OPERATION_LOCATION_HEADER: &str = "operation-location";

/// The type a link property points to: an explicit override, else the
/// resource wrapped by a resource-location scalar
pub fn resolve_operation_location<G, A>(
    graph: &G,
    annotations: &A,
    prop: PropertyId,
) -> Option<ResponseModel>
where
    G: TypeGraph + ?Sized,
    A: AnnotationStore + ?Sized,
{
    if let Some(target) = annotations.final_location_override(prop) {
        return Some(target);
    }
    match graph.property(prop).ty {
        TypeRef::Scalar(scalar) => graph.resource_location_target(scalar).map(ResponseModel::Shape),
        _ => None,
    }
}

pub fn create_operation_link<G: TypeGraph + ?Sized>(graph: &G, prop: PropertyId) -> OperationLink {
    let location = if graph.is_body(prop) {
        LinkLocation::SelfLink
    } else if graph.is_header(prop) {
        LinkLocation::ResponseHeader
    } else {
        LinkLocation::ResponseBody
    };
    OperationLink {
        location,
        property: prop,
    }
}

/// A reference to the linked operation; `None` unless every parameter of
/// the link was sourced
pub fn create_operation_reference<G: TypeGraph + ?Sized>(
    graph: &G,
    metadata: &OperationLinkMetadata,
) -> Option<OperationReference> {
    let parameters = metadata.parameter_map.as_ref()?;
    let parameter_map = parameters
        .iter()
        .map(|(name, map)| {
            let location = match map.source_kind {
                SourceKind::RequestBody => ParameterLocation::RequestBody,
                SourceKind::RequestParameter => ParameterLocation::OperationParameters,
                SourceKind::ResponseBody => ParameterLocation::Response,
            };
            let source = ParameterSource {
                location,
                parameter: graph.property(map.source).name.clone(),
            };
            (name.clone(), source)
        })
        .collect();

    Some(OperationReference {
        operation: metadata.linked_operation,
        parameter_map,
        parameters: parameters.clone(),
    })
}

/// A final-location link; the response model is an explicit override, else
/// the wrapped resource type, else `model`
pub fn create_final_operation_link<G, A>(
    graph: &G,
    annotations: &A,
    model: ResponseModel,
    prop: PropertyId,
) -> FinalOperationLink
where
    G: TypeGraph + ?Sized,
    A: AnnotationStore + ?Sized,
{
    let resource = match graph.property(prop).ty {
        TypeRef::Scalar(scalar) => graph.resource_location_target(scalar).map(ResponseModel::Shape),
        _ => None,
    };
    let location = if graph.is_header(prop) {
        LinkLocation::ResponseHeader
    } else {
        LinkLocation::ResponseBody
    };
    FinalOperationLink {
        response_model: annotations
            .final_location_override(prop)
            .or(resource)
            .unwrap_or(model),
        target: OperationLink {
            location,
            property: prop,
        },
    }
}

/// `target` is a GET on the same path as `source`
pub fn is_matching_get_operation<G: TypeGraph + ?Sized>(
    graph: &G,
    source: OperationId,
    target: OperationId,
) -> bool {
    let source = graph.operation(source);
    let target = graph.operation(target);
    source.path == target.path && target.verb == HttpVerb::Get
}

//=== Operation link resolution ===

/// Explicit source for one parameter of a linked operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterMapping {
    /// A request parameter or request body property of the source operation
    RequestParameter(String),
    /// A property of the source operation's response
    ResponseProperty(String),
}

/// Resolve a link from `source` to `target`.
///
/// Target parameters are sourced by name from the source's request
/// parameters, request body and response properties (later matches win),
/// from per-property polling-parameter hints, and from `explicit` mappings
/// (`None` marks a mapping of an unsupported form). The parameter map is
/// kept only if every header, path and query parameter of the target is
/// sourced. Without a result shape on the target nothing is resolved.
pub fn resolve_operation_link<G, A>(
    graph: &G,
    annotations: &A,
    source: OperationId,
    target: OperationId,
    kind: LinkKind,
    explicit: &IndexMap<String, Option<ParameterMapping>>,
    names: &ResultNames,
) -> Diagnosed<OperationLinkMetadata>
where
    G: TypeGraph + ?Sized,
    A: AnnotationStore + ?Sized,
{
    let mut collector = DiagnosticCollector::new();
    let source_name = graph.operation(source).qualified_name();
    let target_name = graph.operation(target).qualified_name();

    let mut target_properties: IndexMap<String, PropertyId> = IndexMap::new();
    let mut builder = ParameterMapBuilder::default();
    for param in graph.request_parameters(target) {
        let name = graph.property(param).name.clone();
        builder.unmatched.insert(name.clone());
        target_properties.insert(name, param);
    }
    match graph.request_body_property(target) {
        Some(body) => {
            target_properties.insert(graph.property(body).name.clone(), body);
        }
        None => {
            for prop in graph.request_body_properties(target) {
                target_properties.insert(graph.property(prop).name.clone(), prop);
            }
        }
    }

    let hint_target = |prop: PropertyId| -> Option<(String, PropertyId)> {
        let hint = annotations.polling_parameter(prop)?;
        let name = if hint.is_empty() {
            graph.property(prop).name.as_str()
        } else {
            hint
        };
        target_properties
            .get(name)
            .map(|target| (graph.property(*target).name.clone(), *target))
    };

    let mut source_body: IndexMap<String, PropertyId> = IndexMap::new();
    for prop in graph.request_body_properties(source) {
        source_body.insert(graph.property(prop).name.clone(), prop);
        if let Some((name, target)) = hint_target(prop) {
            builder.record(name, prop, target, SourceKind::RequestBody);
        }
    }

    let mut source_params: IndexMap<String, PropertyId> = IndexMap::new();
    for prop in graph.request_parameters(source) {
        source_params.insert(graph.property(prop).name.clone(), prop);
        if let Some((name, target)) = hint_target(prop) {
            builder.record(name, prop, target, SourceKind::RequestParameter);
        }
    }

    let mut source_response: IndexMap<String, PropertyId> = IndexMap::new();
    let mut polling_link: Option<OperationLink> = None;
    for shape in graph.response_shapes(source) {
        for prop in graph.properties(shape) {
            source_response.insert(graph.property(prop).name.clone(), prop);
            if let Some((name, target)) = hint_target(prop) {
                builder.record(name, prop, target, SourceKind::ResponseBody);
            }
            if polling_link.is_none() && is_polling_link(graph, annotations, prop) {
                let location = if graph.is_header(prop) {
                    LinkLocation::ResponseHeader
                } else {
                    LinkLocation::ResponseBody
                };
                polling_link = Some(OperationLink {
                    location,
                    property: prop,
                });
            }
        }
    }

    if !builder.unmatched.is_empty() {
        for (name, target_prop) in &target_properties {
            let sources = [
                (&source_params, SourceKind::RequestParameter),
                (&source_body, SourceKind::RequestBody),
                (&source_response, SourceKind::ResponseBody),
            ];
            for (candidates, kind) in sources {
                if let Some(source_prop) = candidates.get(name) {
                    builder.record(name.clone(), *source_prop, *target_prop, kind);
                }
            }
        }
    }

    for (name, mapping) in explicit {
        let Some(mapping) = mapping else {
            collector.add(Diagnostic::new(
                DiagnosticCode::OperationLinkParameterInvalid,
                source_name.clone(),
                "Parameters must be of template type RequestParameter<T> or ResponseProperty<T>.",
            ));
            continue;
        };
        let Some(target_prop) = target_properties.get(name).copied() else {
            collector.add(Diagnostic::new(
                DiagnosticCode::OperationLinkParameterInvalidTarget,
                target_name.clone(),
                format!("Request parameter '{}' not found in linked operation.", name),
            ));
            continue;
        };
        match mapping {
            ParameterMapping::RequestParameter(source_prop) => {
                if let Some(prop) = source_params.get(source_prop) {
                    let kind = SourceKind::RequestParameter;
                    builder.record(name.clone(), *prop, target_prop, kind);
                } else if let Some(prop) = source_body.get(source_prop) {
                    builder.record(name.clone(), *prop, target_prop, SourceKind::RequestBody);
                } else {
                    collector.add(Diagnostic::new(
                        DiagnosticCode::RequestParameterInvalid,
                        source_name.clone(),
                        format!(
                            "Request parameter '{}' not found on request body model.",
                            source_prop
                        ),
                    ));
                }
            }
            ParameterMapping::ResponseProperty(source_prop) => {
                match source_response.get(source_prop) {
                    Some(prop) => {
                        builder.record(name.clone(), *prop, target_prop, SourceKind::ResponseBody)
                    }
                    None => collector.add(Diagnostic::new(
                        DiagnosticCode::ResponsePropertyInvalid,
                        source_name.clone(),
                        format!(
                            "Response property '{}' not found on success response model.",
                            source_prop
                        ),
                    )),
                }
            }
        }
    }

    let result_shape: Option<ShapeId> = graph
        .response_shapes(target)
        .first()
        .map(|shape| graph.body_shape(*shape).unwrap_or(*shape));

    let Some(result_shape) = result_shape else {
        log::debug!("{} link from {} has no result shape", target_name, source_name);
        return collector.wrap(OperationLinkMetadata {
            kind,
            linked_operation: target,
            parameter_map: None,
            result: None,
            link: None,
        });
    };

    let mut status_monitor = None;
    for shape in graph.response_shapes(target) {
        if let Some(status) = find_lro_status_property(graph, annotations, shape) {
            status_monitor = collector.pipe(extract_status_monitor_info(
                graph,
                annotations,
                shape,
                status,
                names,
            ));
            if status_monitor.is_some() {
                break;
            }
        }
    }

    if !builder.unmatched.is_empty() {
        let mut missing: Vec<&String> = builder.unmatched.iter().collect();
        missing.sort();
        log::debug!("{} -> {}: unsourced parameters {:?}", source_name, target_name, missing);
    }

    collector.wrap(OperationLinkMetadata {
        kind,
        linked_operation: target,
        parameter_map: builder.finish(),
        result: Some(ResultInfo {
            shape: Some(result_shape),
            status_monitor,
        }),
        link: polling_link,
    })
}

/// Parameter map under construction plus the target parameters still unsourced
#[derive(Default)]
struct ParameterMapBuilder {
    map: IndexMap<String, PropertyMap>,
    unmatched: HashSet<String>,
}

impl ParameterMapBuilder {
    fn record(
        &mut self,
        target_name: String,
        source: PropertyId,
        target: PropertyId,
        kind: SourceKind,
    ) {
        self.unmatched.remove(&target_name);
        self.map.insert(
            target_name,
            PropertyMap {
                source_kind: kind,
                source,
                target,
            },
        );
    }

    fn finish(self) -> Option<IndexMap<String, PropertyMap>> {
        self.unmatched.is_empty().then_some(self.map)
    }
}

fn is_polling_link<G, A>(graph: &G, annotations: &A, prop: PropertyId) -> bool
where
    G: TypeGraph + ?Sized,
    A: AnnotationStore + ?Sized,
{
    annotations.is_polling_location(prop)
        || graph
            .header_name(prop)
            .is_some_and(|name| name.eq_ignore_ascii_case(OPERATION_LOCATION_HEADER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::Annotations;
    use crate::graph::{ApiGraph, PropertyLocation, StatusCode};

    struct Fixture {
        graph: ApiGraph,
        create: OperationId,
        get_status: OperationId,
    }

    fn fixture() -> Fixture {
        let mut graph = ApiGraph::new();
        let string = graph.string_type();
        let state = graph.add_enum("State", &["Succeeded", "Failed"]).unwrap();

        let monitor = graph.add_shape("JobStatus").unwrap();
        graph.add_field(monitor, "id", string.clone()).unwrap();
        graph.add_field(monitor, "status", TypeRef::Enum(state)).unwrap();

        let status_params = graph.add_shape("GetStatusParams").unwrap();
        graph
            .add_property(status_params, "jobId", string.clone(), PropertyLocation::Path)
            .unwrap();
        let get_status = graph.add_operation("getStatus", HttpVerb::Get, "/jobs/{jobId}").unwrap();
        graph.set_parameters(get_status, status_params);
        graph.add_response(get_status, StatusCode::Code(200), TypeRef::Shape(monitor));

        let accepted = graph.add_shape("JobAccepted").unwrap();
        graph.add_field(accepted, "jobId", string.clone()).unwrap();
        graph
            .add_header(accepted, "operationLocation", "Operation-Location", string)
            .unwrap();
        let create = graph.add_operation("createJob", HttpVerb::Post, "/jobs").unwrap();
        graph.add_response(create, StatusCode::Code(202), TypeRef::Shape(accepted));

        Fixture {
            graph,
            create,
            get_status,
        }
    }

    #[test]
    fn test_response_property_matched_by_name() {
        let f = fixture();
        let result = resolve_operation_link(
            &f.graph,
            &Annotations::new(),
            f.create,
            f.get_status,
            LinkKind::Polling,
            &IndexMap::new(),
            &ResultNames::default(),
        );
        let metadata = result.value;
        let reference = create_operation_reference(&f.graph, &metadata).unwrap();
        assert_eq!(reference.operation, f.get_status);
        assert_eq!(reference.parameter_map["jobId"].location, ParameterLocation::Response);
        assert_eq!(reference.parameter_map["jobId"].parameter, "jobId");

        let map = metadata.parameter_map.as_ref().unwrap();
        assert_eq!(map["jobId"].source_kind, SourceKind::ResponseBody);
        assert_eq!(metadata.link.unwrap().location, LinkLocation::ResponseHeader);
        let info = metadata.result.unwrap();
        assert_eq!(info.shape, f.graph.find_shape("JobStatus"));
        assert!(info.status_monitor.is_some());
    }

    #[test]
    fn test_unsourced_parameter_leaves_map_unresolved() {
        let mut f = fixture();
        let params = f.graph.find_shape("GetStatusParams").unwrap();
        let string = f.graph.string_type();
        f.graph
            .add_property(params, "region", string, PropertyLocation::Query)
            .unwrap();
        let metadata = resolve_operation_link(
            &f.graph,
            &Annotations::new(),
            f.create,
            f.get_status,
            LinkKind::Polling,
            &IndexMap::new(),
            &ResultNames::default(),
        )
        .value;
        assert!(metadata.parameter_map.is_none());
        assert!(create_operation_reference(&f.graph, &metadata).is_none());
    }

    #[test]
    fn test_explicit_mapping_diagnostics() {
        let f = fixture();
        let mut explicit = IndexMap::new();
        explicit.insert(
            "jobId".to_string(),
            Some(ParameterMapping::RequestParameter("nope".into())),
        );
        explicit.insert(
            "other".to_string(),
            Some(ParameterMapping::ResponseProperty("jobId".into())),
        );
        explicit.insert("bad".to_string(), None);
        let result = resolve_operation_link(
            &f.graph,
            &Annotations::new(),
            f.create,
            f.get_status,
            LinkKind::Polling,
            &explicit,
            &ResultNames::default(),
        );
        assert!(result.has(DiagnosticCode::RequestParameterInvalid));
        assert!(result.has(DiagnosticCode::OperationLinkParameterInvalidTarget));
        assert!(result.has(DiagnosticCode::OperationLinkParameterInvalid));
        // the name match still sources jobId
        assert!(result.value.parameter_map.is_some());
    }

    #[test]
    fn test_polling_parameter_hint() {
        let mut f = fixture();
        let accepted = f.graph.find_shape("JobAccepted").unwrap();
        let string = f.graph.string_type();
        let handle = f.graph.add_field(accepted, "handle", string).unwrap();
        let mut annotations = Annotations::new();
        annotations.set_polling_parameter(handle, "jobId");
        let metadata = resolve_operation_link(
            &f.graph,
            &annotations,
            f.create,
            f.get_status,
            LinkKind::Polling,
            &IndexMap::new(),
            &ResultNames::default(),
        )
        .value;
        // the hint sources jobId, so no name matching is needed
        let map = metadata.parameter_map.unwrap();
        assert_eq!(map["jobId"].source, handle);
    }

    #[test]
    fn test_matching_get_operation() {
        let mut graph = ApiGraph::new();
        let put = graph.add_operation("put", HttpVerb::Put, "/w/{id}").unwrap();
        let get = graph.add_operation("get", HttpVerb::Get, "/w/{id}").unwrap();
        let list = graph.add_operation("list", HttpVerb::Get, "/w").unwrap();
        assert!(is_matching_get_operation(&graph, put, get));
        assert!(!is_matching_get_operation(&graph, put, list));
        assert!(!is_matching_get_operation(&graph, get, put));
    }

    #[test]
    fn test_final_link_response_model_priority() {
        let mut graph = ApiGraph::new();
        let widget = graph.add_shape("Widget").unwrap();
        let other = graph.add_shape("Other").unwrap();
        let holder = graph.add_shape("Holder").unwrap();
        let location = graph.resource_location_of(widget);
        let link = graph
            .add_header(holder, "location", "Location", TypeRef::Scalar(location))
            .unwrap();
        let mut annotations = Annotations::new();
        let step = create_final_operation_link(&graph, &annotations, holder.into(), link);
        assert_eq!(step.response_model, ResponseModel::Shape(widget));
        assert_eq!(step.target.location, LinkLocation::ResponseHeader);

        annotations.mark_final_location(link, Some(ResponseModel::Shape(other)));
        let step = create_final_operation_link(&graph, &annotations, holder.into(), link);
        assert_eq!(step.response_model, ResponseModel::Shape(other));
    }
}
