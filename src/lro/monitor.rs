//! Status monitor discovery
//!
//! A status monitor is the resource returned while polling. It carries a
//! status field plus, optionally, the logical result and error details.

use serde::{Deserialize, Serialize};

use super::links::resolve_operation_location;
use super::states::{
    LongRunningStates, extract_property_states, find_lro_status_property, marked_property_states,
};
use super::steps::{PollingOperationStep, ResponseModel, TerminationStatus};
use crate::annotations::{AnnotationStore, PollingLocationInfo};
use crate::diagnostics::{Diagnosed, Diagnostic, DiagnosticCode, DiagnosticCollector};
use crate::graph::{PropertyId, ShapeId, TypeGraph, TypeRef};

/// Property names used when no result or error property is marked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultNames {
    pub result: String,
    pub error: String,
}

impl Default for ResultNames {
    fn default() -> Self {
        Self {
            result: "result".to_string(),
            error: "error".to_string(),
        }
    }
}

/// Everything known about one status monitor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusMonitorInfo {
    pub monitor_type: ShapeId,
    pub status_property: PropertyId,
    pub states: LongRunningStates,
    pub success_property: Option<PropertyId>,
    /// Type of the success property, `Void` when it is not a shape
    pub success_type: ResponseModel,
    pub error_property: Option<PropertyId>,
    pub error_type: Option<ShapeId>,
}

impl StatusMonitorInfo {
    pub fn termination_status(&self) -> TerminationStatus {
        TerminationStatus {
            property: self.status_property,
            succeeded_state: self.states.succeeded_state.clone(),
            failed_state: self.states.failed_state.clone(),
            canceled_state: self.states.canceled_state.clone(),
        }
    }

    pub fn polling_step(&self) -> PollingOperationStep {
        PollingOperationStep {
            response_model: self.monitor_type,
            termination_status: self.termination_status(),
            result_property: self.success_property,
            error_property: self.error_property,
        }
    }
}

//=== Result and error properties ===

fn marked_property<G: TypeGraph + ?Sized>(
    graph: &G,
    shape: ShapeId,
    is_marked: impl Fn(PropertyId) -> bool,
    default_name: Option<&str>,
    label: &str,
    marker: &str,
) -> Diagnosed<Option<PropertyId>> {
    let mut marked = Vec::new();
    let mut fallback = None;
    for prop in graph.properties(shape) {
        if is_marked(prop) {
            marked.push(prop);
        }
        if default_name.is_some_and(|name| graph.property(prop).name.eq_ignore_ascii_case(name)) {
            fallback = fallback.or(Some(prop));
        }
    }

    let mut diagnostics = Vec::new();
    if marked.len() > 1 {
        log::warn!(
            "{} has {} properties marked {}; using the first",
            graph.shape(shape).name,
            marked.len(),
            marker
        );
        diagnostics.push(Diagnostic::new(
            DiagnosticCode::LroStatusMonitorInvalidResultProperty,
            graph.shape(shape).name.clone(),
            format!(
                "StatusMonitor has more than one {} property marked with '{}'. Ensure that only one property in the model is marked with this marker.",
                label, marker
            ),
        ));
    }

    let chosen = marked
        .first()
        .copied()
        .or(fallback)
        .filter(|prop| !graph.property(*prop).ty.is_never());
    Diagnosed::new(chosen, diagnostics)
}

/// The logical result property of a status monitor. `default_name` is
/// consulted only when no property is marked; a `never` typed result means
/// there is none.
pub fn lro_result<G, A>(
    graph: &G,
    annotations: &A,
    shape: ShapeId,
    default_name: Option<&str>,
) -> Diagnosed<Option<PropertyId>>
where
    G: TypeGraph + ?Sized,
    A: AnnotationStore + ?Sized,
{
    marked_property(
        graph,
        shape,
        |prop| annotations.is_lro_result(prop),
        default_name,
        "result",
        "lroResult",
    )
}

/// The error property of a status monitor, with the same rules as [`lro_result`]
pub fn lro_error_result<G, A>(
    graph: &G,
    annotations: &A,
    shape: ShapeId,
    default_name: Option<&str>,
) -> Diagnosed<Option<PropertyId>>
where
    G: TypeGraph + ?Sized,
    A: AnnotationStore + ?Sized,
{
    marked_property(
        graph,
        shape,
        |prop| annotations.is_lro_error_result(prop),
        default_name,
        "error",
        "lroErrorResult",
    )
}

fn shape_or_void(ty: &TypeRef) -> ResponseModel {
    match ty {
        TypeRef::Shape(id) => ResponseModel::Shape(*id),
        _ => ResponseModel::Void,
    }
}

//=== Extraction ===

/// First property of `shape` whose states are valid, either through an
/// explicit marker or by probing its type
pub fn lro_status_property<G, A>(
    graph: &G,
    annotations: &A,
    shape: ShapeId,
) -> Option<PropertyId>
where
    G: TypeGraph + ?Sized,
    A: AnnotationStore + ?Sized,
{
    graph
        .properties(shape)
        .into_iter()
        .find(|prop| property_states(graph, annotations, *prop).is_some())
        .or_else(|| find_lro_status_property(graph, annotations, shape))
}

/// States of a status property, diagnostics discarded
fn property_states<G, A>(
    graph: &G,
    annotations: &A,
    prop: PropertyId,
) -> Option<LongRunningStates>
where
    G: TypeGraph + ?Sized,
    A: AnnotationStore + ?Sized,
{
    marked_property_states(graph, annotations, prop)
        .or_else(|| extract_property_states(graph, annotations, prop).ignore_diagnostics())
}

/// Treat `shape` as a status monitor.
///
/// The success property is a single final-location link resolved to its
/// target, else the marked or default-named result property when it holds a
/// shape. Returns `None` when no status property with valid states exists.
pub fn get_status_monitor_info<G, A>(
    graph: &G,
    annotations: &A,
    shape: ShapeId,
    names: &ResultNames,
) -> Diagnosed<Option<StatusMonitorInfo>>
where
    G: TypeGraph + ?Sized,
    A: AnnotationStore + ?Sized,
{
    match lro_status_property(graph, annotations, shape) {
        Some(status) => status_monitor_with_status(graph, annotations, shape, status, names),
        None => Diagnosed::clean(None),
    }
}

/// [`get_status_monitor_info`] with a known status property
pub fn status_monitor_with_status<G, A>(
    graph: &G,
    annotations: &A,
    shape: ShapeId,
    status: PropertyId,
    names: &ResultNames,
) -> Diagnosed<Option<StatusMonitorInfo>>
where
    G: TypeGraph + ?Sized,
    A: AnnotationStore + ?Sized,
{
    let Some(states) = property_states(graph, annotations, status) else {
        return Diagnosed::clean(None);
    };
    let mut collector = DiagnosticCollector::new();

    let final_links: Vec<PropertyId> = graph
        .properties(shape)
        .into_iter()
        .filter(|prop| annotations.is_final_location(*prop))
        .collect();
    let linked = match final_links.as_slice() {
        [single] => resolve_operation_location(graph, annotations, *single)
            .map(|target| (*single, target)),
        _ => None,
    };

    let (success_property, success_type) = match linked {
        Some((prop, target)) => (Some(prop), target),
        None => {
            let result =
                collector.pipe(lro_result(graph, annotations, shape, Some(&names.result)));
            match result.map(|prop| (prop, graph.property(prop).ty.as_shape())) {
                Some((prop, Some(target))) => (Some(prop), ResponseModel::Shape(target)),
                _ => (None, ResponseModel::Void),
            }
        }
    };

    let error_property =
        collector.pipe(lro_error_result(graph, annotations, shape, Some(&names.error)));
    let error_type = error_property.and_then(|prop| graph.property(prop).ty.as_shape());

    collector.wrap(Some(StatusMonitorInfo {
        monitor_type: shape,
        status_property: status,
        states,
        success_property,
        success_type,
        error_property,
        error_type,
    }))
}

/// Status monitor as recorded on an operation link: the success property is
/// kept whatever its type
pub fn extract_status_monitor_info<G, A>(
    graph: &G,
    annotations: &A,
    shape: ShapeId,
    status: PropertyId,
    names: &ResultNames,
) -> Diagnosed<Option<StatusMonitorInfo>>
where
    G: TypeGraph + ?Sized,
    A: AnnotationStore + ?Sized,
{
    let mut collector = DiagnosticCollector::new();
    let success_property =
        collector.pipe(lro_result(graph, annotations, shape, Some(&names.result)));
    let error_property =
        collector.pipe(lro_error_result(graph, annotations, shape, Some(&names.error)));
    let Some(states) = property_states(graph, annotations, status) else {
        return collector.wrap(None);
    };

    collector.wrap(Some(StatusMonitorInfo {
        monitor_type: shape,
        status_property: status,
        states,
        success_property,
        success_type: success_property
            .map(|prop| shape_or_void(&graph.property(prop).ty))
            .unwrap_or(ResponseModel::Void),
        error_property,
        error_type: error_property.and_then(|prop| graph.property(prop).ty.as_shape()),
    }))
}

/// Status-monitor options attached to a polling-location property.
///
/// `polling_model` must be a shape with a discoverable status property.
/// `final_property` names the result property; when absent the marked or
/// default result property is used.
pub fn extract_polling_location_info<G, A>(
    graph: &G,
    annotations: &A,
    target: PropertyId,
    polling_model: Option<ResponseModel>,
    final_property: Option<&str>,
    names: &ResultNames,
) -> Option<PollingLocationInfo>
where
    G: TypeGraph + ?Sized,
    A: AnnotationStore + ?Sized,
{
    let monitor = polling_model?.as_shape()?;
    let final_prop = final_property
        .and_then(|name| graph.property_named(monitor, name))
        .or_else(|| {
            lro_result(graph, annotations, monitor, Some(&names.result)).ignore_diagnostics()
        });
    let status = find_lro_status_property(graph, annotations, monitor)?;
    let mut info = extract_status_monitor_info(graph, annotations, monitor, status, names)
        .ignore_diagnostics()?;

    let final_result = match final_prop.map(|prop| &graph.property(prop).ty) {
        Some(TypeRef::Shape(id)) => ResponseModel::Shape(*id),
        _ => ResponseModel::Void,
    };
    info.success_property = final_prop;
    info.success_type = final_result;

    Some(PollingLocationInfo {
        target,
        polling_model: Some(ResponseModel::Shape(monitor)),
        final_result: Some(final_result),
        info,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::Annotations;
    use crate::graph::{ApiGraph, Intrinsic};

    struct Fixture {
        graph: ApiGraph,
        monitor: ShapeId,
        status: PropertyId,
        widget: ShapeId,
    }

    fn fixture() -> Fixture {
        let mut graph = ApiGraph::new();
        let state = graph
            .add_enum("OperationState", &["Running", "Succeeded", "Failed", "Canceled"])
            .unwrap();
        let widget = graph.add_shape("Widget").unwrap();
        let monitor = graph.add_shape("OperationStatus").unwrap();
        let status = graph.add_field(monitor, "status", TypeRef::Enum(state)).unwrap();
        Fixture {
            graph,
            monitor,
            status,
            widget,
        }
    }

    #[test]
    fn test_default_result_property() {
        let mut f = fixture();
        let result = f.graph.add_field(f.monitor, "result", TypeRef::Shape(f.widget)).unwrap();
        let info = get_status_monitor_info(
            &f.graph,
            &Annotations::new(),
            f.monitor,
            &ResultNames::default(),
        )
        .value
        .unwrap();
        assert_eq!(info.status_property, f.status);
        assert_eq!(info.success_property, Some(result));
        assert_eq!(info.success_type, ResponseModel::Shape(f.widget));
        assert_eq!(info.states.succeeded_state, vec!["Succeeded"]);
    }

    #[test]
    fn test_default_result_name_is_case_insensitive() {
        let mut f = fixture();
        let result = f.graph.add_field(f.monitor, "Result", TypeRef::Shape(f.widget)).unwrap();
        let info = get_status_monitor_info(
            &f.graph,
            &Annotations::new(),
            f.monitor,
            &ResultNames::default(),
        )
        .value
        .unwrap();
        assert_eq!(info.success_property, Some(result));
    }

    #[test]
    fn test_default_result_name_keeps_first_match() {
        let mut f = fixture();
        let first = f.graph.add_field(f.monitor, "Result", TypeRef::Shape(f.widget)).unwrap();
        f.graph.add_field(f.monitor, "result", TypeRef::Shape(f.widget)).unwrap();
        let info = get_status_monitor_info(
            &f.graph,
            &Annotations::new(),
            f.monitor,
            &ResultNames::default(),
        )
        .value
        .unwrap();
        assert_eq!(info.success_property, Some(first));
    }

    #[test]
    fn test_marked_result_wins_over_default_name() {
        let mut f = fixture();
        f.graph.add_field(f.monitor, "result", TypeRef::Shape(f.widget)).unwrap();
        let output = f.graph.add_field(f.monitor, "output", TypeRef::Shape(f.widget)).unwrap();
        let mut annotations = Annotations::new();
        annotations.mark_lro_result(output);
        let names = ResultNames::default();
        let info = get_status_monitor_info(&f.graph, &annotations, f.monitor, &names)
            .value
            .unwrap();
        assert_eq!(info.success_property, Some(output));
    }

    #[test]
    fn test_ambiguous_result_uses_first_and_warns() {
        let mut f = fixture();
        let first = f.graph.add_field(f.monitor, "first", TypeRef::Shape(f.widget)).unwrap();
        let second = f.graph.add_field(f.monitor, "second", TypeRef::Shape(f.widget)).unwrap();
        let mut annotations = Annotations::new();
        annotations.mark_lro_result(first);
        annotations.mark_lro_result(second);
        let names = ResultNames::default();
        let result = get_status_monitor_info(&f.graph, &annotations, f.monitor, &names);
        assert!(result.has(DiagnosticCode::LroStatusMonitorInvalidResultProperty));
        assert_eq!(result.value.unwrap().success_property, Some(first));
    }

    #[test]
    fn test_never_result_means_no_result() {
        let mut f = fixture();
        f.graph
            .add_field(f.monitor, "result", TypeRef::Intrinsic(Intrinsic::Never))
            .unwrap();
        let info = get_status_monitor_info(
            &f.graph,
            &Annotations::new(),
            f.monitor,
            &ResultNames::default(),
        )
        .value
        .unwrap();
        assert_eq!(info.success_property, None);
        assert_eq!(info.success_type, ResponseModel::Void);
    }

    #[test]
    fn test_error_property_and_custom_names() {
        let mut f = fixture();
        let problem = f.graph.add_shape("Problem").unwrap();
        let failure = f.graph.add_field(f.monitor, "failure", TypeRef::Shape(problem)).unwrap();
        let names = ResultNames {
            result: "output".into(),
            error: "failure".into(),
        };
        let info = get_status_monitor_info(&f.graph, &Annotations::new(), f.monitor, &names)
            .value
            .unwrap();
        assert_eq!(info.error_property, Some(failure));
        assert_eq!(info.error_type, Some(problem));
    }

    #[test]
    fn test_final_location_result() {
        let mut f = fixture();
        let location = f.graph.resource_location_of(f.widget);
        let link = f
            .graph
            .add_field(f.monitor, "resourceLocation", TypeRef::Scalar(location))
            .unwrap();
        let mut annotations = Annotations::new();
        annotations.mark_final_location(link, None);
        let names = ResultNames::default();
        let info = get_status_monitor_info(&f.graph, &annotations, f.monitor, &names)
            .value
            .unwrap();
        assert_eq!(info.success_property, Some(link));
        assert_eq!(info.success_type, ResponseModel::Shape(f.widget));
    }

    #[test]
    fn test_no_status_property() {
        let mut graph = ApiGraph::new();
        let shape = graph.add_shape("Plain").unwrap();
        let string = graph.string_type();
        graph.add_field(shape, "status", string).unwrap();
        let names = ResultNames::default();
        let result = get_status_monitor_info(&graph, &Annotations::new(), shape, &names);
        assert!(result.value.is_none());
    }

    #[test]
    fn test_polling_location_info_final_property() {
        let mut f = fixture();
        let output = f.graph.add_field(f.monitor, "output", TypeRef::Shape(f.widget)).unwrap();
        let holder = f.graph.add_shape("Accepted").unwrap();
        let string = f.graph.string_type();
        let link = f.graph.add_header(holder, "location", "Operation-Location", string).unwrap();
        let info = extract_polling_location_info(
            &f.graph,
            &Annotations::new(),
            link,
            Some(ResponseModel::Shape(f.monitor)),
            Some("output"),
            &ResultNames::default(),
        )
        .unwrap();
        assert_eq!(info.info.success_property, Some(output));
        assert_eq!(info.final_result, Some(ResponseModel::Shape(f.widget)));
        assert!(
            extract_polling_location_info(
                &f.graph,
                &Annotations::new(),
                link,
                Some(ResponseModel::Void),
                None,
                &ResultNames::default(),
            )
            .is_none()
        );
    }
}
