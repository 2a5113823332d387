//! Name-resolved view of [`LroMetadata`] for tooling output.
//!
//! Metadata refers to graph entities by id; a report spells every id out as
//! a shape name, `Shape.property` label, or qualified operation name so it
//! can be printed as JSON or YAML on its own.

use indexmap::IndexMap;
use serde::Serialize;

use super::steps::{
    FinalStateValue, LinkLocation, LroMetadata, OperationStep, ParameterSource,
    PollingOperationStep, ResponseModel,
};
use crate::graph::TypeGraph;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataReport {
    pub operation: String,
    pub verb: String,
    pub path: String,
    pub logical_result: String,
    pub final_state_via: FinalStateValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_monitor_step: Option<StepReport>,
    pub polling_info: PollingReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_step: Option<StepReport>,
    pub envelope_result: String,
    pub final_result: String,
    pub final_envelope_result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logical_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_result_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingReport {
    pub response_model: String,
    pub status_property: String,
    pub succeeded_state: Vec<String>,
    pub failed_state: Vec<String>,
    pub canceled_state: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_property: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_property: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    pub kind: &'static str,
    pub response_model: String,
    /// Property label or operation name the step points at
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<LinkLocation>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, ParameterSource>,
}

fn model_name<G: TypeGraph + ?Sized>(graph: &G, model: ResponseModel) -> String {
    match model {
        ResponseModel::Shape(id) => graph.shape(id).name.clone(),
        ResponseModel::Void => "void".to_string(),
    }
}

impl StepReport {
    pub fn from_step<G: TypeGraph + ?Sized>(graph: &G, step: &OperationStep) -> Self {
        let mut report = StepReport {
            kind: step.kind(),
            response_model: model_name(graph, step.response_model()),
            target: None,
            location: None,
            parameters: IndexMap::new(),
        };
        match step {
            OperationStep::NextOperationLink(link) => {
                report.target = Some(graph.property_label(link.target.property));
                report.location = Some(link.target.location);
            }
            OperationStep::FinalOperationLink(link) => {
                report.target = Some(graph.property_label(link.target.property));
                report.location = Some(link.target.location);
            }
            OperationStep::NextOperationReference(reference) => {
                report.target = Some(graph.operation(reference.target.operation).qualified_name());
                report.parameters = reference.target.parameter_map.clone();
            }
            OperationStep::FinalOperationReference(reference) => {
                report.target = Some(graph.operation(reference.target.operation).qualified_name());
                report.parameters = reference.target.parameter_map.clone();
            }
            OperationStep::PollingSuccessProperty(success) => {
                report.target = Some(graph.property_label(success.target));
            }
            OperationStep::PollingOperationStep(_) | OperationStep::NoPollingResult => {}
        }
        report
    }
}

impl PollingReport {
    pub fn from_step<G: TypeGraph + ?Sized>(graph: &G, step: &PollingOperationStep) -> Self {
        let status = &step.termination_status;
        PollingReport {
            response_model: graph.shape(step.response_model).name.clone(),
            status_property: graph.property_label(status.property),
            succeeded_state: status.succeeded_state.clone(),
            failed_state: status.failed_state.clone(),
            canceled_state: status.canceled_state.clone(),
            result_property: step.result_property.map(|prop| graph.property(prop).name.clone()),
            error_property: step.error_property.map(|prop| graph.property(prop).name.clone()),
        }
    }
}

impl MetadataReport {
    pub fn from_metadata<G: TypeGraph + ?Sized>(graph: &G, metadata: &LroMetadata) -> Self {
        let operation = graph.operation(metadata.operation);
        MetadataReport {
            operation: operation.qualified_name(),
            verb: operation.verb.as_str().to_uppercase(),
            path: operation.path.clone(),
            logical_result: graph.shape(metadata.logical_result).name.clone(),
            final_state_via: metadata.final_state_via,
            status_monitor_step: metadata
                .status_monitor_step
                .clone()
                .map(|step| StepReport::from_step(graph, &step.into())),
            polling_info: PollingReport::from_step(graph, &metadata.polling_info),
            final_step: metadata
                .final_step
                .clone()
                .map(|step| StepReport::from_step(graph, &step.into())),
            envelope_result: graph.shape(metadata.envelope_result).name.clone(),
            final_result: model_name(graph, metadata.final_result),
            final_envelope_result: model_name(graph, metadata.final_envelope_result),
            logical_path: metadata.logical_path.clone(),
            final_result_path: metadata.final_result_path.clone(),
        }
    }
}
