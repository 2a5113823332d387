//! Step and metadata types produced by the engine
//!
//! An LRO is described as a short sequence of steps: how to reach the status
//! monitor, how to poll it, and how to fetch the final result. Every step
//! kind is a variant of the closed [`OperationStep`] sum type; the narrower
//! [`StatusMonitorStep`] and [`FinalStep`] types restrict what may appear in
//! each slot of [`LroMetadata`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::annotations::PropertyMap;
use crate::graph::{OperationId, PropertyId, ShapeId};

/// The response of a step: a concrete shape or the intrinsic `void`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseModel {
    Shape(ShapeId),
    Void,
}

impl ResponseModel {
    pub fn as_shape(&self) -> Option<ShapeId> {
        match self {
            ResponseModel::Shape(id) => Some(*id),
            ResponseModel::Void => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, ResponseModel::Void)
    }
}

impl From<ShapeId> for ResponseModel {
    fn from(id: ShapeId) -> Self {
        ResponseModel::Shape(id)
    }
}

//=== Links and references ===

/// Where a link value is found in a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkLocation {
    ResponseHeader,
    ResponseBody,
    /// The property is the whole body
    #[serde(rename = "Self")]
    SelfLink,
}

/// A runtime link held in a response property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationLink {
    pub location: LinkLocation,
    pub property: PropertyId,
}

/// Where a referenced operation's parameter value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterLocation {
    RequestBody,
    OperationParameters,
    Response,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSource {
    pub location: ParameterLocation,
    /// Name of the source property
    pub parameter: String,
}

/// A call to another operation, with every parameter sourced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationReference {
    pub operation: OperationId,
    /// Target parameter name to value source
    pub parameter_map: IndexMap<String, ParameterSource>,
    /// The resolved property-level map the sources were derived from
    pub parameters: IndexMap<String, PropertyMap>,
}

//=== Steps ===

/// How terminal states are recognized while polling
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminationStatus {
    pub property: PropertyId,
    pub succeeded_state: Vec<String>,
    pub failed_state: Vec<String>,
    pub canceled_state: Vec<String>,
}

/// Polling the status monitor until a terminal state is reached
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollingOperationStep {
    pub response_model: ShapeId,
    pub termination_status: TerminationStatus,
    pub result_property: Option<PropertyId>,
    pub error_property: Option<PropertyId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NextOperationLink {
    pub response_model: ShapeId,
    pub target: OperationLink,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextOperationReference {
    pub response_model: ShapeId,
    pub target: OperationReference,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FinalOperationLink {
    pub response_model: ResponseModel,
    pub target: OperationLink,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalOperationReference {
    pub response_model: ResponseModel,
    pub target: OperationReference,
}

/// The result is a property of the final polling response
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PollingSuccessProperty {
    pub response_model: ShapeId,
    pub target: PropertyId,
    /// The property that led to the status monitor, if any
    pub source_property: Option<PropertyId>,
}

/// Every step kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum OperationStep {
    PollingOperationStep(PollingOperationStep),
    NextOperationLink(NextOperationLink),
    NextOperationReference(NextOperationReference),
    FinalOperationLink(FinalOperationLink),
    FinalOperationReference(FinalOperationReference),
    PollingSuccessProperty(PollingSuccessProperty),
    NoPollingResult,
}

impl OperationStep {
    pub fn kind(&self) -> &'static str {
        match self {
            OperationStep::PollingOperationStep(_) => "pollingOperationStep",
            OperationStep::NextOperationLink(_) => "nextOperationLink",
            OperationStep::NextOperationReference(_) => "nextOperationReference",
            OperationStep::FinalOperationLink(_) => "finalOperationLink",
            OperationStep::FinalOperationReference(_) => "finalOperationReference",
            OperationStep::PollingSuccessProperty(_) => "pollingSuccessProperty",
            OperationStep::NoPollingResult => "noPollingResult",
        }
    }

    pub fn response_model(&self) -> ResponseModel {
        match self {
            OperationStep::PollingOperationStep(step) => step.response_model.into(),
            OperationStep::NextOperationLink(step) => step.response_model.into(),
            OperationStep::NextOperationReference(step) => step.response_model.into(),
            OperationStep::FinalOperationLink(step) => step.response_model,
            OperationStep::FinalOperationReference(step) => step.response_model,
            OperationStep::PollingSuccessProperty(step) => step.response_model.into(),
            OperationStep::NoPollingResult => ResponseModel::Void,
        }
    }
}

/// How the status monitor is reached from the original operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StatusMonitorStep {
    #[serde(rename = "nextOperationLink")]
    Link(NextOperationLink),
    #[serde(rename = "nextOperationReference")]
    Reference(NextOperationReference),
}

impl StatusMonitorStep {
    pub fn response_model(&self) -> ShapeId {
        match self {
            StatusMonitorStep::Link(step) => step.response_model,
            StatusMonitorStep::Reference(step) => step.response_model,
        }
    }
}

/// How the logical result is obtained once polling completes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum FinalStep {
    #[serde(rename = "finalOperationLink")]
    Link(FinalOperationLink),
    #[serde(rename = "finalOperationReference")]
    Reference(FinalOperationReference),
    #[serde(rename = "pollingSuccessProperty")]
    PollingSuccessProperty(PollingSuccessProperty),
    #[serde(rename = "noPollingResult")]
    NoPollingResult,
}

impl FinalStep {
    pub fn kind(&self) -> &'static str {
        OperationStep::from(self.clone()).kind()
    }

    pub fn response_model(&self) -> ResponseModel {
        match self {
            FinalStep::Link(step) => step.response_model,
            FinalStep::Reference(step) => step.response_model,
            FinalStep::PollingSuccessProperty(step) => step.response_model.into(),
            FinalStep::NoPollingResult => ResponseModel::Void,
        }
    }
}

impl From<StatusMonitorStep> for OperationStep {
    fn from(step: StatusMonitorStep) -> Self {
        match step {
            StatusMonitorStep::Link(link) => OperationStep::NextOperationLink(link),
            StatusMonitorStep::Reference(reference) => {
                OperationStep::NextOperationReference(reference)
            }
        }
    }
}

impl From<FinalStep> for OperationStep {
    fn from(step: FinalStep) -> Self {
        match step {
            FinalStep::Link(link) => OperationStep::FinalOperationLink(link),
            FinalStep::Reference(reference) => OperationStep::FinalOperationReference(reference),
            FinalStep::PollingSuccessProperty(prop) => OperationStep::PollingSuccessProperty(prop),
            FinalStep::NoPollingResult => OperationStep::NoPollingResult,
        }
    }
}

//=== Final state ===

/// How a client detects completion and fetches the final result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinalStateValue {
    /// GET the original request URI
    OriginalUri,
    Location,
    AzureAsyncOperation,
    OperationLocation,
    /// A header or body link other than the well-known ones
    CustomLink,
    /// Call a referenced operation
    CustomOperationReference,
}

impl FinalStateValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinalStateValue::OriginalUri => "original-uri",
            FinalStateValue::Location => "location",
            FinalStateValue::AzureAsyncOperation => "azure-async-operation",
            FinalStateValue::OperationLocation => "operation-location",
            FinalStateValue::CustomLink => "custom-link",
            FinalStateValue::CustomOperationReference => "custom-operation-reference",
        }
    }

    /// Parse the kebab-case or camelCase spelling, ignoring case
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "original-uri" | "originaluri" => Some(FinalStateValue::OriginalUri),
            "location" => Some(FinalStateValue::Location),
            "azure-async-operation" | "azureasyncoperation" => {
                Some(FinalStateValue::AzureAsyncOperation)
            }
            "operation-location" | "operationlocation" => Some(FinalStateValue::OperationLocation),
            "custom-link" | "customlink" => Some(FinalStateValue::CustomLink),
            "custom-operation-reference" | "customoperationreference" => {
                Some(FinalStateValue::CustomOperationReference)
            }
            _ => None,
        }
    }

    /// The well-known header a header-based value polls, lowercased
    pub fn header_name(&self) -> Option<&'static str> {
        match self {
            FinalStateValue::AzureAsyncOperation => Some("azure-asyncoperation"),
            FinalStateValue::Location => Some("location"),
            FinalStateValue::OperationLocation => Some("operation-location"),
            _ => None,
        }
    }
}

impl fmt::Display for FinalStateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//=== Metadata ===

/// Everything a client needs to drive one long-running operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LroMetadata {
    pub operation: OperationId,
    /// The value the caller logically receives when the operation completes
    pub logical_result: ShapeId,
    pub final_state_via: FinalStateValue,
    pub status_monitor_step: Option<StatusMonitorStep>,
    pub polling_info: PollingOperationStep,
    pub final_step: Option<FinalStep>,
    /// The full polling response
    pub envelope_result: ShapeId,
    pub final_result: ResponseModel,
    pub final_envelope_result: ResponseModel,
    /// Property of the envelope holding the logical result
    pub logical_path: Option<String>,
    pub final_result_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_state_value_strings() {
        assert_eq!(FinalStateValue::AzureAsyncOperation.as_str(), "azure-async-operation");
        assert_eq!(
            serde_json::to_string(&FinalStateValue::OriginalUri).unwrap(),
            "\"original-uri\""
        );
        assert_eq!(FinalStateValue::parse("originalUri"), Some(FinalStateValue::OriginalUri));
        assert_eq!(
            FinalStateValue::parse("Operation-Location"),
            Some(FinalStateValue::OperationLocation)
        );
        assert_eq!(FinalStateValue::parse("somewhere"), None);
    }

    #[test]
    fn test_header_names() {
        assert_eq!(FinalStateValue::Location.header_name(), Some("location"));
        assert_eq!(FinalStateValue::OriginalUri.header_name(), None);
    }

    #[test]
    fn test_final_step_kind_and_model() {
        assert_eq!(FinalStep::NoPollingResult.kind(), "noPollingResult");
        assert!(FinalStep::NoPollingResult.response_model().is_void());

        let step = FinalStep::PollingSuccessProperty(PollingSuccessProperty {
            response_model: ShapeId(2),
            target: PropertyId(5),
            source_property: None,
        });
        assert_eq!(step.kind(), "pollingSuccessProperty");
        assert_eq!(step.response_model(), ResponseModel::Shape(ShapeId(2)));
    }

    #[test]
    fn test_step_serializes_kind_tag() {
        let step = StatusMonitorStep::Link(NextOperationLink {
            response_model: ShapeId(1),
            target: OperationLink {
                location: LinkLocation::ResponseHeader,
                property: PropertyId(3),
            },
        });
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["kind"], "nextOperationLink");
        assert_eq!(json["target"]["location"], "ResponseHeader");

        let json = serde_json::to_value(FinalStep::NoPollingResult).unwrap();
        assert_eq!(json["kind"], "noPollingResult");
    }

    #[test]
    fn test_self_link_serialization() {
        assert_eq!(serde_json::to_string(&LinkLocation::SelfLink).unwrap(), "\"Self\"");
    }
}
