//! The annotation store interface
//!
//! Explicit author hints live outside the type graph. The engine reads them
//! through [`AnnotationStore`], one accessor per annotation kind, and never
//! writes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::graph::{EnumId, OperationId, PropertyId, ShapeId, UnionId};
use crate::lro::monitor::StatusMonitorInfo;
use crate::lro::steps::{FinalStateValue, OperationLink, ResponseModel};

/// Entities that may carry an lro-status marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum StatusTarget {
    Property(PropertyId),
    Enum(EnumId),
    Union(UnionId),
}

/// An enum member or union variant that may carry a terminal-state marker
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MemberRef {
    EnumMember { owner: EnumId, name: String },
    UnionVariant { owner: UnionId, index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TerminalState {
    Succeeded,
    Failed,
    Canceled,
}

impl TerminalState {
    /// The member name that implies this state without any marker
    pub fn default_name(&self) -> &'static str {
        match self {
            TerminalState::Succeeded => "Succeeded",
            TerminalState::Failed => "Failed",
            TerminalState::Canceled => "Canceled",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Succeeded" => Some(TerminalState::Succeeded),
            "Failed" => Some(TerminalState::Failed),
            "Canceled" => Some(TerminalState::Canceled),
            _ => None,
        }
    }
}

/// Kinds of explicit operation links
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LinkKind {
    Polling,
    Final,
    NextPage,
}

/// Where a linked operation's parameter value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    RequestParameter,
    RequestBody,
    ResponseBody,
}

/// One resolved entry of an operation link's parameter map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyMap {
    pub source_kind: SourceKind,
    pub source: PropertyId,
    pub target: PropertyId,
}

/// What calling a linked operation returns
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ResultInfo {
    /// Logical response shape of the linked operation
    pub shape: Option<ShapeId>,
    /// Status monitor found in the linked operation's responses
    pub status_monitor: Option<StatusMonitorInfo>,
}

/// A resolved explicit link from one operation to another
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationLinkMetadata {
    pub kind: LinkKind,
    pub linked_operation: OperationId,
    /// `None` when some target parameter could not be sourced
    pub parameter_map: Option<IndexMap<String, PropertyMap>>,
    pub result: Option<ResultInfo>,
    /// Polling link found in the source operation's responses
    pub link: Option<OperationLink>,
}

/// Status-monitor options attached to a polling-location property
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollingLocationInfo {
    pub target: PropertyId,
    pub polling_model: Option<ResponseModel>,
    pub final_result: Option<ResponseModel>,
    pub info: StatusMonitorInfo,
}

/// Read-only access to explicit author hints
pub trait AnnotationStore: Send + Sync {
    /// Property holds a link to the polling endpoint
    fn is_polling_location(&self, prop: PropertyId) -> bool;

    fn polling_location_info(&self, prop: PropertyId) -> Option<&PollingLocationInfo>;

    /// Property holds a link to the final result
    fn is_final_location(&self, prop: PropertyId) -> bool;

    /// Explicit type of the resource a final-location link points to
    fn final_location_override(&self, prop: PropertyId) -> Option<ResponseModel>;

    fn is_lro_result(&self, prop: PropertyId) -> bool;

    fn is_lro_error_result(&self, prop: PropertyId) -> bool;

    fn has_lro_status(&self, target: StatusTarget) -> bool;

    fn terminal_state(&self, member: &MemberRef) -> Option<TerminalState>;

    fn operation_link(&self, op: OperationId, kind: LinkKind) -> Option<&OperationLinkMetadata>;

    fn final_state_override(&self, op: OperationId) -> Option<FinalStateValue>;

    /// Explicit target parameter name a source property feeds when calling a
    /// linked operation; an empty string means "same name"
    fn polling_parameter(&self, prop: PropertyId) -> Option<&str>;
}
