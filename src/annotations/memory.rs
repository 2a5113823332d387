//! Owned annotation store.

use std::collections::{HashMap, HashSet};

use super::store::{
    AnnotationStore, LinkKind, MemberRef, OperationLinkMetadata, PollingLocationInfo,
    StatusTarget, TerminalState,
};
use crate::graph::{OperationId, PropertyId};
use crate::lro::steps::{FinalStateValue, ResponseModel};

/// In-memory [`AnnotationStore`] filled through setters
#[derive(Debug, Clone, Default)]
pub struct Annotations {
    polling_locations: HashSet<PropertyId>,
    polling_location_infos: HashMap<PropertyId, PollingLocationInfo>,
    final_locations: HashMap<PropertyId, Option<ResponseModel>>,
    lro_results: HashSet<PropertyId>,
    lro_error_results: HashSet<PropertyId>,
    lro_status: HashSet<StatusTarget>,
    terminal_states: HashMap<MemberRef, TerminalState>,
    operation_links: HashMap<(OperationId, LinkKind), OperationLinkMetadata>,
    final_state_overrides: HashMap<OperationId, FinalStateValue>,
    polling_parameters: HashMap<PropertyId, String>,
}

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_polling_location(&mut self, prop: PropertyId) {
        self.polling_locations.insert(prop);
    }

    /// Attach status-monitor options; also marks the property as a polling location
    pub fn set_polling_location_info(&mut self, prop: PropertyId, info: PollingLocationInfo) {
        self.polling_locations.insert(prop);
        self.polling_location_infos.insert(prop, info);
    }

    /// Mark a final-location link, optionally naming the resource it returns
    pub fn mark_final_location(&mut self, prop: PropertyId, result: Option<ResponseModel>) {
        self.final_locations.insert(prop, result);
    }

    pub fn mark_lro_result(&mut self, prop: PropertyId) {
        self.lro_results.insert(prop);
    }

    pub fn mark_lro_error_result(&mut self, prop: PropertyId) {
        self.lro_error_results.insert(prop);
    }

    pub fn mark_lro_status(&mut self, target: StatusTarget) {
        self.lro_status.insert(target);
    }

    pub fn mark_terminal_state(&mut self, member: MemberRef, state: TerminalState) {
        self.terminal_states.insert(member, state);
    }

    pub fn set_operation_link(&mut self, op: OperationId, link: OperationLinkMetadata) {
        self.operation_links.insert((op, link.kind), link);
    }

    pub fn set_final_state_override(&mut self, op: OperationId, value: FinalStateValue) {
        self.final_state_overrides.insert(op, value);
    }

    pub fn clear_final_state_override(&mut self, op: OperationId) {
        self.final_state_overrides.remove(&op);
    }

    pub fn set_polling_parameter(&mut self, prop: PropertyId, target: &str) {
        self.polling_parameters.insert(prop, target.to_string());
    }

    /// Every lro-status marker, in no particular order
    pub fn lro_status_targets(&self) -> impl Iterator<Item = &StatusTarget> {
        self.lro_status.iter()
    }
}

impl AnnotationStore for Annotations {
    fn is_polling_location(&self, prop: PropertyId) -> bool {
        self.polling_locations.contains(&prop)
    }

    fn polling_location_info(&self, prop: PropertyId) -> Option<&PollingLocationInfo> {
        self.polling_location_infos.get(&prop)
    }

    fn is_final_location(&self, prop: PropertyId) -> bool {
        self.final_locations.contains_key(&prop)
    }

    fn final_location_override(&self, prop: PropertyId) -> Option<ResponseModel> {
        self.final_locations.get(&prop).copied().flatten()
    }

    fn is_lro_result(&self, prop: PropertyId) -> bool {
        self.lro_results.contains(&prop)
    }

    fn is_lro_error_result(&self, prop: PropertyId) -> bool {
        self.lro_error_results.contains(&prop)
    }

    fn has_lro_status(&self, target: StatusTarget) -> bool {
        self.lro_status.contains(&target)
    }

    fn terminal_state(&self, member: &MemberRef) -> Option<TerminalState> {
        self.terminal_states.get(member).copied()
    }

    fn operation_link(&self, op: OperationId, kind: LinkKind) -> Option<&OperationLinkMetadata> {
        self.operation_links.get(&(op, kind))
    }

    fn final_state_override(&self, op: OperationId) -> Option<FinalStateValue> {
        self.final_state_overrides.get(&op).copied()
    }

    fn polling_parameter(&self, prop: PropertyId) -> Option<&str> {
        self.polling_parameters.get(&prop).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EnumId, ShapeId};

    #[test]
    fn test_markers_round_trip() {
        let mut annotations = Annotations::new();
        let prop = PropertyId(4);
        assert!(!annotations.is_polling_location(prop));
        annotations.mark_polling_location(prop);
        annotations.mark_lro_result(prop);
        assert!(annotations.is_polling_location(prop));
        assert!(annotations.is_lro_result(prop));
        assert!(!annotations.is_lro_error_result(prop));
    }

    #[test]
    fn test_final_location_override() {
        let mut annotations = Annotations::new();
        annotations.mark_final_location(PropertyId(1), None);
        annotations.mark_final_location(PropertyId(2), Some(ResponseModel::Shape(ShapeId(9))));
        assert!(annotations.is_final_location(PropertyId(1)));
        assert_eq!(annotations.final_location_override(PropertyId(1)), None);
        assert_eq!(
            annotations.final_location_override(PropertyId(2)),
            Some(ResponseModel::Shape(ShapeId(9)))
        );
    }

    #[test]
    fn test_terminal_state_lookup() {
        let mut annotations = Annotations::new();
        let member = MemberRef::EnumMember {
            owner: EnumId(0),
            name: "Done".into(),
        };
        annotations.mark_terminal_state(member.clone(), TerminalState::Succeeded);
        assert_eq!(annotations.terminal_state(&member), Some(TerminalState::Succeeded));
    }

    #[test]
    fn test_final_state_override_clear() {
        let mut annotations = Annotations::new();
        annotations.set_final_state_override(OperationId(0), FinalStateValue::Location);
        assert_eq!(
            annotations.final_state_override(OperationId(0)),
            Some(FinalStateValue::Location)
        );
        annotations.clear_final_state_override(OperationId(0));
        assert_eq!(annotations.final_state_override(OperationId(0)), None);
    }
}
