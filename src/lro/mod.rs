//! Long-running operation inference
//!
//! - steps: step kinds, final-state values and the [`LroMetadata`] record
//! - states: termination-state extraction from status enums and unions
//! - monitor: status-monitor discovery (status, result and error properties)
//! - links: operation links, references and parameter-map resolution
//! - context: per-operation resolution state
//! - final_step / monitor_step / final_state: engine stages
//! - engine: [`LroEngine`], the top-level orchestrator
//! - cache: per-operation memoization keyed by snapshot fingerprint
//! - report: name-resolved output view

pub mod cache;
pub mod context;
pub mod engine;
pub mod final_state;
pub mod final_step;
pub mod links;
pub mod monitor;
pub mod monitor_step;
pub mod report;
pub mod states;
pub mod steps;

pub use cache::MetadataCache;
pub use engine::{EngineOptions, LroEngine};
pub use final_state::{final_state_from_header, logical_resource_operation, validate_final_state};
pub use links::{
    ParameterMapping, create_operation_link, create_operation_reference, resolve_operation_link,
    resolve_operation_location,
};
pub use monitor::{
    ResultNames, StatusMonitorInfo, extract_polling_location_info, extract_status_monitor_info,
    get_status_monitor_info, lro_error_result, lro_result,
};
pub use report::{MetadataReport, PollingReport, StepReport};
pub use states::{
    LongRunningStates, classify_property_states, extract_lro_states, extract_property_states,
    find_lro_status_property, get_long_running_states,
};
pub use steps::{
    FinalOperationLink, FinalOperationReference, FinalStateValue, FinalStep, LinkLocation,
    LroMetadata, NextOperationLink, NextOperationReference, OperationLink, OperationReference,
    OperationStep, ParameterLocation, ParameterSource, PollingOperationStep,
    PollingSuccessProperty, ResponseModel, StatusMonitorStep, TerminationStatus,
};
