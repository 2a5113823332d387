//! Resolution state threaded through the engine stages.
//!
//! Each stage receives the context produced by the previous one and returns
//! a new value; nothing is shared or mutated between stages.

use super::steps::{FinalStep, PollingOperationStep, StatusMonitorStep};
use crate::annotations::OperationLinkMetadata;
use crate::graph::{OperationId, ShapeId};

#[derive(Debug, Clone)]
pub struct LroContext<'a> {
    pub operation: OperationId,
    /// Success response shape of the original operation
    pub original_model: ShapeId,
    pub final_step: Option<FinalStep>,
    /// Explicit final-operation link that produced `final_step`, if any
    pub final_operation_link: Option<&'a OperationLinkMetadata>,
    pub polling_operation_link: Option<&'a OperationLinkMetadata>,
    pub status_monitor_step: Option<StatusMonitorStep>,
    pub polling_step: Option<PollingOperationStep>,
}

impl<'a> LroContext<'a> {
    pub fn new(operation: OperationId, original_model: ShapeId) -> Self {
        Self {
            operation,
            original_model,
            final_step: None,
            final_operation_link: None,
            polling_operation_link: None,
            status_monitor_step: None,
            polling_step: None,
        }
    }

    /// Record `step` unless a final step is already known
    pub fn with_final_step(self, step: Option<FinalStep>) -> Self {
        match self.final_step {
            Some(_) => self,
            None => Self {
                final_step: step,
                ..self
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_final_step_sticks() {
        let ctx = LroContext::new(OperationId(0), ShapeId(0))
            .with_final_step(Some(FinalStep::NoPollingResult))
            .with_final_step(None);
        assert_eq!(ctx.final_step, Some(FinalStep::NoPollingResult));
    }
}
