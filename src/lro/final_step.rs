//! Final-step resolution: how the logical result is fetched once polling
//! completes. Runs against the original operation and again against a
//! referenced polling operation; a recorded final step is never replaced.

use super::context::LroContext;
use super::engine::LroEngine;
use super::links::{create_final_operation_link, create_operation_reference};
use super::steps::{FinalOperationReference, FinalStep, ResponseModel};
use crate::annotations::{AnnotationStore, LinkKind};
use crate::graph::{OperationId, PropertyId, TypeGraph};

impl<'a, G, A> LroEngine<'a, G, A>
where
    G: TypeGraph + ?Sized,
    A: AnnotationStore + ?Sized,
{
    /// An explicit final-operation link with a sourced parameter map and a
    /// result shape becomes a [`FinalStep::Reference`]
    pub(super) fn process_final_reference(
        &self,
        op: OperationId,
        ctx: LroContext<'a>,
    ) -> LroContext<'a> {
        if ctx.final_step.is_some() {
            return ctx;
        }
        let Some(link) = self.annotations.operation_link(op, LinkKind::Final) else {
            return ctx;
        };
        let Some(shape) = link.result.as_ref().and_then(|result| result.shape) else {
            return ctx;
        };
        if link.parameter_map.is_none() {
            return ctx;
        }

        let ctx = LroContext {
            final_operation_link: Some(link),
            ..ctx
        };
        let step = create_operation_reference(self.graph, link).map(|target| {
            log::debug!(
                "{}: final result via {}",
                self.graph.operation(op).qualified_name(),
                self.graph.operation(target.operation).qualified_name()
            );
            FinalStep::Reference(FinalOperationReference {
                response_model: ResponseModel::Shape(shape),
                target,
            })
        });
        ctx.with_final_step(step)
    }

    /// A single final-location property on the first response shape that
    /// has one becomes a [`FinalStep::Link`]
    pub(super) fn process_final_link(
        &self,
        op: OperationId,
        ctx: LroContext<'a>,
    ) -> LroContext<'a> {
        if ctx.final_step.is_some() {
            return ctx;
        }
        let is_final = |prop: PropertyId| self.annotations.is_final_location(prop);
        let Some(shape) = self.find_response_shape(op, is_final) else {
            return ctx;
        };
        let finals: Vec<PropertyId> = self
            .graph
            .properties(shape)
            .into_iter()
            .filter(|prop| is_final(*prop))
            .collect();
        let [link] = finals.as_slice() else {
            log::trace!(
                "{}: {} final-location properties, expected one",
                self.graph.shape(shape).name,
                finals.len()
            );
            return ctx;
        };

        let override_model = ctx
            .final_operation_link
            .and_then(|link| link.result.as_ref())
            .and_then(|result| result.shape);
        let model = ResponseModel::Shape(override_model.unwrap_or(shape));
        let step = create_final_operation_link(self.graph, self.annotations, model, *link);
        ctx.with_final_step(Some(FinalStep::Link(step)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{Annotations, OperationLinkMetadata, ResultInfo};
    use crate::graph::{ApiGraph, HttpVerb, ShapeId, StatusCode, TypeRef};
    use crate::lro::steps::LinkLocation;
    use indexmap::IndexMap;

    fn operation_with_response(graph: &mut ApiGraph, name: &str) -> (OperationId, ShapeId) {
        let shape = graph.add_shape(&format!("{}Response", name)).unwrap();
        let op = graph.add_operation(name, HttpVerb::Post, &format!("/{}", name)).unwrap();
        graph.add_response(op, StatusCode::Code(202), TypeRef::Shape(shape));
        (op, shape)
    }

    #[test]
    fn test_single_final_location_header() {
        let mut graph = ApiGraph::new();
        let (op, shape) = operation_with_response(&mut graph, "export");
        let string = graph.string_type();
        let link = graph.add_header(shape, "location", "Location", string).unwrap();
        let mut annotations = Annotations::new();
        annotations.mark_final_location(link, None);

        let engine = LroEngine::new(&graph, &annotations);
        let ctx = engine.process_final_link(op, LroContext::new(op, shape));
        match ctx.final_step {
            Some(FinalStep::Link(step)) => {
                assert_eq!(step.response_model, ResponseModel::Shape(shape));
                assert_eq!(step.target.location, LinkLocation::ResponseHeader);
                assert_eq!(step.target.property, link);
            }
            other => panic!("unexpected final step {:?}", other),
        }
    }

    #[test]
    fn test_two_final_locations_are_ignored() {
        let mut graph = ApiGraph::new();
        let (op, shape) = operation_with_response(&mut graph, "export");
        let string = graph.string_type();
        let first = graph.add_header(shape, "location", "Location", string.clone()).unwrap();
        let second = graph.add_field(shape, "resultUrl", string).unwrap();
        let mut annotations = Annotations::new();
        annotations.mark_final_location(first, None);
        annotations.mark_final_location(second, None);

        let engine = LroEngine::new(&graph, &annotations);
        let ctx = engine.process_final_link(op, LroContext::new(op, shape));
        assert!(ctx.final_step.is_none());
    }

    #[test]
    fn test_final_reference_requires_parameter_map() {
        let mut graph = ApiGraph::new();
        let (op, shape) = operation_with_response(&mut graph, "export");
        let (target, result) = operation_with_response(&mut graph, "fetch");
        let mut annotations = Annotations::new();
        let mut link = OperationLinkMetadata {
            kind: LinkKind::Final,
            linked_operation: target,
            parameter_map: None,
            result: Some(ResultInfo {
                shape: Some(result),
                status_monitor: None,
            }),
            link: None,
        };
        annotations.set_operation_link(op, link.clone());
        {
            let engine = LroEngine::new(&graph, &annotations);
            let ctx = engine.process_final_reference(op, LroContext::new(op, shape));
            assert!(ctx.final_step.is_none());
        }

        link.parameter_map = Some(IndexMap::new());
        annotations.set_operation_link(op, link);
        let engine = LroEngine::new(&graph, &annotations);
        let ctx = engine.process_final_reference(op, LroContext::new(op, shape));
        match ctx.final_step {
            Some(FinalStep::Reference(step)) => {
                assert_eq!(step.response_model, ResponseModel::Shape(result));
                assert_eq!(step.target.operation, target);
            }
            other => panic!("unexpected final step {:?}", other),
        }
        assert!(ctx.final_operation_link.is_some());
    }
}
