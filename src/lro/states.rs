//! Termination-state extraction
//!
//! Classifies the values of a status field into succeeded, failed and
//! canceled buckets. The field's type is an enum, a union of string
//! literals and enums, or a string scalar whose known values are one of
//! those.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::annotations::{AnnotationStore, MemberRef, StatusTarget, TerminalState};
use crate::diagnostics::{Diagnosed, Diagnostic, DiagnosticCode};
use crate::graph::{PropertyId, ScalarId, ShapeId, TypeGraph, TypeRef, UnionId};

/// Terminal and non-terminal values of a status field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongRunningStates {
    pub succeeded_state: Vec<String>,
    pub failed_state: Vec<String>,
    pub canceled_state: Vec<String>,
    /// Every value in declaration order
    pub states: Vec<String>,
}

impl LongRunningStates {
    fn store(&mut self, name: &str, marker: Option<TerminalState>) {
        self.states.push(name.to_string());
        let bucket = match marker.or_else(|| TerminalState::from_name(name)) {
            Some(TerminalState::Succeeded) => &mut self.succeeded_state,
            Some(TerminalState::Failed) => &mut self.failed_state,
            Some(TerminalState::Canceled) => &mut self.canceled_state,
            None => return,
        };
        bucket.push(name.to_string());
    }

    /// Required terminal states with no value, in reporting order
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.succeeded_state.is_empty() {
            missing.push(TerminalState::Succeeded.default_name());
        }
        if self.failed_state.is_empty() {
            missing.push(TerminalState::Failed.default_name());
        }
        missing
    }

    pub fn is_valid(&self) -> bool {
        self.missing().is_empty()
    }
}

/// Classify the values of `ty`
pub fn extract_lro_states<G, A>(
    graph: &G,
    annotations: &A,
    ty: &TypeRef,
) -> Diagnosed<Option<LongRunningStates>>
where
    G: TypeGraph + ?Sized,
    A: AnnotationStore + ?Sized,
{
    extract(graph, annotations, ty, &graph.type_name(ty))
}

/// Classify the values of a property's type
pub fn extract_property_states<G, A>(
    graph: &G,
    annotations: &A,
    prop: PropertyId,
) -> Diagnosed<Option<LongRunningStates>>
where
    G: TypeGraph + ?Sized,
    A: AnnotationStore + ?Sized,
{
    let ty = graph.property(prop).ty.clone();
    extract(graph, annotations, &ty, &graph.property_label(prop))
}

/// Classify the values of a property's type without requiring the
/// terminal states to be present
pub fn classify_property_states<G, A>(
    graph: &G,
    annotations: &A,
    prop: PropertyId,
) -> Diagnosed<Option<LongRunningStates>>
where
    G: TypeGraph + ?Sized,
    A: AnnotationStore + ?Sized,
{
    let ty = graph.property(prop).ty.clone();
    classify(graph, annotations, &ty, &graph.property_label(prop))
}

fn extract<G, A>(
    graph: &G,
    annotations: &A,
    ty: &TypeRef,
    label: &str,
) -> Diagnosed<Option<LongRunningStates>>
where
    G: TypeGraph + ?Sized,
    A: AnnotationStore + ?Sized,
{
    let (states, diagnostics) = classify(graph, annotations, ty, label).into_parts();
    let Some(states) = states else {
        return Diagnosed::new(None, diagnostics);
    };
    let missing = states.missing();
    if !missing.is_empty() {
        return Diagnosed::new(
            None,
            vec![Diagnostic::new(
                DiagnosticCode::LroStatusMissing,
                label,
                format!(
                    "Terminal long-running operation states are missing: {}.",
                    missing.join(", ")
                ),
            )],
        );
    }
    Diagnosed::clean(Some(states))
}

fn classify<G, A>(
    graph: &G,
    annotations: &A,
    ty: &TypeRef,
    label: &str,
) -> Diagnosed<Option<LongRunningStates>>
where
    G: TypeGraph + ?Sized,
    A: AnnotationStore + ?Sized,
{
    let mut states = LongRunningStates::default();

    match resolve_status_type(graph, ty) {
        Some(TypeRef::Enum(id)) => {
            for member in &graph.enum_type(id).members {
                let marker = annotations.terminal_state(&MemberRef::EnumMember {
                    owner: id,
                    name: member.name.clone(),
                });
                states.store(&member.name, marker);
            }
        }
        Some(TypeRef::Union(id)) => {
            let mut visited = HashSet::new();
            if let Err(diagnostic) =
                collect_union_states(graph, annotations, id, &mut states, &mut visited)
            {
                log::trace!("status union {} rejected: {}", label, diagnostic.message);
                return Diagnosed::new(None, vec![diagnostic]);
            }
        }
        _ => {
            return Diagnosed::new(
                None,
                vec![Diagnostic::new(
                    DiagnosticCode::LroStatusPropertyInvalidType,
                    label,
                    format!(
                        "Property type must be a union of strings or an enum (found {}).",
                        ty.kind_name()
                    ),
                )],
            );
        }
    }

    Diagnosed::clean(Some(states))
}

/// Enums and unions pass through; a scalar resolves to the known values
/// declared on it or on one of its bases
fn resolve_status_type<G: TypeGraph + ?Sized>(graph: &G, ty: &TypeRef) -> Option<TypeRef> {
    match ty {
        TypeRef::Enum(_) | TypeRef::Union(_) => Some(ty.clone()),
        TypeRef::Scalar(id) => known_values(graph, *id),
        _ => None,
    }
}

fn known_values<G: TypeGraph + ?Sized>(graph: &G, scalar: ScalarId) -> Option<TypeRef> {
    let mut visited = HashSet::new();
    let mut current = Some(scalar);
    while let Some(id) = current {
        if !visited.insert(id) {
            break;
        }
        let scalar = graph.scalar(id);
        if let Some(values @ (TypeRef::Enum(_) | TypeRef::Union(_))) = &scalar.known_values {
            return Some(values.clone());
        }
        current = scalar.base;
    }
    None
}

fn collect_union_states<G, A>(
    graph: &G,
    annotations: &A,
    union: UnionId,
    states: &mut LongRunningStates,
    visited: &mut HashSet<UnionId>,
) -> Result<(), Diagnostic>
where
    G: TypeGraph + ?Sized,
    A: AnnotationStore + ?Sized,
{
    if !visited.insert(union) {
        return Ok(());
    }

    for (index, variant) in graph.union_type(union).variants.iter().enumerate() {
        match &variant.ty {
            TypeRef::Enum(id) => {
                for member in &graph.enum_type(*id).members {
                    let marker = annotations.terminal_state(&MemberRef::EnumMember {
                        owner: *id,
                        name: member.name.clone(),
                    });
                    states.store(&member.name, marker);
                }
            }
            TypeRef::Union(id) => collect_union_states(graph, annotations, *id, states, visited)?,
            // open union marker
            TypeRef::Scalar(id) if graph.scalar(*id).name == "string" => continue,
            TypeRef::StringLiteral(value) => {
                let name = variant.name.as_deref().unwrap_or(value);
                let member = MemberRef::UnionVariant { owner: union, index };
                let marker = annotations.terminal_state(&member);
                states.store(name, marker);
            }
            other => {
                return Err(Diagnostic::new(
                    DiagnosticCode::LroStatusUnionNonString,
                    graph.type_name(other),
                    format!("Union contains non-string value type {}.", other.kind_name()),
                ));
            }
        }
    }

    Ok(())
}

/// States of an entity explicitly marked as an lro status; `None` when the
/// entity carries no marker
pub fn get_long_running_states<G, A>(
    graph: &G,
    annotations: &A,
    target: StatusTarget,
) -> Diagnosed<Option<LongRunningStates>>
where
    G: TypeGraph + ?Sized,
    A: AnnotationStore + ?Sized,
{
    if !annotations.has_lro_status(target) {
        return Diagnosed::clean(None);
    }
    match target {
        StatusTarget::Property(prop) => extract_property_states(graph, annotations, prop),
        StatusTarget::Enum(id) => extract_lro_states(graph, annotations, &TypeRef::Enum(id)),
        StatusTarget::Union(id) => extract_lro_states(graph, annotations, &TypeRef::Union(id)),
    }
}

/// Valid states of a property marked as a status field, directly or
/// through its enum or union type
pub fn marked_property_states<G, A>(
    graph: &G,
    annotations: &A,
    prop: PropertyId,
) -> Option<LongRunningStates>
where
    G: TypeGraph + ?Sized,
    A: AnnotationStore + ?Sized,
{
    let marked = get_long_running_states(graph, annotations, StatusTarget::Property(prop));
    if let Some(states) = marked.value {
        return Some(states);
    }
    let target = match graph.property(prop).ty {
        TypeRef::Enum(id) => StatusTarget::Enum(id),
        TypeRef::Union(id) => StatusTarget::Union(id),
        _ => return None,
    };
    get_long_running_states(graph, annotations, target).value
}

/// Locate the status property of a shape: an explicitly marked property
/// first, then `status`, then `provisioningState` at the top level or
/// under `properties`
pub fn find_lro_status_property<G, A>(
    graph: &G,
    annotations: &A,
    shape: ShapeId,
) -> Option<PropertyId>
where
    G: TypeGraph + ?Sized,
    A: AnnotationStore + ?Sized,
{
    if let Some(prop) = graph
        .properties(shape)
        .into_iter()
        .find(|p| marked_property_states(graph, annotations, *p).is_some())
    {
        return Some(prop);
    }

    let candidate = graph
        .property_named(shape, "status")
        .or_else(|| provisioning_state(graph, shape))?;
    extract_property_states(graph, annotations, candidate)
        .value
        .map(|_| candidate)
}

fn provisioning_state<G: TypeGraph + ?Sized>(graph: &G, shape: ShapeId) -> Option<PropertyId> {
    graph.property_named(shape, "provisioningState").or_else(|| {
        let inner = graph.property_named(shape, "properties")?;
        let inner_shape = graph.property(inner).ty.as_shape()?;
        graph.property_named(inner_shape, "provisioningState")
    })
}
