//! Read-only navigation over an API type graph.
//!
//! The LRO engine never owns the graph. It asks questions through
//! [`TypeGraph`]: arena lookups are required, everything else (inherited
//! property walks, success-response resolution, request enumeration) comes
//! from provided methods built on top of them.

use std::collections::HashSet;

use super::ids::{EnumId, OperationId, PropertyId, ScalarId, ShapeId, UnionId};
use super::types::{
    EnumType, Operation, Property, PropertyLocation, ResourceOperation, ResourceOperationKind,
    Scalar, Shape, TypeRef, UnionType,
};

/// Immutable view of a type graph
pub trait TypeGraph: Send + Sync {
    fn shape(&self, id: ShapeId) -> &Shape;

    fn property(&self, id: PropertyId) -> &Property;

    fn enum_type(&self, id: EnumId) -> &EnumType;

    fn union_type(&self, id: UnionId) -> &UnionType;

    fn scalar(&self, id: ScalarId) -> &Scalar;

    fn operation(&self, id: OperationId) -> &Operation;

    /// All operations in declaration order
    fn operations(&self) -> Vec<OperationId>;

    /// Resource lifecycle classification, if the graph knows one
    fn resource_operation(&self, id: OperationId) -> Option<ResourceOperation> {
        self.operation(id).resource
    }

    /// Whether the operation is a resource action, by flag or by lifecycle kind
    fn is_action(&self, id: OperationId) -> bool {
        self.operation(id).action
            || self
                .resource_operation(id)
                .is_some_and(|resource| resource.kind == ResourceOperationKind::Action)
    }

    /// Properties of a shape including inherited ones.
    ///
    /// Own properties come first, then each base in turn. A property name
    /// already seen on a more derived shape hides the base declaration.
    fn properties(&self, shape: ShapeId) -> Vec<PropertyId> {
        let mut result = Vec::new();
        let mut names: HashSet<&str> = HashSet::new();
        let mut visited = HashSet::new();
        let mut current = Some(shape);

        while let Some(id) = current {
            if !visited.insert(id) {
                break;
            }
            let shape = self.shape(id);
            for (name, prop) in &shape.properties {
                if names.insert(name.as_str()) {
                    result.push(*prop);
                }
            }
            current = shape.base;
        }

        result
    }

    /// Find an inherited property by name
    fn property_named(&self, shape: ShapeId, name: &str) -> Option<PropertyId> {
        self.properties(shape)
            .into_iter()
            .find(|id| self.property(*id).name == name)
    }

    fn is_header(&self, prop: PropertyId) -> bool {
        matches!(self.property(prop).location, PropertyLocation::Header { .. })
    }

    /// Canonical header field name of a header property
    fn header_name(&self, prop: PropertyId) -> Option<&str> {
        match &self.property(prop).location {
            PropertyLocation::Header { name } => Some(name.as_str()),
            _ => None,
        }
    }

    fn is_body(&self, prop: PropertyId) -> bool {
        matches!(self.property(prop).location, PropertyLocation::Body)
    }

    /// Shapes of all non-error responses, flattening unions of shapes
    fn response_shapes(&self, op: OperationId) -> Vec<ShapeId> {
        let mut shapes = Vec::new();
        let mut visited = HashSet::new();
        for response in self.operation(op).responses.iter().filter(|r| !r.error) {
            collect_shapes(self, &response.ty, &mut shapes, &mut visited);
        }
        shapes
    }

    /// The success response shape: first non-error 2xx response that is a shape
    fn success_response(&self, op: OperationId) -> Option<ShapeId> {
        let mut visited = HashSet::new();
        for response in self.operation(op).responses.iter() {
            if response.error || !response.status.is_success() {
                continue;
            }
            let mut shapes = Vec::new();
            collect_shapes(self, &response.ty, &mut shapes, &mut visited);
            if let Some(first) = shapes.first() {
                return Some(*first);
            }
        }
        None
    }

    /// The shape of the single explicit body property of `shape`, if any
    fn body_shape(&self, shape: ShapeId) -> Option<ShapeId> {
        let bodies: Vec<PropertyId> = self
            .properties(shape)
            .into_iter()
            .filter(|p| self.is_body(*p))
            .collect();
        match bodies.as_slice() {
            [single] => self.property(*single).ty.as_shape(),
            _ => None,
        }
    }

    /// Follow a scalar's base chain looking for a resource-location target
    fn resource_location_target(&self, scalar: ScalarId) -> Option<ShapeId> {
        let mut visited = HashSet::new();
        let mut current = Some(scalar);
        while let Some(id) = current {
            if !visited.insert(id) {
                break;
            }
            let scalar = self.scalar(id);
            if scalar.resource_location.is_some() {
                return scalar.resource_location;
            }
            current = scalar.base;
        }
        None
    }

    /// Request parameters carried as header, path or query values
    fn request_parameters(&self, op: OperationId) -> Vec<PropertyId> {
        match self.operation(op).parameters {
            Some(shape) => self
                .properties(shape)
                .into_iter()
                .filter(|p| self.property(*p).location.is_metadata())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Explicit body property of the request, if one is declared
    fn request_body_property(&self, op: OperationId) -> Option<PropertyId> {
        let shape = self.operation(op).parameters?;
        self.properties(shape).into_iter().find(|p| self.is_body(*p))
    }

    /// Properties of the request body: the explicit body shape's properties,
    /// or the payload properties of the parameter shape
    fn request_body_properties(&self, op: OperationId) -> Vec<PropertyId> {
        let Some(shape) = self.operation(op).parameters else {
            return Vec::new();
        };
        if let Some(body) = self.request_body_property(op) {
            return match self.property(body).ty.as_shape() {
                Some(body_shape) => self.properties(body_shape),
                None => Vec::new(),
            };
        }
        self.properties(shape)
            .into_iter()
            .filter(|p| matches!(self.property(*p).location, PropertyLocation::Payload))
            .collect()
    }

    /// Human-readable name of a type reference
    fn type_name(&self, ty: &TypeRef) -> String {
        match ty {
            TypeRef::Shape(id) => self.shape(*id).name.clone(),
            TypeRef::Enum(id) => self.enum_type(*id).name.clone(),
            TypeRef::Union(id) => self
                .union_type(*id)
                .name
                .clone()
                .unwrap_or_else(|| "(anonymous union)".to_string()),
            TypeRef::Scalar(id) => self.scalar(*id).name.clone(),
            TypeRef::StringLiteral(value) => format!("\"{}\"", value),
            TypeRef::Intrinsic(intrinsic) => intrinsic.as_str().to_string(),
        }
    }

    /// `Shape.property` label for a property
    fn property_label(&self, prop: PropertyId) -> String {
        let property = self.property(prop);
        format!("{}.{}", self.shape(property.owner).name, property.name)
    }
}

fn collect_shapes<G: TypeGraph + ?Sized>(
    graph: &G,
    ty: &TypeRef,
    out: &mut Vec<ShapeId>,
    visited_unions: &mut HashSet<UnionId>,
) {
    match ty {
        TypeRef::Shape(id) => {
            if !out.contains(id) {
                out.push(*id);
            }
        }
        TypeRef::Union(id) => {
            if !visited_unions.insert(*id) {
                return;
            }
            for variant in &graph.union_type(*id).variants {
                collect_shapes(graph, &variant.ty, out, visited_unions);
            }
        }
        _ => {}
    }
}
