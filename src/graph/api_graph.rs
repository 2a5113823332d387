//! In-memory type graph.
//!
//! `ApiGraph` stores every entity in a flat arena and hands out typed ids.
//! It is assembled once (by hand or through [`crate::document`]) and then
//! only read.

use std::collections::HashMap;

use indexmap::IndexMap;

use super::accessor::TypeGraph;
use super::ids::{EnumId, OperationId, PropertyId, ScalarId, ShapeId, UnionId};
use super::types::{
    EnumMember, EnumType, HttpVerb, Intrinsic, Operation, Property, PropertyLocation,
    ResourceOperation, ResourceOperationKind, Response, Scalar, Shape, StatusCode, TypeRef,
    UnionType, UnionVariant,
};
use crate::error::{LrometaError, Result};

/// Scalars every graph starts with
pub const BUILTIN_SCALARS: &[&str] = &[
    "string",
    "url",
    "int32",
    "int64",
    "float64",
    "boolean",
    "utcDateTime",
    "duration",
];

/// Arena-backed [`TypeGraph`]
#[derive(Debug, Clone)]
pub struct ApiGraph {
    shapes: Vec<Shape>,
    properties: Vec<Property>,
    enums: Vec<EnumType>,
    unions: Vec<UnionType>,
    scalars: Vec<Scalar>,
    operations: Vec<Operation>,
    type_names: HashMap<String, TypeRef>,
    operation_names: HashMap<String, OperationId>,
}

impl Default for ApiGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiGraph {
    /// Create an empty graph with the built-in scalars registered
    pub fn new() -> Self {
        let mut graph = Self {
            shapes: Vec::new(),
            properties: Vec::new(),
            enums: Vec::new(),
            unions: Vec::new(),
            scalars: Vec::new(),
            operations: Vec::new(),
            type_names: HashMap::new(),
            operation_names: HashMap::new(),
        };
        for name in BUILTIN_SCALARS {
            let id = ScalarId(graph.scalars.len());
            graph.scalars.push(Scalar {
                id,
                name: (*name).to_string(),
                base: None,
                known_values: None,
                resource_location: None,
            });
            graph.type_names.insert((*name).to_string(), TypeRef::Scalar(id));
        }
        graph
    }

    fn register_name(&mut self, name: &str, ty: TypeRef) -> Result<()> {
        if self.type_names.contains_key(name) || self.intrinsic(name).is_some() {
            return Err(LrometaError::DuplicateName(name.to_string()));
        }
        self.type_names.insert(name.to_string(), ty);
        Ok(())
    }

    fn intrinsic(&self, name: &str) -> Option<Intrinsic> {
        match name {
            "void" => Some(Intrinsic::Void),
            "never" => Some(Intrinsic::Never),
            "unknown" => Some(Intrinsic::Unknown),
            _ => None,
        }
    }

    //=== Lookups ===

    /// Resolve a declared or built-in type name
    pub fn lookup_type(&self, name: &str) -> Option<TypeRef> {
        if let Some(intrinsic) = self.intrinsic(name) {
            return Some(TypeRef::Intrinsic(intrinsic));
        }
        self.type_names.get(name).cloned()
    }

    /// Like [`lookup_type`](Self::lookup_type) but an error when missing
    pub fn resolve_type(&self, name: &str) -> Result<TypeRef> {
        self.lookup_type(name)
            .ok_or_else(|| LrometaError::UnknownType(name.to_string()))
    }

    pub fn find_shape(&self, name: &str) -> Option<ShapeId> {
        self.lookup_type(name).and_then(|ty| ty.as_shape())
    }

    pub fn find_enum(&self, name: &str) -> Option<EnumId> {
        match self.lookup_type(name) {
            Some(TypeRef::Enum(id)) => Some(id),
            _ => None,
        }
    }

    pub fn find_union(&self, name: &str) -> Option<UnionId> {
        match self.lookup_type(name) {
            Some(TypeRef::Union(id)) => Some(id),
            _ => None,
        }
    }

    pub fn find_scalar(&self, name: &str) -> Option<ScalarId> {
        match self.lookup_type(name) {
            Some(TypeRef::Scalar(id)) => Some(id),
            _ => None,
        }
    }

    /// Find an operation by plain or interface-qualified name
    pub fn find_operation(&self, name: &str) -> Option<OperationId> {
        self.operation_names.get(name).copied()
    }

    pub fn resolve_operation(&self, name: &str) -> Result<OperationId> {
        self.find_operation(name)
            .ok_or_else(|| LrometaError::UnknownOperation(name.to_string()))
    }

    /// The built-in `string` scalar
    pub fn string_type(&self) -> TypeRef {
        TypeRef::Scalar(ScalarId(0))
    }

    //=== Shapes and properties ===

    pub fn add_shape(&mut self, name: &str) -> Result<ShapeId> {
        let id = ShapeId(self.shapes.len());
        self.register_name(name, TypeRef::Shape(id))?;
        self.shapes.push(Shape {
            id,
            name: name.to_string(),
            namespace: None,
            properties: IndexMap::new(),
            base: None,
            template: None,
        });
        Ok(id)
    }

    pub fn set_base(&mut self, shape: ShapeId, base: ShapeId) {
        self.shapes[shape.0].base = Some(base);
    }

    pub fn set_namespace(&mut self, shape: ShapeId, namespace: &str) {
        self.shapes[shape.0].namespace = Some(namespace.to_string());
    }

    pub fn set_template(&mut self, shape: ShapeId, template: &str) {
        self.shapes[shape.0].template = Some(template.to_string());
    }

    /// Append a property; insertion order is preserved
    pub fn add_property(
        &mut self,
        shape: ShapeId,
        name: &str,
        ty: TypeRef,
        location: PropertyLocation,
    ) -> Result<PropertyId> {
        if self.shapes[shape.0].properties.contains_key(name) {
            return Err(LrometaError::DuplicateName(format!(
                "{}.{}",
                self.shapes[shape.0].name, name
            )));
        }
        let id = PropertyId(self.properties.len());
        self.properties.push(Property {
            id,
            name: name.to_string(),
            owner: shape,
            ty,
            location,
            key: false,
        });
        self.shapes[shape.0].properties.insert(name.to_string(), id);
        Ok(id)
    }

    /// Shorthand for a payload property
    pub fn add_field(&mut self, shape: ShapeId, name: &str, ty: TypeRef) -> Result<PropertyId> {
        self.add_property(shape, name, ty, PropertyLocation::Payload)
    }

    /// Shorthand for a header property
    pub fn add_header(
        &mut self,
        shape: ShapeId,
        name: &str,
        header: &str,
        ty: TypeRef,
    ) -> Result<PropertyId> {
        self.add_property(
            shape,
            name,
            ty,
            PropertyLocation::Header {
                name: header.to_string(),
            },
        )
    }

    pub fn set_key(&mut self, prop: PropertyId, key: bool) {
        self.properties[prop.0].key = key;
    }

    //=== Enums, unions and scalars ===

    pub fn add_enum(&mut self, name: &str, members: &[&str]) -> Result<EnumId> {
        let id = EnumId(self.enums.len());
        self.register_name(name, TypeRef::Enum(id))?;
        self.enums.push(EnumType {
            id,
            name: name.to_string(),
            members: members
                .iter()
                .map(|m| EnumMember {
                    name: (*m).to_string(),
                    value: None,
                })
                .collect(),
        });
        Ok(id)
    }

    pub fn set_member_value(&mut self, id: EnumId, member: &str, value: &str) {
        if let Some(m) = self.enums[id.0].members.iter_mut().find(|m| m.name == member) {
            m.value = Some(value.to_string());
        }
    }

    /// Add a union; anonymous unions are not reachable by name
    pub fn add_union(
        &mut self,
        name: Option<&str>,
        variants: Vec<UnionVariant>,
    ) -> Result<UnionId> {
        let id = UnionId(self.unions.len());
        if let Some(name) = name {
            self.register_name(name, TypeRef::Union(id))?;
        }
        self.unions.push(UnionType {
            id,
            name: name.map(str::to_string),
            variants,
        });
        Ok(id)
    }

    /// Append a variant to a union (used when variants refer back to the union)
    pub fn push_variant(&mut self, id: UnionId, variant: UnionVariant) {
        self.unions[id.0].variants.push(variant);
    }

    pub fn add_scalar(&mut self, name: &str, base: Option<ScalarId>) -> Result<ScalarId> {
        let id = ScalarId(self.scalars.len());
        self.register_name(name, TypeRef::Scalar(id))?;
        self.scalars.push(Scalar {
            id,
            name: name.to_string(),
            base,
            known_values: None,
            resource_location: None,
        });
        Ok(id)
    }

    pub fn set_known_values(&mut self, scalar: ScalarId, values: TypeRef) {
        self.scalars[scalar.0].known_values = Some(values);
    }

    pub fn set_resource_location(&mut self, scalar: ScalarId, resource: ShapeId) {
        self.scalars[scalar.0].resource_location = Some(resource);
    }

    /// Declare an anonymous `ResourceLocation<T>` scalar for a resource
    pub fn resource_location_of(&mut self, resource: ShapeId) -> ScalarId {
        let name = format!("ResourceLocation<{}>", self.shapes[resource.0].name);
        if let Some(existing) = self.find_scalar(&name) {
            return existing;
        }
        let id = ScalarId(self.scalars.len());
        self.scalars.push(Scalar {
            id,
            name: name.clone(),
            base: self.find_scalar("url"),
            known_values: None,
            resource_location: Some(resource),
        });
        self.type_names.insert(name, TypeRef::Scalar(id));
        id
    }

    //=== Operations ===

    pub fn add_operation(&mut self, name: &str, verb: HttpVerb, path: &str) -> Result<OperationId> {
        self.add_operation_in(None, name, verb, path)
    }

    /// Add an operation grouped under an interface; both the plain and the
    /// qualified name resolve to it (the plain name only while unambiguous)
    pub fn add_operation_in(
        &mut self,
        interface: Option<&str>,
        name: &str,
        verb: HttpVerb,
        path: &str,
    ) -> Result<OperationId> {
        let id = OperationId(self.operations.len());
        let operation = Operation {
            id,
            name: name.to_string(),
            interface: interface.map(str::to_string),
            verb,
            path: path.to_string(),
            parameters: None,
            responses: Vec::new(),
            resource: None,
            action: false,
        };
        let qualified = operation.qualified_name();
        if self.operation_names.contains_key(&qualified) {
            return Err(LrometaError::DuplicateName(qualified));
        }
        self.operation_names.insert(qualified.clone(), id);
        if interface.is_some() {
            if self.operation_names.contains_key(name) {
                self.operation_names.remove(name);
            } else {
                self.operation_names.insert(name.to_string(), id);
            }
        }
        self.operations.push(operation);
        Ok(id)
    }

    pub fn set_parameters(&mut self, op: OperationId, shape: ShapeId) {
        self.operations[op.0].parameters = Some(shape);
    }

    pub fn add_response(&mut self, op: OperationId, status: StatusCode, ty: TypeRef) {
        self.operations[op.0].responses.push(Response {
            status,
            ty,
            error: false,
        });
    }

    pub fn add_error_response(&mut self, op: OperationId, ty: TypeRef) {
        self.operations[op.0].responses.push(Response {
            status: StatusCode::Default,
            ty,
            error: true,
        });
    }

    /// Append a response with an explicit error flag
    pub fn push_response(&mut self, op: OperationId, response: Response) {
        self.operations[op.0].responses.push(response);
    }

    pub fn set_resource(
        &mut self,
        op: OperationId,
        kind: ResourceOperationKind,
        resource_type: Option<ShapeId>,
    ) {
        self.operations[op.0].resource = Some(ResourceOperation {
            kind,
            resource_type,
        });
    }

    pub fn set_action(&mut self, op: OperationId, action: bool) {
        self.operations[op.0].action = action;
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }
}

impl TypeGraph for ApiGraph {
    fn shape(&self, id: ShapeId) -> &Shape {
        &self.shapes[id.0]
    }

    fn property(&self, id: PropertyId) -> &Property {
        &self.properties[id.0]
    }

    fn enum_type(&self, id: EnumId) -> &EnumType {
        &self.enums[id.0]
    }

    fn union_type(&self, id: UnionId) -> &UnionType {
        &self.unions[id.0]
    }

    fn scalar(&self, id: ScalarId) -> &Scalar {
        &self.scalars[id.0]
    }

    fn operation(&self, id: OperationId) -> &Operation {
        &self.operations[id.0]
    }

    fn operations(&self) -> Vec<OperationId> {
        self.operations.iter().map(|op| op.id).collect()
    }
}
