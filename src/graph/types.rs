//! Type graph entities
//!
//! Plain data describing an HTTP API: shapes with ordered properties, enums,
//! unions, scalars and operations. Entities reference each other through the
//! typed ids in [`super::ids`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::ids::{EnumId, OperationId, PropertyId, ScalarId, ShapeId, UnionId};

/// Intrinsic (built-in, non-declarable) types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intrinsic {
    Void,
    Never,
    Unknown,
}

impl Intrinsic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intrinsic::Void => "void",
            Intrinsic::Never => "never",
            Intrinsic::Unknown => "unknown",
        }
    }
}

/// A reference from a property, variant or response to a type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "ref", rename_all = "camelCase")]
pub enum TypeRef {
    Shape(ShapeId),
    Enum(EnumId),
    Union(UnionId),
    Scalar(ScalarId),
    StringLiteral(String),
    Intrinsic(Intrinsic),
}

impl TypeRef {
    pub fn as_shape(&self) -> Option<ShapeId> {
        match self {
            TypeRef::Shape(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_never(&self) -> bool {
        matches!(self, TypeRef::Intrinsic(Intrinsic::Never))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeRef::Intrinsic(Intrinsic::Void))
    }

    /// Short kind label used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            TypeRef::Shape(_) => "Model",
            TypeRef::Enum(_) => "Enum",
            TypeRef::Union(_) => "Union",
            TypeRef::Scalar(_) => "Scalar",
            TypeRef::StringLiteral(_) => "String",
            TypeRef::Intrinsic(_) => "Intrinsic",
        }
    }
}

//=== Shapes ===

/// A model shape with ordered properties
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shape {
    pub id: ShapeId,
    pub name: String,
    pub namespace: Option<String>,
    /// Declared properties in insertion order (inherited ones are on `base`)
    pub properties: IndexMap<String, PropertyId>,
    pub base: Option<ShapeId>,
    /// Name of the template this shape was instantiated from, if any
    pub template: Option<String>,
}

/// Where a property lives in the HTTP message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PropertyLocation {
    /// Ordinary field of the payload
    Payload,
    /// The property *is* the body
    Body,
    /// HTTP header with its canonical field name
    Header { name: String },
    Path,
    Query,
}

impl PropertyLocation {
    /// Header, path and query properties are HTTP metadata rather than payload
    pub fn is_metadata(&self) -> bool {
        matches!(
            self,
            PropertyLocation::Header { .. } | PropertyLocation::Path | PropertyLocation::Query
        )
    }
}

/// A property of a shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub name: String,
    pub owner: ShapeId,
    pub ty: TypeRef,
    pub location: PropertyLocation,
    pub key: bool,
}

//=== Enums, unions and scalars ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumMember {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumType {
    pub id: EnumId,
    pub name: String,
    pub members: Vec<EnumMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnionVariant {
    pub name: Option<String>,
    pub ty: TypeRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnionType {
    pub id: UnionId,
    pub name: Option<String>,
    pub variants: Vec<UnionVariant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scalar {
    pub id: ScalarId,
    pub name: String,
    pub base: Option<ScalarId>,
    /// Enum or union listing the known values of an open string scalar
    pub known_values: Option<TypeRef>,
    /// Resource shape addressed by a resource-location scalar
    pub resource_location: Option<ShapeId>,
}

//=== Operations ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpVerb {
    Get,
    Put,
    Post,
    Patch,
    Delete,
    Head,
}

impl HttpVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "get",
            HttpVerb::Put => "put",
            HttpVerb::Post => "post",
            HttpVerb::Patch => "patch",
            HttpVerb::Delete => "delete",
            HttpVerb::Head => "head",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Code(u16),
    Default,
}

impl Serialize for StatusCode {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            StatusCode::Code(code) => s.serialize_u16(*code),
            StatusCode::Default => s.serialize_str("default"),
        }
    }
}

impl<'de> Deserialize<'de> for StatusCode {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(u16),
            Text(String),
        }

        match Raw::deserialize(d)? {
            Raw::Code(code) => Ok(StatusCode::Code(code)),
            Raw::Text(text) if text == "default" => Ok(StatusCode::Default),
            Raw::Text(text) => text
                .parse::<u16>()
                .map(StatusCode::Code)
                .map_err(|_| serde::de::Error::custom(format!("invalid status code: {}", text))),
        }
    }
}

impl StatusCode {
    pub fn is_success(&self) -> bool {
        matches!(self, StatusCode::Code(code) if (200..300).contains(code))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub status: StatusCode,
    pub ty: TypeRef,
    pub error: bool,
}

/// Resource lifecycle classification of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceOperationKind {
    Read,
    CreateOrReplace,
    CreateOrUpdate,
    Update,
    Delete,
    List,
    Action,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceOperation {
    pub kind: ResourceOperationKind,
    pub resource_type: Option<ShapeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub name: String,
    pub interface: Option<String>,
    pub verb: HttpVerb,
    pub path: String,
    /// Request parameters (header/path/query properties plus body)
    pub parameters: Option<ShapeId>,
    pub responses: Vec<Response>,
    pub resource: Option<ResourceOperation>,
    /// Declared as a resource action
    pub action: bool,
}

impl Operation {
    /// Interface-qualified name
    pub fn qualified_name(&self) -> String {
        match &self.interface {
            Some(interface) => format!("{}.{}", interface, self.name),
            None => self.name.clone(),
        }
    }
}
