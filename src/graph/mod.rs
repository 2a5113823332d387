//! API type graph
//!
//! - ids: typed arena identifiers
//! - types: shapes, properties, enums, unions, scalars, operations
//! - accessor: the read-only [`TypeGraph`] trait the engine consumes
//! - api_graph: the in-memory [`ApiGraph`] implementation

pub mod accessor;
pub mod api_graph;
pub mod ids;
pub mod types;

pub use accessor::TypeGraph;
pub use api_graph::{ApiGraph, BUILTIN_SCALARS};
pub use ids::{EnumId, OperationId, PropertyId, ScalarId, ShapeId, UnionId};
pub use types::{
    EnumMember, EnumType, HttpVerb, Intrinsic, Operation, Property, PropertyLocation,
    ResourceOperation, ResourceOperationKind, Response, Scalar, Shape, StatusCode, TypeRef,
    UnionType, UnionVariant,
};
