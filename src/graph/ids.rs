//! Typed identifiers for graph entities.
//!
//! Every entity in an [`ApiGraph`](super::ApiGraph) lives in an arena and is
//! addressed by a small copyable id. Ids are only meaningful for the graph
//! that issued them.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub(crate) usize);

        impl $name {
            /// Position of the entity in its arena
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $prefix, self.0)
            }
        }
    };
}

arena_id!(
    /// A model shape (request, response, resource, status monitor)
    ShapeId,
    "shape"
);
arena_id!(
    /// A property of a shape
    PropertyId,
    "prop"
);
arena_id!(
    /// An enum type
    EnumId,
    "enum"
);
arena_id!(
    /// A union type
    UnionId,
    "union"
);
arena_id!(
    /// A scalar type
    ScalarId,
    "scalar"
);
arena_id!(
    /// An HTTP operation
    OperationId,
    "op"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display() {
        assert_eq!(ShapeId(3).to_string(), "shape#3");
        assert_eq!(OperationId(0).to_string(), "op#0");
    }

    #[test]
    fn test_id_serializes_as_index() {
        let json = serde_json::to_string(&PropertyId(7)).unwrap();
        assert_eq!(json, "7");
        let back: PropertyId = serde_json::from_str(&json).unwrap();
        assert_eq!(back.index(), 7);
    }
}
