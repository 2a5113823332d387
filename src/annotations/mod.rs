//! Explicit author annotations
//!
//! - store: the read-only [`AnnotationStore`] trait and annotation payloads
//! - memory: [`Annotations`], an owned implementation

pub mod memory;
pub mod store;

pub use memory::Annotations;
pub use store::{
    AnnotationStore, LinkKind, MemberRef, OperationLinkMetadata, PollingLocationInfo,
    PropertyMap, ResultInfo, SourceKind, StatusTarget, TerminalState,
};
