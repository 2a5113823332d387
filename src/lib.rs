//! Lrometa - long-running operation metadata inference
//!
//! Given an HTTP API type graph and explicit author annotations, lrometa
//! decides which operations are long-running and describes how a client
//! polls them: the status monitor, its terminal states, and where the final
//! result comes from.

pub mod annotations;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod graph;
pub mod lro;

pub use annotations::{AnnotationStore, Annotations};
pub use diagnostics::{Diagnosed, Diagnostic, DiagnosticCode, Severity};
pub use document::{ApiDocument, LoadedDocument, load_document, load_file};
pub use error::{LrometaError, Result};
pub use graph::{ApiGraph, TypeGraph};
pub use lro::{EngineOptions, LroEngine, LroMetadata, MetadataCache, MetadataReport};
