//! API description documents
//!
//! - schema: the YAML/JSON document model
//! - loader: builds the type graph and annotation store from a document

pub mod loader;
pub mod schema;

pub use loader::{LoadedDocument, load_document, load_file};
pub use schema::ApiDocument;
