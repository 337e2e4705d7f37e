//! Workflow parsing: documents, job tables and build specs

pub mod document;
pub mod error;
pub mod extractor;
pub mod spec;

pub use document::WorkflowDocument;
pub use error::MalformedDocumentError;
pub use extractor::{BuildSpecExtractor, JobDefinition, JobTable};
pub use spec::{BuildSpec, DEFAULT_RUNTIME_VERSION};
