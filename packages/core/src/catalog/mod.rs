//! Static portal catalogue: document types and application statuses.

pub mod application;
pub mod documents;

pub use application::{timeline, ApplicationStatus, TimelineStep, STATUS_SEQUENCE};
pub use documents::{
    required_documents, DocumentCategory, DocumentSpec, DocumentType, DOCUMENT_CATEGORIES,
};
