mod document_store;

pub use document_store::{to_document_fields, Document, DocumentStore, DocumentStoreError, Filter};
