use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

/// An equality filter on a single document field. The hosted store only needs point lookups from this subsystem,
/// so equality is the only predicate modelled.
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn equal<V: Into<Value>>(field: &str, value: V) -> Self {
        Self { field: field.to_string(), value: value.into() }
    }
}

/// A stored document: the store-assigned id plus the user fields as a JSON object.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub fields: Value,
}

impl Document {
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, DocumentStoreError> {
        serde_json::from_value(self.fields.clone()).map_err(|e| DocumentStoreError::MalformedDocument(e.to_string()))
    }
}

/// Serialize a domain value into the JSON object shape the store expects.
pub fn to_document_fields<T: Serialize>(value: &T) -> Result<Value, DocumentStoreError> {
    serde_json::to_value(value).map_err(|e| DocumentStoreError::MalformedDocument(e.to_string()))
}

#[derive(Debug, Clone, Error)]
pub enum DocumentStoreError {
    #[error("Document {id} not found in collection {collection}")]
    NotFound { collection: String, id: String },
    #[error("A document with id {0} already exists")]
    IdCollision(String),
    #[error("Stored document could not be deserialized. {0}")]
    MalformedDocument(String),
    #[error("The document store request failed. {0}")]
    Io(String),
}

impl DocumentStoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DocumentStoreError::NotFound { .. })
    }
}

/// The persistence contract for the hosted document database.
///
/// This is deliberately a thin CRUD surface. The store offers **no multi-document transactions** and **no
/// unique-constraint rejection** beyond an explicit document-id collision, and every call is a network round trip.
/// Callers must therefore not assume stronger guarantees than check-then-write provides; the ledger and the
/// side-effect appliers are built around exactly that limitation.
#[allow(async_fn_in_trait)]
pub trait DocumentStore: Clone + Send + Sync {
    /// Return all documents in `collection` matching every filter (logical AND).
    async fn find(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>, DocumentStoreError>;

    /// Fetch a single document by id.
    async fn get(&self, collection: &str, id: &str) -> Result<Document, DocumentStoreError>;

    /// Create a new document. When `id` is `None` the store assigns one. An explicit id that already exists fails
    /// with [`DocumentStoreError::IdCollision`].
    async fn create(&self, collection: &str, id: Option<&str>, fields: Value) -> Result<Document, DocumentStoreError>;

    /// Merge `fields` into an existing document (patch semantics: fields not named are left untouched).
    async fn update(&self, collection: &str, id: &str, fields: Value) -> Result<Document, DocumentStoreError>;
}
