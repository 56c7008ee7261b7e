//! Appwrite-backed [`DocumentStore`] implementation.
//!
//! The marketplace keeps its data in a hosted Appwrite project, so every operation here is a plain REST round trip
//! against `/databases/{db}/collections/{collection}/documents`. Appwrite has no cross-document transactions and no
//! application-level unique constraints, which is exactly the contract [`DocumentStore`] documents.

use lsk_common::Secret;
use log::trace;
use reqwest::{Client, Method, StatusCode, Url};
use serde_json::{json, Map, Value};

use crate::traits::{Document, DocumentStore, DocumentStoreError, Filter};

#[derive(Debug, Clone)]
pub struct AppwriteConfig {
    /// Base API endpoint, e.g. `https://cloud.appwrite.io/v1`.
    pub endpoint: String,
    pub project_id: String,
    pub api_key: Secret<String>,
    pub database_id: String,
}

#[derive(Clone)]
pub struct AppwriteStore {
    client: Client,
    config: AppwriteConfig,
}

impl AppwriteStore {
    pub fn new(config: AppwriteConfig) -> Self {
        Self { client: Client::new(), config }
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/databases/{}/collections/{collection}/documents",
            self.config.endpoint.trim_end_matches('/'),
            self.config.database_id
        )
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("X-Appwrite-Project", &self.config.project_id)
            .header("X-Appwrite-Key", self.config.api_key.reveal())
            .header("Content-Type", "application/json")
    }

    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        collection: &str,
        id: Option<&str>,
    ) -> Result<Value, DocumentStoreError> {
        let response = builder.send().await.map_err(|e| DocumentStoreError::Io(e.to_string()))?;
        let status = response.status();
        match status {
            StatusCode::NOT_FOUND => Err(DocumentStoreError::NotFound {
                collection: collection.to_string(),
                id: id.unwrap_or("?").to_string(),
            }),
            StatusCode::CONFLICT => Err(DocumentStoreError::IdCollision(id.unwrap_or("?").to_string())),
            s if s.is_success() => response.json::<Value>().await.map_err(|e| DocumentStoreError::Io(e.to_string())),
            s => {
                let body = response.text().await.unwrap_or_default();
                Err(DocumentStoreError::Io(format!("{s} from document store: {body}")))
            },
        }
    }
}

/// Appwrite returns the user fields inline with `$`-prefixed metadata keys. Strip the metadata and pull out the id.
fn document_from_value(value: &Value) -> Result<Document, DocumentStoreError> {
    let obj = value
        .as_object()
        .ok_or_else(|| DocumentStoreError::MalformedDocument("document is not a JSON object".to_string()))?;
    let id = obj
        .get("$id")
        .and_then(Value::as_str)
        .ok_or_else(|| DocumentStoreError::MalformedDocument("document has no $id".to_string()))?
        .to_string();
    let fields: Map<String, Value> =
        obj.iter().filter(|(k, _)| !k.starts_with('$')).map(|(k, v)| (k.clone(), v.clone())).collect();
    Ok(Document { id, fields: Value::Object(fields) })
}

fn appwrite_query(filter: &Filter) -> String {
    json!({ "method": "equal", "attribute": filter.field, "values": [filter.value] }).to_string()
}

impl DocumentStore for AppwriteStore {
    async fn find(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>, DocumentStoreError> {
        let mut url =
            Url::parse(&self.collection_url(collection)).map_err(|e| DocumentStoreError::Io(e.to_string()))?;
        for filter in filters {
            url.query_pairs_mut().append_pair("queries[]", &appwrite_query(filter));
        }
        trace!("🗄️ find {collection} with {} filter(s)", filters.len());
        let body = self.send(self.request(Method::GET, url), collection, None).await?;
        body.get("documents")
            .and_then(Value::as_array)
            .ok_or_else(|| DocumentStoreError::MalformedDocument("list response has no documents array".to_string()))?
            .iter()
            .map(document_from_value)
            .collect()
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Document, DocumentStoreError> {
        let url = Url::parse(&format!("{}/{id}", self.collection_url(collection)))
            .map_err(|e| DocumentStoreError::Io(e.to_string()))?;
        trace!("🗄️ get {collection}/{id}");
        let body = self.send(self.request(Method::GET, url), collection, Some(id)).await?;
        document_from_value(&body)
    }

    async fn create(&self, collection: &str, id: Option<&str>, fields: Value) -> Result<Document, DocumentStoreError> {
        let url = Url::parse(&self.collection_url(collection)).map_err(|e| DocumentStoreError::Io(e.to_string()))?;
        // "unique()" asks Appwrite to mint the document id server-side.
        let body = json!({ "documentId": id.unwrap_or("unique()"), "data": fields });
        trace!("🗄️ create in {collection}");
        let body = self.send(self.request(Method::POST, url).json(&body), collection, id).await?;
        document_from_value(&body)
    }

    async fn update(&self, collection: &str, id: &str, fields: Value) -> Result<Document, DocumentStoreError> {
        let url = Url::parse(&format!("{}/{id}", self.collection_url(collection)))
            .map_err(|e| DocumentStoreError::Io(e.to_string()))?;
        trace!("🗄️ update {collection}/{id}");
        let body = self.send(self.request(Method::PATCH, url).json(&json!({ "data": fields })), collection, Some(id)).await?;
        document_from_value(&body)
    }
}
