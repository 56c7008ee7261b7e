use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::traits::{Document, DocumentStore, DocumentStoreError, Filter};

/// An in-memory document store with the same contract as the hosted one: no transactions, no unique constraints,
/// patch-style updates. Cloning shares the underlying data, mirroring how a store handle behaves in the server.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<String, BTreeMap<String, Value>>>>,
    next_id: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document with a known id. Test setup only.
    pub async fn insert(&self, collection: &str, id: &str, fields: Value) {
        let mut lock = self.collections.write().await;
        lock.entry(collection.to_string()).or_default().insert(id.to_string(), fields);
    }

    pub async fn count(&self, collection: &str) -> usize {
        let lock = self.collections.read().await;
        lock.get(collection).map(BTreeMap::len).unwrap_or(0)
    }

    fn mint_id(&self) -> String {
        format!("doc_{:06}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

fn matches(fields: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|f| fields.get(&f.field) == Some(&f.value))
}

impl DocumentStore for MemoryStore {
    async fn find(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>, DocumentStoreError> {
        let lock = self.collections.read().await;
        let docs = lock
            .get(collection)
            .map(|col| {
                col.iter()
                    .filter(|(_, fields)| matches(fields, filters))
                    .map(|(id, fields)| Document { id: id.clone(), fields: fields.clone() })
                    .collect()
            })
            .unwrap_or_default();
        Ok(docs)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Document, DocumentStoreError> {
        let lock = self.collections.read().await;
        lock.get(collection)
            .and_then(|col| col.get(id))
            .map(|fields| Document { id: id.to_string(), fields: fields.clone() })
            .ok_or_else(|| DocumentStoreError::NotFound { collection: collection.to_string(), id: id.to_string() })
    }

    async fn create(&self, collection: &str, id: Option<&str>, fields: Value) -> Result<Document, DocumentStoreError> {
        let id = id.map(String::from).unwrap_or_else(|| self.mint_id());
        let mut lock = self.collections.write().await;
        let col = lock.entry(collection.to_string()).or_default();
        if col.contains_key(&id) {
            return Err(DocumentStoreError::IdCollision(id));
        }
        col.insert(id.clone(), fields.clone());
        Ok(Document { id, fields })
    }

    async fn update(&self, collection: &str, id: &str, fields: Value) -> Result<Document, DocumentStoreError> {
        let mut lock = self.collections.write().await;
        let existing = lock
            .get_mut(collection)
            .and_then(|col| col.get_mut(id))
            .ok_or_else(|| DocumentStoreError::NotFound { collection: collection.to_string(), id: id.to_string() })?;
        let patch = fields
            .as_object()
            .ok_or_else(|| DocumentStoreError::MalformedDocument("update fields must be a JSON object".to_string()))?;
        if !existing.is_object() {
            *existing = Value::Object(Map::new());
        }
        let target = existing.as_object_mut().unwrap_or_else(|| unreachable!("existing was just coerced to an object"));
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
        Ok(Document { id: id.to_string(), fields: existing.clone() })
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn create_find_and_patch() {
        let store = MemoryStore::new();
        let doc = store.create("things", None, json!({ "a": 1, "b": "x" })).await.unwrap();
        let found = store.find("things", &[Filter::equal("a", 1)]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, doc.id);

        store.update("things", &doc.id, json!({ "b": "y" })).await.unwrap();
        let patched = store.get("things", &doc.id).await.unwrap();
        // Patch semantics: untouched fields survive
        assert_eq!(patched.fields, json!({ "a": 1, "b": "y" }));
    }

    #[tokio::test]
    async fn explicit_id_collision_is_rejected() {
        let store = MemoryStore::new();
        store.create("things", Some("t1"), json!({})).await.unwrap();
        let err = store.create("things", Some("t1"), json!({})).await.unwrap_err();
        assert!(matches!(err, DocumentStoreError::IdCollision(_)));
    }

    #[tokio::test]
    async fn missing_documents_are_not_found() {
        let store = MemoryStore::new();
        assert!(store.get("things", "nope").await.unwrap_err().is_not_found());
        assert!(store.update("things", "nope", json!({})).await.unwrap_err().is_not_found());
        assert!(store.find("things", &[]).await.unwrap().is_empty());
    }
}
