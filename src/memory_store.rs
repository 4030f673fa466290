use std::collections::HashMap;

use async_trait::async_trait;
use bson::{oid::ObjectId, Bson, Document};
use tokio::sync::RwLock;

use crate::error::StoreResult;
use crate::store::{DocumentStore, Filter, Query};

/// Keeps every collection in process. Documents stay in insertion order, so
/// unsorted queries come back oldest first.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn has_id(document: &Document, id: &ObjectId) -> bool {
    matches!(document.get("_id"), Some(Bson::ObjectId(stored)) if stored == id)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_by_id(&self, collection: &str, id: &ObjectId) -> StoreResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|documents| documents.iter().find(|d| has_id(d, id)))
            .cloned())
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        query: &Query,
    ) -> StoreResult<Vec<Document>> {
        let collections = self.collections.read().await;
        let mut found: Vec<Document> = collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|d| filter.matches(d))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if let Some(sort) = &query.sort {
            found.sort_by(|a, b| sort.compare(a, b));
        }
        if let Some(limit) = query.limit {
            found.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(found)
    }

    async fn create(&self, collection: &str, document: Document) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Ok(())
    }

    async fn save(&self, collection: &str, document: Document) -> StoreResult<()> {
        let Some(Bson::ObjectId(id)) = document.get("_id").cloned() else {
            return Ok(());
        };
        let mut collections = self.collections.write().await;
        if let Some(stored) = collections
            .get_mut(collection)
            .and_then(|documents| documents.iter_mut().find(|d| has_id(d, &id)))
        {
            *stored = document;
        }
        Ok(())
    }

    async fn delete_one(&self, collection: &str, id: &ObjectId) -> StoreResult<bool> {
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(false);
        };
        match documents.iter().position(|d| has_id(d, id)) {
            Some(index) => {
                documents.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[tokio::test]
    async fn save_replaces_only_existing_documents() {
        let store = MemoryStore::new();
        let id = ObjectId::new();
        store
            .create("Expenses", doc! { "_id": id, "isPaid": false })
            .await
            .unwrap();

        store
            .save("Expenses", doc! { "_id": id, "isPaid": true })
            .await
            .unwrap();
        store
            .save("Expenses", doc! { "_id": ObjectId::new(), "isPaid": true })
            .await
            .unwrap();

        let stored = store.find_by_id("Expenses", &id).await.unwrap().unwrap();
        assert!(stored.get_bool("isPaid").unwrap());
        let all = store
            .find("Expenses", &Filter::All, &Query::new())
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn find_sorts_and_limits() {
        let store = MemoryStore::new();
        for millis in [3_000, 1_000, 2_000] {
            store
                .create(
                    "Expenses",
                    doc! { "_id": ObjectId::new(), "date": bson::DateTime::from_millis(millis) },
                )
                .await
                .unwrap();
        }

        let found = store
            .find("Expenses", &Filter::All, &Query::new().newest_first("date").limit(2))
            .await
            .unwrap();
        let dates: Vec<i64> = found
            .iter()
            .map(|d| d.get_datetime("date").unwrap().timestamp_millis())
            .collect();
        assert_eq!(dates, vec![3_000, 2_000]);
    }

    #[tokio::test]
    async fn delete_reports_whether_anything_was_removed() {
        let store = MemoryStore::new();
        let id = ObjectId::new();
        store.create("Groups", doc! { "_id": id }).await.unwrap();
        assert!(store.delete_one("Groups", &id).await.unwrap());
        assert!(!store.delete_one("Groups", &id).await.unwrap());
        assert!(store.find_by_id("Groups", &id).await.unwrap().is_none());
    }
}
