use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use futures::TryStreamExt;
use mongodb::{options::FindOptions, Client, Collection, Database};

use crate::error::StoreResult;
use crate::store::{DocumentStore, Filter, Query};

pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(uri).await?;
        tracing::info!(database, "connected to MongoDB");
        Ok(Self::new(client.database(database)))
    }

    pub fn new(database: Database) -> Self {
        Self { database }
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find_by_id(&self, collection: &str, id: &ObjectId) -> StoreResult<Option<Document>> {
        Ok(self
            .collection(collection)
            .find_one(doc! { "_id": *id }, None)
            .await?)
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        query: &Query,
    ) -> StoreResult<Vec<Document>> {
        let mut options = FindOptions::default();
        options.sort = query.sort.as_ref().map(|sort| sort.document());
        options.limit = query.limit;
        let cursor = self
            .collection(collection)
            .find(filter.to_document(), options)
            .await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents)
    }

    async fn create(&self, collection: &str, document: Document) -> StoreResult<()> {
        self.collection(collection)
            .insert_one(document, None)
            .await?;
        Ok(())
    }

    async fn save(&self, collection: &str, document: Document) -> StoreResult<()> {
        let id = document.get("_id").cloned().unwrap_or(bson::Bson::Null);
        self.collection(collection)
            .replace_one(doc! { "_id": id }, document, None)
            .await?;
        Ok(())
    }

    async fn delete_one(&self, collection: &str, id: &ObjectId) -> StoreResult<bool> {
        let result = self
            .collection(collection)
            .delete_one(doc! { "_id": *id }, None)
            .await?;
        Ok(result.deleted_count > 0)
    }
}
