use bson::oid::ObjectId;
use bson::{doc, Document};
use mongodb::options::{FindOptions, IndexOptions, UpdateOptions};
use mongodb::{Database, IndexModel};
use rocket::futures::TryStreamExt;

use super::{by_id, DeleteOutcome, DocumentStore, FindWindow, UpdateOutcome, Upsert};
use crate::error::StoreError;

/// [`DocumentStore`] backed by a MongoDB database handle.
///
/// The handle is created once at startup; the driver pools connections.
#[derive(Debug, Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> MongoStore {
        MongoStore { db }
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }
}

#[rocket::async_trait]
impl DocumentStore for MongoStore {
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        window: FindWindow,
    ) -> Result<Vec<Document>, StoreError> {
        let options = FindOptions::builder()
            .skip(Some(window.skip).filter(|it| *it > 0))
            .limit(window.limit)
            .build();

        let cursor = self
            .db
            .collection::<Document>(collection)
            .find(filter, options)
            .await?;

        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self
            .db
            .collection::<Document>(collection)
            .find_one(filter, None)
            .await?)
    }

    async fn count(&self, collection: &str, filter: Document) -> Result<u64, StoreError> {
        let coll = self.db.collection::<Document>(collection);
        if filter.is_empty() {
            Ok(coll.estimated_document_count(None).await?)
        } else {
            Ok(coll.count_documents(filter, None).await?)
        }
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<ObjectId, StoreError> {
        let result = self
            .db
            .collection::<Document>(collection)
            .insert_one(document, None)
            .await
            .map_err(|e| StoreError::from(e).in_collection(collection))?;

        result.inserted_id.as_object_id().ok_or_else(|| {
            StoreError::Unavailable(format!(
                "'{collection}' returned a non-ObjectId id for an inserted document"
            ))
        })
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: ObjectId,
        fields: Document,
        upsert: Upsert,
    ) -> Result<UpdateOutcome, StoreError> {
        let options = UpdateOptions::builder()
            .upsert(upsert == Upsert::Allow)
            .build();

        let result = self
            .db
            .collection::<Document>(collection)
            .update_one(by_id(id), doc! { "$set": fields }, options)
            .await
            .map_err(|e| StoreError::from(e).in_collection(collection))?;

        Ok(UpdateOutcome {
            acknowledged: true,
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id.and_then(|it| it.as_object_id()),
        })
    }

    async fn delete_by_id(
        &self,
        collection: &str,
        id: ObjectId,
    ) -> Result<DeleteOutcome, StoreError> {
        let result = self
            .db
            .collection::<Document>(collection)
            .delete_one(by_id(id), None)
            .await?;

        Ok(DeleteOutcome {
            acknowledged: true,
            deleted_count: result.deleted_count,
        })
    }

    async fn ensure_unique(&self, collection: &str, keys: &[&str]) -> Result<(), StoreError> {
        let mut index_keys = Document::new();
        for key in keys {
            index_keys.insert(*key, 1);
        }

        let index = IndexModel::builder()
            .keys(index_keys)
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.db
            .collection::<Document>(collection)
            .create_index(index, None)
            .await?;

        Ok(())
    }
}
