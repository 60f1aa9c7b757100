//! Document storage behind the route layer.
//!
//! Routes never talk to MongoDB directly; they receive a [`SharedStore`]
//! through Rocket managed state so the same handlers run against a live
//! database or an in-process [`MemoryStore`].

use std::sync::Arc;

use bson::oid::ObjectId;
use bson::Document;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::StoreError;

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

pub type SharedStore = Arc<dyn DocumentStore>;

/// Skip/limit applied to a scan.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FindWindow {
    pub skip: u64,
    pub limit: Option<i64>,
}

impl FindWindow {
    pub fn all() -> FindWindow {
        FindWindow::default()
    }
}

/// Whether an id-keyed update may create the document.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Upsert {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InsertOutcome {
    pub acknowledged: bool,
    #[schema(value_type = String)]
    pub inserted_id: ObjectId,
}

impl From<ObjectId> for InsertOutcome {
    fn from(inserted_id: ObjectId) -> Self {
        InsertOutcome {
            acknowledged: true,
            inserted_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    #[schema(value_type = Option<String>)]
    pub upserted_id: Option<ObjectId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

/// Untyped operations over named collections of BSON documents.
///
/// Filters are equality matches on top-level fields. No operation orders its
/// results and none spans more than one document.
#[rocket::async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        window: FindWindow,
    ) -> Result<Vec<Document>, StoreError>;

    async fn find_one(&self, collection: &str, filter: Document)
        -> Result<Option<Document>, StoreError>;

    async fn count(&self, collection: &str, filter: Document) -> Result<u64, StoreError>;

    /// Stores `document`, assigning an `_id` when it has none.
    async fn insert(&self, collection: &str, document: Document) -> Result<ObjectId, StoreError>;

    /// Merges `fields` into the document with `id`.
    async fn update_by_id(
        &self,
        collection: &str,
        id: ObjectId,
        fields: Document,
        upsert: Upsert,
    ) -> Result<UpdateOutcome, StoreError>;

    async fn delete_by_id(&self, collection: &str, id: ObjectId)
        -> Result<DeleteOutcome, StoreError>;

    /// Rejects later inserts whose `keys` all equal an existing document's.
    async fn ensure_unique(&self, collection: &str, keys: &[&str]) -> Result<(), StoreError>;
}

#[inline]
pub fn by_id(id: ObjectId) -> Document {
    bson::doc! { "_id": id }
}
