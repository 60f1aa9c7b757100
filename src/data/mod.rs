use std::marker::PhantomData;

use bson::oid::ObjectId;
use bson::Document;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;
use crate::store::{by_id, DeleteOutcome, DocumentStore, FindWindow, UpdateOutcome, Upsert};

pub mod book;
pub mod booking;
pub mod course;
pub mod payment;
pub mod review;
pub mod teacher;
pub mod user;

/// Typed accessor for one collection of a [`DocumentStore`].
pub struct Collection<'s, T> {
    store: &'s dyn DocumentStore,
    name: &'static str,
    _record: PhantomData<fn() -> T>,
}

impl<'s, T> Collection<'s, T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(store: &'s dyn DocumentStore, name: &'static str) -> Collection<'s, T> {
        Collection {
            store,
            name,
            _record: PhantomData,
        }
    }

    /// Fails on the first document that can't be read as `T`.
    pub async fn find_all(&self, filter: Document, window: FindWindow) -> Result<Vec<T>, StoreError> {
        let documents = self.store.find(self.name, filter, window).await?;

        documents
            .into_iter()
            .map(|document| {
                bson::from_document::<T>(document).map_err(|e| {
                    tracing::warn!("Unable to deserialize '{}' document: {}", self.name, e);
                    StoreError::from(e)
                })
            })
            .collect()
    }

    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, StoreError> {
        match self.store.find_one(self.name, filter).await? {
            Some(document) => Ok(Some(bson::from_document(document)?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_id(&self, id: ObjectId) -> Result<Option<T>, StoreError> {
        self.find_one(by_id(id)).await
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        self.store.count(self.name, Document::new()).await
    }

    pub async fn insert(&self, record: &impl Serialize) -> Result<ObjectId, StoreError> {
        self.store.insert(self.name, bson::to_document(record)?).await
    }

    /// Sets every field `fields` serializes to; absent options are left alone.
    pub async fn update_by_id(
        &self,
        id: ObjectId,
        fields: &impl Serialize,
        upsert: Upsert,
    ) -> Result<UpdateOutcome, StoreError> {
        let fields = bson::to_document(fields)?;
        self.store
            .update_by_id(self.name, id, fields, upsert)
            .await
    }

    pub async fn delete_by_id(&self, id: ObjectId) -> Result<DeleteOutcome, StoreError> {
        self.store.delete_by_id(self.name, id).await
    }
}

pub mod filter {
    use bson::{doc, Document};

    #[inline]
    pub fn by_email(email: impl Into<String>) -> Document {
        doc! { "email": email.into() }
    }

    #[inline]
    pub fn by_course_id(course_id: impl Into<String>) -> Document {
        doc! { "courseId": course_id.into() }
    }

    #[inline]
    pub fn by_enrollment(email: impl Into<String>, course_name: impl Into<String>) -> Document {
        doc! { "email": email.into(), "courseName": course_name.into() }
    }
}

/// Parses a path id, answering 400 for anything that isn't an ObjectId.
pub fn parse_id(id: &str) -> Result<ObjectId, crate::resp::problem::Problem> {
    ObjectId::parse_str(id).map_err(|_| crate::resp::problem::problems::bad_id(id))
}

