use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use bson::oid::ObjectId;
use bson::{Bson, Document};

use super::{DeleteOutcome, DocumentStore, FindWindow, UpdateOutcome, Upsert};
use crate::error::StoreError;

#[derive(Debug, Default)]
struct MemoryCollection {
    documents: Vec<Document>,
    unique_keys: Vec<Vec<String>>,
}

impl MemoryCollection {
    fn position(&self, id: ObjectId) -> Option<usize> {
        self.documents
            .iter()
            .position(|doc| doc.get_object_id("_id").ok() == Some(id))
    }

    fn violates_unique(&self, candidate: &Document, skip: Option<usize>) -> bool {
        self.unique_keys.iter().any(|keys| {
            self.documents
                .iter()
                .enumerate()
                .filter(|(i, _)| Some(*i) != skip)
                .any(|(_, existing)| {
                    keys.iter()
                        .all(|key| existing.get(key) == candidate.get(key))
                })
        })
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    collections: HashMap<String, MemoryCollection>,
    read_only: HashSet<String>,
}

/// In-process [`DocumentStore`] for tests and local runs without MongoDB.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

fn matches(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(key, expected)| document.get(key) == Some(expected))
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".to_string())
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Makes every later write to `collection` fail as if the store went away.
    pub fn reject_writes_to(&self, collection: &str) {
        if let Ok(mut state) = self.state.write() {
            state.read_only.insert(collection.to_string());
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>, StoreError> {
        self.state.read().map_err(poisoned)
    }

    fn write(&self, collection: &str) -> Result<RwLockWriteGuard<'_, MemoryState>, StoreError> {
        let state = self.state.write().map_err(poisoned)?;
        if state.read_only.contains(collection) {
            return Err(StoreError::Unavailable(format!(
                "writes to '{collection}' are rejected"
            )));
        }
        Ok(state)
    }
}

#[rocket::async_trait]
impl DocumentStore for MemoryStore {
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        window: FindWindow,
    ) -> Result<Vec<Document>, StoreError> {
        let state = self.read()?;
        let Some(coll) = state.collections.get(collection) else {
            return Ok(vec![]);
        };

        let matching = coll
            .documents
            .iter()
            .filter(|doc| matches(doc, &filter))
            .skip(window.skip as usize);

        Ok(match window.limit {
            Some(limit) if limit > 0 => matching.take(limit as usize).cloned().collect(),
            _ => matching.cloned().collect(),
        })
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, StoreError> {
        let state = self.read()?;
        Ok(state.collections.get(collection).and_then(|coll| {
            coll.documents
                .iter()
                .find(|doc| matches(doc, &filter))
                .cloned()
        }))
    }

    async fn count(&self, collection: &str, filter: Document) -> Result<u64, StoreError> {
        let state = self.read()?;
        Ok(state.collections.get(collection).map_or(0, |coll| {
            coll.documents
                .iter()
                .filter(|doc| matches(doc, &filter))
                .count() as u64
        }))
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<ObjectId, StoreError> {
        let mut state = self.write(collection)?;
        let coll = state.collections.entry(collection.to_string()).or_default();

        let id = match document.get("_id") {
            Some(Bson::ObjectId(id)) => *id,
            _ => ObjectId::new(),
        };
        if coll.position(id).is_some() {
            return Err(StoreError::Duplicate {
                collection: collection.to_string(),
            });
        }

        let mut stored = Document::new();
        stored.insert("_id", id);
        stored.extend(document.into_iter().filter(|(key, _)| key != "_id"));

        if coll.violates_unique(&stored, None) {
            return Err(StoreError::Duplicate {
                collection: collection.to_string(),
            });
        }

        coll.documents.push(stored);
        Ok(id)
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: ObjectId,
        fields: Document,
        upsert: Upsert,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut state = self.write(collection)?;
        let coll = state.collections.entry(collection.to_string()).or_default();

        match coll.position(id) {
            Some(index) => {
                let mut updated = coll.documents[index].clone();
                let mut modified = false;
                for (key, value) in fields {
                    if key == "_id" {
                        continue;
                    }
                    if updated.get(&key) != Some(&value) {
                        updated.insert(key, value);
                        modified = true;
                    }
                }

                if modified && coll.violates_unique(&updated, Some(index)) {
                    return Err(StoreError::Duplicate {
                        collection: collection.to_string(),
                    });
                }
                coll.documents[index] = updated;

                Ok(UpdateOutcome {
                    acknowledged: true,
                    matched_count: 1,
                    modified_count: modified as u64,
                    upserted_id: None,
                })
            }
            None if upsert == Upsert::Allow => {
                let mut created = Document::new();
                created.insert("_id", id);
                created.extend(fields.into_iter().filter(|(key, _)| key != "_id"));

                if coll.violates_unique(&created, None) {
                    return Err(StoreError::Duplicate {
                        collection: collection.to_string(),
                    });
                }
                coll.documents.push(created);

                Ok(UpdateOutcome {
                    acknowledged: true,
                    matched_count: 0,
                    modified_count: 0,
                    upserted_id: Some(id),
                })
            }
            None => Ok(UpdateOutcome {
                acknowledged: true,
                matched_count: 0,
                modified_count: 0,
                upserted_id: None,
            }),
        }
    }

    async fn delete_by_id(
        &self,
        collection: &str,
        id: ObjectId,
    ) -> Result<DeleteOutcome, StoreError> {
        let mut state = self.write(collection)?;
        let deleted_count = match state.collections.get_mut(collection) {
            Some(coll) => match coll.position(id) {
                Some(index) => {
                    coll.documents.remove(index);
                    1
                }
                None => 0,
            },
            None => 0,
        };

        Ok(DeleteOutcome {
            acknowledged: true,
            deleted_count,
        })
    }

    async fn ensure_unique(&self, collection: &str, keys: &[&str]) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(poisoned)?;
        let coll = state.collections.entry(collection.to_string()).or_default();

        let keys: Vec<String> = keys.iter().map(|it| it.to_string()).collect();
        if !coll.unique_keys.contains(&keys) {
            coll.unique_keys.push(keys);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::by_id;
    use bson::doc;

    #[rocket::async_test]
    async fn equality_filter_and_window() {
        let store = MemoryStore::new();
        for n in 0..5 {
            let level = if n % 2 == 0 { "easy" } else { "hard" };
            store
                .insert("courses", doc! { "n": n, "level": level })
                .await
                .expect("insert should work");
        }

        let easy = store
            .find("courses", doc! { "level": "easy" }, FindWindow::all())
            .await
            .expect("find should work");
        assert_eq!(easy.len(), 3);

        let page = store
            .find(
                "courses",
                doc! {},
                FindWindow {
                    skip: 2,
                    limit: Some(2),
                },
            )
            .await
            .expect("find should work");
        let ns: Vec<i32> = page.iter().map(|d| d.get_i32("n").unwrap()).collect();
        assert_eq!(ns, vec![2, 3]);

        assert_eq!(store.count("courses", doc! {}).await.unwrap(), 5);
    }

    #[rocket::async_test]
    async fn update_merges_only_named_fields() {
        let store = MemoryStore::new();
        let id = store
            .insert("teachers", doc! { "firstName": "Ada", "designation": "Lecturer" })
            .await
            .unwrap();

        let outcome = store
            .update_by_id("teachers", id, doc! { "designation": "Professor" }, Upsert::Deny)
            .await
            .unwrap();
        assert_eq!((outcome.matched_count, outcome.modified_count), (1, 1));

        let stored = store
            .find_one("teachers", by_id(id))
            .await
            .unwrap()
            .expect("document should exist");
        assert_eq!(stored.get_str("firstName").unwrap(), "Ada");
        assert_eq!(stored.get_str("designation").unwrap(), "Professor");
    }

    #[rocket::async_test]
    async fn upsert_only_creates_when_allowed() {
        let store = MemoryStore::new();
        let id = ObjectId::new();

        let denied = store
            .update_by_id("users", id, doc! { "role": "admin" }, Upsert::Deny)
            .await
            .unwrap();
        assert_eq!(denied.matched_count, 0);
        assert_eq!(store.count("users", doc! {}).await.unwrap(), 0);

        let allowed = store
            .update_by_id("users", id, doc! { "role": "admin" }, Upsert::Allow)
            .await
            .unwrap();
        assert_eq!(allowed.upserted_id, Some(id));
        assert_eq!(store.count("users", doc! { "role": "admin" }).await.unwrap(), 1);
    }

    #[rocket::async_test]
    async fn unique_keys_reject_duplicates() {
        let store = MemoryStore::new();
        store
            .ensure_unique("bookings", &["email", "courseName"])
            .await
            .unwrap();

        store
            .insert("bookings", doc! { "email": "a@x.com", "courseName": "Rust" })
            .await
            .expect("first booking should insert");
        store
            .insert("bookings", doc! { "email": "b@x.com", "courseName": "Rust" })
            .await
            .expect("other student should insert");

        let duplicate = store
            .insert("bookings", doc! { "email": "a@x.com", "courseName": "Rust" })
            .await;
        assert!(matches!(duplicate, Err(StoreError::Duplicate { .. })));
        assert_eq!(store.count("bookings", doc! {}).await.unwrap(), 2);
    }

    #[rocket::async_test]
    async fn delete_reports_missing_documents() {
        let store = MemoryStore::new();
        let id = store.insert("reviews", doc! { "rating": 5 }).await.unwrap();

        assert_eq!(store.delete_by_id("reviews", id).await.unwrap().deleted_count, 1);
        assert_eq!(store.delete_by_id("reviews", id).await.unwrap().deleted_count, 0);
    }

    #[rocket::async_test]
    async fn rejected_writes_look_unavailable() {
        let store = MemoryStore::new();
        store.reject_writes_to("payments");

        let result = store.insert("payments", doc! { "amount": 10 }).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
