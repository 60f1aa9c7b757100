use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{filter, Collection};
use crate::error::StoreError;
use crate::role::Role;
use crate::store::{DocumentStore, UpdateOutcome, Upsert};

pub static USER_COLLECTION_NAME: &str = "users";

pub fn collection(store: &dyn DocumentStore) -> Collection<'_, User> {
    Collection::new(store, USER_COLLECTION_NAME)
}

pub mod problem {
    use crate::resp::problem::Problem;
    use rocket::http::Status;

    #[inline]
    pub fn bad_email(email: impl ToString, detail: impl ToString) -> Problem {
        Problem::new_untyped(Status::BadRequest, "Bad email.")
            .insert_str("email", email)
            .detail(detail)
            .to_owned()
    }

    #[inline]
    pub fn not_registered(email: impl ToString) -> Problem {
        Problem::new_untyped(Status::Forbidden, "Forbidden access.")
            .insert_str("email", email)
            .detail("No user is registered with this e-mail address.")
            .insert_str("accessToken", "")
            .to_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    #[schema(value_type = String)]
    pub id: ObjectId,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.map(Role::is_admin).unwrap_or(false)
    }
}

/// Signup payload. Clients can't choose a role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSignupData {
    #[serde(default)]
    #[schema(format = "email")]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl UserSignupData {
    pub fn validate(&self) -> Result<(), crate::resp::problem::Problem> {
        if !self.email.contains('@') {
            return Err(problem::bad_email(&self.email, "Not a valid e-mail address."));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct RolePatch {
    role: Role,
}

pub async fn find_by_email(
    store: &dyn DocumentStore,
    email: &str,
) -> Result<Option<User>, StoreError> {
    collection(store).find_one(filter::by_email(email)).await
}

pub async fn is_admin(store: &dyn DocumentStore, email: &str) -> Result<bool, StoreError> {
    Ok(find_by_email(store, email)
        .await?
        .map(|user| user.is_admin())
        .unwrap_or(false))
}

/// There is no matching demotion.
pub async fn promote_to_admin(
    store: &dyn DocumentStore,
    id: ObjectId,
) -> Result<UpdateOutcome, StoreError> {
    collection(store)
        .update_by_id(id, &RolePatch { role: Role::Admin }, Upsert::Deny)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[rocket::async_test]
    async fn promotion_makes_user_admin() {
        let store = MemoryStore::new();
        let id = collection(&store)
            .insert(&UserSignupData {
                email: "a@x.com".to_string(),
                name: None,
                image: None,
            })
            .await
            .unwrap();

        assert!(!is_admin(&store, "a@x.com").await.unwrap());
        let outcome = promote_to_admin(&store, id).await.unwrap();
        assert_eq!(outcome.modified_count, 1);
        assert!(is_admin(&store, "a@x.com").await.unwrap());
    }

    #[rocket::async_test]
    async fn promoting_unknown_id_creates_nothing() {
        let store = MemoryStore::new();

        let outcome = promote_to_admin(&store, ObjectId::new()).await.unwrap();

        assert_eq!(outcome.matched_count, 0);
        assert_eq!(outcome.upserted_id, None);
        assert_eq!(collection(&store).count().await.unwrap(), 0);
    }

    #[test]
    fn signup_requires_an_email() {
        let data = UserSignupData {
            email: "nobody".to_string(),
            name: None,
            image: None,
        };
        assert!(data.validate().is_err());
    }
}
