use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::data::parse_id;
use crate::data::user::problem as user_problem;
use crate::data::user::{self, User, UserSignupData};
use crate::resp::gate::Admin;
use crate::resp::jwt::TokenCodec;
use crate::resp::problem::Problem;
use crate::resp::DocJson;
use crate::store::{DeleteOutcome, FindWindow, InsertOutcome, SharedStore, UpdateOutcome};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub access_token: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatus {
    pub is_admin: bool,
}

/// Issue an access token for a registered user
#[utoipa::path(
    params(
        ("email" = String, Query, description = "e-mail of a registered user")
    ),
    responses(
        (status = 200, description = "Signed access token", body = AccessTokenResponse),
        (status = 400, description = "No e-mail given", body = Problem),
        (status = 403, description = "E-mail isn't registered, accessToken is empty", body = Problem),
    )
)]
#[get("/jwt?<email>")]
#[tracing::instrument(skip(store, codec))]
pub async fn token_issue(
    email: Option<&str>,
    store: &State<SharedStore>,
    codec: &State<TokenCodec>,
) -> Result<Json<AccessTokenResponse>, Problem> {
    let email = match email {
        Some(email) if !email.trim().is_empty() => email,
        _ => return Err(user_problem::bad_email("", "An e-mail address is required.")),
    };

    if user::find_by_email(store.inner().as_ref(), email)
        .await?
        .is_none()
    {
        return Err(user_problem::not_registered(email));
    }

    let access_token = codec.issue(email)?;
    tracing::debug!("issued access token for {}", email);

    Ok(Json(AccessTokenResponse { access_token }))
}

/// List users
#[utoipa::path(
    responses(
        (status = 200, description = "Every registered user", body = [User]),
    )
)]
#[get("/users")]
#[tracing::instrument(skip(store))]
pub async fn user_list(store: &State<SharedStore>) -> Result<DocJson<Vec<User>>, Problem> {
    Ok(DocJson(
        user::collection(store.inner().as_ref())
            .find_all(Default::default(), FindWindow::all())
            .await?,
    ))
}

/// Register a user
///
/// New users are members; the admin role is only granted by another admin.
#[utoipa::path(
    request_body = UserSignupData,
    responses(
        (status = 200, description = "Id of the new user", body = InsertOutcome),
        (status = 400, description = "Malformed e-mail", body = Problem),
        (status = 409, description = "E-mail is already registered", body = Problem),
    )
)]
#[post("/users", data = "<signup>")]
#[tracing::instrument(skip(store))]
pub async fn user_create(
    signup: Json<UserSignupData>,
    store: &State<SharedStore>,
) -> Result<DocJson<InsertOutcome>, Problem> {
    signup.validate()?;

    let store = store.inner().as_ref();
    if user::find_by_email(store, &signup.email).await?.is_some() {
        return Err(Problem::new_untyped(Status::Conflict, "User already exists.")
            .insert_str("email", &signup.email)
            .detail("This e-mail address is already registered.")
            .clone());
    }

    let id = user::collection(store).insert(&signup.0).await?;
    tracing::info!("registered user {}", signup.email);

    Ok(DocJson(InsertOutcome::from(id)))
}

/// Check whether an e-mail belongs to an admin
#[utoipa::path(
    params(
        ("email", description = "user e-mail")
    ),
    responses(
        (status = 200, description = "Admin flag, false for unknown e-mails", body = AdminStatus),
    )
)]
#[get("/users/admin/<email>")]
#[tracing::instrument(skip(store))]
pub async fn user_admin_status(
    email: &str,
    store: &State<SharedStore>,
) -> Result<Json<AdminStatus>, Problem> {
    let is_admin = user::is_admin(store.inner().as_ref(), email).await?;
    Ok(Json(AdminStatus { is_admin }))
}

/// Grant a user the admin role
#[utoipa::path(
    params(
        ("id", description = "user ID")
    ),
    responses(
        (status = 200, description = "Matched and modified counts, nothing is created for unknown IDs", body = UpdateOutcome),
        (status = 400, description = "Malformed user ID", body = Problem),
        (status = 401, description = "Missing token", body = Problem),
        (status = 403, description = "Invalid token or caller isn't an admin", body = Problem),
    ),
    security(
        ("jwt" = [])
    )
)]
#[put("/users/admin/<id>")]
#[tracing::instrument(skip(store))]
pub async fn user_promote(
    id: &str,
    admin: Admin,
    store: &State<SharedStore>,
) -> Result<DocJson<UpdateOutcome>, Problem> {
    let id = parse_id(id)?;
    let outcome = user::promote_to_admin(store.inner().as_ref(), id).await?;
    tracing::info!("{} promoted user {} to admin", admin.email, id);

    Ok(DocJson(outcome))
}

/// Delete a user
#[utoipa::path(
    params(
        ("id", description = "user ID")
    ),
    responses(
        (status = 200, description = "Number of deleted users", body = DeleteOutcome),
        (status = 400, description = "Malformed user ID", body = Problem),
        (status = 401, description = "Missing token", body = Problem),
        (status = 403, description = "Invalid token or caller isn't an admin", body = Problem),
    ),
    security(
        ("jwt" = [])
    )
)]
#[delete("/users/<id>")]
#[tracing::instrument(skip(store))]
pub async fn user_delete(
    id: &str,
    admin: Admin,
    store: &State<SharedStore>,
) -> Result<DocJson<DeleteOutcome>, Problem> {
    let id = parse_id(id)?;
    let outcome = user::collection(store.inner().as_ref())
        .delete_by_id(id)
        .await?;
    tracing::info!("{} deleted user {}", admin.email, id);

    Ok(DocJson(outcome))
}

#[cfg(test)]
mod user_endpoints {
    use chrono::{Duration, Utc};
    use rocket::http::{ContentType, Header, Status};
    use serde_json::{json, Value};

    use crate::route::testing::TestApp;

    #[rocket::async_test]
    async fn registered_user_gets_token() {
        let app = TestApp::new().await;

        let response = app
            .client
            .post("/users")
            .header(ContentType::JSON)
            .body(json!({ "email": "a@x.com" }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let response = app.client.get("/jwt?email=a@x.com").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().await.expect("invalid response json");
        let token = body["accessToken"].as_str().expect("missing accessToken");
        assert!(!token.is_empty());
        assert_eq!(app.codec.verify(token).map(|it| it.email).ok().as_deref(), Some("a@x.com"));

        let response = app.client.get("/jwt?email=b@x.com").dispatch().await;
        assert_eq!(response.status(), Status::Forbidden);
        let body: Value = response.into_json().await.expect("invalid problem json");
        assert_eq!(body["accessToken"], json!(""));
    }

    #[rocket::async_test]
    async fn signup_cannot_choose_role() {
        let app = TestApp::new().await;

        app.client
            .post("/users")
            .header(ContentType::JSON)
            .body(json!({ "email": "sneaky@x.com", "role": "admin" }).to_string())
            .dispatch()
            .await;

        let status: Value = app
            .client
            .get("/users/admin/sneaky@x.com")
            .dispatch()
            .await
            .into_json()
            .await
            .expect("invalid response json");
        assert_eq!(status, json!({ "isAdmin": false }));

        let again = app
            .client
            .post("/users")
            .header(ContentType::JSON)
            .body(json!({ "email": "sneaky@x.com" }).to_string())
            .dispatch()
            .await;
        assert_eq!(again.status(), Status::Conflict);
        assert_eq!(app.count("users").await, 1);
    }

    #[rocket::async_test]
    async fn admin_promotes_member() {
        let app = TestApp::new().await;
        let admin = app.admin("admin@example.com").await;
        let inserted: Value = app
            .client
            .post("/users")
            .header(ContentType::JSON)
            .body(json!({ "email": "m@x.com", "name": "Member" }).to_string())
            .dispatch()
            .await
            .into_json()
            .await
            .expect("invalid response json");
        let id = inserted["insertedId"].as_str().expect("missing insertedId");

        let response = app
            .client
            .put(format!("/users/admin/{id}"))
            .header(admin.clone())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let status: Value = app
            .client
            .get("/users/admin/m@x.com")
            .dispatch()
            .await
            .into_json()
            .await
            .expect("invalid response json");
        assert_eq!(status, json!({ "isAdmin": true }));

        let response = app
            .client
            .put("/users/admin/5f8d0d55b54764421b7156c9")
            .header(admin)
            .dispatch()
            .await;
        let outcome: Value = response.into_json().await.expect("invalid response json");
        assert_eq!(outcome["matchedCount"], json!(0));
        assert_eq!(app.count("users").await, 2);
    }

    #[rocket::async_test]
    async fn expired_token_is_forbidden() {
        let app = TestApp::new().await;
        app.admin("admin@example.com").await;
        let token = app
            .codec
            .issue_at("admin@example.com", Utc::now() - Duration::hours(2))
            .expect("token should encode");

        let response = app
            .client
            .delete("/users/5f8d0d55b54764421b7156c9")
            .header(Header::new("Authorization", format!("Bearer {token}")))
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Forbidden);
        let body: Value = response.into_json().await.expect("invalid problem json");
        assert_eq!(body["message"], json!("Token has expired."));
    }

    #[rocket::async_test]
    async fn signup_without_email_is_bad_request() {
        let app = TestApp::new().await;

        let response = app
            .client
            .post("/users")
            .header(ContentType::JSON)
            .body(json!({ "name": "Nobody" }).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::BadRequest);
        assert_eq!(app.count("users").await, 0);
    }
}
