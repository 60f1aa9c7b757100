use rocket::serde::json::Json;
use rocket::State;

use crate::data::parse_id;
use crate::data::review::{self, Review, ReviewAverage, ReviewData};
use crate::resp::gate::Admin;
use crate::resp::problem::Problem;
use crate::resp::DocJson;
use crate::store::{DeleteOutcome, InsertOutcome, SharedStore};

/// List reviews of a course
#[utoipa::path(
    params(
        ("course_id", description = "course the reviews belong to")
    ),
    responses(
        (status = 200, description = "Every review of the course", body = [Review]),
    )
)]
#[get("/reviews/<course_id>")]
#[tracing::instrument(skip(store))]
pub async fn review_list(
    course_id: &str,
    store: &State<SharedStore>,
) -> Result<DocJson<Vec<Review>>, Problem> {
    Ok(DocJson(
        review::for_course(store.inner().as_ref(), course_id).await?,
    ))
}

/// Average rating of a course
#[utoipa::path(
    params(
        ("course_id", description = "course the reviews belong to")
    ),
    responses(
        (status = 200, description = "Average rating and number of reviews, both 0 without reviews", body = ReviewAverage),
    )
)]
#[get("/reviews/average/<course_id>")]
#[tracing::instrument(skip(store))]
pub async fn review_average(
    course_id: &str,
    store: &State<SharedStore>,
) -> Result<Json<ReviewAverage>, Problem> {
    Ok(Json(
        review::average_for(store.inner().as_ref(), course_id).await?,
    ))
}

/// Review a course
#[utoipa::path(
    request_body = ReviewData,
    responses(
        (status = 200, description = "Id of the new review", body = InsertOutcome),
        (status = 400, description = "Missing or malformed fields", body = Problem),
    )
)]
#[post("/reviews", data = "<data>")]
#[tracing::instrument(skip(store))]
pub async fn review_create(
    data: Json<ReviewData>,
    store: &State<SharedStore>,
) -> Result<DocJson<InsertOutcome>, Problem> {
    data.validate()?;

    let id = review::collection(store.inner().as_ref())
        .insert(&data.0)
        .await?;

    Ok(DocJson(InsertOutcome::from(id)))
}

/// Delete a review
#[utoipa::path(
    params(
        ("id", description = "review ID")
    ),
    responses(
        (status = 200, description = "Number of deleted reviews", body = DeleteOutcome),
        (status = 400, description = "Malformed review ID", body = Problem),
        (status = 401, description = "Missing token", body = Problem),
        (status = 403, description = "Invalid token or caller isn't an admin", body = Problem),
    ),
    security(
        ("jwt" = [])
    )
)]
#[delete("/reviews/<id>")]
#[tracing::instrument(skip(store))]
pub async fn review_delete(
    id: &str,
    admin: Admin,
    store: &State<SharedStore>,
) -> Result<DocJson<DeleteOutcome>, Problem> {
    let id = parse_id(id)?;
    let outcome = review::collection(store.inner().as_ref())
        .delete_by_id(id)
        .await?;
    tracing::info!("{} deleted review {}", admin.email, id);

    Ok(DocJson(outcome))
}

#[cfg(test)]
mod review_endpoints {
    use rocket::http::{ContentType, Header, Status};
    use serde_json::{json, Value};

    use crate::route::testing::TestApp;

    async fn post_review(app: &TestApp, course_id: &str, rating: f64) -> Value {
        let response = app
            .client
            .post("/reviews")
            .header(ContentType::JSON)
            .body(json!({ "courseId": course_id, "rating": rating, "body": "Good" }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        response.into_json().await.expect("invalid response json")
    }

    #[rocket::async_test]
    async fn average_of_course_reviews() {
        let app = TestApp::new().await;
        post_review(&app, "course-1", 4.0).await;
        post_review(&app, "course-1", 5.0).await;
        post_review(&app, "course-2", 1.0).await;

        let average: Value = app
            .client
            .get("/reviews/average/course-1")
            .dispatch()
            .await
            .into_json()
            .await
            .expect("invalid response json");

        assert_eq!(average, json!({ "averageRating": 4.5, "totalReviews": 2 }));

        let listed: Value = app
            .client
            .get("/reviews/course-1")
            .dispatch()
            .await
            .into_json()
            .await
            .expect("invalid response json");
        assert_eq!(listed.as_array().map(Vec::len), Some(2));
    }

    #[rocket::async_test]
    async fn average_without_reviews_is_zero() {
        let app = TestApp::new().await;

        let average: Value = app
            .client
            .get("/reviews/average/unreviewed")
            .dispatch()
            .await
            .into_json()
            .await
            .expect("invalid response json");

        assert_eq!(average, json!({ "averageRating": 0.0, "totalReviews": 0 }));
    }

    #[rocket::async_test]
    async fn delete_checks_id_and_role() {
        let app = TestApp::new().await;
        let admin = app.admin("admin@example.com").await;
        let inserted = post_review(&app, "course-1", 3.0).await;
        let id = inserted["insertedId"].as_str().expect("missing insertedId");

        let malformed = app
            .client
            .delete("/reviews/xyz")
            .header(admin.clone())
            .dispatch()
            .await;
        assert_eq!(malformed.status(), Status::BadRequest);

        let anonymous = app
            .client
            .delete(format!("/reviews/{id}"))
            .dispatch()
            .await;
        assert_eq!(anonymous.status(), Status::Unauthorized);

        let deleted = app
            .client
            .delete(format!("/reviews/{id}"))
            .header(admin)
            .dispatch()
            .await;
        assert_eq!(deleted.status(), Status::Ok);
        assert_eq!(app.count("reviews").await, 0);
    }

    #[rocket::async_test]
    async fn malformed_authorization_is_forbidden() {
        let app = TestApp::new().await;
        let inserted = post_review(&app, "course-1", 3.0).await;
        let id = inserted["insertedId"].as_str().expect("missing insertedId");

        for value in ["Basic abc", "Bearer", "Bearer ", "Token abc.def.ghi"] {
            let response = app
                .client
                .delete(format!("/reviews/{id}"))
                .header(Header::new("Authorization", value))
                .dispatch()
                .await;
            assert_eq!(response.status(), Status::Forbidden, "header {value:?}");
        }
        assert_eq!(app.count("reviews").await, 1);
    }

    #[rocket::async_test]
    async fn review_without_course_or_rating_is_bad_request() {
        let app = TestApp::new().await;

        for body in [json!({ "rating": 4, "body": "Nice" }), json!({ "courseId": "course-1" })] {
            let response = app
                .client
                .post("/reviews")
                .header(ContentType::JSON)
                .body(body.to_string())
                .dispatch()
                .await;
            assert_eq!(response.status(), Status::BadRequest, "body {body}");
        }
        assert_eq!(app.count("reviews").await, 0);
    }

    #[rocket::async_test]
    async fn review_without_content_type_is_accepted() {
        let app = TestApp::new().await;

        let response = app
            .client
            .post("/reviews")
            .body(json!({ "courseId": "course-1", "rating": 5 }).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        assert_eq!(app.count("reviews").await, 1);
    }
}
