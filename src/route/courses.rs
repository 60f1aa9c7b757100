use rocket::serde::json::Json;
use rocket::State;

use crate::data::course::{self, Course, CourseData, CourseList, CoursePatch};
use crate::data::parse_id;
use crate::middleware::paging::PageState;
use crate::resp::gate::Admin;
use crate::resp::problem::Problem;
use crate::resp::DocJson;
use crate::store::{DeleteOutcome, InsertOutcome, SharedStore, UpdateOutcome, Upsert};

/// List courses, optionally one page at a time
#[utoipa::path(
    params(
        ("page" = Option<u64>, Query, description = "zero based page index"),
        ("size" = Option<u64>, Query, description = "courses per page"),
    ),
    responses(
        (status = 200, description = "Total course count and the requested courses", body = CourseList),
    )
)]
#[get("/courses")]
#[tracing::instrument(skip(store))]
pub async fn course_list(
    page: PageState,
    store: &State<SharedStore>,
) -> Result<DocJson<CourseList>, Problem> {
    let courses = course::collection(store.inner().as_ref());

    let count = courses.count().await?;
    let courses = courses.find_all(Default::default(), page.window()).await?;

    Ok(DocJson(CourseList { count, courses }))
}

/// Get a course
#[utoipa::path(
    params(
        ("id", description = "course ID")
    ),
    responses(
        (status = 200, description = "The course, or null when it doesn't exist", body = Course),
        (status = 400, description = "Malformed course ID", body = Problem),
    )
)]
#[get("/courses/<id>")]
#[tracing::instrument(skip(store))]
pub async fn course_get(
    id: &str,
    store: &State<SharedStore>,
) -> Result<DocJson<Option<Course>>, Problem> {
    let id = parse_id(id)?;
    Ok(DocJson(course::collection(store.inner().as_ref()).find_by_id(id).await?))
}

/// Create a course
#[utoipa::path(
    request_body = CourseData,
    responses(
        (status = 200, description = "Id of the new course", body = InsertOutcome),
        (status = 401, description = "Missing token", body = Problem),
        (status = 403, description = "Invalid token or caller isn't an admin", body = Problem),
    ),
    security(
        ("jwt" = [])
    )
)]
#[post("/courses", data = "<data>")]
#[tracing::instrument(skip(store))]
pub async fn course_create(
    admin: Admin,
    data: Json<CourseData>,
    store: &State<SharedStore>,
) -> Result<DocJson<InsertOutcome>, Problem> {
    data.validate()?;

    let id = course::collection(store.inner().as_ref()).insert(&data.0).await?;
    tracing::info!("{} created course {}", admin.email, id);

    Ok(DocJson(InsertOutcome::from(id)))
}

/// Update fields of a course
#[utoipa::path(
    params(
        ("id", description = "course ID")
    ),
    request_body = CoursePatch,
    responses(
        (status = 200, description = "Matched and modified counts", body = UpdateOutcome),
        (status = 400, description = "Malformed course ID or fields", body = Problem),
        (status = 401, description = "Missing token", body = Problem),
        (status = 403, description = "Invalid token or caller isn't an admin", body = Problem),
    ),
    security(
        ("jwt" = [])
    )
)]
#[put("/courses/<id>", data = "<patch>")]
#[tracing::instrument(skip(store))]
pub async fn course_update(
    id: &str,
    admin: Admin,
    patch: Json<CoursePatch>,
    store: &State<SharedStore>,
) -> Result<DocJson<UpdateOutcome>, Problem> {
    let id = parse_id(id)?;
    patch.validate()?;

    let outcome = course::collection(store.inner().as_ref())
        .update_by_id(id, &patch.0, Upsert::Deny)
        .await?;

    Ok(DocJson(outcome))
}

/// Delete a course
#[utoipa::path(
    params(
        ("id", description = "course ID")
    ),
    responses(
        (status = 200, description = "Number of deleted courses", body = DeleteOutcome),
        (status = 400, description = "Malformed course ID", body = Problem),
        (status = 401, description = "Missing token", body = Problem),
        (status = 403, description = "Invalid token or caller isn't an admin", body = Problem),
    ),
    security(
        ("jwt" = [])
    )
)]
#[delete("/courses/<id>")]
#[tracing::instrument(skip(store))]
pub async fn course_delete(
    id: &str,
    admin: Admin,
    store: &State<SharedStore>,
) -> Result<DocJson<DeleteOutcome>, Problem> {
    let id = parse_id(id)?;
    let outcome = course::collection(store.inner().as_ref()).delete_by_id(id).await?;
    tracing::info!("{} deleted course {}", admin.email, id);

    Ok(DocJson(outcome))
}
