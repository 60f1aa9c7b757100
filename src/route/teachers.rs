use rocket::serde::json::Json;
use rocket::State;

use crate::data::parse_id;
use crate::data::teacher::{self, Teacher, TeacherData, TeacherList, TeacherPatch};
use crate::middleware::paging::PageState;
use crate::resp::gate::Admin;
use crate::resp::problem::Problem;
use crate::resp::DocJson;
use crate::store::{DeleteOutcome, InsertOutcome, SharedStore, UpdateOutcome, Upsert};

/// List teachers, optionally one page at a time
#[utoipa::path(
    params(
        ("page" = Option<u64>, Query, description = "zero based page index"),
        ("size" = Option<u64>, Query, description = "teachers per page"),
    ),
    responses(
        (status = 200, description = "Total teacher count and the requested teachers", body = TeacherList),
    )
)]
#[get("/teachers")]
#[tracing::instrument(skip(store))]
pub async fn teacher_list(
    page: PageState,
    store: &State<SharedStore>,
) -> Result<DocJson<TeacherList>, Problem> {
    let teachers = teacher::collection(store.inner().as_ref());

    let count = teachers.count().await?;
    let teachers = teachers.find_all(Default::default(), page.window()).await?;

    Ok(DocJson(TeacherList { count, teachers }))
}

/// Get a teacher
#[utoipa::path(
    params(
        ("id", description = "teacher ID")
    ),
    responses(
        (status = 200, description = "The teacher, or null when it doesn't exist", body = Teacher),
        (status = 400, description = "Malformed teacher ID", body = Problem),
    )
)]
#[get("/teachers/<id>")]
#[tracing::instrument(skip(store))]
pub async fn teacher_get(
    id: &str,
    store: &State<SharedStore>,
) -> Result<DocJson<Option<Teacher>>, Problem> {
    let id = parse_id(id)?;
    Ok(DocJson(
        teacher::collection(store.inner().as_ref())
            .find_by_id(id)
            .await?,
    ))
}

/// Add a teacher
#[utoipa::path(
    request_body = TeacherData,
    responses(
        (status = 200, description = "Id of the new teacher", body = InsertOutcome),
        (status = 400, description = "Missing or malformed fields", body = Problem),
        (status = 401, description = "Missing token", body = Problem),
        (status = 403, description = "Invalid token or caller isn't an admin", body = Problem),
    ),
    security(
        ("jwt" = [])
    )
)]
#[post("/teachers", data = "<data>")]
#[tracing::instrument(skip(store))]
pub async fn teacher_create(
    admin: Admin,
    data: Json<TeacherData>,
    store: &State<SharedStore>,
) -> Result<DocJson<InsertOutcome>, Problem> {
    data.validate()?;

    let id = teacher::collection(store.inner().as_ref())
        .insert(&data.0)
        .await?;
    tracing::info!("{} added teacher {}", admin.email, id);

    Ok(DocJson(InsertOutcome::from(id)))
}

/// Update fields of a teacher
#[utoipa::path(
    params(
        ("id", description = "teacher ID")
    ),
    request_body = TeacherPatch,
    responses(
        (status = 200, description = "Matched and modified counts", body = UpdateOutcome),
        (status = 400, description = "Malformed teacher ID or fields", body = Problem),
        (status = 401, description = "Missing token", body = Problem),
        (status = 403, description = "Invalid token or caller isn't an admin", body = Problem),
    ),
    security(
        ("jwt" = [])
    )
)]
#[put("/teachers/<id>", data = "<patch>")]
#[tracing::instrument(skip(store))]
pub async fn teacher_update(
    id: &str,
    admin: Admin,
    patch: Json<TeacherPatch>,
    store: &State<SharedStore>,
) -> Result<DocJson<UpdateOutcome>, Problem> {
    let id = parse_id(id)?;
    patch.validate()?;

    let outcome = teacher::collection(store.inner().as_ref())
        .update_by_id(id, &patch.0, Upsert::Deny)
        .await?;

    Ok(DocJson(outcome))
}

/// Remove a teacher
#[utoipa::path(
    params(
        ("id", description = "teacher ID")
    ),
    responses(
        (status = 200, description = "Number of deleted teachers", body = DeleteOutcome),
        (status = 400, description = "Malformed teacher ID", body = Problem),
        (status = 401, description = "Missing token", body = Problem),
        (status = 403, description = "Invalid token or caller isn't an admin", body = Problem),
    ),
    security(
        ("jwt" = [])
    )
)]
#[delete("/teachers/<id>")]
#[tracing::instrument(skip(store))]
pub async fn teacher_delete(
    id: &str,
    admin: Admin,
    store: &State<SharedStore>,
) -> Result<DocJson<DeleteOutcome>, Problem> {
    let id = parse_id(id)?;
    let outcome = teacher::collection(store.inner().as_ref())
        .delete_by_id(id)
        .await?;
    tracing::info!("{} removed teacher {}", admin.email, id);

    Ok(DocJson(outcome))
}
