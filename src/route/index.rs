/// Liveness check
#[utoipa::path(
    responses(
        (status = 200, description = "The server is running", body = String),
    )
)]
#[get("/")]
pub async fn liveness() -> &'static str {
    "Welcome! Edulogy Server Site Is Running."
}
