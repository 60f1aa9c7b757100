use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;

use crate::data::booking::{self, Booking, BookingOutcome, BookingRequest};
use crate::data::parse_id;
use crate::resp::gate::Authenticated;
use crate::resp::problem::Problem;
use crate::resp::DocJson;
use crate::store::SharedStore;

/// List the caller's bookings
///
/// Without `email` the bookings of the token's owner are listed.
#[utoipa::path(
    params(
        ("email" = Option<String>, Query, description = "must equal the e-mail the token was issued for")
    ),
    responses(
        (status = 200, description = "Bookings made with the e-mail", body = [Booking]),
        (status = 401, description = "Missing token", body = Problem),
        (status = 403, description = "Invalid token or someone else's e-mail", body = Problem),
    ),
    security(
        ("jwt" = [])
    )
)]
#[get("/bookings?<email>")]
#[tracing::instrument(skip(store))]
pub async fn booking_list(
    email: Option<&str>,
    auth: Authenticated,
    store: &State<SharedStore>,
) -> Result<DocJson<Vec<Booking>>, Problem> {
    let email = email.unwrap_or(&auth.email);
    if email != auth.email {
        return Err(Problem::new_untyped(Status::Forbidden, "Forbidden access.")
            .detail("Bookings can only be listed for the e-mail the token was issued for.")
            .clone());
    }

    Ok(DocJson(
        booking::for_email(store.inner().as_ref(), email).await?,
    ))
}

/// Get a booking
#[utoipa::path(
    params(
        ("id", description = "booking ID")
    ),
    responses(
        (status = 200, description = "The booking, or null when it doesn't exist", body = Booking),
        (status = 400, description = "Malformed booking ID", body = Problem),
    )
)]
#[get("/bookings/<id>")]
#[tracing::instrument(skip(store))]
pub async fn booking_get(
    id: &str,
    store: &State<SharedStore>,
) -> Result<DocJson<Option<Booking>>, Problem> {
    let id = parse_id(id)?;
    Ok(DocJson(
        booking::collection(store.inner().as_ref())
            .find_by_id(id)
            .await?,
    ))
}

/// Book a course
///
/// Booking a course twice is answered with `accepted: false` instead of an
/// error.
#[utoipa::path(
    request_body = BookingRequest,
    responses(
        (status = 200, description = "Whether the booking was accepted", body = BookingOutcome),
        (status = 400, description = "Missing or malformed fields", body = Problem),
    )
)]
#[post("/bookings", data = "<request>")]
#[tracing::instrument(skip(store))]
pub async fn booking_create(
    request: Json<BookingRequest>,
    store: &State<SharedStore>,
) -> Result<DocJson<BookingOutcome>, Problem> {
    request.validate()?;

    let outcome = booking::create_booking(store.inner().as_ref(), &request).await?;
    if outcome.accepted {
        tracing::info!("{} booked '{}'", request.email, request.course_name);
    }

    Ok(DocJson(outcome))
}
