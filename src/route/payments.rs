use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::billing::Billing;
use crate::data::payment::{self, PaymentData};
use crate::resp::problem::{problems, Problem};
use crate::resp::DocJson;
use crate::store::{InsertOutcome, SharedStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaymentIntentRequest {
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}

/// Start a card payment
///
/// The price is charged in minor currency units, rounded to the nearest one.
#[utoipa::path(
    request_body = PaymentIntentRequest,
    responses(
        (status = 200, description = "Client secret of the new payment intent", body = PaymentIntentResponse),
        (status = 400, description = "Price isn't a positive number", body = Problem),
        (status = 502, description = "Payment provider refused the intent", body = Problem),
        (status = 503, description = "No payment provider is configured", body = Problem),
    )
)]
#[post("/create-payment-intent", data = "<request>")]
#[tracing::instrument(skip(billing))]
pub async fn payment_intent_create(
    request: Json<PaymentIntentRequest>,
    billing: &State<Billing>,
) -> Result<Json<PaymentIntentResponse>, Problem> {
    match billing.create_intent(request.price).await? {
        Some(client_secret) => Ok(Json(PaymentIntentResponse { client_secret })),
        None => Err(problems::bad_field(
            "price",
            "Price must be a positive number.",
        )),
    }
}

/// Record a payment and mark its booking paid
#[utoipa::path(
    request_body = PaymentData,
    responses(
        (status = 200, description = "Id of the new payment", body = InsertOutcome),
        (status = 400, description = "Missing or malformed fields", body = Problem),
        (status = 404, description = "Booking doesn't exist", body = Problem),
    )
)]
#[post("/payments", data = "<data>")]
#[tracing::instrument(skip(store))]
pub async fn payment_create(
    data: Json<PaymentData>,
    store: &State<SharedStore>,
) -> Result<DocJson<InsertOutcome>, Problem> {
    let booking_id = data.validate()?;

    let outcome = payment::record_payment(store.inner().as_ref(), booking_id, &data).await?;
    Ok(DocJson(outcome))
}
