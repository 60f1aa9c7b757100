use bson::oid::ObjectId;
use rocket::http::Status;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::{booking, Collection};
use crate::error::StoreError;
use crate::resp::problem::{problems, Problem};
use crate::store::{DocumentStore, InsertOutcome, Upsert};

pub static PAYMENT_COLLECTION_NAME: &str = "payments";

pub fn collection(store: &dyn DocumentStore) -> Collection<'_, Payment> {
    Collection::new(store, PAYMENT_COLLECTION_NAME)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(rename = "_id")]
    #[schema(value_type = String)]
    pub id: ObjectId,
    pub booking_id: String,
    pub transaction_id: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentData {
    #[serde(default)]
    pub booking_id: String,
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default)]
    pub amount: f64,
}

impl PaymentData {
    pub fn validate(&self) -> Result<ObjectId, Problem> {
        if self.transaction_id.trim().is_empty() {
            return Err(problems::missing_field("transactionId"));
        }
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(problems::bad_field("amount", "Amount must be a non-negative number."));
        }
        super::parse_id(&self.booking_id)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PaidPatch<'a> {
    paid: bool,
    transaction_id: &'a str,
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("booking {0} doesn't exist")]
    UnknownBooking(ObjectId),
    #[error("booking {booking} couldn't be marked paid: {source}")]
    BookingNotUpdated {
        booking: ObjectId,
        #[source]
        source: StoreError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<PaymentError> for Problem {
    fn from(e: PaymentError) -> Self {
        match e {
            PaymentError::UnknownBooking(id) => {
                Problem::new_untyped(Status::NotFound, "Booking doesn't exist.")
                    .insert("bookingId", id.to_hex())
                    .clone()
            }
            PaymentError::BookingNotUpdated { source, .. } => Problem::from(source)
                .detail("The payment wasn't recorded because its booking couldn't be updated.")
                .clone(),
            PaymentError::Store(source) => Problem::from(source),
        }
    }
}

/// Records a payment and marks its booking paid.
///
/// The payment is written first; if the booking can't be updated afterwards
/// the payment is deleted again so no payment points at an unpaid booking.
pub async fn record_payment(
    store: &dyn DocumentStore,
    booking_id: ObjectId,
    payment: &PaymentData,
) -> Result<InsertOutcome, PaymentError> {
    let bookings = booking::collection(store);
    if bookings.find_by_id(booking_id).await?.is_none() {
        return Err(PaymentError::UnknownBooking(booking_id));
    }

    let payments = collection(store);
    let payment_id = payments.insert(payment).await?;

    let patch = PaidPatch {
        paid: true,
        transaction_id: &payment.transaction_id,
    };
    let updated = match bookings.update_by_id(booking_id, &patch, Upsert::Deny).await {
        Ok(outcome) if outcome.matched_count == 1 => Ok(()),
        Ok(_) => Err(PaymentError::UnknownBooking(booking_id)),
        Err(source) => Err(PaymentError::BookingNotUpdated {
            booking: booking_id,
            source,
        }),
    };

    if let Err(e) = updated {
        tracing::warn!("Rolling back payment {}: {}", payment_id, e);
        if let Err(rollback) = payments.delete_by_id(payment_id).await {
            tracing::error!(
                "Payment {} for booking {} is recorded but the booking is unpaid: {}",
                payment_id,
                booking_id,
                rollback
            );
        }
        return Err(e);
    }

    tracing::info!("Booking {} paid with payment {}", booking_id, payment_id);
    Ok(InsertOutcome::from(payment_id))
}
