//! Enrollment records and the one-booking-per-student-and-course rule.
//!
//! The rule is held by a unique index on `(email, courseName)` created at
//! startup. The lookup before inserting only exists to answer the common
//! repeat booking without a failed write; a concurrent duplicate that slips
//! past it is refused by the index and reported the same way.

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{filter, Collection};
use crate::error::StoreError;
use crate::resp::problem::{problems, Problem};
use crate::store::{DocumentStore, FindWindow};

pub static BOOKING_COLLECTION_NAME: &str = "bookings";
pub static BOOKING_UNIQUE_KEYS: [&str; 2] = ["email", "courseName"];

pub fn collection(store: &dyn DocumentStore) -> Collection<'_, Booking> {
    Collection::new(store, BOOKING_COLLECTION_NAME)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id")]
    #[schema(value_type = String)]
    pub id: ObjectId,
    pub email: String,
    pub course_name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub course_name: String,
    #[serde(default)]
    pub price: f64,
}

impl BookingRequest {
    pub fn validate(&self) -> Result<(), Problem> {
        if self.email.trim().is_empty() {
            return Err(problems::missing_field("email"));
        }
        if self.course_name.trim().is_empty() {
            return Err(problems::missing_field("courseName"));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(problems::bad_field("price", "Price must be a non-negative number."));
        }
        Ok(())
    }
}

/// Document written for a new booking.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewBooking<'a> {
    email: &'a str,
    course_name: &'a str,
    price: f64,
    paid: bool,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
pub enum RejectReason {
    AlreadyBooked,
}

/// Result of a booking attempt. A repeat booking is not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingOutcome {
    pub acknowledged: bool,
    pub accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub booking_id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl BookingOutcome {
    pub fn accepted(booking_id: ObjectId) -> BookingOutcome {
        BookingOutcome {
            acknowledged: true,
            accepted: true,
            booking_id: Some(booking_id),
            reason: None,
            message: None,
        }
    }

    pub fn already_booked(course_name: &str) -> BookingOutcome {
        BookingOutcome {
            acknowledged: false,
            accepted: false,
            booking_id: None,
            reason: Some(RejectReason::AlreadyBooked),
            message: Some(format!("You are already booked {course_name} Course")),
        }
    }
}

/// Makes sure the store refuses a second booking of the same course.
pub async fn prepare(store: &dyn DocumentStore) -> Result<(), StoreError> {
    store
        .ensure_unique(BOOKING_COLLECTION_NAME, &BOOKING_UNIQUE_KEYS)
        .await
}

/// Books `request.course_name` for `request.email` unless it's already booked.
pub async fn create_booking(
    store: &dyn DocumentStore,
    request: &BookingRequest,
) -> Result<BookingOutcome, StoreError> {
    let bookings = collection(store);
    let existing = bookings
        .find_one(filter::by_enrollment(&request.email, &request.course_name))
        .await?;

    if existing.is_some() {
        tracing::debug!(
            "{} already booked '{}'",
            request.email,
            request.course_name
        );
        return Ok(BookingOutcome::already_booked(&request.course_name));
    }

    let booking = NewBooking {
        email: &request.email,
        course_name: &request.course_name,
        price: request.price,
        paid: false,
    };

    match bookings.insert(&booking).await {
        Ok(id) => Ok(BookingOutcome::accepted(id)),
        Err(StoreError::Duplicate { .. }) => {
            tracing::debug!(
                "concurrent booking of '{}' by {} refused by unique index",
                request.course_name,
                request.email
            );
            Ok(BookingOutcome::already_booked(&request.course_name))
        }
        Err(other) => Err(other),
    }
}

pub async fn for_email(store: &dyn DocumentStore, email: &str) -> Result<Vec<Booking>, StoreError> {
    collection(store)
        .find_all(filter::by_email(email), FindWindow::all())
        .await
}
