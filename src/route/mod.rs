use rocket::http::Status;
use rocket::{Build, Catcher, Request, Rocket, Route};

pub mod bookings;
pub mod books;
pub mod courses;
pub mod index;
pub mod payments;
pub mod reviews;
pub mod teachers;
pub mod users;

use bookings::*;
use books::*;
use courses::*;
use index::*;
use payments::*;
use reviews::*;
use teachers::*;
use users::*;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    data::{
        book::Book,
        booking::{Booking, BookingOutcome, BookingRequest, RejectReason},
        course::{Course, CourseData, CourseList, CoursePatch},
        payment::{Payment, PaymentData},
        review::{Review, ReviewAverage, ReviewData},
        teacher::{Teacher, TeacherData, TeacherList, TeacherPatch},
        user::{User, UserSignupData},
    },
    resp::{gate::GateRejection, jwt::doc::JWTAuth, problem::Problem},
    role::Role,
    store::{DeleteOutcome, InsertOutcome, UpdateOutcome},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        liveness,
        course_list,
        course_get,
        course_create,
        course_update,
        course_delete,
        teacher_list,
        teacher_get,
        teacher_create,
        teacher_update,
        teacher_delete,
        book_list,
        book_get,
        review_list,
        review_average,
        review_create,
        review_delete,
        booking_list,
        booking_get,
        booking_create,
        payment_intent_create,
        payment_create,
        token_issue,
        user_list,
        user_create,
        user_admin_status,
        user_promote,
        user_delete
    ),
    components(schemas(
        Role,
        Course,
        CourseData,
        CoursePatch,
        CourseList,
        Teacher,
        TeacherData,
        TeacherPatch,
        TeacherList,
        Book,
        Review,
        ReviewData,
        ReviewAverage,
        Booking,
        BookingRequest,
        BookingOutcome,
        RejectReason,
        Payment,
        PaymentData,
        PaymentIntentRequest,
        PaymentIntentResponse,
        User,
        UserSignupData,
        AccessTokenResponse,
        AdminStatus,
        InsertOutcome,
        UpdateOutcome,
        DeleteOutcome,
        Problem
    )),
    modifiers(&JWTAuth)
)]
pub struct ApiDoc;

pub fn api() -> Vec<Route> {
    routes![
        liveness,
        course_list,
        course_get,
        course_create,
        course_update,
        course_delete,
        teacher_list,
        teacher_get,
        teacher_create,
        teacher_update,
        teacher_delete,
        book_list,
        book_get,
        review_list,
        review_average,
        review_create,
        review_delete,
        booking_list,
        booking_get,
        booking_create,
        payment_intent_create,
        payment_create,
        token_issue,
        user_list,
        user_create,
        user_admin_status,
        user_promote,
        user_delete
    ]
}

/// Renders the problem a guard refused the request with, or a generic one
/// for `status` when the failure came from elsewhere.
fn caught(status: Status, req: &Request<'_>) -> Problem {
    match &req.local_cache(GateRejection::default).0 {
        Some(problem) if problem.status == status => problem.clone(),
        _ => Problem::new_untyped(status, status.reason().unwrap_or("Request failed."))
            .instance_uri(req.uri().to_string())
            .clone(),
    }
}

#[catch(400)]
fn bad_request(req: &Request<'_>) -> Problem {
    caught(Status::BadRequest, req)
}

#[catch(401)]
fn unauthorized(req: &Request<'_>) -> Problem {
    caught(Status::Unauthorized, req)
}

#[catch(403)]
fn forbidden(req: &Request<'_>) -> Problem {
    caught(Status::Forbidden, req)
}

#[catch(404)]
fn not_found(req: &Request<'_>) -> Problem {
    caught(Status::NotFound, req)
}

#[catch(409)]
fn conflict(req: &Request<'_>) -> Problem {
    caught(Status::Conflict, req)
}

#[catch(422)]
fn unprocessable(req: &Request<'_>) -> Problem {
    caught(Status::UnprocessableEntity, req)
}

#[catch(500)]
fn internal_error(req: &Request<'_>) -> Problem {
    caught(Status::InternalServerError, req)
}

#[catch(503)]
fn unavailable(req: &Request<'_>) -> Problem {
    caught(Status::ServiceUnavailable, req)
}

pub fn catchers() -> Vec<Catcher> {
    catchers![
        bad_request,
        unauthorized,
        forbidden,
        not_found,
        conflict,
        unprocessable,
        internal_error,
        unavailable
    ]
}

pub fn mount_api(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .mount("/", api())
        .mount(
            "/",
            SwaggerUi::new("/swagger/<_..>").url("/openapi.json", ApiDoc::openapi()),
        )
        .register("/", catchers())
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use bson::doc;
    use chrono::Duration;
    use rocket::http::Header;
    use rocket::local::asynchronous::Client;

    use crate::billing::{Billing, PaymentProvider};
    use crate::data::{booking, user};
    use crate::error::BillingError;
    use crate::resp::jwt::TokenCodec;
    use crate::store::{DocumentStore, MemoryStore, SharedStore};

    /// Answers every intent with a secret that echoes the amount.
    pub struct FixedProvider;

    #[rocket::async_trait]
    impl PaymentProvider for FixedProvider {
        async fn create_intent(&self, amount: i64, currency: &str) -> Result<String, BillingError> {
            Ok(format!("pi_{amount}_{currency}_secret"))
        }
    }

    /// A server on top of a fresh [`MemoryStore`].
    pub struct TestApp {
        pub client: Client,
        pub store: Arc<MemoryStore>,
        pub codec: TokenCodec,
    }

    impl TestApp {
        pub async fn new() -> TestApp {
            let store = Arc::new(MemoryStore::new());
            booking::prepare(&*store)
                .await
                .expect("memory store supports unique keys");

            let codec = TokenCodec::new(b"route-test-secret", Duration::hours(1));
            let billing = Billing::new(Arc::new(FixedProvider), "usd");

            let shared: SharedStore = store.clone();
            let figment = rocket::Config::figment().merge(("log_level", "off"));
            let rocket = crate::assemble(figment, shared, codec.clone(), billing)
                .expect("test server should assemble");
            let client = Client::tracked(rocket)
                .await
                .expect("valid rocket instance");

            TestApp {
                client,
                store,
                codec,
            }
        }

        pub fn bearer(&self, email: &str) -> Header<'static> {
            let token = self.codec.issue(email).expect("token should encode");
            Header::new("Authorization", format!("Bearer {token}"))
        }

        pub async fn admin(&self, email: &str) -> Header<'static> {
            user::collection(&*self.store)
                .insert(&doc! { "email": email, "role": "admin" })
                .await
                .expect("admin should insert");
            self.bearer(email)
        }

        pub async fn member(&self, email: &str) -> Header<'static> {
            user::collection(&*self.store)
                .insert(&doc! { "email": email })
                .await
                .expect("member should insert");
            self.bearer(email)
        }

        pub async fn count(&self, collection: &str) -> u64 {
            self.store
                .count(collection, doc! {})
                .await
                .expect("memory store should count")
        }
    }
}
