//! Request guards that run before a handler.
//!
//! [`Authenticated`] checks the bearer token; [`Admin`] requires an
//! [`Authenticated`] caller whose user document has the admin role. A refused
//! request never reaches the handler and no data is modified.

use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::request::{self, FromRequest, Request};

use super::jwt::TokenCodec;
use super::problem::Problem;
use crate::data::user;
use crate::error::AuthError;
use crate::store::SharedStore;

/// The problem a guard refused the request with, kept for the error catcher.
#[derive(Debug, Default)]
pub struct GateRejection(pub Option<Problem>);

fn reject<T>(req: &Request<'_>, problem: Problem) -> request::Outcome<T, Problem> {
    tracing::debug!("request refused: {}", problem.message());
    req.local_cache(|| GateRejection(Some(problem.clone())));
    Outcome::Error((problem.status, problem))
}

/// `None` only when the header is absent. A header without a bearer token
/// yields an empty token, which fails verification.
fn bearer_token<'r>(req: &'r Request<'_>) -> Option<&'r str> {
    let header = req.headers().get_one("Authorization")?;
    let token = match header.trim().split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
        _ => "",
    };
    Some(token)
}

fn unavailable(what: &str) -> Problem {
    Problem::new_untyped(Status::InternalServerError, "Server is misconfigured.")
        .detail(format!("{what} isn't managed."))
        .clone()
}

/// A caller that presented a valid, unexpired access token.
#[derive(Debug, Clone, PartialEq)]
pub struct Authenticated {
    pub email: String,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Authenticated {
    type Error = Problem;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let Some(codec) = req.rocket().state::<TokenCodec>() else {
            return reject(req, unavailable("Token codec"));
        };

        tracing::trace!("extracting access token from authorization header");
        let Some(token) = bearer_token(req) else {
            return reject(req, AuthError::Missing.into());
        };

        match codec.verify(token) {
            Ok(claims) => Outcome::Success(Authenticated {
                email: claims.email,
            }),
            Err(e) => reject(req, e.into()),
        }
    }
}

/// An [`Authenticated`] caller whose user document has `role: "admin"`.
#[derive(Debug, Clone, PartialEq)]
pub struct Admin {
    pub email: String,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Admin {
    type Error = Problem;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let auth = match req.guard::<Authenticated>().await {
            Outcome::Success(auth) => auth,
            Outcome::Error(e) => return Outcome::Error(e),
            Outcome::Forward(status) => return Outcome::Forward(status),
        };

        let Some(store) = req.rocket().state::<SharedStore>() else {
            return reject(req, unavailable("Document store"));
        };

        match user::is_admin(store.as_ref(), &auth.email).await {
            Ok(true) => Outcome::Success(Admin { email: auth.email }),
            Ok(false) => reject(
                req,
                Problem::new_untyped(Status::Forbidden, "Forbidden access.")
                    .detail("Admin role required.")
                    .clone(),
            ),
            Err(e) => reject(req, e.into()),
        }
    }
}
