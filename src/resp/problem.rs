use std::io::Cursor;

use rocket::http::ContentType;
use rocket::http::Status;
use rocket::response::Responder;
use rocket::{response, Request, Response};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};
use utoipa::ToSchema;

use crate::error::{AuthError, BillingError, StoreError};

/// Implements [RFC7807](https://tools.ietf.org/html/rfc7807).
///
/// The rendered body also carries a `message` field: the detail when there is
/// one, the title otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Problem {
    #[serde(skip)]
    pub status: Status,
    pub type_uri: String,
    pub title: String,

    pub detail: Option<String>,
    pub instance_uri: Option<String>,

    #[schema(value_type = Object)]
    pub body: Map<String, Value>,
}

impl Default for Problem {
    fn default() -> Self {
        Problem {
            status: Status::InternalServerError,
            type_uri: "about:blank".to_string(),
            title: "Problem".to_string(),
            detail: None,
            instance_uri: None,
            body: Map::new(),
        }
    }
}

impl Problem {
    pub fn new_untyped(status: Status, title: impl ToString) -> Problem {
        Problem {
            status,
            type_uri: "about:blank".to_string(),
            title: title.to_string(),
            ..Default::default()
        }
    }

    pub fn detail(&mut self, value: impl ToString) -> &mut Problem {
        self.detail = Some(value.to_string());
        self
    }

    pub fn instance_uri(&mut self, value: String) -> &mut Problem {
        self.instance_uri = Some(value);
        self
    }

    pub fn insert<V: Serialize>(&mut self, key: impl ToString, value: V) -> &mut Problem {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.body.insert(key.to_string(), value);
        self
    }

    pub fn insert_str(&mut self, key: impl ToString, value: impl ToString) -> &mut Problem {
        self.body
            .insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    pub fn message(&self) -> &str {
        self.detail.as_deref().unwrap_or(&self.title)
    }

    pub fn to_json(&self) -> Map<String, Value> {
        let mut body = self.body.clone();

        // Following are required by rfc7807
        body.insert(String::from("type"), Value::from(self.type_uri.clone()));
        body.insert(String::from("title"), Value::from(self.title.clone()));

        // Optional parameters as specified by rfc7807
        if let Some(detail) = &self.detail {
            body.insert(String::from("detail"), Value::from(detail.clone()));
        }
        body.insert(String::from("status"), Value::from(self.status.code));
        if let Some(instance) = &self.instance_uri {
            body.insert(String::from("instance"), Value::from(instance.clone()));
        }

        body.insert(String::from("message"), Value::from(self.message()));
        body
    }
}

impl Display for Problem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.title)
    }
}

impl std::error::Error for Problem {}

impl<'r> Responder<'r, 'static> for Problem {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let body_string = Value::Object(self.to_json()).to_string();

        Response::build()
            .status(self.status)
            .header(ContentType::new("application", "problem+json"))
            .raw_header("Content-Language", "en")
            .sized_body(body_string.len(), Cursor::new(body_string))
            .ok()
    }
}

pub mod problems {
    use crate::resp::problem::Problem;
    use rocket::http::Status;

    #[inline]
    pub fn bad_id(id: impl ToString) -> Problem {
        Problem::new_untyped(Status::BadRequest, "Malformed id.")
            .insert_str("id", id)
            .detail("Ids are 24 character hexadecimal strings.")
            .clone()
    }

    #[inline]
    pub fn missing_field(field: &str) -> Problem {
        Problem::new_untyped(Status::BadRequest, "Missing required field.")
            .insert_str("field", field)
            .detail(format!("'{field}' is required."))
            .clone()
    }

    #[inline]
    pub fn bad_field(field: &str, detail: impl ToString) -> Problem {
        Problem::new_untyped(Status::BadRequest, "Invalid field.")
            .insert_str("field", field)
            .detail(detail)
            .clone()
    }
}

impl From<StoreError> for Problem {
    fn from(e: StoreError) -> Self {
        tracing::error!("Document store failure: {}", e);

        match e {
            StoreError::Unavailable(_) => Problem::new_untyped(
                Status::ServiceUnavailable,
                "Server was unable to access the database.",
            ),
            StoreError::Duplicate { collection } => {
                Problem::new_untyped(Status::Conflict, "Document already exists.")
                    .insert_str("collection", collection)
                    .clone()
            }
            StoreError::Serialize(_) | StoreError::Deserialize(_) => Problem::new_untyped(
                Status::InternalServerError,
                "An error occurred while processing BSON data.",
            ),
            StoreError::Backend(_) => Problem::new_untyped(
                Status::InternalServerError,
                "MongoDB failed while processing request.",
            ),
        }
    }
}

impl From<AuthError> for Problem {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Missing => Problem::new_untyped(Status::Unauthorized, "Unauthorized access.")
                .detail("Missing bearer token.")
                .clone(),
            AuthError::InvalidSignature => {
                Problem::new_untyped(Status::Forbidden, "Forbidden access.")
                    .detail("Token is invalid.")
                    .clone()
            }
            AuthError::Expired => Problem::new_untyped(Status::Forbidden, "Forbidden access.")
                .detail("Token has expired.")
                .clone(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for Problem {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        tracing::error!("Unable to sign token: {}", e);
        Problem::new_untyped(Status::InternalServerError, "Error while handling JWT.")
    }
}

impl From<BillingError> for Problem {
    fn from(e: BillingError) -> Self {
        tracing::error!("Payment provider failure: {}", e);

        match e {
            BillingError::Unconfigured => Problem::new_untyped(
                Status::ServiceUnavailable,
                "Payments aren't available.",
            ),
            BillingError::Http(_) => Problem::new_untyped(
                Status::BadGateway,
                "Payment provider couldn't be reached.",
            ),
            BillingError::Rejected { message, .. } => {
                Problem::new_untyped(Status::BadGateway, "Payment provider refused the request.")
                    .detail(message)
                    .clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn body_carries_message() {
        let body = problems::missing_field("email").to_json();

        assert_eq!(body.get("status"), Some(&json!(400)));
        assert_eq!(body.get("message"), Some(&json!("'email' is required.")));
        assert_eq!(body.get("field"), Some(&json!("email")));
    }

    #[test]
    fn message_falls_back_to_title() {
        let problem = Problem::new_untyped(Status::Forbidden, "Forbidden access.");
        assert_eq!(problem.message(), "Forbidden access.");
    }

    #[test]
    fn auth_errors_map_to_statuses() {
        assert_eq!(Problem::from(AuthError::Missing).status, Status::Unauthorized);
        assert_eq!(Problem::from(AuthError::Expired).status, Status::Forbidden);
        assert_eq!(
            Problem::from(AuthError::InvalidSignature).status,
            Status::Forbidden
        );
    }
}
