use std::io::Cursor;

use rocket::http::ContentType;
use rocket::response::Responder;
use rocket::{response, Request, Response};
use serde::Serialize;

use crate::util::bson_to_json;

pub mod gate;
pub mod jwt;
pub mod problem;

use problem::Problem;

/// JSON response for stored records.
///
/// Values pass through BSON first so ObjectIds render as plain hex strings.
#[derive(Debug, Clone)]
pub struct DocJson<T>(pub T);

impl<T: Serialize> DocJson<T> {
    pub fn to_json(&self) -> Result<serde_json::Value, Problem> {
        let bson = bson::to_bson(&self.0).map_err(crate::error::StoreError::from)?;
        Ok(bson_to_json(bson))
    }
}

impl<'r, T: Serialize> Responder<'r, 'static> for DocJson<T> {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let body = match self.to_json() {
            Ok(value) => value.to_string(),
            Err(problem) => return problem.respond_to(req),
        };

        Response::build()
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}
