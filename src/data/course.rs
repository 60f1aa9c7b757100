use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Collection;
use crate::resp::problem::{problems, Problem};
use crate::store::DocumentStore;

pub static COURSE_COLLECTION_NAME: &str = "courses";

pub fn collection(store: &dyn DocumentStore) -> Collection<'_, Course> {
    Collection::new(store, COURSE_COLLECTION_NAME)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(rename = "_id")]
    #[schema(value_type = String)]
    pub id: ObjectId,
    pub heading: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weeks: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lessons: Option<u32>,
    #[serde(default)]
    pub quiz: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub students: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
}

/// Fields a client supplies when creating a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseData {
    #[serde(default)]
    pub heading: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weeks: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lessons: Option<u32>,
    #[serde(default)]
    pub quiz: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub students: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
}

impl CourseData {
    pub fn validate(&self) -> Result<(), Problem> {
        if self.heading.trim().is_empty() {
            return Err(problems::missing_field("heading"));
        }
        match self.price {
            None => return Err(problems::missing_field("price")),
            Some(price) if !price.is_finite() || price < 0.0 => {
                return Err(problems::bad_field("price", "Price must be a non-negative number."))
            }
            Some(_) => {}
        }
        Ok(())
    }
}

/// Partial course update; only present fields are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CoursePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weeks: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lessons: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub students: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
}

impl CoursePatch {
    pub fn validate(&self) -> Result<(), Problem> {
        if matches!(&self.heading, Some(heading) if heading.trim().is_empty()) {
            return Err(problems::missing_field("heading"));
        }
        if matches!(self.price, Some(price) if !price.is_finite() || price < 0.0) {
            return Err(problems::bad_field("price", "Price must be a non-negative number."));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CourseList {
    pub count: u64,
    pub courses: Vec<Course>,
}
