use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{filter, Collection};
use crate::error::StoreError;
use crate::resp::problem::{problems, Problem};
use crate::store::{DocumentStore, FindWindow};

pub static REVIEW_COLLECTION_NAME: &str = "reviews";

pub fn collection(store: &dyn DocumentStore) -> Collection<'_, Review> {
    Collection::new(store, REVIEW_COLLECTION_NAME)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id")]
    #[schema(value_type = String)]
    pub id: ObjectId,
    pub course_id: String,
    pub rating: f64,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewData {
    #[serde(default)]
    pub course_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ReviewData {
    pub fn validate(&self) -> Result<(), Problem> {
        if self.course_id.trim().is_empty() {
            return Err(problems::missing_field("courseId"));
        }
        match self.rating {
            None => return Err(problems::missing_field("rating")),
            Some(rating) if !rating.is_finite() => {
                return Err(problems::bad_field("rating", "Rating must be a number."))
            }
            Some(_) => {}
        }
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewAverage {
    pub average_rating: f64,
    pub total_reviews: u64,
}

impl ReviewAverage {
    pub fn of(ratings: impl IntoIterator<Item = f64>) -> ReviewAverage {
        let (sum, total_reviews) = ratings
            .into_iter()
            .fold((0.0, 0u64), |(sum, n), rating| (sum + rating, n + 1));

        let average_rating = if total_reviews == 0 {
            0.0
        } else {
            sum / total_reviews as f64
        };

        ReviewAverage {
            average_rating,
            total_reviews,
        }
    }
}

pub async fn for_course(
    store: &dyn DocumentStore,
    course_id: &str,
) -> Result<Vec<Review>, StoreError> {
    collection(store)
        .find_all(filter::by_course_id(course_id), FindWindow::all())
        .await
}

/// Recomputed from every review of the course on each call.
pub async fn average_for(
    store: &dyn DocumentStore,
    course_id: &str,
) -> Result<ReviewAverage, StoreError> {
    let reviews = for_course(store, course_id).await?;
    Ok(ReviewAverage::of(reviews.iter().map(|it| it.rating)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentStore, MemoryStore};

    #[test]
    fn empty_average_is_zero() {
        assert_eq!(
            ReviewAverage::of(Vec::<f64>::new()),
            ReviewAverage {
                average_rating: 0.0,
                total_reviews: 0
            }
        );
    }

    #[rocket::async_test]
    async fn average_only_counts_matching_course() {
        let store = MemoryStore::new();
        let reviews = collection(&store);
        for (course, rating) in [("rust", 4.0), ("rust", 5.0), ("go", 1.0)] {
            reviews
                .insert(&ReviewData {
                    course_id: course.to_string(),
                    rating: Some(rating),
                    body: String::from("fine"),
                    name: None,
                    email: None,
                })
                .await
                .expect("unable to insert review");
        }

        let average = average_for(&store, "rust").await.unwrap();
        assert_eq!(average.total_reviews, 2);
        assert!((average.average_rating - 4.5).abs() < f64::EPSILON);
    }

    #[rocket::async_test]
    async fn unreadable_review_fails_the_average() {
        let store = MemoryStore::new();
        store
            .insert(
                REVIEW_COLLECTION_NAME,
                bson::doc! { "courseId": "rust", "rating": "five" },
            )
            .await
            .expect("unable to insert review");

        let result = average_for(&store, "rust").await;

        assert!(matches!(result, Err(StoreError::Deserialize(_))));
    }
}
