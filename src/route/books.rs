use rocket::State;

use crate::data::book::{self, Book};
use crate::data::parse_id;
use crate::middleware::paging::PageState;
use crate::resp::problem::Problem;
use crate::resp::DocJson;
use crate::store::SharedStore;

/// List the book catalog
#[utoipa::path(
    params(
        ("page" = Option<u64>, Query, description = "zero based page index"),
        ("size" = Option<u64>, Query, description = "books per page"),
    ),
    responses(
        (status = 200, description = "Books in the catalog", body = [Book]),
    )
)]
#[get("/books")]
#[tracing::instrument(skip(store))]
pub async fn book_list(
    page: PageState,
    store: &State<SharedStore>,
) -> Result<DocJson<Vec<Book>>, Problem> {
    let books = book::collection(store.inner().as_ref())
        .find_all(Default::default(), page.window())
        .await?;

    Ok(DocJson(books))
}

/// Get a book
#[utoipa::path(
    params(
        ("id", description = "book ID")
    ),
    responses(
        (status = 200, description = "The book, or null when it doesn't exist", body = Book),
        (status = 400, description = "Malformed book ID", body = Problem),
    )
)]
#[get("/books/<id>")]
#[tracing::instrument(skip(store))]
pub async fn book_get(
    id: &str,
    store: &State<SharedStore>,
) -> Result<DocJson<Option<Book>>, Problem> {
    let id = parse_id(id)?;
    Ok(DocJson(
        book::collection(store.inner().as_ref()).find_by_id(id).await?,
    ))
}

#[cfg(test)]
mod book_endpoints {
    use bson::doc;
    use rocket::http::Status;
    use serde_json::{json, Value};

    use crate::data::book;
    use crate::route::testing::TestApp;

    #[rocket::async_test]
    async fn catalog_is_readable() {
        let app = TestApp::new().await;
        let id = book::collection(&*app.store)
            .insert(&doc! { "name": "The Rust Programming Language", "author": "Klabnik", "price": 39.0 })
            .await
            .expect("book should insert");

        let listed: Value = app
            .client
            .get("/books")
            .dispatch()
            .await
            .into_json()
            .await
            .expect("invalid response json");
        assert_eq!(listed.as_array().map(Vec::len), Some(1));

        let fetched: Value = app
            .client
            .get(format!("/books/{}", id.to_hex()))
            .dispatch()
            .await
            .into_json()
            .await
            .expect("invalid response json");
        assert_eq!(fetched["_id"], json!(id.to_hex()));
        assert_eq!(fetched["author"], json!("Klabnik"));
    }

    #[rocket::async_test]
    async fn catalog_has_no_writes() {
        let app = TestApp::new().await;
        let admin = app.admin("admin@example.com").await;

        let response = app
            .client
            .post("/books")
            .header(admin)
            .body("{}")
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::NotFound);
    }
}
