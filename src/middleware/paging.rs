use std::convert::Infallible;

use rocket::request::{FromRequest, Outcome, Request};

use crate::store::FindWindow;

/// Requested page of a list route, read from `page` and `size` queries.
///
/// Without both values the whole collection is listed.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct PageState {
    pub page: Option<u64>,
    pub size: Option<u64>,
}

impl PageState {
    pub fn window(&self) -> FindWindow {
        match (self.page, self.size) {
            (Some(page), Some(size)) if size > 0 => FindWindow {
                skip: page.saturating_mul(size),
                limit: Some(i64::try_from(size).unwrap_or(i64::MAX)),
            },
            _ => FindWindow::all(),
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for PageState {
    type Error = Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let page: Option<u64> = request.query_value("page").and_then(|it| it.ok());
        let size: Option<u64> = request.query_value("size").and_then(|it| it.ok());

        Outcome::Success(PageState { page, size })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_and_size_become_skip_and_limit() {
        let state = PageState {
            page: Some(2),
            size: Some(10),
        };
        assert_eq!(
            state.window(),
            FindWindow {
                skip: 20,
                limit: Some(10)
            }
        );
    }

    #[test]
    fn partial_paging_lists_everything() {
        let state = PageState {
            page: Some(3),
            size: None,
        };
        assert_eq!(state.window(), FindWindow::all());
        assert_eq!(
            PageState {
                page: Some(0),
                size: Some(0)
            }
            .window(),
            FindWindow::all()
        );
    }
}
