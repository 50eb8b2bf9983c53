//! Draining paginated listings.
//!
//! GitHub paginates REST collections by page number (advertised through the
//! `Link: <...>; rel="next"` header) and GraphQL connections by cursor.
//! [`collect_pages`] drives either kind to completion, keeping the server's
//! order and aborting on the first failing page.

use std::collections::HashSet;
use std::future::Future;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::client::GitHubClient;
use crate::error::{Error, Result};

/// Page size requested from REST listings.
pub const PER_PAGE: u8 = 100;

/// Position of the next page to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageToken {
    /// A REST page number, starting at 1.
    Number(u32),
    /// A GraphQL `endCursor`.
    Cursor(String),
}

/// One fetched page.
#[derive(Debug)]
pub struct Page<T> {
    /// Items on this page, in server order.
    pub items: Vec<T>,
    /// Where to continue, or `None` on the last page.
    pub next: Option<PageToken>,
}

/// Fetches pages until the remote reports no next token.
///
/// `fetch` receives `None` for the first page. A token the listing has
/// already followed ends it instead of looping forever.
///
/// # Errors
///
/// Returns the first error `fetch` produces; items from earlier pages are
/// dropped.
///
/// # Examples
///
/// ```
/// use hubform_github::pagination::{Page, PageToken, collect_pages};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> hubform_github::Result<()> {
/// let items = collect_pages(|token| async move {
///     Ok(match token {
///         None => Page { items: vec![1, 2], next: Some(PageToken::Number(2)) },
///         Some(_) => Page { items: vec![3], next: None },
///     })
/// })
/// .await?;
/// assert_eq!(items, vec![1, 2, 3]);
/// # Ok(())
/// # }
/// ```
pub async fn collect_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<PageToken>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut token: Option<PageToken> = None;
    let mut seen: HashSet<PageToken> = HashSet::new();
    let mut pages = 0usize;

    loop {
        let page = fetch(token.clone()).await?;
        pages += 1;
        items.extend(page.items);

        match page.next {
            Some(next) if !seen.insert(next.clone()) => {
                warn!(?next, "remote returned an already followed page token, stopping");
                break;
            }
            Some(next) => token = Some(next),
            None => break,
        }
    }

    debug!(pages, count = items.len(), "drained paginated listing");
    Ok(items)
}

/// Extracts the `page` parameter from the query string of a `rel="next"`
/// link.
#[must_use]
pub fn next_page_number(query: Option<&str>) -> Option<u32> {
    query?
        .split('&')
        .find_map(|pair| pair.strip_prefix("page="))
        .and_then(|n| n.parse().ok())
}

/// Query string of one page request: the caller's filter plus paging.
#[derive(Serialize)]
struct PageQuery<'a, P: ?Sized> {
    #[serde(flatten)]
    filter: &'a P,
    per_page: u8,
    page: u32,
}

/// Listing filter for endpoints that take none.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct NoFilter {}

impl GitHubClient {
    /// Fetches every item of a REST listing that answers with a JSON array.
    ///
    /// The same `filter` is sent with every page request.
    ///
    /// # Errors
    ///
    /// Returns the error of the first page that fails.
    #[instrument(skip(self, filter))]
    pub async fn list_all<T, P>(&self, route: &str, filter: &P) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        collect_pages(|token| async move {
            let page = rest_page_number(token)?;
            let query = PageQuery {
                filter,
                per_page: PER_PAGE,
                page,
            };
            let response: octocrab::Page<T> = self.get_with(route, &query).await?;
            Ok(Page {
                items: response.items,
                next: next_page_number(response.next.as_ref().and_then(|uri| uri.query()))
                    .map(PageToken::Number),
            })
        })
        .await
    }

    /// Fetches every item of a REST listing wrapped in an object carrying a
    /// `total_count`.
    ///
    /// `unwrap` splits one response into its total count and items. Paging
    /// stops once `page * per_page` reaches the total or a page is empty.
    ///
    /// # Errors
    ///
    /// Returns the error of the first page that fails.
    #[instrument(skip(self, unwrap))]
    pub async fn list_counted<T, W>(&self, route: &str, unwrap: fn(W) -> (u64, Vec<T>)) -> Result<Vec<T>>
    where
        W: DeserializeOwned,
    {
        collect_pages(|token| async move {
            let page = rest_page_number(token)?;
            let query = PageQuery {
                filter: &NoFilter {},
                per_page: PER_PAGE,
                page,
            };
            let (total, items) = unwrap(self.get_with::<W, _>(route, &query).await?);
            let fetched = u64::from(page) * u64::from(PER_PAGE);
            let next = (!items.is_empty() && fetched < total).then(|| PageToken::Number(page + 1));
            Ok(Page { items, next })
        })
        .await
    }
}

fn rest_page_number(token: Option<PageToken>) -> Result<u32> {
    match token {
        None => Ok(1),
        Some(PageToken::Number(n)) => Ok(n),
        Some(PageToken::Cursor(c)) => Err(Error::config(format!(
            "REST listings are paged by number, got cursor '{c}'"
        ))),
    }
}
