//! Paged list responses and lazy iteration over every page.

use std::future::Future;

use anyhow::Result;
use futures::stream::{self, Stream};
use serde::Deserialize;

/// Page size used when streaming a whole list. The platform caps pages at
/// 200 entries, so this minimizes round trips.
pub const DEFAULT_PAGE_SIZE: u32 = 200;

/// One page of a list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub list: Vec<T>,
    #[serde(rename = "pageNo", default)]
    pub page_no: u32,
    #[serde(rename = "pageSize", default)]
    pub page_size: u32,
    /// Total number of pages
    #[serde(default)]
    pub pages: u32,
    /// Total number of entries
    #[serde(default)]
    pub total: u32,
}

struct Pager<T, F> {
    fetch: F,
    next_page: Option<u32>,
    buffered: std::vec::IntoIter<T>,
}

/// Turn a page fetcher into a stream of entries, starting at page 1.
///
/// A page is requested only once the previous page's entries have been
/// consumed. The stream ends after an empty page or once the requested page
/// number reaches `pages`. An error is yielded once and ends the stream.
pub(crate) fn paginate<T, F, Fut>(fetch: F) -> impl Stream<Item = Result<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let pager = Pager {
        fetch,
        next_page: Some(1),
        buffered: Vec::new().into_iter(),
    };

    stream::try_unfold(pager, |mut pager| async move {
        loop {
            if let Some(item) = pager.buffered.next() {
                return Ok::<_, anyhow::Error>(Some((item, pager)));
            }
            let Some(page_no) = pager.next_page else {
                return Ok(None);
            };

            let page = (pager.fetch)(page_no).await?;
            pager.next_page = if page.list.is_empty() || page_no >= page.pages {
                None
            } else {
                Some(page_no + 1)
            };
            pager.buffered = page.list.into_iter();
        }
    })
}
