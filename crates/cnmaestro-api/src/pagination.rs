// Offset/limit pagination
//
// Drives a page-by-page fetch loop over one endpoint. Pages are fetched
// strictly in order, one at a time. The server-reported total is the
// termination signal: the loop stops once `total < page_size * (page + 1)`.

use std::future::Future;

use tracing::{debug, warn};

use crate::error::Error;

/// Page size used by the controller's web UI.
pub const DEFAULT_PAGE_SIZE: u64 = 200;

/// Upper bound on pages fetched in one run.
pub const MAX_PAGES: u64 = 1000;

/// One fetched page.
#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total number of records across all pages, as reported by the server.
    pub total: u64,
}

/// Everything fetched by one pagination run.
#[derive(Debug)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    /// The last total reported by the server.
    pub total: u64,
    pub pages: u64,
}

/// Bounded offset/limit page loop.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    page_size: u64,
    max_pages: u64,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Paginator {
    pub fn new(page_size: u64) -> Self {
        Self {
            page_size: page_size.max(1),
            max_pages: MAX_PAGES,
        }
    }

    pub fn with_max_pages(mut self, max_pages: u64) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Fetch pages until the reported total is covered.
    ///
    /// `fetch_page` receives `(limit, offset)`. Any page error aborts the
    /// whole run. The loop also ends on an empty page or after
    /// `max_pages`, so a misbehaving server cannot keep it spinning.
    pub async fn run<T, F, Fut>(&self, mut fetch_page: F) -> Result<Paginated<T>, Error>
    where
        F: FnMut(u64, u64) -> Fut,
        Fut: Future<Output = Result<Page<T>, Error>>,
    {
        let mut items = Vec::new();
        let mut total = 0;
        let mut pages = 0;

        for page in 0..self.max_pages {
            let offset = self.page_size * page;
            let fetched = fetch_page(self.page_size, offset).await?;
            pages += 1;

            let count = fetched.items.len();
            total = fetched.total;
            items.extend(fetched.items);
            debug!(page, offset, count, total, "fetched page");

            if total < self.page_size * (page + 1) {
                break;
            }
            if count == 0 {
                warn!(page, total, "empty page before reported total was reached");
                break;
            }
            if page + 1 == self.max_pages {
                warn!(pages, total, "page limit reached before reported total");
            }
        }

        let fetched = u64::try_from(items.len()).unwrap_or(u64::MAX);
        if fetched != total {
            warn!(fetched, total, "fetched record count differs from reported total");
        }

        Ok(Paginated {
            items,
            total,
            pages,
        })
    }
}
