//! Paged result abstraction
//!
//! Providers page their list results in different ways. Some hand back the
//! whole result set and paging happens client-side by position
//! ([`MaterializedPageSource`]); others accept a limit and an opaque marker
//! and page server-side ([`CursorPageSource`]). Both produce the same
//! [`PagedResult`], and a marker taken from one page always resumes right
//! after the last item of that page.

use crate::error::Result;
use crate::resource::Resource;
use async_trait::async_trait;
use futures_util::future::BoxFuture;

/// Page size used when neither the caller nor the provider config sets one
pub const DEFAULT_RESULT_LIMIT: usize = 50;

/// Limit and continuation marker for a list or find call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: Option<usize>,
    pub marker: Option<String>,
}

impl PageRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    /// Requested limit, falling back to `default` when unset or zero
    pub fn effective_limit(&self, default: usize) -> usize {
        self.limit.filter(|l| *l > 0).unwrap_or(default.max(1))
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq)]
pub struct PagedResult<T> {
    items: Vec<T>,
    marker: Option<String>,
    total_results: usize,
    supports_total: bool,
    server_paged: bool,
}

impl<T> PagedResult<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            marker: None,
            total_results: 0,
            supports_total: true,
            server_paged: false,
        }
    }

    /// Continuation marker, `None` once the result set is exhausted
    pub fn marker(&self) -> Option<&str> {
        self.marker.as_deref()
    }

    pub fn is_truncated(&self) -> bool {
        self.marker.is_some()
    }

    /// Best-effort count: exact for client-paged results, the page length
    /// for server-paged ones.
    pub fn total_results(&self) -> usize {
        self.total_results
    }

    /// Whether `total_results` counts the whole result set
    pub fn supports_total(&self) -> bool {
        self.supports_total
    }

    pub fn is_server_paged(&self) -> bool {
        self.server_paged
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    /// Transform the items, keeping paging metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            marker: self.marker,
            total_results: self.total_results,
            supports_total: self.supports_total,
            server_paged: self.server_paged,
        }
    }
}

impl<T: Resource> PagedResult<T> {
    /// Build a server-paged result from a fetch that asked for `limit + 1`
    /// items; the extra item only signals that more results exist.
    pub fn from_lookahead(mut objects: Vec<T>, limit: usize) -> Self {
        let truncated = objects.len() > limit;
        objects.truncate(limit);
        let marker = if truncated {
            objects.last().map(|o| o.id().to_string())
        } else {
            None
        };
        Self {
            total_results: objects.len(),
            items: objects,
            marker,
            supports_total: false,
            server_paged: true,
        }
    }
}

impl<T> Default for PagedResult<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> IntoIterator for PagedResult<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a PagedResult<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Anything that can produce a page for a [`PageRequest`]
#[async_trait]
pub trait PageSource<T: Send>: Send + Sync {
    async fn fetch(&self, request: &PageRequest) -> Result<PagedResult<T>>;
}

/// Client-side paging over a fully materialized result set
pub struct MaterializedPageSource<T> {
    objects: Vec<T>,
    default_limit: usize,
}

impl<T: Resource> MaterializedPageSource<T> {
    pub fn new(objects: Vec<T>, default_limit: usize) -> Self {
        Self {
            objects,
            default_limit,
        }
    }

    fn window(&self, request: &PageRequest) -> (usize, usize) {
        let total = self.objects.len();
        let start = match &request.marker {
            // A marker that no longer resolves means we are past the end
            Some(marker) => self
                .objects
                .iter()
                .position(|o| o.id() == marker)
                .map(|i| i + 1)
                .unwrap_or(total),
            None => 0,
        };
        let limit = request.effective_limit(self.default_limit);
        (start, (start + limit).min(total))
    }

    /// Slice out the requested page, consuming the source
    pub fn into_page(mut self, request: &PageRequest) -> PagedResult<T> {
        let total = self.objects.len();
        let (start, end) = self.window(request);
        let items: Vec<T> = self.objects.drain(start..end).collect();
        let marker = if end < total {
            items.last().map(|o| o.id().to_string())
        } else {
            None
        };
        PagedResult {
            items,
            marker,
            total_results: total,
            supports_total: true,
            server_paged: false,
        }
    }
}

impl<T: Resource + Clone> MaterializedPageSource<T> {
    pub fn page(&self, request: &PageRequest) -> PagedResult<T> {
        let total = self.objects.len();
        let (start, end) = self.window(request);
        let items = self.objects[start..end].to_vec();
        let marker = if end < total {
            items.last().map(|o| o.id().to_string())
        } else {
            None
        };
        PagedResult {
            items,
            marker,
            total_results: total,
            supports_total: true,
            server_paged: false,
        }
    }
}

#[async_trait]
impl<T: Resource + Clone + Send + Sync> PageSource<T> for MaterializedPageSource<T> {
    async fn fetch(&self, request: &PageRequest) -> Result<PagedResult<T>> {
        Ok(self.page(request))
    }
}

/// Request handed to a cursor fetch function.
///
/// `limit` already includes the one-item lookahead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorRequest {
    pub limit: usize,
    pub marker: Option<String>,
}

type CursorFetch<'a, T> =
    Box<dyn Fn(CursorRequest) -> BoxFuture<'a, Result<Vec<T>>> + Send + Sync + 'a>;

/// Server-side paging through a provider call that understands
/// limit and marker
pub struct CursorPageSource<'a, T> {
    fetch: CursorFetch<'a, T>,
    default_limit: usize,
}

impl<'a, T> CursorPageSource<'a, T> {
    pub fn new<F>(default_limit: usize, fetch: F) -> Self
    where
        F: Fn(CursorRequest) -> BoxFuture<'a, Result<Vec<T>>> + Send + Sync + 'a,
    {
        Self {
            fetch: Box::new(fetch),
            default_limit,
        }
    }
}

#[async_trait]
impl<'a, T: Resource + Send + Sync> PageSource<T> for CursorPageSource<'a, T> {
    async fn fetch(&self, request: &PageRequest) -> Result<PagedResult<T>> {
        let limit = request.effective_limit(self.default_limit);
        let objects = (self.fetch)(CursorRequest {
            limit: limit + 1,
            marker: request.marker.clone(),
        })
        .await?;
        Ok(PagedResult::from_lookahead(objects, limit))
    }
}

type PageFetch<'a, T> =
    Box<dyn FnMut(PageRequest) -> BoxFuture<'a, Result<PagedResult<T>>> + Send + 'a>;

/// Walks a list function page by page.
///
/// ```ignore
/// let mut pages = Paginator::new(Some(20), |page| volumes.list(page));
/// loop {
///     let page = pages.next_page().await?;
///     if page.is_empty() {
///         break;
///     }
///     // ...
/// }
/// ```
pub struct Paginator<'a, T> {
    fetch: PageFetch<'a, T>,
    limit: Option<usize>,
    marker: Option<String>,
    exhausted: bool,
}

impl<'a, T: Send + 'a> Paginator<'a, T> {
    pub fn new<F>(limit: Option<usize>, fetch: F) -> Self
    where
        F: FnMut(PageRequest) -> BoxFuture<'a, Result<PagedResult<T>>> + Send + 'a,
    {
        Self {
            fetch: Box::new(fetch),
            limit,
            marker: None,
            exhausted: false,
        }
    }

    pub fn from_source(source: &'a dyn PageSource<T>, limit: Option<usize>) -> Self {
        Self::new(limit, move |request| {
            Box::pin(async move { source.fetch(&request).await })
        })
    }

    /// Next page of items; empty once the result set is exhausted
    pub async fn next_page(&mut self) -> Result<Vec<T>> {
        if self.exhausted {
            return Ok(Vec::new());
        }

        let request = PageRequest {
            limit: self.limit,
            marker: self.marker.take(),
        };
        let page = (self.fetch)(request).await?;

        match page.marker() {
            Some(marker) => self.marker = Some(marker.to_string()),
            None => self.exhausted = true,
        }

        Ok(page.into_vec())
    }

    /// Fetch every remaining page and concatenate them
    pub async fn collect_all(mut self) -> Result<Vec<T>> {
        let mut all = Vec::new();
        loop {
            let page = self.next_page().await?;
            if page.is_empty() {
                break;
            }
            all.extend(page);
        }
        Ok(all)
    }
}
