//! Lazy, date-bounded traversal of the paginated listing.

use std::sync::Arc;

use chrono::NaiveDate;
use futures_util::Stream;
use futures_util::stream;
use thiserror::Error;
use tracing::{debug, info, instrument};
use url::Url;

use super::parser::parse_listing;
use crate::document::RemoteDocumentRef;
use crate::fetch::{FetchError, Fetcher};

/// Errors that end a listing walk.
#[derive(Debug, Error)]
pub enum ListingError {
    /// The configured listing URL cannot be parsed.
    #[error("invalid listing URL: {url}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
    },

    /// A listing page could not be fetched.
    #[error("failed to fetch listing page {page}: {source}")]
    Fetch {
        /// Zero-based page index.
        page: u32,
        /// The underlying fetch error.
        #[source]
        source: FetchError,
    },
}

/// Inclusive publication date window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateFilter {
    /// Earliest sitting date to keep.
    pub start: Option<NaiveDate>,
    /// Latest sitting date to keep.
    pub end: Option<NaiveDate>,
}

impl DateFilter {
    /// Returns true when either bound is set.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    /// Returns true when `date` falls inside the window.
    ///
    /// Undated references are only accepted when no window is active.
    #[must_use]
    pub fn accepts(&self, date: Option<NaiveDate>) -> bool {
        match date {
            None => !self.is_active(),
            Some(d) => {
                self.start.is_none_or(|start| d >= start) && self.end.is_none_or(|end| d <= end)
            }
        }
    }

    /// Returns true when `date` is strictly before the window start.
    #[must_use]
    pub fn is_before_start(&self, date: Option<NaiveDate>) -> bool {
        matches!((date, self.start), (Some(d), Some(start)) if d < start)
    }
}

/// One listing page's worth of in-window references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    /// Zero-based page index.
    pub index: u32,
    /// References inside the date window, in page order.
    pub refs: Vec<RemoteDocumentRef>,
    /// References on this page dropped by the date window.
    pub filtered: usize,
}

/// Walks the listing page by page through a [`Fetcher`].
pub struct ListingWalker {
    fetcher: Arc<dyn Fetcher>,
    listing_url: Url,
}

enum WalkState {
    Next { index: u32, last: Option<u32> },
    Done,
}

impl ListingWalker {
    /// Creates a walker for `listing_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::InvalidUrl`] when the URL cannot be parsed.
    pub fn new(fetcher: Arc<dyn Fetcher>, listing_url: &str) -> Result<Self, ListingError> {
        let listing_url = Url::parse(listing_url).map_err(|_| ListingError::InvalidUrl {
            url: listing_url.to_string(),
        })?;
        Ok(Self {
            fetcher,
            listing_url,
        })
    }

    /// Returns the URL of page `index`, replacing any existing `page` parameter.
    #[must_use]
    pub fn page_url(&self, index: u32) -> Url {
        let mut url = self.listing_url.clone();
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != "page")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair("page", &index.to_string());
        url
    }

    /// Streams listing pages, stopping after the page that crosses `filter.start`.
    ///
    /// Pages are fetched one at a time, only when the stream is polled. A
    /// fetch failure is yielded once and ends the stream.
    pub fn walk(&self, filter: DateFilter) -> impl Stream<Item = Result<ListingPage, ListingError>> + '_ {
        stream::unfold(
            WalkState::Next {
                index: 0,
                last: None,
            },
            move |state| async move {
                let WalkState::Next { index, last } = state else {
                    return None;
                };

                match self.fetch_page(index, filter).await {
                    Ok((page, last_page, crossed)) => {
                        // The pager on page 0 decides how many pages exist.
                        let last = last.or(Some(last_page.unwrap_or(0)));
                        let next = if crossed {
                            info!(page = index, "start date boundary crossed, stopping walk");
                            WalkState::Done
                        } else if last.is_some_and(|l| index >= l) {
                            WalkState::Done
                        } else {
                            WalkState::Next {
                                index: index + 1,
                                last,
                            }
                        };
                        Some((Ok(page), next))
                    }
                    Err(error) => Some((Err(error), WalkState::Done)),
                }
            },
        )
    }

    #[instrument(skip(self, filter), fields(page = index))]
    async fn fetch_page(
        &self,
        index: u32,
        filter: DateFilter,
    ) -> Result<(ListingPage, Option<u32>, bool), ListingError> {
        let url = self.page_url(index);
        let body = self
            .fetcher
            .fetch(url.as_str())
            .await
            .map_err(|source| ListingError::Fetch {
                page: index,
                source,
            })?;

        let parsed = parse_listing(&body.text(), &url);
        let crossed = parsed
            .refs
            .iter()
            .any(|r| filter.is_before_start(r.published_date));

        let total = parsed.refs.len();
        let refs: Vec<RemoteDocumentRef> = parsed
            .refs
            .into_iter()
            .filter(|r| filter.accepts(r.published_date))
            .collect();
        let filtered = total - refs.len();

        debug!(
            discovered = total,
            kept = refs.len(),
            filtered,
            crossed,
            "listing page walked"
        );

        Ok((
            ListingPage {
                index,
                refs,
                filtered,
            },
            parsed.last_page,
            crossed,
        ))
    }
}
