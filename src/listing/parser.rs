//! HTML parsing for listing pages: pager and document rows.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, trace};
use url::Url;

use super::date::{parse_date, parse_title_and_url};
use crate::document::RemoteDocumentRef;

#[allow(clippy::expect_used)]
static LAST_PAGE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"li.pager__item--last a, li.pager-last a, a[title="Go to last page"]"#)
        .expect("last page selector is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static PAGER_LINK_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".pager a, .pagination a, nav[role=\"navigation\"] a")
        .expect("pager link selector is valid")
});

#[allow(clippy::expect_used)]
static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector is valid"));

/// Elements whose text is used as a row title when the link text has no date.
const ROW_ELEMENTS: [&str; 3] = ["tr", "li", "article"];
const ROW_CLASS: &str = "views-row";

/// Result of parsing one listing page.
#[derive(Debug, Clone, Default)]
pub struct ParsedListing {
    /// Zero-based index of the last page, when a pager is present.
    pub last_page: Option<u32>,
    /// Document references in page order.
    pub refs: Vec<RemoteDocumentRef>,
}

/// Parses a listing page fetched from `page_url`.
#[must_use]
pub fn parse_listing(html: &str, page_url: &Url) -> ParsedListing {
    let document = Html::parse_document(html);
    let last_page = find_last_page(&document, page_url);
    let refs = find_documents(&document, page_url);

    debug!(
        url = %page_url,
        last_page = ?last_page,
        documents = refs.len(),
        "parsed listing page"
    );

    ParsedListing { last_page, refs }
}

fn page_param(href: &str, base: &Url) -> Option<u32> {
    let url = base.join(href).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
}

fn find_last_page(document: &Html, base: &Url) -> Option<u32> {
    let explicit = document
        .select(&LAST_PAGE_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .find_map(|href| page_param(href, base));

    if explicit.is_some() {
        return explicit;
    }

    document
        .select(&PAGER_LINK_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| page_param(href, base))
        .max()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_pdf_link(url: &Url) -> bool {
    url.path().to_ascii_lowercase().ends_with(".pdf")
}

fn enclosing_row_text(anchor: &ElementRef<'_>) -> Option<String> {
    anchor
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| {
            let element = el.value();
            ROW_ELEMENTS.contains(&element.name()) || element.classes().any(|c| c == ROW_CLASS)
        })
        .map(|row| collapse_whitespace(&row.text().collect::<Vec<_>>().join(" ")))
}

fn find_documents(document: &Html, base: &Url) -> Vec<RemoteDocumentRef> {
    let mut seen = HashSet::new();
    let mut refs = Vec::new();

    for anchor in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Ok(mut url) = base.join(href.trim()) else {
            trace!(href, "skipping unresolvable link");
            continue;
        };
        if !is_pdf_link(&url) {
            continue;
        }
        url.set_fragment(None);
        let source_url = url.to_string();
        if !seen.insert(source_url.clone()) {
            continue;
        }

        let link_text = collapse_whitespace(&anchor.text().collect::<String>());
        let title = if parse_date(&link_text).is_some() {
            link_text
        } else {
            enclosing_row_text(&anchor)
                .filter(|row| !row.is_empty())
                .unwrap_or(link_text)
        };

        let (published_date, session_period) = parse_title_and_url(&title, &source_url);

        refs.push(RemoteDocumentRef {
            source_url,
            title,
            published_date,
            session_period,
        });
    }

    refs
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::document::SessionPeriod;
    use chrono::NaiveDate;

    fn base() -> Url {
        Url::parse("https://parliament.example/hansard?page=0").unwrap()
    }

    #[test]
    fn test_parse_drupal_pager_last_link() {
        let html = r#"
            <ul class="pager">
              <li class="pager__item"><a href="?page=1">2</a></li>
              <li class="pager__item pager__item--last"><a href="/hansard?page=14">Last</a></li>
            </ul>"#;
        assert_eq!(parse_listing(html, &base()).last_page, Some(14));
    }

    #[test]
    fn test_parse_pager_falls_back_to_highest_page_link() {
        let html = r#"
            <nav class="pagination">
              <a href="?page=1">2</a><a href="?page=3">4</a><a href="?page=2">3</a>
            </nav>"#;
        assert_eq!(parse_listing(html, &base()).last_page, Some(3));
    }

    #[test]
    fn test_parse_without_pager_has_no_last_page() {
        assert_eq!(parse_listing("<p>nothing</p>", &base()).last_page, None);
    }

    #[test]
    fn test_parse_rows_resolves_links_and_titles() {
        let html = r#"
            <table>
              <tr><td>Afternoon Session - 4th December 2025</td>
                  <td><a href="/files/a.pdf">Download</a></td></tr>
              <tr><td><a href="https://cdn.example/b.PDF">Morning Sitting 3rd December 2025</a></td></tr>
              <tr><td><a href="/about">About</a></td></tr>
              <tr><td><a href="/files/a.pdf#page=2">Duplicate</a></td></tr>
            </table>"#;
        let parsed = parse_listing(html, &base());

        assert_eq!(parsed.refs.len(), 2);
        let first = &parsed.refs[0];
        assert_eq!(first.source_url, "https://parliament.example/files/a.pdf");
        assert_eq!(first.published_date, NaiveDate::from_ymd_opt(2025, 12, 4));
        assert_eq!(first.session_period, SessionPeriod::Afternoon);
        assert!(first.title.contains("Download"));

        let second = &parsed.refs[1];
        assert_eq!(second.source_url, "https://cdn.example/b.PDF");
        assert_eq!(second.title, "Morning Sitting 3rd December 2025");
        assert_eq!(second.session_period, SessionPeriod::Morning);
    }

    #[test]
    fn test_parse_views_row_without_date_keeps_undated_ref() {
        let html = r#"<div class="views-row"><span>Order Paper</span> <a href="/op.pdf">PDF</a></div>"#;
        let parsed = parse_listing(html, &base());

        assert_eq!(parsed.refs.len(), 1);
        assert_eq!(parsed.refs[0].title, "Order Paper PDF");
        assert_eq!(parsed.refs[0].published_date, None);
    }
}
