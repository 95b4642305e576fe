// Paginated list fetching: page-by-page until an empty page, or a first-page request
// of the `rel="last"` link followed by one concurrent batch re-joined in page order.

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, ScanError};

use super::batch::BatchRequest;
use super::client::{GitHubClient, with_page};

/// Largest `rel="last"` page number taken at face value. Anything above is
/// treated as malformed pagination metadata.
pub const MAX_PAGES: u32 = 1_000;

/// Parse the last page number out of a GitHub `Link` header.
///
/// Headers look like:
/// `<https://api.github.com/organizations/123/repos?page=2>; rel="next", <...&page=3>; rel="last"`
pub fn parse_last_page(link_header: &str) -> Option<u32> {
    for part in link_header.split(',') {
        let mut url = None;
        let mut rel = None;

        for segment in part.split(';') {
            let segment = segment.trim();
            if segment.starts_with('<') && segment.ends_with('>') {
                url = Some(&segment[1..segment.len() - 1]);
            } else if let Some(rel_value) = segment.strip_prefix("rel=") {
                rel = Some(rel_value.trim_matches('"'));
            }
        }

        if let (Some(url), Some("last")) = (url, rel) {
            return page_param(url);
        }
    }

    None
}

fn page_param(url: &str) -> Option<u32> {
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .find_map(|param| param.strip_prefix("page="))
        .and_then(|value| value.parse().ok())
}

fn into_items(value: Value, url: &str) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(ScanError::UnexpectedShape {
            url: url.to_string(),
            expected: "a JSON array page",
        }),
    }
}

impl GitHubClient {
    /// Fetch every page of a list endpoint, one page at a time, stopping at the
    /// first empty page. Items keep server order.
    #[instrument(skip(self))]
    pub async fn fetch_all_pages(&self, locator: &str) -> Result<Vec<Value>> {
        let url = self.resolve_url(locator);
        let mut items = Vec::new();
        let mut page = 1u32;

        loop {
            let page_url = if page == 1 {
                url.clone()
            } else {
                with_page(&url, page)
            };
            let page_items = into_items(self.fetch_json(&page_url).await?, &page_url)?;
            debug!(page, count = page_items.len(), "fetched page");

            if page_items.is_empty() {
                break;
            }
            items.extend(page_items);
            page += 1;
        }

        info!(total = items.len(), pages = page - 1, "fetched all pages");
        Ok(items)
    }

    /// Fetch every page of a list endpoint, discovering the page count from the
    /// first response and fetching the rest concurrently.
    ///
    /// Without a usable `rel="last"` link, or with one beyond `MAX_PAGES`, only
    /// page 1 is returned.
    #[instrument(skip(self))]
    pub async fn fetch_all_pages_parallel(&self, locator: &str) -> Result<Vec<Value>> {
        let url = self.resolve_url(locator);
        let first = self.get(&url).await?;
        let last_page = first.header("link").and_then(parse_last_page);
        let mut items = into_items(serde_json::from_slice(&first.body)?, &url)?;

        let Some(last_page) = last_page else {
            warn!(%url, "no rel=\"last\" pagination link, using first page only");
            return Ok(items);
        };
        if last_page > MAX_PAGES {
            warn!(%url, last_page, "implausible rel=\"last\" page, using first page only");
            return Ok(items);
        }
        debug!(last_page, "discovered page count");

        let requests = (2..=last_page)
            .map(|page| BatchRequest::new(page.to_string(), with_page(&url, page)))
            .collect();
        let mut pages = self.fetch_many(requests).await?;

        for page in 2..=last_page {
            let response = pages
                .remove(&page.to_string())
                .ok_or_else(|| ScanError::Transport(format!("page {page} missing from batch")))?;
            items.extend(into_items(response.body, &response.locator)?);
        }

        info!(total = items.len(), pages = last_page, "fetched all pages");
        Ok(items)
    }
}
