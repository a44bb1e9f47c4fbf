//! News source adapters.
//!
//! Every source implements [`SourceAdapter`]. The shipped adapters scrape
//! HTML in two phases:
//!
//! 1. **Indexing**: collect article links from the source's listing page
//! 2. **Fetching**: download and parse each article page
//!
//! # Supported Sources
//!
//! | Source | Module | Listing page |
//! |--------|--------|--------------|
//! | N1 Slovenija | [`n1info`] | `https://n1info.si/novice/` |
//! | 24ur | [`ur24`] | `https://www.24ur.com/novice/slovenija` |
//!
//! A listing page that cannot be fetched fails the whole adapter with a
//! [`FetchError`]. A single article that cannot be fetched or parsed is
//! logged and skipped.
//!
//! Parsing lives in plain synchronous functions (`extract_links`,
//! `parse_article`) so that `scraper::Html`, which is not `Send`, never
//! lives across an `.await`.

pub mod n1info;
pub mod ur24;

use crate::config::{SourceConfig, SourceKind};
use crate::error::{FetchCause, FetchError};
use crate::models::NewsItem;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// A source of raw news items.
///
/// Implementations keep no state that is shared with other adapters and have
/// no side effects beyond the returned items.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable identifier, stamped on items and errors.
    fn source_name(&self) -> &str;

    /// Fetch and parse the current articles.
    async fn fetch(&self) -> Result<Vec<NewsItem>, FetchError>;
}

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const ARTICLE_CONCURRENCY: usize = 4;

/// HTTP client shared by the HTML adapters.
#[derive(Debug, Clone)]
pub struct HtmlFetcher {
    client: Client,
}

impl HtmlFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    /// GET `url` and return the body, treating non-2xx as an error.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_text(&self, url: &str) -> Result<String, FetchCause> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchCause::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }
}

/// Site-specific parsing plugged into [`scrape_site`].
pub(crate) struct SiteParser {
    pub extract_links: fn(&str, &Url) -> Vec<String>,
    pub parse_article: fn(&str, &str, &str) -> Option<NewsItem>,
}

/// Index `listing_url`, then fetch every linked article with bounded concurrency.
#[instrument(level = "info", skip_all, fields(source = %source_name, listing = %listing_url))]
pub(crate) async fn scrape_site(
    fetcher: &HtmlFetcher,
    source_name: &str,
    listing_url: &Url,
    parser: &SiteParser,
) -> Result<Vec<NewsItem>, FetchError> {
    let listing = fetcher
        .get_text(listing_url.as_str())
        .await
        .map_err(|cause| FetchError::new(source_name, cause))?;
    let links = (parser.extract_links)(&listing, listing_url);
    info!(count = links.len(), "Indexed article URLs");
    debug!(urls = ?links, "Article URLs");

    let parse_article = parser.parse_article;
    let items: Vec<NewsItem> = stream::iter(links)
        .map(|url| fetch_article(fetcher.clone(), url, source_name.to_string(), parse_article))
        .buffered(ARTICLE_CONCURRENCY)
        .filter_map(std::future::ready)
        .collect()
        .await;

    info!(count = items.len(), "Fetched article contents");
    Ok(items)
}

async fn fetch_article(
    fetcher: HtmlFetcher,
    url: String,
    source_name: String,
    parse_article: fn(&str, &str, &str) -> Option<NewsItem>,
) -> Option<NewsItem> {
    match fetcher.get_text(&url).await {
        Ok(body) => {
            let item = parse_article(&body, &url, &source_name);
            if item.is_none() {
                warn!(%url, "Article page had no heading; skipping");
            }
            item
        }
        Err(e) => {
            warn!(error = %e, %url, "Article fetch failed; skipping");
            None
        }
    }
}

/// Resolve every `href` against `base`, drop duplicates, keep first-seen order.
pub(crate) fn resolve_links<'a>(hrefs: impl Iterator<Item = &'a str>, base: &Url) -> Vec<String> {
    hrefs
        .filter_map(|href| base.join(href).ok())
        .map(|mut url| {
            url.set_fragment(None);
            url.to_string()
        })
        .unique()
        .collect()
}

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collapse all whitespace runs to single spaces and trim.
pub fn clean_text(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Build one adapter per configured source.
pub fn build_adapters(
    sources: &[SourceConfig],
    fetcher: &HtmlFetcher,
) -> Vec<Arc<dyn SourceAdapter>> {
    sources
        .iter()
        .map(|source| -> Arc<dyn SourceAdapter> {
            match source.kind {
                SourceKind::N1info => {
                    Arc::new(n1info::N1infoAdapter::new(&source.name, fetcher.clone()))
                }
                SourceKind::Ur24 => Arc::new(ur24::Ur24Adapter::new(&source.name, fetcher.clone())),
            }
        })
        .collect()
}
