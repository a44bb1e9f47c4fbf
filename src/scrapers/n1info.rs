//! N1 Slovenija scraper.
//!
//! Scrapes the news listing at <https://n1info.si/novice/>. Article pages
//! carry `data-testid` attributes, which are steadier than the class names.
//!
//! # Date Format
//!
//! The published-time block reads like `Novice, 7. maj 2025. 15:27 | N1`:
//! the part between the first comma and the pipe is a day, a Slovene month
//! name, a year and a time.

use super::{HtmlFetcher, SiteParser, clean_text, resolve_links, scrape_site};
use crate::error::FetchError;
use crate::models::NewsItem;
use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

const LISTING_URL: &str = "https://n1info.si/novice/";

static LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h3[data-testid='article-title'] a[href]").unwrap());
static HEADING: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1[data-testid='article-main-title']").unwrap());
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("div.rich-text-block p").unwrap());
static LEAD: Lazy<Selector> =
    Lazy::new(|| Selector::parse("article p[data-testid='article-lead-text']").unwrap());
static AUTHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("span.author-name").unwrap());
static PUBLISHED: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div[data-testid='article-published-time']").unwrap());
static IMAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("figure img").unwrap());

static DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2})\.\s*(\p{L}+)\.?\s*(\d{4})\.?\s*(\d{1,2})[:.](\d{2})").unwrap()
});

/// Adapter for n1info.si.
#[derive(Debug, Clone)]
pub struct N1infoAdapter {
    name: String,
    listing_url: Url,
    fetcher: HtmlFetcher,
}

impl N1infoAdapter {
    pub fn new(name: &str, fetcher: HtmlFetcher) -> Self {
        Self {
            name: name.to_string(),
            listing_url: Url::parse(LISTING_URL).expect("static listing URL"),
            fetcher,
        }
    }

    /// Point the adapter at a different listing page (mirrors, fixtures).
    pub fn with_listing_url(mut self, listing_url: Url) -> Self {
        self.listing_url = listing_url;
        self
    }
}

#[async_trait]
impl super::SourceAdapter for N1infoAdapter {
    fn source_name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<NewsItem>, FetchError> {
        let parser = SiteParser {
            extract_links,
            parse_article,
        };
        scrape_site(&self.fetcher, &self.name, &self.listing_url, &parser).await
    }
}

/// Article links on the listing page.
pub fn extract_links(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    resolve_links(
        document
            .select(&LINK)
            .filter_map(|a| a.value().attr("href")),
        base,
    )
}

/// Parse one article page; `None` when it has no heading.
pub fn parse_article(html: &str, url: &str, source_name: &str) -> Option<NewsItem> {
    let document = Html::parse_document(html);
    let base = Url::parse(url).ok();

    let heading = document
        .select(&HEADING)
        .next()
        .map(|h| clean_text(&h.text().collect::<String>()))
        .filter(|h| !h.is_empty())?;

    let mut content = document
        .select(&BODY)
        .map(|p| p.text().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n");
    if content.trim().is_empty() {
        content = document
            .select(&LEAD)
            .next()
            .map(|p| p.text().collect::<String>())
            .unwrap_or_default();
    }

    let author = document
        .select(&AUTHOR)
        .next()
        .map(|a| clean_text(&a.text().collect::<String>()))
        .filter(|a| !a.is_empty());

    let published_at = document
        .select(&PUBLISHED)
        .next()
        .map(|d| d.text().collect::<String>())
        .and_then(|text| parse_published(&text))
        .unwrap_or_else(|| Local::now().naive_local());

    let image_url = document.select(&IMAGE).next().and_then(|img| {
        let el = img.value();
        let src = el
            .attr("data-src")
            .filter(|s| !s.trim().is_empty())
            .or_else(|| el.attr("src"))?;
        match &base {
            Some(base) => base.join(src).ok().map(|u| u.to_string()),
            None => Some(src.to_string()),
        }
    });

    debug!(%url, bytes = content.len(), "Parsed n1info article");
    Some(NewsItem {
        heading,
        content: clean_text(&content),
        author,
        published_at,
        source: source_name.to_string(),
        category: None,
        location: None,
        url: url.to_string(),
        image_url,
        tags: Vec::new(),
    })
}

/// Parse the published-time block, e.g. `Novice, 7. maj 2025. 15:27 | N1`.
pub fn parse_published(text: &str) -> Option<NaiveDateTime> {
    let before_pipe = text.split('|').next().unwrap_or_default();
    let part = before_pipe
        .split(',')
        .nth(1)
        .unwrap_or(before_pipe)
        .trim();
    let caps = DATE.captures(part)?;

    let day: u32 = caps[1].parse().ok()?;
    let month = slovene_month(&caps[2])?;
    let year: i32 = caps[3].parse().ok()?;
    let hour: u32 = caps[4].parse().ok()?;
    let minute: u32 = caps[5].parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)
}

fn slovene_month(name: &str) -> Option<u32> {
    let prefix: String = name.to_lowercase().chars().take(3).collect();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "maj" => 5,
        "jun" => 6,
        "jul" => 7,
        "avg" => 8,
        "sep" => 9,
        "okt" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}
