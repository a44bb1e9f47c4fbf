//! 24ur scraper.
//!
//! Scrapes the Slovenia section at <https://www.24ur.com/novice/slovenija>.
//! Every article under that section links with a relative
//! `/novice/slovenija/...` URL, which is what the indexer keys on.
//!
//! The caption under the headline reads `Ljubljana, 07. 05. 2025 15.27 | ...`
//! and sometimes carries only the date.

use super::{HtmlFetcher, SiteParser, clean_text, resolve_links, scrape_site};
use crate::error::FetchError;
use crate::models::NewsItem;
use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

const LISTING_URL: &str = "https://www.24ur.com/novice/slovenija";
const SECTION_PREFIX: &str = "/novice/slovenija/";

static LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href^='/novice/slovenija/']").unwrap());
static HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("div.contextual p").unwrap());
static SUMMARY: Lazy<Selector> = Lazy::new(|| Selector::parse("p.text-article-summary").unwrap());
static AUTHOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div.flex-col.justify-center div[class*='text-black/80']").unwrap()
});
static CAPTION: Lazy<Selector> = Lazy::new(|| Selector::parse(".leading-caption").unwrap());
static IMAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("figure img").unwrap());

/// Adapter for 24ur.com.
#[derive(Debug, Clone)]
pub struct Ur24Adapter {
    name: String,
    listing_url: Url,
    fetcher: HtmlFetcher,
}

impl Ur24Adapter {
    pub fn new(name: &str, fetcher: HtmlFetcher) -> Self {
        Self {
            name: name.to_string(),
            listing_url: Url::parse(LISTING_URL).expect("static listing URL"),
            fetcher,
        }
    }

    pub fn with_listing_url(mut self, listing_url: Url) -> Self {
        self.listing_url = listing_url;
        self
    }
}

#[async_trait]
impl super::SourceAdapter for Ur24Adapter {
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

/// Article links of the Slovenia section; the bare section link is skipped.
pub fn extract_links(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    resolve_links(
        document
            .select(&LINK)
            .filter_map(|a| a.value().attr("href"))
            .filter(|href| href.len() > SECTION_PREFIX.len()),
        base,
    )
}

pub fn parse_article(html: &str, url: &str, source_name: &str) -> Option<NewsItem> {
    let document = Html::parse_document(html);

    let heading = document
        .select(&HEADING)
        .next()
        .map(|h| clean_text(&h.text().collect::<String>()))
        .filter(|h| !h.is_empty())?;

    let mut content = document
        .select(&BODY)
        .map(|p| p.text().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n\n");
    if content.trim().is_empty() {
        content = document
            .select(&SUMMARY)
            .next()
            .map(|p| p.text().collect::<String>())
            .unwrap_or_default();
    }

    let author = document
        .select(&AUTHOR)
        .next()
        .map(|a| clean_text(&a.text().collect::<String>()))
        .filter(|a| !a.is_empty() && a != "icon-user");

    let published_at = document
        .select(&CAPTION)
        .next()
        .map(|c| c.text().collect::<String>())
        .and_then(|text| parse_caption(&text))
        .unwrap_or_else(|| Local::now().naive_local());

    let image_url = document
        .select(&IMAGE)
        .next()
        .and_then(|img| img.value().attr("src"))
        .and_then(|src| Url::parse(url).ok()?.join(src).ok())
        .map(|u| u.to_string());

    debug!(%url, bytes = content.len(), "Parsed 24ur article");
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

/// Parse `Ljubljana, 07. 05. 2025 15.27 | ...`; a date without time is midnight.
pub fn parse_caption(text: &str) -> Option<NaiveDateTime> {
    let before_pipe = text.split('|').next().unwrap_or_default();
    let part = clean_text(before_pipe.split(',').nth(1).unwrap_or(before_pipe));

    NaiveDateTime::parse_from_str(&part, "%d. %m. %Y %H.%M")
        .or_else(|_| NaiveDateTime::parse_from_str(&part, "%d. %m. %Y %H:%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(&part, "%d. %m. %Y")
                .ok()?
                .and_hms_opt(0, 0, 0)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <nav><a href="/novice/slovenija/">Slovenija</a></nav>
        <a href="/novice/slovenija/poplave-na-stajerskem-123">Poplave</a>
        <a href="/novice/svet/drugo-456">Svet</a>
        <a href="/novice/slovenija/nova-zeleznica-789">Železnica</a>
        <a href="/novice/slovenija/poplave-na-stajerskem-123">Dup</a>
    "#;

    const ARTICLE: &str = r#"
        <html><body>
          <h1> Poplave na Štajerskem </h1>
          <div class="flex-col justify-center"><div class="text-black/80 text-sm">Marko Kovač</div></div>
          <p class="leading-caption">Maribor, 07. 05. 2025 15.27 | Posodobljeno pred 5 min</p>
          <figure><img src="https://images.24ur.com/media/poplave.jpg"></figure>
          <p class="text-article-summary">Povzetek.</p>
          <div class="contextual">
            <p>Reka Drava je prestopila bregove.</p>
            <p>Gasilci so na terenu.</p>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_extract_links_skips_section_and_other_sections() {
        let base = Url::parse(LISTING_URL).unwrap();
        assert_eq!(
            extract_links(LISTING, &base),
            vec![
                "https://www.24ur.com/novice/slovenija/poplave-na-stajerskem-123",
                "https://www.24ur.com/novice/slovenija/nova-zeleznica-789",
            ]
        );
    }

    #[test]
    fn test_parse_article() {
        let url = "https://www.24ur.com/novice/slovenija/poplave-na-stajerskem-123";
        let item = parse_article(ARTICLE, url, "24ur").unwrap();

        assert_eq!(item.heading, "Poplave na Štajerskem");
        assert_eq!(item.content, "Reka Drava je prestopila bregove. Gasilci so na terenu.");
        assert_eq!(item.author.as_deref(), Some("Marko Kovač"));
        assert_eq!(
            item.image_url.as_deref(),
            Some("https://images.24ur.com/media/poplave.jpg")
        );
        assert_eq!(item.category, None);
        assert_eq!(
            item.published_at,
            NaiveDate::from_ymd_opt(2025, 5, 7)
                .unwrap()
                .and_hms_opt(15, 27, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_parse_article_summary_fallback() {
        let html = r#"<h1>Naslov</h1><p class="text-article-summary">Kratek povzetek.</p>"#;
        let item = parse_article(html, "https://www.24ur.com/novice/slovenija/x", "24ur").unwrap();
        assert_eq!(item.content, "Kratek povzetek.");
    }

    #[test]
    fn test_parse_article_ignores_icon_author() {
        let html = r#"<h1>Naslov</h1>
            <div class="flex-col justify-center"><div class="text-black/80">icon-user</div></div>"#;
        let item = parse_article(html, "https://www.24ur.com/novice/slovenija/x", "24ur").unwrap();
        assert_eq!(item.author, None);
    }

    #[test]
    fn test_parse_caption() {
        let midnight = NaiveDate::from_ymd_opt(2025, 5, 7)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_caption("Ljubljana, 07. 05. 2025 | 24ur"), Some(midnight));
        assert_eq!(
            parse_caption("Koper, 07. 05. 2025 09:41"),
            NaiveDate::from_ymd_opt(2025, 5, 7)
                .unwrap()
                .and_hms_opt(9, 41, 0)
        );
        assert_eq!(parse_caption("pred 5 minutami"), None);
    }
}
