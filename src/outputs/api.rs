//! HTTP sink for the news backend, with exponential backoff.
//!
//! Each item is POSTed as JSON to `{base_url}/api/news`. The payload carries
//! the backend's field names (`title` for the heading, a 200-character
//! `summary` cut from the content, camelCase dates and image URL).
//!
//! # Retry Strategy
//!
//! Only transient failures are retried (connect errors, timeouts, 5xx and
//! 429; see [`SinkError::is_retryable`]):
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..=max_jitter)
//! ```
//! A 4xx other than 429 fails the item immediately and the batch moves on.
//! An item that exhausts its retries aborts the batch: the backend is taken
//! to be down and the remaining items are skipped.

use super::Sink;
use crate::error::SinkError;
use crate::models::NewsItem;
use crate::utils::truncate_for_log;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use rand::{Rng, rng};
use reqwest::Client;
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

const SUMMARY_CHARS: usize = 200;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// How often and how patiently a failed POST is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts before giving up.
    pub max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    pub base_delay: Duration,
    /// Cap on the exponential part of the delay.
    pub max_delay: Duration,
    /// Upper bound of the random jitter added to every delay.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: usize) -> Duration {
        let shift = attempt.saturating_sub(1).min(31) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=self.max_jitter.as_millis() as u64);
        delay + Duration::from_millis(jitter_ms)
    }
}

/// JSON body accepted by `POST /api/news`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewsPayload<'a> {
    title: &'a str,
    summary: String,
    content: &'a str,
    author: Option<&'a str>,
    source: &'a str,
    url: &'a str,
    published_at: NaiveDateTime,
    image_url: Option<&'a str>,
    category: Option<&'a str>,
    location: Option<&'a str>,
    tags: &'a [String],
}

impl<'a> From<&'a NewsItem> for NewsPayload<'a> {
    fn from(item: &'a NewsItem) -> Self {
        Self {
            title: &item.heading,
            summary: item.content.chars().take(SUMMARY_CHARS).collect(),
            content: &item.content,
            author: item.author.as_deref(),
            source: &item.source,
            url: &item.url,
            published_at: item.published_at,
            image_url: item.image_url.as_deref(),
            category: item.category.as_deref(),
            location: item.location.as_deref(),
            tags: &item.tags,
        }
    }
}

/// Posts every item of a batch to the news backend.
#[derive(Debug, Clone)]
pub struct ApiSink {
    client: Client,
    endpoint: String,
    retry: RetryPolicy,
}

impl ApiSink {
    pub fn new(base_url: &str) -> Result<Self, SinkError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/news", base_url.trim_end_matches('/')),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// One POST, no retries.
    async fn post_once(&self, item: &NewsItem) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&NewsPayload::from(item))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SinkError::Status {
                status: status.as_u16(),
                body: truncate_for_log(&body, 200),
            });
        }
        let id = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("_id").and_then(|id| id.as_str()).map(str::to_string));
        debug!(url = %item.url, id = id.as_deref().unwrap_or("-"), "Backend stored item");
        Ok(())
    }

    /// POST `item`, backing off between transient failures.
    #[instrument(level = "debug", skip_all, fields(url = %item.url))]
    pub async fn send(&self, item: &NewsItem) -> Result<(), SinkError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.post_once(item).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if !e.is_retryable() || attempt > self.retry.max_retries {
                        error!(
                            attempt,
                            max = self.retry.max_retries,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "POST failed; giving up"
                        );
                        return Err(e);
                    }

                    let delay = self.retry.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.retry.max_retries,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "POST failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl Sink for ApiSink {
    fn name(&self) -> &str {
        "api"
    }

    #[instrument(level = "info", skip_all, fields(endpoint = %self.endpoint, count = batch.len()))]
    async fn accept(&self, batch: Vec<NewsItem>) -> Result<(), SinkError> {
        let mut sent = 0usize;
        let mut first_error = None;
        for (idx, item) in batch.iter().enumerate() {
            match self.send(item).await {
                Ok(()) => sent += 1,
                Err(e) if e.is_retryable() => {
                    let skipped = batch.len() - idx - 1;
                    warn!(sent, skipped, error = %e, "Backend unavailable; abandoning batch");
                    return Err(e);
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        info!(sent, failed = batch.len() - sent, "Posted batch to backend");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            max_jitter: Duration::ZERO,
        }
    }

    fn item() -> NewsItem {
        let ts = NaiveDate::from_ymd_opt(2025, 5, 7)
            .unwrap()
            .and_hms_opt(15, 27, 0)
            .unwrap();
        let mut item = NewsItem::raw(
            "24ur",
            "https://www.24ur.com/novice/slovenija/poplave-123",
            "Poplave na Štajerskem",
            "č".repeat(250),
            ts,
        );
        item.category = Some("weather".into());
        item.location = Some("Maribor".into());
        item.tags = vec!["poplave".into(), "drava".into()];
        item
    }

    #[test]
    fn test_payload_fields() {
        let item = item();
        let value = serde_json::to_value(NewsPayload::from(&item)).unwrap();

        assert_eq!(value["title"], "Poplave na Štajerskem");
        assert_eq!(value["summary"].as_str().unwrap().chars().count(), 200);
        assert_eq!(value["content"].as_str().unwrap().chars().count(), 250);
        assert_eq!(value["publishedAt"], "2025-05-07T15:27:00");
        assert_eq!(value["imageUrl"], serde_json::Value::Null);
        assert_eq!(value["location"], "Maribor");
        assert_eq!(value["tags"], json!(["poplave", "drava"]));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = fast_retry();
        assert_eq!(policy.backoff(1), Duration::from_millis(5));
        assert_eq!(policy.backoff(2), Duration::from_millis(10));
        assert_eq!(policy.backoff(10), Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_posts_each_item() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/news"))
            .and(body_partial_json(json!({ "source": "24ur", "category": "weather" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "_id": "abc123" })))
            .expect(2)
            .mount(&server)
            .await;

        let sink = ApiSink::new(&format!("{}/", server.uri()))
            .unwrap()
            .with_retry(fast_retry());
        assert!(sink.endpoint().ends_with("/api/news"));
        sink.accept(vec![item(), item()]).await.unwrap();
    }

    #[tokio::test]
    async fn test_retries_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/news"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/news"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let sink = ApiSink::new(&server.uri()).unwrap().with_retry(fast_retry());
        sink.send(&item()).await.unwrap();
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/news"))
            .respond_with(ResponseTemplate::new(400).set_body_string("missing title"))
            .expect(1)
            .mount(&server)
            .await;

        let sink = ApiSink::new(&server.uri()).unwrap().with_retry(fast_retry());
        let err = sink.send(&item()).await.unwrap_err();
        assert!(matches!(err, SinkError::Status { status: 400, ref body } if body == "missing title"));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/news"))
            .respond_with(ResponseTemplate::new(500))
            .expect(4)
            .mount(&server)
            .await;

        let sink = ApiSink::new(&server.uri()).unwrap().with_retry(fast_retry());
        let result = sink.accept(vec![item()]).await;
        assert!(matches!(result, Err(SinkError::Status { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_unavailable_backend_abandons_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/news"))
            .respond_with(ResponseTemplate::new(503))
            .expect(4)
            .mount(&server)
            .await;

        let sink = ApiSink::new(&server.uri()).unwrap().with_retry(fast_retry());
        let batch: Vec<NewsItem> = (0..5).map(|_| item()).collect();
        let result = sink.accept(batch).await;
        assert!(matches!(result, Err(SinkError::Status { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_rejected_item_does_not_stop_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/news"))
            .respond_with(ResponseTemplate::new(400).set_body_string("duplicate url"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/news"))
            .respond_with(ResponseTemplate::new(201))
            .expect(2)
            .mount(&server)
            .await;

        let sink = ApiSink::new(&server.uri()).unwrap().with_retry(fast_retry());
        let result = sink.accept(vec![item(), item(), item()]).await;
        assert!(matches!(result, Err(SinkError::Status { status: 400, .. })));
    }
}
