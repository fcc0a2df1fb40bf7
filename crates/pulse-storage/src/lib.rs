//! Persisted event store boundary + shared HTTP page fetcher.
//!
//! The store trait is the only shared mutable resource in the engine; writes
//! are scoped to a single record per call and the unique index on
//! `(source_name, source_external_id)` is the concurrency-safety boundary for
//! concurrent first-sightings.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_core::{Category, EventStatus, PersistedEvent};
use reqwest::StatusCode;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info_span;
use uuid::Uuid;

pub const CRATE_NAME: &str = "pulse-storage";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("event {0} not found")]
    NotFound(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored record is malformed: {0}")]
    Malformed(String),
}

/// Store contract consumed by the synchronizer and orchestrator.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Primary existing-event lookup, by source URL.
    async fn find_by_url(&self, url: &str) -> Result<Option<PersistedEvent>, StoreError>;

    async fn find_by_key(
        &self,
        source_name: &str,
        external_id: &str,
    ) -> Result<Option<PersistedEvent>, StoreError>;

    /// Insert a first-sighting record keyed by `(source_name, external_id)`.
    /// If the key already exists the stored record's content and scrape
    /// metadata are replaced while its identity, change log, import marker,
    /// and engagement counters survive.
    async fn upsert_new(&self, event: PersistedEvent) -> Result<PersistedEvent, StoreError>;

    /// Events whose start date falls inside the window and whose city
    /// matches, in deterministic document order (first_scraped, then id).
    async fn find_fuzzy_candidates(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        city: &str,
    ) -> Result<Vec<PersistedEvent>, StoreError>;

    /// Full-record write for an already-resolved event.
    async fn save(&self, event: &PersistedEvent) -> Result<(), StoreError>;

    /// Bulk-transition every non-inactive event of `source_name` whose URL is
    /// absent from `seen_urls` to inactive, refreshing `last_scraped`.
    /// Idempotent for a fixed seen set.
    async fn mark_inactive_except(
        &self,
        source_name: &str,
        seen_urls: &[String],
    ) -> Result<u64, StoreError>;

    /// Delete inactive, non-imported events whose start date is before the
    /// cutoff. Returns the number of deleted records.
    async fn delete_retired(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// In-memory store for tests and single-process deployments. Records keep
/// insertion order, which doubles as the fuzzy-candidate document order.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    events: Arc<RwLock<Vec<PersistedEvent>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }

    pub async fn all(&self) -> Vec<PersistedEvent> {
        self.events.read().await.clone()
    }

    /// Test/dashboard-side hook: overwrite a record in place, e.g. to set the
    /// imported marker the way the external dashboard would.
    pub async fn replace(&self, event: PersistedEvent) {
        let mut events = self.events.write().await;
        match events.iter_mut().find(|e| e.id == event.id) {
            Some(slot) => *slot = event,
            None => events.push(event),
        }
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn find_by_url(&self, url: &str) -> Result<Option<PersistedEvent>, StoreError> {
        let events = self.events.read().await;
        Ok(events.iter().find(|e| e.source.url == url).cloned())
    }

    async fn find_by_key(
        &self,
        source_name: &str,
        external_id: &str,
    ) -> Result<Option<PersistedEvent>, StoreError> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .find(|e| e.source.name == source_name && e.source.external_id == external_id)
            .cloned())
    }

    async fn upsert_new(&self, event: PersistedEvent) -> Result<PersistedEvent, StoreError> {
        let mut events = self.events.write().await;
        if let Some(existing) = events.iter_mut().find(|e| {
            e.source.name == event.source.name && e.source.external_id == event.source.external_id
        }) {
            let incoming = event;
            existing.apply_content_from(&incoming);
            return Ok(existing.clone());
        }
        events.push(event.clone());
        Ok(event)
    }

    async fn find_fuzzy_candidates(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        city: &str,
    ) -> Result<Vec<PersistedEvent>, StoreError> {
        let events = self.events.read().await;
        let mut matches: Vec<PersistedEvent> = events
            .iter()
            .filter(|e| {
                e.start_date >= window_start && e.start_date <= window_end && e.venue.city == city
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            a.first_scraped
                .cmp(&b.first_scraped)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(matches)
    }

    async fn save(&self, event: &PersistedEvent) -> Result<(), StoreError> {
        let mut events = self.events.write().await;
        match events.iter_mut().find(|e| e.id == event.id) {
            Some(slot) => {
                *slot = event.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(event.id)),
        }
    }

    async fn mark_inactive_except(
        &self,
        source_name: &str,
        seen_urls: &[String],
    ) -> Result<u64, StoreError> {
        let seen: HashSet<&str> = seen_urls.iter().map(String::as_str).collect();
        let now = Utc::now();
        let mut events = self.events.write().await;
        let mut transitioned = 0u64;
        for event in events.iter_mut() {
            if event.source.name == source_name
                && event.status != EventStatus::Inactive
                && !seen.contains(event.source.url.as_str())
            {
                event.status = EventStatus::Inactive;
                event.last_scraped = now;
                transitioned += 1;
            }
        }
        Ok(transitioned)
    }

    async fn delete_retired(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut events = self.events.write().await;
        let before = events.len();
        events.retain(|e| {
            !(e.start_date < cutoff && e.status == EventStatus::Inactive && !e.imported.status)
        });
        Ok((before - events.len()) as u64)
    }
}

trait UpsertMerge {
    fn apply_content_from(&mut self, incoming: &PersistedEvent);
}

impl UpsertMerge for PersistedEvent {
    /// Mirror of the Postgres `ON CONFLICT ... DO UPDATE` column list.
    fn apply_content_from(&mut self, incoming: &PersistedEvent) {
        self.title = incoming.title.clone();
        self.description = incoming.description.clone();
        self.start_date = incoming.start_date;
        self.end_date = incoming.end_date;
        self.venue = incoming.venue.clone();
        self.category = incoming.category;
        self.tags = incoming.tags.clone();
        self.image_url = incoming.image_url.clone();
        self.price = incoming.price.clone();
        self.source = incoming.source.clone();
        self.status = incoming.status;
        self.content_hash = incoming.content_hash.clone();
        self.first_scraped = incoming.first_scraped;
        self.last_scraped = incoming.last_scraped;
        self.scraped_count = incoming.scraped_count;
    }
}

/// Postgres-backed store. Sub-documents (venue, price, change log, import
/// marker) live in JSONB columns; the unique index on the source key pair
/// enforces the single-record guarantee for concurrent first-sightings.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    id UUID PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    start_date TIMESTAMPTZ NOT NULL,
    end_date TIMESTAMPTZ,
    venue JSONB NOT NULL,
    category TEXT NOT NULL,
    tags JSONB NOT NULL DEFAULT '[]',
    image_url TEXT NOT NULL DEFAULT '',
    price JSONB NOT NULL,
    source_name TEXT NOT NULL,
    source_url TEXT NOT NULL,
    source_external_id TEXT NOT NULL,
    status TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    change_log JSONB NOT NULL DEFAULT '[]',
    first_scraped TIMESTAMPTZ NOT NULL,
    last_scraped TIMESTAMPTZ NOT NULL,
    scraped_count BIGINT NOT NULL DEFAULT 1,
    imported JSONB NOT NULL DEFAULT '{"status": false}',
    click_count BIGINT NOT NULL DEFAULT 0,
    email_capture_count BIGINT NOT NULL DEFAULT 0
);
CREATE UNIQUE INDEX IF NOT EXISTS events_source_key ON events (source_name, source_external_id);
CREATE INDEX IF NOT EXISTS events_source_url ON events (source_url);
CREATE INDEX IF NOT EXISTS events_start_city ON events (start_date, (venue->>'city'));
CREATE INDEX IF NOT EXISTS events_status_start ON events (status, start_date);
"#;

const EVENT_COLUMNS: &str = "id, title, description, start_date, end_date, venue, category, tags, \
     image_url, price, source_name, source_url, source_external_id, status, content_hash, \
     change_log, first_scraped, last_scraped, scraped_count, imported, click_count, \
     email_capture_count";

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for statement in SCHEMA_SQL.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

fn row_to_event(row: &PgRow) -> Result<PersistedEvent, StoreError> {
    let category_raw: String = row.try_get("category")?;
    let category = Category::parse(&category_raw)
        .ok_or_else(|| StoreError::Malformed(format!("unknown category {category_raw:?}")))?;
    let status_raw: String = row.try_get("status")?;
    let status = EventStatus::parse(&status_raw)
        .ok_or_else(|| StoreError::Malformed(format!("unknown status {status_raw:?}")))?;
    let scraped_count: i64 = row.try_get("scraped_count")?;
    let click_count: i64 = row.try_get("click_count")?;
    let email_capture_count: i64 = row.try_get("email_capture_count")?;

    Ok(PersistedEvent {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        venue: row.try_get::<Json<_>, _>("venue")?.0,
        category,
        tags: row.try_get::<Json<_>, _>("tags")?.0,
        image_url: row.try_get("image_url")?,
        price: row.try_get::<Json<_>, _>("price")?.0,
        source: pulse_core::EventSource {
            name: row.try_get("source_name")?,
            url: row.try_get("source_url")?,
            external_id: row.try_get("source_external_id")?,
        },
        status,
        content_hash: row.try_get("content_hash")?,
        change_log: row.try_get::<Json<_>, _>("change_log")?.0,
        first_scraped: row.try_get("first_scraped")?,
        last_scraped: row.try_get("last_scraped")?,
        scraped_count: scraped_count.max(0) as u64,
        imported: row.try_get::<Json<_>, _>("imported")?.0,
        click_count: click_count.max(0) as u64,
        email_capture_count: email_capture_count.max(0) as u64,
    })
}

#[async_trait]
impl EventStore for PgStore {
    async fn find_by_url(&self, url: &str) -> Result<Option<PersistedEvent>, StoreError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE source_url = $1 LIMIT 1");
        let row = sqlx::query(&sql).bind(url).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_event).transpose()
    }

    async fn find_by_key(
        &self,
        source_name: &str,
        external_id: &str,
    ) -> Result<Option<PersistedEvent>, StoreError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events \
             WHERE source_name = $1 AND source_external_id = $2 LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(source_name)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_event).transpose()
    }

    async fn upsert_new(&self, event: PersistedEvent) -> Result<PersistedEvent, StoreError> {
        let sql = format!(
            "INSERT INTO events ({EVENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
                     $17, $18, $19, $20, $21, $22) \
             ON CONFLICT (source_name, source_external_id) DO UPDATE SET \
                 title = EXCLUDED.title, \
                 description = EXCLUDED.description, \
                 start_date = EXCLUDED.start_date, \
                 end_date = EXCLUDED.end_date, \
                 venue = EXCLUDED.venue, \
                 category = EXCLUDED.category, \
                 tags = EXCLUDED.tags, \
                 image_url = EXCLUDED.image_url, \
                 price = EXCLUDED.price, \
                 source_url = EXCLUDED.source_url, \
                 status = EXCLUDED.status, \
                 content_hash = EXCLUDED.content_hash, \
                 first_scraped = EXCLUDED.first_scraped, \
                 last_scraped = EXCLUDED.last_scraped, \
                 scraped_count = EXCLUDED.scraped_count \
             RETURNING {EVENT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(event.id)
            .bind(&event.title)
            .bind(&event.description)
            .bind(event.start_date)
            .bind(event.end_date)
            .bind(Json(&event.venue))
            .bind(event.category.as_str())
            .bind(Json(&event.tags))
            .bind(&event.image_url)
            .bind(Json(&event.price))
            .bind(&event.source.name)
            .bind(&event.source.url)
            .bind(&event.source.external_id)
            .bind(event.status.as_str())
            .bind(&event.content_hash)
            .bind(Json(&event.change_log))
            .bind(event.first_scraped)
            .bind(event.last_scraped)
            .bind(event.scraped_count as i64)
            .bind(Json(&event.imported))
            .bind(event.click_count as i64)
            .bind(event.email_capture_count as i64)
            .fetch_one(&self.pool)
            .await?;
        row_to_event(&row)
    }

    async fn find_fuzzy_candidates(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        city: &str,
    ) -> Result<Vec<PersistedEvent>, StoreError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events \
             WHERE start_date >= $1 AND start_date <= $2 AND venue->>'city' = $3 \
             ORDER BY first_scraped, id"
        );
        let rows = sqlx::query(&sql)
            .bind(window_start)
            .bind(window_end)
            .bind(city)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_event).collect()
    }

    async fn save(&self, event: &PersistedEvent) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE events SET \
                 title = $2, description = $3, start_date = $4, end_date = $5, venue = $6, \
                 category = $7, tags = $8, image_url = $9, price = $10, source_name = $11, \
                 source_url = $12, source_external_id = $13, status = $14, content_hash = $15, \
                 change_log = $16, first_scraped = $17, last_scraped = $18, scraped_count = $19, \
                 imported = $20, click_count = $21, email_capture_count = $22 \
             WHERE id = $1",
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(Json(&event.venue))
        .bind(event.category.as_str())
        .bind(Json(&event.tags))
        .bind(&event.image_url)
        .bind(Json(&event.price))
        .bind(&event.source.name)
        .bind(&event.source.url)
        .bind(&event.source.external_id)
        .bind(event.status.as_str())
        .bind(&event.content_hash)
        .bind(Json(&event.change_log))
        .bind(event.first_scraped)
        .bind(event.last_scraped)
        .bind(event.scraped_count as i64)
        .bind(Json(&event.imported))
        .bind(event.click_count as i64)
        .bind(event.email_capture_count as i64)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(event.id));
        }
        Ok(())
    }

    async fn mark_inactive_except(
        &self,
        source_name: &str,
        seen_urls: &[String],
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE events SET status = 'inactive', last_scraped = NOW() \
             WHERE source_name = $1 AND status <> 'inactive' \
               AND NOT (source_url = ANY($2))",
        )
        .bind(source_name)
        .bind(seen_urls)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_retired(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "DELETE FROM events \
             WHERE start_date < $1 AND status = 'inactive' \
               AND COALESCE((imported->>'status')::boolean, false) = false",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retryable,
    NonRetryable,
}

pub fn classify_status(status: StatusCode) -> RetryDisposition {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        RetryDisposition::Retryable
    } else {
        RetryDisposition::NonRetryable
    }
}

pub fn classify_reqwest_error(err: &reqwest::Error) -> RetryDisposition {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        RetryDisposition::Retryable
    } else {
        RetryDisposition::NonRetryable
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl BackoffPolicy {
    pub fn delay_for_attempt(&self, attempt_index: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt_index as u32).unwrap_or(u32::MAX);
        let delay = self.base_delay.saturating_mul(factor);
        delay.min(self.max_delay)
    }
}

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub backoff: BackoffPolicy,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: "pulse-bot/0.1".to_string(),
            backoff: BackoffPolicy::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed after retries: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
}

/// Page fetcher shared by the adapters. Adapters run strictly sequentially
/// inside one orchestrator pass, so there is no concurrency limiting here;
/// the fetcher owns the per-request timeout and retry/backoff policy.
#[derive(Debug)]
pub struct PageFetcher {
    client: reqwest::Client,
    backoff: BackoffPolicy,
}

impl PageFetcher {
    pub fn new(config: FetcherConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()?;
        Ok(Self {
            client,
            backoff: config.backoff,
        })
    }

    pub async fn fetch_text(&self, source_name: &str, url: &str) -> Result<String, FetchError> {
        let span = info_span!("page_fetch", source_name, url);
        let _guard = span.enter();

        let mut last_request_error: Option<reqwest::Error> = None;

        for attempt in 0..=self.backoff.max_retries {
            match self.client.get(url).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    let final_url = resp.url().to_string();

                    if status.is_success() {
                        return Ok(resp.text().await?);
                    }

                    if classify_status(status) == RetryDisposition::Retryable
                        && attempt < self.backoff.max_retries
                    {
                        tokio::time::sleep(self.backoff.delay_for_attempt(attempt)).await;
                        continue;
                    }

                    return Err(FetchError::HttpStatus {
                        status: status.as_u16(),
                        url: final_url,
                    });
                }
                Err(err) => {
                    if classify_reqwest_error(&err) == RetryDisposition::Retryable
                        && attempt < self.backoff.max_retries
                    {
                        last_request_error = Some(err);
                        tokio::time::sleep(self.backoff.delay_for_attempt(attempt)).await;
                        continue;
                    }
                    return Err(FetchError::Request(err));
                }
            }
        }

        Err(FetchError::Request(
            last_request_error.expect("retry loop should capture a request error"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use pulse_core::{CandidateEvent, EventSource, Price, Venue};

    fn mk_event(source_name: &str, external_id: &str, url: &str) -> PersistedEvent {
        let now = Utc::now();
        let candidate = CandidateEvent {
            title: format!("Event {external_id}"),
            description: "desc".to_string(),
            start_date: now + ChronoDuration::days(5),
            end_date: None,
            venue: Venue::tba(),
            category: Category::Other,
            tags: vec![],
            image_url: String::new(),
            price: Price::unknown(),
            source: EventSource {
                name: source_name.to_string(),
                url: url.to_string(),
                external_id: external_id.to_string(),
            },
        };
        PersistedEvent::from_candidate(&candidate, "hash".to_string(), now)
    }

    #[tokio::test]
    async fn upsert_resolves_same_key_to_single_record() {
        let store = MemoryStore::new();
        let first = store
            .upsert_new(mk_event("eventbrite", "abc", "https://a/e/abc"))
            .await
            .unwrap();
        let second = store
            .upsert_new(mk_event("eventbrite", "abc", "https://a/e/abc"))
            .await
            .unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn inactive_sweep_is_idempotent() {
        let store = MemoryStore::new();
        for i in 0..3 {
            store
                .upsert_new(mk_event("eventbrite", &format!("e{i}"), &format!("https://a/e/{i}")))
                .await
                .unwrap();
        }

        let seen = vec!["https://a/e/0".to_string(), "https://a/e/1".to_string()];
        let first_pass = store.mark_inactive_except("eventbrite", &seen).await.unwrap();
        let second_pass = store.mark_inactive_except("eventbrite", &seen).await.unwrap();

        assert_eq!(first_pass, 1);
        assert_eq!(second_pass, 0);
    }

    #[tokio::test]
    async fn sweep_ignores_other_sources() {
        let store = MemoryStore::new();
        store
            .upsert_new(mk_event("meetup", "m1", "https://m/1"))
            .await
            .unwrap();

        let transitioned = store.mark_inactive_except("eventbrite", &[]).await.unwrap();
        assert_eq!(transitioned, 0);
    }

    #[tokio::test]
    async fn retention_spares_imported_events() {
        let store = MemoryStore::new();
        let now = Utc::now();

        let mut stale = mk_event("eventbrite", "old", "https://a/e/old");
        stale.start_date = now - ChronoDuration::days(40);
        stale.status = EventStatus::Inactive;
        let stale = store.upsert_new(stale).await.unwrap();
        // upsert keeps the incoming status for first sightings
        assert_eq!(stale.status, EventStatus::Inactive);

        let mut kept = mk_event("eventbrite", "kept", "https://a/e/kept");
        kept.start_date = now - ChronoDuration::days(40);
        kept.status = EventStatus::Inactive;
        kept.imported.status = true;
        store.upsert_new(kept).await.unwrap();

        let deleted = store
            .delete_retired(now - ChronoDuration::days(30))
            .await
            .unwrap();
        assert_eq!(deleted, 1);

        let remaining = store.all().await;
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].imported.status);
    }

    #[test]
    fn backoff_is_exponential_and_capped() {
        let policy = BackoffPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(350));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_millis(350));
    }
}
