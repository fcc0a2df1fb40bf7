//! Source adapters: fetch raw listings from one external source each and emit
//! normalized candidate events.
//!
//! Every adapter shares the same normalization policy: a candidate that fails
//! normalization is dropped and logged, never aborting its batch; only a
//! failed page fetch surfaces as an error. Date parsing prefers completeness
//! over precision: when every strategy fails, the adapter substitutes a
//! source-specific near-future default instead of rejecting the listing.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use pulse_core::{
    CandidateEvent, Category, EventSource, Price, Venue, DEFAULT_CITY, DEFAULT_COUNTRY,
    DEFAULT_STATE,
};
use pulse_storage::{FetchError, PageFetcher};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::{info, warn};

pub const CRATE_NAME: &str = "pulse-adapters";

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("{0}")]
    Message(String),
}

/// One implementation per external source. `scrape` suspends until the page
/// is fetched and every extractable listing is normalized; it has no side
/// effects beyond network I/O and logging.
#[async_trait]
pub trait EventAdapter: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn scrape(&self, fetcher: &PageFetcher) -> Result<Vec<CandidateEvent>, AdapterError>;
}

/// Explicit ordered list the orchestrator iterates. Order matters: a source's
/// full pass (including its inactive sweep) completes before the next begins.
pub fn default_adapters() -> Vec<Box<dyn EventAdapter>> {
    vec![
        Box::new(EventbriteAdapter::new()),
        Box::new(MeetupAdapter::new()),
        Box::new(TimeoutAdapter::new()),
    ]
}

pub fn adapter_for_source(source_name: &str) -> Option<Box<dyn EventAdapter>> {
    match source_name {
        "eventbrite" => Some(Box::new(EventbriteAdapter::new())),
        "meetup" => Some(Box::new(MeetupAdapter::new())),
        "timeout" => Some(Box::new(TimeoutAdapter::new())),
        _ => None,
    }
}

/// Intermediate card extraction shared by the HTML adapters, before any
/// normalization is attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawListing {
    pub title: String,
    pub url: String,
    pub date_text: String,
    pub location_text: String,
    pub image_url: String,
    pub price_text: String,
    pub description: String,
}

static DAY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{1,2}").expect("valid day regex"));
static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:[.,]\d+)?").expect("valid number regex"));
static EVENTBRITE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/e/([^/\?]+)").expect("valid eventbrite id regex"));
static MEETUP_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/events/(\d+)").expect("valid meetup id regex"));

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Music,
        &["concert", "music", "band", "dj", "festival", "gig", "live music", "performance"],
    ),
    (
        Category::ArtsCulture,
        &["art", "gallery", "museum", "theatre", "theater", "culture", "exhibition", "show"],
    ),
    (
        Category::FoodDrink,
        &["food", "wine", "beer", "dining", "restaurant", "tasting", "cooking", "chef"],
    ),
    (
        Category::SportsFitness,
        &["sport", "fitness", "yoga", "run", "marathon", "gym", "workout", "training"],
    ),
    (
        Category::BusinessProfessional,
        &["business", "networking", "conference", "seminar", "workshop", "professional", "career"],
    ),
    (
        Category::Community,
        &["community", "meetup", "social", "charity", "volunteer", "fundraiser"],
    ),
];

const BASE_TAGS: [&str; 3] = ["sydney", "event", "australia"];

const TAG_KEYWORDS: [&str; 11] = [
    "music", "art", "food", "sport", "tech", "business", "family", "outdoor", "indoor", "free",
    "weekend",
];

pub fn clean_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ").trim().to_string()
}

/// Parse free-text date strings, in order of decreasing confidence:
/// ISO-8601 (accepted only when in the future), month-name + day-number with
/// current-year assumption and past-date rollover, then a fixed set of
/// generic formats with the same rollover. `None` means the caller decides
/// the fallback.
pub fn parse_event_date(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        return None;
    }

    if cleaned.contains('T') || cleaned.contains('-') {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&cleaned) {
            let parsed = parsed.with_timezone(&Utc);
            if parsed > now {
                return Some(parsed);
            }
        }
        if let Ok(parsed) = chrono::NaiveDateTime::parse_from_str(&cleaned, "%Y-%m-%dT%H:%M:%S") {
            let parsed = Utc.from_utc_datetime(&parsed);
            if parsed > now {
                return Some(parsed);
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, "%Y-%m-%d") {
            if let Some(parsed) = at_midnight(date) {
                if parsed > now {
                    return Some(parsed);
                }
            }
        }
    }

    let lower = cleaned.to_lowercase();
    for (index, month) in MONTH_ABBREVIATIONS.iter().enumerate() {
        if !lower.contains(month) {
            continue;
        }
        let Some(day) = DAY_RE.find(&cleaned).and_then(|m| m.as_str().parse::<u32>().ok()) else {
            continue;
        };
        let month_no = index as u32 + 1;
        let Some(date) = NaiveDate::from_ymd_opt(now.year(), month_no, day) else {
            continue;
        };
        let mut parsed = at_midnight(date)?;
        if parsed < now {
            parsed = at_midnight(NaiveDate::from_ymd_opt(now.year() + 1, month_no, day)?)?;
        }
        return Some(parsed);
    }

    for fmt in ["%d/%m/%Y", "%m/%d/%Y", "%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%d %b %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, fmt) {
            let mut parsed = at_midnight(date)?;
            if parsed < now {
                parsed = at_midnight(date.with_year(date.year() + 1)?)?;
            }
            return Some(parsed);
        }
    }

    None
}

fn at_midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive))
}

/// Split a free-text location on common delimiters: first segment is the
/// venue name, the remainder its address. Unresolvable text yields the
/// sentinel venue.
pub fn parse_venue(location_text: &str) -> Venue {
    let cleaned = clean_text(location_text);
    if cleaned.len() < 2 {
        return Venue::tba();
    }

    let parts: Vec<&str> = cleaned
        .split(['•', '·', ',', '|'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let Some((name, rest)) = parts.split_first() else {
        return Venue::tba();
    };

    Venue {
        name: (*name).to_string(),
        address: rest.join(", "),
        city: DEFAULT_CITY.to_string(),
        state: DEFAULT_STATE.to_string(),
        country: DEFAULT_COUNTRY.to_string(),
        coordinates: None,
    }
}

/// "free" anywhere in the text wins; otherwise every numeric substring
/// contributes to the min/max range. No numerics yields a zero-valued,
/// non-free price.
pub fn parse_price(price_text: &str) -> Price {
    if price_text.to_lowercase().contains("free") {
        return Price::free();
    }

    let amounts: Vec<f64> = NUMBER_RE
        .find_iter(price_text)
        .filter_map(|m| m.as_str().replace(',', "").parse::<f64>().ok())
        .collect();

    if amounts.is_empty() {
        return Price::unknown();
    }

    let min = amounts.iter().copied().fold(f64::INFINITY, f64::min);
    let max = amounts.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Price::range(min, max)
}

/// First category whose keyword list matches any substring of the combined
/// title + description wins; no match lands in `Other`.
pub fn detect_category(text: &str) -> Category {
    let lower = text.to_lowercase();
    for (category, keywords) in CATEGORY_KEYWORDS {
        if keywords.iter().any(|keyword| lower.contains(keyword)) {
            return *category;
        }
    }
    Category::Other
}

/// Fixed base tag set plus any matched keyword from the text, deduplicated.
pub fn extract_tags(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut tags: Vec<String> = BASE_TAGS.iter().map(|t| t.to_string()).collect();
    for keyword in TAG_KEYWORDS {
        if lower.contains(keyword) && !tags.iter().any(|t| t == keyword) {
            tags.push(keyword.to_string());
        }
    }
    tags
}

fn sel(css: &str) -> Selector {
    // selectors are compile-time constants
    Selector::parse(css).expect("valid selector")
}

fn element_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope.select(selector).map(element_text).find(|text| !text.is_empty())
}

fn first_attr(scope: ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    scope
        .select(selector)
        .filter_map(|el| el.value().attr(attr))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

/// Walk up from a listing link to its card container: the nearest article,
/// list item, or card/event-classed ancestor.
fn enclosing_card<'a>(link: ElementRef<'a>) -> ElementRef<'a> {
    link.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| {
            let name = el.value().name();
            name == "article"
                || name == "li"
                || el
                    .value()
                    .attr("class")
                    .is_some_and(|class| class.contains("card") || class.contains("event"))
        })
        .unwrap_or(link)
}

// ---------------------------------------------------------------------------
// Eventbrite
// ---------------------------------------------------------------------------

/// Card-grid scrape over the Sydney listing page. Selectors are intentionally
/// loose (class substrings) since Eventbrite's markup shifts between deploys.
#[derive(Debug, Clone)]
pub struct EventbriteAdapter {
    base_url: String,
}

impl EventbriteAdapter {
    pub const DEFAULT_DATE_OFFSET_DAYS: i64 = 7;

    pub fn new() -> Self {
        Self {
            base_url: "https://www.eventbrite.com.au/d/australia--sydney/events/".to_string(),
        }
    }

    pub fn extract_listings(&self, html: &str) -> Vec<RawListing> {
        let document = Html::parse_document(html);
        let link_sel = sel(r#"a[href*="/e/"]"#);
        let date_sel = sel(r#"[class*="date"], [class*="time"], time, [datetime]"#);
        let location_sel = sel(r#"[class*="location"], [class*="venue"], [class*="address"]"#);
        let price_sel = sel(r#"[class*="price"], [class*="cost"]"#);
        let desc_sel = sel(r#"p, [class*="description"], [class*="summary"]"#);
        let img_sel = sel("img");

        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut listings = Vec::new();

        for link in document.select(&link_sel) {
            let Some(url) = link.value().attr("href").map(|href| href.trim().to_string()) else {
                continue;
            };
            if url.is_empty() || !seen_urls.insert(url.clone()) {
                continue;
            }

            let title = {
                let text = element_text(link);
                if text.is_empty() {
                    link.value().attr("aria-label").map(clean_text).unwrap_or_default()
                } else {
                    text
                }
            };
            if title.len() < 3 || title == "Event" {
                continue;
            }

            let card = enclosing_card(link);

            let date_text = card
                .select(&date_sel)
                .find_map(|el| {
                    let text = element_text(el);
                    if text.len() > 3 {
                        return Some(text);
                    }
                    el.value().attr("datetime").map(|dt| dt.to_string())
                })
                .unwrap_or_default();

            let location_text = card
                .select(&location_sel)
                .map(element_text)
                .find(|text| text.len() > 2 && !text.contains("Online"))
                .unwrap_or_default();

            let image_url = first_attr(card, &img_sel, "src")
                .or_else(|| first_attr(card, &img_sel, "data-src"))
                .unwrap_or_default();

            let price_text = first_text(card, &price_sel).unwrap_or_default();

            let description = card
                .select(&desc_sel)
                .map(element_text)
                .find(|text| text.len() > 10 && text.len() < 500)
                .unwrap_or_default();

            listings.push(RawListing {
                title,
                url,
                date_text,
                location_text,
                image_url,
                price_text,
                description,
            });
        }

        listings
    }

    pub fn normalize(&self, raw: RawListing, now: DateTime<Utc>) -> Option<CandidateEvent> {
        let start_date = parse_event_date(&raw.date_text, now)
            .unwrap_or(now + chrono::Duration::days(Self::DEFAULT_DATE_OFFSET_DAYS));

        let venue = parse_venue(&raw.location_text);
        let price = parse_price(&raw.price_text);
        let combined = format!("{} {}", raw.title, raw.description);

        let description = if raw.description.is_empty() {
            format!("Exciting event in {}. Check Eventbrite for full details.", venue.city)
        } else {
            raw.description
        };

        let external_id = extract_eventbrite_id(&raw.url);

        Some(CandidateEvent {
            title: raw.title,
            description,
            start_date,
            end_date: None,
            venue,
            category: detect_category(&combined),
            tags: extract_tags(&combined),
            image_url: raw.image_url,
            price,
            source: EventSource {
                name: "eventbrite".to_string(),
                url: raw.url,
                external_id,
            },
        })
    }
}

impl Default for EventbriteAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn extract_eventbrite_id(url: &str) -> String {
    if let Some(captures) = EVENTBRITE_ID_RE.captures(url) {
        if let Some(id) = captures.get(1) {
            return id.as_str().to_string();
        }
    }
    url.rsplit('/')
        .find(|segment| !segment.is_empty())
        .map(|segment| segment.split('?').next().unwrap_or(segment).to_string())
        .unwrap_or_else(|| url.to_string())
}

#[async_trait]
impl EventAdapter for EventbriteAdapter {
    fn source_name(&self) -> &'static str {
        "eventbrite"
    }

    async fn scrape(&self, fetcher: &PageFetcher) -> Result<Vec<CandidateEvent>, AdapterError> {
        let body = fetcher.fetch_text(self.source_name(), &self.base_url).await?;
        let raw = self.extract_listings(&body);
        info!(source = self.source_name(), extracted = raw.len(), "extracted raw listings");

        let now = Utc::now();
        let mut events = Vec::new();
        for listing in raw {
            let title = listing.title.clone();
            match self.normalize(listing, now) {
                Some(event) => events.push(event),
                None => warn!(source = self.source_name(), %title, "dropped unnormalizable listing"),
            }
        }

        info!(source = self.source_name(), total = events.len(), "scrape completed");
        Ok(events)
    }
}

// ---------------------------------------------------------------------------
// Meetup
// ---------------------------------------------------------------------------

/// Meetup's cards carry stable data-testid hooks and reliable dates, so this
/// adapter is strict: a candidate without a parseable future date is dropped
/// instead of defaulted.
#[derive(Debug, Clone)]
pub struct MeetupAdapter {
    base_url: String,
}

impl MeetupAdapter {
    pub fn new() -> Self {
        Self {
            base_url: "https://www.meetup.com/find/?location=au--sydney&source=EVENTS".to_string(),
        }
    }

    pub fn extract_listings(&self, html: &str) -> Vec<RawListing> {
        let document = Html::parse_document(html);
        let card_sel = sel(r#"[data-testid="event-card"]"#);
        let link_sel = sel(r#"a[href*="/events/"]"#);
        let title_sel = sel(r#"[data-testid="event-title"]"#);
        let date_sel = sel(r#"[data-testid="event-time-start"]"#);
        let location_sel = sel(r#"[data-testid="event-location"]"#);
        let group_sel = sel(r#"[data-testid="group-name"]"#);
        let attendees_sel = sel(r#"[data-testid="event-attendees"]"#);
        let img_sel = sel("img");

        let mut listings = Vec::new();
        for card in document.select(&card_sel) {
            let Some(url) = first_attr(card, &link_sel, "href") else {
                continue;
            };
            let Some(title) = first_text(card, &title_sel) else {
                continue;
            };

            let group = first_text(card, &group_sel).unwrap_or_else(|| "Meetup Group".to_string());
            let attendees = first_text(card, &attendees_sel).unwrap_or_default();

            listings.push(RawListing {
                title,
                url,
                date_text: first_text(card, &date_sel).unwrap_or_default(),
                location_text: first_text(card, &location_sel).unwrap_or_default(),
                image_url: first_attr(card, &img_sel, "src").unwrap_or_default(),
                price_text: String::new(),
                description: clean_text(&format!("Hosted by {group}. {attendees}")),
            });
        }

        listings
    }

    pub fn normalize(&self, raw: RawListing, now: DateTime<Utc>) -> Option<CandidateEvent> {
        // No default-date fallback here: stale or undated meetup cards are
        // almost always past events still lingering in the markup.
        let start_date = parse_event_date(&raw.date_text, now)?;
        if start_date < now {
            return None;
        }

        let venue = if raw.location_text.trim().is_empty() {
            Venue {
                name: "Online Event".to_string(),
                ..Venue::tba()
            }
        } else {
            let text = clean_text(&raw.location_text);
            Venue {
                name: text.clone(),
                address: text,
                city: DEFAULT_CITY.to_string(),
                state: DEFAULT_STATE.to_string(),
                country: DEFAULT_COUNTRY.to_string(),
                coordinates: None,
            }
        };

        let external_id = MEETUP_ID_RE
            .captures(&raw.url)
            .and_then(|captures| captures.get(1))
            .map(|id| id.as_str().to_string())
            .unwrap_or_else(|| raw.url.clone());

        Some(CandidateEvent {
            title: raw.title,
            description: raw.description,
            start_date,
            end_date: None,
            venue,
            category: Category::Community,
            tags: vec!["meetup".to_string(), "community".to_string(), "sydney".to_string()],
            image_url: raw.image_url,
            price: Price::free(),
            source: EventSource {
                name: "meetup".to_string(),
                url: raw.url,
                external_id,
            },
        })
    }
}

impl Default for MeetupAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventAdapter for MeetupAdapter {
    fn source_name(&self) -> &'static str {
        "meetup"
    }

    async fn scrape(&self, fetcher: &PageFetcher) -> Result<Vec<CandidateEvent>, AdapterError> {
        let body = fetcher.fetch_text(self.source_name(), &self.base_url).await?;
        let raw = self.extract_listings(&body);
        info!(source = self.source_name(), extracted = raw.len(), "extracted raw listings");

        let now = Utc::now();
        let mut events = Vec::new();
        for listing in raw {
            let title = listing.title.clone();
            match self.normalize(listing, now) {
                Some(event) => events.push(event),
                None => warn!(source = self.source_name(), %title, "dropped listing without a future date"),
            }
        }

        info!(source = self.source_name(), total = events.len(), "scrape completed");
        Ok(events)
    }
}

// ---------------------------------------------------------------------------
// TimeOut
// ---------------------------------------------------------------------------

/// Static editorial page; cards rarely carry per-event dates, so everything
/// lands a fixed few days out with a catch-all venue.
#[derive(Debug, Clone)]
pub struct TimeoutAdapter {
    base_url: String,
}

impl TimeoutAdapter {
    pub const DEFAULT_DATE_OFFSET_DAYS: i64 = 3;

    pub fn new() -> Self {
        Self {
            base_url: "https://www.timeout.com/sydney/things-to-do/things-to-do-in-sydney-this-week"
                .to_string(),
        }
    }

    pub fn extract_listings(&self, html: &str) -> Vec<RawListing> {
        let document = Html::parse_document(html);
        let card_sel = sel(r#".event-card, .article-card, [class*="event"]"#);
        let title_sel = sel(r#"h3, h2, [class*="title"]"#);
        let link_sel = sel("a");
        let desc_sel = sel(r#"p, [class*="description"]"#);
        let img_sel = sel("img");

        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut listings = Vec::new();

        for card in document.select(&card_sel) {
            let Some(title) = first_text(card, &title_sel) else {
                continue;
            };
            let Some(href) = first_attr(card, &link_sel, "href") else {
                continue;
            };

            let url = if href.starts_with("http") {
                href
            } else {
                format!("https://www.timeout.com{href}")
            };
            if !seen_urls.insert(url.clone()) {
                continue;
            }

            listings.push(RawListing {
                title,
                url,
                date_text: String::new(),
                location_text: String::new(),
                image_url: first_attr(card, &img_sel, "src").unwrap_or_default(),
                price_text: String::new(),
                description: first_text(card, &desc_sel).unwrap_or_default(),
            });
        }

        listings
    }

    pub fn normalize(&self, raw: RawListing, now: DateTime<Utc>) -> Option<CandidateEvent> {
        let combined = format!("{} {}", raw.title, raw.description);
        let description = if raw.description.is_empty() {
            "Check TimeOut Sydney for full details".to_string()
        } else {
            raw.description
        };

        let external_id = raw
            .url
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or(&raw.url)
            .to_string();

        Some(CandidateEvent {
            title: raw.title,
            description,
            start_date: now + chrono::Duration::days(Self::DEFAULT_DATE_OFFSET_DAYS),
            end_date: None,
            venue: Venue {
                name: "Various Locations".to_string(),
                address: DEFAULT_CITY.to_string(),
                city: DEFAULT_CITY.to_string(),
                state: DEFAULT_STATE.to_string(),
                country: DEFAULT_COUNTRY.to_string(),
                coordinates: None,
            },
            category: detect_category(&combined),
            tags: vec!["timeout".to_string(), "sydney".to_string(), "featured".to_string()],
            image_url: raw.image_url,
            price: Price::unknown(),
            source: EventSource {
                name: "timeout".to_string(),
                url: raw.url,
                external_id,
            },
        })
    }
}

impl Default for TimeoutAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventAdapter for TimeoutAdapter {
    fn source_name(&self) -> &'static str {
        "timeout"
    }

    async fn scrape(&self, fetcher: &PageFetcher) -> Result<Vec<CandidateEvent>, AdapterError> {
        let body = fetcher.fetch_text(self.source_name(), &self.base_url).await?;
        let raw = self.extract_listings(&body);
        info!(source = self.source_name(), extracted = raw.len(), "extracted raw listings");

        let now = Utc::now();
        let events: Vec<CandidateEvent> =
            raw.into_iter().filter_map(|listing| self.normalize(listing, now)).collect();

        info!(source = self.source_name(), total = events.len(), "scrape completed");
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).single().unwrap()
    }

    #[test]
    fn iso_dates_accepted_only_in_the_future() {
        let now = fixed_now();
        let future = parse_event_date("2026-06-01T19:00:00+10:00", now).unwrap();
        assert!(future > now);

        // A past ISO date falls through every strategy and yields None.
        assert_eq!(parse_event_date("2020-06-01T19:00:00+00:00", now), None);
    }

    #[test]
    fn month_name_dates_assume_current_year_and_roll_forward() {
        let now = fixed_now();

        let upcoming = parse_event_date("Sat, Jun 20", now).unwrap();
        assert_eq!(upcoming.date_naive(), NaiveDate::from_ymd_opt(2026, 6, 20).unwrap());

        // February has already passed in March 2026, so it rolls to 2027.
        let rolled = parse_event_date("Mon, Feb 12", now).unwrap();
        assert_eq!(rolled.date_naive(), NaiveDate::from_ymd_opt(2027, 2, 12).unwrap());
    }

    #[test]
    fn generic_formats_roll_past_dates_forward() {
        let now = fixed_now();
        let rolled = parse_event_date("12/01/2026", now).unwrap();
        assert_eq!(rolled.date_naive(), NaiveDate::from_ymd_opt(2027, 1, 12).unwrap());
    }

    #[test]
    fn unparseable_dates_yield_none() {
        assert_eq!(parse_event_date("tickets on sale soon", fixed_now()), None);
        assert_eq!(parse_event_date("", fixed_now()), None);
    }

    #[test]
    fn venue_splits_on_common_delimiters() {
        let venue = parse_venue("Enmore Theatre • 118 Enmore Rd • Newtown");
        assert_eq!(venue.name, "Enmore Theatre");
        assert_eq!(venue.address, "118 Enmore Rd, Newtown");
        assert_eq!(venue.city, "Sydney");

        let comma = parse_venue("Oxford Art Factory, 38-46 Oxford St");
        assert_eq!(comma.name, "Oxford Art Factory");
        assert_eq!(comma.address, "38-46 Oxford St");
    }

    #[test]
    fn unresolvable_venue_text_yields_sentinel() {
        let venue = parse_venue("  ");
        assert_eq!(venue.name, "TBA");
        assert_eq!(venue.city, "Sydney");
        assert_eq!(venue.country, "Australia");
    }

    #[test]
    fn price_parsing_handles_free_ranges_and_garbage() {
        let free = parse_price("FREE entry");
        assert!(free.is_free);
        assert_eq!(free.min, 0.0);

        let range = parse_price("From $25.50 to $49");
        assert!(!range.is_free);
        assert_eq!(range.min, 25.5);
        assert_eq!(range.max, 49.0);

        let single = parse_price("$30");
        assert_eq!(single.min, 30.0);
        assert_eq!(single.max, 30.0);

        let unknown = parse_price("ticket prices vary");
        assert!(!unknown.is_free);
        assert_eq!(unknown.min, 0.0);
        assert_eq!(unknown.max, 0.0);
    }

    #[test]
    fn category_detection_first_match_wins() {
        assert_eq!(detect_category("Late night jazz concert"), Category::Music);
        assert_eq!(detect_category("Startup networking breakfast"), Category::BusinessProfessional);
        assert_eq!(detect_category("Weekend volunteer beach cleanup"), Category::Community);
        assert_eq!(detect_category("Quantum physics lecture"), Category::Other);
    }

    #[test]
    fn tag_extraction_adds_matched_keywords_once() {
        let tags = extract_tags("Free outdoor music festival this weekend");
        assert_eq!(&tags[..3], &["sydney", "event", "australia"]);
        assert!(tags.contains(&"music".to_string()));
        assert!(tags.contains(&"outdoor".to_string()));
        assert!(tags.contains(&"free".to_string()));
        assert!(tags.contains(&"weekend".to_string()));
        let unique: HashSet<&String> = tags.iter().collect();
        assert_eq!(unique.len(), tags.len());
    }

    const EVENTBRITE_FIXTURE: &str = r#"
        <html><body>
          <article class="search-card">
            <a href="https://www.eventbrite.com.au/e/sydney-jazz-fest-tickets-123">Sydney Jazz Fest</a>
            <div class="event-card-date">Sat, Jun 20</div>
            <div class="card-location">Enmore Theatre • 118 Enmore Rd</div>
            <div class="price-tag">From $25</div>
            <p>An evening of live jazz across three stages.</p>
            <img src="https://img.example/jazz.jpg"/>
          </article>
          <article class="search-card">
            <a href="https://www.eventbrite.com.au/e/sydney-jazz-fest-tickets-123">Sydney Jazz Fest</a>
          </article>
          <article class="search-card">
            <a href="https://www.eventbrite.com.au/e/x">ab</a>
          </article>
        </body></html>
    "#;

    #[test]
    fn eventbrite_extraction_dedups_and_skips_short_titles() {
        let adapter = EventbriteAdapter::new();
        let listings = adapter.extract_listings(EVENTBRITE_FIXTURE);

        assert_eq!(listings.len(), 1);
        let listing = &listings[0];
        assert_eq!(listing.title, "Sydney Jazz Fest");
        assert_eq!(listing.date_text, "Sat, Jun 20");
        assert_eq!(listing.location_text, "Enmore Theatre • 118 Enmore Rd");
        assert_eq!(listing.price_text, "From $25");
        assert_eq!(listing.description, "An evening of live jazz across three stages.");
        assert_eq!(listing.image_url, "https://img.example/jazz.jpg");
    }

    #[test]
    fn eventbrite_normalization_builds_a_complete_candidate() {
        let adapter = EventbriteAdapter::new();
        let now = fixed_now();
        let listings = adapter.extract_listings(EVENTBRITE_FIXTURE);
        let candidate = adapter.normalize(listings[0].clone(), now).unwrap();

        assert_eq!(candidate.source.name, "eventbrite");
        assert_eq!(candidate.source.external_id, "sydney-jazz-fest-tickets-123");
        assert_eq!(candidate.venue.name, "Enmore Theatre");
        assert_eq!(candidate.category, Category::Music);
        assert_eq!(candidate.price.min, 25.0);
        assert_eq!(
            candidate.start_date.date_naive(),
            NaiveDate::from_ymd_opt(2026, 6, 20).unwrap()
        );
    }

    #[test]
    fn eventbrite_missing_date_falls_back_to_default_offset() {
        let adapter = EventbriteAdapter::new();
        let now = fixed_now();
        let raw = RawListing {
            title: "Mystery Warehouse Party".to_string(),
            url: "https://www.eventbrite.com.au/e/mystery-456".to_string(),
            ..RawListing::default()
        };

        let candidate = adapter.normalize(raw, now).unwrap();
        assert_eq!(
            candidate.start_date,
            now + chrono::Duration::days(EventbriteAdapter::DEFAULT_DATE_OFFSET_DAYS)
        );
        // Missing description is synthesized rather than left empty.
        assert!(candidate.description.contains("Sydney"));
    }

    const MEETUP_FIXTURE: &str = r#"
        <html><body>
          <div data-testid="event-card">
            <a href="https://www.meetup.com/sydney-rust/events/298765432/">details</a>
            <span data-testid="event-title">Rust Hack Night</span>
            <span data-testid="event-time-start">2026-04-02T18:30:00+10:00</span>
            <span data-testid="event-location">Fishburners, 11 York St</span>
            <span data-testid="group-name">Sydney Rust</span>
            <span data-testid="event-attendees">42 attendees</span>
          </div>
          <div data-testid="event-card">
            <a href="https://www.meetup.com/old-group/events/111/">details</a>
            <span data-testid="event-title">Stale Meetup</span>
            <span data-testid="event-time-start">2020-01-01T18:00:00+10:00</span>
          </div>
        </body></html>
    "#;

    #[test]
    fn meetup_drops_candidates_without_future_dates() {
        let adapter = MeetupAdapter::new();
        let now = fixed_now();
        let listings = adapter.extract_listings(MEETUP_FIXTURE);
        assert_eq!(listings.len(), 2);

        let candidates: Vec<CandidateEvent> =
            listings.into_iter().filter_map(|l| adapter.normalize(l, now)).collect();

        assert_eq!(candidates.len(), 1);
        let candidate = &candidates[0];
        assert_eq!(candidate.title, "Rust Hack Night");
        assert_eq!(candidate.source.external_id, "298765432");
        assert_eq!(candidate.category, Category::Community);
        assert!(candidate.price.is_free);
        assert_eq!(candidate.description, "Hosted by Sydney Rust. 42 attendees");
    }

    const TIMEOUT_FIXTURE: &str = r#"
        <html><body>
          <div class="article-card">
            <h3 class="card-title">Vivid Sydney Light Walk</h3>
            <a href="/sydney/things-to-do/vivid-light-walk">Read more</a>
            <p>The harbour foreshore lights up after dark.</p>
          </div>
        </body></html>
    "#;

    #[test]
    fn timeout_defaults_dates_and_absolutizes_urls() {
        let adapter = TimeoutAdapter::new();
        let now = fixed_now();
        let listings = adapter.extract_listings(TIMEOUT_FIXTURE);
        assert_eq!(listings.len(), 1);

        let candidate = adapter.normalize(listings[0].clone(), now).unwrap();
        assert_eq!(
            candidate.source.url,
            "https://www.timeout.com/sydney/things-to-do/vivid-light-walk"
        );
        assert_eq!(candidate.source.external_id, "vivid-light-walk");
        assert_eq!(
            candidate.start_date,
            now + chrono::Duration::days(TimeoutAdapter::DEFAULT_DATE_OFFSET_DAYS)
        );
        assert_eq!(candidate.venue.name, "Various Locations");
        assert!(!candidate.price.is_free);
    }

    #[test]
    fn adapter_registry_resolves_known_sources_in_order() {
        let adapters = default_adapters();
        let names: Vec<&str> = adapters.iter().map(|a| a.source_name()).collect();
        assert_eq!(names, ["eventbrite", "meetup", "timeout"]);

        assert!(adapter_for_source("meetup").is_some());
        assert!(adapter_for_source("ticketek").is_none());
    }
}
