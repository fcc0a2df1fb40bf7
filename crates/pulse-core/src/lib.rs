//! Core domain model for the Sydney Event Pulse discovery engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CRATE_NAME: &str = "pulse-core";

pub const DEFAULT_CITY: &str = "Sydney";
pub const DEFAULT_STATE: &str = "NSW";
pub const DEFAULT_COUNTRY: &str = "Australia";
pub const DEFAULT_CURRENCY: &str = "AUD";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub coordinates: Option<Coordinates>,
}

impl Venue {
    /// Sentinel venue used when a location string cannot be resolved.
    pub fn tba() -> Self {
        Self {
            name: "TBA".to_string(),
            address: String::new(),
            city: DEFAULT_CITY.to_string(),
            state: DEFAULT_STATE.to_string(),
            country: DEFAULT_COUNTRY.to_string(),
            coordinates: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub min: f64,
    pub max: f64,
    pub currency: String,
    pub is_free: bool,
}

impl Price {
    pub fn free() -> Self {
        Self {
            min: 0.0,
            max: 0.0,
            currency: DEFAULT_CURRENCY.to_string(),
            is_free: true,
        }
    }

    /// Zero-valued but not free: the listing carried no usable price text.
    pub fn unknown() -> Self {
        Self {
            min: 0.0,
            max: 0.0,
            currency: DEFAULT_CURRENCY.to_string(),
            is_free: false,
        }
    }

    pub fn range(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            currency: DEFAULT_CURRENCY.to_string(),
            is_free: false,
        }
    }
}

/// Fixed category set. Keyword detection in the adapters maps free text onto
/// these; anything unmatched lands in `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Music")]
    Music,
    #[serde(rename = "Arts & Culture")]
    ArtsCulture,
    #[serde(rename = "Sports & Fitness")]
    SportsFitness,
    #[serde(rename = "Food & Drink")]
    FoodDrink,
    #[serde(rename = "Community")]
    Community,
    #[serde(rename = "Business & Professional")]
    BusinessProfessional,
    #[serde(rename = "Film & Media")]
    FilmMedia,
    #[serde(rename = "Charity & Causes")]
    CharityCauses,
    #[serde(rename = "Other")]
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Music => "Music",
            Category::ArtsCulture => "Arts & Culture",
            Category::SportsFitness => "Sports & Fitness",
            Category::FoodDrink => "Food & Drink",
            Category::Community => "Community",
            Category::BusinessProfessional => "Business & Professional",
            Category::FilmMedia => "Film & Media",
            Category::CharityCauses => "Charity & Causes",
            Category::Other => "Other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Music" => Some(Category::Music),
            "Arts & Culture" => Some(Category::ArtsCulture),
            "Sports & Fitness" => Some(Category::SportsFitness),
            "Food & Drink" => Some(Category::FoodDrink),
            "Community" => Some(Category::Community),
            "Business & Professional" => Some(Category::BusinessProfessional),
            "Film & Media" => Some(Category::FilmMedia),
            "Charity & Causes" => Some(Category::CharityCauses),
            "Other" => Some(Category::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a persisted event.
///
/// `Imported` is set by the dashboard collaborator and is sticky: the sync
/// engine keeps refreshing scrape metadata and content but never demotes it
/// back to `New`/`Updated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    New,
    Updated,
    Inactive,
    Imported,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::New => "new",
            EventStatus::Updated => "updated",
            EventStatus::Inactive => "inactive",
            EventStatus::Imported => "imported",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "new" => Some(EventStatus::New),
            "updated" => Some(EventStatus::Updated),
            "inactive" => Some(EventStatus::Inactive),
            "imported" => Some(EventStatus::Imported),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance of a scraped listing. `(name, external_id)` uniquely identifies
/// at most one persisted event; `url` is the primary lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSource {
    pub name: String,
    pub url: String,
    pub external_id: String,
}

/// Ephemeral adapter output. Produced fresh on every scrape and reconciled
/// against the store by the synchronizer; never persisted directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEvent {
    pub title: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub venue: Venue,
    pub category: Category,
    pub tags: Vec<String>,
    pub image_url: String,
    pub price: Price,
    pub source: EventSource,
}

/// One append-only entry in a persisted event's change log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub field: String,
    pub old_value: String,
    pub new_value: String,
    pub changed_at: DateTime<Utc>,
}

/// Dashboard-owned import marker. The engine reads it (retention skips
/// imported events) but never writes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportInfo {
    pub status: bool,
    pub by: Option<String>,
    pub at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Durable event record, subject to the new/updated/inactive/imported
/// lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedEvent {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub venue: Venue,
    pub category: Category,
    pub tags: Vec<String>,
    pub image_url: String,
    pub price: Price,
    pub source: EventSource,
    pub status: EventStatus,
    pub content_hash: String,
    pub change_log: Vec<ChangeRecord>,
    pub first_scraped: DateTime<Utc>,
    pub last_scraped: DateTime<Utc>,
    pub scraped_count: u64,
    pub imported: ImportInfo,
    pub click_count: u64,
    pub email_capture_count: u64,
}

impl PersistedEvent {
    /// Build a first-sighting record from an adapter candidate.
    pub fn from_candidate(
        candidate: &CandidateEvent,
        content_hash: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: candidate.title.clone(),
            description: candidate.description.clone(),
            start_date: candidate.start_date,
            end_date: candidate.end_date,
            venue: candidate.venue.clone(),
            category: candidate.category,
            tags: candidate.tags.clone(),
            image_url: candidate.image_url.clone(),
            price: candidate.price.clone(),
            source: candidate.source.clone(),
            status: EventStatus::New,
            content_hash,
            change_log: Vec::new(),
            first_scraped: now,
            last_scraped: now,
            scraped_count: 1,
            imported: ImportInfo::default(),
            click_count: 0,
            email_capture_count: 0,
        }
    }

    /// Overwrite the content-bearing fields from a re-scraped candidate.
    /// Status, change log, and scrape metadata are the synchronizer's call.
    pub fn apply_content(&mut self, candidate: &CandidateEvent) {
        self.title = candidate.title.clone();
        self.description = candidate.description.clone();
        self.start_date = candidate.start_date;
        self.end_date = candidate.end_date;
        self.venue = candidate.venue.clone();
        self.category = candidate.category;
        self.tags = candidate.tags.clone();
        self.image_url = candidate.image_url.clone();
        self.price = candidate.price.clone();
    }

    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        self.start_date < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            EventStatus::New,
            EventStatus::Updated,
            EventStatus::Inactive,
            EventStatus::Imported,
        ] {
            assert_eq!(EventStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(EventStatus::parse("archived"), None);
    }

    #[test]
    fn first_sighting_record_starts_new() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).single().unwrap();
        let candidate = CandidateEvent {
            title: "Jazz Night".to_string(),
            description: "Live jazz".to_string(),
            start_date: now,
            end_date: None,
            venue: Venue::tba(),
            category: Category::Music,
            tags: vec!["music".to_string()],
            image_url: String::new(),
            price: Price::free(),
            source: EventSource {
                name: "eventbrite".to_string(),
                url: "https://example.com/e/jazz".to_string(),
                external_id: "jazz".to_string(),
            },
        };

        let event = PersistedEvent::from_candidate(&candidate, "abc".to_string(), now);
        assert_eq!(event.status, EventStatus::New);
        assert_eq!(event.scraped_count, 1);
        assert_eq!(event.first_scraped, event.last_scraped);
        assert!(event.change_log.is_empty());
        assert!(!event.imported.status);
    }
}
