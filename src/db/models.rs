//! Database Models - structs representing database tables (used by sqlx/serde).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sqlx::FromRow;
use uuid::Uuid;

use crate::i18n::{Localizable, Translations};

/// Dashboard user
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Case study row
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseStudy {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub category: String,
    pub image: String,
    pub year: String,
    pub description: String,
    pub link: Option<String>,
    #[sqlx(rename = "sort_order")]
    pub order: i32,
    #[sqlx(json)]
    pub translations: Translations,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Localizable for CaseStudy {
    const LOCALIZED_FIELDS: &'static [&'static str] =
        &["title", "category", "image", "year", "description", "link"];
}

impl CaseStudy {
    /// Current base values of the localizable fields.
    pub fn base_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("title".into(), json!(self.title));
        fields.insert("category".into(), json!(self.category));
        fields.insert("image".into(), json!(self.image));
        fields.insert("year".into(), json!(self.year));
        fields.insert("description".into(), json!(self.description));
        if let Some(link) = &self.link {
            fields.insert("link".into(), json!(link));
        }
        fields
    }
}

/// New case study for insertion
#[derive(Debug, Clone, Default)]
pub struct NewCaseStudy {
    pub title: String,
    pub slug: String,
    pub category: String,
    pub image: String,
    pub year: String,
    pub description: String,
    pub link: Option<String>,
    pub order: i32,
    pub translations: Translations,
}

/// Testimonial row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
    pub id: Uuid,
    pub quote: String,
    pub author: String,
    pub role: String,
    pub city: String,
    #[sqlx(json)]
    pub metrics: Vec<String>,
    #[sqlx(rename = "sort_order")]
    pub order: i32,
    #[sqlx(json)]
    pub translations: Translations,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Localizable for Testimonial {
    const LOCALIZED_FIELDS: &'static [&'static str] = &["quote", "author", "role", "city", "metrics"];
}

impl Testimonial {
    pub fn base_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("quote".into(), json!(self.quote));
        fields.insert("author".into(), json!(self.author));
        fields.insert("role".into(), json!(self.role));
        fields.insert("city".into(), json!(self.city));
        fields.insert("metrics".into(), json!(self.metrics));
        fields
    }
}

/// Stat row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stat {
    pub id: Uuid,
    pub label: String,
    pub value: String,
    #[sqlx(rename = "sort_order")]
    pub order: i32,
    #[sqlx(json)]
    pub translations: Translations,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Localizable for Stat {
    const LOCALIZED_FIELDS: &'static [&'static str] = &["label", "value"];
}

impl Stat {
    pub fn base_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("label".into(), json!(self.label));
        fields.insert("value".into(), json!(self.value));
        fields
    }
}

/// Contact booking day with its free time slots
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactBooking {
    pub id: Uuid,
    pub day: String,
    pub date: String,
    #[sqlx(json)]
    pub slots: Vec<String>,
    #[sqlx(rename = "sort_order")]
    pub order: i32,
    #[sqlx(json)]
    pub translations: Translations,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Localizable for ContactBooking {
    const LOCALIZED_FIELDS: &'static [&'static str] = &["day", "date", "slots"];
}

impl ContactBooking {
    pub fn base_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("day".into(), json!(self.day));
        fields.insert("date".into(), json!(self.date));
        fields.insert("slots".into(), json!(self.slots));
        fields
    }
}

/// Singleton page section (hero, footer, ...)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSection {
    pub key: String,
    pub content: Value,
    #[sqlx(json)]
    pub translations: Translations,
    pub updated_at: DateTime<Utc>,
}

/// Newsletter subscription
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterSubscription {
    pub id: Uuid,
    pub email: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client-side error report persisted for the dashboard
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLog {
    pub id: Uuid,
    pub message: String,
    pub stack: Option<String>,
    pub context: Option<Value>,
    pub user_id: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}
