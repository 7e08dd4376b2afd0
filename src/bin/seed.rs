//! Seeds an empty database with the site's starter content and an admin user.
//! Safe to re-run: existing rows are left alone.

use agency_cms_backend::content::case_studies::PgCaseStudyStore;
use agency_cms_backend::content::{CaseStudyInput, CaseStudyService, ContentError};
use agency_cms_backend::db;
use agency_cms_backend::i18n::Locale;
use agency_cms_backend::logging;
use agency_cms_backend::routes::sections::{default_content, SectionKey};
use serde_json::{json, Value};
use sqlx::{types::Json as SqlJson, PgPool};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
enum SeedError {
    #[error("DATABASE_URL is not set")]
    MissingDatabaseUrl,

    #[error("ADMIN_PASSWORD is not set")]
    MissingAdminPassword,

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error("failed to hash admin password: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("password hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

fn case_study(title: &str, slug: &str, category: &str, year: &str, description: &str) -> CaseStudyInput {
    CaseStudyInput {
        title: Some(title.to_string()),
        slug: Some(slug.to_string()),
        category: Some(category.to_string()),
        image: Some(format!("/uploads/case-studies/{slug}.jpg")),
        year: Some(year.to_string()),
        description: Some(description.to_string()),
        link: None,
        order: None,
    }
}

async fn seed_case_studies(service: &CaseStudyService) -> Result<(), SeedError> {
    let english = [
        case_study(
            "Lumina Fashion",
            "lumina-fashion",
            "E-commerce",
            "2024",
            "<p>A full rebrand and storefront rebuild for a regional fashion label.</p>",
        ),
        case_study(
            "Atlas Logistics",
            "atlas-logistics",
            "Web Design",
            "2023",
            "<p>Booking portal and brand system for a freight forwarder.</p>",
        ),
        case_study(
            "Noor Cafe",
            "noor-cafe",
            "Brand Identity",
            "2023",
            "<p>Identity, packaging and launch campaign for a specialty cafe.</p>",
        ),
    ];

    for input in english {
        let slug = input.slug.clone().unwrap_or_default();
        if service.resolve(&slug).await?.is_some() {
            tracing::info!(%slug, "case study already present, skipping");
            continue;
        }
        let created = service.create(input, Locale::En).await?;
        tracing::info!(id = %created.id, slug = %created.slug, "seeded case study");
    }

    // Same slug in another locale attaches a translation to the record.
    let arabic = case_study(
        "لومينا فاشن",
        "lumina-fashion",
        "تجارة إلكترونية",
        "2024",
        "<p>إعادة بناء كاملة للهوية والمتجر الإلكتروني لعلامة أزياء إقليمية.</p>",
    );
    service.create(arabic, Locale::Ar).await?;
    tracing::info!(slug = "lumina-fashion", locale = %Locale::Ar, "seeded translation");

    Ok(())
}

async fn table_is_empty(pool: &PgPool, table: &str) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await?;
    Ok(count == 0)
}

async fn seed_testimonials(pool: &PgPool) -> Result<(), SeedError> {
    if !table_is_empty(pool, "testimonials").await? {
        tracing::info!("testimonials already present, skipping");
        return Ok(());
    }

    let rows = [
        (
            "They understood our customers better than we did.",
            "Sara Al-Mansouri",
            "Founder, Lumina Fashion",
            "Dubai",
            json!(["+140% online revenue", "2.1x conversion rate"]),
        ),
        (
            "The new portal cut our booking time in half.",
            "Omar Haddad",
            "COO, Atlas Logistics",
            "Amman",
            json!(["-50% booking time"]),
        ),
    ];

    for (order, (quote, author, role, city, metrics)) in rows.into_iter().enumerate() {
        sqlx::query(
            "INSERT INTO testimonials (quote, author, role, city, metrics, sort_order) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(quote)
        .bind(author)
        .bind(role)
        .bind(city)
        .bind(SqlJson(metrics))
        .bind(order as i32)
        .execute(pool)
        .await?;
    }
    tracing::info!("seeded testimonials");
    Ok(())
}

async fn seed_stats(pool: &PgPool) -> Result<(), SeedError> {
    if !table_is_empty(pool, "stats").await? {
        tracing::info!("stats already present, skipping");
        return Ok(());
    }

    let rows = [
        ("Projects delivered", "120+"),
        ("Years in business", "9"),
        ("Client retention", "94%"),
    ];
    for (order, (label, value)) in rows.into_iter().enumerate() {
        sqlx::query("INSERT INTO stats (label, value, sort_order) VALUES ($1, $2, $3)")
            .bind(label)
            .bind(value)
            .bind(order as i32)
            .execute(pool)
            .await?;
    }
    tracing::info!("seeded stats");
    Ok(())
}

async fn seed_booking_slots(pool: &PgPool) -> Result<(), SeedError> {
    if !table_is_empty(pool, "contact_bookings").await? {
        tracing::info!("booking slots already present, skipping");
        return Ok(());
    }

    let rows = [
        ("Monday", "2026-11-02", json!(["10:00", "11:30", "15:00"])),
        ("Wednesday", "2026-11-04", json!(["09:30", "14:00"])),
        ("Thursday", "2026-11-05", json!(["12:00", "16:30"])),
    ];
    for (order, (day, date, slots)) in rows.into_iter().enumerate() {
        sqlx::query(
            "INSERT INTO contact_bookings (day, date, slots, sort_order) VALUES ($1, $2, $3, $4)",
        )
        .bind(day)
        .bind(date)
        .bind(SqlJson(slots))
        .bind(order as i32)
        .execute(pool)
        .await?;
    }
    tracing::info!("seeded booking slots");
    Ok(())
}

async fn seed_sections(pool: &PgPool) -> Result<(), SeedError> {
    for key in SectionKey::ALL.iter().copied() {
        let inserted = sqlx::query(
            "INSERT INTO content_sections (key, content, translations) VALUES ($1, $2, '{}') \
             ON CONFLICT (key) DO NOTHING",
        )
        .bind(key.as_str())
        .bind(SqlJson::<Value>(default_content(key)))
        .execute(pool)
        .await?
        .rows_affected();
        tracing::info!(section = key.as_str(), inserted = inserted > 0, "section seeded");
    }
    Ok(())
}

async fn seed_admin(pool: &PgPool) -> Result<(), SeedError> {
    let email = std::env::var("ADMIN_EMAIL")
        .unwrap_or_else(|_| "admin@example.com".to_string())
        .trim()
        .to_lowercase();
    let password = std::env::var("ADMIN_PASSWORD").map_err(|_| SeedError::MissingAdminPassword)?;

    let password_hash =
        tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST)).await??;

    let inserted = sqlx::query(
        "INSERT INTO users (email, password_hash, name, role) VALUES ($1, $2, 'Admin', 'admin') \
         ON CONFLICT (email) DO NOTHING",
    )
    .bind(&email)
    .bind(&password_hash)
    .execute(pool)
    .await?
    .rows_affected();

    if inserted > 0 {
        tracing::info!(%email, "admin user created");
    } else {
        tracing::info!(%email, "admin user already exists");
    }
    Ok(())
}

async fn seed() -> Result<(), SeedError> {
    if std::env::var("DATABASE_URL").is_err() {
        return Err(SeedError::MissingDatabaseUrl);
    }

    let pool = db::init_pool(None).await?;
    db::run_migrations(&pool).await?;

    let service = CaseStudyService::new(Arc::new(PgCaseStudyStore::new(pool.clone())));
    seed_case_studies(&service).await?;
    seed_testimonials(&pool).await?;
    seed_stats(&pool).await?;
    seed_booking_slots(&pool).await?;
    seed_sections(&pool).await?;
    seed_admin(&pool).await?;

    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let guards = logging::init();

    let result = seed().await;
    match &result {
        Ok(()) => tracing::info!("seed complete"),
        Err(e) => tracing::error!(error = %e, "seed failed"),
    }
    drop(guards);

    if let Err(e) = result {
        eprintln!("Seed failed: {}", e);
        std::process::exit(1);
    }
}
