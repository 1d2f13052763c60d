//! Seed data script - populates the database with demo chapters
//!
//! Run with: cargo run --bin seed-data
//!
//! Chapters that already exist are left alone, so the script can be re-run.

use std::sync::Arc;

use sea_orm_migration::MigratorTrait;
use tracing::{info, warn};

use kappa_marketplace::{
    config,
    db,
    entities::chapter::ChapterType,
    errors::ServiceError,
    events,
    migrator::Migrator,
    services::chapters::{ChapterService, CreateChapterRequest},
};

struct SeedChapter {
    name: &'static str,
    chapter_type: ChapterType,
    province: &'static str,
    city: &'static str,
    state: &'static str,
}

const CHAPTERS: &[SeedChapter] = &[
    SeedChapter {
        name: "Alpha",
        chapter_type: ChapterType::Collegiate,
        province: "Middle Western",
        city: "Bloomington",
        state: "IN",
    },
    SeedChapter {
        name: "Beta",
        chapter_type: ChapterType::Collegiate,
        province: "Middle Western",
        city: "Lincoln",
        state: "NE",
    },
    SeedChapter {
        name: "Atlanta Alumni",
        chapter_type: ChapterType::Alumni,
        province: "Southern",
        city: "Atlanta",
        state: "GA",
    },
    SeedChapter {
        name: "Los Angeles Alumni",
        chapter_type: ChapterType::Alumni,
        province: "Western",
        city: "Los Angeles",
        state: "CA",
    },
    SeedChapter {
        name: "Houston Alumni",
        chapter_type: ChapterType::Alumni,
        province: "Southwestern",
        city: "Houston",
        state: "TX",
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("=== Kappa Marketplace Seed Data ===");

    let cfg = config::load_config()?;
    let pool = Arc::new(db::establish_connection_from_app_config(&cfg).await?);
    Migrator::up(&*pool, None).await?;

    let (event_sender, event_rx) = events::channel(cfg.event_channel_capacity);
    tokio::spawn(events::process_events(event_rx));
    let chapters = ChapterService::new(pool.clone(), Arc::new(event_sender));

    let mut created = 0;
    for seed in CHAPTERS {
        let request = CreateChapterRequest {
            name: seed.name.to_string(),
            chapter_type: seed.chapter_type,
            province: seed.province.to_string(),
            city: seed.city.to_string(),
            state: seed.state.to_string(),
            contact_email: None,
            stripe_account_id: None,
            social_links: None,
        };
        match chapters.create(request).await {
            Ok(chapter) => {
                info!("  Created chapter {} ({})", chapter.name, chapter.id);
                created += 1;
            }
            Err(ServiceError::Conflict(_)) => info!("  Chapter {} already exists", seed.name),
            Err(e) => warn!("  Could not create chapter {}: {}", seed.name, e),
        }
    }

    info!("Seeded {} chapters", created);
    Ok(())
}
