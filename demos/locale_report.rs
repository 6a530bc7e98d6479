//! Locale Report Demo
//!
//! Registers a few resource keys against an in-memory knowledge base and
//! prints how well each language is covered.
//!
//! Usage:
//!   cargo run --example locale_report
//!
//! Environment variables:
//!   RUST_LOG   - log filter (default: info)
//!   THRESHOLD  - minimum coverage for available locales (default: 0.5)

use futures::FutureExt;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wikibase_context::{Entity, EntityId, FnFetcher, Wikibase, WikibaseConfig};

fn knowledge_base() -> anyhow::Result<HashMap<EntityId, Entity>> {
    let human = Entity::item(EntityId::new("Q5")?);
    let earth = Entity::item(EntityId::new("Q2")?)
        .with_label("de", "Erde")
        .with_label("de-ch", "Erde")
        .with_label("en", "earth")
        .with_description("en", "third planet from the Sun");
    let cat = Entity::item(EntityId::new("Q146")?)
        .with_label("de", "Hauskatze")
        .with_label("en", "house cat");

    Ok([human, earth, cat]
        .into_iter()
        .map(|entity| (entity.id.clone(), entity))
        .collect())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let threshold: f64 = std::env::var("THRESHOLD")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(0.5);

    info!("=== Locale Report Demo ===");

    let entities = Arc::new(knowledge_base()?);
    let fetcher = FnFetcher::new(move |ids: Vec<EntityId>, options| {
        let entities = Arc::clone(&entities);
        async move {
            info!("Upstream request as {:?} for {:?}", options.user_agent, ids);
            let found = ids
                .iter()
                .filter_map(|id| entities.get(id).map(|entity| (id.clone(), entity.clone())))
                .collect::<HashMap<_, _>>();
            Ok::<_, wikibase_context::WikibaseError>(found)
        }
        .boxed()
    });

    let config = WikibaseConfig::builder()
        .log_queried_entity_ids(true)
        .available_locales_threshold(threshold)
        .build();
    let wikibase = Arc::new(Wikibase::new(Arc::new(fetcher), config)?);

    wikibase
        .add_resource_keys([("human", "Q5"), ("earth", "Q2"), ("cat", "Q146")])
        .await?;

    info!("\n--- Labels ---");
    for key in wikibase.resource_keys().keys().await {
        let reader = wikibase.reader(&key, "de-ch").await?;
        info!("{:<6} -> {} ({})", key, reader.label(), reader.id());
    }

    info!("\n--- Locale progress ---");
    for (language, progress) in wikibase.all_locale_progress().await? {
        info!("{:<6} {:>5.1}%", language, progress * 100.0);
    }

    info!("\n--- Available locales (> {}) ---", threshold);
    info!("{:?}", wikibase.available_locales(None).await?);

    info!("\n--- Cache ---");
    info!("{}", wikibase.cache().stats().await);

    Ok(())
}
