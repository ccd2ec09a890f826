//! Model catalog: curated registry enriched with live listing data.
//!
//! The curated registry decides which models exist and what roles they
//! play; the live listing refreshes display names, pricing, and context
//! lengths. Live data is cached for an hour and served stale when a
//! refresh fails.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use council_domain::{Model, ModelRegistry};
use tokio::sync::Mutex;
use tracing::debug;

use super::protocol::LiveModel;

const CACHE_TTL: Duration = Duration::from_secs(3600);

struct CacheEntry {
    fetched_at: Instant,
    live: Vec<LiveModel>,
}

/// Curated registry plus a TTL cache of the live listing.
pub struct ModelCatalog {
    curated: Arc<ModelRegistry>,
    cache: Mutex<Option<CacheEntry>>,
}

impl ModelCatalog {
    pub fn new(curated: Arc<ModelRegistry>) -> Self {
        Self {
            curated,
            cache: Mutex::new(None),
        }
    }

    /// Live listing if a fresh cache entry exists.
    pub async fn cached_live(&self) -> Option<Vec<LiveModel>> {
        let cache = self.cache.lock().await;
        cache
            .as_ref()
            .filter(|entry| entry.fetched_at.elapsed() < CACHE_TTL)
            .map(|entry| entry.live.clone())
    }

    /// Live listing regardless of age (fallback after a failed refresh).
    pub async fn stale_live(&self) -> Option<Vec<LiveModel>> {
        let cache = self.cache.lock().await;
        cache.as_ref().map(|entry| {
            debug!("using stale model listing after fetch failure");
            entry.live.clone()
        })
    }

    pub async fn store_live(&self, live: Vec<LiveModel>) {
        let mut cache = self.cache.lock().await;
        *cache = Some(CacheEntry {
            fetched_at: Instant::now(),
            live,
        });
    }

    /// Merge curated models with live data.
    ///
    /// Curated entries keep capabilities/role/tier; live data supplies
    /// name, pricing, and context length. With a listing present,
    /// `available` reflects membership; without one, curated models are
    /// assumed available.
    pub fn merge(&self, live: Option<&[LiveModel]>) -> Vec<Model> {
        let live_by_id: Option<HashMap<&str, &LiveModel>> = live.map(|models| {
            models
                .iter()
                .map(|m| (m.id.as_str(), m))
                .collect::<HashMap<_, _>>()
        });

        self.curated
            .iter()
            .map(|curated| {
                let mut model = curated.clone();
                match &live_by_id {
                    Some(map) => match map.get(curated.id.as_str()) {
                        Some(live) => {
                            if let Some(name) = &live.name {
                                model.name = name.clone();
                            }
                            if let Some(pricing) = live.pricing_per_million() {
                                model.pricing = pricing;
                            }
                            if let Some(context_length) = live.context_length {
                                model.context_length = context_length;
                            }
                            model.available = true;
                        }
                        None => {
                            model.available = false;
                        }
                    },
                    None => {
                        model.available = true;
                    }
                }
                model
            })
            .collect()
    }
}
