use std::{collections::HashMap, sync::Arc, time::{Duration, Instant}};

use tokio::sync::RwLock;

use crate::configuration::CacheSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey{
    AllDishes,
    AllRestaurants
}

impl CacheKey {
    pub fn as_str(&self) -> &'static str{
        match self {
            CacheKey::AllDishes => "all_dishes",
            CacheKey::AllRestaurants => "all_restaurants"
        }
    }
}

struct CacheEntry{
    body: Arc<String>,
    expires_at: Instant
}

#[derive(Default)]
struct CacheState{
    entries: HashMap<CacheKey, CacheEntry>,
    // Bumped on every invalidation of a key
    generations: HashMap<CacheKey, u64>
}

/// Serialized response bodies shared across workers, expiring after a fixed
/// TTL and dropped early when the underlying rows change.
#[derive(Clone)]
pub struct ResponseCache{
    state: Arc<RwLock<CacheState>>,
    ttl: Duration
}

impl ResponseCache {
    pub fn new(settings: &CacheSettings) -> Self{
        Self::with_ttl(Duration::from_secs(settings.ttl_seconds))
    }

    pub fn with_ttl(ttl: Duration) -> Self{
        Self{
            state: Arc::new(RwLock::new(CacheState::default())),
            ttl
        }
    }

    /// The cached body, or the generation to hand back to `put` once the
    /// body has been loaded.
    pub async fn get(&self, key: CacheKey) -> Result<Arc<String>, u64>{
        let state = self.state.read().await;
        state.entries.get(&key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.body.clone())
            .ok_or_else(|| state.generations.get(&key).copied().unwrap_or(0))
    }

    /// Stores a body loaded at `generation`. Bodies loaded before a later
    /// invalidation are returned but not stored.
    pub async fn put(&self, key: CacheKey, body: String, generation: u64) -> Arc<String>{
        let body = Arc::new(body);
        let mut state = self.state.write().await;

        if state.generations.get(&key).copied().unwrap_or(0) == generation {
            state.entries.insert(key, CacheEntry{
                body: body.clone(),
                expires_at: Instant::now() + self.ttl
            });
        } else {
            tracing::info!(key = key.as_str(), "Listing changed while loading, not caching it");
        }
        body
    }

    #[tracing::instrument("Invalidating cached response", skip(self))]
    pub async fn invalidate(&self, key: CacheKey){
        let mut state = self.state.write().await;
        state.entries.remove(&key);
        *state.generations.entry(key).or_default() += 1;
    }
}
