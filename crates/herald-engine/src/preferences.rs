//! User channel preference resolution.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use herald_cache::{CacheManager, keys};
use herald_core::traits::CacheProvider;
use herald_core::types::UserId;
use herald_database::PreferenceSource;
use herald_entity::UserPreference;

/// Resolves a user's enabled channels through the preference cache.
///
/// Lookups never fail: when the upstream source errors, has no map for the
/// user, or returns something undecodable, the user is treated as having
/// only email enabled.
#[derive(Debug)]
pub struct PreferenceResolver {
    source: Arc<dyn PreferenceSource>,
    cache: CacheManager,
    ttl: Duration,
    refreshing: DashMap<UserId, Arc<Mutex<()>>>,
}

impl PreferenceResolver {
    /// Creates a resolver caching maps for `ttl`.
    pub fn new(source: Arc<dyn PreferenceSource>, cache: CacheManager, ttl: Duration) -> Self {
        Self {
            source,
            cache,
            ttl,
            refreshing: DashMap::new(),
        }
    }

    /// Returns the preferences of a user.
    pub async fn resolve(&self, user_id: UserId) -> UserPreference {
        let key = keys::user_prefs(user_id);
        if let Some(channels) = self.cached(&key).await {
            return UserPreference::new(user_id, channels);
        }

        // One upstream fetch per user at a time; latecomers re-read the cache.
        let lock = Arc::clone(self.refreshing.entry(user_id).or_default().value());
        let guard = lock.lock().await;

        let resolved = match self.cached(&key).await {
            Some(channels) => UserPreference::new(user_id, channels),
            None => self.fetch(user_id, &key).await,
        };

        drop(guard);
        self.refreshing.remove(&user_id);
        resolved
    }

    /// Drops the cached map of a user.
    pub async fn invalidate(&self, user_id: UserId) {
        if let Err(e) = self.cache.delete(&keys::user_prefs(user_id)).await {
            warn!(user_id = %user_id, error = %e, "Failed to invalidate cached preferences");
        }
    }

    async fn cached(&self, key: &str) -> Option<BTreeMap<String, bool>> {
        match self.cache.get_json::<BTreeMap<String, bool>>(key).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(key, error = %e, "Preference cache read failed");
                None
            }
        }
    }

    async fn fetch(&self, user_id: UserId, key: &str) -> UserPreference {
        let preference = match self.source.get_preferences(user_id).await {
            Ok(Some(channels)) => UserPreference::new(user_id, channels),
            Ok(None) => {
                debug!(user_id = %user_id, "No stored preferences, using default");
                UserPreference::fallback(user_id)
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Preference lookup failed, using default");
                return UserPreference::fallback(user_id);
            }
        };

        if let Err(e) = self.cache.set_json(key, &preference.channels, self.ttl).await {
            warn!(key, error = %e, "Preference cache write failed");
        }
        preference
    }
}
