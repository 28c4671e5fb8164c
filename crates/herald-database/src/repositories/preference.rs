//! PostgreSQL preference source.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use herald_core::error::{AppError, ErrorKind};
use herald_core::result::AppResult;
use herald_core::types::UserId;

use crate::store::PreferenceSource;

/// Reads `users.notification_preferences`.
#[derive(Debug, Clone)]
pub struct PgPreferenceSource {
    pool: PgPool,
}

impl PgPreferenceSource {
    /// Create a new preference source.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PreferenceSource for PgPreferenceSource {
    async fn get_preferences(&self, user_id: UserId) -> AppResult<Option<BTreeMap<String, bool>>> {
        let raw: Option<Option<serde_json::Value>> =
            sqlx::query_scalar("SELECT notification_preferences FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to load preferences", e)
                })?;

        match raw.flatten() {
            Some(value) => decode_channel_map(&value).map(Some),
            None => Ok(None),
        }
    }
}

/// Keep only boolean entries of a JSON preference object.
pub(crate) fn decode_channel_map(value: &serde_json::Value) -> AppResult<BTreeMap<String, bool>> {
    let object = value.as_object().ok_or_else(|| {
        AppError::preference(format!("Preference document is not an object: {value}"))
    })?;

    let mut channels = BTreeMap::new();
    for (name, flag) in object {
        match flag.as_bool() {
            Some(enabled) => {
                channels.insert(name.clone(), enabled);
            }
            None => debug!(channel = %name, "Ignoring non-boolean preference entry"),
        }
    }
    Ok(channels)
}
