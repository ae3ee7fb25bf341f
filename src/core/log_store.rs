// src/core/log_store.rs
//! Rolling logs persisted as JSON lists in the options table.

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};

use crate::app_log;
use crate::core::database::Datastore;
use crate::types::logs::{RollingLog, Timestamped};

/// Stored log under `key`; a missing or unreadable value starts a fresh one.
pub async fn load_log<T>(datastore: &dyn Datastore, key: &str) -> Result<RollingLog<T>>
where
    T: Timestamped + DeserializeOwned,
{
    let Some(raw) = datastore.load_option(key).await? else {
        return Ok(RollingLog::default());
    };

    match serde_json::from_str(&raw) {
        Ok(log) => Ok(log),
        Err(e) => {
            app_log!(warn, "Discarding unreadable log {}: {}", key, e);
            Ok(RollingLog::default())
        }
    }
}

pub async fn save_log<T>(datastore: &dyn Datastore, key: &str, log: &RollingLog<T>) -> Result<()>
where
    T: Serialize,
{
    let raw = serde_json::to_string(log).with_context(|| format!("Failed to encode log {}", key))?;
    datastore.save_option(key, &raw).await
}

/// Push one entry at the head of the log stored under `key`.
pub async fn append_log<T>(datastore: &dyn Datastore, key: &str, entry: T) -> Result<()>
where
    T: Timestamped + Serialize + DeserializeOwned,
{
    let mut log = load_log::<T>(datastore, key).await?;
    log.push(entry);
    save_log(datastore, key, &log).await
}
