// src/sync.rs
//
// Reconciles one local collection with its remote counterpart, once per
// sign-in. Push-then-pull: every local entity is rewritten remotely (no
// dirty tracking), then remote-only entities are appended to the local
// collection. Local entities always win on id collision; remote never
// updates an existing local entity.
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::models::HasId;
use crate::remote::{Collection, RemoteRow, RemoteStore};

/// Explicit session context created on sign-in and passed to every sync
/// call; torn down on sign-out. There is no implicit global session.
#[derive(Debug, Clone)]
pub struct SyncSession {
    pub user_id: String,
}

impl SyncSession {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Local-wins merge: the full local collection, then any remote entity
/// whose id is absent locally. Remote copies of overlapping ids are
/// discarded, differing payload or not.
pub fn merge_by_id<T: HasId + Clone>(local: &[T], remote: Vec<T>) -> Vec<T> {
    let mut merged: Vec<T> = local.to_vec();
    for entity in remote {
        if !local.iter().any(|l| l.entity_id() == entity.entity_id()) {
            merged.push(entity);
        }
    }
    merged
}

/// Runs one push-then-pull round for a collection and returns the merged
/// result. A fetch failure makes the whole sync a no-op for this
/// collection; individual write failures are logged and dropped (the next
/// sign-in re-pushes everything anyway).
pub async fn sync_collection<T>(
    remote: &RemoteStore,
    session: &SyncSession,
    collection: Collection,
    local: &[T],
) -> Vec<T>
where
    T: HasId + Clone + Serialize + DeserializeOwned,
{
    let rows = match remote.fetch_all(collection, &session.user_id).await {
        Ok(rows) => rows,
        Err(e) => {
            warn!(
                "Skipping sync of '{}': fetch failed: {e}",
                collection.table()
            );
            return local.to_vec();
        }
    };

    let rows_by_entity_id: HashMap<String, &RemoteRow> = rows
        .iter()
        .filter_map(|row| row.entity_id().map(|id| (id, row)))
        .collect();

    // Unconditional push of every local entity, update or insert decided
    // by the entity-id correspondence.
    for entity in local {
        let data = match serde_json::to_value(entity) {
            Ok(v) => v,
            Err(e) => {
                warn!("Could not serialize entity {}: {e}", entity.entity_id());
                continue;
            }
        };
        let row_id = rows_by_entity_id
            .get(entity.entity_id())
            .map(|row| row.id.as_str());
        if let Err(e) = remote
            .upsert(collection, &session.user_id, row_id, &data)
            .await
        {
            warn!(
                "Dropping remote write for entity {}: {e}",
                entity.entity_id()
            );
        }
    }

    // Pull: remote-only entities join the local collection. Rows whose
    // payload no longer deserializes are skipped, not fatal.
    let remote_entities: Vec<T> = rows
        .into_iter()
        .filter_map(|row| match serde_json::from_value(row.data.clone()) {
            Ok(entity) => Some(entity),
            Err(e) => {
                warn!("Skipping unreadable remote row {}: {e}", row.id);
                None
            }
        })
        .collect();

    let merged = merge_by_id(local, remote_entities);
    info!(
        "Synced '{}': {} local, {} merged",
        collection.table(),
        local.len(),
        merged.len()
    );
    merged
}
