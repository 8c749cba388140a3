// src/remote.rs
//
// Adapter for the hosted row store. Each row wraps a full JSON copy of a
// local entity under `data`; the server-assigned row id is distinct from
// the entity's own id, so correlation always goes through `data.id`.
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Remote request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server returned error: {status} - {body}")]
    Status { status: u16, body: String },
}

/// The three entity kinds mirrored to the row store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    History,
    Programs,
    Exercises,
}

impl Collection {
    pub const fn table(self) -> &'static str {
        match self {
            Self::History => "workout_history",
            Self::Programs => "programs",
            Self::Exercises => "custom_exercises",
        }
    }
}

/// One stored row, as returned by the server.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RemoteRow {
    pub id: String,
    pub user_id: String,
    pub data: Value,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RemoteRow {
    /// The wrapped entity's own id, string-coerced. Rows written by older
    /// clients may carry numeric ids.
    pub fn entity_id(&self) -> Option<String> {
        match self.data.get("id") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Serialize, Debug)]
struct NewRow<'a> {
    user_id: &'a str,
    data: &'a Value,
}

pub struct RemoteStore {
    http_client: Client,
    server_url: String,
    auth_token: Option<String>,
}

impl RemoteStore {
    pub fn new(server_url: String, auth_token: Option<String>) -> Self {
        Self {
            http_client: Client::new(),
            server_url,
            auth_token,
        }
    }

    fn rows_url(&self, collection: Collection) -> String {
        format!("{}/collections/{}/rows", self.server_url, collection.table())
    }

    fn with_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Returns all rows owned by the user for one collection.
    /// # Errors
    /// Returns `RemoteError` on network failure or a non-success status;
    /// the sync engine treats either as "collection unchanged".
    pub async fn fetch_all(
        &self,
        collection: Collection,
        user_id: &str,
    ) -> Result<Vec<RemoteRow>, RemoteError> {
        let url = self.rows_url(collection);
        debug!("Fetching rows from {url} for user {user_id}");
        let response = self
            .with_auth(self.http_client.get(&url).query(&[("user_id", user_id)]))
            .send()
            .await?;
        let rows: Vec<RemoteRow> = Self::check_response_json(response).await?;
        info!(
            "Fetched {} '{}' rows for user {user_id}",
            rows.len(),
            collection.table()
        );
        Ok(rows)
    }

    /// Writes one entity. When `row_id` is known this updates that row;
    /// otherwise the server assigns a fresh row id on insert.
    /// # Errors
    /// Returns `RemoteError` on network failure or a non-success status.
    pub async fn upsert(
        &self,
        collection: Collection,
        user_id: &str,
        row_id: Option<&str>,
        data: &Value,
    ) -> Result<(), RemoteError> {
        let response = match row_id {
            Some(id) => {
                let url = format!("{}/{id}", self.rows_url(collection));
                debug!("Updating row {id} in '{}'", collection.table());
                self.with_auth(self.http_client.put(&url))
                    .json(&NewRow { user_id, data })
                    .send()
                    .await?
            }
            None => {
                let url = self.rows_url(collection);
                debug!("Inserting new row into '{}'", collection.table());
                self.with_auth(self.http_client.post(&url))
                    .json(&NewRow { user_id, data })
                    .send()
                    .await?
            }
        };
        Self::check_response(response).await
    }

    /// Writes one entity, correlating by `data.id`: an existing row for
    /// the same entity is updated in place, otherwise a new row is
    /// inserted. Used for one-off pushes where no row map is at hand.
    /// # Errors
    /// Returns `RemoteError` on network failure or a non-success status.
    pub async fn upsert_entity(
        &self,
        collection: Collection,
        user_id: &str,
        entity_id: &str,
        data: &Value,
    ) -> Result<(), RemoteError> {
        let rows = self.fetch_all(collection, user_id).await?;
        let row_id = rows
            .iter()
            .find(|r| r.entity_id().as_deref() == Some(entity_id))
            .map(|r| r.id.clone());
        self.upsert(collection, user_id, row_id.as_deref(), data)
            .await
    }

    /// Removes the row whose `data.id` matches the entity id. Deleting a
    /// non-existent row is not an error.
    /// # Errors
    /// Returns `RemoteError` on network failure or a non-success status.
    pub async fn delete(
        &self,
        collection: Collection,
        user_id: &str,
        entity_id: &str,
    ) -> Result<(), RemoteError> {
        let rows = self.fetch_all(collection, user_id).await?;
        let Some(row) = rows
            .iter()
            .find(|r| r.entity_id().as_deref() == Some(entity_id))
        else {
            debug!(
                "No '{}' row matches entity {entity_id}; nothing to delete",
                collection.table()
            );
            return Ok(());
        };
        let url = format!("{}/{}", self.rows_url(collection), row.id);
        let response = self.with_auth(self.http_client.delete(&url)).send().await?;
        Self::check_response(response).await
    }

    async fn check_response(response: reqwest::Response) -> Result<(), RemoteError> {
        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Could not read error body".to_string());
        error!("Remote request failed with status {status}: {body}");
        Err(RemoteError::Status { status, body })
    }

    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, RemoteError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error body".to_string());
            error!("Remote request failed with status {status}: {body}");
            return Err(RemoteError::Status { status, body });
        }
        Ok(response.json().await?)
    }
}
