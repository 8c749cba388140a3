// src/provider.rs
//
// Integration with the third-party fitness service (OAuth2 authorization-
// code flow). The provider's client secret never reaches this client: the
// redirect `code` is exchanged through a serverless proxy, which also
// handles refreshes. A failed refresh means the stored link is gone
// server-side, so the caller clears it and reports "disconnected".
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ProviderConfig;

/// Access tokens are refreshed once within this margin of expiry.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider integration is not configured. Set [provider] client_id and proxy_url.")]
    NotConfigured,
    #[error("Provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Provider returned error: {status} - {message}")]
    Status { status: u16, message: String },
    #[error("Provider token refresh failed; integration disconnected.")]
    Disconnected,
}

/// The locally held token pair for one connected provider account.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProviderLink {
    pub provider: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl ProviderLink {
    /// Whether the access token is still usable without a refresh.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) < self.expires_at
    }
}

/// Token payload returned by the proxy's exchange and refresh endpoints.
#[derive(Deserialize, Debug)]
struct ProxyTokenResponse {
    provider: String,
    access_token: String,
    refresh_token: String,
    /// Unix seconds.
    expires_at: i64,
}

/// Structured error body the proxy returns on failure.
#[derive(Deserialize, Debug)]
struct ProxyErrorBody {
    error: String,
}

/// A summary of one recorded activity, used for heart-rate correlation.
#[derive(Deserialize, Debug, Clone)]
pub struct ProviderActivity {
    pub id: u64,
    pub name: String,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub elapsed_time: i64,
}

#[derive(Deserialize, Debug)]
struct HeartRateStream {
    #[serde(default)]
    data: Vec<u32>,
}

pub struct ProviderClient {
    http_client: Client,
    config: ProviderConfig,
}

impl ProviderClient {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            http_client: Client::new(),
            config,
        }
    }

    /// Builds the provider authorize URL the user is sent to.
    /// # Errors
    /// Returns `ProviderError::NotConfigured` without a client id.
    pub fn authorize_url(&self) -> Result<String, ProviderError> {
        let client_id = self
            .config
            .client_id
            .as_deref()
            .ok_or(ProviderError::NotConfigured)?;
        Ok(format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}",
            self.config.authorize_url,
            urlencoding::encode(client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(&self.config.scopes),
        ))
    }

    /// Exchanges the redirect `code` for a token pair through the proxy.
    /// # Errors
    /// Returns `ProviderError` if unconfigured, or on network/proxy failure.
    pub async fn exchange_code(
        &self,
        user_token: &str,
        code: &str,
    ) -> Result<ProviderLink, ProviderError> {
        let proxy = self.proxy_url()?;
        let response = self
            .http_client
            .post(format!("{proxy}/token/exchange"))
            .bearer_auth(user_token)
            .json(&serde_json::json!({ "code": code }))
            .send()
            .await?;
        let tokens = Self::check_proxy_response(response).await?;
        info!("Connected provider '{}'", tokens.provider);
        Ok(Self::link_from(tokens))
    }

    /// Returns a link holding a currently valid access token, refreshing
    /// through the proxy when within 5 minutes of expiry. The caller
    /// persists the returned link if it changed.
    /// # Errors
    /// Returns `ProviderError::Disconnected` when the refresh fails; the
    /// caller must clear the stored link.
    pub async fn valid_link(
        &self,
        user_token: &str,
        link: &ProviderLink,
        now: DateTime<Utc>,
    ) -> Result<ProviderLink, ProviderError> {
        if link.is_fresh(now) {
            return Ok(link.clone());
        }
        self.refresh(user_token).await.map_err(|e| {
            warn!("Token refresh for '{}' failed: {e}", link.provider);
            ProviderError::Disconnected
        })
    }

    async fn refresh(&self, user_token: &str) -> Result<ProviderLink, ProviderError> {
        let proxy = self.proxy_url()?;
        let response = self
            .http_client
            .post(format!("{proxy}/token/refresh"))
            .bearer_auth(user_token)
            .send()
            .await?;
        let tokens = Self::check_proxy_response(response).await?;
        Ok(Self::link_from(tokens))
    }

    /// Lists the user's recent provider activities.
    /// # Errors
    /// Returns `ProviderError` on network failure or a non-success status.
    pub async fn list_activities(
        &self,
        access_token: &str,
    ) -> Result<Vec<ProviderActivity>, ProviderError> {
        let url = format!("{}/athlete/activities", self.config.api_url);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await?;
        Self::check_api_response(response).await
    }

    /// Fetches the per-second heart-rate stream for one activity.
    /// # Errors
    /// Returns `ProviderError` on network failure or a non-success status.
    pub async fn heart_rate_stream(
        &self,
        access_token: &str,
        activity_id: u64,
    ) -> Result<Vec<u32>, ProviderError> {
        let url = format!(
            "{}/activities/{activity_id}/streams/heartrate",
            self.config.api_url
        );
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await?;
        let stream: HeartRateStream = Self::check_api_response(response).await?;
        Ok(stream.data)
    }

    fn proxy_url(&self) -> Result<&str, ProviderError> {
        self.config
            .proxy_url
            .as_deref()
            .ok_or(ProviderError::NotConfigured)
    }

    fn link_from(tokens: ProxyTokenResponse) -> ProviderLink {
        ProviderLink {
            provider: tokens.provider,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at: DateTime::from_timestamp(tokens.expires_at, 0).unwrap_or_default(),
        }
    }

    async fn check_proxy_response(
        response: reqwest::Response,
    ) -> Result<ProxyTokenResponse, ProviderError> {
        if response.status().is_success() {
            return Ok(response.json().await?);
        }
        let status = response.status().as_u16();
        let message = match response.json::<ProxyErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => "Could not read error body".to_string(),
        };
        Err(ProviderError::Status { status, message })
    }

    async fn check_api_response<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        if response.status().is_success() {
            return Ok(response.json().await?);
        }
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        Err(ProviderError::Status { status, message })
    }
}
