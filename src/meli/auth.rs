//! OAuth token lifecycle for the marketplace integration.
//!
//! The credential lives in the token store, never in process memory: every
//! call re-reads it and only talks to the OAuth endpoint when the stored
//! access token is missing or about to expire. Concurrent callers may both
//! refresh; the second write simply overwrites the first.

use std::sync::Arc;

use chrono::Utc;

use super::client::MeliClient;
use crate::errors::SyncError;
use crate::models::token::MeliToken;
use crate::store::{TokenStore, TOKEN_ROW_ID};

/// Lead time before expiry at which a token is treated as expired (5 minutes).
pub const SAFETY_MARGIN_MS: i64 = 5 * 60 * 1000;

/// Client credentials and the out-of-band bootstrap refresh token.
#[derive(Clone, Default)]
pub struct OAuthSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub bootstrap_refresh_token: Option<String>,
}

pub struct TokenManager {
    store: Arc<dyn TokenStore>,
    client: MeliClient,
    settings: OAuthSettings,
}

impl TokenManager {
    pub fn new(store: Arc<dyn TokenStore>, client: MeliClient, settings: OAuthSettings) -> Self {
        Self {
            store,
            client,
            settings,
        }
    }

    /// Return a credential whose access token is valid for at least the
    /// safety margin, refreshing and persisting it first if needed.
    pub async fn obtain_valid_token(&self) -> Result<MeliToken, SyncError> {
        let existing = self
            .store
            .load_token(TOKEN_ROW_ID)
            .await
            .map_err(SyncError::Store)?;

        let now = Utc::now().timestamp_millis();
        if let Some(token) = &existing {
            if token.is_fresh(now, SAFETY_MARGIN_MS) {
                tracing::debug!(expires_at = token.expires_at, "using stored marketplace token");
                return Ok(token.clone());
            }
        }

        let refresh_token = existing
            .as_ref()
            .map(|t| t.refresh_token.as_str())
            .filter(|t| !t.is_empty())
            .or(self.settings.bootstrap_refresh_token.as_deref())
            .ok_or_else(|| {
                SyncError::config("no refresh token available (neither stored nor MELI_REFRESH_TOKEN)")
            })?
            .to_string();

        let token = self.refresh(&refresh_token).await?;
        self.store
            .save_token(TOKEN_ROW_ID, &token)
            .await
            .map_err(SyncError::Store)?;

        tracing::info!(expires_at = token.expires_at, "marketplace token refreshed");
        Ok(token)
    }

    /// The persisted credential as is, without any refresh.
    pub async fn stored_token(&self) -> anyhow::Result<Option<MeliToken>> {
        self.store.load_token(TOKEN_ROW_ID).await
    }

    /// Shorthand for the bearer string of [`obtain_valid_token`](Self::obtain_valid_token).
    pub async fn access_token(&self) -> Result<String, SyncError> {
        Ok(self.obtain_valid_token().await?.access_token)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<MeliToken, SyncError> {
        let (client_id, client_secret) = match (
            self.settings.client_id.as_deref(),
            self.settings.client_secret.as_deref(),
        ) {
            (Some(id), Some(secret)) => (id, secret),
            _ => return Err(SyncError::config("MELI_APP_ID or MELI_APP_SECRET is not set")),
        };

        tracing::debug!(
            client_id,
            refresh_token = %mask(refresh_token),
            "refreshing marketplace token"
        );
        let grant = self
            .client
            .exchange_refresh_token(client_id, client_secret, refresh_token)
            .await?;

        let issued_at = Utc::now().timestamp_millis();
        Ok(MeliToken {
            access_token: grant.access_token,
            refresh_token: grant
                .refresh_token
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| refresh_token.to_string()),
            expires_at: issued_at.saturating_add(grant.expires_in.saturating_mul(1000)),
        })
    }
}

/// Last few characters only; never log a full secret.
fn mask(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 8 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("…{}", tail)
}
