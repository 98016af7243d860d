/// HTTP client for the Mercado Libre items and OAuth APIs.
///
/// Every call carries the client-wide timeout. Nothing here retries: a failed
/// call surfaces as a typed `SyncError` and the next sync run tries again.
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::errors::SyncError;
use crate::models::item::RawItem;

pub const DEFAULT_API_BASE: &str = "https://api.mercadolibre.com";

/// Successful answer of `POST /oauth/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Absent when the marketplace does not rotate the refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of `access_token` in seconds.
    pub expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct ItemSearch {
    #[serde(default)]
    results: Vec<String>,
}

#[derive(Clone)]
pub struct MeliClient {
    http: reqwest::Client,
    base_url: String,
}

impl MeliClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("catalog-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build marketplace HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Trade a refresh token for a new token pair (`grant_type=refresh_token`).
    pub async fn exchange_refresh_token(
        &self,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<TokenGrant, SyncError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
        ];

        let resp = self
            .http
            .post(format!("{}/oauth/token", self.base_url))
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "marketplace token refresh rejected");
            return Err(SyncError::UpstreamAuth {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.json::<TokenGrant>().await?)
    }

    /// Ids of the seller's active listings, in marketplace order. An empty
    /// list is a valid answer.
    pub async fn list_active_item_ids(
        &self,
        seller_id: &str,
        access_token: &str,
    ) -> Result<Vec<String>, SyncError> {
        let url = format!(
            "{}/users/{}/items/search",
            self.base_url,
            urlencoding::encode(seller_id)
        );

        let resp = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .query(&[("status", "active")])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(seller_id, status = %status, body = %body, "failed to list active items");
            return Err(SyncError::UpstreamListing {
                seller_id: seller_id.to_string(),
                status: status.as_u16(),
            });
        }

        let search: ItemSearch = resp.json().await?;
        Ok(search.results)
    }

    /// Full detail record of one item.
    pub async fn get_item(&self, item_id: &str, access_token: &str) -> Result<RawItem, SyncError> {
        let url = format!("{}/items/{}", self.base_url, urlencoding::encode(item_id));

        let resp = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(item_id, status = %status, body = %body, "failed to fetch item");
            return Err(SyncError::UpstreamItem {
                item_id: item_id.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(resp.json::<RawItem>().await?)
    }
}
