//! Sync orchestrator: token → active ids → item details → one batched upsert.
//!
//! Item-level failures are collected and reported, never raised. Token,
//! listing and store failures abort the run; the store write is a single
//! atomic batch so a failed run publishes nothing.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use super::auth::TokenManager;
use super::client::MeliClient;
use super::normalize::normalize;
use crate::errors::SyncError;
use crate::models::vehicle::{slug_for, VehicleRecord};
use crate::store::VehicleStore;

/// One listing that could not be fetched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemFailure {
    pub item_id: String,
    pub error: String,
}

/// Outcome of a sync run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    /// Rows written to the vehicle store.
    pub count: u64,
    pub failures: Vec<ItemFailure>,
}

pub struct SyncOrchestrator {
    tokens: Arc<TokenManager>,
    client: MeliClient,
    vehicles: Arc<dyn VehicleStore>,
    seller_id: Option<String>,
    concurrency: usize,
}

impl SyncOrchestrator {
    pub fn new(
        tokens: Arc<TokenManager>,
        client: MeliClient,
        vehicles: Arc<dyn VehicleStore>,
        seller_id: Option<String>,
        concurrency: usize,
    ) -> Self {
        Self {
            tokens,
            client,
            vehicles,
            seller_id,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn run_sync(&self) -> Result<SyncReport, SyncError> {
        let seller_id = self
            .seller_id
            .as_deref()
            .ok_or_else(|| SyncError::config("MELI_USER_ID is not set"))?;

        let access_token = self.tokens.access_token().await?;
        let item_ids = self
            .client
            .list_active_item_ids(seller_id, &access_token)
            .await?;

        if item_ids.is_empty() {
            tracing::info!(seller_id, "no active listings found");
            return Ok(SyncReport::default());
        }
        tracing::info!(seller_id, items = item_ids.len(), "fetching active listings");

        let (vehicles, failures) = self.fetch_all(&item_ids, &access_token).await;
        let vehicles = dedupe_by_external_id(vehicles);

        if vehicles.is_empty() {
            tracing::warn!(failed = failures.len(), "every listing failed, nothing to store");
            return Ok(SyncReport { count: 0, failures });
        }

        let count = self
            .vehicles
            .upsert_vehicles(&vehicles)
            .await
            .map_err(SyncError::Store)?;

        tracing::info!(count, failed = failures.len(), "listing sync finished");
        Ok(SyncReport { count, failures })
    }

    /// Fetch and normalize every id, at most `concurrency` requests in flight.
    /// Results keep the order of `item_ids`.
    async fn fetch_all(
        &self,
        item_ids: &[String],
        access_token: &str,
    ) -> (Vec<VehicleRecord>, Vec<ItemFailure>) {
        let results: Vec<(String, Result<VehicleRecord, SyncError>)> =
            stream::iter(item_ids.iter().cloned())
                .map(|item_id| async move {
                    let result = self.fetch_vehicle(&item_id, access_token).await;
                    (item_id, result)
                })
                .buffered(self.concurrency)
                .collect()
                .await;

        let mut vehicles = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for (item_id, result) in results {
            match result {
                Ok(vehicle) => vehicles.push(vehicle),
                Err(e) => {
                    tracing::warn!(item_id = %item_id, error = %e, "skipping listing");
                    failures.push(ItemFailure {
                        item_id,
                        error: e.to_string(),
                    });
                }
            }
        }
        (vehicles, failures)
    }

    async fn fetch_vehicle(
        &self,
        item_id: &str,
        access_token: &str,
    ) -> Result<VehicleRecord, SyncError> {
        let raw = self.client.get_item(item_id, access_token).await?;
        let mut vehicle = normalize(&raw);
        // The detail endpoint is addressed by id, so it stands in when the body omits one.
        if vehicle.external_id.is_empty() {
            vehicle.external_id = item_id.to_string();
            vehicle.slug = slug_for(item_id);
        }
        Ok(vehicle)
    }
}

/// Collapse repeated ids to their last occurrence, keeping first-seen order.
/// A single upsert statement must not touch the same key twice.
fn dedupe_by_external_id(vehicles: Vec<VehicleRecord>) -> Vec<VehicleRecord> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(vehicles.len());
    let mut unique: Vec<VehicleRecord> = Vec::with_capacity(vehicles.len());
    for vehicle in vehicles {
        match index.get(&vehicle.external_id) {
            Some(&pos) => unique[pos] = vehicle,
            None => {
                index.insert(vehicle.external_id.clone(), unique.len());
                unique.push(vehicle);
            }
        }
    }
    unique
}
