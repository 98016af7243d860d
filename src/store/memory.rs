//! In-process store implementing both store traits.
//!
//! Backs the integration tests and lets the HTTP layer run without a
//! database. Upserts are applied under a single write lock, which gives the
//! same all-or-nothing batch semantics as the Postgres transaction.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{TokenStore, VehicleStore};
use crate::models::token::MeliToken;
use crate::models::vehicle::VehicleRecord;

#[derive(Default)]
pub struct MemoryStore {
    tokens: RwLock<HashMap<String, MeliToken>>,
    vehicles: RwLock<HashMap<String, VehicleRecord>>,
    token_saves: AtomicUsize,
    upsert_calls: AtomicUsize,
    fail_upserts: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a credential without counting it as a save.
    pub async fn with_token(self, id: &str, token: MeliToken) -> Self {
        self.tokens.write().await.insert(id.to_string(), token);
        self
    }

    /// Number of `save_token` calls so far.
    pub fn token_saves(&self) -> usize {
        self.token_saves.load(Ordering::SeqCst)
    }

    /// Number of `upsert_vehicles` calls so far, failed ones included.
    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    /// Make every following upsert fail without touching stored rows.
    pub fn fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn load_token(&self, id: &str) -> anyhow::Result<Option<MeliToken>> {
        Ok(self.tokens.read().await.get(id).cloned())
    }

    async fn save_token(&self, id: &str, token: &MeliToken) -> anyhow::Result<()> {
        self.tokens
            .write()
            .await
            .insert(id.to_string(), token.clone());
        self.token_saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl VehicleStore for MemoryStore {
    async fn upsert_vehicles(&self, vehicles: &[VehicleRecord]) -> anyhow::Result<u64> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upserts.load(Ordering::SeqCst) {
            anyhow::bail!("simulated store outage");
        }

        let mut rows = self.vehicles.write().await;
        for v in vehicles {
            rows.insert(v.external_id.clone(), v.clone());
        }
        Ok(vehicles.len() as u64)
    }

    async fn list_vehicles(&self) -> anyhow::Result<Vec<VehicleRecord>> {
        let mut rows: Vec<VehicleRecord> = self.vehicles.read().await.values().cloned().collect();
        rows.sort_by(|a, b| match (a.price, b.price) {
            (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.external_id.cmp(&b.external_id)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.external_id.cmp(&b.external_id),
        });
        Ok(rows)
    }

    async fn get_vehicle_by_slug(&self, slug: &str) -> anyhow::Result<Option<VehicleRecord>> {
        Ok(self
            .vehicles
            .read()
            .await
            .values()
            .find(|v| v.slug == slug)
            .cloned())
    }

    async fn count_vehicles(&self) -> anyhow::Result<i64> {
        Ok(self.vehicles.read().await.len() as i64)
    }
}
