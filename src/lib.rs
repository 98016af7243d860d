//! Catalog sync: backend for the dealership site.
//!
//! Pulls active vehicle listings from the Mercado Libre marketplace, keeps the
//! OAuth credential that authorizes those calls fresh, and serves the stored
//! catalog over HTTP. The library crate is what integration tests in `tests/`
//! link against; the binary in `main.rs` only wires it together.

use std::sync::Arc;
use std::time::Duration;

pub mod api;
pub mod cli;
pub mod coerce;
pub mod config;
pub mod creditcar;
pub mod errors;
pub mod jobs;
pub mod meli;
pub mod middleware;
pub mod models;
pub mod store;

use meli::auth::TokenManager;
use meli::client::MeliClient;
use meli::sync::SyncOrchestrator;
use store::{TokenStore, VehicleStore};

/// Shared application state passed to handlers and middleware.
pub struct AppState {
    pub config: config::Config,
    pub tokens: Arc<TokenManager>,
    pub sync: Arc<SyncOrchestrator>,
    pub vehicles: Arc<dyn VehicleStore>,
    pub quotes: creditcar::QuoteClient,
}

impl AppState {
    /// Build the service graph around already-connected stores.
    ///
    /// The store handles are created once by the caller (Postgres in the
    /// binary, in-memory in tests) and shared by every component.
    pub fn new(
        config: config::Config,
        token_store: Arc<dyn TokenStore>,
        vehicle_store: Arc<dyn VehicleStore>,
    ) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.http_timeout_secs);
        let client = MeliClient::new(&config.meli_api_base, timeout)?;

        let tokens = Arc::new(TokenManager::new(
            token_store,
            client.clone(),
            config.oauth_settings(),
        ));
        let sync = Arc::new(SyncOrchestrator::new(
            tokens.clone(),
            client,
            vehicle_store.clone(),
            config.meli_user_id.clone(),
            config.sync_concurrency,
        ));
        let quotes = creditcar::QuoteClient::new(
            config.creditcar_api_url.clone(),
            config.creditcar_api_key.clone(),
            timeout,
        )?;

        Ok(Self {
            config,
            tokens,
            sync,
            vehicles: vehicle_store,
            quotes,
        })
    }
}
