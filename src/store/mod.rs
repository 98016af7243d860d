pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::models::token::MeliToken;
use crate::models::vehicle::VehicleRecord;

/// Key of the singleton credential row.
pub const TOKEN_ROW_ID: &str = "main";

/// Durable home of the marketplace OAuth credential.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load_token(&self, id: &str) -> anyhow::Result<Option<MeliToken>>;

    /// Insert or overwrite the credential stored under `id`.
    async fn save_token(&self, id: &str, token: &MeliToken) -> anyhow::Result<()>;
}

/// Storage for normalized vehicle rows.
/// Implementations: PgStore (PostgreSQL), MemoryStore (tests, local runs).
#[async_trait]
pub trait VehicleStore: Send + Sync {
    /// Insert-or-overwrite every row keyed by `external_id` as one atomic
    /// batch. Returns the number of rows written.
    async fn upsert_vehicles(&self, vehicles: &[VehicleRecord]) -> anyhow::Result<u64>;

    /// All stored vehicles, cheapest first, unpriced last.
    async fn list_vehicles(&self) -> anyhow::Result<Vec<VehicleRecord>>;

    async fn get_vehicle_by_slug(&self, slug: &str) -> anyhow::Result<Option<VehicleRecord>>;

    async fn count_vehicles(&self) -> anyhow::Result<i64>;
}
