use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{TokenStore, VehicleStore};
use crate::models::token::MeliToken;
use crate::models::vehicle::VehicleRecord;

/// Rows per INSERT statement. Eleven binds per row keeps this well under the
/// 65535 bind parameter limit of the wire protocol.
const UPSERT_CHUNK: usize = 1000;

const VEHICLE_COLUMNS: &str =
    "external_id, slug, title, brand, model, year, price, currency, permalink, thumbnail, pictures";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to `database_url`. A non-empty `password` replaces the one in
    /// the URL, so the service credential can live outside the connection
    /// string.
    pub async fn connect(database_url: &str, password: Option<&str>) -> anyhow::Result<Self> {
        let mut options: PgConnectOptions = database_url
            .parse()
            .context("DATABASE_URL is not a valid postgres URL")?;
        if let Some(pw) = password {
            options = options.password(pw);
        }

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .context("failed to connect to the database")?;
        Ok(Self { pool })
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

// -- Credential Operations --

#[async_trait]
impl TokenStore for PgStore {
    async fn load_token(&self, id: &str) -> anyhow::Result<Option<MeliToken>> {
        let row = sqlx::query_as::<_, MeliToken>(
            "SELECT access_token, refresh_token, expires_at FROM meli_tokens WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to read meli_tokens")?;

        Ok(row)
    }

    async fn save_token(&self, id: &str, token: &MeliToken) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO meli_tokens (id, access_token, refresh_token, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET access_token = EXCLUDED.access_token,
                refresh_token = EXCLUDED.refresh_token,
                expires_at = EXCLUDED.expires_at,
                updated_at = NOW()
            "#,
        )
        .bind(id)
        .bind(&token.access_token)
        .bind(&token.refresh_token)
        .bind(token.expires_at)
        .execute(&self.pool)
        .await
        .context("failed to save meli_tokens")?;

        Ok(())
    }
}

// -- Vehicle Operations --

#[async_trait]
impl VehicleStore for PgStore {
    async fn upsert_vehicles(&self, vehicles: &[VehicleRecord]) -> anyhow::Result<u64> {
        if vehicles.is_empty() {
            return Ok(0);
        }

        // One transaction for the whole batch: readers never see a half-applied sync.
        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for chunk in vehicles.chunks(UPSERT_CHUNK) {
            let mut qb: QueryBuilder<'_, Postgres> =
                QueryBuilder::new(format!("INSERT INTO vehicles ({}) ", VEHICLE_COLUMNS));
            qb.push_values(chunk, |mut row, v| {
                row.push_bind(v.external_id.clone())
                    .push_bind(v.slug.clone())
                    .push_bind(v.title.clone())
                    .push_bind(v.brand.clone())
                    .push_bind(v.model.clone())
                    .push_bind(v.year)
                    .push_bind(v.price)
                    .push_bind(v.currency.clone())
                    .push_bind(v.permalink.clone())
                    .push_bind(v.thumbnail.clone())
                    .push_bind(v.pictures.clone());
            });
            qb.push(
                r#" ON CONFLICT (external_id) DO UPDATE
                SET slug = EXCLUDED.slug,
                    title = EXCLUDED.title,
                    brand = EXCLUDED.brand,
                    model = EXCLUDED.model,
                    year = EXCLUDED.year,
                    price = EXCLUDED.price,
                    currency = EXCLUDED.currency,
                    permalink = EXCLUDED.permalink,
                    thumbnail = EXCLUDED.thumbnail,
                    pictures = EXCLUDED.pictures,
                    updated_at = NOW()"#,
            );

            let result = qb
                .build()
                .execute(&mut *tx)
                .await
                .context("failed to upsert vehicles")?;
            written += result.rows_affected();
        }

        tx.commit().await.context("failed to commit vehicle batch")?;
        Ok(written)
    }

    async fn list_vehicles(&self) -> anyhow::Result<Vec<VehicleRecord>> {
        let rows = sqlx::query_as::<_, VehicleRecord>(&format!(
            "SELECT {} FROM vehicles ORDER BY price ASC NULLS LAST, external_id ASC",
            VEHICLE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_vehicle_by_slug(&self, slug: &str) -> anyhow::Result<Option<VehicleRecord>> {
        let row = sqlx::query_as::<_, VehicleRecord>(&format!(
            "SELECT {} FROM vehicles WHERE slug = $1 LIMIT 1",
            VEHICLE_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn count_vehicles(&self) -> anyhow::Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM vehicles")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
