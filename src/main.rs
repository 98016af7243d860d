use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catalog_sync::store::postgres::PgStore;
use catalog_sync::{api, cli, config, jobs, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let cfg = config::load();
    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => {
            let port = port.unwrap_or(cfg.port);
            run_server(cfg, port).await
        }
        Some(cli::Commands::Sync) => run_sync_once(cfg).await,
        Some(cli::Commands::RefreshToken) => refresh_token_once(cfg).await,
        Some(cli::Commands::Migrate) => {
            let db = connect(&cfg).await?;
            db.migrate().await?;
            println!("Migrations applied.");
            Ok(())
        }
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

/// Log to stdout; additionally export spans over OTLP when
/// OTEL_EXPORTER_OTLP_ENDPOINT is set.
fn init_tracing() -> anyhow::Result<()> {
    use opentelemetry::KeyValue;
    use opentelemetry_sdk::{trace as sdktrace, Resource};

    let telemetry_layer = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic())
            .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "catalog-sync"),
            ])))
            .install_batch(opentelemetry_sdk::runtime::Tokio)?;
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "catalog_sync=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry_layer)
        .init();
    Ok(())
}

async fn connect(cfg: &config::Config) -> anyhow::Result<PgStore> {
    tracing::info!("Connecting to database...");
    PgStore::connect(&cfg.database_url, cfg.database_password.as_deref()).await
}

async fn build_state(cfg: config::Config, db: PgStore) -> anyhow::Result<Arc<AppState>> {
    let db = Arc::new(db);
    Ok(Arc::new(AppState::new(cfg, db.clone(), db)?))
}

async fn run_server(cfg: config::Config, port: u16) -> anyhow::Result<()> {
    let db = connect(&cfg).await?;

    tracing::info!("Running migrations...");
    db.migrate().await?;

    let state = build_state(cfg, db).await?;

    if state.config.sync_interval_secs > 0 {
        let every = Duration::from_secs(state.config.sync_interval_secs);
        jobs::scheduled_sync::spawn(state.sync.clone(), every);
        tracing::info!(
            interval_secs = state.config.sync_interval_secs,
            "Scheduled listing sync started"
        );
    }

    let app = api::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("catalog-sync listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_sync_once(cfg: config::Config) -> anyhow::Result<()> {
    let db = connect(&cfg).await?;
    let state = build_state(cfg, db).await?;

    let report = state.sync.run_sync().await?;
    println!("Synced {} vehicles.", report.count);
    for failure in &report.failures {
        println!("  failed {:<16} {}", failure.item_id, failure.error);
    }
    Ok(())
}

async fn refresh_token_once(cfg: config::Config) -> anyhow::Result<()> {
    let db = connect(&cfg).await?;
    let state = build_state(cfg, db).await?;

    let token = state.tokens.obtain_valid_token().await?;
    let expires = chrono::DateTime::from_timestamp_millis(token.expires_at)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| token.expires_at.to_string());
    println!("Marketplace token valid until {}", expires);
    Ok(())
}
