/// Operational entry point: resolves and logs the currently eligible AOIs
/// for every supported satellite. Downloader processes link the library
/// directly; this binary exists for schema bootstrap and inspection.
use aoi_tracker::config::AppConfig;
use aoi_tracker::domain::Satellite;
use aoi_tracker::repo::{init_db, HistoryRepo, SiteRepo};
use aoi_tracker::services::AoiService;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    // Load configuration
    let config = AppConfig::from_env()?;
    info!("Configuration loaded successfully");

    // Initialize database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    info!("Database connection pool established");

    // Initialize database schema
    init_db(&pool).await?;
    info!("Database schema initialized");

    let service = AoiService::new(SiteRepo::new(pool.clone()), HistoryRepo::new(pool.clone()));

    for satellite in Satellite::ALL {
        match service.resolve_aois(satellite).await {
            Ok(contexts) => {
                info!("{satellite}: {} site(s) in season", contexts.len());
                for ctx in &contexts {
                    info!(
                        site = %ctx.site_name,
                        span = %format!("{}-{}", ctx.span.start_year, ctx.span.end_year),
                        write_dir = %ctx.write_dir,
                        tiles = ctx.tiles.len(),
                        known_products = ctx.history_products.len(),
                        "eligible AOI"
                    );
                }
            }
            Err(e) => {
                error!("{satellite}: AOI resolution failed: {e}");
            }
        }
    }

    Ok(())
}
