use dotenvy::dotenv;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vaccine_buddy::{
    api::{self, AppState},
    config::{database, seed, server::ServerConfig},
    core::seed::seed_if_empty,
    errors::Result,
};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Open the database and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database schema ready."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 4. Seed reference data on first run
    let seed_path = seed::seed_file_path();
    if Path::new(&seed_path).exists() {
        let config = seed::load_seed(&seed_path)?;
        seed_if_empty(&db, &config)
            .await
            .inspect_err(|e| error!("Failed to seed reference data: {}", e))?;
    } else {
        warn!(path = %seed_path, "Seed file not found, skipping reference data");
    }

    // 5. Serve HTTP until shutdown
    let server_config = ServerConfig::load();
    api::serve(&server_config, AppState::new(db)).await
}
