//! Engine service entry point: initializes logging and configuration, opens
//! the database, and makes sure the schema and workspace settings are ready
//! for the CRUD layer that drives the engine.

use dotenvy::dotenv;
use foodcost::config;
use foodcost::core::settings;
use foodcost::errors::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load engine settings (optional costing.toml)
    let app_settings = config::settings::load_default_settings()?;

    // 4. Open the database and ensure the schema exists
    let db = config::database::create_connection(app_settings.database_url.as_deref()).await?;
    config::database::create_tables(&db).await?;
    info!("Database schema ready.");

    // 5. Apply a configured labor rate for workspaces that have none yet
    if let Some(rate) = app_settings.labor_cost_per_hour {
        if settings::init_labor_cost_per_hour(&db, rate).await? {
            info!(%rate, "Applied initial labor rate from configuration.");
        }
    }

    info!("foodcost engine ready.");
    Ok(())
}
