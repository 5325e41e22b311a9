mod application;
mod company;
mod job;
mod router;
mod telemetry;
mod user;

use tracing::info;

use jobportal_storage::Database;
use jobportal_util::{load_env_file, AppConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;

    let database = Database::connect(&config.database_url).await?;
    database.run_migrations().await?;

    let state = router::AppState::new(metrics, database);

    let addr = config.bind_addr;
    info!(%addr, env = %config.environment.as_str(), "starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router::app_router(state, &config.allowed_origins))
        .await
        .map_err(|err| err.into())
}
