//! Motor telemetry recorder service

use tokio::signal;
use tracing::{error, info};

use vesc_recorder::config::AppConfig;
use vesc_recorder::database::Database;
use vesc_recorder::errors::RecorderError;
use vesc_recorder::pipeline::Recorder;
use vesc_recorder::server::build_router;

#[tokio::main]
async fn main() -> Result<(), RecorderError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Defaults, then config/default, then VESCRECORDER__* environment variables
    let config = AppConfig::load()?;
    config.validate()?;

    let db = Database::from_config(&config.database).await?;
    let recorder = Recorder::from_config(&config, db.clone()).await?;
    let app = build_router(recorder);

    let listener = tokio::net::TcpListener::bind(config.server.bind).await?;
    info!("Listening on http://{}", config.server.bind);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Could not listen for shutdown signal: {}", e);
            }
            info!("Received shutdown signal");
        })
        .await;

    if let Err(e) = db.close().await {
        error!("Closing database failed: {}", e);
    }
    served?;

    Ok(())
}
