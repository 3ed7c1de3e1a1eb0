//! Hearth daemon entry point.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use hearth::application::{Engine, Repositories};
use hearth::infrastructure::config::ConfigLoader;
use hearth::infrastructure::database::{
    AutomationRepositoryImpl, DatabaseConnection, DeviceRepositoryImpl, EntityRepositoryImpl,
    EventRepositoryImpl, IntegrationConfigRepositoryImpl,
};
use hearth::infrastructure::logging;
use hearth::integrations;
use hearth::services::descriptor_registry::DescriptorRegistry;

#[derive(Parser)]
#[command(name = "hearth", version, about = "Home-automation engine")]
struct Cli {
    /// Path to a configuration file (defaults to hearth.yaml).
    #[arg(short, long, env = "HEARTH_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };

    let _logging = logging::init(&config.logging).context("failed to initialize logging")?;
    info!("bootstrapping engine");

    let database_url = format!("sqlite:{}", config.database.path);
    let db = DatabaseConnection::new(&database_url, config.database.max_connections)
        .await
        .context("failed to connect to database")?;
    db.migrate().await.context("failed to run migrations")?;

    let pool = db.pool().clone();
    let repos = Repositories {
        automations: Arc::new(AutomationRepositoryImpl::new(pool.clone())),
        events: Arc::new(EventRepositoryImpl::new(pool.clone())),
        devices: Arc::new(DeviceRepositoryImpl::new(pool.clone())),
        entities: Arc::new(EntityRepositoryImpl::new(pool.clone())),
        integration_configs: Arc::new(IntegrationConfigRepositoryImpl::new(pool)),
    };

    let mut descriptors = DescriptorRegistry::new();
    integrations::register_builtin(&mut descriptors);

    let engine = Arc::new(Engine::new(config, repos.clone(), descriptors));
    engine.init().await.context("failed to initialize engine")?;
    engine.start();

    // Load every enabled integration and run discovery for each.
    let configs = repos
        .integration_configs
        .load_all()
        .await
        .context("failed to load integration configs")?;
    for integration in configs.iter().filter(|c| c.enabled) {
        let name = &integration.integration_name;
        if let Err(err) = engine.load_integration(name).await {
            error!(integration = %name, error = %err, "failed to load integration");
            continue;
        }
        if let Err(err) = engine.discover_devices(name).await {
            warn!(integration = %name, error = %err, "discovery failed");
        }
    }

    info!("engine bootstrap succeeded");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutting down");

    engine.shutdown().await;
    db.close().await;
    Ok(())
}
