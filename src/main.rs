use std::sync::Arc;

use tracing::{error, info};

use sharegate::share::start_sweeper;
use sharegate::{Config, Database, FileStorage, ShareService, WebServer};

const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() {
    let config = match Config::load_with_env(CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {CONFIG_PATH}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    if let Err(e) = sharegate::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        sharegate::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = run(config).await {
        error!("sharegate stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> sharegate::Result<()> {
    config.validate()?;

    info!("sharegate {}", env!("CARGO_PKG_VERSION"));

    let db = Arc::new(Database::open(&config.database.path).await?);
    let storage = Arc::new(FileStorage::new(&config.files.storage_path)?);
    info!("Blob storage at {}", config.files.storage_path);

    if config.sweeper.enabled {
        start_sweeper(db.clone(), storage.clone(), &config.sweeper);
    } else {
        info!("Lifecycle sweeper disabled");
    }

    let service = ShareService::new(db.clone(), storage, &config);
    let server = WebServer::new(&config, service)?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutdown requested"),
    }

    db.close().await;
    Ok(())
}
