use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod catalog_store;
use catalog_store::{CatalogStore, SqliteCatalogStore};

mod config;
use config::{AppConfig, CliConfig, FileConfig};

mod search;

mod server;
use server::{run_server, RequestsLoggingLevel, ServerConfig};

mod sqlite_persistence;

mod user;
use user::{SqliteUserStore, UserManager};

const READ_POOL_SIZE: usize = 4;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding the SQLite database files.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Create the database directory when it does not exist yet.
    #[clap(long, default_value_t = false)]
    pub create_db_dir_if_missing: bool,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 8000)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Path to a TOML config file whose values override the CLI.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let config = AppConfig::resolve(
        &CliConfig {
            db_dir: cli_args.db_dir.clone(),
            port: cli_args.port,
            metrics_port: cli_args.metrics_port,
            logging_level: cli_args.logging_level.clone(),
            frontend_dir_path: cli_args.frontend_dir_path.clone(),
            create_db_dir_if_missing: cli_args.create_db_dir_if_missing,
        },
        file_config,
    )?;

    info!(
        "Opening SQLite catalog database at {:?}...",
        config.catalog_db_path()
    );
    let catalog_store: Arc<dyn CatalogStore> =
        Arc::new(SqliteCatalogStore::new(config.catalog_db_path(), READ_POOL_SIZE)?);

    info!("Initializing metrics...");
    server::metrics::init_metrics();
    server::metrics::update_catalog_items(&catalog_store.counts()?);

    info!(
        "Opening SQLite user database at {:?}...",
        config.user_db_path()
    );
    let user_store = Arc::new(SqliteUserStore::new(config.user_db_path())?);
    let user_manager = UserManager::new(user_store);

    let server_config = ServerConfig {
        requests_logging_level: config.logging_level.clone(),
        port: config.port,
        metrics_port: config.metrics_port,
        frontend_dir_path: config.frontend_dir_path.clone(),
    };

    info!("Ready to serve at port {}!", config.port);
    info!("Metrics available at port {}!", config.metrics_port);
    run_server(catalog_store, user_manager, server_config).await
}
