use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use backend::api::ApiServer;
use backend::config::BackendConfig;
use backend::gateway::RpcGateway;
use backend::logging::init_logging;
use backend::rpc::{RpcClient, RpcTransport};
use backend::stats::StatsAggregator;

#[derive(Parser, Debug)]
#[command(name = "hylium-backend")]
#[command(about = "Hylium website backend: node RPC proxy and network stats")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to config/backend.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level or filter directive, overridden by RUST_LOG
    #[arg(long)]
    log_level: Option<String>,
}

#[actix_web::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let dotenv_loaded = dotenv::dotenv().is_ok();

    let cli = Cli::parse();

    let config =
        BackendConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    init_logging(level).context("Failed to initialize logging")?;

    if dotenv_loaded {
        info!("Loaded environment from .env");
    }
    info!("Upstream node RPC at {}", config.rpc.url);
    info!(
        "Stats cache TTL {}s, rate limit {} requests per {}s",
        config.stats.cache_ttl.as_secs(),
        config.rate_limit.max_requests,
        config.rate_limit.window.as_secs()
    );
    if config.rpc.user.is_empty() {
        warn!("No RPC credentials configured");
    }

    let client = RpcClient::new(&config.rpc).context("Failed to build RPC client")?;
    let transport: Arc<dyn RpcTransport> = Arc::new(client);

    let gateway = Arc::new(RpcGateway::new(Arc::clone(&transport)));
    let stats = Arc::new(StatsAggregator::with_ttl(transport, config.stats.cache_ttl));

    let server = ApiServer::new(config.server, config.rate_limit, gateway, stats)
        .start()
        .await
        .context("Failed to start API server")?;

    server.await?;

    info!("API server stopped");
    Ok(())
}
