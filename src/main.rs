use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use action_dispatch::actions::ActionManifest;
use action_dispatch::config::{load_config, ServerConfig};
use action_dispatch::demo;
use action_dispatch::lifecycle::{wait_for_signal, Shutdown};
use action_dispatch::observability::{logging, metrics};
use action_dispatch::{ActionApp, HttpServer};

#[derive(Parser)]
#[command(name = "action-server")]
#[command(about = "Serves pages and dispatches server actions", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability);
    tracing::info!("action-server v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        runtime = config.actions.runtime.as_str(),
        body_size_limit = %config.actions.body_size_limit,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let app = match &config.actions.manifest_path {
        Some(path) => {
            let manifest = ActionManifest::load(path.as_ref())?;
            tracing::info!(
                path = %path,
                actions = manifest.len(config.actions.runtime),
                "Action manifest loaded"
            );
            ActionApp::new(
                Arc::new(manifest),
                Arc::new(demo::modules()),
                Arc::new(demo::DemoPages),
            )
        }
        None => demo::app(config.actions.runtime),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, app);
    let server_task = tokio::spawn(server.run(listener, shutdown.clone()));

    wait_for_signal().await;
    shutdown.trigger();
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
