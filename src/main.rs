//! ingress-router
//!
//! ```text
//!     Client Request
//!     ───────────────▶ http server ──▶ routing (Exact / Prefix, rewrite)
//!                                         │
//!                        no route ◀───────┤
//!                     404 no-route        ▼
//!                                    backend host:port ──▶ Backend Service
//! ```
//!
//! `serve` runs the router, `check` validates a config file and prints the
//! route table, `resolve` shows where a given path would be sent.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use ingress_router::config::{load_config, watcher::ConfigWatcher};
use ingress_router::lifecycle::{signals, Shutdown};
use ingress_router::observability::{logging, metrics};
use ingress_router::{HttpServer, RouteTable};

#[derive(Parser)]
#[command(name = "ingress-router")]
#[command(about = "Path-based HTTP router with Exact/Prefix matching and rewrites", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "ingress.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the router (default)
    Serve {
        /// Reload routes when the config file changes
        #[arg(long)]
        watch: bool,
    },
    /// Validate the configuration and print the route table
    Check,
    /// Show which route and backend URL a request path resolves to
    Resolve {
        /// Request path, e.g. /api/items
        path: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(Commands::Serve { watch: false }) {
        Commands::Serve { watch } => serve(cli.config, watch),
        Commands::Check => check(&cli.config),
        Commands::Resolve { path } => resolve(&cli.config, &path),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_table(path: &Path) -> anyhow::Result<RouteTable> {
    let config = load_config(path).with_context(|| format!("loading {}", path.display()))?;
    Ok(RouteTable::new(config.routes)?)
}

fn check(path: &Path) -> anyhow::Result<ExitCode> {
    let table = load_table(path)?;
    println!("{}: {} route(s)", path.display(), table.len());
    for route in table.iter() {
        println!("  {}", route);
    }
    Ok(ExitCode::SUCCESS)
}

fn resolve(path: &Path, request_path: &str) -> anyhow::Result<ExitCode> {
    let table = load_table(path)?;
    match table.resolve(request_path) {
        Ok(decision) => {
            println!("{}", serde_json::to_string_pretty(&decision)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", e);
            for route in table.iter() {
                eprintln!("  not matched: {}", route);
            }
            Ok(ExitCode::from(2))
        }
    }
}

#[tokio::main]
async fn serve(path: PathBuf, watch: bool) -> anyhow::Result<ExitCode> {
    let config = load_config(&path).with_context(|| format!("loading {}", path.display()))?;

    logging::init(&config.observability);
    tracing::info!("ingress-router v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config = %path.display(),
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config
            .observability
            .metrics_address
            .parse()
            .context("parsing observability.metrics_address")?;
        metrics::init_metrics(addr)?;
    }

    let (watcher, config_updates) = ConfigWatcher::new(&path);
    // Dropping the handle stops the watch, so it lives until serve returns.
    let _watch_handle = if watch {
        Some(watcher.run()?)
    } else {
        None
    };

    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config)?;
    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("binding {}", bind_address))?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(signals::shutdown_on_signal(shutdown));

    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(ExitCode::SUCCESS)
}
