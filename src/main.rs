//! Interceptor flow gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ routing ──▶ route flow (Arc<Node>)
//!                                                     │
//!                                                     ▼
//!                                              FlowController
//!                                       request pass ─▶ interceptors
//!                                       unwind (response | abort)
//!                                                     │
//!     Client Response                                 ▼
//!     ◀────────────── http response ◀──────────── Exchange
//!
//!     Cross-cutting: config (+ hot reload), observability, lifecycle
//! ```

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use interceptor_proxy::config::load_config;
use interceptor_proxy::flow::FlowBuilder;
use interceptor_proxy::lifecycle::{start, StartupOptions};
use interceptor_proxy::routing::Router;

#[derive(Parser)]
#[command(name = "interceptor-proxy")]
#[command(about = "HTTP gateway driving requests through interceptor flows", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Reload the configuration whenever the file changes.
    #[arg(short, long)]
    watch: bool,

    /// Validate the configuration, print the route table and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.check {
        return check(&cli.config);
    }

    let options = StartupOptions {
        config_path: cli.config,
        watch: cli.watch,
    };
    match start(options).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Gateway failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn check(path: &Path) -> ExitCode {
    let config = match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match Router::from_config(&config.routes, &FlowBuilder::new(&config.timeouts)) {
        Ok(router) => {
            for route in router.routes() {
                println!(
                    "{:<24} priority={:<4} interceptors={}",
                    route.name,
                    route.priority,
                    route.flow.leaf_count()
                );
            }
            println!("{} route(s) OK", router.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
