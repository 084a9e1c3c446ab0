use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use csmon_server::api::alerts::load_alert_feed;
use csmon_server::app;
use csmon_server::config::ServerConfig;
use csmon_server::state::AppState;
use csmon_upstream::collector::AlertCollector;
use csmon_upstream::metronome::MetronomeClient;

const DEFAULT_CONFIG_PATH: &str = "config/server.toml";

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  csmon-server [config.toml]                           Start the server");
    eprintln!("  csmon-server fetch-alerts [config.toml] [statuses]   Print the alert feed once as JSON");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("csmon=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("fetch-alerts") => {
            let config_path = args.get(2).map(String::as_str).unwrap_or(DEFAULT_CONFIG_PATH);
            run_fetch_alerts(config_path, args.get(3).map(String::as_str)).await
        }
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        _ => {
            let config_path = args.get(1).map(String::as_str).unwrap_or(DEFAULT_CONFIG_PATH);
            run_server(config_path).await
        }
    }
}

fn build_collector(config: &ServerConfig) -> Result<Arc<AlertCollector>> {
    let client = MetronomeClient::new(&config.upstream)?;
    let collector = AlertCollector::from_config(Arc::new(client), &config.upstream);
    if collector.is_configured() {
        tracing::info!(
            base_url = %config.upstream.base_url,
            mode = collector.mode().name(),
            "Metronome upstream configured"
        );
    } else {
        tracing::info!("Metronome API token not set, the alert feed will serve sample data");
    }
    Ok(Arc::new(collector))
}

#[allow(clippy::print_stdout)]
async fn run_fetch_alerts(config_path: &str, statuses: Option<&str>) -> Result<()> {
    let config = ServerConfig::load_or_default(config_path)?;
    let collector = build_collector(&config)?;
    let feed = load_alert_feed(&collector, statuses).await;
    println!("{}", serde_json::to_string_pretty(&feed)?);
    Ok(())
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = ServerConfig::load_or_default(config_path)?;
    tracing::info!(config = config_path, "Loaded configuration");

    let collector = build_collector(&config)?;
    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let state = AppState::new(collector, config);

    let app = app::build_http_app(state);
    let listener = tokio::net::TcpListener::bind(http_addr).await?;

    tracing::info!(http = %http_addr, "Server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
            tracing::info!("Shutting down gracefully");
        })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
