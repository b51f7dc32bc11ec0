mod api;
mod chrome;
mod extractor;
mod types;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use portalnav::{
    DataExtractor, NavigationStateMachine, PortalConfig, RemoteUIDriver,
    ResumableWorkflowController,
};

use chrome::ChromeDriver;
use extractor::PageTextExtractor;

#[derive(Parser, Debug)]
#[command(name = "portalnav-server")]
#[command(about = "HTTP control surface for the portal navigation engine")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8084")]
    port: u16,

    /// Path to the portal description (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Attach to a running Chrome at this DevTools URL instead of
    /// launching one
    #[arg(long)]
    cdp_url: Option<String>,

    /// Launch Chrome headless (ignored when --cdp-url is given)
    #[arg(long)]
    headless: bool,

    /// Enable CORS for all origins
    #[arg(long)]
    cors: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("starting portalnav-server v{}", env!("CARGO_PKG_VERSION"));

    let raw = std::fs::read_to_string(&args.config)
        .with_context(|| format!("reading portal config {:?}", args.config))?;
    let config: PortalConfig =
        serde_json::from_str(&raw).with_context(|| format!("parsing {:?}", args.config))?;
    info!(listing = %config.urls.listing, "portal config loaded");

    let driver: Arc<dyn RemoteUIDriver> =
        Arc::new(ChromeDriver::attach_or_launch(args.cdp_url.clone(), args.headless).await?);
    let extractor: Arc<dyn DataExtractor> = Arc::new(PageTextExtractor::new(
        Arc::clone(&driver),
        config.elements.record_marker.clone(),
    ));

    let machine = NavigationStateMachine::new(driver, extractor, config)
        .context("building the navigation engine")?;
    let controller = Arc::new(ResumableWorkflowController::new(machine));

    let mut app = Router::new()
        .route("/api/health", get(api::health))
        .route("/api/run/start", post(api::start_run))
        .route("/api/run/status", get(api::get_status))
        .route("/api/run/page-selection", post(api::page_selection))
        .route("/api/run/stop", post(api::stop_run))
        .with_state(controller);

    if args.cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on http://{addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
