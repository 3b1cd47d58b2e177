mod api;
mod app;
mod config;
mod error;
mod routes;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::AppState;
use config::ServiceArgs;

#[derive(Parser)]
#[command(name = "pdf-chat", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    service: ServiceArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API.
    Serve {
        #[arg(long, env = "PDF_CHAT_HOST", default_value = "0.0.0.0")]
        host: String,
        #[arg(long, env = "PDF_CHAT_PORT", default_value = "8000")]
        port: u16,
        /// Allowed browser origin; repeat for several, `*` allows any.
        #[arg(
            long = "cors-origin",
            default_values_t = [
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ]
        )]
        cors_origins: Vec<String>,
        /// Largest accepted upload, in megabytes.
        #[arg(long, default_value = "50")]
        max_upload_mb: usize,
    },
    /// Index every PDF under a folder, one id per file.
    Ingest {
        /// Folder that contains PDFs recursively.
        #[arg(long)]
        folder: PathBuf,
    },
    /// Ask a question against already indexed PDFs.
    Ask {
        #[arg(long)]
        question: String,
        /// Ids printed by `ingest` or returned by the upload endpoint.
        #[arg(long = "pdf-id", required = true)]
        pdf_ids: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "pdf-chat boot"
    );

    match cli.command {
        Command::Serve {
            host,
            port,
            cors_origins,
            max_upload_mb,
        } => serve(&cli.service, &host, port, &cors_origins, max_upload_mb).await,
        Command::Ingest { folder } => ingest(&cli.service, folder).await,
        Command::Ask { question, pdf_ids } => ask(&cli.service, &question, &pdf_ids).await,
    }
}

async fn serve(
    service: &ServiceArgs,
    host: &str,
    port: u16,
    cors_origins: &[String],
    max_upload_mb: usize,
) -> anyhow::Result<()> {
    let state = Arc::new(AppState::from_args(service).await?);

    let app = routes::build_router(state)
        .layer(DefaultBodyLimit::max(max_upload_mb.saturating_mul(1024 * 1024)))
        .layer(cors_layer(cors_origins)?)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::any()
    } else {
        let values = origins
            .iter()
            .map(|origin| origin.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(values)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn ingest(service: &ServiceArgs, folder: PathBuf) -> anyhow::Result<()> {
    let state = AppState::from_args(service).await?;
    let outcome = state.ingest_folder(&folder).await?;

    if outcome.indexed.is_empty() {
        println!("0 PDFs indexed (all files were skipped)");
    }
    for pdf in &outcome.indexed {
        println!("{}\t{} chunks\t{}", pdf.pdf_id, pdf.chunks, pdf.path.display());
    }
    for skipped in &outcome.skipped {
        println!("skipped\t{}\t{}", skipped.path.display(), skipped.reason);
    }
    Ok(())
}

async fn ask(service: &ServiceArgs, question: &str, pdf_ids: &[String]) -> anyhow::Result<()> {
    let state = AppState::from_args(service).await?;
    let answer = state.ask(question, pdf_ids).await?;

    println!("{}", answer.answer);
    if !answer.sources.is_empty() {
        println!();
        for (position, source) in answer.sources.iter().enumerate() {
            println!("[{}] {}", position + 1, source);
        }
    }
    Ok(())
}
