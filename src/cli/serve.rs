use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use genie_review_cli::server::{build_review_router, ServeState};
use genie_review_cli::ReviewService;
use gitlab_adapter::GitLabClient;
use review_engine::OpenAiReviewer;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use crate::cli::context::CliContext;

#[derive(Args, Clone)]
pub struct ServeArgs {
    /// Address to bind (defaults to `server.host`)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (defaults to `server.port`)
    #[arg(long)]
    pub port: Option<u16>,
}

pub async fn cmd_serve(args: ServeArgs, ctx: &CliContext) -> Result<()> {
    let config = ctx.config();

    let gitlab = GitLabClient::new(config.gitlab.client_config())
        .context("failed to configure GitLab client")?;
    let reviewer = OpenAiReviewer::new(config.openai.reviewer_config())
        .context("failed to configure OpenAI reviewer (set OPENAI_API_KEY)")?;
    info!(
        gitlab = %config.gitlab.base_url,
        model = %reviewer.model(),
        "Review backend configured"
    );

    let state = ServeState::new(ReviewService::new(Arc::new(gitlab), Arc::new(reviewer)));
    let router = build_review_router().with_state(state);

    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind review server on {}", addr))?;
    info!("Review API available at http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("review server exited unexpectedly")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        warn!(?err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
