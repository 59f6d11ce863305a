//! tripflow server binary.
//!
//! Wires the live capabilities (Claude, Kakao place search, calendar,
//! share links) into the orchestrator and serves the streaming chat API.

mod config;
mod routes;

use anyhow::Context;
use clap::Parser;
use config::ServerConfig;
use routes::{create_router, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tripflow_agents::{AgentDeps, Orchestrator};
use tripflow_clients::{
    HttpCalendarClient, InMemoryItineraryStore, KakaoPlaceClient, LocalShareLinks, SearchCache,
};
use tripflow_core::{ConversationState, WalkOptions};
use tripflow_guardrail::{ResponseMonitor, ResponseValidator};
use tripflow_llm::{ClaudeClient, LlmConfig};
use tripflow_session::InMemorySessionStore;

#[derive(Debug, Parser)]
#[command(name = "tripflow-server", about = "Multi-agent travel planning assistant API")]
struct Args {
    /// Address to bind to.
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to.
    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(rust_log).init();

    let args = Args::parse();
    let config = ServerConfig::from_env();
    tracing::info!(base_url = %config.base_url, "loaded server configuration");

    let llm = ClaudeClient::new(
        LlmConfig::from_env().context("LLM configuration (ANTHROPIC_API_KEY) is required")?,
    )
    .context("failed to build LLM client")?;
    let places = KakaoPlaceClient::from_env().context("KAKAO_REST_KEY is required")?;
    let calendar = HttpCalendarClient::from_env()
        .context("GOOGLE_CALENDAR_ID / GOOGLE_CALENDAR_TOKEN are required")?;

    let deps = AgentDeps {
        llm: Arc::new(llm),
        places: Arc::new(places),
        search_cache: Arc::new(SearchCache::new()),
        calendar: Arc::new(calendar),
        share_links: Arc::new(LocalShareLinks::new(config.base_url.clone())),
        itineraries: Arc::new(InMemoryItineraryStore::new()),
        validator: Arc::new(ResponseValidator::new()),
        monitor: Arc::new(ResponseMonitor::new()),
        sessions: Arc::new(InMemorySessionStore::<ConversationState>::new()),
    };

    let options = WalkOptions {
        pacing: config.stream_pacing,
        ..WalkOptions::default()
    };
    let orchestrator = Orchestrator::with_options(deps, options)?.with_base_url(config.base_url);

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
    };

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .context("invalid host/port")?;
    tracing::info!(%addr, "tripflow server listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind listener")?;
    axum::serve(listener, create_router(state))
        .await
        .context("server error")?;

    Ok(())
}
