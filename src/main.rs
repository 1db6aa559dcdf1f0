//! # Wolfee Dashboard: Market Analytics Client
//!
//! ## Architecture Overview
//!
//! ```text
//!  ┌──────────────────┐  quick (bounded, timed)   ┌──────────────────────────┐
//!  │  Analytics API   │ ◀──────────────────────── │  Fetch Pipeline          │
//!  │  (remote)        │  full  (best-effort)      │   └─▶ Merge Engine       │
//!  └──────────────────┘                           │                          │
//!                                                 │  AppState                │
//!                                                 │  ├─ Dashboard (RwLock)   │
//!                                                 │  │   ├─ Working Set      │
//!                                                 │  │   ├─ filters/search   │
//!                                                 │  │   └─ Portfolio ──▶ file│
//!                                                 │  ├─ Session Cache (5 min)│
//!                                                 │  └─ broadcast_tx ──────┐ │
//!                                                 └────────────────────────┼─┘
//!  ┌──────────────────┐  GET/POST /api/*                                 │
//!  │  Browser         │ ◀───────────────────────────────────────────────┘
//!  └──────────────────┘  ws://host/ws/monitor
//! ```
//!
//! Configuration is read from the environment; see [`config`].

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod cache;
mod config;
mod dashboard;
mod engine;
mod error;
mod events;
mod export;
mod models;
mod portfolio;
mod routes;
mod state;
mod storage;

use config::Config;
use engine::pipeline;
use state::build_state;

// ─── Entry Point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Load .env ──────────────────────────────────────────────────────────
    dotenvy::dotenv().ok();

    // ── 2. Structured logging ─────────────────────────────────────────────────
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("wolfee_dashboard=debug".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    info!(r#"

  ╔═══════════════════════════════════════════════════════╗
  ║        WOLFEE — Market Analytics Dashboard            ║
  ║  Quick · Full · Merge · Filter · Search · Portfolio   ║
  ╚═══════════════════════════════════════════════════════╝"#);

    // ── 3. Config & shared state ──────────────────────────────────────────────
    let config = Config::from_env()?;
    info!(api = %config.api_base_url, quick_timeout = ?config.quick_timeout, "⚙️ Config loaded");

    let state = build_state(&config)?;

    // ── 4. Initial load (full stage keeps running in the background) ─────────
    let loader = state.clone();
    tokio::spawn(async move {
        pipeline::load(&loader).await;
    });

    // ── 5. Router ─────────────────────────────────────────────────────────────
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    );

    // ── 6. Bind & Serve ───────────────────────────────────────────────────────
    info!(addr = ?config.bind_addr, "🚀 Dashboard surface starting");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
