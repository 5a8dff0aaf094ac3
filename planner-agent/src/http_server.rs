/// HTTP server for the trip planner
/// Serves the session API consumed by the browser views

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use planner_agent::{evict_idle_sessions, router, GeminiGateway, PlannerConfig, SessionFactory, SessionManager};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║          Wanderlust Trip Planner - HTTP API Server         ║");
    println!("║     Recommendations and itineraries via Gemini             ║");
    println!("╚════════════════════════════════════════════════════════════╝\n");

    let config = PlannerConfig::from_env()?;

    println!("[INIT] Server configuration:");
    println!("  Port: {}", config.http_port);
    println!("  Model: {}", config.model);
    println!("  API base: {}", config.api_base);
    println!("  Web search: {}", config.web_search);
    println!("  Strict schema: {}", config.strict_schema);
    println!("  Session TTL: {}s", config.session_ttl_secs);

    let gateway = Arc::new(GeminiGateway::new(&config));
    let factory = SessionFactory::from_config(gateway, &config);

    let sessions: SessionManager = Arc::new(Mutex::new(HashMap::new()));
    println!("[SESSION] Session manager initialized");

    if let Some(ttl) = config.session_ttl() {
        let sessions_bg = sessions.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                let evicted = evict_idle_sessions(&sessions_bg, ttl, chrono::Utc::now()).await;
                if evicted > 0 {
                    tracing::info!(evicted, "Swept idle sessions");
                }
            }
        });
        println!("[SESSION] Idle sessions expire after {}s", config.session_ttl_secs);
    }

    let app = router(sessions, factory);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.http_port))?;

    println!("[STARTUP] ✓ Planner HTTP Server running on http://0.0.0.0:{}", config.http_port);
    println!("  GET    /health                              — Check server health");
    println!("  GET    /form/options                        — Preference form choices");
    println!("  POST   /sessions                            — Start a planning session");
    println!("  GET    /sessions/:id                        — Current session view");
    println!("  DELETE /sessions/:id                        — Discard a session");
    println!("  POST   /sessions/:id/submit                 — Submit preferences");
    println!("  POST   /sessions/:id/select                 — Choose a recommendation");
    println!("  POST   /sessions/:id/back                   — Go back one view");
    println!("  POST   /sessions/:id/restart                — Start over");
    println!("  POST   /sessions/:id/dismiss-error          — Clear the error message");
    println!("  GET    /sessions/:id/itinerary/download     — Download itinerary markdown\n");

    axum::serve(listener, app).await.context("Server failed")?;
    Ok(())
}
