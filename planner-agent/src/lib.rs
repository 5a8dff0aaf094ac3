/// Trip planner agent library
/// Wires the planning core to the Gemini backend and exposes it over HTTP

pub mod config;
pub mod gateway;
pub mod orchestration;
pub mod routes;

pub use config::PlannerConfig;
pub use gateway::{GeminiGateway, Gateway, GatewayError, GenerationOptions};
pub use orchestration::Orchestrator;
pub use routes::{evict_idle_sessions, router, SessionFactory, SessionManager};
