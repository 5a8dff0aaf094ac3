/// Planner configuration, read from the environment (and `.env` via dotenv)

use anyhow::{anyhow, Context, Result};

use crate::gateway::GenerationOptions;
use planner_core::prompt::recommendation_schema;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_HTTP_PORT: u16 = 3001;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub gemini_api_key: String,
    pub model: String,
    pub api_base: String,
    /// Ground both calls with the backend's web search tool
    pub web_search: bool,
    /// Ask for schema-constrained JSON on the recommendations call
    pub strict_schema: bool,
    pub http_port: u16,
    /// Idle sessions are evicted after this many seconds; 0 keeps them forever
    pub session_ttl_secs: u64,
}

impl PlannerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from any variable source; `from_env` passes the process environment.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let gemini_api_key = var("GEMINI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow!("GEMINI_API_KEY environment variable not set"))?;

        let model = var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_base = var("GEMINI_API_BASE")
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let web_search = var("PLANNER_WEB_SEARCH")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(true);
        let strict_schema = var("PLANNER_STRICT_SCHEMA")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        let http_port = match var("PLANNER_HTTP_PORT") {
            Some(port) => port
                .parse::<u16>()
                .with_context(|| format!("PLANNER_HTTP_PORT is not a valid port: {}", port))?,
            None => DEFAULT_HTTP_PORT,
        };

        let session_ttl_secs = match var("PLANNER_SESSION_TTL_SECS") {
            Some(secs) => secs
                .parse::<u64>()
                .with_context(|| format!("PLANNER_SESSION_TTL_SECS is not a number of seconds: {}", secs))?,
            None => DEFAULT_SESSION_TTL_SECS,
        };

        Ok(Self {
            gemini_api_key,
            model,
            api_base,
            web_search,
            strict_schema,
            http_port,
            session_ttl_secs,
        })
    }

    /// `None` when eviction is disabled
    pub fn session_ttl(&self) -> Option<chrono::Duration> {
        match self.session_ttl_secs {
            0 => None,
            secs => Some(chrono::Duration::seconds(secs as i64)),
        }
    }

    pub fn recommendation_options(&self) -> GenerationOptions {
        GenerationOptions {
            model: self.model.clone(),
            web_search: self.web_search,
            response_schema: self.strict_schema.then(recommendation_schema),
        }
    }

    pub fn itinerary_options(&self) -> GenerationOptions {
        GenerationOptions {
            model: self.model.clone(),
            web_search: self.web_search,
            response_schema: None,
        }
    }
}
