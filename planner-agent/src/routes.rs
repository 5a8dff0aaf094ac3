/// HTTP API for the browser views
/// Each view reads a session projection and posts intents; no planning logic lives here.

use axum::{
    extract::{Extension, Json, Path},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::config::PlannerConfig;
use crate::gateway::{Gateway, GenerationOptions};
use crate::orchestration::Orchestrator;
use planner_core::form::{itinerary_filename, FormOptions};
use planner_core::{PreferenceRecord, Rejection, SessionView};

/// Live sessions by id. Each browser session gets its own orchestrator.
pub type SessionManager = Arc<Mutex<HashMap<String, Arc<Orchestrator>>>>;

/// Drop every session idle for longer than `ttl`. Returns how many went.
pub async fn evict_idle_sessions(sessions: &SessionManager, ttl: Duration, now: DateTime<Utc>) -> usize {
    // Snapshot the map so idle checks do not hold its lock
    let candidates: Vec<(String, Arc<Orchestrator>)> = sessions
        .lock()
        .await
        .iter()
        .map(|(id, orchestrator)| (id.clone(), orchestrator.clone()))
        .collect();

    let mut idle = Vec::new();
    for (id, orchestrator) in candidates {
        if orchestrator.is_idle(ttl, now).await {
            idle.push(id);
        }
    }

    let mut map = sessions.lock().await;
    for id in &idle {
        map.remove(id);
        tracing::info!(session = %id, "Idle session evicted");
    }
    idle.len()
}

/// Builds orchestrators that share one gateway
#[derive(Clone)]
pub struct SessionFactory {
    gateway: Arc<dyn Gateway>,
    recommendation_options: GenerationOptions,
    itinerary_options: GenerationOptions,
}

impl SessionFactory {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        recommendation_options: GenerationOptions,
        itinerary_options: GenerationOptions,
    ) -> Self {
        Self {
            gateway,
            recommendation_options,
            itinerary_options,
        }
    }

    pub fn from_config(gateway: Arc<dyn Gateway>, config: &PlannerConfig) -> Self {
        Self::new(gateway, config.recommendation_options(), config.itinerary_options())
    }

    fn create(&self) -> Orchestrator {
        Orchestrator::new(
            self.gateway.clone(),
            self.recommendation_options.clone(),
            self.itinerary_options.clone(),
        )
    }
}

/// Standard response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

type ApiError = (StatusCode, Json<ApiResponse<()>>);
type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

fn api_error(status: StatusCode, error: String) -> ApiError {
    (
        status,
        Json(ApiResponse {
            success: false,
            data: None,
            error: Some(error),
        }),
    )
}

/// Session projection plus its id
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub view: SessionView,
}

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub id: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn form_options() -> Json<ApiResponse<FormOptions>> {
    Json(ApiResponse::ok(FormOptions::default()))
}

async fn create_session(
    Extension(sessions): Extension<SessionManager>,
    Extension(factory): Extension<SessionFactory>,
) -> ApiResult<SessionResponse> {
    let session_id = format!("sess_{}", uuid::Uuid::new_v4());
    let orchestrator = Arc::new(factory.create());

    let response = session_response(&session_id, &orchestrator, orchestrator.view().await);
    sessions.lock().await.insert(session_id.clone(), orchestrator);

    tracing::info!(session = %session_id, "Session created");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(response))))
}

async fn get_session(
    Extension(sessions): Extension<SessionManager>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionResponse> {
    let orchestrator = find_session(&sessions, &session_id).await?;
    let view = orchestrator.view().await;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(session_response(&session_id, &orchestrator, view))),
    ))
}

async fn delete_session(
    Extension(sessions): Extension<SessionManager>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    match sessions.lock().await.remove(&session_id) {
        Some(_) => {
            tracing::info!(session = %session_id, "Session removed");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(unknown_session(&session_id)),
    }
}

async fn submit(
    Extension(sessions): Extension<SessionManager>,
    Path(session_id): Path<String>,
    Json(preferences): Json<PreferenceRecord>,
) -> ApiResult<SessionResponse> {
    let orchestrator = find_session(&sessions, &session_id).await?;
    tracing::info!(session = %session_id, "Preferences submitted");
    let result = orchestrator.submit(preferences).await;
    respond(&session_id, &orchestrator, result)
}

async fn select(
    Extension(sessions): Extension<SessionManager>,
    Path(session_id): Path<String>,
    Json(request): Json<SelectRequest>,
) -> ApiResult<SessionResponse> {
    let orchestrator = find_session(&sessions, &session_id).await?;
    tracing::info!(session = %session_id, recommendation = %request.id, "Recommendation selected");
    let result = orchestrator.select(&request.id).await;
    respond(&session_id, &orchestrator, result)
}

async fn back(
    Extension(sessions): Extension<SessionManager>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionResponse> {
    let orchestrator = find_session(&sessions, &session_id).await?;
    let result = orchestrator.back().await;
    respond(&session_id, &orchestrator, result)
}

async fn restart(
    Extension(sessions): Extension<SessionManager>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionResponse> {
    let orchestrator = find_session(&sessions, &session_id).await?;
    tracing::info!(session = %session_id, "Session restarted");
    let result = orchestrator.restart().await;
    respond(&session_id, &orchestrator, result)
}

async fn dismiss_error(
    Extension(sessions): Extension<SessionManager>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionResponse> {
    let orchestrator = find_session(&sessions, &session_id).await?;
    let result = orchestrator.dismiss_error().await;
    respond(&session_id, &orchestrator, result)
}

/// Raw markdown of the selected itinerary as a file attachment
async fn download_itinerary(
    Extension(sessions): Extension<SessionManager>,
    Path(session_id): Path<String>,
) -> Result<Response, ApiError> {
    let orchestrator = find_session(&sessions, &session_id).await?;
    let state = orchestrator.snapshot().await;

    let (Some(selected), Some(text)) = (state.selected.as_ref(), state.selected_itinerary()) else {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            "No itinerary has been generated for this session".to_string(),
        ));
    };

    let filename = itinerary_filename(&selected.title);
    Ok((
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&filename)),
        ],
        text.to_string(),
    )
        .into_response())
}

/// `attachment` with an ASCII fallback name and the exact name per RFC 5987
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(filename)
    )
}

async fn find_session(sessions: &SessionManager, session_id: &str) -> Result<Arc<Orchestrator>, ApiError> {
    // Clone out so the map lock is not held across backend calls
    sessions
        .lock()
        .await
        .get(session_id)
        .cloned()
        .ok_or_else(|| unknown_session(session_id))
}

fn unknown_session(session_id: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, format!("Unknown session: {}", session_id))
}

fn session_response(session_id: &str, orchestrator: &Orchestrator, view: SessionView) -> SessionResponse {
    SessionResponse {
        session_id: session_id.to_string(),
        created_at: orchestrator.created_at(),
        view,
    }
}

fn respond(
    session_id: &str,
    orchestrator: &Orchestrator,
    result: Result<SessionView, Rejection>,
) -> ApiResult<SessionResponse> {
    match result {
        Ok(view) => Ok((
            StatusCode::OK,
            Json(ApiResponse::ok(session_response(session_id, orchestrator, view))),
        )),
        Err(rejection) => {
            tracing::info!(session = %session_id, reason = %rejection, "Intent rejected");
            let status = match rejection {
                Rejection::InvalidPreferences(_) => StatusCode::UNPROCESSABLE_ENTITY,
                _ => StatusCode::CONFLICT,
            };
            Err(api_error(status, rejection.to_string()))
        }
    }
}

pub fn router(sessions: SessionManager, factory: SessionFactory) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/form/options", get(form_options))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_session).delete(delete_session))
        .route("/sessions/:id/submit", post(submit))
        .route("/sessions/:id/select", post(select))
        .route("/sessions/:id/back", post(back))
        .route("/sessions/:id/restart", post(restart))
        .route("/sessions/:id/dismiss-error", post(dismiss_error))
        .route("/sessions/:id/itinerary/download", get(download_itinerary))
        .layer(CorsLayer::permissive())
        .layer(Extension(sessions))
        .layer(Extension(factory))
}
