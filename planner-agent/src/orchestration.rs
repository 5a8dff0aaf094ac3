/// Session orchestration - drives the planning state machine for one browser session
/// This module owns the async side of the flow:
/// - applying intents through the pure reducer
/// - running backend calls outside the session lock
/// - feeding results back, dropping any that arrive after a restart

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::gateway::{Gateway, GenerationOptions};
use planner_core::extract::{parse_itinerary, parse_recommendations};
use planner_core::prompt::{itinerary_prompt, recommendation_prompt};
use planner_core::{
    Effect, Intent, PlanningError, PreferenceRecord, Rejection, SessionState, SessionView, Stage, reduce,
};

pub struct Orchestrator {
    gateway: Arc<dyn Gateway>,
    recommendation_options: GenerationOptions,
    itinerary_options: GenerationOptions,
    state: Mutex<SessionState>,
    created_at: DateTime<Utc>,
    /// Unix millis of the last client interaction
    last_active: AtomicI64,
}

impl Orchestrator {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        recommendation_options: GenerationOptions,
        itinerary_options: GenerationOptions,
    ) -> Self {
        let now = Utc::now();
        Self {
            gateway,
            recommendation_options,
            itinerary_options,
            state: Mutex::new(SessionState::new()),
            created_at: now,
            last_active: AtomicI64::new(now.timestamp_millis()),
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub async fn view(&self) -> SessionView {
        self.touch();
        self.state.lock().await.view()
    }

    pub async fn snapshot(&self) -> SessionState {
        self.touch();
        self.state.lock().await.clone()
    }

    /// True once the session has gone `ttl` without client interaction.
    /// A session waiting on a backend call is never idle.
    pub async fn is_idle(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        let idle_for = now.timestamp_millis() - self.last_active.load(Ordering::SeqCst);
        idle_for > ttl.num_milliseconds() && !self.state.lock().await.busy
    }

    fn touch(&self) {
        self.last_active.store(Utc::now().timestamp_millis(), Ordering::SeqCst);
    }

    pub async fn submit(&self, preferences: PreferenceRecord) -> Result<SessionView, Rejection> {
        self.dispatch(Intent::Submit(preferences)).await
    }

    pub async fn select(&self, recommendation_id: &str) -> Result<SessionView, Rejection> {
        self.dispatch(Intent::Select(recommendation_id.to_string())).await
    }

    pub async fn back(&self) -> Result<SessionView, Rejection> {
        self.dispatch(Intent::Back).await
    }

    pub async fn restart(&self) -> Result<SessionView, Rejection> {
        self.dispatch(Intent::Restart).await
    }

    pub async fn dismiss_error(&self) -> Result<SessionView, Rejection> {
        self.dispatch(Intent::DismissError).await
    }

    /// Apply a user intent, run whatever backend calls it requests, and
    /// return the resulting view. A rejected intent leaves the session as it was.
    pub async fn dispatch(&self, intent: Intent) -> Result<SessionView, Rejection> {
        self.touch();
        let mut pending: VecDeque<Effect> = self.apply(intent).await?.into();

        while let Some(effect) = pending.pop_front() {
            let resolution = self.run(effect).await;

            match self.apply(resolution).await {
                Ok(more) => pending.extend(more),
                Err(Rejection::Stale { issued, current }) => {
                    tracing::info!(issued, current, "Dropping backend result that arrived after restart");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Backend result rejected by session");
                }
            }
        }

        Ok(self.view().await)
    }

    /// Reduce under the lock; the lock is released before any backend call.
    async fn apply(&self, intent: Intent) -> Result<Vec<Effect>, Rejection> {
        let mut state = self.state.lock().await;
        let transition = reduce(&state, intent)?;
        *state = transition.state;
        Ok(transition.effects)
    }

    async fn run(&self, effect: Effect) -> Intent {
        match effect {
            Effect::FetchRecommendations {
                generation,
                preferences,
            } => {
                let prompt = recommendation_prompt(&preferences);
                tracing::info!(generation, "→ Requesting recommendations");

                let outcome = match self
                    .gateway
                    .request_recommendations(&prompt, &self.recommendation_options)
                    .await
                {
                    Ok(raw) => parse_recommendations(&raw),
                    Err(e) => Err(PlanningError::from(e)),
                };

                match &outcome {
                    Ok(batch) => tracing::info!(count = batch.len(), "✓ Recommendations received"),
                    Err(e) => log_failure(Stage::Recommendations, e),
                }

                Intent::RecommendationsResolved {
                    generation,
                    preferences,
                    outcome,
                }
            }
            Effect::FetchItinerary {
                generation,
                preferences,
                recommendation,
            } => {
                let prompt = itinerary_prompt(&preferences, &recommendation);
                tracing::info!(generation, recommendation = %recommendation.id, "→ Requesting itinerary");

                let outcome = match self
                    .gateway
                    .request_itinerary(&prompt, &self.itinerary_options)
                    .await
                {
                    Ok(raw) => parse_itinerary(&raw),
                    Err(e) => Err(PlanningError::from(e)),
                };

                match &outcome {
                    Ok(text) => tracing::info!(len = text.len(), "✓ Itinerary received"),
                    Err(e) => log_failure(Stage::Itinerary, e),
                }

                Intent::ItineraryResolved {
                    generation,
                    recommendation,
                    outcome,
                }
            }
        }
    }
}

fn log_failure(stage: Stage, error: &PlanningError) {
    match error {
        PlanningError::Parse { reason, raw } => {
            tracing::warn!(?stage, %reason, %raw, "✗ Could not parse backend output");
        }
        other => tracing::warn!(?stage, error = %other, "✗ Backend call failed"),
    }
}
