/// Session state machine for the three-stage planning flow.
///
/// `reduce` maps the current state and one intent to the next state plus the
/// backend calls to perform. It never performs I/O. The caller runs each
/// [`Effect`], then feeds the outcome back in as a `*Resolved` intent tagged
/// with the generation the effect was issued under. `Restart` bumps the
/// generation, so a result that arrives after a restart is rejected as
/// [`Rejection::Stale`] instead of overwriting the fresh session.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{PlanningError, Rejection, Stage};
use crate::model::{PreferenceRecord, Recommendation};

/// Which screen the session is on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Input,
    Recommendations,
    Itinerary,
}

/// Diagnostic record of the last failed backend round trip.
/// Kept for logs and tests; never part of [`SessionView`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub stage: Stage,
    pub error: PlanningError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub view: View,
    /// Bumped on every restart; results from older generations are dropped
    pub generation: u64,
    /// Snapshot accepted by the last successful recommendation request
    pub preferences: Option<PreferenceRecord>,
    pub recommendations: Vec<Recommendation>,
    pub selected: Option<Recommendation>,
    /// recommendation id -> itinerary markdown
    pub itineraries: BTreeMap<String, String>,
    pub busy: bool,
    pub last_error: Option<String>,
    pub last_failure: Option<Failure>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached itinerary of the selected recommendation, if any.
    pub fn selected_itinerary(&self) -> Option<&str> {
        let selected = self.selected.as_ref()?;
        self.itineraries.get(&selected.id).map(String::as_str)
    }

    /// Read-only projection handed to the views.
    pub fn view(&self) -> SessionView {
        let itinerary = match self.view {
            View::Itinerary => self.selected_itinerary().map(str::to_string),
            _ => None,
        };

        SessionView {
            view: self.view,
            busy: self.busy,
            last_error: self.last_error.clone(),
            preferences: self.preferences.clone(),
            recommendations: self.recommendations.clone(),
            selected: self.selected.clone(),
            itinerary,
            cached_itineraries: self.itineraries.keys().cloned().collect(),
        }
    }
}

/// What the views see of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub view: View,
    pub busy: bool,
    pub last_error: Option<String>,
    /// Echoed back so the form can prefill the last accepted submission
    pub preferences: Option<PreferenceRecord>,
    pub recommendations: Vec<Recommendation>,
    pub selected: Option<Recommendation>,
    pub itinerary: Option<String>,
    pub cached_itineraries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Submit(PreferenceRecord),
    /// Select a recommendation of the current batch by id
    Select(String),
    Back,
    Restart,
    DismissError,
    RecommendationsResolved {
        generation: u64,
        preferences: PreferenceRecord,
        outcome: Result<Vec<Recommendation>, PlanningError>,
    },
    ItineraryResolved {
        generation: u64,
        recommendation: Recommendation,
        outcome: Result<String, PlanningError>,
    },
}

/// Backend call requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchRecommendations {
        generation: u64,
        preferences: PreferenceRecord,
    },
    FetchItinerary {
        generation: u64,
        preferences: PreferenceRecord,
        recommendation: Recommendation,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: SessionState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn settled(state: SessionState) -> Self {
        Self {
            state,
            effects: Vec::new(),
        }
    }

    fn fetch(state: SessionState, effect: Effect) -> Self {
        Self {
            state,
            effects: vec![effect],
        }
    }
}

/// Apply one intent. On `Err` the caller keeps the state it passed in.
pub fn reduce(state: &SessionState, intent: Intent) -> Result<Transition, Rejection> {
    match intent {
        Intent::Submit(preferences) => submit(state, preferences),
        Intent::Select(id) => select(state, &id),
        Intent::Back => back(state),
        Intent::Restart => Ok(Transition::settled(SessionState {
            generation: state.generation.wrapping_add(1),
            ..SessionState::default()
        })),
        Intent::DismissError => {
            let mut next = state.clone();
            next.last_error = None;
            Ok(Transition::settled(next))
        }
        Intent::RecommendationsResolved {
            generation,
            preferences,
            outcome,
        } => {
            ensure_current(state, generation)?;
            Ok(Transition::settled(recommendations_resolved(state, preferences, outcome)))
        }
        Intent::ItineraryResolved {
            generation,
            recommendation,
            outcome,
        } => {
            ensure_current(state, generation)?;
            Ok(Transition::settled(itinerary_resolved(state, recommendation, outcome)))
        }
    }
}

fn submit(state: &SessionState, preferences: PreferenceRecord) -> Result<Transition, Rejection> {
    if state.busy {
        return Err(Rejection::Busy);
    }
    expect_view(state, View::Input)?;
    preferences.validate()?;

    let mut next = state.clone();

    let unchanged = state.preferences.as_ref() == Some(&preferences);
    if unchanged && !state.recommendations.is_empty() {
        tracing::debug!("Preferences unchanged, reusing recommendations");
        next.view = View::Recommendations;
        return Ok(Transition::settled(next));
    }

    next.busy = true;
    next.last_error = None;
    let effect = Effect::FetchRecommendations {
        generation: state.generation,
        preferences,
    };
    Ok(Transition::fetch(next, effect))
}

fn select(state: &SessionState, id: &str) -> Result<Transition, Rejection> {
    if state.busy {
        return Err(Rejection::Busy);
    }
    expect_view(state, View::Recommendations)?;

    let recommendation = state
        .recommendations
        .iter()
        .find(|r| r.id == id)
        .cloned()
        .ok_or_else(|| Rejection::UnknownRecommendation(id.to_string()))?;

    let mut next = state.clone();

    if state.itineraries.contains_key(id) {
        tracing::debug!(recommendation = %id, "Reusing cached itinerary");
        next.selected = Some(recommendation);
        next.view = View::Itinerary;
        return Ok(Transition::settled(next));
    }

    let preferences = state
        .preferences
        .clone()
        .ok_or(Rejection::NoAcceptedPreferences)?;

    next.busy = true;
    next.last_error = None;
    let effect = Effect::FetchItinerary {
        generation: state.generation,
        preferences,
        recommendation,
    };
    Ok(Transition::fetch(next, effect))
}

fn back(state: &SessionState) -> Result<Transition, Rejection> {
    if state.busy {
        return Err(Rejection::Busy);
    }

    let mut next = state.clone();
    next.view = match state.view {
        View::Input => View::Input,
        View::Recommendations => View::Input,
        View::Itinerary => View::Recommendations,
    };
    Ok(Transition::settled(next))
}

fn recommendations_resolved(
    state: &SessionState,
    preferences: PreferenceRecord,
    outcome: Result<Vec<Recommendation>, PlanningError>,
) -> SessionState {
    let mut next = state.clone();
    next.busy = false;

    match outcome {
        Ok(batch) if !batch.is_empty() => {
            next.preferences = Some(preferences);
            next.recommendations = batch;
            next.selected = None;
            // Itineraries were planned against the superseded batch
            next.itineraries.clear();
            next.last_error = None;
            next.view = View::Recommendations;
        }
        Ok(_) => fail(&mut next, Stage::Recommendations, PlanningError::EmptyResult),
        Err(error) => fail(&mut next, Stage::Recommendations, error),
    }

    next
}

fn itinerary_resolved(
    state: &SessionState,
    recommendation: Recommendation,
    outcome: Result<String, PlanningError>,
) -> SessionState {
    let mut next = state.clone();
    next.busy = false;

    match outcome {
        Ok(text) if !text.trim().is_empty() => {
            next.itineraries.insert(recommendation.id.clone(), text);
            next.selected = Some(recommendation);
            next.last_error = None;
            next.view = View::Itinerary;
        }
        Ok(_) => fail(&mut next, Stage::Itinerary, PlanningError::EmptyResult),
        Err(error) => fail(&mut next, Stage::Itinerary, error),
    }

    next
}

fn fail(state: &mut SessionState, stage: Stage, error: PlanningError) {
    state.last_error = Some(stage.user_message().to_string());
    state.last_failure = Some(Failure { stage, error });
}

fn expect_view(state: &SessionState, expected: View) -> Result<(), Rejection> {
    if state.view != expected {
        return Err(Rejection::WrongView {
            expected,
            actual: state.view,
        });
    }
    Ok(())
}

fn ensure_current(state: &SessionState, issued: u64) -> Result<(), Rejection> {
    if issued != state.generation {
        return Err(Rejection::Stale {
            issued,
            current: state.generation,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    fn prefs() -> PreferenceRecord {
        PreferenceRecord {
            duration: "1 Week".to_string(),
            travelers: "Solo".to_string(),
            budget: "Moderate".to_string(),
            primary_goal: vec!["Adventure".to_string()],
            food_preferences: "Vegetarian".to_string(),
            activity_preferences: "Hiking".to_string(),
            transportation: vec!["Walking/Biking".to_string()],
            ..Default::default()
        }
    }

    fn rec(id: &str) -> Recommendation {
        Recommendation {
            id: id.to_string(),
            title: format!("Trip {}", id),
            description: "A fine trip".to_string(),
            highlights: vec!["Views".to_string(), "Food".to_string(), "Trails".to_string()],
            estimated_cost: "$1,500 - $2,500".to_string(),
            best_time_to_go: "May".to_string(),
        }
    }

    fn apply(state: &SessionState, intent: Intent) -> Transition {
        reduce(state, intent).expect("intent should be accepted")
    }

    /// Submit and resolve successfully, landing on the recommendations view.
    fn with_batch(ids: &[&str]) -> SessionState {
        let submitted = apply(&SessionState::new(), Intent::Submit(prefs()));
        let resolved = apply(
            &submitted.state,
            Intent::RecommendationsResolved {
                generation: 0,
                preferences: prefs(),
                outcome: Ok(ids.iter().map(|id| rec(id)).collect()),
            },
        );
        resolved.state
    }

    fn with_itinerary(state: &SessionState, id: &str, text: &str) -> SessionState {
        let selected = apply(state, Intent::Select(id.to_string()));
        apply(
            &selected.state,
            Intent::ItineraryResolved {
                generation: selected.state.generation,
                recommendation: rec(id),
                outcome: Ok(text.to_string()),
            },
        )
        .state
    }

    #[test]
    fn test_initial_state() {
        let state = SessionState::new();
        assert_eq!(state.view, View::Input);
        assert!(!state.busy);
        assert!(state.last_error.is_none());
        assert!(state.itineraries.is_empty());
    }

    #[test]
    fn test_submit_issues_fetch_and_sets_busy() {
        let t = apply(&SessionState::new(), Intent::Submit(prefs()));

        assert!(t.state.busy);
        assert_eq!(t.state.view, View::Input);
        assert_eq!(
            t.effects,
            vec![Effect::FetchRecommendations {
                generation: 0,
                preferences: prefs()
            }]
        );
        // Not accepted until the backend answers
        assert!(t.state.preferences.is_none());
    }

    #[test]
    fn test_successful_batch_moves_to_recommendations() {
        let state = with_batch(&["a", "b", "c"]);

        assert_eq!(state.view, View::Recommendations);
        assert!(!state.busy);
        assert_eq!(state.preferences, Some(prefs()));
        assert_eq!(state.recommendations.len(), 3);
    }

    #[test]
    fn test_unchanged_resubmission_is_a_cache_hit() {
        let state = with_batch(&["a", "b"]);
        let state = apply(&state, Intent::Back).state;

        let t = apply(&state, Intent::Submit(prefs()));

        assert!(t.effects.is_empty());
        assert!(!t.state.busy);
        assert_eq!(t.state.view, View::Recommendations);
    }

    #[test]
    fn test_changed_resubmission_fetches_again() {
        let state = with_batch(&["a"]);
        let state = apply(&state, Intent::Back).state;

        let mut changed = prefs();
        changed.budget = "Luxury".to_string();
        let t = apply(&state, Intent::Submit(changed));

        assert_eq!(t.effects.len(), 1);
        assert!(t.state.busy);
    }

    #[test]
    fn test_new_batch_wipes_cached_itineraries() {
        let state = with_batch(&["a", "b"]);
        let state = with_itinerary(&state, "a", "# Plan A");
        assert_eq!(state.itineraries.len(), 1);

        let state = apply(&state, Intent::Back).state;
        let state = apply(&state, Intent::Back).state;
        let mut changed = prefs();
        changed.duration = "2 Weeks".to_string();
        let submitted = apply(&state, Intent::Submit(changed.clone()));
        let resolved = apply(
            &submitted.state,
            Intent::RecommendationsResolved {
                generation: 0,
                preferences: changed.clone(),
                outcome: Ok(vec![rec("a"), rec("z")]),
            },
        );

        assert!(resolved.state.itineraries.is_empty());
        assert!(resolved.state.selected.is_none());
        assert_eq!(resolved.state.preferences, Some(changed));
    }

    #[test]
    fn test_empty_batch_is_treated_as_failure() {
        let submitted = apply(&SessionState::new(), Intent::Submit(prefs()));
        let resolved = apply(
            &submitted.state,
            Intent::RecommendationsResolved {
                generation: 0,
                preferences: prefs(),
                outcome: Ok(Vec::new()),
            },
        );

        assert_eq!(resolved.state.view, View::Input);
        assert!(!resolved.state.busy);
        assert_eq!(
            resolved.state.last_error.as_deref(),
            Some("Couldn't generate recommendations. Please try again.")
        );
        assert!(resolved.state.preferences.is_none());
        assert_eq!(
            resolved.state.last_failure.map(|f| f.error),
            Some(PlanningError::EmptyResult)
        );
    }

    #[test]
    fn test_failure_keeps_previous_batch_and_preferences() {
        let state = with_batch(&["a", "b"]);
        let state = apply(&state, Intent::Back).state;

        let mut changed = prefs();
        changed.travelers = "Family".to_string();
        let submitted = apply(&state, Intent::Submit(changed.clone()));
        let resolved = apply(
            &submitted.state,
            Intent::RecommendationsResolved {
                generation: 0,
                preferences: changed,
                outcome: Err(PlanningError::Transport("connection reset".to_string())),
            },
        );

        assert_eq!(resolved.state.view, View::Input);
        assert_eq!(resolved.state.preferences, Some(prefs()));
        assert_eq!(resolved.state.recommendations.len(), 2);
        assert!(resolved.state.last_error.is_some());
    }

    #[test]
    fn test_select_fetches_itinerary_against_accepted_preferences() {
        let state = with_batch(&["a", "b"]);
        let t = apply(&state, Intent::Select("b".to_string()));

        assert!(t.state.busy);
        assert_eq!(
            t.effects,
            vec![Effect::FetchItinerary {
                generation: 0,
                preferences: prefs(),
                recommendation: rec("b"),
            }]
        );
    }

    #[test]
    fn test_cached_itinerary_selection_skips_fetch() {
        let state = with_batch(&["a", "b"]);
        let state = with_itinerary(&state, "a", "# Plan A");
        let state = apply(&state, Intent::Back).state;
        assert_eq!(state.view, View::Recommendations);

        let t = apply(&state, Intent::Select("a".to_string()));

        assert!(t.effects.is_empty());
        assert_eq!(t.state.view, View::Itinerary);
        assert_eq!(t.state.view().itinerary.as_deref(), Some("# Plan A"));
    }

    #[test]
    fn test_blank_itinerary_stays_on_recommendations() {
        let state = with_batch(&["a"]);
        let selected = apply(&state, Intent::Select("a".to_string()));
        let resolved = apply(
            &selected.state,
            Intent::ItineraryResolved {
                generation: 0,
                recommendation: rec("a"),
                outcome: Ok("   ".to_string()),
            },
        );

        assert_eq!(resolved.state.view, View::Recommendations);
        assert!(resolved.state.itineraries.is_empty());
        assert_eq!(
            resolved.state.last_error.as_deref(),
            Some("Couldn't generate the itinerary. Please try again.")
        );
    }

    #[test]
    fn test_busy_blocks_second_request() {
        let submitted = apply(&SessionState::new(), Intent::Submit(prefs()));

        assert_eq!(reduce(&submitted.state, Intent::Submit(prefs())), Err(Rejection::Busy));
        assert_eq!(reduce(&submitted.state, Intent::Back), Err(Rejection::Busy));
    }

    #[test]
    fn test_intents_outside_their_view_are_rejected() {
        let state = SessionState::new();
        assert_eq!(
            reduce(&state, Intent::Select("a".to_string())),
            Err(Rejection::WrongView {
                expected: View::Recommendations,
                actual: View::Input
            })
        );

        let state = with_batch(&["a"]);
        assert!(matches!(
            reduce(&state, Intent::Submit(prefs())),
            Err(Rejection::WrongView { .. })
        ));
        assert_eq!(
            reduce(&state, Intent::Select("nope".to_string())),
            Err(Rejection::UnknownRecommendation("nope".to_string()))
        );
    }

    #[test]
    fn test_incomplete_preferences_are_rejected() {
        let mut incomplete = prefs();
        incomplete.duration.clear();
        assert_eq!(
            reduce(&SessionState::new(), Intent::Submit(incomplete)),
            Err(Rejection::InvalidPreferences(ValidationError::MissingField("duration")))
        );
    }

    #[test]
    fn test_back_navigation() {
        let state = with_batch(&["a"]);
        let state = with_itinerary(&state, "a", "# Plan");
        assert_eq!(state.view, View::Itinerary);

        let state = apply(&state, Intent::Back).state;
        assert_eq!(state.view, View::Recommendations);
        let state = apply(&state, Intent::Back).state;
        assert_eq!(state.view, View::Input);
        let state = apply(&state, Intent::Back).state;
        assert_eq!(state.view, View::Input);
        // Navigation never drops cached data
        assert_eq!(state.itineraries.len(), 1);
        assert_eq!(state.recommendations.len(), 1);
    }

    #[test]
    fn test_restart_resets_everything() {
        let state = with_batch(&["a", "b"]);
        let state = with_itinerary(&state, "a", "# Plan");
        let busy = apply(&apply(&state, Intent::Back).state, Intent::Select("b".to_string())).state;
        assert!(busy.busy);

        let restarted = apply(&busy, Intent::Restart).state;

        assert_eq!(
            restarted,
            SessionState {
                generation: 1,
                ..SessionState::default()
            }
        );
    }

    #[test]
    fn test_late_result_after_restart_is_stale() {
        let submitted = apply(&SessionState::new(), Intent::Submit(prefs()));
        let restarted = apply(&submitted.state, Intent::Restart).state;

        let late = reduce(
            &restarted,
            Intent::RecommendationsResolved {
                generation: 0,
                preferences: prefs(),
                outcome: Ok(vec![rec("a")]),
            },
        );

        assert_eq!(late, Err(Rejection::Stale { issued: 0, current: 1 }));
    }

    #[test]
    fn test_late_itinerary_after_restart_is_stale() {
        let batch = with_batch(&["a", "b"]);
        let selecting = apply(&batch, Intent::Select("a".to_string()));
        let restarted = apply(&selecting.state, Intent::Restart).state;

        let late = reduce(
            &restarted,
            Intent::ItineraryResolved {
                generation: 0,
                recommendation: rec("a"),
                outcome: Ok("# Day 1".to_string()),
            },
        );

        assert_eq!(late, Err(Rejection::Stale { issued: 0, current: 1 }));
        assert!(restarted.itineraries.is_empty());
        assert_eq!(
            restarted,
            SessionState {
                generation: 1,
                ..SessionState::default()
            }
        );
    }

    #[test]
    fn test_dismiss_error_clears_banner_only() {
        let submitted = apply(&SessionState::new(), Intent::Submit(prefs()));
        let failed = apply(
            &submitted.state,
            Intent::RecommendationsResolved {
                generation: 0,
                preferences: prefs(),
                outcome: Err(PlanningError::EmptyResult),
            },
        )
        .state;

        let dismissed = apply(&failed, Intent::DismissError).state;
        assert!(dismissed.last_error.is_none());
        assert!(dismissed.last_failure.is_some());
    }
}
