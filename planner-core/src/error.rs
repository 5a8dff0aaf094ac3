use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::View;

/// Which backend call a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Recommendations,
    Itinerary,
}

impl Stage {
    /// The only text a user ever sees for a failed stage.
    pub fn user_message(self) -> &'static str {
        match self {
            Stage::Recommendations => "Couldn't generate recommendations. Please try again.",
            Stage::Itinerary => "Couldn't generate the itinerary. Please try again.",
        }
    }
}

/// Why a backend round trip produced nothing usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanningError {
    #[error("backend call failed: {0}")]
    Transport(String),

    #[error("backend returned no usable result")]
    EmptyResult,

    #[error("failed to parse recommendations: {reason}")]
    Parse { reason: String, raw: String },
}

/// A preference record that cannot be submitted yet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// An intent the session refused to apply. The session state is untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("a request is already in flight")]
    Busy,

    #[error("intent requires the {expected:?} view, session is on {actual:?}")]
    WrongView { expected: View, actual: View },

    #[error("unknown recommendation: {0}")]
    UnknownRecommendation(String),

    #[error("invalid preferences: {0}")]
    InvalidPreferences(#[from] ValidationError),

    #[error("no accepted preferences to plan against")]
    NoAcceptedPreferences,

    #[error("result from generation {issued} arrived after restart (now {current})")]
    Stale { issued: u64, current: u64 },
}
