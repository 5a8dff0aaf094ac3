use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Trip constraints submitted from the preference form.
///
/// Optional fields default to empty, and empty means "let the model decide".
/// Equality is field-for-field, which is what the resubmission cache relies on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceRecord {
    #[serde(default)]
    pub time_of_year: String,
    pub duration: String,
    pub travelers: String,
    pub budget: String,
    #[serde(default)]
    pub primary_goal: Vec<String>,
    pub food_preferences: String,
    pub activity_preferences: String,
    #[serde(default)]
    pub transportation: Vec<String>,
    /// Free text, may list alternatives such as "Japan or South Korea"
    #[serde(default)]
    pub locations: String,
    #[serde(default)]
    pub must_see_locations: String,
}

impl PreferenceRecord {
    /// Checks that every required field carries a non-blank value.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("duration", &self.duration),
            ("travelers", &self.travelers),
            ("budget", &self.budget),
            ("foodPreferences", &self.food_preferences),
            ("activityPreferences", &self.activity_preferences),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField(name));
            }
        }
        Ok(())
    }
}

/// One destination proposed by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Unique within a batch; keys the itinerary cache
    pub id: String,
    pub title: String,
    pub description: String,
    pub highlights: Vec<String>,
    /// Numeric range, e.g. "$2,000 - $3,000"
    pub estimated_cost: String,
    pub best_time_to_go: String,
}
