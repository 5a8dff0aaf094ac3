/// Form collaborator surface: the option catalogs the preference form offers,
/// and the filename used when an itinerary is saved to disk.

use serde::Serialize;

pub const TIME_OF_YEAR: &[&str] = &["Spring", "Summer", "Autumn", "Winter", "Flexible"];
pub const DURATION: &[&str] = &["Weekend (2-3 days)", "1 Week", "2 Weeks", "1 Month+"];
pub const TRAVELERS: &[&str] = &["Solo", "Couple", "Family", "Group of Friends"];
pub const BUDGET: &[&str] = &["Budget-friendly", "Moderate", "Luxury"];
pub const PRIMARY_GOAL: &[&str] = &[
    "Relaxation",
    "Adventure",
    "Cultural Exploration",
    "Nature & Wildlife",
    "Food & Culinary",
    "Party & Nightlife",
];
pub const TRANSPORTATION: &[&str] = &["Public Transit", "Rental Car", "Walking/Biking", "Taxis/Rideshare"];

/// Option catalogs served to the form view
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormOptions {
    pub time_of_year: &'static [&'static str],
    pub duration: &'static [&'static str],
    pub travelers: &'static [&'static str],
    pub budget: &'static [&'static str],
    pub primary_goal: &'static [&'static str],
    pub transportation: &'static [&'static str],
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            time_of_year: TIME_OF_YEAR,
            duration: DURATION,
            travelers: TRAVELERS,
            budget: BUDGET,
            primary_goal: PRIMARY_GOAL,
            transportation: TRANSPORTATION,
        }
    }
}

/// `"Kyoto Temples  & Trails"` -> `"Kyoto_Temples_&_Trails_Itinerary.md"`.
/// Each run of whitespace collapses into a single underscore.
pub fn itinerary_filename(title: &str) -> String {
    let mut name = String::with_capacity(title.len() + 13);
    let mut in_whitespace = false;

    for c in title.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                name.push('_');
            }
            in_whitespace = true;
        } else {
            name.push(c);
            in_whitespace = false;
        }
    }

    name.push_str("_Itinerary.md");
    name
}
