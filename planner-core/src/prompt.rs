/// Prompt construction for the two backend calls.
/// Both builders are pure: same preferences in, same prompt out.

use serde_json::{json, Value};

use crate::model::{PreferenceRecord, Recommendation};

/// Number of recommendations requested per batch.
pub const RECOMMENDATION_COUNT: usize = 3;

/// Sentinel used when a multi-select field has no selection.
pub const ANY: &str = "Any";

const INFER_TIME_OF_YEAR: &str = "Not specified. Please recommend the best time of year to visit.";
const INFER_LOCATIONS: &str =
    "Not specified. Please recommend suitable destinations based on the other criteria.";
const NO_MUST_SEE: &str = "None specified";

/// Build the instruction asking for a batch of destination recommendations.
pub fn recommendation_prompt(prefs: &PreferenceRecord) -> String {
    let locations = split_locations(&prefs.locations);

    let (locations_line, constraint) = if locations.is_empty() {
        (INFER_LOCATIONS.to_string(), String::new())
    } else {
        (prefs.locations.trim().to_string(), location_constraint(&locations))
    };

    format!(
        r#"Based on the following travel preferences, provide {count} distinct travel recommendations.
Time of Year: {time_of_year}
Duration: {duration}
Travelers: {travelers}
Budget: {budget}
Primary Goals: {goals}
Food Preferences: {food}
Activity Preferences: {activities}
Transportation: {transportation}
Preferred Locations/Regions: {locations_line}
Must-See Locations: {must_see}
{constraint}
COST FORMAT: "estimatedCost" MUST be a numeric price range for the whole trip in USD, formatted like "$2,000 - $3,000". Never use vague terms such as "affordable", "moderate", "cheap", "expensive" or "budget-friendly".

You MUST return your response as a valid JSON array of {count} objects. Do not include any other text or markdown formatting outside the JSON array.
Each object in the array must have exactly these keys:
- "id": a unique string identifier
- "title": string, the destination and a catchy title
- "description": string, a brief paragraph describing why this is a good fit
- "highlights": array of strings, 3-4 key highlights or activities
- "estimatedCost": string, the numeric USD cost range described above
- "bestTimeToGo": string, the recommended time of year or specific months to visit"#,
        count = RECOMMENDATION_COUNT,
        time_of_year = or_default(&prefs.time_of_year, INFER_TIME_OF_YEAR),
        duration = prefs.duration.trim(),
        travelers = prefs.travelers.trim(),
        budget = prefs.budget.trim(),
        goals = join_or_any(&prefs.primary_goal),
        food = prefs.food_preferences.trim(),
        activities = prefs.activity_preferences.trim(),
        transportation = join_or_any(&prefs.transportation),
        locations_line = locations_line,
        must_see = or_default(&prefs.must_see_locations, NO_MUST_SEE),
        constraint = constraint,
    )
}

/// Build the instruction asking for a detailed plan for the chosen destination.
/// Location constraints are already resolved by the choice, so they are not repeated.
pub fn itinerary_prompt(prefs: &PreferenceRecord, chosen: &Recommendation) -> String {
    format!(
        r#"Create a detailed, day-by-day itinerary and travel tips for the following trip:
Destination: {destination}
Time of Year: {time_of_year}
Duration: {duration}
Travelers: {travelers}
Budget: {budget}
Primary Goals: {goals}
Food Preferences: {food}
Activity Preferences: {activities}
Transportation: {transportation}
Must-See Locations: {must_see}

Please format the response in Markdown. Include these four sections:
1. Introduction: a brief overview of the trip.
2. Day-by-day itinerary: for every day, separate Morning, Afternoon and Evening plans.
3. Practical tips: packing, local customs, safety, getting around.
4. Food recommendations: dishes and places that suit these food preferences: {food}."#,
        destination = chosen.title.trim(),
        time_of_year = or_default(&prefs.time_of_year, chosen.best_time_to_go.trim()),
        duration = prefs.duration.trim(),
        travelers = prefs.travelers.trim(),
        budget = prefs.budget.trim(),
        goals = join_or_any(&prefs.primary_goal),
        food = prefs.food_preferences.trim(),
        activities = prefs.activity_preferences.trim(),
        transportation = join_or_any(&prefs.transportation),
        must_see = or_default(&prefs.must_see_locations, NO_MUST_SEE),
    )
}

/// Strict response schema for the recommendations call: an array of objects
/// with all six fields required.
pub fn recommendation_schema() -> Value {
    json!({
        "type": "ARRAY",
        "description": format!("Exactly {} distinct travel recommendations", RECOMMENDATION_COUNT),
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": {
                    "type": "STRING",
                    "description": "A unique identifier for this recommendation"
                },
                "title": {
                    "type": "STRING",
                    "description": "The destination and a catchy title"
                },
                "description": {
                    "type": "STRING",
                    "description": "A brief paragraph describing why this is a good fit"
                },
                "highlights": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" },
                    "description": "3-4 key highlights or activities"
                },
                "estimatedCost": {
                    "type": "STRING",
                    "description": "Numeric total cost range in USD, e.g. \"$2,000 - $3,000\""
                },
                "bestTimeToGo": {
                    "type": "STRING",
                    "description": "The recommended time of year or specific months to visit"
                }
            },
            "required": ["id", "title", "description", "highlights", "estimatedCost", "bestTimeToGo"]
        }
    })
}

/// Split a free-text location field into distinct locations.
///
/// Only the standalone word "or" separates entries, so "Kyoto, Japan" stays
/// one location and "Oregon" stays intact.
pub fn split_locations(raw: &str) -> Vec<String> {
    let mut locations = Vec::new();
    let mut words: Vec<&str> = Vec::new();

    for word in raw.split_whitespace() {
        if word.eq_ignore_ascii_case("or") {
            push_location(&mut locations, &words);
            words.clear();
        } else {
            words.push(word);
        }
    }
    push_location(&mut locations, &words);

    locations
}

fn push_location(locations: &mut Vec<String>, words: &[&str]) {
    let joined = words.join(" ");
    let location = joined.trim_matches(|c: char| c == ',' || c.is_whitespace());
    if location.is_empty() {
        return;
    }
    if !locations.iter().any(|l| l.eq_ignore_ascii_case(location)) {
        locations.push(location.to_string());
    }
}

fn location_constraint(locations: &[String]) -> String {
    let mut constraint = format!(
        "\nLOCATION CONSTRAINT (MANDATORY): Recommend destinations ONLY within: {}. \
         Every recommendation must be located there. Do NOT recommend or substitute any other country, region or city.\n",
        locations.join("; ")
    );

    if locations.len() < RECOMMENDATION_COUNT {
        constraint.push_str(&format!(
            "Only {} location(s) were given for {} recommendations, so provide {} distinct trip styles \
             (for example different regions, themes or paces) within the location(s) above to fill the list.\n",
            locations.len(),
            RECOMMENDATION_COUNT,
            RECOMMENDATION_COUNT
        ));
    }

    constraint
}

fn join_or_any(values: &[String]) -> String {
    let picked: Vec<&str> = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect();

    if picked.is_empty() {
        ANY.to_string()
    } else {
        picked.join(", ")
    }
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    let value = value.trim();
    if value.is_empty() { default } else { value }
}
