/// Tolerant extraction of structured data from model output.
/// Models wrap JSON in prose or code fences often enough that the
/// recommendation path always runs through `extract_json_array`, even when
/// strict schema output is requested.

use std::collections::HashSet;

use crate::error::PlanningError;
use crate::model::Recommendation;

/// Slice from the first `[` to the last `]`, inclusive.
///
/// Falls back to the whole input when there is no such pair. Bracket balance
/// and nesting are not checked; parsing decides whether the slice is valid.
pub fn extract_json_array(raw: &str) -> &str {
    let json_start = raw.find('[');
    let json_end = raw.rfind(']');

    match (json_start, json_end) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => raw,
    }
}

/// Parse a recommendation batch out of raw model text.
///
/// An empty array is reported as [`PlanningError::EmptyResult`], never as an
/// empty success. Anything that is not an array of complete recommendations
/// with unique ids is a [`PlanningError::Parse`] carrying the raw text.
pub fn parse_recommendations(raw: &str) -> Result<Vec<Recommendation>, PlanningError> {
    let json_str = extract_json_array(raw);

    let batch: Vec<Recommendation> = serde_json::from_str(json_str).map_err(|e| {
        tracing::warn!(error = %e, raw = %raw, "Failed to parse JSON response");
        parse_failure(e.to_string(), raw)
    })?;

    if batch.is_empty() {
        tracing::warn!(raw = %raw, "Backend returned an empty recommendation array");
        return Err(PlanningError::EmptyResult);
    }

    let mut seen = HashSet::new();
    for rec in &batch {
        if rec.id.trim().is_empty() {
            return Err(parse_failure("recommendation with empty id".to_string(), raw));
        }
        if !seen.insert(rec.id.as_str()) {
            return Err(parse_failure(format!("duplicate recommendation id {:?}", rec.id), raw));
        }
        if rec.highlights.is_empty() {
            return Err(parse_failure(format!("recommendation {:?} has no highlights", rec.id), raw));
        }
    }

    Ok(batch)
}

/// Itinerary text is markdown and passes through verbatim; only blank output fails.
pub fn parse_itinerary(raw: &str) -> Result<String, PlanningError> {
    if raw.trim().is_empty() {
        return Err(PlanningError::EmptyResult);
    }
    Ok(raw.to_string())
}

fn parse_failure(reason: String, raw: &str) -> PlanningError {
    PlanningError::Parse {
        reason,
        raw: raw.to_string(),
    }
}
