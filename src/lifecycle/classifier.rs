use crate::models::incident::IncidentType;

/// Keyword rules, checked in order; the first rule with any matching keyword wins.
const RULES: &[(&[&str], IncidentType)] = &[
    (&["engine"], IncidentType::EngineFailure),
    (&["turbulence"], IncidentType::Turbulence),
    (&["human", "pilot"], IncidentType::HumanError),
    (&["weather", "storm"], IncidentType::WeatherIssue),
];

/// Derives the incident type from a free-text description.
///
/// Matching is a case-insensitive substring test, so "engines" and
/// "copilot" match too.
pub fn classify_incident(description: &str) -> IncidentType {
    let description = description.to_lowercase();

    RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|keyword| description.contains(keyword)))
        .map(|(_, incident_type)| *incident_type)
        .unwrap_or(IncidentType::Other)
}
