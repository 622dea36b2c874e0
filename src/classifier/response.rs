//! Prompt rendering and parsing of the line-prefixed answer format

use crate::models::{Analysis, Event, Severity};

pub const SYSTEM_PROMPT: &str = "You are a cybersecurity expert analyzing Linux authentication logs.
Your task is to:
1. Assess the severity (low, medium, high, critical)
2. Explain why this event matters in plain English
3. Provide 2-3 actionable recommendations
4. Determine if this is a real threat or normal activity

Be concise but helpful. Focus on practical advice for system administrators.";

/// Render the event fields handed to the model
pub fn event_summary(event: &Event) -> String {
    format!(
        "Event Type: {}\nService: {}\nUsername: {}\nSource IP: {}\nMessage: {}\nInitial Severity: {}\n",
        event.event_type,
        event.service,
        event.username_or_na(),
        event.source_ip_or_na(),
        event.message,
        event.severity,
    )
}

/// Build the user prompt asking for an answer in the expected format
pub fn user_prompt(event: &Event) -> String {
    format!(
        "Analyze this authentication event and provide:
1. Severity level
2. Brief explanation (2-3 sentences)
3. List of recommendations

Event details:
{}
Respond in this format:
SEVERITY: [level]
EXPLANATION: [your explanation]
RECOMMENDATIONS:
- [recommendation 1]
- [recommendation 2]
- [recommendation 3]
IS_THREAT: [yes/no]
",
        event_summary(event)
    )
}

/// Parse a model answer into an [`Analysis`]
///
/// Lines are inspected independently and anything unrecognised is skipped,
/// so this never fails: absent fields keep the [`Analysis::default`] values.
pub fn parse_response(response: &str) -> Analysis {
    let mut analysis = Analysis::default();

    for line in response.lines().map(str::trim) {
        if let Some(value) = line.strip_prefix("SEVERITY:") {
            match value.parse::<Severity>() {
                Ok(severity) => analysis.severity = severity,
                Err(e) => log::debug!("Ignoring severity from model: {}", e),
            }
        } else if let Some(value) = line.strip_prefix("EXPLANATION:") {
            let value = value.trim();
            if !value.is_empty() {
                analysis.explanation = value.to_string();
            }
        } else if let Some(item) = line.strip_prefix('-') {
            analysis.recommendations.push(item.trim().to_string());
        } else if let Some(value) = line.strip_prefix("IS_THREAT:") {
            analysis.is_threat = matches!(
                value.trim().to_lowercase().as_str(),
                "yes" | "true" | "1"
            );
        }
    }

    analysis
}
