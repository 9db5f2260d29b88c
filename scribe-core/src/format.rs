// Presentation envelope around raw backend output
// Pure: same inputs, same string

use chrono::{DateTime, SecondsFormat, Utc};

use crate::registry::ActionSpec;
use crate::types::{Language, Tone};

pub fn format_result(
    spec: &ActionSpec,
    body: &str,
    tone: Tone,
    language: &Language,
    at: DateTime<Utc>,
) -> String {
    format!(
        "{} {}\n\n{}\n\nTone: {} • Language: {} ({})\nGenerated: {}",
        spec.icon,
        spec.label,
        body.trim(),
        tone,
        language.name(),
        language,
        at.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}
