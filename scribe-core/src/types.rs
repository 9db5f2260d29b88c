// Core type definitions for Scribe

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Inputs shorter than this (after trimming) are rejected before any backend call
pub const MIN_INPUT_CHARS: usize = 10;

/// Language codes offered by the settings surface, with display names
pub const SUPPORTED_LANGUAGES: [(&str, &str); 12] = [
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("zh", "Chinese"),
    ("ru", "Russian"),
    ("ar", "Arabic"),
    ("hi", "Hindi"),
];

/// Identifier of a registered action ("summarize", "proofread", ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(String);

impl ActionId {
    pub fn new(id: impl Into<String>) -> Self {
        ActionId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActionId {
    fn from(id: &str) -> Self {
        ActionId(id.to_string())
    }
}

impl From<String> for ActionId {
    fn from(id: String) -> Self {
        ActionId(id)
    }
}

/// Writing tone requested for an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Casual,
    Formal,
    Friendly,
    Academic,
}

impl Tone {
    pub const ALL: [Tone; 5] = [
        Tone::Professional,
        Tone::Casual,
        Tone::Formal,
        Tone::Friendly,
        Tone::Academic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Casual => "casual",
            Tone::Formal => "formal",
            Tone::Friendly => "friendly",
            Tone::Academic => "academic",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tone {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Tone::ALL
            .into_iter()
            .find(|tone| tone.as_str() == wanted)
            .ok_or_else(|| ValidationError::UnknownTone(s.to_string()))
    }
}

/// Target language code, restricted to [`SUPPORTED_LANGUAGES`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Language(String);

impl Language {
    pub fn parse(code: &str) -> Result<Self, ValidationError> {
        let code = code.trim().to_lowercase();
        if SUPPORTED_LANGUAGES.iter().any(|(c, _)| *c == code) {
            Ok(Language(code))
        } else {
            Err(ValidationError::UnknownLanguage(code))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// English display name of the language
    pub fn name(&self) -> &'static str {
        SUPPORTED_LANGUAGES
            .iter()
            .find(|(c, _)| *c == self.0)
            .map(|(_, name)| *name)
            .unwrap_or("Unknown")
    }
}

impl Default for Language {
    fn default() -> Self {
        Language("en".to_string())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Language {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::parse(s)
    }
}

impl TryFrom<String> for Language {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Language::parse(&value)
    }
}

impl From<Language> for String {
    fn from(language: Language) -> Self {
        language.0
    }
}

/// A user-triggered request, consumed immediately by the router and never persisted as-is
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub action: ActionId,
    pub input_text: String,
    pub tone: Tone,
    pub target_language: Language,
}

impl ActionRequest {
    pub fn new(action: impl Into<ActionId>, input_text: impl Into<String>) -> Self {
        ActionRequest {
            action: action.into(),
            input_text: input_text.into(),
            tone: Tone::default(),
            target_language: Language::default(),
        }
    }

    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.target_language = language;
        self
    }

    /// Trimmed input text, or the reason it cannot be processed
    pub fn validated_text(&self) -> Result<&str, ValidationError> {
        let text = self.input_text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyInput);
        }
        let len = text.chars().count();
        if len < MIN_INPUT_CHARS {
            return Err(ValidationError::InputTooShort {
                len,
                min: MIN_INPUT_CHARS,
            });
        }
        Ok(text)
    }
}

/// Handoff written by the context-menu entry point for the next surface to open
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub action: ActionId,
    pub text: String,
}

fn default_tone_name() -> String {
    Tone::default().as_str().to_string()
}

fn default_language_code() -> String {
    Language::default().0
}

/// Immutable record of one completed action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: i64,
    pub timestamp: String,
    pub input: String,
    pub output: String,
    pub action: ActionId,
    #[serde(default = "default_tone_name")]
    pub tone: String,
    #[serde(default = "default_language_code")]
    pub language: String,
}

impl HistoryRecord {
    pub fn new(
        at: DateTime<Utc>,
        action: ActionId,
        input: impl Into<String>,
        output: impl Into<String>,
        tone: Tone,
        language: &Language,
    ) -> Self {
        HistoryRecord {
            id: at.timestamp_millis(),
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            input: input.into(),
            output: output.into(),
            action,
            tone: tone.as_str().to_string(),
            language: language.as_str().to_string(),
        }
    }

    /// Parsed creation time, if the stored timestamp is well-formed
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

/// Completed-action counters
///
/// `today` is never reset on day rollover; within a process lifetime it tracks `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    pub today: u64,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_lengths() {
        let empty = ActionRequest::new("proofread", "");
        assert_eq!(empty.validated_text(), Err(ValidationError::EmptyInput));

        let blank = ActionRequest::new("proofread", "   \n\t ");
        assert_eq!(blank.validated_text(), Err(ValidationError::EmptyInput));

        let nine = ActionRequest::new("proofread", "123456789");
        assert_eq!(
            nine.validated_text(),
            Err(ValidationError::InputTooShort { len: 9, min: 10 })
        );

        let ten = ActionRequest::new("proofread", "1234567890");
        assert_eq!(ten.validated_text(), Ok("1234567890"));
    }

    #[test]
    fn test_validation_counts_characters_not_bytes() {
        // 9 characters, 18 bytes
        let request = ActionRequest::new("summarize", "ééééééééé");
        assert!(matches!(
            request.validated_text(),
            Err(ValidationError::InputTooShort { len: 9, .. })
        ));
    }

    #[test]
    fn test_tone_parsing() {
        assert_eq!("Casual".parse::<Tone>().unwrap(), Tone::Casual);
        assert!("sarcastic".parse::<Tone>().is_err());
    }

    #[test]
    fn test_language_parsing() {
        assert_eq!(Language::parse("ES").unwrap().as_str(), "es");
        assert_eq!(Language::parse("ja").unwrap().name(), "Japanese");
        assert!(Language::parse("xx").is_err());
    }

    #[test]
    fn test_history_record_serializes_like_storage() {
        let at = DateTime::parse_from_rfc3339("2025-11-09T14:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let record = HistoryRecord::new(
            at,
            ActionId::from("summarize"),
            "input text",
            "output text",
            Tone::Formal,
            &Language::default(),
        );

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["action"], "summarize");
        assert_eq!(json["tone"], "formal");
        assert_eq!(json["timestamp"], "2025-11-09T14:30:00.000Z");
        assert_eq!(json["id"], at.timestamp_millis());
        assert_eq!(record.created_at(), Some(at));
    }

    #[test]
    fn test_history_record_defaults_missing_tone() {
        let json = r#"{"id":1,"timestamp":"2025-11-09T14:30:00Z","input":"a","output":"b","action":"rewrite"}"#;
        let record: HistoryRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.tone, "professional");
        assert_eq!(record.language, "en");
    }
}
