// Deterministic stand-in used when no real processing capability exists
// Output depends only on (action, text, tone, language)

use async_trait::async_trait;
use regex::Regex;

use super::{Capabilities, ProcessRequest, ProcessingBackend};
use crate::error::BackendError;

const SUMMARY_SENTENCES: usize = 2;

pub struct PlaceholderBackend {
    sentence: Regex,
}

impl PlaceholderBackend {
    pub fn new() -> Self {
        Self {
            sentence: Regex::new(r"[^.!?]+[.!?]*").expect("static sentence pattern"),
        }
    }

    fn sentences<'t>(&self, text: &'t str) -> Vec<&'t str> {
        self.sentence
            .find_iter(text)
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Produce the placeholder body for a request
    pub fn render(&self, request: &ProcessRequest<'_>) -> String {
        let text = request.text;
        match request.action.id.as_str() {
            "summarize" => {
                let lead = self.sentences(text);
                let lead = lead[..lead.len().min(SUMMARY_SENTENCES)].join(" ");
                format!(
                    "{}\n\nKey points:\n• Main idea extracted\n• Important details highlighted",
                    lead
                )
            }
            "rewrite" => format!("{} (rewritten in a {} tone)", text, request.tone),
            "translate" => format!(
                "Original: \"{}\"\n\nTranslated ({}): \"{}\"",
                text,
                request.language.name(),
                text
            ),
            "proofread" => format!(
                "Original: \"{}\"\n\nCorrected: \"{}\"\n\nIssues found: None",
                text, text
            ),
            "expand" => format!(
                "{}\n\nAdditional context: each point above, developed with supporting detail.",
                text
            ),
            "simplify" => self
                .sentences(text)
                .iter()
                .map(|s| format!("• {}", s))
                .collect::<Vec<_>>()
                .join("\n"),
            _ => format!("{}: {}", request.action.label, text),
        }
    }
}

impl Default for PlaceholderBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessingBackend for PlaceholderBackend {
    fn name(&self) -> &'static str {
        "placeholder"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    async fn process(&self, request: ProcessRequest<'_>) -> Result<String, BackendError> {
        Ok(self.render(&request))
    }
}
