// Action registry
// The action vocabulary is data, not a closed enum: the set grew between releases

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::ActionId;

/// Built-in actions, in menu order
const BUILTIN_ACTIONS_JSON: &str = r#"[
  { "id": "summarize", "title": "Summarize Selection",  "label": "Summary",        "icon": "📋", "capability": "summarizer" },
  { "id": "rewrite",   "title": "Rewrite Selection",    "label": "Rewrite",        "icon": "✍️", "capability": "rewriter" },
  { "id": "translate", "title": "Translate Selection",  "label": "Translation",    "icon": "🌐", "capability": "translator" },
  { "id": "proofread", "title": "Proofread Selection",  "label": "Proofread",      "icon": "✓",  "capability": "proofreader" },
  { "id": "expand",    "title": "Expand Selection",     "label": "Expansion",      "icon": "📈", "capability": "prompt" },
  { "id": "simplify",  "title": "Simplify Selection",   "label": "Simplification", "icon": "💡", "capability": "prompt" }
]"#;

/// Named sub-function of a processing backend, one per action family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Summarizer,
    Rewriter,
    Translator,
    Proofreader,
    Prompt,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::Summarizer,
        Capability::Rewriter,
        Capability::Translator,
        Capability::Proofreader,
        Capability::Prompt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Summarizer => "summarizer",
            Capability::Rewriter => "rewriter",
            Capability::Translator => "translator",
            Capability::Proofreader => "proofreader",
            Capability::Prompt => "prompt",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the system knows about one action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub id: ActionId,
    /// Context-menu title
    pub title: String,
    /// Result label shown in the presentation envelope and history
    pub label: String,
    pub icon: String,
    pub capability: Capability,
}

#[derive(Debug, Clone)]
pub struct ActionRegistry {
    actions: Vec<ActionSpec>,
}

impl ActionRegistry {
    /// An empty registry
    pub fn new() -> Self {
        ActionRegistry {
            actions: Vec::new(),
        }
    }

    /// Registry holding the six built-in actions
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        // The embedded table is covered by tests; a parse failure here is a build defect.
        if let Err(e) = registry.load_json(BUILTIN_ACTIONS_JSON) {
            tracing::error!("built-in action table is invalid: {}", e);
        }
        registry
    }

    /// Register an action, replacing any existing action with the same id.
    /// Returns the replaced spec.
    pub fn register(&mut self, spec: ActionSpec) -> Option<ActionSpec> {
        match self.actions.iter_mut().find(|a| a.id == spec.id) {
            Some(existing) => Some(std::mem::replace(existing, spec)),
            None => {
                self.actions.push(spec);
                None
            }
        }
    }

    /// Register every action in a JSON array of specs
    pub fn load_json(&mut self, json: &str) -> Result<usize, serde_json::Error> {
        let specs: Vec<ActionSpec> = serde_json::from_str(json)?;
        let count = specs.len();
        for spec in specs {
            self.register(spec);
        }
        Ok(count)
    }

    pub fn get(&self, id: &str) -> Option<&ActionSpec> {
        self.actions.iter().find(|a| a.id.as_str() == id)
    }

    pub fn resolve(&self, id: &ActionId) -> Result<&ActionSpec, ValidationError> {
        self.get(id.as_str())
            .ok_or_else(|| ValidationError::UnknownAction(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionSpec> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
