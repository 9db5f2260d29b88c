// Processing backends
// Each declares what it can do through a capability descriptor the router caches per session

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::BackendError;
use crate::registry::{ActionSpec, Capability};
use crate::types::{Language, Tone};

pub mod openai;
pub mod placeholder;

pub use openai::{OpenAiBackend, OpenAiConfig};
pub use placeholder::PlaceholderBackend;

/// Set of capabilities a backend offers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    set: BTreeSet<Capability>,
}

impl Capabilities {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Capability::ALL.into_iter().collect()
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.set.insert(capability);
        self
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.set.contains(&capability)
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.set.iter().copied()
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Capabilities {
            set: iter.into_iter().collect(),
        }
    }
}

/// One unit of work handed to a backend; the text is already validated and trimmed
#[derive(Debug, Clone, Copy)]
pub struct ProcessRequest<'a> {
    pub action: &'a ActionSpec,
    pub text: &'a str,
    pub tone: Tone,
    pub language: &'a Language,
}

/// Opaque `process(action, text, options) -> text` function
#[async_trait]
pub trait ProcessingBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities;

    async fn process(&self, request: ProcessRequest<'_>) -> Result<String, BackendError>;
}
