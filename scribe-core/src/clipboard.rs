// Clipboard access
// Always best-effort from the router's point of view: a failed copy never fails an action

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AssistError, AssistResult};

#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> AssistResult<()>;
}

/// No clipboard in this environment; every write is refused
pub struct NoClipboard;

#[async_trait]
impl Clipboard for NoClipboard {
    async fn write_text(&self, _text: &str) -> AssistResult<()> {
        Err(AssistError::resource("clipboard", "no clipboard available"))
    }
}

/// Clipboard held in process memory
#[derive(Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().ok().and_then(|c| c.clone())
    }
}

#[async_trait]
impl Clipboard for MemoryClipboard {
    async fn write_text(&self, text: &str) -> AssistResult<()> {
        let mut contents = self
            .contents
            .lock()
            .map_err(|_| AssistError::resource("clipboard", "lock poisoned"))?;
        *contents = Some(text.to_string());
        Ok(())
    }
}
