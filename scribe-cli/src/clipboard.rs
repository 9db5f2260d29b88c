// System clipboard backed by arboard
// arboard's handle is not Send, so each write opens one on a blocking thread

use async_trait::async_trait;
use scribe_core::{AssistError, AssistResult, Clipboard};

pub struct SystemClipboard;

impl SystemClipboard {
    fn set_text(text: &str) -> AssistResult<()> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| AssistError::resource("clipboard", e.to_string()))?;
        clipboard
            .set_text(text)
            .map_err(|e| AssistError::resource("clipboard", e.to_string()))
    }
}

#[async_trait]
impl Clipboard for SystemClipboard {
    async fn write_text(&self, text: &str) -> AssistResult<()> {
        let text = text.to_string();
        tokio::task::spawn_blocking(move || Self::set_text(&text))
            .await
            .map_err(|e| AssistError::resource("clipboard", e.to_string()))?
    }
}
