// Selection capture from the page context, which runs as its own task
// Callers get an empty string whenever the page cannot be reached

use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{AssistError, AssistResult};
use crate::messenger::Messenger;

/// Something that can read the page's current selection
pub trait SelectionSource: Send + 'static {
    fn selection(&self) -> AssistResult<String>;
}

/// Selection held in shared memory; clones see the same value
#[derive(Debug, Clone, Default)]
pub struct SelectionBuffer {
    text: Arc<Mutex<String>>,
}

impl SelectionBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        SelectionBuffer {
            text: Arc::new(Mutex::new(text.into())),
        }
    }

    pub fn set(&self, text: impl Into<String>) {
        if let Ok(mut current) = self.text.lock() {
            *current = text.into();
        }
    }
}

impl SelectionSource for SelectionBuffer {
    fn selection(&self) -> AssistResult<String> {
        self.text
            .lock()
            .map(|t| t.clone())
            .map_err(|_| AssistError::resource("page selection", "lock poisoned"))
    }
}

/// A page the extension may not script (browser-internal pages and the like)
pub struct RestrictedPage;

impl SelectionSource for RestrictedPage {
    fn selection(&self) -> AssistResult<String> {
        Err(AssistError::resource("active tab", "scripting is not permitted on this page"))
    }
}

struct PageQuery {
    reply: oneshot::Sender<String>,
}

/// Handle to a running page context
#[derive(Debug, Clone)]
pub struct PageHandle {
    tx: mpsc::UnboundedSender<PageQuery>,
}

impl PageHandle {
    /// Ask the page for its selection; empty if the page is gone or unreadable
    pub async fn selected_text(&self) -> String {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(PageQuery { reply }).is_err() {
            debug!("page context closed before selection query");
            return String::new();
        }
        rx.await.unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Start a page context. It runs until every handle is dropped.
pub fn spawn_page<S: SelectionSource>(source: S) -> (PageHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<PageQuery>();

    let task = tokio::spawn(async move {
        while let Some(query) = rx.recv().await {
            let text = match source.selection() {
                Ok(text) => text,
                Err(e) => {
                    debug!("selection unavailable: {}", e);
                    String::new()
                }
            };
            // The asker may have given up; nothing to do then
            let _ = query.reply.send(text);
        }
    });

    (PageHandle { tx }, task)
}

/// Current selection as seen from a UI surface, via the background context.
/// Never fails: any problem yields an empty string.
pub async fn capture_selection(messenger: &Messenger) -> String {
    match messenger.query_selection().await {
        Some(response) => response.text,
        None => {
            debug!("background unreachable; continuing with manual input");
            String::new()
        }
    }
}
