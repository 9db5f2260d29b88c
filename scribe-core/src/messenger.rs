// Cross-context messaging through a single background task
// Messages are handled in delivery order; selection replies go unanswered if the requester left

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{AssistError, AssistResult, ValidationError};
use crate::mailbox::{pending_actions, pending_screenshots, Mailbox};
use crate::menu::{IMAGE_MENU_ID, PARENT_MENU_ID};
use crate::registry::ActionRegistry;
use crate::selection::PageHandle;
use crate::storage::Store;
use crate::types::{ActionId, PendingAction};

/// Requests any context may send to the background. Serialized with an `action`
/// tag, so `{"action":"getSelectedText"}` is a valid request on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    GetSelectedText,
    OpenSidePanel,
    ScreenshotCaptured {
        #[serde(rename = "dataUrl")]
        data_url: String,
    },
    #[serde(rename_all = "camelCase")]
    ContextMenuClicked {
        menu_item_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selection_text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        src_url: Option<String>,
    },
    SettingsUpdated {
        #[serde(default)]
        settings: Value,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionResponse {
    pub text: String,
}

/// Instructions from the background to the surface opener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceSignal {
    Open,
}

enum Envelope {
    Attach(PageHandle),
    Detach,
    Query(oneshot::Sender<SelectionResponse>),
    Notify(Request),
}

/// Sending half of the background context. Cheap to clone.
#[derive(Clone)]
pub struct Messenger {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl Messenger {
    fn post(&self, envelope: Envelope) -> AssistResult<()> {
        self.tx
            .send(envelope)
            .map_err(|_| AssistError::resource("background context", "not running"))
    }

    /// Fire-and-forget notification
    pub fn send(&self, request: Request) -> AssistResult<()> {
        self.post(Envelope::Notify(request))
    }

    /// Ask for the current page selection. `None` if the background is unreachable.
    pub async fn query_selection(&self) -> Option<SelectionResponse> {
        let (reply, rx) = oneshot::channel();
        self.post(Envelope::Query(reply)).ok()?;
        rx.await.ok()
    }

    /// Route selection queries to this page from now on
    pub fn attach_page(&self, page: PageHandle) -> AssistResult<()> {
        self.post(Envelope::Attach(page))
    }

    pub fn detach_page(&self) -> AssistResult<()> {
        self.post(Envelope::Detach)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

fn data_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^data:image/[a-zA-Z0-9.+-]+;base64,[A-Za-z0-9+/=]+$")
            .expect("static data URL pattern")
    })
}

/// Accept only base64 image data URLs
pub fn validate_data_url(data_url: &str) -> Result<(), ValidationError> {
    if data_url_pattern().is_match(data_url.trim()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidDataUrl)
    }
}

struct Background {
    page: Option<PageHandle>,
    registry: Arc<ActionRegistry>,
    actions: Mailbox<PendingAction>,
    screenshots: Mailbox<String>,
    signals: mpsc::UnboundedSender<SurfaceSignal>,
}

impl Background {
    fn handle(&mut self, envelope: Envelope) {
        match envelope {
            Envelope::Attach(page) => {
                debug!("page context attached");
                self.page = Some(page);
            }
            Envelope::Detach => {
                debug!("page context detached");
                self.page = None;
            }
            Envelope::Query(reply) => self.answer_selection(reply),
            Envelope::Notify(request) => {
                if let Err(e) = self.on_request(request) {
                    warn!("background request failed: {}", e);
                }
            }
        }
    }

    fn answer_selection(&self, reply: oneshot::Sender<SelectionResponse>) {
        let page = self.page.clone();
        tokio::spawn(async move {
            let text = match page {
                Some(page) => page.selected_text().await,
                None => String::new(),
            };
            if reply.send(SelectionResponse { text }).is_err() {
                debug!("selection requester went away; response dropped");
            }
        });
    }

    fn on_request(&self, request: Request) -> AssistResult<()> {
        match request {
            Request::GetSelectedText => {
                debug!("selection request without a reply channel ignored");
            }
            Request::OpenSidePanel => self.signal_open(),
            Request::ScreenshotCaptured { data_url } => {
                validate_data_url(&data_url)?;
                self.screenshots.put(&data_url)?;
                self.signal_open();
            }
            Request::ContextMenuClicked {
                menu_item_id,
                selection_text,
                src_url,
            } => self.on_menu_click(&menu_item_id, selection_text, src_url)?,
            Request::SettingsUpdated { settings } => {
                info!("settings updated: {}", settings);
            }
        }
        Ok(())
    }

    fn on_menu_click(
        &self,
        menu_item_id: &str,
        selection_text: Option<String>,
        src_url: Option<String>,
    ) -> AssistResult<()> {
        if menu_item_id == IMAGE_MENU_ID {
            let Some(data_url) = src_url else {
                return Ok(());
            };
            if validate_data_url(&data_url).is_err() {
                debug!("image menu used on a non-inline image; ignored");
                return Ok(());
            }
            self.screenshots.put(&data_url)?;
            self.signal_open();
            return Ok(());
        }

        if menu_item_id == PARENT_MENU_ID {
            return Ok(());
        }

        let text = match selection_text {
            Some(text) if !text.trim().is_empty() => text,
            _ => return Ok(()),
        };

        let action = ActionId::from(menu_item_id);
        self.registry.resolve(&action)?;

        self.actions.put(&PendingAction { action, text })?;
        self.signal_open();
        Ok(())
    }

    fn signal_open(&self) {
        if self.signals.send(SurfaceSignal::Open).is_err() {
            debug!("no surface opener listening");
        }
    }
}

/// Start the background context.
///
/// Returns the messenger other contexts use, the stream of surface signals, and the
/// task handle. The task ends once every messenger is dropped.
pub fn spawn_background(
    store: Arc<dyn Store>,
    registry: Arc<ActionRegistry>,
) -> (
    Messenger,
    mpsc::UnboundedReceiver<SurfaceSignal>,
    JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (signals, signal_rx) = mpsc::unbounded_channel();

    let mut background = Background {
        page: None,
        registry,
        actions: pending_actions(Arc::clone(&store)),
        screenshots: pending_screenshots(store),
        signals,
    };

    let task = tokio::spawn(async move {
        while let Some(envelope) = rx.recv().await {
            background.handle(envelope);
        }
        debug!("background context stopped");
    });

    (Messenger { tx }, signal_rx, task)
}
