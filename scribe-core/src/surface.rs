// UI surface controller, one per open panel or popup
// Surfaces share nothing directly; they meet only through the store and the messenger

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::capture::{MediaDevice, Recording};
use crate::error::{AssistError, AssistResult, ValidationError};
use crate::mailbox::{pending_actions, pending_screenshots, Mailbox};
use crate::messenger::Messenger;
use crate::preferences::Preferences;
use crate::router::{ActionOutcome, ActionRouter};
use crate::selection::capture_selection;
use crate::storage::Store;
use crate::types::{ActionId, ActionRequest, Language, PendingAction, Tone, UsageStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Text,
    Image,
    Voice,
}

impl InputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputMode::Text => "text",
            InputMode::Image => "image",
            InputMode::Voice => "voice",
        }
    }
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(InputMode::Text),
            "image" => Ok(InputMode::Image),
            "voice" => Ok(InputMode::Voice),
            other => Err(ValidationError::InvalidValue {
                field: "mode".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// What happened while a surface opened
#[derive(Debug, Default)]
pub struct OpenReport {
    /// Selection found on the page, empty when none or unreachable
    pub selection: String,
    /// Handoff left by a context-menu click
    pub pending: Option<PendingAction>,
    /// Result of processing the handoff; `None` when nothing was processed
    pub outcome: Option<AssistResult<ActionOutcome>>,
    pub screenshot_attached: bool,
}

pub struct Surface {
    router: Arc<ActionRouter>,
    messenger: Messenger,
    actions: Mailbox<PendingAction>,
    screenshots: Mailbox<String>,
    store: Arc<dyn Store>,
    prefs: Preferences,
    usage: UsageStats,
    mode: InputMode,
    input: String,
    output: Option<String>,
    status: String,
    tone: Tone,
    language: Language,
    screenshot: Option<String>,
    recording: Option<Recording<Box<dyn MediaDevice>>>,
}

impl Surface {
    pub fn new(router: Arc<ActionRouter>, store: Arc<dyn Store>, messenger: Messenger) -> Self {
        Surface {
            router,
            messenger,
            actions: pending_actions(Arc::clone(&store)),
            screenshots: pending_screenshots(Arc::clone(&store)),
            store,
            prefs: Preferences::default(),
            usage: UsageStats::default(),
            mode: InputMode::default(),
            input: String::new(),
            output: None,
            status: "Ready to assist".to_string(),
            tone: Tone::default(),
            language: Language::default(),
            screenshot: None,
            recording: None,
        }
    }

    /// Re-read preferences and usage from the store. Unreadable data leaves the
    /// current snapshot in place.
    pub fn refresh(&mut self) {
        match Preferences::load(self.store.as_ref()) {
            Ok(prefs) => {
                self.tone = prefs.default_tone;
                self.language = prefs.default_language.clone();
                self.prefs = prefs;
            }
            Err(e) => warn!("could not load preferences: {}", e),
        }
        match self.router.usage().load() {
            Ok(usage) => self.usage = usage,
            Err(e) => warn!("could not load usage stats: {}", e),
        }
    }

    /// Bring the surface up: refresh state, pre-fill the current selection, then
    /// consume any pending handoffs. Each handoff is seen by exactly one opening.
    pub async fn open(&mut self) -> OpenReport {
        self.refresh();

        let mut report = OpenReport {
            selection: capture_selection(&self.messenger).await,
            ..Default::default()
        };
        if !report.selection.trim().is_empty() {
            self.input = report.selection.clone();
        }

        match self.actions.take() {
            Ok(Some(pending)) => {
                debug!("picked up pending {} action", pending.action);
                self.input = pending.text.clone();
                if self.prefs.auto_process {
                    report.outcome = Some(self.process(pending.action.clone()).await);
                }
                report.pending = Some(pending);
            }
            Ok(None) => {}
            Err(e) => warn!("could not read pending action: {}", e),
        }

        match self.screenshots.take() {
            Ok(Some(data_url)) => {
                self.screenshot = Some(data_url);
                self.mode = InputMode::Image;
                self.status = "Screenshot ready".to_string();
                report.screenshot_attached = true;
            }
            Ok(None) => {}
            Err(e) => warn!("could not read pending screenshot: {}", e),
        }

        report
    }

    /// Run an action on the current input, updating output and status
    pub async fn process(&mut self, action: impl Into<ActionId>) -> AssistResult<ActionOutcome> {
        let request = ActionRequest::new(action, self.input.clone())
            .with_tone(self.tone)
            .with_language(self.language.clone());

        self.status = format!("Processing {}...", request.action);
        match self.router.run(&request, &self.prefs).await {
            Ok(outcome) => {
                self.output = Some(outcome.formatted.clone());
                self.usage = outcome.usage;
                self.status = if outcome.copied {
                    "Done (copied to clipboard)".to_string()
                } else {
                    "Done".to_string()
                };
                Ok(outcome)
            }
            Err(e) => {
                self.status = e.status_message();
                Err(e)
            }
        }
    }

    pub fn switch_mode(&mut self, mode: InputMode) {
        self.mode = mode;
        self.status = format!("Ready for {} input", mode);
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
        self.output = None;
    }

    pub fn set_tone(&mut self, tone: Tone) {
        self.tone = tone;
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    /// Drop the attached screenshot
    pub fn remove_screenshot(&mut self) -> Option<String> {
        self.screenshot.take()
    }

    pub fn start_recording(&mut self, device: Box<dyn MediaDevice>) -> AssistResult<()> {
        if self.recording.is_some() {
            return Err(AssistError::resource("microphone", "already recording"));
        }
        match Recording::start(device) {
            Ok(recording) => {
                self.recording = Some(recording);
                self.mode = InputMode::Voice;
                self.status = "Recording...".to_string();
                Ok(())
            }
            Err(e) => {
                self.status = e.status_message();
                Err(e)
            }
        }
    }

    pub fn push_audio(&mut self, chunk: impl Into<Vec<u8>>) {
        if let Some(recording) = self.recording.as_mut() {
            recording.push_chunk(chunk);
        }
    }

    /// Stop and release the microphone; returns the captured audio
    pub fn stop_recording(&mut self) -> Option<Vec<u8>> {
        let audio = self.recording.take()?.stop();
        self.status = "Recording stopped".to_string();
        Some(audio)
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn tone(&self) -> Tone {
        self.tone
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn screenshot(&self) -> Option<&str> {
        self.screenshot.as_deref()
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn usage(&self) -> UsageStats {
        self.usage
    }
}
