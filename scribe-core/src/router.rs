// Action routing: validate, pick a backend from cached capabilities, run under the timeout
// Successful results are formatted, recorded in history, counted and optionally copied

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::backend::{Capabilities, PlaceholderBackend, ProcessRequest, ProcessingBackend};
use crate::clipboard::Clipboard;
use crate::error::{AssistError, AssistResult, BackendError};
use crate::format::format_result;
use crate::history::{HistoryRecorder, Retention};
use crate::preferences::Preferences;
use crate::registry::{ActionRegistry, ActionSpec};
use crate::storage::Store;
use crate::types::{ActionRequest, HistoryRecord, UsageStats};
use crate::usage::UsageCounter;

/// Result of a completed action
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome {
    /// Output wrapped in the presentation envelope
    pub formatted: String,
    /// Output as the backend returned it
    pub raw: String,
    /// Name of the backend that produced the output
    pub backend: &'static str,
    /// `None` when history is disabled
    pub record: Option<HistoryRecord>,
    pub usage: UsageStats,
    pub copied: bool,
}

enum Route<'a> {
    Backend(&'a dyn ProcessingBackend),
    Placeholder,
}

pub struct ActionRouter {
    registry: Arc<ActionRegistry>,
    backend: Option<Arc<dyn ProcessingBackend>>,
    capabilities: Capabilities,
    placeholder: PlaceholderBackend,
    history: HistoryRecorder,
    usage: UsageCounter,
    clipboard: Arc<dyn Clipboard>,
}

impl ActionRouter {
    /// The backend's capabilities are queried here, once, and cached
    pub fn new(
        registry: Arc<ActionRegistry>,
        backend: Option<Arc<dyn ProcessingBackend>>,
        store: Arc<dyn Store>,
        clipboard: Arc<dyn Clipboard>,
    ) -> Self {
        let capabilities = backend
            .as_ref()
            .map(|b| b.capabilities())
            .unwrap_or_default();

        match &backend {
            Some(b) if !capabilities.is_empty() => {
                info!("backend '{}' offers {} capabilities", b.name(), capabilities.iter().count())
            }
            _ => info!("no processing capability available; placeholder backend in use"),
        }

        ActionRouter {
            registry,
            backend,
            capabilities,
            placeholder: PlaceholderBackend::new(),
            history: HistoryRecorder::new(Arc::clone(&store)),
            usage: UsageCounter::new(store),
            clipboard,
        }
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn history(&self) -> &HistoryRecorder {
        &self.history
    }

    pub fn usage(&self) -> &UsageCounter {
        &self.usage
    }

    fn route(&self, spec: &ActionSpec, prefs: &Preferences) -> AssistResult<Route<'_>> {
        let unavailable = || AssistError::CapabilityUnavailable {
            action: spec.id.clone(),
            capability: spec.capability,
        };

        if self.capabilities.is_empty() {
            return if prefs.enable_ai_fallback {
                Ok(Route::Placeholder)
            } else {
                Err(unavailable())
            };
        }

        match &self.backend {
            Some(backend) if self.capabilities.supports(spec.capability) => {
                Ok(Route::Backend(backend.as_ref()))
            }
            _ => Err(unavailable()),
        }
    }

    /// Run one action end to end
    pub async fn run(&self, request: &ActionRequest, prefs: &Preferences) -> AssistResult<ActionOutcome> {
        let spec = self.registry.resolve(&request.action)?;
        let text = request.validated_text()?;
        let route = self.route(spec, prefs)?;

        let job = ProcessRequest {
            action: spec,
            text,
            tone: request.tone,
            language: &request.target_language,
        };

        let (raw, backend_name) = match route {
            Route::Backend(backend) => {
                debug!("routing {} to '{}'", spec.id, backend.name());
                let raw = tokio::time::timeout(prefs.timeout(), backend.process(job))
                    .await
                    .map_err(|_| BackendError::Timeout(u64::from(prefs.processing_timeout)))??;
                (raw, backend.name())
            }
            Route::Placeholder => {
                debug!("routing {} to the placeholder backend", spec.id);
                (self.placeholder.process(job).await?, self.placeholder.name())
            }
        };

        if raw.trim().is_empty() {
            return Err(BackendError::EmptyResponse.into());
        }

        let now = Utc::now();
        let formatted = format_result(spec, &raw, request.tone, &request.target_language, now);

        let entry = HistoryRecord::new(
            now,
            spec.id.clone(),
            text,
            raw.trim(),
            request.tone,
            &request.target_language,
        );
        let record = self.history.record(entry, Retention::from(prefs))?;
        let usage = self.usage.increment()?;

        let copied = if prefs.auto_copy {
            match self.clipboard.write_text(&formatted).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("auto-copy failed: {}", e);
                    false
                }
            }
        } else {
            false
        };

        Ok(ActionOutcome {
            formatted,
            raw,
            backend: backend_name,
            record,
            usage,
            copied,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Capabilities;
    use crate::clipboard::{MemoryClipboard, NoClipboard};
    use crate::error::ValidationError;
    use crate::registry::Capability;
    use crate::storage::memory::MemoryStore;
    use crate::types::{Language, Tone};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Backend with a fixed descriptor that echoes its input
    struct Echo {
        caps: Capabilities,
        delay: Duration,
        fail: bool,
    }

    impl Echo {
        fn with(caps: Capabilities) -> Self {
            Echo {
                caps,
                delay: Duration::ZERO,
                fail: false,
            }
        }
    }

    #[async_trait]
    impl ProcessingBackend for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn capabilities(&self) -> Capabilities {
            self.caps.clone()
        }

        async fn process(&self, request: ProcessRequest<'_>) -> Result<String, BackendError> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(BackendError::Rejected("model unavailable".to_string()));
            }
            Ok(format!("echo:{}", request.text))
        }
    }

    fn router(backend: Option<Echo>) -> (ActionRouter, Arc<MemoryClipboard>) {
        let clipboard = Arc::new(MemoryClipboard::new());
        let backend = backend.map(|b| Arc::new(b) as Arc<dyn ProcessingBackend>);
        let router = ActionRouter::new(
            Arc::new(ActionRegistry::builtin()),
            backend,
            Arc::new(MemoryStore::new()),
            clipboard.clone(),
        );
        (router, clipboard)
    }

    #[tokio::test]
    async fn test_proofread_without_backend_uses_placeholder() {
        let (router, _) = router(None);
        let text = "This is a test sentence for proofreading.";

        let outcome = router
            .run(&ActionRequest::new("proofread", text), &Preferences::default())
            .await
            .unwrap();

        assert_eq!(outcome.backend, "placeholder");
        assert!(outcome.formatted.contains("Proofread"));
        assert!(outcome.formatted.contains(text));

        let history = router.history().load().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action.as_str(), "proofread");
        assert_eq!(history[0].input, text);
    }

    #[tokio::test]
    async fn test_every_action_falls_back_when_no_capability() {
        let (router, _) = router(Some(Echo::with(Capabilities::none())));
        let prefs = Preferences::default();
        let ids: Vec<String> = router.registry().iter().map(|s| s.id.to_string()).collect();

        for id in &ids {
            let outcome = router
                .run(&ActionRequest::new(id.as_str(), "Plenty of text to work with."), &prefs)
                .await
                .unwrap();
            assert!(!outcome.formatted.trim().is_empty());
            assert_eq!(outcome.record.unwrap().action.as_str(), id.as_str());
        }
        assert_eq!(router.history().load().unwrap().len(), ids.len());
    }

    #[tokio::test]
    async fn test_fallback_disabled_surfaces_capability_error() {
        let (router, _) = router(None);
        let prefs = Preferences {
            enable_ai_fallback: false,
            ..Preferences::default()
        };

        let err = router
            .run(&ActionRequest::new("summarize", "Plenty of text to work with."), &prefs)
            .await
            .unwrap_err();
        assert!(matches!(err, AssistError::CapabilityUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_missing_specific_capability_is_distinguishable() {
        let caps = Capabilities::none().with(Capability::Summarizer);
        let (router, _) = router(Some(Echo::with(caps)));
        let prefs = Preferences::default();

        let outcome = router
            .run(&ActionRequest::new("summarize", "Plenty of text to work with."), &prefs)
            .await
            .unwrap();
        assert_eq!(outcome.backend, "echo");
        assert_eq!(outcome.raw, "echo:Plenty of text to work with.");

        let err = router
            .run(&ActionRequest::new("expand", "Plenty of text to work with."), &prefs)
            .await
            .unwrap_err();
        match err {
            AssistError::CapabilityUnavailable { action, capability } => {
                assert_eq!(action.as_str(), "expand");
                assert_eq!(capability, Capability::Prompt);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Failed actions leave no trace
        assert_eq!(router.history().load().unwrap().len(), 1);
        assert_eq!(router.usage().load().unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_validation_happens_before_backend() {
        let (router, _) = router(Some(Echo {
            fail: true,
            ..Echo::with(Capabilities::all())
        }));
        let prefs = Preferences::default();

        let err = router.run(&ActionRequest::new("rewrite", "   "), &prefs).await.unwrap_err();
        assert!(matches!(err, AssistError::Validation(ValidationError::EmptyInput)));

        let err = router.run(&ActionRequest::new("rewrite", "123456789"), &prefs).await.unwrap_err();
        assert!(matches!(err, AssistError::Validation(ValidationError::InputTooShort { .. })));

        let err = router.run(&ActionRequest::new("juggle", "1234567890"), &prefs).await.unwrap_err();
        assert!(matches!(err, AssistError::Validation(ValidationError::UnknownAction(_))));

        let err = router.run(&ActionRequest::new("rewrite", "1234567890"), &prefs).await.unwrap_err();
        assert!(matches!(err, AssistError::Backend(BackendError::Rejected(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_call_is_bounded_by_timeout() {
        let (router, _) = router(Some(Echo {
            delay: Duration::from_secs(120),
            ..Echo::with(Capabilities::all())
        }));
        let prefs = Preferences {
            processing_timeout: 5,
            ..Preferences::default()
        };

        let err = router
            .run(&ActionRequest::new("translate", "Plenty of text to work with."), &prefs)
            .await
            .unwrap_err();
        assert!(matches!(err, AssistError::Backend(BackendError::Timeout(5))));
    }

    #[tokio::test]
    async fn test_usage_counts_each_success() {
        let (router, _) = router(None);
        let prefs = Preferences::default();

        for action in ["summarize", "simplify", "summarize"] {
            router
                .run(&ActionRequest::new(action, "Plenty of text to work with."), &prefs)
                .await
                .unwrap();
        }
        let _ = router.run(&ActionRequest::new("summarize", "short"), &prefs).await;

        let usage = router.usage().load().unwrap();
        assert_eq!(usage.total, 3);
        assert_eq!(usage.today, 3);
    }

    #[tokio::test]
    async fn test_auto_copy_and_history_toggle() {
        let (router, clipboard) = router(None);
        let prefs = Preferences {
            auto_copy: true,
            save_history: false,
            ..Preferences::default()
        };

        let request = ActionRequest::new("translate", "Where is the train station?")
            .with_tone(Tone::Friendly)
            .with_language(Language::parse("fr").unwrap());
        let outcome = router.run(&request, &prefs).await.unwrap();

        assert!(outcome.copied);
        assert_eq!(clipboard.contents(), Some(outcome.formatted.clone()));
        assert!(outcome.formatted.contains("French (fr)"));
        assert_eq!(outcome.record, None);
        assert!(router.history().load().unwrap().is_empty());
        assert_eq!(outcome.usage.total, 1);
    }

    #[tokio::test]
    async fn test_clipboard_failure_does_not_fail_action() {
        let router = ActionRouter::new(
            Arc::new(ActionRegistry::builtin()),
            None,
            Arc::new(MemoryStore::new()),
            Arc::new(NoClipboard),
        );
        let prefs = Preferences {
            auto_copy: true,
            ..Preferences::default()
        };

        let outcome = router
            .run(&ActionRequest::new("simplify", "Plenty of text to work with."), &prefs)
            .await
            .unwrap();
        assert!(!outcome.copied);
        assert!(outcome.record.is_some());
    }
}
