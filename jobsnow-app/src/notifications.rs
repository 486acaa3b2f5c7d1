use std::sync::Arc;

use crate::translations::TranslationStore;

/// Section holding every toast title and description.
pub const NOTIFICATIONS_SECTION: &str = "notifications";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Destructive,
}

/// A transient message shown to the user. Title and description are keys in
/// the `notifications` section, resolved at display time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub title: &'static str,
    pub description: &'static str,
    /// Raw service message, shown verbatim after the description
    pub detail: Option<String>,
}

impl Toast {
    pub fn success(title: &'static str, description: &'static str) -> Self {
        Self {
            kind: ToastKind::Success,
            title,
            description,
            detail: None,
        }
    }

    pub fn error(title: &'static str, description: &'static str) -> Self {
        Self {
            kind: ToastKind::Destructive,
            title,
            description,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.kind == ToastKind::Destructive
    }

    /// Resolve title and description in the store's current language.
    pub fn render(&self, translations: &TranslationStore) -> (String, String) {
        let title = translations.t(NOTIFICATIONS_SECTION, self.title);
        let mut description = translations.t(NOTIFICATIONS_SECTION, self.description);
        if let Some(detail) = &self.detail {
            description = format!("{} ({})", description, detail);
        }
        (title, description)
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

pub type SharedNotifier = Arc<dyn Notifier>;

/// Writes toasts to the log; used when nothing renders them.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, toast: Toast) {
        match toast.kind {
            ToastKind::Success => tracing::info!(
                title = toast.title,
                description = toast.description,
                "toast"
            ),
            ToastKind::Destructive => tracing::warn!(
                title = toast.title,
                description = toast.description,
                detail = toast.detail.as_deref().unwrap_or(""),
                "toast"
            ),
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingNotifier {
        toasts: Mutex<Vec<Toast>>,
    }

    impl RecordingNotifier {
        pub fn toasts(&self) -> Vec<Toast> {
            self.toasts.lock().unwrap().clone()
        }

        pub fn last(&self) -> Option<Toast> {
            self.toasts.lock().unwrap().last().cloned()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, toast: Toast) {
            self.toasts.lock().unwrap().push(toast);
        }
    }
}
