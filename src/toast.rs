use std::time::{Duration, Instant};

/// Default time a toast stays on screen before it dismisses itself.
pub const AUTO_DISMISS: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    shown_at: Instant,
}

/// Single-slot notification state for one screen mount. Showing a toast while
/// another is visible replaces it outright; there is no queue. Visibility
/// lapses on its own after the dismiss duration, or earlier via `hide`.
#[derive(Debug)]
pub struct ToastState {
    current: Option<Toast>,
    dismiss_after: Duration,
}

impl ToastState {
    pub fn new() -> Self {
        Self::with_duration(AUTO_DISMISS)
    }

    pub fn with_duration(dismiss_after: Duration) -> Self {
        Self {
            current: None,
            dismiss_after,
        }
    }

    pub fn show_success(&mut self, message: impl Into<String>) {
        self.show(ToastKind::Success, message);
    }

    pub fn show_error(&mut self, message: impl Into<String>) {
        self.show(ToastKind::Error, message);
    }

    pub fn show_warning(&mut self, message: impl Into<String>) {
        self.show(ToastKind::Warning, message);
    }

    pub fn show_info(&mut self, message: impl Into<String>) {
        self.show(ToastKind::Info, message);
    }

    pub fn hide(&mut self) {
        self.current = None;
    }

    pub fn visible(&self) -> bool {
        self.current().is_some()
    }

    /// The toast to render, if any is still within its display window.
    pub fn current(&self) -> Option<&Toast> {
        self.current
            .as_ref()
            .filter(|toast| toast.shown_at.elapsed() < self.dismiss_after)
    }

    fn show(&mut self, kind: ToastKind, message: impl Into<String>) {
        self.current = Some(Toast {
            message: message.into(),
            kind,
            shown_at: Instant::now(),
        });
    }
}

impl Default for ToastState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_and_hide() {
        let mut toast = ToastState::new();
        assert!(!toast.visible());

        toast.show_success("Profile saved");
        assert!(toast.visible());
        let current = toast.current().unwrap();
        assert_eq!(current.message, "Profile saved");
        assert_eq!(current.kind, ToastKind::Success);

        toast.hide();
        assert!(!toast.visible());
    }

    #[test]
    fn a_second_toast_replaces_the_first() {
        let mut toast = ToastState::new();
        toast.show_info("Loading");
        toast.show_error("Network unreachable");

        let current = toast.current().unwrap();
        assert_eq!(current.kind, ToastKind::Error);
        assert_eq!(current.message, "Network unreachable");
    }

    #[test]
    fn toasts_lapse_after_the_dismiss_window() {
        let mut toast = ToastState::with_duration(Duration::ZERO);
        toast.show_warning("Blink and you miss it");
        assert!(!toast.visible());
        assert!(toast.current().is_none());
    }
}
