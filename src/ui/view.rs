//! Presentation seam between the controller and whatever draws the panels.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};
use time::OffsetDateTime;

/// Trailing indicator shown while a streamed answer is still arriving.
pub const STREAM_CURSOR: &str = "▌";

/// Named region whose content is always replaced as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Panel {
    /// Upload progress bar.
    UploadProgress,
    /// Outcome of the last upload.
    UploadResult,
    /// Collection statistics.
    CollectionInfo,
    /// Answer, search hits or query errors.
    Answer,
    /// Liveness details.
    Health,
    /// Readiness details.
    Readiness,
    /// Navbar health indicator.
    HealthBadge,
}

/// Control that can show a loading state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Control {
    /// Upload submit.
    Upload,
    /// Question submit.
    Ask,
    /// Search submit.
    Search,
    /// Collection deletion.
    DeleteCollection,
    /// Status refresh.
    Refresh,
}

/// Severity of a toast notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    /// Completed action.
    Success,
    /// Neutral information.
    Info,
    /// Rejected input.
    Warning,
    /// Failed action.
    Error,
}

/// Transient notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    /// Severity.
    pub level: ToastLevel,
    /// Message shown to the user.
    pub message: String,
    /// Creation time.
    pub created_at: OffsetDateTime,
}

impl Toast {
    /// Create a toast stamped with the current time.
    pub fn new(level: ToastLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Receiver of everything the controller wants to show.
pub trait View: Send + Sync {
    /// Replace the full content of `panel`.
    fn replace(&self, panel: Panel, content: String);

    /// Open a live region in `panel`, showing [`STREAM_CURSOR`].
    fn stream_start(&self, panel: Panel);

    /// Append a fragment to the live region of `panel`.
    fn stream_append(&self, panel: Panel, fragment: &str);

    /// Close the live region of `panel`, removing the cursor.
    fn stream_end(&self, panel: Panel);

    /// Toggle the loading state of a control.
    fn set_loading(&self, control: Control, loading: bool);

    /// Show a transient notification.
    fn notify(&self, toast: Toast);
}

#[derive(Debug, Default)]
struct BoardState {
    panels: BTreeMap<Panel, String>,
    live: BTreeSet<Panel>,
    loading: BTreeSet<Control>,
    toasts: Vec<Toast>,
    history: Vec<(Panel, String)>,
}

/// In-memory view keeping the latest content of every panel.
///
/// Records every replacement so flows can be inspected without a terminal.
#[derive(Debug, Default)]
pub struct PanelBoard {
    state: Mutex<BoardState>,
}

impl PanelBoard {
    /// Create an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current content of `panel` (empty when never rendered).
    pub fn content(&self, panel: Panel) -> String {
        self.lock().panels.get(&panel).cloned().unwrap_or_default()
    }

    /// Every content `panel` has displayed, oldest first.
    pub fn history(&self, panel: Panel) -> Vec<String> {
        self.lock()
            .history
            .iter()
            .filter(|(item, _)| *item == panel)
            .map(|(_, content)| content.clone())
            .collect()
    }

    /// Whether `control` is currently in its loading state.
    pub fn is_loading(&self, control: Control) -> bool {
        self.lock().loading.contains(&control)
    }

    /// Notifications raised so far.
    pub fn toasts(&self) -> Vec<Toast> {
        self.lock().toasts.clone()
    }

    fn record(state: &mut BoardState, panel: Panel, content: String) {
        state.history.push((panel, content.clone()));
        state.panels.insert(panel, content);
    }
}

impl View for PanelBoard {
    fn replace(&self, panel: Panel, content: String) {
        let mut state = self.lock();
        state.live.remove(&panel);
        Self::record(&mut state, panel, content);
    }

    fn stream_start(&self, panel: Panel) {
        let mut state = self.lock();
        state.live.insert(panel);
        Self::record(&mut state, panel, STREAM_CURSOR.to_string());
    }

    fn stream_append(&self, panel: Panel, fragment: &str) {
        let mut state = self.lock();
        if !state.live.contains(&panel) {
            return;
        }
        let current = state.panels.get(&panel).cloned().unwrap_or_default();
        let text = current.strip_suffix(STREAM_CURSOR).unwrap_or(&current);
        let updated = format!("{text}{fragment}{STREAM_CURSOR}");
        Self::record(&mut state, panel, updated);
    }

    fn stream_end(&self, panel: Panel) {
        let mut state = self.lock();
        if !state.live.remove(&panel) {
            return;
        }
        let current = state.panels.get(&panel).cloned().unwrap_or_default();
        let text = current
            .strip_suffix(STREAM_CURSOR)
            .unwrap_or(&current)
            .to_string();
        Self::record(&mut state, panel, text);
    }

    fn set_loading(&self, control: Control, loading: bool) {
        let mut state = self.lock();
        if loading {
            state.loading.insert(control);
        } else {
            state.loading.remove(&control);
        }
    }

    fn notify(&self, toast: Toast) {
        self.lock().toasts.push(toast);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_overwrites_previous_content() {
        let board = PanelBoard::new();
        board.replace(Panel::Health, "first".into());
        board.replace(Panel::Health, "second".into());
        assert_eq!(board.content(Panel::Health), "second");
        assert_eq!(board.history(Panel::Health), vec!["first", "second"]);
    }

    #[test]
    fn live_region_keeps_cursor_until_closed() {
        let board = PanelBoard::new();
        board.stream_start(Panel::Answer);
        board.stream_append(Panel::Answer, "Hel");
        board.stream_append(Panel::Answer, "lo");
        assert_eq!(board.content(Panel::Answer), format!("Hello{STREAM_CURSOR}"));

        board.stream_end(Panel::Answer);
        assert_eq!(board.content(Panel::Answer), "Hello");

        board.stream_append(Panel::Answer, "ignored");
        assert_eq!(board.content(Panel::Answer), "Hello");
    }

    #[test]
    fn loading_state_toggles() {
        let board = PanelBoard::new();
        board.set_loading(Control::DeleteCollection, true);
        assert!(board.is_loading(Control::DeleteCollection));
        board.set_loading(Control::DeleteCollection, false);
        assert!(!board.is_loading(Control::DeleteCollection));
    }
}
