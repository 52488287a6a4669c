//! Terminal implementation of the [`View`] seam.

use crate::ui::view::{Control, Panel, STREAM_CURSOR, Toast, ToastLevel, View};
use std::io::Write;
use std::sync::Mutex;

/// Moves back over the cursor, blanks it and moves back again.
const ERASE_CURSOR: &str = "\x08 \x08";

struct TerminalState {
    out: Box<dyn Write + Send>,
    badge: Option<String>,
    progress_open: bool,
}

impl TerminalState {
    fn close_progress(&mut self) {
        if std::mem::take(&mut self.progress_open) {
            let _ = writeln!(self.out);
        }
    }
}

/// Prints panel updates to stdout (or another writer) and toasts to stderr.
pub struct TerminalView {
    show_badge: bool,
    state: Mutex<TerminalState>,
}

impl Default for TerminalView {
    fn default() -> Self {
        Self::with_writer(std::io::stdout())
    }
}

impl TerminalView {
    /// View for one-shot commands; badge changes are not printed.
    pub fn new() -> Self {
        Self::default()
    }

    /// View for long-running sessions that report health indicator changes.
    pub fn with_health_badge() -> Self {
        Self {
            show_badge: true,
            ..Self::default()
        }
    }

    /// View that writes panel content to `out` instead of stdout.
    pub fn with_writer(out: impl Write + Send + 'static) -> Self {
        Self {
            show_badge: false,
            state: Mutex::new(TerminalState {
                out: Box::new(out),
                badge: None,
                progress_open: false,
            }),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut TerminalState) -> R) -> R {
        let mut guard = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let result = f(&mut guard);
        let _ = guard.out.flush();
        result
    }
}

fn title(panel: Panel) -> Option<&'static str> {
    match panel {
        Panel::CollectionInfo => Some("Collection"),
        Panel::Health => Some("Health"),
        Panel::Readiness => Some("Readiness"),
        _ => None,
    }
}

impl View for TerminalView {
    fn replace(&self, panel: Panel, content: String) {
        match panel {
            Panel::UploadProgress => self.with_state(|state| {
                if content.is_empty() {
                    state.close_progress();
                } else {
                    state.progress_open = true;
                    let _ = write!(state.out, "\r{content}");
                }
            }),
            Panel::HealthBadge => {
                let changed = self.with_state(|state| {
                    let changed = state.badge.as_deref() != Some(content.as_str());
                    state.badge = Some(content.clone());
                    changed
                });
                if self.show_badge && changed {
                    eprintln!("(health: {content})");
                }
            }
            _ if content.is_empty() => {}
            _ => self.with_state(|state| {
                state.close_progress();
                if let Some(title) = title(panel) {
                    let _ = writeln!(state.out, "== {title} ==");
                }
                let _ = writeln!(state.out, "{}", content.trim_end());
            }),
        }
    }

    fn stream_start(&self, _panel: Panel) {
        self.with_state(|state| {
            state.close_progress();
            let _ = write!(state.out, "Answer\n{STREAM_CURSOR}");
        });
    }

    fn stream_append(&self, _panel: Panel, fragment: &str) {
        self.with_state(|state| {
            let _ = write!(state.out, "{ERASE_CURSOR}{fragment}{STREAM_CURSOR}");
        });
    }

    fn stream_end(&self, _panel: Panel) {
        self.with_state(|state| {
            let _ = writeln!(state.out, "{ERASE_CURSOR}");
        });
    }

    fn set_loading(&self, control: Control, loading: bool) {
        tracing::trace!(?control, loading, "Control loading state changed");
    }

    fn notify(&self, toast: Toast) {
        let tag = match toast.level {
            ToastLevel::Success => "ok",
            ToastLevel::Info => "info",
            ToastLevel::Warning => "warn",
            ToastLevel::Error => "error",
        };
        let stamp = toast
            .created_at
            .format(time::macros::format_description!("[hour]:[minute]:[second]"))
            .unwrap_or_default();
        eprintln!("[{stamp} {tag}] {}", toast.message);
    }
}
