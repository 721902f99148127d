//! Page surfaces the widgets write to.
//!
//! The connector and the checker never touch a document directly. They talk to
//! a [`TriggerControl`] (a button that can be disabled and relabelled) and a
//! [`MessageArea`] (a text node). Embedders bind these to real elements; the
//! in-memory versions below back the CLI and the tests.

use std::sync::Mutex;

/// Clickable control with a mutable label.
pub trait TriggerControl: Send + Sync {
    fn set_enabled(&self, enabled: bool);
    fn is_enabled(&self) -> bool;
    fn set_label(&self, label: &str);
    fn label(&self) -> String;
}

/// Plain text output area.
pub trait MessageArea: Send + Sync {
    fn set_text(&self, text: &str);
}

/* ------------------------------------------------------------------ */
/*  In-memory surfaces                                                 */
/* ------------------------------------------------------------------ */

#[derive(Debug)]
pub struct MemoryControl {
    inner: Mutex<ControlState>,
}

#[derive(Debug, Clone)]
struct ControlState {
    enabled: bool,
    label: String,
}

impl MemoryControl {
    pub fn new(label: &str) -> Self {
        Self {
            inner: Mutex::new(ControlState {
                enabled: true,
                label: label.to_string(),
            }),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut ControlState) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }
}

impl TriggerControl for MemoryControl {
    fn set_enabled(&self, enabled: bool) {
        self.with(|s| s.enabled = enabled);
    }

    fn is_enabled(&self) -> bool {
        self.with(|s| s.enabled)
    }

    fn set_label(&self, label: &str) {
        self.with(|s| s.label = label.to_string());
    }

    fn label(&self) -> String {
        self.with(|s| s.label.clone())
    }
}

/// Text area that remembers every value written to it.
#[derive(Debug, Default)]
pub struct MemoryText {
    history: Mutex<Vec<String>>,
}

impl MemoryText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last text written, empty if nothing was written yet.
    pub fn text(&self) -> String {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
            .unwrap_or_default()
    }

    pub fn history(&self) -> Vec<String> {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl MessageArea for MemoryText {
    fn set_text(&self, text: &str) {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(text.to_string());
    }
}
