//! Copy-to-clipboard buttons shown next to wallet addresses.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::warn;
use thiserror::Error;

use crate::ui::TriggerControl;

pub const COPIED_LABEL: &str = "Copied!";
pub const ERROR_LABEL: &str = "Error";
pub const DEFAULT_COPY_LABEL: &str = "Copy";
pub const DEFAULT_FEEDBACK: Duration = Duration::from_millis(2000);

#[derive(Debug, Error)]
#[error("clipboard write failed: {0}")]
pub struct ClipboardError(pub String);

#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// A copy control on the page and the value it carries (`data-wallet`).
pub struct CopyControl {
    pub control: Arc<dyn TriggerControl>,
    pub value: Option<String>,
}

impl CopyControl {
    pub fn new(control: Arc<dyn TriggerControl>, value: Option<String>) -> Self {
        Self { control, value }
    }
}

pub struct CopyButton {
    control: Arc<dyn TriggerControl>,
    value: Option<String>,
    clipboard: Arc<dyn Clipboard>,
    revert_after: Duration,
}

impl CopyButton {
    pub fn new(
        control: Arc<dyn TriggerControl>,
        value: Option<String>,
        clipboard: Arc<dyn Clipboard>,
        revert_after: Duration,
    ) -> Self {
        Self {
            control,
            value,
            clipboard,
            revert_after,
        }
    }

    /// Copy the value and flash feedback on the button. Resolves once the
    /// label has been reverted; spawn it when the caller must not wait.
    pub async fn click(&self) -> Result<(), ClipboardError> {
        let Some(value) = self.value.as_deref().filter(|v| !v.is_empty()) else {
            return Ok(());
        };

        match self.clipboard.write_text(value).await {
            Ok(()) => {
                let mut original = self.control.label();
                if original.is_empty() {
                    original = DEFAULT_COPY_LABEL.to_string();
                }
                self.control.set_label(COPIED_LABEL);
                tokio::time::sleep(self.revert_after).await;
                self.control.set_label(&original);
                Ok(())
            }
            Err(e) => {
                warn!("⚠️ [CLIPBOARD] {}", e);
                self.control.set_label(ERROR_LABEL);
                tokio::time::sleep(self.revert_after).await;
                self.control.set_label(DEFAULT_COPY_LABEL);
                Err(e)
            }
        }
    }
}
