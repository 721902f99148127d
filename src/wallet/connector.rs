//! Connect widget: detects a wallet, runs the handshake and keeps the
//! shared [`WalletStore`] in sync with the provider.
//!
//! State machine:
//!
//! ```text
//! Disconnected --(eager connect ok | click connect ok)--> Connected
//! Connected    --(accountChanged with no account)------> Disconnected
//! ```
//!
//! `accountChanged` with a new account stays in Connected and republishes.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use log::{debug, info, warn};
use thiserror::Error;

use super::clipboard::{Clipboard, ClipboardError, CopyButton, CopyControl};
use super::format_address;
use super::provider::{
    detect_provider, ConnectOptions, DetectedProvider, InjectedGlobals, ProviderError,
    Subscription,
};
use super::store::{WalletState, WalletStore};
use crate::ui::{MessageArea, TriggerControl};

pub const DEFAULT_IDLE_LABEL: &str = "Connect Wallet";
pub const CONNECTED_LABEL: &str = "Wallet connected";

pub const MSG_INSTALL: &str = "Install Phantom (https://phantom.app) or Backpack \
     (https://www.backpack.app) and reload the page.";
pub const MSG_REQUESTING: &str = "Requesting connection...";
pub const MSG_CANCELLED: &str = "Connection cancelled by the user.";
pub const MSG_FAILED: &str = "Failed to connect. Check the extension and try again.";
pub const MSG_NO_PUBLIC_KEY: &str = "Could not read the wallet public key.";
pub const MSG_DISCONNECTED: &str = "Wallet disconnected. Click to connect again.";

pub fn connected_message(provider_name: &str, public_key: &str) -> String {
    format!(
        "Wallet connected ({}): {}",
        provider_name,
        format_address(public_key)
    )
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("no wallet provider installed")]
    ProviderNotFound,
    #[error("connection rejected by the user")]
    UserRejected,
    #[error("wallet returned no public key")]
    MissingPublicKey,
    #[error("connection failed: {0}")]
    Failed(#[source] ProviderError),
}

struct Inner {
    globals: Arc<dyn InjectedGlobals>,
    store: Arc<WalletStore>,
    trigger: Arc<dyn TriggerControl>,
    message: Option<Arc<dyn MessageArea>>,
    idle_label: String,
    active: Mutex<Option<DetectedProvider>>,
    subscription: Mutex<Option<Subscription>>,
}

impl Inner {
    fn set_message(&self, text: &str) {
        if let Some(message) = &self.message {
            message.set_text(text);
        }
    }

    fn enter_connected(
        self: &Arc<Self>,
        detected: DetectedProvider,
        public_key: String,
    ) -> WalletState {
        let name = detected.name();
        self.trigger.set_enabled(false);
        self.trigger.set_label(CONNECTED_LABEL);
        self.set_message(&connected_message(&name, &public_key));

        let state = WalletState::new(Arc::clone(&detected.provider), name, public_key);
        *self.active.lock().unwrap_or_else(|e| e.into_inner()) = Some(detected.clone());
        self.store.publish(Some(state.clone()));
        self.attach_account_listener(&detected);
        state
    }

    fn attach_account_listener(self: &Arc<Self>, detected: &DetectedProvider) {
        let weak: Weak<Inner> = Arc::downgrade(self);
        let source = detected.clone();
        let listener = Arc::new(move |account: Option<String>| {
            if let Some(inner) = weak.upgrade() {
                inner.on_account_changed(&source, account);
            }
        });

        let subscription = detected.provider.on_account_changed(listener);
        if subscription.is_none() {
            debug!("🔕 [WALLET] {} exposes no account events", detected.kind);
        }
        // Replacing drops (and releases) any listener from an earlier connect.
        *self.subscription.lock().unwrap_or_else(|e| e.into_inner()) = subscription;
    }

    fn release_account_listener(&self) {
        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(subscription) = subscription {
            subscription.release();
        }
    }

    fn on_account_changed(&self, source: &DetectedProvider, account: Option<String>) {
        // Leaving Disconnected takes an eager connect or a click.
        if self.active.lock().unwrap_or_else(|e| e.into_inner()).is_none() {
            debug!("🔕 [WALLET] Ignoring {} event while disconnected", source.kind);
            return;
        }

        match account.filter(|a| !a.is_empty()) {
            None => {
                info!("🔌 [WALLET] {} disconnected", source.kind);
                self.trigger.set_enabled(true);
                self.trigger.set_label(&self.idle_label);
                self.set_message(MSG_DISCONNECTED);
                *self.active.lock().unwrap_or_else(|e| e.into_inner()) = None;
                self.release_account_listener();
                self.store.publish(None);
            }
            Some(public_key) => {
                let name = source.name();
                info!("🔁 [WALLET] {} switched to {}", name, format_address(&public_key));
                self.set_message(&connected_message(&name, &public_key));
                self.store.publish(Some(WalletState::new(
                    Arc::clone(&source.provider),
                    name,
                    public_key,
                )));
            }
        }
    }
}

/// Connect widget bound to one trigger control and an optional message area.
pub struct WalletConnector {
    inner: Arc<Inner>,
    copy_buttons: Vec<Arc<CopyButton>>,
}

impl WalletConnector {
    /// Bind the widget and reset the shared slot to disconnected.
    pub fn setup(
        globals: Arc<dyn InjectedGlobals>,
        store: Arc<WalletStore>,
        trigger: Arc<dyn TriggerControl>,
        message: Option<Arc<dyn MessageArea>>,
    ) -> Self {
        let mut idle_label = trigger.label();
        if idle_label.is_empty() {
            idle_label = DEFAULT_IDLE_LABEL.to_string();
        }

        store.publish(None);

        Self {
            inner: Arc::new(Inner {
                globals,
                store,
                trigger,
                message,
                idle_label,
                active: Mutex::new(None),
                subscription: Mutex::new(None),
            }),
            copy_buttons: Vec::new(),
        }
    }

    /// Bind the copy controls that sit next to the widget. Every button
    /// shares `clipboard` and flashes its feedback for `revert_after`.
    pub fn with_copy_buttons(
        mut self,
        controls: Vec<CopyControl>,
        clipboard: Arc<dyn Clipboard>,
        revert_after: Duration,
    ) -> Self {
        self.copy_buttons = controls
            .into_iter()
            .map(|c| {
                Arc::new(CopyButton::new(
                    c.control,
                    c.value,
                    Arc::clone(&clipboard),
                    revert_after,
                ))
            })
            .collect();
        self
    }

    pub fn copy_buttons(&self) -> &[Arc<CopyButton>] {
        &self.copy_buttons
    }

    /// Click handler for the copy control at `index`. Failures are shown on
    /// the button itself.
    pub async fn handle_copy_click(&self, index: usize) -> Result<(), ClipboardError> {
        match self.copy_buttons.get(index) {
            Some(button) => button.click().await,
            None => Ok(()),
        }
    }

    pub fn active_provider(&self) -> Option<DetectedProvider> {
        self.inner
            .active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Silent reconnect for sites the wallet already trusts. Any failure,
    /// including a missing provider, leaves the widget untouched.
    pub async fn eager_connect(&self) -> Option<WalletState> {
        let detected = detect_provider(self.inner.globals.as_ref())?;

        match detected.provider.connect(ConnectOptions::trusted_only()).await {
            Ok(response) => {
                let public_key = response.public_key.filter(|k| !k.is_empty())?;
                info!("⚡ [WALLET] Eager connect with {}", detected.kind);
                Some(self.inner.enter_connected(detected, public_key))
            }
            Err(e) => {
                debug!("💤 [WALLET] No trusted session with {}: {}", detected.kind, e);
                None
            }
        }
    }

    /// Click handler for the connect trigger. Every outcome is also written
    /// to the message area.
    pub async fn handle_connect_click(&self) -> Result<WalletState, ConnectError> {
        let inner = &self.inner;
        let Some(detected) = detect_provider(inner.globals.as_ref()) else {
            inner.set_message(MSG_INSTALL);
            return Err(ConnectError::ProviderNotFound);
        };

        inner.trigger.set_enabled(false);
        inner.set_message(MSG_REQUESTING);
        info!("🔌 [WALLET] Requesting connection from {}", detected.kind);

        match detected.provider.connect(ConnectOptions::interactive()).await {
            Ok(response) => match response.public_key.filter(|k| !k.is_empty()) {
                Some(public_key) => Ok(inner.enter_connected(detected, public_key)),
                None => {
                    warn!("⚠️ [WALLET] {} returned no public key", detected.kind);
                    inner.trigger.set_enabled(true);
                    inner.set_message(MSG_NO_PUBLIC_KEY);
                    Err(ConnectError::MissingPublicKey)
                }
            },
            Err(e) if e.is_user_rejection() => {
                info!("🙅 [WALLET] User cancelled the {} prompt", detected.kind);
                inner.trigger.set_enabled(true);
                inner.set_message(MSG_CANCELLED);
                Err(ConnectError::UserRejected)
            }
            Err(e) => {
                warn!("❌ [WALLET] {} connect failed: {}", detected.kind, e);
                inner.trigger.set_enabled(true);
                inner.set_message(MSG_FAILED);
                Err(ConnectError::Failed(e))
            }
        }
    }

    /// Release the account listener. Wallet state is left as is.
    pub fn teardown(&self) {
        self.inner.release_account_listener();
    }
}

impl Drop for WalletConnector {
    fn drop(&mut self) {
        self.teardown();
    }
}
