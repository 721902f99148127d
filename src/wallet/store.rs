//! Shared wallet slot with change notifications.
//!
//! One [`WalletStore`] is created per page and handed to both widgets. The
//! connector is the only writer; everything else reads [`WalletStore::current`]
//! or subscribes to [`WalletChange`] events.

use std::sync::{Arc, RwLock};

use log::info;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::format_address;
use super::provider::WalletProvider;

pub const DEFAULT_EVENT_CAPACITY: usize = 16;
/// Upper bound for buffered change events per subscriber.
pub const MAX_EVENT_CAPACITY: usize = 4096;

/// A connected wallet. Only ever stored with a non-empty key.
#[derive(Clone)]
pub struct WalletState {
    pub provider: Arc<dyn WalletProvider>,
    pub provider_name: String,
    pub public_key: String,
}

impl WalletState {
    pub fn new(
        provider: Arc<dyn WalletProvider>,
        provider_name: impl Into<String>,
        public_key: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            provider_name: provider_name.into(),
            public_key: public_key.into(),
        }
    }

    pub fn is_connected(&self) -> bool {
        !self.public_key.is_empty()
    }

    pub fn address(&self) -> String {
        format_address(&self.public_key)
    }
}

impl std::fmt::Debug for WalletState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletState")
            .field("provider_name", &self.provider_name)
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Payload of the "wallet state changed" notification.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletChange {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl WalletChange {
    pub fn disconnected() -> Self {
        Self::default()
    }

    fn from_state(state: &WalletState) -> Self {
        Self {
            connected: true,
            provider_name: Some(state.provider_name.clone()),
            public_key: Some(state.public_key.clone()),
            address: Some(state.address()),
        }
    }
}

pub struct WalletStore {
    current: RwLock<Option<WalletState>>,
    events: broadcast::Sender<WalletChange>,
}

impl WalletStore {
    /// `capacity` is clamped to `1..=MAX_EVENT_CAPACITY`.
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.clamp(1, MAX_EVENT_CAPACITY));
        Self {
            current: RwLock::new(None),
            events,
        }
    }

    pub fn current(&self) -> Option<WalletState> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn public_key(&self) -> Option<String> {
        self.current().map(|s| s.public_key)
    }

    pub fn is_connected(&self) -> bool {
        self.current().is_some()
    }

    /// Receive every change published after this call. Dropping the
    /// receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<WalletChange> {
        self.events.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Replace the slot and notify subscribers. A state with an empty key is
    /// treated as a disconnect.
    pub(crate) fn publish(&self, state: Option<WalletState>) -> WalletChange {
        let state = state.filter(WalletState::is_connected);
        let change = match &state {
            Some(s) => WalletChange::from_state(s),
            None => WalletChange::disconnected(),
        };

        *self.current.write().unwrap_or_else(|e| e.into_inner()) = state;

        match &change.address {
            Some(address) => info!("📣 [WALLET_STATE] Connected {}", address),
            None => info!("📣 [WALLET_STATE] Disconnected"),
        }
        // No subscribers is fine.
        let _ = self.events.send(change.clone());
        change
    }
}

impl Default for WalletStore {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl std::fmt::Debug for WalletStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletStore")
            .field("current", &self.current())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
