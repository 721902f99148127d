//! Injected wallet providers and detection.
//!
//! Browser wallets expose themselves as globals (`window.backpack.solana`,
//! `window.solana`, `window.phantom.solana`). Here those globals are reached
//! through [`InjectedGlobals`] so detection and the connect handshake run
//! against any implementation, including the headless [`FixedKeyProvider`].

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use log::debug;
use strum_macros::Display;
use thiserror::Error;

/// Message wallets use when the user dismisses the connect prompt.
pub const USER_REJECTED_MESSAGE: &str = "User rejected the request.";

/// EIP-1193 style code for a user rejection.
pub const USER_REJECTED_CODE: i64 = 4001;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Only succeed if the site was authorised before; never prompt.
    pub only_if_trusted: bool,
}

impl ConnectOptions {
    pub fn trusted_only() -> Self {
        Self {
            only_if_trusted: true,
        }
    }

    pub fn interactive() -> Self {
        Self::default()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectResponse {
    pub public_key: Option<String>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
    pub code: Option<i64>,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: i64) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }

    pub fn user_rejected() -> Self {
        Self::with_code(USER_REJECTED_MESSAGE, USER_REJECTED_CODE)
    }

    pub fn is_user_rejection(&self) -> bool {
        self.message == USER_REJECTED_MESSAGE || self.code == Some(USER_REJECTED_CODE)
    }
}

/// Called with the new account, or `None` when the wallet disconnected.
pub type AccountListener = Arc<dyn Fn(Option<String>) + Send + Sync>;

/// Handle for a registered listener. Releasing (or dropping) it unregisters
/// the listener; the release hook runs at most once.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    pub fn release(mut self) {
        self.run_release();
    }

    fn run_release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn connect(&self, options: ConnectOptions) -> Result<ConnectResponse, ProviderError>;

    /// Register for "accountChanged". Providers without an event API return `None`.
    fn on_account_changed(&self, listener: AccountListener) -> Option<Subscription>;
}

/* ------------------------------------------------------------------ */
/*  Detection                                                          */
/* ------------------------------------------------------------------ */

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum WalletKind {
    Backpack,
    Phantom,
}

/// Where a wallet injects itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum InjectionPoint {
    #[strum(serialize = "backpack.solana")]
    BackpackSolana,
    #[strum(serialize = "solana")]
    Solana,
    #[strum(serialize = "phantom.solana")]
    PhantomSolana,
}

/// Lookup order; the first slot whose object carries the matching flag wins.
pub const DETECTION_ORDER: [(InjectionPoint, WalletKind); 3] = [
    (InjectionPoint::BackpackSolana, WalletKind::Backpack),
    (InjectionPoint::Solana, WalletKind::Phantom),
    (InjectionPoint::PhantomSolana, WalletKind::Phantom),
];

/// An object found at an injection point, with its self-reported flags.
#[derive(Clone)]
pub struct InjectedProvider {
    pub provider: Arc<dyn WalletProvider>,
    pub is_backpack: bool,
    pub is_phantom: bool,
}

impl InjectedProvider {
    pub fn backpack(provider: Arc<dyn WalletProvider>) -> Self {
        Self {
            provider,
            is_backpack: true,
            is_phantom: false,
        }
    }

    pub fn phantom(provider: Arc<dyn WalletProvider>) -> Self {
        Self {
            provider,
            is_backpack: false,
            is_phantom: true,
        }
    }

    fn claims(&self, kind: WalletKind) -> bool {
        match kind {
            WalletKind::Backpack => self.is_backpack,
            WalletKind::Phantom => self.is_phantom,
        }
    }
}

pub trait InjectedGlobals: Send + Sync {
    fn lookup(&self, point: InjectionPoint) -> Option<InjectedProvider>;
}

/// Fixed view of the injection points.
#[derive(Clone, Default)]
pub struct GlobalsSnapshot {
    pub backpack_solana: Option<InjectedProvider>,
    pub solana: Option<InjectedProvider>,
    pub phantom_solana: Option<InjectedProvider>,
}

impl GlobalsSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }
}

impl InjectedGlobals for GlobalsSnapshot {
    fn lookup(&self, point: InjectionPoint) -> Option<InjectedProvider> {
        match point {
            InjectionPoint::BackpackSolana => self.backpack_solana.clone(),
            InjectionPoint::Solana => self.solana.clone(),
            InjectionPoint::PhantomSolana => self.phantom_solana.clone(),
        }
    }
}

#[derive(Clone)]
pub struct DetectedProvider {
    pub kind: WalletKind,
    pub provider: Arc<dyn WalletProvider>,
}

impl DetectedProvider {
    pub fn name(&self) -> String {
        self.kind.to_string()
    }
}

impl std::fmt::Debug for DetectedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectedProvider")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

pub fn detect_provider(globals: &dyn InjectedGlobals) -> Option<DetectedProvider> {
    for (point, kind) in DETECTION_ORDER {
        if let Some(injected) = globals.lookup(point) {
            if injected.claims(kind) {
                debug!("🔎 [WALLET] Found {} at window.{}", kind, point);
                return Some(DetectedProvider {
                    kind,
                    provider: injected.provider,
                });
            }
        }
    }
    None
}

/* ------------------------------------------------------------------ */
/*  Headless provider                                                  */
/* ------------------------------------------------------------------ */

/// Provider backed by a known key. Trusted instances accept eager
/// connections; listeners can be driven through [`FixedKeyProvider::emit`].
pub struct FixedKeyProvider {
    public_key: String,
    trusted: bool,
    listeners: Arc<Mutex<Vec<(u64, AccountListener)>>>,
    next_id: Mutex<u64>,
}

impl FixedKeyProvider {
    pub fn new(public_key: impl Into<String>, trusted: bool) -> Self {
        Self {
            public_key: public_key.into(),
            trusted,
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_id: Mutex::new(0),
        }
    }

    /// Deliver an account change to every registered listener.
    pub fn emit(&self, account: Option<String>) {
        let listeners: Vec<AccountListener> = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(account.clone());
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl WalletProvider for FixedKeyProvider {
    async fn connect(&self, options: ConnectOptions) -> Result<ConnectResponse, ProviderError> {
        if options.only_if_trusted && !self.trusted {
            return Err(ProviderError::user_rejected());
        }
        Ok(ConnectResponse {
            public_key: Some(self.public_key.clone()),
        })
    }

    fn on_account_changed(&self, listener: AccountListener) -> Option<Subscription> {
        let id = {
            let mut next = self.next_id.lock().unwrap_or_else(|e| e.into_inner());
            *next += 1;
            *next
        };
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, listener));

        let listeners = Arc::clone(&self.listeners);
        Some(Subscription::new(move || {
            listeners
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .retain(|(existing, _)| *existing != id);
        }))
    }
}
