//! Holder check widget.
//!
//! Reads the shared wallet slot on every run and never writes to it.
//! Collections are queried one after another; a failure on one collection is
//! recorded on its line and the loop moves on.

use std::sync::Arc;

use log::{info, warn};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use super::rpc::{fetch_holding, RpcTransport};
use super::{format_report, CollectionDescriptor, CollectionReport, HoldingResult};
use crate::ui::{MessageArea, TriggerControl};
use crate::wallet::{WalletChange, WalletStore};

pub const MSG_CONNECT_FIRST: &str =
    "No wallet connected. Connect your Solana wallet with Phantom or Backpack and try again.";
pub const MSG_CHECKING: &str = "Querying on-chain. This may take a few seconds...";
pub const MSG_WALLET_DISCONNECTED: &str =
    "Wallet disconnected. Click Connect Wallet to check again.";
pub const MSG_WALLET_CONNECTED: &str =
    "Wallet connected. Click Check holder to verify your NFTs.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckOutcome {
    /// No wallet was connected; nothing was queried.
    NotConnected,
    /// The wallet disconnected or switched accounts mid-check; results dropped.
    Interrupted,
    Completed {
        owner: String,
        reports: Vec<CollectionReport>,
    },
}

pub struct HolderChecker {
    store: Arc<WalletStore>,
    transport: Arc<dyn RpcTransport>,
    collections: Vec<CollectionDescriptor>,
    result: Arc<dyn MessageArea>,
    trigger: Option<Arc<dyn TriggerControl>>,
}

impl HolderChecker {
    pub fn new(
        store: Arc<WalletStore>,
        transport: Arc<dyn RpcTransport>,
        collections: Vec<CollectionDescriptor>,
        result: Arc<dyn MessageArea>,
    ) -> Self {
        Self {
            store,
            transport,
            collections,
            result,
            trigger: None,
        }
    }

    /// Disable this control while a check is in flight.
    pub fn with_trigger(mut self, trigger: Arc<dyn TriggerControl>) -> Self {
        self.trigger = Some(trigger);
        self
    }

    fn still_owner(&self, owner: &str) -> bool {
        self.store.public_key().as_deref() == Some(owner)
    }

    pub async fn run_check(&self) -> CheckOutcome {
        let Some(owner) = self.store.public_key() else {
            self.result.set_text(MSG_CONNECT_FIRST);
            return CheckOutcome::NotConnected;
        };

        if let Some(trigger) = &self.trigger {
            trigger.set_enabled(false);
        }
        self.result.set_text(MSG_CHECKING);
        info!(
            "🔍 [HOLDER] Checking {} collections for {}",
            self.collections.len(),
            crate::wallet::format_address(&owner)
        );

        let outcome = self.query_all(owner).await;

        match &outcome {
            CheckOutcome::Completed { owner, reports } => {
                self.result.set_text(&format_report(owner, reports));
            }
            _ if self.store.is_connected() => self.result.set_text(MSG_WALLET_CONNECTED),
            _ => self.result.set_text(MSG_WALLET_DISCONNECTED),
        }
        if let Some(trigger) = &self.trigger {
            trigger.set_enabled(true);
        }
        outcome
    }

    async fn query_all(&self, owner: String) -> CheckOutcome {
        let mut reports = Vec::with_capacity(self.collections.len());
        for collection in &self.collections {
            if !self.still_owner(&owner) {
                info!("🔌 [HOLDER] Wallet changed mid-check, dropping results");
                return CheckOutcome::Interrupted;
            }
            let outcome = match fetch_holding(self.transport.as_ref(), &owner, collection).await {
                Ok(result) => result,
                Err(e) => {
                    warn!("⚠️ [HOLDER] {} lookup failed: {}", collection.name, e);
                    HoldingResult::failed(e)
                }
            };
            reports.push(CollectionReport {
                collection: collection.clone(),
                outcome,
            });
        }

        if !self.still_owner(&owner) {
            info!("🔌 [HOLDER] Wallet changed mid-check, dropping results");
            return CheckOutcome::Interrupted;
        }
        CheckOutcome::Completed { owner, reports }
    }

    pub fn on_wallet_change(&self, change: &WalletChange) {
        let connected = change.connected
            && change
                .public_key
                .as_deref()
                .map_or(false, |key| !key.is_empty());
        if connected {
            self.result.set_text(MSG_WALLET_CONNECTED);
        } else {
            self.result.set_text(MSG_WALLET_DISCONNECTED);
        }
    }

    /// Follow wallet changes until the store is dropped. Abort the handle to
    /// unsubscribe earlier.
    pub fn watch(self: &Arc<Self>) -> JoinHandle<()> {
        let mut rx = self.store.subscribe();
        let checker = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(change) => checker.on_wallet_change(&change),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("⚠️ [HOLDER] Missed {} wallet events", skipped);
                        let latest = match checker.store.current() {
                            Some(state) => WalletChange {
                                connected: true,
                                provider_name: Some(state.provider_name.clone()),
                                address: Some(state.address()),
                                public_key: Some(state.public_key),
                            },
                            None => WalletChange::disconnected(),
                        };
                        checker.on_wallet_change(&latest);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holder::rpc::RpcError;
    use crate::ui::{MemoryControl, MemoryText};
    use crate::wallet::provider::{FixedKeyProvider, GlobalsSnapshot, InjectedProvider};
    use crate::wallet::WalletConnector;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Mutex;

    const OWNER: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
    const MINT_A: &str = "So11111111111111111111111111111111111111112";
    const MINT_B: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    /// Answers per mint; mints without an entry fail with HTTP 500.
    #[derive(Default)]
    struct ScriptedTransport {
        amounts: HashMap<String, f64>,
        calls: Mutex<Vec<String>>,
        on_call: Option<Box<dyn Fn() + Send + Sync>>,
    }

    #[async_trait]
    impl RpcTransport for ScriptedTransport {
        async fn call(&self, request: &Value) -> Result<Value, RpcError> {
            let mint = request["params"][1]["mint"].as_str().unwrap().to_string();
            self.calls.lock().unwrap().push(mint.clone());
            if let Some(hook) = &self.on_call {
                hook();
            }
            match self.amounts.get(&mint) {
                Some(amount) => Ok(json!({ "result": { "value": [
                    { "account": { "data": { "parsed": { "info": {
                        "tokenAmount": { "uiAmount": amount }
                    } } } } }
                ] } })),
                None => Err(RpcError::Status(500)),
            }
        }
    }

    fn collections() -> Vec<CollectionDescriptor> {
        vec![
            CollectionDescriptor::new("Founders Badge", MINT_A, ""),
            CollectionDescriptor::new("Nether Utilities", "INSERT_NETHER_UTILITIES_MINT", ""),
            CollectionDescriptor::new("Community Nodes", MINT_B, ""),
        ]
    }

    fn connected_store(provider: Arc<FixedKeyProvider>) -> (Arc<WalletStore>, WalletConnector) {
        let store = Arc::new(WalletStore::default());
        let connector = WalletConnector::setup(
            Arc::new(GlobalsSnapshot {
                solana: Some(InjectedProvider::phantom(provider)),
                ..Default::default()
            }),
            store.clone(),
            Arc::new(MemoryControl::new("Connect Wallet")),
            None,
        );
        (store, connector)
    }

    #[tokio::test]
    async fn disconnected_wallet_makes_no_calls() {
        let store = Arc::new(WalletStore::default());
        let transport = Arc::new(ScriptedTransport::default());
        let result = Arc::new(MemoryText::new());
        let checker = HolderChecker::new(store, transport.clone(), collections(), result.clone());

        assert_eq!(checker.run_check().await, CheckOutcome::NotConnected);
        assert_eq!(result.text(), MSG_CONNECT_FIRST);
        assert!(transport.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failures_do_not_abort_the_batch() {
        let provider = Arc::new(FixedKeyProvider::new(OWNER, true));
        let (store, connector) = connected_store(provider);
        connector.eager_connect().await.unwrap();

        let transport = Arc::new(ScriptedTransport {
            amounts: HashMap::from([(MINT_B.to_string(), 1.0)]),
            ..Default::default()
        });
        let result = Arc::new(MemoryText::new());
        let trigger = Arc::new(MemoryControl::new("Check holder"));
        let checker = HolderChecker::new(store, transport.clone(), collections(), result.clone())
            .with_trigger(trigger.clone());

        let CheckOutcome::Completed { owner, reports } = checker.run_check().await else {
            panic!("check should complete");
        };
        assert_eq!(owner, OWNER);
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].outcome, HoldingResult::failed("RPC status 500"));
        assert_eq!(reports[1].outcome, HoldingResult::pending());
        assert_eq!(reports[2].outcome, HoldingResult::found(true));

        // Sequential, in configuration order, placeholder skipped.
        assert_eq!(*transport.calls.lock().unwrap(), vec![MINT_A, MINT_B]);

        assert_eq!(result.history()[0], MSG_CHECKING);
        assert!(result.text().starts_with("Wallet: Toke...Q5DA\n"));
        assert!(result.text().contains("• Community Nodes (EPjF...Dt1v): ✅ Holder confirmed."));
        assert!(trigger.is_enabled());
    }

    #[tokio::test]
    async fn disconnect_mid_check_drops_stale_owner() {
        let provider = Arc::new(FixedKeyProvider::new(OWNER, true));
        let (store, connector) = connected_store(provider.clone());
        connector.eager_connect().await.unwrap();

        let emitter = Arc::clone(&provider);
        let transport = Arc::new(ScriptedTransport {
            amounts: HashMap::from([(MINT_A.to_string(), 1.0), (MINT_B.to_string(), 1.0)]),
            on_call: Some(Box::new(move || emitter.emit(None))),
            ..Default::default()
        });
        let result = Arc::new(MemoryText::new());
        let checker = HolderChecker::new(store, transport.clone(), collections(), result.clone());

        assert_eq!(checker.run_check().await, CheckOutcome::Interrupted);
        assert_eq!(transport.calls.lock().unwrap().len(), 1);
        assert_eq!(result.text(), MSG_WALLET_DISCONNECTED);
    }

    #[tokio::test]
    async fn watch_follows_wallet_events() {
        let provider = Arc::new(FixedKeyProvider::new(OWNER, true));
        let (store, connector) = connected_store(provider.clone());
        let result = Arc::new(MemoryText::new());
        let checker = Arc::new(HolderChecker::new(
            store,
            Arc::new(ScriptedTransport::default()),
            collections(),
            result.clone(),
        ));
        let handle = checker.watch();

        connector.eager_connect().await.unwrap();
        provider.emit(None);

        for _ in 0..50 {
            if result.history().len() >= 2 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(
            result.history(),
            vec![MSG_WALLET_CONNECTED.to_string(), MSG_WALLET_DISCONNECTED.to_string()]
        );
        handle.abort();
    }
}
