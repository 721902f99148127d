//! One page with both widgets mounted on a shared wallet slot.

use std::sync::Arc;

use log::info;
use tokio::task::JoinHandle;

use crate::config::Settings;
use crate::holder::{HolderChecker, RpcTransport};
use crate::ui::{MessageArea, TriggerControl};
use crate::wallet::clipboard::{Clipboard, CopyControl};
use crate::wallet::provider::InjectedGlobals;
use crate::wallet::{WalletConnector, WalletState, WalletStore};

/// Controls the page exposes to the widgets.
pub struct PageSurfaces {
    pub connect_trigger: Arc<dyn TriggerControl>,
    pub wallet_message: Option<Arc<dyn MessageArea>>,
    pub check_trigger: Option<Arc<dyn TriggerControl>>,
    pub holder_result: Arc<dyn MessageArea>,
    pub copy_controls: Vec<CopyControl>,
}

pub struct Page {
    pub store: Arc<WalletStore>,
    pub connector: WalletConnector,
    pub checker: Arc<HolderChecker>,
    watcher: JoinHandle<()>,
}

impl Page {
    /// Bind both widgets, start following wallet changes, then try a silent
    /// reconnect.
    pub async fn mount(
        settings: &Settings,
        globals: Arc<dyn InjectedGlobals>,
        transport: Arc<dyn RpcTransport>,
        clipboard: Arc<dyn Clipboard>,
        surfaces: PageSurfaces,
    ) -> Self {
        let store = Arc::new(WalletStore::new(settings.event_capacity));

        let connector = WalletConnector::setup(
            globals,
            Arc::clone(&store),
            surfaces.connect_trigger,
            surfaces.wallet_message,
        )
        .with_copy_buttons(surfaces.copy_controls, clipboard, settings.copy_feedback());

        let mut checker = HolderChecker::new(
            Arc::clone(&store),
            transport,
            settings.collections.clone(),
            surfaces.holder_result,
        );
        if let Some(trigger) = surfaces.check_trigger {
            checker = checker.with_trigger(trigger);
        }
        let checker = Arc::new(checker);
        let watcher = checker.watch();

        if let Some(state) = connector.eager_connect().await {
            info!("🧩 [PAGE] Restored session for {}", state.address());
        }

        Self {
            store,
            connector,
            checker,
            watcher,
        }
    }

    pub fn wallet(&self) -> Option<WalletState> {
        self.store.current()
    }
}

impl Drop for Page {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}
