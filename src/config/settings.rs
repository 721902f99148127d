//! Runtime configuration loader.

use std::{fmt, fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use log::warn;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::holder::rpc::DEFAULT_RPC_ENDPOINT;
use crate::holder::CollectionDescriptor;
use crate::wallet::is_valid_public_key;
use crate::wallet::clipboard::DEFAULT_FEEDBACK;
use crate::wallet::store::{DEFAULT_EVENT_CAPACITY, MAX_EVENT_CAPACITY};

pub const DEFAULT_SETTINGS_PATH: &str = "config/settings.json";

/// Collections checked when the settings file does not list any.
pub static DEFAULT_COLLECTIONS: Lazy<Vec<CollectionDescriptor>> = Lazy::new(|| {
    vec![
        CollectionDescriptor::new(
            "Founders Badge",
            "INSERT_FOUNDERS_BADGE_MINT",
            "NFT granting the [FOUNDER] tag and event priority.",
        ),
        CollectionDescriptor::new(
            "Nether Utilities",
            "INSERT_NETHER_UTILITIES_MINT",
            "Cosmetics and utilities, no pay-to-win.",
        ),
        CollectionDescriptor::new(
            "Community Nodes",
            "INSERT_COMMUNITY_NODES_MINT",
            "Governance and access to on-chain dashboards.",
        ),
    ]
});

/// ------------------------------------------------------------------
/// Settings object
/// ------------------------------------------------------------------
#[derive(Clone, Serialize, Deserialize)]
pub struct Settings {
    /* -------- rpc ----------------------------------- */
    pub rpc_url: String,
    /// `None` leaves requests unbounded.
    pub rpc_timeout_ms: Option<u64>,

    /* -------- holder check -------------------------- */
    pub collections: Vec<CollectionDescriptor>,

    /* -------- widgets ------------------------------- */
    pub copy_feedback_ms: u64,
    pub event_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_ENDPOINT.to_string(),
            rpc_timeout_ms: None,
            collections: DEFAULT_COLLECTIONS.clone(),
            copy_feedback_ms: DEFAULT_FEEDBACK.as_millis() as u64,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl Settings {
    /// --------------------------------------------------------------
    /// Read a settings JSON file; absent keys fall back to defaults.
    /// --------------------------------------------------------------
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading settings file {:?}", path.as_ref()))?;
        Self::from_json_str(&raw)
            .with_context(|| format!("parsing settings file {:?}", path.as_ref()))
    }

    /// --------------------------------------------------------------
    /// Load settings from the default config/settings.json file.
    /// --------------------------------------------------------------
    pub fn load() -> Result<Self> {
        Self::load_from_file(DEFAULT_SETTINGS_PATH)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let json: serde_json::Value = serde_json::from_str(raw)?;
        let defaults = Self::default();

        /* -------- plain values ------------------------------------ */
        let rpc_url = json["rpc_url"]
            .as_str()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or(defaults.rpc_url);
        let rpc_timeout_ms = json["rpc_timeout_ms"].as_u64();
        let copy_feedback_ms = json["copy_feedback_ms"]
            .as_u64()
            .unwrap_or(defaults.copy_feedback_ms);
        let event_capacity = match json["event_capacity"].as_u64() {
            None => defaults.event_capacity,
            Some(n) if (1..=MAX_EVENT_CAPACITY as u64).contains(&n) => n as usize,
            Some(n) => {
                bail!("`event_capacity` must be between 1 and {MAX_EVENT_CAPACITY}, got {n}")
            }
        };

        /* -------- collections ------------------------------------- */
        let collections: Vec<CollectionDescriptor> = match json.get("collections") {
            Some(value) if !value.is_null() => serde_json::from_value(value.clone())
                .context("parsing `collections`")?,
            _ => defaults.collections,
        };
        for c in &collections {
            if !c.is_placeholder() && !is_valid_public_key(&c.mint) {
                warn!(
                    "⚠️ [CONFIG] Mint for {} does not look like a Solana address: {}",
                    c.name, c.mint
                );
            }
        }

        Ok(Self {
            rpc_url,
            rpc_timeout_ms,
            collections,
            copy_feedback_ms,
            event_capacity,
        })
    }

    /// --------------------------------------------------------------
    /// Save settings to a specific file path.
    /// --------------------------------------------------------------
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json_string = serde_json::to_string_pretty(self)?;
        fs::write(&path, json_string)
            .with_context(|| format!("writing settings to {:?}", path.as_ref()))?;
        Ok(())
    }

    pub fn rpc_timeout(&self) -> Option<Duration> {
        self.rpc_timeout_ms.map(Duration::from_millis)
    }

    pub fn copy_feedback(&self) -> Duration {
        Duration::from_millis(self.copy_feedback_ms)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("rpc_url", &self.rpc_url)
            .field("rpc_timeout_ms", &self.rpc_timeout_ms)
            .field("collections", &self.collections.len())
            .finish_non_exhaustive()
    }
}
