//! NFT holder check: configured collections, per-collection outcomes and
//! the text report shown to the user.

pub mod checker;
pub mod rpc;

use serde::{Deserialize, Serialize};

use crate::wallet::format_address;

pub use checker::{CheckOutcome, HolderChecker};
pub use rpc::{fetch_holding, HttpTransport, RpcError, RpcTransport};

/// Prefix used for mints that have not been published yet.
pub const PLACEHOLDER_PREFIX: &str = "INSERT_";
pub const MINT_PENDING: &str = "mint pending";
pub const NOTE_NOT_PUBLISHED: &str = "Mint not yet published.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDescriptor {
    pub name: String,
    pub mint: String,
    #[serde(default)]
    pub description: String,
}

impl CollectionDescriptor {
    pub fn new(name: &str, mint: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            mint: mint.to_string(),
            description: description.to_string(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.mint.is_empty() || self.mint.starts_with(PLACEHOLDER_PREFIX)
    }

    /// Short mint for display, or "mint pending" for placeholders.
    pub fn pretty_mint(&self) -> String {
        if self.is_placeholder() {
            MINT_PENDING.to_string()
        } else {
            format_address(&self.mint)
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HoldingResult {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HoldingResult {
    pub fn found(found: bool) -> Self {
        Self {
            found,
            ..Default::default()
        }
    }

    pub fn pending() -> Self {
        Self {
            found: false,
            note: Some(NOTE_NOT_PUBLISHED.to_string()),
            error: None,
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            found: false,
            note: None,
            error: Some(error.to_string()),
        }
    }

    /// Status text for one report line. Errors win over notes, notes over the
    /// found flag.
    pub fn status(&self) -> String {
        if let Some(error) = &self.error {
            format!("Error while querying ({error}).")
        } else if let Some(note) = &self.note {
            note.clone()
        } else if self.found {
            "✅ Holder confirmed.".to_string()
        } else {
            "❌ Not a holder yet.".to_string()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CollectionReport {
    pub collection: CollectionDescriptor,
    pub outcome: HoldingResult,
}

impl CollectionReport {
    pub fn line(&self) -> String {
        format!(
            "• {} ({}): {}",
            self.collection.name,
            self.collection.pretty_mint(),
            self.outcome.status()
        )
    }
}

pub fn format_report(owner: &str, reports: &[CollectionReport]) -> String {
    let mut lines = Vec::with_capacity(reports.len() + 1);
    lines.push(format!("Wallet: {}", format_address(owner)));
    lines.extend(reports.iter().map(CollectionReport::line));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
    const MINT: &str = "So11111111111111111111111111111111111111112";

    #[test]
    fn placeholder_detection() {
        assert!(CollectionDescriptor::new("A", "INSERT_FOUNDERS_BADGE_MINT", "").is_placeholder());
        assert!(CollectionDescriptor::new("A", "", "").is_placeholder());
        assert!(!CollectionDescriptor::new("A", MINT, "").is_placeholder());
    }

    #[test]
    fn pretty_mint_forms() {
        assert_eq!(CollectionDescriptor::new("A", "INSERT_X", "").pretty_mint(), MINT_PENDING);
        assert_eq!(CollectionDescriptor::new("A", MINT, "").pretty_mint(), "So11...1112");
    }

    #[test]
    fn report_lists_every_outcome() {
        let reports = vec![
            CollectionReport {
                collection: CollectionDescriptor::new("Founders Badge", MINT, ""),
                outcome: HoldingResult::found(true),
            },
            CollectionReport {
                collection: CollectionDescriptor::new("Nether Utilities", MINT, ""),
                outcome: HoldingResult::found(false),
            },
            CollectionReport {
                collection: CollectionDescriptor::new("Community Nodes", "INSERT_NODES", ""),
                outcome: HoldingResult::pending(),
            },
            CollectionReport {
                collection: CollectionDescriptor::new("Broken", MINT, ""),
                outcome: HoldingResult::failed("RPC status 503"),
            },
        ];

        let text = format_report(OWNER, &reports);
        let expected = [
            "Wallet: Toke...Q5DA",
            "• Founders Badge (So11...1112): ✅ Holder confirmed.",
            "• Nether Utilities (So11...1112): ❌ Not a holder yet.",
            "• Community Nodes (mint pending): Mint not yet published.",
            "• Broken (So11...1112): Error while querying (RPC status 503).",
        ]
        .join("\n");
        assert_eq!(text, expected);
    }
}
