//! Wallet connection: provider detection, the connect handshake and the
//! shared state the holder checker reads.

pub mod clipboard;
pub mod connector;
pub mod provider;
pub mod store;

pub use connector::{ConnectError, WalletConnector};
pub use provider::{detect_provider, DetectedProvider, WalletKind, WalletProvider};
pub use store::{WalletChange, WalletState, WalletStore};

/// Display form of a base58 key: first 4 + "..." + last 4.
///
/// Keys shorter than 8 characters (and the empty string) have no meaningful
/// short form and yield an empty string.
pub fn format_address(public_key: &str) -> String {
    let chars: Vec<char> = public_key.chars().collect();
    if chars.len() < 8 {
        return String::new();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// True when `value` decodes as base58 into a 32-byte Solana public key.
pub fn is_valid_public_key(value: &str) -> bool {
    bs58::decode(value)
        .into_vec()
        .map(|bytes| bytes.len() == 32)
        .unwrap_or(false)
}
