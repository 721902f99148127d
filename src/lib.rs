//! Wallet connect and NFT holder check widgets for Solana pages.
//!
//! [`wallet::WalletConnector`] owns the shared [`wallet::WalletStore`];
//! [`holder::HolderChecker`] reads it and queries the RPC endpoint.
//! [`page::Page`] mounts both on one slot.

pub mod config;
pub mod holder;
pub mod page;
pub mod ui;
pub mod wallet;
