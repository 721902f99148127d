//! Run one holder check for a wallet address from the command line.
//!
//! Usage: cargo run --bin check_holder -- --owner <ADDRESS> [--settings <FILE>] [--copy]

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use clap::Parser;
use log::debug;
use holder_gate::config::{Settings, DEFAULT_SETTINGS_PATH};
use holder_gate::holder::{CheckOutcome, HttpTransport};
use holder_gate::page::{Page, PageSurfaces};
use holder_gate::ui::{MemoryControl, MemoryText, MessageArea, TriggerControl};
use holder_gate::wallet::clipboard::{Clipboard, ClipboardError, CopyControl};
use holder_gate::wallet::is_valid_public_key;
use holder_gate::wallet::provider::{FixedKeyProvider, GlobalsSnapshot, InjectedProvider};

#[derive(Parser, Debug)]
#[command(about = "Check which configured NFT collections a wallet holds")]
struct Args {
    /// Base58 wallet address to check
    #[arg(long)]
    owner: String,

    /// Settings file; config/settings.json or built-in defaults when absent
    #[arg(long)]
    settings: Option<String>,

    /// Wallet the address is presented as
    #[arg(long, default_value = "phantom")]
    wallet: String,

    /// Also press the copy button next to the address
    #[arg(long)]
    copy: bool,
}

/// Prints copied text instead of touching a system clipboard.
struct StdoutClipboard;

#[async_trait]
impl Clipboard for StdoutClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        println!("📋 {}", text);
        Ok(())
    }
}

fn load_settings(path: Option<&str>) -> Result<Settings> {
    match path {
        Some(path) => Settings::load_from_file(path),
        None if Path::new(DEFAULT_SETTINGS_PATH).exists() => Settings::load(),
        None => Ok(Settings::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if !is_valid_public_key(&args.owner) {
        return Err(anyhow!("`{}` is not a valid Solana address", args.owner));
    }

    let settings = load_settings(args.settings.as_deref())?;
    debug!("⚙️ [CONFIG] {:?}", settings);

    let provider = Arc::new(FixedKeyProvider::new(args.owner.clone(), true));
    let globals = match args.wallet.to_lowercase().as_str() {
        "backpack" => GlobalsSnapshot {
            backpack_solana: Some(InjectedProvider::backpack(provider)),
            ..Default::default()
        },
        "phantom" => GlobalsSnapshot {
            solana: Some(InjectedProvider::phantom(provider)),
            ..Default::default()
        },
        other => return Err(anyhow!("unknown wallet `{other}` (phantom, backpack)")),
    };

    let transport = HttpTransport::new(settings.rpc_url.clone(), settings.rpc_timeout())?;
    let wallet_message = Arc::new(MemoryText::new());
    let result = Arc::new(MemoryText::new());
    let check_button: Arc<dyn TriggerControl> = Arc::new(MemoryControl::new("Check holder"));
    let surfaces = PageSurfaces {
        connect_trigger: Arc::new(MemoryControl::new("Connect Wallet")),
        wallet_message: Some(wallet_message.clone() as Arc<dyn MessageArea>),
        check_trigger: Some(check_button),
        holder_result: result.clone(),
        copy_controls: vec![CopyControl::new(
            Arc::new(MemoryControl::new("Copy")),
            Some(args.owner.clone()),
        )],
    };

    let page = Page::mount(
        &settings,
        Arc::new(globals),
        Arc::new(transport),
        Arc::new(StdoutClipboard),
        surfaces,
    )
    .await;
    if page.wallet().is_none() {
        return Err(anyhow!("wallet did not connect"));
    }
    println!("🔌 {}", wallet_message.text());

    if args.copy {
        page.connector.handle_copy_click(0).await?;
    }

    let outcome = page.checker.run_check().await;
    println!("{}", result.text());

    match outcome {
        CheckOutcome::Completed { reports, .. } if reports.iter().any(|r| r.outcome.found) => {
            Ok(())
        }
        CheckOutcome::Completed { .. } => {
            println!("\nNo holdings found.");
            Ok(())
        }
        other => Err(anyhow!("check did not complete: {:?}", other)),
    }
}
