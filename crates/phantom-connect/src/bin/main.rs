//! Headless shell: drives the views with an in-process wallet and prints
//! each screen to stdout.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use chain_sol::Keypair;
use clap::{Parser, Subcommand};
use phantom_connect::logging::init_logging;
use phantom_connect::{
    AccountTransferView, Action, AirdropStatus, AppConfig, Injected, LocalWallet, Screen,
    StaticResolver, ViewError, WalletConnectorView,
};
use sol_rpc::{Cluster, RpcClient};
use zeroize::Zeroizing;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// devnet, testnet, mainnet-beta, localnet or an RPC URL
    #[arg(long, global = true)]
    cluster: Option<Cluster>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect and disconnect a local wallet through the connector view
    Connect {
        /// Decline the connection prompt
        #[arg(long, default_value_t = false)]
        reject: bool,
    },
    /// Create a funded account and transfer to the wallet
    Transfer {
        /// Wallet key pair as a JSON array of 64 bytes; generated if omitted
        #[arg(long)]
        wallet_keypair: Option<PathBuf>,
    },
    /// Write a new wallet key pair file
    Keygen {
        #[arg(long)]
        out: PathBuf,
    },
}

struct Shell {
    surface_errors: bool,
}

impl Shell {
    fn show(&self, screen: Screen) {
        print!("{screen}");
        println!();
    }

    fn show_result<T>(&self, screen: Screen, result: Result<T, ViewError>) {
        match result {
            Err(err) if self.surface_errors => self.show(screen.with_notice(err)),
            _ => self.show(screen),
        }
    }
}

// Secret bytes and their JSON text are wiped on drop.
fn read_keypair(path: &Path) -> Result<Keypair> {
    let text = Zeroizing::new(
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?,
    );
    let bytes: Zeroizing<Vec<u8>> = Zeroizing::new(
        serde_json::from_str(&text).context("key pair file must be a JSON byte array")?,
    );
    Ok(Keypair::from_bytes(&bytes)?)
}

fn write_keypair(path: &Path, keypair: &Keypair) -> Result<()> {
    let bytes = Zeroizing::new(keypair.to_bytes());
    let json = Zeroizing::new(serde_json::to_string(&bytes[..])?);
    fs::write(path, json.as_bytes()).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

async fn run_connect(shell: &Shell, reject: bool) {
    let wallet = Rc::new(LocalWallet::generate());
    wallet.reject_connections(reject);
    let mut view = WalletConnectorView::new(StaticResolver::new(Injected::phantom(wallet)));

    view.mount();
    shell.show(view.render());

    let result = view.dispatch(Action::Connect).await;
    shell.show_result(view.render(), result);

    if view.wallet_key().is_some() {
        let result = view.dispatch(Action::Disconnect).await;
        shell.show_result(view.render(), result);
    }
}

async fn run_transfer(shell: &Shell, config: &AppConfig, wallet_keypair: Option<&Path>) -> Result<()> {
    let keypair = match wallet_keypair {
        Some(path) => read_keypair(path)?,
        None => Keypair::generate(),
    };
    let wallet = Rc::new(LocalWallet::new(keypair));
    let client = RpcClient::new(config.cluster.clone(), config.rpc_config())?;
    let mut view = AccountTransferView::new(
        StaticResolver::new(Injected::phantom(wallet)),
        client,
        config.amounts(),
    );
    shell.show(view.render());

    match view.create_account().await {
        AirdropStatus::Requested(signature) => {
            let result = view.confirm_airdrop(&signature).await;
            shell.show_result(view.render(), result);
        }
        AirdropStatus::Failed(reason) if shell.surface_errors => {
            shell.show(view.render().with_notice(format!("airdrop failed: {reason}")));
        }
        AirdropStatus::Failed(_) => shell.show(view.render()),
    }

    let result = view.dispatch(Action::Connect).await;
    shell.show_result(view.render(), result);

    let result = view.dispatch(Action::Transfer).await;
    shell.show_result(view.render(), result);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(cluster) = cli.cluster {
        config.cluster = cluster;
    }
    tracing::debug!(cluster = %config.cluster, "configuration loaded");

    let shell = Shell {
        surface_errors: config.surface_errors,
    };
    match cli.command {
        Command::Connect { reject } => run_connect(&shell, reject).await,
        Command::Transfer { wallet_keypair } => {
            run_transfer(&shell, &config, wallet_keypair.as_deref()).await?
        }
        Command::Keygen { out } => {
            let keypair = Keypair::generate();
            write_keypair(&out, &keypair)?;
            println!("{}", keypair.pubkey());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn keypair_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wallet.json");
        let keypair = Keypair::from_seed(&[0x31; 32]);

        write_keypair(&path, &keypair).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with('[') && text.ends_with(']'));
        assert_eq!(text.split(',').count(), 64);

        let loaded = read_keypair(&path).unwrap();
        assert_eq!(loaded.pubkey(), keypair.pubkey());
    }

    #[test]
    fn malformed_keypair_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wallet.json");

        fs::write(&path, "not json").unwrap();
        let err = read_keypair(&path).unwrap_err();
        assert!(err.to_string().contains("JSON byte array"));

        fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(read_keypair(&path).is_err());

        assert!(read_keypair(&dir.path().join("missing.json")).is_err());
    }
}
