//! Account-transfer view: fund a throwaway account from the faucet and send
//! a fixed amount from it to the connected wallet.

use chain_sol::{lamports_to_sol, system_transfer, Keypair, Pubkey, Signature, LAMPORTS_PER_SOL};
use sol_rpc::BlockchainClient;

use crate::error::{Prerequisite, ViewError};
use crate::provider::{request_connection, ProviderResolver};
use crate::render::{Action, Screen};

pub const TRANSFER_HEADING: &str = "Create and Transfer";

/// Lamport amounts the view works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferAmounts {
    pub airdrop_lamports: u64,
    pub transfer_lamports: u64,
}

impl Default for TransferAmounts {
    fn default() -> Self {
        Self {
            airdrop_lamports: 2 * LAMPORTS_PER_SOL,
            transfer_lamports: LAMPORTS_PER_SOL / 10,
        }
    }
}

/// Outcome of the faucet request made by [`AccountTransferView::create_account`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AirdropStatus {
    Requested(Signature),
    Failed(String),
}

pub struct AccountTransferView<R, C> {
    resolver: R,
    client: C,
    amounts: TransferAmounts,
    account: Option<Keypair>,
    wallet_key: Option<String>,
    last_signature: Option<Signature>,
}

impl<R: ProviderResolver, C: BlockchainClient> AccountTransferView<R, C> {
    pub fn new(resolver: R, client: C, amounts: TransferAmounts) -> Self {
        Self {
            resolver,
            client,
            amounts,
            account: None,
            wallet_key: None,
            last_signature: None,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn amounts(&self) -> TransferAmounts {
        self.amounts
    }

    pub fn account(&self) -> Option<Pubkey> {
        self.account.as_ref().map(Keypair::pubkey)
    }

    pub fn wallet_key(&self) -> Option<&str> {
        self.wallet_key.as_deref()
    }

    pub fn last_signature(&self) -> Option<&Signature> {
        self.last_signature.as_ref()
    }

    /// Generate a fresh account and ask the faucet to fund it.
    ///
    /// The account is kept even when the airdrop request fails; confirmation
    /// is not awaited (see [`Self::confirm_airdrop`]).
    pub async fn create_account(&mut self) -> AirdropStatus {
        let keypair = Keypair::generate();
        let pubkey = keypair.pubkey();
        self.account = Some(keypair);

        match self
            .client
            .request_airdrop(&pubkey, self.amounts.airdrop_lamports)
            .await
        {
            Ok(signature) => {
                tracing::info!(account = %pubkey, %signature, sol = lamports_to_sol(self.amounts.airdrop_lamports), "airdrop requested");
                AirdropStatus::Requested(signature)
            }
            Err(err) => {
                tracing::warn!(account = %pubkey, error = %err, "airdrop request failed");
                AirdropStatus::Failed(err.to_string())
            }
        }
    }

    /// Wait for a faucet transaction to land.
    pub async fn confirm_airdrop(&self, signature: &Signature) -> Result<(), ViewError> {
        self.client.confirm_transaction(signature).await?;
        Ok(())
    }

    /// Connect the wallet and remember its address. Resolved per click.
    pub async fn connect_wallet(&mut self) -> Result<String, ViewError> {
        let provider = self.resolver.resolve().ok_or(ViewError::ProviderMissing)?;
        match request_connection(provider.as_ref()).await {
            Ok(key) => {
                self.wallet_key = Some(key.clone());
                Ok(key)
            }
            Err(err) => {
                tracing::debug!(error = %err, "connect request did not complete");
                Err(err.into())
            }
        }
    }

    /// Send the configured amount from the generated account to the wallet.
    ///
    /// Without either prerequisite nothing is built and no state changes.
    pub async fn transfer(&mut self) -> Result<Signature, ViewError> {
        let Some(account) = self.account.as_ref() else {
            tracing::error!("transfer needs a generated account");
            return Err(ViewError::MissingPrerequisite(Prerequisite::GeneratedAccount));
        };
        let Some(wallet_key) = self.wallet_key.as_deref() else {
            tracing::error!("transfer needs a connected wallet");
            return Err(ViewError::MissingPrerequisite(Prerequisite::ConnectedWallet));
        };

        let destination: Pubkey = wallet_key.parse()?;
        if !destination.is_on_curve() {
            tracing::warn!(to = %destination, "wallet address is off the ed25519 curve; no key can sign for it");
        }
        let instruction = system_transfer(&account.pubkey(), &destination, self.amounts.transfer_lamports);

        let signature = self.client.send_and_confirm(&[instruction], account).await?;
        tracing::info!(%signature, to = %destination, sol = lamports_to_sol(self.amounts.transfer_lamports), "transfer confirmed");
        self.last_signature = Some(signature);
        Ok(signature)
    }

    /// Route a button click.
    pub async fn dispatch(&mut self, action: Action) -> Result<(), ViewError> {
        if !self.render().has_button(action) {
            return Err(ViewError::ActionUnavailable(action));
        }
        match action {
            // A failed airdrop still leaves a usable account; the status is logged.
            Action::CreateAccount => {
                self.create_account().await;
                Ok(())
            }
            Action::Connect => self.connect_wallet().await.map(|_| ()),
            Action::Transfer => self.transfer().await.map(|_| ()),
            Action::Disconnect => Err(ViewError::ActionUnavailable(action)),
        }
    }

    pub fn render(&self) -> Screen {
        let mut screen = Screen::new(TRANSFER_HEADING);
        screen.button(Action::CreateAccount);
        if let Some(account) = self.account() {
            screen.text(format!("Generated account: {account}"));
        }
        match &self.wallet_key {
            Some(key) => screen.text(format!("Connected wallet: {key}")),
            None => screen.button(Action::Connect),
        }
        screen.button(Action::Transfer);
        if let Some(signature) = &self.last_signature {
            screen.text(format!("Last transfer: {signature}"));
        }
        screen
    }
}
