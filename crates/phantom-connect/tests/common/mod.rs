//! Scripted fakes shared by the view integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use chain_sol::{
    deserialize_transaction, Keypair, Pubkey, Signature, SignedTransaction, SolInstruction,
};
use phantom_connect::{
    ConnectOpts, ConnectResponse, EventHandler, ProviderError, ProviderEvent, ProviderResolver,
    RequestMethod, StaticResolver, WalletProvider,
};
use serde_json::Value;
use sol_rpc::{BlockchainClient, Commitment, ConfirmationPolicy, RpcError, SignatureStatus};

// ─── Provider ──────────────────────────────────────────────────────

/// Provider whose connect and disconnect outcomes are fixed up front.
pub struct MockProvider {
    connect_result: Result<String, ProviderError>,
    disconnect_result: Result<(), ProviderError>,
    key: RefCell<Option<String>>,
    pub connect_calls: Cell<u32>,
    pub disconnect_calls: Cell<u32>,
    pub last_opts: Cell<Option<ConnectOpts>>,
    // Runs while connect/disconnect is pending, like a page re-render.
    on_prompt: RefCell<Option<Box<dyn Fn()>>>,
}

impl MockProvider {
    /// Connect resolves to `{ publicKey: key }`.
    pub fn resolving(key: &str) -> Self {
        Self::with_connect(Ok(key.to_string()))
    }

    /// Connect fails as if the user closed the prompt.
    pub fn rejecting() -> Self {
        Self::with_connect(Err(ProviderError::UserRejected))
    }

    fn with_connect(connect_result: Result<String, ProviderError>) -> Self {
        Self {
            connect_result,
            disconnect_result: Ok(()),
            key: RefCell::new(None),
            connect_calls: Cell::new(0),
            disconnect_calls: Cell::new(0),
            last_opts: Cell::new(None),
            on_prompt: RefCell::new(None),
        }
    }

    pub fn set_on_prompt(&self, hook: impl Fn() + 'static) {
        self.on_prompt.replace(Some(Box::new(hook)));
    }

    fn prompt(&self) {
        if let Some(hook) = self.on_prompt.borrow().as_ref() {
            hook();
        }
    }

    pub fn failing_disconnect(mut self) -> Self {
        self.disconnect_result = Err(ProviderError::Disconnected);
        self
    }
}

#[async_trait(?Send)]
impl WalletProvider for MockProvider {
    fn public_key(&self) -> Option<String> {
        self.key.borrow().clone()
    }

    fn is_connected(&self) -> bool {
        self.key.borrow().is_some()
    }

    async fn connect(&self, opts: ConnectOpts) -> Result<ConnectResponse, ProviderError> {
        self.connect_calls.set(self.connect_calls.get() + 1);
        self.last_opts.set(Some(opts));
        self.prompt();
        let public_key = self.connect_result.clone()?;
        self.key.replace(Some(public_key.clone()));
        Ok(ConnectResponse { public_key })
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        self.disconnect_calls.set(self.disconnect_calls.get() + 1);
        self.prompt();
        self.disconnect_result.clone()?;
        self.key.replace(None);
        Ok(())
    }

    fn on(&self, _event: ProviderEvent, _handler: EventHandler) {}

    async fn request(&self, method: RequestMethod, _params: Value) -> Result<Value, ProviderError> {
        Err(ProviderError::MethodNotFound(method.to_string()))
    }
}

/// Counts how often a view asks for the provider.
pub struct CountingResolver {
    inner: StaticResolver,
    pub calls: Cell<u32>,
}

impl CountingResolver {
    pub fn new(inner: StaticResolver) -> Self {
        Self {
            inner,
            calls: Cell::new(0),
        }
    }
}

impl ProviderResolver for CountingResolver {
    fn resolve(&self) -> Option<Rc<dyn WalletProvider>> {
        self.calls.set(self.calls.get() + 1);
        self.inner.resolve()
    }
}

// ─── Blockchain client ─────────────────────────────────────────────

/// One transaction handed to `send_transaction`, decoded from its wire bytes.
#[derive(Debug, Clone)]
pub struct Submission {
    pub instructions: Vec<SolInstruction>,
    pub fee_payer: Pubkey,
}

/// In-memory cluster: records every request, confirms everything at once.
#[derive(Default)]
pub struct FakeClient {
    pub airdrops: RefCell<Vec<(Pubkey, u64)>>,
    pub submissions: RefCell<Vec<Submission>>,
    pub sent: RefCell<Vec<SignedTransaction>>,
    airdrop_fails: Cell<bool>,
    send_fails: Cell<bool>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_airdrops(self) -> Self {
        self.airdrop_fails.set(true);
        self
    }

    pub fn failing_sends(self) -> Self {
        self.send_fails.set(true);
        self
    }
}

#[async_trait(?Send)]
impl BlockchainClient for FakeClient {
    async fn request_airdrop(&self, to: &Pubkey, lamports: u64) -> Result<Signature, RpcError> {
        if self.airdrop_fails.get() {
            return Err(RpcError::AirdropUnsupported("mainnet-beta".into()));
        }
        self.airdrops.borrow_mut().push((*to, lamports));
        Ok(Signature::new([0xA1; 64]))
    }

    async fn latest_blockhash(&self) -> Result<[u8; 32], RpcError> {
        Ok([7u8; 32])
    }

    async fn send_transaction(&self, tx: &SignedTransaction) -> Result<Signature, RpcError> {
        let (_, message) = deserialize_transaction(&tx.wire)?;
        self.submissions.borrow_mut().push(Submission {
            instructions: message.instructions()?,
            fee_payer: message.fee_payer().expect("decoded message has a fee payer"),
        });
        if self.send_fails.get() {
            return Err(RpcError::Rpc {
                code: -32002,
                message: "Transaction simulation failed".into(),
            });
        }
        self.sent.borrow_mut().push(tx.clone());
        Ok(tx.signature)
    }

    async fn signature_status(&self, _signature: &Signature) -> Result<Option<SignatureStatus>, RpcError> {
        Ok(Some(SignatureStatus {
            slot: 1,
            confirmations: Some(1),
            confirmation_status: Some(Commitment::Confirmed),
            err: None,
        }))
    }

    async fn balance(&self, _account: &Pubkey) -> Result<u64, RpcError> {
        Ok(0)
    }

    fn confirmation_policy(&self) -> ConfirmationPolicy {
        ConfirmationPolicy {
            commitment: Commitment::Confirmed,
            poll_interval: Duration::from_millis(1),
            max_polls: 2,
        }
    }
}

/// A valid base58 address that a mock wallet can hand back.
pub fn wallet_address() -> String {
    Keypair::from_seed(&[0x5E; 32]).pubkey().to_string()
}
