//! An in-process wallet with the same surface as the browser extension.
//!
//! Holds a key pair in memory and answers `connect`, `disconnect` and the
//! signing requests itself. Used by the headless shell, where there is no
//! page for an extension to inject into.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use chain_sol::{sign_raw_transaction, Keypair};
use serde_json::{json, Value};

use crate::provider::{
    ConnectOpts, ConnectResponse, EventHandler, ProviderError, ProviderEvent, RequestMethod,
    WalletProvider,
};

pub struct LocalWallet {
    keypair: Keypair,
    connected: Cell<bool>,
    // Set by the first approved connect; gates `only_if_trusted`.
    trusted: Cell<bool>,
    rejects_connect: Cell<bool>,
    handlers: RefCell<Vec<(ProviderEvent, EventHandler)>>,
}

impl LocalWallet {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair,
            connected: Cell::new(false),
            trusted: Cell::new(false),
            rejects_connect: Cell::new(false),
            handlers: RefCell::new(Vec::new()),
        }
    }

    pub fn generate() -> Self {
        Self::new(Keypair::generate())
    }

    /// Make every subsequent connect fail as if the user clicked "Cancel".
    pub fn reject_connections(&self, reject: bool) {
        self.rejects_connect.set(reject);
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    fn address(&self) -> String {
        self.keypair.pubkey().to_string()
    }

    fn emit(&self, event: ProviderEvent, payload: &Value) {
        // Clone out so handlers may register further handlers.
        let matching: Vec<EventHandler> = self
            .handlers
            .borrow()
            .iter()
            .filter(|(e, _)| *e == event)
            .map(|(_, h)| Rc::clone(h))
            .collect();
        for handler in matching {
            handler(payload);
        }
    }

    fn require_connected(&self) -> Result<(), ProviderError> {
        if self.connected.get() {
            Ok(())
        } else {
            Err(ProviderError::Unauthorized("wallet is not connected".into()))
        }
    }

    fn sign_encoded_transaction(&self, encoded: &Value) -> Result<String, ProviderError> {
        let raw = decode_base58_param(encoded, "transaction")?;
        let signed = sign_raw_transaction(&self.keypair, &raw)
            .map_err(|e| ProviderError::InvalidInput(e.to_string()))?;
        Ok(bs58::encode(signed).into_string())
    }
}

fn decode_base58_param(value: &Value, name: &str) -> Result<Vec<u8>, ProviderError> {
    let text = value
        .as_str()
        .ok_or_else(|| ProviderError::InvalidInput(format!("'{name}' must be a base58 string")))?;
    bs58::decode(text)
        .into_vec()
        .map_err(|e| ProviderError::InvalidInput(format!("'{name}' is not base58: {e}")))
}

#[async_trait(?Send)]
impl WalletProvider for LocalWallet {
    fn public_key(&self) -> Option<String> {
        self.connected.get().then(|| self.address())
    }

    fn is_connected(&self) -> bool {
        self.connected.get()
    }

    async fn connect(&self, opts: ConnectOpts) -> Result<ConnectResponse, ProviderError> {
        if self.rejects_connect.get() || (opts.only_if_trusted && !self.trusted.get()) {
            return Err(ProviderError::UserRejected);
        }
        self.connected.set(true);
        self.trusted.set(true);

        let public_key = self.address();
        self.emit(ProviderEvent::Connect, &json!({ "publicKey": public_key }));
        Ok(ConnectResponse { public_key })
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        let was_connected = self.connected.replace(false);
        if was_connected {
            self.emit(ProviderEvent::Disconnect, &Value::Null);
        }
        Ok(())
    }

    fn on(&self, event: ProviderEvent, handler: EventHandler) {
        self.handlers.borrow_mut().push((event, handler));
    }

    async fn request(&self, method: RequestMethod, params: Value) -> Result<Value, ProviderError> {
        match method {
            RequestMethod::Connect => {
                let opts = ConnectOpts {
                    only_if_trusted: params["onlyIfTrusted"].as_bool().unwrap_or(false),
                };
                let response = self.connect(opts).await?;
                Ok(json!({ "publicKey": response.public_key }))
            }
            RequestMethod::Disconnect => {
                self.disconnect().await?;
                Ok(Value::Null)
            }
            RequestMethod::SignMessage => {
                self.require_connected()?;
                let message = decode_base58_param(&params["message"], "message")?;
                let signature = self.keypair.sign_message(&message);
                Ok(json!({
                    "signature": signature.to_string(),
                    "publicKey": self.address(),
                }))
            }
            RequestMethod::SignTransaction => {
                self.require_connected()?;
                let signed = self.sign_encoded_transaction(&params["transaction"])?;
                Ok(json!({ "transaction": signed }))
            }
            RequestMethod::SignAllTransactions => {
                self.require_connected()?;
                let transactions = params["transactions"].as_array().ok_or_else(|| {
                    ProviderError::InvalidInput("'transactions' must be an array".into())
                })?;
                let signed = transactions
                    .iter()
                    .map(|tx| self.sign_encoded_transaction(tx))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(json!({ "transactions": signed }))
            }
        }
    }
}
