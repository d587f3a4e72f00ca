//! The injected wallet provider and how views obtain one.
//!
//! A browser wallet extension injects an object into the page; the views
//! never inspect the environment themselves. They ask a [`ProviderResolver`],
//! which hands back a [`WalletProvider`] only when the injected object
//! carries the Phantom marker.

use std::fmt;
use std::rc::Rc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Options for [`WalletProvider::connect`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectOpts {
    /// Connect silently, failing unless the site was approved before.
    pub only_if_trusted: bool,
}

/// What a successful connect yields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResponse {
    /// Base58 string form of the connected account's public key.
    pub public_key: String,
}

/// Events a provider emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderEvent {
    Connect,
    Disconnect,
    AccountChanged,
}

impl ProviderEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderEvent::Connect => "connect",
            ProviderEvent::Disconnect => "disconnect",
            ProviderEvent::AccountChanged => "accountChanged",
        }
    }
}

/// Methods accepted by [`WalletProvider::request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestMethod {
    Connect,
    Disconnect,
    SignTransaction,
    SignAllTransactions,
    SignMessage,
}

impl RequestMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMethod::Connect => "connect",
            RequestMethod::Disconnect => "disconnect",
            RequestMethod::SignTransaction => "signTransaction",
            RequestMethod::SignAllTransactions => "signAllTransactions",
            RequestMethod::SignMessage => "signMessage",
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type EventHandler = Rc<dyn Fn(&Value)>;

/// Provider failures, keyed by the wallet's numeric error codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("user rejected the request")]
    UserRejected,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("provider is disconnected")]
    Disconnected,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("method not supported: {0}")]
    MethodNotFound(String),

    #[error("internal provider error: {0}")]
    Internal(String),

    #[error("provider error {code}: {message}")]
    Other { code: i64, message: String },
}

impl ProviderError {
    pub fn from_code(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            4001 => ProviderError::UserRejected,
            4100 => ProviderError::Unauthorized(message),
            4900 => ProviderError::Disconnected,
            -32000 => ProviderError::InvalidInput(message),
            -32601 => ProviderError::MethodNotFound(message),
            -32603 => ProviderError::Internal(message),
            _ => ProviderError::Other { code, message },
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            ProviderError::UserRejected => 4001,
            ProviderError::Unauthorized(_) => 4100,
            ProviderError::Disconnected => 4900,
            ProviderError::InvalidInput(_) => -32000,
            ProviderError::MethodNotFound(_) => -32601,
            ProviderError::Internal(_) => -32603,
            ProviderError::Other { code, .. } => *code,
        }
    }
}

/// The wallet an extension injects into the page.
#[async_trait(?Send)]
pub trait WalletProvider {
    /// Connected account, base58.
    fn public_key(&self) -> Option<String>;

    fn is_connected(&self) -> bool;

    async fn connect(&self, opts: ConnectOpts) -> Result<ConnectResponse, ProviderError>;

    async fn disconnect(&self) -> Result<(), ProviderError>;

    fn on(&self, event: ProviderEvent, handler: EventHandler);

    async fn request(&self, method: RequestMethod, params: Value) -> Result<Value, ProviderError>;
}

/// An object found in the environment, with or without the Phantom marker.
#[derive(Clone)]
pub struct Injected {
    pub is_phantom: bool,
    pub provider: Rc<dyn WalletProvider>,
}

impl Injected {
    pub fn phantom(provider: Rc<dyn WalletProvider>) -> Self {
        Self {
            is_phantom: true,
            provider,
        }
    }

    pub fn foreign(provider: Rc<dyn WalletProvider>) -> Self {
        Self {
            is_phantom: false,
            provider,
        }
    }
}

/// Supplies the provider to a view at mount or click time.
pub trait ProviderResolver {
    fn resolve(&self) -> Option<Rc<dyn WalletProvider>>;
}

impl<T: ProviderResolver + ?Sized> ProviderResolver for Rc<T> {
    fn resolve(&self) -> Option<Rc<dyn WalletProvider>> {
        (**self).resolve()
    }
}

/// Resolver over a fixed injection, for headless shells and tests.
#[derive(Clone, Default)]
pub struct StaticResolver {
    injected: Option<Injected>,
}

impl StaticResolver {
    pub fn new(injected: Injected) -> Self {
        Self {
            injected: Some(injected),
        }
    }

    /// Nothing injected: the extension is not installed.
    pub fn empty() -> Self {
        Self::default()
    }
}

impl ProviderResolver for StaticResolver {
    fn resolve(&self) -> Option<Rc<dyn WalletProvider>> {
        let injected = self.injected.as_ref()?;
        if !injected.is_phantom {
            tracing::debug!("ignoring injected provider without the Phantom marker");
            return None;
        }
        Some(Rc::clone(&injected.provider))
    }
}

/// Connect with no forced silent mode and return the account string.
pub(crate) async fn request_connection(provider: &dyn WalletProvider) -> Result<String, ProviderError> {
    let response = provider.connect(ConnectOpts::default()).await?;
    tracing::info!(account = %response.public_key, "wallet account connected");
    Ok(response.public_key)
}
