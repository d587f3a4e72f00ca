//! Phantom wallet front end.
//!
//! Two views over an injected Solana wallet provider:
//!
//! - [`WalletConnectorView`] detects the extension, connects and disconnects.
//! - [`AccountTransferView`] generates a throwaway account, funds it from the
//!   faucet and transfers a fixed amount to the connected wallet.
//!
//! Views are plain state machines that render to a [`Screen`]. The browser
//! build (`wasm` feature) binds them to `window.solana`; the native build
//! drives them from the command line with a [`LocalWallet`].

pub mod config;
pub mod connector;
pub mod error;
pub mod local_wallet;
pub mod logging;
pub mod provider;
pub mod render;
pub mod transfer;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use config::{AppConfig, ConfigError};
pub use connector::{SharedConnectorView, WalletConnectorView, CONNECTOR_HEADING};
pub use error::{Prerequisite, ViewError};
pub use local_wallet::LocalWallet;
pub use provider::{
    ConnectOpts, ConnectResponse, EventHandler, Injected, ProviderError, ProviderEvent,
    ProviderResolver, RequestMethod, StaticResolver, WalletProvider,
};
pub use render::{Action, Element, Screen, PHANTOM_INSTALL_URL};
pub use transfer::{AccountTransferView, AirdropStatus, TransferAmounts, TRANSFER_HEADING};
