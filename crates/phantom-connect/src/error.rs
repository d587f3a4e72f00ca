use std::fmt;

use chain_sol::SolError;
use sol_rpc::RpcError;
use thiserror::Error;

use crate::provider::ProviderError;
use crate::render::Action;

/// What a transfer needs before it can be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prerequisite {
    GeneratedAccount,
    ConnectedWallet,
}

impl fmt::Display for Prerequisite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Prerequisite::GeneratedAccount => "generated account",
            Prerequisite::ConnectedWallet => "connected wallet",
        })
    }
}

/// Why a view action did not complete.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("no wallet provider found")]
    ProviderMissing,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("cannot transfer: {0} is missing")]
    MissingPrerequisite(Prerequisite),

    #[error("'{}' is not available on this screen", .0.label())]
    ActionUnavailable(Action),

    #[error("another wallet action is in progress")]
    Busy,

    #[error(transparent)]
    Chain(#[from] SolError),

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl ViewError {
    /// The user dismissed the wallet prompt.
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, ViewError::Provider(ProviderError::UserRejected))
    }
}
