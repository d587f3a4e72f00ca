use chain_sol::SolError;
use thiserror::Error;

/// Blockchain client errors.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("transaction {signature} failed: {reason}")]
    TransactionFailed { signature: String, reason: String },

    #[error("transaction {signature} not confirmed after {polls} polls")]
    ConfirmationTimeout { signature: String, polls: u32 },

    #[error("airdrops are not available on {0}")]
    AirdropUnsupported(String),

    #[error(transparent)]
    Chain(#[from] SolError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_rpc_error() {
        let err = RpcError::Rpc {
            code: -32602,
            message: "Invalid params".into(),
        };
        assert_eq!(err.to_string(), "rpc error -32602: Invalid params");
    }

    #[test]
    fn display_timeout() {
        let err = RpcError::ConfirmationTimeout {
            signature: "5xyz".into(),
            polls: 60,
        };
        assert_eq!(err.to_string(), "transaction 5xyz not confirmed after 60 polls");
    }

    #[test]
    fn chain_errors_are_transparent() {
        let err: RpcError = SolError::InvalidAddress("bad".into()).into();
        assert_eq!(err.to_string(), "invalid address: bad");
    }
}
