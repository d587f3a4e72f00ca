//! The blockchain client seam used by the views.

use std::time::Duration;

use async_trait::async_trait;
use chain_sol::{compile_transaction, sign_transaction, Keypair, Pubkey, Signature, SignedTransaction, SolInstruction};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RpcError;

/// How far along the network a transaction must be before it counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }
}

/// One entry of a `getSignatureStatuses` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    pub slot: u64,
    pub confirmations: Option<u64>,
    pub confirmation_status: Option<Commitment>,
    pub err: Option<Value>,
}

impl SignatureStatus {
    pub fn satisfies(&self, commitment: Commitment) -> bool {
        self.confirmation_status.is_some_and(|status| status >= commitment)
    }
}

/// Polling parameters for [`BlockchainClient::confirm_transaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub commitment: Commitment,
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            commitment: Commitment::Confirmed,
            poll_interval: Duration::from_millis(500),
            max_polls: 60,
        }
    }
}

/// Network operations the front end delegates to the cluster.
///
/// Futures are not `Send`: every call runs on the UI's single event loop.
#[async_trait(?Send)]
pub trait BlockchainClient {
    /// Ask the faucet to credit `to`; returns the airdrop transaction id.
    async fn request_airdrop(&self, to: &Pubkey, lamports: u64) -> Result<Signature, RpcError>;

    async fn latest_blockhash(&self) -> Result<[u8; 32], RpcError>;

    async fn send_transaction(&self, tx: &SignedTransaction) -> Result<Signature, RpcError>;

    /// `None` while the cluster has not seen the signature yet.
    async fn signature_status(&self, signature: &Signature) -> Result<Option<SignatureStatus>, RpcError>;

    async fn balance(&self, account: &Pubkey) -> Result<u64, RpcError>;

    fn confirmation_policy(&self) -> ConfirmationPolicy {
        ConfirmationPolicy::default()
    }

    /// Poll until the signature reaches the policy's commitment.
    async fn confirm_transaction(&self, signature: &Signature) -> Result<SignatureStatus, RpcError> {
        let policy = self.confirmation_policy();
        for poll in 0..policy.max_polls {
            if let Some(status) = self.signature_status(signature).await? {
                if let Some(err) = &status.err {
                    return Err(RpcError::TransactionFailed {
                        signature: signature.to_string(),
                        reason: err.to_string(),
                    });
                }
                if status.satisfies(policy.commitment) {
                    tracing::debug!(%signature, slot = status.slot, poll, "transaction confirmed");
                    return Ok(status);
                }
            }
            tokio::time::sleep(policy.poll_interval).await;
        }
        Err(RpcError::ConfirmationTimeout {
            signature: signature.to_string(),
            polls: policy.max_polls,
        })
    }

    /// Compile `instructions` with `signer` as fee payer, sign, submit and
    /// wait for confirmation.
    async fn send_and_confirm(
        &self,
        instructions: &[SolInstruction],
        signer: &Keypair,
    ) -> Result<Signature, RpcError> {
        let blockhash = self.latest_blockhash().await?;
        let tx = compile_transaction(instructions, &signer.pubkey(), &blockhash)?;
        let signed = sign_transaction(&tx, signer)?;
        let signature = self.send_transaction(&signed).await?;
        self.confirm_transaction(&signature).await?;
        Ok(signature)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[test]
    fn commitment_ordering() {
        assert!(Commitment::Finalized > Commitment::Confirmed);
        assert!(Commitment::Confirmed > Commitment::Processed);
    }

    #[test]
    fn status_deserializes_from_rpc_shape() {
        let status: SignatureStatus = serde_json::from_value(serde_json::json!({
            "slot": 72,
            "confirmations": 10,
            "err": null,
            "confirmationStatus": "confirmed"
        }))
        .unwrap();
        assert_eq!(status.slot, 72);
        assert!(status.satisfies(Commitment::Processed));
        assert!(status.satisfies(Commitment::Confirmed));
        assert!(!status.satisfies(Commitment::Finalized));
    }

    /// Scripted client: returns queued statuses one poll at a time.
    struct ScriptedStatuses {
        statuses: RefCell<Vec<Option<SignatureStatus>>>,
        sent: RefCell<Vec<SignedTransaction>>,
    }

    impl ScriptedStatuses {
        fn new(mut statuses: Vec<Option<SignatureStatus>>) -> Self {
            statuses.reverse();
            Self {
                statuses: RefCell::new(statuses),
                sent: RefCell::new(Vec::new()),
            }
        }
    }

    fn status(confirmation: Commitment, err: Option<Value>) -> SignatureStatus {
        SignatureStatus {
            slot: 1,
            confirmations: None,
            confirmation_status: Some(confirmation),
            err,
        }
    }

    #[async_trait(?Send)]
    impl BlockchainClient for ScriptedStatuses {
        async fn request_airdrop(&self, _to: &Pubkey, _lamports: u64) -> Result<Signature, RpcError> {
            Ok(Signature::default())
        }

        async fn latest_blockhash(&self) -> Result<[u8; 32], RpcError> {
            Ok([9u8; 32])
        }

        async fn send_transaction(&self, tx: &SignedTransaction) -> Result<Signature, RpcError> {
            self.sent.borrow_mut().push(tx.clone());
            Ok(tx.signature)
        }

        async fn signature_status(&self, _signature: &Signature) -> Result<Option<SignatureStatus>, RpcError> {
            Ok(self.statuses.borrow_mut().pop().flatten())
        }

        async fn balance(&self, _account: &Pubkey) -> Result<u64, RpcError> {
            Ok(0)
        }

        fn confirmation_policy(&self) -> ConfirmationPolicy {
            ConfirmationPolicy {
                poll_interval: Duration::from_millis(1),
                max_polls: 3,
                ..ConfirmationPolicy::default()
            }
        }
    }

    #[tokio::test]
    async fn confirm_waits_for_commitment() {
        let client = ScriptedStatuses::new(vec![
            None,
            Some(status(Commitment::Processed, None)),
            Some(status(Commitment::Confirmed, None)),
        ]);
        let confirmed = client.confirm_transaction(&Signature::default()).await.unwrap();
        assert_eq!(confirmed.confirmation_status, Some(Commitment::Confirmed));
    }

    #[tokio::test]
    async fn confirm_surfaces_on_chain_error() {
        let client = ScriptedStatuses::new(vec![Some(status(
            Commitment::Processed,
            Some(serde_json::json!({"InstructionError": [0, "Custom"]})),
        ))]);
        let err = client.confirm_transaction(&Signature::default()).await.unwrap_err();
        assert!(matches!(err, RpcError::TransactionFailed { .. }));
    }

    #[tokio::test]
    async fn confirm_times_out() {
        let client = ScriptedStatuses::new(vec![None, None, None, None]);
        let err = client.confirm_transaction(&Signature::default()).await.unwrap_err();
        assert!(matches!(err, RpcError::ConfirmationTimeout { polls: 3, .. }));
    }

    #[tokio::test]
    async fn send_and_confirm_signs_with_fee_payer() {
        let signer = Keypair::from_seed(&[5u8; 32]);
        let to = Pubkey::new([6u8; 32]);
        let client = ScriptedStatuses::new(vec![Some(status(Commitment::Finalized, None))]);

        let ix = chain_sol::system_transfer(&signer.pubkey(), &to, 1_000);
        let signature = client.send_and_confirm(&[ix], &signer).await.unwrap();

        let sent = client.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].signature, signature);
        assert!(signer.verify(&sent[0].wire[65..], &signature));
    }
}
