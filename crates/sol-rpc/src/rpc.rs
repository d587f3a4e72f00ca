//! JSON-RPC 2.0 client for a Solana cluster.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use chain_sol::{Pubkey, Signature, SignedTransaction};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::client::{BlockchainClient, Commitment, ConfirmationPolicy, SignatureStatus};
use crate::cluster::Cluster;
use crate::error::RpcError;

/// Transport and confirmation settings.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    pub http_timeout: Duration,
    pub confirmation: ConfirmationPolicy,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(30),
            confirmation: ConfirmationPolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

/// Responses that wrap their payload in `{ context, value }`.
#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockhashValue {
    blockhash: String,
}

/// Decode a JSON-RPC envelope into its `result`.
pub fn parse_response<T: DeserializeOwned>(body: Value) -> Result<T, RpcError> {
    let response: RpcResponse<T> = serde_json::from_value(body)
        .map_err(|e| RpcError::InvalidResponse(e.to_string()))?;
    if let Some(err) = response.error {
        return Err(RpcError::Rpc {
            code: err.code,
            message: err.message,
        });
    }
    response
        .result
        .ok_or_else(|| RpcError::InvalidResponse("response has neither result nor error".into()))
}

fn parse_signature(value: &str) -> Result<Signature, RpcError> {
    value.parse::<Signature>().map_err(RpcError::from)
}

fn parse_blockhash(value: &str) -> Result<[u8; 32], RpcError> {
    let bytes = bs58::decode(value)
        .into_vec()
        .map_err(|e| RpcError::InvalidResponse(format!("blockhash is not base58: {e}")))?;
    bytes
        .try_into()
        .map_err(|v: Vec<u8>| RpcError::InvalidResponse(format!("blockhash has {} bytes", v.len())))
}

/// One JSON-RPC method call, before an id is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    pub method: &'static str,
    pub params: Value,
}

impl RpcRequest {
    /// The full JSON-RPC 2.0 request object.
    pub fn body(&self, id: u64) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": self.method,
            "params": self.params,
        })
    }

    pub fn request_airdrop(to: &Pubkey, lamports: u64, commitment: Commitment) -> Self {
        Self {
            method: "requestAirdrop",
            params: json!([to.to_string(), lamports, { "commitment": commitment.as_str() }]),
        }
    }

    pub fn latest_blockhash(commitment: Commitment) -> Self {
        Self {
            method: "getLatestBlockhash",
            params: json!([{ "commitment": commitment.as_str() }]),
        }
    }

    /// Wire bytes go out base64-encoded; preflight runs at `commitment`.
    pub fn send_transaction(tx: &SignedTransaction, commitment: Commitment) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&tx.wire);
        Self {
            method: "sendTransaction",
            params: json!([encoded, {
                "encoding": "base64",
                "preflightCommitment": commitment.as_str(),
            }]),
        }
    }

    pub fn signature_statuses(signature: &Signature) -> Self {
        Self {
            method: "getSignatureStatuses",
            params: json!([[signature.to_string()]]),
        }
    }

    pub fn balance(account: &Pubkey, commitment: Commitment) -> Self {
        Self {
            method: "getBalance",
            params: json!([account.to_string(), { "commitment": commitment.as_str() }]),
        }
    }
}

/// HTTP JSON-RPC client bound to one cluster.
#[derive(Debug)]
pub struct RpcClient {
    cluster: Cluster,
    http: reqwest::Client,
    config: RpcConfig,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(cluster: Cluster, config: RpcConfig) -> Result<Self, RpcError> {
        let builder = reqwest::Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(config.http_timeout);
        let http = builder.build()?;

        tracing::info!(cluster = %cluster, url = cluster.rpc_url(), "rpc client initialized");

        Ok(Self {
            cluster,
            http,
            config,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    async fn call<T: DeserializeOwned>(&self, request: RpcRequest) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let method = request.method;

        tracing::debug!(method, id, "rpc request");
        let body: Value = self
            .http
            .post(self.cluster.rpc_url())
            .json(&request.body(id))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_response(body).inspect_err(|e| tracing::debug!(method, id, error = %e, "rpc call failed"))
    }

    fn commitment(&self) -> Commitment {
        self.config.confirmation.commitment
    }
}

#[async_trait(?Send)]
impl BlockchainClient for RpcClient {
    async fn request_airdrop(&self, to: &Pubkey, lamports: u64) -> Result<Signature, RpcError> {
        if !self.cluster.supports_airdrop() {
            return Err(RpcError::AirdropUnsupported(self.cluster.to_string()));
        }
        let signature: String = self
            .call(RpcRequest::request_airdrop(to, lamports, self.commitment()))
            .await?;
        parse_signature(&signature)
    }

    async fn latest_blockhash(&self) -> Result<[u8; 32], RpcError> {
        let response: WithContext<BlockhashValue> = self
            .call(RpcRequest::latest_blockhash(self.commitment()))
            .await?;
        parse_blockhash(&response.value.blockhash)
    }

    async fn send_transaction(&self, tx: &SignedTransaction) -> Result<Signature, RpcError> {
        let signature: String = self
            .call(RpcRequest::send_transaction(tx, self.commitment()))
            .await?;
        let signature = parse_signature(&signature)?;
        if signature != tx.signature {
            tracing::warn!(expected = %tx.signature, returned = %signature, "cluster returned a different signature");
        }
        Ok(signature)
    }

    async fn signature_status(&self, signature: &Signature) -> Result<Option<SignatureStatus>, RpcError> {
        let response: WithContext<Vec<Option<SignatureStatus>>> = self
            .call(RpcRequest::signature_statuses(signature))
            .await?;
        Ok(response.value.into_iter().next().flatten())
    }

    async fn balance(&self, account: &Pubkey) -> Result<u64, RpcError> {
        let response: WithContext<u64> = self
            .call(RpcRequest::balance(account, self.commitment()))
            .await?;
        Ok(response.value)
    }

    fn confirmation_policy(&self) -> ConfirmationPolicy {
        self.config.confirmation
    }
}
