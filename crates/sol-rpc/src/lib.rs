//! Solana cluster access: the [`BlockchainClient`] seam and its JSON-RPC
//! implementation.
//!
//! Transaction construction and signing live in `chain-sol`; this crate only
//! moves signed bytes to the cluster and watches for confirmation.

pub mod client;
pub mod cluster;
pub mod error;
pub mod rpc;

pub use client::{BlockchainClient, Commitment, ConfirmationPolicy, SignatureStatus};
pub use cluster::Cluster;
pub use error::RpcError;
pub use rpc::{parse_response, RpcClient, RpcConfig, RpcRequest};
