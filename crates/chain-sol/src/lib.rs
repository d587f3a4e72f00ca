//! Solana primitives for the wallet front end.
//!
//! Public keys, Ed25519 key pairs, the System Program transfer instruction
//! and the legacy transaction wire format, implemented by hand on top of
//! `ed25519-dalek` and `bs58` instead of pulling in `solana-sdk`.

pub mod address;
pub mod error;
pub mod keypair;
pub mod transaction;

pub use address::{address_to_bytes, bytes_to_address, Pubkey};
pub use error::SolError;
pub use keypair::{Keypair, Signature};
pub use transaction::{
    build_sol_transfer, compile_transaction, decode_compact_u16, deserialize_transaction,
    encode_compact_u16, lamports_to_sol, serialize_message, sign_raw_transaction, sign_transaction,
    sol_to_lamports, system_transfer, CompiledInstruction, SignedTransaction, SolAccountMeta,
    SolInstruction, SolTransaction, TransferDetails, LAMPORTS_PER_SOL,
};
