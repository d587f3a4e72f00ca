//! Legacy Solana transaction wire format and signing.
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message:
//!     num_required_sigs     u8
//!     num_readonly_signed   u8
//!     num_readonly_unsigned u8
//!     num_accounts          compact-u16
//!     account_keys          32 bytes * num_accounts
//!     recent_blockhash      32 bytes
//!     num_instructions      compact-u16
//!     instructions[]        (see below)
//!
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact-u16
//!   account_indices         u8 * num_accounts
//!   data_len                compact-u16
//!   data                    u8 * data_len
//! ```

use crate::address::Pubkey;
use crate::error::SolError;
use crate::keypair::{Keypair, Signature};

/// Lamports in one SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// System Program `Transfer` instruction index (little-endian u32).
const SYSTEM_TRANSFER_IX_INDEX: u32 = 2;

const SIGNATURE_LEN: usize = 64;

/// Convert a SOL amount to lamports, truncating sub-lamport dust.
pub fn sol_to_lamports(sol: f64) -> u64 {
    (sol * LAMPORTS_PER_SOL as f64) as u64
}

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

// ---------------------------------------------------------------------------
// Compact-u16 encoding
// ---------------------------------------------------------------------------

/// Encode a `u16` value in Solana's compact-u16 format.
///
/// - Values 0..0x7f       -> 1 byte
/// - Values 0x80..0x3fff  -> 2 bytes
/// - Values 0x4000..      -> 3 bytes
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut val = value as u32;
    let mut out = Vec::with_capacity(3);

    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }

    out
}

/// Decode a compact-u16 value, returning `(value, bytes_consumed)`.
pub fn decode_compact_u16(data: &[u8]) -> Result<(u16, usize), SolError> {
    let mut value: u32 = 0;

    for (i, byte) in data.iter().take(3).enumerate() {
        value |= ((byte & 0x7f) as u32) << (7 * i);
        if byte & 0x80 == 0 {
            return u16::try_from(value)
                .map(|v| (v, i + 1))
                .map_err(|_| SolError::SerializationError("compact-u16 value overflow".into()));
        }
    }

    Err(SolError::SerializationError(
        "unexpected end of data while decoding compact-u16".into(),
    ))
}

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

/// A single account reference in an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolAccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl SolAccountMeta {
    pub fn writable(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    pub fn readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// An instruction before it is compiled into a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolInstruction {
    pub program_id: Pubkey,
    pub accounts: Vec<SolAccountMeta>,
    pub data: Vec<u8>,
}

/// A decoded System Program transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferDetails {
    pub from: Pubkey,
    pub to: Pubkey,
    pub lamports: u64,
}

/// Build a System Program `Transfer` of `lamports` from `from` to `to`.
pub fn system_transfer(from: &Pubkey, to: &Pubkey, lamports: u64) -> SolInstruction {
    // u32 LE instruction index (2 = Transfer) + u64 LE lamports.
    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&SYSTEM_TRANSFER_IX_INDEX.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());

    SolInstruction {
        program_id: Pubkey::system_program(),
        accounts: vec![
            SolAccountMeta::writable(*from, true),
            SolAccountMeta::writable(*to, false),
        ],
        data,
    }
}

impl SolInstruction {
    /// Decode this instruction as a System Program transfer, if it is one.
    pub fn as_system_transfer(&self) -> Option<TransferDetails> {
        if self.program_id != Pubkey::system_program()
            || self.accounts.len() != 2
            || self.data.len() != 12
        {
            return None;
        }
        let index = u32::from_le_bytes(self.data[..4].try_into().ok()?);
        if index != SYSTEM_TRANSFER_IX_INDEX {
            return None;
        }
        let lamports = u64::from_le_bytes(self.data[4..].try_into().ok()?);
        Some(TransferDetails {
            from: self.accounts[0].pubkey,
            to: self.accounts[1].pubkey,
            lamports,
        })
    }
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

/// A compiled instruction: account references replaced by indices into
/// the transaction's `account_keys`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

/// An unsigned transaction message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolTransaction {
    /// Canonical order: writable signers, read-only signers, writable
    /// non-signers, read-only non-signers. Fee payer is always index 0.
    pub account_keys: Vec<Pubkey>,
    pub num_required_signatures: u8,
    pub num_readonly_signed: u8,
    pub num_readonly_unsigned: u8,
    pub recent_blockhash: [u8; 32],
    pub compiled_instructions: Vec<CompiledInstruction>,
}

/// A signed transaction ready for `sendTransaction`.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub signature: Signature,
    pub wire: Vec<u8>,
}

/// Build a native SOL transfer transaction paid for by `from`.
pub fn build_sol_transfer(
    from: &Pubkey,
    to: &Pubkey,
    lamports: u64,
    recent_blockhash: &[u8; 32],
) -> Result<SolTransaction, SolError> {
    if lamports == 0 {
        return Err(SolError::TransactionBuildError(
            "lamports must be > 0".into(),
        ));
    }

    compile_transaction(&[system_transfer(from, to, lamports)], from, recent_blockhash)
}

/// Compile instructions into a transaction with a single fee payer.
pub fn compile_transaction(
    instructions: &[SolInstruction],
    fee_payer: &Pubkey,
    recent_blockhash: &[u8; 32],
) -> Result<SolTransaction, SolError> {
    if instructions.is_empty() {
        return Err(SolError::TransactionBuildError(
            "transaction has no instructions".into(),
        ));
    }

    struct AccountEntry {
        pubkey: Pubkey,
        is_signer: bool,
        is_writable: bool,
    }

    impl AccountEntry {
        fn rank(&self) -> u8 {
            match (self.is_signer, self.is_writable) {
                (true, true) => 0,
                (true, false) => 1,
                (false, true) => 2,
                (false, false) => 3,
            }
        }
    }

    // Instruction account lists are tiny; a Vec keeps insertion order.
    let mut entries: Vec<AccountEntry> = Vec::new();
    let mut upsert = |pubkey: Pubkey, signer: bool, writable: bool| {
        if let Some(entry) = entries.iter_mut().find(|e| e.pubkey == pubkey) {
            entry.is_signer |= signer;
            entry.is_writable |= writable;
        } else {
            entries.push(AccountEntry {
                pubkey,
                is_signer: signer,
                is_writable: writable,
            });
        }
    };

    upsert(*fee_payer, true, true);
    for ix in instructions {
        for meta in &ix.accounts {
            upsert(meta.pubkey, meta.is_signer, meta.is_writable);
        }
        upsert(ix.program_id, false, false);
    }

    // Stable sort: the fee payer was inserted first with rank 0, so it stays at index 0.
    entries.sort_by_key(AccountEntry::rank);

    if entries.len() > u8::MAX as usize {
        return Err(SolError::TransactionBuildError(format!(
            "too many accounts: {}",
            entries.len()
        )));
    }

    let count = |pred: fn(&AccountEntry) -> bool| entries.iter().filter(|e| pred(e)).count() as u8;
    let num_required_signatures = count(|e| e.is_signer);
    let num_readonly_signed = count(|e| e.is_signer && !e.is_writable);
    let num_readonly_unsigned = count(|e| !e.is_signer && !e.is_writable);

    let account_keys: Vec<Pubkey> = entries.iter().map(|e| e.pubkey).collect();
    let index_of = |key: &Pubkey| -> Result<u8, SolError> {
        account_keys
            .iter()
            .position(|k| k == key)
            .map(|i| i as u8)
            .ok_or_else(|| SolError::TransactionBuildError(format!("{key} not in account keys")))
    };

    let mut compiled_instructions = Vec::with_capacity(instructions.len());
    for ix in instructions {
        compiled_instructions.push(CompiledInstruction {
            program_id_index: index_of(&ix.program_id)?,
            account_indices: ix
                .accounts
                .iter()
                .map(|meta| index_of(&meta.pubkey))
                .collect::<Result<_, _>>()?,
            data: ix.data.clone(),
        });
    }

    Ok(SolTransaction {
        account_keys,
        num_required_signatures,
        num_readonly_signed,
        num_readonly_unsigned,
        recent_blockhash: *recent_blockhash,
        compiled_instructions,
    })
}

/// Serialize the transaction message (the bytes that get signed).
pub fn serialize_message(tx: &SolTransaction) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);

    buf.push(tx.num_required_signatures);
    buf.push(tx.num_readonly_signed);
    buf.push(tx.num_readonly_unsigned);

    buf.extend_from_slice(&encode_compact_u16(tx.account_keys.len() as u16));
    for key in &tx.account_keys {
        buf.extend_from_slice(key.as_bytes());
    }

    buf.extend_from_slice(&tx.recent_blockhash);

    buf.extend_from_slice(&encode_compact_u16(
        tx.compiled_instructions.len() as u16,
    ));
    for ix in &tx.compiled_instructions {
        buf.push(ix.program_id_index);
        buf.extend_from_slice(&encode_compact_u16(ix.account_indices.len() as u16));
        buf.extend_from_slice(&ix.account_indices);
        buf.extend_from_slice(&encode_compact_u16(ix.data.len() as u16));
        buf.extend_from_slice(&ix.data);
    }

    buf
}

/// Sign a single-signer transaction and serialize it to wire format.
pub fn sign_transaction(tx: &SolTransaction, signer: &Keypair) -> Result<SignedTransaction, SolError> {
    if tx.num_required_signatures != 1 {
        return Err(SolError::SigningError(format!(
            "expected 1 required signature, transaction needs {}",
            tx.num_required_signatures
        )));
    }
    if tx.account_keys.first() != Some(&signer.pubkey()) {
        return Err(SolError::SigningError(
            "signer is not the transaction fee payer".into(),
        ));
    }

    let message = serialize_message(tx);
    let signature = signer.sign_message(&message);

    let mut wire = Vec::with_capacity(1 + SIGNATURE_LEN + message.len());
    wire.extend_from_slice(&encode_compact_u16(1));
    wire.extend_from_slice(&signature.to_bytes());
    wire.extend_from_slice(&message);

    Ok(SignedTransaction { signature, wire })
}

/// Sign a pre-built wire transaction (e.g. one handed to a wallet by a dApp).
///
/// Locates our signer slot among the message's required signers, signs the
/// message bytes and writes the signature into that slot. Other slots are
/// left untouched.
pub fn sign_raw_transaction(signer: &Keypair, raw_tx: &[u8]) -> Result<Vec<u8>, SolError> {
    let our_pubkey = signer.pubkey();

    let (num_sigs, compact_len) = decode_compact_u16(raw_tx)?;
    if num_sigs == 0 {
        return Err(SolError::TransactionBuildError(
            "transaction has zero signatures".into(),
        ));
    }

    let sigs_end = compact_len + num_sigs as usize * SIGNATURE_LEN;
    if sigs_end > raw_tx.len() {
        return Err(SolError::SerializationError(
            "transaction too short: signature slots exceed length".into(),
        ));
    }

    let message = &raw_tx[sigs_end..];
    if message.len() < 4 {
        return Err(SolError::SerializationError(
            "transaction message too short".into(),
        ));
    }

    let num_required_sigs = message[0] as usize;
    let (num_accounts, accounts_compact_len) = decode_compact_u16(&message[3..])?;
    let accounts_start = 3 + accounts_compact_len;
    if accounts_start + num_accounts as usize * 32 > message.len() {
        return Err(SolError::SerializationError(
            "transaction message too short for account keys".into(),
        ));
    }

    let signer_idx = (0..num_required_sigs.min(num_accounts as usize).min(num_sigs as usize))
        .find(|i| {
            let start = accounts_start + i * 32;
            message[start..start + 32] == our_pubkey.as_bytes()[..]
        })
        .ok_or_else(|| {
            SolError::SigningError("wallet pubkey not found in transaction signers".into())
        })?;

    let signature = signer.sign_message(message);

    let mut signed = raw_tx.to_vec();
    let offset = compact_len + signer_idx * SIGNATURE_LEN;
    signed[offset..offset + SIGNATURE_LEN].copy_from_slice(&signature.to_bytes());

    Ok(signed)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

impl SolTransaction {
    /// The account that pays fees, always at index 0.
    pub fn fee_payer(&self) -> Option<Pubkey> {
        self.account_keys.first().copied()
    }

    pub fn is_signer(&self, index: usize) -> bool {
        index < self.num_required_signatures as usize
    }

    /// Header counts: signers come first, read-only entries close each group.
    pub fn is_writable(&self, index: usize) -> bool {
        let signers = self.num_required_signatures as usize;
        if index < signers {
            index < signers.saturating_sub(self.num_readonly_signed as usize)
        } else {
            index < self
                .account_keys
                .len()
                .saturating_sub(self.num_readonly_unsigned as usize)
        }
    }

    /// Expand compiled instructions back into account metas.
    pub fn instructions(&self) -> Result<Vec<SolInstruction>, SolError> {
        let key = |index: u8| -> Result<Pubkey, SolError> {
            self.account_keys.get(index as usize).copied().ok_or_else(|| {
                SolError::SerializationError(format!("account index {index} out of range"))
            })
        };

        self.compiled_instructions
            .iter()
            .map(|ix| -> Result<SolInstruction, SolError> {
                let accounts = ix
                    .account_indices
                    .iter()
                    .map(|&i| -> Result<SolAccountMeta, SolError> {
                        Ok(SolAccountMeta {
                            pubkey: key(i)?,
                            is_signer: self.is_signer(i as usize),
                            is_writable: self.is_writable(i as usize),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(SolInstruction {
                    program_id: key(ix.program_id_index)?,
                    accounts,
                    data: ix.data.clone(),
                })
            })
            .collect()
    }
}

struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], SolError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| SolError::SerializationError("unexpected end of transaction data".into()))?;
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn byte(&mut self) -> Result<u8, SolError> {
        Ok(self.take(1)?[0])
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], SolError> {
        self.take(N)?
            .try_into()
            .map_err(|_| SolError::SerializationError(format!("expected {N} bytes")))
    }

    fn compact_u16(&mut self) -> Result<usize, SolError> {
        let (value, consumed) = decode_compact_u16(&self.data[self.pos..])?;
        self.pos += consumed;
        Ok(value as usize)
    }
}

/// Parse a wire transaction into its signatures and message.
pub fn deserialize_transaction(wire: &[u8]) -> Result<(Vec<Signature>, SolTransaction), SolError> {
    let mut reader = WireReader { data: wire, pos: 0 };

    let num_signatures = reader.compact_u16()?;
    let signatures = (0..num_signatures)
        .map(|_| reader.array::<SIGNATURE_LEN>().map(Signature::new))
        .collect::<Result<Vec<_>, _>>()?;

    let num_required_signatures = reader.byte()?;
    let num_readonly_signed = reader.byte()?;
    let num_readonly_unsigned = reader.byte()?;

    let num_accounts = reader.compact_u16()?;
    let account_keys = (0..num_accounts)
        .map(|_| reader.array::<32>().map(Pubkey::new))
        .collect::<Result<Vec<_>, _>>()?;
    let recent_blockhash = reader.array::<32>()?;

    let num_instructions = reader.compact_u16()?;
    let mut compiled_instructions = Vec::with_capacity(num_instructions);
    for _ in 0..num_instructions {
        let program_id_index = reader.byte()?;
        let num_indices = reader.compact_u16()?;
        let account_indices = reader.take(num_indices)?.to_vec();
        let data_len = reader.compact_u16()?;
        let data = reader.take(data_len)?.to_vec();
        compiled_instructions.push(CompiledInstruction {
            program_id_index,
            account_indices,
            data,
        });
    }

    if reader.pos != wire.len() {
        return Err(SolError::SerializationError(format!(
            "{} trailing bytes after transaction",
            wire.len() - reader.pos
        )));
    }
    if signatures.len() != num_required_signatures as usize {
        return Err(SolError::SerializationError(format!(
            "{} signatures for {} required signers",
            signatures.len(),
            num_required_signatures
        )));
    }
    let signers = num_required_signatures as usize;
    if signers > account_keys.len()
        || num_readonly_signed as usize > signers
        || num_readonly_unsigned as usize > account_keys.len() - signers
    {
        return Err(SolError::SerializationError(
            "message header does not fit its account keys".into(),
        ));
    }

    let tx = SolTransaction {
        account_keys,
        num_required_signatures,
        num_readonly_signed,
        num_readonly_unsigned,
        recent_blockhash,
        compiled_instructions,
    };
    Ok((signatures, tx))
}
