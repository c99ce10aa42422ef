//! Transaction wire format, compilation, and signing.
//!
//! Claim batches are compiled into Solana's binary message layout and
//! signed here directly; top to bottom the wire bytes are:
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
//!
//! Instructions keep their caller-supplied order and execute atomically:
//! either the whole transaction applies or none of it does.

use ed25519_dalek::Signer;
use zeroize::Zeroize;

use crate::address::Address;
use crate::error::ProtocolError;
use crate::instruction::Instruction;

// ---------------------------------------------------------------------------
// Compact-u16 encoding
// ---------------------------------------------------------------------------

/// Encode a length in Solana's compact-u16 form: seven value bits per
/// byte, high bit set while more bytes follow. One byte covers lengths
/// through `0x7f`, two through `0x3fff`, three for the rest.
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

/// Decode a compact-u16 value from a byte slice.
///
/// Returns `(value, bytes_consumed)` or an error if the data is truncated.
pub fn decode_compact_u16(data: &[u8]) -> Result<(u16, usize), ProtocolError> {
    let mut value: u32 = 0;
    let mut shift = 0u32;
    let mut consumed = 0usize;

    loop {
        if consumed >= data.len() {
            return Err(ProtocolError::Layout(
                "unexpected end of data while decoding compact-u16".into(),
            ));
        }
        let byte = data[consumed];
        consumed += 1;

        value |= ((byte & 0x7f) as u32) << shift;
        shift += 7;

        if byte & 0x80 == 0 {
            break;
        }
        if consumed >= 3 {
            break;
        }
    }

    if value > u16::MAX as u32 {
        return Err(ProtocolError::Layout("compact-u16 value overflow".into()));
    }

    Ok((value as u16, consumed))
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A complete transaction, compiled but not yet signed.
#[derive(Debug, Clone)]
pub struct Transaction {
    /// All account keys referenced by this transaction, in canonical order:
    ///   1. writable signers (fee payer first)
    ///   2. read-only signers
    ///   3. writable non-signers
    ///   4. read-only non-signers
    pub account_keys: Vec<Address>,

    /// Number of required signatures (first N accounts are signers).
    pub num_required_signatures: u8,
    /// How many of the signing accounts are read-only.
    pub num_readonly_signed: u8,
    /// How many of the non-signing accounts are read-only.
    pub num_readonly_unsigned: u8,

    /// Freshness token: a recent blockhash, fetched immediately before
    /// signing. A stale value makes the cluster reject the transaction.
    pub recent_blockhash: [u8; 32],

    /// Compiled instructions in caller-supplied order.
    pub compiled_instructions: Vec<CompiledInstruction>,
}

/// An instruction with account references replaced by u8 indices into the
/// transaction's `account_keys`.
#[derive(Debug, Clone)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Transaction compilation
// ---------------------------------------------------------------------------

/// Compile a non-empty instruction sequence into a transaction with a single
/// fee payer. The fee payer is always the first signer, at index 0.
pub fn compile_transaction(
    instructions: &[Instruction],
    fee_payer: &Address,
    recent_blockhash: &[u8; 32],
) -> Result<Transaction, ProtocolError> {
    if instructions.is_empty() {
        return Err(ProtocolError::TransactionBuild(
            "transaction requires at least one instruction".into(),
        ));
    }

    // Claim batches reference a few dozen keys at most, so dedupe with a
    // linear scan over a Vec.
    struct AccountEntry {
        pubkey: Address,
        is_signer: bool,
        is_writable: bool,
    }

    let mut entries: Vec<AccountEntry> = Vec::new();

    let mut upsert = |pubkey: Address, signer: bool, writable: bool| {
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

    // Fee payer is always signer + writable.
    upsert(*fee_payer, true, true);

    for ix in instructions {
        for meta in &ix.accounts {
            upsert(meta.pubkey, meta.is_signer, meta.is_writable);
        }
        // Program ids are non-signer, read-only accounts.
        upsert(ix.program_id, false, false);
    }

    // Canonical ordering; the sort is stable so insertion order (fee payer
    // first) is kept within each category.
    fn rank(e: &AccountEntry) -> u8 {
        match (e.is_signer, e.is_writable) {
            (true, true) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        }
    }
    entries.sort_by_key(rank);

    let num_signers = entries.iter().filter(|e| e.is_signer).count() as u8;
    let num_readonly_signed = entries
        .iter()
        .filter(|e| e.is_signer && !e.is_writable)
        .count() as u8;
    let num_readonly_unsigned = entries
        .iter()
        .filter(|e| !e.is_signer && !e.is_writable)
        .count() as u8;

    let account_keys: Vec<Address> = entries.iter().map(|e| e.pubkey).collect();

    let mut compiled = Vec::with_capacity(instructions.len());
    for ix in instructions {
        let program_id_index = account_keys
            .iter()
            .position(|k| *k == ix.program_id)
            .ok_or_else(|| {
                ProtocolError::TransactionBuild("program id not in account keys".into())
            })? as u8;

        let mut account_indices = Vec::with_capacity(ix.accounts.len());
        for meta in &ix.accounts {
            let idx = account_keys
                .iter()
                .position(|k| *k == meta.pubkey)
                .ok_or_else(|| {
                    ProtocolError::TransactionBuild("account not in account keys".into())
                })? as u8;
            account_indices.push(idx);
        }

        compiled.push(CompiledInstruction {
            program_id_index,
            account_indices,
            data: ix.data.clone(),
        });
    }

    Ok(Transaction {
        account_keys,
        num_required_signatures: num_signers,
        num_readonly_signed,
        num_readonly_unsigned,
        recent_blockhash: *recent_blockhash,
        compiled_instructions: compiled,
    })
}

/// Serialize the transaction message (the bytes that get signed).
pub fn serialize_message(tx: &Transaction) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);

    buf.push(tx.num_required_signatures);
    buf.push(tx.num_readonly_signed);
    buf.push(tx.num_readonly_unsigned);

    buf.extend_from_slice(&encode_compact_u16(tx.account_keys.len() as u16));
    for key in &tx.account_keys {
        buf.extend_from_slice(key);
    }

    buf.extend_from_slice(&tx.recent_blockhash);

    buf.extend_from_slice(&encode_compact_u16(tx.compiled_instructions.len() as u16));
    for ix in &tx.compiled_instructions {
        buf.push(ix.program_id_index);

        buf.extend_from_slice(&encode_compact_u16(ix.account_indices.len() as u16));
        buf.extend_from_slice(&ix.account_indices);

        buf.extend_from_slice(&encode_compact_u16(ix.data.len() as u16));
        buf.extend_from_slice(&ix.data);
    }

    buf
}

// ---------------------------------------------------------------------------
// Signing
// ---------------------------------------------------------------------------

/// Sign a compiled transaction and serialize it into wire format.
///
/// `signer_seeds` are 32-byte Ed25519 seeds. Every required signer slot in
/// the transaction must be covered by one of the supplied seeds or signing
/// fails; extra seeds are ignored. Seed copies are zeroized after key
/// construction.
pub fn sign_transaction(
    tx: &Transaction,
    signer_seeds: &[[u8; 32]],
) -> Result<Vec<u8>, ProtocolError> {
    let message_bytes = serialize_message(tx);

    let signing_keys: Vec<ed25519_dalek::SigningKey> = signer_seeds
        .iter()
        .map(|seed| {
            let mut seed = *seed;
            let key = ed25519_dalek::SigningKey::from_bytes(&seed);
            seed.zeroize();
            key
        })
        .collect();

    let num_slots = tx.num_required_signatures as usize;
    if tx.account_keys.len() < num_slots {
        return Err(ProtocolError::TransactionBuild(
            "signer count exceeds account keys".into(),
        ));
    }

    // One signature per required-signer slot, in slot order.
    let mut signatures = Vec::with_capacity(num_slots);
    for slot_key in &tx.account_keys[..num_slots] {
        let key = signing_keys
            .iter()
            .find(|k| k.verifying_key().to_bytes() == *slot_key)
            .ok_or_else(|| {
                ProtocolError::Signing(format!(
                    "no key provided for required signer {}",
                    crate::address::bytes_to_address(slot_key)
                ))
            })?;
        signatures.push(key.sign(&message_bytes));
    }

    let mut wire = Vec::with_capacity(1 + 64 * num_slots + message_bytes.len());
    wire.extend_from_slice(&encode_compact_u16(num_slots as u16));
    for signature in &signatures {
        wire.extend_from_slice(&signature.to_bytes());
    }
    wire.extend_from_slice(&message_bytes);

    Ok(wire)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{Address, SYSTEM_PROGRAM_ID};
    use crate::instruction::{AccountMeta, Instruction};

    fn test_instruction(accounts: Vec<AccountMeta>, data: Vec<u8>) -> Instruction {
        Instruction {
            program_id: SYSTEM_PROGRAM_ID,
            accounts,
            data,
        }
    }

    fn pubkey_of(seed: &[u8; 32]) -> Address {
        ed25519_dalek::SigningKey::from_bytes(seed)
            .verifying_key()
            .to_bytes()
    }

    // -- compact-u16 ---------------------------------------------------------

    #[test]
    fn compact_u16_boundaries() {
        assert_eq!(encode_compact_u16(0), vec![0x00]);
        assert_eq!(encode_compact_u16(0x7f), vec![0x7f]);
        assert_eq!(encode_compact_u16(128), vec![0x80, 0x01]);
        assert_eq!(encode_compact_u16(16383), vec![0xff, 0x7f]);
        assert_eq!(encode_compact_u16(16384), vec![0x80, 0x80, 0x01]);
        assert_eq!(encode_compact_u16(u16::MAX), vec![0xff, 0xff, 0x03]);
    }

    #[test]
    fn compact_u16_roundtrip() {
        for value in [0u16, 1, 127, 128, 255, 256, 16383, 16384, 65535] {
            let encoded = encode_compact_u16(value);
            let (decoded, len) = decode_compact_u16(&encoded).unwrap();
            assert_eq!(decoded, value, "roundtrip failed for {value}");
            assert_eq!(len, encoded.len());
        }
    }

    #[test]
    fn decode_compact_u16_empty_input_fails() {
        assert!(decode_compact_u16(&[]).is_err());
    }

    // -- compilation ---------------------------------------------------------

    #[test]
    fn empty_instruction_sequence_fails() {
        let fee_payer = [0x01; 32];
        assert!(compile_transaction(&[], &fee_payer, &[0u8; 32]).is_err());
    }

    #[test]
    fn fee_payer_is_first_and_writable_signer() {
        let fee_payer = [0x01; 32];
        let ix = test_instruction(vec![AccountMeta::writable([0x02; 32])], vec![9]);
        let tx = compile_transaction(&[ix], &fee_payer, &[0u8; 32]).unwrap();

        assert_eq!(tx.account_keys[0], fee_payer);
        assert_eq!(tx.num_required_signatures, 1);
        assert_eq!(tx.num_readonly_signed, 0);
        // System program (the test instruction's program id) is read-only.
        assert_eq!(tx.num_readonly_unsigned, 1);
    }

    #[test]
    fn canonical_account_ordering() {
        let fee_payer = [0x01; 32];
        let readonly_signer = [0x02; 32];
        let writable = [0x03; 32];
        let readonly = [0x04; 32];

        let ix = test_instruction(
            vec![
                AccountMeta::readonly(readonly),
                AccountMeta::writable(writable),
                AccountMeta::signer(readonly_signer),
            ],
            vec![1],
        );
        let tx = compile_transaction(&[ix], &fee_payer, &[0u8; 32]).unwrap();

        assert_eq!(tx.account_keys[0], fee_payer);
        assert_eq!(tx.account_keys[1], readonly_signer);
        assert_eq!(tx.account_keys[2], writable);
        assert_eq!(tx.num_required_signatures, 2);
        assert_eq!(tx.num_readonly_signed, 1);
        // readonly account + program id.
        assert_eq!(tx.num_readonly_unsigned, 2);
    }

    #[test]
    fn duplicate_accounts_merge_permissions() {
        let fee_payer = [0x01; 32];
        let shared = [0x05; 32];

        let a = test_instruction(vec![AccountMeta::readonly(shared)], vec![1]);
        let b = test_instruction(vec![AccountMeta::writable(shared)], vec![2]);
        let tx = compile_transaction(&[a, b], &fee_payer, &[0u8; 32]).unwrap();

        // fee payer + shared + program id.
        assert_eq!(tx.account_keys.len(), 3);
        let idx = tx.account_keys.iter().position(|k| *k == shared).unwrap();
        // Merged entry is writable, so it sorts before the read-only program.
        assert!(idx < tx.account_keys.len() - 1);
    }

    #[test]
    fn instruction_order_is_preserved() {
        let fee_payer = [0x01; 32];
        let a = test_instruction(vec![], vec![0xAA]);
        let b = test_instruction(vec![], vec![0xBB]);
        let c = test_instruction(vec![], vec![0xCC]);
        let tx = compile_transaction(&[a, b, c], &fee_payer, &[0u8; 32]).unwrap();

        let first: Vec<u8> = tx
            .compiled_instructions
            .iter()
            .map(|ix| ix.data[0])
            .collect();
        assert_eq!(first, vec![0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn blockhash_is_embedded_in_message() {
        let fee_payer = [0x01; 32];
        let blockhash = [0xCC; 32];
        let ix = test_instruction(vec![], vec![1]);
        let tx = compile_transaction(&[ix], &fee_payer, &blockhash).unwrap();
        let msg = serialize_message(&tx);

        let num_accounts = tx.account_keys.len();
        let compact_len = encode_compact_u16(num_accounts as u16).len();
        let offset = 3 + compact_len + 32 * num_accounts;
        assert_eq!(&msg[offset..offset + 32], &blockhash);
    }

    #[test]
    fn message_header_matches_counts() {
        let fee_payer = [0x01; 32];
        let ix = test_instruction(vec![AccountMeta::signer([0x02; 32])], vec![1]);
        let tx = compile_transaction(&[ix], &fee_payer, &[0u8; 32]).unwrap();
        let msg = serialize_message(&tx);

        assert_eq!(msg[0], tx.num_required_signatures);
        assert_eq!(msg[1], tx.num_readonly_signed);
        assert_eq!(msg[2], tx.num_readonly_unsigned);
    }

    // -- signing -------------------------------------------------------------

    #[test]
    fn single_signer_wire_format_verifies() {
        use ed25519_dalek::{Signature, VerifyingKey};

        let seed = [0x42u8; 32];
        let fee_payer = pubkey_of(&seed);

        let ix = test_instruction(vec![AccountMeta::writable([0x02; 32])], vec![7]);
        let tx = compile_transaction(&[ix], &fee_payer, &[0xCC; 32]).unwrap();
        let wire = sign_transaction(&tx, &[seed]).unwrap();

        assert_eq!(wire[0], 0x01);

        let sig_bytes: [u8; 64] = wire[1..65].try_into().unwrap();
        let signature = Signature::from_bytes(&sig_bytes);
        let message_bytes = &wire[65..];

        let vk = VerifyingKey::from_bytes(&fee_payer).unwrap();
        assert!(vk.verify_strict(message_bytes, &signature).is_ok());
    }

    #[test]
    fn multi_signer_signatures_land_in_slot_order() {
        use ed25519_dalek::{Signature, VerifyingKey};

        let payer_seed = [0x11u8; 32];
        let other_seed = [0x22u8; 32];
        let fee_payer = pubkey_of(&payer_seed);
        let other = pubkey_of(&other_seed);

        let ix = test_instruction(vec![AccountMeta::signer(other)], vec![1]);
        let tx = compile_transaction(&[ix], &fee_payer, &[0x99; 32]).unwrap();
        assert_eq!(tx.num_required_signatures, 2);

        // Key order in the argument should not matter.
        let wire = sign_transaction(&tx, &[other_seed, payer_seed]).unwrap();

        assert_eq!(wire[0], 0x02);
        let message_bytes = &wire[1 + 128..];

        for (slot, expected_key) in tx.account_keys[..2].iter().enumerate() {
            let start = 1 + slot * 64;
            let sig_bytes: [u8; 64] = wire[start..start + 64].try_into().unwrap();
            let signature = Signature::from_bytes(&sig_bytes);
            let vk = VerifyingKey::from_bytes(expected_key).unwrap();
            assert!(
                vk.verify_strict(message_bytes, &signature).is_ok(),
                "slot {slot} signature does not match its account key"
            );
        }
    }

    #[test]
    fn missing_signer_key_fails() {
        let payer_seed = [0x11u8; 32];
        let fee_payer = pubkey_of(&payer_seed);

        let ix = test_instruction(vec![AccountMeta::signer([0x0F; 32])], vec![1]);
        let tx = compile_transaction(&[ix], &fee_payer, &[0u8; 32]).unwrap();

        let result = sign_transaction(&tx, &[payer_seed]);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("required signer"));
    }

    #[test]
    fn signing_is_deterministic() {
        let seed = [0x55u8; 32];
        let fee_payer = pubkey_of(&seed);

        let ix = test_instruction(vec![], vec![3]);
        let tx = compile_transaction(&[ix], &fee_payer, &[0x99; 32]).unwrap();

        let wire1 = sign_transaction(&tx, &[seed]).unwrap();
        let wire2 = sign_transaction(&tx, &[seed]).unwrap();
        assert_eq!(wire1, wire2);
    }
}
