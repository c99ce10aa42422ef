//! Address handling and program-derived address (PDA) computation.
//!
//! Solana addresses are Base58-encoded 32-byte values. PDAs are derived
//! off-curve from an ordered seed list, a bump byte, and the owning program
//! id. Every seed literal below is part of the on-chain wire contract and
//! must match the deployed programs byte-for-byte.

use sha2::{Digest, Sha256};

use crate::error::ProtocolError;

/// A raw 32-byte Solana account address.
pub type Address = [u8; 32];

// ---------------------------------------------------------------------------
// Well-known program ids
// ---------------------------------------------------------------------------

/// The staking-reward program: `GMRXrgb2TF6ejGt3nJrUAkwVoKUrnVK5LZ6duRE8x47g`
pub const REWARD_PROGRAM_ID: Address = [
    0xe4, 0x1a, 0xa8, 0x94, 0x0f, 0x7b, 0x6a, 0x36, 0x47, 0x3c, 0xc0, 0x83, 0x4c, 0xce,
    0x61, 0xa4, 0xc7, 0x3e, 0x96, 0x5e, 0xbe, 0x67, 0xa9, 0x3d, 0x1b, 0xfd, 0x32, 0x47,
    0x79, 0x32, 0x12, 0x17,
];

/// Token Metadata program: `metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s`
pub const TOKEN_METADATA_PROGRAM_ID: Address = [
    0x0b, 0x70, 0x65, 0xb1, 0xe3, 0xd1, 0x7c, 0x45, 0x38, 0x9d, 0x52, 0x7f, 0x6b, 0x04,
    0xc3, 0xcd, 0x58, 0xb8, 0x6c, 0x73, 0x1a, 0xa0, 0xfd, 0xb5, 0x49, 0xb6, 0xd1, 0xbc,
    0x03, 0xf8, 0x29, 0x46,
];

/// SPL Token program: `TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA`
pub const TOKEN_PROGRAM_ID: Address = [
    0x06, 0xdd, 0xf6, 0xe1, 0xd7, 0x65, 0xa1, 0x93, 0xd9, 0xcb, 0xe1, 0x46, 0xce, 0xeb,
    0x79, 0xac, 0x1c, 0xb4, 0x85, 0xed, 0x5f, 0x5b, 0x37, 0x91, 0x3a, 0x8c, 0xf5, 0x85,
    0x7e, 0xff, 0x00, 0xa9,
];

/// Associated Token Account program: `ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL`
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Address = [
    0x8c, 0x97, 0x25, 0x8f, 0x4e, 0x24, 0x89, 0xf1, 0xbb, 0x3d, 0x10, 0x29, 0x14, 0x8e,
    0x0d, 0x83, 0x0b, 0x5a, 0x13, 0x99, 0xda, 0xff, 0x10, 0x84, 0x04, 0x8e, 0x7b, 0xd8,
    0xdb, 0xe9, 0xf8, 0x59,
];

/// System program: 32 zero bytes, `11111111111111111111111111111111`
pub const SYSTEM_PROGRAM_ID: Address = [0u8; 32];

/// Instructions sysvar: `Sysvar1nstructions1111111111111111111111111`
pub const SYSVAR_INSTRUCTIONS_ID: Address = [
    0x06, 0xa7, 0xd5, 0x17, 0x18, 0x7b, 0xd1, 0x66, 0x35, 0xda, 0xd4, 0x04, 0x55, 0xfd,
    0xc2, 0xc0, 0xc1, 0x24, 0xc6, 0x8f, 0x21, 0x56, 0x75, 0xa5, 0xdb, 0xba, 0xcb, 0x5f,
    0x08, 0x00, 0x00, 0x00,
];

// ---------------------------------------------------------------------------
// Seed literals (wire contract)
// ---------------------------------------------------------------------------

pub const CONFIG_SEED: &[u8] = b"config";
pub const NFT_SEED: &[u8] = b"nft";
pub const CLAIM_SEED: &[u8] = b"claim";
pub const METADATA_SEED: &[u8] = b"metadata";
pub const EDITION_SEED: &[u8] = b"edition";
pub const TOKEN_RECORD_SEED: &[u8] = b"token_record";

/// The string appended to every PDA derivation: "ProgramDerivedAddress".
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

// ---------------------------------------------------------------------------
// Base58 helpers
// ---------------------------------------------------------------------------

/// Encode 32 bytes as a Base58 address string.
pub fn bytes_to_address(bytes: &Address) -> String {
    bs58::encode(bytes).into_string()
}

/// Decode a Base58 address string to its 32-byte representation.
pub fn address_to_bytes(address: &str) -> Result<Address, ProtocolError> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| ProtocolError::InvalidAddress(format!("base58 decode failed: {e}")))?;

    let arr: Address = bytes.try_into().map_err(|v: Vec<u8>| {
        ProtocolError::InvalidAddress(format!("expected 32 bytes, got {}", v.len()))
    })?;

    Ok(arr)
}

// ---------------------------------------------------------------------------
// PDA derivation
// ---------------------------------------------------------------------------

/// Find a valid program-derived address for the given seeds and program.
///
/// Iterates bump seeds from 255 down to 0, computing
/// `SHA-256(seed_0 || seed_1 || ... || bump || program_id || "ProgramDerivedAddress")`
/// and returning the first digest that is NOT a valid Ed25519 point. The
/// result is deterministic: the same `(program_id, seeds)` pair always yields
/// the same `(address, bump)`.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Address,
) -> Result<(Address, u8), ProtocolError> {
    for bump in (0u8..=255).rev() {
        if let Some(address) = try_create_program_address(seeds, bump, program_id) {
            return Ok((address, bump));
        }
    }

    // All 256 bumps landing on the curve is cryptographically negligible.
    Err(ProtocolError::Derivation(
        "bump seed search exhausted".into(),
    ))
}

/// Attempt to create a PDA from seeds + bump + program_id.
///
/// Returns `Some(address)` if the derived point is OFF the Ed25519 curve,
/// `None` if it falls on the curve (try the next bump).
fn try_create_program_address(
    seeds: &[&[u8]],
    bump: u8,
    program_id: &Address,
) -> Option<Address> {
    let mut hasher = Sha256::new();

    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update([bump]);
    hasher.update(program_id);
    hasher.update(PDA_MARKER);

    let hash: Address = hasher.finalize().into();

    if is_on_curve(&hash) {
        return None;
    }

    Some(hash)
}

/// Check whether 32 bytes decompress to a valid Ed25519 curve point.
pub(crate) fn is_on_curve(bytes: &Address) -> bool {
    curve25519_dalek::edwards::CompressedEdwardsY(*bytes)
        .decompress()
        .is_some()
}

// ---------------------------------------------------------------------------
// Named derivations
// ---------------------------------------------------------------------------

/// Config PDA: seeds = `["config"]` under the reward program. Singleton.
pub fn config_address() -> Result<(Address, u8), ProtocolError> {
    find_program_address(&[CONFIG_SEED], &REWARD_PROGRAM_ID)
}

/// Stake (NFT) record PDA: seeds = `["nft", mint]` under the reward program.
pub fn stake_record_address(mint: &Address) -> Result<(Address, u8), ProtocolError> {
    find_program_address(&[NFT_SEED, mint.as_ref()], &REWARD_PROGRAM_ID)
}

/// Claim record PDA: seeds = `["claim", wallet, nonce]` under the reward
/// program. The random nonce makes each claim address unique even for the
/// same wallet and generation.
pub fn claim_record_address(
    wallet: &Address,
    nonce: &[u8; 32],
) -> Result<(Address, u8), ProtocolError> {
    find_program_address(
        &[CLAIM_SEED, wallet.as_ref(), nonce.as_ref()],
        &REWARD_PROGRAM_ID,
    )
}

/// Metadata PDA: seeds = `["metadata", metadata_program, mint]`.
pub fn metadata_address(mint: &Address) -> Result<(Address, u8), ProtocolError> {
    find_program_address(
        &[METADATA_SEED, &TOKEN_METADATA_PROGRAM_ID, mint.as_ref()],
        &TOKEN_METADATA_PROGRAM_ID,
    )
}

/// Master edition PDA: the metadata seeds with a trailing `"edition"`.
pub fn master_edition_address(mint: &Address) -> Result<(Address, u8), ProtocolError> {
    find_program_address(
        &[
            METADATA_SEED,
            &TOKEN_METADATA_PROGRAM_ID,
            mint.as_ref(),
            EDITION_SEED,
        ],
        &TOKEN_METADATA_PROGRAM_ID,
    )
}

/// Token delegation record PDA: the metadata seeds with `"token_record"`
/// and the token account appended.
pub fn token_delegation_record_address(
    mint: &Address,
    token: &Address,
) -> Result<(Address, u8), ProtocolError> {
    find_program_address(
        &[
            METADATA_SEED,
            &TOKEN_METADATA_PROGRAM_ID,
            mint.as_ref(),
            TOKEN_RECORD_SEED,
            token.as_ref(),
        ],
        &TOKEN_METADATA_PROGRAM_ID,
    )
}

/// Associated token account PDA: seeds = `[wallet, token_program, mint]`
/// under the associated-token program.
pub fn associated_token_address(
    wallet: &Address,
    mint: &Address,
) -> Result<(Address, u8), ProtocolError> {
    find_program_address(
        &[wallet.as_ref(), &TOKEN_PROGRAM_ID, mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
}
