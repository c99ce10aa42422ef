//! Instruction builders for the staking-reward program and the
//! token-metadata delegation program.
//!
//! Each builder derives the PDAs it needs, encodes the opcode-tagged payload,
//! and emits the account list in the exact order the on-chain program
//! expects. Account order and signer/writable flags are part of the wire
//! protocol and must never be permuted.

use crate::address::{
    associated_token_address, claim_record_address, config_address, master_edition_address,
    metadata_address, stake_record_address, token_delegation_record_address, Address,
    REWARD_PROGRAM_ID, SYSTEM_PROGRAM_ID, SYSVAR_INSTRUCTIONS_ID, TOKEN_METADATA_PROGRAM_ID,
    TOKEN_PROGRAM_ID,
};
use crate::error::ProtocolError;
use crate::records::{strip_destination_prefix, validate_destination_address};

// ---------------------------------------------------------------------------
// Opcodes
// ---------------------------------------------------------------------------

// Reward program (first payload byte).
const SET_CONFIG_OPCODE: u8 = 0;
const DELETE_ACCOUNT_OPCODE: u8 = 1;
const REGISTER_STAKE_RECORD_OPCODE: u8 = 2;
const CREATE_CLAIM_OPCODE: u8 = 3;
const EXECUTE_CLAIM_OPCODE: u8 = 4;

// Token-metadata delegation program.
const DELEGATE_OPCODE: u8 = 44;
const REVOKE_OPCODE: u8 = 45;
const LOCK_OPCODE: u8 = 46;
const UNLOCK_OPCODE: u8 = 47;

/// Sub-type byte for delegate/revoke: the staking delegate variant.
const STAKING_DELEGATE_KIND: u8 = 5;

/// Placeholder for an intentionally omitted optional account. The
/// token-metadata program recognizes its own program id in an optional slot
/// as "not provided"; the entry is always non-signer and non-writable.
pub const OMITTED_ACCOUNT: Address = TOKEN_METADATA_PROGRAM_ID;

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

/// A single account reference in an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMeta {
    pub pubkey: Address,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn readonly(pubkey: Address) -> Self {
        Self {
            pubkey,
            is_signer: false,
            is_writable: false,
        }
    }

    pub fn writable(pubkey: Address) -> Self {
        Self {
            pubkey,
            is_signer: false,
            is_writable: true,
        }
    }

    pub fn signer(pubkey: Address) -> Self {
        Self {
            pubkey,
            is_signer: true,
            is_writable: false,
        }
    }

    pub fn writable_signer(pubkey: Address) -> Self {
        Self {
            pubkey,
            is_signer: true,
            is_writable: true,
        }
    }

    fn omitted() -> Self {
        Self::readonly(OMITTED_ACCOUNT)
    }
}

/// An instruction before it is compiled into a transaction: opcode-tagged
/// payload plus the ordered account list. Transient; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: Address,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Reward program builders
// ---------------------------------------------------------------------------

/// Arguments for `set-config`. The on-chain program derives the per-unit
/// accumulation duration as `total_accumulation_period / accumulated_reward`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetConfigArgs {
    pub claimable_from: i32,
    pub accumulated_reward: i32,
    pub initial_reward: i32,
    pub total_accumulation_period: i32,
    pub generation_duration: i32,
}

impl SetConfigArgs {
    /// Mirror of the on-chain validation, so a bad config is rejected before
    /// it is ever submitted.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.accumulated_reward <= 0 || self.initial_reward < 0 {
            return Err(ProtocolError::TransactionBuild(
                "reward amounts must be non-negative with a positive accumulated reward".into(),
            ));
        }
        if self.total_accumulation_period / self.accumulated_reward <= 0 {
            return Err(ProtocolError::TransactionBuild(
                "derived accumulation duration must be positive".into(),
            ));
        }
        if self.generation_duration <= 0 {
            return Err(ProtocolError::TransactionBuild(
                "generation duration must be positive".into(),
            ));
        }
        self.initial_reward
            .checked_add(self.accumulated_reward)
            .ok_or_else(|| {
                ProtocolError::TransactionBuild("total reward overflows i32".into())
            })?;

        Ok(())
    }
}

/// Build `set-config` (opcode 0). Creates and initializes the singleton
/// config account; the authority pays rent and becomes the config authority.
pub fn build_set_config(
    authority: &Address,
    creator: &Address,
    args: &SetConfigArgs,
) -> Result<Instruction, ProtocolError> {
    args.validate()?;

    let (config, _) = config_address()?;

    let mut data = Vec::with_capacity(1 + 5 * 4);
    data.push(SET_CONFIG_OPCODE);
    data.extend_from_slice(&args.claimable_from.to_le_bytes());
    data.extend_from_slice(&args.accumulated_reward.to_le_bytes());
    data.extend_from_slice(&args.initial_reward.to_le_bytes());
    data.extend_from_slice(&args.total_accumulation_period.to_le_bytes());
    data.extend_from_slice(&args.generation_duration.to_le_bytes());

    Ok(Instruction {
        program_id: REWARD_PROGRAM_ID,
        accounts: vec![
            AccountMeta::signer(*authority),
            AccountMeta::readonly(*creator),
            AccountMeta::writable(config),
            AccountMeta::readonly(SYSTEM_PROGRAM_ID),
        ],
        data,
    })
}

/// Build `delete-account` (opcode 1). Deletes a program-owned account and
/// sends its lamports to `receiver`; must be signed by the config authority.
pub fn build_delete_account(
    authority: &Address,
    target: &Address,
    receiver: &Address,
) -> Result<Instruction, ProtocolError> {
    let (config, _) = config_address()?;

    Ok(Instruction {
        program_id: REWARD_PROGRAM_ID,
        accounts: vec![
            AccountMeta::signer(*authority),
            AccountMeta::writable(*target),
            AccountMeta::writable(*receiver),
            AccountMeta::readonly(config),
        ],
        data: vec![DELETE_ACCOUNT_OPCODE],
    })
}

/// Build `register-stake-record` (opcode 2). Creates the stake record for a
/// mint; the on-chain program tolerates re-registration, so the instruction
/// is safe to include defensively in claim batches.
pub fn build_register_stake_record(
    payer: &Address,
    mint: &Address,
) -> Result<Instruction, ProtocolError> {
    let (metadata, _) = metadata_address(mint)?;
    let (edition, _) = master_edition_address(mint)?;
    let (nft_record, _) = stake_record_address(mint)?;
    let (config, _) = config_address()?;

    Ok(Instruction {
        program_id: REWARD_PROGRAM_ID,
        accounts: vec![
            AccountMeta::signer(*payer),
            AccountMeta::readonly(*mint),
            AccountMeta::readonly(metadata),
            AccountMeta::readonly(edition),
            AccountMeta::writable(nft_record),
            AccountMeta::readonly(config),
            AccountMeta::readonly(SYSTEM_PROGRAM_ID),
        ],
        data: vec![REGISTER_STAKE_RECORD_OPCODE],
    })
}

/// Build `create-claim` (opcode 3). Creates a claim record at the PDA
/// derived from the wallet and the given nonce; the payload carries the
/// bump, the nonce, and the destination wallet address with its `0x`
/// prefix stripped.
pub fn build_create_claim(
    wallet: &Address,
    nonce: &[u8; 32],
    destination: &str,
) -> Result<Instruction, ProtocolError> {
    validate_destination_address(destination)?;
    let stripped = strip_destination_prefix(destination);

    let (claim, bump) = claim_record_address(wallet, nonce)?;
    let (config, _) = config_address()?;

    let mut data = Vec::with_capacity(1 + 1 + 32 + stripped.len());
    data.push(CREATE_CLAIM_OPCODE);
    data.push(bump);
    data.extend_from_slice(nonce);
    data.extend_from_slice(stripped.as_bytes());

    Ok(Instruction {
        program_id: REWARD_PROGRAM_ID,
        accounts: vec![
            AccountMeta::signer(*wallet),
            AccountMeta::writable(claim),
            AccountMeta::readonly(config),
            AccountMeta::readonly(SYSTEM_PROGRAM_ID),
        ],
        data,
    })
}

/// Build `execute-claim` (opcode 4). Adds the reward for one staked mint to
/// the claim record created with the same nonce. The payload carries the
/// bumps for the token account, the token delegation record, and the stake
/// record so the program can re-derive them cheaply.
pub fn build_execute_claim(
    wallet: &Address,
    mint: &Address,
    nonce: &[u8; 32],
) -> Result<Instruction, ProtocolError> {
    let (token, token_bump) = associated_token_address(wallet, mint)?;
    let (token_record, token_record_bump) = token_delegation_record_address(mint, &token)?;
    let (nft_record, nft_record_bump) = stake_record_address(mint)?;
    let (claim, _) = claim_record_address(wallet, nonce)?;
    let (config, _) = config_address()?;

    Ok(Instruction {
        program_id: REWARD_PROGRAM_ID,
        accounts: vec![
            AccountMeta::signer(*wallet),
            AccountMeta::readonly(token),
            AccountMeta::readonly(token_record),
            AccountMeta::writable(nft_record),
            AccountMeta::writable(claim),
            AccountMeta::readonly(config),
        ],
        data: vec![
            EXECUTE_CLAIM_OPCODE,
            token_bump,
            token_record_bump,
            nft_record_bump,
        ],
    })
}

/// Build the composite claim batch for a set of mints: one `create-claim`,
/// then one `register-stake-record` per mint, then one `execute-claim` per
/// mint, all sharing the same nonce so every instruction resolves the same
/// claim PDA. The order is required for the generation state to be
/// self-consistent within the transaction.
pub fn build_claim_batch(
    wallet: &Address,
    mints: &[Address],
    destination: &str,
    nonce: &[u8; 32],
) -> Result<Vec<Instruction>, ProtocolError> {
    if mints.is_empty() {
        return Err(ProtocolError::TransactionBuild(
            "claim batch requires at least one mint".into(),
        ));
    }

    let mut instructions = Vec::with_capacity(1 + 2 * mints.len());
    instructions.push(build_create_claim(wallet, nonce, destination)?);
    for mint in mints {
        instructions.push(build_register_stake_record(wallet, mint)?);
    }
    for mint in mints {
        instructions.push(build_execute_claim(wallet, mint, nonce)?);
    }

    Ok(instructions)
}

// ---------------------------------------------------------------------------
// Token-metadata delegation builders
// ---------------------------------------------------------------------------

/// Build `delegate-approve` (opcode 44, staking sub-type 5). Grants the
/// staking delegate authority over the owner's token account for `mint`.
pub fn build_delegate_approve(
    delegate: &Address,
    mint: &Address,
    owner: &Address,
    payer: &Address,
) -> Result<Instruction, ProtocolError> {
    // Staking delegate amount is fixed at 1 (the NFT), no authorization data.
    let mut data = Vec::with_capacity(2 + 8 + 1);
    data.push(DELEGATE_OPCODE);
    data.push(STAKING_DELEGATE_KIND);
    data.extend_from_slice(&1u64.to_le_bytes());
    data.push(0);

    Ok(Instruction {
        program_id: TOKEN_METADATA_PROGRAM_ID,
        accounts: delegation_accounts(delegate, mint, owner, payer)?,
        data,
    })
}

/// Build `delegate-revoke` (opcode 45, staking sub-type 5).
pub fn build_delegate_revoke(
    delegate: &Address,
    mint: &Address,
    owner: &Address,
    payer: &Address,
) -> Result<Instruction, ProtocolError> {
    Ok(Instruction {
        program_id: TOKEN_METADATA_PROGRAM_ID,
        accounts: delegation_accounts(delegate, mint, owner, payer)?,
        data: vec![REVOKE_OPCODE, STAKING_DELEGATE_KIND],
    })
}

/// Build `lock` (opcode 46). The staking delegate locks the owner's token.
pub fn build_lock(
    delegate: &Address,
    mint: &Address,
    owner: &Address,
    payer: &Address,
) -> Result<Instruction, ProtocolError> {
    Ok(Instruction {
        program_id: TOKEN_METADATA_PROGRAM_ID,
        accounts: lock_accounts(delegate, mint, owner, payer)?,
        data: vec![LOCK_OPCODE, 0, 0],
    })
}

/// Build `unlock` (opcode 47). The staking delegate releases the lock.
pub fn build_unlock(
    delegate: &Address,
    mint: &Address,
    owner: &Address,
    payer: &Address,
) -> Result<Instruction, ProtocolError> {
    Ok(Instruction {
        program_id: TOKEN_METADATA_PROGRAM_ID,
        accounts: lock_accounts(delegate, mint, owner, payer)?,
        data: vec![UNLOCK_OPCODE, 0, 0],
    })
}

/// Fixed 14-account list for delegate/revoke. Unused optional slots carry
/// the omitted-account placeholder.
fn delegation_accounts(
    delegate: &Address,
    mint: &Address,
    owner: &Address,
    payer: &Address,
) -> Result<Vec<AccountMeta>, ProtocolError> {
    let (token, _) = associated_token_address(owner, mint)?;
    let (metadata, _) = metadata_address(mint)?;
    let (edition, _) = master_edition_address(mint)?;
    let (token_record, _) = token_delegation_record_address(mint, &token)?;

    Ok(vec![
        AccountMeta::omitted(), // delegate record (metadata delegates only)
        AccountMeta::readonly(*delegate),
        AccountMeta::writable(metadata),
        AccountMeta::readonly(edition),
        AccountMeta::writable(token_record),
        AccountMeta::readonly(*mint),
        AccountMeta::writable(token),
        AccountMeta::signer(*owner),
        AccountMeta::writable_signer(*payer),
        AccountMeta::readonly(SYSTEM_PROGRAM_ID),
        AccountMeta::readonly(SYSVAR_INSTRUCTIONS_ID),
        AccountMeta::readonly(TOKEN_PROGRAM_ID),
        AccountMeta::omitted(), // authorization rules program
        AccountMeta::omitted(), // authorization rules
    ])
}

/// Fixed 13-account list for lock/unlock.
fn lock_accounts(
    delegate: &Address,
    mint: &Address,
    owner: &Address,
    payer: &Address,
) -> Result<Vec<AccountMeta>, ProtocolError> {
    let (token, _) = associated_token_address(owner, mint)?;
    let (metadata, _) = metadata_address(mint)?;
    let (edition, _) = master_edition_address(mint)?;
    let (token_record, _) = token_delegation_record_address(mint, &token)?;

    Ok(vec![
        AccountMeta::signer(*delegate),
        AccountMeta::omitted(), // token owner (delegate authority is used)
        AccountMeta::writable(token),
        AccountMeta::readonly(*mint),
        AccountMeta::writable(metadata),
        AccountMeta::readonly(edition),
        AccountMeta::writable(token_record),
        AccountMeta::writable_signer(*payer),
        AccountMeta::readonly(SYSTEM_PROGRAM_ID),
        AccountMeta::readonly(SYSVAR_INSTRUCTIONS_ID),
        AccountMeta::readonly(TOKEN_PROGRAM_ID),
        AccountMeta::omitted(), // authorization rules program
        AccountMeta::omitted(), // authorization rules
    ])
}
