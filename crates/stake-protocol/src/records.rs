//! Fixed-layout binary codec for the on-chain account records.
//!
//! All multi-byte integers are little-endian at fixed offsets. Decoding is
//! pure and either yields a complete record or fails with a layout error;
//! no partial records are ever returned. Encoding is the exact inverse and
//! doubles as the payload encoder for instruction arguments.

use crate::address::Address;
use crate::error::ProtocolError;

/// Length of a destination wallet address after stripping the `0x` prefix
/// (40 hex characters).
pub const DESTINATION_ADDRESS_LEN: usize = 40;

/// Display prefix of destination wallet addresses. Stripped before encoding
/// and re-prepended after decoding.
pub const DESTINATION_PREFIX: &str = "0x";

fn read_i32(buf: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap())
}

fn read_address(buf: &[u8], offset: usize) -> Address {
    buf[offset..offset + 32].try_into().unwrap()
}

fn check_len(buf: &[u8], min: usize, kind: &str) -> Result<(), ProtocolError> {
    if buf.len() < min {
        return Err(ProtocolError::Layout(format!(
            "{kind} requires at least {min} bytes, got {}",
            buf.len()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Global program configuration. Exactly one exists per deployed program,
/// at the PDA derived from the literal `"config"` seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Account with the right to issue system instructions.
    pub authority: Address,
    /// Creator of the claimable NFTs.
    pub creator: Address,
    /// Unix timestamp when claiming becomes available.
    pub claimable_from: i32,
    /// Reward amount that accumulates over time.
    pub accumulated_reward: i32,
    /// Reward amount given for the first claim.
    pub initial_reward: i32,
    /// Seconds after which one unit of reward accumulates.
    pub accumulation_duration: i32,
    /// Duration of a claim-record generation in seconds.
    pub generation_duration: i32,
}

impl Config {
    pub const LEN: usize = 2 * 32 + 5 * 4;

    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        check_len(buf, Self::LEN, "Config")?;

        Ok(Config {
            authority: read_address(buf, 0),
            creator: read_address(buf, 32),
            claimable_from: read_i32(buf, 64),
            accumulated_reward: read_i32(buf, 68),
            initial_reward: read_i32(buf, 72),
            accumulation_duration: read_i32(buf, 76),
            generation_duration: read_i32(buf, 80),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::LEN);
        buf.extend_from_slice(&self.authority);
        buf.extend_from_slice(&self.creator);
        buf.extend_from_slice(&self.claimable_from.to_le_bytes());
        buf.extend_from_slice(&self.accumulated_reward.to_le_bytes());
        buf.extend_from_slice(&self.initial_reward.to_le_bytes());
        buf.extend_from_slice(&self.accumulation_duration.to_le_bytes());
        buf.extend_from_slice(&self.generation_duration.to_le_bytes());
        buf
    }
}

// ---------------------------------------------------------------------------
// NftRecord
// ---------------------------------------------------------------------------

/// Staking information about one NFT, at the PDA derived from
/// `["nft", mint]`. On chain, `claimed_amount <= total_amount` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NftRecord {
    /// Amount already claimed.
    pub claimed_amount: i32,
    /// Total amount claimable over the lifetime of the stake.
    pub total_amount: i32,
    /// Timestamp of the last claim; zero if none has been made.
    pub last_claimed_at: i32,
}

impl NftRecord {
    pub const LEN: usize = 3 * 4;

    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        check_len(buf, Self::LEN, "NftRecord")?;

        Ok(NftRecord {
            claimed_amount: read_i32(buf, 0),
            total_amount: read_i32(buf, 4),
            last_claimed_at: read_i32(buf, 8),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::LEN);
        buf.extend_from_slice(&self.claimed_amount.to_le_bytes());
        buf.extend_from_slice(&self.total_amount.to_le_bytes());
        buf.extend_from_slice(&self.last_claimed_at.to_le_bytes());
        buf
    }
}

// ---------------------------------------------------------------------------
// ClaimRecord
// ---------------------------------------------------------------------------

/// One reward claim, at the PDA derived from `["claim", wallet, nonce]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRecord {
    /// Generation bucket the record was created in
    /// (`floor(created_at / generation_duration)`).
    pub generation: i32,
    /// Reward amount accumulated into this claim.
    pub amount: i32,
    /// Wallet that created the record.
    pub owner: Address,
    /// BNB-chain wallet address the reward is paid out to, in `0x…` display
    /// form. Stored on chain without the prefix, as raw bytes trailing the
    /// fixed fields.
    pub destination_wallet_address: String,
}

impl ClaimRecord {
    /// Byte offset where the destination address begins.
    pub const MIN_LEN: usize = 2 * 4 + 32;

    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        check_len(buf, Self::MIN_LEN, "ClaimRecord")?;

        let destination = std::str::from_utf8(&buf[Self::MIN_LEN..]).map_err(|_| {
            ProtocolError::Layout("ClaimRecord destination address is not UTF-8".into())
        })?;

        Ok(ClaimRecord {
            generation: read_i32(buf, 0),
            amount: read_i32(buf, 4),
            owner: read_address(buf, 8),
            destination_wallet_address: format!("{DESTINATION_PREFIX}{destination}"),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let destination = strip_destination_prefix(&self.destination_wallet_address);

        let mut buf = Vec::with_capacity(Self::MIN_LEN + destination.len());
        buf.extend_from_slice(&self.generation.to_le_bytes());
        buf.extend_from_slice(&self.amount.to_le_bytes());
        buf.extend_from_slice(&self.owner);
        buf.extend_from_slice(destination.as_bytes());
        buf
    }
}

/// Strip the `0x` display prefix from a destination wallet address, if any.
pub fn strip_destination_prefix(address: &str) -> &str {
    address.strip_prefix(DESTINATION_PREFIX).unwrap_or(address)
}

/// Validate a destination wallet address: 40 hex characters after prefix
/// stripping.
pub fn validate_destination_address(address: &str) -> Result<(), ProtocolError> {
    let stripped = strip_destination_prefix(address);

    if stripped.len() != DESTINATION_ADDRESS_LEN {
        return Err(ProtocolError::InvalidAddress(format!(
            "destination address must be {DESTINATION_ADDRESS_LEN} hex chars, got {}",
            stripped.len()
        )));
    }
    hex::decode(stripped).map_err(|e| {
        ProtocolError::InvalidAddress(format!("destination address is not hex: {e}"))
    })?;

    Ok(())
}

// ---------------------------------------------------------------------------
// TokenDelegationRecord
// ---------------------------------------------------------------------------

/// Lock state of a delegated token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegationState {
    Unlocked,
    Locked,
    Listed,
}

impl DelegationState {
    fn from_byte(byte: u8) -> Result<Self, ProtocolError> {
        match byte {
            0 => Ok(Self::Unlocked),
            1 => Ok(Self::Locked),
            2 => Ok(Self::Listed),
            b => Err(ProtocolError::Layout(format!(
                "unknown delegation state: {b}"
            ))),
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            Self::Unlocked => 0,
            Self::Locked => 1,
            Self::Listed => 2,
        }
    }
}

/// Role granted to a token delegate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegateRole {
    Sale,
    Transfer,
    Utility,
    Staking,
    Standard,
    LockedTransfer,
    Migration,
}

impl DelegateRole {
    fn from_byte(byte: u8) -> Result<Self, ProtocolError> {
        match byte {
            0 => Ok(Self::Sale),
            1 => Ok(Self::Transfer),
            2 => Ok(Self::Utility),
            3 => Ok(Self::Staking),
            4 => Ok(Self::Standard),
            5 => Ok(Self::LockedTransfer),
            6 => Ok(Self::Migration),
            b => Err(ProtocolError::Layout(format!("unknown delegate role: {b}"))),
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            Self::Sale => 0,
            Self::Transfer => 1,
            Self::Utility => 2,
            Self::Staking => 3,
            Self::Standard => 4,
            Self::LockedTransfer => 5,
            Self::Migration => 6,
        }
    }
}

/// Delegation/lock state of a token, kept by the token-metadata program.
///
/// The layout is partially variable: the state byte sits at a fixed offset,
/// but an optional embedded ruleset revision shifts everything after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenDelegationRecord {
    pub state: DelegationState,
    pub delegate: Option<Address>,
    pub delegate_role: Option<DelegateRole>,
}

impl TokenDelegationRecord {
    /// Offset of the state byte.
    const STATE_OFFSET: usize = 2;

    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        let kind = "TokenDelegationRecord";
        check_len(buf, Self::STATE_OFFSET + 2, kind)?;

        let state = DelegationState::from_byte(buf[Self::STATE_OFFSET])?;

        // A 1-byte discriminant at offset 3 signals an embedded 8-byte
        // ruleset revision; skip it when present.
        let mut cursor = Self::STATE_OFFSET + 1;
        cursor += if buf[cursor] == 0 { 1 } else { 9 };

        check_len(buf, cursor + 1, kind)?;
        let delegate_present = buf[cursor] != 0;
        cursor += 1;

        if !delegate_present {
            return Ok(TokenDelegationRecord {
                state,
                delegate: None,
                delegate_role: None,
            });
        }

        check_len(buf, cursor + 32 + 1, kind)?;
        let delegate = read_address(buf, cursor);
        cursor += 32;

        let role_present = buf[cursor] != 0;
        cursor += 1;

        let delegate_role = if role_present {
            check_len(buf, cursor + 1, kind)?;
            Some(DelegateRole::from_byte(buf[cursor])?)
        } else {
            None
        };

        Ok(TokenDelegationRecord {
            state,
            delegate: Some(delegate),
            delegate_role,
        })
    }

    /// Encode in the canonical form without a ruleset revision.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::STATE_OFFSET + 2 + 34);
        buf.extend_from_slice(&[0u8; Self::STATE_OFFSET]);
        buf.push(self.state.to_byte());
        buf.push(0); // no ruleset revision

        match &self.delegate {
            None => buf.push(0),
            Some(delegate) => {
                buf.push(1);
                buf.extend_from_slice(delegate);
                match self.delegate_role {
                    None => buf.push(0),
                    Some(role) => {
                        buf.push(1);
                        buf.push(role.to_byte());
                    }
                }
            }
        }

        buf
    }
}
