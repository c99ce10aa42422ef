//! Typed read path: fetch raw account bytes through the client and decode
//! them into records, plus the reward arithmetic mirrored from the on-chain
//! program so callers can predict a claim before submitting it.

use stake_protocol::address::{
    associated_token_address, claim_record_address, config_address, stake_record_address,
    token_delegation_record_address, Address, REWARD_PROGRAM_ID,
};
use stake_protocol::records::{ClaimRecord, Config, NftRecord, TokenDelegationRecord};
use stake_protocol::ProtocolError;

use crate::error::ClientError;
use crate::rpc::{ChainClient, MemcmpFilter};

/// Fetch and decode the singleton config record.
pub fn fetch_config(client: &dyn ChainClient) -> Result<Config, ClientError> {
    let (address, _) = config_address()?;
    let bytes = client.fetch_account_bytes(&address)?;
    Ok(Config::decode(&bytes)?)
}

/// Fetch and decode the stake record for a mint.
pub fn fetch_stake_record(
    client: &dyn ChainClient,
    mint: &Address,
) -> Result<NftRecord, ClientError> {
    let (address, _) = stake_record_address(mint)?;
    let bytes = client.fetch_account_bytes(&address)?;
    Ok(NftRecord::decode(&bytes)?)
}

/// Fetch and decode one claim record by wallet and nonce.
pub fn fetch_claim_record(
    client: &dyn ChainClient,
    wallet: &Address,
    nonce: &[u8; 32],
) -> Result<ClaimRecord, ClientError> {
    let (address, _) = claim_record_address(wallet, nonce)?;
    let bytes = client.fetch_account_bytes(&address)?;
    Ok(ClaimRecord::decode(&bytes)?)
}

/// Fetch and decode the delegation record for a wallet's token account of
/// `mint`.
pub fn fetch_token_delegation_record(
    client: &dyn ChainClient,
    wallet: &Address,
    mint: &Address,
) -> Result<TokenDelegationRecord, ClientError> {
    let (token, _) = associated_token_address(wallet, mint)?;
    let (address, _) = token_delegation_record_address(mint, &token)?;
    let bytes = client.fetch_account_bytes(&address)?;
    Ok(TokenDelegationRecord::decode(&bytes)?)
}

/// Enumerate all claim records created since `since`, scanning generation
/// buckets one by one up to the current time.
///
/// The scan is linear in the number of elapsed generations; the RPC filter
/// model offers no compound alternative.
pub fn claim_records_since(
    client: &dyn ChainClient,
    since: i64,
) -> Result<Vec<(Address, ClaimRecord)>, ClientError> {
    let config = fetch_config(client)?;
    let now = client.current_time()?;

    let first = generation_index(since, &config)?;
    let last = generation_index(now, &config)?;

    let mut records = Vec::new();
    for generation in first..=last {
        let hits = client.accounts_by_filter(
            &REWARD_PROGRAM_ID,
            &[MemcmpFilter::generation(generation)],
        )?;
        tracing::debug!(generation, hits = hits.len(), "scanned claim generation");

        for (address, bytes) in hits {
            records.push((address, ClaimRecord::decode(&bytes)?));
        }
    }

    Ok(records)
}

// ---------------------------------------------------------------------------
// Reward arithmetic (mirror of the on-chain program)
// ---------------------------------------------------------------------------

/// Generation bucket of a timestamp: `floor(time / generation_duration)`.
///
/// The on-chain clock is 32 bits wide; timestamps outside that range and
/// configs with a non-positive generation duration are rejected rather
/// than wrapped or divided through.
pub fn generation_index(timestamp: i64, config: &Config) -> Result<i32, ClientError> {
    if config.generation_duration <= 0 {
        return Err(ProtocolError::Layout(format!(
            "non-positive generation duration: {}",
            config.generation_duration
        ))
        .into());
    }
    let timestamp = i32::try_from(timestamp).map_err(|_| {
        ProtocolError::Layout(format!(
            "timestamp {timestamp} exceeds the 32-bit chain clock"
        ))
    })?;

    Ok(timestamp / config.generation_duration)
}

/// Reward an `execute-claim` would yield for this stake record at `now`:
/// the initial bonus on the first claim plus one unit per elapsed
/// accumulation period, capped by the unclaimed remainder.
pub fn claimable_amount(
    config: &Config,
    record: &NftRecord,
    now: i32,
) -> Result<i32, ClientError> {
    if config.accumulation_duration <= 0 {
        return Err(ProtocolError::Layout(format!(
            "non-positive accumulation duration: {}",
            config.accumulation_duration
        ))
        .into());
    }

    let base_reward = if record.claimed_amount == 0 {
        config.initial_reward
    } else {
        0
    };
    let stake_duration = now - record.last_claimed_at;

    Ok(i32::min(
        record.total_amount - record.claimed_amount,
        base_reward + stake_duration / config.accumulation_duration,
    ))
}
