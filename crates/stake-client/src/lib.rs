//! Client layer for the GMRX NFT staking-reward program.
//!
//! Builds on `stake-protocol` and talks to the cluster exclusively through
//! the narrow [`rpc::ChainClient`] trait: typed account reads, claim-record
//! enumeration by generation, and the claim workflow that assembles, signs,
//! submits, and confirms chunked claim transactions.

pub mod claims;
pub mod error;
pub mod reads;
pub mod rpc;

#[cfg(test)]
mod testing;

pub use claims::{claim_rewards, generate_claim_nonce, submit_claim_batch, ClaimOutcome};
pub use error::ClientError;
pub use reads::{
    claim_records_since, claimable_amount, fetch_claim_record, fetch_config, fetch_stake_record,
    fetch_token_delegation_record, generation_index,
};
pub use rpc::{ChainClient, ClusterConfig, Commitment, MemcmpFilter};
