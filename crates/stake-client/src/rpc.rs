//! Narrow interface over the network collaborator.
//!
//! The protocol core is pure; everything that touches the cluster goes
//! through [`ChainClient`]. Implementations own the connection state and
//! are constructed from an explicit [`ClusterConfig`]; there is no
//! module-level cluster selection.

use serde::{Deserialize, Serialize};
use stake_protocol::Address;

use crate::error::ClientError;

/// Commitment level requested from the cluster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

/// Connection parameters for a [`ChainClient`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// RPC endpoint URL.
    pub rpc_url: String,
    /// Commitment level for reads and confirmations.
    #[serde(default)]
    pub commitment: Commitment,
}

/// A memcmp filter for account enumeration: raw bytes compared at a fixed
/// offset into the account data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemcmpFilter {
    pub offset: usize,
    pub bytes: Vec<u8>,
}

impl MemcmpFilter {
    /// Filter claim records by their generation field (4-byte little-endian
    /// value at offset 0).
    pub fn generation(generation: i32) -> Self {
        MemcmpFilter {
            offset: 0,
            bytes: generation.to_le_bytes().to_vec(),
        }
    }
}

/// The services the core consumes from the network layer. Everything else
/// in this crate is synchronous and stateless; suspension happens only
/// inside implementations of this trait.
pub trait ChainClient: Send + Sync {
    /// Fetch the raw data of an account, or `AccountNotFound`.
    fn fetch_account_bytes(&self, address: &Address) -> Result<Vec<u8>, ClientError>;

    /// A recent blockhash, used as the freshness token at signing time.
    fn latest_blockhash(&self) -> Result<[u8; 32], ClientError>;

    /// Current cluster time as a Unix timestamp.
    fn current_time(&self) -> Result<i64, ClientError>;

    /// Submit a signed wire-format transaction; returns its signature.
    fn submit_signed(&self, wire: &[u8]) -> Result<String, ClientError>;

    /// Block until the transaction is confirmed or the deadline passes.
    fn await_confirmation(&self, signature: &str) -> Result<(), ClientError>;

    /// Enumerate accounts owned by `program_id` matching all filters.
    fn accounts_by_filter(
        &self,
        program_id: &Address,
        filters: &[MemcmpFilter],
    ) -> Result<Vec<(Address, Vec<u8>)>, ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_filter_is_le_at_offset_zero() {
        let filter = MemcmpFilter::generation(0x01020304);
        assert_eq!(filter.offset, 0);
        assert_eq!(filter.bytes, vec![0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn cluster_config_deserializes_with_default_commitment() {
        let config: ClusterConfig =
            serde_json::from_str(r#"{"rpc_url": "https://api.mainnet-beta.solana.com"}"#)
                .unwrap();
        assert_eq!(config.commitment, Commitment::Confirmed);
    }

    #[test]
    fn cluster_config_roundtrip() {
        let config = ClusterConfig {
            rpc_url: "http://localhost:8899".into(),
            commitment: Commitment::Finalized,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("finalized"));
        let back: ClusterConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
