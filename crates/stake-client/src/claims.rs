//! Claim assembly and submission.
//!
//! A claim over N mints is one atomic transaction: `create-claim`, then N
//! idempotent `register-stake-record` instructions, then N `execute-claim`
//! instructions, all sharing one freshly generated nonce so every
//! instruction resolves the same claim PDA. Large mint sets are split into
//! fixed-size chunks submitted concurrently; each chunk is an independently
//! retryable unit with its own outcome.

use rand_core::{OsRng, RngCore};
use zeroize::Zeroize;

use stake_protocol::records::validate_destination_address;
use stake_protocol::{
    build_claim_batch, compile_transaction, sign_transaction, Address, ProtocolError,
};

use crate::error::ClientError;
use crate::rpc::ChainClient;

/// Generate a fresh 32-byte claim nonce from the OS RNG.
pub fn generate_claim_nonce() -> [u8; 32] {
    let mut nonce = [0u8; 32];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Wallet address (Ed25519 public key) for a 32-byte signing seed.
pub fn wallet_address(seed: &[u8; 32]) -> Address {
    let mut seed = *seed;
    let key = ed25519_dalek::SigningKey::from_bytes(&seed);
    seed.zeroize();
    key.verifying_key().to_bytes()
}

/// Result of one claim chunk. Chunks succeed or fail independently; a
/// failed chunk can be retried on its own without touching the others.
#[derive(Debug)]
pub struct ClaimOutcome {
    pub mints: Vec<Address>,
    pub result: Result<String, ClientError>,
}

/// Build, sign, submit, and confirm one claim transaction covering `mints`.
///
/// The blockhash is fetched immediately before signing so the freshness
/// window is as wide as possible.
pub fn submit_claim_batch(
    client: &dyn ChainClient,
    wallet_seed: &[u8; 32],
    mints: &[Address],
    destination: &str,
) -> Result<String, ClientError> {
    let wallet = wallet_address(wallet_seed);
    let nonce = generate_claim_nonce();

    let instructions = build_claim_batch(&wallet, mints, destination, &nonce)?;

    let blockhash = client.latest_blockhash()?;
    let tx = compile_transaction(&instructions, &wallet, &blockhash)?;
    let wire = sign_transaction(&tx, &[*wallet_seed])?;

    let signature = client.submit_signed(&wire)?;
    tracing::info!(
        %signature,
        mints = mints.len(),
        instructions = instructions.len(),
        "submitted claim transaction"
    );

    client.await_confirmation(&signature)?;
    tracing::debug!(%signature, "claim transaction confirmed");

    Ok(signature)
}

/// Claim rewards for `mints`, partitioned into chunks of `chunk_size`
/// submitted concurrently. Returns one outcome per chunk, in partition
/// order; there is no ordering or atomicity across chunks.
pub fn claim_rewards(
    client: &dyn ChainClient,
    wallet_seed: &[u8; 32],
    mints: &[Address],
    destination: &str,
    chunk_size: usize,
) -> Result<Vec<ClaimOutcome>, ClientError> {
    if mints.is_empty() {
        return Err(ProtocolError::TransactionBuild(
            "claim requires at least one mint".into(),
        )
        .into());
    }
    if chunk_size == 0 {
        return Err(ProtocolError::TransactionBuild("chunk size must be positive".into()).into());
    }
    // Reject a bad destination once, before spawning any work.
    validate_destination_address(destination)?;

    let chunk_count = mints.len().div_ceil(chunk_size);
    tracing::info!(
        mints = mints.len(),
        chunk_size,
        chunks = chunk_count,
        "claiming rewards"
    );

    let outcomes = std::thread::scope(|scope| {
        let handles: Vec<_> = mints
            .chunks(chunk_size)
            .map(|chunk| {
                let handle = scope
                    .spawn(move || submit_claim_batch(client, wallet_seed, chunk, destination));
                (chunk.to_vec(), handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(chunk_mints, handle)| {
                let result = handle
                    .join()
                    .unwrap_or_else(|_| Err(ClientError::Rpc("claim worker panicked".into())));
                if let Err(err) = &result {
                    tracing::warn!(mints = chunk_mints.len(), %err, "claim chunk failed");
                }
                ClaimOutcome {
                    mints: chunk_mints,
                    result,
                }
            })
            .collect()
    });

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockClient;
    use stake_protocol::decode_compact_u16;

    const SEED: [u8; 32] = [0x42; 32];
    const DESTINATION: &str = "0x1234567890abcdef1234567890abcdef12345678";

    fn mints(n: u8) -> Vec<Address> {
        (0..n).map(|i| [i + 1; 32]).collect()
    }

    /// Number of instructions in a signed single-signer wire transaction.
    fn instruction_count(wire: &[u8]) -> u16 {
        // compact-u16 signature count (1 byte for 1) + 64-byte signature.
        let message = &wire[1 + 64..];
        let (num_accounts, consumed) = decode_compact_u16(&message[3..]).unwrap();
        let offset = 3 + consumed + 32 * num_accounts as usize + 32;
        let (count, _) = decode_compact_u16(&message[offset..]).unwrap();
        count
    }

    #[test]
    fn nonce_is_fresh_per_call() {
        assert_ne!(generate_claim_nonce(), generate_claim_nonce());
    }

    #[test]
    fn wallet_address_is_deterministic() {
        assert_eq!(wallet_address(&SEED), wallet_address(&SEED));
        assert_ne!(wallet_address(&SEED), wallet_address(&[0x43; 32]));
    }

    #[test]
    fn single_batch_submits_and_confirms() {
        let client = MockClient::new(1_700_000_000);
        let signature = submit_claim_batch(&client, &SEED, &mints(2), DESTINATION).unwrap();
        assert_eq!(signature, "sig-0");

        let submitted = client.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        // 1 create-claim + 2 register + 2 execute.
        assert_eq!(instruction_count(&submitted[0]), 5);
    }

    #[test]
    fn nine_mints_chunk_four_gives_three_chunks() {
        let client = MockClient::new(1_700_000_000);
        let outcomes = claim_rewards(&client, &SEED, &mints(9), DESTINATION, 4).unwrap();

        let sizes: Vec<usize> = outcomes.iter().map(|o| o.mints.len()).collect();
        assert_eq!(sizes, vec![4, 4, 1]);
        assert!(outcomes.iter().all(|o| o.result.is_ok()));

        let submitted = client.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 3);

        // Each chunk transaction carries 1 + 2N instructions; chunks run
        // concurrently, so compare as a multiset.
        let mut counts: Vec<u16> = submitted.iter().map(|w| instruction_count(w)).collect();
        counts.sort_unstable();
        assert_eq!(counts, vec![3, 9, 9]);
    }

    #[test]
    fn chunk_failures_are_independent() {
        let mut client = MockClient::new(1_700_000_000);
        client.fail_submit = true;

        let outcomes = claim_rewards(&client, &SEED, &mints(9), DESTINATION, 4).unwrap();
        assert_eq!(outcomes.len(), 3);
        for outcome in &outcomes {
            let err = outcome.result.as_ref().unwrap_err();
            assert!(matches!(err, ClientError::Submission(_)));
            assert!(err.is_retryable());
        }
    }

    #[test]
    fn unconfirmed_batch_surfaces_timeout() {
        let mut client = MockClient::new(1_700_000_000);
        client.fail_confirm = true;

        let err = submit_claim_batch(&client, &SEED, &mints(2), DESTINATION).unwrap_err();
        assert!(matches!(err, ClientError::ConfirmationTimeout { .. }));
        // The transaction went out exactly once; the outcome is ambiguous,
        // so the workflow must not resubmit.
        assert_eq!(client.submitted.lock().unwrap().len(), 1);
    }

    #[test]
    fn confirmation_timeout_is_not_retryable_per_chunk() {
        let mut client = MockClient::new(1_700_000_000);
        client.fail_confirm = true;

        let outcomes = claim_rewards(&client, &SEED, &mints(9), DESTINATION, 4).unwrap();
        assert_eq!(outcomes.len(), 3);
        for outcome in &outcomes {
            let err = outcome.result.as_ref().unwrap_err();
            assert!(matches!(err, ClientError::ConfirmationTimeout { .. }));
            assert!(!err.is_retryable());
        }
        // One submission per chunk, none repeated.
        assert_eq!(client.submitted.lock().unwrap().len(), 3);
    }

    #[test]
    fn rejects_empty_mints_and_zero_chunk_size() {
        let client = MockClient::new(1_700_000_000);
        assert!(claim_rewards(&client, &SEED, &[], DESTINATION, 4).is_err());
        assert!(claim_rewards(&client, &SEED, &mints(3), DESTINATION, 0).is_err());
    }

    #[test]
    fn rejects_bad_destination_before_submitting() {
        let client = MockClient::new(1_700_000_000);
        let result = claim_rewards(&client, &SEED, &mints(3), "0xnothex", 4);
        assert!(result.is_err());
        assert!(client.submitted.lock().unwrap().is_empty());
    }
}
