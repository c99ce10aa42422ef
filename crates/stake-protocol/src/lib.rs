//! Protocol layer for the GMRX NFT staking-reward program.
//!
//! This crate is the pure, synchronous core of the client: deterministic
//! program-derived-address computation, the fixed-layout binary codec for
//! the program's account records, instruction builders for all nine program
//! operations, and the transaction wire format with Ed25519 signing. It
//! does not depend on `solana-sdk`; the handful of derivations and layouts
//! the client needs are implemented directly.
//!
//! Nothing here performs I/O; network access lives behind the narrow
//! client interface in the companion `stake-client` crate.

pub mod address;
pub mod error;
pub mod instruction;
pub mod records;
pub mod transaction;

// Re-export key public types for ergonomic imports.
pub use address::{
    address_to_bytes, bytes_to_address, find_program_address, Address, REWARD_PROGRAM_ID,
    SYSTEM_PROGRAM_ID, TOKEN_METADATA_PROGRAM_ID, TOKEN_PROGRAM_ID,
};
pub use error::ProtocolError;
pub use instruction::{
    build_claim_batch, build_create_claim, build_delegate_approve, build_delegate_revoke,
    build_delete_account, build_execute_claim, build_lock, build_register_stake_record,
    build_set_config, build_unlock, AccountMeta, Instruction, SetConfigArgs, OMITTED_ACCOUNT,
};
pub use records::{
    ClaimRecord, Config, DelegateRole, DelegationState, NftRecord, TokenDelegationRecord,
};
pub use transaction::{
    compile_transaction, decode_compact_u16, encode_compact_u16, serialize_message,
    sign_transaction, CompiledInstruction, Transaction,
};
