//! Shared primitives and data model for the cross-chain atomic swap
//! escrows: timelock staging, keccak hashlocks, sorted-pair Merkle proofs,
//! partial-fill arithmetic, the Dutch-auction curve, linear balances, the
//! error taxonomy, and the event schema. Both the source-side and
//! destination-side contracts build on this crate.

pub mod auction;
pub mod balance;
pub mod error;
pub mod events;
pub mod fill;
pub mod hashlock;
pub mod merkle;
pub mod timelocks;
pub mod types;

pub use auction::{current_taking_amount, required_taking_amount};
pub use balance::LockedBalance;
pub use error::EscrowError;
pub use fill::{deposit_portion, expected_fill_index, fill_amount, mul_div, MAX_PARTS};
pub use hashlock::{decode_hash32, decode_secret, keccak256, verify_hashlock};
pub use merkle::{leaf_hash, verify_secret_leaf, MerkleProof};
pub use timelocks::{DstStage, SrcStage, TimelockStage, Timelocks};
pub use types::{EscrowStatus, Immutables};
