use near_sdk::borsh::{self, BorshDeserialize, BorshSerialize};
use near_sdk::serde::{Deserialize, Serialize};
use near_sdk::AccountId;

use crate::timelocks::Timelocks;

/// Parameters bound immutably to an escrow at creation.
#[derive(BorshDeserialize, BorshSerialize, Clone, Debug)]
pub struct Immutables {
    pub order_hash: [u8; 32],
    /// Single-fill hashlock, or the Merkle root in multi-part mode, or the
    /// proven leaf secret-hash for a source escrow created by a partial
    /// drain.
    pub hashlock: [u8; 32],
    pub maker: AccountId,
    /// Recipient of the source-side principal.
    pub taker: AccountId,
    /// The party with exclusive rights during the private stages.
    pub resolver: AccountId,
    pub amount: u128,
    pub safety_deposit: u128,
    pub timelocks: Timelocks,
}

#[derive(
    BorshDeserialize, BorshSerialize, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
)]
#[serde(crate = "near_sdk::serde")]
pub enum EscrowStatus {
    Active,
    Withdrawn,
    Cancelled,
}
