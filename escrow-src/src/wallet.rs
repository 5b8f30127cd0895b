use near_sdk::borsh::{self, BorshDeserialize, BorshSerialize};
use near_sdk::serde::{Deserialize, Serialize};
use near_sdk::AccountId;

use escrow_common::{
    current_taking_amount, decode_hash32, expected_fill_index, required_taking_amount,
    verify_secret_leaf, EscrowError, LockedBalance, MerkleProof, MAX_PARTS,
};

/// Source-side funding vessel. A maker publishes one wallet per order;
/// resolvers then drain it into escrows, each drain guarded by the
/// Dutch-auction curve and, for partial fills, by the Merkle tree of
/// secrets. The wallet only ever loses balance, and `last_used_index`
/// only ever rises.
#[derive(BorshDeserialize, BorshSerialize, Debug)]
pub struct Wallet {
    pub maker: AccountId,
    pub order_hash: [u8; 32],
    /// Single-fill hashlock, or the Merkle root when partial fills are
    /// allowed.
    pub hashlock: [u8; 32],
    pub allow_partial_fills: bool,
    /// N: number of parts the order may be split into. Zero in
    /// single-fill mode; the tree then has N+1 secret leaves.
    pub parts_amount: u64,
    pub making_amount: u128,
    pub taking_amount_start: u128,
    pub taking_amount_end: u128,
    /// Auction window in seconds from `deployed_at`.
    pub duration: u32,
    pub balance: LockedBalance,
    /// Highest secret index consumed by a drain so far. Fill indices run
    /// 1..=N, so zero means untouched.
    pub last_used_index: u64,
    pub is_active: bool,
    pub deployed_at: u64,
    /// Snapshot of the factory's rescue delay (seconds) at creation.
    pub rescue_delay: u32,
}

impl Wallet {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        maker: AccountId,
        order_hash: &str,
        hashlock: &str,
        making_amount: u128,
        taking_amount_start: u128,
        taking_amount_end: u128,
        duration: u32,
        allow_partial_fills: bool,
        parts_amount: u64,
        now_ms: u64,
        rescue_delay: u32,
    ) -> Result<Self, EscrowError> {
        let order_hash = decode_hash32(order_hash, EscrowError::InvalidOrderHash)?;
        let hashlock = decode_hash32(hashlock, EscrowError::InvalidHashlock)?;
        if making_amount == 0 || taking_amount_end == 0 || taking_amount_start < taking_amount_end
        {
            return Err(EscrowError::InvalidAmount);
        }
        if duration == 0 {
            return Err(EscrowError::InvalidTime);
        }
        let parts_ok = if allow_partial_fills {
            (1..=MAX_PARTS).contains(&parts_amount)
        } else {
            parts_amount == 0
        };
        if !parts_ok {
            return Err(EscrowError::InvalidPartialFill);
        }
        Ok(Self {
            maker,
            order_hash,
            hashlock,
            allow_partial_fills,
            parts_amount,
            making_amount,
            taking_amount_start,
            taking_amount_end,
            duration,
            balance: LockedBalance::new(making_amount),
            last_used_index: 0,
            is_active: true,
            deployed_at: now_ms,
            rescue_delay,
        })
    }

    pub fn filled(&self) -> u128 {
        self.making_amount - self.balance.value()
    }

    /// Validates a drain of `amount` against the wallet's auction curve
    /// and secret commitments. On success the caller may split the
    /// principal and bind `secret_hashlock` as the escrow's hashlock.
    pub fn authorize_drain(
        &self,
        amount: u128,
        taking_amount: u128,
        secret_index: u64,
        secret_hashlock: &[u8; 32],
        merkle_proof: &MerkleProof,
        now_ms: u64,
    ) -> Result<(), EscrowError> {
        if !self.is_active {
            return Err(EscrowError::WalletInactive);
        }
        if amount == 0 {
            return Err(EscrowError::InvalidAmount);
        }
        if amount > self.balance.value() {
            return Err(EscrowError::InsufficientBalance);
        }

        let required = required_taking_amount(
            self.deployed_at,
            self.duration,
            self.taking_amount_start,
            self.taking_amount_end,
            self.making_amount,
            amount,
            now_ms,
        );
        if taking_amount < required {
            return Err(EscrowError::InvalidAmount);
        }

        if self.allow_partial_fills {
            if secret_index <= self.last_used_index {
                return Err(EscrowError::SecretAlreadyUsed);
            }
            if secret_index > self.parts_amount {
                return Err(EscrowError::InvalidPartialFill);
            }
            let expected =
                expected_fill_index(self.making_amount, self.filled(), amount, self.parts_amount)?;
            if secret_index != expected {
                return Err(EscrowError::InvalidPartialFill);
            }
            verify_secret_leaf(secret_index, secret_hashlock, merkle_proof, &self.hashlock)?;
        } else {
            if secret_index != 0 || !merkle_proof.is_empty() {
                return Err(EscrowError::InvalidPartialFill);
            }
            if secret_hashlock != &self.hashlock {
                return Err(EscrowError::InvalidHashlock);
            }
            // one secret guards one escrow: single-fill drains take the
            // whole remaining balance
            if amount != self.balance.value() {
                return Err(EscrowError::InvalidAmount);
            }
        }
        Ok(())
    }

    pub fn current_taking_amount(&self, now_ms: u64) -> u128 {
        current_taking_amount(
            self.deployed_at,
            self.duration,
            self.taking_amount_start,
            self.taking_amount_end,
            now_ms,
        )
    }

    pub fn rescue_start(&self) -> u64 {
        self.deployed_at + self.rescue_delay as u64 * 1000
    }

    pub fn view(&self, now_ms: u64) -> WalletView {
        WalletView {
            maker: self.maker.clone(),
            order_hash: hex::encode(self.order_hash),
            hashlock: hex::encode(self.hashlock),
            allow_partial_fills: self.allow_partial_fills,
            parts_amount: self.parts_amount,
            making_amount: self.making_amount,
            taking_amount_start: self.taking_amount_start,
            taking_amount_end: self.taking_amount_end,
            duration: self.duration,
            balance: self.balance.value(),
            last_used_index: self.last_used_index,
            is_active: self.is_active,
            deployed_at: self.deployed_at,
            current_taking_amount: self.current_taking_amount(now_ms),
        }
    }
}

/// Read-only projection for off-chain watchers.
#[derive(Serialize, Deserialize, Debug)]
#[serde(crate = "near_sdk::serde")]
pub struct WalletView {
    pub maker: AccountId,
    pub order_hash: String,
    pub hashlock: String,
    pub allow_partial_fills: bool,
    pub parts_amount: u64,
    pub making_amount: u128,
    pub taking_amount_start: u128,
    pub taking_amount_end: u128,
    pub duration: u32,
    pub balance: u128,
    pub last_used_index: u64,
    pub is_active: bool,
    pub deployed_at: u64,
    pub current_taking_amount: u128,
}
