//! Destination-side escrow contract for cross-chain atomic swaps.
//!
//! A taker (the resolver acting on the destination chain) locks its
//! inventory plus a safety deposit against the order's hashlock (or, for
//! partial fills, against the Merkle root of secrets), and the maker is
//! paid out share-by-share as secrets surface. The cancellation window is
//! bounded by the observed source-side cancellation timestamp so the
//! destination lock always releases first.

use near_sdk::borsh::{self, BorshDeserialize, BorshSerialize};
use near_sdk::collections::LookupMap;
use near_sdk::serde::{Deserialize, Serialize};
use near_sdk::{
    env, near_bindgen, require, AccountId, NearToken, PanicOnDefault, Promise,
};

use escrow_common::events::{EscrowCancelled, EscrowCreated, EscrowWithdrawn, FundsRescued};
use escrow_common::{
    decode_hash32, decode_secret, verify_hashlock, EscrowError, EscrowStatus, Immutables,
    LockedBalance, MerkleProof, TimelockStage, Timelocks, MAX_PARTS,
};

mod escrow;

pub use escrow::{DstEscrow, DstEscrowView, MerkleState};

/// Seven days, in seconds.
const DEFAULT_RESCUE_DELAY: u32 = 604_800;
/// 0.1 NEAR in yocto.
const DEFAULT_MIN_SAFETY_DEPOSIT: u128 = 100_000_000_000_000_000_000_000;

#[near_bindgen]
#[derive(BorshDeserialize, BorshSerialize, PanicOnDefault)]
pub struct EscrowDst {
    owner: AccountId,
    rescue_delay: u32,
    min_safety_deposit: u128,
    escrows: LookupMap<u64, DstEscrow>,
    next_escrow_id: u64,
}

#[near_bindgen]
impl EscrowDst {
    #[init]
    pub fn new(
        owner: AccountId,
        rescue_delay: Option<u32>,
        min_safety_deposit: Option<u128>,
    ) -> Self {
        let rescue_delay = rescue_delay.unwrap_or(DEFAULT_RESCUE_DELAY);
        let min_safety_deposit = min_safety_deposit.unwrap_or(DEFAULT_MIN_SAFETY_DEPOSIT);
        require!(rescue_delay > 0, "rescue delay must be positive");
        require!(min_safety_deposit > 0, "safety deposit floor must be positive");
        Self {
            owner,
            rescue_delay,
            min_safety_deposit,
            escrows: LookupMap::new(b"e".to_vec()),
            next_escrow_id: 0,
        }
    }

    /// Taker locks principal plus safety deposit against the order's
    /// hashlock (or Merkle root, with `allow_partial_fills`). The
    /// escrow's own cancellation must open no later than the source
    /// side's, as observed by the caller.
    #[payable]
    #[handle_result]
    pub fn create_escrow(
        &mut self,
        order_hash: String,
        hashlock: String,
        maker: AccountId,
        amount: u128,
        safety_deposit: u128,
        allow_partial_fills: bool,
        parts_amount: u64,
        timelocks: Timelocks,
        src_cancellation_timestamp: u64,
    ) -> Result<u64, EscrowError> {
        let now = env::block_timestamp_ms();
        let taker = env::predecessor_account_id();
        let attached = env::attached_deposit().as_yoctonear();

        let order_hash = decode_hash32(&order_hash, EscrowError::InvalidOrderHash)?;
        let hashlock = decode_hash32(&hashlock, EscrowError::InvalidHashlock)?;
        if amount == 0 || attached != amount + safety_deposit {
            return Err(EscrowError::InvalidAmount);
        }
        if safety_deposit < self.min_safety_deposit {
            return Err(EscrowError::InvalidSafetyDeposit);
        }
        let parts_ok = if allow_partial_fills {
            (1..=MAX_PARTS).contains(&parts_amount)
        } else {
            parts_amount == 0
        };
        if !parts_ok {
            return Err(EscrowError::InvalidPartialFill);
        }

        let timelocks = timelocks.with_deployed_at(now);
        timelocks.validate()?;
        // the destination lock must be cancellable before the source one
        if timelocks.get_timestamp(TimelockStage::DstCancellation) > src_cancellation_timestamp {
            return Err(EscrowError::InvalidTimelocks);
        }

        let escrow = DstEscrow {
            immutables: Immutables {
                order_hash,
                hashlock,
                maker,
                taker: taker.clone(),
                resolver: taker.clone(),
                amount,
                safety_deposit,
                timelocks,
            },
            principal: LockedBalance::new(amount),
            deposit: LockedBalance::new(safety_deposit),
            status: EscrowStatus::Active,
            merkle: allow_partial_fills.then(|| MerkleState {
                parts_amount,
                used_indices: Vec::new(),
                filled: 0,
            }),
            revealed_secret: None,
            rescue_delay: self.rescue_delay,
        };

        let escrow_id = self.next_escrow_id;
        self.next_escrow_id += 1;

        EscrowCreated {
            escrow_id,
            order_hash: hex::encode(order_hash),
            hashlock: hex::encode(hashlock),
            maker: &escrow.immutables.maker,
            taker: &taker,
            amount,
            safety_deposit,
            resolver: &taker,
            created_at: now,
            is_merkle: allow_partial_fills,
            parts_amount,
        }
        .emit();

        self.escrows.insert(&escrow_id, &escrow);
        Ok(escrow_id)
    }

    /// Reveal a secret and pay the maker. Single-fill escrows settle in
    /// one step; multi-part escrows release the share for `secret_index`
    /// (with its Merkle proof) and stay active until the last share. The
    /// safety deposit, or its proportional slice, pays the caller.
    #[handle_result]
    pub fn withdraw(
        &mut self,
        escrow_id: u64,
        secret: String,
        secret_index: Option<u64>,
        merkle_proof: Option<MerkleProof>,
    ) -> Result<Promise, EscrowError> {
        let now = env::block_timestamp_ms();
        let caller = env::predecessor_account_id();
        let mut escrow = self
            .escrows
            .get(&escrow_id)
            .ok_or(EscrowError::EscrowNotFound)?;

        escrow.authorize_withdraw(&caller, now)?;
        let secret = decode_secret(&secret)?;

        let (principal_slice, deposit_slice, merkle_index) = if escrow.merkle.is_some() {
            let index = secret_index.ok_or(EscrowError::InvalidPartialFill)?;
            let proof = merkle_proof.ok_or(EscrowError::InvalidMerkleProof)?;
            escrow.verify_share(&secret, index, &proof)?;
            let (principal_slice, deposit_slice) = escrow.settle_share(index)?;
            (principal_slice, deposit_slice, Some(index))
        } else {
            verify_hashlock(&secret, &escrow.immutables.hashlock)?;
            escrow.status = EscrowStatus::Withdrawn;
            (escrow.principal.take_all(), escrow.deposit.take_all(), None)
        };
        escrow.revealed_secret = Some(secret);

        EscrowWithdrawn {
            escrow_id,
            order_hash: hex::encode(escrow.immutables.order_hash),
            secret: hex::encode(secret),
            withdrawn_by: &caller,
            maker: &escrow.immutables.maker,
            taker: &escrow.immutables.taker,
            amount: principal_slice.value(),
            withdrawn_at: now,
            merkle_index,
        }
        .emit();

        let maker = escrow.immutables.maker.clone();
        self.escrows.insert(&escrow_id, &escrow);
        Ok(transfer(&maker, principal_slice).then(transfer(&caller, deposit_slice)))
    }

    /// Return the inventory to the taker once the cancellation stage
    /// opens. Resolver-only: the destination side has no public
    /// cancellation.
    #[handle_result]
    pub fn cancel(&mut self, escrow_id: u64) -> Result<Promise, EscrowError> {
        let now = env::block_timestamp_ms();
        let caller = env::predecessor_account_id();
        let mut escrow = self
            .escrows
            .get(&escrow_id)
            .ok_or(EscrowError::EscrowNotFound)?;

        escrow.authorize_cancel(&caller, now)?;

        escrow.status = EscrowStatus::Cancelled;
        let principal = escrow.principal.take_all();
        let deposit = escrow.deposit.take_all();

        EscrowCancelled {
            escrow_id,
            order_hash: hex::encode(escrow.immutables.order_hash),
            maker: &escrow.immutables.maker,
            taker: &escrow.immutables.taker,
            cancelled_by: &caller,
            amount: principal.value(),
            cancelled_at: now,
        }
        .emit();

        let taker = escrow.immutables.taker.clone();
        self.escrows.insert(&escrow_id, &escrow);
        Ok(transfer(&taker, principal).then(transfer(&caller, deposit)))
    }

    /// After the rescue delay anyone may drain a stuck escrow: principal
    /// back to the taker who funded it, deposit to the rescuer, record
    /// deleted.
    #[handle_result]
    pub fn rescue_escrow(&mut self, escrow_id: u64) -> Result<(), EscrowError> {
        let now = env::block_timestamp_ms();
        let caller = env::predecessor_account_id();
        let mut escrow = self
            .escrows
            .get(&escrow_id)
            .ok_or(EscrowError::EscrowNotFound)?;

        if now < escrow.rescue_start() {
            return Err(EscrowError::TimelockNotExpired);
        }

        let principal = escrow.principal.take_all();
        let deposit = escrow.deposit.take_all();

        FundsRescued {
            escrow_id,
            rescuer: &caller,
            principal_amount: principal.value(),
            deposit_amount: deposit.value(),
        }
        .emit();

        self.escrows.remove(&escrow_id);
        if principal.is_zero() {
            principal.destroy_zero()?;
        } else {
            transfer(&escrow.immutables.taker, principal);
        }
        if deposit.is_zero() {
            deposit.destroy_zero()?;
        } else {
            transfer(&caller, deposit);
        }
        Ok(())
    }

    // Admin surface. Updates never touch existing objects: escrows
    // snapshot `rescue_delay` at creation.

    #[handle_result]
    pub fn set_rescue_delay(&mut self, rescue_delay: u32) -> Result<(), EscrowError> {
        self.assert_owner()?;
        if rescue_delay == 0 {
            return Err(EscrowError::InvalidTime);
        }
        self.rescue_delay = rescue_delay;
        Ok(())
    }

    #[handle_result]
    pub fn set_min_safety_deposit(&mut self, min_safety_deposit: u128) -> Result<(), EscrowError> {
        self.assert_owner()?;
        if min_safety_deposit == 0 {
            return Err(EscrowError::InvalidSafetyDeposit);
        }
        self.min_safety_deposit = min_safety_deposit;
        Ok(())
    }

    // View methods

    pub fn get_escrow(&self, escrow_id: u64) -> Option<DstEscrowView> {
        let now = env::block_timestamp_ms();
        self.escrows.get(&escrow_id).map(|e| e.view(now))
    }

    pub fn get_current_stage(&self, escrow_id: u64) -> Option<String> {
        let now = env::block_timestamp_ms();
        self.escrows
            .get(&escrow_id)
            .map(|e| e.current_stage(now).label().to_string())
    }

    pub fn get_config(&self) -> ConfigView {
        ConfigView {
            owner: self.owner.clone(),
            rescue_delay: self.rescue_delay,
            min_safety_deposit: self.min_safety_deposit,
        }
    }

    fn assert_owner(&self) -> Result<(), EscrowError> {
        if env::predecessor_account_id() != self.owner {
            return Err(EscrowError::Unauthorized);
        }
        Ok(())
    }
}

fn transfer(to: &AccountId, balance: LockedBalance) -> Promise {
    Promise::new(to.clone()).transfer(NearToken::from_yoctonear(balance.into_yocto()))
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(crate = "near_sdk::serde")]
pub struct ConfigView {
    pub owner: AccountId,
    pub rescue_delay: u32,
    pub min_safety_deposit: u128,
}
