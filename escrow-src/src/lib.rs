//! Source-side escrow contract for cross-chain atomic swaps.
//!
//! Makers fund shared [`Wallet`]s; resolvers drain them into
//! [`SrcEscrow`]s gated by the Dutch-auction curve and (for partial
//! fills) the Merkle tree of secrets. Settlement is staged by the
//! timelock schedule: finality lock, resolver-exclusive withdrawal,
//! public withdrawal, resolver-exclusive cancellation, public
//! cancellation. The safety deposit always pays whoever finalizes.

use near_sdk::borsh::{self, BorshDeserialize, BorshSerialize};
use near_sdk::collections::LookupMap;
use near_sdk::serde::{Deserialize, Serialize};
use near_sdk::{
    env, near_bindgen, require, AccountId, NearToken, PanicOnDefault, Promise,
};

use escrow_common::events::{
    EscrowCancelled, EscrowCreated, EscrowWithdrawn, FundsRescued, WalletClosed, WalletCreated,
};
use escrow_common::{
    decode_hash32, decode_secret, verify_hashlock, EscrowError, EscrowStatus, Immutables,
    LockedBalance, MerkleProof, Timelocks,
};

mod escrow;
mod wallet;

pub use escrow::{SrcEscrow, SrcEscrowView};
pub use wallet::{Wallet, WalletView};

/// Seven days, in seconds.
const DEFAULT_RESCUE_DELAY: u32 = 604_800;
/// 0.1 NEAR in yocto.
const DEFAULT_MIN_SAFETY_DEPOSIT: u128 = 100_000_000_000_000_000_000_000;

#[near_bindgen]
#[derive(BorshDeserialize, BorshSerialize, PanicOnDefault)]
pub struct EscrowSrc {
    owner: AccountId,
    rescue_delay: u32,
    min_safety_deposit: u128,
    wallets: LookupMap<u64, Wallet>,
    escrows: LookupMap<u64, SrcEscrow>,
    next_wallet_id: u64,
    next_escrow_id: u64,
}

#[near_bindgen]
impl EscrowSrc {
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
            wallets: LookupMap::new(b"w".to_vec()),
            escrows: LookupMap::new(b"e".to_vec()),
            next_wallet_id: 0,
            next_escrow_id: 0,
        }
    }

    /// Maker publishes a funding wallet for an order; the attached deposit
    /// is the making amount.
    #[payable]
    #[handle_result]
    pub fn create_wallet(
        &mut self,
        order_hash: String,
        taking_amount_start: u128,
        taking_amount_end: u128,
        duration: u32,
        hashlock: String,
        allow_partial_fills: bool,
        parts_amount: u64,
    ) -> Result<u64, EscrowError> {
        let now = env::block_timestamp_ms();
        let maker = env::predecessor_account_id();
        let making_amount = env::attached_deposit().as_yoctonear();

        let wallet = Wallet::new(
            maker.clone(),
            &order_hash,
            &hashlock,
            making_amount,
            taking_amount_start,
            taking_amount_end,
            duration,
            allow_partial_fills,
            parts_amount,
            now,
            self.rescue_delay,
        )?;

        let wallet_id = self.next_wallet_id;
        self.next_wallet_id += 1;

        WalletCreated {
            wallet_id,
            order_hash: hex::encode(wallet.order_hash),
            maker: &maker,
            initial_amount: making_amount,
            created_at: now,
        }
        .emit();

        self.wallets.insert(&wallet_id, &wallet);
        Ok(wallet_id)
    }

    /// Resolver drains a wallet into a source escrow. The attached deposit
    /// is the safety deposit; the principal is split out of the wallet.
    /// In partial-fill mode `secret_hashlock` is the leaf secret hash for
    /// `secret_index`, proven against the wallet's Merkle root here; the
    /// escrow then settles on a plain keccak check of that leaf.
    #[payable]
    #[handle_result]
    pub fn create_escrow(
        &mut self,
        wallet_id: u64,
        secret_hashlock: String,
        secret_index: u64,
        merkle_proof: Option<MerkleProof>,
        taker: AccountId,
        amount: u128,
        taking_amount: u128,
        timelocks: Timelocks,
    ) -> Result<u64, EscrowError> {
        let now = env::block_timestamp_ms();
        let resolver = env::predecessor_account_id();
        let safety_deposit = env::attached_deposit().as_yoctonear();

        let mut wallet = self
            .wallets
            .get(&wallet_id)
            .ok_or(EscrowError::WalletNotFound)?;

        if safety_deposit < self.min_safety_deposit {
            return Err(EscrowError::InvalidSafetyDeposit);
        }
        let timelocks = timelocks.with_deployed_at(now);
        timelocks.validate()?;

        let secret_hashlock = decode_hash32(&secret_hashlock, EscrowError::InvalidHashlock)?;
        let merkle_proof = merkle_proof.unwrap_or_default();
        wallet.authorize_drain(
            amount,
            taking_amount,
            secret_index,
            &secret_hashlock,
            &merkle_proof,
            now,
        )?;

        let principal = wallet.balance.split(amount)?;
        let merkle_index = if wallet.allow_partial_fills {
            wallet.last_used_index = secret_index;
            Some(secret_index)
        } else {
            None
        };
        if wallet.balance.is_zero() {
            wallet.is_active = false;
        }

        let escrow = SrcEscrow {
            immutables: Immutables {
                order_hash: wallet.order_hash,
                hashlock: secret_hashlock,
                maker: wallet.maker.clone(),
                taker,
                resolver: resolver.clone(),
                amount,
                safety_deposit,
                timelocks,
            },
            principal,
            deposit: LockedBalance::new(safety_deposit),
            status: EscrowStatus::Active,
            merkle_index,
            revealed_secret: None,
            rescue_delay: self.rescue_delay,
        };

        let escrow_id = self.next_escrow_id;
        self.next_escrow_id += 1;

        EscrowCreated {
            escrow_id,
            order_hash: hex::encode(escrow.immutables.order_hash),
            hashlock: hex::encode(escrow.immutables.hashlock),
            maker: &escrow.immutables.maker,
            taker: &escrow.immutables.taker,
            amount,
            safety_deposit,
            resolver: &resolver,
            created_at: now,
            is_merkle: merkle_index.is_some(),
            parts_amount: wallet.parts_amount,
        }
        .emit();

        self.wallets.insert(&wallet_id, &wallet);
        self.escrows.insert(&escrow_id, &escrow);
        Ok(escrow_id)
    }

    /// Reveal the secret and settle the escrow. Resolver-only during the
    /// exclusive stage, open to anyone during public withdrawal. The
    /// principal goes to the taker, the safety deposit to the caller.
    #[handle_result]
    pub fn withdraw(&mut self, escrow_id: u64, secret: String) -> Result<Promise, EscrowError> {
        let now = env::block_timestamp_ms();
        let caller = env::predecessor_account_id();
        let mut escrow = self
            .escrows
            .get(&escrow_id)
            .ok_or(EscrowError::EscrowNotFound)?;

        escrow.authorize_withdraw(&caller, now)?;
        let secret = decode_secret(&secret)?;
        verify_hashlock(&secret, &escrow.immutables.hashlock)?;

        escrow.status = EscrowStatus::Withdrawn;
        escrow.revealed_secret = Some(secret);
        let principal = escrow.principal.take_all();
        let deposit = escrow.deposit.take_all();

        EscrowWithdrawn {
            escrow_id,
            order_hash: hex::encode(escrow.immutables.order_hash),
            secret: hex::encode(secret),
            withdrawn_by: &caller,
            maker: &escrow.immutables.maker,
            taker: &escrow.immutables.taker,
            amount: principal.value(),
            withdrawn_at: now,
            merkle_index: escrow.merkle_index,
        }
        .emit();

        let taker = escrow.immutables.taker.clone();
        self.escrows.insert(&escrow_id, &escrow);
        Ok(transfer(&taker, principal).then(transfer(&caller, deposit)))
    }

    /// Return the principal to the maker after the cancellation stage
    /// opens. Resolver-only during the exclusive stage, anyone afterwards;
    /// the safety deposit pays the caller either way.
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

        let maker = escrow.immutables.maker.clone();
        self.escrows.insert(&escrow_id, &escrow);
        Ok(transfer(&maker, principal).then(transfer(&caller, deposit)))
    }

    /// Maker withdraws an order: deactivates the wallet and reclaims the
    /// undrained balance. Escrows already carved out are unaffected.
    #[handle_result]
    pub fn close_wallet(&mut self, wallet_id: u64) -> Result<Promise, EscrowError> {
        let now = env::block_timestamp_ms();
        let caller = env::predecessor_account_id();
        let mut wallet = self
            .wallets
            .get(&wallet_id)
            .ok_or(EscrowError::WalletNotFound)?;

        if caller != wallet.maker {
            return Err(EscrowError::Unauthorized);
        }
        if !wallet.is_active {
            return Err(EscrowError::WalletInactive);
        }

        wallet.is_active = false;
        let refund = wallet.balance.take_all();

        WalletClosed {
            wallet_id,
            order_hash: hex::encode(wallet.order_hash),
            maker: &wallet.maker,
            refunded_amount: refund.value(),
            closed_at: now,
        }
        .emit();

        let maker = wallet.maker.clone();
        self.wallets.insert(&wallet_id, &wallet);
        Ok(transfer(&maker, refund))
    }

    /// After the rescue delay anyone may drain a stuck wallet back to its
    /// maker and delete the record.
    #[handle_result]
    pub fn rescue_wallet(&mut self, wallet_id: u64) -> Result<(), EscrowError> {
        let now = env::block_timestamp_ms();
        let caller = env::predecessor_account_id();
        let mut wallet = self
            .wallets
            .get(&wallet_id)
            .ok_or(EscrowError::WalletNotFound)?;

        if now < wallet.rescue_start() {
            return Err(EscrowError::TimelockNotExpired);
        }

        let principal = wallet.balance.take_all();

        FundsRescued {
            escrow_id: wallet_id,
            rescuer: &caller,
            principal_amount: principal.value(),
            deposit_amount: 0,
        }
        .emit();

        self.wallets.remove(&wallet_id);
        if principal.is_zero() {
            principal.destroy_zero()?;
        } else {
            transfer(&wallet.maker, principal);
        }
        Ok(())
    }

    /// After the rescue delay anyone may drain a stuck escrow: principal
    /// back to the maker, deposit to the rescuer, record deleted.
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
            transfer(&escrow.immutables.maker, principal);
        }
        if deposit.is_zero() {
            deposit.destroy_zero()?;
        } else {
            transfer(&caller, deposit);
        }
        Ok(())
    }

    // Admin surface. Updates never touch existing objects: wallets and
    // escrows snapshot `rescue_delay` at creation.

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

    pub fn get_wallet(&self, wallet_id: u64) -> Option<WalletView> {
        let now = env::block_timestamp_ms();
        self.wallets.get(&wallet_id).map(|w| w.view(now))
    }

    pub fn get_escrow(&self, escrow_id: u64) -> Option<SrcEscrowView> {
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
