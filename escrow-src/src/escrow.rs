use near_sdk::borsh::{self, BorshDeserialize, BorshSerialize};
use near_sdk::serde::{Deserialize, Serialize};
use near_sdk::AccountId;

use escrow_common::{EscrowError, EscrowStatus, Immutables, LockedBalance, SrcStage, Timelocks};

/// A source-side lock: principal carved out of a wallet, claimable by the
/// taker against the secret, refundable to the maker on timeout. For a
/// partial drain the hashlock is the Merkle leaf's secret hash proven at
/// creation, so settlement is always a plain keccak check.
#[derive(BorshDeserialize, BorshSerialize, Debug)]
pub struct SrcEscrow {
    pub immutables: Immutables,
    pub principal: LockedBalance,
    pub deposit: LockedBalance,
    pub status: EscrowStatus,
    /// Secret index this escrow was drawn for, when the wallet runs in
    /// partial-fill mode.
    pub merkle_index: Option<u64>,
    pub revealed_secret: Option<[u8; 32]>,
    /// Snapshot of the factory's rescue delay (seconds) at creation.
    pub rescue_delay: u32,
}

impl SrcEscrow {
    fn ensure_active(&self) -> Result<(), EscrowError> {
        match self.status {
            EscrowStatus::Active => Ok(()),
            EscrowStatus::Withdrawn => Err(EscrowError::AlreadyWithdrawn),
            EscrowStatus::Cancelled => Err(EscrowError::AlreadyCancelled),
        }
    }

    pub fn current_stage(&self, now_ms: u64) -> SrcStage {
        self.immutables.timelocks.src_stage(now_ms)
    }

    /// Stage-and-caller gate for withdrawal. The secret check happens
    /// after this, so an aborted call leaves no trace.
    pub fn authorize_withdraw(&self, caller: &AccountId, now_ms: u64) -> Result<(), EscrowError> {
        self.ensure_active()?;
        match self.current_stage(now_ms) {
            SrcStage::ResolverExclusiveWithdraw => {
                if caller != &self.immutables.resolver {
                    return Err(EscrowError::Unauthorized);
                }
                Ok(())
            }
            SrcStage::PublicWithdraw => Ok(()),
            _ => Err(EscrowError::NotWithdrawable),
        }
    }

    pub fn authorize_cancel(&self, caller: &AccountId, now_ms: u64) -> Result<(), EscrowError> {
        self.ensure_active()?;
        match self.current_stage(now_ms) {
            SrcStage::ResolverExclusiveCancel => {
                if caller != &self.immutables.resolver {
                    return Err(EscrowError::Unauthorized);
                }
                Ok(())
            }
            SrcStage::PublicCancel => Ok(()),
            _ => Err(EscrowError::NotCancellable),
        }
    }

    pub fn rescue_start(&self) -> u64 {
        self.immutables.timelocks.rescue_start(self.rescue_delay)
    }

    pub fn view(&self, now_ms: u64) -> SrcEscrowView {
        SrcEscrowView {
            order_hash: hex::encode(self.immutables.order_hash),
            hashlock: hex::encode(self.immutables.hashlock),
            maker: self.immutables.maker.clone(),
            taker: self.immutables.taker.clone(),
            resolver: self.immutables.resolver.clone(),
            amount: self.immutables.amount,
            safety_deposit: self.immutables.safety_deposit,
            principal_remaining: self.principal.value(),
            deposit_remaining: self.deposit.value(),
            status: self.status,
            merkle_index: self.merkle_index,
            revealed_secret: self.revealed_secret.map(hex::encode),
            timelocks: self.immutables.timelocks.clone(),
            current_stage: self.current_stage(now_ms).label().to_string(),
        }
    }
}

/// Read-only projection for off-chain watchers.
#[derive(Serialize, Deserialize, Debug)]
#[serde(crate = "near_sdk::serde")]
pub struct SrcEscrowView {
    pub order_hash: String,
    pub hashlock: String,
    pub maker: AccountId,
    pub taker: AccountId,
    pub resolver: AccountId,
    pub amount: u128,
    pub safety_deposit: u128,
    pub principal_remaining: u128,
    pub deposit_remaining: u128,
    pub status: EscrowStatus,
    pub merkle_index: Option<u64>,
    pub revealed_secret: Option<String>,
    pub timelocks: Timelocks,
    pub current_stage: String,
}
