use near_sdk::borsh::{self, BorshDeserialize, BorshSerialize};
use near_sdk::serde::{Deserialize, Serialize};
use near_sdk::AccountId;

use escrow_common::{
    deposit_portion, fill_amount, keccak256, verify_secret_leaf, DstStage, EscrowError,
    EscrowStatus, Immutables, LockedBalance, MerkleProof, Timelocks,
};

/// Merkle bookkeeping for a multi-part destination escrow. The root lives
/// in `Immutables::hashlock`; this tracks which secret indices have
/// settled and how much principal they released.
#[derive(BorshDeserialize, BorshSerialize, Debug)]
pub struct MerkleState {
    pub parts_amount: u64,
    pub used_indices: Vec<u64>,
    pub filled: u128,
}

/// Destination-side lock: the taker's inventory, claimable for the maker
/// once the secret surfaces, refundable to the taker on timeout. In
/// multi-part mode it settles share-by-share and stays `Active` until the
/// last share is gone.
#[derive(BorshDeserialize, BorshSerialize, Debug)]
pub struct DstEscrow {
    pub immutables: Immutables,
    pub principal: LockedBalance,
    pub deposit: LockedBalance,
    pub status: EscrowStatus,
    pub merkle: Option<MerkleState>,
    /// Most recently revealed secret.
    pub revealed_secret: Option<[u8; 32]>,
    /// Snapshot of the factory's rescue delay (seconds) at creation.
    pub rescue_delay: u32,
}

impl DstEscrow {
    fn ensure_active(&self) -> Result<(), EscrowError> {
        match self.status {
            EscrowStatus::Active => Ok(()),
            EscrowStatus::Withdrawn => Err(EscrowError::AlreadyWithdrawn),
            EscrowStatus::Cancelled => Err(EscrowError::AlreadyCancelled),
        }
    }

    pub fn current_stage(&self, now_ms: u64) -> DstStage {
        self.immutables.timelocks.dst_stage(now_ms)
    }

    pub fn authorize_withdraw(&self, caller: &AccountId, now_ms: u64) -> Result<(), EscrowError> {
        self.ensure_active()?;
        match self.current_stage(now_ms) {
            DstStage::ResolverExclusiveWithdraw => {
                if caller != &self.immutables.resolver {
                    return Err(EscrowError::Unauthorized);
                }
                Ok(())
            }
            DstStage::PublicWithdraw => Ok(()),
            _ => Err(EscrowError::NotWithdrawable),
        }
    }

    /// The destination side has no public cancellation: only the resolver
    /// may cancel, once its stage opens.
    pub fn authorize_cancel(&self, caller: &AccountId, now_ms: u64) -> Result<(), EscrowError> {
        self.ensure_active()?;
        match self.current_stage(now_ms) {
            DstStage::ResolverExclusiveCancel => {
                if caller != &self.immutables.resolver {
                    return Err(EscrowError::Unauthorized);
                }
                Ok(())
            }
            _ => Err(EscrowError::NotCancellable),
        }
    }

    /// Checks a partial-fill reveal: index in range and fresh, leaf proof
    /// reaching the root. Read-only; the caller settles afterwards.
    /// Fill indices run 1..=parts; leaf 0 exists in the tree but releases
    /// no share, so it is rejected here just as drains reject it.
    pub fn verify_share(
        &self,
        secret: &[u8; 32],
        index: u64,
        proof: &MerkleProof,
    ) -> Result<(), EscrowError> {
        let merkle = self.merkle.as_ref().ok_or(EscrowError::InvalidPartialFill)?;
        if index == 0 || index > merkle.parts_amount {
            return Err(EscrowError::InvalidPartialFill);
        }
        if merkle.used_indices.contains(&index) {
            return Err(EscrowError::SecretAlreadyUsed);
        }
        let secret_hash = keccak256(secret);
        verify_secret_leaf(index, &secret_hash, proof, &self.immutables.hashlock)
    }

    /// Releases the share for `index`: principal slice capped at the
    /// remainder, deposit slice proportional (the exhausting share sweeps
    /// whatever deposit is left, so nothing strands). Marks the index
    /// used and flips the status once the principal is gone.
    pub fn settle_share(
        &mut self,
        index: u64,
    ) -> Result<(LockedBalance, LockedBalance), EscrowError> {
        let total = self.immutables.amount;
        let total_deposit = self.immutables.safety_deposit;
        let merkle = self.merkle.as_mut().ok_or(EscrowError::InvalidPartialFill)?;

        let share = fill_amount(index, total, merkle.parts_amount).min(self.principal.value());
        merkle.used_indices.push(index);
        merkle.filled += share;

        let principal_slice = self.principal.split(share)?;
        let deposit_slice = if self.principal.is_zero() {
            self.status = EscrowStatus::Withdrawn;
            self.deposit.take_all()
        } else {
            let portion =
                deposit_portion(total_deposit, share, total).min(self.deposit.value());
            self.deposit.split(portion)?
        };
        Ok((principal_slice, deposit_slice))
    }

    pub fn rescue_start(&self) -> u64 {
        self.immutables.timelocks.rescue_start(self.rescue_delay)
    }

    pub fn view(&self, now_ms: u64) -> DstEscrowView {
        DstEscrowView {
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
            parts_amount: self.merkle.as_ref().map(|m| m.parts_amount),
            used_indices: self
                .merkle
                .as_ref()
                .map(|m| m.used_indices.clone())
                .unwrap_or_default(),
            filled: self.merkle.as_ref().map(|m| m.filled).unwrap_or_default(),
            revealed_secret: self.revealed_secret.map(hex::encode),
            timelocks: self.immutables.timelocks.clone(),
            current_stage: self.current_stage(now_ms).label().to_string(),
        }
    }
}

/// Read-only projection for off-chain watchers.
#[derive(Serialize, Deserialize, Debug)]
#[serde(crate = "near_sdk::serde")]
pub struct DstEscrowView {
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
    pub parts_amount: Option<u64>,
    pub used_indices: Vec<u64>,
    pub filled: u128,
    pub revealed_secret: Option<String>,
    pub timelocks: Timelocks,
    pub current_stage: String,
}
