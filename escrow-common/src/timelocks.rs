use near_sdk::borsh::{self, BorshDeserialize, BorshSerialize};
use near_sdk::serde::{Deserialize, Serialize};

use crate::error::EscrowError;

/// Timelock configuration. Offsets are seconds relative to `deployed_at`
/// (milliseconds, ledger clock). The same schedule is carried verbatim on
/// both chains so the stages can be cross-correlated.
#[derive(BorshDeserialize, BorshSerialize, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(crate = "near_sdk::serde")]
pub struct Timelocks {
    pub deployed_at: u64,
    pub src_withdrawal: u32,
    pub src_public_withdrawal: u32,
    pub src_cancellation: u32,
    pub src_public_cancellation: u32,
    pub dst_withdrawal: u32,
    pub dst_public_withdrawal: u32,
    pub dst_cancellation: u32,
}

/// Stage boundaries addressable by name.
#[derive(Clone, Copy, Debug)]
pub enum TimelockStage {
    SrcWithdrawal,
    SrcPublicWithdrawal,
    SrcCancellation,
    SrcPublicCancellation,
    DstWithdrawal,
    DstPublicWithdrawal,
    DstCancellation,
}

/// Source-side stage ladder. Each entry names who may do what; the ladder
/// is total in `now`, so every instant maps to exactly one stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SrcStage {
    FinalityLock,
    ResolverExclusiveWithdraw,
    PublicWithdraw,
    ResolverExclusiveCancel,
    PublicCancel,
}

/// Destination-side stage ladder. There is no public cancellation stage on
/// the destination side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DstStage {
    FinalityLock,
    ResolverExclusiveWithdraw,
    PublicWithdraw,
    ResolverExclusiveCancel,
}

impl SrcStage {
    pub const fn label(&self) -> &'static str {
        match self {
            SrcStage::FinalityLock => "FINALITY_LOCK",
            SrcStage::ResolverExclusiveWithdraw => "RESOLVER_EXCLUSIVE_WITHDRAW",
            SrcStage::PublicWithdraw => "PUBLIC_WITHDRAW",
            SrcStage::ResolverExclusiveCancel => "RESOLVER_EXCLUSIVE_CANCEL",
            SrcStage::PublicCancel => "PUBLIC_CANCEL",
        }
    }
}

impl DstStage {
    pub const fn label(&self) -> &'static str {
        match self {
            DstStage::FinalityLock => "FINALITY_LOCK",
            DstStage::ResolverExclusiveWithdraw => "RESOLVER_EXCLUSIVE_WITHDRAW",
            DstStage::PublicWithdraw => "PUBLIC_WITHDRAW",
            DstStage::ResolverExclusiveCancel => "RESOLVER_EXCLUSIVE_CANCEL",
        }
    }
}

impl Timelocks {
    /// Absolute timestamp (ms) at which a stage boundary opens.
    pub fn get_timestamp(&self, stage: TimelockStage) -> u64 {
        let delay_seconds = match stage {
            TimelockStage::SrcWithdrawal => self.src_withdrawal,
            TimelockStage::SrcPublicWithdrawal => self.src_public_withdrawal,
            TimelockStage::SrcCancellation => self.src_cancellation,
            TimelockStage::SrcPublicCancellation => self.src_public_cancellation,
            TimelockStage::DstWithdrawal => self.dst_withdrawal,
            TimelockStage::DstPublicWithdrawal => self.dst_public_withdrawal,
            TimelockStage::DstCancellation => self.dst_cancellation,
        };
        self.deployed_at + delay_seconds as u64 * 1000
    }

    /// Validates the schedule: every offset strictly positive and strictly
    /// increasing within its chain, and the destination ladder strictly
    /// ahead of the source ladder so a resolver who reveals the secret on
    /// the destination still has time to claim on the source.
    pub fn validate(&self) -> Result<(), EscrowError> {
        let ok = 0 < self.dst_withdrawal
            && self.dst_withdrawal < self.dst_public_withdrawal
            && self.dst_public_withdrawal < self.dst_cancellation
            && 0 < self.src_withdrawal
            && self.src_withdrawal < self.src_public_withdrawal
            && self.src_public_withdrawal < self.src_cancellation
            && self.src_cancellation < self.src_public_cancellation
            && self.dst_withdrawal < self.src_withdrawal
            && self.dst_public_withdrawal < self.src_public_withdrawal
            && self.dst_cancellation < self.src_cancellation;
        if ok {
            Ok(())
        } else {
            Err(EscrowError::InvalidTimelocks)
        }
    }

    pub fn with_deployed_at(mut self, now_ms: u64) -> Self {
        self.deployed_at = now_ms;
        self
    }

    pub fn src_stage(&self, now_ms: u64) -> SrcStage {
        if now_ms < self.get_timestamp(TimelockStage::SrcWithdrawal) {
            SrcStage::FinalityLock
        } else if now_ms < self.get_timestamp(TimelockStage::SrcPublicWithdrawal) {
            SrcStage::ResolverExclusiveWithdraw
        } else if now_ms < self.get_timestamp(TimelockStage::SrcCancellation) {
            SrcStage::PublicWithdraw
        } else if now_ms < self.get_timestamp(TimelockStage::SrcPublicCancellation) {
            SrcStage::ResolverExclusiveCancel
        } else {
            SrcStage::PublicCancel
        }
    }

    pub fn dst_stage(&self, now_ms: u64) -> DstStage {
        if now_ms < self.get_timestamp(TimelockStage::DstWithdrawal) {
            DstStage::FinalityLock
        } else if now_ms < self.get_timestamp(TimelockStage::DstPublicWithdrawal) {
            DstStage::ResolverExclusiveWithdraw
        } else if now_ms < self.get_timestamp(TimelockStage::DstCancellation) {
            DstStage::PublicWithdraw
        } else {
            DstStage::ResolverExclusiveCancel
        }
    }

    /// Opening of the rescue window; `rescue_delay` is seconds.
    pub fn rescue_start(&self, rescue_delay: u32) -> u64 {
        self.deployed_at + rescue_delay as u64 * 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(deployed_at: u64) -> Timelocks {
        // 5/10/15/20 minutes on source, 4m10s/9m10s/14m10s on
        // destination.
        Timelocks {
            deployed_at,
            src_withdrawal: 300,
            src_public_withdrawal: 600,
            src_cancellation: 900,
            src_public_cancellation: 1200,
            dst_withdrawal: 250,
            dst_public_withdrawal: 550,
            dst_cancellation: 850,
        }
    }

    #[test]
    fn valid_schedule_passes() {
        assert!(schedule(0).validate().is_ok());
    }

    #[test]
    fn rejects_non_monotone_offsets() {
        let mut t = schedule(0);
        t.src_public_withdrawal = t.src_withdrawal;
        assert_eq!(t.validate(), Err(EscrowError::InvalidTimelocks));

        let mut t = schedule(0);
        t.dst_withdrawal = 0;
        assert_eq!(t.validate(), Err(EscrowError::InvalidTimelocks));

        let mut t = schedule(0);
        t.src_cancellation = t.src_public_cancellation + 1;
        assert_eq!(t.validate(), Err(EscrowError::InvalidTimelocks));
    }

    #[test]
    fn rejects_cross_chain_inversion() {
        // Destination must stay strictly ahead of source.
        let mut t = schedule(0);
        t.dst_withdrawal = t.src_withdrawal;
        assert_eq!(t.validate(), Err(EscrowError::InvalidTimelocks));

        let mut t = schedule(0);
        t.dst_cancellation = t.src_cancellation + 10;
        t.dst_public_withdrawal = t.dst_cancellation - 1;
        assert_eq!(t.validate(), Err(EscrowError::InvalidTimelocks));
    }

    #[test]
    fn src_stage_ladder() {
        let t = schedule(1_000_000);
        let cases = [
            (1_000_000, SrcStage::FinalityLock),
            (1_000_000 + 299_999, SrcStage::FinalityLock),
            (1_000_000 + 300_000, SrcStage::ResolverExclusiveWithdraw),
            (1_000_000 + 599_999, SrcStage::ResolverExclusiveWithdraw),
            (1_000_000 + 600_000, SrcStage::PublicWithdraw),
            (1_000_000 + 899_999, SrcStage::PublicWithdraw),
            (1_000_000 + 900_000, SrcStage::ResolverExclusiveCancel),
            (1_000_000 + 1_199_999, SrcStage::ResolverExclusiveCancel),
            (1_000_000 + 1_200_000, SrcStage::PublicCancel),
            (u64::MAX / 2, SrcStage::PublicCancel),
        ];
        for (now, expected) in cases {
            assert_eq!(t.src_stage(now), expected, "now={now}");
        }
    }

    #[test]
    fn dst_stage_ladder() {
        let t = schedule(1_000_000);
        let cases = [
            (1_000_000 + 249_999, DstStage::FinalityLock),
            (1_000_000 + 250_000, DstStage::ResolverExclusiveWithdraw),
            (1_000_000 + 550_000, DstStage::PublicWithdraw),
            (1_000_000 + 850_000, DstStage::ResolverExclusiveCancel),
        ];
        for (now, expected) in cases {
            assert_eq!(t.dst_stage(now), expected, "now={now}");
        }
    }

    #[test]
    fn stage_never_regresses() {
        let t = schedule(5_000);
        let mut last = t.src_stage(0);
        for now in (0u64..2_000_000).step_by(7_001) {
            let stage = t.src_stage(now);
            assert!(stage as u8 >= last as u8, "regressed at now={now}");
            last = stage;
        }
    }
}
