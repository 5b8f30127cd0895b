use std::fmt;

use near_sdk::FunctionError;

/// Abort codes for every escrow transaction.
///
/// The taxonomy is closed: clients match on the numeric code, so variants
/// keep their codes forever. New variants may only be appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscrowError {
    InvalidOrderHash,
    InvalidHashlock,
    InvalidAmount,
    InvalidSafetyDeposit,
    InvalidTimelocks,
    InvalidSecret,
    InvalidMerkleProof,
    SecretAlreadyUsed,
    InvalidPartialFill,
    Unauthorized,
    NotWithdrawable,
    NotCancellable,
    AlreadyWithdrawn,
    AlreadyCancelled,
    InvalidTime,
    TimelockNotExpired,
    WalletInactive,
    InsufficientBalance,
    WalletNotFound,
    EscrowNotFound,
}

impl EscrowError {
    pub const fn code(&self) -> u64 {
        match self {
            EscrowError::InvalidOrderHash => 1,
            EscrowError::InvalidHashlock => 2,
            EscrowError::InvalidAmount => 3,
            EscrowError::InvalidSafetyDeposit => 4,
            EscrowError::InvalidTimelocks => 5,
            EscrowError::InvalidSecret => 6,
            EscrowError::InvalidMerkleProof => 7,
            EscrowError::SecretAlreadyUsed => 8,
            EscrowError::InvalidPartialFill => 9,
            EscrowError::Unauthorized => 10,
            EscrowError::NotWithdrawable => 11,
            EscrowError::NotCancellable => 12,
            EscrowError::AlreadyWithdrawn => 13,
            EscrowError::AlreadyCancelled => 14,
            EscrowError::InvalidTime => 15,
            EscrowError::TimelockNotExpired => 16,
            EscrowError::WalletInactive => 17,
            EscrowError::InsufficientBalance => 18,
            EscrowError::WalletNotFound => 19,
            EscrowError::EscrowNotFound => 20,
        }
    }

    pub const fn message(&self) -> &'static str {
        match self {
            EscrowError::InvalidOrderHash => "order hash must be 32 non-zero bytes",
            EscrowError::InvalidHashlock => "hashlock must be 32 non-zero bytes",
            EscrowError::InvalidAmount => "invalid amount",
            EscrowError::InvalidSafetyDeposit => "safety deposit below floor or mismatched",
            EscrowError::InvalidTimelocks => "timelock schedule is not monotone",
            EscrowError::InvalidSecret => "secret does not match hashlock",
            EscrowError::InvalidMerkleProof => "merkle proof does not reach the root",
            EscrowError::SecretAlreadyUsed => "secret index already used",
            EscrowError::InvalidPartialFill => "partial fill index or share mismatch",
            EscrowError::Unauthorized => "caller not allowed in current stage",
            EscrowError::NotWithdrawable => "current stage does not permit withdrawal",
            EscrowError::NotCancellable => "current stage does not permit cancellation",
            EscrowError::AlreadyWithdrawn => "escrow already withdrawn",
            EscrowError::AlreadyCancelled => "escrow already cancelled",
            EscrowError::InvalidTime => "invalid time parameter",
            EscrowError::TimelockNotExpired => "rescue delay has not expired",
            EscrowError::WalletInactive => "wallet is not active",
            EscrowError::InsufficientBalance => "wallet cannot fund requested amount",
            EscrowError::WalletNotFound => "no wallet with this id",
            EscrowError::EscrowNotFound => "no escrow with this id",
        }
    }
}

impl fmt::Display for EscrowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}: {}", self.code(), self.message())
    }
}

impl FunctionError for EscrowError {
    fn panic(&self) -> ! {
        near_sdk::env::panic_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable_and_unique() {
        let all = [
            EscrowError::InvalidOrderHash,
            EscrowError::InvalidHashlock,
            EscrowError::InvalidAmount,
            EscrowError::InvalidSafetyDeposit,
            EscrowError::InvalidTimelocks,
            EscrowError::InvalidSecret,
            EscrowError::InvalidMerkleProof,
            EscrowError::SecretAlreadyUsed,
            EscrowError::InvalidPartialFill,
            EscrowError::Unauthorized,
            EscrowError::NotWithdrawable,
            EscrowError::NotCancellable,
            EscrowError::AlreadyWithdrawn,
            EscrowError::AlreadyCancelled,
            EscrowError::InvalidTime,
            EscrowError::TimelockNotExpired,
            EscrowError::WalletInactive,
            EscrowError::InsufficientBalance,
            EscrowError::WalletNotFound,
            EscrowError::EscrowNotFound,
        ];
        let mut seen = std::collections::HashSet::new();
        for err in all {
            assert!(seen.insert(err.code()), "duplicate code {}", err.code());
        }
        assert_eq!(seen.len(), 20);
    }

    #[test]
    fn display_carries_the_code() {
        assert_eq!(
            EscrowError::SecretAlreadyUsed.to_string(),
            "E8: secret index already used"
        );
    }
}
