use near_sdk::borsh::{self, BorshDeserialize, BorshSerialize};

use crate::error::EscrowError;

/// A locked quantity of the ledger's native asset, owned exclusively by
/// the object holding it.
///
/// The type is move-only: no `Copy`, no `Clone`, no serde. Value enters
/// through `new`, moves between holders through
/// `split`/`merge`/`take_all` (which conserve the sum by construction),
/// and leaves only by being consumed into an outgoing transfer. Cleanup
/// of a holder requires the balance to be provably empty.
#[derive(BorshDeserialize, BorshSerialize, Debug, PartialEq, Eq)]
pub struct LockedBalance(u128);

impl LockedBalance {
    pub fn new(amount: u128) -> Self {
        Self(amount)
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn value(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Carves `amount` out of this balance into a new one.
    pub fn split(&mut self, amount: u128) -> Result<LockedBalance, EscrowError> {
        if amount > self.0 {
            return Err(EscrowError::InsufficientBalance);
        }
        self.0 -= amount;
        Ok(LockedBalance(amount))
    }

    pub fn merge(&mut self, other: LockedBalance) {
        self.0 += other.0;
    }

    /// Drains the full balance, leaving zero behind.
    pub fn take_all(&mut self) -> LockedBalance {
        LockedBalance(std::mem::replace(&mut self.0, 0))
    }

    /// Consumes the balance for an outgoing transfer.
    pub fn into_yocto(self) -> u128 {
        self.0
    }

    /// Consumes an empty balance; the only way to dispose of one without
    /// paying it out.
    pub fn destroy_zero(self) -> Result<(), EscrowError> {
        if self.0 == 0 {
            Ok(())
        } else {
            Err(EscrowError::InsufficientBalance)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_conserves_the_total() {
        let mut balance = LockedBalance::new(1_000);
        let part = balance.split(300).unwrap();
        assert_eq!(balance.value() + part.value(), 1_000);

        balance.merge(part);
        assert_eq!(balance.value(), 1_000);
    }

    #[test]
    fn cannot_split_more_than_held() {
        let mut balance = LockedBalance::new(100);
        assert_eq!(
            balance.split(101).unwrap_err(),
            EscrowError::InsufficientBalance
        );
        assert_eq!(balance.value(), 100);
    }

    #[test]
    fn take_all_leaves_zero() {
        let mut balance = LockedBalance::new(42);
        let drained = balance.take_all();
        assert_eq!(drained.value(), 42);
        assert!(balance.is_zero());
        assert_eq!(drained.into_yocto(), 42);
    }

    #[test]
    fn only_empty_balances_are_destructible() {
        assert!(LockedBalance::zero().destroy_zero().is_ok());
        assert_eq!(
            LockedBalance::new(1).destroy_zero().unwrap_err(),
            EscrowError::InsufficientBalance
        );
    }
}
