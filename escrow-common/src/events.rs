use near_sdk::serde::Serialize;
use near_sdk::serde_json::json;
use near_sdk::{env, AccountId};

/// Event envelope identifiers. Watchers treat these records as the only
/// source of cross-chain synchronization, so names and fields are stable.
pub const EVENT_STANDARD: &str = "cc-escrow";
pub const EVENT_VERSION: &str = "1.0.0";

fn emit<T: Serialize>(event: &str, data: &T) {
    let payload = json!({
        "standard": EVENT_STANDARD,
        "version": EVENT_VERSION,
        "event": event,
        "data": [data],
    });
    env::log_str(&format!("EVENT_JSON:{}", payload));
}

/// A maker funded a new source-side wallet.
#[derive(Serialize, Debug)]
#[serde(crate = "near_sdk::serde")]
pub struct WalletCreated<'a> {
    pub wallet_id: u64,
    pub order_hash: String,
    pub maker: &'a AccountId,
    pub initial_amount: u128,
    pub created_at: u64,
}

impl WalletCreated<'_> {
    pub fn emit(&self) {
        emit("wallet_created", self);
    }
}

/// A maker closed a wallet and reclaimed its remaining balance.
#[derive(Serialize, Debug)]
#[serde(crate = "near_sdk::serde")]
pub struct WalletClosed<'a> {
    pub wallet_id: u64,
    pub order_hash: String,
    pub maker: &'a AccountId,
    pub refunded_amount: u128,
    pub closed_at: u64,
}

impl WalletClosed<'_> {
    pub fn emit(&self) {
        emit("wallet_closed", self);
    }
}

/// An escrow was published on either side of the swap.
#[derive(Serialize, Debug)]
#[serde(crate = "near_sdk::serde")]
pub struct EscrowCreated<'a> {
    pub escrow_id: u64,
    pub order_hash: String,
    pub hashlock: String,
    pub maker: &'a AccountId,
    pub taker: &'a AccountId,
    pub amount: u128,
    pub safety_deposit: u128,
    pub resolver: &'a AccountId,
    pub created_at: u64,
    pub is_merkle: bool,
    pub parts_amount: u64,
}

impl EscrowCreated<'_> {
    pub fn emit(&self) {
        emit("escrow_created", self);
    }
}

/// A secret was revealed and value left an escrow. `merkle_index` is set
/// for partial fills; `amount` is the share settled by this transition.
#[derive(Serialize, Debug)]
#[serde(crate = "near_sdk::serde")]
pub struct EscrowWithdrawn<'a> {
    pub escrow_id: u64,
    pub order_hash: String,
    pub secret: String,
    pub withdrawn_by: &'a AccountId,
    pub maker: &'a AccountId,
    pub taker: &'a AccountId,
    pub amount: u128,
    pub withdrawn_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merkle_index: Option<u64>,
}

impl EscrowWithdrawn<'_> {
    pub fn emit(&self) {
        emit("escrow_withdrawn", self);
    }
}

#[derive(Serialize, Debug)]
#[serde(crate = "near_sdk::serde")]
pub struct EscrowCancelled<'a> {
    pub escrow_id: u64,
    pub order_hash: String,
    pub maker: &'a AccountId,
    pub taker: &'a AccountId,
    pub cancelled_by: &'a AccountId,
    pub amount: u128,
    pub cancelled_at: u64,
}

impl EscrowCancelled<'_> {
    pub fn emit(&self) {
        emit("escrow_cancelled", self);
    }
}

/// Residual balances drained from a stuck object after the rescue delay.
#[derive(Serialize, Debug)]
#[serde(crate = "near_sdk::serde")]
pub struct FundsRescued<'a> {
    pub escrow_id: u64,
    pub rescuer: &'a AccountId,
    pub principal_amount: u128,
    pub deposit_amount: u128,
}

impl FundsRescued<'_> {
    pub fn emit(&self) {
        emit("funds_rescued", self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use near_sdk::test_utils::{accounts, get_logs, VMContextBuilder};
    use near_sdk::testing_env;

    #[test]
    fn events_are_enveloped_and_typed() {
        testing_env!(VMContextBuilder::new()
            .predecessor_account_id(accounts(0))
            .build());

        WalletCreated {
            wallet_id: 7,
            order_hash: "ab".repeat(32),
            maker: &accounts(1),
            initial_amount: 1_000_000_000,
            created_at: 1_700_000_000_000,
        }
        .emit();

        let logs = get_logs();
        assert_eq!(logs.len(), 1);
        let log = &logs[0];
        assert!(log.starts_with("EVENT_JSON:"));
        assert!(log.contains("\"standard\":\"cc-escrow\""));
        assert!(log.contains("\"event\":\"wallet_created\""));
        assert!(log.contains("\"wallet_id\":7"));
    }

    #[test]
    fn merkle_index_is_omitted_when_absent() {
        testing_env!(VMContextBuilder::new()
            .predecessor_account_id(accounts(0))
            .build());

        EscrowWithdrawn {
            escrow_id: 1,
            order_hash: "11".repeat(32),
            secret: "22".repeat(32),
            withdrawn_by: &accounts(2),
            maker: &accounts(1),
            taker: &accounts(2),
            amount: 5,
            withdrawn_at: 0,
            merkle_index: None,
        }
        .emit();

        let logs = get_logs();
        assert!(!logs[0].contains("merkle_index"));
    }
}
