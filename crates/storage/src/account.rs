use meridian_types::{Address, Mutez};
use serde::{Deserialize, Serialize};

/// Kind of an originated contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractKind {
    /// Plain value-holding contract without code.
    DelegatorContract,
    /// Contract carrying executable code.
    SmartContract,
}

/// Delegate-only payload of an account.
///
/// Present iff the account is a delegate. `staking_balance` is the weight
/// the delegate bakes/votes with, distinct from its own spendable balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateState {
    pub staking_balance: Mutez,
    pub frozen_fees: Mutez,
    /// Whether the delegate is currently in the active set.
    pub staked: bool,
    /// Level at which the delegate falls out of the active set absent
    /// further activity.
    pub deactivation_level: i64,
}

/// Materialized ledger account.
///
/// One common base record plus an optional delegate payload, rather than a
/// type hierarchy. Balance and counter are signed: the revert window may
/// legitimately pass through values a live solvency check would reject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: Address,
    pub balance: Mutez,
    /// Replay-protection counter, advanced by manager operations.
    pub counter: i64,
    /// Weak reference to this account's delegate; resolved by lookup,
    /// never by ownership.
    pub delegate: Option<Address>,
    pub transactions_count: i64,
    pub delegations_count: i64,
    pub originations_count: i64,
    /// Set for originated contracts, absent for implicit accounts.
    pub contract_kind: Option<ContractKind>,
    pub delegate_state: Option<DelegateState>,
}

impl Account {
    /// Fresh implicit account with zero balance.
    pub fn implicit(address: Address) -> Self {
        Self {
            address,
            balance: 0,
            counter: 0,
            delegate: None,
            transactions_count: 0,
            delegations_count: 0,
            originations_count: 0,
            contract_kind: None,
            delegate_state: None,
        }
    }

    /// Fresh originated contract.
    pub fn contract(address: Address, kind: ContractKind) -> Self {
        Self {
            contract_kind: Some(kind),
            ..Self::implicit(address)
        }
    }

    /// Fresh delegate, active from `deactivation_level` onward.
    pub fn delegate(address: Address, deactivation_level: i64) -> Self {
        Self {
            delegate_state: Some(DelegateState {
                staking_balance: 0,
                frozen_fees: 0,
                staked: true,
                deactivation_level,
            }),
            ..Self::implicit(address)
        }
    }

    pub fn is_delegate(&self) -> bool {
        self.delegate_state.is_some()
    }

    pub fn is_smart_contract(&self) -> bool {
        self.contract_kind == Some(ContractKind::SmartContract)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implicit_account_starts_empty() {
        let acc = Account::implicit(Address::new("tz1abc"));
        assert_eq!(acc.balance, 0);
        assert_eq!(acc.counter, 0);
        assert!(!acc.is_delegate());
        assert!(acc.delegate.is_none());
    }

    #[test]
    fn delegate_carries_payload() {
        let acc = Account::delegate(Address::new("tz1baker"), 12_288);
        assert!(acc.is_delegate());
        let state = acc.delegate_state.unwrap();
        assert!(state.staked);
        assert_eq!(state.deactivation_level, 12_288);
    }

    #[test]
    fn smart_contract_kind_is_visible() {
        let acc = Account::contract(Address::new("KT1abc"), ContractKind::SmartContract);
        assert!(acc.is_smart_contract());
        assert!(!acc.is_delegate());
    }
}
