//! Pure balance arithmetic over the account arena.
//!
//! None of these helpers propagate anything: staking-balance movement is
//! always the caller's explicit responsibility, because not every spend
//! implies a staking change (a fee paid to the baker moves differently from
//! principal transferred between accounts).

use crate::directory::AccountDirectory;
use crate::error::EngineError;
use meridian_types::{Address, Mutez};

/// Decrease spendable balance. Overdraft here is an invariant violation,
/// not a recoverable condition: the upstream chain already guaranteed
/// solvency for everything the apply path charges.
pub fn spend(
    dir: &mut AccountDirectory,
    address: &Address,
    amount: Mutez,
) -> Result<(), EngineError> {
    if amount < 0 {
        return Err(EngineError::NegativeAmount {
            address: address.clone(),
            amount,
        });
    }
    let account = dir.resolve(address)?;
    if account.balance < amount {
        return Err(EngineError::Overdraft {
            address: address.clone(),
            balance: account.balance,
            amount,
        });
    }
    account.balance -= amount;
    Ok(())
}

/// Exact inverse of `spend`, used exclusively by revert. No solvency check:
/// the undo window may pass through states live invariants would reject.
pub fn refund(
    dir: &mut AccountDirectory,
    address: &Address,
    amount: Mutez,
) -> Result<(), EngineError> {
    if amount < 0 {
        return Err(EngineError::NegativeAmount {
            address: address.clone(),
            amount,
        });
    }
    dir.resolve(address)?.balance += amount;
    Ok(())
}

/// Increase a receiving account's balance.
pub fn credit(
    dir: &mut AccountDirectory,
    address: &Address,
    amount: Mutez,
) -> Result<(), EngineError> {
    if amount < 0 {
        return Err(EngineError::NegativeAmount {
            address: address.clone(),
            amount,
        });
    }
    dir.resolve(address)?.balance += amount;
    Ok(())
}

/// Exact inverse of `credit`, used exclusively by revert.
pub fn debit(
    dir: &mut AccountDirectory,
    address: &Address,
    amount: Mutez,
) -> Result<(), EngineError> {
    if amount < 0 {
        return Err(EngineError::NegativeAmount {
            address: address.clone(),
            amount,
        });
    }
    dir.resolve(address)?.balance -= amount;
    Ok(())
}

/// Move a delegate's staking balance by `delta`. No-op when the account has
/// no effective delegate.
pub fn stake_delta(
    dir: &mut AccountDirectory,
    delegate: Option<&Address>,
    delta: Mutez,
) -> Result<(), EngineError> {
    let Some(address) = delegate else {
        return Ok(());
    };
    let account = dir.resolve(address)?;
    let state = account
        .delegate_state
        .as_mut()
        .ok_or_else(|| EngineError::NotADelegate(address.clone()))?;
    state.staking_balance += delta;
    Ok(())
}

/// The block baker receives an operation fee: frozen fees, spendable
/// balance, and staking balance all grow by it.
pub fn collect_baker_fee(
    dir: &mut AccountDirectory,
    baker: &Address,
    fee: Mutez,
) -> Result<(), EngineError> {
    let account = dir.resolve(baker)?;
    account.balance += fee;
    let state = account
        .delegate_state
        .as_mut()
        .ok_or_else(|| EngineError::NotADelegate(baker.clone()))?;
    state.frozen_fees += fee;
    state.staking_balance += fee;
    Ok(())
}

/// Exact inverse of `collect_baker_fee`.
pub fn return_baker_fee(
    dir: &mut AccountDirectory,
    baker: &Address,
    fee: Mutez,
) -> Result<(), EngineError> {
    let account = dir.resolve(baker)?;
    account.balance -= fee;
    let state = account
        .delegate_state
        .as_mut()
        .ok_or_else(|| EngineError::NotADelegate(baker.clone()))?;
    state.frozen_fees -= fee;
    state.staking_balance -= fee;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_storage::{Account, MemoryStore, Store};

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        let mut account = Account::implicit(Address::new("tz1abc"));
        account.balance = 1_000;
        store.put_account(account).unwrap();
        store
            .put_account(Account::delegate(Address::new("tz1baker"), 0))
            .unwrap();
        store
    }

    #[test]
    fn spend_and_refund_are_inverse() {
        let store = seeded_store();
        let mut dir = AccountDirectory::new(&store);
        let addr = Address::new("tz1abc");

        spend(&mut dir, &addr, 300).unwrap();
        assert_eq!(dir.peek(&addr).unwrap().unwrap().balance, 700);
        refund(&mut dir, &addr, 300).unwrap();
        assert_eq!(dir.peek(&addr).unwrap().unwrap().balance, 1_000);
    }

    #[test]
    fn overdraft_is_an_invariant_violation() {
        let store = seeded_store();
        let mut dir = AccountDirectory::new(&store);
        let addr = Address::new("tz1abc");
        let err = spend(&mut dir, &addr, 1_001).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Overdraft {
                balance: 1_000,
                amount: 1_001,
                ..
            }
        ));
    }

    #[test]
    fn negative_amounts_are_rejected_everywhere() {
        let store = seeded_store();
        let mut dir = AccountDirectory::new(&store);
        let addr = Address::new("tz1abc");
        assert!(spend(&mut dir, &addr, -1).is_err());
        assert!(refund(&mut dir, &addr, -1).is_err());
        assert!(credit(&mut dir, &addr, -1).is_err());
        assert!(debit(&mut dir, &addr, -1).is_err());
    }

    #[test]
    fn baker_fee_moves_all_three_balances() {
        let store = seeded_store();
        let mut dir = AccountDirectory::new(&store);
        let baker = Address::new("tz1baker");

        collect_baker_fee(&mut dir, &baker, 10).unwrap();
        let account = dir.peek(&baker).unwrap().unwrap();
        assert_eq!(account.balance, 10);
        let state = account.delegate_state.as_ref().unwrap();
        assert_eq!(state.frozen_fees, 10);
        assert_eq!(state.staking_balance, 10);

        return_baker_fee(&mut dir, &baker, 10).unwrap();
        let account = dir.peek(&baker).unwrap().unwrap();
        assert_eq!(account.balance, 0);
        let state = account.delegate_state.as_ref().unwrap();
        assert_eq!(state.frozen_fees, 0);
        assert_eq!(state.staking_balance, 0);
    }

    #[test]
    fn stake_delta_requires_a_delegate() {
        let store = seeded_store();
        let mut dir = AccountDirectory::new(&store);
        assert!(stake_delta(&mut dir, None, 100).is_ok());
        let err = stake_delta(&mut dir, Some(&Address::new("tz1abc")), 100).unwrap_err();
        assert!(matches!(err, EngineError::NotADelegate(_)));
    }
}
