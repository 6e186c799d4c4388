//! Delegate lifecycle policy: grace-period and deactivation-level
//! computation.
//!
//! Deactivation is evaluated lazily against block level, so any qualifying
//! activity must both extend the horizon and eagerly re-activate delegates
//! already marked deactivated within the processing window. The old level
//! is handed back to the caller, who stores it on the triggering operation;
//! that single value is all revert needs to undo the change exactly,
//! without recomputation.

use crate::block::Block;
use crate::directory::AccountDirectory;
use crate::error::EngineError;
use meridian_types::Address;

pub struct GracePeriod;

impl GracePeriod {
    /// Horizon granted on a delegate's first activity: deterministic in the
    /// block's level and protocol constants only.
    pub fn init(block: &Block) -> i64 {
        let c = &block.constants;
        c.cycle_start(block.level) + c.blocks_per_cycle * (c.preserved_cycles + 2)
    }

    /// Rolling renewal for a delegate that is currently staked; one cycle
    /// further out than `init`.
    pub fn reset(block: &Block) -> i64 {
        let c = &block.constants;
        c.cycle_start(block.level) + c.blocks_per_cycle * (c.preserved_cycles + 3)
    }
}

/// What a grace-period refresh actually changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraceBump {
    /// Deactivation level before the bump; stored on the operation record.
    pub prev_level: i64,
    /// Whether the refresh flipped the delegate back to active.
    pub reactivated: bool,
}

/// Refresh a delegate's grace period after qualifying activity at `block`.
///
/// Returns `None` when the stored deactivation level already reaches past
/// the computed horizon, in which case nothing changed and revert has
/// nothing to undo.
pub fn refresh(
    dir: &mut AccountDirectory,
    delegate: &Address,
    block: &Block,
) -> Result<Option<GraceBump>, EngineError> {
    let account = dir.resolve(delegate)?;
    let state = account
        .delegate_state
        .as_mut()
        .ok_or_else(|| EngineError::NotADelegate(delegate.clone()))?;

    let candidate = if state.staked {
        GracePeriod::reset(block)
    } else {
        GracePeriod::init(block)
    };
    if state.deactivation_level >= candidate {
        return Ok(None);
    }

    let prev_level = state.deactivation_level;
    let reactivated = prev_level <= block.level;
    if reactivated {
        state.staked = true;
    }
    state.deactivation_level = candidate;
    Ok(Some(GraceBump {
        prev_level,
        reactivated,
    }))
}

/// Exact mirror of `refresh`, driven purely by the stored old level. The
/// level comparison is re-checked symmetrically to the forward path, so the
/// active-flag flip is reversed only when this operation caused it.
pub fn restore(
    dir: &mut AccountDirectory,
    delegate: &Address,
    op_level: i64,
    prev_level: i64,
) -> Result<(), EngineError> {
    let account = dir.resolve(delegate)?;
    let state = account
        .delegate_state
        .as_mut()
        .ok_or_else(|| EngineError::NotADelegate(delegate.clone()))?;
    if prev_level <= op_level {
        state.staked = false;
    }
    state.deactivation_level = prev_level;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_storage::{Account, MemoryStore, Store};
    use meridian_types::ProtocolConstants;

    fn constants() -> ProtocolConstants {
        ProtocolConstants {
            code: "PtAlpha".to_string(),
            byte_cost: 1_000,
            origination_size: 257,
            blocks_per_cycle: 100,
            preserved_cycles: 5,
        }
    }

    fn block_at(level: i64) -> Block {
        Block::new(level, 1_000, Address::new("tz1baker"), constants())
    }

    fn store_with_delegate(deactivation_level: i64, staked: bool) -> MemoryStore {
        let store = MemoryStore::new();
        let mut delegate = Account::delegate(Address::new("tz1del"), deactivation_level);
        delegate.delegate_state.as_mut().unwrap().staked = staked;
        store.put_account(delegate).unwrap();
        store
    }

    #[test]
    fn staked_delegate_gets_rolling_reset() {
        let store = store_with_delegate(450, true);
        let mut dir = AccountDirectory::new(&store);
        let block = block_at(430);
        let addr = Address::new("tz1del");

        let bump = refresh(&mut dir, &addr, &block).unwrap().expect("bump");
        assert_eq!(bump.prev_level, 450);
        // 450 > 430, this operation did not reactivate anything
        assert!(!bump.reactivated);
        let state = dir.peek(&addr).unwrap().unwrap().delegate_state.clone().unwrap();
        assert_eq!(state.deactivation_level, GracePeriod::reset(&block));
        assert!(state.staked);
    }

    #[test]
    fn lapsed_delegate_is_reactivated_eagerly() {
        let store = store_with_delegate(400, false);
        let mut dir = AccountDirectory::new(&store);
        let block = block_at(430);
        let addr = Address::new("tz1del");

        let bump = refresh(&mut dir, &addr, &block).unwrap().expect("bump");
        assert!(bump.reactivated);
        let state = dir.peek(&addr).unwrap().unwrap().delegate_state.clone().unwrap();
        assert!(state.staked);
        assert_eq!(state.deactivation_level, GracePeriod::init(&block));
    }

    #[test]
    fn refresh_is_a_no_op_when_horizon_already_reached() {
        let far = GracePeriod::reset(&block_at(430)) + 1;
        let store = store_with_delegate(far, true);
        let mut dir = AccountDirectory::new(&store);
        assert!(refresh(&mut dir, &Address::new("tz1del"), &block_at(430))
            .unwrap()
            .is_none());
    }

    #[test]
    fn restore_undoes_refresh_exactly() {
        let store = store_with_delegate(400, false);
        let mut dir = AccountDirectory::new(&store);
        let block = block_at(430);
        let addr = Address::new("tz1del");

        let before = dir.peek(&addr).unwrap().unwrap().clone();
        let bump = refresh(&mut dir, &addr, &block).unwrap().expect("bump");
        restore(&mut dir, &addr, block.level, bump.prev_level).unwrap();
        assert_eq!(dir.peek(&addr).unwrap().unwrap(), &before);
    }

    #[test]
    fn restore_keeps_active_flag_when_flip_was_not_ours() {
        let store = store_with_delegate(450, true);
        let mut dir = AccountDirectory::new(&store);
        let block = block_at(430);
        let addr = Address::new("tz1del");

        let bump = refresh(&mut dir, &addr, &block).unwrap().expect("bump");
        restore(&mut dir, &addr, block.level, bump.prev_level).unwrap();
        let state = dir.peek(&addr).unwrap().unwrap().delegate_state.clone().unwrap();
        assert!(state.staked);
        assert_eq!(state.deactivation_level, 450);
    }

    #[test]
    fn reset_extends_further_than_init() {
        let block = block_at(430);
        assert!(GracePeriod::reset(&block) > GracePeriod::init(&block));
    }
}
