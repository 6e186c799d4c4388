//! Per-operation-kind apply/revert logic.
//!
//! Each kind follows the same shape: build the immutable record from chain
//! content, realize the operation-level effects that occur for every
//! status, realize the result effects only for `Applied`, and append the
//! record to the pending write set. Revert mirrors each step with its
//! algebraic inverse, in reverse order.

mod delegations;
mod originations;
mod transactions;

use crate::accounting;
use crate::error::EngineError;
use crate::processor::BlockProcessor;
use meridian_types::{Address, BlockEvents, Mutez, OperationStatus, RawObject};

impl BlockProcessor<'_> {
    /// Operation fee: the sender pays, the sender's delegate loses the
    /// matching staking weight, the block baker gains it three ways, and
    /// the block fee aggregate grows.
    pub(crate) fn charge_baker_fee(
        &mut self,
        sender: &Address,
        fee: Mutez,
    ) -> Result<(), EngineError> {
        let sender_delegate = self.directory.effective_delegate(sender)?;
        accounting::spend(&mut self.directory, sender, fee)?;
        accounting::stake_delta(&mut self.directory, sender_delegate.as_ref(), -fee)?;
        accounting::collect_baker_fee(&mut self.directory, &self.block.baker, fee)?;
        self.block.fees += fee;
        Ok(())
    }

    /// Inverse of `charge_baker_fee`. The block aggregate is not touched:
    /// the reverted block's summary is discarded wholesale.
    pub(crate) fn refund_baker_fee(
        &mut self,
        sender: &Address,
        fee: Mutez,
    ) -> Result<(), EngineError> {
        let sender_delegate = self.directory.effective_delegate(sender)?;
        accounting::refund(&mut self.directory, sender, fee)?;
        accounting::stake_delta(&mut self.directory, sender_delegate.as_ref(), fee)?;
        accounting::return_baker_fee(&mut self.directory, &self.block.baker, fee)?;
        Ok(())
    }

    /// Advance the sender's replay-protection counter. Monotonic and
    /// idempotent against replays within the same stream.
    pub(crate) fn advance_counter(
        &mut self,
        sender: &Address,
        counter: i64,
    ) -> Result<(), EngineError> {
        let account = self.directory.resolve(sender)?;
        account.counter = account.counter.max(counter);
        self.ids.bump_manager_counter();
        Ok(())
    }

    pub(crate) fn rewind_counter(
        &mut self,
        sender: &Address,
        counter: i64,
    ) -> Result<(), EngineError> {
        let account = self.directory.resolve(sender)?;
        account.counter = account.counter.min(counter - 1);
        self.ids.release_manager_counter();
        Ok(())
    }

    /// Event categories fired by touching `target`.
    pub(crate) fn target_events(
        &mut self,
        target: Option<&Address>,
    ) -> Result<BlockEvents, EngineError> {
        if let Some(address) = target {
            if let Some(account) = self.directory.peek(address)? {
                if account.is_smart_contract() {
                    return Ok(BlockEvents::SMART_CONTRACTS);
                }
            }
        }
        Ok(BlockEvents::NONE)
    }

    pub(crate) fn parse_status(result: RawObject) -> Result<OperationStatus, EngineError> {
        Ok(result.required_str("status")?.parse()?)
    }

    /// Derived storage cost: bytes consumed times the protocol byte cost,
    /// absent when the result consumed none.
    pub(crate) fn storage_fee_of(&self, storage_used: i64) -> Option<Mutez> {
        (storage_used > 0).then(|| storage_used * self.block.constants.byte_cost)
    }
}
