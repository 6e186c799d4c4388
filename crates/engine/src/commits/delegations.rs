use crate::accounting;
use crate::error::EngineError;
use crate::grace;
use crate::processor::BlockProcessor;
use meridian_storage::{DelegationOp, OperationRecord};
use meridian_types::{Address, BlockEvents, OperationFlags, RawObject};
use tracing::debug;

impl BlockProcessor<'_> {
    /// Apply a delegate-link rewrite. An absent `delegate` field is an
    /// undelegation.
    pub fn apply_delegation(
        &mut self,
        group: RawObject,
        content: RawObject,
    ) -> Result<(), EngineError> {
        let sender = Address::new(content.required_str("source")?);
        let new_delegate = content.optional_str("delegate").map(Address::new);

        self.directory.resolve(&sender)?;

        let result = content.required("metadata")?.required("operation_result")?;
        let status = Self::parse_status(result)?;

        let mut record = DelegationOp {
            id: self.ids.next_operation_id(),
            level: self.block.level,
            timestamp: self.block.timestamp,
            hash: group.required_str("hash")?.to_string(),
            counter: content.required_i64("counter")?,
            sender: sender.clone(),
            delegate: new_delegate.clone(),
            prev_delegate: None,
            baker_fee: content.required_i64("fee")?,
            gas_limit: content.required_i64("gas_limit")?,
            gas_used: result.optional_i64("consumed_gas").unwrap_or(0),
            errors: result.optional("errors").map(|v| v.value().clone()),
            status,
            reset_deactivation: None,
        };

        // Operation-level effects.
        self.charge_baker_fee(&sender, record.baker_fee)?;
        self.directory.resolve(&sender)?.delegations_count += 1;
        self.block.operations |= OperationFlags::DELEGATIONS;
        self.advance_counter(&sender, record.counter)?;

        // Result effects: rewrite the link and move the sender's full
        // post-fee balance between the old and new delegate's staking
        // weight.
        if status.is_applied() {
            let account = self.directory.resolve(&sender)?;
            let prev_delegate = account.delegate.clone();
            let moving = account.balance;
            record.prev_delegate = prev_delegate.clone();

            accounting::stake_delta(&mut self.directory, prev_delegate.as_ref(), -moving)?;
            self.directory.resolve(&sender)?.delegate = new_delegate.clone();

            if let Some(delegate) = &new_delegate {
                // the new delegate must already exist; links never allocate
                self.directory.resolve(delegate)?;
                accounting::stake_delta(&mut self.directory, Some(delegate), moving)?;
                if let Some(bump) = grace::refresh(&mut self.directory, delegate, &self.block)? {
                    record.reset_deactivation = Some(bump.prev_level);
                    if bump.reactivated {
                        self.block.events |= BlockEvents::DELEGATE_REACTIVATED;
                    }
                }
            }
        }

        debug!(
            id = record.id,
            hash = %record.hash,
            status = ?status,
            delegate = ?record.delegate,
            "applied delegation"
        );
        self.write_set.add(OperationRecord::Delegation(record));
        Ok(())
    }

    /// Exact inverse of `apply_delegation`.
    pub fn revert_delegation(&mut self, record: &DelegationOp) -> Result<(), EngineError> {
        let sender = record.sender.clone();
        self.directory.resolve(&sender)?;

        if record.status.is_applied() {
            // Same balance the forward path moved: revert runs in exact
            // reverse order, so the sender's balance here equals its
            // post-fee value at apply time.
            let moving = self
                .directory
                .peek(&sender)?
                .ok_or_else(|| EngineError::UnknownAccount(sender.clone()))?
                .balance;

            if let Some(delegate) = &record.delegate {
                accounting::stake_delta(&mut self.directory, Some(delegate), -moving)?;
                if let Some(prev_level) = record.reset_deactivation {
                    grace::restore(&mut self.directory, delegate, record.level, prev_level)?;
                }
            }

            self.directory.resolve(&sender)?.delegate = record.prev_delegate.clone();
            accounting::stake_delta(
                &mut self.directory,
                record.prev_delegate.as_ref(),
                moving,
            )?;
        }

        self.refund_baker_fee(&sender, record.baker_fee)?;
        self.directory.resolve(&sender)?.delegations_count -= 1;
        self.rewind_counter(&sender, record.counter)?;

        debug!(id = record.id, hash = %record.hash, "reverted delegation");
        self.drop_record(record.id);
        Ok(())
    }
}
