use crate::accounting;
use crate::error::EngineError;
use crate::grace;
use crate::processor::BlockProcessor;
use meridian_storage::{OperationRecord, TransactionOp};
use meridian_types::{Address, BlockEvents, InternalFlags, OperationFlags, RawObject};
use tracing::debug;

impl BlockProcessor<'_> {
    /// Apply a top-level transfer.
    pub fn apply_transaction(
        &mut self,
        group: RawObject,
        content: RawObject,
    ) -> Result<(), EngineError> {
        let sender = Address::new(content.required_str("source")?);
        let target = content.optional_str("destination").map(Address::new);

        // Materialize participants up front. The target may legitimately be
        // unknown (never allocated and not originated within this block).
        self.directory.resolve(&sender)?;
        if let Some(address) = &target {
            self.directory.resolve_optional(address)?;
        }

        let result = content.required("metadata")?.required("operation_result")?;
        let status = Self::parse_status(result)?;
        let storage_used = result.optional_i64("paid_storage_size_diff").unwrap_or(0);
        let allocated = result
            .optional("allocated_destination_contract")
            .and_then(|v| v.value().as_bool())
            .unwrap_or(false);

        let mut record = TransactionOp {
            id: self.ids.next_operation_id(),
            level: self.block.level,
            timestamp: self.block.timestamp,
            hash: group.required_str("hash")?.to_string(),
            counter: content.required_i64("counter")?,
            nonce: None,
            initiator: None,
            sender: sender.clone(),
            target: target.clone(),
            amount: content.required_i64("amount")?,
            baker_fee: content.required_i64("fee")?,
            gas_limit: content.required_i64("gas_limit")?,
            storage_limit: content.required_i64("storage_limit")?,
            gas_used: result.optional_i64("consumed_gas").unwrap_or(0),
            storage_used,
            storage_fee: self.storage_fee_of(storage_used),
            allocation_fee: allocated.then(|| self.block.constants.allocation_cost()),
            parameters: content.optional("parameters").map(|v| v.value().clone()),
            errors: result.optional("errors").map(|v| v.value().clone()),
            status,
            reset_deactivation: None,
            internals: InternalFlags::NONE,
        };

        // Operation-level effects, realized for every status.
        self.charge_baker_fee(&sender, record.baker_fee)?;

        self.directory.resolve(&sender)?.transactions_count += 1;
        if let Some(address) = &target {
            if address != &sender {
                if let Some(account) = self.directory.resolve_optional(address)? {
                    account.transactions_count += 1;
                }
            }
        }

        let events = self.target_events(target.as_ref())?;
        self.block.events |= events;
        self.block.operations |= OperationFlags::TRANSACTIONS;

        self.advance_counter(&sender, record.counter)?;

        // Result effects, realized only when the outcome applied.
        if status.is_applied() {
            let target = target.ok_or(EngineError::MissingTarget)?;
            let costs = record.amount
                + record.storage_fee.unwrap_or(0)
                + record.allocation_fee.unwrap_or(0);
            let sender_delegate = self.directory.effective_delegate(&sender)?;
            accounting::spend(&mut self.directory, &sender, costs)?;
            accounting::stake_delta(&mut self.directory, sender_delegate.as_ref(), -costs)?;

            accounting::credit(&mut self.directory, &target, record.amount)?;
            let target_delegate = self.directory.effective_delegate(&target)?;
            accounting::stake_delta(
                &mut self.directory,
                target_delegate.as_ref(),
                record.amount,
            )?;

            if self.directory.is_delegate(&target)? {
                if let Some(bump) = grace::refresh(&mut self.directory, &target, &self.block)? {
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
            amount = record.amount,
            "applied transaction"
        );
        self.last_parent = Some(record.id);
        self.write_set.add(OperationRecord::Transaction(record));
        Ok(())
    }

    /// Apply a transfer triggered internally by a contract execution.
    ///
    /// Fee-less; storage and allocation costs are underwritten by the
    /// parent's original sender, not the internal sender.
    pub fn apply_internal_transaction(&mut self, content: RawObject) -> Result<(), EngineError> {
        let parent_id = self.last_parent.ok_or(EngineError::MissingParent)?;
        let (parent_sender, parent_hash, parent_counter) = {
            let parent = self
                .write_set
                .transaction_mut(parent_id)
                .ok_or(EngineError::MissingRecord(parent_id))?;
            parent.internals |= InternalFlags::TRANSACTIONS;
            (parent.sender.clone(), parent.hash.clone(), parent.counter)
        };

        // The internal sender may itself be a contract originated earlier
        // in this same top-level operation; those are cache hits.
        let sender = Address::new(content.required_str("source")?);
        let target = content.optional_str("destination").map(Address::new);
        self.directory.resolve(&sender)?;
        if let Some(address) = &target {
            self.directory.resolve_optional(address)?;
        }

        let result = content.required("result")?;
        let status = Self::parse_status(result)?;
        let storage_used = result.optional_i64("paid_storage_size_diff").unwrap_or(0);
        let allocated = result
            .optional("allocated_destination_contract")
            .and_then(|v| v.value().as_bool())
            .unwrap_or(false);

        let mut record = TransactionOp {
            id: self.ids.next_operation_id(),
            level: self.block.level,
            timestamp: self.block.timestamp,
            hash: parent_hash,
            counter: parent_counter,
            nonce: Some(content.required_i64("nonce")?),
            initiator: Some(parent_sender.clone()),
            sender: sender.clone(),
            target: target.clone(),
            amount: content.required_i64("amount")?,
            baker_fee: 0,
            gas_limit: 0,
            storage_limit: 0,
            gas_used: result.optional_i64("consumed_gas").unwrap_or(0),
            storage_used,
            storage_fee: self.storage_fee_of(storage_used),
            allocation_fee: allocated.then(|| self.block.constants.allocation_cost()),
            parameters: content.optional("parameters").map(|v| v.value().clone()),
            errors: result.optional("errors").map(|v| v.value().clone()),
            status,
            reset_deactivation: None,
            internals: InternalFlags::NONE,
        };

        // Operation-level effects: activity counters and block flags only,
        // no fee and no counter advance.
        self.directory.resolve(&sender)?.transactions_count += 1;
        if let Some(address) = &target {
            if address != &sender {
                if let Some(account) = self.directory.resolve_optional(address)? {
                    account.transactions_count += 1;
                }
            }
        }
        if parent_sender != sender && Some(&parent_sender) != target.as_ref() {
            self.directory.resolve(&parent_sender)?.transactions_count += 1;
        }

        let events = self.target_events(target.as_ref())?;
        self.block.events |= events;
        self.block.operations |= OperationFlags::TRANSACTIONS;

        if status.is_applied() {
            let target = target.ok_or(EngineError::MissingTarget)?;

            let burns = record.storage_fee.unwrap_or(0) + record.allocation_fee.unwrap_or(0);
            let parent_delegate = self.directory.effective_delegate(&parent_sender)?;
            accounting::spend(&mut self.directory, &parent_sender, burns)?;
            accounting::stake_delta(&mut self.directory, parent_delegate.as_ref(), -burns)?;

            let sender_delegate = self.directory.effective_delegate(&sender)?;
            accounting::spend(&mut self.directory, &sender, record.amount)?;
            accounting::stake_delta(
                &mut self.directory,
                sender_delegate.as_ref(),
                -record.amount,
            )?;

            accounting::credit(&mut self.directory, &target, record.amount)?;
            let target_delegate = self.directory.effective_delegate(&target)?;
            accounting::stake_delta(
                &mut self.directory,
                target_delegate.as_ref(),
                record.amount,
            )?;

            if self.directory.is_delegate(&target)? {
                if let Some(bump) = grace::refresh(&mut self.directory, &target, &self.block)? {
                    record.reset_deactivation = Some(bump.prev_level);
                    if bump.reactivated {
                        self.block.events |= BlockEvents::DELEGATE_REACTIVATED;
                    }
                }
            }
        }

        debug!(
            id = record.id,
            parent = parent_id,
            status = ?status,
            amount = record.amount,
            "applied internal transaction"
        );
        self.write_set.add(OperationRecord::Transaction(record));
        Ok(())
    }

    /// Exact inverse of `apply_transaction`, driven purely by the stored
    /// record.
    pub fn revert_transaction(&mut self, record: &TransactionOp) -> Result<(), EngineError> {
        let sender = record.sender.clone();
        self.directory.resolve(&sender)?;

        if record.status.is_applied() {
            let target = record.target.clone().ok_or(EngineError::MissingTarget)?;

            let target_delegate = self.directory.effective_delegate(&target)?;
            accounting::debit(&mut self.directory, &target, record.amount)?;
            accounting::stake_delta(
                &mut self.directory,
                target_delegate.as_ref(),
                -record.amount,
            )?;

            if let Some(prev_level) = record.reset_deactivation {
                grace::restore(&mut self.directory, &target, record.level, prev_level)?;
            }

            let costs = record.amount
                + record.storage_fee.unwrap_or(0)
                + record.allocation_fee.unwrap_or(0);
            let sender_delegate = self.directory.effective_delegate(&sender)?;
            accounting::refund(&mut self.directory, &sender, costs)?;
            accounting::stake_delta(&mut self.directory, sender_delegate.as_ref(), costs)?;
        }

        self.refund_baker_fee(&sender, record.baker_fee)?;

        self.directory.resolve(&sender)?.transactions_count -= 1;
        if let Some(address) = &record.target {
            if address != &sender {
                if let Some(account) = self.directory.resolve_optional(address)? {
                    account.transactions_count -= 1;
                }
            }
        }

        self.rewind_counter(&sender, record.counter)?;

        debug!(id = record.id, hash = %record.hash, "reverted transaction");
        self.drop_record(record.id);
        Ok(())
    }

    /// Exact inverse of `apply_internal_transaction`.
    pub fn revert_internal_transaction(
        &mut self,
        record: &TransactionOp,
    ) -> Result<(), EngineError> {
        let sender = record.sender.clone();
        let parent_sender = record
            .initiator
            .clone()
            .ok_or(EngineError::MissingParent)?;
        self.directory.resolve(&sender)?;
        self.directory.resolve(&parent_sender)?;

        if record.status.is_applied() {
            let target = record.target.clone().ok_or(EngineError::MissingTarget)?;

            let target_delegate = self.directory.effective_delegate(&target)?;
            accounting::debit(&mut self.directory, &target, record.amount)?;
            accounting::stake_delta(
                &mut self.directory,
                target_delegate.as_ref(),
                -record.amount,
            )?;

            if let Some(prev_level) = record.reset_deactivation {
                grace::restore(&mut self.directory, &target, record.level, prev_level)?;
            }

            let sender_delegate = self.directory.effective_delegate(&sender)?;
            accounting::refund(&mut self.directory, &sender, record.amount)?;
            accounting::stake_delta(
                &mut self.directory,
                sender_delegate.as_ref(),
                record.amount,
            )?;

            let burns = record.storage_fee.unwrap_or(0) + record.allocation_fee.unwrap_or(0);
            let parent_delegate = self.directory.effective_delegate(&parent_sender)?;
            accounting::refund(&mut self.directory, &parent_sender, burns)?;
            accounting::stake_delta(&mut self.directory, parent_delegate.as_ref(), burns)?;
        }

        self.directory.resolve(&sender)?.transactions_count -= 1;
        if let Some(address) = &record.target {
            if address != &sender {
                if let Some(account) = self.directory.resolve_optional(address)? {
                    account.transactions_count -= 1;
                }
            }
        }
        if parent_sender != sender && Some(&parent_sender) != record.target.as_ref() {
            self.directory.resolve(&parent_sender)?.transactions_count -= 1;
        }

        debug!(id = record.id, "reverted internal transaction");
        self.drop_record(record.id);
        Ok(())
    }
}
