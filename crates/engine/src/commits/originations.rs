use crate::accounting;
use crate::error::EngineError;
use crate::grace;
use crate::processor::BlockProcessor;
use meridian_storage::{Account, ContractKind, OperationRecord, OriginationOp};
use meridian_types::{Address, BlockEvents, ChainDataError, OperationFlags, RawObject};
use tracing::debug;

impl BlockProcessor<'_> {
    /// Apply an explicit allocation of a new contract account — the only
    /// place in the engine where resolution failure turns into creation.
    pub fn apply_origination(
        &mut self,
        group: RawObject,
        content: RawObject,
    ) -> Result<(), EngineError> {
        let sender = Address::new(content.required_str("source")?);
        let contract_delegate = content.optional_str("delegate").map(Address::new);
        let is_smart = content.optional("script").is_some();

        self.directory.resolve(&sender)?;

        let result = content.required("metadata")?.required("operation_result")?;
        let status = Self::parse_status(result)?;
        let storage_used = result.optional_i64("paid_storage_size_diff").unwrap_or(0);

        let contract = if status.is_applied() {
            let address = result
                .required_array("originated_contracts")?
                .next()
                .and_then(|v| v.value().as_str())
                .map(Address::new)
                .ok_or_else(|| ChainDataError::MissingField("originated_contracts".into()))?;
            Some(address)
        } else {
            None
        };

        let mut record = OriginationOp {
            id: self.ids.next_operation_id(),
            level: self.block.level,
            timestamp: self.block.timestamp,
            hash: group.required_str("hash")?.to_string(),
            counter: content.required_i64("counter")?,
            sender: sender.clone(),
            contract: contract.clone(),
            contract_delegate: contract_delegate.clone(),
            balance: content.required_i64("balance")?,
            baker_fee: content.required_i64("fee")?,
            gas_limit: content.required_i64("gas_limit")?,
            storage_limit: content.required_i64("storage_limit")?,
            gas_used: result.optional_i64("consumed_gas").unwrap_or(0),
            storage_used,
            storage_fee: self.storage_fee_of(storage_used),
            allocation_fee: status
                .is_applied()
                .then(|| self.block.constants.allocation_cost()),
            errors: result.optional("errors").map(|v| v.value().clone()),
            status,
            reset_deactivation: None,
        };

        // Operation-level effects.
        self.charge_baker_fee(&sender, record.baker_fee)?;
        self.directory.resolve(&sender)?.originations_count += 1;
        self.block.operations |= OperationFlags::ORIGINATIONS;
        self.advance_counter(&sender, record.counter)?;

        // Result effects: allocate the contract and endow it.
        if status.is_applied() {
            let address = contract.ok_or(EngineError::MissingTarget)?;

            let costs = record.balance
                + record.storage_fee.unwrap_or(0)
                + record.allocation_fee.unwrap_or(0);
            let sender_delegate = self.directory.effective_delegate(&sender)?;
            accounting::spend(&mut self.directory, &sender, costs)?;
            accounting::stake_delta(&mut self.directory, sender_delegate.as_ref(), -costs)?;

            let kind = if is_smart {
                ContractKind::SmartContract
            } else {
                ContractKind::DelegatorContract
            };
            let mut account = Account::contract(address.clone(), kind);
            account.balance = record.balance;
            account.delegate = contract_delegate.clone();
            account.originations_count = 1;
            self.directory.insert_new(account)?;
            self.block.originated.push(address.clone());

            if let Some(delegate) = &contract_delegate {
                self.directory.resolve(delegate)?;
                accounting::stake_delta(&mut self.directory, Some(delegate), record.balance)?;
                if let Some(bump) = grace::refresh(&mut self.directory, delegate, &self.block)? {
                    record.reset_deactivation = Some(bump.prev_level);
                    if bump.reactivated {
                        self.block.events |= BlockEvents::DELEGATE_REACTIVATED;
                    }
                }
            }

            if is_smart {
                self.block.events |= BlockEvents::SMART_CONTRACTS;
            }
        }

        debug!(
            id = record.id,
            hash = %record.hash,
            status = ?status,
            contract = ?record.contract,
            "applied origination"
        );
        self.write_set.add(OperationRecord::Origination(record));
        Ok(())
    }

    /// Exact inverse of `apply_origination`. The allocated account was
    /// created by this operation, so undoing it deletes the account
    /// outright rather than mutating it back.
    pub fn revert_origination(&mut self, record: &OriginationOp) -> Result<(), EngineError> {
        let sender = record.sender.clone();
        self.directory.resolve(&sender)?;

        if record.status.is_applied() {
            let address = record.contract.clone().ok_or(EngineError::MissingTarget)?;

            if let Some(delegate) = &record.contract_delegate {
                accounting::stake_delta(&mut self.directory, Some(delegate), -record.balance)?;
                if let Some(prev_level) = record.reset_deactivation {
                    grace::restore(&mut self.directory, delegate, record.level, prev_level)?;
                }
            }

            self.directory.remove(&address);
            self.block.originated.retain(|a| a != &address);

            let costs = record.balance
                + record.storage_fee.unwrap_or(0)
                + record.allocation_fee.unwrap_or(0);
            let sender_delegate = self.directory.effective_delegate(&sender)?;
            accounting::refund(&mut self.directory, &sender, costs)?;
            accounting::stake_delta(&mut self.directory, sender_delegate.as_ref(), costs)?;
        }

        self.refund_baker_fee(&sender, record.baker_fee)?;
        self.directory.resolve(&sender)?.originations_count -= 1;
        self.rewind_counter(&sender, record.counter)?;

        debug!(id = record.id, hash = %record.hash, "reverted origination");
        self.drop_record(record.id);
        Ok(())
    }
}
