use crate::block::Block;
use crate::directory::AccountDirectory;
use crate::error::EngineError;
use crate::ids::IdAllocator;
use crate::writeset::WriteSet;
use meridian_storage::{Account, BlockSummary, OperationRecord, Store};
use meridian_types::{Address, ChainDataError, RawObject};
use tracing::{debug, info};

/// Drives apply/revert for one block.
///
/// Owns the account cache, the pending write set, and the block aggregate
/// for the duration of one block-processing unit; the identifier allocator
/// is process-wide and borrowed. Dropping the processor without calling
/// `commit` or `rollback` discards all in-progress work — there is no
/// partial commit.
pub struct BlockProcessor<'a> {
    pub(crate) directory: AccountDirectory<'a>,
    pub(crate) ids: &'a mut IdAllocator,
    pub(crate) write_set: WriteSet,
    pub(crate) block: Block,
    /// Id of the most recently applied top-level transaction, the parent
    /// for any internal operations that follow in document order.
    pub(crate) last_parent: Option<i64>,
    /// Ids removed by revert, deleted from the store at rollback.
    pub(crate) removed: Vec<i64>,
    store: &'a dyn Store,
}

impl<'a> BlockProcessor<'a> {
    pub fn new(store: &'a dyn Store, ids: &'a mut IdAllocator, block: Block) -> Self {
        Self {
            directory: AccountDirectory::new(store),
            ids,
            write_set: WriteSet::new(),
            block,
            last_parent: None,
            removed: Vec::new(),
            store,
        }
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    pub fn write_set(&self) -> &WriteSet {
        &self.write_set
    }

    /// Current in-cache view of an account, for callers inspecting state
    /// mid-batch.
    pub fn account(&mut self, address: &Address) -> Result<Option<&Account>, EngineError> {
        self.directory.peek(address)
    }

    /// Apply every operation group of a decoded block payload, in chain
    /// order. `raw` is the block's `operations` array: groups with a `hash`
    /// and a `contents` array, exactly as the chain data source delivers
    /// them.
    pub fn apply_operations(&mut self, raw: RawObject) -> Result<(), EngineError> {
        let groups = raw
            .value()
            .as_array()
            .ok_or_else(|| ChainDataError::WrongType {
                field: "operations".to_string(),
                expected: "array",
            })?;
        for group in groups.iter().map(RawObject::new) {
            self.apply_operation_group(group)?;
        }
        Ok(())
    }

    /// Apply one operation group (shared hash, ordered contents). Internal
    /// operations are applied depth-first right after their parent's
    /// top-level effects, before the next top-level content.
    pub fn apply_operation_group(&mut self, group: RawObject) -> Result<(), EngineError> {
        for content in group.required_array("contents")? {
            match content.required_str("kind")? {
                "transaction" => {
                    self.apply_transaction(group, content)?;
                    let metadata = content.required("metadata")?;
                    if let Some(internals) = metadata.optional_array("internal_operation_results")
                    {
                        for internal in internals {
                            match internal.required_str("kind")? {
                                "transaction" => self.apply_internal_transaction(internal)?,
                                other => {
                                    return Err(EngineError::UnsupportedKind(other.to_string()))
                                }
                            }
                        }
                    }
                }
                "delegation" => self.apply_delegation(group, content)?,
                "origination" => self.apply_origination(group, content)?,
                other => return Err(EngineError::UnsupportedKind(other.to_string())),
            }
        }
        Ok(())
    }

    /// Undo a block's operations in reverse chronological order (and
    /// reverse nesting order for internals). Reconstructs every side effect
    /// purely from the stored records: no fresh chain data is consulted
    /// beyond re-resolving accounts by the addresses on the records.
    pub fn revert_operations(
        &mut self,
        records: Vec<OperationRecord>,
    ) -> Result<(), EngineError> {
        for record in records.into_iter().rev() {
            match record {
                OperationRecord::Transaction(op) if op.is_internal() => {
                    self.revert_internal_transaction(&op)?
                }
                OperationRecord::Transaction(op) => self.revert_transaction(&op)?,
                OperationRecord::Delegation(op) => self.revert_delegation(&op)?,
                OperationRecord::Origination(op) => self.revert_origination(&op)?,
            }
        }
        Ok(())
    }

    /// Persist the processed block: operations, block summary, dirty
    /// accounts, head level.
    pub fn commit(mut self) -> Result<BlockSummary, EngineError> {
        let summary = self.block.summary();
        let operations = self.write_set.drain();
        let op_count = operations.len();
        for record in operations {
            self.store.put_operation(record)?;
        }
        let accounts = self.directory.flush()?;
        self.store.put_block(summary.clone())?;
        self.store.set_head_level(self.block.level)?;
        self.store.flush()?;
        info!(
            level = self.block.level,
            operations = op_count,
            accounts,
            fees = self.block.fees,
            "committed block"
        );
        Ok(summary)
    }

    /// Persist the effects of reverting an already-committed block:
    /// reverted operations and the block summary are deleted, mutated
    /// accounts written back, head level stepped down.
    pub fn rollback(mut self) -> Result<(), EngineError> {
        for id in &self.removed {
            self.store.delete_operation(*id)?;
        }
        self.store.delete_block(self.block.level)?;
        let accounts = self.directory.flush()?;
        self.store.set_head_level(self.block.level - 1)?;
        self.store.flush()?;
        info!(
            level = self.block.level,
            operations = self.removed.len(),
            accounts,
            "rolled back block"
        );
        Ok(())
    }

    pub(crate) fn drop_record(&mut self, id: i64) {
        self.write_set.remove(id);
        self.removed.push(id);
        debug!(id, "removed operation from pending write set");
    }
}
