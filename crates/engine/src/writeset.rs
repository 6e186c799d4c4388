use meridian_storage::{OperationRecord, TransactionOp};

/// Pending write set for one block-processing unit.
///
/// Entities created during apply are appended here and only persisted at
/// the commit boundary; revert removes them again. Insertion order is chain
/// order.
#[derive(Debug, Default)]
pub struct WriteSet {
    records: Vec<OperationRecord>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: OperationRecord) {
        self.records.push(record);
    }

    pub fn remove(&mut self, id: i64) -> Option<OperationRecord> {
        let pos = self.records.iter().position(|r| r.id() == id)?;
        Some(self.records.remove(pos))
    }

    /// Mutable handle to a pending top-level transaction, used when an
    /// internal operation updates its parent's bookkeeping.
    pub fn transaction_mut(&mut self, id: i64) -> Option<&mut TransactionOp> {
        self.records.iter_mut().find_map(|r| match r {
            OperationRecord::Transaction(op) if op.id == id => Some(op),
            _ => None,
        })
    }

    pub fn records(&self) -> &[OperationRecord] {
        &self.records
    }

    pub fn drain(&mut self) -> Vec<OperationRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_types::{Address, OperationStatus};

    fn transaction(id: i64) -> OperationRecord {
        OperationRecord::Transaction(TransactionOp {
            id,
            level: 1,
            timestamp: 0,
            hash: "op".to_string(),
            counter: 1,
            nonce: None,
            initiator: None,
            sender: Address::new("tz1abc"),
            target: None,
            amount: 0,
            baker_fee: 0,
            gas_limit: 0,
            storage_limit: 0,
            gas_used: 0,
            storage_used: 0,
            storage_fee: None,
            allocation_fee: None,
            parameters: None,
            errors: None,
            status: OperationStatus::Applied,
            reset_deactivation: None,
            internals: Default::default(),
        })
    }

    #[test]
    fn preserves_insertion_order() {
        let mut set = WriteSet::new();
        set.add(transaction(2));
        set.add(transaction(1));
        let ids: Vec<_> = set.records().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn remove_by_id() {
        let mut set = WriteSet::new();
        set.add(transaction(1));
        set.add(transaction(2));
        assert!(set.remove(1).is_some());
        assert!(set.remove(1).is_none());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn parent_lookup_finds_pending_transaction() {
        let mut set = WriteSet::new();
        set.add(transaction(5));
        set.transaction_mut(5).expect("parent").amount = 77;
        assert!(set.transaction_mut(6).is_none());
    }
}
