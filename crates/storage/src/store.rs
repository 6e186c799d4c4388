use crate::{Account, BlockSummary, OperationRecord};
use anyhow::Result;
use meridian_types::Address;
use parking_lot::RwLock;
use sled::{Db, Tree};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Abstract persistence collaborator.
///
/// The engine batches entities in its own write set and only touches the
/// store when materializing accounts and at flush boundaries; nothing here
/// participates in the per-operation state machine.
pub trait Store {
    fn get_account(&self, address: &Address) -> Result<Option<Account>>;
    fn put_account(&self, account: Account) -> Result<()>;
    /// Only ever called for accounts whose allocation was reverted.
    fn delete_account(&self, address: &Address) -> Result<()>;
    fn put_operation(&self, record: OperationRecord) -> Result<()>;
    fn delete_operation(&self, id: i64) -> Result<()>;
    fn get_operation(&self, id: i64) -> Result<Option<OperationRecord>>;
    /// Operations of one block, in ascending id (chain) order.
    fn get_operations_by_level(&self, level: i64) -> Result<Vec<OperationRecord>>;
    fn put_block(&self, summary: BlockSummary) -> Result<()>;
    fn delete_block(&self, level: i64) -> Result<()>;
    fn get_block(&self, level: i64) -> Result<Option<BlockSummary>>;
    fn head_level(&self) -> Result<i64>;
    fn set_head_level(&self, level: i64) -> Result<()>;
    fn flush(&self) -> Result<()>;
}

/// Sled-backed implementation.
pub struct SledStore {
    db: Db,
    accounts: Tree,
    operations: Tree,
    blocks: Tree,
    metadata: Tree,
}

impl SledStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        let accounts = db.open_tree("accounts")?;
        let operations = db.open_tree("operations")?;
        let blocks = db.open_tree("blocks")?;
        let metadata = db.open_tree("metadata")?;
        tracing::info!(
            accounts = accounts.len(),
            operations = operations.len(),
            "opened ledger store"
        );
        Ok(Self {
            db,
            accounts,
            operations,
            blocks,
            metadata,
        })
    }
}

impl Store for SledStore {
    fn get_account(&self, address: &Address) -> Result<Option<Account>> {
        self.accounts
            .get(address.as_str().as_bytes())?
            .map(|v| serde_json::from_slice(&v))
            .transpose()
            .map_err(Into::into)
    }

    fn put_account(&self, account: Account) -> Result<()> {
        let data = serde_json::to_vec(&account)?;
        self.accounts
            .insert(account.address.as_str().as_bytes(), data)?;
        Ok(())
    }

    fn delete_account(&self, address: &Address) -> Result<()> {
        self.accounts.remove(address.as_str().as_bytes())?;
        Ok(())
    }

    fn put_operation(&self, record: OperationRecord) -> Result<()> {
        let data = serde_json::to_vec(&record)?;
        self.operations.insert(record.id().to_be_bytes(), data)?;
        Ok(())
    }

    fn delete_operation(&self, id: i64) -> Result<()> {
        self.operations.remove(id.to_be_bytes())?;
        Ok(())
    }

    fn get_operation(&self, id: i64) -> Result<Option<OperationRecord>> {
        self.operations
            .get(id.to_be_bytes())?
            .map(|v| serde_json::from_slice(&v))
            .transpose()
            .map_err(Into::into)
    }

    fn get_operations_by_level(&self, level: i64) -> Result<Vec<OperationRecord>> {
        let mut records = Vec::new();
        for item in self.operations.iter() {
            let (_, v) = item?;
            let record: OperationRecord = serde_json::from_slice(&v)?;
            if record.level() == level {
                records.push(record);
            }
        }
        records.sort_by_key(|r| r.id());
        Ok(records)
    }

    fn put_block(&self, summary: BlockSummary) -> Result<()> {
        let data = serde_json::to_vec(&summary)?;
        self.blocks.insert(summary.level.to_be_bytes(), data)?;
        Ok(())
    }

    fn delete_block(&self, level: i64) -> Result<()> {
        self.blocks.remove(level.to_be_bytes())?;
        Ok(())
    }

    fn get_block(&self, level: i64) -> Result<Option<BlockSummary>> {
        self.blocks
            .get(level.to_be_bytes())?
            .map(|v| serde_json::from_slice(&v))
            .transpose()
            .map_err(Into::into)
    }

    fn head_level(&self) -> Result<i64> {
        Ok(self
            .metadata
            .get(b"head_level")?
            .map(|v| i64::from_be_bytes(v.as_ref().try_into().unwrap_or([0u8; 8])))
            .unwrap_or(0))
    }

    fn set_head_level(&self, level: i64) -> Result<()> {
        self.metadata.insert(b"head_level", &level.to_be_bytes())?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

/// In-memory testing backend.
#[derive(Default)]
pub struct MemoryStore {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
    operations: Arc<RwLock<HashMap<i64, OperationRecord>>>,
    blocks: Arc<RwLock<HashMap<i64, BlockSummary>>>,
    head_level: Arc<RwLock<i64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get_account(&self, address: &Address) -> Result<Option<Account>> {
        Ok(self.accounts.read().get(address.as_str()).cloned())
    }

    fn put_account(&self, account: Account) -> Result<()> {
        self.accounts
            .write()
            .insert(account.address.as_str().to_string(), account);
        Ok(())
    }

    fn delete_account(&self, address: &Address) -> Result<()> {
        self.accounts.write().remove(address.as_str());
        Ok(())
    }

    fn put_operation(&self, record: OperationRecord) -> Result<()> {
        self.operations.write().insert(record.id(), record);
        Ok(())
    }

    fn delete_operation(&self, id: i64) -> Result<()> {
        self.operations.write().remove(&id);
        Ok(())
    }

    fn get_operation(&self, id: i64) -> Result<Option<OperationRecord>> {
        Ok(self.operations.read().get(&id).cloned())
    }

    fn get_operations_by_level(&self, level: i64) -> Result<Vec<OperationRecord>> {
        let mut records: Vec<_> = self
            .operations
            .read()
            .values()
            .filter(|r| r.level() == level)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.id());
        Ok(records)
    }

    fn put_block(&self, summary: BlockSummary) -> Result<()> {
        self.blocks.write().insert(summary.level, summary);
        Ok(())
    }

    fn delete_block(&self, level: i64) -> Result<()> {
        self.blocks.write().remove(&level);
        Ok(())
    }

    fn get_block(&self, level: i64) -> Result<Option<BlockSummary>> {
        Ok(self.blocks.read().get(&level).cloned())
    }

    fn head_level(&self) -> Result<i64> {
        Ok(*self.head_level.read())
    }

    fn set_head_level(&self, level: i64) -> Result<()> {
        *self.head_level.write() = level;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Account;
    use meridian_types::OperationStatus;

    fn sample_transaction(id: i64, level: i64) -> OperationRecord {
        OperationRecord::Transaction(crate::TransactionOp {
            id,
            level,
            timestamp: 1_000,
            hash: format!("op{id}"),
            counter: 1,
            nonce: None,
            initiator: None,
            sender: Address::new("tz1sender"),
            target: Some(Address::new("tz1target")),
            amount: 300,
            baker_fee: 10,
            gas_limit: 10_000,
            storage_limit: 0,
            gas_used: 1_420,
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
    fn memory_store_account_roundtrip() {
        let store = MemoryStore::new();
        let addr = Address::new("tz1abc");
        assert!(store.get_account(&addr).unwrap().is_none());

        let mut account = Account::implicit(addr.clone());
        account.balance = 777;
        store.put_account(account).unwrap();

        let loaded = store.get_account(&addr).unwrap().expect("account");
        assert_eq!(loaded.balance, 777);
    }

    #[test]
    fn operations_listed_by_level_in_id_order() {
        let store = MemoryStore::new();
        store.put_operation(sample_transaction(3, 5)).unwrap();
        store.put_operation(sample_transaction(1, 5)).unwrap();
        store.put_operation(sample_transaction(2, 4)).unwrap();

        let level5 = store.get_operations_by_level(5).unwrap();
        assert_eq!(level5.iter().map(|r| r.id()).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn sled_store_roundtrip() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let store = SledStore::new(dir.path()).expect("open");

        let addr = Address::new("tz1abc");
        store.put_account(Account::implicit(addr.clone())).unwrap();
        assert!(store.get_account(&addr).unwrap().is_some());

        store.put_operation(sample_transaction(7, 2)).unwrap();
        assert!(store.get_operation(7).unwrap().is_some());
        store.delete_operation(7).unwrap();
        assert!(store.get_operation(7).unwrap().is_none());

        store.set_head_level(2).unwrap();
        assert_eq!(store.head_level().unwrap(), 2);
    }
}
