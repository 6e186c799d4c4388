use crate::error::EngineError;
use meridian_storage::{Account, Store};
use meridian_types::Address;
use std::collections::{HashMap, HashSet};

/// Materializing account cache for one block-processing unit.
///
/// All account mutation anywhere in the engine goes through entities held
/// here, so repeated resolution within a block yields the same mutable
/// instance and no update is lost between operations. Relations between
/// accounts (delegate links) are expressed as address lookups into this
/// arena, never as owned nesting.
///
/// Resolution never creates accounts; operations that allocate accounts do
/// so explicitly through `insert_new`.
pub struct AccountDirectory<'s> {
    store: &'s dyn Store,
    cache: HashMap<Address, Account>,
    dirty: HashSet<Address>,
    /// Allocated during this batch; never persisted if reverted first.
    created: HashSet<Address>,
    /// Persisted accounts whose allocation was reverted; deleted at flush.
    removed: HashSet<Address>,
}

impl<'s> AccountDirectory<'s> {
    pub fn new(store: &'s dyn Store) -> Self {
        Self {
            store,
            cache: HashMap::new(),
            dirty: HashSet::new(),
            created: HashSet::new(),
            removed: HashSet::new(),
        }
    }

    pub fn store(&self) -> &'s dyn Store {
        self.store
    }

    fn ensure_cached(&mut self, address: &Address) -> Result<(), EngineError> {
        if self.cache.contains_key(address) || self.removed.contains(address) {
            return Ok(());
        }
        if let Some(account) = self.store.get_account(address)? {
            self.cache.insert(address.clone(), account);
        }
        Ok(())
    }

    /// Resolve an account that must exist, for mutation. Marks it dirty.
    pub fn resolve(&mut self, address: &Address) -> Result<&mut Account, EngineError> {
        self.ensure_cached(address)?;
        if self.cache.contains_key(address) {
            self.dirty.insert(address.clone());
        }
        self.cache
            .get_mut(address)
            .ok_or_else(|| EngineError::UnknownAccount(address.clone()))
    }

    /// Resolve an account that may not have been allocated yet. Accounts
    /// originated earlier within the current block are cache hits.
    pub fn resolve_optional(
        &mut self,
        address: &Address,
    ) -> Result<Option<&mut Account>, EngineError> {
        self.ensure_cached(address)?;
        if self.cache.contains_key(address) {
            self.dirty.insert(address.clone());
        }
        Ok(self.cache.get_mut(address))
    }

    /// Read-only view; materializes but never marks dirty.
    pub fn peek(&mut self, address: &Address) -> Result<Option<&Account>, EngineError> {
        self.ensure_cached(address)?;
        Ok(self.cache.get(address))
    }

    /// The delegate whose staking balance moves with this account: the
    /// account's delegate link, or the account itself when it is a
    /// delegate. Pure lookup, never allocates.
    pub fn effective_delegate(
        &mut self,
        address: &Address,
    ) -> Result<Option<Address>, EngineError> {
        let account = self
            .peek(address)?
            .ok_or_else(|| EngineError::UnknownAccount(address.clone()))?;
        if let Some(delegate) = &account.delegate {
            Ok(Some(delegate.clone()))
        } else if account.is_delegate() {
            Ok(Some(account.address.clone()))
        } else {
            Ok(None)
        }
    }

    pub fn is_delegate(&mut self, address: &Address) -> Result<bool, EngineError> {
        Ok(self.peek(address)?.map(Account::is_delegate).unwrap_or(false))
    }

    /// Explicit allocation, used only by origination apply.
    pub fn insert_new(&mut self, account: Account) -> Result<(), EngineError> {
        let address = account.address.clone();
        self.ensure_cached(&address)?;
        if self.cache.contains_key(&address) {
            return Err(EngineError::AlreadyAllocated(address));
        }
        self.removed.remove(&address);
        self.created.insert(address.clone());
        self.dirty.insert(address.clone());
        self.cache.insert(address, account);
        Ok(())
    }

    /// Undo an allocation. Accounts created within this batch simply
    /// vanish; accounts materialized from the store are scheduled for
    /// deletion at flush.
    pub fn remove(&mut self, address: &Address) {
        self.cache.remove(address);
        self.dirty.remove(address);
        if !self.created.remove(address) {
            self.removed.insert(address.clone());
        }
    }

    /// Write dirty accounts back and apply scheduled deletions.
    pub fn flush(&mut self) -> Result<usize, EngineError> {
        let mut written = 0;
        for address in self.dirty.drain() {
            if let Some(account) = self.cache.get(&address) {
                self.store.put_account(account.clone())?;
                written += 1;
            }
        }
        for address in self.removed.drain() {
            self.store.delete_account(&address)?;
        }
        self.created.clear();
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_storage::MemoryStore;

    #[test]
    fn resolution_never_creates_accounts() {
        let store = MemoryStore::new();
        let mut dir = AccountDirectory::new(&store);
        let addr = Address::new("tz1ghost");
        assert!(matches!(
            dir.resolve(&addr),
            Err(EngineError::UnknownAccount(_))
        ));
        assert!(dir.resolve_optional(&addr).unwrap().is_none());
        assert!(dir.peek(&addr).unwrap().is_none());
    }

    #[test]
    fn repeated_resolution_yields_same_instance() {
        let store = MemoryStore::new();
        store
            .put_account(Account::implicit(Address::new("tz1abc")))
            .unwrap();
        let mut dir = AccountDirectory::new(&store);
        let addr = Address::new("tz1abc");

        dir.resolve(&addr).unwrap().balance = 500;
        assert_eq!(dir.resolve(&addr).unwrap().balance, 500);
        // nothing written back yet
        assert_eq!(store.get_account(&addr).unwrap().unwrap().balance, 0);

        dir.flush().unwrap();
        assert_eq!(store.get_account(&addr).unwrap().unwrap().balance, 500);
    }

    #[test]
    fn effective_delegate_prefers_link_then_self() {
        let store = MemoryStore::new();
        let baker = Address::new("tz1baker");
        let mut delegator = Account::implicit(Address::new("tz1abc"));
        delegator.delegate = Some(baker.clone());
        store.put_account(delegator).unwrap();
        store.put_account(Account::delegate(baker.clone(), 0)).unwrap();
        store
            .put_account(Account::implicit(Address::new("tz1plain")))
            .unwrap();

        let mut dir = AccountDirectory::new(&store);
        assert_eq!(
            dir.effective_delegate(&Address::new("tz1abc")).unwrap(),
            Some(baker.clone())
        );
        assert_eq!(dir.effective_delegate(&baker).unwrap(), Some(baker));
        assert_eq!(
            dir.effective_delegate(&Address::new("tz1plain")).unwrap(),
            None
        );
    }

    #[test]
    fn reverted_allocation_leaves_no_trace() {
        let store = MemoryStore::new();
        let mut dir = AccountDirectory::new(&store);
        let addr = Address::new("KT1new");
        dir.insert_new(Account::implicit(addr.clone())).unwrap();
        dir.remove(&addr);
        dir.flush().unwrap();
        assert!(store.get_account(&addr).unwrap().is_none());
    }

    #[test]
    fn removing_persisted_account_deletes_on_flush() {
        let store = MemoryStore::new();
        let addr = Address::new("KT1old");
        store.put_account(Account::implicit(addr.clone())).unwrap();

        let mut dir = AccountDirectory::new(&store);
        dir.resolve(&addr).unwrap();
        dir.remove(&addr);
        dir.flush().unwrap();
        assert!(store.get_account(&addr).unwrap().is_none());
    }

    #[test]
    fn double_allocation_is_rejected() {
        let store = MemoryStore::new();
        let mut dir = AccountDirectory::new(&store);
        let addr = Address::new("KT1dup");
        dir.insert_new(Account::implicit(addr.clone())).unwrap();
        assert!(matches!(
            dir.insert_new(Account::implicit(addr)),
            Err(EngineError::AlreadyAllocated(_))
        ));
    }
}
