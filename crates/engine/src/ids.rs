/// Process-wide monotonic identifier allocator.
///
/// Operation ids are assigned once, on first apply, and never reassigned:
/// ids consumed by later-reverted operations leave permanent gaps so that
/// history stays addressable. The manager counter is a ceiling used for
/// replay-protection bookkeeping; revert releases one slot per reverted
/// manager operation.
///
/// Explicitly constructed and passed into the engine, never ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAllocator {
    next_operation_id: i64,
    manager_counter: i64,
}

impl IdAllocator {
    pub fn new(next_operation_id: i64, manager_counter: i64) -> Self {
        Self {
            next_operation_id,
            manager_counter,
        }
    }

    /// Allocate the next operation id. Monotonic, gap-tolerant.
    pub fn next_operation_id(&mut self) -> i64 {
        let id = self.next_operation_id;
        self.next_operation_id += 1;
        id
    }

    pub fn manager_counter(&self) -> i64 {
        self.manager_counter
    }

    pub fn bump_manager_counter(&mut self) {
        self.manager_counter += 1;
    }

    pub fn release_manager_counter(&mut self) {
        self.manager_counter -= 1;
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new(1, 0)
    }
}
