use meridian_storage::BlockSummary;
use meridian_types::{
    Address, BlockEvents, Mutez, OperationFlags, ProtocolConstants, ProtocolError, ProtocolTable,
};

/// One block being processed.
///
/// Carries the chain position, the baker, the protocol constants in effect
/// (looked up once and cached here), and the accumulating per-block
/// aggregates. The aggregate fields are mutated only through apply/revert of
/// the block's operations and the block is never partially persisted.
#[derive(Debug, Clone)]
pub struct Block {
    pub level: i64,
    pub timestamp: u64,
    pub baker: Address,
    pub constants: ProtocolConstants,
    /// Which operation kinds occurred.
    pub operations: OperationFlags,
    /// Semantic event categories fired.
    pub events: BlockEvents,
    /// Total fees paid to the baker.
    pub fees: Mutez,
    /// Contract addresses allocated earlier within this block, consulted
    /// when later operations forward-reference them.
    pub originated: Vec<Address>,
}

impl Block {
    pub fn new(level: i64, timestamp: u64, baker: Address, constants: ProtocolConstants) -> Self {
        Self {
            level,
            timestamp,
            baker,
            constants,
            operations: OperationFlags::NONE,
            events: BlockEvents::NONE,
            fees: 0,
            originated: Vec::new(),
        }
    }

    /// Build a block by looking the protocol constants up by code.
    pub fn from_protocol(
        level: i64,
        timestamp: u64,
        baker: Address,
        table: &dyn ProtocolTable,
        code: &str,
    ) -> Result<Self, ProtocolError> {
        Ok(Self::new(level, timestamp, baker, table.get(code)?))
    }

    pub fn summary(&self) -> BlockSummary {
        BlockSummary {
            level: self.level,
            timestamp: self.timestamp,
            baker: self.baker.clone(),
            protocol_code: self.constants.code.clone(),
            operations: self.operations,
            events: self.events,
            fees: self.fees,
        }
    }
}
