use meridian_types::{
    Address, BlockEvents, InternalFlags, Mutez, OperationFlags, OperationStatus,
};
use serde::{Deserialize, Serialize};

/// Transfer of value between two accounts, possibly triggered internally by
/// a contract execution (in which case `initiator` is set and the fee is
/// zero).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionOp {
    /// Process-unique monotonic id, assigned on first apply and never
    /// reassigned, so reverted history stays addressable.
    pub id: i64,
    pub level: i64,
    pub timestamp: u64,
    pub hash: String,
    pub counter: i64,
    /// Internal operations are disambiguated by nonce within their parent.
    pub nonce: Option<i64>,
    /// Original sender of the triggering top-level operation, set for
    /// internal operations only.
    pub initiator: Option<Address>,
    pub sender: Address,
    pub target: Option<Address>,
    pub amount: Mutez,
    pub baker_fee: Mutez,
    pub gas_limit: i64,
    pub storage_limit: i64,
    pub gas_used: i64,
    pub storage_used: i64,
    pub storage_fee: Option<Mutez>,
    pub allocation_fee: Option<Mutez>,
    pub parameters: Option<serde_json::Value>,
    pub errors: Option<serde_json::Value>,
    pub status: OperationStatus,
    /// Delegate's deactivation level before this operation bumped it;
    /// the single piece of state revert needs to undo a grace-period
    /// refresh exactly.
    pub reset_deactivation: Option<i64>,
    /// Which operation kinds this operation triggered internally.
    pub internals: InternalFlags,
}

impl TransactionOp {
    pub fn is_internal(&self) -> bool {
        self.initiator.is_some()
    }
}

/// Rewrite of an account's delegate link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationOp {
    pub id: i64,
    pub level: i64,
    pub timestamp: u64,
    pub hash: String,
    pub counter: i64,
    pub sender: Address,
    /// New delegate; absent means the sender undelegates.
    pub delegate: Option<Address>,
    /// Link before the rewrite, kept for exact undo.
    pub prev_delegate: Option<Address>,
    pub baker_fee: Mutez,
    pub gas_limit: i64,
    pub gas_used: i64,
    pub errors: Option<serde_json::Value>,
    pub status: OperationStatus,
    pub reset_deactivation: Option<i64>,
}

/// Explicit allocation of a new contract account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginationOp {
    pub id: i64,
    pub level: i64,
    pub timestamp: u64,
    pub hash: String,
    pub counter: i64,
    pub sender: Address,
    /// Address of the allocated contract, present when the result applied.
    pub contract: Option<Address>,
    pub contract_delegate: Option<Address>,
    /// Principal endowed to the new contract.
    pub balance: Mutez,
    pub baker_fee: Mutez,
    pub gas_limit: i64,
    pub storage_limit: i64,
    pub gas_used: i64,
    pub storage_used: i64,
    pub storage_fee: Option<Mutez>,
    pub allocation_fee: Option<Mutez>,
    pub errors: Option<serde_json::Value>,
    pub status: OperationStatus,
    pub reset_deactivation: Option<i64>,
}

/// Uniform view over all operation kinds for the write set and storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationRecord {
    Transaction(TransactionOp),
    Delegation(DelegationOp),
    Origination(OriginationOp),
}

impl OperationRecord {
    pub fn id(&self) -> i64 {
        match self {
            OperationRecord::Transaction(op) => op.id,
            OperationRecord::Delegation(op) => op.id,
            OperationRecord::Origination(op) => op.id,
        }
    }

    pub fn level(&self) -> i64 {
        match self {
            OperationRecord::Transaction(op) => op.level,
            OperationRecord::Delegation(op) => op.level,
            OperationRecord::Origination(op) => op.level,
        }
    }
}

/// Per-block derived aggregate persisted alongside operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub level: i64,
    pub timestamp: u64,
    pub baker: Address,
    pub protocol_code: String,
    pub operations: OperationFlags,
    pub events: BlockEvents,
    pub fees: Mutez,
}
