//! Persisted entity models and the persistence collaborator interface.
//!
//! The engine owns all mutation; this crate only defines what an account or
//! operation row looks like at rest, plus a `Store` trait with a sled-backed
//! implementation and an in-memory one for tests.

pub mod account;
pub mod operation;
pub mod store;

pub use account::{Account, ContractKind, DelegateState};
pub use operation::{BlockSummary, DelegationOp, OperationRecord, OriginationOp, TransactionOp};
pub use store::{MemoryStore, SledStore, Store};
