//! Reversible ledger state-transition engine.
//!
//! Consumes decoded per-operation payloads and mutates derived ledger state
//! (balances, staking balances, delegate bookkeeping, per-block aggregates)
//! so that every mutation performed on apply has an exact inverse performed
//! on revert. The upstream chain can reorganize, so already-indexed blocks
//! must be undoable without a resync and without recomputation: everything
//! revert needs is stored on the operation record itself.
//!
//! Processing is strictly sequential within a block. The engine holds
//! exclusive ownership of its account cache for the duration of one
//! block-processing unit; abandoning mid-block drops the pending write set
//! wholesale.

pub mod accounting;
pub mod block;
pub mod commits;
pub mod directory;
pub mod error;
pub mod grace;
pub mod ids;
pub mod processor;
pub mod writeset;

pub use block::Block;
pub use directory::AccountDirectory;
pub use error::EngineError;
pub use grace::GracePeriod;
pub use ids::IdAllocator;
pub use processor::BlockProcessor;
pub use writeset::WriteSet;
