use crate::Mutez;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("no constants registered for protocol `{0}`")]
    UnknownProtocol(String),
}

/// Immutable cost and cycle parameters in effect under one protocol version.
///
/// Looked up once per block and cached on the block for the duration of its
/// processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConstants {
    /// Protocol code (hash prefix) these constants belong to.
    pub code: String,
    /// Cost of one byte of on-chain storage.
    pub byte_cost: Mutez,
    /// Flat byte size charged for allocating a fresh account.
    pub origination_size: i64,
    /// Blocks per cycle, the granularity of delegate lifecycle accounting.
    pub blocks_per_cycle: i64,
    /// How many past cycles stay relevant for delegate rights.
    pub preserved_cycles: i64,
}

impl ProtocolConstants {
    /// Cost of allocating a fresh account under these constants.
    pub fn allocation_cost(&self) -> Mutez {
        self.origination_size * self.byte_cost
    }

    /// First level of the cycle containing `level`.
    pub fn cycle_start(&self, level: i64) -> i64 {
        level - level % self.blocks_per_cycle
    }
}

/// Constants collaborator: versioned lookup by protocol code.
pub trait ProtocolTable {
    fn get(&self, code: &str) -> Result<ProtocolConstants, ProtocolError>;
}

/// Fixed in-memory table, sufficient for tests and embedding.
#[derive(Debug, Default)]
pub struct StaticProtocolTable {
    entries: HashMap<String, ProtocolConstants>,
}

impl StaticProtocolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, constants: ProtocolConstants) -> Self {
        self.entries.insert(constants.code.clone(), constants);
        self
    }
}

impl ProtocolTable for StaticProtocolTable {
    fn get(&self, code: &str) -> Result<ProtocolConstants, ProtocolError> {
        self.entries
            .get(code)
            .cloned()
            .ok_or_else(|| ProtocolError::UnknownProtocol(code.to_string()))
    }
}
