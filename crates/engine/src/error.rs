use meridian_types::{Address, ChainDataError, Mutez, ProtocolError};
use thiserror::Error;

/// Engine errors.
///
/// Apart from `Store`, every variant is an invariant violation: it means the
/// input stream is corrupted, comes from an unsupported protocol version, or
/// revert was run against state apply did not leave behind. The caller
/// aborts the whole block on any of these; partial ledger state would be
/// undetectably wrong.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown account {0}")]
    UnknownAccount(Address),
    #[error("overdraft on {address}: balance {balance}, spend {amount}")]
    Overdraft {
        address: Address,
        balance: Mutez,
        amount: Mutez,
    },
    #[error("negative amount {amount} in accounting call for {address}")]
    NegativeAmount { address: Address, amount: Mutez },
    #[error("account {0} already exists, cannot allocate")]
    AlreadyAllocated(Address),
    #[error("account {0} is not a delegate")]
    NotADelegate(Address),
    #[error("applied transfer without a destination")]
    MissingTarget,
    #[error("internal operation without a pending parent")]
    MissingParent,
    #[error("operation {0} is not in the pending write set")]
    MissingRecord(i64),
    #[error("unsupported operation kind `{0}`")]
    UnsupportedKind(String),
    #[error(transparent)]
    ChainData(#[from] ChainDataError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}
