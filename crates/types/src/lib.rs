//! Chain-facing value types shared across the meridian workspace.

pub mod address;
pub mod flags;
pub mod protocol;
pub mod raw;
pub mod status;

pub use address::Address;
pub use flags::{BlockEvents, InternalFlags, OperationFlags};
pub use protocol::{ProtocolConstants, ProtocolError, ProtocolTable, StaticProtocolTable};
pub use raw::{ChainDataError, RawObject};
pub use status::OperationStatus;

/// Smallest indivisible unit of the chain's currency. Signed, because the
/// revert window may pass through states a live balance check would reject.
pub type Mutez = i64;
