use crate::raw::ChainDataError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Outcome of an operation as reported by the chain.
///
/// Only `Applied` operations realize balance effects; the other three keep
/// the operation-level effects (fee, counters) and nothing else. An
/// unrecognized status string means the input stream comes from a protocol
/// version this engine does not support, which is fatal for the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
    Applied,
    Backtracked,
    Failed,
    Skipped,
}

impl OperationStatus {
    pub fn is_applied(self) -> bool {
        matches!(self, OperationStatus::Applied)
    }
}

impl FromStr for OperationStatus {
    type Err = ChainDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "applied" => Ok(OperationStatus::Applied),
            "backtracked" => Ok(OperationStatus::Backtracked),
            "failed" => Ok(OperationStatus::Failed),
            "skipped" => Ok(OperationStatus::Skipped),
            other => Err(ChainDataError::UnknownStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_statuses() {
        assert_eq!("applied".parse::<OperationStatus>().unwrap(), OperationStatus::Applied);
        assert_eq!(
            "backtracked".parse::<OperationStatus>().unwrap(),
            OperationStatus::Backtracked
        );
        assert_eq!("failed".parse::<OperationStatus>().unwrap(), OperationStatus::Failed);
        assert_eq!("skipped".parse::<OperationStatus>().unwrap(), OperationStatus::Skipped);
    }

    #[test]
    fn unknown_status_is_an_error() {
        let err = "halted".parse::<OperationStatus>().unwrap_err();
        assert!(matches!(err, ChainDataError::UnknownStatus(s) if s == "halted"));
    }
}
