use serde::{Deserialize, Serialize};
use std::fmt;

/// An account address as it appears on chain.
///
/// Addresses are opaque base58 strings; the chain guarantees well-formedness
/// upstream, so the only local validation is non-emptiness. The prefix still
/// carries one bit of meaning: originated contracts start with `KT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        debug_assert!(!raw.is_empty(), "empty address");
        Self(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for originated (contract) addresses.
    pub fn is_contract(&self) -> bool {
        self.0.starts_with("KT")
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_prefix_detection() {
        assert!(Address::new("KT1BUKeZTemW6Pp7gk5tDTsRVRGifM2pXAtY").is_contract());
        assert!(!Address::new("tz1irJKkXS2DBWkU1NnmFQx1c1L7pbGg4yhk").is_contract());
    }

    #[test]
    fn displays_raw_string() {
        let addr = Address::new("tz1abc");
        assert_eq!(addr.to_string(), "tz1abc");
        assert_eq!(addr.as_str(), "tz1abc");
    }
}
