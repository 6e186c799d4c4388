use serde::{Deserialize, Serialize};
use std::ops::{BitOr, BitOrAssign};

macro_rules! flag_set {
    ($(#[$doc:meta])* $name:ident { $($(#[$fdoc:meta])* $flag:ident = $bit:expr;)* }) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            pub const NONE: $name = $name(0);
            $($(#[$fdoc])* pub const $flag: $name = $name($bit);)*

            pub fn contains(self, other: $name) -> bool {
                self.0 & other.0 == other.0
            }

            pub fn is_empty(self) -> bool {
                self.0 == 0
            }
        }

        impl BitOr for $name {
            type Output = $name;
            fn bitor(self, rhs: $name) -> $name {
                $name(self.0 | rhs.0)
            }
        }

        impl BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: $name) {
                self.0 |= rhs.0;
            }
        }
    };
}

flag_set! {
    /// Which operation kinds occurred in a block.
    OperationFlags {
        TRANSACTIONS = 1 << 0;
        DELEGATIONS = 1 << 1;
        ORIGINATIONS = 1 << 2;
    }
}

flag_set! {
    /// Semantic event categories fired by a block, consumed by downstream
    /// indexing and notification.
    BlockEvents {
        /// A smart contract was the target of an operation.
        SMART_CONTRACTS = 1 << 0;
        /// A previously deactivated delegate came back to life.
        DELEGATE_REACTIVATED = 1 << 1;
    }
}

flag_set! {
    /// Which operation kinds a top-level operation triggered internally.
    InternalFlags {
        TRANSACTIONS = 1 << 0;
        ORIGINATIONS = 1 << 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn or_accumulates_bits() {
        let mut flags = OperationFlags::NONE;
        flags |= OperationFlags::TRANSACTIONS;
        flags |= OperationFlags::DELEGATIONS;
        assert!(flags.contains(OperationFlags::TRANSACTIONS));
        assert!(flags.contains(OperationFlags::DELEGATIONS));
        assert!(!flags.contains(OperationFlags::ORIGINATIONS));
    }

    #[test]
    fn or_is_idempotent() {
        let once = BlockEvents::SMART_CONTRACTS;
        let twice = once | BlockEvents::SMART_CONTRACTS;
        assert_eq!(once, twice);
    }

    #[test]
    fn none_is_empty() {
        assert!(InternalFlags::NONE.is_empty());
        assert!(!InternalFlags::TRANSACTIONS.is_empty());
    }
}
