//! Dense node handles into a [`Kitchen`](super::kitchen::Kitchen).
//!
//! Every edge in the model (item <-> action, instruction <-> instruction,
//! provenance back-references) is stored as a handle rather than a reference,
//! so mirrored adjacency never forms an ownership cycle. Handles are only
//! meaningful for the kitchen that issued them.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! node_handle {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            pub(crate) const LABEL: &'static str = $label;

            #[inline]
            pub(crate) fn from_index(index: usize) -> Self {
                Self(u32::try_from(index).unwrap_or(u32::MAX))
            }

            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            pub const fn as_u32(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $label, self.0)
            }
        }
    };
}

node_handle!(
    /// Handle of an operand node (ingredient or equipment).
    ItemId,
    "item"
);
node_handle!(
    /// Handle of an operator node.
    ActionId,
    "action"
);
node_handle!(
    /// Handle of a recipe step.
    InstructionId,
    "instruction"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_display_and_order() {
        let a = ItemId::from_index(3);
        let b = ItemId::from_index(10);
        assert!(a < b);
        assert_eq!(a.index(), 3);
        assert_eq!(a.to_string(), "item#3");
        assert_eq!(InstructionId::from_index(0).to_string(), "instruction#0");
        assert_eq!(ActionId::LABEL, "action");
    }
}
