//! Errors raised by graph mutators.
//!
//! Cycles are not errors: `has_cycle`, `validate_dag_structure` and
//! `get_topological_order` report them through their return values.

use super::symbol::SymbolKind;

/// Contract violation detected at the call that caused it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// A non-ACTION symbol was used where an operator is required.
    #[error("symbol '{name}' is {kind}, not an action")]
    InvalidOperand { name: String, kind: SymbolKind },

    /// A vessel operation was called on equipment that cannot hold contents.
    #[error("equipment '{0}' is not a vessel")]
    NotAVessel(String),

    /// `combine_vessel` was called on a vessel with nothing in it.
    #[error("vessel '{0}' has no contents to combine")]
    EmptyVessel(String),

    /// A value of the wrong semantic type was supplied.
    #[error("validation error: {0}")]
    Validation(String),

    /// A handle does not refer to a node in this kitchen.
    #[error("unknown {kind} handle #{index}")]
    UnknownNode { kind: &'static str, index: u32 },
}

pub type GraphResult<T> = Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let e = GraphError::InvalidOperand {
            name: "salt".to_string(),
            kind: SymbolKind::IngredientIdentity,
        };
        assert_eq!(e.to_string(), "symbol 'salt' is INGREDIENT_IDENTITY, not an action");

        let e = GraphError::UnknownNode { kind: "item", index: 7 };
        assert_eq!(e.to_string(), "unknown item handle #7");

        assert!(GraphError::EmptyVessel("pot".into())
            .to_string()
            .contains("no contents"));
    }
}
