//! Operator nodes — an ACTION symbol plus the items it consumes and produces.

use super::error::GraphError;
use super::handle::ItemId;
use super::symbol::{Symbol, SymbolKind};
use indexmap::IndexSet;
use serde::Serialize;
use std::fmt;

/// Input/output cardinality pattern of an action, derived from its categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionArity {
    /// Many inputs, one output (combine, toss).
    NAry,
    /// One input, many outputs (divide, strain).
    Splitting,
    /// One input, one output (chop, boil, chill).
    Unary,
    Unknown,
}

impl ActionArity {
    /// Classify a category set. COMBINATION wins over splitting categories,
    /// which win over the unary ones.
    pub fn from_categories<'a, I>(categories: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut arity = Self::Unknown;
        for category in categories {
            let candidate = match category.as_str() {
                "COMBINATION" => Self::NAry,
                "DIVISION" | "SEPARATION" => Self::Splitting,
                "COOKING_METHOD" | "PREPARATION_TASK" | "TEMPERATURE_CHANGE" => Self::Unary,
                _ => continue,
            };
            if candidate.rank() < arity.rank() {
                arity = candidate;
            }
        }
        arity
    }

    fn rank(self) -> u8 {
        match self {
            Self::NAry => 0,
            Self::Splitting => 1,
            Self::Unary => 2,
            Self::Unknown => 3,
        }
    }
}

impl fmt::Display for ActionArity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NAry => write!(f, "n-ary"),
            Self::Splitting => write!(f, "splitting"),
            Self::Unary => write!(f, "unary"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Action {
    symbol: Symbol,
    input_nodes: IndexSet<ItemId>,
    output_nodes: IndexSet<ItemId>,
}

impl Action {
    pub fn new(symbol: Symbol) -> Result<Self, GraphError> {
        if symbol.kind() != SymbolKind::Action {
            return Err(GraphError::InvalidOperand {
                name: symbol.canonical_form().to_string(),
                kind: symbol.kind(),
            });
        }
        Ok(Self {
            symbol,
            input_nodes: IndexSet::new(),
            output_nodes: IndexSet::new(),
        })
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Kind is fixed; only descriptive metadata can be changed.
    pub fn symbol_mut(&mut self) -> SymbolMetadata<'_> {
        SymbolMetadata(&mut self.symbol)
    }

    pub fn name(&self) -> &str {
        self.symbol.canonical_form()
    }

    pub fn input_nodes(&self) -> &IndexSet<ItemId> {
        &self.input_nodes
    }

    pub fn output_nodes(&self) -> &IndexSet<ItemId> {
        &self.output_nodes
    }

    /// Recomputed from the current categories on every call.
    pub fn arity(&self) -> ActionArity {
        ActionArity::from_categories(self.symbol.categories())
    }

    pub fn is_connected(&self) -> bool {
        !self.input_nodes.is_empty() || !self.output_nodes.is_empty()
    }

    pub(crate) fn link_input(&mut self, item: ItemId) -> bool {
        self.input_nodes.insert(item)
    }

    pub(crate) fn unlink_input(&mut self, item: ItemId) -> bool {
        self.input_nodes.shift_remove(&item)
    }

    pub(crate) fn link_output(&mut self, item: ItemId) -> bool {
        self.output_nodes.insert(item)
    }

    pub(crate) fn unlink_output(&mut self, item: ItemId) -> bool {
        self.output_nodes.shift_remove(&item)
    }
}

impl TryFrom<Symbol> for Action {
    type Error = GraphError;

    fn try_from(symbol: Symbol) -> Result<Self, Self::Error> {
        Self::new(symbol)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Mutable view over an action's symbol that cannot change its kind or
/// canonical form.
pub struct SymbolMetadata<'a>(&'a mut Symbol);

impl SymbolMetadata<'_> {
    pub fn add_alias(&mut self, alias: impl Into<String>) {
        self.0.add_alias(alias);
    }

    pub fn remove_alias(&mut self, alias: &str) -> bool {
        self.0.remove_alias(alias)
    }

    pub fn add_category(&mut self, category: impl Into<String>) {
        self.0.add_category(category);
    }

    pub fn remove_category(&mut self, category: &str) -> bool {
        self.0.remove_category(category)
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.0.set_description(description);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_requires_action_kind() {
        let err = Action::new(Symbol::ingredient("salt")).unwrap_err();
        assert!(matches!(
            err,
            GraphError::InvalidOperand {
                kind: SymbolKind::IngredientIdentity,
                ..
            }
        ));
        assert!(Action::try_from(Symbol::action("boil")).is_ok());
    }

    #[test]
    fn test_arity_from_categories() {
        let cases = [
            (vec!["COMBINATION"], ActionArity::NAry),
            (vec!["DIVISION"], ActionArity::Splitting),
            (vec!["SEPARATION"], ActionArity::Splitting),
            (vec!["COOKING_METHOD"], ActionArity::Unary),
            (vec!["TEMPERATURE_CHANGE"], ActionArity::Unary),
            (vec!["PREPARATION_TASK", "DIVISION"], ActionArity::Splitting),
            (vec!["PREPARATION_TASK", "COMBINATION"], ActionArity::NAry),
            (vec!["PLATING"], ActionArity::Unknown),
            (vec![], ActionArity::Unknown),
        ];
        for (categories, expected) in cases {
            let action = Action::new(Symbol::action("x").with_categories(categories.clone())).unwrap();
            assert_eq!(action.arity(), expected, "categories {:?}", categories);
        }
    }

    #[test]
    fn test_arity_tracks_category_changes() {
        let mut action = Action::new(Symbol::action("season")).unwrap();
        assert_eq!(action.arity(), ActionArity::Unknown);
        action.symbol_mut().add_category("PREPARATION_TASK");
        assert_eq!(action.arity(), ActionArity::Unary);
        action.symbol_mut().add_category("COMBINATION");
        assert_eq!(action.arity(), ActionArity::NAry);
        assert!(action.symbol_mut().remove_category("COMBINATION"));
        assert_eq!(action.arity(), ActionArity::Unary);
    }
}
