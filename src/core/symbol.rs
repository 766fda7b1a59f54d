//! Symbols — canonical, typed classification tokens.
//!
//! A symbol names an action, an ingredient or equipment identity, an item
//! property, or a unit. Identity is `(kind, canonical_form)`: categories,
//! aliases and description are descriptive metadata and never take part in
//! equality, hashing or ordering.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Closed set of symbol kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SymbolKind {
    Action,
    IngredientIdentity,
    EquipmentIdentity,
    ItemProperty,
    Unit,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Action => write!(f, "ACTION"),
            Self::IngredientIdentity => write!(f, "INGREDIENT_IDENTITY"),
            Self::EquipmentIdentity => write!(f, "EQUIPMENT_IDENTITY"),
            Self::ItemProperty => write!(f, "ITEM_PROPERTY"),
            Self::Unit => write!(f, "UNIT"),
        }
    }
}

/// A classification token with aliases and hierarchical categories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    kind: SymbolKind,
    canonical_form: String,
    #[serde(default)]
    categories: IndexSet<String>,
    #[serde(default)]
    aliases: IndexSet<String>,
    #[serde(default)]
    description: String,
}

impl Symbol {
    pub fn new(kind: SymbolKind, canonical_form: impl Into<String>) -> Self {
        Self {
            kind,
            canonical_form: canonical_form.into(),
            categories: IndexSet::new(),
            aliases: IndexSet::new(),
            description: String::new(),
        }
    }

    pub fn action(canonical_form: impl Into<String>) -> Self {
        Self::new(SymbolKind::Action, canonical_form)
    }

    pub fn ingredient(canonical_form: impl Into<String>) -> Self {
        Self::new(SymbolKind::IngredientIdentity, canonical_form)
    }

    pub fn equipment(canonical_form: impl Into<String>) -> Self {
        Self::new(SymbolKind::EquipmentIdentity, canonical_form)
    }

    pub fn property(canonical_form: impl Into<String>) -> Self {
        Self::new(SymbolKind::ItemProperty, canonical_form)
    }

    pub fn unit(canonical_form: impl Into<String>) -> Self {
        Self::new(SymbolKind::Unit, canonical_form)
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories.extend(categories.into_iter().map(Into::into));
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    pub fn canonical_form(&self) -> &str {
        &self.canonical_form
    }

    pub fn categories(&self) -> &IndexSet<String> {
        &self.categories
    }

    pub fn aliases(&self) -> &IndexSet<String> {
        &self.aliases
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn add_alias(&mut self, alias: impl Into<String>) {
        self.aliases.insert(alias.into());
    }

    /// Returns `true` if the alias was present.
    pub fn remove_alias(&mut self, alias: &str) -> bool {
        self.aliases.shift_remove(alias)
    }

    pub fn add_category(&mut self, category: impl Into<String>) {
        self.categories.insert(category.into());
    }

    /// Returns `true` if the category was present.
    pub fn remove_category(&mut self, category: &str) -> bool {
        self.categories.shift_remove(category)
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.contains(category)
    }

    /// True if `name` is the canonical form or one of the aliases.
    pub fn matches(&self, name: &str) -> bool {
        self.canonical_form == name || self.aliases.contains(name)
    }

    pub fn is_operator(&self) -> bool {
        self.kind == SymbolKind::Action
    }

    pub fn is_operand_identity(&self) -> bool {
        matches!(
            self.kind,
            SymbolKind::IngredientIdentity | SymbolKind::EquipmentIdentity
        )
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.canonical_form == other.canonical_form
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.canonical_form.hash(state);
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.kind, &self.canonical_form).cmp(&(other.kind, &other.canonical_form))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.canonical_form, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_ignores_metadata() {
        let a = Symbol::ingredient("onion").with_categories(["VEGETABLE"]);
        let b = Symbol::ingredient("onion")
            .with_aliases(["onions"])
            .with_description("Yellow onion");
        assert_eq!(a, b);

        let mut set = IndexSet::new();
        set.insert(a);
        assert!(!set.insert(b));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_identity_includes_kind() {
        let unit = Symbol::unit("clove");
        let ingredient = Symbol::ingredient("clove");
        assert_ne!(unit, ingredient);
    }

    #[test]
    fn test_alias_and_category_mutators() {
        let mut s = Symbol::action("chop");
        s.add_alias("dice");
        s.add_alias("cut");
        s.add_category("PREPARATION_TASK");
        assert!(s.matches("dice"));
        assert!(s.matches("chop"));
        assert!(!s.matches("slice"));
        assert!(s.has_category("PREPARATION_TASK"));

        assert!(s.remove_alias("dice"));
        assert!(!s.remove_alias("dice"));
        assert!(!s.matches("dice"));
        assert!(s.remove_category("PREPARATION_TASK"));
        assert!(s.categories().is_empty());

        s.set_description("Cut into pieces");
        assert_eq!(s.description(), "Cut into pieces");
    }

    #[test]
    fn test_predicates() {
        assert!(Symbol::action("boil").is_operator());
        assert!(!Symbol::unit("cup").is_operator());
        assert!(Symbol::equipment("pot").is_operand_identity());
        assert!(!Symbol::property("diced").is_operand_identity());
    }

    #[test]
    fn test_kind_serde_names() {
        let s: Symbol = serde_yaml_ng::from_str(
            "kind: EQUIPMENT_IDENTITY\ncanonical_form: VESSEL\ncategories: [COOKWARE]\n",
        )
        .unwrap();
        assert_eq!(s.kind(), SymbolKind::EquipmentIdentity);
        assert!(s.has_category("COOKWARE"));
        assert_eq!(s.to_string(), "VESSEL (EQUIPMENT_IDENTITY)");
    }
}
