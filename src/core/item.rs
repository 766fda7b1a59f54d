//! Operand nodes — ingredients and equipment.
//!
//! All four item variants share one record (name, classification symbols,
//! adjacency) and differ only in a small payload. Two items are the same node
//! iff their names are equal; the kitchen enforces this by interning on name.

use super::handle::{ActionId, InstructionId, ItemId};
use super::quantity::Dimensions;
use super::symbol::Symbol;
use indexmap::IndexSet;
use std::fmt;

/// Identity tag marking equipment that can hold contents.
pub const VESSEL_TAG: &str = "VESSEL";

/// Where an intermediate item came from. All handles are weak back-references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provenance {
    pub produced_by: Option<InstructionId>,
    pub source_ingredients: IndexSet<ItemId>,
    pub source_equipment: IndexSet<ItemId>,
    pub vessel: Option<ItemId>,
}

impl Provenance {
    pub fn produced_by(instruction: InstructionId) -> Self {
        Self {
            produced_by: Some(instruction),
            ..Self::default()
        }
    }

    pub fn add_source_ingredient(&mut self, item: ItemId) {
        self.source_ingredients.insert(item);
    }

    pub fn remove_source_ingredient(&mut self, item: ItemId) -> bool {
        self.source_ingredients.shift_remove(&item)
    }

    pub fn add_source_equipment(&mut self, item: ItemId) {
        self.source_equipment.insert(item);
    }

    pub fn remove_source_equipment(&mut self, item: ItemId) -> bool {
        self.source_equipment.shift_remove(&item)
    }
}

/// Variant-specific payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemVariant {
    Ingredient {
        ingredient_id: Option<i64>,
        parent_id: Option<i64>,
    },
    IntermediateIngredient(Provenance),
    Equipment {
        equipment_id: Option<i64>,
        contents: IndexSet<ItemId>,
    },
    IntermediateEquipment {
        provenance: Provenance,
        contents: IndexSet<ItemId>,
    },
}

#[derive(Debug, Clone)]
pub struct Item {
    name: String,
    variant: ItemVariant,
    identity: IndexSet<Symbol>,
    state: Option<IndexSet<Symbol>>,
    preparation: Option<IndexSet<Symbol>>,
    size: Option<Symbol>,
    dimensions: Option<Dimensions>,
    consuming_actions: IndexSet<ActionId>,
    producing_actions: IndexSet<ActionId>,
}

impl Item {
    fn with_variant(name: impl Into<String>, variant: ItemVariant) -> Self {
        Self {
            name: name.into(),
            variant,
            identity: IndexSet::new(),
            state: None,
            preparation: None,
            size: None,
            dimensions: None,
            consuming_actions: IndexSet::new(),
            producing_actions: IndexSet::new(),
        }
    }

    pub fn ingredient(name: impl Into<String>) -> Self {
        Self::with_variant(
            name,
            ItemVariant::Ingredient {
                ingredient_id: None,
                parent_id: None,
            },
        )
    }

    pub fn intermediate_ingredient(name: impl Into<String>, provenance: Provenance) -> Self {
        Self::with_variant(name, ItemVariant::IntermediateIngredient(provenance))
    }

    pub fn equipment(name: impl Into<String>) -> Self {
        Self::with_variant(
            name,
            ItemVariant::Equipment {
                equipment_id: None,
                contents: IndexSet::new(),
            },
        )
    }

    pub fn intermediate_equipment(name: impl Into<String>, provenance: Provenance) -> Self {
        Self::with_variant(
            name,
            ItemVariant::IntermediateEquipment {
                provenance,
                contents: IndexSet::new(),
            },
        )
    }

    /// Attach the loader's record id (ingredient or equipment id).
    pub fn with_record_id(mut self, id: i64) -> Self {
        match &mut self.variant {
            ItemVariant::Ingredient { ingredient_id, .. } => *ingredient_id = Some(id),
            ItemVariant::Equipment { equipment_id, .. } => *equipment_id = Some(id),
            _ => {}
        }
        self
    }

    pub fn with_parent_id(mut self, id: i64) -> Self {
        if let ItemVariant::Ingredient { parent_id, .. } = &mut self.variant {
            *parent_id = Some(id);
        }
        self
    }

    pub fn with_identity<I: IntoIterator<Item = Symbol>>(mut self, symbols: I) -> Self {
        self.identity.extend(symbols);
        self
    }

    pub fn with_state<I: IntoIterator<Item = Symbol>>(mut self, symbols: I) -> Self {
        self.state.get_or_insert_with(IndexSet::new).extend(symbols);
        self
    }

    pub fn with_preparation<I: IntoIterator<Item = Symbol>>(mut self, symbols: I) -> Self {
        self.preparation
            .get_or_insert_with(IndexSet::new)
            .extend(symbols);
        self
    }

    pub fn with_size(mut self, size: Symbol) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variant(&self) -> &ItemVariant {
        &self.variant
    }

    pub fn identity(&self) -> &IndexSet<Symbol> {
        &self.identity
    }

    pub fn state(&self) -> Option<&IndexSet<Symbol>> {
        self.state.as_ref()
    }

    pub fn preparation(&self) -> Option<&IndexSet<Symbol>> {
        self.preparation.as_ref()
    }

    pub fn size(&self) -> Option<&Symbol> {
        self.size.as_ref()
    }

    pub fn dimensions(&self) -> Option<&Dimensions> {
        self.dimensions.as_ref()
    }

    pub fn consuming_actions(&self) -> &IndexSet<ActionId> {
        &self.consuming_actions
    }

    pub fn producing_actions(&self) -> &IndexSet<ActionId> {
        &self.producing_actions
    }

    pub fn provenance(&self) -> Option<&Provenance> {
        match &self.variant {
            ItemVariant::IntermediateIngredient(p) => Some(p),
            ItemVariant::IntermediateEquipment { provenance, .. } => Some(provenance),
            _ => None,
        }
    }

    pub fn provenance_mut(&mut self) -> Option<&mut Provenance> {
        match &mut self.variant {
            ItemVariant::IntermediateIngredient(p) => Some(p),
            ItemVariant::IntermediateEquipment { provenance, .. } => Some(provenance),
            _ => None,
        }
    }

    pub fn is_ingredient(&self) -> bool {
        matches!(
            self.variant,
            ItemVariant::Ingredient { .. } | ItemVariant::IntermediateIngredient(_)
        )
    }

    pub fn is_equipment(&self) -> bool {
        !self.is_ingredient()
    }

    pub fn is_intermediate(&self) -> bool {
        self.provenance().is_some()
    }

    /// Equipment whose identity carries the `VESSEL` tag, either as a
    /// canonical form or as a category.
    pub fn is_vessel(&self) -> bool {
        self.is_equipment()
            && self
                .identity
                .iter()
                .any(|s| s.canonical_form() == VESSEL_TAG || s.has_category(VESSEL_TAG))
    }

    pub fn contents(&self) -> Option<&IndexSet<ItemId>> {
        match &self.variant {
            ItemVariant::Equipment { contents, .. }
            | ItemVariant::IntermediateEquipment { contents, .. } => Some(contents),
            _ => None,
        }
    }

    pub(crate) fn contents_mut(&mut self) -> Option<&mut IndexSet<ItemId>> {
        match &mut self.variant {
            ItemVariant::Equipment { contents, .. }
            | ItemVariant::IntermediateEquipment { contents, .. } => Some(contents),
            _ => None,
        }
    }

    /// Union another item's classification sets into this one.
    pub(crate) fn absorb_classification(&mut self, other: &Item) {
        self.identity.extend(other.identity.iter().cloned());
        if let Some(state) = &other.state {
            self.state
                .get_or_insert_with(IndexSet::new)
                .extend(state.iter().cloned());
        }
        if let Some(prep) = &other.preparation {
            self.preparation
                .get_or_insert_with(IndexSet::new)
                .extend(prep.iter().cloned());
        }
    }

    // -- adjacency (mirrored by the kitchen) --

    pub(crate) fn link_consumer(&mut self, action: ActionId) -> bool {
        self.consuming_actions.insert(action)
    }

    pub(crate) fn unlink_consumer(&mut self, action: ActionId) -> bool {
        self.consuming_actions.shift_remove(&action)
    }

    pub(crate) fn link_producer(&mut self, action: ActionId) -> bool {
        self.producing_actions.insert(action)
    }

    pub(crate) fn unlink_producer(&mut self, action: ActionId) -> bool {
        self.producing_actions.shift_remove(&action)
    }

    /// Participates in at least one action.
    pub fn is_operand(&self) -> bool {
        !self.consuming_actions.is_empty() || !self.producing_actions.is_empty()
    }

    /// Consumed, never produced.
    pub fn is_input_operand(&self) -> bool {
        !self.consuming_actions.is_empty() && self.producing_actions.is_empty()
    }

    /// Produced, never consumed.
    pub fn is_output_operand(&self) -> bool {
        self.consuming_actions.is_empty() && !self.producing_actions.is_empty()
    }

    pub fn is_intermediate_operand(&self) -> bool {
        !self.consuming_actions.is_empty() && !self.producing_actions.is_empty()
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Item {}

impl std::hash::Hash for Item {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.contents() {
            Some(contents) if self.is_vessel() && !contents.is_empty() => {
                write!(f, "{} (containing {} items)", self.name, contents.len())
            }
            _ => write!(f, "{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_by_name_only() {
        // Intentionally fragile: same name means same node, whatever else differs.
        let a = Item::ingredient("onion").with_identity([Symbol::ingredient("onion")]);
        let b = Item::equipment("onion");
        assert_eq!(a, b);

        let mut set = IndexSet::new();
        set.insert(a);
        assert!(!set.insert(b));
    }

    #[test]
    fn test_operand_predicates() {
        let mut item = Item::ingredient("chopped_onion");
        assert!(!item.is_operand());

        item.link_producer(ActionId::from_index(0));
        assert!(item.is_output_operand());
        assert!(!item.is_input_operand());

        item.link_consumer(ActionId::from_index(1));
        assert!(item.is_intermediate_operand());
        assert!(!item.is_output_operand());

        item.unlink_producer(ActionId::from_index(0));
        assert!(item.is_input_operand());
    }

    #[test]
    fn test_vessel_detection() {
        let pot = Item::equipment("pot").with_identity([Symbol::equipment("VESSEL")]);
        assert!(pot.is_vessel());

        let pan = Item::equipment("pan")
            .with_identity([Symbol::equipment("frying_pan").with_categories(["VESSEL"])]);
        assert!(pan.is_vessel());

        let knife = Item::equipment("knife").with_identity([Symbol::equipment("chef_knife")]);
        assert!(!knife.is_vessel());

        // Ingredients never hold contents, even when mislabelled.
        let odd = Item::ingredient("bowl").with_identity([Symbol::equipment("VESSEL")]);
        assert!(!odd.is_vessel());
    }

    #[test]
    fn test_record_ids_and_variants() {
        let item = Item::ingredient("salt").with_record_id(7).with_parent_id(2);
        assert_eq!(
            item.variant(),
            &ItemVariant::Ingredient {
                ingredient_id: Some(7),
                parent_id: Some(2)
            }
        );
        assert!(!item.is_intermediate());

        let sauce =
            Item::intermediate_ingredient("sauce", Provenance::produced_by(InstructionId::from_index(4)));
        assert!(sauce.is_ingredient());
        assert!(sauce.is_intermediate());
        assert_eq!(
            sauce.provenance().and_then(|p| p.produced_by),
            Some(InstructionId::from_index(4))
        );
    }

    #[test]
    fn test_provenance_sources() {
        let mut p = Provenance::default();
        p.add_source_ingredient(ItemId::from_index(1));
        p.add_source_equipment(ItemId::from_index(2));
        assert!(p.remove_source_ingredient(ItemId::from_index(1)));
        assert!(!p.remove_source_ingredient(ItemId::from_index(1)));
        assert_eq!(p.source_equipment.len(), 1);
    }

    #[test]
    fn test_absorb_classification() {
        let mut mixture = Item::ingredient("mixture");
        let a = Item::ingredient("a")
            .with_identity([Symbol::ingredient("tomato")])
            .with_state([Symbol::property("raw")]);
        let b = Item::ingredient("b").with_identity([Symbol::ingredient("basil")]);
        mixture.absorb_classification(&a);
        mixture.absorb_classification(&b);
        assert_eq!(mixture.identity().len(), 2);
        assert_eq!(mixture.state().map(IndexSet::len), Some(1));
        assert!(mixture.preparation().is_none());
    }
}
