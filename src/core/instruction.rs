//! Recipe steps — one action applied to a set of item usages.
//!
//! An instruction's position in the step DAG (root / internal / leaf) is a
//! predicate over its current edges, never a stored flag. The
//! `prerequisites`/`next` pair is kept as exact mirror images by the kitchen.

use super::handle::{ActionId, InstructionId, ItemId};
use super::quantity::{Duration, EquipmentUsage, IngredientUsage, Temperature};
use indexmap::{IndexMap, IndexSet};
use std::fmt;

#[derive(Debug, Clone)]
pub struct Instruction {
    number: i64,
    action: ActionId,
    ingredients: IndexMap<ItemId, IngredientUsage>,
    equipment: IndexMap<ItemId, EquipmentUsage>,
    produces: Option<ItemId>,
    temperature: Option<Temperature>,
    duration: Option<Duration>,
    sequence_order: Option<f64>,
    description: Option<String>,
    prerequisites: IndexSet<InstructionId>,
    next: IndexSet<InstructionId>,
}

impl Instruction {
    /// `number` is the loader's own id for the step.
    pub fn new(number: i64, action: ActionId) -> Self {
        Self {
            number,
            action,
            ingredients: IndexMap::new(),
            equipment: IndexMap::new(),
            produces: None,
            temperature: None,
            duration: None,
            sequence_order: None,
            description: None,
            prerequisites: IndexSet::new(),
            next: IndexSet::new(),
        }
    }

    pub fn with_ingredient(mut self, item: ItemId, usage: IngredientUsage) -> Self {
        self.ingredients.insert(item, usage);
        self
    }

    pub fn with_equipment(mut self, item: ItemId, usage: EquipmentUsage) -> Self {
        self.equipment.insert(item, usage);
        self
    }

    pub fn producing(mut self, item: ItemId) -> Self {
        self.produces = Some(item);
        self
    }

    pub fn with_temperature(mut self, temperature: Temperature) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_sequence_order(mut self, order: f64) -> Self {
        self.sequence_order = Some(order);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn number(&self) -> i64 {
        self.number
    }

    pub fn action(&self) -> ActionId {
        self.action
    }

    pub fn ingredients(&self) -> &IndexMap<ItemId, IngredientUsage> {
        &self.ingredients
    }

    pub fn equipment(&self) -> &IndexMap<ItemId, EquipmentUsage> {
        &self.equipment
    }

    pub fn produces(&self) -> Option<ItemId> {
        self.produces
    }

    pub fn temperature(&self) -> Option<&Temperature> {
        self.temperature.as_ref()
    }

    pub fn duration(&self) -> Option<&Duration> {
        self.duration.as_ref()
    }

    pub fn sequence_order(&self) -> Option<f64> {
        self.sequence_order
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn prerequisites(&self) -> &IndexSet<InstructionId> {
        &self.prerequisites
    }

    pub fn next(&self) -> &IndexSet<InstructionId> {
        &self.next
    }

    pub fn set_temperature(&mut self, temperature: Option<Temperature>) {
        self.temperature = temperature;
    }

    pub fn set_duration(&mut self, duration: Option<Duration>) {
        self.duration = duration;
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
    }

    /// Ingredients plus equipment.
    pub fn get_input_items(&self) -> IndexSet<ItemId> {
        self.ingredients
            .keys()
            .chain(self.equipment.keys())
            .copied()
            .collect()
    }

    pub fn get_output_items(&self) -> IndexSet<ItemId> {
        self.produces.into_iter().collect()
    }

    /// Ingredients only; equipment is reused, not consumed.
    pub fn get_consumed_items(&self) -> IndexSet<ItemId> {
        self.ingredients.keys().copied().collect()
    }

    pub fn is_root(&self) -> bool {
        self.prerequisites.is_empty()
    }

    pub fn is_leaf(&self) -> bool {
        self.next.is_empty()
    }

    pub fn is_internal(&self) -> bool {
        !self.is_root() && !self.is_leaf()
    }

    pub(crate) fn set_sequence_order_unchecked(&mut self, order: Option<f64>) {
        self.sequence_order = order;
    }

    pub(crate) fn insert_ingredient(&mut self, item: ItemId, usage: IngredientUsage) {
        self.ingredients.insert(item, usage);
    }

    pub(crate) fn insert_equipment(&mut self, item: ItemId, usage: EquipmentUsage) {
        self.equipment.insert(item, usage);
    }

    pub(crate) fn set_produces(&mut self, item: Option<ItemId>) {
        self.produces = item;
    }

    pub(crate) fn link_prerequisite(&mut self, other: InstructionId) -> bool {
        self.prerequisites.insert(other)
    }

    pub(crate) fn unlink_prerequisite(&mut self, other: InstructionId) -> bool {
        self.prerequisites.shift_remove(&other)
    }

    pub(crate) fn link_next(&mut self, other: InstructionId) -> bool {
        self.next.insert(other)
    }

    pub(crate) fn unlink_next(&mut self, other: InstructionId) -> bool {
        self.next.shift_remove(&other)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Instruction {} ({} ingredients, {} equipment, {} prerequisites)",
            self.number,
            self.ingredients.len(),
            self.equipment.len(),
            self.prerequisites.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(i: usize) -> ItemId {
        ItemId::from_index(i)
    }

    #[test]
    fn test_item_views() {
        let step = Instruction::new(1, ActionId::from_index(0))
            .with_ingredient(item(0), IngredientUsage::default())
            .with_ingredient(item(1), IngredientUsage::default())
            .with_equipment(item(2), EquipmentUsage::default())
            .producing(item(3));

        assert_eq!(step.get_input_items().len(), 3);
        assert_eq!(step.get_consumed_items(), IndexSet::from([item(0), item(1)]));
        assert_eq!(step.get_output_items(), IndexSet::from([item(3)]));
        assert!(!step.get_consumed_items().contains(&item(2)));
    }

    #[test]
    fn test_no_output_when_nothing_produced() {
        let step = Instruction::new(2, ActionId::from_index(0));
        assert!(step.get_output_items().is_empty());
        assert!(step.get_input_items().is_empty());
    }

    #[test]
    fn test_position_predicates() {
        let mut step = Instruction::new(3, ActionId::from_index(0));
        assert!(step.is_root() && step.is_leaf());
        assert!(!step.is_internal());

        step.link_prerequisite(InstructionId::from_index(9));
        step.link_next(InstructionId::from_index(10));
        assert!(step.is_internal());

        step.unlink_prerequisite(InstructionId::from_index(9));
        assert!(step.is_root());
    }

    #[test]
    fn test_metadata_setters() {
        let mut step = Instruction::new(4, ActionId::from_index(0))
            .with_sequence_order(1.5)
            .with_description("Boil the pasta");
        assert_eq!(step.sequence_order(), Some(1.5));
        step.set_description(None);
        assert!(step.description().is_none());
        assert!(step.to_string().starts_with("Instruction 4"));
    }
}
