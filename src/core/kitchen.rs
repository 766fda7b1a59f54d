//! The kitchen — arena owning every item, action and instruction.
//!
//! All mirrored edges are updated here, two sides in one call:
//! - item.consuming_actions <-> action.input_nodes
//! - item.producing_actions <-> action.output_nodes
//! - instruction.prerequisites <-> instruction.next
//!
//! Items are interned by name and actions by canonical form, which is how
//! identity-by-name and identity-by-symbol are enforced. Nothing is ever
//! deallocated, so a handle stays valid for the lifetime of its kitchen.

use super::action::Action;
use super::error::{GraphError, GraphResult};
use super::handle::{ActionId, InstructionId, ItemId};
use super::instruction::Instruction;
use super::item::{Item, ItemVariant, Provenance};
use super::quantity::{EquipmentUsage, IngredientUsage};
use super::symbol::Symbol;
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

/// Name given to the item produced by [`Kitchen::combine_vessel`].
pub const MIXTURE_NAME: &str = "mixture";

#[derive(Debug, Clone, Default)]
pub struct Kitchen {
    items: Vec<Item>,
    item_names: IndexMap<String, ItemId>,
    actions: Vec<Action>,
    action_names: IndexMap<String, ActionId>,
    instructions: Vec<Instruction>,
}

fn unknown(kind: &'static str, index: u32) -> impl FnOnce() -> GraphError {
    move || GraphError::UnknownNode { kind, index }
}

impl Kitchen {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Items
    // ========================================================================

    /// Register an item. If an item with the same name exists, that node is
    /// returned unchanged and `item` is dropped.
    pub fn add_item(&mut self, item: Item) -> GraphResult<ItemId> {
        if item.name().trim().is_empty() {
            return Err(GraphError::Validation("item name must not be empty".into()));
        }
        if let Some(&existing) = self.item_names.get(item.name()) {
            debug!(item = item.name(), "item already registered, merging by name");
            return Ok(existing);
        }
        let id = ItemId::from_index(self.items.len());
        self.item_names.insert(item.name().to_string(), id);
        self.items.push(item);
        Ok(id)
    }

    pub fn item(&self, id: ItemId) -> GraphResult<&Item> {
        self.items
            .get(id.index())
            .ok_or_else(unknown(ItemId::LABEL, id.as_u32()))
    }

    pub fn item_mut(&mut self, id: ItemId) -> GraphResult<&mut Item> {
        self.items
            .get_mut(id.index())
            .ok_or_else(unknown(ItemId::LABEL, id.as_u32()))
    }

    pub fn item_by_name(&self, name: &str) -> Option<ItemId> {
        self.item_names.get(name).copied()
    }

    pub fn items(&self) -> impl Iterator<Item = (ItemId, &Item)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (ItemId::from_index(i), item))
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Display name of an item, or its handle if it is unknown.
    pub fn item_name(&self, id: ItemId) -> String {
        self.item(id)
            .map(|item| item.name().to_string())
            .unwrap_or_else(|_| id.to_string())
    }

    // ========================================================================
    // Actions
    // ========================================================================

    /// Register an operator. Fails with `InvalidOperand` unless the symbol is
    /// ACTION-kind; a symbol with a known canonical form resolves to the
    /// existing action.
    pub fn add_action(&mut self, symbol: Symbol) -> GraphResult<ActionId> {
        if symbol.canonical_form().trim().is_empty() {
            return Err(GraphError::Validation(
                "action canonical form must not be empty".into(),
            ));
        }
        let action = Action::new(symbol)?;
        if let Some(&existing) = self.action_names.get(action.name()) {
            return Ok(existing);
        }
        let id = ActionId::from_index(self.actions.len());
        self.action_names.insert(action.name().to_string(), id);
        self.actions.push(action);
        Ok(id)
    }

    pub fn action(&self, id: ActionId) -> GraphResult<&Action> {
        self.actions
            .get(id.index())
            .ok_or_else(unknown(ActionId::LABEL, id.as_u32()))
    }

    pub fn action_mut(&mut self, id: ActionId) -> GraphResult<&mut Action> {
        self.actions
            .get_mut(id.index())
            .ok_or_else(unknown(ActionId::LABEL, id.as_u32()))
    }

    pub fn action_by_name(&self, canonical_form: &str) -> Option<ActionId> {
        self.action_names.get(canonical_form).copied()
    }

    pub fn actions(&self) -> impl Iterator<Item = (ActionId, &Action)> {
        self.actions
            .iter()
            .enumerate()
            .map(|(i, action)| (ActionId::from_index(i), action))
    }

    pub fn action_name(&self, id: ActionId) -> String {
        self.action(id)
            .map(|action| action.name().to_string())
            .unwrap_or_else(|_| id.to_string())
    }

    // ========================================================================
    // Item <-> Action adjacency
    // ========================================================================

    /// `action` consumes `item`: updates both `item.consuming_actions` and
    /// `action.input_nodes`.
    pub fn add_consuming_action(&mut self, item: ItemId, action: ActionId) -> GraphResult<()> {
        self.item(item)?;
        self.action(action)?;
        self.items[item.index()].link_consumer(action);
        self.actions[action.index()].link_input(item);
        debug!(item = %item, action = %action, "linked consumer");
        Ok(())
    }

    /// Returns `true` if the edge existed.
    pub fn remove_consuming_action(&mut self, item: ItemId, action: ActionId) -> GraphResult<bool> {
        self.item(item)?;
        self.action(action)?;
        let a = self.items[item.index()].unlink_consumer(action);
        let b = self.actions[action.index()].unlink_input(item);
        Ok(a || b)
    }

    /// `action` produces `item`: updates both `item.producing_actions` and
    /// `action.output_nodes`.
    pub fn add_producing_action(&mut self, item: ItemId, action: ActionId) -> GraphResult<()> {
        self.item(item)?;
        self.action(action)?;
        self.items[item.index()].link_producer(action);
        self.actions[action.index()].link_output(item);
        debug!(item = %item, action = %action, "linked producer");
        Ok(())
    }

    pub fn remove_producing_action(&mut self, item: ItemId, action: ActionId) -> GraphResult<bool> {
        self.item(item)?;
        self.action(action)?;
        let a = self.items[item.index()].unlink_producer(action);
        let b = self.actions[action.index()].unlink_output(item);
        Ok(a || b)
    }

    /// Remove every operand edge touching `action`.
    pub fn detach_action(&mut self, action: ActionId) -> GraphResult<()> {
        let (inputs, outputs) = {
            let a = self.action(action)?;
            (a.input_nodes().clone(), a.output_nodes().clone())
        };
        for item in inputs {
            self.remove_consuming_action(item, action)?;
        }
        for item in outputs {
            self.remove_producing_action(item, action)?;
        }
        Ok(())
    }

    // ========================================================================
    // Instructions
    // ========================================================================

    /// Store a new instruction after checking every handle it carries.
    pub fn add_instruction(&mut self, instruction: Instruction) -> GraphResult<InstructionId> {
        self.action(instruction.action())?;
        for &item in instruction.ingredients().keys() {
            self.check_ingredient(item)?;
        }
        for &item in instruction.equipment().keys() {
            self.check_equipment(item)?;
        }
        if let Some(item) = instruction.produces() {
            self.item(item)?;
        }
        check_sequence_order(instruction.sequence_order())?;

        let id = InstructionId::from_index(self.instructions.len());
        self.instructions.push(instruction);
        Ok(id)
    }

    pub fn instruction(&self, id: InstructionId) -> GraphResult<&Instruction> {
        self.instructions
            .get(id.index())
            .ok_or_else(unknown(InstructionId::LABEL, id.as_u32()))
    }

    pub fn instruction_mut(&mut self, id: InstructionId) -> GraphResult<&mut Instruction> {
        self.instructions
            .get_mut(id.index())
            .ok_or_else(unknown(InstructionId::LABEL, id.as_u32()))
    }

    pub fn instructions(&self) -> impl Iterator<Item = (InstructionId, &Instruction)> {
        self.instructions
            .iter()
            .enumerate()
            .map(|(i, step)| (InstructionId::from_index(i), step))
    }

    pub fn add_ingredient_usage(
        &mut self,
        instruction: InstructionId,
        item: ItemId,
        usage: IngredientUsage,
    ) -> GraphResult<()> {
        self.check_ingredient(item)?;
        self.instruction_mut(instruction)?.insert_ingredient(item, usage);
        Ok(())
    }

    pub fn add_equipment_usage(
        &mut self,
        instruction: InstructionId,
        item: ItemId,
        usage: EquipmentUsage,
    ) -> GraphResult<()> {
        self.check_equipment(item)?;
        self.instruction_mut(instruction)?.insert_equipment(item, usage);
        Ok(())
    }

    pub fn set_produces(&mut self, instruction: InstructionId, item: Option<ItemId>) -> GraphResult<()> {
        if let Some(item) = item {
            self.item(item)?;
        }
        self.instruction_mut(instruction)?.set_produces(item);
        Ok(())
    }

    pub fn set_sequence_order(&mut self, instruction: InstructionId, order: Option<f64>) -> GraphResult<()> {
        check_sequence_order(order)?;
        self.instruction_mut(instruction)?
            .set_sequence_order_unchecked(order);
        Ok(())
    }

    fn check_ingredient(&self, item: ItemId) -> GraphResult<()> {
        let found = self.item(item)?;
        if !found.is_ingredient() {
            return Err(GraphError::Validation(format!(
                "'{}' is equipment, not an ingredient",
                found.name()
            )));
        }
        Ok(())
    }

    fn check_equipment(&self, item: ItemId) -> GraphResult<()> {
        let found = self.item(item)?;
        if !found.is_equipment() {
            return Err(GraphError::Validation(format!(
                "'{}' is an ingredient, not equipment",
                found.name()
            )));
        }
        Ok(())
    }

    // ========================================================================
    // Instruction <-> Instruction edges
    // ========================================================================

    /// `prereq` must finish before `step`. Cycle-creating edges are accepted;
    /// use [`Kitchen::has_cycle`] to check.
    pub fn add_prerequisite(&mut self, step: InstructionId, prereq: InstructionId) -> GraphResult<()> {
        self.instruction(step)?;
        self.instruction(prereq)?;
        self.instructions[step.index()].link_prerequisite(prereq);
        self.instructions[prereq.index()].link_next(step);
        debug!(step = %step, prereq = %prereq, "linked prerequisite");
        Ok(())
    }

    /// Returns `true` if the edge existed.
    pub fn remove_prerequisite(&mut self, step: InstructionId, prereq: InstructionId) -> GraphResult<bool> {
        self.instruction(step)?;
        self.instruction(prereq)?;
        let a = self.instructions[step.index()].unlink_prerequisite(prereq);
        let b = self.instructions[prereq.index()].unlink_next(step);
        Ok(a || b)
    }

    /// Every instruction that must finish before `step` (transitive).
    pub fn get_all_prerequisites(&self, step: InstructionId) -> IndexSet<InstructionId> {
        self.closure(step, Instruction::prerequisites)
    }

    /// Every instruction that waits on `step` (transitive).
    pub fn get_all_dependents(&self, step: InstructionId) -> IndexSet<InstructionId> {
        self.closure(step, Instruction::next)
    }

    /// True iff `step` is its own transitive prerequisite.
    pub fn has_cycle(&self, step: InstructionId) -> bool {
        self.get_all_prerequisites(step).contains(&step)
    }

    fn closure(
        &self,
        start: InstructionId,
        edges: fn(&Instruction) -> &IndexSet<InstructionId>,
    ) -> IndexSet<InstructionId> {
        let mut visited = IndexSet::new();
        let mut stack: Vec<InstructionId> = match self.instructions.get(start.index()) {
            Some(step) => edges(step).iter().copied().collect(),
            None => return visited,
        };
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if let Some(step) = self.instructions.get(current.index()) {
                stack.extend(edges(step).iter().copied());
            }
        }
        visited
    }

    // ========================================================================
    // Vessels
    // ========================================================================

    fn vessel(&self, vessel: ItemId) -> GraphResult<&Item> {
        let item = self.item(vessel)?;
        if !item.is_vessel() {
            return Err(GraphError::NotAVessel(item.name().to_string()));
        }
        Ok(item)
    }

    /// Put an ingredient into a vessel.
    pub fn add_to_vessel(&mut self, vessel: ItemId, ingredient: ItemId) -> GraphResult<()> {
        self.vessel(vessel)?;
        self.check_ingredient(ingredient)?;
        if let Some(contents) = self.items[vessel.index()].contents_mut() {
            contents.insert(ingredient);
        }
        Ok(())
    }

    pub fn vessel_contents(&self, vessel: ItemId) -> GraphResult<Vec<ItemId>> {
        let item = self.vessel(vessel)?;
        Ok(item
            .contents()
            .map(|c| c.iter().copied().collect())
            .unwrap_or_default())
    }

    /// Remove everything from a vessel, returning what was in it.
    pub fn empty_vessel(&mut self, vessel: ItemId) -> GraphResult<Vec<ItemId>> {
        self.vessel(vessel)?;
        let removed = self.items[vessel.index()]
            .contents_mut()
            .map(|c| c.drain(..).collect())
            .unwrap_or_default();
        Ok(removed)
    }

    /// Collapse a vessel's contents into a single intermediate ingredient
    /// named [`MIXTURE_NAME`] whose classification sets are the union of the
    /// originals'. Individual quantities of the originals are not kept.
    pub fn combine_vessel(&mut self, vessel: ItemId) -> GraphResult<ItemId> {
        let contents = self.vessel_contents(vessel)?;
        if contents.is_empty() {
            return Err(GraphError::EmptyVessel(self.item_name(vessel)));
        }
        if let Some(existing) = self.item_by_name(MIXTURE_NAME) {
            let node = self.item(existing)?;
            if !matches!(node.variant(), ItemVariant::IntermediateIngredient(_)) {
                return Err(GraphError::Validation(format!(
                    "'{}' already exists and is not an intermediate ingredient",
                    MIXTURE_NAME
                )));
            }
        }

        let mut provenance = Provenance {
            vessel: Some(vessel),
            ..Provenance::default()
        };
        let mut mixture = Item::intermediate_ingredient(MIXTURE_NAME, Provenance::default());
        for &content in &contents {
            provenance.add_source_ingredient(content);
            mixture.absorb_classification(&self.items[content.index()]);
        }

        let id = match self.item_by_name(MIXTURE_NAME) {
            Some(existing) => {
                warn!(
                    vessel = %self.item_name(vessel),
                    "an item named '{}' already exists, merging into it", MIXTURE_NAME
                );
                let node = &mut self.items[existing.index()];
                node.absorb_classification(&mixture);
                if let Some(p) = node.provenance_mut() {
                    for source in provenance.source_ingredients.iter().filter(|s| **s != existing) {
                        p.add_source_ingredient(*source);
                    }
                    p.vessel = Some(vessel);
                }
                existing
            }
            None => {
                if let Some(p) = mixture.provenance_mut() {
                    *p = provenance;
                }
                self.add_item(mixture)?
            }
        };

        if let Some(c) = self.items[vessel.index()].contents_mut() {
            c.clear();
            c.insert(id);
        }
        debug!(vessel = %vessel, sources = contents.len(), "combined vessel contents");
        Ok(id)
    }
}

fn check_sequence_order(order: Option<f64>) -> GraphResult<()> {
    match order {
        Some(o) if !o.is_finite() => Err(GraphError::Validation(format!(
            "sequence order must be finite, got {}",
            o
        ))),
        _ => Ok(()),
    }
}
