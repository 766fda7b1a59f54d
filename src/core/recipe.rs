//! Recipe — aggregate root over the step DAG and the operand DAG.
//!
//! A recipe owns its [`Kitchen`] and keeps two coupled views consistent:
//! - the instruction view (`all_instructions`, `root_instructions`), linked by
//!   prerequisite/next edges;
//! - the operand view (`action_nodes`, `item_nodes`), linked by the mirrored
//!   consuming/producing adjacency.
//!
//! The operand view is a projection of the instruction view: registering an
//! instruction adds its action and items and wires their edges. Every recipe
//! mutation recomputes `root_instructions` over all registered instructions,
//! which costs O(n) per call.

use super::error::{GraphError, GraphResult};
use super::handle::{ActionId, InstructionId, ItemId};
use super::kitchen::Kitchen;
use super::quantity::{EquipmentUsage, IngredientUsage};
use indexmap::IndexSet;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

/// A violation of the operand-graph invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum GraphIssue {
    /// An instruction references an action missing from `action_nodes`.
    UnregisteredAction { instruction: i64, action: String },
    /// An instruction or action references an item missing from `item_nodes`.
    UnregisteredItem { referenced_by: String, item: String },
    /// An item lists a consuming/producing action missing from `action_nodes`.
    DanglingAction { item: String, action: String },
    /// `action.input_nodes` and `item.consuming_actions` disagree.
    UnmirroredInput { action: String, item: String },
    /// `action.output_nodes` and `item.producing_actions` disagree.
    UnmirroredOutput { action: String, item: String },
    /// The item can reach itself through consuming action -> output hops.
    OperandCycle { item: String },
}

impl fmt::Display for GraphIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnregisteredAction { instruction, action } => write!(
                f,
                "instruction {} uses action '{}' which is not an action node",
                instruction, action
            ),
            Self::UnregisteredItem { referenced_by, item } => write!(
                f,
                "'{}' references item '{}' which is not an item node",
                referenced_by, item
            ),
            Self::DanglingAction { item, action } => write!(
                f,
                "item '{}' is linked to action '{}' which is not an action node",
                item, action
            ),
            Self::UnmirroredInput { action, item } => write!(
                f,
                "input edge '{}' -> '{}' is not mirrored on both sides",
                item, action
            ),
            Self::UnmirroredOutput { action, item } => write!(
                f,
                "output edge '{}' -> '{}' is not mirrored on both sides",
                action, item
            ),
            Self::OperandCycle { item } => {
                write!(f, "item '{}' is reachable from itself", item)
            }
        }
    }
}

/// Counts reported by `mise analyze`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeSummary {
    pub id: i64,
    pub title: String,
    pub instructions: usize,
    pub root_instructions: usize,
    pub action_nodes: usize,
    pub item_nodes: usize,
    pub input_items: usize,
    pub intermediate_items: usize,
    pub output_items: usize,
    pub dag_valid: bool,
    pub operand_graph_valid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

#[derive(Debug, Clone)]
pub struct Recipe {
    id: i64,
    title: String,
    kitchen: Kitchen,
    all_instructions: IndexSet<InstructionId>,
    root_instructions: IndexSet<InstructionId>,
    action_nodes: IndexSet<ActionId>,
    item_nodes: IndexSet<ItemId>,
    // Registered directly rather than through an instruction.
    pinned_actions: IndexSet<ActionId>,
    pinned_items: IndexSet<ItemId>,
}

impl Recipe {
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self::with_kitchen(id, title, Kitchen::new())
    }

    pub fn with_kitchen(id: i64, title: impl Into<String>, kitchen: Kitchen) -> Self {
        Self {
            id,
            title: title.into(),
            kitchen,
            all_instructions: IndexSet::new(),
            root_instructions: IndexSet::new(),
            action_nodes: IndexSet::new(),
            item_nodes: IndexSet::new(),
            pinned_actions: IndexSet::new(),
            pinned_items: IndexSet::new(),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> GraphResult<()> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(GraphError::Validation("recipe title must not be empty".into()));
        }
        self.title = title;
        Ok(())
    }

    pub fn kitchen(&self) -> &Kitchen {
        &self.kitchen
    }

    /// Direct access to the arena. Prerequisite edges and usages changed
    /// through it are not reflected in `root_instructions` or the operand
    /// projection until the next recipe mutation or
    /// [`Recipe::rebuild_projection`]; prefer the `Recipe` mutators.
    pub fn kitchen_mut(&mut self) -> &mut Kitchen {
        &mut self.kitchen
    }

    pub fn all_instructions(&self) -> &IndexSet<InstructionId> {
        &self.all_instructions
    }

    pub fn root_instructions(&self) -> &IndexSet<InstructionId> {
        &self.root_instructions
    }

    pub fn action_nodes(&self) -> &IndexSet<ActionId> {
        &self.action_nodes
    }

    pub fn item_nodes(&self) -> &IndexSet<ItemId> {
        &self.item_nodes
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Register an instruction and project it onto the operand graph: its
    /// action and items become nodes, each input item gets the action as a
    /// consumer and the produced item gets it as a producer.
    pub fn add_instruction(&mut self, id: InstructionId) -> GraphResult<()> {
        let step = self.kitchen.instruction(id)?;
        let action = step.action();
        let inputs = step.get_input_items();
        let outputs = step.get_output_items();

        self.all_instructions.insert(id);
        self.project(action, &inputs, &outputs)?;
        self.recompute_roots();
        debug!(recipe = self.id, instruction = %id, "added instruction");
        Ok(())
    }

    /// Unregister an instruction. Its action leaves `action_nodes` (and loses
    /// all operand edges) when no remaining instruction uses it; otherwise
    /// only the edges no remaining instruction supports are removed. Item
    /// nodes are kept, and the instruction's prerequisite edges are left in
    /// place.
    pub fn remove_instruction(&mut self, id: InstructionId) -> GraphResult<bool> {
        if !self.all_instructions.shift_remove(&id) {
            return Ok(false);
        }
        self.root_instructions.shift_remove(&id);

        let step = self.kitchen.instruction(id)?;
        let action = step.action();
        let inputs = step.get_input_items();
        let outputs = step.get_output_items();

        let still_used = self.all_instructions.iter().any(|other| {
            self.kitchen
                .instruction(*other)
                .map(|s| s.action() == action)
                .unwrap_or(false)
        });

        if !still_used && !self.pinned_actions.contains(&action) {
            self.action_nodes.shift_remove(&action);
            self.kitchen.detach_action(action)?;
        } else {
            for item in inputs {
                if !self.supports(action, item, false) {
                    self.kitchen.remove_consuming_action(item, action)?;
                }
            }
            for item in outputs {
                if !self.supports(action, item, true) {
                    self.kitchen.remove_producing_action(item, action)?;
                }
            }
        }

        self.recompute_roots();
        debug!(recipe = self.id, instruction = %id, pruned_action = !still_used, "removed instruction");
        Ok(true)
    }

    /// `prereq` must finish before `step`.
    pub fn add_prerequisite(&mut self, step: InstructionId, prereq: InstructionId) -> GraphResult<()> {
        self.kitchen.add_prerequisite(step, prereq)?;
        self.recompute_roots();
        Ok(())
    }

    pub fn remove_prerequisite(&mut self, step: InstructionId, prereq: InstructionId) -> GraphResult<bool> {
        let removed = self.kitchen.remove_prerequisite(step, prereq)?;
        self.recompute_roots();
        Ok(removed)
    }

    /// Add an ingredient to an instruction. A registered instruction gets the
    /// new item projected onto the operand graph.
    pub fn add_ingredient_usage(
        &mut self,
        step: InstructionId,
        item: ItemId,
        usage: IngredientUsage,
    ) -> GraphResult<()> {
        self.kitchen.add_ingredient_usage(step, item, usage)?;
        self.reproject(step)
    }

    pub fn add_equipment_usage(
        &mut self,
        step: InstructionId,
        item: ItemId,
        usage: EquipmentUsage,
    ) -> GraphResult<()> {
        self.kitchen.add_equipment_usage(step, item, usage)?;
        self.reproject(step)
    }

    /// Replace what an instruction produces. On a registered instruction the
    /// old producing edge is dropped unless another instruction still
    /// supports it.
    pub fn set_produces(&mut self, step: InstructionId, item: Option<ItemId>) -> GraphResult<()> {
        let previous = self.kitchen.instruction(step)?.produces();
        self.kitchen.set_produces(step, item)?;
        if !self.all_instructions.contains(&step) {
            return Ok(());
        }
        if let Some(old) = previous.filter(|old| Some(*old) != item) {
            let action = self.kitchen.instruction(step)?.action();
            if !self.supports(action, old, true) {
                self.kitchen.remove_producing_action(old, action)?;
            }
        }
        self.reproject(step)
    }

    fn reproject(&mut self, step: InstructionId) -> GraphResult<()> {
        if !self.all_instructions.contains(&step) {
            return Ok(());
        }
        let found = self.kitchen.instruction(step)?;
        let action = found.action();
        let inputs = found.get_input_items();
        let outputs = found.get_output_items();
        self.project(action, &inputs, &outputs)?;
        self.recompute_roots();
        debug!(recipe = self.id, instruction = %step, "reprojected instruction");
        Ok(())
    }

    /// Register an item node that no instruction references (yet).
    pub fn add_item_node(&mut self, item: ItemId) -> GraphResult<()> {
        self.kitchen.item(item)?;
        self.item_nodes.insert(item);
        self.pinned_items.insert(item);
        Ok(())
    }

    /// Register an action node that no instruction references (yet).
    pub fn add_action_node(&mut self, action: ActionId) -> GraphResult<()> {
        self.kitchen.action(action)?;
        self.action_nodes.insert(action);
        self.pinned_actions.insert(action);
        Ok(())
    }

    /// Recompute `action_nodes`, `item_nodes` and the instruction-derived
    /// edges from scratch. Edges wired by hand are left alone.
    pub fn rebuild_projection(&mut self) -> GraphResult<()> {
        self.action_nodes = self.pinned_actions.clone();
        self.item_nodes = self.pinned_items.clone();
        for id in self.all_instructions.clone() {
            let step = self.kitchen.instruction(id)?;
            let action = step.action();
            let inputs = step.get_input_items();
            let outputs = step.get_output_items();
            self.project(action, &inputs, &outputs)?;
        }
        self.recompute_roots();
        Ok(())
    }

    fn project(
        &mut self,
        action: ActionId,
        inputs: &IndexSet<ItemId>,
        outputs: &IndexSet<ItemId>,
    ) -> GraphResult<()> {
        self.action_nodes.insert(action);
        for &item in inputs {
            self.item_nodes.insert(item);
            self.kitchen.add_consuming_action(item, action)?;
        }
        for &item in outputs {
            self.item_nodes.insert(item);
            self.kitchen.add_producing_action(item, action)?;
        }
        Ok(())
    }

    /// Does a registered instruction still justify this operand edge?
    fn supports(&self, action: ActionId, item: ItemId, output: bool) -> bool {
        self.all_instructions.iter().any(|id| match self.kitchen.instruction(*id) {
            Ok(step) if step.action() == action => {
                if output {
                    step.produces() == Some(item)
                } else {
                    step.get_input_items().contains(&item)
                }
            }
            _ => false,
        })
    }

    fn recompute_roots(&mut self) {
        self.root_instructions = self
            .all_instructions
            .iter()
            .copied()
            .filter(|id| {
                self.kitchen
                    .instruction(*id)
                    .map(|s| s.is_root())
                    .unwrap_or(false)
            })
            .collect();
    }

    // ========================================================================
    // Item classification
    // ========================================================================

    fn produced_and_consumed(&self) -> (IndexSet<ItemId>, IndexSet<ItemId>) {
        let mut produced = IndexSet::new();
        let mut consumed = IndexSet::new();
        for id in &self.all_instructions {
            if let Ok(step) = self.kitchen.instruction(*id) {
                produced.extend(step.get_output_items());
                consumed.extend(step.get_consumed_items());
            }
        }
        (produced, consumed)
    }

    /// Consumed by some instruction, produced by none.
    pub fn get_input_items(&self) -> IndexSet<ItemId> {
        let (produced, consumed) = self.produced_and_consumed();
        consumed.difference(&produced).copied().collect()
    }

    /// Produced by some instruction, consumed by none.
    pub fn get_output_items(&self) -> IndexSet<ItemId> {
        let (produced, consumed) = self.produced_and_consumed();
        produced.difference(&consumed).copied().collect()
    }

    /// Both produced and consumed within this recipe.
    pub fn get_intermediate_items(&self) -> IndexSet<ItemId> {
        let (produced, consumed) = self.produced_and_consumed();
        produced.intersection(&consumed).copied().collect()
    }

    // ========================================================================
    // Action classification
    // ========================================================================

    /// Actions none of whose inputs is produced by an action of this recipe.
    pub fn get_root_action_nodes(&self) -> IndexSet<ActionId> {
        self.action_nodes
            .iter()
            .copied()
            .filter(|a| match self.kitchen.action(*a) {
                Ok(action) => !action.input_nodes().iter().any(|item| {
                    self.kitchen
                        .item(*item)
                        .map(|i| i.producing_actions().iter().any(|p| self.action_nodes.contains(p)))
                        .unwrap_or(false)
                }),
                Err(_) => false,
            })
            .collect()
    }

    /// Actions none of whose outputs is consumed by an action of this recipe.
    pub fn get_leaf_action_nodes(&self) -> IndexSet<ActionId> {
        self.action_nodes
            .iter()
            .copied()
            .filter(|a| match self.kitchen.action(*a) {
                Ok(action) => !action.output_nodes().iter().any(|item| {
                    self.kitchen
                        .item(*item)
                        .map(|i| i.consuming_actions().iter().any(|c| self.action_nodes.contains(c)))
                        .unwrap_or(false)
                }),
                Err(_) => false,
            })
            .collect()
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// False if any registered instruction is its own transitive prerequisite.
    pub fn validate_dag_structure(&self) -> bool {
        !self
            .all_instructions
            .iter()
            .any(|id| self.kitchen.has_cycle(*id))
    }

    pub fn validate_operand_graph(&self) -> bool {
        self.operand_graph_issues().is_empty()
    }

    /// Every membership, mirroring and acyclicity violation in the operand
    /// view, in a deterministic order.
    pub fn operand_graph_issues(&self) -> Vec<GraphIssue> {
        let k = &self.kitchen;
        let mut issues = Vec::new();

        for id in &self.all_instructions {
            let Ok(step) = k.instruction(*id) else { continue };
            if !self.action_nodes.contains(&step.action()) {
                issues.push(GraphIssue::UnregisteredAction {
                    instruction: step.number(),
                    action: k.action_name(step.action()),
                });
            }
            for item in step.get_input_items().iter().chain(step.get_output_items().iter()) {
                if !self.item_nodes.contains(item) {
                    issues.push(GraphIssue::UnregisteredItem {
                        referenced_by: format!("instruction {}", step.number()),
                        item: k.item_name(*item),
                    });
                }
            }
        }

        for &a in &self.action_nodes {
            let Ok(action) = k.action(a) else { continue };
            for (items, output) in [(action.input_nodes(), false), (action.output_nodes(), true)] {
                for &i in items {
                    if !self.item_nodes.contains(&i) {
                        issues.push(GraphIssue::UnregisteredItem {
                            referenced_by: action.name().to_string(),
                            item: k.item_name(i),
                        });
                    }
                    let mirrored = k
                        .item(i)
                        .map(|item| {
                            if output {
                                item.producing_actions().contains(&a)
                            } else {
                                item.consuming_actions().contains(&a)
                            }
                        })
                        .unwrap_or(false);
                    if !mirrored {
                        issues.push(unmirrored(output, action.name(), &k.item_name(i)));
                    }
                }
            }
        }

        for &i in &self.item_nodes {
            let Ok(item) = k.item(i) else { continue };
            for (actions, output) in [(item.consuming_actions(), false), (item.producing_actions(), true)] {
                for &a in actions {
                    if !self.action_nodes.contains(&a) {
                        issues.push(GraphIssue::DanglingAction {
                            item: item.name().to_string(),
                            action: k.action_name(a),
                        });
                    }
                    let mirrored = k
                        .action(a)
                        .map(|action| {
                            if output {
                                action.output_nodes().contains(&i)
                            } else {
                                action.input_nodes().contains(&i)
                            }
                        })
                        .unwrap_or(false);
                    if !mirrored {
                        issues.push(unmirrored(output, &k.action_name(a), item.name()));
                    }
                }
            }
        }

        if let Some(item) = self.find_operand_cycle() {
            issues.push(GraphIssue::OperandCycle {
                item: k.item_name(item),
            });
        }
        issues
    }

    /// First item found on an item -> action -> item cycle, if any.
    fn find_operand_cycle(&self) -> Option<ItemId> {
        let successors = |item: ItemId| -> Vec<ItemId> {
            let Ok(node) = self.kitchen.item(item) else {
                return Vec::new();
            };
            node.consuming_actions()
                .iter()
                .filter(|a| self.action_nodes.contains(*a))
                .filter_map(|a| self.kitchen.action(*a).ok())
                .flat_map(|action| action.output_nodes().iter().copied())
                .collect()
        };

        let mut marks: HashMap<ItemId, Mark> = HashMap::new();
        for &start in &self.item_nodes {
            if marks.contains_key(&start) {
                continue;
            }
            marks.insert(start, Mark::InProgress);
            let mut stack = vec![(start, successors(start), 0usize)];
            while let Some((node, next, cursor)) = stack.last_mut() {
                if let Some(&succ) = next.get(*cursor) {
                    *cursor += 1;
                    match marks.get(&succ) {
                        Some(Mark::InProgress) => return Some(succ),
                        Some(Mark::Done) => {}
                        None => {
                            marks.insert(succ, Mark::InProgress);
                            let succ_next = successors(succ);
                            stack.push((succ, succ_next, 0));
                        }
                    }
                } else {
                    marks.insert(*node, Mark::Done);
                    stack.pop();
                }
            }
        }
        None
    }

    // ========================================================================
    // Ordering
    // ========================================================================

    /// Registered instructions ordered so every instruction follows all of
    /// its prerequisites. Returns an empty vector as soon as a cycle is seen;
    /// a partial order is never returned. Prerequisites that are not
    /// registered with this recipe are walked for cycle detection but left
    /// out of the order.
    pub fn get_topological_order(&self) -> Vec<InstructionId> {
        let mut marks: HashMap<InstructionId, Mark> = HashMap::new();
        let mut order = Vec::with_capacity(self.all_instructions.len());

        for &start in &self.all_instructions {
            if marks.contains_key(&start) {
                continue;
            }
            marks.insert(start, Mark::InProgress);
            let mut stack: Vec<(InstructionId, usize)> = vec![(start, 0)];

            while let Some(&(node, cursor)) = stack.last() {
                let prereq = self
                    .kitchen
                    .instruction(node)
                    .ok()
                    .and_then(|s| s.prerequisites().get_index(cursor).copied());
                match prereq {
                    Some(p) => {
                        if let Some(top) = stack.last_mut() {
                            top.1 += 1;
                        }
                        match marks.get(&p) {
                            Some(Mark::InProgress) => {
                                warn!(recipe = self.id, instruction = %p, "cycle in instruction graph");
                                return Vec::new();
                            }
                            Some(Mark::Done) => {}
                            None => {
                                marks.insert(p, Mark::InProgress);
                                stack.push((p, 0));
                            }
                        }
                    }
                    None => {
                        marks.insert(node, Mark::Done);
                        if self.all_instructions.contains(&node) {
                            order.push(node);
                        }
                        stack.pop();
                    }
                }
            }
        }
        order
    }

    pub fn summary(&self) -> RecipeSummary {
        RecipeSummary {
            id: self.id,
            title: self.title.clone(),
            instructions: self.all_instructions.len(),
            root_instructions: self.root_instructions.len(),
            action_nodes: self.action_nodes.len(),
            item_nodes: self.item_nodes.len(),
            input_items: self.get_input_items().len(),
            intermediate_items: self.get_intermediate_items().len(),
            output_items: self.get_output_items().len(),
            dag_valid: self.validate_dag_structure(),
            operand_graph_valid: self.validate_operand_graph(),
        }
    }
}

fn unmirrored(output: bool, action: &str, item: &str) -> GraphIssue {
    if output {
        GraphIssue::UnmirroredOutput {
            action: action.to_string(),
            item: item.to_string(),
        }
    } else {
        GraphIssue::UnmirroredInput {
            action: action.to_string(),
            item: item.to_string(),
        }
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Recipe: {} ({} instructions)",
            self.title,
            self.all_instructions.len()
        )
    }
}
