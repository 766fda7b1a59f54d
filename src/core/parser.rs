//! Recipe document loading and validation.
//!
//! Parses recipe YAML and validates structural constraints before anything is
//! built:
//! - symbol, item and instruction references must resolve
//! - instruction ids must be unique
//! - the action of an instruction must be an ACTION symbol
//! - ingredients and equipment must be used in the matching slot
//! - an instruction may not depend on itself
//!
//! Items named only as an instruction's `produces` are created as
//! intermediate ingredients.

use super::error::{GraphError, GraphResult};
use super::handle::{InstructionId, ItemId};
use super::instruction::Instruction;
use super::item::{Item, Provenance, VESSEL_TAG};
use super::kitchen::Kitchen;
use super::quantity::{Dimensions, Duration, EquipmentUsage, IngredientUsage, Temperature};
use super::recipe::Recipe;
use super::symbol::{Symbol, SymbolKind};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Top-level recipe document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeDocument {
    pub id: i64,
    pub title: String,
    /// Keyed by canonical form.
    #[serde(default)]
    pub symbols: IndexMap<String, SymbolSpec>,
    /// Keyed by item name.
    #[serde(default)]
    pub items: IndexMap<String, ItemSpec>,
    #[serde(default)]
    pub instructions: Vec<InstructionSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolSpec {
    pub kind: SymbolKind,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    #[default]
    Ingredient,
    IntermediateIngredient,
    Equipment,
    IntermediateEquipment,
}

impl ItemKind {
    fn is_equipment(self) -> bool {
        matches!(self, Self::Equipment | Self::IntermediateEquipment)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemSpec {
    #[serde(default)]
    pub variant: ItemKind,
    /// Ingredient or equipment record id.
    #[serde(default)]
    pub record_id: Option<i64>,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub identity: Vec<String>,
    #[serde(default)]
    pub state: Vec<String>,
    #[serde(default)]
    pub preparation: Vec<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    /// Initial contents, for vessels.
    #[serde(default)]
    pub contents: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructionSpec {
    pub id: i64,
    pub action: String,
    #[serde(default)]
    pub ingredients: IndexMap<String, IngredientUsage>,
    #[serde(default)]
    pub equipment: IndexMap<String, EquipmentUsage>,
    #[serde(default)]
    pub produces: Option<String>,
    /// Ids of prerequisite instructions.
    #[serde(default)]
    pub after: Vec<i64>,
    #[serde(default)]
    pub temperature: Option<Temperature>,
    #[serde(default)]
    pub duration: Option<Duration>,
    #[serde(default)]
    pub sequence_order: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Parse a recipe document from disk.
pub fn load_recipe_document(path: &Path) -> Result<RecipeDocument, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    parse_recipe_document(&content)
}

/// Parse a recipe document from a string.
pub fn parse_recipe_document(yaml: &str) -> Result<RecipeDocument, String> {
    serde_yaml_ng::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))
}

/// Validate a parsed document. Returns a list of errors (empty = valid).
pub fn validate_document(doc: &RecipeDocument) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut err = |message: String| errors.push(ValidationError { message });

    if doc.title.trim().is_empty() {
        err("title must not be empty".to_string());
    }

    for name in doc.symbols.keys() {
        if name.trim().is_empty() {
            err("symbol with empty canonical form".to_string());
        }
    }

    let produced: IndexSet<&str> = doc
        .instructions
        .iter()
        .filter_map(|i| i.produces.as_deref())
        .collect();
    let is_ingredient = |name: &str| match doc.items.get(name) {
        Some(spec) => !spec.variant.is_equipment(),
        None => produced.contains(name),
    };

    for (name, item) in &doc.items {
        if name.trim().is_empty() {
            err("item with empty name".to_string());
        }
        let refs = item
            .identity
            .iter()
            .chain(&item.state)
            .chain(&item.preparation)
            .chain(item.size.iter());
        for symbol in refs {
            if !doc.symbols.contains_key(symbol) {
                err(format!("item '{}' references unknown symbol '{}'", name, symbol));
            }
        }
        if !item.contents.is_empty() {
            let vessel = item.identity.iter().any(|symbol| {
                symbol.as_str() == VESSEL_TAG
                    || doc
                        .symbols
                        .get(symbol)
                        .is_some_and(|spec| spec.categories.iter().any(|c| c.as_str() == VESSEL_TAG))
            });
            if !item.variant.is_equipment() {
                err(format!("item '{}' has contents but is not equipment", name));
            } else if !vessel {
                err(format!("item '{}' has contents but is not a vessel", name));
            }
        }
        for content in &item.contents {
            if !doc.items.contains_key(content) {
                err(format!("item '{}' contains unknown item '{}'", name, content));
            } else if !is_ingredient(content.as_str()) {
                err(format!("item '{}' contains equipment '{}'", name, content));
            }
        }
    }

    let mut seen = IndexSet::new();
    let ids: IndexSet<i64> = doc.instructions.iter().map(|i| i.id).collect();
    for step in &doc.instructions {
        if !seen.insert(step.id) {
            err(format!("duplicate instruction id {}", step.id));
        }

        match doc.symbols.get(&step.action) {
            None => err(format!(
                "instruction {} uses unknown action '{}'",
                step.id, step.action
            )),
            Some(spec) if spec.kind != SymbolKind::Action => err(format!(
                "instruction {} uses '{}' as an action, but it is {}",
                step.id, step.action, spec.kind
            )),
            Some(_) => {}
        }

        for name in step.ingredients.keys() {
            if !doc.items.contains_key(name) && !produced.contains(name.as_str()) {
                err(format!(
                    "instruction {} uses unknown ingredient '{}'",
                    step.id, name
                ));
            } else if !is_ingredient(name.as_str()) {
                err(format!(
                    "instruction {} lists equipment '{}' as an ingredient",
                    step.id, name
                ));
            }
        }
        for name in step.equipment.keys() {
            match doc.items.get(name) {
                None => err(format!(
                    "instruction {} uses unknown equipment '{}'",
                    step.id, name
                )),
                Some(spec) if !spec.variant.is_equipment() => err(format!(
                    "instruction {} lists ingredient '{}' as equipment",
                    step.id, name
                )),
                Some(_) => {}
            }
        }

        for dep in &step.after {
            if *dep == step.id {
                err(format!("instruction {} depends on itself", step.id));
            } else if !ids.contains(dep) {
                err(format!(
                    "instruction {} depends on unknown instruction {}",
                    step.id, dep
                ));
            }
        }

        if let Some(order) = step.sequence_order {
            if !order.is_finite() {
                err(format!(
                    "instruction {} has non-finite sequence_order",
                    step.id
                ));
            }
        }
    }

    errors
}

fn build_symbol(name: &str, spec: &SymbolSpec) -> Symbol {
    Symbol::new(spec.kind, name)
        .with_categories(spec.categories.iter().cloned())
        .with_aliases(spec.aliases.iter().cloned())
        .with_description(spec.description.clone())
}

fn lookup(symbols: &IndexMap<String, Symbol>, name: &str) -> GraphResult<Symbol> {
    symbols
        .get(name)
        .cloned()
        .ok_or_else(|| GraphError::Validation(format!("unknown symbol '{}'", name)))
}

fn lookup_all(symbols: &IndexMap<String, Symbol>, names: &[String]) -> GraphResult<Vec<Symbol>> {
    names.iter().map(|n| lookup(symbols, n)).collect()
}

fn build_item(name: &str, spec: &ItemSpec, symbols: &IndexMap<String, Symbol>) -> GraphResult<Item> {
    let mut item = match spec.variant {
        ItemKind::Ingredient => Item::ingredient(name),
        ItemKind::IntermediateIngredient => Item::intermediate_ingredient(name, Provenance::default()),
        ItemKind::Equipment => Item::equipment(name),
        ItemKind::IntermediateEquipment => Item::intermediate_equipment(name, Provenance::default()),
    };
    if let Some(id) = spec.record_id {
        item = item.with_record_id(id);
    }
    if let Some(id) = spec.parent_id {
        item = item.with_parent_id(id);
    }
    item = item.with_identity(lookup_all(symbols, &spec.identity)?);
    if !spec.state.is_empty() {
        item = item.with_state(lookup_all(symbols, &spec.state)?);
    }
    if !spec.preparation.is_empty() {
        item = item.with_preparation(lookup_all(symbols, &spec.preparation)?);
    }
    if let Some(size) = &spec.size {
        item = item.with_size(lookup(symbols, size)?);
    }
    if let Some(dimensions) = &spec.dimensions {
        item = item.with_dimensions(dimensions.clone());
    }
    Ok(item)
}

fn resolve(kitchen: &Kitchen, name: &str) -> GraphResult<ItemId> {
    kitchen
        .item_by_name(name)
        .ok_or_else(|| GraphError::Validation(format!("unknown item '{}'", name)))
}

/// Assemble a [`Recipe`] from a document. Run [`validate_document`] first for
/// a complete error list; this stops at the first problem.
pub fn build_recipe(doc: &RecipeDocument) -> GraphResult<Recipe> {
    let mut kitchen = Kitchen::new();
    let symbols: IndexMap<String, Symbol> = doc
        .symbols
        .iter()
        .map(|(name, spec)| (name.clone(), build_symbol(name, spec)))
        .collect();

    for (name, spec) in &doc.items {
        kitchen.add_item(build_item(name, spec, &symbols)?)?;
    }
    for (name, spec) in &doc.items {
        let vessel = resolve(&kitchen, name)?;
        for content in &spec.contents {
            let content = resolve(&kitchen, content)?;
            kitchen.add_to_vessel(vessel, content)?;
        }
    }

    let mut by_number: IndexMap<i64, InstructionId> = IndexMap::new();
    for step in &doc.instructions {
        if by_number.contains_key(&step.id) {
            return Err(GraphError::Validation(format!(
                "duplicate instruction id {}",
                step.id
            )));
        }
        let action = kitchen.add_action(lookup(&symbols, &step.action)?)?;
        let mut instruction = Instruction::new(step.id, action);

        for (name, usage) in &step.ingredients {
            let item = match kitchen.item_by_name(name) {
                Some(id) => id,
                // Produced by a later step.
                None => kitchen.add_item(Item::intermediate_ingredient(name, Provenance::default()))?,
            };
            instruction = instruction.with_ingredient(item, usage.clone());
        }
        for (name, usage) in &step.equipment {
            instruction = instruction.with_equipment(resolve(&kitchen, name)?, usage.clone());
        }
        if let Some(name) = &step.produces {
            let item = match kitchen.item_by_name(name) {
                Some(id) => id,
                None => kitchen.add_item(Item::intermediate_ingredient(name, Provenance::default()))?,
            };
            instruction = instruction.producing(item);
        }
        if let Some(t) = &step.temperature {
            instruction = instruction.with_temperature(t.clone());
        }
        if let Some(d) = &step.duration {
            instruction = instruction.with_duration(d.clone());
        }
        if let Some(order) = step.sequence_order {
            instruction = instruction.with_sequence_order(order);
        }
        if let Some(description) = &step.description {
            instruction = instruction.with_description(description.clone());
        }

        let sources: Vec<ItemId> = instruction.ingredients().keys().copied().collect();
        let tools: Vec<ItemId> = instruction.equipment().keys().copied().collect();
        let produced = instruction.produces();
        let id = kitchen.add_instruction(instruction)?;
        by_number.insert(step.id, id);

        if let Some(item) = produced {
            if let Some(provenance) = kitchen.item_mut(item)?.provenance_mut() {
                provenance.produced_by = Some(id);
                provenance.source_ingredients.extend(sources);
                provenance.source_equipment.extend(tools);
            }
        }
    }

    let mut recipe = Recipe::with_kitchen(doc.id, doc.title.clone(), kitchen);
    recipe.set_title(doc.title.clone())?;

    for step in &doc.instructions {
        let Some(&id) = by_number.get(&step.id) else { continue };
        for dep in &step.after {
            let prereq = by_number.get(dep).copied().ok_or_else(|| {
                GraphError::Validation(format!(
                    "instruction {} depends on unknown instruction {}",
                    step.id, dep
                ))
            })?;
            recipe.add_prerequisite(id, prereq)?;
        }
    }
    for &id in by_number.values() {
        recipe.add_instruction(id)?;
    }

    debug!(
        recipe = doc.id,
        instructions = by_number.len(),
        items = recipe.kitchen().item_count(),
        "built recipe"
    );
    Ok(recipe)
}

/// Read, validate and build in one step, joining validation errors.
pub fn load_recipe(path: &Path) -> Result<Recipe, String> {
    let doc = load_recipe_document(path)?;
    let errors = validate_document(&doc);
    if !errors.is_empty() {
        let joined: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        return Err(format!(
            "{} validation error(s):\n  {}",
            errors.len(),
            joined.join("\n  ")
        ));
    }
    build_recipe(&doc).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONIONS: &str = r#"
id: 1
title: Sauteed onions
symbols:
  chop:
    kind: ACTION
    categories: [PREPARATION_TASK, DIVISION]
  saute:
    kind: ACTION
    categories: [COOKING_METHOD]
  onion:
    kind: INGREDIENT_IDENTITY
    categories: [VEGETABLE]
  knife:
    kind: EQUIPMENT_IDENTITY
items:
  onion:
    record_id: 10
    identity: [onion]
  knife:
    variant: equipment
    identity: [knife]
instructions:
  - id: 1
    action: chop
    ingredients:
      onion: {count: 1}
    equipment:
      knife: {}
    produces: chopped_onion
  - id: 2
    action: saute
    ingredients:
      chopped_onion: {}
    produces: sauteed_onion
    after: [1]
    duration: {type: abs, value: 8, unit: {kind: UNIT, canonical_form: minute}}
"#;

    fn messages(doc: &RecipeDocument) -> Vec<String> {
        validate_document(doc).into_iter().map(|e| e.message).collect()
    }

    #[test]
    fn test_parse_valid() {
        let doc = parse_recipe_document(ONIONS).unwrap();
        assert_eq!(doc.title, "Sauteed onions");
        assert_eq!(doc.instructions.len(), 2);
        assert_eq!(doc.items["knife"].variant, ItemKind::Equipment);
        assert_eq!(doc.items["onion"].variant, ItemKind::Ingredient);
        assert!(messages(&doc).is_empty(), "{:?}", messages(&doc));
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let err = parse_recipe_document("id: [not, a, number").unwrap_err();
        assert!(err.starts_with("YAML parse error"));
    }

    #[test]
    fn test_build_recipe() {
        let doc = parse_recipe_document(ONIONS).unwrap();
        let recipe = build_recipe(&doc).unwrap();
        let k = recipe.kitchen();

        let chopped = k.item_by_name("chopped_onion").unwrap();
        let sauteed = k.item_by_name("sauteed_onion").unwrap();
        assert_eq!(recipe.get_intermediate_items(), IndexSet::from([chopped]));
        assert_eq!(recipe.get_output_items(), IndexSet::from([sauteed]));
        assert_eq!(recipe.root_instructions().len(), 1);
        assert_eq!(recipe.get_topological_order().len(), 2);

        let provenance = k.item(chopped).unwrap().provenance().unwrap();
        assert_eq!(provenance.source_ingredients.len(), 1);
        assert_eq!(provenance.source_equipment.len(), 1);
        assert!(provenance.produced_by.is_some());
        assert!(recipe.validate_operand_graph());
    }

    #[test]
    fn test_unknown_references() {
        let yaml = r#"
id: 1
title: broken
symbols:
  boil: {kind: ACTION}
items:
  pasta:
    identity: [noodle]
instructions:
  - id: 1
    action: simmer
    ingredients:
      water: {}
    equipment:
      pot: {}
    after: [9]
"#;
        let doc = parse_recipe_document(yaml).unwrap();
        let msgs = messages(&doc);
        assert!(msgs.iter().any(|m| m.contains("unknown symbol 'noodle'")));
        assert!(msgs.iter().any(|m| m.contains("unknown action 'simmer'")));
        assert!(msgs.iter().any(|m| m.contains("unknown ingredient 'water'")));
        assert!(msgs.iter().any(|m| m.contains("unknown equipment 'pot'")));
        assert!(msgs.iter().any(|m| m.contains("unknown instruction 9")));
        assert!(build_recipe(&doc).is_err());
    }

    #[test]
    fn test_non_action_symbol_as_action() {
        let yaml = r#"
id: 1
title: salted
symbols:
  salt: {kind: INGREDIENT_IDENTITY}
instructions:
  - id: 1
    action: salt
"#;
        let doc = parse_recipe_document(yaml).unwrap();
        assert!(messages(&doc)[0].contains("INGREDIENT_IDENTITY"));
        let err = build_recipe(&doc).unwrap_err();
        assert!(matches!(err, GraphError::InvalidOperand { .. }));
    }

    #[test]
    fn test_duplicates_and_self_dependency() {
        let yaml = r#"
id: 1
title: dupes
symbols:
  stir: {kind: ACTION}
instructions:
  - {id: 1, action: stir, after: [1]}
  - {id: 1, action: stir}
"#;
        let doc = parse_recipe_document(yaml).unwrap();
        let msgs = messages(&doc);
        assert!(msgs.contains(&"duplicate instruction id 1".to_string()));
        assert!(msgs.contains(&"instruction 1 depends on itself".to_string()));
    }

    #[test]
    fn test_variant_mismatch() {
        let yaml = r#"
id: 1
title: mixed up
symbols:
  stir: {kind: ACTION}
items:
  pot: {variant: equipment}
  salt: {}
instructions:
  - id: 1
    action: stir
    ingredients:
      pot: {}
    equipment:
      salt: {}
"#;
        let doc = parse_recipe_document(yaml).unwrap();
        let msgs = messages(&doc);
        assert!(msgs.iter().any(|m| m.contains("lists equipment 'pot' as an ingredient")));
        assert!(msgs.iter().any(|m| m.contains("lists ingredient 'salt' as equipment")));
        assert!(matches!(build_recipe(&doc), Err(GraphError::Validation(_))));
    }

    #[test]
    fn test_empty_title() {
        let doc = parse_recipe_document("id: 1\ntitle: ''\n").unwrap();
        assert_eq!(messages(&doc), vec!["title must not be empty".to_string()]);
        assert!(build_recipe(&doc).is_err());
    }

    #[test]
    fn test_vessel_contents() {
        let yaml = r#"
id: 1
title: pot of water
symbols:
  pot: {kind: EQUIPMENT_IDENTITY, categories: [VESSEL]}
items:
  water: {}
  pot:
    variant: equipment
    identity: [pot]
    contents: [water]
"#;
        let doc = parse_recipe_document(yaml).unwrap();
        assert!(messages(&doc).is_empty());
        let recipe = build_recipe(&doc).unwrap();
        let k = recipe.kitchen();
        let pot = k.item_by_name("pot").unwrap();
        assert!(k.item(pot).unwrap().is_vessel());
        assert_eq!(k.vessel_contents(pot).unwrap(), vec![k.item_by_name("water").unwrap()]);
    }

    #[test]
    fn test_contents_require_vessel() {
        let yaml = r#"
id: 1
title: knife in a pot
symbols:
  knife: {kind: EQUIPMENT_IDENTITY, categories: [CUTTING]}
  chop: {kind: ACTION}
items:
  water: {}
  knife:
    variant: equipment
    identity: [knife]
    contents: [water]
instructions:
  - {id: 1, action: chop}
"#;
        let doc = parse_recipe_document(yaml).unwrap();
        assert_eq!(messages(&doc), vec!["item 'knife' has contents but is not a vessel"]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knife.yaml");
        std::fs::write(&path, yaml).unwrap();
        let err = load_recipe(&path).unwrap_err();
        assert!(err.starts_with("1 validation error(s)"), "{}", err);
        assert!(err.contains("not a vessel"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("onions.yaml");
        std::fs::write(&path, ONIONS).unwrap();
        let recipe = load_recipe(&path).unwrap();
        assert_eq!(recipe.title(), "Sauteed onions");

        let missing = load_recipe_document(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(missing.starts_with("failed to read"));
    }

    #[test]
    fn test_load_reports_all_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "id: 1\ntitle: ''\ninstructions:\n  - {id: 1, action: x}\n").unwrap();
        let err = load_recipe(&path).unwrap_err();
        assert!(err.starts_with("2 validation error(s)"), "{}", err);
    }
}
