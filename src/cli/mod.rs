//! CLI subcommands — init, validate, order, analyze, dot.

use crate::core::handle::{ActionId, ItemId};
use crate::core::{dot, parser, recipe::Recipe};
use clap::Subcommand;
use indexmap::IndexSet;
use std::path::{Path, PathBuf};

const TEMPLATE: &str = include_str!("../../demos/pasta.yaml");

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a sample recipe.yaml
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate a recipe document and its graphs
    Validate {
        /// Path to recipe.yaml
        #[arg(short, long, default_value = "recipe.yaml")]
        file: PathBuf,
    },

    /// Print instructions in dependency order
    Order {
        /// Path to recipe.yaml
        #[arg(short, long, default_value = "recipe.yaml")]
        file: PathBuf,
    },

    /// Classify items and actions
    Analyze {
        /// Path to recipe.yaml
        #[arg(short, long, default_value = "recipe.yaml")]
        file: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render the operand graph in Graphviz DOT format
    Dot {
        /// Path to recipe.yaml
        #[arg(short, long, default_value = "recipe.yaml")]
        file: PathBuf,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Order { file } => cmd_order(&file),
        Commands::Analyze { file, json } => cmd_analyze(&file, json),
        Commands::Dot { file, output } => cmd_dot(&file, output.as_deref()),
    }
}

fn cmd_init(path: &Path) -> Result<(), String> {
    let recipe_path = path.join("recipe.yaml");
    if recipe_path.exists() {
        return Err(format!("{} already exists", recipe_path.display()));
    }
    std::fs::write(&recipe_path, TEMPLATE)
        .map_err(|e| format!("cannot write {}: {}", recipe_path.display(), e))?;
    println!("Created: {}", recipe_path.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let doc = parser::load_recipe_document(file)?;
    let errors = parser::validate_document(&doc);
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("  ERROR: {}", e);
        }
        return Err(format!("{} validation error(s)", errors.len()));
    }

    let recipe = parser::build_recipe(&doc).map_err(|e| e.to_string())?;
    let mut problems = 0;
    if !recipe.validate_dag_structure() {
        eprintln!("  ERROR: instruction graph has a cycle");
        problems += 1;
    }
    for issue in recipe.operand_graph_issues() {
        eprintln!("  ERROR: {}", issue);
        problems += 1;
    }
    if problems > 0 {
        return Err(format!("{} graph error(s)", problems));
    }

    println!(
        "OK: {} ({} instructions, {} items, {} actions)",
        recipe.title(),
        recipe.all_instructions().len(),
        recipe.item_nodes().len(),
        recipe.action_nodes().len()
    );
    Ok(())
}

/// Numbered instruction listing, one line per step.
fn format_order(recipe: &Recipe) -> Result<Vec<String>, String> {
    let order = recipe.get_topological_order();
    if order.is_empty() && !recipe.all_instructions().is_empty() {
        return Err("instruction graph has a cycle; no order exists".to_string());
    }
    let k = recipe.kitchen();
    let mut lines = Vec::with_capacity(order.len());
    for (pos, id) in order.iter().enumerate() {
        let step = k.instruction(*id).map_err(|e| e.to_string())?;
        let produces = step
            .produces()
            .map(|item| format!(" -> {}", k.item_name(item)))
            .unwrap_or_default();
        let inputs: Vec<String> = step
            .get_input_items()
            .iter()
            .map(|item| k.item_name(*item))
            .collect();
        lines.push(format!(
            "{:>3}. [{}] {}({}){}",
            pos + 1,
            step.number(),
            k.action_name(step.action()),
            inputs.join(", "),
            produces
        ));
    }
    Ok(lines)
}

fn cmd_order(file: &Path) -> Result<(), String> {
    let recipe = parser::load_recipe(file)?;
    println!("{}", recipe);
    for line in format_order(&recipe)? {
        println!("{}", line);
    }
    Ok(())
}

fn names(recipe: &Recipe, items: impl IntoIterator<Item = ItemId>) -> String {
    items
        .into_iter()
        .map(|id| recipe.kitchen().item_name(id))
        .collect::<Vec<_>>()
        .join(", ")
}

fn cmd_analyze(file: &Path, json: bool) -> Result<(), String> {
    let recipe = parser::load_recipe(file)?;
    let summary = recipe.summary();
    if json {
        let out = serde_json::to_string_pretty(&summary)
            .map_err(|e| format!("JSON serialization error: {}", e))?;
        println!("{}", out);
        return Ok(());
    }

    let k = recipe.kitchen();
    let actions = |set: IndexSet<ActionId>| {
        set.into_iter()
            .map(|a| k.action_name(a))
            .collect::<Vec<_>>()
            .join(", ")
    };

    println!("{}", recipe);
    println!("  inputs:        {}", names(&recipe, recipe.get_input_items()));
    println!("  intermediates: {}", names(&recipe, recipe.get_intermediate_items()));
    println!("  outputs:       {}", names(&recipe, recipe.get_output_items()));
    println!("  root actions:  {}", actions(recipe.get_root_action_nodes()));
    println!("  leaf actions:  {}", actions(recipe.get_leaf_action_nodes()));
    println!("  root steps:    {}", recipe.root_instructions().len());
    println!(
        "  dag valid: {}, operand graph valid: {}",
        summary.dag_valid, summary.operand_graph_valid
    );
    Ok(())
}

fn cmd_dot(file: &Path, output: Option<&Path>) -> Result<(), String> {
    let recipe = parser::load_recipe(file)?;
    let rendered = dot::render_dot(&recipe);
    match output {
        Some(path) => {
            std::fs::write(path, rendered)
                .map_err(|e| format!("cannot write {}: {}", path.display(), e))?;
            println!("Wrote {}", path.display());
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_recipe(dir: &Path, yaml: &str) -> PathBuf {
        let path = dir.join("recipe.yaml");
        std::fs::write(&path, yaml).unwrap();
        path
    }

    #[test]
    fn test_init() {
        let dir = tempfile::tempdir().unwrap();
        cmd_init(dir.path()).unwrap();
        assert!(dir.path().join("recipe.yaml").exists());
        assert!(cmd_init(dir.path()).is_err());
    }

    #[test]
    fn test_template_is_valid() {
        let doc = parser::parse_recipe_document(TEMPLATE).unwrap();
        assert!(parser::validate_document(&doc).is_empty());
        let recipe = parser::build_recipe(&doc).unwrap();
        assert!(recipe.validate_dag_structure());
        assert!(recipe.validate_operand_graph(), "{:?}", recipe.operand_graph_issues());
        assert_eq!(recipe.all_instructions().len(), 10);

        let k = recipe.kitchen();
        let dish = k.item_by_name("pasta_with_marinara").unwrap();
        assert_eq!(recipe.get_output_items(), IndexSet::from([dish]));
        assert_eq!(recipe.root_instructions().len(), 4);
    }

    #[test]
    fn test_template_order() {
        let recipe = parser::build_recipe(&parser::parse_recipe_document(TEMPLATE).unwrap()).unwrap();
        let lines = format_order(&recipe).unwrap();
        assert_eq!(lines.len(), 10);
        assert!(lines[9].contains("toss"));
        let pos = |needle: &str| lines.iter().position(|l| l.contains(needle)).unwrap();
        assert!(pos("[4]") < pos("[5]"));
        assert!(pos("[6]") < pos("[7]"));
        assert!(pos("[8]") < pos("[9]"));
    }

    #[test]
    fn test_validate_commands() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_recipe(dir.path(), TEMPLATE);
        cmd_validate(&file).unwrap();
        cmd_order(&file).unwrap();
        cmd_analyze(&file, false).unwrap();
        cmd_analyze(&file, true).unwrap();

        let out = dir.path().join("recipe.dot");
        cmd_dot(&file, Some(&out)).unwrap();
        let dot = std::fs::read_to_string(&out).unwrap();
        assert!(dot.contains("digraph recipe"));
    }

    #[test]
    fn test_validate_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_recipe(dir.path(), "id: 1\ntitle: ''\n");
        assert!(cmd_validate(&file).is_err());
    }

    #[test]
    fn test_order_rejects_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_recipe(
            dir.path(),
            r#"
id: 1
title: loop
symbols:
  stir: {kind: ACTION}
instructions:
  - {id: 1, action: stir, after: [2]}
  - {id: 2, action: stir, after: [1]}
"#,
        );
        let err = cmd_order(&file).unwrap_err();
        assert!(err.contains("cycle"));
        assert!(cmd_validate(&file).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = cmd_order(Path::new("/nonexistent/recipe.yaml")).unwrap_err();
        assert!(err.starts_with("failed to read"));
    }
}
