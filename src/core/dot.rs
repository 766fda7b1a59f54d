//! Graphviz export of the operand graph.
//!
//! Items and actions become nodes, operand edges become arrows. Items are
//! coloured by role (input, intermediate, output, equipment) and actions by
//! their first recognised category.

use super::handle::{ActionId, ItemId};
use super::recipe::Recipe;
use std::fmt::Write;

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn item_node(id: ItemId) -> String {
    format!("item{}", id.as_u32())
}

fn action_node(id: ActionId) -> String {
    format!("action{}", id.as_u32())
}

fn action_color(categories: &indexmap::IndexSet<String>) -> &'static str {
    if categories.contains("PREPARATION_TASK") {
        "lavender"
    } else if categories.contains("COOKING_METHOD") {
        "lightsalmon"
    } else if categories.contains("COMBINATION") {
        "lightcyan"
    } else {
        "lightgray"
    }
}

/// Render the recipe's operand graph in DOT format.
pub fn render_dot(recipe: &Recipe) -> String {
    let k = recipe.kitchen();
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "digraph recipe {{");
    let _ = writeln!(out, "    label=\"{}\";", escape(recipe.title()));
    let _ = writeln!(out, "    rankdir=LR;");
    let _ = writeln!(out, "    node [fontname=\"Helvetica\"];");

    for &id in recipe.item_nodes() {
        let Ok(item) = k.item(id) else { continue };
        let (shape, color) = if item.is_equipment() {
            ("diamond", "lightblue")
        } else if item.is_intermediate_operand() {
            ("box", "lightyellow")
        } else if item.is_input_operand() {
            ("box", "lightgreen")
        } else if item.is_output_operand() {
            ("box", "lightcoral")
        } else {
            ("box", "white")
        };
        let _ = writeln!(
            out,
            "    {} [label=\"{}\", shape={}, style=filled, fillcolor={}];",
            item_node(id),
            escape(item.name()),
            shape,
            color
        );
    }

    for &id in recipe.action_nodes() {
        let Ok(action) = k.action(id) else { continue };
        let _ = writeln!(
            out,
            "    {} [label=\"{}\", shape=ellipse, style=filled, fillcolor={}];",
            action_node(id),
            escape(action.name()),
            action_color(action.symbol().categories())
        );
    }

    for &id in recipe.action_nodes() {
        let Ok(action) = k.action(id) else { continue };
        for &input in action.input_nodes() {
            let style = match k.item(input) {
                Ok(item) if item.is_equipment() => " [style=dashed]",
                _ => "",
            };
            let _ = writeln!(out, "    {} -> {}{};", item_node(input), action_node(id), style);
        }
        for &output in action.output_nodes() {
            let _ = writeln!(out, "    {} -> {};", action_node(id), item_node(output));
        }
    }

    out.push_str("}\n");
    out
}
