//! Benchmarks for mise core operations.
//!
//! Run with: cargo bench
//!
//! Results include 95% confidence intervals via Criterion.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mise::core::instruction::Instruction;
use mise::core::item::Item;
use mise::core::parser;
use mise::core::quantity::IngredientUsage;
use mise::core::symbol::Symbol;
use mise::Recipe;

const PASTA: &str = include_str!("../demos/pasta.yaml");

/// A chain of `n` steps, each consuming the previous step's output.
fn chain(n: usize) -> Recipe {
    let mut recipe = Recipe::new(1, "chain");
    let k = recipe.kitchen_mut();
    let stir = k.add_action(Symbol::action("stir")).unwrap();
    let mut ids = Vec::with_capacity(n);
    for i in 0..n {
        let input = k.add_item(Item::ingredient(format!("item-{i:05}"))).unwrap();
        let output = k.add_item(Item::ingredient(format!("item-{:05}", i + 1))).unwrap();
        let id = k
            .add_instruction(
                Instruction::new(i as i64, stir)
                    .with_ingredient(input, IngredientUsage::default())
                    .producing(output),
            )
            .unwrap();
        ids.push(id);
    }
    for pair in ids.windows(2) {
        recipe.add_prerequisite(pair[1], pair[0]).unwrap();
    }
    for id in ids {
        recipe.add_instruction(id).unwrap();
    }
    recipe
}

fn bench_yaml_build(c: &mut Criterion) {
    c.bench_function("yaml_build_pasta", |b| {
        b.iter(|| {
            let doc = parser::parse_recipe_document(black_box(PASTA)).unwrap();
            let recipe = parser::build_recipe(&doc).unwrap();
            black_box(recipe);
        });
    });
}

fn bench_topo_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("topo_sort");
    for n in [10, 100, 1000] {
        let recipe = chain(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &recipe, |b, recipe| {
            b.iter(|| black_box(recipe.get_topological_order()));
        });
    }
    group.finish();
}

fn bench_prerequisite_closure(c: &mut Criterion) {
    let mut group = c.benchmark_group("prerequisite_closure");
    for n in [10, 100, 1000] {
        let recipe = chain(n);
        let last = *recipe.all_instructions().last().unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &recipe, |b, recipe| {
            b.iter(|| black_box(recipe.kitchen().get_all_prerequisites(black_box(last))));
        });
    }
    group.finish();
}

fn bench_operand_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("operand_validation");
    for n in [10, 100, 1000] {
        let recipe = chain(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &recipe, |b, recipe| {
            b.iter(|| black_box(recipe.operand_graph_issues()));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_yaml_build,
    bench_topo_sort,
    bench_prerequisite_closure,
    bench_operand_validation
);
criterion_main!(benches);
