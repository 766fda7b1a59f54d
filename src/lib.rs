//! Mise — recipes as directed acyclic graphs.
//!
//! A recipe is modelled twice: as a DAG of instructions linked by
//! prerequisites, and as a bipartite operand graph of items and the actions
//! that consume and produce them. [`core::kitchen::Kitchen`] owns every node
//! and keeps mirrored edges consistent; [`core::recipe::Recipe`] answers the
//! structural queries.

pub mod cli;
pub mod core;

pub use crate::core::error::{GraphError, GraphResult};
pub use crate::core::kitchen::Kitchen;
pub use crate::core::recipe::Recipe;
