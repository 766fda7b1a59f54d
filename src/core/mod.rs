//! Core graph model — symbols, items, actions, instructions, recipes.

pub mod action;
pub mod dot;
pub mod error;
pub mod handle;
pub mod instruction;
pub mod item;
pub mod kitchen;
pub mod parser;
pub mod quantity;
pub mod recipe;
pub mod symbol;
