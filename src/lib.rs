//! VidiGraph - multi-layout hierarchical graph engine
//!
//! One Graph Model shared by several render contexts, with layout
//! transformers, animated transitions, selection propagation and
//! persistence of what changed.

pub mod bundling;
pub mod cli;
pub mod color;
pub mod config;
pub mod context;
pub mod contexts;
pub mod di;
pub mod error;
pub mod graph;
pub mod loader;
pub mod models;
pub mod networks;
pub mod services;
pub mod storage;
pub mod transformers;

// Re-export FromRef at crate root for di-macros generated code
pub use di::FromRef;
