pub mod config;
pub mod error;
pub mod evaluator;
pub mod loader;
pub mod model;
pub mod schedule;
pub mod solver;
// cmd and reports are modules of the binary crate (declared in main.rs);
// everything the CLI renders comes through the public API above.
