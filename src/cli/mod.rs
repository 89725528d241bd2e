//! CLI command handlers.
//!
//! Testable handlers invoked by main.rs; each returns the desired process
//! exit code instead of exiting itself.

mod check;

pub use check::{run_check, CheckConfig};
