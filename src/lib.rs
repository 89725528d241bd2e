//! Backward-compatibility checking for OpenAPI schema documents.
//!
//! Given a baseline schema (the contract existing clients rely on) and a
//! candidate schema (what a new deployment serves), the crate answers whether
//! the candidate can serve the baseline's clients without breaking them.
//!
//! The pipeline has five stages:
//! 1. **Load** ([`loader`]): normalize raw JSON into a [`model::SchemaDocument`],
//!    validating structure and component references up front.
//! 2. **Index** ([`model::SchemaIndex`]): operations keyed by method and
//!    placeholder-normalized path, component fields flattened for lookup.
//! 3. **Diff** ([`diff::DiffEngine`]): walk both documents in lock-step and
//!    record structural changes, without judging them.
//! 4. **Classify** ([`classify`]): an ordered rule table assigns each change a
//!    severity; anything unrecognized is breaking.
//! 5. **Report** ([`report`]): verdict, counts, and deterministically ordered
//!    changes, rendered as JSON or a text summary.
//!
//! ```no_run
//! use oas_compat::config::CompareOptions;
//! use oas_compat::pipeline::{run_check, SchemaSource};
//!
//! # fn main() -> anyhow::Result<()> {
//! let report = run_check(
//!     SchemaSource::File("baseline.json".into()),
//!     SchemaSource::File("candidate.json".into()),
//!     CompareOptions::new(),
//!     None,
//! )?;
//! println!("{}", report.verdict);
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod harness;
pub mod loader;
pub mod model;
pub mod pipeline;
pub mod report;

pub use error::{CompatError, Result};
