//! Structural diffing between two schema documents.
//!
//! Split into the change vocabulary ([`Change`], [`ChangeDetail`]), deep type
//! equivalence ([`TypeComparator`]), and the walk itself ([`DiffEngine`]).

mod change;
mod engine;
mod types;

pub use change::{Change, ChangeCategory, ChangeDetail, ChangeKind, TypeShape};
pub use engine::DiffEngine;
pub use types::{shape_of, TypeComparator};
