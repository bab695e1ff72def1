#![deny(missing_docs)]
#![doc = "Particle-index groupings, lineage-aware interning and equivalence relations."]

/// Arena-backed interning cache for groupings.
pub mod cache;
/// Equivalence relations over interned groupings.
pub mod equivalence;
/// Grouping records and their handles.
pub mod grouping;

pub use cache::GroupingCache;
pub use equivalence::Equivalence;
pub use grouping::{Grouping, GroupingHandle, ParticleIndex};
