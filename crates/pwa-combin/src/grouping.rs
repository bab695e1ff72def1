//! Particle-index groupings and their handles.

use serde::{Deserialize, Serialize};

/// Index of a final-state particle within a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticleIndex(u8);

impl ParticleIndex {
    /// Creates a new index from its raw integer representation.
    pub fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    /// Returns the raw integer representation of the index.
    pub fn as_raw(&self) -> u8 {
        self.0
    }
}

/// Handle addressing a grouping inside a [`GroupingCache`].
///
/// [`GroupingCache`]: crate::cache::GroupingCache
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupingHandle(u32);

impl GroupingHandle {
    /// Creates a new handle from its raw integer representation.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw integer representation of the handle.
    pub fn as_raw(&self) -> u32 {
        self.0
    }
}

/// A grouping of final-state particle indices with decay structure.
///
/// A leaf grouping holds exactly one index and no daughters. A composite
/// grouping holds the concatenation of its daughters' indices. The parent
/// link records the lineage a grouping instance appears in; the same index
/// content under different parents is held as distinct instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grouping {
    pub(crate) indices: Vec<ParticleIndex>,
    pub(crate) daughters: Vec<GroupingHandle>,
    pub(crate) parent: Option<GroupingHandle>,
}

impl Grouping {
    pub(crate) fn leaf(index: ParticleIndex) -> Self {
        Self {
            indices: vec![index],
            daughters: Vec::new(),
            parent: None,
        }
    }

    /// Returns the particle indices in daughter order.
    pub fn indices(&self) -> &[ParticleIndex] {
        &self.indices
    }

    /// Returns the daughter grouping handles.
    pub fn daughters(&self) -> &[GroupingHandle] {
        &self.daughters
    }

    /// Returns the parent handle, if this instance sits inside a lineage.
    pub fn parent(&self) -> Option<GroupingHandle> {
        self.parent
    }

    /// Returns true for a single-particle grouping.
    pub fn is_final_state(&self) -> bool {
        self.daughters.is_empty()
    }

    /// Returns true when the grouping covers the given particle index.
    pub fn contains(&self, index: ParticleIndex) -> bool {
        self.indices.contains(&index)
    }

    /// Returns the indices sorted ascending, for order-insensitive compares.
    pub fn sorted_indices(&self) -> Vec<ParticleIndex> {
        let mut sorted = self.indices.clone();
        sorted.sort_unstable();
        sorted
    }
}
