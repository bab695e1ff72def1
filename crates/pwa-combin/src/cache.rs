//! Arena-backed interning cache for groupings.
//!
//! Handles index an arena of grouping records. Interning is idempotent:
//! re-interning the same leaf or the same composite structure returns the
//! existing handle. Composites receive their own lineage copies of the given
//! daughters so that parent links are unambiguous, and unreachable records
//! are reclaimed by an explicit [`GroupingCache::sweep`].

use std::collections::BTreeSet;

use pwa_core::{ConsistencyReport, ErrorInfo, PwaError};

use crate::equivalence::down_tree_eq;
use crate::grouping::{Grouping, GroupingHandle, ParticleIndex};

fn grouping_error(code: impl Into<String>, message: impl Into<String>) -> PwaError {
    PwaError::Grouping(ErrorInfo::new(code, message))
}

trait ContextExt {
    fn with_context(self, key: impl Into<String>, value: impl ToString) -> PwaError;
}

impl ContextExt for PwaError {
    fn with_context(self, key: impl Into<String>, value: impl ToString) -> PwaError {
        match self {
            PwaError::Grouping(info) => {
                PwaError::Grouping(info.with_context(key, value.to_string()))
            }
            other => other,
        }
    }
}

#[derive(Debug, Clone)]
struct NodeRecord {
    alive: bool,
    grouping: Grouping,
}

/// Interning cache handing out [`GroupingHandle`]s.
#[derive(Debug, Clone, Default)]
pub struct GroupingCache {
    nodes: Vec<NodeRecord>,
}

impl GroupingCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the grouping addressed by a handle.
    pub fn grouping(&self, handle: GroupingHandle) -> Result<&Grouping, PwaError> {
        self.nodes
            .get(handle.as_raw() as usize)
            .filter(|record| record.alive)
            .map(|record| &record.grouping)
            .ok_or_else(|| {
                grouping_error("unknown-grouping", "grouping does not exist")
                    .with_context("grouping", handle.as_raw())
            })
    }

    /// Returns the number of live groupings.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|record| record.alive).count()
    }

    /// Returns true when the cache holds no live groupings.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns all live handles in allocation order.
    pub fn handles(&self) -> Vec<GroupingHandle> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, record)| record.alive)
            .map(|(idx, _)| GroupingHandle::from_raw(idx as u32))
            .collect()
    }

    fn alloc(&mut self, grouping: Grouping) -> GroupingHandle {
        let handle = GroupingHandle::from_raw(self.nodes.len() as u32);
        self.nodes.push(NodeRecord {
            alive: true,
            grouping,
        });
        handle
    }

    /// Interns the single-particle grouping for a final-state index.
    pub fn intern_final_state(&mut self, index: ParticleIndex) -> GroupingHandle {
        if let Some(handle) = self.find_final_state(index) {
            return handle;
        }
        self.alloc(Grouping::leaf(index))
    }

    /// Interns a composite grouping built from previously interned daughters.
    ///
    /// The daughters passed in are not re-parented; the composite receives
    /// fresh lineage copies of them, so a handle stays valid wherever else it
    /// is already used.
    pub fn intern_composite(
        &mut self,
        daughters: &[GroupingHandle],
    ) -> Result<GroupingHandle, PwaError> {
        if daughters.is_empty() {
            return Err(grouping_error(
                "empty-daughters",
                "composite grouping needs at least one daughter",
            ));
        }

        let mut seen = BTreeSet::new();
        let mut indices = Vec::new();
        for daughter in daughters {
            let grouping = self.grouping(*daughter)?;
            for index in grouping.indices() {
                if !seen.insert(*index) {
                    return Err(grouping_error(
                        "overlapping-daughters",
                        "daughters share a particle index",
                    )
                    .with_context("index", index.as_raw()));
                }
            }
            indices.extend_from_slice(grouping.indices());
        }

        if let Some(existing) = self.find_composite(daughters) {
            return Ok(existing);
        }

        let handle = self.alloc(Grouping {
            indices,
            daughters: Vec::new(),
            parent: None,
        });
        let mut children = Vec::with_capacity(daughters.len());
        for daughter in daughters {
            children.push(self.clone_with_parent(*daughter, handle)?);
        }
        self.nodes[handle.as_raw() as usize].grouping.daughters = children;
        Ok(handle)
    }

    /// Interns the flat composite of the given particle indices.
    pub fn intern_from_indices(
        &mut self,
        indices: &[ParticleIndex],
    ) -> Result<GroupingHandle, PwaError> {
        match indices {
            [] => Err(grouping_error(
                "empty-indices",
                "grouping needs at least one particle index",
            )),
            [single] => Ok(self.intern_final_state(*single)),
            _ => {
                let leaves: Vec<GroupingHandle> = indices
                    .iter()
                    .map(|index| self.intern_final_state(*index))
                    .collect();
                self.intern_composite(&leaves)
            }
        }
    }

    fn clone_with_parent(
        &mut self,
        source: GroupingHandle,
        parent: GroupingHandle,
    ) -> Result<GroupingHandle, PwaError> {
        let (indices, daughters) = {
            let grouping = self.grouping(source)?;
            (grouping.indices().to_vec(), grouping.daughters().to_vec())
        };
        let handle = self.alloc(Grouping {
            indices,
            daughters: Vec::new(),
            parent: Some(parent),
        });
        let mut children = Vec::with_capacity(daughters.len());
        for daughter in daughters {
            children.push(self.clone_with_parent(daughter, handle)?);
        }
        self.nodes[handle.as_raw() as usize].grouping.daughters = children;
        Ok(handle)
    }

    /// Finds the interned leaf for a final-state index without inserting.
    pub fn find_final_state(&self, index: ParticleIndex) -> Option<GroupingHandle> {
        self.nodes.iter().enumerate().find_map(|(idx, record)| {
            let grouping = &record.grouping;
            if record.alive
                && grouping.parent().is_none()
                && grouping.is_final_state()
                && grouping.indices() == [index]
            {
                Some(GroupingHandle::from_raw(idx as u32))
            } else {
                None
            }
        })
    }

    /// Finds an interned composite with the given daughter structure without
    /// inserting. Parent links are ignored in the comparison.
    pub fn find_composite(&self, daughters: &[GroupingHandle]) -> Option<GroupingHandle> {
        'roots: for (idx, record) in self.nodes.iter().enumerate() {
            let grouping = &record.grouping;
            if !record.alive
                || grouping.parent().is_some()
                || grouping.is_final_state()
                || grouping.daughters().len() != daughters.len()
            {
                continue;
            }
            for (existing, candidate) in grouping.daughters().iter().zip(daughters) {
                if !down_tree_eq(self, *existing, *candidate).unwrap_or(false) {
                    continue 'roots;
                }
            }
            return Some(GroupingHandle::from_raw(idx as u32));
        }
        None
    }

    /// Finds the flat composite of the given indices without inserting.
    pub fn find_from_indices(&self, indices: &[ParticleIndex]) -> Option<GroupingHandle> {
        match indices {
            [] => None,
            [single] => self.find_final_state(*single),
            _ => {
                let leaves: Option<Vec<GroupingHandle>> = indices
                    .iter()
                    .map(|index| self.find_final_state(*index))
                    .collect();
                self.find_composite(&leaves?)
            }
        }
    }

    /// Walks parent links to the top of a grouping's lineage.
    pub fn top(&self, handle: GroupingHandle) -> Result<GroupingHandle, PwaError> {
        let mut current = handle;
        while let Some(parent) = self.grouping(current)?.parent() {
            current = parent;
        }
        Ok(current)
    }

    /// Returns true when the grouping covers every final-state index exactly.
    pub fn spans_final_state(
        &self,
        handle: GroupingHandle,
        n_final: usize,
    ) -> Result<bool, PwaError> {
        let sorted = self.grouping(handle)?.sorted_indices();
        if sorted.len() != n_final {
            return Ok(false);
        }
        Ok(sorted
            .iter()
            .enumerate()
            .all(|(position, index)| index.as_raw() as usize == position))
    }

    /// Reclaims every grouping outside the daughter closure of the roots.
    ///
    /// Roots must be tops of their lineages. Returns the number of records
    /// swept; handles to swept records become invalid.
    pub fn sweep(&mut self, roots: &[GroupingHandle]) -> Result<usize, PwaError> {
        let mut keep = BTreeSet::new();
        let mut stack = Vec::new();
        for root in roots {
            if self.grouping(*root)?.parent().is_some() {
                return Err(grouping_error(
                    "sweep-root-not-top",
                    "sweep roots must not have a parent",
                )
                .with_context("grouping", root.as_raw()));
            }
            stack.push(*root);
        }
        while let Some(handle) = stack.pop() {
            if keep.insert(handle) {
                stack.extend_from_slice(self.grouping(handle)?.daughters());
            }
        }
        let mut swept = 0;
        for (idx, record) in self.nodes.iter_mut().enumerate() {
            if record.alive && !keep.contains(&GroupingHandle::from_raw(idx as u32)) {
                record.alive = false;
                swept += 1;
            }
        }
        Ok(swept)
    }

    /// Checks the structural invariants of every live grouping.
    pub fn consistency_check(&self) -> ConsistencyReport {
        let mut report = ConsistencyReport::new();
        for (idx, record) in self.nodes.iter().enumerate() {
            if !record.alive {
                continue;
            }
            let handle = GroupingHandle::from_raw(idx as u32);
            let grouping = &record.grouping;

            let mut sorted = grouping.sorted_indices();
            sorted.dedup();
            if sorted.len() != grouping.indices().len() {
                report.push(
                    "duplicate-index",
                    format!("grouping {} repeats a particle index", handle.as_raw()),
                );
            }

            if grouping.is_final_state() {
                if grouping.indices().len() != 1 {
                    report.push(
                        "leaf-index-count",
                        format!(
                            "leaf grouping {} holds {} indices",
                            handle.as_raw(),
                            grouping.indices().len()
                        ),
                    );
                }
            } else {
                let mut concatenated = Vec::new();
                for daughter in grouping.daughters() {
                    match self.grouping(*daughter) {
                        Ok(child) => {
                            concatenated.extend_from_slice(child.indices());
                            if child.parent() != Some(handle) {
                                report.push(
                                    "parent-link",
                                    format!(
                                        "daughter {} of grouping {} does not point back",
                                        daughter.as_raw(),
                                        handle.as_raw()
                                    ),
                                );
                            }
                        }
                        Err(_) => report.push(
                            "dead-daughter",
                            format!(
                                "grouping {} references swept daughter {}",
                                handle.as_raw(),
                                daughter.as_raw()
                            ),
                        ),
                    }
                }
                if concatenated != grouping.indices() {
                    report.push(
                        "index-mismatch",
                        format!(
                            "grouping {} indices do not concatenate its daughters",
                            handle.as_raw()
                        ),
                    );
                }
            }

            if let Some(parent) = grouping.parent() {
                match self.grouping(parent) {
                    Ok(holder) => {
                        if !holder.daughters().contains(&handle) {
                            report.push(
                                "parent-daughter-link",
                                format!(
                                    "parent {} does not list grouping {} as a daughter",
                                    parent.as_raw(),
                                    handle.as_raw()
                                ),
                            );
                        }
                    }
                    Err(_) => report.push(
                        "dead-parent",
                        format!(
                            "grouping {} references swept parent {}",
                            handle.as_raw(),
                            parent.as_raw()
                        ),
                    ),
                }
            }
        }
        report
    }

    /// Renders a grouping as nested index lists, e.g. `((0 1) 2)`.
    pub fn format_grouping(&self, handle: GroupingHandle) -> Result<String, PwaError> {
        let grouping = self.grouping(handle)?;
        if grouping.is_final_state() {
            return Ok(grouping.indices()[0].as_raw().to_string());
        }
        let mut parts = Vec::with_capacity(grouping.daughters().len());
        for daughter in grouping.daughters().to_vec() {
            parts.push(self.format_grouping(daughter)?);
        }
        Ok(format!("({})", parts.join(" ")))
    }
}
