//! Accessor registry and the storage layout frozen at lock.
//!
//! Accessors declare cached slots and register the groupings they want
//! storage for; equivalent groupings fold into one symmetrization index.
//! `lock` assigns dense storage rows to every accessor that actually needs
//! storage, resolves declared dependencies into concrete table coordinates
//! and freezes the result as an immutable [`StorageLayout`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use pwa_combin::{Equivalence, GroupingCache, GroupingHandle};
use pwa_core::{ConsistencyReport, ErrorInfo, ParameterId, PwaError};

use crate::event::EventData;
use crate::slot::{ComplexSlot, FourSlot, RealSlot};

fn registry_error(code: impl Into<String>, message: impl Into<String>) -> PwaError {
    PwaError::Registry(ErrorInfo::new(code, message))
}

trait ContextExt {
    fn with_context(self, key: impl Into<String>, value: impl ToString) -> PwaError;
}

impl ContextExt for PwaError {
    fn with_context(self, key: impl Into<String>, value: impl ToString) -> PwaError {
        match self {
            PwaError::Registry(info) => {
                PwaError::Registry(info.with_context(key, value.to_string()))
            }
            other => other,
        }
    }
}

/// Identifier of an accessor within an [`AccessorRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccessorId(u32);

impl AccessorId {
    /// Creates a new identifier from its raw integer representation.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw integer representation of the identifier.
    pub fn as_raw(&self) -> u32 {
        self.0
    }
}

/// Identifier of a cached slot: the owning accessor plus the slot ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotId {
    /// The accessor the slot belongs to.
    pub accessor: AccessorId,
    /// Allocation ordinal of the slot within its accessor.
    pub slot: u16,
}

/// Width class of a cached slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlotKind {
    /// One stored real.
    Real,
    /// Real and imaginary part.
    Complex,
    /// Four stored reals.
    FourVector,
}

impl SlotKind {
    /// Number of reals one entry of this kind occupies.
    pub fn width(self) -> usize {
        match self {
            SlotKind::Real => 1,
            SlotKind::Complex => 2,
            SlotKind::FourVector => 4,
        }
    }
}

/// Whether an accessor's values are seeded once per event or recalculated.
///
/// Static accessors are filled when an event enters a data set and never
/// change afterwards; the per-pass status update walks only recalculable
/// accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessorKind {
    /// Seeded once per event, constant for the lifetime of the data set.
    Static,
    /// Recomputed whenever a dependency changes.
    Recalculable,
}

/// A declared dependency of a cached slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlotDependency {
    /// The slot is stale whenever the parameter has changed.
    Parameter(ParameterId),
    /// The slot is stale whenever the other slot is stale, compared at the
    /// same grouping.
    Slot(SlotId),
    /// The slot is stale whenever the other slot is stale at the given
    /// daughter of the grouping.
    DaughterSlot {
        /// The slot depended on.
        slot: SlotId,
        /// Which daughter of the depending grouping to compare at.
        daughter: usize,
    },
}

#[derive(Debug, Clone)]
struct SlotSpec {
    kind: SlotKind,
    dependencies: Vec<SlotDependency>,
}

#[derive(Debug, Clone)]
struct AccessorRecord {
    label: String,
    equivalence: Equivalence,
    kind: AccessorKind,
    slots: Vec<SlotSpec>,
    groupings: IndexMap<GroupingHandle, usize>,
    n_sym: usize,
}

fn compatible_index_in(
    record: &AccessorRecord,
    cache: &GroupingCache,
    handle: GroupingHandle,
) -> Result<Option<usize>, PwaError> {
    if let Some(&index) = record.groupings.get(&handle) {
        return Ok(Some(index));
    }
    for (&existing, &index) in &record.groupings {
        if record.equivalence.eval(cache, existing, handle)? {
            return Ok(Some(index));
        }
    }
    Ok(None)
}

/// Registry of accessors, their cached slots and registered groupings.
#[derive(Debug, Clone, Default)]
pub struct AccessorRegistry {
    accessors: Vec<AccessorRecord>,
    layout: Option<Arc<StorageLayout>>,
}

impl AccessorRegistry {
    /// Creates an empty, open registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once [`AccessorRegistry::lock`] has run.
    pub fn is_locked(&self) -> bool {
        self.layout.is_some()
    }

    fn ensure_open(&self) -> Result<(), PwaError> {
        if self.layout.is_some() {
            return Err(PwaError::Registry(
                ErrorInfo::new("registry-locked", "registration is frozen after lock")
                    .with_hint("declare accessors, slots and groupings before locking"),
            ));
        }
        Ok(())
    }

    fn record(&self, id: AccessorId) -> Result<&AccessorRecord, PwaError> {
        self.accessors.get(id.as_raw() as usize).ok_or_else(|| {
            registry_error("unknown-accessor", "accessor does not exist")
                .with_context("accessor", id.as_raw())
        })
    }

    fn record_mut(&mut self, id: AccessorId) -> Result<&mut AccessorRecord, PwaError> {
        self.accessors.get_mut(id.as_raw() as usize).ok_or_else(|| {
            registry_error("unknown-accessor", "accessor does not exist")
                .with_context("accessor", id.as_raw())
        })
    }

    /// Declares a new accessor.
    pub fn add_accessor(
        &mut self,
        label: impl Into<String>,
        equivalence: Equivalence,
        kind: AccessorKind,
    ) -> Result<AccessorId, PwaError> {
        self.ensure_open()?;
        let id = AccessorId::from_raw(self.accessors.len() as u32);
        self.accessors.push(AccessorRecord {
            label: label.into(),
            equivalence,
            kind,
            slots: Vec::new(),
            groupings: IndexMap::new(),
            n_sym: 0,
        });
        Ok(id)
    }

    /// Allocates a cached slot on an accessor.
    pub fn allocate_slot(
        &mut self,
        accessor: AccessorId,
        kind: SlotKind,
    ) -> Result<SlotId, PwaError> {
        self.ensure_open()?;
        let record = self.record_mut(accessor)?;
        let slot = record.slots.len() as u16;
        record.slots.push(SlotSpec {
            kind,
            dependencies: Vec::new(),
        });
        Ok(SlotId { accessor, slot })
    }

    fn slot_spec(&self, id: SlotId) -> Result<&SlotSpec, PwaError> {
        self.record(id.accessor)?
            .slots
            .get(id.slot as usize)
            .ok_or_else(|| {
                registry_error("unknown-slot", "slot was never allocated")
                    .with_context("accessor", id.accessor.as_raw())
                    .with_context("slot", id.slot)
            })
    }

    /// Declares a dependency of a cached slot.
    ///
    /// Slot dependencies may only target recalculable accessors; static
    /// values never change after seeding, so tracking them would be
    /// meaningless.
    pub fn add_dependency(
        &mut self,
        slot: SlotId,
        dependency: SlotDependency,
    ) -> Result<(), PwaError> {
        self.ensure_open()?;
        self.slot_spec(slot)?;
        let target = match dependency {
            SlotDependency::Parameter(_) => None,
            SlotDependency::Slot(target) => Some(target),
            SlotDependency::DaughterSlot { slot: target, .. } => Some(target),
        };
        if let Some(target) = target {
            if target == slot {
                return Err(registry_error(
                    "self-dependency",
                    "a slot cannot depend on itself",
                )
                .with_context("accessor", slot.accessor.as_raw())
                .with_context("slot", slot.slot));
            }
            self.slot_spec(target)?;
            if self.record(target.accessor)?.kind == AccessorKind::Static {
                return Err(registry_error(
                    "static-dependency",
                    "slot dependencies may only target recalculable accessors",
                )
                .with_context("accessor", target.accessor.as_raw()));
            }
        }
        self.record_mut(slot.accessor)?.slots[slot.slot as usize]
            .dependencies
            .push(dependency);
        Ok(())
    }

    /// Registers a grouping with an accessor and returns its symmetrization
    /// index.
    ///
    /// A grouping equivalent to an already registered one (under the
    /// accessor's equivalence) folds onto the existing index; otherwise the
    /// next index is assigned in registration order.
    pub fn register_grouping(
        &mut self,
        accessor: AccessorId,
        cache: &GroupingCache,
        handle: GroupingHandle,
    ) -> Result<usize, PwaError> {
        self.ensure_open()?;
        cache.grouping(handle)?;
        let record = self.record(accessor)?;
        if let Some(&index) = record.groupings.get(&handle) {
            return Ok(index);
        }
        let equivalence = record.equivalence;
        let mut found = None;
        for (&existing, &index) in &record.groupings {
            if equivalence.eval(cache, existing, handle)? {
                found = Some(index);
                break;
            }
        }
        let record = self.record_mut(accessor)?;
        let index = match found {
            Some(index) => index,
            None => {
                let index = record.n_sym;
                record.n_sym += 1;
                index
            }
        };
        record.groupings.insert(handle, index);
        Ok(index)
    }

    /// Returns the symmetrization index of an exactly registered grouping.
    pub fn grouping_index(
        &self,
        accessor: AccessorId,
        handle: GroupingHandle,
    ) -> Result<usize, PwaError> {
        self.record(accessor)?
            .groupings
            .get(&handle)
            .copied()
            .ok_or_else(|| {
                registry_error("unregistered-grouping", "grouping was never registered")
                    .with_context("accessor", accessor.as_raw())
                    .with_context("grouping", handle.as_raw())
            })
    }

    /// Returns the symmetrization index of a grouping, falling back to the
    /// accessor's equivalence when the handle itself was never registered.
    pub fn compatible_grouping_index(
        &self,
        accessor: AccessorId,
        cache: &GroupingCache,
        handle: GroupingHandle,
    ) -> Result<usize, PwaError> {
        compatible_index_in(self.record(accessor)?, cache, handle)?.ok_or_else(|| {
            registry_error("unregistered-grouping", "no registered grouping is compatible")
                .with_context("accessor", accessor.as_raw())
                .with_context("grouping", handle.as_raw())
        })
    }

    /// Number of distinct symmetrization indices of an accessor.
    pub fn n_sym(&self, accessor: AccessorId) -> Result<usize, PwaError> {
        Ok(self.record(accessor)?.n_sym)
    }

    /// Label of an accessor.
    pub fn label(&self, accessor: AccessorId) -> Result<&str, PwaError> {
        Ok(&self.record(accessor)?.label)
    }

    /// Kind of an accessor.
    pub fn kind(&self, accessor: AccessorId) -> Result<AccessorKind, PwaError> {
        Ok(self.record(accessor)?.kind)
    }

    /// Number of declared accessors.
    pub fn n_accessors(&self) -> usize {
        self.accessors.len()
    }

    /// Drops registered groupings whose lineage top does not span the full
    /// final state and renumbers the surviving symmetrization indices
    /// densely. Returns the number of dropped registrations.
    pub fn prune_to_full_final_state(
        &mut self,
        cache: &GroupingCache,
        n_final: usize,
    ) -> Result<usize, PwaError> {
        self.ensure_open()?;
        let mut dropped = 0;
        for record in &mut self.accessors {
            let mut kept = IndexMap::new();
            let mut renumber: BTreeMap<usize, usize> = BTreeMap::new();
            for (&handle, &old_index) in &record.groupings {
                let top = cache.top(handle)?;
                if cache.spans_final_state(top, n_final)? {
                    let next = renumber.len();
                    let new_index = *renumber.entry(old_index).or_insert(next);
                    kept.insert(handle, new_index);
                } else {
                    dropped += 1;
                }
            }
            record.groupings = kept;
            record.n_sym = renumber.len();
        }
        Ok(dropped)
    }

    /// Lineage tops of every registered grouping, deduplicated.
    pub fn registered_tops(
        &self,
        cache: &GroupingCache,
    ) -> Result<Vec<GroupingHandle>, PwaError> {
        let mut tops = BTreeSet::new();
        for record in &self.accessors {
            for &handle in record.groupings.keys() {
                tops.insert(cache.top(handle)?);
            }
        }
        Ok(tops.into_iter().collect())
    }

    /// Assigns dense storage rows, resolves slot dependencies and freezes
    /// registration. Locking an already locked registry is a no-op.
    pub fn lock(&mut self, cache: &GroupingCache) -> Result<(), PwaError> {
        if self.layout.is_some() {
            return Ok(());
        }

        let mut row_of: BTreeMap<AccessorId, usize> = BTreeMap::new();
        for (index, record) in self.accessors.iter().enumerate() {
            if !record.slots.is_empty() && record.n_sym > 0 {
                row_of.insert(AccessorId::from_raw(index as u32), row_of.len());
            }
        }

        let mut accessors = Vec::with_capacity(row_of.len());
        for (index, record) in self.accessors.iter().enumerate() {
            let id = AccessorId::from_raw(index as u32);
            let row = match row_of.get(&id) {
                Some(&row) => row,
                None => continue,
            };

            let mut slots = Vec::with_capacity(record.slots.len());
            let mut position = 0;
            for (ordinal, spec) in record.slots.iter().enumerate() {
                let mut dependencies = Vec::with_capacity(spec.dependencies.len());
                for declared in &spec.dependencies {
                    dependencies.push(self.resolve_dependency(
                        cache, record, row, *declared, &row_of,
                    )?);
                }
                slots.push(LayoutSlot {
                    id: SlotId {
                        accessor: id,
                        slot: ordinal as u16,
                    },
                    kind: spec.kind,
                    position,
                    dependencies,
                });
                position += spec.kind.width();
            }

            accessors.push(LayoutAccessor {
                id,
                label: record.label.clone(),
                kind: record.kind,
                equivalence: record.equivalence,
                row,
                stride: position,
                n_sym: record.n_sym,
                slots,
                groupings: record.groupings.clone(),
            });
        }

        self.layout = Some(Arc::new(StorageLayout {
            accessors,
            rows_by_id: row_of,
        }));
        Ok(())
    }

    fn resolve_dependency(
        &self,
        cache: &GroupingCache,
        depending: &AccessorRecord,
        depending_row: usize,
        declared: SlotDependency,
        row_of: &BTreeMap<AccessorId, usize>,
    ) -> Result<ResolvedDependency, PwaError> {
        let (target, daughter) = match declared {
            SlotDependency::Parameter(id) => return Ok(ResolvedDependency::Parameter(id)),
            SlotDependency::Slot(target) => (target, None),
            SlotDependency::DaughterSlot { slot, daughter } => (slot, Some(daughter)),
        };

        let target_record = self.record(target.accessor)?;
        let target_row = *row_of.get(&target.accessor).ok_or_else(|| {
            registry_error(
                "unassigned-dependency",
                "dependency target received no storage row",
            )
            .with_context("accessor", target.accessor.as_raw())
        })?;
        if target_row >= depending_row {
            return Err(PwaError::Registry(
                ErrorInfo::new(
                    "dependency-order",
                    "a slot dependency must resolve to an earlier storage row",
                )
                .with_context("accessor", target.accessor.as_raw().to_string())
                .with_hint("declare the depended-on accessor before the depending one"),
            ));
        }

        let mut sym_targets = vec![Vec::new(); depending.n_sym];
        for (&handle, &sym) in &depending.groupings {
            let lookup = match daughter {
                None => Some(handle),
                Some(position) => cache.grouping(handle)?.daughters().get(position).copied(),
            };
            let Some(lookup) = lookup else {
                continue;
            };
            if let Some(target_sym) = compatible_index_in(target_record, cache, lookup)? {
                if !sym_targets[sym].contains(&target_sym) {
                    sym_targets[sym].push(target_sym);
                }
            }
        }

        Ok(ResolvedDependency::Slot {
            row: target_row,
            ordinal: target.slot as usize,
            sym_targets,
        })
    }

    /// Returns the frozen storage layout.
    pub fn layout(&self) -> Result<Arc<StorageLayout>, PwaError> {
        self.layout.clone().ok_or_else(|| {
            PwaError::Registry(
                ErrorInfo::new("registry-open", "the registry has not been locked")
                    .with_hint("call lock before requesting the storage layout"),
            )
        })
    }

    /// Checks the registry's structural invariants against the cache.
    pub fn consistency_check(&self, cache: &GroupingCache) -> ConsistencyReport {
        let mut report = ConsistencyReport::new();
        for (index, record) in self.accessors.iter().enumerate() {
            let mut seen = BTreeSet::new();
            for (&handle, &sym) in &record.groupings {
                if cache.grouping(handle).is_err() {
                    report.push(
                        "dead-grouping",
                        format!(
                            "accessor {index} ({}) references swept grouping {}",
                            record.label,
                            handle.as_raw()
                        ),
                    );
                }
                if sym >= record.n_sym {
                    report.push(
                        "sym-index-range",
                        format!(
                            "accessor {index} ({}) maps grouping {} past its index count",
                            record.label,
                            handle.as_raw()
                        ),
                    );
                }
                seen.insert(sym);
            }
            if seen.len() != record.n_sym {
                report.push(
                    "sparse-sym-indices",
                    format!(
                        "accessor {index} ({}) covers {} of {} symmetrization indices",
                        record.label,
                        seen.len(),
                        record.n_sym
                    ),
                );
            }
        }
        report
    }
}

/// A slot dependency resolved into concrete status-table coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedDependency {
    /// Stale whenever the parameter has changed.
    Parameter(ParameterId),
    /// Stale whenever any mapped entry of the target slot is stale.
    Slot {
        /// Storage row of the target accessor.
        row: usize,
        /// Slot ordinal within the target accessor.
        ordinal: usize,
        /// Per depending symmetrization index, the target indices to consult.
        sym_targets: Vec<Vec<usize>>,
    },
}

/// Storage description of one cached slot within a locked layout.
#[derive(Debug)]
pub struct LayoutSlot {
    id: SlotId,
    kind: SlotKind,
    position: usize,
    dependencies: Vec<ResolvedDependency>,
}

impl LayoutSlot {
    /// Identifier of the slot.
    pub fn id(&self) -> SlotId {
        self.id
    }

    /// Width class of the slot.
    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    /// Offset of the slot within one symmetrization block of its row.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Dependencies resolved at lock time.
    pub fn dependencies(&self) -> &[ResolvedDependency] {
        &self.dependencies
    }
}

/// Storage description of one accessor within a locked layout.
#[derive(Debug)]
pub struct LayoutAccessor {
    id: AccessorId,
    label: String,
    kind: AccessorKind,
    equivalence: Equivalence,
    row: usize,
    stride: usize,
    n_sym: usize,
    slots: Vec<LayoutSlot>,
    groupings: IndexMap<GroupingHandle, usize>,
}

impl LayoutAccessor {
    /// Identifier of the accessor.
    pub fn id(&self) -> AccessorId {
        self.id
    }

    /// Label given at declaration.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the accessor is static or recalculable.
    pub fn kind(&self) -> AccessorKind {
        self.kind
    }

    /// Equivalence the accessor folds groupings under.
    pub fn equivalence(&self) -> Equivalence {
        self.equivalence
    }

    /// The accessor's storage row.
    pub fn row(&self) -> usize {
        self.row
    }

    /// Width in reals of one symmetrization block.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of symmetrization indices.
    pub fn n_sym(&self) -> usize {
        self.n_sym
    }

    /// Slot descriptors in allocation order.
    pub fn slots(&self) -> &[LayoutSlot] {
        &self.slots
    }

    /// Symmetrization index of an exactly registered grouping.
    pub fn sym_index(&self, handle: GroupingHandle) -> Option<usize> {
        self.groupings.get(&handle).copied()
    }

    /// Registered groupings and their symmetrization indices, in
    /// registration order.
    pub fn groupings(&self) -> impl Iterator<Item = (GroupingHandle, usize)> + '_ {
        self.groupings.iter().map(|(&handle, &sym)| (handle, sym))
    }
}

/// Immutable storage layout produced by [`AccessorRegistry::lock`].
#[derive(Debug)]
pub struct StorageLayout {
    accessors: Vec<LayoutAccessor>,
    rows_by_id: BTreeMap<AccessorId, usize>,
}

impl StorageLayout {
    /// Number of storage rows.
    pub fn n_rows(&self) -> usize {
        self.accessors.len()
    }

    /// Accessor descriptors in row order.
    pub fn accessors(&self) -> &[LayoutAccessor] {
        &self.accessors
    }

    /// The accessor occupying a storage row.
    pub fn row(&self, row: usize) -> Result<&LayoutAccessor, PwaError> {
        self.accessors.get(row).ok_or_else(|| {
            registry_error("unknown-row", "storage row does not exist").with_context("row", row)
        })
    }

    /// The storage descriptor of an accessor.
    ///
    /// Accessors without slots or surviving groupings received no row; asking
    /// for them is an error.
    pub fn accessor(&self, id: AccessorId) -> Result<&LayoutAccessor, PwaError> {
        let row = self.rows_by_id.get(&id).ok_or_else(|| {
            registry_error("unassigned-accessor", "accessor received no storage row")
                .with_context("accessor", id.as_raw())
        })?;
        Ok(&self.accessors[*row])
    }

    fn layout_slot(&self, id: SlotId) -> Result<(&LayoutAccessor, &LayoutSlot), PwaError> {
        let accessor = self.accessor(id.accessor)?;
        let slot = accessor.slots.get(id.slot as usize).ok_or_else(|| {
            registry_error("unknown-slot", "slot was never allocated")
                .with_context("accessor", id.accessor.as_raw())
                .with_context("slot", id.slot)
        })?;
        Ok((accessor, slot))
    }

    /// Typed view of a real-valued slot.
    pub fn real_slot(&self, id: SlotId) -> Result<RealSlot, PwaError> {
        let (accessor, slot) = self.layout_slot(id)?;
        if slot.kind != SlotKind::Real {
            return Err(self.kind_mismatch(id, SlotKind::Real, slot.kind));
        }
        Ok(RealSlot::new(
            id,
            accessor.row,
            id.slot as usize,
            accessor.n_sym,
            accessor.stride,
            slot.position,
        ))
    }

    /// Typed view of a complex-valued slot.
    pub fn complex_slot(&self, id: SlotId) -> Result<ComplexSlot, PwaError> {
        let (accessor, slot) = self.layout_slot(id)?;
        if slot.kind != SlotKind::Complex {
            return Err(self.kind_mismatch(id, SlotKind::Complex, slot.kind));
        }
        Ok(ComplexSlot::new(
            id,
            accessor.row,
            id.slot as usize,
            accessor.n_sym,
            accessor.stride,
            slot.position,
        ))
    }

    /// Typed view of a four-vector slot.
    pub fn four_slot(&self, id: SlotId) -> Result<FourSlot, PwaError> {
        let (accessor, slot) = self.layout_slot(id)?;
        if slot.kind != SlotKind::FourVector {
            return Err(self.kind_mismatch(id, SlotKind::FourVector, slot.kind));
        }
        Ok(FourSlot::new(
            id,
            accessor.row,
            id.slot as usize,
            accessor.n_sym,
            accessor.stride,
            slot.position,
        ))
    }

    fn kind_mismatch(&self, id: SlotId, expected: SlotKind, actual: SlotKind) -> PwaError {
        registry_error("slot-kind-mismatch", "slot holds a different value kind")
            .with_context("accessor", id.accessor.as_raw())
            .with_context("slot", id.slot)
            .with_context("expected", format!("{expected:?}"))
            .with_context("actual", format!("{actual:?}"))
    }

    /// Symmetrization index of an exactly registered grouping.
    pub fn sym_index(
        &self,
        accessor: AccessorId,
        handle: GroupingHandle,
    ) -> Result<usize, PwaError> {
        self.accessor(accessor)?.sym_index(handle).ok_or_else(|| {
            registry_error("unregistered-grouping", "grouping was never registered")
                .with_context("accessor", accessor.as_raw())
                .with_context("grouping", handle.as_raw())
        })
    }

    /// Symmetrization index of a grouping, falling back to the accessor's
    /// equivalence when the handle itself was never registered.
    pub fn compatible_sym_index(
        &self,
        accessor: AccessorId,
        cache: &GroupingCache,
        handle: GroupingHandle,
    ) -> Result<usize, PwaError> {
        let descriptor = self.accessor(accessor)?;
        if let Some(sym) = descriptor.sym_index(handle) {
            return Ok(sym);
        }
        for (&existing, &sym) in &descriptor.groupings {
            if descriptor.equivalence.eval(cache, existing, handle)? {
                return Ok(sym);
            }
        }
        Err(
            registry_error("unregistered-grouping", "no registered grouping is compatible")
                .with_context("accessor", accessor.as_raw())
                .with_context("grouping", handle.as_raw()),
        )
    }

    /// Allocates a zeroed event shaped for this layout.
    pub fn empty_event(&self) -> EventData {
        let widths: Vec<usize> = self
            .accessors
            .iter()
            .map(|accessor| accessor.stride * accessor.n_sym)
            .collect();
        EventData::with_shape(&widths)
    }
}
