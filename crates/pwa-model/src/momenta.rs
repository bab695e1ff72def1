//! The four-momenta accessor every model carries.
//!
//! One static accessor caches the four-momentum and invariant mass of every
//! registered grouping. Final-state momenta are written by the caller when
//! an event is added; the seeding pass then fills composite groupings by
//! summing their constituent leaves and derives all masses. Static slots
//! carry no declared dependencies, so none of this is touched by the
//! per-pass staleness walk.

use std::collections::BTreeMap;

use pwa_combin::{Equivalence, GroupingCache, GroupingHandle};
use pwa_core::{
    CalculationStatus, ErrorInfo, FourVector, ParameterStore, PwaError,
};
use pwa_data::{
    AccessorId, AccessorKind, AccessorRegistry, EventData, SlotId, SlotKind, StatusTable,
    StorageLayout,
};

use crate::component::{CalcStage, KinematicComponent};

fn momenta_error(code: impl Into<String>, message: impl Into<String>) -> PwaError {
    PwaError::Model(ErrorInfo::new(code, message))
}

trait ContextExt {
    fn with_context(self, key: impl Into<String>, value: impl ToString) -> PwaError;
}

impl ContextExt for PwaError {
    fn with_context(self, key: impl Into<String>, value: impl ToString) -> PwaError {
        match self {
            PwaError::Model(info) => PwaError::Model(info.with_context(key, value.to_string())),
            other => other,
        }
    }
}

/// Static accessor holding grouping four-momenta and invariant masses.
#[derive(Debug, Clone, Copy)]
pub struct MomentaAccessor {
    accessor: AccessorId,
    momentum: SlotId,
    mass: SlotId,
}

impl MomentaAccessor {
    /// Declares the accessor and its two slots on an open registry.
    pub fn declare(registry: &mut AccessorRegistry) -> Result<Self, PwaError> {
        let accessor = registry.add_accessor(
            "four-momenta",
            Equivalence::ByOrderlessContent,
            AccessorKind::Static,
        )?;
        let momentum = registry.allocate_slot(accessor, SlotKind::FourVector)?;
        let mass = registry.allocate_slot(accessor, SlotKind::Real)?;
        Ok(Self {
            accessor,
            momentum,
            mass,
        })
    }

    /// The backing accessor.
    pub fn id(&self) -> AccessorId {
        self.accessor
    }

    /// Slot holding the four-momentum.
    pub fn momentum_slot(&self) -> SlotId {
        self.momentum
    }

    /// Slot holding the invariant mass.
    pub fn mass_slot(&self) -> SlotId {
        self.mass
    }

    /// Registers a grouping and, recursively, its whole daughter lineage.
    pub fn register_grouping(
        &self,
        registry: &mut AccessorRegistry,
        cache: &GroupingCache,
        handle: GroupingHandle,
    ) -> Result<(), PwaError> {
        registry.register_grouping(self.accessor, cache, handle)?;
        let daughters = cache.grouping(handle)?.daughters().to_vec();
        for daughter in daughters {
            self.register_grouping(registry, cache, daughter)?;
        }
        Ok(())
    }

    fn leaf_syms(
        &self,
        cache: &GroupingCache,
        layout: &StorageLayout,
    ) -> Result<BTreeMap<u8, usize>, PwaError> {
        let descriptor = layout.accessor(self.accessor)?;
        let mut leaves = BTreeMap::new();
        for (handle, sym) in descriptor.groupings() {
            let grouping = cache.grouping(handle)?;
            if grouping.is_final_state() {
                leaves.insert(grouping.indices()[0].as_raw(), sym);
            }
        }
        Ok(leaves)
    }

    /// Writes the final-state four-momenta of one event, indexed by
    /// particle.
    pub fn set_final_state_momenta(
        &self,
        cache: &GroupingCache,
        layout: &StorageLayout,
        momenta: &[FourVector],
        event: &mut EventData,
        table: &mut StatusTable,
    ) -> Result<(), PwaError> {
        let leaves = self.leaf_syms(cache, layout)?;
        if momenta.len() != leaves.len() {
            return Err(momenta_error(
                "final-state-count",
                "momentum count does not match the registered final state",
            )
            .with_context("expected", leaves.len())
            .with_context("actual", momenta.len()));
        }
        let slot = layout.four_slot(self.momentum)?;
        for (index, &momentum) in momenta.iter().enumerate() {
            let sym = *leaves.get(&(index as u8)).ok_or_else(|| {
                momenta_error("unknown-final-state", "no grouping registered for this particle")
                    .with_context("particle", index)
            })?;
            slot.set_value(momentum, event, sym, table)?;
        }
        Ok(())
    }

    /// Four-momentum of a grouping, read through the accessor's equivalence.
    pub fn momentum(
        &self,
        cache: &GroupingCache,
        layout: &StorageLayout,
        event: &EventData,
        handle: GroupingHandle,
    ) -> Result<FourVector, PwaError> {
        let sym = layout.compatible_sym_index(self.accessor, cache, handle)?;
        layout.four_slot(self.momentum)?.value(event, sym)
    }

    /// Invariant mass of a grouping, read through the accessor's
    /// equivalence.
    pub fn mass(
        &self,
        cache: &GroupingCache,
        layout: &StorageLayout,
        event: &EventData,
        handle: GroupingHandle,
    ) -> Result<f64, PwaError> {
        let sym = layout.compatible_sym_index(self.accessor, cache, handle)?;
        layout.real_slot(self.mass)?.value(event, sym)
    }
}

impl KinematicComponent for MomentaAccessor {
    fn accessor(&self) -> AccessorId {
        self.accessor
    }

    fn stage(&self) -> CalcStage {
        CalcStage::Momenta
    }

    fn calculate_event(
        &self,
        cache: &GroupingCache,
        layout: &StorageLayout,
        _params: &ParameterStore,
        _token: u64,
        event: &mut EventData,
        table: &mut StatusTable,
    ) -> Result<(), PwaError> {
        let descriptor = layout.accessor(self.accessor)?;
        let momentum = layout.four_slot(self.momentum)?;
        let mass = layout.real_slot(self.mass)?;
        let leaves = self.leaf_syms(cache, layout)?;

        // The table is shared across the events of a partition; masses from
        // the previously seeded event must not shadow this one.
        table.set_slot_calculation(self.mass, CalculationStatus::Uncalculated)?;

        for (handle, sym) in descriptor.groupings() {
            if mass.status(table, sym)?.calculation.is_calculated() {
                continue;
            }
            let grouping = cache.grouping(handle)?;
            let total = if grouping.is_final_state() {
                momentum.value(event, sym)?
            } else {
                let mut sum = FourVector::ZERO;
                for &index in grouping.indices() {
                    let leaf = *leaves.get(&index.as_raw()).ok_or_else(|| {
                        momenta_error(
                            "unknown-final-state",
                            "composite grouping references an unregistered particle",
                        )
                        .with_context("particle", index.as_raw())
                    })?;
                    sum += momentum.value(event, leaf)?;
                }
                sum
            };
            momentum.set_value(total, event, sym, table)?;
            mass.set_value(total.mass(), event, sym, table)?;
        }
        Ok(())
    }
}
