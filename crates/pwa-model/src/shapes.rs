//! Amplitude components shipped with the engine.
//!
//! The constant-width Breit-Wigner is the canonical recalculable component:
//! it owns one complex slot, depends on its mass and width parameters and
//! reads invariant masses from the model's momenta accessor. The flat
//! amplitude owns no storage at all and shows the accessor-less side of the
//! component trait.

use std::collections::BTreeSet;

use pwa_combin::{Equivalence, GroupingCache, GroupingHandle};
use pwa_core::{Complex64, ParameterId, ParameterStore, PwaError};
use pwa_data::{
    AccessorId, AccessorKind, AccessorRegistry, EventData, SlotDependency, SlotId, SlotKind,
    StatusTable, StorageLayout,
};

use crate::component::AmplitudeComponent;
use crate::momenta::MomentaAccessor;

/// Relativistic Breit-Wigner with a mass-independent width.
///
/// `T(s) = m·Γ / (m² − s − i·m·Γ)` evaluated at the invariant mass squared
/// of the grouping the component is attached to.
#[derive(Debug, Clone)]
pub struct ConstantWidthBreitWigner {
    label: String,
    accessor: AccessorId,
    slot: SlotId,
    mass: ParameterId,
    width: ParameterId,
    parameters: BTreeSet<ParameterId>,
    momenta: MomentaAccessor,
}

impl ConstantWidthBreitWigner {
    /// Declares the component's accessor, slot and parameters.
    ///
    /// The width is constrained non-negative; seeding it below zero is
    /// refused by the parameter store.
    pub fn declare(
        registry: &mut AccessorRegistry,
        params: &mut ParameterStore,
        momenta: &MomentaAccessor,
        label: impl Into<String>,
        mass: f64,
        width: f64,
    ) -> Result<Self, PwaError> {
        let label = label.into();
        let mass = params.add_real(format!("{label}.mass"), mass);
        let width = params.add_nonnegative(format!("{label}.width"), width)?;
        let accessor = registry.add_accessor(
            label.clone(),
            Equivalence::ByOrderlessContent,
            AccessorKind::Recalculable,
        )?;
        let slot = registry.allocate_slot(accessor, SlotKind::Complex)?;
        registry.add_dependency(slot, SlotDependency::Parameter(mass))?;
        registry.add_dependency(slot, SlotDependency::Parameter(width))?;
        Ok(Self {
            label,
            accessor,
            slot,
            mass,
            width,
            parameters: BTreeSet::from([mass, width]),
            momenta: *momenta,
        })
    }

    /// The mass parameter.
    pub fn mass_parameter(&self) -> ParameterId {
        self.mass
    }

    /// The width parameter.
    pub fn width_parameter(&self) -> ParameterId {
        self.width
    }

    /// The cached complex slot.
    pub fn slot(&self) -> SlotId {
        self.slot
    }
}

impl AmplitudeComponent for ConstantWidthBreitWigner {
    fn label(&self) -> &str {
        &self.label
    }

    fn accessor(&self) -> Option<AccessorId> {
        Some(self.accessor)
    }

    fn parameters(&self) -> &BTreeSet<ParameterId> {
        &self.parameters
    }

    fn valid_for(
        &self,
        cache: &GroupingCache,
        handle: GroupingHandle,
    ) -> Result<bool, PwaError> {
        Ok(cache.grouping(handle)?.daughters().len() == 2)
    }

    fn value(
        &self,
        cache: &GroupingCache,
        layout: &StorageLayout,
        event: &EventData,
        handle: GroupingHandle,
    ) -> Result<Complex64, PwaError> {
        let sym = layout.compatible_sym_index(self.accessor, cache, handle)?;
        layout.complex_slot(self.slot)?.value(event, sym)
    }

    fn calculate(
        &self,
        cache: &GroupingCache,
        layout: &StorageLayout,
        params: &ParameterStore,
        events: &mut [&mut EventData],
        table: &mut StatusTable,
    ) -> Result<(), PwaError> {
        let descriptor = layout.accessor(self.accessor)?;
        let shape = layout.complex_slot(self.slot)?;
        let mass = params.real(self.mass)?;
        let width = params.real(self.width)?;
        // Factors free of s are hoisted out of the event loop.
        let numerator = mass * width;
        let pole = Complex64::new(mass * mass, -numerator);
        let pairs: Vec<(GroupingHandle, usize)> = descriptor.groupings().collect();
        for (handle, sym) in pairs {
            if shape.status(table, sym)?.calculation.is_calculated() {
                continue;
            }
            for event in events.iter_mut() {
                let m = self.momenta.mass(cache, layout, event, handle)?;
                shape.set_value(numerator / (pole - m * m), event, sym, table)?;
            }
        }
        Ok(())
    }
}

/// Unit amplitude without cached storage.
///
/// Stands in for a trivial line shape; `value` is constant, so there is
/// nothing to cache and nothing to recalculate.
#[derive(Debug, Clone)]
pub struct FlatAmplitude {
    label: String,
    parameters: BTreeSet<ParameterId>,
}

impl FlatAmplitude {
    /// A flat amplitude with the given label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            parameters: BTreeSet::new(),
        }
    }
}

impl AmplitudeComponent for FlatAmplitude {
    fn label(&self) -> &str {
        &self.label
    }

    fn accessor(&self) -> Option<AccessorId> {
        None
    }

    fn parameters(&self) -> &BTreeSet<ParameterId> {
        &self.parameters
    }

    fn valid_for(
        &self,
        _cache: &GroupingCache,
        _handle: GroupingHandle,
    ) -> Result<bool, PwaError> {
        Ok(true)
    }

    fn value(
        &self,
        _cache: &GroupingCache,
        _layout: &StorageLayout,
        _event: &EventData,
        _handle: GroupingHandle,
    ) -> Result<Complex64, PwaError> {
        Ok(Complex64::new(1.0, 0.0))
    }

    fn calculate(
        &self,
        _cache: &GroupingCache,
        _layout: &StorageLayout,
        _params: &ParameterStore,
        _events: &mut [&mut EventData],
        _table: &mut StatusTable,
    ) -> Result<(), PwaError> {
        Ok(())
    }
}
