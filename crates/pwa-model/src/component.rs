//! Component traits the model orchestrates.
//!
//! Kinematic components run once per event right after the final-state
//! momenta are seeded, in ascending stage order, and may only write slots
//! that are still unset for that event. Amplitude components own recalculable
//! accessor rows and batch-fill them across a partition, skipping entries the
//! status table already marks calculated.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use pwa_combin::{GroupingCache, GroupingHandle};
use pwa_core::{
    combine_variable_status, Complex64, ParameterId, ParameterStore, PwaError, VariableStatus,
};
use pwa_data::{AccessorId, EventData, StatusTable, StorageLayout};

/// Seeding stage of a kinematic component.
///
/// Stages order the write-once pass over a fresh event: four-momenta first,
/// then decay angles, then spin-dependent terms built from both.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum CalcStage {
    /// Grouping four-momenta and invariant masses.
    Momenta,
    /// Decay angles derived from the momenta.
    Angles,
    /// Spin amplitudes derived from momenta and angles.
    SpinTerms,
}

/// Identifier of an amplitude component within its model.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct AmplitudeId(u32);

impl AmplitudeId {
    /// Wraps a raw index.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw index.
    pub fn as_raw(&self) -> u32 {
        self.0
    }
}

/// A data-independent calculation seeded once per event.
///
/// Implementations own a static accessor and fill its slots for every
/// symmetrization index when an event enters a data set. The event token
/// identifies the event being seeded so components keeping a scratch cache
/// can tell consecutive events apart.
pub trait KinematicComponent: Send + Sync {
    /// The static accessor this component writes.
    fn accessor(&self) -> AccessorId;

    /// Stage ordering the seeding pass.
    fn stage(&self) -> CalcStage;

    /// Fills this component's slots for one freshly seeded event.
    fn calculate_event(
        &self,
        cache: &GroupingCache,
        layout: &StorageLayout,
        params: &ParameterStore,
        token: u64,
        event: &mut EventData,
        table: &mut StatusTable,
    ) -> Result<(), PwaError>;
}

/// A parameter-dependent factor of a decay tree.
///
/// Components backed by an accessor cache their values in event storage and
/// refresh them in `calculate` when the status table says so; accessor-less
/// components compute on the fly in `value`.
pub trait AmplitudeComponent: Send + Sync {
    /// Human-readable label, used in error contexts.
    fn label(&self) -> &str;

    /// The recalculable accessor backing this component, if any.
    fn accessor(&self) -> Option<AccessorId>;

    /// Parameters this component's value depends on.
    fn parameters(&self) -> &BTreeSet<ParameterId>;

    /// Combined variable status of the component's parameters.
    fn variable_status(&self, params: &ParameterStore) -> Result<VariableStatus, PwaError> {
        let mut combined = VariableStatus::Fixed;
        for &id in self.parameters() {
            combined = combine_variable_status(combined, params.variable_status(id)?);
        }
        Ok(combined)
    }

    /// Whether the component can be evaluated for a grouping.
    fn valid_for(&self, cache: &GroupingCache, handle: GroupingHandle)
        -> Result<bool, PwaError>;

    /// The component's value for one event and grouping.
    fn value(
        &self,
        cache: &GroupingCache,
        layout: &StorageLayout,
        event: &EventData,
        handle: GroupingHandle,
    ) -> Result<Complex64, PwaError>;

    /// Refreshes stale cached entries across a batch of events.
    fn calculate(
        &self,
        cache: &GroupingCache,
        layout: &StorageLayout,
        params: &ParameterStore,
        events: &mut [&mut EventData],
        table: &mut StatusTable,
    ) -> Result<(), PwaError>;
}
