//! Typed views into per-event cached storage.
//!
//! A slot view carries the storage coordinates resolved from the locked
//! layout. Reads are pure and bounds-checked. The status-aware write
//! compares component-wise, flips the variable status to changed only when a
//! stored real actually differs, and marks the entry calculated; the raw
//! `write` leaves statuses alone so a component can stage partial writes and
//! flip the status once the full logical value is in place.

use pwa_core::{CalculationStatus, Complex64, FourVector, PwaError, Status, VariableStatus};

use crate::event::EventData;
use crate::registry::SlotId;
use crate::status_table::StatusTable;

#[derive(Debug, Clone, Copy)]
struct SlotCore {
    id: SlotId,
    row: usize,
    ordinal: usize,
    n_sym: usize,
    stride: usize,
    position: usize,
}

impl SlotCore {
    fn base(&self, sym: usize) -> usize {
        sym * self.stride + self.position
    }

    fn status(&self, table: &StatusTable, sym: usize) -> Result<Status, PwaError> {
        table.status_at(self.row, self.ordinal, sym)
    }

    fn finish_write(
        &self,
        changed: bool,
        table: &mut StatusTable,
        sym: usize,
    ) -> Result<(), PwaError> {
        if changed {
            table.set_variable_at(self.row, self.ordinal, sym, VariableStatus::Changed)?;
        }
        table.set_calculation_at(self.row, self.ordinal, sym, CalculationStatus::Calculated)
    }
}

/// View of a real-valued cached slot.
#[derive(Debug, Clone, Copy)]
pub struct RealSlot {
    core: SlotCore,
}

/// View of a complex-valued cached slot (two contiguous reals).
#[derive(Debug, Clone, Copy)]
pub struct ComplexSlot {
    core: SlotCore,
}

/// View of a four-vector cached slot (four contiguous reals).
#[derive(Debug, Clone, Copy)]
pub struct FourSlot {
    core: SlotCore,
}

impl RealSlot {
    pub(crate) fn new(
        id: SlotId,
        row: usize,
        ordinal: usize,
        n_sym: usize,
        stride: usize,
        position: usize,
    ) -> Self {
        Self {
            core: SlotCore {
                id,
                row,
                ordinal,
                n_sym,
                stride,
                position,
            },
        }
    }

    /// Identifier of the viewed slot.
    pub fn id(&self) -> SlotId {
        self.core.id
    }

    /// Number of symmetrization indices the slot is stored for.
    pub fn n_sym(&self) -> usize {
        self.core.n_sym
    }

    /// Stored status for one symmetrization index.
    pub fn status(&self, table: &StatusTable, sym: usize) -> Result<Status, PwaError> {
        self.core.status(table, sym)
    }

    /// Stored calculation status for one symmetrization index.
    pub fn calculation_status(
        &self,
        table: &StatusTable,
        sym: usize,
    ) -> Result<CalculationStatus, PwaError> {
        Ok(self.core.status(table, sym)?.calculation)
    }

    /// Pure read of the stored value.
    pub fn value(&self, event: &EventData, sym: usize) -> Result<f64, PwaError> {
        event.get(self.core.row, self.core.base(sym))
    }

    /// Writes the value without touching statuses.
    pub fn write(&self, value: f64, event: &mut EventData, sym: usize) -> Result<(), PwaError> {
        event.set(self.core.row, self.core.base(sym), value)
    }

    /// Writes the value and updates the entry's status in the given table.
    pub fn set_value(
        &self,
        value: f64,
        event: &mut EventData,
        sym: usize,
        table: &mut StatusTable,
    ) -> Result<(), PwaError> {
        let base = self.core.base(sym);
        let mut changed = false;
        if event.get(self.core.row, base)? != value {
            event.set(self.core.row, base, value)?;
            changed = true;
        }
        self.core.finish_write(changed, table, sym)
    }
}

impl ComplexSlot {
    pub(crate) fn new(
        id: SlotId,
        row: usize,
        ordinal: usize,
        n_sym: usize,
        stride: usize,
        position: usize,
    ) -> Self {
        Self {
            core: SlotCore {
                id,
                row,
                ordinal,
                n_sym,
                stride,
                position,
            },
        }
    }

    /// Identifier of the viewed slot.
    pub fn id(&self) -> SlotId {
        self.core.id
    }

    /// Number of symmetrization indices the slot is stored for.
    pub fn n_sym(&self) -> usize {
        self.core.n_sym
    }

    /// Stored status for one symmetrization index.
    pub fn status(&self, table: &StatusTable, sym: usize) -> Result<Status, PwaError> {
        self.core.status(table, sym)
    }

    /// Stored calculation status for one symmetrization index.
    pub fn calculation_status(
        &self,
        table: &StatusTable,
        sym: usize,
    ) -> Result<CalculationStatus, PwaError> {
        Ok(self.core.status(table, sym)?.calculation)
    }

    /// Pure read of the stored value.
    pub fn value(&self, event: &EventData, sym: usize) -> Result<Complex64, PwaError> {
        let base = self.core.base(sym);
        Ok(Complex64::new(
            event.get(self.core.row, base)?,
            event.get(self.core.row, base + 1)?,
        ))
    }

    /// Writes both components without touching statuses.
    pub fn write(
        &self,
        value: Complex64,
        event: &mut EventData,
        sym: usize,
    ) -> Result<(), PwaError> {
        let base = self.core.base(sym);
        event.set(self.core.row, base, value.re)?;
        event.set(self.core.row, base + 1, value.im)
    }

    /// Writes the value and updates the entry's status in the given table.
    pub fn set_value(
        &self,
        value: Complex64,
        event: &mut EventData,
        sym: usize,
        table: &mut StatusTable,
    ) -> Result<(), PwaError> {
        let base = self.core.base(sym);
        let mut changed = false;
        for (offset, component) in [value.re, value.im].into_iter().enumerate() {
            if event.get(self.core.row, base + offset)? != component {
                event.set(self.core.row, base + offset, component)?;
                changed = true;
            }
        }
        self.core.finish_write(changed, table, sym)
    }
}

impl FourSlot {
    pub(crate) fn new(
        id: SlotId,
        row: usize,
        ordinal: usize,
        n_sym: usize,
        stride: usize,
        position: usize,
    ) -> Self {
        Self {
            core: SlotCore {
                id,
                row,
                ordinal,
                n_sym,
                stride,
                position,
            },
        }
    }

    /// Identifier of the viewed slot.
    pub fn id(&self) -> SlotId {
        self.core.id
    }

    /// Number of symmetrization indices the slot is stored for.
    pub fn n_sym(&self) -> usize {
        self.core.n_sym
    }

    /// Stored status for one symmetrization index.
    pub fn status(&self, table: &StatusTable, sym: usize) -> Result<Status, PwaError> {
        self.core.status(table, sym)
    }

    /// Stored calculation status for one symmetrization index.
    pub fn calculation_status(
        &self,
        table: &StatusTable,
        sym: usize,
    ) -> Result<CalculationStatus, PwaError> {
        Ok(self.core.status(table, sym)?.calculation)
    }

    /// Pure read of the stored value.
    pub fn value(&self, event: &EventData, sym: usize) -> Result<FourVector, PwaError> {
        let base = self.core.base(sym);
        Ok(FourVector::from_array([
            event.get(self.core.row, base)?,
            event.get(self.core.row, base + 1)?,
            event.get(self.core.row, base + 2)?,
            event.get(self.core.row, base + 3)?,
        ]))
    }

    /// Writes all four components without touching statuses.
    pub fn write(
        &self,
        value: FourVector,
        event: &mut EventData,
        sym: usize,
    ) -> Result<(), PwaError> {
        let base = self.core.base(sym);
        for (offset, component) in value.as_array().into_iter().enumerate() {
            event.set(self.core.row, base + offset, component)?;
        }
        Ok(())
    }

    /// Writes the value and updates the entry's status in the given table.
    pub fn set_value(
        &self,
        value: FourVector,
        event: &mut EventData,
        sym: usize,
        table: &mut StatusTable,
    ) -> Result<(), PwaError> {
        let base = self.core.base(sym);
        let mut changed = false;
        for (offset, component) in value.as_array().into_iter().enumerate() {
            if event.get(self.core.row, base + offset)? != component {
                event.set(self.core.row, base + offset, component)?;
                changed = true;
            }
        }
        self.core.finish_write(changed, table, sym)
    }
}
