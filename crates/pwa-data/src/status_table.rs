//! Per-partition status tables and the bulk staleness pass.
//!
//! One table belongs to one event-partition context. The staleness pass
//! walks recalculable accessors in storage-row order; dependencies were
//! resolved at lock time to earlier rows, so consulting their stored
//! statuses is a settled one-hop check.

use std::sync::Arc;

use pwa_core::{
    CalculationStatus, ErrorInfo, ParameterStore, PwaError, Status, VariableStatus,
};

use crate::registry::{AccessorId, AccessorKind, ResolvedDependency, SlotId, StorageLayout};

fn status_error(code: impl Into<String>, message: impl Into<String>) -> PwaError {
    PwaError::Status(ErrorInfo::new(code, message))
}

trait ContextExt {
    fn with_context(self, key: impl Into<String>, value: impl ToString) -> PwaError;
}

impl ContextExt for PwaError {
    fn with_context(self, key: impl Into<String>, value: impl ToString) -> PwaError {
        match self {
            PwaError::Status(info) => PwaError::Status(info.with_context(key, value.to_string())),
            other => other,
        }
    }
}

/// Calculation and variable statuses for every storage entry of a layout.
#[derive(Debug, Clone)]
pub struct StatusTable {
    layout: Arc<StorageLayout>,
    rows: Vec<Vec<Vec<Status>>>,
}

impl StatusTable {
    /// Creates a table shaped for the layout, all entries uncalculated and
    /// changed.
    pub fn new(layout: Arc<StorageLayout>) -> Self {
        let rows = layout
            .accessors()
            .iter()
            .map(|accessor| {
                accessor
                    .slots()
                    .iter()
                    .map(|_| vec![Status::default(); accessor.n_sym()])
                    .collect()
            })
            .collect();
        Self { layout, rows }
    }

    /// The layout the table is shaped for.
    pub fn layout(&self) -> &Arc<StorageLayout> {
        &self.layout
    }

    fn coords(&self, id: SlotId) -> Result<(usize, usize), PwaError> {
        let accessor = self.layout.accessor(id.accessor)?;
        if id.slot as usize >= accessor.slots().len() {
            return Err(status_error("unknown-slot", "slot was never allocated")
                .with_context("accessor", id.accessor.as_raw())
                .with_context("slot", id.slot));
        }
        Ok((accessor.row(), id.slot as usize))
    }

    pub(crate) fn status_at(
        &self,
        row: usize,
        ordinal: usize,
        sym: usize,
    ) -> Result<Status, PwaError> {
        self.rows
            .get(row)
            .and_then(|slots| slots.get(ordinal))
            .and_then(|entries| entries.get(sym))
            .copied()
            .ok_or_else(|| {
                status_error("status-out-of-bounds", "no status entry at these coordinates")
                    .with_context("row", row)
                    .with_context("slot", ordinal)
                    .with_context("sym", sym)
            })
    }

    fn entry_mut(
        &mut self,
        row: usize,
        ordinal: usize,
        sym: usize,
    ) -> Result<&mut Status, PwaError> {
        self.rows
            .get_mut(row)
            .and_then(|slots| slots.get_mut(ordinal))
            .and_then(|entries| entries.get_mut(sym))
            .ok_or_else(|| {
                status_error("status-out-of-bounds", "no status entry at these coordinates")
                    .with_context("row", row)
                    .with_context("slot", ordinal)
                    .with_context("sym", sym)
            })
    }

    pub(crate) fn set_calculation_at(
        &mut self,
        row: usize,
        ordinal: usize,
        sym: usize,
        status: CalculationStatus,
    ) -> Result<(), PwaError> {
        self.entry_mut(row, ordinal, sym)?.set_calculation(status);
        Ok(())
    }

    pub(crate) fn set_variable_at(
        &mut self,
        row: usize,
        ordinal: usize,
        sym: usize,
        status: VariableStatus,
    ) -> Result<(), PwaError> {
        self.entry_mut(row, ordinal, sym)?.set_variable(status);
        Ok(())
    }

    /// Stored status of one (slot, symmetrization index) entry.
    pub fn status(&self, slot: SlotId, sym: usize) -> Result<Status, PwaError> {
        let (row, ordinal) = self.coords(slot)?;
        self.status_at(row, ordinal, sym)
    }

    /// Sets the calculation status of one entry.
    pub fn set_calculation(
        &mut self,
        slot: SlotId,
        sym: usize,
        status: CalculationStatus,
    ) -> Result<(), PwaError> {
        let (row, ordinal) = self.coords(slot)?;
        self.set_calculation_at(row, ordinal, sym, status)
    }

    /// Sets the variable status of one entry. Fixed entries stay fixed.
    pub fn set_variable(
        &mut self,
        slot: SlotId,
        sym: usize,
        status: VariableStatus,
    ) -> Result<(), PwaError> {
        let (row, ordinal) = self.coords(slot)?;
        self.set_variable_at(row, ordinal, sym, status)
    }

    /// Sets the calculation status of every entry of one slot.
    pub fn set_slot_calculation(
        &mut self,
        slot: SlotId,
        status: CalculationStatus,
    ) -> Result<(), PwaError> {
        let (row, ordinal) = self.coords(slot)?;
        for entry in &mut self.rows[row][ordinal] {
            entry.set_calculation(status);
        }
        Ok(())
    }

    /// Sets the variable status of every entry of one slot. Fixed entries
    /// stay fixed.
    pub fn set_slot_variable(
        &mut self,
        slot: SlotId,
        status: VariableStatus,
    ) -> Result<(), PwaError> {
        let (row, ordinal) = self.coords(slot)?;
        for entry in &mut self.rows[row][ordinal] {
            entry.set_variable(status);
        }
        Ok(())
    }

    /// Sets the calculation status of every entry of one accessor.
    pub fn set_accessor_calculation(
        &mut self,
        accessor: AccessorId,
        status: CalculationStatus,
    ) -> Result<(), PwaError> {
        let row = self.layout.accessor(accessor)?.row();
        for slot in &mut self.rows[row] {
            for entry in slot.iter_mut() {
                entry.set_calculation(status);
            }
        }
        Ok(())
    }

    /// Sets the variable status of every entry of one accessor. Fixed
    /// entries stay fixed.
    pub fn set_accessor_variable(
        &mut self,
        accessor: AccessorId,
        status: VariableStatus,
    ) -> Result<(), PwaError> {
        let row = self.layout.accessor(accessor)?.row();
        for slot in &mut self.rows[row] {
            for entry in slot.iter_mut() {
                entry.set_variable(status);
            }
        }
        Ok(())
    }

    /// Sets the calculation status of every entry in the table.
    pub fn set_all_calculation(&mut self, status: CalculationStatus) {
        for row in &mut self.rows {
            for slot in row {
                for entry in slot.iter_mut() {
                    entry.set_calculation(status);
                }
            }
        }
    }

    /// Sets the variable status of every entry in the table. Fixed entries
    /// stay fixed.
    pub fn set_all_variable(&mut self, status: VariableStatus) {
        for row in &mut self.rows {
            for slot in row {
                for entry in slot.iter_mut() {
                    entry.set_variable(status);
                }
            }
        }
    }

    /// Copies calculation statuses from another table of the same shape.
    /// Variable statuses are left alone.
    pub fn copy_calculation_statuses(&mut self, other: &StatusTable) -> Result<(), PwaError> {
        if self.rows.len() != other.rows.len() {
            return Err(self.shape_mismatch(other));
        }
        for (mine, theirs) in self.rows.iter().zip(&other.rows) {
            if mine.len() != theirs.len()
                || mine
                    .iter()
                    .zip(theirs)
                    .any(|(a, b)| a.len() != b.len())
            {
                return Err(self.shape_mismatch(other));
            }
        }
        for (mine, theirs) in self.rows.iter_mut().zip(&other.rows) {
            for (slot_mine, slot_theirs) in mine.iter_mut().zip(theirs) {
                for (entry, source) in slot_mine.iter_mut().zip(slot_theirs) {
                    entry.set_calculation(source.calculation);
                }
            }
        }
        Ok(())
    }

    fn shape_mismatch(&self, other: &StatusTable) -> PwaError {
        status_error(
            "table-shape-mismatch",
            "tables were built from different layouts",
        )
        .with_context("rows", self.rows.len())
        .with_context("other_rows", other.rows.len())
    }

    /// Refreshes calculation statuses of recalculable accessors against the
    /// current parameter statuses.
    ///
    /// A slot whose parameter dependency changed goes uncalculated for every
    /// symmetrization index. Otherwise a calculated entry goes uncalculated
    /// when any mapped entry of a slot dependency is itself uncalculated or
    /// changed.
    pub fn update_calculation_statuses(
        &mut self,
        params: &ParameterStore,
    ) -> Result<(), PwaError> {
        let layout = Arc::clone(&self.layout);
        for accessor in layout.accessors() {
            if accessor.kind() != AccessorKind::Recalculable {
                continue;
            }
            let row = accessor.row();
            for (ordinal, slot) in accessor.slots().iter().enumerate() {
                let mut parameter_changed = false;
                for dependency in slot.dependencies() {
                    if let ResolvedDependency::Parameter(id) = dependency {
                        if params.variable_status(*id)?.is_changed() {
                            parameter_changed = true;
                            break;
                        }
                    }
                }
                if parameter_changed {
                    for sym in 0..accessor.n_sym() {
                        self.set_calculation_at(
                            row,
                            ordinal,
                            sym,
                            CalculationStatus::Uncalculated,
                        )?;
                    }
                    continue;
                }
                for sym in 0..accessor.n_sym() {
                    if !self.status_at(row, ordinal, sym)?.calculation.is_calculated() {
                        continue;
                    }
                    'dependencies: for dependency in slot.dependencies() {
                        if let ResolvedDependency::Slot {
                            row: dep_row,
                            ordinal: dep_ordinal,
                            sym_targets,
                        } = dependency
                        {
                            for &target in &sym_targets[sym] {
                                let status = self.status_at(*dep_row, *dep_ordinal, target)?;
                                if !status.calculation.is_calculated()
                                    || status.variable.is_changed()
                                {
                                    self.set_calculation_at(
                                        row,
                                        ordinal,
                                        sym,
                                        CalculationStatus::Uncalculated,
                                    )?;
                                    break 'dependencies;
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
