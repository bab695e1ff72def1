//! Calculation and variable statuses driving incremental recalculation.

use serde::{Deserialize, Serialize};

/// Whether a cached value is up to date for the current parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CalculationStatus {
    /// The stored value reflects the current parameters.
    Calculated,
    /// The stored value is stale and must be recomputed before use.
    Uncalculated,
}

impl CalculationStatus {
    /// Returns true for [`CalculationStatus::Calculated`].
    pub fn is_calculated(self) -> bool {
        self == CalculationStatus::Calculated
    }
}

/// Change tracking for parameters and cached values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VariableStatus {
    /// The value changed since flags were last cleared.
    Changed,
    /// The value is held constant and never participates in change tracking.
    Fixed,
    /// The value has not changed since flags were last cleared.
    Unchanged,
}

impl VariableStatus {
    /// Returns true for [`VariableStatus::Changed`].
    pub fn is_changed(self) -> bool {
        self == VariableStatus::Changed
    }
}

/// Combines two variable statuses for aggregate change tracking.
///
/// Any changed input makes the result changed; the result is fixed only when
/// both inputs are fixed.
pub fn combine_variable_status(lhs: VariableStatus, rhs: VariableStatus) -> VariableStatus {
    if lhs == VariableStatus::Changed || rhs == VariableStatus::Changed {
        VariableStatus::Changed
    } else if lhs == VariableStatus::Fixed && rhs == VariableStatus::Fixed {
        VariableStatus::Fixed
    } else {
        VariableStatus::Unchanged
    }
}

/// Paired calculation and variable status tracked per cached slot entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Whether the stored value is current.
    pub calculation: CalculationStatus,
    /// Whether the stored value changed since flags were last cleared.
    pub variable: VariableStatus,
}

impl Default for Status {
    fn default() -> Self {
        Self {
            calculation: CalculationStatus::Uncalculated,
            variable: VariableStatus::Changed,
        }
    }
}

impl Status {
    /// Sets the calculation status.
    pub fn set_calculation(&mut self, status: CalculationStatus) {
        self.calculation = status;
    }

    /// Sets the variable status. A fixed entry stays fixed.
    pub fn set_variable(&mut self, status: VariableStatus) {
        if self.variable != VariableStatus::Fixed {
            self.variable = status;
        }
    }

    /// Returns true when the entry is stale or has changed.
    pub fn is_dirty(&self) -> bool {
        self.calculation == CalculationStatus::Uncalculated
            || self.variable == VariableStatus::Changed
    }
}
