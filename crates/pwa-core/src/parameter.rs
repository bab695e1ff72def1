//! Arena-backed parameter store with per-parameter change tracking.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, PwaError};
use crate::status::VariableStatus;

fn parameter_error(code: impl Into<String>, message: impl Into<String>) -> PwaError {
    PwaError::Parameter(ErrorInfo::new(code, message))
}

trait ContextExt {
    fn with_context(self, key: impl Into<String>, value: impl ToString) -> PwaError;
}

impl ContextExt for PwaError {
    fn with_context(self, key: impl Into<String>, value: impl ToString) -> PwaError {
        match self {
            PwaError::Parameter(info) => {
                PwaError::Parameter(info.with_context(key, value.to_string()))
            }
            other => other,
        }
    }
}

/// Identifier for a parameter within a [`ParameterStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParameterId(u32);

impl ParameterId {
    /// Creates a new identifier from its raw integer representation.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw integer representation of the identifier.
    pub fn as_raw(&self) -> u32 {
        self.0
    }
}

/// Value stored by a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParameterValue {
    /// Real-valued parameter (masses, widths, admixtures).
    Real(f64),
    /// Complex-valued parameter (free amplitudes).
    Complex(Complex64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ParameterRecord {
    name: String,
    value: ParameterValue,
    status: VariableStatus,
    nonnegative: bool,
}

/// Owns every parameter of a model and tracks which ones changed.
///
/// Parameters are addressed by [`ParameterId`]; writing a value flips its
/// variable status to changed only when the value actually differs, so an
/// unchanged fit step leaves the staleness machinery untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterStore {
    records: Vec<ParameterRecord>,
}

impl ParameterStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a real-valued parameter and returns its identifier.
    pub fn add_real(&mut self, name: impl Into<String>, value: f64) -> ParameterId {
        self.push(name.into(), ParameterValue::Real(value), false)
    }

    /// Adds a complex-valued parameter and returns its identifier.
    pub fn add_complex(&mut self, name: impl Into<String>, value: Complex64) -> ParameterId {
        self.push(name.into(), ParameterValue::Complex(value), false)
    }

    /// Adds a real parameter constrained to stay non-negative.
    pub fn add_nonnegative(
        &mut self,
        name: impl Into<String>,
        value: f64,
    ) -> Result<ParameterId, PwaError> {
        let name = name.into();
        if value < 0.0 {
            return Err(
                parameter_error("negative-value", "non-negative parameter seeded below zero")
                    .with_context("name", &name)
                    .with_context("value", value),
            );
        }
        Ok(self.push(name, ParameterValue::Real(value), true))
    }

    fn push(&mut self, name: String, value: ParameterValue, nonnegative: bool) -> ParameterId {
        let id = ParameterId::from_raw(self.records.len() as u32);
        self.records.push(ParameterRecord {
            name,
            value,
            status: VariableStatus::Changed,
            nonnegative,
        });
        id
    }

    fn record(&self, id: ParameterId) -> Result<&ParameterRecord, PwaError> {
        self.records.get(id.as_raw() as usize).ok_or_else(|| {
            parameter_error("unknown-parameter", "parameter does not exist")
                .with_context("parameter", id.as_raw())
        })
    }

    fn record_mut(&mut self, id: ParameterId) -> Result<&mut ParameterRecord, PwaError> {
        self.records.get_mut(id.as_raw() as usize).ok_or_else(|| {
            parameter_error("unknown-parameter", "parameter does not exist")
                .with_context("parameter", id.as_raw())
        })
    }

    /// Returns the name of a parameter.
    pub fn name(&self, id: ParameterId) -> Result<&str, PwaError> {
        Ok(&self.record(id)?.name)
    }

    /// Returns the stored value of a parameter.
    pub fn value(&self, id: ParameterId) -> Result<ParameterValue, PwaError> {
        Ok(self.record(id)?.value)
    }

    /// Returns the value of a real parameter.
    pub fn real(&self, id: ParameterId) -> Result<f64, PwaError> {
        match self.record(id)?.value {
            ParameterValue::Real(value) => Ok(value),
            ParameterValue::Complex(_) => Err(parameter_error(
                "type-mismatch",
                "complex parameter read as real",
            )
            .with_context("parameter", id.as_raw())),
        }
    }

    /// Returns the value of a complex parameter.
    pub fn complex(&self, id: ParameterId) -> Result<Complex64, PwaError> {
        match self.record(id)?.value {
            ParameterValue::Complex(value) => Ok(value),
            ParameterValue::Real(_) => Err(parameter_error(
                "type-mismatch",
                "real parameter read as complex",
            )
            .with_context("parameter", id.as_raw())),
        }
    }

    /// Sets a real parameter, marking it changed when the value differs.
    pub fn set_real(&mut self, id: ParameterId, value: f64) -> Result<(), PwaError> {
        let record = self.record_mut(id)?;
        if record.nonnegative && value < 0.0 {
            return Err(
                parameter_error("negative-value", "non-negative parameter set below zero")
                    .with_context("parameter", id.as_raw())
                    .with_context("value", value),
            );
        }
        match record.value {
            ParameterValue::Real(current) => {
                if current != value {
                    record.value = ParameterValue::Real(value);
                    record.status = VariableStatus::Changed;
                }
                Ok(())
            }
            ParameterValue::Complex(_) => Err(parameter_error(
                "type-mismatch",
                "complex parameter written as real",
            )
            .with_context("parameter", id.as_raw())),
        }
    }

    /// Sets a complex parameter, marking it changed when the value differs.
    pub fn set_complex(&mut self, id: ParameterId, value: Complex64) -> Result<(), PwaError> {
        let record = self.record_mut(id)?;
        match record.value {
            ParameterValue::Complex(current) => {
                if current != value {
                    record.value = ParameterValue::Complex(value);
                    record.status = VariableStatus::Changed;
                }
                Ok(())
            }
            ParameterValue::Real(_) => Err(parameter_error(
                "type-mismatch",
                "real parameter written as complex",
            )
            .with_context("parameter", id.as_raw())),
        }
    }

    /// Returns the variable status of a parameter.
    pub fn variable_status(&self, id: ParameterId) -> Result<VariableStatus, PwaError> {
        Ok(self.record(id)?.status)
    }

    /// Overrides the variable status of a parameter.
    pub fn set_variable_status(
        &mut self,
        id: ParameterId,
        status: VariableStatus,
    ) -> Result<(), PwaError> {
        self.record_mut(id)?.status = status;
        Ok(())
    }

    /// Marks a parameter fixed so change tracking ignores it.
    pub fn fix(&mut self, id: ParameterId) -> Result<(), PwaError> {
        self.set_variable_status(id, VariableStatus::Fixed)
    }

    /// Clears every changed flag, leaving fixed parameters fixed.
    pub fn set_all_unchanged(&mut self) {
        for record in &mut self.records {
            if record.status == VariableStatus::Changed {
                record.status = VariableStatus::Unchanged;
            }
        }
    }

    /// Returns the number of stored parameters.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true when the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns an iterator over all parameter identifiers.
    pub fn ids(&self) -> impl Iterator<Item = ParameterId> + '_ {
        (0..self.records.len()).map(|idx| ParameterId::from_raw(idx as u32))
    }
}
