use pwa_core::status::{combine_variable_status, CalculationStatus, Status, VariableStatus};

#[test]
fn default_status_is_stale_and_changed() {
    let status = Status::default();
    assert_eq!(status.calculation, CalculationStatus::Uncalculated);
    assert_eq!(status.variable, VariableStatus::Changed);
    assert!(status.is_dirty());
}

#[test]
fn fixed_variable_status_is_sticky() {
    let mut status = Status::default();
    status.set_variable(VariableStatus::Fixed);
    status.set_variable(VariableStatus::Changed);
    assert_eq!(status.variable, VariableStatus::Fixed);
    status.set_variable(VariableStatus::Unchanged);
    assert_eq!(status.variable, VariableStatus::Fixed);
}

#[test]
fn calculation_status_is_not_sticky() {
    let mut status = Status::default();
    status.set_calculation(CalculationStatus::Calculated);
    assert!(status.calculation.is_calculated());
    status.set_calculation(CalculationStatus::Uncalculated);
    assert!(!status.calculation.is_calculated());
}

#[test]
fn combine_prefers_changed_over_everything() {
    use VariableStatus::{Changed, Fixed, Unchanged};
    assert_eq!(combine_variable_status(Changed, Fixed), Changed);
    assert_eq!(combine_variable_status(Unchanged, Changed), Changed);
    assert_eq!(combine_variable_status(Changed, Changed), Changed);
}

#[test]
fn combine_is_fixed_only_when_both_fixed() {
    use VariableStatus::{Fixed, Unchanged};
    assert_eq!(combine_variable_status(Fixed, Fixed), Fixed);
    assert_eq!(combine_variable_status(Fixed, Unchanged), Unchanged);
    assert_eq!(combine_variable_status(Unchanged, Unchanged), Unchanged);
}

#[test]
fn clean_calculated_entry_is_not_dirty() {
    let status = Status {
        calculation: CalculationStatus::Calculated,
        variable: VariableStatus::Unchanged,
    };
    assert!(!status.is_dirty());
}
