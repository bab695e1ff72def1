use pwa_core::parameter::{ParameterStore, ParameterValue};
use pwa_core::status::VariableStatus;
use pwa_core::Complex64;

#[test]
fn new_parameters_start_changed() {
    let mut store = ParameterStore::new();
    let mass = store.add_real("mass", 0.77);
    assert_eq!(store.variable_status(mass).unwrap(), VariableStatus::Changed);
    assert_eq!(store.real(mass).unwrap(), 0.77);
    assert_eq!(store.name(mass).unwrap(), "mass");
}

#[test]
fn writing_the_same_value_does_not_mark_changed() {
    let mut store = ParameterStore::new();
    let width = store.add_real("width", 0.15);
    store.set_all_unchanged();
    assert_eq!(
        store.variable_status(width).unwrap(),
        VariableStatus::Unchanged
    );

    store.set_real(width, 0.15).unwrap();
    assert_eq!(
        store.variable_status(width).unwrap(),
        VariableStatus::Unchanged
    );

    store.set_real(width, 0.16).unwrap();
    assert_eq!(store.variable_status(width).unwrap(), VariableStatus::Changed);
}

#[test]
fn complex_parameters_track_changes_componentwise() {
    let mut store = ParameterStore::new();
    let amp = store.add_complex("amp", Complex64::new(1.0, 0.0));
    store.set_all_unchanged();

    store.set_complex(amp, Complex64::new(1.0, 0.0)).unwrap();
    assert_eq!(
        store.variable_status(amp).unwrap(),
        VariableStatus::Unchanged
    );

    store.set_complex(amp, Complex64::new(0.0, 1.0)).unwrap();
    assert_eq!(store.variable_status(amp).unwrap(), VariableStatus::Changed);
    assert_eq!(store.complex(amp).unwrap(), Complex64::new(0.0, 1.0));
}

#[test]
fn typed_reads_reject_the_wrong_kind() {
    let mut store = ParameterStore::new();
    let mass = store.add_real("mass", 1.0);
    let amp = store.add_complex("amp", Complex64::new(0.5, 0.5));

    assert_eq!(store.complex(mass).unwrap_err().info().code, "type-mismatch");
    assert_eq!(store.real(amp).unwrap_err().info().code, "type-mismatch");
}

#[test]
fn nonnegative_parameters_reject_negative_writes() {
    let mut store = ParameterStore::new();
    assert_eq!(
        store.add_nonnegative("admixture", -1.0).unwrap_err().info().code,
        "negative-value"
    );

    let admixture = store.add_nonnegative("admixture", 1.0).unwrap();
    assert_eq!(
        store.set_real(admixture, -0.5).unwrap_err().info().code,
        "negative-value"
    );
    assert_eq!(store.real(admixture).unwrap(), 1.0);
}

#[test]
fn set_all_unchanged_preserves_fixed() {
    let mut store = ParameterStore::new();
    let mass = store.add_real("mass", 1.0);
    let width = store.add_real("width", 0.1);
    store.fix(width).unwrap();

    store.set_all_unchanged();
    assert_eq!(
        store.variable_status(mass).unwrap(),
        VariableStatus::Unchanged
    );
    assert_eq!(store.variable_status(width).unwrap(), VariableStatus::Fixed);
}

#[test]
fn unknown_ids_error_out() {
    let store = ParameterStore::new();
    let id = pwa_core::ParameterId::from_raw(7);
    assert_eq!(store.value(id).unwrap_err().info().code, "unknown-parameter");
}

#[test]
fn values_expose_their_kind() {
    let mut store = ParameterStore::new();
    let mass = store.add_real("mass", 1.2);
    match store.value(mass).unwrap() {
        ParameterValue::Real(value) => assert_eq!(value, 1.2),
        ParameterValue::Complex(_) => panic!("expected real parameter"),
    }
}
