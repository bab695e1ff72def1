//! Amplitude evaluation, intensity arithmetic and incremental recalculation.

use pwa_combin::{GroupingHandle, ParticleIndex};
use pwa_core::{Complex64, FourVector, VariableStatus};
use pwa_data::partition_block;
use pwa_model::{
    AmplitudeId, ConstantWidthBreitWigner, DecayTreeId, FlatAmplitude, Model,
};

fn particle(raw: u8) -> ParticleIndex {
    ParticleIndex::from_raw(raw)
}

struct Fixture {
    model: Model,
    amplitude: AmplitudeId,
    shape: ConstantWidthBreitWigner,
    top: GroupingHandle,
    root: DecayTreeId,
    resonance: DecayTreeId,
}

/// X -> rho(01) + 2 with a Breit-Wigner on the pair.
fn two_body_cascade() -> Fixture {
    let mut model = Model::new(3).unwrap();
    let (cache, registry, params, momenta) = model.declare_parts().unwrap();
    let pair = cache
        .intern_from_indices(&[particle(0), particle(1)])
        .unwrap();
    let bachelor = cache.intern_final_state(particle(2));
    let top = cache.intern_composite(&[pair, bachelor]).unwrap();
    let shape =
        ConstantWidthBreitWigner::declare(registry, params, momenta, "rho", 2.6, 0.3).unwrap();
    let amplitude = model
        .add_amplitude_component(Box::new(shape.clone()))
        .unwrap();
    let root = model.add_decay_tree("X->rho+2", 0).unwrap();
    let resonance = model.add_decay_tree("rho->0+1", 0).unwrap();
    model.add_tree_top(root, top).unwrap();
    model.add_tree_daughter(root, 0, resonance).unwrap();
    model.add_tree_factor(resonance, amplitude).unwrap();
    Fixture {
        model,
        amplitude,
        shape,
        top,
        root,
        resonance,
    }
}

/// Two flat trees interfering within one coherent sum.
fn interfering_pair() -> (Model, DecayTreeId, DecayTreeId) {
    let mut model = Model::new(3).unwrap();
    let (cache, _, _, _) = model.declare_parts().unwrap();
    let top = cache
        .intern_from_indices(&[particle(0), particle(1), particle(2)])
        .unwrap();
    let flat = model
        .add_amplitude_component(Box::new(FlatAmplitude::new("unit")))
        .unwrap();
    let first = model.add_decay_tree("first", 0).unwrap();
    let second = model.add_decay_tree("second", 0).unwrap();
    for &tree in &[first, second] {
        model.add_tree_top(tree, top).unwrap();
        model.add_tree_factor(tree, flat).unwrap();
    }
    (model, first, second)
}

fn event_momenta(seed: usize) -> [FourVector; 3] {
    let t = seed as f64;
    [
        FourVector::new(1.5 + 0.02 * t, 0.40 - 0.03 * t, 0.10, 0.20),
        FourVector::new(1.3 - 0.01 * t, -0.20, 0.25 + 0.02 * t, -0.10),
        FourVector::new(1.1 + 0.01 * t, -0.15, -0.30, 0.05 * t),
    ]
}

fn breit_wigner(mass: f64, width: f64, s: f64) -> Complex64 {
    let numerator = mass * width;
    numerator / (Complex64::new(mass * mass, -numerator) - s)
}

#[test]
fn breit_wigner_entries_follow_the_line_shape() {
    let mut fixture = two_body_cascade();
    fixture.model.lock().unwrap();
    let model = &fixture.model;
    let layout = model.layout().unwrap();
    let mut data = model.new_data_set().unwrap();
    let mut table = model.new_status_table().unwrap();
    for seed in 0..4 {
        model
            .add_event(&mut data, &event_momenta(seed), &mut table)
            .unwrap();
    }
    {
        let mut partitions = partition_block(&mut data, 1).unwrap();
        model.calculate(&mut partitions[0], &mut table).unwrap();
    }

    let pair = model.cache().grouping(fixture.top).unwrap().daughters()[0];
    let component = model.amplitude_component(fixture.amplitude).unwrap();
    for seed in 0..4 {
        let event = data.event(seed).unwrap();
        let momenta = event_momenta(seed);
        let mass = (momenta[0] + momenta[1]).mass();
        let expected = breit_wigner(2.6, 0.3, mass * mass);
        let value = component
            .value(model.cache(), &layout, event, pair)
            .unwrap();
        assert!((value - expected).norm() < 1.0e-12);
    }
}

#[test]
fn tree_amplitudes_factor_into_free_and_data_parts() {
    let mut fixture = two_body_cascade();
    fixture.model.lock().unwrap();
    let mut data = fixture.model.new_data_set().unwrap();
    let mut table = fixture.model.new_status_table().unwrap();
    fixture
        .model
        .add_event(&mut data, &event_momenta(2), &mut table)
        .unwrap();
    {
        let mut partitions = partition_block(&mut data, 1).unwrap();
        fixture
            .model
            .calculate(&mut partitions[0], &mut table)
            .unwrap();
    }

    // Defaults: root amplitude fixed at one, resonance amplitude one.
    assert_eq!(
        fixture.model.tree_free_amplitude(fixture.root).unwrap(),
        Complex64::new(1.0, 0.0)
    );

    // The free amplitude of a daughter multiplies into the root's.
    let nested = fixture
        .model
        .tree(fixture.resonance)
        .unwrap()
        .free_amplitude();
    fixture
        .model
        .params_mut()
        .set_complex(nested, Complex64::new(0.0, 0.5))
        .unwrap();
    assert_eq!(
        fixture.model.tree_free_amplitude(fixture.root).unwrap(),
        Complex64::new(0.0, 0.5)
    );

    let event = data.event(0).unwrap();
    let momenta = event_momenta(2);
    let mass = (momenta[0] + momenta[1]).mass();
    let expected = breit_wigner(2.6, 0.3, mass * mass);
    let data_part = fixture
        .model
        .tree_data_amplitude(event, fixture.root)
        .unwrap();
    assert!((data_part - expected).norm() < 1.0e-12);

    // Intensity of the single-sum model is the squared product.
    let free = fixture.model.tree_free_amplitude(fixture.root).unwrap();
    let intensity = fixture.model.intensity(event).unwrap();
    assert!((intensity - (free * data_part).norm_sqr()).abs() < 1.0e-12);
}

#[test]
fn two_interfering_trees_match_the_closed_form() {
    let (mut model, _first, second) = interfering_pair();
    model.lock().unwrap();
    let mut data = model.new_data_set().unwrap();
    let mut table = model.new_status_table().unwrap();
    model
        .add_event(&mut data, &event_momenta(0), &mut table)
        .unwrap();
    let event = data.event(0).unwrap();

    // Flat factors and unit amplitudes: |1 + 1|² = 4.
    assert!((model.intensity(event).unwrap() - 4.0).abs() < 1.0e-12);

    // a1 = 1, a2 = 2i: |1 + 2i|² = 5.
    let free = model.tree(second).unwrap().free_amplitude();
    model
        .params_mut()
        .set_complex(free, Complex64::new(0.0, 2.0))
        .unwrap();
    assert!((model.intensity(event).unwrap() - 5.0).abs() < 1.0e-12);
}

#[test]
fn admixtures_weight_their_sums() {
    let mut model = Model::new(3).unwrap();
    let (cache, _, _, _) = model.declare_parts().unwrap();
    let top = cache
        .intern_from_indices(&[particle(0), particle(1), particle(2)])
        .unwrap();
    let flat = model
        .add_amplitude_component(Box::new(FlatAmplitude::new("unit")))
        .unwrap();
    let up = model.add_decay_tree("up", 1).unwrap();
    let down = model.add_decay_tree("down", -1).unwrap();
    for &tree in &[up, down] {
        model.add_tree_top(tree, top).unwrap();
        model.add_tree_factor(tree, flat).unwrap();
    }
    model.lock().unwrap();

    let mut data = model.new_data_set().unwrap();
    let mut table = model.new_status_table().unwrap();
    model
        .add_event(&mut data, &event_momenta(0), &mut table)
        .unwrap();
    let event = data.event(0).unwrap();

    // Two incoherent unit trees under unit admixtures.
    assert!((model.intensity(event).unwrap() - 2.0).abs() < 1.0e-12);

    // Reweighting one sum scales only its share.
    let admixture = model.sums()[1].admixture();
    model.params_mut().set_real(admixture, 3.0).unwrap();
    assert!((model.intensity(event).unwrap() - 4.0).abs() < 1.0e-12);
}

#[test]
fn clean_entries_are_not_recomputed() {
    let mut fixture = two_body_cascade();
    fixture.model.lock().unwrap();
    let layout = fixture.model.layout().unwrap();
    let mut data = fixture.model.new_data_set().unwrap();
    let mut table = fixture.model.new_status_table().unwrap();
    for seed in 0..3 {
        fixture
            .model
            .add_event(&mut data, &event_momenta(seed), &mut table)
            .unwrap();
    }
    {
        let mut partitions = partition_block(&mut data, 1).unwrap();
        fixture
            .model
            .calculate(&mut partitions[0], &mut table)
            .unwrap();
    }
    fixture.model.params_mut().set_all_unchanged();

    let slot = layout.complex_slot(fixture.shape.slot()).unwrap();
    let honest = slot.value(data.event(0).unwrap(), 0).unwrap();

    // Tamper with storage behind the status table's back; a pass with no
    // parameter change must leave it alone.
    let poison = Complex64::new(42.0, -7.0);
    slot.write(poison, data.event_mut(0).unwrap(), 0).unwrap();
    {
        let mut partitions = partition_block(&mut data, 1).unwrap();
        fixture
            .model
            .calculate(&mut partitions[0], &mut table)
            .unwrap();
    }
    assert_eq!(slot.value(data.event(0).unwrap(), 0).unwrap(), poison);

    // A mass change invalidates the entry and the honest value returns.
    fixture
        .model
        .params_mut()
        .set_real(fixture.shape.mass_parameter(), 2.7)
        .unwrap();
    {
        let mut partitions = partition_block(&mut data, 1).unwrap();
        fixture
            .model
            .calculate(&mut partitions[0], &mut table)
            .unwrap();
    }
    let refreshed = slot.value(data.event(0).unwrap(), 0).unwrap();
    assert_ne!(refreshed, poison);
    assert_ne!(refreshed, honest);

    let momenta = event_momenta(0);
    let mass = (momenta[0] + momenta[1]).mass();
    let expected = breit_wigner(2.7, 0.3, mass * mass);
    assert!((refreshed - expected).norm() < 1.0e-12);
}

#[test]
fn free_amplitude_changes_leave_cached_trees_clean() {
    let mut fixture = two_body_cascade();
    fixture.model.lock().unwrap();

    // Everything starts changed.
    assert_eq!(
        fixture.model.tree_variable_status(fixture.root).unwrap(),
        VariableStatus::Changed
    );
    fixture.model.params_mut().set_all_unchanged();
    assert_eq!(
        fixture.model.tree_variable_status(fixture.root).unwrap(),
        VariableStatus::Unchanged
    );

    // Free amplitudes factor out of cached integrals; moving one does not
    // dirty the tree.
    let free = fixture
        .model
        .tree(fixture.resonance)
        .unwrap()
        .free_amplitude();
    fixture
        .model
        .params_mut()
        .set_complex(free, Complex64::new(0.5, 0.5))
        .unwrap();
    assert_eq!(
        fixture.model.tree_variable_status(fixture.root).unwrap(),
        VariableStatus::Unchanged
    );

    // A line-shape parameter does.
    fixture
        .model
        .params_mut()
        .set_real(fixture.shape.width_parameter(), 0.35)
        .unwrap();
    assert_eq!(
        fixture.model.tree_variable_status(fixture.root).unwrap(),
        VariableStatus::Changed
    );
}
