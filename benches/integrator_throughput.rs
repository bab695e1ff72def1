use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pwa_combin::ParticleIndex;
use pwa_core::FourVector;
use pwa_data::{partition_block, DataSet};
use pwa_integral::{calculate_partitions, IntegrationOpts, ModelIntegral};
use pwa_model::{ConstantWidthBreitWigner, Model};

const EVENTS: usize = 64;

fn particle(raw: u8) -> ParticleIndex {
    ParticleIndex::from_raw(raw)
}

fn two_chain_model() -> (Model, ConstantWidthBreitWigner) {
    let mut model = Model::new(3).unwrap();
    let (cache, registry, params, momenta) = model.declare_parts().unwrap();

    let rho_pair = cache
        .intern_from_indices(&[particle(0), particle(1)])
        .unwrap();
    let rho_bachelor = cache.intern_final_state(particle(2));
    let rho_top = cache.intern_composite(&[rho_pair, rho_bachelor]).unwrap();
    let sigma_pair = cache
        .intern_from_indices(&[particle(1), particle(2)])
        .unwrap();
    let sigma_bachelor = cache.intern_final_state(particle(0));
    let sigma_top = cache
        .intern_composite(&[sigma_pair, sigma_bachelor])
        .unwrap();

    let rho =
        ConstantWidthBreitWigner::declare(registry, params, momenta, "rho", 2.6, 0.3).unwrap();
    let sigma =
        ConstantWidthBreitWigner::declare(registry, params, momenta, "sigma", 2.2, 0.5).unwrap();
    let rho_amp = model.add_amplitude_component(Box::new(rho.clone())).unwrap();
    let sigma_amp = model.add_amplitude_component(Box::new(sigma)).unwrap();

    let rho_root = model.add_decay_tree("X->rho+2", 0).unwrap();
    let rho_res = model.add_decay_tree("rho->0+1", 0).unwrap();
    model.add_tree_top(rho_root, rho_top).unwrap();
    model.add_tree_daughter(rho_root, 0, rho_res).unwrap();
    model.add_tree_factor(rho_res, rho_amp).unwrap();

    let sigma_root = model.add_decay_tree("X->sigma+0", 0).unwrap();
    let sigma_res = model.add_decay_tree("sigma->1+2", 0).unwrap();
    model.add_tree_top(sigma_root, sigma_top).unwrap();
    model.add_tree_daughter(sigma_root, 0, sigma_res).unwrap();
    model.add_tree_factor(sigma_res, sigma_amp).unwrap();

    model.lock().unwrap();
    (model, rho)
}

fn seeded_data(model: &Model) -> DataSet {
    let mut data = model.new_data_set().unwrap();
    let mut table = model.new_status_table().unwrap();
    for seed in 0..EVENTS {
        let t = seed as f64;
        let momenta = [
            FourVector::new(1.5 + 0.02 * t, 0.40 - 0.03 * t, 0.10, 0.20),
            FourVector::new(1.3 - 0.01 * t, -0.20, 0.25 + 0.02 * t, -0.10),
            FourVector::new(1.1 + 0.01 * t, -0.15, -0.30, 0.05 * t),
        ];
        model.add_event(&mut data, &momenta, &mut table).unwrap();
    }
    data
}

fn refresh_after_mass_move_bench(c: &mut Criterion) {
    let (mut model, rho) = two_chain_model();
    let mut data = seeded_data(&model);
    let mut partitions = partition_block(&mut data, 1).unwrap();
    let mut tables = vec![model.new_status_table().unwrap()];
    let mut integral = ModelIntegral::new(&model).unwrap();
    let opts = IntegrationOpts::default();
    calculate_partitions(&model, &mut integral, &mut partitions, &mut tables, &opts).unwrap();
    model.params_mut().set_all_unchanged();

    let mut toggle = false;
    c.bench_function("integral_refresh_after_mass_move", |b| {
        b.iter(|| {
            toggle = !toggle;
            let mass = if toggle { 2.65 } else { 2.55 };
            model.params_mut().set_real(rho.mass_parameter(), mass).unwrap();
            let pass =
                calculate_partitions(&model, &mut integral, &mut partitions, &mut tables, &opts)
                    .unwrap();
            black_box(pass.events);
        });
    });
}

fn settled_pass_bench(c: &mut Criterion) {
    let (mut model, _) = two_chain_model();
    let mut data = seeded_data(&model);
    let mut partitions = partition_block(&mut data, 1).unwrap();
    let mut tables = vec![model.new_status_table().unwrap()];
    let mut integral = ModelIntegral::new(&model).unwrap();
    let opts = IntegrationOpts::default();
    calculate_partitions(&model, &mut integral, &mut partitions, &mut tables, &opts).unwrap();
    model.params_mut().set_all_unchanged();

    c.bench_function("integral_settled_pass", |b| {
        b.iter(|| {
            let pass =
                calculate_partitions(&model, &mut integral, &mut partitions, &mut tables, &opts)
                    .unwrap();
            black_box(pass.events);
        });
    });
}

criterion_group!(benches, refresh_after_mass_move_bench, settled_pass_bench);
criterion_main!(benches);
