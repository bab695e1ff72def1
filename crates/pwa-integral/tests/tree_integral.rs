//! Integral matrices over a coherent sum's trees.

use pwa_core::Complex64;
use pwa_integral::TreeIntegral;
use pwa_model::DecayTreeId;

fn tree(raw: u32) -> DecayTreeId {
    DecayTreeId::from_raw(raw)
}

fn event_amplitudes(seed: usize) -> [Complex64; 3] {
    let t = seed as f64;
    [
        Complex64::new(0.8 + 0.05 * t, 0.30 - 0.02 * t),
        Complex64::new(-0.4 + 0.03 * t, 0.60),
        Complex64::new(1.2, -0.10 * t),
    ]
}

#[test]
fn known_two_tree_scenario_reads_out_the_closed_form() {
    let mut matrix = TreeIntegral::new(vec![tree(0), tree(1)]).unwrap();
    // Two events with unit-modulus second amplitudes at plus and minus
    // sixty degrees: both diagonals average to one and the off-diagonal
    // mean lands on one half.
    let phase = std::f64::consts::FRAC_PI_3;
    for sign in [1.0, -1.0] {
        let amplitudes = [
            Complex64::new(1.0, 0.0),
            Complex64::from_polar(1.0, sign * phase),
        ];
        matrix.accumulate(&amplitudes).unwrap();
    }
    assert!((matrix.diagonal(0).unwrap().value() - 1.0).abs() < 1.0e-12);
    assert!((matrix.diagonal(1).unwrap().value() - 1.0).abs() < 1.0e-12);
    let off = matrix.off_diagonal(0, 1).unwrap().value();
    assert!((off.re - 0.5).abs() < 1.0e-12);
    assert!(off.im.abs() < 1.0e-12);

    // Free amplitudes 1 and 2i make the interference term purely
    // imaginary, so the coherent total is 1 + 4 = 5 and the fractions
    // come out at one fifth and four fifths.
    let free = [Complex64::new(1.0, 0.0), Complex64::new(0.0, 2.0)];
    let total = matrix.total(&free).unwrap();
    assert!((total - 5.0).abs() < 1.0e-12);
    let fractions = matrix.fit_fractions(&free).unwrap();
    assert!((fractions[0] - 0.2).abs() < 1.0e-12);
    assert!((fractions[1] - 0.8).abs() < 1.0e-12);
    assert!(matrix.interference(&free).unwrap().abs() < 1.0e-12);
}

#[test]
fn three_tree_matrices_store_each_pair_once() {
    let mut matrix = TreeIntegral::new(vec![tree(0), tree(1), tree(2)]).unwrap();
    let amplitudes = [
        Complex64::new(1.0, 0.0),
        Complex64::new(0.0, 1.0),
        Complex64::new(2.0, -1.0),
    ];
    matrix.accumulate(&amplitudes).unwrap();

    for (i, j) in [(0usize, 1usize), (0, 2), (1, 2)] {
        let expected = amplitudes[i].conj() * amplitudes[j];
        let value = matrix.off_diagonal(i, j).unwrap().value();
        assert!((value - expected).norm() < 1.0e-12);
        assert_eq!(matrix.off_diagonal(i, j).unwrap().count(), 1);
    }

    let err = matrix.off_diagonal(1, 1).unwrap_err();
    assert_eq!(err.info().code, "pair-order");
    let err = matrix.off_diagonal(2, 0).unwrap_err();
    assert_eq!(err.info().code, "pair-order");
    let err = matrix.off_diagonal(0, 3).unwrap_err();
    assert_eq!(err.info().code, "tree-position");
}

#[test]
fn partitioned_accumulation_merges_to_the_serial_matrix() {
    let members = vec![tree(0), tree(1), tree(2)];
    let mut serial = TreeIntegral::new(members.clone()).unwrap();
    for seed in 0..12 {
        serial.accumulate(&event_amplitudes(seed)).unwrap();
    }

    // An uneven 5 / 7 split must land on the same means.
    let mut left = TreeIntegral::new(members.clone()).unwrap();
    let mut right = TreeIntegral::new(members).unwrap();
    for seed in 0..5 {
        left.accumulate(&event_amplitudes(seed)).unwrap();
    }
    for seed in 5..12 {
        right.accumulate(&event_amplitudes(seed)).unwrap();
    }
    left.merge(&right).unwrap();

    assert_eq!(left.events(), serial.events());
    for position in 0..3 {
        let merged = left.diagonal(position).unwrap().value();
        let direct = serial.diagonal(position).unwrap().value();
        assert!((merged - direct).abs() < 1.0e-12 * direct.abs().max(1.0));
    }
    for (i, j) in [(0usize, 1usize), (0, 2), (1, 2)] {
        let merged = left.off_diagonal(i, j).unwrap().value();
        let direct = serial.off_diagonal(i, j).unwrap().value();
        assert!((merged - direct).norm() < 1.0e-12 * direct.norm().max(1.0));
    }
}

#[test]
fn four_quarter_partitions_agree_with_one_long_pass() {
    let members = vec![tree(0), tree(1), tree(2)];
    let mut serial = TreeIntegral::new(members.clone()).unwrap();
    for seed in 0..1000 {
        serial.accumulate(&event_amplitudes(seed)).unwrap();
    }

    let mut merged = TreeIntegral::new(members.clone()).unwrap();
    for quarter in 0..4 {
        let mut part = TreeIntegral::new(members.clone()).unwrap();
        for seed in (quarter * 250)..((quarter + 1) * 250) {
            part.accumulate(&event_amplitudes(seed)).unwrap();
        }
        merged.merge(&part).unwrap();
    }

    assert_eq!(merged.events(), 1000);
    for position in 0..3 {
        let quartered = merged.diagonal(position).unwrap().value();
        let direct = serial.diagonal(position).unwrap().value();
        assert!((quartered - direct).abs() < 1.0e-9 * direct.abs().max(1.0));
    }
    for (i, j) in [(0usize, 1usize), (0, 2), (1, 2)] {
        let quartered = merged.off_diagonal(i, j).unwrap().value();
        let direct = serial.off_diagonal(i, j).unwrap().value();
        assert!((quartered - direct).norm() < 1.0e-9 * direct.norm().max(1.0));
    }
}

#[test]
fn masked_accumulation_touches_only_marked_elements() {
    let mut matrix = TreeIntegral::new(vec![tree(0), tree(1), tree(2)]).unwrap();
    matrix
        .accumulate_masked(&event_amplitudes(0), &[true, false, false])
        .unwrap();

    assert_eq!(matrix.diagonal(0).unwrap().count(), 1);
    assert!(matrix.diagonal(1).unwrap().is_empty());
    assert!(matrix.diagonal(2).unwrap().is_empty());
    // Pairs touching the marked tree move, the settled pair does not.
    assert_eq!(matrix.off_diagonal(0, 1).unwrap().count(), 1);
    assert_eq!(matrix.off_diagonal(0, 2).unwrap().count(), 1);
    assert!(matrix.off_diagonal(1, 2).unwrap().is_empty());
}

#[test]
fn resetting_one_tree_spares_unrelated_elements() {
    let mut matrix = TreeIntegral::new(vec![tree(0), tree(1), tree(2)]).unwrap();
    for seed in 0..4 {
        matrix.accumulate(&event_amplitudes(seed)).unwrap();
    }

    matrix.reset_tree(1).unwrap();
    assert!(matrix.diagonal(1).unwrap().is_empty());
    assert!(matrix.off_diagonal(0, 1).unwrap().is_empty());
    assert!(matrix.off_diagonal(1, 2).unwrap().is_empty());
    assert_eq!(matrix.diagonal(0).unwrap().count(), 4);
    assert_eq!(matrix.diagonal(2).unwrap().count(), 4);
    assert_eq!(matrix.off_diagonal(0, 2).unwrap().count(), 4);

    // The tree count reflects the surviving elements.
    assert_eq!(matrix.events(), 4);
}

#[test]
fn structural_misuse_is_refused() {
    let err = TreeIntegral::new(Vec::new()).unwrap_err();
    assert_eq!(err.info().code, "no-trees");

    let err = TreeIntegral::new(vec![tree(0), tree(1), tree(0)]).unwrap_err();
    assert_eq!(err.info().code, "duplicate-tree");

    let mut matrix = TreeIntegral::new(vec![tree(0), tree(1)]).unwrap();
    let err = matrix
        .accumulate(&[Complex64::new(1.0, 0.0)])
        .unwrap_err();
    assert_eq!(err.info().code, "amplitude-count");

    let err = matrix
        .accumulate_masked(
            &[Complex64::new(1.0, 0.0), Complex64::new(0.0, 1.0)],
            &[true],
        )
        .unwrap_err();
    assert_eq!(err.info().code, "mask-count");

    let err = matrix.position(tree(9)).unwrap_err();
    assert_eq!(err.info().code, "unknown-tree");
    assert_eq!(matrix.position(tree(1)).unwrap(), 1);

    let mut other = TreeIntegral::new(vec![tree(0), tree(2)]).unwrap();
    let err = other.merge(&matrix).unwrap_err();
    assert_eq!(err.info().code, "tree-mismatch");

    // Fractions are undefined while nothing has been integrated.
    let free = [Complex64::new(1.0, 0.0), Complex64::new(1.0, 0.0)];
    let err = matrix.fit_fractions(&free).unwrap_err();
    assert_eq!(err.info().code, "zero-integral");
}
