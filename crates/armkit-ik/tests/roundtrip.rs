//! FK / IK round trips over the reference arms.

use std::f64::consts::PI;

use approx::assert_relative_eq;
use armkit_core::types::{Configuration, Pose};
use armkit_ik::{IkSolver, SolveMethod};
use armkit_test_utils::{
    jcb_arm, random_configuration, seeded_rng, three_link_chain, two_link_chain,
};
use proptest::prelude::*;

proptest! {
    #[test]
    fn two_link_roundtrip(a in -PI..PI, b in -PI..PI) {
        let chain = two_link_chain();
        let target = chain.forward_kinematics(&Configuration::from([a, b])).unwrap();
        let solution = IkSolver::default().solve(&chain, &target, None).unwrap();
        prop_assert_eq!(solution.method, SolveMethod::ClosedForm);
        let reached = chain.forward_kinematics(&solution.configuration).unwrap();
        prop_assert!(reached.distance_to(&target) < 1e-3);
    }

    #[test]
    fn three_link_roundtrip(a in -PI..PI, b in -PI..PI, c in -PI..PI) {
        let chain = three_link_chain();
        let target = chain.forward_kinematics(&Configuration::from([a, b, c])).unwrap();
        let solution = IkSolver::default()
            .solve(&chain, &target, Some(&Configuration::zeros(3)))
            .unwrap();
        let reached = chain.forward_kinematics(&solution.configuration).unwrap();
        prop_assert!(reached.distance_to(&target) < 1e-3);
    }
}

#[test]
fn three_link_unseeded_roundtrip_through_singular_poses() {
    // Stretched and folded configurations put many targets on the X axis,
    // where the default mid-range seed is itself singular.
    let chain = three_link_chain();
    let solver = IkSolver::default();
    let values = [0.0, PI / 2.0, PI, -PI];
    for a in values {
        for b in values {
            for c in values {
                let target = chain.forward_kinematics(&Configuration::from([a, b, c])).unwrap();
                let solution = solver
                    .solve(&chain, &target, None)
                    .unwrap_or_else(|e| panic!("[{a}, {b}, {c}]: {e}"));
                let reached = chain.forward_kinematics(&solution.configuration).unwrap();
                assert!(reached.distance_to(&target) < 1e-3, "[{a}, {b}, {c}]");
            }
        }
    }
}

#[test]
fn three_link_reference_target() {
    let chain = three_link_chain();
    let solution = IkSolver::default()
        .solve(&chain, &Pose::planar(4.0, 2.0), Some(&Configuration::zeros(3)))
        .unwrap();
    assert_relative_eq!(solution.pose.x(), 4.0, epsilon = 1e-2);
    assert_relative_eq!(solution.pose.y(), 2.0, epsilon = 1e-2);
}

#[test]
fn jcb_arm_solutions_respect_limits() {
    let chain = jcb_arm();
    let mut rng = seeded_rng(3);
    let solver = IkSolver::default();
    let mut solved = 0;
    for _ in 0..50 {
        let goal = random_configuration(&chain, &mut rng);
        let target = chain.forward_kinematics(&goal).unwrap();
        // Limited chains are not guaranteed to converge from every seed;
        // whatever comes back must still be a valid configuration.
        match solver.solve(&chain, &target, None) {
            Ok(solution) => {
                assert!(chain.validate(&solution.configuration).is_ok());
                assert!(solution.residual < 1e-3);
                solved += 1;
            }
            Err(err) => {
                let best = err.as_unreachable().and_then(|u| u.best_effort.as_ref());
                assert!(best.is_none_or(|q| chain.validate(q).is_ok()));
            }
        }
    }
    assert!(solved >= 40, "only {solved} of 50 targets solved");
}
