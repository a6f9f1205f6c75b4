//! Yoshikawa manipulability `w = sqrt(det(J J^T))`.
//!
//! `w` vanishes where the arm loses a direction of motion (fully stretched
//! or folded) and grows as the configuration becomes better conditioned.

use armkit_core::error::{SingularityWarning, WorkspaceError};
use armkit_core::types::Configuration;
use armkit_ik::{LinkChain, manipulability_index};

pub use armkit_ik::check_singularity;

/// Manipulability of `chain` at `q` over its task-space rows.
pub fn manipulability(chain: &LinkChain, q: &Configuration) -> Result<f64, WorkspaceError> {
    Ok(manipulability_index(&chain.jacobian(q)?))
}

/// Warning when `q` is within `threshold` of a singularity.
pub fn singularity(
    chain: &LinkChain,
    q: &Configuration,
    threshold: f64,
) -> Result<Option<SingularityWarning>, WorkspaceError> {
    Ok(check_singularity(manipulability(chain, q)?, threshold))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use super::*;
    use approx::assert_relative_eq;
    use armkit_core::error::ConfigurationError;
    use armkit_core::types::Link;
    use nalgebra::Vector3;

    fn two_link() -> LinkChain {
        LinkChain::new(vec![Link::revolute(3.0), Link::revolute(2.0)]).unwrap()
    }

    #[test]
    fn zero_at_full_extension() {
        let w = manipulability(&two_link(), &[0.0, 0.0].into()).unwrap();
        assert_relative_eq!(w, 0.0, epsilon = 1e-12);
        assert!(singularity(&two_link(), &[0.0, 0.0].into(), 1e-3).unwrap().is_some());
    }

    #[test]
    fn zero_when_folded() {
        let w = manipulability(&two_link(), &[0.7, PI].into()).unwrap();
        assert_relative_eq!(w, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn two_link_matches_closed_form() {
        // w = l1 * l2 * |sin(theta2)|, independent of theta1.
        for theta1 in [-2.0, 0.0, 1.3] {
            for theta2 in [0.3, FRAC_PI_2, -2.0] {
                let w = manipulability(&two_link(), &[theta1, theta2].into()).unwrap();
                assert_relative_eq!(w, 6.0 * f64::sin(theta2).abs(), epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn redundant_planar_chain_uses_task_rows() {
        let chain =
            LinkChain::new(vec![Link::revolute(3.0), Link::revolute(2.5), Link::revolute(1.5)])
                .unwrap();
        let w = manipulability(&chain, &[0.2, 0.9, -0.4].into()).unwrap();
        assert!(w > 0.0);
        let w = manipulability(&chain, &[0.0, 0.0, 0.0].into()).unwrap();
        assert_relative_eq!(w, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn spatial_chain_is_never_negative() {
        let chain = LinkChain::new(vec![
            Link::revolute(0.5),
            Link::revolute(2.0).with_axis(Vector3::y()),
            Link::revolute(1.5).with_axis(Vector3::y()),
        ])
        .unwrap();
        for q in [[0.0, 0.0, 0.0], [0.4, -0.3, 1.2], [1.0, 1.0, -1.0]] {
            let w = manipulability(&chain, &q.into()).unwrap();
            assert!(w >= 0.0 && w.is_finite());
        }
    }

    #[test]
    fn malformed_configuration_rejected() {
        assert_eq!(
            manipulability(&two_link(), &[0.0].into()),
            Err(WorkspaceError::InvalidConfiguration(
                ConfigurationError::LengthMismatch {
                    expected: 2,
                    got: 1
                }
            ))
        );
    }
}
