//! Reference arms shared by the test suites.

use std::f64::consts::FRAC_PI_2;

use nalgebra::Vector3;

use armkit_core::types::Link;
use armkit_ik::LinkChain;

/// Planar 3.0 / 2.0 arm with free joints (reach annulus [1, 5]).
pub fn two_link_chain() -> LinkChain {
    chain(vec![Link::revolute(3.0), Link::revolute(2.0)], Vector3::zeros())
}

/// Planar 3.0 / 2.5 / 1.5 arm with free joints.
pub fn three_link_chain() -> LinkChain {
    chain(
        vec![Link::revolute(3.0), Link::revolute(2.5), Link::revolute(1.5)],
        Vector3::zeros(),
    )
}

/// Planar excavator-style arm (boom, stick, bucket) mounted two units above
/// the origin.
pub fn jcb_arm() -> LinkChain {
    chain(
        vec![
            Link::revolute(3.5).with_limits(-1.57, 1.57),
            Link::revolute(2.8).with_limits(-2.5, 0.5),
            Link::revolute(1.5).with_limits(-0.8, 2.5),
        ],
        Vector3::new(0.0, 2.0, 0.0),
    )
}

/// Base yaw followed by two pitch joints.
pub fn spatial_arm() -> LinkChain {
    chain(
        vec![
            Link::revolute(0.5),
            Link::revolute(2.0)
                .with_axis(Vector3::y())
                .with_limits(-FRAC_PI_2, FRAC_PI_2),
            Link::revolute(1.5)
                .with_axis(Vector3::y())
                .with_limits(-2.5, 2.5),
        ],
        Vector3::zeros(),
    )
}

fn chain(links: Vec<Link>, base: Vector3<f64>) -> LinkChain {
    LinkChain::with_base(links, base).expect("fixture chain is valid")
}
