//! Time-varying rotational velocity fields.
//!
//! The horizontal components rotate about `center`; the vertical component is
//! a small ripple along x that drifts with time.

use crate::grid::Grid;

/// Points per side of the field produced by [`rotational_field`].
pub const ROTATIONAL_GRID: usize = 10;

#[derive(Clone, Debug, PartialEq)]
pub struct VelocitySamples {
    pub coords: Vec<f64>,
    pub velocities: Vec<f64>,
}

impl VelocitySamples {
    pub fn len(&self) -> usize {
        self.coords.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }
}

fn rotate(x: f64, y: f64, t: f64, omega: f64, center: [f64; 2], amplitude: f64) -> [f64; 3] {
    let dx = x - center[0];
    let dy = y - center[1];
    [
        -dy * omega * amplitude,
        dx * omega * amplitude,
        0.01 * (x + 0.05 * t).sin() * amplitude,
    ]
}

/// A 10×10 field over `[0, 10]²` at `z = 0` whose rotation rate oscillates
/// through zero: `ω = 0.1 sin(0.1 t)`.
pub fn rotational_field(t: f64, center: [f64; 2], amplitude: f64) -> VelocitySamples {
    let grid = Grid::regular(ROTATIONAL_GRID, 0.0, 10.0, 0.0);
    let omega = 0.1 * (0.1 * t).sin();
    let velocities = grid
        .coords()
        .chunks_exact(3)
        .flat_map(|p| rotate(p[0], p[1], t, omega, center, amplitude))
        .collect();
    VelocitySamples {
        coords: grid.into_coords(),
        velocities,
    }
}

/// Velocities at caller-chosen points with a rotation rate that never
/// reverses: `ω = 0.1 (1 + 0.5 sin(0.1 t))`. A trailing partial point in
/// `coords` is ignored.
pub fn rotational_field_at(t: f64, coords: &[f64], center: [f64; 2], amplitude: f64) -> Vec<f64> {
    let omega = 0.1 * (1.0 + 0.5 * (0.1 * t).sin());
    coords
        .chunks_exact(3)
        .flat_map(|p| rotate(p[0], p[1], t, omega, center, amplitude))
        .collect()
}
