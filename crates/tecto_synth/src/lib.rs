//! Synthetic inputs and summary statistics for driving a landscape model.
//!
//! Nothing here touches the embedded runtime; the buffers produced are laid
//! out the way the bridge expects (row-major, three components per point).

pub mod grid;
pub mod stats;
pub mod velocity;

pub use grid::Grid;
pub use stats::{ElevationChange, ElevationStats};
pub use velocity::{ROTATIONAL_GRID, VelocitySamples, rotational_field, rotational_field_at};
