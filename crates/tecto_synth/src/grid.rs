/// Points of a square sampling grid, flattened as `[x0, y0, z0, x1, ...]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    coords: Vec<f64>,
}

impl Grid {
    /// `side × side` points spanning `[min, max]` on both axes at height `z`;
    /// x varies slowest. A one-point grid sits at `min`.
    pub fn regular(side: usize, min: f64, max: f64, z: f64) -> Self {
        let step = if side > 1 {
            (max - min) / (side - 1) as f64
        } else {
            0.0
        };
        let mut coords = Vec::with_capacity(side * side * 3);
        for i in 0..side {
            for j in 0..side {
                coords.extend_from_slice(&[min + i as f64 * step, min + j as f64 * step, z]);
            }
        }
        Self { coords }
    }

    pub fn len(&self) -> usize {
        self.coords.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    /// Replaces every z with the matching entry of `heights`.
    ///
    /// Returns false, leaving the grid untouched, when the lengths differ.
    pub fn set_heights(&mut self, heights: &[f64]) -> bool {
        if heights.len() != self.len() {
            return false;
        }
        for (p, h) in self.coords.chunks_exact_mut(3).zip(heights) {
            p[2] = *h;
        }
        true
    }

    pub fn heights(&self) -> Vec<f64> {
        self.coords.chunks_exact(3).map(|p| p[2]).collect()
    }

    pub fn into_coords(self) -> Vec<f64> {
        self.coords
    }
}
