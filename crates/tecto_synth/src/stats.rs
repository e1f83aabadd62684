use serde::Serialize;

/// Summary of a scalar field. All zeros for an empty field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ElevationStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl ElevationStats {
    pub fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let (min, max, sum) = values.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(lo, hi, s), &v| (lo.min(v), hi.max(v), s + v),
        );
        Self {
            min,
            max,
            mean: sum / values.len() as f64,
        }
    }

    /// True when every field differs from `other` by at most `tol`.
    pub fn approx_eq(&self, other: &Self, tol: f64) -> bool {
        (self.min - other.min).abs() <= tol
            && (self.max - other.max).abs() <= tol
            && (self.mean - other.mean).abs() <= tol
    }
}

/// Point-wise change between two samplings of the same points.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ElevationChange {
    pub after: ElevationStats,
    pub min_change: f64,
    pub max_change: f64,
    pub mean_change: f64,
    pub rms_change: f64,
    /// Points whose change exceeds twice the standard deviation of all changes.
    pub significant: usize,
}

impl ElevationChange {
    /// `None` when the samplings have different lengths.
    pub fn between(before: &[f64], after: &[f64]) -> Option<Self> {
        if before.len() != after.len() {
            return None;
        }
        if before.is_empty() {
            return Some(Self::default());
        }
        let changes: Vec<f64> = after.iter().zip(before).map(|(a, b)| a - b).collect();
        let n = changes.len() as f64;
        let spread = ElevationStats::of(&changes);
        let rms_change = (changes.iter().map(|c| c * c).sum::<f64>() / n).sqrt();
        let variance = changes
            .iter()
            .map(|c| (c - spread.mean).powi(2))
            .sum::<f64>()
            / n;
        let threshold = 2.0 * variance.sqrt();
        let significant = changes.iter().filter(|c| c.abs() > threshold).count();
        Some(Self {
            after: ElevationStats::of(after),
            min_change: spread.min,
            max_change: spread.max,
            mean_change: spread.mean,
            rms_change,
            significant,
        })
    }
}
