//! Equal-interval discretization
//!
//! The range `[vmin, vmax]` is split into `n` classes of width
//! `(vmax - vmin) / n`. Classes are numbered from 1. Every class is
//! half-open `[lower, upper)` except the last one, which also takes `vmax`.

use landshift_core::{Error, Result};
use tracing::warn;

/// Class identifier, 1-based
pub type ClassId = i32;

/// Amount added on each side of a zero-width range before computing breaks
pub const DEGENERATE_WIDENING: f64 = 0.001;

/// Ordered class breakpoints.
///
/// `breaks` holds the upper bound of every class: `n - 1` interior
/// boundaries followed by the global maximum.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassBreaks {
    min: f64,
    breaks: Vec<f64>,
    step: f64,
    degenerate: bool,
}

impl ClassBreaks {
    /// Lower bound of class 1
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper bound of the last class
    pub fn max(&self) -> f64 {
        // classify never builds an empty break set
        self.breaks.last().copied().unwrap_or(self.min)
    }

    /// Upper bounds, one per class
    pub fn breaks(&self) -> &[f64] {
        &self.breaks
    }

    /// Class width
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Number of classes
    pub fn len(&self) -> usize {
        self.breaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breaks.is_empty()
    }

    /// Whether the input range had zero width and was widened
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    /// `(class, lower, upper)` for every class
    pub fn intervals(&self) -> impl Iterator<Item = (ClassId, f64, f64)> + '_ {
        std::iter::once(self.min)
            .chain(self.breaks.iter().copied())
            .zip(self.breaks.iter().copied())
            .enumerate()
            .map(|(i, (lower, upper))| (i as ClassId + 1, lower, upper))
    }

    /// Class of a value, `None` for NaN
    pub fn class_of(&self, v: f64) -> Option<ClassId> {
        if v.is_nan() || self.breaks.is_empty() {
            return None;
        }
        let n = self.breaks.len();
        let interior = &self.breaks[..n - 1];
        let below = interior.partition_point(|b| *b <= v);
        Some((below + 1).clamp(1, n) as ClassId)
    }
}

/// Half-width added around a constant value `v`.
///
/// [`DEGENERATE_WIDENING`], grown for large magnitudes so that every break
/// stays several ulps away from its neighbours.
fn degenerate_widening(v: f64, n: usize) -> f64 {
    DEGENERATE_WIDENING.max(v.abs() * f64::EPSILON * 4.0 * n as f64)
}

/// Compute `n` equal-interval breakpoints for `[vmin, vmax]`.
///
/// A zero-width range is widened by [`DEGENERATE_WIDENING`] on both sides
/// (more for very large values) and flagged on the returned breaks.
///
/// # Errors
/// - `StatisticsUnavailable` if either bound is not finite
/// - `InvalidParameter` if `n == 0`, `vmin > vmax`, or the range is too
///   narrow for `n` distinct breakpoints at f64 precision
pub fn classify(vmin: f64, vmax: f64, n: usize) -> Result<ClassBreaks> {
    if !vmin.is_finite() || !vmax.is_finite() {
        return Err(Error::StatisticsUnavailable(format!(
            "range [{}, {}] is not finite",
            vmin, vmax
        )));
    }
    if n == 0 {
        return Err(Error::InvalidParameter {
            name: "classes",
            value: "0".into(),
            reason: "at least one class is required".into(),
        });
    }
    if vmin > vmax {
        return Err(Error::InvalidParameter {
            name: "vmin",
            value: vmin.to_string(),
            reason: format!("greater than vmax {}", vmax),
        });
    }

    let degenerate = vmin == vmax;
    let (lo, hi) = if degenerate {
        let widening = degenerate_widening(vmin, n);
        warn!(value = vmin, "zero-width value range, widening by {}", widening);
        (vmin - widening, vmax + widening)
    } else {
        (vmin, vmax)
    };

    let step = (hi - lo) / n as f64;
    let mut breaks: Vec<f64> = (1..n).map(|i| lo + step * i as f64).collect();
    breaks.push(hi);

    let mut previous = lo;
    for b in &breaks {
        if !(*b > previous) || !step.is_finite() {
            return Err(Error::InvalidParameter {
                name: "classes",
                value: n.to_string(),
                reason: format!("range [{}, {}] too narrow for distinct breaks", lo, hi),
            });
        }
        previous = *b;
    }

    Ok(ClassBreaks {
        min: lo,
        breaks,
        step,
        degenerate,
    })
}

/// Class of `v` under `breaks`; see [`ClassBreaks::class_of`]
pub fn class_of(v: f64, breaks: &ClassBreaks) -> Option<ClassId> {
    breaks.class_of(v)
}
