//! Float keys with a total order.
//!
//! Pick candidates are ranked by ray distance. `-0.0` and `0.0` must tie so
//! the part-handle tiebreak decides, and a NaN distance must never win.

use core::cmp::Ordering;

/// `f64` wrapper that is `Ord`: signed zeros compare equal, every NaN sorts
/// after every number.
#[derive(Debug, Copy, Clone)]
pub struct TotalF64(pub f64);

impl TotalF64 {
    fn key(self) -> f64 {
        match self.0 {
            v if v == 0.0 => 0.0,
            v if v.is_nan() => f64::NAN,
            v => v,
        }
    }
}

impl PartialEq for TotalF64 {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TotalF64 {}

impl PartialOrd for TotalF64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TotalF64 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().total_cmp(&other.key())
    }
}

pub fn stable_total_cmp_f64(a: f64, b: f64) -> Ordering {
    TotalF64(a).cmp(&TotalF64(b))
}
