//! Distribution helpers used by selection and the run summary.

/// Min-max normalisation into [0, 1]. A flat range maps everything to 0.
pub fn minmax_normalise(value: f64, min_val: f64, max_val: f64) -> f64 {
    if (max_val - min_val).abs() < 1e-12 {
        return 0.0;
    }
    ((value - min_val) / (max_val - min_val)).clamp(0.0, 1.0)
}

/// Quantile by linear interpolation between closest ranks over an ascending slice:
/// `h = (n-1)·q`, `x[⌊h⌋] + (h-⌊h⌋)·(x[⌈h⌉] - x[⌊h⌋])`.
pub fn quantile(sorted_asc: &[f64], q: f64) -> Option<f64> {
    if sorted_asc.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let h = (sorted_asc.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    let frac = h - lo as f64;
    let (a, b) = (sorted_asc[lo], sorted_asc[hi]);
    // clamp keeps rounding from stepping past the upper neighbour
    Some((a + frac * (b - a)).clamp(a, b))
}

pub fn median(sorted_asc: &[f64]) -> Option<f64> {
    quantile(sorted_asc, 0.5)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
