use ndarray::{Array2, Axis};

/// Standardize every column to zero mean and unit (population) variance,
/// using the statistics of `x` itself.
///
/// A column whose values are all equal comes back as zeros.
pub fn standardize(x: &Array2<f64>) -> Array2<f64> {
    let mut out = x.clone();
    for mut col in out.axis_iter_mut(Axis(1)) {
        let n = col.len();
        if n == 0 {
            continue;
        }
        let (lo, hi) = col.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
        let mean = col.sum() / n as f64;
        let std = (col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64).sqrt();
        // min == max catches constant columns whose mean picked up rounding error
        if lo == hi || !(std > 0.0) {
            col.fill(0.0);
        } else {
            col.mapv_inplace(|v| (v - mean) / std);
        }
    }
    out
}
