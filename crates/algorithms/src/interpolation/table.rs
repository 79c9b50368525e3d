//! 1-D linear table lookup

use ndarray::ArrayView1;

/// Piecewise-linear interpolation of `ys` over increasing `xs`.
///
/// Values outside `[xs[0], xs[n-1]]` are clamped to the end values.
/// A NaN `x` (or an empty table) gives NaN.
pub fn interp1_clamped(xs: &[f64], ys: ArrayView1<'_, f64>, x: f64) -> f64 {
    debug_assert_eq!(xs.len(), ys.len());
    let n = xs.len();
    if n == 0 || x.is_nan() {
        return f64::NAN;
    }
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[n - 1] {
        return ys[n - 1];
    }

    let hi = xs.partition_point(|&v| v <= x);
    let lo = hi - 1;
    let t = (x - xs[lo]) / (xs[hi] - xs[lo]);
    ys[lo] + t * (ys[hi] - ys[lo])
}
