//! Small numeric helpers shared by the curve, damage and risk modules.

/// Round to `decimals` places, ties to even.
///
/// Matches the rounding used by the published damage tables, so that
/// `0.125` rounded to two places gives `0.12`.
pub fn round_half_even(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round_ties_even() / scale
}

/// Linear interpolation between `(x0, y0)` and `(x1, y1)` evaluated at `x`.
///
/// Extrapolates when `x` lies outside `[x0, x1]`. Returns `y0` for a
/// degenerate segment.
pub fn lerp(x0: f64, y0: f64, x1: f64, y1: f64, x: f64) -> f64 {
    if x1 == x0 {
        return y0;
    }
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// Piecewise linear interpolation over sorted `xs`, extrapolating linearly
/// from the first or last segment outside the data range.
pub fn interpolate_extrapolating(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    debug_assert_eq!(xs.len(), ys.len());
    match xs.len() {
        0 => f64::NAN,
        1 => ys[0],
        n => {
            let upper = xs.partition_point(|&v| v < x).clamp(1, n - 1);
            lerp(xs[upper - 1], ys[upper - 1], xs[upper], ys[upper], x)
        }
    }
}

/// Trapezoidal integral of `ys` over `xs` (xs ascending).
pub fn trapezoid(xs: &[f64], ys: &[f64]) -> f64 {
    xs.windows(2)
        .zip(ys.windows(2))
        .map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) / 2.0)
        .sum()
}
