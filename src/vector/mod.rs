use nalgebra::DVector;

/// Weighted mean square of `x`, with weights `1 / (|y| * rtol + atol)`.
pub fn squared_norm(x: &DVector<f64>, y: &DVector<f64>, atol: &DVector<f64>, rtol: f64) -> f64 {
    assert_eq!(x.len(), y.len(), "Vector lengths do not match");
    assert_eq!(y.len(), atol.len(), "Vector lengths do not match");
    if x.is_empty() {
        return 0.0;
    }
    let acc = x
        .iter()
        .zip(y.iter())
        .zip(atol.iter())
        .map(|((xi, yi), ai)| (xi / (yi.abs() * rtol + ai)).powi(2))
        .sum::<f64>();
    acc / x.len() as f64
}

/// Compare two evaluations of a root function.
///
/// Returns `(found_root, max_frac, max_frac_index)`: whether any component of `g1` is exactly zero,
/// and, among the components that change sign between `g0` and `g1`, the one whose crossing lies
/// closest to `g0` (or -1 if there is no sign change).
pub fn root_finding(g0: &DVector<f64>, g1: &DVector<f64>) -> (bool, f64, i32) {
    let mut max_frac = 0.0;
    let mut max_frac_index = -1;
    let mut found_root = false;
    assert_eq!(g0.len(), g1.len(), "Vector lengths do not match");
    for (i, (&g0, &g1)) in g0.iter().zip(g1.iter()).enumerate() {
        if g1 == 0.0 {
            found_root = true;
        }
        if g0 * g1 < 0.0 {
            let frac = (g1 / (g1 - g0)).abs();
            if frac > max_frac {
                max_frac = frac;
                max_frac_index = i as i32;
            }
        }
    }
    (found_root, max_frac, max_frac_index)
}
