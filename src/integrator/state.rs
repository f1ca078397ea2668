use nalgebra::DVector;

use crate::{vector::squared_norm, IvpProblem};

/// State of a Runge-Kutta integration: the solution `y`, its derivative `dy`, the current value
/// of the independent variable `t` and the step size `h` of the next step.
#[derive(Clone, Debug)]
pub struct RkState {
    pub y: DVector<f64>,
    pub dy: DVector<f64>,
    pub t: f64,
    pub h: f64,
}

impl RkState {
    /// Create a new state at `(y0, t0)`, evaluating the derivative. The sign of `h` sets the
    /// direction of integration.
    pub fn new(problem: &IvpProblem, y0: DVector<f64>, t0: f64, h: f64) -> Self {
        let dy = problem.rhs(&y0, t0);
        Self { y: y0, dy, t: t0, h }
    }

    /// Estimate a good first step size for a method of order `solver_order`, keeping the sign of `h0`.
    ///
    /// Follows the algorithm in E. Hairer, S. P. Norsett G. Wanner, "Solving Ordinary Differential Equations I: Nonstiff Problems", Sec. II.4.
    pub fn set_step_size(
        &mut self,
        h0: f64,
        atol: &DVector<f64>,
        rtol: f64,
        problem: &IvpProblem,
        solver_order: usize,
    ) {
        let is_neg_h = h0 < 0.0;
        let y0 = &self.y;
        let f0 = &self.dy;

        let d0 = squared_norm(y0, y0, atol, rtol).sqrt();
        let d1 = squared_norm(f0, y0, atol, rtol).sqrt();

        let h0 = if d0 < 1e-5 || d1 < 1e-5 {
            1e-6
        } else {
            0.01 * (d0 / d1)
        };

        // make sure we preserve the sign of h0
        let signed_h0 = if is_neg_h { -h0 } else { h0 };
        let y1 = f0 * signed_h0 + y0;
        let f1 = problem.rhs(&y1, self.t + signed_h0);

        let df = f1 - f0;
        let d2 = squared_norm(&df, y0, atol, rtol).sqrt() / h0.abs();

        let max_d = d2.max(d1);
        let h1 = if max_d < 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / max_d).powf(1.0 / (1.0 + solver_order as f64))
        };

        self.h = (100.0 * h0).min(h1);
        if is_neg_h {
            self.h = -self.h;
        }
    }
}
