use log::trace;
use nalgebra::DVector;

use crate::vector::squared_norm;

/// Monitors the convergence of a Newton iteration by estimating its rate of convergence.
#[derive(Clone)]
pub struct Convergence<'a> {
    pub rtol: f64,
    pub atol: &'a DVector<f64>,
    tol: f64,
    max_iter: usize,
    niter: usize,
    old_norm: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceStatus {
    Converged,
    Diverged,
    Continue,
    MaximumIterations,
}

impl<'a> Convergence<'a> {
    pub fn max_iter(&self) -> usize {
        self.max_iter
    }
    pub fn set_max_iter(&mut self, value: usize) {
        self.max_iter = value;
    }
    pub fn niter(&self) -> usize {
        self.niter
    }

    pub fn new(rtol: f64, atol: &'a DVector<f64>, max_iter: usize) -> Self {
        Self {
            rtol,
            atol,
            tol: 0.33,
            max_iter,
            old_norm: None,
            niter: 0,
        }
    }

    pub fn reset(&mut self) {
        self.niter = 0;
        self.old_norm = None;
    }

    pub fn norm(&self, dy: &DVector<f64>, y: &DVector<f64>) -> f64 {
        squared_norm(dy, y, self.atol, self.rtol).sqrt()
    }

    /// Check the size of the latest Newton correction `dy` (taken at the point `y`).
    pub fn check_new_iteration(&mut self, dy: &DVector<f64>, y: &DVector<f64>) -> ConvergenceStatus {
        let norm = self.norm(dy, y);
        self.niter += 1;
        trace!("newton iteration {}, norm = {:.3e}", self.niter, norm);
        // if norm is zero then we are done
        if norm <= f64::EPSILON {
            return ConvergenceStatus::Converged;
        }
        let eta = if let Some(old_norm) = self.old_norm {
            let rate = (norm / old_norm).powf(1.0 / (self.niter - 1) as f64);

            // check if iteration is diverging
            if rate > 0.9 {
                trace!("newton iteration diverged with rate {:.3e}", rate);
                return ConvergenceStatus::Diverged;
            }

            // if iteration is not going to converge in max_iter
            // (assuming the current rate), then abort
            let remaining = self.max_iter.saturating_sub(self.niter) as i32;
            if rate.powi(remaining) / (1.0 - rate) * norm > self.tol {
                return ConvergenceStatus::Diverged;
            }
            rate / (1.0 - rate)
        } else {
            20.0
        };

        if eta * norm < self.tol {
            return ConvergenceStatus::Converged;
        }
        if self.niter == 1 {
            self.old_norm = Some(norm);
        }
        if self.niter >= self.max_iter {
            return ConvergenceStatus::MaximumIterations;
        }
        ConvergenceStatus::Continue
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::DVector;

    use super::{Convergence, ConvergenceStatus};

    #[test]
    fn converges_on_zero_correction() {
        let atol = DVector::from_element(2, 1e-6);
        let mut convergence = Convergence::new(1e-6, &atol, 4);
        let y = DVector::from_vec(vec![1.0, 2.0]);
        let dy = DVector::zeros(2);
        assert_eq!(
            convergence.check_new_iteration(&dy, &y),
            ConvergenceStatus::Converged
        );
        assert_eq!(convergence.niter(), 1);
    }

    #[test]
    fn detects_divergence() {
        let atol = DVector::from_element(1, 1e-6);
        let mut convergence = Convergence::new(1e-6, &atol, 10);
        let y = DVector::from_vec(vec![1.0]);
        let first = DVector::from_vec(vec![1e-3]);
        let second = DVector::from_vec(vec![2e-3]);
        assert_eq!(
            convergence.check_new_iteration(&first, &y),
            ConvergenceStatus::Continue
        );
        assert_eq!(
            convergence.check_new_iteration(&second, &y),
            ConvergenceStatus::Diverged
        );
    }

    #[test]
    fn stops_at_max_iter() {
        let atol = DVector::from_element(1, 1e-6);
        let mut convergence = Convergence::new(1e-6, &atol, 1);
        let y = DVector::from_vec(vec![1.0]);
        let dy = DVector::from_vec(vec![1e-3]);
        assert_eq!(
            convergence.check_new_iteration(&dy, &y),
            ConvergenceStatus::MaximumIterations
        );
    }
}
