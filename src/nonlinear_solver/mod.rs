use nalgebra::{DMatrix, DVector};

use crate::{error::OdeSysError, Convergence};

pub mod convergence;
pub mod newton;
pub mod root;

/// A solver for the nonlinear problem `F(x) = 0`.
pub trait NonLinearSolver: Default {
    fn is_jacobian_set(&self) -> bool;

    /// Reset the approximation of the Jacobian matrix of `F`.
    fn reset_jacobian(&mut self, jacobian: DMatrix<f64>);

    /// Clear the approximation of the Jacobian matrix.
    fn clear_jacobian(&mut self);

    /// Solve the problem `F(x) = 0` in place, starting from the value in `x`.
    /// `error_y` is the point used to weight the convergence norm.
    fn solve_in_place(
        &mut self,
        fun: impl FnMut(&DVector<f64>, &mut DVector<f64>),
        x: &mut DVector<f64>,
        error_y: &DVector<f64>,
        convergence: &mut Convergence,
    ) -> Result<(), OdeSysError>;

    /// Solve the linearised problem `J * x = b`, where `J` was set using [Self::reset_jacobian].
    /// The input `b` is provided in `x`, and the solution is returned in `x`.
    fn solve_linearised_in_place(&self, x: &mut DVector<f64>) -> Result<(), OdeSysError>;
}
