use nalgebra::{DMatrix, DVector};

use crate::error::OdeSysError;

pub mod lu;

pub use lu::LU as NalgebraLU;

/// A solver for the linear problem `Ax = b`, where `A` is the matrix given to [LinearSolver::set_matrix]
pub trait LinearSolver: Default {
    /// Set (and factorise) the matrix to be solved, any previous matrix is discarded.
    fn set_matrix(&mut self, matrix: DMatrix<f64>);

    /// Solve the problem `Ax = b` and return the solution `x`.
    fn solve(&self, b: &DVector<f64>) -> Result<DVector<f64>, OdeSysError> {
        let mut b = b.clone();
        self.solve_in_place(&mut b)?;
        Ok(b)
    }

    fn solve_in_place(&self, b: &mut DVector<f64>) -> Result<(), OdeSysError>;
}
