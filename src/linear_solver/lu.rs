use nalgebra::{DMatrix, DVector, Dyn};

use crate::{
    error::{LinearSolverError, OdeSysError},
    linear_solver_error, LinearSolver,
};

/// A [LinearSolver] that uses the LU decomposition in the [`nalgebra` library](https://nalgebra.org/) to solve the linear system.
#[derive(Clone, Default)]
pub struct LU {
    nrows: usize,
    lu: Option<nalgebra::LU<f64, Dyn, Dyn>>,
}

impl LinearSolver for LU {
    fn set_matrix(&mut self, matrix: DMatrix<f64>) {
        self.nrows = matrix.nrows();
        self.lu = Some(matrix.lu());
    }

    fn solve_in_place(&self, state: &mut DVector<f64>) -> Result<(), OdeSysError> {
        let lu = self
            .lu
            .as_ref()
            .ok_or_else(|| linear_solver_error!(LuNotInitialized))?;
        if self.nrows != state.len() {
            return Err(linear_solver_error!(LinearSolverMatrixVectorNotCompatible));
        }
        match lu.solve_mut(state) {
            true => Ok(()),
            false => Err(linear_solver_error!(LuSolveFailed)),
        }
    }
}
