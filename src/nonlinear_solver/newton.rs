use nalgebra::{DMatrix, DVector};

use crate::{
    error::{NonLinearSolverError, OdeSysError},
    non_linear_solver_error, Convergence, ConvergenceStatus, LinearSolver, NonLinearSolver,
};

pub fn newton_iteration(
    xn: &mut DVector<f64>,
    tmp: &mut DVector<f64>,
    error_y: &DVector<f64>,
    mut fun: impl FnMut(&DVector<f64>, &mut DVector<f64>),
    linear_solver: impl Fn(&mut DVector<f64>) -> Result<(), OdeSysError>,
    convergence: &mut Convergence,
) -> Result<(), OdeSysError> {
    convergence.reset();
    loop {
        fun(xn, tmp);
        //tmp = f_at_n

        linear_solver(tmp)?;
        //tmp = -delta_n

        *xn -= &*tmp;
        // xn = xn + delta_n

        let res = convergence.check_new_iteration(tmp, error_y);
        match res {
            ConvergenceStatus::Continue => continue,
            ConvergenceStatus::Converged => return Ok(()),
            ConvergenceStatus::Diverged => break,
            ConvergenceStatus::MaximumIterations => break,
        }
    }
    Err(non_linear_solver_error!(NewtonDidNotConverge))
}

pub struct NewtonNonlinearSolver<Ls: LinearSolver> {
    linear_solver: Ls,
    is_jacobian_set: bool,
    tmp: DVector<f64>,
}

impl<Ls: LinearSolver> NewtonNonlinearSolver<Ls> {
    pub fn new(linear_solver: Ls) -> Self {
        Self {
            linear_solver,
            is_jacobian_set: false,
            tmp: DVector::zeros(0),
        }
    }
    pub fn linear_solver(&self) -> &Ls {
        &self.linear_solver
    }
}

impl<Ls: LinearSolver> Default for NewtonNonlinearSolver<Ls> {
    fn default() -> Self {
        Self::new(Ls::default())
    }
}

impl<Ls: LinearSolver> NonLinearSolver for NewtonNonlinearSolver<Ls> {
    fn clear_jacobian(&mut self) {
        self.is_jacobian_set = false;
    }

    fn is_jacobian_set(&self) -> bool {
        self.is_jacobian_set
    }

    fn reset_jacobian(&mut self, jacobian: DMatrix<f64>) {
        self.tmp = DVector::zeros(jacobian.nrows());
        self.linear_solver.set_matrix(jacobian);
        self.is_jacobian_set = true;
    }

    fn solve_linearised_in_place(&self, x: &mut DVector<f64>) -> Result<(), OdeSysError> {
        self.linear_solver.solve_in_place(x)
    }

    fn solve_in_place(
        &mut self,
        fun: impl FnMut(&DVector<f64>, &mut DVector<f64>),
        xn: &mut DVector<f64>,
        error_y: &DVector<f64>,
        convergence: &mut Convergence,
    ) -> Result<(), OdeSysError> {
        if !self.is_jacobian_set {
            return Err(non_linear_solver_error!(JacobianNotReset));
        }
        if xn.len() != self.tmp.len() {
            let error = NonLinearSolverError::WrongStateLength {
                expected: self.tmp.len(),
                found: xn.len(),
            };
            return Err(OdeSysError::from(error));
        }
        let linear_solver = |x: &mut DVector<f64>| self.linear_solver.solve_in_place(x);
        newton_iteration(xn, &mut self.tmp, error_y, fun, linear_solver, convergence)
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::{DMatrix, DVector};

    use crate::{Convergence, NalgebraLU, NewtonNonlinearSolver, NonLinearSolver};

    #[test]
    fn test_newton_quadratic() {
        // F(x) = x^2 - 4, solved from x = 3 with the jacobian frozen at x = 3
        let mut solver = NewtonNonlinearSolver::<NalgebraLU>::default();
        solver.reset_jacobian(DMatrix::from_element(1, 1, 6.0));
        let atol = DVector::from_element(1, 1e-10);
        let mut convergence = Convergence::new(1e-10, &atol, 50);
        let mut x = DVector::from_element(1, 3.0);
        let error_y = x.clone();
        solver
            .solve_in_place(
                |x, f| f[0] = x[0] * x[0] - 4.0,
                &mut x,
                &error_y,
                &mut convergence,
            )
            .unwrap();
        assert!((x[0] - 2.0).abs() < 1e-8);
    }

    #[test]
    fn test_newton_requires_jacobian() {
        let mut solver = NewtonNonlinearSolver::<NalgebraLU>::default();
        let atol = DVector::from_element(1, 1e-10);
        let mut convergence = Convergence::new(1e-10, &atol, 10);
        let mut x = DVector::from_element(1, 3.0);
        let error_y = x.clone();
        let result = solver.solve_in_place(|x, f| f.copy_from(x), &mut x, &error_y, &mut convergence);
        assert!(result.is_err());
    }
}
