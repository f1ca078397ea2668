use log::trace;
use nalgebra::{DMatrix, DVector};

use super::jacobian_update::{JacobianUpdate, SolverState};
use super::runge_kutta::Rk;
use crate::{
    error::OdeSysError, IvpProblem, LinearSolver, NalgebraLU, NewtonNonlinearSolver,
    NonLinearSolver, OdeSolverMethod, OdeSolverStopReason, RkState, SdirkConfig,
    SolverStatistics, Tableau,
};

/// A singly diagonally implicit Runge-Kutta method. Can optionally have an explicit first stage for ESDIRK methods.
///
/// The particular method is defined by the [Tableau] used to create the solver.
/// If the `beta` matrix of the [Tableau] is present this is used for interpolation, otherwise hermite interpolation is used.
///
/// Restrictions:
/// - The upper triangular part of the `a` matrix must be zero (i.e. not fully implicit).
/// - The diagonal of the `a` matrix must be the same non-zero value for all rows (i.e. an SDIRK method), except for the first row which can be zero for ESDIRK methods.
/// - The last row of the `a` matrix must be the same as the `b` vector, and the last element of the `c` vector must be 1 (i.e. a stiffly accurate method)
pub struct Sdirk<'a, Ls: LinearSolver = NalgebraLU> {
    rk: Rk<'a>,
    nonlinear_solver: NewtonNonlinearSolver<Ls>,
    jacobian_update: JacobianUpdate,
    rhs_jacobian: DMatrix<f64>,
    gamma: f64,
    config: SdirkConfig,
}

impl<'a, Ls: LinearSolver> Sdirk<'a, Ls> {
    pub fn new(
        problem: &'a IvpProblem<'a>,
        state: RkState,
        tableau: Tableau,
        atol: DVector<f64>,
        rtol: f64,
        linear_solver: Ls,
    ) -> Result<Self, OdeSysError> {
        Rk::check_sdirk_rk(&tableau)?;
        let gamma = tableau.a()[(1, 1)];
        let nstates = problem.nstates();
        let rk = Rk::new(problem, state, tableau, atol, rtol)?;
        let h = rk.state().h;
        let mut ret = Self {
            rk,
            nonlinear_solver: NewtonNonlinearSolver::new(linear_solver),
            jacobian_update: JacobianUpdate::default(),
            rhs_jacobian: DMatrix::zeros(nstates, nstates),
            gamma,
            config: SdirkConfig::default(),
        };

        // setup linear solver for first step
        ret.update_rhs_jacobian();
        ret.update_iteration_matrix(h);
        ret.jacobian_update.update_rhs_jacobian();
        ret.jacobian_update.update_jacobian(h);
        Ok(ret)
    }

    pub fn config(&self) -> &SdirkConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SdirkConfig {
        &mut self.config
    }

    /// The right-hand side jacobian used by the current iteration matrix.
    pub fn rhs_jacobian(&self) -> &DMatrix<f64> {
        &self.rhs_jacobian
    }

    fn update_rhs_jacobian(&mut self) {
        let state = self.rk.state();
        self.rk
            .problem()
            .jacobian_inplace(&state.y, state.t, &mut self.rhs_jacobian);
    }

    /// Factorise `I - h gamma J` for the newton iteration.
    fn update_iteration_matrix(&mut self, h: f64) {
        let nstates = self.rhs_jacobian.nrows();
        let matrix = DMatrix::identity(nstates, nstates) - &self.rhs_jacobian * (h * self.gamma);
        self.nonlinear_solver.reset_jacobian(matrix);
        self.rk.statistics_mut().number_of_linear_solver_setups += 1;
    }

    fn jacobian_updates(&mut self, h: f64, state: SolverState) {
        if self.jacobian_update.check_rhs_jacobian_update(h, &state) {
            self.update_rhs_jacobian();
            self.update_iteration_matrix(h);
            self.jacobian_update.update_rhs_jacobian();
            self.jacobian_update.update_jacobian(h);
        } else if self.jacobian_update.check_jacobian_update(h, &state) {
            self.update_iteration_matrix(h);
            self.jacobian_update.update_jacobian(h);
        }
    }
}

impl<'a, Ls: LinearSolver> OdeSolverMethod<'a> for Sdirk<'a, Ls> {
    fn problem(&self) -> &'a IvpProblem<'a> {
        self.rk.problem()
    }

    fn state(&self) -> &RkState {
        self.rk.state()
    }

    fn order(&self) -> usize {
        self.rk.order()
    }

    fn statistics(&self) -> &SolverStatistics {
        self.rk.statistics()
    }

    fn step(&mut self) -> Result<OdeSolverStopReason, OdeSysError> {
        let mut h = self.rk.start_step();

        // the step size may have changed since the last factorisation
        self.jacobian_updates(h, SolverState::StepSuccess);

        // loop until step is accepted
        let mut nattempts = 0;
        let mut updated_jacobian = false;
        let start = if self.rk.skip_first_stage() { 1 } else { 0 };
        let max_iter = self.config.maximum_newton_iterations;
        let factor = 'step: loop {
            // start a step attempt
            self.rk.start_step_attempt(h);
            let mut niter = 0;
            for i in start..self.rk.tableau().s() {
                match self
                    .rk
                    .do_stage_sdirk(i, h, &mut self.nonlinear_solver, max_iter)
                {
                    Ok(n) => niter = n,
                    Err(err) => {
                        trace!("stage {} failed at t = {}: {}", i, self.rk.state().t, err);
                        if !updated_jacobian {
                            // newton iteration did not converge, so update jacobian and try again
                            updated_jacobian = true;
                            self.jacobian_updates(h, SolverState::FirstConvergenceFail);
                        } else {
                            // newton iteration did not converge and jacobian has been updated, so we reduce step size and try again
                            h *= 0.3;
                            self.jacobian_updates(h, SolverState::SecondConvergenceFail);
                        }
                        self.rk.solve_fail(h, self.config.minimum_timestep)?;
                        // try again....
                        continue 'step;
                    }
                }
            }
            let error_norm = self.rk.error_norm();

            let maxiter = max_iter as f64;
            let safety_factor = (2.0 * maxiter + 1.0) / (2.0 * maxiter + niter as f64);
            let factor = self.rk.factor(
                error_norm,
                safety_factor,
                self.config.minimum_timestep_shrink,
                self.config.maximum_timestep_growth,
            );
            if error_norm < 1.0 {
                break factor;
            }
            h *= factor;
            self.jacobian_updates(h, SolverState::ErrorTestFail);
            nattempts += 1;
            self.rk.error_test_fail(
                h,
                nattempts,
                self.config.maximum_error_test_failures,
                self.config.minimum_timestep,
            )?;
        };

        // accept the step
        self.jacobian_update.step();
        self.rk.step_accepted(h, h * factor, true)
    }

    fn step_roots(&self) -> &[(f64, usize)] {
        self.rk.step_roots()
    }

    fn set_stop_time(&mut self, tstop: f64) -> Result<(), OdeSysError> {
        self.rk.set_stop_time(tstop)
    }

    fn interpolate_inplace(&self, t: f64, y: &mut DVector<f64>) -> Result<(), OdeSysError> {
        self.rk.interpolate_inplace(t, y)
    }
}
