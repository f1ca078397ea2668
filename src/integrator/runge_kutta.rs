use nalgebra::{DMatrix, DVector};

use crate::{
    error::{OdeSolverError, OdeSysError},
    ode_solver_error,
    vector::squared_norm,
    Convergence, IvpProblem, NonLinearSolver, OdeSolverStopReason, RkState, RootFinder,
    SolverStatistics, Tableau,
};

/// A Runge-Kutta method.
///
/// The particular method is defined by the [Tableau] used to create the solver.
/// If the `beta` matrix of the [Tableau] is present this is used for interpolation, otherwise hermite interpolation is used.
///
/// Column `i` of `diff` holds `h * k_i` for stage `i` of the last step attempt.
#[derive(Clone)]
pub struct Rk<'a> {
    problem: &'a IvpProblem<'a>,
    tableau: Tableau,
    state: RkState,
    old_state: RkState,
    a_rows: Vec<DVector<f64>>,
    statistics: SolverStatistics,
    root_finder: Option<RootFinder>,
    step_roots: Vec<(f64, usize)>,
    tstop: Option<f64>,
    diff: DMatrix<f64>,
    error: DVector<f64>,
    atol: DVector<f64>,
    rtol: f64,
}

impl<'a> Rk<'a> {
    pub(crate) fn new(
        problem: &'a IvpProblem<'a>,
        state: RkState,
        tableau: Tableau,
        atol: DVector<f64>,
        rtol: f64,
    ) -> Result<Self, OdeSysError> {
        let nstates = problem.nstates();
        if state.y.len() != nstates {
            return Err(ode_solver_error!(
                Other,
                format!(
                    "State has {} components, problem has {}",
                    state.y.len(),
                    nstates
                )
            ));
        }

        let s = tableau.s();
        let a_rows: Vec<DVector<f64>> = (0..s)
            .map(|i| DVector::from_fn(i, |j, _| tableau.a()[(i, j)]))
            .collect();

        let root_finder = if problem.has_roots() {
            let root_finder = RootFinder::new(problem.nroots(), nstates);
            root_finder.init(
                &|y: &DVector<f64>, t: f64, g: &mut DVector<f64>| problem.root_inplace(y, t, g),
                &state.y,
                state.t,
            );
            Some(root_finder)
        } else {
            None
        };

        Ok(Self {
            problem,
            diff: DMatrix::zeros(nstates, s),
            error: DVector::zeros(nstates),
            old_state: state.clone(),
            state,
            tableau,
            a_rows,
            statistics: SolverStatistics::default(),
            root_finder,
            step_roots: Vec::new(),
            tstop: None,
            atol,
            rtol,
        })
    }

    pub(crate) fn check_explicit_rk(tableau: &Tableau) -> Result<(), OdeSysError> {
        // check that the upper triangular and diagonal parts of a are zero
        let s = tableau.s();
        for i in 0..s {
            for j in i..s {
                if tableau.a()[(i, j)] != 0.0 {
                    return Err(ode_solver_error!(
                        InvalidTableau,
                        format!(
                            "Invalid tableau, expected a(i, j) = 0 for i >= j, but found a({}, {}) = {}",
                            i,
                            j,
                            tableau.a()[(i, j)]
                        )
                    ));
                }
            }
        }
        Self::check_stiffly_accurate(tableau)?;

        // check that first c is 0
        if tableau.c()[0] != 0.0 {
            return Err(ode_solver_error!(
                InvalidTableau,
                "Invalid tableau, expected c(0) = 0"
            ));
        }
        Ok(())
    }

    pub(crate) fn check_sdirk_rk(tableau: &Tableau) -> Result<(), OdeSysError> {
        // check that the upper triangular part of a is zero
        let s = tableau.s();
        for i in 0..s {
            for j in (i + 1)..s {
                if tableau.a()[(i, j)] != 0.0 {
                    return Err(ode_solver_error!(
                        InvalidTableau,
                        "Invalid tableau, expected a(i, j) = 0 for i > j"
                    ));
                }
            }
        }
        let gamma = tableau.a()[(1, 1)];
        for i in 1..s {
            if tableau.a()[(i, i)] != gamma {
                return Err(ode_solver_error!(
                    InvalidTableau,
                    format!("Invalid tableau, expected a(i, i) = gamma = {gamma} for i = 1..s-1")
                ));
            }
        }
        // a(0, 0) = gamma for SDIRK methods, a(0, 0) = 0 for ESDIRK methods
        let a00 = tableau.a()[(0, 0)];
        if a00 != 0.0 && a00 != gamma {
            return Err(ode_solver_error!(
                InvalidTableau,
                "Invalid tableau, expected a(0, 0) = 0 or a(0, 0) = gamma"
            ));
        }
        Self::check_stiffly_accurate(tableau)?;

        if a00 == 0.0 && tableau.c()[0] != 0.0 {
            return Err(ode_solver_error!(
                InvalidTableau,
                "Invalid tableau, expected c(0) = 0 for esdirk methods"
            ));
        }
        Ok(())
    }

    fn check_stiffly_accurate(tableau: &Tableau) -> Result<(), OdeSysError> {
        let s = tableau.s();
        for i in 0..s {
            if tableau.a()[(s - 1, i)] != tableau.b()[i] {
                return Err(ode_solver_error!(
                    InvalidTableau,
                    "Invalid tableau, expected a(s-1, i) = b(i)"
                ));
            }
        }
        if tableau.c()[s - 1] != 1.0 {
            return Err(ode_solver_error!(
                InvalidTableau,
                "Invalid tableau, expected c(s-1) = 1"
            ));
        }
        Ok(())
    }

    pub(crate) fn skip_first_stage(&self) -> bool {
        self.tableau.a()[(0, 0)] == 0.0
    }

    pub(crate) fn tableau(&self) -> &Tableau {
        &self.tableau
    }

    pub(crate) fn statistics(&self) -> &SolverStatistics {
        &self.statistics
    }

    pub(crate) fn statistics_mut(&mut self) -> &mut SolverStatistics {
        &mut self.statistics
    }

    pub(crate) fn order(&self) -> usize {
        self.tableau.order()
    }

    pub(crate) fn problem(&self) -> &'a IvpProblem<'a> {
        self.problem
    }

    pub(crate) fn state(&self) -> &RkState {
        &self.state
    }

    pub(crate) fn step_roots(&self) -> &[(f64, usize)] {
        &self.step_roots
    }

    pub(crate) fn set_stop_time(&mut self, tstop: f64) -> Result<(), OdeSysError> {
        self.tstop = Some(tstop);
        if let Some(OdeSolverStopReason::TstopReached) = self.handle_tstop(tstop)? {
            self.tstop = None;
            return Err(ode_solver_error!(StopTimeAtCurrentTime));
        }
        Ok(())
    }

    pub(crate) fn start_step(&self) -> f64 {
        self.state.h
    }

    pub(crate) fn factor(
        &self,
        error_norm: f64,
        safety_factor: f64,
        min_factor: f64,
        max_factor: f64,
    ) -> f64 {
        let safety = 0.9 * safety_factor;
        let factor = safety * error_norm.powf(-0.5 / (self.order() as f64 + 1.0));
        if factor.is_nan() || factor < min_factor {
            min_factor
        } else if factor > max_factor {
            max_factor
        } else {
            factor
        }
    }

    /// For FSAL methods the first stage is the derivative at the end of the previous step.
    pub(crate) fn start_step_attempt(&mut self, h: f64) {
        if self.skip_first_stage() {
            self.diff.column_mut(0).axpy(h, &self.state.dy, 0.0);
        }
    }

    pub(crate) fn do_stage(&mut self, i: usize, h: f64) {
        let t = self.state.t + self.tableau.c()[i] * h;

        self.old_state.y.copy_from(&self.state.y);
        self.old_state
            .y
            .gemv(1.0, &self.diff.columns(0, i), &self.a_rows[i], 1.0);

        // update diff with solved dy
        self.problem
            .rhs_inplace(&self.old_state.y, t, &mut self.old_state.dy);
        self.diff.column_mut(i).axpy(h, &self.old_state.dy, 0.0);
    }

    fn predict_stage_sdirk(
        i: usize,
        h: f64,
        dy0: &DVector<f64>,
        diff: &DMatrix<f64>,
        dy: &mut DVector<f64>,
        tableau: &Tableau,
    ) {
        if i == 0 {
            dy.axpy(h, dy0, 0.0);
        } else if i == 1 {
            dy.copy_from(&diff.column(i - 1));
        } else {
            let c = (tableau.c()[i] - tableau.c()[i - 2]) / (tableau.c()[i - 1] - tableau.c()[i - 2]);
            // dy = c1  + c * (c1 - c2)
            dy.copy_from(&diff.column(i - 1));
            dy.axpy(-c, &diff.column(i - 2), 1.0 + c);
        }
    }

    /// Solve stage `i` of an implicit step, `dy - h f(t_i, phi + gamma dy) = 0`, where `phi` is
    /// the contribution of the previous stages. The nonlinear solver must hold the factorised
    /// `I - h gamma J`. Returns the number of newton iterations used.
    pub(crate) fn do_stage_sdirk(
        &mut self,
        i: usize,
        h: f64,
        nonlinear_solver: &mut impl NonLinearSolver,
        max_iter: usize,
    ) -> Result<usize, OdeSysError> {
        let t = self.state.t + self.tableau.c()[i] * h;
        let gamma = self.tableau.a()[(i, i)];
        let problem = self.problem;

        let mut phi = self.state.y.clone();
        phi.gemv(1.0, &self.diff.columns(0, i), &self.a_rows[i], 1.0);

        Self::predict_stage_sdirk(
            i,
            h,
            &self.state.dy,
            &self.diff,
            &mut self.old_state.dy,
            &self.tableau,
        );

        let mut y_stage = phi.clone();
        let fun = |x: &DVector<f64>, out: &mut DVector<f64>| {
            y_stage.copy_from(&phi);
            y_stage.axpy(gamma, x, 1.0);
            problem.rhs_inplace(&y_stage, t, out);
            // out = x - h * f
            out.axpy(1.0, x, -h);
        };
        let mut convergence = Convergence::new(self.rtol, &self.atol, max_iter);
        let solve_result = nonlinear_solver.solve_in_place(
            fun,
            &mut self.old_state.dy,
            &self.state.y,
            &mut convergence,
        );
        let niter = convergence.niter();
        self.statistics.number_of_nonlinear_solver_iterations += niter;
        solve_result?;

        self.old_state.y.copy_from(&phi);
        self.old_state.y.axpy(gamma, &self.old_state.dy, 1.0);

        // update diff with solved dy
        self.diff.column_mut(i).copy_from(&self.old_state.dy);
        Ok(niter)
    }

    fn handle_tstop(&mut self, tstop: f64) -> Result<Option<OdeSolverStopReason>, OdeSysError> {
        let state = &mut self.state;
        // check if the we are at tstop
        let troundoff = 100.0 * f64::EPSILON * (state.t.abs() + state.h.abs());
        if (state.t - tstop).abs() <= troundoff {
            return Ok(Some(OdeSolverStopReason::TstopReached));
        } else if (state.h > 0.0 && tstop < state.t - troundoff)
            || (state.h < 0.0 && tstop > state.t + troundoff)
        {
            return Err(OdeSysError::from(
                OdeSolverError::StopTimeBeforeCurrentTime {
                    stop_time: tstop,
                    state_time: state.t,
                },
            ));
        }

        // check if the next step will be beyond tstop, if so adjust the step size
        if (state.h > 0.0 && state.t + state.h > tstop + troundoff)
            || (state.h < 0.0 && state.t + state.h < tstop - troundoff)
        {
            let factor = (tstop - state.t) / state.h;
            state.h *= factor;
        }
        Ok(None)
    }

    pub(crate) fn error_norm(&mut self) -> f64 {
        self.error.gemv(1.0, &self.diff, self.tableau.d(), 0.0);
        squared_norm(&self.error, &self.state.y, &self.atol, self.rtol)
    }

    pub(crate) fn error_test_fail(
        &mut self,
        h: f64,
        nattempts: usize,
        max_error_test_fails: usize,
        min_timestep: f64,
    ) -> Result<(), OdeSysError> {
        self.statistics.number_of_error_test_failures += 1;
        // if too many error test failures, then fail
        if nattempts >= max_error_test_fails {
            return Err(OdeSysError::from(
                OdeSolverError::TooManyErrorTestFailures { time: self.state.t },
            ));
        }
        // if step size too small, then fail
        if h.abs() < min_timestep {
            return Err(OdeSysError::from(OdeSolverError::StepSizeTooSmall {
                time: self.state.t,
            }));
        }
        Ok(())
    }

    pub(crate) fn solve_fail(&mut self, h: f64, min_timestep: f64) -> Result<(), OdeSysError> {
        self.statistics.number_of_nonlinear_solver_fails += 1;
        // if step size too small, then fail
        if h.abs() < min_timestep {
            return Err(OdeSysError::from(OdeSolverError::StepSizeTooSmall {
                time: self.state.t,
            }));
        }
        Ok(())
    }

    pub(crate) fn step_accepted(
        &mut self,
        h: f64,
        new_h: f64,
        rescale_dy: bool,
    ) -> Result<OdeSolverStopReason, OdeSysError> {
        // take the step
        self.old_state.t = self.state.t + h;
        self.old_state.h = new_h;
        if rescale_dy {
            self.old_state.dy /= h;
        }
        std::mem::swap(&mut self.old_state, &mut self.state);

        self.statistics.number_of_steps += 1;

        // collect every root within the accepted step, in order
        let mut roots = Vec::new();
        if let Some(root_finder) = self.root_finder.as_ref() {
            let problem = self.problem;
            let root_fn =
                |y: &DVector<f64>, t: f64, g: &mut DVector<f64>| problem.root_inplace(y, t, g);
            let forward = self.state.t > self.old_state.t;
            while let Some((t_root, index)) = root_finder.check_root(
                &|t, y| self.interpolate_inplace(t, y),
                &root_fn,
                &self.state.y,
                self.state.t,
            )? {
                let advanced = match roots.last() {
                    Some(&(t_last, _)) if forward => t_root > t_last,
                    Some(&(t_last, _)) => t_root < t_last,
                    None => true,
                };
                if !advanced {
                    // search is stuck, start the next step's search from the end of this one
                    root_finder.init(&root_fn, &self.state.y, self.state.t);
                    break;
                }
                roots.push((t_root, index));
                if t_root == self.state.t {
                    break;
                }
            }
        }
        self.step_roots = roots;

        // check if the we are at tstop, snapping onto it if so
        let mut tstop_reached = false;
        if let Some(tstop) = self.tstop {
            if let Some(OdeSolverStopReason::TstopReached) = self.handle_tstop(tstop)? {
                self.state.t = tstop;
                self.tstop = None;
                tstop_reached = true;
            }
        }

        Ok(match (self.step_roots.first(), tstop_reached) {
            (Some(&(t_root, index)), _) => OdeSolverStopReason::RootFound(t_root, index),
            (None, true) => OdeSolverStopReason::TstopReached,
            (None, false) => OdeSolverStopReason::InternalTimestep,
        })
    }

    fn interpolate_beta_function(theta: f64, beta: &DMatrix<f64>) -> DVector<f64> {
        let poly_order = beta.ncols();
        let mut thetav = DVector::zeros(poly_order);
        let mut power = theta;
        for i in 0..poly_order {
            thetav[i] = power;
            power *= theta;
        }
        beta * thetav
    }

    fn interpolate_hermite(
        theta: f64,
        u0: &DVector<f64>,
        u1: &DVector<f64>,
        diff: &DMatrix<f64>,
        y: &mut DVector<f64>,
    ) {
        let f0 = diff.column(0);
        let f1 = diff.column(diff.ncols() - 1);

        y.copy_from(u1);
        *y -= u0;
        y.axpy(theta - 1.0, &f0, 1.0 - 2.0 * theta);
        y.axpy(theta, &f1, 1.0);
        y.axpy(1.0 - theta, u0, theta * (theta - 1.0));
        y.axpy(theta, u1, 1.0);
    }

    pub(crate) fn interpolate_inplace(
        &self,
        t: f64,
        ret: &mut DVector<f64>,
    ) -> Result<(), OdeSysError> {
        if ret.len() != self.state.y.len() {
            return Err(OdeSysError::from(
                OdeSolverError::InterpolationVectorWrongSize {
                    expected: self.state.y.len(),
                    found: ret.len(),
                },
            ));
        }
        if self.statistics.number_of_steps == 0 {
            if t == self.state.t {
                ret.copy_from(&self.state.y);
                return Ok(());
            } else {
                return Err(ode_solver_error!(InterpolationTimeOutsideCurrentStep));
            }
        }

        // check that t is within the current step depending on the direction
        let is_forward = self.state.t > self.old_state.t;
        if (is_forward && (t > self.state.t || t < self.old_state.t))
            || (!is_forward && (t < self.state.t || t > self.old_state.t))
        {
            return Err(ode_solver_error!(InterpolationTimeOutsideCurrentStep));
        }

        let dt = self.state.t - self.old_state.t;
        let theta = if dt == 0.0 {
            1.0
        } else {
            (t - self.old_state.t) / dt
        };
        if let Some(beta) = self.tableau.beta() {
            // ret = old_y + sum_i beta_i(theta) * diff[:, i]
            let beta_f = Self::interpolate_beta_function(theta, beta);
            ret.copy_from(&self.old_state.y);
            ret.gemv(1.0, &self.diff, &beta_f, 1.0);
        } else {
            Self::interpolate_hermite(theta, &self.old_state.y, &self.state.y, &self.diff, ret);
        }
        Ok(())
    }
}
