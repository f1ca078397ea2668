use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::{
    error::{OdeSolverError, OdeSysError},
    IntegrationInfo, IvpProblem, RkState, Solution,
};

#[derive(Debug, PartialEq)]
pub enum OdeSolverStopReason {
    InternalTimestep,
    /// A root was found at the given point, with the index of the root function component that crossed zero
    RootFound(f64, usize),
    TstopReached,
}

#[derive(Clone, Debug, Serialize, Default)]
pub struct SolverStatistics {
    pub number_of_linear_solver_setups: usize,
    pub number_of_steps: usize,
    pub number_of_error_test_failures: usize,
    pub number_of_nonlinear_solver_iterations: usize,
    pub number_of_nonlinear_solver_fails: usize,
}

/// Trait for the stepping methods behind the built-in integrators.
///
/// The solver owns its state and steps it forward, and can interpolate the solution anywhere
/// within the last accepted step. [Self::solve_adaptive] and [Self::solve_predefined] drive the
/// stepping for the two output modes of an [crate::OdeSys].
pub trait OdeSolverMethod<'a> {
    /// Get the current problem
    fn problem(&self) -> &'a IvpProblem<'a>;

    /// Get the current state of the solver
    fn state(&self) -> &RkState;

    /// Get the current order of accuracy of the solver
    fn order(&self) -> usize;

    fn statistics(&self) -> &SolverStatistics;

    /// Step the solution forward by one step, altering the internal state of the solver.
    /// The return value is a `Result` containing the reason for stopping the solver, possible reasons are:
    /// - `InternalTimestep`: The solver has taken a step forward, the internal state of the solver is at self.state().t
    /// - `RootFound(t_root, index)`: The solver has found a root at `t_root`. Note that the internal state of the solver is at the internal time step `self.state().t`, *not* at `t_root`.
    /// - `TstopReached`: The solver has reached the stop time set by [Self::set_stop_time], the internal state of the solver is at exactly `tstop`
    fn step(&mut self) -> Result<OdeSolverStopReason, OdeSysError>;

    /// Every root located within the last accepted step, in the order they were crossed. The
    /// first of them is the one reported by [OdeSolverStopReason::RootFound].
    fn step_roots(&self) -> &[(f64, usize)];

    /// Set a stop time for the solver. The solver will stop when the internal time reaches this time.
    /// Once it stops, the stop time is unset. If `tstop` is at or before the current internal time, an error is returned.
    fn set_stop_time(&mut self, tstop: f64) -> Result<(), OdeSysError>;

    /// Interpolate the solution at `t` and place in `y`. This should be within the last accepted step
    fn interpolate_inplace(&self, t: f64, y: &mut DVector<f64>) -> Result<(), OdeSysError>;

    fn interpolate(&self, t: f64) -> Result<DVector<f64>, OdeSysError> {
        let mut y = DVector::zeros(self.problem().nstates());
        self.interpolate_inplace(t, &mut y)?;
        Ok(y)
    }

    /// Diagnostics of the integration so far, without the root information.
    fn info(&self) -> IntegrationInfo {
        let stats = self.statistics();
        IntegrationInfo {
            success: true,
            nfev: self.problem().nfev(),
            njev: self.problem().njev(),
            nsteps: stats.number_of_steps,
            n_error_test_failures: stats.number_of_error_test_failures,
            n_nonlinear_solver_iterations: stats.number_of_nonlinear_solver_iterations,
            n_nonlinear_solver_fails: stats.number_of_nonlinear_solver_fails,
            n_linear_solver_setups: stats.number_of_linear_solver_setups,
            ..Default::default()
        }
    }

    /// Integrate from the current state to `xend`, reporting every accepted step.
    ///
    /// A root found within a step is inserted into the output and its row recorded in
    /// `root_indices`, several per step if need be. If `return_on_root` is set, integration
    /// stops at the first root.
    /// At most `nsteps` steps are taken.
    fn solve_adaptive(
        &mut self,
        xend: f64,
        nsteps: usize,
        return_on_root: bool,
    ) -> Result<Solution, OdeSysError> {
        let mut xout = vec![self.state().t];
        let mut rows = vec![self.state().y.clone()];
        let mut root_x = Vec::new();
        let mut root_components = Vec::new();
        let mut root_indices = Vec::new();

        self.set_stop_time(xend)?;
        let mut nstep = 0;
        loop {
            if nstep >= nsteps {
                return Err(OdeSysError::from(OdeSolverError::TooManySteps {
                    nsteps,
                    time: self.state().t,
                }));
            }
            let reason = self.step()?;
            nstep += 1;
            match reason {
                OdeSolverStopReason::InternalTimestep => {
                    xout.push(self.state().t);
                    rows.push(self.state().y.clone());
                }
                OdeSolverStopReason::TstopReached => {
                    xout.push(self.state().t);
                    rows.push(self.state().y.clone());
                    break;
                }
                OdeSolverStopReason::RootFound(..) => {
                    let nroots = if return_on_root { 1 } else { usize::MAX };
                    let mut t_last = self.state().t;
                    for &(t_root, component) in self.step_roots().iter().take(nroots) {
                        root_x.push(t_root);
                        root_components.push(component);
                        root_indices.push(xout.len());
                        xout.push(t_root);
                        rows.push(self.interpolate(t_root)?);
                        t_last = t_root;
                    }
                    if return_on_root {
                        break;
                    }
                    if t_last != self.state().t {
                        xout.push(self.state().t);
                        rows.push(self.state().y.clone());
                    }
                    if self.state().t == xend {
                        break;
                    }
                }
            }
        }

        let yout = DMatrix::from_fn(rows.len(), self.problem().nstates(), |i, j| rows[i][j]);
        let info = IntegrationInfo {
            root_x,
            root_components,
            root_indices,
            ..self.info()
        };
        Ok(Solution { xout, yout, info })
    }

    /// Integrate from the current state through the points of `xout` (the first of which must
    /// be the current point), reporting the interpolated solution at each of them.
    ///
    /// Roots are located and recorded but do not change the output. At most `nsteps` steps are
    /// taken between two consecutive output points.
    fn solve_predefined(&mut self, xout: &[f64], nsteps: usize) -> Result<Solution, OdeSysError> {
        let n = xout.len();
        let mut yout = DMatrix::zeros(n, self.problem().nstates());
        yout.set_row(0, &self.state().y.transpose());
        let mut root_x = Vec::new();
        let mut root_components = Vec::new();

        let xend = xout[n - 1];
        let forward = xend > xout[0];
        self.set_stop_time(xend)?;
        for (i, &x) in xout.iter().enumerate().skip(1) {
            let mut nstep = 0;
            while (forward && self.state().t < x) || (!forward && self.state().t > x) {
                if nstep >= nsteps {
                    return Err(OdeSysError::from(OdeSolverError::TooManySteps {
                        nsteps,
                        time: self.state().t,
                    }));
                }
                if let OdeSolverStopReason::RootFound(..) = self.step()? {
                    for &(t_root, component) in self.step_roots() {
                        root_x.push(t_root);
                        root_components.push(component);
                    }
                }
                nstep += 1;
            }
            let y = self.interpolate(x)?;
            yout.set_row(i, &y.transpose());
        }

        let info = IntegrationInfo {
            root_x,
            root_components,
            ..self.info()
        };
        Ok(Solution {
            xout: xout.to_vec(),
            yout,
            info,
        })
    }
}
