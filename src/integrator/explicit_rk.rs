use log::trace;
use nalgebra::DVector;

use super::runge_kutta::Rk;
use crate::{
    error::OdeSysError, ExplicitRkConfig, IvpProblem, OdeSolverMethod, OdeSolverStopReason,
    RkState, SolverStatistics, Tableau,
};

/// An explicit Runge-Kutta method.
///
/// The particular method is defined by the [Tableau] used to create the solver.
/// If the `beta` matrix of the [Tableau] is present this is used for interpolation, otherwise hermite interpolation is used.
///
/// Restrictions:
/// - The upper triangular and diagonal parts of the `a` matrix must be zero (i.e. explicit).
/// - The last row of the `a` matrix must be the same as the `b` vector, and the last element of the `c` vector must be 1 (i.e. a stiffly accurate method)
#[derive(Clone)]
pub struct ExplicitRk<'a> {
    rk: Rk<'a>,
    config: ExplicitRkConfig,
}

impl<'a> ExplicitRk<'a> {
    pub fn new(
        problem: &'a IvpProblem<'a>,
        state: RkState,
        tableau: Tableau,
        atol: DVector<f64>,
        rtol: f64,
    ) -> Result<Self, OdeSysError> {
        Rk::check_explicit_rk(&tableau)?;
        Ok(Self {
            rk: Rk::new(problem, state, tableau, atol, rtol)?,
            config: ExplicitRkConfig::default(),
        })
    }

    pub fn config(&self) -> &ExplicitRkConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ExplicitRkConfig {
        &mut self.config
    }
}

impl<'a> OdeSolverMethod<'a> for ExplicitRk<'a> {
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

        // loop until step is accepted
        let mut nattempts = 0;
        let factor = loop {
            // start a step attempt
            self.rk.start_step_attempt(h);
            for i in 1..self.rk.tableau().s() {
                self.rk.do_stage(i, h);
            }
            let error_norm = self.rk.error_norm();
            let factor = self.rk.factor(
                error_norm,
                1.0,
                self.config.minimum_timestep_shrink,
                self.config.maximum_timestep_growth,
            );
            if error_norm < 1.0 {
                break factor;
            }
            trace!(
                "step rejected at t = {}, h = {}, error = {}",
                self.rk.state().t,
                h,
                error_norm
            );
            h *= factor;
            nattempts += 1;
            self.rk.error_test_fail(
                h,
                nattempts,
                self.config.maximum_error_test_failures,
                self.config.minimum_timestep,
            )?;
        };
        self.rk.step_accepted(h, h * factor, false)
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

#[cfg(test)]
mod tests {
    use nalgebra::DVector;

    use crate::{
        test_models::{exponential_decay, harmonic_oscillator},
        ExplicitRk, IvpProblem, OdeSolverMethod, OdeSolverStopReason, RkState, Tableau,
    };

    fn solver<'a>(
        problem: &'a IvpProblem<'a>,
        y0: DVector<f64>,
        tableau: Tableau,
    ) -> ExplicitRk<'a> {
        let atol = DVector::from_element(problem.nstates(), 1e-8);
        let mut state = RkState::new(problem, y0, 0.0, 1.0);
        state.set_step_size(1.0, &atol, 1e-8, problem, tableau.order());
        ExplicitRk::new(problem, state, tableau, atol, 1e-8).unwrap()
    }

    #[test]
    fn dopri5_exponential_decay() {
        let (sys, p) = exponential_decay();
        let problem = IvpProblem::new(&sys, p, false).unwrap();
        let mut s = solver(&problem, DVector::from_vec(vec![1.0, 1.0]), Tableau::dopri5());
        s.set_stop_time(1.0).unwrap();
        let t_prev = loop {
            let t = s.state().t;
            if s.step().unwrap() == OdeSolverStopReason::TstopReached {
                break t;
            }
        };
        assert_eq!(s.state().t, 1.0);
        let expect = (-0.1_f64).exp();
        for i in 0..2 {
            assert!((s.state().y[i] - expect).abs() < 1e-7);
        }

        // dense output within the last step
        let t_mid = 0.5 * (t_prev + 1.0);
        let y_mid = s.interpolate(t_mid).unwrap();
        assert!((y_mid[0] - (-0.1 * t_mid).exp()).abs() < 1e-7);
        assert!(s.interpolate(1.5).is_err());
    }

    #[test]
    fn tsit45_harmonic_oscillator() {
        let (sys, p) = harmonic_oscillator();
        let problem = IvpProblem::new(&sys, p, false).unwrap();
        let mut s = solver(&problem, DVector::from_vec(vec![1.0, 0.0]), Tableau::tsit45());
        let xend = std::f64::consts::PI;
        s.set_stop_time(xend).unwrap();
        let mut nsteps = 0;
        while s.step().unwrap() != OdeSolverStopReason::TstopReached {
            nsteps += 1;
        }
        assert!(nsteps > 5);
        assert_eq!(s.state().t, xend);
        assert!((s.state().y[0] + 1.0).abs() < 1e-6);
        assert!(s.state().y[1].abs() < 1e-6);
    }

    #[test]
    fn stop_time_behind_state_is_an_error() {
        let (sys, p) = exponential_decay();
        let problem = IvpProblem::new(&sys, p, false).unwrap();
        let mut s = solver(&problem, DVector::from_vec(vec![1.0, 1.0]), Tableau::dopri5());
        assert!(s.set_stop_time(-1.0).is_err());
        assert!(s.set_stop_time(0.0).is_err());
    }
}
