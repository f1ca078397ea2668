use std::{fmt, str::FromStr};

use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::{
    error::{OdeSolverError, OdeSysError, SystemError},
    ode_solver_error, system_error, NalgebraLU,
};

pub mod config;
pub mod explicit_rk;
mod jacobian_update;
pub mod method;
pub mod problem;
mod runge_kutta;
pub mod sdirk;
pub mod state;
pub mod tableau;

pub use config::{ExplicitRkConfig, SdirkConfig};
pub use explicit_rk::ExplicitRk;
pub use method::{OdeSolverMethod, OdeSolverStopReason, SolverStatistics};
pub use problem::IvpProblem;
pub use sdirk::Sdirk;
pub use state::RkState;
pub use tableau::Tableau;

/// Environment variable consulted for the integrator name when none is given explicitly.
pub const INTEGRATOR_ENV_VAR: &str = "ODESYS_INTEGRATOR";

/// Diagnostics of a single integration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegrationInfo {
    pub success: bool,
    pub integrator: String,
    pub nfev: usize,
    pub njev: usize,
    pub nsteps: usize,
    pub n_error_test_failures: usize,
    pub n_nonlinear_solver_iterations: usize,
    pub n_nonlinear_solver_fails: usize,
    pub n_linear_solver_setups: usize,
    /// Points at which a root function component crossed zero.
    pub root_x: Vec<f64>,
    /// Index of the root function component for each entry of `root_x`.
    pub root_components: Vec<usize>,
    /// Rows of the adaptive output holding the roots. Empty in predefined mode.
    pub root_indices: Vec<usize>,
    /// Wall time of the integration in seconds.
    pub time_wall: f64,
}

/// The raw output of an [Integrator]: one row of `yout` per point of `xout`.
#[derive(Debug, Clone)]
pub struct Solution {
    pub xout: Vec<f64>,
    pub yout: DMatrix<f64>,
    pub info: IntegrationInfo,
}

/// Absolute tolerance, either shared by all components or one per component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tolerance {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl Tolerance {
    pub fn to_vector(&self, nstates: usize) -> Result<DVector<f64>, OdeSysError> {
        match self {
            Tolerance::Scalar(atol) => Ok(DVector::from_element(nstates, *atol)),
            Tolerance::Vector(atol) => {
                if atol.len() != nstates {
                    return Err(OdeSysError::from(SystemError::WrongToleranceLength {
                        expected: nstates,
                        found: atol.len(),
                    }));
                }
                Ok(DVector::from_column_slice(atol))
            }
        }
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance::Scalar(1e-8)
    }
}

impl From<f64> for Tolerance {
    fn from(value: f64) -> Self {
        Tolerance::Scalar(value)
    }
}

impl From<Vec<f64>> for Tolerance {
    fn from(value: Vec<f64>) -> Self {
        Tolerance::Vector(value)
    }
}

/// Options for a single integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrateOptions {
    /// Built-in integrator to use, see [IntegratorKind::select] when unset.
    pub integrator: Option<IntegratorKind>,
    pub atol: Tolerance,
    pub rtol: f64,
    /// Magnitude of the first step, estimated from the initial derivative when unset.
    pub first_step: Option<f64>,
    /// Whether to use the analytic jacobian, see [resolve_jacobian].
    pub with_jacobian: Option<bool>,
    /// Report at the requested points even when only the two endpoints are given.
    pub force_predefined: bool,
    /// Maximum number of steps for an adaptive run, or between two output points of a predefined run.
    pub nsteps: usize,
    /// Stop an adaptive run at the first root.
    pub return_on_root: bool,
}

impl Default for IntegrateOptions {
    fn default() -> Self {
        Self {
            integrator: None,
            atol: Tolerance::default(),
            rtol: 1e-8,
            first_step: None,
            with_jacobian: None,
            force_predefined: false,
            nsteps: 500,
            return_on_root: false,
        }
    }
}

impl IntegrateOptions {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn integrator(mut self, integrator: IntegratorKind) -> Self {
        self.integrator = Some(integrator);
        self
    }
    pub fn atol(mut self, atol: impl Into<Tolerance>) -> Self {
        self.atol = atol.into();
        self
    }
    pub fn rtol(mut self, rtol: f64) -> Self {
        self.rtol = rtol;
        self
    }
    pub fn first_step(mut self, first_step: f64) -> Self {
        self.first_step = Some(first_step);
        self
    }
    pub fn with_jacobian(mut self, with_jacobian: bool) -> Self {
        self.with_jacobian = Some(with_jacobian);
        self
    }
    pub fn force_predefined(mut self, force_predefined: bool) -> Self {
        self.force_predefined = force_predefined;
        self
    }
    pub fn nsteps(mut self, nsteps: usize) -> Self {
        self.nsteps = nsteps;
        self
    }
    pub fn return_on_root(mut self, return_on_root: bool) -> Self {
        self.return_on_root = return_on_root;
        self
    }
}

/// Decide whether an integration uses the analytic jacobian.
///
/// Without an explicit choice the analytic jacobian is used when the backend needs a jacobian
/// and the system provides one. An explicit `true` for a system without one is rejected when
/// the [IvpProblem] is created.
pub fn resolve_jacobian(
    with_jacobian: Option<bool>,
    requires_jacobian: bool,
    has_jacobian: bool,
) -> bool {
    match with_jacobian {
        Some(with_jacobian) => with_jacobian,
        None => requires_jacobian && has_jacobian,
    }
}

/// An integration backend.
///
/// Implement this to integrate an [crate::OdeSys] with a custom method via
/// [crate::OdeSys::integrate_with]. The first row of the returned trajectory must be `y0`.
pub trait Integrator {
    fn name(&self) -> &str;

    /// Whether the backend uses the jacobian of the right-hand side.
    fn requires_jacobian(&self) -> bool;

    /// Integrate from `x0` to `xend`, reporting the points chosen by the integrator.
    fn integrate_adaptive(
        &self,
        problem: &IvpProblem,
        y0: &DVector<f64>,
        x0: f64,
        xend: f64,
        options: &IntegrateOptions,
    ) -> Result<Solution, OdeSysError>;

    /// Integrate through `xout`, reporting the solution at exactly those points.
    fn integrate_predefined(
        &self,
        problem: &IvpProblem,
        y0: &DVector<f64>,
        xout: &[f64],
        options: &IntegrateOptions,
    ) -> Result<Solution, OdeSysError>;
}

/// The built-in Runge-Kutta integrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegratorKind {
    /// Explicit Dormand-Prince 5(4).
    Dopri5,
    /// Explicit Tsitouras 5(4).
    Tsit45,
    /// Implicit TR-BDF2, second order.
    TrBdf2,
    /// Implicit ESDIRK 3(4).
    Esdirk34,
}

impl IntegratorKind {
    pub const ALL: [IntegratorKind; 4] = [
        IntegratorKind::Dopri5,
        IntegratorKind::Tsit45,
        IntegratorKind::TrBdf2,
        IntegratorKind::Esdirk34,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            IntegratorKind::Dopri5 => "dopri5",
            IntegratorKind::Tsit45 => "tsit45",
            IntegratorKind::TrBdf2 => "tr_bdf2",
            IntegratorKind::Esdirk34 => "esdirk34",
        }
    }

    pub fn is_implicit(&self) -> bool {
        matches!(self, IntegratorKind::TrBdf2 | IntegratorKind::Esdirk34)
    }

    pub fn tableau(&self) -> Tableau {
        match self {
            IntegratorKind::Dopri5 => Tableau::dopri5(),
            IntegratorKind::Tsit45 => Tableau::tsit45(),
            IntegratorKind::TrBdf2 => Tableau::tr_bdf2(),
            IntegratorKind::Esdirk34 => Tableau::esdirk34(),
        }
    }

    /// Pick the integrator: an explicit choice wins, then the value of [INTEGRATOR_ENV_VAR]
    /// (passed in as `env`), then `esdirk34` for systems with an analytic jacobian and `dopri5`
    /// otherwise.
    pub fn select(
        explicit: Option<IntegratorKind>,
        env: Option<&str>,
        has_jacobian: bool,
    ) -> Result<IntegratorKind, OdeSysError> {
        if let Some(kind) = explicit {
            return Ok(kind);
        }
        if let Some(name) = env.map(str::trim).filter(|name| !name.is_empty()) {
            return name.parse();
        }
        Ok(if has_jacobian {
            IntegratorKind::Esdirk34
        } else {
            IntegratorKind::Dopri5
        })
    }

    /// [Self::select] reading the environment.
    pub fn select_from_env(
        explicit: Option<IntegratorKind>,
        has_jacobian: bool,
    ) -> Result<IntegratorKind, OdeSysError> {
        let env = std::env::var(INTEGRATOR_ENV_VAR).ok();
        Self::select(explicit, env.as_deref(), has_jacobian)
    }
}

impl fmt::Display for IntegratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IntegratorKind {
    type Err = OdeSysError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IntegratorKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ode_solver_error!(UnknownIntegrator, s))
    }
}

/// [Integrator] backed by the built-in Runge-Kutta methods.
#[derive(Debug, Clone)]
pub struct RungeKuttaIntegrator {
    kind: IntegratorKind,
    explicit_config: ExplicitRkConfig,
    sdirk_config: SdirkConfig,
}

impl RungeKuttaIntegrator {
    pub fn new(kind: IntegratorKind) -> Self {
        Self {
            kind,
            explicit_config: ExplicitRkConfig::default(),
            sdirk_config: SdirkConfig::default(),
        }
    }

    pub fn kind(&self) -> IntegratorKind {
        self.kind
    }

    pub fn with_explicit_config(mut self, config: ExplicitRkConfig) -> Self {
        self.explicit_config = config;
        self
    }

    pub fn with_sdirk_config(mut self, config: SdirkConfig) -> Self {
        self.sdirk_config = config;
        self
    }

    /// Create the solver for this integrator at `(y0, x0)`, heading towards `xend`, and run `f` on it.
    fn drive<'a>(
        &self,
        problem: &'a IvpProblem<'a>,
        y0: &DVector<f64>,
        x0: f64,
        xend: f64,
        options: &IntegrateOptions,
        f: impl FnOnce(&mut dyn OdeSolverMethod<'a>) -> Result<Solution, OdeSysError>,
    ) -> Result<Solution, OdeSysError> {
        let nstates = problem.nstates();
        if y0.len() != nstates {
            return Err(OdeSysError::from(SystemError::WrongInitialStateLength {
                expected: nstates,
                found: y0.len(),
            }));
        }
        let atol = options.atol.to_vector(nstates)?;
        let tableau = self.kind.tableau();

        let direction = if xend < x0 { -1.0 } else { 1.0 };
        let mut state = RkState::new(problem, y0.clone(), x0, direction);
        match options.first_step {
            Some(h) if h != 0.0 => state.h = direction * h.abs(),
            _ => state.set_step_size(direction, &atol, options.rtol, problem, tableau.order()),
        }
        debug!(
            "integrating with {} from {} to {}, first step {}",
            self.kind, x0, xend, state.h
        );

        let mut solution = if self.kind.is_implicit() {
            let mut solver = Sdirk::new(
                problem,
                state,
                tableau,
                atol,
                options.rtol,
                NalgebraLU::default(),
            )?;
            *solver.config_mut() = self.sdirk_config.clone();
            f(&mut solver)?
        } else {
            let mut solver = ExplicitRk::new(problem, state, tableau, atol, options.rtol)?;
            *solver.config_mut() = self.explicit_config.clone();
            f(&mut solver)?
        };
        solution.info.integrator = self.kind.to_string();
        debug!(
            "{} finished after {} steps and {} right-hand side evaluations",
            self.kind, solution.info.nsteps, solution.info.nfev
        );
        Ok(solution)
    }
}

impl Integrator for RungeKuttaIntegrator {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn requires_jacobian(&self) -> bool {
        self.kind.is_implicit()
    }

    fn integrate_adaptive(
        &self,
        problem: &IvpProblem,
        y0: &DVector<f64>,
        x0: f64,
        xend: f64,
        options: &IntegrateOptions,
    ) -> Result<Solution, OdeSysError> {
        self.drive(problem, y0, x0, xend, options, |solver| {
            solver.solve_adaptive(xend, options.nsteps, options.return_on_root)
        })
    }

    fn integrate_predefined(
        &self,
        problem: &IvpProblem,
        y0: &DVector<f64>,
        xout: &[f64],
        options: &IntegrateOptions,
    ) -> Result<Solution, OdeSysError> {
        if xout.len() < 2 {
            return Err(system_error!(OutputGridTooShort, xout.len()));
        }
        let x0 = xout[0];
        let xend = xout[xout.len() - 1];
        self.drive(problem, y0, x0, xend, options, |solver| {
            solver.solve_predefined(xout, options.nsteps)
        })
    }
}
