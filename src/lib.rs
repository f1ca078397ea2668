//! # odesys
//!
//! odesys wraps a system of first order ordinary differential equations `dy/dx = f(y, p, x)`,
//! given as closures, and integrates it with a choice of built-in Runge-Kutta integrators or a
//! user supplied [Integrator].
//!
//! ## Building a system
//!
//! Use [OdeSysBuilder] to set the number of dependent variables ([OdeSysBuilder::ny]) and the
//! right-hand side ([OdeSysBuilder::rhs]). Optionally add an analytic jacobian
//! ([OdeSysBuilder::jacobian]), a root function for event detection ([OdeSysBuilder::roots]),
//! a band structure used by the finite difference jacobian ([OdeSysBuilder::band]), variable
//! names, and transformations of the variables ([OdeSysBuilder::transform]). Then call
//! [OdeSysBuilder::build] to create an [OdeSys].
//!
//! ## Integrating
//!
//! [OdeSys::integrate] takes the output grid, the initial state, the parameters and an
//! [IntegrateOptions]:
//! - a grid of two points (or a single end point, meaning `[0, x]`) gives an adaptive
//!   integration, where every accepted step is reported ([OdeSys::adaptive]).
//! - a longer grid, or [IntegrateOptions::force_predefined], reports the solution at exactly the
//!   requested points ([OdeSys::predefined]).
//!
//! The result is an [OdeResult] holding the output in both the user's and the integrator's
//! coordinates and an [IntegrationInfo] with the solver statistics and the located roots.
//!
//! ## Integrators
//!
//! The built-in integrators are listed in [IntegratorKind]: the explicit [Tableau::dopri5] and
//! [Tableau::tsit45] for non-stiff problems, and the singly diagonally implicit
//! [Tableau::tr_bdf2] and [Tableau::esdirk34] for stiff ones. Without an explicit choice the
//! integrator is read from the `ODESYS_INTEGRATOR` environment variable, and otherwise
//! `esdirk34` is used for systems with an analytic jacobian and `dopri5` for the rest.
//!
//! The stepping methods ([ExplicitRk], [Sdirk]) can also be driven directly through the
//! [OdeSolverMethod] trait.
//!
//! ## Logging
//!
//! odesys logs through the [log](https://docs.rs/log) facade. Install any logger in the
//! application to see the integrator selection (`debug`), rejected steps and nonlinear solver
//! failures (`trace`) and failed integrations (`warn`).

pub mod error;
pub mod integrator;
pub mod interpolate;
pub mod jacobian;
pub mod linear_solver;
pub mod nonlinear_solver;
pub mod system;
pub mod vector;

#[cfg(test)]
pub(crate) mod test_models;

pub use error::{
    LinearSolverError, NonLinearSolverError, OdeSolverError, OdeSysError, SystemError,
};
pub use integrator::{
    resolve_jacobian, ExplicitRk, ExplicitRkConfig, IntegrateOptions, IntegrationInfo,
    Integrator, IntegratorKind, IvpProblem, OdeSolverMethod, OdeSolverStopReason, RkState,
    RungeKuttaIntegrator, Sdirk, SdirkConfig, Solution, SolverStatistics, Tableau, Tolerance,
    INTEGRATOR_ENV_VAR,
};
pub use interpolate::HermiteInterpolator;
pub use jacobian::FiniteDifferenceJacobian;
pub use linear_solver::{LinearSolver, NalgebraLU};
pub use nonlinear_solver::{
    convergence::{Convergence, ConvergenceStatus},
    newton::NewtonNonlinearSolver,
    root::RootFinder,
    NonLinearSolver,
};
pub use system::{OdeResult, OdeSys, OdeSysBuilder};

#[cfg(test)]
mod tests {
    use crate::{IntegrateOptions, IntegratorKind, OdeSysBuilder};

    // WARNING: if this test fails and you make a change to the code, you should update the README.md file as well!!!
    #[test]
    fn test_readme() {
        // logistic growth, dy/dx = r y (1 - y / k)
        let sys = OdeSysBuilder::new()
            .ny(1)
            .nparams(2)
            .rhs(|y, p, _x, dy| dy[0] = p[0] * y[0] * (1.0 - y[0] / p[1]))
            .jacobian(|y, p, _x, jac| jac[(0, 0)] = p[0] * (1.0 - 2.0 * y[0] / p[1]))
            .names(["population"])
            .build()
            .unwrap();

        let options = IntegrateOptions::new()
            .integrator(IntegratorKind::Esdirk34)
            .atol(1e-10)
            .rtol(1e-10)
            .nsteps(5000);
        let xout: Vec<f64> = (0..=10).map(|i| i as f64).collect();
        let result = sys.integrate(&xout, &[0.1], &[1.0, 2.0], &options).unwrap();

        let exact = |x: f64| 2.0 / (1.0 + 19.0 * (-x).exp());
        let population = result.named("population").unwrap();
        for (x, y) in xout.iter().zip(population) {
            assert!((y - exact(*x)).abs() < 1e-6);
        }
        assert_eq!(result.info.integrator, "esdirk34");
    }
}
