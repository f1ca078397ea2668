use std::time::Instant;

use log::{debug, warn};
use nalgebra::{DMatrix, DVector};

use crate::{
    error::{OdeSysError, SystemError},
    integrator::{resolve_jacobian, RungeKuttaIntegrator},
    system_error, HermiteInterpolator, IntegrateOptions, IntegrationInfo, Integrator,
    IntegratorKind, IvpProblem,
};

pub mod builder;
pub mod result;

pub use builder::OdeSysBuilder;
pub use result::OdeResult;

/// `f(y, p, x, out)`, used for the right-hand side, its x-derivative and the root function.
pub type RhsFn = Box<dyn Fn(&DVector<f64>, &DVector<f64>, f64, &mut DVector<f64>)>;
/// `J(y, p, x, out)` writing the dense jacobian `df/dy`.
pub type JacobianFn = Box<dyn Fn(&DVector<f64>, &DVector<f64>, f64, &mut DMatrix<f64>)>;
/// Maps the user's `(xout, y0, p)` to the integrator's.
pub type PreProcessor =
    Box<dyn Fn(Vec<f64>, DVector<f64>, DVector<f64>) -> (Vec<f64>, DVector<f64>, DVector<f64>)>;
/// Maps the integrator's `(xout, yout, p)` back to the user's.
pub type PostProcessor =
    Box<dyn Fn(Vec<f64>, DMatrix<f64>, DVector<f64>) -> (Vec<f64>, DMatrix<f64>, DVector<f64>)>;

/// A system of first order ODEs `dy/dx = f(y, p, x)`, with optional jacobian, root function and
/// variable transformations. Create one with [OdeSysBuilder].
///
/// Integration runs in the coordinates produced by the pre-processors, and the trajectory is
/// mapped back by the post-processors. [OdeResult] keeps both.
pub struct OdeSys {
    pub(crate) ny: usize,
    pub(crate) nparams: Option<usize>,
    pub(crate) rhs: RhsFn,
    pub(crate) jac: Option<JacobianFn>,
    pub(crate) dfdx: Option<RhsFn>,
    pub(crate) roots: Option<RhsFn>,
    pub(crate) nroots: usize,
    pub(crate) band: Option<(usize, usize)>,
    pub(crate) names: Option<Vec<String>>,
    pub(crate) pre_processors: Vec<PreProcessor>,
    pub(crate) post_processors: Vec<PostProcessor>,
}

impl OdeSys {
    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn nparams(&self) -> Option<usize> {
        self.nparams
    }

    pub fn nroots(&self) -> usize {
        self.nroots
    }

    pub fn band(&self) -> Option<(usize, usize)> {
        self.band
    }

    pub fn names(&self) -> Option<&[String]> {
        self.names.as_deref()
    }

    pub fn has_jacobian(&self) -> bool {
        self.jac.is_some()
    }

    pub fn has_roots(&self) -> bool {
        self.roots.is_some()
    }

    /// Map the user's inputs to the integrator's. A single point `x` is first expanded to `[0, x]`.
    pub fn pre_process(
        &self,
        xout: &[f64],
        y0: &DVector<f64>,
        p: &DVector<f64>,
    ) -> (Vec<f64>, DVector<f64>, DVector<f64>) {
        let xout = match xout {
            [x] => vec![0.0, *x],
            _ => xout.to_vec(),
        };
        self.apply_pre_processors(xout, y0.clone(), p.clone())
    }

    fn apply_pre_processors(
        &self,
        xout: Vec<f64>,
        y0: DVector<f64>,
        p: DVector<f64>,
    ) -> (Vec<f64>, DVector<f64>, DVector<f64>) {
        self.pre_processors
            .iter()
            .fold((xout, y0, p), |(x, y, p), pre| pre(x, y, p))
    }

    /// Map the integrator's output back to the user's coordinates.
    pub fn post_process(
        &self,
        xout: Vec<f64>,
        yout: DMatrix<f64>,
        p: DVector<f64>,
    ) -> (Vec<f64>, DMatrix<f64>, DVector<f64>) {
        self.post_processors
            .iter()
            .fold((xout, yout, p), |(x, y, p), post| post(x, y, p))
    }

    /// Integrate the system.
    ///
    /// With two points in `xout` (after pre-processing, a single point `x` meaning `[0, x]`)
    /// the integrator chooses the output points, unless `options.force_predefined` is set.
    /// Otherwise the solution is reported at exactly the points of `xout`.
    ///
    /// The integrator is picked by [IntegratorKind::select_from_env].
    pub fn integrate(
        &self,
        xout: &[f64],
        y0: &[f64],
        p: &[f64],
        options: &IntegrateOptions,
    ) -> Result<OdeResult, OdeSysError> {
        let kind = IntegratorKind::select_from_env(options.integrator, self.has_jacobian())?;
        self.integrate_with(&RungeKuttaIntegrator::new(kind), xout, y0, p, options)
    }

    /// Integrate from `x0` to `xend`, reporting the points chosen by the integrator.
    pub fn adaptive(
        &self,
        y0: &[f64],
        x0: f64,
        xend: f64,
        p: &[f64],
        options: &IntegrateOptions,
    ) -> Result<OdeResult, OdeSysError> {
        self.integrate(&[x0, xend], y0, p, options)
    }

    /// Integrate, reporting the solution at exactly the points of `xout`.
    pub fn predefined(
        &self,
        y0: &[f64],
        xout: &[f64],
        p: &[f64],
        options: &IntegrateOptions,
    ) -> Result<(DMatrix<f64>, IntegrationInfo), OdeSysError> {
        let options = options.clone().force_predefined(true);
        let result = self.integrate(xout, y0, p, &options)?;
        Ok((result.yout, result.info))
    }

    /// Integrate with a custom backend. See [Self::integrate].
    pub fn integrate_with(
        &self,
        integrator: &dyn Integrator,
        xout: &[f64],
        y0: &[f64],
        p: &[f64],
        options: &IntegrateOptions,
    ) -> Result<OdeResult, OdeSysError> {
        if xout.is_empty() {
            return Err(system_error!(EmptyOutputGrid));
        }
        let (xout, y0, p) = self.pre_process(
            xout,
            &DVector::from_column_slice(y0),
            &DVector::from_column_slice(p),
        );
        self.check_inputs(y0.len(), p.len())?;
        let adaptive = xout.len() == 2 && !options.force_predefined;
        check_grid(&xout)?;

        let with_jacobian = resolve_jacobian(
            options.with_jacobian,
            integrator.requires_jacobian(),
            self.has_jacobian(),
        );
        let problem = IvpProblem::new(self, p.clone(), with_jacobian)?;
        debug!(
            "{} integration with {} over {} points, jacobian: {}",
            if adaptive { "adaptive" } else { "predefined" },
            integrator.name(),
            xout.len(),
            if with_jacobian { "analytic" } else { "finite differences" }
        );

        let start = Instant::now();
        let solution = if adaptive {
            integrator.integrate_adaptive(&problem, &y0, xout[0], xout[1], options)
        } else {
            integrator.integrate_predefined(&problem, &y0, &xout, options)
        };
        let mut solution = solution.inspect_err(|err| {
            warn!(
                "integration with {} failed after {} right-hand side evaluations: {}",
                integrator.name(),
                problem.nfev(),
                err
            )
        })?;
        solution.info.time_wall = start.elapsed().as_secs_f64();
        solution.info.success = true;
        solution.info.nfev = problem.nfev();
        solution.info.njev = problem.njev();
        if solution.info.integrator.is_empty() {
            solution.info.integrator = integrator.name().to_string();
        }
        if solution.yout.nrows() != solution.xout.len() {
            return Err(OdeSysError::from(SystemError::ProcessorShapeMismatch {
                expected: solution.xout.len(),
                found: solution.yout.nrows(),
            }));
        }

        let (xout_post, yout_post, p_post) =
            self.post_process(solution.xout.clone(), solution.yout.clone(), p.clone());
        if yout_post.nrows() != xout_post.len() {
            return Err(OdeSysError::from(SystemError::ProcessorShapeMismatch {
                expected: xout_post.len(),
                found: yout_post.nrows(),
            }));
        }
        Ok(OdeResult {
            xout: xout_post,
            yout: yout_post,
            params: p_post,
            info: solution.info,
            internal_xout: solution.xout,
            internal_yout: solution.yout,
            internal_params: p,
            names: self.names.clone(),
        })
    }

    /// Lengths of the pre-processed initial state and parameters, as the callbacks see them.
    fn check_inputs(&self, ny: usize, nparams: usize) -> Result<(), OdeSysError> {
        if ny != self.ny {
            return Err(OdeSysError::from(SystemError::WrongInitialStateLength {
                expected: self.ny,
                found: ny,
            }));
        }
        if let Some(expected) = self.nparams {
            if nparams != expected {
                return Err(OdeSysError::from(SystemError::WrongParameterLength {
                    expected,
                    found: nparams,
                }));
            }
        }
        Ok(())
    }

    /// Stiffness ratio at every internal output point of `result`: the ratio of the largest to
    /// the smallest singular value of the jacobian.
    pub fn stiffness(&self, result: &OdeResult) -> Result<Vec<f64>, OdeSysError> {
        let problem = IvpProblem::new(self, result.internal_params.clone(), self.has_jacobian())?;
        Ok(internal_points(result)
            .map(|(x, y)| {
                let singular_values = problem.jacobian(&y, x).singular_values();
                ratio(singular_values.iter().copied())
            })
            .collect())
    }

    /// Stiffness ratio at every internal output point of `result`, using the eigenvalues returned
    /// by `eigenvals(x, y, p)` in place of the singular values of the jacobian.
    pub fn stiffness_with<F>(&self, result: &OdeResult, eigenvals: F) -> Vec<f64>
    where
        F: Fn(f64, &DVector<f64>, &DVector<f64>) -> Vec<f64>,
    {
        internal_points(result)
            .map(|(x, y)| ratio(eigenvals(x, &y, &result.internal_params).into_iter()))
            .collect()
    }

    /// Interpolate `result` at `x`, given in the user's coordinates.
    ///
    /// Interpolation is cubic Hermite in the integrator's coordinates, using the right-hand side
    /// at the stored points as derivatives.
    pub fn interpolate(&self, result: &OdeResult, x: f64) -> Result<DVector<f64>, OdeSysError> {
        if result.yout.nrows() == 0 {
            return Err(system_error!(EmptyOutputGrid));
        }
        let (xs, _, _) = self.apply_pre_processors(
            vec![x],
            result.yout.row(0).transpose(),
            result.params.clone(),
        );
        let x_internal = xs
            .first()
            .copied()
            .ok_or_else(|| system_error!(OutputGridTooShort, 0))?;

        let problem = IvpProblem::new(self, result.internal_params.clone(), false)?;
        let yout = &result.internal_yout;
        let mut dy = DMatrix::zeros(yout.nrows(), yout.ncols());
        for (i, (x, y)) in internal_points(result).enumerate() {
            dy.set_row(i, &problem.rhs(&y, x).transpose());
        }
        let interpolator =
            HermiteInterpolator::new(result.internal_xout.clone(), yout.clone(), dy)?;
        let y = interpolator.interpolate(x_internal)?;

        let (_, y_post, _) = self.post_process(
            vec![x_internal],
            DMatrix::from_row_slice(1, y.len(), y.as_slice()),
            result.internal_params.clone(),
        );
        if y_post.nrows() != 1 {
            return Err(OdeSysError::from(SystemError::ProcessorShapeMismatch {
                expected: 1,
                found: y_post.nrows(),
            }));
        }
        Ok(y_post.row(0).transpose())
    }
}

fn internal_points(result: &OdeResult) -> impl Iterator<Item = (f64, DVector<f64>)> + '_ {
    result
        .internal_xout
        .iter()
        .enumerate()
        .map(|(i, &x)| (x, result.internal_yout.row(i).transpose()))
}

fn ratio(values: impl Iterator<Item = f64>) -> f64 {
    let (min, max) = values.fold((f64::INFINITY, 0.0_f64), |(min, max), v| {
        (min.min(v.abs()), max.max(v.abs()))
    });
    max / min
}

/// The grid must have at least two points, span a non-zero range and be strictly monotonic.
fn check_grid(xout: &[f64]) -> Result<(), OdeSysError> {
    if xout.len() < 2 {
        return Err(system_error!(OutputGridTooShort, xout.len()));
    }
    let span = xout[xout.len() - 1] - xout[0];
    if span == 0.0 {
        return Err(system_error!(OutputGridZeroSpan));
    }
    if xout
        .windows(2)
        .any(|w| (w[1] - w[0]) * span.signum() <= 0.0)
    {
        return Err(system_error!(OutputGridNotMonotonic));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use nalgebra::{DMatrix, DVector};

    use super::check_grid;
    use crate::{
        error::{OdeSysError, SystemError},
        test_models::{
            exponential_decay::exponential_decay_root, exponential_decay, harmonic_oscillator,
            robertson,
        },
        IntegrateOptions, IntegratorKind, OdeSysBuilder,
    };

    fn dopri5() -> IntegrateOptions {
        IntegrateOptions::new().integrator(IntegratorKind::Dopri5)
    }

    #[test]
    fn grid_validation() {
        assert!(check_grid(&[0.0, 1.0, 2.0]).is_ok());
        assert!(check_grid(&[2.0, 1.0, 0.0]).is_ok());
        assert!(matches!(
            check_grid(&[0.0]),
            Err(OdeSysError::SystemError(SystemError::OutputGridTooShort(1)))
        ));
        assert!(matches!(
            check_grid(&[1.0, 1.0]),
            Err(OdeSysError::SystemError(SystemError::OutputGridZeroSpan))
        ));
        assert!(matches!(
            check_grid(&[0.0, 2.0, 1.0, 3.0]),
            Err(OdeSysError::SystemError(SystemError::OutputGridNotMonotonic))
        ));
        assert!(check_grid(&[0.0, 1.0, 1.0, 2.0]).is_err());
    }

    #[test]
    fn input_validation() {
        let (sys, p) = exponential_decay();
        let options = dopri5();
        assert!(sys.integrate(&[], &[1.0, 1.0], p.as_slice(), &options).is_err());
        assert!(matches!(
            sys.integrate(&[1.0], &[1.0], p.as_slice(), &options),
            Err(OdeSysError::SystemError(SystemError::WrongInitialStateLength { .. }))
        ));
        assert!(matches!(
            sys.integrate(&[1.0], &[1.0, 1.0], &[0.1, 0.2], &options),
            Err(OdeSysError::SystemError(SystemError::WrongParameterLength { .. }))
        ));
        assert!(sys
            .integrate(&[0.0, 0.0], &[1.0, 1.0], p.as_slice(), &options)
            .is_err());
    }

    #[test]
    fn parameter_count_after_transforms() {
        // the transform appends the rate, so the rhs sees two parameters
        let sys = OdeSysBuilder::new()
            .ny(1)
            .nparams(2)
            .rhs(|y, p, _x, dy| dy[0] = -p[0] * p[1] * y[0])
            .pre_processor(|x, y, p: DVector<f64>| (x, y, p.push(0.5)))
            .build()
            .unwrap();
        let result = sys.integrate(&[1.0], &[1.0], &[2.0], &dopri5()).unwrap();
        assert!((result.final_state().unwrap()[0] - (-1.0_f64).exp()).abs() < 1e-7);
        assert_eq!(result.internal_params.len(), 2);
        assert!(matches!(
            sys.integrate(&[1.0], &[1.0], &[2.0, 0.5], &dopri5()),
            Err(OdeSysError::SystemError(SystemError::WrongParameterLength {
                expected: 2,
                found: 3
            }))
        ));
    }

    #[test]
    fn single_point_means_from_zero() {
        let (sys, p) = exponential_decay();
        let result = sys
            .integrate(&[2.0], &[1.0, 1.0], p.as_slice(), &dopri5())
            .unwrap();
        assert_eq!(result.xout[0], 0.0);
        assert_eq!(*result.xout.last().unwrap(), 2.0);
        assert_eq!(result.yout.row(0)[0], 1.0);
        assert!(result.xout.len() > 2);
        assert!((result.final_state().unwrap()[0] - (-0.2_f64).exp()).abs() < 1e-7);
        assert!(result.info.success);
        assert_eq!(result.info.integrator, "dopri5");
        assert!(result.info.nfev > 0);
        assert_eq!(result.named("b").unwrap().len(), result.xout.len());
    }

    #[test]
    fn adaptive_inserts_roots() {
        let (sys, p) = exponential_decay();
        let result = sys
            .adaptive(&[1.0, 1.0], 0.0, 10.0, p.as_slice(), &dopri5())
            .unwrap();
        let x_root = exponential_decay_root();
        assert_eq!(result.info.root_components, vec![0]);
        assert!((result.info.root_x[0] - x_root).abs() < 1e-6);
        let row = result.info.root_indices[0];
        assert_eq!(result.xout[row], result.info.root_x[0]);
        assert!((result.yout[(row, 0)] - 0.6).abs() < 1e-6);
        assert_eq!(*result.xout.last().unwrap(), 10.0);

        let options = dopri5().return_on_root(true);
        let result = sys
            .adaptive(&[1.0, 1.0], 0.0, 10.0, p.as_slice(), &options)
            .unwrap();
        assert_eq!(*result.xout.last().unwrap(), result.info.root_x[0]);
        assert_eq!(result.info.root_indices, vec![result.xout.len() - 1]);
    }

    #[test]
    fn predefined_records_roots_only() {
        let (sys, p) = exponential_decay();
        let xout: Vec<f64> = (0..=20).map(|i| i as f64 * 0.5).collect();
        let (yout, info) = sys
            .predefined(&[1.0, 1.0], &xout, p.as_slice(), &dopri5())
            .unwrap();
        assert_eq!(yout.nrows(), xout.len());
        assert!(info.root_indices.is_empty());
        assert_eq!(info.root_x.len(), 1);
        for (i, x) in xout.iter().enumerate() {
            assert!((yout[(i, 1)] - (-0.1 * x).exp()).abs() < 1e-7);
        }

        // two points, but forced onto the grid
        let (yout, _) = sys
            .predefined(&[1.0, 1.0], &[0.0, 1.0], p.as_slice(), &dopri5())
            .unwrap();
        assert_eq!(yout.nrows(), 2);
    }

    #[test]
    fn roots_located_by_every_integrator() {
        let (sys, p) = exponential_decay();
        let x_root = exponential_decay_root();
        let xout: Vec<f64> = (0..=20).map(|i| i as f64 * 0.5).collect();
        for kind in IntegratorKind::ALL {
            let options = IntegrateOptions::new().integrator(kind).nsteps(10000);
            let tol = if kind.is_implicit() { 1e-5 } else { 1e-7 };
            let result = sys
                .adaptive(&[1.0, 1.0], 0.0, 10.0, p.as_slice(), &options)
                .unwrap();
            assert_eq!(result.info.root_x.len(), 1, "{kind}");
            assert!((result.info.root_x[0] - x_root).abs() < tol, "{kind}");

            let (yout, info) = sys
                .predefined(&[1.0, 1.0], &xout, p.as_slice(), &options)
                .unwrap();
            assert!((info.root_x[0] - x_root).abs() < tol, "{kind}");
            for (i, x) in xout.iter().enumerate() {
                assert!((yout[(i, 1)] - (-0.1 * x).exp()).abs() < tol, "{kind} at {x}");
            }
        }
    }

    #[test]
    fn several_roots_in_one_step() {
        let sys = OdeSysBuilder::new()
            .ny(1)
            .rhs(|_y, _p, _x, dy| dy[0] = 1.0)
            .roots(2, |y, _p, _x, g| {
                g[0] = y[0] - 0.5;
                g[1] = y[0] - 0.6;
            })
            .build()
            .unwrap();

        let result = sys.adaptive(&[0.0], 0.0, 10.0, &[], &dopri5()).unwrap();
        let info = &result.info;
        assert_eq!(info.root_components, vec![0, 1]);
        assert!((info.root_x[0] - 0.5).abs() < 1e-10);
        assert!((info.root_x[1] - 0.6).abs() < 1e-10);
        assert_eq!(info.root_indices.len(), 2);
        for (&row, &x) in info.root_indices.iter().zip(&info.root_x) {
            assert_eq!(result.xout[row], x);
            assert!((result.yout[(row, 0)] - x).abs() < 1e-10);
        }
        assert!(result.xout.windows(2).all(|w| w[1] > w[0]));
        assert_eq!(*result.xout.last().unwrap(), 10.0);

        let xout: Vec<f64> = (0..=10).map(|i| i as f64).collect();
        let (_, info) = sys.predefined(&[0.0], &xout, &[], &dopri5()).unwrap();
        assert_eq!(info.root_components, vec![0, 1]);
        assert!((info.root_x[1] - 0.6).abs() < 1e-10);

        let result = sys
            .adaptive(&[0.0], 0.0, 10.0, &[], &dopri5().return_on_root(true))
            .unwrap();
        assert_eq!(result.info.root_x.len(), 1);
        assert_eq!(*result.xout.last().unwrap(), result.info.root_x[0]);
    }

    #[test]
    fn backwards_in_x() {
        let (sys, p) = harmonic_oscillator();
        let xout: Vec<f64> = (0..=8).map(|i| -(i as f64) * 0.5).collect();
        let result = sys
            .integrate(&xout, &[1.0, 0.0], p.as_slice(), &dopri5())
            .unwrap();
        for (i, x) in xout.iter().enumerate() {
            assert!((result.yout[(i, 0)] - x.cos()).abs() < 1e-6);
            assert!((result.yout[(i, 1)] + x.sin()).abs() < 1e-6);
        }
    }

    #[test]
    fn jacobian_choice() {
        let (sys, p) = robertson();
        let options = IntegrateOptions::new()
            .integrator(IntegratorKind::Esdirk34)
            .atol(vec![1e-8, 1e-12, 1e-8])
            .rtol(1e-6)
            .nsteps(2000);
        let analytic = sys
            .integrate(&[0.0, 40.0], &[1.0, 0.0, 0.0], p.as_slice(), &options)
            .unwrap();
        let y = analytic.final_state().unwrap();
        assert!((y[0] - 7.158017e-1).abs() < 1e-3);
        assert!((y[2] - 2.841892e-1).abs() < 1e-3);

        let fd = sys
            .integrate(
                &[0.0, 40.0],
                &[1.0, 0.0, 0.0],
                p.as_slice(),
                &options.clone().with_jacobian(false),
            )
            .unwrap();
        assert!((fd.final_state().unwrap() - y).amax() < 1e-3);
        // finite differences cost extra right-hand side evaluations
        assert!(fd.info.nfev > analytic.info.nfev);

        let (sys, p) = harmonic_oscillator();
        assert!(matches!(
            sys.integrate(&[1.0], &[1.0, 0.0], p.as_slice(), &dopri5().with_jacobian(true)),
            Err(OdeSysError::SystemError(SystemError::JacobianNotAvailable))
        ));
    }

    #[test]
    fn stiffness_ratio() {
        let (sys, p) = robertson();
        let options = IntegrateOptions::new()
            .integrator(IntegratorKind::TrBdf2)
            .atol(1e-8)
            .rtol(1e-6)
            .nsteps(5000);
        let result = sys
            .integrate(&[0.0, 1.0], &[1.0, 0.0, 0.0], p.as_slice(), &options)
            .unwrap();
        let stiffness = sys.stiffness(&result).unwrap();
        assert_eq!(stiffness.len(), result.internal_xout.len());
        // rows of the jacobian sum to zero, so the smallest singular value vanishes
        assert!(stiffness.last().copied().unwrap() > 1e3);

        let (sys, p) = exponential_decay();
        let result = sys
            .integrate(&[1.0], &[1.0, 1.0], p.as_slice(), &dopri5())
            .unwrap();
        assert!(sys
            .stiffness(&result)
            .unwrap()
            .iter()
            .all(|s| (s - 1.0).abs() < 1e-12));
        let custom = sys.stiffness_with(&result, |_x, _y, p| vec![-p[0], -2.0 * p[0]]);
        assert!(custom.iter().all(|s| (s - 2.0).abs() < 1e-12));
    }

    // integrate y in log space: pre maps y0 -> ln y0, post maps back
    fn log_transformed() -> crate::OdeSys {
        OdeSysBuilder::new()
            .ny(1)
            .nparams(1)
            .rhs(|_ly, p, _x, dly| dly[0] = -p[0])
            .transform(
                |x, y, p| (x, y.map(f64::ln), p),
                |x, y: DMatrix<f64>, p| (x, y.map(f64::exp), p),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn transforms_and_interpolation() {
        let sys = log_transformed();
        let result = sys
            .integrate(&[0.0, 2.0], &[1.0], &[0.5], &dopri5())
            .unwrap();
        // the integrator sees ln y, which is linear in x
        let n = result.internal_xout.len();
        assert!((result.internal_yout[(n - 1, 0)] + 1.0).abs() < 1e-10);
        assert!((result.final_state().unwrap()[0] - (-1.0_f64).exp()).abs() < 1e-10);

        let y = sys.interpolate(&result, 1.3).unwrap();
        assert!((y[0] - (-0.65_f64).exp()).abs() < 1e-10);
        assert!(sys.interpolate(&result, 3.0).is_err());
        assert_eq!(y, DVector::from_vec(vec![y[0]]));
    }
}
