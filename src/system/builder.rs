use nalgebra::{DMatrix, DVector};

use super::{JacobianFn, OdeSys, PostProcessor, PreProcessor, RhsFn};
use crate::{
    error::{OdeSysError, SystemError},
    system_error,
};

/// Builder for ODE systems. Use methods to set the callbacks and transforms and then call
/// [Self::build] when done.
///
/// # Example
///
/// ```rust
/// use odesys::{IntegrateOptions, OdeSysBuilder};
///
/// let sys = OdeSysBuilder::new()
///     .ny(1)
///     .rhs(|y, p, _x, dy| {
///         // dy/dx = -ay
///         dy[0] = -p[0] * y[0];
///     })
///     .jacobian(|_y, p, _x, jac| {
///         jac[(0, 0)] = -p[0];
///     })
///     .build()
///     .unwrap();
///
/// let result = sys
///     .integrate(&[0.0, 1.0], &[1.0], &[0.5], &IntegrateOptions::default())
///     .unwrap();
/// let y_end = result.final_state().unwrap()[0];
/// assert!((y_end - (-0.5_f64).exp()).abs() < 1e-6);
/// ```
pub struct OdeSysBuilder {
    ny: usize,
    nparams: Option<usize>,
    rhs: Option<RhsFn>,
    jac: Option<JacobianFn>,
    dfdx: Option<RhsFn>,
    roots: Option<(usize, RhsFn)>,
    band: Option<(usize, usize)>,
    names: Option<Vec<String>>,
    pre_processors: Vec<PreProcessor>,
    post_processors: Vec<PostProcessor>,
}

impl Default for OdeSysBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OdeSysBuilder {
    pub fn new() -> Self {
        Self {
            ny: 0,
            nparams: None,
            rhs: None,
            jac: None,
            dfdx: None,
            roots: None,
            band: None,
            names: None,
            pre_processors: Vec::new(),
            post_processors: Vec::new(),
        }
    }

    /// Number of dependent variables.
    pub fn ny(mut self, ny: usize) -> Self {
        self.ny = ny;
        self
    }

    /// Number of parameters the callbacks receive, that is after the pre-processors. Checked on
    /// every integration when set.
    pub fn nparams(mut self, nparams: usize) -> Self {
        self.nparams = Some(nparams);
        self
    }

    /// Set the right-hand side of the ODE.
    ///
    /// # Arguments
    ///
    /// - `rhs`: Function of type Fn(y: &V, p: &V, x: f64, dy: &mut V) that writes dy/dx.
    pub fn rhs<F>(mut self, rhs: F) -> Self
    where
        F: Fn(&DVector<f64>, &DVector<f64>, f64, &mut DVector<f64>) + 'static,
    {
        self.rhs = Some(Box::new(rhs));
        self
    }

    /// Set the jacobian of the right-hand side with respect to the dependent variables.
    ///
    /// # Arguments
    ///
    /// - `jac`: Function of type Fn(y: &V, p: &V, x: f64, jac: &mut M) that writes the dense `ny x ny` jacobian.
    ///   `jac` is zeroed before each call, so only the non-zero entries need writing.
    pub fn jacobian<F>(mut self, jac: F) -> Self
    where
        F: Fn(&DVector<f64>, &DVector<f64>, f64, &mut DMatrix<f64>) + 'static,
    {
        self.jac = Some(Box::new(jac));
        self
    }

    /// Set the derivative of the right-hand side with respect to the independent variable.
    pub fn dfdx<F>(mut self, dfdx: F) -> Self
    where
        F: Fn(&DVector<f64>, &DVector<f64>, f64, &mut DVector<f64>) + 'static,
    {
        self.dfdx = Some(Box::new(dfdx));
        self
    }

    /// Set a root function with `nroots` components. Integration records the points where any
    /// component changes sign.
    pub fn roots<F>(mut self, nroots: usize, roots: F) -> Self
    where
        F: Fn(&DVector<f64>, &DVector<f64>, f64, &mut DVector<f64>) + 'static,
    {
        self.roots = Some((nroots, Box::new(roots)));
        self
    }

    /// Number of sub- and super-diagonals of a banded jacobian.
    pub fn band(mut self, lower: usize, upper: usize) -> Self {
        self.band = Some((lower, upper));
        self
    }

    pub fn names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Register a transformation of the variables.
    ///
    /// `pre` maps the user's `(xout, y0, p)` to the integrator's and is applied before all
    /// previously registered pre-processors; `post` maps `(xout, yout, p)` back and is applied
    /// after all previously registered post-processors.
    pub fn transform<F, G>(mut self, pre: F, post: G) -> Self
    where
        F: Fn(Vec<f64>, DVector<f64>, DVector<f64>) -> (Vec<f64>, DVector<f64>, DVector<f64>)
            + 'static,
        G: Fn(Vec<f64>, DMatrix<f64>, DVector<f64>) -> (Vec<f64>, DMatrix<f64>, DVector<f64>)
            + 'static,
    {
        self.pre_processors.insert(0, Box::new(pre));
        self.post_processors.push(Box::new(post));
        self
    }

    /// Append a single pre-processor.
    pub fn pre_processor<F>(mut self, pre: F) -> Self
    where
        F: Fn(Vec<f64>, DVector<f64>, DVector<f64>) -> (Vec<f64>, DVector<f64>, DVector<f64>)
            + 'static,
    {
        self.pre_processors.push(Box::new(pre));
        self
    }

    /// Append a single post-processor.
    pub fn post_processor<G>(mut self, post: G) -> Self
    where
        G: Fn(Vec<f64>, DMatrix<f64>, DVector<f64>) -> (Vec<f64>, DMatrix<f64>, DVector<f64>)
            + 'static,
    {
        self.post_processors.push(Box::new(post));
        self
    }

    pub fn build(self) -> Result<OdeSys, OdeSysError> {
        let rhs = self.rhs.ok_or_else(|| system_error!(MissingRhs))?;
        let ny = self.ny;
        if ny == 0 {
            return Err(system_error!(NoStates));
        }
        if let Some((lower, upper)) = self.band {
            if lower >= ny || upper >= ny {
                return Err(OdeSysError::from(SystemError::InvalidBand { lower, upper, ny }));
            }
        }
        if let Some(names) = &self.names {
            if names.len() != ny {
                return Err(OdeSysError::from(SystemError::WrongNamesLength {
                    expected: ny,
                    found: names.len(),
                }));
            }
        }
        let (nroots, roots) = match self.roots {
            Some((0, _)) => return Err(system_error!(NoRoots)),
            Some((nroots, roots)) => (nroots, Some(roots)),
            None => (0, None),
        };
        Ok(OdeSys {
            ny,
            nparams: self.nparams,
            rhs,
            jac: self.jac,
            dfdx: self.dfdx,
            roots,
            nroots,
            band: self.band,
            names: self.names,
            pre_processors: self.pre_processors,
            post_processors: self.post_processors,
        })
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::DVector;

    use crate::{
        error::{OdeSysError, SystemError},
        OdeSysBuilder,
    };

    fn decay() -> OdeSysBuilder {
        OdeSysBuilder::new()
            .ny(2)
            .rhs(|y, _p, _x, dy| dy.copy_from(&(-y)))
    }

    fn system_error(result: Result<crate::OdeSys, OdeSysError>) -> SystemError {
        match result {
            Err(OdeSysError::SystemError(err)) => err,
            Err(err) => panic!("unexpected error {err}"),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[test]
    fn validation() {
        assert!(matches!(
            system_error(OdeSysBuilder::new().ny(2).build()),
            SystemError::MissingRhs
        ));
        assert!(matches!(
            system_error(decay().ny(0).build()),
            SystemError::NoStates
        ));
        assert!(matches!(
            system_error(decay().band(2, 0).build()),
            SystemError::InvalidBand { lower: 2, upper: 0, ny: 2 }
        ));
        assert!(matches!(
            system_error(decay().names(["a"]).build()),
            SystemError::WrongNamesLength { expected: 2, found: 1 }
        ));
        assert!(matches!(
            system_error(decay().roots(0, |_y, _p, _x, _g| {}).build()),
            SystemError::NoRoots
        ));

        let sys = decay()
            .band(1, 0)
            .names(["a", "b"])
            .roots(2, |y, _p, _x, g| g.copy_from(y))
            .build()
            .unwrap();
        assert_eq!(sys.ny(), 2);
        assert_eq!(sys.nroots(), 2);
        assert_eq!(sys.band(), Some((1, 0)));
        assert!(!sys.has_jacobian());
    }

    #[test]
    fn transforms_wrap_earlier_ones() {
        // each transform adds to x on the way in and records its order on the way out
        let sys = decay()
            .transform(
                |x, y, p| (x.iter().map(|x| x * 2.0).collect(), y, p),
                |x, y, mut p| {
                    p[0] = p[0] * 10.0 + 1.0;
                    (x, y, p)
                },
            )
            .transform(
                |x, y, p| (x.iter().map(|x| x + 1.0).collect(), y, p),
                |x, y, mut p| {
                    p[0] = p[0] * 10.0 + 2.0;
                    (x, y, p)
                },
            )
            .build()
            .unwrap();

        // the later transform's pre-processor runs first: (1 + 1) * 2 = 4
        let (x, _, _) = sys.pre_process(&[1.0], &DVector::zeros(2), &DVector::zeros(1));
        assert_eq!(x, vec![2.0, 4.0]);

        // the later transform's post-processor runs last
        let (_, _, p) = sys.post_process(
            vec![0.0],
            nalgebra::DMatrix::zeros(1, 2),
            DVector::zeros(1),
        );
        assert_eq!(p[0], 12.0);
    }
}
