use std::cell::Cell;

use nalgebra::{DMatrix, DVector};

use crate::{
    error::{OdeSysError, SystemError},
    jacobian::{finite_difference_dfdx, FiniteDifferenceJacobian},
    system_error, OdeSys,
};

/// The view of an [OdeSys] handed to an integrator backend: parameters are bound and every
/// evaluation of the right-hand side and jacobian is counted.
///
/// If the system has no analytic jacobian (or the caller asked not to use it), jacobians are
/// approximated with finite differences, grouping columns when the system declares a band.
pub struct IvpProblem<'a> {
    sys: &'a OdeSys,
    params: DVector<f64>,
    analytic_jacobian: bool,
    fd_jacobian: FiniteDifferenceJacobian,
    nfev: Cell<usize>,
    njev: Cell<usize>,
}

impl<'a> IvpProblem<'a> {
    pub fn new(
        sys: &'a OdeSys,
        params: DVector<f64>,
        analytic_jacobian: bool,
    ) -> Result<Self, OdeSysError> {
        if analytic_jacobian && sys.jac.is_none() {
            return Err(system_error!(JacobianNotAvailable));
        }
        Ok(Self {
            sys,
            params,
            analytic_jacobian,
            fd_jacobian: FiniteDifferenceJacobian::new(sys.ny(), sys.band()),
            nfev: Cell::new(0),
            njev: Cell::new(0),
        })
    }

    pub fn nstates(&self) -> usize {
        self.sys.ny()
    }

    pub fn nroots(&self) -> usize {
        self.sys.nroots()
    }

    pub fn has_roots(&self) -> bool {
        self.sys.roots.is_some()
    }

    pub fn band(&self) -> Option<(usize, usize)> {
        self.sys.band()
    }

    pub fn params(&self) -> &DVector<f64> {
        &self.params
    }

    /// Whether [Self::jacobian_inplace] calls the user supplied jacobian.
    pub fn has_analytic_jacobian(&self) -> bool {
        self.analytic_jacobian
    }

    /// Number of right-hand side evaluations so far, including those used for finite differences.
    pub fn nfev(&self) -> usize {
        self.nfev.get()
    }

    /// Number of jacobian evaluations so far.
    pub fn njev(&self) -> usize {
        self.njev.get()
    }

    pub fn rhs_inplace(&self, y: &DVector<f64>, x: f64, dy: &mut DVector<f64>) {
        self.nfev.set(self.nfev.get() + 1);
        (self.sys.rhs)(y, &self.params, x, dy);
    }

    pub fn rhs(&self, y: &DVector<f64>, x: f64) -> DVector<f64> {
        let mut dy = DVector::zeros(self.nstates());
        self.rhs_inplace(y, x, &mut dy);
        dy
    }

    pub fn jacobian_inplace(&self, y: &DVector<f64>, x: f64, jac: &mut DMatrix<f64>) {
        self.njev.set(self.njev.get() + 1);
        match (&self.sys.jac, self.analytic_jacobian) {
            (Some(jac_fn), true) => {
                // callbacks only write the non-zero entries
                jac.fill(0.0);
                jac_fn(y, &self.params, x, jac)
            }
            _ => {
                let f0 = self.rhs(y, x);
                self.fd_jacobian.jacobian_inplace(
                    |y, dy| self.rhs_inplace(y, x, dy),
                    y,
                    &f0,
                    jac,
                );
            }
        }
    }

    pub fn jacobian(&self, y: &DVector<f64>, x: f64) -> DMatrix<f64> {
        let n = self.nstates();
        let mut jac = DMatrix::zeros(n, n);
        self.jacobian_inplace(y, x, &mut jac);
        jac
    }

    /// Partial derivative of the right-hand side with respect to the independent variable.
    pub fn dfdx_inplace(&self, y: &DVector<f64>, x: f64, dfdx: &mut DVector<f64>) {
        match &self.sys.dfdx {
            Some(dfdx_fn) => dfdx_fn(y, &self.params, x, dfdx),
            None => {
                let f0 = self.rhs(y, x);
                finite_difference_dfdx(|x, dy| self.rhs_inplace(y, x, dy), x, &f0, dfdx);
            }
        }
    }

    /// Evaluate the root function, does nothing if the system has none.
    pub fn root_inplace(&self, y: &DVector<f64>, x: f64, g: &mut DVector<f64>) {
        if let Some(roots) = &self.sys.roots {
            roots(y, &self.params, x, g);
        }
    }
}
