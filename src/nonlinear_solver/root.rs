use std::cell::RefCell;

use nalgebra::DVector;

use crate::{error::OdeSysError, vector::root_finding};

/// Locates zero crossings of a vector-valued root function between two accepted solver steps.
#[derive(Clone)]
pub struct RootFinder {
    t0: RefCell<f64>,
    g0: RefCell<DVector<f64>>,
    g1: RefCell<DVector<f64>>,
    gmid: RefCell<DVector<f64>>,
    ymid: RefCell<DVector<f64>>,
}

impl RootFinder {
    pub fn new(nroots: usize, nstates: usize) -> Self {
        Self {
            t0: RefCell::new(0.0),
            g0: RefCell::new(DVector::zeros(nroots)),
            g1: RefCell::new(DVector::zeros(nroots)),
            gmid: RefCell::new(DVector::zeros(nroots)),
            ymid: RefCell::new(DVector::zeros(nstates)),
        }
    }

    /// Set the lower boundary of the root search.
    /// This function should be called first after [Self::new]
    pub fn init(
        &self,
        root_fn: &impl Fn(&DVector<f64>, f64, &mut DVector<f64>),
        y: &DVector<f64>,
        t: f64,
    ) {
        root_fn(y, t, &mut self.g0.borrow_mut());
        self.t0.replace(t);
    }

    /// Set the upper boundary of the root search and checks for a zero crossing.
    /// If a zero crossing is found, the location of the earliest crossing and the index of the
    /// component that crossed are returned, and the lower boundary moves to the crossing. Call
    /// again with the same `y` and `t` to find later crossings within the same step, until `None`
    /// or a root at `t` is returned.
    ///
    /// This function assumes that g0 and t0 have already beeen set via [Self::init]
    /// or previous iterations of [Self::check_root]
    ///
    /// The root is bracketed with the Illinois-modified secant method used by SUNDIALS
    /// [docs](https://sundials.readthedocs.io/en/latest/cvode/Mathematics_link.html#rootfinding)
    pub fn check_root(
        &self,
        interpolate_inplace: &impl Fn(f64, &mut DVector<f64>) -> Result<(), OdeSysError>,
        root_fn: &impl Fn(&DVector<f64>, f64, &mut DVector<f64>),
        y: &DVector<f64>,
        t: f64,
    ) -> Result<Option<(f64, usize)>, OdeSysError> {
        let g1 = &mut *self.g1.borrow_mut();
        let g0 = &mut *self.g0.borrow_mut();
        let gmid = &mut *self.gmid.borrow_mut();
        let ymid = &mut *self.ymid.borrow_mut();
        root_fn(y, t, g1);

        let (rootfnd, _gfracmax, imax) = root_finding(g0, g1);

        // if no sign change we don't need to find the root
        if imax < 0 {
            // index of a component that is exactly zero at the upper boundary, if any
            let zero_index = g1.iter().position(|g| *g == 0.0);
            // setup g0 for next iteration
            std::mem::swap(g0, g1);
            self.t0.replace(t);
            return Ok(match (rootfnd, zero_index) {
                // found a root at the upper boundary and no other sign change, return the root
                (true, Some(index)) => Some((t, index)),
                // no root found or sign change, return None
                _ => None,
            });
        }

        // otherwise we need to do the modified secant method to find the root
        let mut imax = imax as usize;
        let mut alpha = 1.0;
        let mut sign_change = [false, true];
        let mut i = 0;
        let mut t1 = t;
        let mut t0 = *self.t0.borrow();
        let tol = 100.0 * f64::EPSILON * (t1.abs() + (t1 - t0).abs());
        while (t1 - t0).abs() > tol {
            let mut t_mid = t1 - (t1 - t0) * g1[imax] / (g1[imax] - alpha * g0[imax]);

            // adjust t_mid away from the boundaries
            if (t_mid - t0).abs() < 0.5 * tol {
                let fracint = (t1 - t0).abs() / tol;
                let fracsub = if fracint > 5.0 { 0.1 } else { 0.5 / fracint };
                t_mid = t0 + fracsub * (t1 - t0);
            }
            if (t1 - t_mid).abs() < 0.5 * tol {
                let fracint = (t1 - t0).abs() / tol;
                let fracsub = if fracint > 5.0 { 0.1 } else { 0.5 / fracint };
                t_mid = t1 - fracsub * (t1 - t0);
            }

            interpolate_inplace(t_mid, ymid)?;
            root_fn(ymid, t_mid, gmid);

            let (rootfnd, _gfracmax, imax_i32) = root_finding(g0, gmid);
            let lower = imax_i32 >= 0;

            if lower {
                // Sign change found in (tlo,tmid); replace thi with tmid.
                t1 = t_mid;
                imax = imax_i32 as usize;
                std::mem::swap(g1, gmid);
            } else if rootfnd {
                // continue the next search from the root
                let index = gmid.iter().position(|g| *g == 0.0).unwrap_or(imax);
                std::mem::swap(g0, gmid);
                self.t0.replace(t_mid);

                // No sign change in (tlo,tmid), but g = 0 at tmid; return root tmid.
                return Ok(Some((t_mid, index)));
            } else {
                // No sign change in (tlo,tmid), and no zero at tmid. Sign change must be in (tmid,thi).  Replace tlo with tmid.
                t0 = t_mid;
                std::mem::swap(g0, gmid);
            }

            sign_change[i % 2] = lower;
            if i >= 2 {
                alpha = if sign_change[0] != sign_change[1] {
                    1.0
                } else if sign_change[0] {
                    0.5 * alpha
                } else {
                    2.0 * alpha
                };
            }
            i += 1;
        }
        // g1 is past the crossing, continue the next search from there
        std::mem::swap(g0, g1);
        self.t0.replace(t1);
        Ok(Some((t1, imax)))
    }
}
