use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::{
    error::{OdeSysError, SystemError},
    IntegrationInfo,
};

/// The outcome of [crate::OdeSys::integrate].
///
/// `xout`, `yout` and `params` are in the user's coordinates, after the post-processors. The
/// `internal_*` fields hold the same integration as seen by the integrator.
#[derive(Debug, Clone, Serialize)]
pub struct OdeResult {
    pub xout: Vec<f64>,
    /// One row per point of `xout`.
    pub yout: DMatrix<f64>,
    pub params: DVector<f64>,
    pub info: IntegrationInfo,
    pub internal_xout: Vec<f64>,
    pub internal_yout: DMatrix<f64>,
    pub internal_params: DVector<f64>,
    pub names: Option<Vec<String>>,
}

impl OdeResult {
    /// Number of dependent variables in the output.
    pub fn ny(&self) -> usize {
        self.yout.ncols()
    }

    /// The trajectory of dependent variable `index`.
    pub fn component(&self, index: usize) -> Result<Vec<f64>, OdeSysError> {
        self.check_index(index)?;
        Ok(self.yout.column(index).iter().copied().collect())
    }

    /// The trajectory of the dependent variable called `name`.
    pub fn named(&self, name: &str) -> Result<Vec<f64>, OdeSysError> {
        let index = self
            .names
            .as_ref()
            .and_then(|names| names.iter().position(|n| n == name))
            .ok_or_else(|| OdeSysError::from(SystemError::UnknownName(name.to_string())))?;
        self.component(index)
    }

    /// `(x, y_index)` pairs, ready for plotting against the independent variable.
    pub fn series(&self, index: usize) -> Result<Vec<(f64, f64)>, OdeSysError> {
        let y = self.component(index)?;
        Ok(self.xout.iter().copied().zip(y).collect())
    }

    /// `(y_first, y_second)` pairs, a trajectory in the phase plane of two dependent variables.
    pub fn phase_plane(
        &self,
        first: usize,
        second: usize,
    ) -> Result<Vec<(f64, f64)>, OdeSysError> {
        let a = self.component(first)?;
        let b = self.component(second)?;
        Ok(a.into_iter().zip(b).collect())
    }

    /// The last row of the output, `None` if there are no rows.
    pub fn final_state(&self) -> Option<DVector<f64>> {
        let last = self.yout.nrows().checked_sub(1)?;
        Some(self.yout.row(last).transpose())
    }

    /// Rows of the output at which a root was found, see [IntegrationInfo::root_indices].
    pub fn root_points(&self) -> Vec<(f64, DVector<f64>)> {
        self.info
            .root_indices
            .iter()
            .filter(|&&i| i < self.xout.len())
            .map(|&i| (self.xout[i], self.yout.row(i).transpose()))
            .collect()
    }

    fn check_index(&self, index: usize) -> Result<(), OdeSysError> {
        if index >= self.ny() {
            return Err(OdeSysError::from(SystemError::ComponentOutOfRange {
                index,
                ny: self.ny(),
            }));
        }
        Ok(())
    }
}
