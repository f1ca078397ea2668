use nalgebra::{DMatrix, DVector};

use crate::{
    error::{OdeSysError, SystemError},
    other_error,
};

/// Piecewise cubic Hermite interpolation through samples `(x_k, y_k, dy_k)`.
///
/// Row `k` of `y` and `dy` holds the value and derivative at `x[k]`. The sample points may run
/// in either direction, and repeated points (zero width intervals) are skipped.
#[derive(Debug, Clone)]
pub struct HermiteInterpolator {
    x: Vec<f64>,
    y: DMatrix<f64>,
    dy: DMatrix<f64>,
}

impl HermiteInterpolator {
    pub fn new(x: Vec<f64>, y: DMatrix<f64>, dy: DMatrix<f64>) -> Result<Self, OdeSysError> {
        if x.is_empty() {
            return Err(OdeSysError::from(SystemError::EmptyOutputGrid));
        }
        if y.nrows() != x.len() || dy.shape() != y.shape() {
            return Err(other_error!(format!(
                "Hermite samples have shape {:?} and {:?} for {} points",
                y.shape(),
                dy.shape(),
                x.len()
            )));
        }
        let forward = x[x.len() - 1] >= x[0];
        if x
            .windows(2)
            .any(|w| (forward && w[1] < w[0]) || (!forward && w[1] > w[0]))
        {
            return Err(OdeSysError::from(SystemError::OutputGridNotMonotonic));
        }
        Ok(Self { x, y, dy })
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    /// Index `k` of the interval `[x_k, x_{k+1}]` holding `x`.
    fn interval(&self, x: f64) -> Option<usize> {
        let forward = self.x[self.x.len() - 1] >= self.x[0];
        self.x.windows(2).position(|w| {
            w[0] != w[1]
                && if forward {
                    w[0] <= x && x <= w[1]
                } else {
                    w[1] <= x && x <= w[0]
                }
        })
    }

    pub fn interpolate(&self, x: f64) -> Result<DVector<f64>, OdeSysError> {
        let Some(k) = self.interval(x) else {
            // a single sample point, or x lands on a sample of a degenerate grid
            return match self.x.iter().position(|&xk| xk == x) {
                Some(k) => Ok(self.y.row(k).transpose()),
                None => Err(OdeSysError::from(SystemError::InterpolationOutOfRange { x })),
            };
        };
        let h = self.x[k + 1] - self.x[k];
        let t = (x - self.x[k]) / h;
        let t2 = t * t;
        let t3 = t2 * t;
        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;

        let mut y = self.y.row(k).transpose() * h00;
        y.axpy(h10 * h, &self.dy.row(k).transpose(), 1.0);
        y.axpy(h01, &self.y.row(k + 1).transpose(), 1.0);
        y.axpy(h11 * h, &self.dy.row(k + 1).transpose(), 1.0);
        Ok(y)
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::DMatrix;

    use super::HermiteInterpolator;

    // y = x^3 - x, dy = 3x^2 - 1: cubic, so interpolation is exact
    fn cubic_samples(x: &[f64]) -> HermiteInterpolator {
        let y = DMatrix::from_fn(x.len(), 1, |i, _| x[i].powi(3) - x[i]);
        let dy = DMatrix::from_fn(x.len(), 1, |i, _| 3.0 * x[i].powi(2) - 1.0);
        HermiteInterpolator::new(x.to_vec(), y, dy).unwrap()
    }

    #[test]
    fn exact_for_cubics_in_both_directions() {
        for grid in [vec![0.0, 0.5, 2.0], vec![2.0, 0.5, 0.0]] {
            let interp = cubic_samples(&grid);
            for x in [0.0, 0.25, 0.5, 1.3, 2.0] {
                let y = interp.interpolate(x).unwrap();
                assert!((y[0] - (x * x * x - x)).abs() < 1e-12, "x = {x}");
            }
        }
    }

    #[test]
    fn repeated_points_are_skipped() {
        let interp = cubic_samples(&[0.0, 1.0, 1.0, 2.0]);
        let y = interp.interpolate(1.5).unwrap();
        assert!((y[0] - (1.5_f64.powi(3) - 1.5)).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_and_bad_input() {
        let interp = cubic_samples(&[0.0, 1.0]);
        assert!(interp.interpolate(1.5).is_err());
        assert!(interp.interpolate(-0.1).is_err());

        let single = cubic_samples(&[1.0]);
        assert_eq!(single.interpolate(1.0).unwrap()[0], 0.0);
        assert!(single.interpolate(0.0).is_err());

        let y = DMatrix::zeros(3, 1);
        assert!(HermiteInterpolator::new(vec![0.0, 2.0, 1.0], y.clone(), y).is_err());
        let dy = DMatrix::zeros(3, 1);
        assert!(HermiteInterpolator::new(vec![0.0, 1.0], DMatrix::zeros(2, 1), dy).is_err());
    }
}
