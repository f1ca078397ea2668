use nalgebra::{DMatrix, DVector};

/// Group the columns of an `n x n` jacobian so that no two columns in a group have a non-zero in
/// the same row. For a banded jacobian with `lower` sub- and `upper` super-diagonals, columns
/// `j, j + w, j + 2w, ...` with `w = lower + upper + 1` can be perturbed together.
pub fn band_column_groups(n: usize, band: Option<(usize, usize)>) -> Vec<Vec<usize>> {
    let width = match band {
        Some((lower, upper)) => lower + upper + 1,
        None => n,
    };
    (0..width.min(n))
        .map(|first| (first..n).step_by(width).collect())
        .collect()
}

fn perturbation(y: f64) -> f64 {
    f64::EPSILON.sqrt() * y.abs().max(1.0)
}

/// Approximates the jacobian `df/dy` of a right-hand side using forward differences,
/// perturbing groups of structurally independent columns together when a band is known.
#[derive(Clone)]
pub struct FiniteDifferenceJacobian {
    band: Option<(usize, usize)>,
    groups: Vec<Vec<usize>>,
}

impl FiniteDifferenceJacobian {
    pub fn new(nstates: usize, band: Option<(usize, usize)>) -> Self {
        Self {
            band,
            groups: band_column_groups(nstates, band),
        }
    }

    /// Number of right-hand side evaluations needed for one jacobian.
    pub fn nevals(&self) -> usize {
        self.groups.len()
    }

    fn rows(&self, j: usize, n: usize) -> std::ops::Range<usize> {
        match self.band {
            Some((lower, upper)) => j.saturating_sub(upper)..(j + lower + 1).min(n),
            None => 0..n,
        }
    }

    /// Fill `jac` with the approximation at `y`, where `f0 = f(y)`.
    pub fn jacobian_inplace(
        &self,
        mut rhs: impl FnMut(&DVector<f64>, &mut DVector<f64>),
        y: &DVector<f64>,
        f0: &DVector<f64>,
        jac: &mut DMatrix<f64>,
    ) {
        let n = y.len();
        let mut y_pert = y.clone();
        let mut f_pert = DVector::zeros(n);
        jac.fill(0.0);
        for group in self.groups.iter() {
            for &j in group {
                y_pert[j] += perturbation(y[j]);
            }
            rhs(&y_pert, &mut f_pert);
            for &j in group {
                let delta = y_pert[j] - y[j];
                for i in self.rows(j, n) {
                    jac[(i, j)] = (f_pert[i] - f0[i]) / delta;
                }
                y_pert[j] = y[j];
            }
        }
    }
}

/// Approximate `df/dx` at `x` using a forward difference, where `f0 = f(x)`.
pub fn finite_difference_dfdx(
    mut rhs: impl FnMut(f64, &mut DVector<f64>),
    x: f64,
    f0: &DVector<f64>,
    dfdx: &mut DVector<f64>,
) {
    let x_pert = x + perturbation(x);
    let delta = x_pert - x;
    rhs(x_pert, dfdx);
    dfdx.iter_mut()
        .zip(f0.iter())
        .for_each(|(d, f)| *d = (*d - f) / delta);
}
