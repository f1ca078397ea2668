use nalgebra::DVector;

use crate::{OdeSys, OdeSysBuilder};

// exponential decay problem
// dy/dx = -a y (p = [a])
// J = | -a  0 |
//     | 0  -a |
// with a root where the first component decays to 0.6, at x = 10 ln(1 / 0.6) for y0 = 1
pub fn exponential_decay() -> (OdeSys, DVector<f64>) {
    let sys = OdeSysBuilder::new()
        .ny(2)
        .nparams(1)
        .rhs(|y, p, _x, dy| {
            dy.copy_from(y);
            *dy *= -p[0];
        })
        .jacobian(|_y, p, _x, jac| {
            jac.fill(0.0);
            jac.fill_diagonal(-p[0]);
        })
        .roots(1, |y, _p, _x, g| g[0] = y[0] - 0.6)
        .names(["a", "b"])
        .build()
        .unwrap();
    (sys, DVector::from_vec(vec![0.1]))
}

pub fn exponential_decay_root() -> f64 {
    10.0 * (1.0_f64 / 0.6).ln()
}
