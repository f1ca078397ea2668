use nalgebra::DVector;

use crate::{OdeSys, OdeSysBuilder};

//     dy1/dt = -.04*y1 + 1.e4*y2*y3
//*    dy2/dt = .04*y1 - 1.e4*y2*y3 - 3.e7*(y2)^2
//*    dy3/dt = 3.e7*(y2)^2
// At t = 4.0000e+01      y =  7.158017e-01    9.185037e-06    2.841892e-01
pub fn robertson() -> (OdeSys, DVector<f64>) {
    let sys = OdeSysBuilder::new()
        .ny(3)
        .nparams(3)
        .rhs(|y, p, _x, dy| {
            dy[0] = -p[0] * y[0] + p[1] * y[1] * y[2];
            dy[1] = p[0] * y[0] - p[1] * y[1] * y[2] - p[2] * y[1] * y[1];
            dy[2] = p[2] * y[1] * y[1];
        })
        .jacobian(|y, p, _x, jac| {
            jac[(0, 0)] = -p[0];
            jac[(0, 1)] = p[1] * y[2];
            jac[(0, 2)] = p[1] * y[1];
            jac[(1, 0)] = p[0];
            jac[(1, 1)] = -p[1] * y[2] - 2.0 * p[2] * y[1];
            jac[(1, 2)] = -p[1] * y[1];
            jac[(2, 0)] = 0.0;
            jac[(2, 1)] = 2.0 * p[2] * y[1];
            jac[(2, 2)] = 0.0;
        })
        .names(["A", "B", "C"])
        .build()
        .unwrap();
    (sys, DVector::from_vec(vec![0.04, 1.0e4, 3.0e7]))
}
