use nalgebra::DVector;

use crate::{OdeSys, OdeSysBuilder};

// y'' = -w^2 y as a first order system (p = [w^2])
pub fn harmonic_oscillator() -> (OdeSys, DVector<f64>) {
    let sys = OdeSysBuilder::new()
        .ny(2)
        .nparams(1)
        .rhs(|y, p, _x, dy| {
            dy[0] = y[1];
            dy[1] = -p[0] * y[0];
        })
        .names(["x", "v"])
        .build()
        .unwrap();
    (sys, DVector::from_vec(vec![1.0]))
}
