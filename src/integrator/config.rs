use serde::{Deserialize, Serialize};

/// Tuning parameters of the implicit (SDIRK/ESDIRK) Runge-Kutta steppers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdirkConfig {
    pub minimum_timestep: f64,
    pub maximum_error_test_failures: usize,
    pub maximum_timestep_growth: f64,
    pub minimum_timestep_shrink: f64,
    pub maximum_newton_iterations: usize,
}

impl Default for SdirkConfig {
    fn default() -> Self {
        Self {
            minimum_timestep: 1e-13,
            maximum_error_test_failures: 40,
            maximum_timestep_growth: 10.0,
            minimum_timestep_shrink: 0.2,
            maximum_newton_iterations: 10,
        }
    }
}

/// Tuning parameters of the explicit Runge-Kutta steppers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplicitRkConfig {
    pub minimum_timestep: f64,
    pub maximum_error_test_failures: usize,
    pub maximum_timestep_growth: f64,
    pub minimum_timestep_shrink: f64,
}

impl Default for ExplicitRkConfig {
    fn default() -> Self {
        Self {
            minimum_timestep: 1e-13,
            maximum_error_test_failures: 40,
            maximum_timestep_growth: 10.0,
            minimum_timestep_shrink: 0.2,
        }
    }
}
