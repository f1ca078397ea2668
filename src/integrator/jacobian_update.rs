pub enum SolverState {
    StepSuccess,
    FirstConvergenceFail,
    SecondConvergenceFail,
    ErrorTestFail,
}

/// Decides when the implicit steppers re-evaluate the right-hand side jacobian `J`, and when they
/// only refactorise the iteration matrix `I - h gamma J` for a new step size.
#[derive(Clone)]
pub struct JacobianUpdate {
    steps_since_jacobian_eval: usize,
    steps_since_rhs_jacobian_eval: usize,
    h_at_last_jacobian_update: f64,
    threshold_to_update_jacobian: f64,
    threshold_to_update_rhs_jacobian: f64,
    update_jacobian_after_steps: usize,
    update_rhs_jacobian_after_steps: usize,
}

impl JacobianUpdate {
    pub fn new() -> Self {
        Self {
            steps_since_jacobian_eval: 0,
            steps_since_rhs_jacobian_eval: 0,
            h_at_last_jacobian_update: 1.0,
            threshold_to_update_jacobian: 0.3,
            threshold_to_update_rhs_jacobian: 0.2,
            update_jacobian_after_steps: 20,
            update_rhs_jacobian_after_steps: 50,
        }
    }

    pub fn update_jacobian(&mut self, h: f64) {
        self.steps_since_jacobian_eval = 0;
        self.h_at_last_jacobian_update = h;
    }

    pub fn update_rhs_jacobian(&mut self) {
        self.steps_since_rhs_jacobian_eval = 0;
    }

    pub fn step(&mut self) {
        self.steps_since_jacobian_eval += 1;
        self.steps_since_rhs_jacobian_eval += 1;
    }

    pub fn check_jacobian_update(&self, h: f64, state: &SolverState) -> bool {
        match state {
            SolverState::StepSuccess => {
                self.steps_since_jacobian_eval >= self.update_jacobian_after_steps
                    || (h / self.h_at_last_jacobian_update - 1.0).abs()
                        > self.threshold_to_update_jacobian
            }
            SolverState::FirstConvergenceFail => true,
            SolverState::SecondConvergenceFail => true,
            SolverState::ErrorTestFail => true,
        }
    }

    pub fn check_rhs_jacobian_update(&self, h: f64, state: &SolverState) -> bool {
        match state {
            SolverState::StepSuccess => {
                self.steps_since_rhs_jacobian_eval >= self.update_rhs_jacobian_after_steps
            }
            SolverState::FirstConvergenceFail => {
                (h / self.h_at_last_jacobian_update - 1.0).abs()
                    < self.threshold_to_update_rhs_jacobian
            }
            SolverState::SecondConvergenceFail => self.steps_since_rhs_jacobian_eval > 0,
            SolverState::ErrorTestFail => false,
        }
    }
}

impl Default for JacobianUpdate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{JacobianUpdate, SolverState};

    #[test]
    fn refactorise_on_large_step_change() {
        let mut update = JacobianUpdate::default();
        update.update_jacobian(0.1);
        update.update_rhs_jacobian();
        assert!(!update.check_jacobian_update(0.11, &SolverState::StepSuccess));
        assert!(update.check_jacobian_update(0.2, &SolverState::StepSuccess));
        assert!(update.check_jacobian_update(0.1, &SolverState::ErrorTestFail));
        assert!(!update.check_rhs_jacobian_update(0.1, &SolverState::ErrorTestFail));
    }

    #[test]
    fn rhs_jacobian_goes_stale_after_many_steps() {
        let mut update = JacobianUpdate::default();
        update.update_jacobian(0.1);
        update.update_rhs_jacobian();
        assert!(!update.check_rhs_jacobian_update(0.1, &SolverState::SecondConvergenceFail));
        for _ in 0..50 {
            update.step();
        }
        assert!(update.check_rhs_jacobian_update(0.1, &SolverState::StepSuccess));
        assert!(update.check_rhs_jacobian_update(0.1, &SolverState::SecondConvergenceFail));
    }
}
