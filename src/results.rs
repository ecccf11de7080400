//! Result types for point updates

use serde::{Deserialize, Serialize};

use crate::math::{voigt_to_sym, Mat3};

/// Summary of one successful pass over all points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// Newton iteration within the current step
    pub iteration: usize,
    /// Points updated
    pub points: usize,
    /// Smallest step factor returned by the law
    pub time_step_factor: f64,
}

impl StepReport {
    /// The law advises retrying with a smaller increment
    pub fn cutback_requested(&self) -> bool {
        self.time_step_factor < 1.0
    }

    /// Time increment scaled by the advisory, never enlarged
    pub fn suggested_dt(&self, dt: f64) -> f64 {
        dt * self.time_step_factor.min(1.0)
    }
}

/// Von Mises equivalent stress √(3/2 s:s) of a Voigt stress (11, 22, 33, 23, 13, 12)
pub fn von_mises(stress: &[f64]) -> f64 {
    let sigma = voigt_to_sym(stress);
    let deviator = sigma - Mat3::identity() * (sigma.trace() / 3.0);
    (1.5 * deviator.dot(&deviator)).sqrt()
}

/// Mean normal stress
pub fn hydrostatic(stress: &[f64]) -> f64 {
    voigt_to_sym(stress).trace() / 3.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_uniaxial_von_mises() {
        let s = [250.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        assert_relative_eq!(von_mises(&s), 250.0, epsilon = 1e-12);
        assert_relative_eq!(hydrostatic(&s), 250.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pure_shear_and_pressure() {
        let shear = [0.0, 0.0, 0.0, 0.0, 0.0, 10.0];
        assert_relative_eq!(von_mises(&shear), 10.0 * 3.0_f64.sqrt(), epsilon = 1e-12);

        let pressure = [-5.0, -5.0, -5.0, 0.0, 0.0, 0.0];
        assert_relative_eq!(von_mises(&pressure), 0.0);
        assert_relative_eq!(hydrostatic(&pressure), -5.0);
    }

    #[test]
    fn test_report_advisory() {
        let report = StepReport {
            iteration: 1,
            points: 8,
            time_step_factor: 10.0,
        };
        assert!(!report.cutback_requested());
        assert_eq!(report.suggested_dt(0.1), 0.1);

        let report = StepReport {
            time_step_factor: 0.25,
            ..report
        };
        assert!(report.cutback_requested());
        assert_relative_eq!(report.suggested_dt(0.1), 0.025);
    }
}
