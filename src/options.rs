//! Options controlling the point update

use serde::{Deserialize, Serialize};

use crate::math::polar::{DEFAULT_POLAR_MAX_ITERATIONS, DEFAULT_POLAR_TOLERANCE};
use crate::math::{StrainMeasure, SINGULAR_TOLERANCE};

/// Options for the per-point constitutive update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateOptions {
    /// Measure of F_end handed to the law as the total strain
    pub total_strain: StrainMeasure,
    /// Measure of F_incr handed to the law as the strain increment
    pub incremental_strain: StrainMeasure,
    /// Orthogonality tolerance of the polar decomposition
    pub polar_tolerance: f64,
    /// Iteration cap of the polar decomposition
    pub polar_max_iterations: usize,
    /// |det F| below which a gradient is singular
    pub singular_tolerance: f64,
    /// Distribute elements over the rayon thread pool
    pub parallel: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            total_strain: StrainMeasure::Eulerian,
            incremental_strain: StrainMeasure::Logarithmic,
            polar_tolerance: DEFAULT_POLAR_TOLERANCE,
            polar_max_iterations: DEFAULT_POLAR_MAX_ITERATIONS,
            singular_tolerance: SINGULAR_TOLERANCE,
            parallel: true,
        }
    }
}

impl UpdateOptions {
    /// Single-threaded evaluation
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    /// Set the total and incremental strain measures
    pub fn with_strain_measures(mut self, total: StrainMeasure, incremental: StrainMeasure) -> Self {
        self.total_strain = total;
        self.incremental_strain = incremental;
        self
    }

    /// Set polar decomposition tolerance and iteration cap
    pub fn with_polar(mut self, tolerance: f64, max_iterations: usize) -> Self {
        self.polar_tolerance = tolerance;
        self.polar_max_iterations = max_iterations;
        self
    }

    /// Set the singular determinant tolerance
    pub fn with_singular_tolerance(mut self, tol: f64) -> Self {
        self.singular_tolerance = tol;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
