//! Material model interface and per-point material state

pub mod input;
pub mod state;

use serde::{Deserialize, Serialize};

use crate::error::UmatResult;
use crate::math::Mat3;
use crate::options::UpdateOptions;

pub use input::{
    canonical_quaternions, read_values, MaterialData, MaterialInput, OrientationInput, ValueSource,
};
pub use state::MaterialState;

/// Time and iteration data shared by every point of one pass
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StepContext {
    /// Time at the end of the step
    pub time: f64,
    /// Time increment
    pub dt: f64,
    /// 1-based step counter
    pub step: usize,
    /// 1-based Newton iteration counter within the step
    pub iteration: usize,
}

impl StepContext {
    /// Time at the beginning of the step
    pub fn begin_time(&self) -> f64 {
        self.time - self.dt
    }
}

/// Everything a material model reads at one quadrature point
#[derive(Debug, Clone)]
pub struct PointInputs<'a> {
    pub element: usize,
    pub point: usize,
    pub f_begin: Mat3,
    pub f_end: Mat3,
    pub f_incr: Mat3,
    /// Beginning-of-step Cauchy stress, Voigt order (11, 22, 33, 23, 13, 12)
    pub stress_begin: &'a [f64],
    /// Beginning-of-step state variables
    pub state_begin: &'a [f64],
    /// Characteristic element length at the point
    pub characteristic_length: f64,
    /// Options of the driver running this pass
    pub options: &'a UpdateOptions,
}

/// Result of a successful material update, in solver conventions
#[derive(Debug, Clone, PartialEq)]
pub struct PointOutputs {
    /// End-of-step Cauchy stress, Voigt order
    pub stress: [f64; 6],
    /// End-of-step state variables
    pub state: Vec<f64>,
    /// 6x6 tangent ∂σ/∂ε, column-major, Voigt order
    pub tangent: [f64; 36],
    /// Step-size advisory; values below 1 ask for a cutback
    pub time_step_factor: f64,
}

/// Constitutive model evaluated independently at every quadrature point
pub trait MaterialModel: Send + Sync {
    /// Model name for logging
    fn name(&self) -> &str;

    /// State variables per point
    fn num_state_vars(&self) -> usize;

    /// Evaluate one point. Must not depend on any other point.
    fn update_point(&self, inputs: &PointInputs, context: &StepContext) -> UmatResult<PointOutputs>;
}
