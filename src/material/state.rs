//! Stress, state variables and tangent at every quadrature point

use crate::error::UmatResult;
use crate::material::PointOutputs;
use crate::math::Mat6;
use crate::quadrature::{QuadratureField, QuadratureLayout, StateVariableLayout};

/// Voigt stress components
const STRESS_STRIDE: usize = 6;
/// 6x6 tangent components
const TANGENT_STRIDE: usize = 36;

/// Beginning and end-of-step material point data.
///
/// Beginning-of-step values only change on [`commit`](Self::commit).
#[derive(Debug, Clone)]
pub struct MaterialState {
    stress_begin: QuadratureField,
    stress_end: QuadratureField,
    state_begin: QuadratureField,
    state_end: QuadratureField,
    tangent: QuadratureField,
}

impl MaterialState {
    /// Stress-free state with zero state variables
    pub fn new(layout: QuadratureLayout, num_state_vars: usize) -> Self {
        Self {
            stress_begin: QuadratureField::new(layout, STRESS_STRIDE),
            stress_end: QuadratureField::new(layout, STRESS_STRIDE),
            state_begin: QuadratureField::new(layout, num_state_vars),
            state_end: QuadratureField::new(layout, num_state_vars),
            tangent: QuadratureField::new(layout, TANGENT_STRIDE),
        }
    }

    pub fn layout(&self) -> QuadratureLayout {
        self.stress_begin.layout()
    }

    pub fn num_state_vars(&self) -> usize {
        self.state_begin.stride()
    }

    /// Write the initial state vector (with orientation data) to every point
    pub fn initialize_state(
        &mut self,
        layout: &StateVariableLayout,
        initial_state: &[f64],
        orientations: &[f64],
        element_grains: &[usize],
    ) -> UmatResult<()> {
        layout.populate(&mut self.state_begin, initial_state, orientations, element_grains)?;
        self.state_end.copy_from(&self.state_begin)
    }

    /// Set a uniform beginning-of-step stress, e.g. a residual stress
    pub fn initialize_stress(&mut self, stress: &[f64]) -> UmatResult<()> {
        self.stress_begin.fill_points(stress)?;
        self.stress_end.copy_from(&self.stress_begin)
    }

    /// Discard trial values: end ← begin
    pub fn reset_trial(&mut self) {
        self.stress_end
            .as_mut_slice()
            .copy_from_slice(self.stress_begin.as_slice());
        self.state_end
            .as_mut_slice()
            .copy_from_slice(self.state_begin.as_slice());
    }

    /// Store the law's outputs as the trial end-of-step values
    pub fn write_point(&mut self, element: usize, point: usize, outputs: &PointOutputs) {
        self.stress_end
            .point_mut(element, point)
            .copy_from_slice(&outputs.stress);
        self.state_end
            .point_mut(element, point)
            .copy_from_slice(&outputs.state);
        self.tangent
            .point_mut(element, point)
            .copy_from_slice(&outputs.tangent);
    }

    /// Accept the converged step: begin ← end
    pub fn commit(&mut self) {
        self.stress_begin
            .as_mut_slice()
            .copy_from_slice(self.stress_end.as_slice());
        self.state_begin
            .as_mut_slice()
            .copy_from_slice(self.state_end.as_slice());
    }

    pub fn stress_begin(&self, element: usize, point: usize) -> &[f64] {
        self.stress_begin.point(element, point)
    }

    pub fn stress_end(&self, element: usize, point: usize) -> &[f64] {
        self.stress_end.point(element, point)
    }

    pub fn state_begin(&self, element: usize, point: usize) -> &[f64] {
        self.state_begin.point(element, point)
    }

    pub fn state_end(&self, element: usize, point: usize) -> &[f64] {
        self.state_end.point(element, point)
    }

    /// Tangent at a point as a matrix
    pub fn tangent(&self, element: usize, point: usize) -> Mat6 {
        Mat6::from_column_slice(self.tangent.point(element, point))
    }

    pub fn stress_begin_field(&self) -> &QuadratureField {
        &self.stress_begin
    }

    pub fn stress_end_field(&self) -> &QuadratureField {
        &self.stress_end
    }

    pub fn state_begin_field(&self) -> &QuadratureField {
        &self.state_begin
    }

    pub fn state_end_field(&self) -> &QuadratureField {
        &self.state_end
    }

    pub fn tangent_field(&self) -> &QuadratureField {
        &self.tangent
    }
}
