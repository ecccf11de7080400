//! Per-point update driver for one global time step
//!
//! ```text
//! begin_step ──> update_points (one per Newton iteration) ──> commit
//!     ^                 │
//!     └── retry with smaller dt on failure or cutback
//! ```
//!
//! Beginning-of-step gradients, stress and state variables only change in
//! [`PointUpdateDriver::commit`]. Every `update_points` call reads the same
//! beginning-of-step data, so Newton iterations can be repeated freely.

use rayon::prelude::*;

use crate::element::{ElementGeometry, ReferenceElement};
use crate::error::{reduce_failures, PointFailure, UmatError, UmatResult};
use crate::kinematics::{DeformationGradients, ShapeGradients};
use crate::material::{MaterialModel, MaterialState, PointInputs, PointOutputs, StepContext};
use crate::math::{Mat3, Mat6};
use crate::options::UpdateOptions;
use crate::quadrature::{QuadratureField, QuadratureLayout, StateVariableLayout};
use crate::results::{hydrostatic, von_mises, StepReport};
use crate::umat::NOMINAL_TIME_STEP_FACTOR;

/// Position in the step protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPhase {
    /// No step begun yet
    Idle,
    /// Step begun, no update attempted
    Begun,
    /// Last update succeeded; the step may be committed
    Updated,
    /// Last update failed; retry or begin again
    Failed,
    /// Last step accepted
    Committed,
}

/// Drives kinematics and the material model over every quadrature point
#[derive(Debug)]
pub struct PointUpdateDriver<M: MaterialModel> {
    geometry: ElementGeometry,
    shape_gradients: ShapeGradients,
    kinematics: DeformationGradients,
    state: MaterialState,
    model: M,
    options: UpdateOptions,
    element_volumes: Option<Vec<f64>>,
    phase: StepPhase,
    context: StepContext,
    committed_steps: usize,
}

impl<M: MaterialModel> PointUpdateDriver<M> {
    /// Precompute shape gradients and start from the undeformed, stress-free state
    pub fn new(
        geometry: ElementGeometry,
        element: &dyn ReferenceElement,
        model: M,
        options: UpdateOptions,
    ) -> UmatResult<Self> {
        let shape_gradients = ShapeGradients::compute(&geometry, element)?;
        let layout = shape_gradients.layout();

        log::info!(
            "point update driver: {} elements x {} points, material '{}' with {} state variables",
            layout.num_elements,
            layout.points_per_element,
            model.name(),
            model.num_state_vars()
        );

        Ok(Self {
            kinematics: DeformationGradients::new(layout),
            state: MaterialState::new(layout, model.num_state_vars()),
            geometry,
            shape_gradients,
            model,
            options,
            element_volumes: None,
            phase: StepPhase::Idle,
            context: StepContext::default(),
            committed_steps: 0,
        })
    }

    /// Set the initial state vector (and grain orientations) at every point
    pub fn initialize_state_variables(
        &mut self,
        layout: &StateVariableLayout,
        initial_state: &[f64],
        orientations: &[f64],
        element_grains: &[usize],
    ) -> UmatResult<()> {
        self.require_between_steps("initialize state variables")?;
        if layout.width() != self.model.num_state_vars() {
            return Err(UmatError::LayoutMismatch(format!(
                "state layout width {} does not match the {} state variables of '{}'",
                layout.width(),
                self.model.num_state_vars(),
                self.model.name()
            )));
        }
        self.state
            .initialize_state(layout, initial_state, orientations, element_grains)
    }

    /// Set a uniform initial stress (Voigt order) at every point
    pub fn initialize_stress(&mut self, stress: &[f64]) -> UmatResult<()> {
        self.require_between_steps("initialize stress")?;
        self.state.initialize_stress(stress)
    }

    /// Use `cbrt(volume)` of each element as its characteristic length
    pub fn set_element_volumes(&mut self, volumes: Vec<f64>) -> UmatResult<()> {
        self.require_between_steps("set element volumes")?;
        if volumes.len() != self.layout().num_elements {
            return Err(UmatError::InvalidInput(format!(
                "expected {} element volumes, got {}",
                self.layout().num_elements,
                volumes.len()
            )));
        }
        if let Some(bad) = volumes.iter().position(|v| !(*v > 0.0) || !v.is_finite()) {
            return Err(UmatError::InvalidInput(format!(
                "element {} has volume {}",
                bad, volumes[bad]
            )));
        }
        self.element_volumes = Some(volumes);
        Ok(())
    }

    /// Start (or restart) a step ending at `time` with increment `dt`.
    ///
    /// Trial end-of-step values from an earlier attempt are discarded.
    pub fn begin_step(&mut self, time: f64, dt: f64) -> UmatResult<()> {
        if !(dt > 0.0) || !dt.is_finite() || !time.is_finite() {
            return Err(UmatError::InvalidInput(format!(
                "step needs a finite time and positive dt (t = {}, dt = {})",
                time, dt
            )));
        }
        if matches!(self.phase, StepPhase::Begun | StepPhase::Updated | StepPhase::Failed) {
            log::debug!(
                "restarting step {} with dt = {} (was {})",
                self.context.step,
                dt,
                self.context.dt
            );
        }

        self.state.reset_trial();
        self.context = StepContext {
            time,
            dt,
            step: self.committed_steps + 1,
            iteration: 0,
        };
        self.phase = StepPhase::Begun;
        Ok(())
    }

    /// One Newton iteration: update every point from current nodal coordinates.
    ///
    /// Nothing is written back unless every point succeeds.
    pub fn update_points(&mut self, coordinates: &[f64]) -> UmatResult<StepReport> {
        self.require_active_step()?;
        self.context.iteration += 1;
        self.phase = StepPhase::Failed;

        log::debug!(
            "step {} iteration {}: t = {}, dt = {}",
            self.context.step,
            self.context.iteration,
            self.context.time,
            self.context.dt
        );

        self.kinematics.update_incremental_and_end(
            &self.geometry,
            &self.shape_gradients,
            coordinates,
            self.options.singular_tolerance,
            self.options.parallel,
        )?;
        let outputs = self.evaluate_points()?;

        let layout = self.layout();
        let mut factor = f64::INFINITY;
        for ((element, point), out) in layout.indices().zip(&outputs) {
            self.state.write_point(element, point, out);
            factor = factor.min(out.time_step_factor);
        }
        if factor.is_infinite() {
            factor = NOMINAL_TIME_STEP_FACTOR;
        }

        let report = StepReport {
            iteration: self.context.iteration,
            points: outputs.len(),
            time_step_factor: factor,
        };
        if report.cutback_requested() {
            log::warn!(
                "step {}: material law advises cutback (factor {}, suggested dt {})",
                self.context.step,
                factor,
                report.suggested_dt(self.context.dt)
            );
        }

        self.phase = StepPhase::Updated;
        Ok(report)
    }

    /// [`update_points`](Self::update_points) from nodal displacements u, with x = X + u
    pub fn update_points_from_displacement(&mut self, displacement: &[f64]) -> UmatResult<StepReport> {
        self.require_active_step()?;
        let coordinates = self.geometry.displaced_coordinates(displacement)?;
        self.update_points(&coordinates)
    }

    /// Accept the converged step
    pub fn commit(&mut self) -> UmatResult<()> {
        if self.phase != StepPhase::Updated {
            return Err(UmatError::InvalidState(format!(
                "commit requires a successful update, driver is {:?}",
                self.phase
            )));
        }
        self.kinematics.commit_step();
        self.state.commit();
        self.committed_steps += 1;
        self.phase = StepPhase::Committed;

        log::info!(
            "committed step {} at t = {} after {} iterations",
            self.context.step,
            self.context.time,
            self.context.iteration
        );
        Ok(())
    }

    fn require_active_step(&self) -> UmatResult<()> {
        match self.phase {
            StepPhase::Begun | StepPhase::Updated | StepPhase::Failed => Ok(()),
            phase => Err(UmatError::InvalidState(format!(
                "update requires a begun step, driver is {:?}",
                phase
            ))),
        }
    }

    fn require_between_steps(&self, action: &str) -> UmatResult<()> {
        match self.phase {
            StepPhase::Idle | StepPhase::Committed => Ok(()),
            phase => Err(UmatError::InvalidState(format!(
                "cannot {} while a step is in progress ({:?})",
                action, phase
            ))),
        }
    }

    fn evaluate_points(&self) -> UmatResult<Vec<PointOutputs>> {
        let layout = self.layout();
        let ppe = layout.points_per_element;

        let results: Vec<Result<PointOutputs, PointFailure>> = if self.options.parallel {
            (0..layout.num_elements)
                .into_par_iter()
                .flat_map_iter(|e| (0..ppe).map(move |p| self.evaluate_point(e, p)))
                .collect()
        } else {
            (0..layout.num_elements)
                .flat_map(|e| (0..ppe).map(move |p| self.evaluate_point(e, p)))
                .collect()
        };

        let mut outputs = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(out) => outputs.push(out),
                Err(failure) => failures.push(failure),
            }
        }
        reduce_failures(failures, layout.total_points())?;
        Ok(outputs)
    }

    fn evaluate_point(&self, element: usize, point: usize) -> Result<PointOutputs, PointFailure> {
        let f_end = self.kinematics.end(element, point);
        let inputs = PointInputs {
            element,
            point,
            f_begin: self.kinematics.begin(element, point),
            f_end,
            f_incr: self.kinematics.incremental(element, point),
            stress_begin: self.state.stress_begin(element, point),
            state_begin: self.state.state_begin(element, point),
            characteristic_length: self.characteristic_length(element, point, &f_end),
            options: &self.options,
        };

        self.model
            .update_point(&inputs, &self.context)
            .and_then(|out| {
                if out.state.len() != self.state.num_state_vars() {
                    return Err(UmatError::LayoutMismatch(format!(
                        "'{}' returned {} state variables, expected {}",
                        self.model.name(),
                        out.state.len(),
                        self.state.num_state_vars()
                    )));
                }
                Ok(out)
            })
            .map_err(|error| PointFailure {
                element,
                point,
                error,
            })
    }

    /// cbrt of the current Jacobian determinant, or of the element volume when supplied
    fn characteristic_length(&self, element: usize, point: usize, f_end: &Mat3) -> f64 {
        match &self.element_volumes {
            Some(volumes) => volumes[element].cbrt(),
            None => (f_end.determinant() * self.shape_gradients.reference_det(element, point))
                .abs()
                .cbrt(),
        }
    }

    fn project(&self, f: fn(&[f64]) -> f64) -> QuadratureField {
        let mut field = QuadratureField::new(self.layout(), 1);
        for (value, stress) in field
            .as_mut_slice()
            .iter_mut()
            .zip(self.state.stress_end_field().as_slice().chunks_exact(6))
        {
            *value = f(stress);
        }
        field
    }

    /// End-of-step von Mises stress per point
    pub fn von_mises_field(&self) -> QuadratureField {
        self.project(von_mises)
    }

    /// End-of-step mean stress per point
    pub fn hydrostatic_field(&self) -> QuadratureField {
        self.project(hydrostatic)
    }

    pub fn phase(&self) -> StepPhase {
        self.phase
    }

    pub fn context(&self) -> &StepContext {
        &self.context
    }

    pub fn committed_steps(&self) -> usize {
        self.committed_steps
    }

    pub fn layout(&self) -> QuadratureLayout {
        self.shape_gradients.layout()
    }

    pub fn geometry(&self) -> &ElementGeometry {
        &self.geometry
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn options(&self) -> &UpdateOptions {
        &self.options
    }

    pub fn shape_gradients(&self) -> &ShapeGradients {
        &self.shape_gradients
    }

    pub fn deformation_gradients(&self) -> &DeformationGradients {
        &self.kinematics
    }

    pub fn material_state(&self) -> &MaterialState {
        &self.state
    }

    /// End-of-step stress at a point, Voigt order
    pub fn stress(&self, element: usize, point: usize) -> &[f64] {
        self.state.stress_end(element, point)
    }

    /// End-of-step state variables at a point
    pub fn state_variables(&self, element: usize, point: usize) -> &[f64] {
        self.state.state_end(element, point)
    }

    /// Material tangent at a point, Voigt order
    pub fn tangent(&self, element: usize, point: usize) -> Mat6 {
        self.state.tangent(element, point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Hex8;
    use crate::math::Vec3;
    use crate::quadrature::OrientationPlacement;
    use approx::assert_relative_eq;

    /// Stress = [celent, det F_incr, iteration, ..., polar cap], one state variable counting calls
    struct Probe {
        factor: f64,
    }

    impl MaterialModel for Probe {
        fn name(&self) -> &str {
            "probe"
        }

        fn num_state_vars(&self) -> usize {
            1
        }

        fn update_point(&self, inputs: &PointInputs, context: &StepContext) -> UmatResult<PointOutputs> {
            if self.factor <= 0.0 && inputs.element == 1 {
                return Err(UmatError::MaterialLawRejected {
                    time_step_factor: self.factor,
                });
            }
            Ok(PointOutputs {
                stress: [
                    inputs.characteristic_length,
                    inputs.f_incr.determinant(),
                    context.iteration as f64,
                    inputs.stress_begin[3] + 1.0,
                    0.0,
                    inputs.options.polar_max_iterations as f64,
                ],
                state: vec![inputs.state_begin[0] + 1.0],
                tangent: [0.0; 36],
                time_step_factor: self.factor,
            })
        }
    }

    fn driver(factor: f64) -> PointUpdateDriver<Probe> {
        let geometry = ElementGeometry::structured_block(2, 1, 1, [2.0, 1.0, 1.0]).unwrap();
        PointUpdateDriver::new(geometry, &Hex8::new(), Probe { factor }, UpdateOptions::default()).unwrap()
    }

    fn stretched(driver: &PointUpdateDriver<Probe>, stretch: f64) -> Vec<f64> {
        let f = Mat3::from_diagonal(&Vec3::new(stretch, 1.0, 1.0));
        driver
            .geometry()
            .reference_coordinates()
            .chunks(3)
            .flat_map(|x| {
                let v = f * Vec3::new(x[0], x[1], x[2]);
                [v[0], v[1], v[2]]
            })
            .collect()
    }

    #[test]
    fn test_protocol_order_is_enforced() {
        let mut d = driver(10.0);
        let x = d.geometry().reference_coordinates().to_vec();

        assert!(matches!(d.update_points(&x), Err(UmatError::InvalidState(_))));
        assert!(matches!(d.commit(), Err(UmatError::InvalidState(_))));
        assert!(matches!(d.begin_step(1.0, 0.0), Err(UmatError::InvalidInput(_))));
        assert!(matches!(d.begin_step(1.0, f64::NAN), Err(UmatError::InvalidInput(_))));

        d.begin_step(1.0, 1.0).unwrap();
        assert!(matches!(d.commit(), Err(UmatError::InvalidState(_))));
        assert!(matches!(
            d.initialize_stress(&[0.0; 6]),
            Err(UmatError::InvalidState(_))
        ));

        d.update_points(&x).unwrap();
        d.commit().unwrap();
        assert_eq!(d.phase(), StepPhase::Committed);
        assert_eq!(d.committed_steps(), 1);
        assert!(matches!(d.update_points(&x), Err(UmatError::InvalidState(_))));
        assert!(matches!(d.commit(), Err(UmatError::InvalidState(_))));
    }

    #[test]
    fn test_newton_reentry_keeps_begin_state() {
        let mut d = driver(10.0);
        d.begin_step(1.0, 1.0).unwrap();

        for iteration in 1..=3 {
            let x = stretched(&d, 1.0 + 0.01 * iteration as f64);
            let report = d.update_points(&x).unwrap();
            assert_eq!(report.iteration, iteration);
            assert_eq!(report.points, 16);
        }

        for (e, p) in d.layout().indices() {
            assert_eq!(d.deformation_gradients().begin(e, p), Mat3::identity());
            assert_eq!(d.material_state().stress_begin(e, p), &[0.0; 6]);
            assert_eq!(d.material_state().state_begin(e, p), &[0.0]);
            // Every iteration starts from the same beginning state
            assert_eq!(d.state_variables(e, p), &[1.0]);
            assert_eq!(d.stress(e, p)[2], 3.0);
            assert_relative_eq!(d.stress(e, p)[1], 1.03, epsilon = 1e-12);
        }

        d.commit().unwrap();
        d.begin_step(2.0, 1.0).unwrap();
        d.update_points(&stretched(&d, 1.03)).unwrap();
        for (e, p) in d.layout().indices() {
            assert_eq!(d.state_variables(e, p), &[2.0]);
            assert_relative_eq!(d.stress(e, p)[1], 1.0, epsilon = 1e-12);
            assert_relative_eq!(d.deformation_gradients().begin(e, p)[(0, 0)], 1.03, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rejection_writes_nothing_and_allows_retry() {
        let mut d = driver(-1.0);
        d.begin_step(1.0, 1.0).unwrap();

        let err = d.update_points(&stretched(&d, 1.1)).unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(d.phase(), StepPhase::Failed);
        assert!(matches!(d.commit(), Err(UmatError::InvalidState(_))));
        // Element 0 succeeded but nothing was written back
        assert_eq!(d.state_variables(0, 0), &[0.0]);

        d.begin_step(0.5, 0.5).unwrap();
        assert_eq!(d.context().iteration, 0);
        assert_eq!(d.context().step, 1);
    }

    #[test]
    fn test_cutback_advisory_is_reported() {
        let mut d = driver(0.5);
        d.begin_step(1.0, 0.2).unwrap();
        let report = d.update_points(&stretched(&d, 1.01)).unwrap();
        assert!(report.cutback_requested());
        assert_relative_eq!(report.suggested_dt(d.context().dt), 0.1);
        // Advisory only: values were written
        assert_eq!(d.state_variables(1, 7), &[1.0]);
    }

    #[test]
    fn test_characteristic_length() {
        let mut d = driver(10.0);
        d.begin_step(1.0, 1.0).unwrap();
        d.update_points(&stretched(&d, 1.0)).unwrap();
        // Unit cube elements: cbrt(1/8)
        assert_relative_eq!(d.stress(0, 0)[0], 0.5, epsilon = 1e-12);

        d.update_points(&stretched(&d, 1.331)).unwrap();
        assert_relative_eq!(d.stress(1, 4)[0], 0.55, epsilon = 1e-12);
        d.commit().unwrap();

        assert!(d.set_element_volumes(vec![8.0]).is_err());
        assert!(d.set_element_volumes(vec![8.0, -1.0]).is_err());
        d.set_element_volumes(vec![8.0, 27.0]).unwrap();
        d.begin_step(2.0, 1.0).unwrap();
        d.update_points(&stretched(&d, 1.0)).unwrap();
        assert_relative_eq!(d.stress(0, 3)[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(d.stress(1, 3)[0], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_element_volumes_fixed_within_a_step() {
        let mut d = driver(10.0);
        d.begin_step(1.0, 1.0).unwrap();
        d.update_points(&stretched(&d, 1.0)).unwrap();

        assert!(matches!(
            d.set_element_volumes(vec![8.0, 27.0]),
            Err(UmatError::InvalidState(_))
        ));
        d.update_points(&stretched(&d, 1.0)).unwrap();
        assert_relative_eq!(d.stress(1, 0)[0], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_model_sees_driver_options() {
        let geometry = ElementGeometry::structured_block(1, 1, 1, [1.0, 1.0, 1.0]).unwrap();
        let options = UpdateOptions::default().with_polar(1e-10, 7);
        let mut d = PointUpdateDriver::new(geometry, &Hex8::new(), Probe { factor: 10.0 }, options)
            .unwrap();
        d.begin_step(1.0, 1.0).unwrap();
        d.update_points(&stretched(&d, 1.0)).unwrap();
        assert_eq!(d.stress(0, 0)[5], 7.0);
        assert_eq!(d.options().polar_max_iterations, 7);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let geometry = ElementGeometry::structured_block(2, 2, 1, [1.0, 1.0, 0.5]).unwrap();
        let mut par = PointUpdateDriver::new(
            geometry.clone(),
            &Hex8::new(),
            Probe { factor: 10.0 },
            UpdateOptions::default(),
        )
        .unwrap();
        let mut seq = PointUpdateDriver::new(
            geometry,
            &Hex8::new(),
            Probe { factor: 10.0 },
            UpdateOptions::sequential(),
        )
        .unwrap();

        let u: Vec<f64> = (0..par.geometry().num_nodes() * 3)
            .map(|i| 0.01 * ((i * 7) % 5) as f64)
            .collect();
        for d in [&mut par, &mut seq] {
            d.begin_step(1.0, 1.0).unwrap();
            d.update_points_from_displacement(&u).unwrap();
        }
        assert_eq!(
            par.material_state().stress_end_field(),
            seq.material_state().stress_end_field()
        );
        assert_eq!(
            par.deformation_gradients().incremental_field(),
            seq.deformation_gradients().incremental_field()
        );
    }

    #[test]
    fn test_state_layout_must_match_model() {
        let mut d = driver(10.0);
        let layout = StateVariableLayout::with_orientation(1, 4, OrientationPlacement::End);
        assert!(matches!(
            d.initialize_state_variables(&layout, &[0.0], &[1.0, 0.0, 0.0, 0.0], &[0, 0]),
            Err(UmatError::LayoutMismatch(_))
        ));
        d.initialize_state_variables(&StateVariableLayout::plain(1), &[4.0], &[], &[])
            .unwrap();
        assert_eq!(d.material_state().state_begin(1, 2), &[4.0]);
    }

    #[test]
    fn test_stress_projections() {
        let mut d = driver(10.0);
        d.initialize_stress(&[3.0, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        let vm = d.von_mises_field();
        let p = d.hydrostatic_field();
        assert_eq!(vm.stride(), 1);
        assert_relative_eq!(vm.point(1, 1)[0], 3.0);
        assert_relative_eq!(p.point(0, 5)[0], 1.0);
    }
}
