//! Point-update adapter around a legacy routine
//!
//! Component order differs between the two sides:
//!
//! ```text
//! solver   (11, 22, 33, 23, 13, 12)
//! external (11, 22, 33, 12, 13, 23)
//! ```
//!
//! Only entries 3 and 5 trade places, so one swap converts in either
//! direction.

use crate::error::{UmatError, UmatResult};
use crate::material::{MaterialModel, PointInputs, PointOutputs, StepContext};
use crate::math::{mat3_to_column_major, sym_to_voigt, Mat3, PolarDecomposition};
use crate::umat::{to_c_int, LegacyUmat, UmatArgs};

/// Convert a 6-vector between solver and external order
pub fn reorder_vector(v: &mut [f64; 6]) {
    v.swap(3, 5);
}

/// Convert a 6x6 matrix between solver and external order (rows and columns)
pub fn reorder_tangent(c: &mut [f64; 36]) {
    for col in 0..6 {
        c.swap(6 * col + 3, 6 * col + 5);
    }
    for row in 0..6 {
        c.swap(6 * 3 + row, 6 * 5 + row);
    }
}

/// Symmetric strain as an external-order vector with doubled shear
pub fn engineering_strain(e: &Mat3) -> [f64; 6] {
    let mut v = [0.0; 6];
    v.copy_from_slice(sym_to_voigt(e).as_slice());
    reorder_vector(&mut v);
    for shear in &mut v[3..] {
        *shear *= 2.0;
    }
    v
}

/// [`MaterialModel`] backed by a [`LegacyUmat`].
///
/// Strain measures and tolerances are read from the options carried by
/// each [`PointInputs`], so the driver's options are the only ones in play.
#[derive(Debug, Clone)]
pub struct UmatAdapter<L: LegacyUmat> {
    law: L,
    properties: Vec<f64>,
    num_state_vars: usize,
}

impl<L: LegacyUmat> UmatAdapter<L> {
    /// Bind a routine to its property vector and state width
    pub fn new(law: L, properties: Vec<f64>, num_state_vars: usize) -> UmatResult<Self> {
        law.check_properties(&properties)?;
        log::info!(
            "material '{}': {} properties, {} state variables",
            law.name(),
            properties.len(),
            num_state_vars
        );
        Ok(Self {
            law,
            properties,
            num_state_vars,
        })
    }

    pub fn law(&self) -> &L {
        &self.law
    }

    pub fn properties(&self) -> &[f64] {
        &self.properties
    }

    /// Fill the legacy argument block for one point
    fn marshal(&self, inputs: &PointInputs, context: &StepContext) -> UmatResult<UmatArgs> {
        if inputs.stress_begin.len() != 6 || inputs.state_begin.len() != self.num_state_vars {
            return Err(UmatError::LayoutMismatch(format!(
                "point ({}, {}) supplied {} stress and {} state values, expected 6 and {}",
                inputs.element,
                inputs.point,
                inputs.stress_begin.len(),
                inputs.state_begin.len(),
                self.num_state_vars
            )));
        }

        let options = inputs.options;
        let polar = PolarDecomposition::with_tolerance(
            &inputs.f_incr,
            options.polar_tolerance,
            options.polar_max_iterations,
            options.singular_tolerance,
        )?;
        let total = options
            .total_strain
            .evaluate(&inputs.f_end, options.singular_tolerance)?;
        let increment = options
            .incremental_strain
            .evaluate(&inputs.f_incr, options.singular_tolerance)?;

        let mut args = UmatArgs::new(&self.properties, inputs.state_begin)?;
        args.stress.copy_from_slice(inputs.stress_begin);
        reorder_vector(&mut args.stress);
        args.stran = engineering_strain(&total);
        args.dstran = engineering_strain(&increment);
        args.time = [context.begin_time(), context.time];
        args.dtime = context.dt;
        mat3_to_column_major(&polar.rotation, &mut args.drot);
        mat3_to_column_major(&inputs.f_begin, &mut args.dfgrd0);
        mat3_to_column_major(&inputs.f_end, &mut args.dfgrd1);
        args.celent = inputs.characteristic_length;
        args.noel = to_c_int(inputs.element, "element index")?;
        args.npt = to_c_int(inputs.point, "point index")?;
        args.kstep = to_c_int(context.step, "step counter")?;
        args.kinc = to_c_int(context.iteration, "iteration counter")?;
        Ok(args)
    }
}

impl<L: LegacyUmat> MaterialModel for UmatAdapter<L> {
    fn name(&self) -> &str {
        self.law.name()
    }

    fn num_state_vars(&self) -> usize {
        self.num_state_vars
    }

    fn update_point(&self, inputs: &PointInputs, context: &StepContext) -> UmatResult<PointOutputs> {
        let mut args = self.marshal(inputs, context)?;
        self.law.call(&mut args)?;

        if !(args.pnewdt > 0.0) {
            return Err(UmatError::MaterialLawRejected {
                time_step_factor: args.pnewdt,
            });
        }

        reorder_vector(&mut args.stress);
        reorder_tangent(&mut args.ddsdde);
        Ok(PointOutputs {
            stress: args.stress,
            state: args.statev,
            tangent: args.ddsdde,
            time_step_factor: args.pnewdt,
        })
    }
}
