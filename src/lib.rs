//! UMAT Driver - per-quadrature-point constitutive updates for
//! updated-Lagrangian finite element solvers
//!
//! For every (element, quadrature point) pair the driver:
//! - rebuilds the end-of-step and incremental deformation gradients
//!   from the current nodal motion
//! - extracts the incremental rotation by polar decomposition
//! - evaluates the configured strain measures
//! - calls a material routine honouring the legacy UMAT contract and
//!   translates its stress, tangent and state variables back into the
//!   solver's Voigt ordering
//!
//! Global assembly and the Newton solve stay with the caller.
//!
//! ## Example
//! ```rust
//! use umat_driver::prelude::*;
//!
//! let geometry = ElementGeometry::structured_block(2, 2, 2, [1.0, 1.0, 1.0]).unwrap();
//! let material = UmatAdapter::new(IsotropicElasticUmat::new(), vec![200e3, 0.3], 1).unwrap();
//! let mut driver =
//!     PointUpdateDriver::new(geometry, &Hex8::new(), material, UpdateOptions::default()).unwrap();
//!
//! // Stretch 1% along x
//! let u: Vec<f64> = driver
//!     .geometry()
//!     .reference_coordinates()
//!     .chunks(3)
//!     .flat_map(|x| [0.01 * x[0], 0.0, 0.0])
//!     .collect();
//!
//! driver.begin_step(1.0, 1.0).unwrap();
//! let report = driver.update_points_from_displacement(&u).unwrap();
//! assert!(!report.cutback_requested());
//! driver.commit().unwrap();
//!
//! let sigma_xx = driver.stress(0, 0)[0];
//! assert!(sigma_xx > 0.0);
//! ```

pub mod config;
pub mod driver;
pub mod element;
pub mod error;
pub mod kinematics;
pub mod material;
pub mod math;
pub mod options;
pub mod quadrature;
pub mod results;
pub mod umat;

// Re-export common types
pub mod prelude {
    pub use crate::config::DriverConfig;
    pub use crate::driver::{PointUpdateDriver, StepPhase};
    pub use crate::element::{ElementGeometry, Hex8, ReferenceElement};
    pub use crate::error::{UmatError, UmatResult};
    pub use crate::kinematics::{DeformationGradients, ShapeGradients};
    pub use crate::material::{
        MaterialData, MaterialInput, MaterialModel, MaterialState, PointInputs, PointOutputs,
        StepContext, ValueSource,
    };
    pub use crate::math::{PolarDecomposition, StrainMeasure};
    pub use crate::options::UpdateOptions;
    pub use crate::quadrature::{
        OrientationPlacement, QuadratureField, QuadratureLayout, StateVariableLayout,
    };
    pub use crate::results::{hydrostatic, von_mises, StepReport};
    pub use crate::umat::{ForeignUmat, IsotropicElasticUmat, LegacyUmat, UmatAdapter, UmatArgs, UmatFn};
}
