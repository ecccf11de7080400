//! Quadrature-point field storage

pub mod field;
pub mod state_vars;

pub use field::{QuadratureField, QuadratureLayout};
pub use state_vars::{OrientationPlacement, StateVariableLayout};
