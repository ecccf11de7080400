//! Small dense tensor utilities for point-level kinematics

pub mod polar;
pub mod rotation;
pub mod strain;

use nalgebra::{Matrix3, Matrix6, Vector3, Vector6};

use crate::error::{UmatError, UmatResult};

pub type Mat3 = Matrix3<f64>;
pub type Mat6 = Matrix6<f64>;
pub type Vec3 = Vector3<f64>;
pub type Vec6 = Vector6<f64>;

pub use polar::PolarDecomposition;
pub use rotation::{quaternion_to_rotation, rotation_to_quaternion};
pub use strain::{
    biot_strain, eulerian_strain, incremental_logarithmic_strain, lagrangian_strain,
    logarithmic_strain, StrainMeasure,
};

/// Determinant magnitude below which a deformation gradient is treated as singular
pub const SINGULAR_TOLERANCE: f64 = 1e-12;

/// Build a 3x3 tensor from 9 column-major components
pub fn mat3_from_column_major(data: &[f64]) -> Mat3 {
    Mat3::from_column_slice(&data[..9])
}

/// Write a 3x3 tensor into 9 column-major components
pub fn mat3_to_column_major(m: &Mat3, out: &mut [f64]) {
    out[..9].copy_from_slice(m.as_slice());
}

/// Symmetric 3x3 tensor to Voigt components (11, 22, 33, 23, 13, 12)
pub fn sym_to_voigt(m: &Mat3) -> Vec6 {
    Vec6::new(
        m[(0, 0)],
        m[(1, 1)],
        m[(2, 2)],
        m[(1, 2)],
        m[(0, 2)],
        m[(0, 1)],
    )
}

/// Voigt components (11, 22, 33, 23, 13, 12) to a symmetric 3x3 tensor
pub fn voigt_to_sym(v: &[f64]) -> Mat3 {
    #[rustfmt::skip]
    let m = Mat3::new(
        v[0], v[5], v[4],
        v[5], v[1], v[3],
        v[4], v[3], v[2],
    );
    m
}

/// Check that `f` is orientation preserving and invertible.
///
/// Returns the determinant on success.
pub fn require_positive_determinant(f: &Mat3, tolerance: f64) -> UmatResult<f64> {
    let det = f.determinant();
    if !det.is_finite() || det.abs() < tolerance {
        return Err(UmatError::SingularDeformation { det });
    }
    if det < 0.0 {
        return Err(UmatError::DegenerateDeformation(format!(
            "inverted deformation gradient (det = {:e})",
            det
        )));
    }
    Ok(det)
}

/// Invert a deformation gradient, failing when it is numerically singular
pub fn invert(f: &Mat3, tolerance: f64) -> UmatResult<Mat3> {
    let det = f.determinant();
    if !det.is_finite() || det.abs() < tolerance {
        return Err(UmatError::SingularDeformation { det });
    }
    f.try_inverse()
        .ok_or(UmatError::SingularDeformation { det })
}
