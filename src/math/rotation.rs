//! Conversions between unit quaternions and rotation matrices
//!
//! Quaternions are ordered `[w, x, y, z]`, the layout orientation files use.

use nalgebra::{Quaternion, Rotation3, UnitQuaternion};

use crate::math::Mat3;

/// Rotation matrix of a quaternion `[w, x, y, z]`; the input is normalised first
pub fn quaternion_to_rotation(q: &[f64; 4]) -> Mat3 {
    let unit = UnitQuaternion::from_quaternion(Quaternion::new(q[0], q[1], q[2], q[3]));
    unit.to_rotation_matrix().into_inner()
}

/// Quaternion `[w, x, y, z]` of a proper rotation matrix, with `w ≥ 0`
pub fn rotation_to_quaternion(r: &Mat3) -> [f64; 4] {
    let unit = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*r));
    let q = unit.quaternion();
    let sign = if q.w < 0.0 { -1.0 } else { 1.0 };
    [sign * q.w, sign * q.i, sign * q.j, sign * q.k]
}
