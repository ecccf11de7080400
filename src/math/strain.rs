//! Strain measures of a deformation gradient
//!
//! Every measure rejects gradients with det F ≤ 0 (or |det F| below the
//! given singular tolerance) and maps F = I to the exact zero tensor.

use nalgebra::SymmetricEigen;
use serde::{Deserialize, Serialize};

use crate::error::{UmatError, UmatResult};
use crate::math::polar::{DEFAULT_POLAR_MAX_ITERATIONS, DEFAULT_POLAR_TOLERANCE};
use crate::math::{invert, require_positive_determinant, Mat3, PolarDecomposition};

/// Strain measure selectable for the values handed to the material law
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrainMeasure {
    /// E = ½(FᵗF − I)
    Lagrangian,
    /// e = ½(I − F⁻ᵗF⁻¹)
    Eulerian,
    /// B = U − I
    Biot,
    /// E = ½ ln(FFᵗ)
    Logarithmic,
}

impl StrainMeasure {
    /// Evaluate this measure for `f`
    pub fn evaluate(self, f: &Mat3, singular_tolerance: f64) -> UmatResult<Mat3> {
        match self {
            StrainMeasure::Lagrangian => lagrangian_strain(f, singular_tolerance),
            StrainMeasure::Eulerian => eulerian_strain(f, singular_tolerance),
            StrainMeasure::Biot => biot_strain(f, singular_tolerance),
            StrainMeasure::Logarithmic => logarithmic_strain(f, singular_tolerance),
        }
    }
}

/// Green-Lagrange strain E = ½(FᵗF − I)
pub fn lagrangian_strain(f: &Mat3, singular_tolerance: f64) -> UmatResult<Mat3> {
    require_positive_determinant(f, singular_tolerance)?;
    Ok(0.5 * (f.transpose() * f - Mat3::identity()))
}

/// Almansi strain e = ½(I − F⁻ᵗF⁻¹)
pub fn eulerian_strain(f: &Mat3, singular_tolerance: f64) -> UmatResult<Mat3> {
    require_positive_determinant(f, singular_tolerance)?;
    let f_inv = invert(f, singular_tolerance)?;
    Ok(0.5 * (Mat3::identity() - f_inv.transpose() * f_inv))
}

/// Biot strain B = U − I, with U the right stretch of F
pub fn biot_strain(f: &Mat3, singular_tolerance: f64) -> UmatResult<Mat3> {
    let polar = PolarDecomposition::with_tolerance(
        f,
        DEFAULT_POLAR_TOLERANCE,
        DEFAULT_POLAR_MAX_ITERATIONS,
        singular_tolerance,
    )?;
    Ok(polar.right_stretch - Mat3::identity())
}

/// Hencky strain ½ ln(FFᵗ) by spectral decomposition of B̂ = FFᵗ
pub fn logarithmic_strain(f: &Mat3, singular_tolerance: f64) -> UmatResult<Mat3> {
    require_positive_determinant(f, singular_tolerance)?;
    half_log_spd(&(f * f.transpose()))
}

/// Hencky strain of an incremental gradient dF, the increment handed to
/// the material law
pub fn incremental_logarithmic_strain(df: &Mat3, singular_tolerance: f64) -> UmatResult<Mat3> {
    logarithmic_strain(df, singular_tolerance)
}

/// ½ ln(B) = Σᵢ ½ ln(λᵢ) vᵢ⊗vᵢ for a symmetric B
fn half_log_spd(b: &Mat3) -> UmatResult<Mat3> {
    let diagonal = b[(0, 1)] == 0.0
        && b[(0, 2)] == 0.0
        && b[(1, 2)] == 0.0
        && b[(1, 0)] == 0.0
        && b[(2, 0)] == 0.0
        && b[(2, 1)] == 0.0;

    // Already spectral: avoid roundoff from the eigen solver so I maps to 0 exactly
    let (eigenvalues, eigenvectors) = if diagonal {
        (b.diagonal(), Mat3::identity())
    } else {
        let eig = SymmetricEigen::new(*b);
        (eig.eigenvalues, eig.eigenvectors)
    };

    let mut strain = Mat3::zeros();
    for i in 0..3 {
        let lambda = eigenvalues[i];
        if !(lambda > 0.0) {
            return Err(UmatError::DegenerateDeformation(format!(
                "non-positive principal value {:e} of FFᵗ",
                lambda
            )));
        }
        let half_ln = 0.5 * lambda.ln();
        if half_ln == 0.0 {
            continue;
        }
        let v = eigenvectors.column(i);
        strain += half_ln * (v * v.transpose());
    }

    Ok(strain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Vec3, SINGULAR_TOLERANCE};
    use approx::assert_relative_eq;
    use nalgebra::{Rotation3, Unit};

    const ALL: [StrainMeasure; 4] = [
        StrainMeasure::Lagrangian,
        StrainMeasure::Eulerian,
        StrainMeasure::Biot,
        StrainMeasure::Logarithmic,
    ];

    fn rotation() -> Mat3 {
        Rotation3::from_axis_angle(&Unit::new_normalize(Vec3::new(0.3, -1.0, 0.7)), 1.2).into_inner()
    }

    #[test]
    fn test_identity_gives_exact_zero() {
        let identity = Mat3::identity();
        for measure in ALL {
            let strain = measure.evaluate(&identity, SINGULAR_TOLERANCE).unwrap();
            assert_eq!(strain, Mat3::zeros(), "{:?} is not exactly zero", measure);
        }
        assert_eq!(incremental_logarithmic_strain(&identity, SINGULAR_TOLERANCE).unwrap(), Mat3::zeros());
    }

    #[test]
    fn test_simple_stretch_closed_form() {
        let f = Mat3::from_diagonal(&Vec3::new(1.1, 1.0, 1.0));

        let e = lagrangian_strain(&f, SINGULAR_TOLERANCE).unwrap();
        assert_relative_eq!(e[(0, 0)], 0.105, epsilon = 1e-14);
        assert_relative_eq!(e[(1, 1)], 0.0);
        assert_relative_eq!(e[(2, 2)], 0.0);

        let a = eulerian_strain(&f, SINGULAR_TOLERANCE).unwrap();
        assert_relative_eq!(a[(0, 0)], 0.5 * (1.0 - 1.0 / 1.21), epsilon = 1e-14);
        assert_relative_eq!(a[(0, 0)], 0.086776859504132, epsilon = 1e-12);
        assert_relative_eq!(a[(1, 1)], 0.0);

        let b = biot_strain(&f, SINGULAR_TOLERANCE).unwrap();
        assert_relative_eq!(b[(0, 0)], 0.1, epsilon = 1e-12);

        let h = logarithmic_strain(&f, SINGULAR_TOLERANCE).unwrap();
        assert_relative_eq!(h[(0, 0)], 1.1_f64.ln(), epsilon = 1e-14);
        assert_relative_eq!(h[(1, 1)], 0.0);
    }

    #[test]
    fn test_pure_rotation_has_zero_strain() {
        let r = rotation();
        for measure in ALL {
            let strain = measure.evaluate(&r, SINGULAR_TOLERANCE).unwrap();
            assert!(strain.norm() < 1e-12, "{:?} gave {}", measure, strain);
        }
    }

    #[test]
    fn test_log_strain_matches_spectral_shear() {
        // Simple shear: principal values of FFᵗ are known in closed form
        let gamma = 0.4;
        let f = Mat3::new(1.0, gamma, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0);
        let h = logarithmic_strain(&f, SINGULAR_TOLERANCE).unwrap();

        let b = f * f.transpose();
        let eig = b.symmetric_eigen();
        let trace_expected: f64 = eig.eigenvalues.iter().map(|l| 0.5 * l.ln()).sum();
        // det F = 1 so the Hencky strain is traceless
        assert_relative_eq!(h.trace(), trace_expected, epsilon = 1e-12);
        assert_relative_eq!(h.trace(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(h, h.transpose(), epsilon = 1e-14);
    }

    #[test]
    fn test_log_strain_of_rotated_stretch_is_left_stretch_log() {
        // F = R·diag → FFᵗ = R diag² Rᵗ, so ln V = R ln(diag) Rᵗ
        let r = rotation();
        let d = Vec3::new(1.2, 0.9, 1.05);
        let f = r * Mat3::from_diagonal(&d);
        let h = logarithmic_strain(&f, SINGULAR_TOLERANCE).unwrap();
        let expected = r * Mat3::from_diagonal(&d.map(f64::ln)) * r.transpose();
        assert_relative_eq!(h, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_input_rejected() {
        let inverted = Mat3::from_diagonal(&Vec3::new(1.0, -1.0, 1.0));
        let singular = Mat3::new(1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0);

        for measure in ALL {
            let err = measure.evaluate(&inverted, SINGULAR_TOLERANCE).unwrap_err();
            assert!(matches!(err, UmatError::DegenerateDeformation(_)), "{:?}", measure);

            let err = measure.evaluate(&singular, SINGULAR_TOLERANCE).unwrap_err();
            assert!(
                matches!(
                    err,
                    UmatError::SingularDeformation { .. } | UmatError::DegenerateDeformation(_)
                ),
                "{:?}",
                measure
            );
        }
    }

    #[test]
    fn test_singular_tolerance_is_configurable() {
        // det F = 1e-14: singular under the default, accepted under a looser bound
        let f = Mat3::from_diagonal(&Vec3::new(1e-7, 1e-7, 1.0));
        for measure in ALL {
            assert!(matches!(
                measure.evaluate(&f, SINGULAR_TOLERANCE),
                Err(UmatError::SingularDeformation { .. })
            ));
            let strain = measure.evaluate(&f, 1e-20).unwrap();
            assert!(strain.iter().all(|v| v.is_finite()), "{:?}", measure);
        }
        let h = logarithmic_strain(&f, 1e-20).unwrap();
        assert_relative_eq!(h[(0, 0)], 1e-7_f64.ln(), max_relative = 1e-12);
    }
}
