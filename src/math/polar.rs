//! Iterative polar decomposition of 3x3 deformation gradients

use crate::error::{UmatError, UmatResult};
use crate::math::{require_positive_determinant, Mat3, SINGULAR_TOLERANCE};

/// Default orthogonality tolerance on ‖RᵗR − I‖
pub const DEFAULT_POLAR_TOLERANCE: f64 = 1e-12;

/// Default iteration cap
pub const DEFAULT_POLAR_MAX_ITERATIONS: usize = 100;

/// Factorization F = R·U = V·R
#[derive(Debug, Clone, Copy)]
pub struct PolarDecomposition {
    /// Proper orthogonal rotation R
    pub rotation: Mat3,
    /// Right stretch U = Rᵗ·F
    pub right_stretch: Mat3,
    /// Left stretch V = F·Rᵗ
    pub left_stretch: Mat3,
    /// Number of refinement iterations performed
    pub iterations: usize,
}

impl PolarDecomposition {
    /// Decompose with the default tolerances and iteration cap
    pub fn new(f: &Mat3) -> UmatResult<Self> {
        Self::with_tolerance(
            f,
            DEFAULT_POLAR_TOLERANCE,
            DEFAULT_POLAR_MAX_ITERATIONS,
            SINGULAR_TOLERANCE,
        )
    }

    /// Decompose `f` by the Newton iteration R ← ½(R + R⁻ᵗ) starting from R₀ = F.
    ///
    /// # Errors
    /// * `SingularDeformation` when |det F| is below `singular_tolerance`
    /// * `DegenerateDeformation` when det F is negative
    /// * `PolarDecompositionDivergence` when the cap is reached first
    pub fn with_tolerance(
        f: &Mat3,
        tolerance: f64,
        max_iterations: usize,
        singular_tolerance: f64,
    ) -> UmatResult<Self> {
        require_positive_determinant(f, singular_tolerance)?;

        let identity = Mat3::identity();
        let mut r = *f;
        let mut residual = (r.transpose() * r - identity).norm();
        let mut iterations = 0;

        while !(residual < tolerance) {
            if iterations == max_iterations || !residual.is_finite() {
                return Err(UmatError::PolarDecompositionDivergence {
                    iterations,
                    residual,
                });
            }
            let r_inv = r.try_inverse().ok_or(UmatError::PolarDecompositionDivergence {
                iterations,
                residual,
            })?;
            r = 0.5 * (r + r_inv.transpose());
            residual = (r.transpose() * r - identity).norm();
            iterations += 1;
        }

        let u = r.transpose() * f;
        let v = f * r.transpose();

        Ok(Self {
            rotation: r,
            right_stretch: 0.5 * (u + u.transpose()),
            left_stretch: 0.5 * (v + v.transpose()),
            iterations,
        })
    }
}
