//! Error types for the constitutive update kernel

use thiserror::Error;

/// Main error type for point-update operations
#[derive(Error, Debug)]
pub enum UmatError {
    #[error("Layout mismatch: {0}")]
    LayoutMismatch(String),

    #[error("Singular deformation gradient (det = {det:e})")]
    SingularDeformation { det: f64 },

    #[error("Degenerate deformation: {0}")]
    DegenerateDeformation(String),

    #[error("Polar decomposition did not converge after {iterations} iterations (residual {residual:e})")]
    PolarDecompositionDivergence { iterations: usize, residual: f64 },

    #[error("Material law rejected the increment (time step factor {time_step_factor})")]
    MaterialLawRejected { time_step_factor: f64 },

    #[error("{failed} of {total} points failed; first at element {element}, point {point}: {source}")]
    StepFailed {
        failed: usize,
        total: usize,
        element: usize,
        point: usize,
        source: Box<UmatError>,
    },

    #[error("Invalid state transition: {0}")]
    InvalidState(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl UmatError {
    /// True when the step may be retried with a smaller time increment
    /// without treating the failure as a hard fault.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, UmatError::MaterialLawRejected { .. })
    }
}

/// Result type for point-update operations
pub type UmatResult<T> = Result<T, UmatError>;

/// A failure attributed to one (element, point) pair during a pass
#[derive(Debug)]
pub struct PointFailure {
    pub element: usize,
    pub point: usize,
    pub error: UmatError,
}

/// Reduce the failures of one pass over `total` points into a single result.
///
/// Numerical faults take precedence over law rejections. When only
/// rejections occurred the smallest reported factor is forwarded.
pub(crate) fn reduce_failures(mut failures: Vec<PointFailure>, total: usize) -> UmatResult<()> {
    if failures.is_empty() {
        return Ok(());
    }
    failures.sort_by_key(|f| (f.element, f.point));

    let failed = failures.len();
    let hard = failures
        .iter()
        .position(|f| !f.error.is_recoverable());

    match hard {
        Some(idx) => {
            let first = failures.swap_remove(idx);
            log::warn!(
                "{} of {} points failed; first at element {}, point {}: {}",
                failed,
                total,
                first.element,
                first.point,
                first.error
            );
            Err(UmatError::StepFailed {
                failed,
                total,
                element: first.element,
                point: first.point,
                source: Box::new(first.error),
            })
        }
        None => {
            let factor = failures
                .iter()
                .filter_map(|f| match f.error {
                    UmatError::MaterialLawRejected { time_step_factor } => Some(time_step_factor),
                    _ => None,
                })
                .fold(f64::INFINITY, f64::min);
            log::warn!(
                "material law rejected the increment at {} of {} points (factor {})",
                failed,
                total,
                factor
            );
            Err(UmatError::MaterialLawRejected {
                time_step_factor: factor,
            })
        }
    }
}
