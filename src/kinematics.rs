//! Deformation gradient kinematics at quadrature points
//!
//! Shape-function gradients are pulled back to the reference configuration
//! once. Every Newton iteration then rebuilds
//!
//! ```text
//! F_end  = Σ_a x_a ⊗ ∂N_a/∂X
//! F_incr = F_end · F_begin⁻¹
//! ```
//!
//! while `F_begin` only changes when a step is committed.

use rayon::prelude::*;

use crate::element::{ElementGeometry, ReferenceElement};
use crate::error::{reduce_failures, PointFailure, UmatError, UmatResult};
use crate::math::{invert, mat3_from_column_major, mat3_to_column_major, Mat3};
use crate::quadrature::{QuadratureField, QuadratureLayout};

/// Components of a 3x3 tensor field
const TENSOR_STRIDE: usize = 9;

/// Column-major identity
const IDENTITY: [f64; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// Reference-configuration shape gradients ∂N_a/∂X at every point
#[derive(Debug, Clone)]
pub struct ShapeGradients {
    nodes_per_element: usize,
    /// `nodes × 3` row-major per point
    gradients: QuadratureField,
    /// det(∂X/∂ξ) per point
    reference_det: QuadratureField,
}

impl ShapeGradients {
    /// One-time precomputation over all elements.
    ///
    /// `DS = (∂N/∂ξ)·J⁻¹` with `J = ∂X/∂ξ` evaluated at each quadrature point.
    #[allow(non_snake_case)]
    pub fn compute(geometry: &ElementGeometry, element: &dyn ReferenceElement) -> UmatResult<Self> {
        let nodes_per_element = element.num_nodes();
        if geometry.nodes_per_element() != nodes_per_element {
            return Err(UmatError::LayoutMismatch(format!(
                "mesh has {} nodes per element, reference element has {}",
                geometry.nodes_per_element(),
                nodes_per_element
            )));
        }
        if element.num_points() == 0 {
            return Err(UmatError::InvalidInput(
                "reference element has no quadrature points".to_string(),
            ));
        }

        let layout = QuadratureLayout::new(geometry.num_elements(), element.num_points());
        let mut gradients = QuadratureField::new(layout, 3 * nodes_per_element);
        let mut reference_det = QuadratureField::new(layout, 1);

        // Homogeneous element type: natural derivatives are shared by all elements
        let dN_dxi: Vec<Vec<[f64; 3]>> = element
            .quadrature_points()
            .iter()
            .map(|xi| element.shape_derivatives(xi))
            .collect();

        for e in 0..layout.num_elements {
            let X = geometry.gather_reference(e);

            for (p, dn) in dN_dxi.iter().enumerate() {
                let mut J = Mat3::zeros();
                for (x, g) in X.iter().zip(dn) {
                    for i in 0..3 {
                        for j in 0..3 {
                            J[(i, j)] += x[i] * g[j];
                        }
                    }
                }

                let det = J.determinant();
                let J_inv = match J.try_inverse() {
                    Some(inv) if det > 0.0 && det.is_finite() => inv,
                    _ => {
                        return Err(UmatError::InvalidInput(format!(
                            "element {} has a degenerate reference Jacobian at point {} (det = {:e})",
                            e, p, det
                        )))
                    }
                };

                let ds = gradients.point_mut(e, p);
                for (a, g) in dn.iter().enumerate() {
                    for j in 0..3 {
                        ds[3 * a + j] = (0..3).map(|k| g[k] * J_inv[(k, j)]).sum();
                    }
                }
                reference_det.point_mut(e, p)[0] = det;
            }
        }

        Ok(Self {
            nodes_per_element,
            gradients,
            reference_det,
        })
    }

    pub fn layout(&self) -> QuadratureLayout {
        self.gradients.layout()
    }

    pub fn nodes_per_element(&self) -> usize {
        self.nodes_per_element
    }

    /// ∂N_a/∂X_j at `[3a + j]`
    pub fn point(&self, element: usize, point: usize) -> &[f64] {
        self.gradients.point(element, point)
    }

    /// Reference Jacobian determinant at a point
    pub fn reference_det(&self, element: usize, point: usize) -> f64 {
        self.reference_det.point(element, point)[0]
    }

    /// F = Σ_a x_a ⊗ ∂N_a/∂X for the given element nodal positions
    pub fn deformation_gradient(&self, element: usize, point: usize, nodes: &[[f64; 3]]) -> Mat3 {
        let ds = self.point(element, point);
        let mut f = Mat3::zeros();
        for (a, x) in nodes.iter().enumerate() {
            for i in 0..3 {
                for j in 0..3 {
                    f[(i, j)] += x[i] * ds[3 * a + j];
                }
            }
        }
        f
    }
}

/// Beginning, end and incremental deformation gradients, column-major
#[derive(Debug, Clone)]
pub struct DeformationGradients {
    begin: QuadratureField,
    end: QuadratureField,
    incremental: QuadratureField,
}

impl DeformationGradients {
    /// All three gradients start as the identity
    pub fn new(layout: QuadratureLayout) -> Self {
        let mut gradients = Self {
            begin: QuadratureField::new(layout, TENSOR_STRIDE),
            end: QuadratureField::new(layout, TENSOR_STRIDE),
            incremental: QuadratureField::new(layout, TENSOR_STRIDE),
        };
        gradients.init_identity();
        gradients
    }

    /// Reset every point to the undeformed state
    pub fn init_identity(&mut self) {
        for field in [&mut self.begin, &mut self.end, &mut self.incremental] {
            for chunk in field.as_mut_slice().chunks_exact_mut(TENSOR_STRIDE) {
                chunk.copy_from_slice(&IDENTITY);
            }
        }
    }

    pub fn layout(&self) -> QuadratureLayout {
        self.begin.layout()
    }

    pub fn begin(&self, element: usize, point: usize) -> Mat3 {
        mat3_from_column_major(self.begin.point(element, point))
    }

    pub fn end(&self, element: usize, point: usize) -> Mat3 {
        mat3_from_column_major(self.end.point(element, point))
    }

    pub fn incremental(&self, element: usize, point: usize) -> Mat3 {
        mat3_from_column_major(self.incremental.point(element, point))
    }

    pub fn begin_field(&self) -> &QuadratureField {
        &self.begin
    }

    pub fn end_field(&self) -> &QuadratureField {
        &self.end
    }

    pub fn incremental_field(&self) -> &QuadratureField {
        &self.incremental
    }

    /// Overwrite the beginning-of-step gradients, e.g. when restarting from saved state
    pub fn set_begin(&mut self, begin: &QuadratureField) -> UmatResult<()> {
        self.begin.copy_from(begin)
    }

    /// Recompute `F_end` and `F_incr` at every point from current nodal coordinates.
    ///
    /// `F_begin` is read only. A point whose `F_begin` is singular fails the
    /// whole pass; the remaining points are still evaluated.
    pub fn update_incremental_and_end(
        &mut self,
        geometry: &ElementGeometry,
        shape_gradients: &ShapeGradients,
        coordinates: &[f64],
        tolerance: f64,
        parallel: bool,
    ) -> UmatResult<()> {
        geometry.check_nodal_vector(coordinates)?;
        let layout = self.layout();
        if shape_gradients.layout() != layout {
            return Err(UmatError::LayoutMismatch(format!(
                "shape gradients cover {:?}, deformation gradients cover {:?}",
                shape_gradients.layout(),
                layout
            )));
        }

        let width = self.end.element_width();
        if layout.total_points() == 0 {
            return Ok(());
        }
        let begin = &self.begin;

        let update_element = |element: usize, end: &mut [f64], incr: &mut [f64]| {
            let nodes = geometry.gather(element, coordinates);
            let mut failures = Vec::new();

            for point in 0..layout.points_per_element {
                let local = point * TENSOR_STRIDE;
                let f_end = shape_gradients.deformation_gradient(element, point, &nodes);
                mat3_to_column_major(&f_end, &mut end[local..]);

                let f_begin = mat3_from_column_major(&begin.element(element)[local..]);
                match invert(&f_begin, tolerance) {
                    Ok(f_begin_inv) => mat3_to_column_major(&(f_end * f_begin_inv), &mut incr[local..]),
                    Err(error) => failures.push(PointFailure {
                        element,
                        point,
                        error,
                    }),
                }
            }
            failures
        };

        let failures: Vec<PointFailure> = if parallel {
            self.end
                .as_mut_slice()
                .par_chunks_mut(width)
                .zip(self.incremental.as_mut_slice().par_chunks_mut(width))
                .enumerate()
                .flat_map_iter(|(e, (end, incr))| update_element(e, end, incr))
                .collect()
        } else {
            self.end
                .as_mut_slice()
                .chunks_mut(width)
                .zip(self.incremental.as_mut_slice().chunks_mut(width))
                .enumerate()
                .flat_map(|(e, (end, incr))| update_element(e, end, incr))
                .collect()
        };

        reduce_failures(failures, layout.total_points())
    }

    /// Accept the converged step: `F_begin ← F_end`
    pub fn commit_step(&mut self) {
        self.begin
            .as_mut_slice()
            .copy_from_slice(self.end.as_slice());
    }
}
