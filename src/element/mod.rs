//! Reference elements and element geometry supplied by the mesh owner

pub mod geometry;
pub mod hex8;

pub use geometry::ElementGeometry;
pub use hex8::Hex8;

/// Isoparametric reference element with a fixed quadrature rule
pub trait ReferenceElement: Send + Sync {
    /// Nodes per element
    fn num_nodes(&self) -> usize;

    /// Quadrature points in natural coordinates
    fn quadrature_points(&self) -> &[[f64; 3]];

    /// Shape function derivatives ∂N_a/∂ξ at a natural point, one row per node
    fn shape_derivatives(&self, xi: &[f64; 3]) -> Vec<[f64; 3]>;

    /// Quadrature points per element
    fn num_points(&self) -> usize {
        self.quadrature_points().len()
    }
}
