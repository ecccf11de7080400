//! Trilinear hexahedron with a 2x2x2 Gauss rule

use crate::element::ReferenceElement;

/// Natural coordinates of the 8 corner nodes
///
/// ```text
///        7 -------- 6
///       /|         /|
///      4 -------- 5 |
///      | 3 -------|-2
///      |/         |/
///      0 -------- 1
/// ```
const NODES: [[f64; 3]; 8] = [
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
];

/// 8-node hexahedron
#[derive(Debug, Clone)]
pub struct Hex8 {
    points: [[f64; 3]; 8],
}

impl Default for Hex8 {
    fn default() -> Self {
        Self::new()
    }
}

impl Hex8 {
    pub fn new() -> Self {
        let g = 1.0 / 3.0_f64.sqrt();
        let mut points = [[0.0; 3]; 8];
        for (point, node) in points.iter_mut().zip(NODES.iter()) {
            *point = [g * node[0], g * node[1], g * node[2]];
        }
        Self { points }
    }

    /// Shape function values at a natural point
    pub fn shape_values(xi: &[f64; 3]) -> [f64; 8] {
        let mut n = [0.0; 8];
        for (value, node) in n.iter_mut().zip(NODES.iter()) {
            *value = 0.125
                * (1.0 + xi[0] * node[0])
                * (1.0 + xi[1] * node[1])
                * (1.0 + xi[2] * node[2]);
        }
        n
    }
}

impl ReferenceElement for Hex8 {
    fn num_nodes(&self) -> usize {
        8
    }

    fn quadrature_points(&self) -> &[[f64; 3]] {
        &self.points
    }

    fn shape_derivatives(&self, xi: &[f64; 3]) -> Vec<[f64; 3]> {
        NODES
            .iter()
            .map(|node| {
                let a = 1.0 + xi[0] * node[0];
                let b = 1.0 + xi[1] * node[1];
                let c = 1.0 + xi[2] * node[2];
                [
                    0.125 * node[0] * b * c,
                    0.125 * a * node[1] * c,
                    0.125 * a * b * node[2],
                ]
            })
            .collect()
    }
}
