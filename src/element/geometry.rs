//! Element connectivity and nodal coordinates

use serde::{Deserialize, Serialize};

use crate::error::{UmatError, UmatResult};

/// Homogeneous element mesh as seen by the point-update kernel.
///
/// Coordinates are node-major: `[x0, y0, z0, x1, y1, z1, ...]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementGeometry {
    nodes_per_element: usize,
    connectivity: Vec<usize>,
    reference_coordinates: Vec<f64>,
}

impl ElementGeometry {
    /// Create a geometry, validating connectivity against the node count
    pub fn new(
        nodes_per_element: usize,
        connectivity: Vec<usize>,
        reference_coordinates: Vec<f64>,
    ) -> UmatResult<Self> {
        if nodes_per_element == 0 {
            return Err(UmatError::InvalidInput(
                "elements must have at least one node".to_string(),
            ));
        }
        if connectivity.len() % nodes_per_element != 0 {
            return Err(UmatError::InvalidInput(format!(
                "connectivity length {} is not a multiple of {} nodes per element",
                connectivity.len(),
                nodes_per_element
            )));
        }
        if reference_coordinates.len() % 3 != 0 {
            return Err(UmatError::InvalidInput(format!(
                "coordinate vector length {} is not a multiple of 3",
                reference_coordinates.len()
            )));
        }
        let num_nodes = reference_coordinates.len() / 3;
        if let Some(&bad) = connectivity.iter().find(|&&n| n >= num_nodes) {
            return Err(UmatError::InvalidInput(format!(
                "connectivity references node {} but the mesh has {} nodes",
                bad, num_nodes
            )));
        }

        Ok(Self {
            nodes_per_element,
            connectivity,
            reference_coordinates,
        })
    }

    /// Regular block of `nx × ny × nz` hexahedra spanning `size`, with the
    /// corner node ordering of [`Hex8`](crate::element::Hex8).
    pub fn structured_block(nx: usize, ny: usize, nz: usize, size: [f64; 3]) -> UmatResult<Self> {
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(UmatError::InvalidInput(
                "block needs at least one element per direction".to_string(),
            ));
        }
        let node_id = |i: usize, j: usize, k: usize| i + (nx + 1) * (j + (ny + 1) * k);

        let mut coords = Vec::with_capacity(3 * (nx + 1) * (ny + 1) * (nz + 1));
        for k in 0..=nz {
            for j in 0..=ny {
                for i in 0..=nx {
                    coords.push(size[0] * i as f64 / nx as f64);
                    coords.push(size[1] * j as f64 / ny as f64);
                    coords.push(size[2] * k as f64 / nz as f64);
                }
            }
        }

        let mut connectivity = Vec::with_capacity(8 * nx * ny * nz);
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    connectivity.extend_from_slice(&[
                        node_id(i, j, k),
                        node_id(i + 1, j, k),
                        node_id(i + 1, j + 1, k),
                        node_id(i, j + 1, k),
                        node_id(i, j, k + 1),
                        node_id(i + 1, j, k + 1),
                        node_id(i + 1, j + 1, k + 1),
                        node_id(i, j + 1, k + 1),
                    ]);
                }
            }
        }

        Self::new(8, connectivity, coords)
    }

    pub fn nodes_per_element(&self) -> usize {
        self.nodes_per_element
    }

    pub fn num_elements(&self) -> usize {
        self.connectivity.len() / self.nodes_per_element
    }

    pub fn num_nodes(&self) -> usize {
        self.reference_coordinates.len() / 3
    }

    /// Global node ids of one element
    pub fn element_nodes(&self, element: usize) -> &[usize] {
        let start = element * self.nodes_per_element;
        &self.connectivity[start..start + self.nodes_per_element]
    }

    pub fn reference_coordinates(&self) -> &[f64] {
        &self.reference_coordinates
    }

    /// Check a global coordinate or displacement vector against the node count
    pub fn check_nodal_vector(&self, values: &[f64]) -> UmatResult<()> {
        if values.len() != self.reference_coordinates.len() {
            return Err(UmatError::InvalidInput(format!(
                "nodal vector has {} values, expected {}",
                values.len(),
                self.reference_coordinates.len()
            )));
        }
        Ok(())
    }

    /// Element nodal positions taken from a global coordinate vector
    pub fn gather(&self, element: usize, coordinates: &[f64]) -> Vec<[f64; 3]> {
        self.element_nodes(element)
            .iter()
            .map(|&n| [coordinates[3 * n], coordinates[3 * n + 1], coordinates[3 * n + 2]])
            .collect()
    }

    /// Element nodal positions in the reference configuration
    pub fn gather_reference(&self, element: usize) -> Vec<[f64; 3]> {
        self.gather(element, &self.reference_coordinates)
    }

    /// Current coordinates x = X + u
    pub fn displaced_coordinates(&self, displacement: &[f64]) -> UmatResult<Vec<f64>> {
        self.check_nodal_vector(displacement)?;
        Ok(self
            .reference_coordinates
            .iter()
            .zip(displacement)
            .map(|(x, u)| x + u)
            .collect())
    }
}
