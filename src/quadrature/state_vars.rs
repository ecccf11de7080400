//! Per-point state-variable blocks with interleaved grain orientation data

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{UmatError, UmatResult};
use crate::quadrature::QuadratureField;

/// Where the orientation block sits inside each point's state vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrientationPlacement {
    /// Before the first state variable
    Start,
    /// After the last state variable
    End,
    /// Starting at this component index
    At(usize),
}

impl Default for OrientationPlacement {
    fn default() -> Self {
        Self::End
    }
}

/// Composition of the per-point state vector seen by the material law
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateVariableLayout {
    /// Model state variables per point
    pub num_state_vars: usize,
    /// Orientation components per grain (0 when no orientation data)
    pub orientation_width: usize,
    /// Placement of the orientation block
    pub placement: OrientationPlacement,
}

impl StateVariableLayout {
    /// Layout with state variables only
    pub fn plain(num_state_vars: usize) -> Self {
        Self {
            num_state_vars,
            orientation_width: 0,
            placement: OrientationPlacement::End,
        }
    }

    /// Layout carrying `orientation_width` grain components at `placement`
    pub fn with_orientation(
        num_state_vars: usize,
        orientation_width: usize,
        placement: OrientationPlacement,
    ) -> Self {
        Self {
            num_state_vars,
            orientation_width,
            placement,
        }
    }

    /// Total components per point
    pub fn width(&self) -> usize {
        self.num_state_vars + self.orientation_width
    }

    /// Component range of the orientation block
    pub fn orientation_range(&self) -> UmatResult<Range<usize>> {
        let start = match self.placement {
            OrientationPlacement::Start => 0,
            OrientationPlacement::End => self.num_state_vars,
            OrientationPlacement::At(k) => {
                if k > self.num_state_vars {
                    return Err(UmatError::LayoutMismatch(format!(
                        "orientation offset {} lies beyond the {} state variables",
                        k, self.num_state_vars
                    )));
                }
                k
            }
        };
        Ok(start..start + self.orientation_width)
    }

    /// Fill `field` with the initial state vector, inserting the orientation
    /// block of each element's grain.
    ///
    /// # Arguments
    /// * `initial_state` - `num_state_vars` values applied to every point
    /// * `orientations` - `orientation_width` values per grain, grain-major
    /// * `element_grains` - grain index of each element (ignored without orientation data)
    pub fn populate(
        &self,
        field: &mut QuadratureField,
        initial_state: &[f64],
        orientations: &[f64],
        element_grains: &[usize],
    ) -> UmatResult<()> {
        field.check_stride(self.width())?;
        let range = self.orientation_range()?;

        if initial_state.len() != self.num_state_vars {
            return Err(UmatError::InvalidInput(format!(
                "expected {} initial state values, got {}",
                self.num_state_vars,
                initial_state.len()
            )));
        }

        let layout = field.layout();
        let num_grains = if self.orientation_width > 0 {
            if orientations.len() % self.orientation_width != 0 {
                return Err(UmatError::InvalidInput(format!(
                    "{} orientation values is not a multiple of the grain width {}",
                    orientations.len(),
                    self.orientation_width
                )));
            }
            if element_grains.len() != layout.num_elements {
                return Err(UmatError::InvalidInput(format!(
                    "expected a grain id for each of {} elements, got {}",
                    layout.num_elements,
                    element_grains.len()
                )));
            }
            orientations.len() / self.orientation_width
        } else {
            0
        };

        for element in 0..layout.num_elements {
            let grain_block = if self.orientation_width > 0 {
                let grain = element_grains[element];
                if grain >= num_grains {
                    return Err(UmatError::InvalidInput(format!(
                        "element {} references grain {} but only {} grains were given",
                        element, grain, num_grains
                    )));
                }
                let start = grain * self.orientation_width;
                &orientations[start..start + self.orientation_width]
            } else {
                &[][..]
            };

            for point in 0..layout.points_per_element {
                let values = field.point_mut(element, point);
                values[..range.start].copy_from_slice(&initial_state[..range.start]);
                values[range.clone()].copy_from_slice(grain_block);
                values[range.end..].copy_from_slice(&initial_state[range.start..]);
            }
        }

        Ok(())
    }
}
