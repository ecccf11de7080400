//! Material property, state variable and orientation input

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{UmatError, UmatResult};
use crate::math::{quaternion_to_rotation, rotation_to_quaternion};
use crate::quadrature::{OrientationPlacement, StateVariableLayout};

/// Read `count` whitespace-separated floats.
///
/// Values beyond `count` are ignored with a warning.
pub fn read_values<R: BufRead>(reader: R, count: usize) -> UmatResult<Vec<f64>> {
    let mut values = Vec::with_capacity(count);
    let mut trailing = 0usize;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        for token in line.split_whitespace() {
            if values.len() == count {
                trailing += 1;
                continue;
            }
            let value: f64 = token.parse().map_err(|_| {
                UmatError::InvalidInput(format!(
                    "line {}: '{}' is not a number",
                    line_no + 1,
                    token
                ))
            })?;
            values.push(value);
        }
    }

    if values.len() < count {
        return Err(UmatError::InvalidInput(format!(
            "expected {} values, found {}",
            count,
            values.len()
        )));
    }
    if trailing > 0 {
        log::warn!("ignoring {} values after the expected {}", trailing, count);
    }
    Ok(values)
}

/// Where a flat list of values comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    /// Whitespace-separated text file
    File(PathBuf),
    /// Values given directly
    Inline(Vec<f64>),
}

impl ValueSource {
    /// Load exactly `count` values
    pub fn load(&self, count: usize) -> UmatResult<Vec<f64>> {
        match self {
            ValueSource::File(path) => {
                let file = File::open(path).map_err(|e| {
                    UmatError::InvalidInput(format!("cannot open {}: {}", path.display(), e))
                })?;
                read_values(BufReader::new(file), count)
            }
            ValueSource::Inline(values) => {
                if values.len() != count {
                    return Err(UmatError::InvalidInput(format!(
                        "expected {} inline values, got {}",
                        count,
                        values.len()
                    )));
                }
                Ok(values.clone())
            }
        }
    }
}

/// Components of a `[w, x, y, z]` quaternion orientation
pub const QUATERNION_WIDTH: usize = 4;

/// Bring every quaternion of a grain-major list to unit length with `w ≥ 0`.
///
/// Each quaternion is round-tripped through its rotation matrix, so two
/// inputs describing the same rotation load identically.
pub fn canonical_quaternions(values: &mut [f64]) -> UmatResult<()> {
    if values.len() % QUATERNION_WIDTH != 0 {
        return Err(UmatError::InvalidInput(format!(
            "{} orientation values is not a whole number of quaternions",
            values.len()
        )));
    }
    for (grain, q) in values.chunks_exact_mut(QUATERNION_WIDTH).enumerate() {
        let norm = q.iter().map(|v| v * v).sum::<f64>().sqrt();
        if !(norm > 0.0) || !norm.is_finite() {
            return Err(UmatError::InvalidInput(format!(
                "grain {} has a degenerate orientation quaternion {:?}",
                grain, q
            )));
        }
        let rotation = quaternion_to_rotation(&[q[0], q[1], q[2], q[3]]);
        q.copy_from_slice(&rotation_to_quaternion(&rotation));
    }
    Ok(())
}

/// Grain orientation data interleaved into the state vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrientationInput {
    pub source: ValueSource,
    /// Components per grain (e.g. 4 for a quaternion)
    pub width: usize,
    pub num_grains: usize,
    #[serde(default)]
    pub placement: OrientationPlacement,
}

/// Material input as configured by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialInput {
    pub props: ValueSource,
    pub state: ValueSource,
    pub num_props: usize,
    pub num_state_vars: usize,
    #[serde(default)]
    pub orientation: Option<OrientationInput>,
}

/// Loaded material input
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialData {
    pub properties: Vec<f64>,
    pub initial_state: Vec<f64>,
    /// Grain-major orientation values, empty without orientation data
    pub orientations: Vec<f64>,
    pub state_layout: StateVariableLayout,
}

impl MaterialInput {
    /// Consistency of the declared sizes
    pub fn check(&self) -> UmatResult<()> {
        if self.num_props == 0 {
            return Err(UmatError::InvalidInput(
                "a material needs at least one property".to_string(),
            ));
        }
        if self.num_state_vars == 0 {
            return Err(UmatError::InvalidInput(
                "a material needs at least one state variable".to_string(),
            ));
        }
        if let Some(orientation) = &self.orientation {
            if orientation.width == 0 || orientation.num_grains == 0 {
                return Err(UmatError::InvalidInput(format!(
                    "orientation data needs a positive width and grain count (got {} x {})",
                    orientation.num_grains, orientation.width
                )));
            }
        }
        Ok(())
    }

    /// Layout of the per-point state vector implied by this input
    pub fn state_layout(&self) -> StateVariableLayout {
        match &self.orientation {
            Some(o) => StateVariableLayout::with_orientation(self.num_state_vars, o.width, o.placement),
            None => StateVariableLayout::plain(self.num_state_vars),
        }
    }

    /// Check, then read every source
    pub fn load(&self) -> UmatResult<MaterialData> {
        self.check()?;
        let state_layout = self.state_layout();
        state_layout.orientation_range()?;

        let properties = self.props.load(self.num_props)?;
        let initial_state = self.state.load(self.num_state_vars)?;
        let orientations = match &self.orientation {
            Some(o) => {
                let mut values = o.source.load(o.width * o.num_grains)?;
                if o.width == QUATERNION_WIDTH {
                    canonical_quaternions(&mut values)?;
                }
                values
            }
            None => Vec::new(),
        };

        log::info!(
            "loaded {} properties, {} state variables, {} orientation values",
            properties.len(),
            initial_state.len(),
            orientations.len()
        );

        Ok(MaterialData {
            properties,
            initial_state,
            orientations,
            state_layout,
        })
    }
}
