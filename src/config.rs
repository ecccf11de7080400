//! JSON driver configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::UmatResult;
use crate::material::MaterialInput;
use crate::options::UpdateOptions;

/// Driver options plus the material input they apply to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    #[serde(default)]
    pub options: UpdateOptions,
    pub material: MaterialInput,
}

impl DriverConfig {
    pub fn from_json(json: &str) -> UmatResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.material.check()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> UmatResult<Self> {
        let path = path.as_ref();
        let config = Self::from_json(&std::fs::read_to_string(path)?)?;
        log::info!("loaded driver configuration from {}", path.display());
        Ok(config)
    }

    pub fn to_json(&self) -> UmatResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UmatError;
    use crate::material::ValueSource;
    use crate::math::StrainMeasure;

    const CONFIG: &str = r#"{
        "options": { "incremental_strain": "Eulerian" },
        "material": {
            "props": { "inline": [70e3, 0.33] },
            "state": { "inline": [0.0] },
            "num_props": 2,
            "num_state_vars": 1
        }
    }"#;

    #[test]
    fn test_parse() {
        let config = DriverConfig::from_json(CONFIG).unwrap();
        assert_eq!(config.options.incremental_strain, StrainMeasure::Eulerian);
        assert_eq!(config.options.total_strain, StrainMeasure::Eulerian);
        assert_eq!(config.material.props, ValueSource::Inline(vec![70e3, 0.33]));

        let again = DriverConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(again, config);
    }

    #[test]
    fn test_invalid_json_and_material() {
        assert!(matches!(
            DriverConfig::from_json("{ not json"),
            Err(UmatError::SerializationError(_))
        ));

        let bad = CONFIG.replace("\"num_state_vars\": 1", "\"num_state_vars\": 0");
        assert!(matches!(
            DriverConfig::from_json(&bad),
            Err(UmatError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            DriverConfig::from_file("/nonexistent/driver.json"),
            Err(UmatError::IoError(_))
        ));
    }
}
