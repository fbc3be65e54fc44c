use serde::{Deserialize, Serialize};

use crate::error::{EcsError, Result};

/// Capacity bounds for a [`World`](crate::World). Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcsConfig {
    /// Maximum number of simultaneously alive entities.
    pub max_entities: u32,
    /// Maximum number of distinct component types (signature width).
    pub max_component_types: u32,
}

impl Default for EcsConfig {
    fn default() -> Self {
        Self {
            max_entities: 1000,
            max_component_types: 1000,
        }
    }
}

impl EcsConfig {
    /// Create a config with explicit bounds.
    pub fn new(max_entities: u32, max_component_types: u32) -> Self {
        Self {
            max_entities,
            max_component_types,
        }
    }

    /// Parse a config from a TOML table. Missing keys fall back to defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| EcsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject bounds the world cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.max_entities == 0 {
            return Err(EcsError::InvalidConfig(
                "max_entities must be greater than zero".into(),
            ));
        }
        if self.max_component_types == 0 {
            return Err(EcsError::InvalidConfig(
                "max_component_types must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bounds() {
        let config = EcsConfig::default();
        assert_eq!(config.max_entities, 1000);
        assert_eq!(config.max_component_types, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_partial_toml() {
        let config = EcsConfig::from_toml_str("max_entities = 64").unwrap();
        assert_eq!(config.max_entities, 64);
        assert_eq!(config.max_component_types, 1000);
    }

    #[test]
    fn zero_capacity_rejected() {
        let err = EcsConfig::new(0, 8).validate().unwrap_err();
        assert!(matches!(err, EcsError::InvalidConfig(_)));
        assert!(EcsConfig::from_toml_str("max_component_types = 0").is_err());
    }

    #[test]
    fn malformed_toml_rejected() {
        let err = EcsConfig::from_toml_str("max_entities = \"lots\"").unwrap_err();
        assert!(matches!(err, EcsError::InvalidConfig(_)));
    }
}
