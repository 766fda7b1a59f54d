//! Stored quantities — measurements, temperatures, durations, dimensions.
//!
//! These are carried verbatim from the loader. No unit conversion or
//! arithmetic is performed on them.

use super::symbol::Symbol;
use serde::{Deserialize, Serialize};

/// An amount of something, exact or as a range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Measurement {
    Abs {
        #[serde(default)]
        unit: Option<Symbol>,
        #[serde(default)]
        value: Option<f64>,
    },
    Rel {
        #[serde(default)]
        unit: Option<Symbol>,
        #[serde(default)]
        value_min: Option<f64>,
        #[serde(default)]
        value_max: Option<f64>,
    },
}

/// Cooking temperature, exact or as a range / relative level ("medium-high").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Temperature {
    Abs {
        unit: Symbol,
        value: f64,
    },
    Rel {
        #[serde(default)]
        unit: Option<Symbol>,
        #[serde(default)]
        value_min: Option<f64>,
        #[serde(default)]
        value_max: Option<f64>,
        #[serde(default)]
        level: Option<Symbol>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Duration {
    Abs { value: f64, unit: Symbol },
    Rel { value_min: f64, value_max: f64, unit: Symbol },
}

/// Physical size in one to three axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Dimensions {
    Abs {
        values: Vec<f64>,
        unit: Symbol,
    },
    Rel {
        values_min: Vec<f64>,
        values_max: Vec<f64>,
        unit: Symbol,
    },
}

impl Dimensions {
    /// Number of axes described (1D, 2D or 3D).
    pub fn axes(&self) -> usize {
        match self {
            Self::Abs { values, .. } => values.len(),
            Self::Rel { values_min, values_max, .. } => values_min.len().max(values_max.len()),
        }
    }
}

/// How an ingredient is used by one instruction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngredientUsage {
    #[serde(default)]
    pub count: Option<u32>,
    /// Fraction of the ingredient used (0..=1).
    #[serde(default)]
    pub proportion: Option<f64>,
    #[serde(default)]
    pub quantity: Option<Measurement>,
    #[serde(default)]
    pub is_optional: bool,
}

/// How a piece of equipment is used by one instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentUsage {
    #[serde(default)]
    pub count: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_yaml() {
        let yaml = r#"
type: rel
level:
  kind: ITEM_PROPERTY
  canonical_form: medium_high
"#;
        let t: Temperature = serde_yaml_ng::from_str(yaml).unwrap();
        match t {
            Temperature::Rel { level: Some(level), unit: None, .. } => {
                assert_eq!(level.canonical_form(), "medium_high");
            }
            other => panic!("unexpected temperature: {:?}", other),
        }
    }

    #[test]
    fn test_usage_defaults() {
        let usage: IngredientUsage = serde_yaml_ng::from_str("{}").unwrap();
        assert_eq!(usage, IngredientUsage::default());
        assert!(!usage.is_optional);
    }

    #[test]
    fn test_dimension_axes() {
        let d = Dimensions::Rel {
            values_min: vec![20.0, 20.0],
            values_max: vec![30.0, 30.0, 5.0],
            unit: Symbol::unit("cm"),
        };
        assert_eq!(d.axes(), 3);
    }
}
