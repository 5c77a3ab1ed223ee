use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Options for building a core.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoreConfig {
    /// 1-based; values past the variant count wrap around.
    pub requested_variant_index: u64,
    /// Takes precedence over the index when set.
    pub requested_variant_name: Option<String>,
    pub flags: Flags,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Flags {
    pub allow_unique_variants: bool,
    /// Variant count reported for documents whose outcomes cannot be enumerated.
    pub default_num_variants: u64,
    /// Enumerable spaces larger than this are treated as non-unique.
    pub max_unique_variants: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            requested_variant_index: 1,
            requested_variant_name: None,
            flags: Flags::default(),
        }
    }
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            allow_unique_variants: true,
            default_num_variants: 100,
            max_unique_variants: 1_000_000,
        }
    }
}

impl CoreConfig {
    pub fn with_variant(index: u64) -> Self {
        Self { requested_variant_index: index, ..Self::default() }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = CoreConfig::from_json(r#"{"flags": {"allowUniqueVariants": false}}"#).unwrap();
        assert_eq!(config.requested_variant_index, 1);
        assert!(!config.flags.allow_unique_variants);
        assert_eq!(config.flags.default_num_variants, 100);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(CoreConfig::from_json("{requestedVariantIndex: 2}").is_err());
    }
}
