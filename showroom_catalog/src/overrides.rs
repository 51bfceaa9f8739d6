use std::{collections::HashMap, fs, path::Path};

use serde::Deserialize;

use crate::catalog::CatalogError;

/// Per-product default-variant preferences supplied as configuration data.
///
/// The prototype lineage hardcoded "first color" exceptions per product
/// name; this table replaces those branches with a JSON map from product
/// id to the asset reference that should be preselected.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct VariantOverrides {
    #[serde(flatten)]
    entries: HashMap<String, String>,
}

impl VariantOverrides {
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn preferred_asset(&self, product_id: &str) -> Option<&str> {
        self.entries.get(product_id).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_table_parses_a_plain_object() {
        let overrides: VariantOverrides =
            serde_json::from_str(r#"{"sofa1":"sofa_cream.glb"}"#).unwrap();
        assert_eq!(overrides.preferred_asset("sofa1"), Some("sofa_cream.glb"));
        assert_eq!(overrides.preferred_asset("lamp1"), None);
    }

    #[test]
    fn empty_table_prefers_nothing() {
        let overrides = VariantOverrides::default();
        assert!(overrides.is_empty());
        assert_eq!(overrides.preferred_asset("sofa1"), None);
    }
}
