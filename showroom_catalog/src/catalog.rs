use std::{fs, path::Path};

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

use crate::product::Product;

/// Bucket used by [`Catalog::grouped_by_category`] for products that carry
/// no grouping key of their own.
pub const UNGROUPED_CATEGORY: &str = "Uncategorized";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("reading catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing catalog {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("catalog {path} contains no products")]
    Empty { path: String },
    #[error("product '{id}' has no loadable asset reference")]
    InvalidProduct { id: String },
    #[error("duplicate product id '{id}'")]
    DuplicateId { id: String },
}

/// The catalog files shipped across the prototype lineage come in three
/// spellings: a flat product array, an array of category groups, and an
/// object keyed by category name. All of them normalize into one flat
/// product list here; nothing downstream branches on the source shape.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogDocument {
    Flat(Vec<Product>),
    Grouped(Vec<CategoryGroup>),
    GroupedMap(IndexMap<String, Vec<Product>>),
}

#[derive(Debug, Deserialize)]
struct CategoryGroup {
    category: String,
    models: Vec<Product>,
}

/// Immutable, validated product list. Construction guarantees the list is
/// non-empty, ids are unique and every product has a loadable asset.
#[derive(Debug, Clone)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw, &path.display().to_string())
    }

    /// Parse and normalize a catalog document. `origin` labels the source
    /// in error messages (a path for files, a short tag for tests).
    pub fn from_json(raw: &str, origin: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument =
            serde_json::from_str(raw).map_err(|source| CatalogError::Parse {
                path: origin.to_string(),
                source,
            })?;

        let products = match document {
            CatalogDocument::Flat(products) => products,
            CatalogDocument::Grouped(groups) => groups
                .into_iter()
                .flat_map(|group| {
                    let category = group.category;
                    group.models.into_iter().map(move |mut product| {
                        product.category = Some(category.clone());
                        product
                    })
                })
                .collect(),
            CatalogDocument::GroupedMap(groups) => groups
                .into_iter()
                .flat_map(|(category, models)| {
                    models.into_iter().map(move |mut product| {
                        product.category = Some(category.clone());
                        product
                    })
                })
                .collect(),
        };

        if products.is_empty() {
            return Err(CatalogError::Empty {
                path: origin.to_string(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for product in &products {
            if !product.has_loadable_asset() {
                return Err(CatalogError::InvalidProduct {
                    id: product.id.clone(),
                });
            }
            if !seen.insert(product.id.as_str()) {
                return Err(CatalogError::DuplicateId {
                    id: product.id.clone(),
                });
            }
        }

        Ok(Catalog { products })
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn by_id(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|product| product.id == id)
    }

    /// The defined reset target when a selection becomes invalid.
    pub fn first(&self) -> &Product {
        &self.products[0]
    }

    /// Category buckets in first-appearance order; products keep their
    /// catalog order within each bucket.
    pub fn grouped_by_category(&self) -> IndexMap<String, Vec<&Product>> {
        let mut groups: IndexMap<String, Vec<&Product>> = IndexMap::new();
        for product in &self.products {
            let key = product
                .category
                .clone()
                .unwrap_or_else(|| UNGROUPED_CATEGORY.to_string());
            groups.entry(key).or_default().push(product);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLAT: &str = r#"[
        {"id":"sofa1","name":"Nimbus Sofa","category":"Sofas","file":"sofa_black.glb"},
        {"id":"lamp1","name":"Arc Lamp","category":"Lamps","file":"lamp.glb"},
        {"id":"stool1","name":"Stool","file":"stool.glb"}
    ]"#;

    #[test]
    fn flat_document_loads_in_order() {
        let catalog = Catalog::from_json(FLAT, "flat").unwrap();
        let ids: Vec<&str> = catalog.products().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["sofa1", "lamp1", "stool1"]);
        assert!(catalog.by_id("lamp1").is_some());
        assert_eq!(catalog.first().id, "sofa1");
    }

    #[test]
    fn grouped_array_derives_category_from_group_key() {
        let raw = r#"[
            {"category":"Sofas","models":[{"id":"sofa1","name":"Nimbus","file":"s.glb"}]},
            {"category":"Lamps","models":[{"id":"lamp1","name":"Arc","file":"l.glb"}]}
        ]"#;
        let catalog = Catalog::from_json(raw, "grouped").unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.by_id("sofa1").unwrap().category.as_deref(),
            Some("Sofas")
        );
    }

    #[test]
    fn grouped_object_map_normalizes_like_the_array_form() {
        let raw = r#"{
            "Cabinets":[{"id":"cab1","name":"Tall Cabinet","file":"cab.glb"}],
            "Tables":[{"id":"tab1","name":"Oak Table","file":"tab.glb"}]
        }"#;
        let catalog = Catalog::from_json(raw, "map").unwrap();
        let groups = catalog.grouped_by_category();
        let keys: Vec<&str> = groups.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Cabinets", "Tables"]);
    }

    #[test]
    fn empty_array_is_reported_not_crashed() {
        assert!(matches!(
            Catalog::from_json("[]", "empty"),
            Err(CatalogError::Empty { .. })
        ));
    }

    #[test]
    fn non_array_payload_is_a_parse_error() {
        assert!(matches!(
            Catalog::from_json("42", "scalar"),
            Err(CatalogError::Parse { .. })
        ));
    }

    #[test]
    fn product_without_loadable_asset_is_rejected() {
        let raw = r#"[{"id":"ghost","name":"Ghost","variants":[{"label":"None"}]}]"#;
        assert!(matches!(
            Catalog::from_json(raw, "ghost"),
            Err(CatalogError::InvalidProduct { id }) if id == "ghost"
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let raw = r#"[
            {"id":"sofa1","name":"A","file":"a.glb"},
            {"id":"sofa1","name":"B","file":"b.glb"}
        ]"#;
        assert!(matches!(
            Catalog::from_json(raw, "dup"),
            Err(CatalogError::DuplicateId { id }) if id == "sofa1"
        ));
    }

    #[test]
    fn ungrouped_products_land_in_the_default_bucket() {
        let catalog = Catalog::from_json(FLAT, "flat").unwrap();
        let groups = catalog.grouped_by_category();
        let keys: Vec<&str> = groups.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Sofas", "Lamps", UNGROUPED_CATEGORY]);
        assert_eq!(groups[UNGROUPED_CATEGORY].len(), 1);
    }
}
