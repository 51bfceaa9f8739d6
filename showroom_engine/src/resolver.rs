use showroom_catalog::{Product, Variant, VariantOverrides};

/// Display variants for a product plus the entry to preselect.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub variants: Vec<Variant>,
    pub default_index: usize,
}

/// Work out which variants a product actually offers.
///
/// A variant is usable only when it carries an asset reference of its own;
/// products with zero or one usable entries are treated as variant-less
/// and get a single implicit variant pointing at the primary asset.
///
/// The preselected entry is, in order: the variant matching `prior_asset`
/// (deep-link restore), the variant named by the override table, index 0.
/// Matching is by asset reference, never by label — labels may repeat.
pub fn resolve(
    product: &Product,
    prior_asset: Option<&str>,
    overrides: &VariantOverrides,
) -> Resolution {
    let usable: Vec<Variant> = product
        .variants
        .iter()
        .filter(|variant| variant.usable_asset().is_some())
        .cloned()
        .collect();

    if usable.len() <= 1 {
        let asset = product
            .primary_asset_ref()
            .or_else(|| usable.first().and_then(Variant::usable_asset))
            .map(str::to_string);
        // Catalog validation guarantees something loadable exists.
        debug_assert!(asset.is_some(), "product {} has no loadable asset", product.id);
        let variants = vec![Variant {
            label: product.name.clone(),
            swatch: None,
            asset,
        }];
        return Resolution {
            variants,
            default_index: 0,
        };
    }

    let default_index = prior_asset
        .and_then(|asset| position_of(&usable, asset))
        .or_else(|| {
            overrides
                .preferred_asset(&product.id)
                .and_then(|asset| position_of(&usable, asset))
        })
        .unwrap_or(0);

    Resolution {
        variants: usable,
        default_index,
    }
}

fn position_of(variants: &[Variant], asset: &str) -> Option<usize> {
    variants
        .iter()
        .position(|variant| variant.usable_asset() == Some(asset))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(label: &str, asset: Option<&str>) -> Variant {
        Variant {
            label: label.to_string(),
            swatch: None,
            asset: asset.map(str::to_string),
        }
    }

    fn sofa(variants: Vec<Variant>) -> Product {
        Product {
            id: "sofa1".to_string(),
            name: "Nimbus Sofa".to_string(),
            category: Some("Sofas".to_string()),
            primary_asset: Some("sofa_black.glb".to_string()),
            variants,
            dimensions: None,
            materials: Vec::new(),
            default_camera: None,
        }
    }

    #[test]
    fn multiple_usable_variants_default_to_the_first() {
        let product = sofa(vec![
            variant("Black", Some("sofa_black.glb")),
            variant("Cream", Some("sofa_cream.glb")),
        ]);
        let resolution = resolve(&product, None, &VariantOverrides::default());
        assert_eq!(resolution.variants.len(), 2);
        assert_eq!(resolution.default_index, 0);
    }

    #[test]
    fn prior_asset_restores_the_matching_entry() {
        let product = sofa(vec![
            variant("Black", Some("sofa_black.glb")),
            variant("Cream", Some("sofa_cream.glb")),
        ]);
        let resolution = resolve(
            &product,
            Some("sofa_cream.glb"),
            &VariantOverrides::default(),
        );
        assert_eq!(resolution.default_index, 1);
    }

    #[test]
    fn duplicate_labels_match_by_asset_reference() {
        let product = sofa(vec![
            variant("Leather", Some("sofa_tan.glb")),
            variant("Leather", Some("sofa_brown.glb")),
        ]);
        let resolution = resolve(
            &product,
            Some("sofa_brown.glb"),
            &VariantOverrides::default(),
        );
        assert_eq!(resolution.default_index, 1);
    }

    #[test]
    fn unknown_prior_asset_falls_back_to_zero() {
        let product = sofa(vec![
            variant("Black", Some("sofa_black.glb")),
            variant("Cream", Some("sofa_cream.glb")),
        ]);
        let resolution = resolve(&product, Some("gone.glb"), &VariantOverrides::default());
        assert_eq!(resolution.default_index, 0);
    }

    #[test]
    fn single_usable_variant_collapses_to_the_primary_asset() {
        let product = sofa(vec![
            variant("Black", Some("sofa_black.glb")),
            variant("Swatch only", None),
        ]);
        let resolution = resolve(&product, None, &VariantOverrides::default());
        assert_eq!(resolution.variants.len(), 1);
        assert_eq!(resolution.variants[0].label, "Nimbus Sofa");
        assert_eq!(
            resolution.variants[0].usable_asset(),
            Some("sofa_black.glb")
        );
    }

    #[test]
    fn variantless_product_without_primary_uses_its_only_asset() {
        let mut product = sofa(vec![variant("Only", Some("sofa_only.glb"))]);
        product.primary_asset = None;
        let resolution = resolve(&product, None, &VariantOverrides::default());
        assert_eq!(resolution.variants[0].usable_asset(), Some("sofa_only.glb"));
    }

    #[test]
    fn override_table_picks_the_default_when_no_prior_asset() {
        let product = sofa(vec![
            variant("Black", Some("sofa_black.glb")),
            variant("Cream", Some("sofa_cream.glb")),
        ]);
        let overrides = VariantOverrides::from_entries([("sofa1", "sofa_cream.glb")]);
        let resolution = resolve(&product, None, &overrides);
        assert_eq!(resolution.default_index, 1);
    }

    #[test]
    fn prior_asset_wins_over_the_override_table() {
        let product = sofa(vec![
            variant("Black", Some("sofa_black.glb")),
            variant("Cream", Some("sofa_cream.glb")),
        ]);
        let overrides = VariantOverrides::from_entries([("sofa1", "sofa_cream.glb")]);
        let resolution = resolve(&product, Some("sofa_black.glb"), &overrides);
        assert_eq!(resolution.default_index, 0);
    }
}
