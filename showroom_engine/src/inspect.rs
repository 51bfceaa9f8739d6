use std::fs;

use anyhow::{Context, Result};
use serde::Serialize;
use showroom_catalog::{AssetLibrary, Catalog, VariantOverrides};

use crate::cli::InspectArgs;

#[derive(Serialize)]
struct CategorySummary {
    category: String,
    products: Vec<ProductSummary>,
}

#[derive(Serialize)]
struct ProductSummary {
    id: String,
    name: String,
    variants: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_variant_override: Option<String>,
}

#[derive(Serialize)]
struct CatalogSummary {
    total_products: usize,
    categories: Vec<CategorySummary>,
}

pub fn execute(args: InspectArgs) -> Result<()> {
    let catalog = Catalog::load_from_path(&args.catalog)
        .with_context(|| format!("loading catalog {}", args.catalog.display()))?;
    let overrides = match args.overrides.as_ref() {
        Some(path) => VariantOverrides::load_from_path(path)
            .with_context(|| format!("loading variant overrides {}", path.display()))?,
        None => VariantOverrides::default(),
    };

    let summary = build_summary(&catalog, &overrides);
    println!(
        "{} products across {} categories",
        summary.total_products,
        summary.categories.len()
    );
    for category in &summary.categories {
        println!("  {} ({})", category.category, category.products.len());
        if args.verbose {
            for product in &category.products {
                let dims = product.dimensions.as_deref().unwrap_or("-");
                println!(
                    "    {} [{}] variants={} dims={}",
                    product.name, product.id, product.variants, dims
                );
            }
        }
    }

    if let Some(path) = args.catalog_summary_json.as_ref() {
        let json = serde_json::to_string_pretty(&summary)
            .context("serializing catalog summary to JSON")?;
        fs::write(path, &json)
            .with_context(|| format!("writing catalog summary to {}", path.display()))?;
        println!("Saved catalog summary to {}", path.display());
    }

    if let Some(root) = args.asset_root.as_ref() {
        let library = AssetLibrary::scan_root(root)
            .with_context(|| format!("scanning asset root {}", root.display()))?;
        let audit = library.audit(&catalog);
        println!(
            "asset audit: {} present, {} missing, {} remote ({} files scanned)",
            audit.present.len(),
            audit.missing.len(),
            audit.remote.len(),
            library.len()
        );
        for missing in &audit.missing {
            println!("  missing: {missing}");
        }

        if let Some(path) = args.asset_audit_json.as_ref() {
            let json =
                serde_json::to_string_pretty(&audit).context("serializing asset audit to JSON")?;
            fs::write(path, &json)
                .with_context(|| format!("writing asset audit to {}", path.display()))?;
            println!("Saved asset audit to {}", path.display());
        }
    } else if let Some(path) = args.asset_audit_json.as_ref() {
        eprintln!(
            "[showroom_engine] warning: --asset-audit-json={} ignored without --asset-root",
            path.display()
        );
    }

    Ok(())
}

fn build_summary(catalog: &Catalog, overrides: &VariantOverrides) -> CatalogSummary {
    let categories = catalog
        .grouped_by_category()
        .into_iter()
        .map(|(category, products)| CategorySummary {
            category,
            products: products
                .into_iter()
                .map(|product| ProductSummary {
                    id: product.id.clone(),
                    name: product.name.clone(),
                    variants: product.variants.len(),
                    dimensions: product.dimensions.as_ref().map(|dims| dims.summary()),
                    default_variant_override: overrides
                        .preferred_asset(&product.id)
                        .map(str::to_string),
                })
                .collect(),
        })
        .collect();

    CatalogSummary {
        total_products: catalog.len(),
        categories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_categories_and_overrides() {
        let catalog = Catalog::from_json(
            r#"[
                {"id":"sofa1","name":"Nimbus","category":"Sofas","file":"s.glb",
                 "variants":[{"label":"Black","asset":"s_b.glb"},{"label":"Cream","asset":"s_c.glb"}]},
                {"id":"lamp1","name":"Arc","category":"Lamps","file":"l.glb"}
            ]"#,
            "test",
        )
        .unwrap();
        let overrides = VariantOverrides::from_entries([("sofa1", "s_c.glb")]);

        let summary = build_summary(&catalog, &overrides);
        assert_eq!(summary.total_products, 2);
        assert_eq!(summary.categories.len(), 2);
        assert_eq!(
            summary.categories[0].products[0]
                .default_variant_override
                .as_deref(),
            Some("s_c.glb")
        );
    }
}
