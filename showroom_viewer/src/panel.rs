//! Panel binding: translates control events into engine requests and
//! state updates into a declarative view model. No business logic lives
//! here; everything is a pure mapping so it stays testable without a UI
//! toolkit attached.

use serde::{Deserialize, Serialize};
use showroom_catalog::{Catalog, Product, UNGROUPED_CATEGORY};
use showroom_stream::{ControlRequest, FilterKind, StateUpdate, Theme};

/// Something the user did to a panel control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PanelEvent {
    ProductChosen { product_id: String },
    SwatchClicked { index: u32 },
    BrightnessChanged { value: f32 },
    ContrastChanged { value: f32 },
    ExposureChanged { value: f32 },
    ResetViewClicked,
    ResetFiltersClicked,
    ThemeToggled,
    ShareClicked,
    ArClicked,
}

/// Each panel event maps to exactly one control request. The current
/// theme is only needed to turn a toggle into an absolute value.
pub fn control_for(event: &PanelEvent, current_theme: Theme) -> ControlRequest {
    match event {
        PanelEvent::ProductChosen { product_id } => ControlRequest::SelectProduct {
            product_id: product_id.clone(),
            variant_asset: None,
        },
        PanelEvent::SwatchClicked { index } => ControlRequest::SelectVariant { index: *index },
        PanelEvent::BrightnessChanged { value } => ControlRequest::SetFilter {
            kind: FilterKind::Brightness,
            value: *value,
        },
        PanelEvent::ContrastChanged { value } => ControlRequest::SetFilter {
            kind: FilterKind::Contrast,
            value: *value,
        },
        PanelEvent::ExposureChanged { value } => ControlRequest::SetFilter {
            kind: FilterKind::Exposure,
            value: *value,
        },
        PanelEvent::ResetViewClicked => ControlRequest::ResetView,
        PanelEvent::ResetFiltersClicked => ControlRequest::ResetFilters,
        PanelEvent::ThemeToggled => ControlRequest::SetTheme {
            theme: current_theme.toggled(),
        },
        PanelEvent::ShareClicked => ControlRequest::RequestShare,
        PanelEvent::ArClicked => ControlRequest::RequestAr,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductOption {
    pub id: String,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionGroup {
    pub category: String,
    pub options: Vec<ProductOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwatchView {
    pub label: String,
    pub color: Option<String>,
    pub active: bool,
}

/// Everything the panel widgets need, derived from one state update.
/// Rendering is pure: the same catalog and update always produce the
/// same value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel {
    pub banner: Option<String>,
    pub groups: Vec<OptionGroup>,
    pub swatches: Vec<SwatchView>,
    pub detail_text: String,
    pub dimensions_text: Option<String>,
    pub materials_text: Option<String>,
    pub brightness: f32,
    pub contrast: f32,
    pub exposure: f32,
    pub loading_visible: bool,
    pub theme: Theme,
    pub share_url: Option<String>,
}

impl ViewModel {
    pub fn render(catalog: Option<&Catalog>, update: &StateUpdate) -> Self {
        let Some(catalog) = catalog else {
            return Self::degraded(update);
        };

        let selected = update
            .product_id
            .as_deref()
            .and_then(|id| catalog.by_id(id));

        let groups = catalog
            .grouped_by_category()
            .into_iter()
            .map(|(category, products)| OptionGroup {
                category,
                options: products
                    .into_iter()
                    .map(|product| ProductOption {
                        id: product.id.clone(),
                        label: product.name.clone(),
                        selected: update.product_id.as_deref() == Some(product.id.as_str()),
                    })
                    .collect(),
            })
            .collect();

        let swatches = selected.map(|product| swatch_row(product, update)).unwrap_or_default();
        let active_label = swatches
            .iter()
            .find(|swatch| swatch.active)
            .map(|swatch| swatch.label.clone());

        let detail_text = match selected {
            Some(product) => {
                let category = product.category.as_deref().unwrap_or(UNGROUPED_CATEGORY);
                match active_label {
                    Some(label) => {
                        format!("Category: {category} | Model: {} ({label})", product.name)
                    }
                    None => format!("Category: {category} | Model: {}", product.name),
                }
            }
            None => String::new(),
        };

        let filters = update.filters.unwrap_or_default();

        Self {
            banner: None,
            groups,
            swatches,
            detail_text,
            dimensions_text: selected
                .and_then(|product| product.dimensions.as_ref())
                .map(|dims| format!("Dimensions: {}", dims.summary())),
            materials_text: selected
                .filter(|product| !product.materials.is_empty())
                .map(|product| format!("Materials: {}", product.materials.join(", "))),
            brightness: filters.brightness,
            contrast: filters.contrast,
            exposure: filters.exposure,
            loading_visible: update.phase == "loading",
            theme: update.theme.unwrap_or_default(),
            share_url: update.share_url.clone(),
        }
    }

    /// "No products" state: widgets disabled, banner shown, viewer keeps
    /// running so a later catalog fix only needs a reconnect.
    fn degraded(update: &StateUpdate) -> Self {
        let filters = update.filters.unwrap_or_default();
        Self {
            banner: Some("No products available".to_string()),
            groups: Vec::new(),
            swatches: Vec::new(),
            detail_text: String::new(),
            dimensions_text: None,
            materials_text: None,
            brightness: filters.brightness,
            contrast: filters.contrast,
            exposure: filters.exposure,
            loading_visible: false,
            theme: update.theme.unwrap_or_default(),
            share_url: None,
        }
    }
}

/// The swatch row mirrors the engine's resolution rule: fewer than two
/// usable variants means the row is hidden entirely.
fn swatch_row(product: &Product, update: &StateUpdate) -> Vec<SwatchView> {
    let usable: Vec<_> = product
        .variants
        .iter()
        .filter(|variant| variant.usable_asset().is_some())
        .collect();
    if usable.len() < 2 {
        return Vec::new();
    }
    usable
        .into_iter()
        .map(|variant| SwatchView {
            label: variant.label.clone(),
            color: variant.swatch.clone(),
            active: variant.usable_asset() == update.variant_asset.as_deref(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use showroom_stream::Filters;

    fn catalog() -> Catalog {
        Catalog::from_json(
            r##"[
                {
                    "id": "sofa1",
                    "name": "Nimbus Sofa",
                    "category": "Sofas",
                    "primaryAsset": "sofa_black.glb",
                    "variants": [
                        {"label": "Black", "asset": "sofa_black.glb", "swatch": "#1a1a1a"},
                        {"label": "Cream", "asset": "sofa_cream.glb", "swatch": "#e8e0d0"}
                    ],
                    "dimensions": {"width": 2.0, "height": 0.85, "depth": 0.95},
                    "materials": ["velvet", "oak"]
                },
                {"id": "lamp1", "name": "Arc Lamp", "category": "Lamps", "primaryAsset": "lamp.glb"}
            ]"##,
            "test",
        )
        .unwrap()
    }

    fn ready_update() -> StateUpdate {
        StateUpdate {
            phase: "ready".to_string(),
            product_id: Some("sofa1".to_string()),
            variant_index: Some(1),
            variant_asset: Some("sofa_cream.glb".to_string()),
            filters: Some(Filters::default()),
            theme: Some(Theme::Day),
            ..StateUpdate::default()
        }
    }

    #[test]
    fn rendering_twice_yields_identical_view_models() {
        let catalog = catalog();
        let update = ready_update();
        let first = ViewModel::render(Some(&catalog), &update);
        let second = ViewModel::render(Some(&catalog), &update);
        assert_eq!(first, second);
    }

    #[test]
    fn active_swatch_follows_the_variant_asset() {
        let catalog = catalog();
        let view = ViewModel::render(Some(&catalog), &ready_update());
        assert_eq!(view.swatches.len(), 2);
        assert!(!view.swatches[0].active);
        assert!(view.swatches[1].active);
        assert_eq!(view.detail_text, "Category: Sofas | Model: Nimbus Sofa (Cream)");
        assert_eq!(
            view.dimensions_text.as_deref(),
            Some("Dimensions: 2.00m (W) x 0.85m (H) x 0.95m (D)")
        );
        assert_eq!(view.materials_text.as_deref(), Some("Materials: velvet, oak"));
    }

    #[test]
    fn variantless_products_hide_the_swatch_row() {
        let catalog = catalog();
        let update = StateUpdate {
            phase: "ready".to_string(),
            product_id: Some("lamp1".to_string()),
            variant_index: Some(0),
            variant_asset: Some("lamp.glb".to_string()),
            ..StateUpdate::default()
        };
        let view = ViewModel::render(Some(&catalog), &update);
        assert!(view.swatches.is_empty());
        assert_eq!(view.detail_text, "Category: Lamps | Model: Arc Lamp");
    }

    #[test]
    fn loading_phase_shows_the_overlay() {
        let catalog = catalog();
        let mut update = ready_update();
        update.phase = "loading".to_string();
        let view = ViewModel::render(Some(&catalog), &update);
        assert!(view.loading_visible);
    }

    #[test]
    fn missing_catalog_degrades_to_a_banner() {
        let view = ViewModel::render(None, &ready_update());
        assert_eq!(view.banner.as_deref(), Some("No products available"));
        assert!(view.groups.is_empty());
        assert!(view.swatches.is_empty());
    }

    #[test]
    fn selected_product_is_flagged_in_its_group() {
        let catalog = catalog();
        let view = ViewModel::render(Some(&catalog), &ready_update());
        let sofa_group = view
            .groups
            .iter()
            .find(|group| group.category == "Sofas")
            .expect("sofa group present");
        assert!(sofa_group.options[0].selected);
        let lamp_group = view
            .groups
            .iter()
            .find(|group| group.category == "Lamps")
            .expect("lamp group present");
        assert!(!lamp_group.options[0].selected);
    }

    #[test]
    fn panel_events_map_one_to_one_onto_control_requests() {
        let cases = [
            (
                PanelEvent::ProductChosen {
                    product_id: "sofa1".to_string(),
                },
                ControlRequest::SelectProduct {
                    product_id: "sofa1".to_string(),
                    variant_asset: None,
                },
            ),
            (
                PanelEvent::SwatchClicked { index: 1 },
                ControlRequest::SelectVariant { index: 1 },
            ),
            (
                PanelEvent::ExposureChanged { value: 0.4 },
                ControlRequest::SetFilter {
                    kind: FilterKind::Exposure,
                    value: 0.4,
                },
            ),
            (PanelEvent::ResetViewClicked, ControlRequest::ResetView),
            (PanelEvent::ShareClicked, ControlRequest::RequestShare),
            (PanelEvent::ArClicked, ControlRequest::RequestAr),
        ];
        for (event, expected) in cases {
            assert_eq!(control_for(&event, Theme::Day), expected);
        }
    }

    #[test]
    fn theme_toggle_sends_the_flipped_theme() {
        assert_eq!(
            control_for(&PanelEvent::ThemeToggled, Theme::Day),
            ControlRequest::SetTheme { theme: Theme::Night }
        );
        assert_eq!(
            control_for(&PanelEvent::ThemeToggled, Theme::Night),
            ControlRequest::SetTheme { theme: Theme::Day }
        );
    }
}
