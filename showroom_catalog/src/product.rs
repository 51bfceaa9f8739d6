use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Width/height/depth footprint in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
}

impl Dimensions {
    /// Card text shown under the product name.
    pub fn summary(&self) -> String {
        format!(
            "{:.2}m (W) x {:.2}m (H) x {:.2}m (D)",
            self.width, self.height, self.depth
        )
    }
}

/// Orbit camera description: polar angles plus distance, a look-at target
/// and a vertical field of view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub theta_deg: f32,
    pub phi_deg: f32,
    pub radius_m: f32,
    #[serde(default = "default_target")]
    pub target: Vec3,
    #[serde(default = "default_fov")]
    pub fov_deg: f32,
}

fn default_target() -> Vec3 {
    Vec3::ZERO
}

fn default_fov() -> f32 {
    CameraPose::GLOBAL_DEFAULT.fov_deg
}

impl CameraPose {
    /// Pose used when a product declares no default camera of its own.
    pub const GLOBAL_DEFAULT: CameraPose = CameraPose {
        theta_deg: 0.0,
        phi_deg: 75.0,
        radius_m: 2.5,
        target: Vec3::ZERO,
        fov_deg: 30.0,
    };

    pub fn target_array(&self) -> [f32; 3] {
        self.target.to_array()
    }

    pub fn with_target_array(mut self, target: [f32; 3]) -> Self {
        self.target = Vec3::from_array(target);
        self
    }
}

impl Default for CameraPose {
    fn default() -> Self {
        Self::GLOBAL_DEFAULT
    }
}

/// Selectable alternate appearance of a product. Variants whose asset
/// reference is absent or blank represent in-model material sets and are
/// not usable as standalone load targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub label: String,
    #[serde(default, alias = "colorSwatch", alias = "color")]
    pub swatch: Option<String>,
    #[serde(default, alias = "file", alias = "assetRef")]
    pub asset: Option<String>,
}

impl Variant {
    pub fn usable_asset(&self) -> Option<&str> {
        self.asset
            .as_deref()
            .map(str::trim)
            .filter(|asset| !asset.is_empty())
    }
}

/// One catalog entry. The `file`/`primaryAssetRef` aliases absorb the
/// field spellings found across the legacy catalog files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(
        default,
        rename = "primaryAsset",
        alias = "file",
        alias = "primaryAssetRef"
    )]
    pub primary_asset: Option<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    #[serde(default)]
    pub materials: Vec<String>,
    #[serde(default, rename = "defaultCamera")]
    pub default_camera: Option<CameraPose>,
}

impl Product {
    pub fn primary_asset_ref(&self) -> Option<&str> {
        self.primary_asset
            .as_deref()
            .map(str::trim)
            .filter(|asset| !asset.is_empty())
    }

    /// Every product must offer the viewer something loadable: either the
    /// primary asset or at least one variant with an asset of its own.
    pub fn has_loadable_asset(&self) -> bool {
        self.primary_asset_ref().is_some()
            || self.variants.iter().any(|v| v.usable_asset().is_some())
    }

    pub fn default_pose(&self) -> CameraPose {
        self.default_camera.unwrap_or(CameraPose::GLOBAL_DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_asset_references_are_not_usable() {
        let variant = Variant {
            label: "Oiled".to_string(),
            swatch: None,
            asset: Some("   ".to_string()),
        };
        assert_eq!(variant.usable_asset(), None);
    }

    #[test]
    fn legacy_file_key_maps_to_primary_asset() {
        let product: Product = serde_json::from_str(
            r#"{"id":"t1","name":"Table","file":"table.glb"}"#,
        )
        .unwrap();
        assert_eq!(product.primary_asset_ref(), Some("table.glb"));
        assert!(product.has_loadable_asset());
    }

    #[test]
    fn product_without_any_asset_is_not_loadable() {
        let product: Product = serde_json::from_str(
            r#"{"id":"t1","name":"Table","variants":[{"label":"Ash"}]}"#,
        )
        .unwrap();
        assert!(!product.has_loadable_asset());
    }

    #[test]
    fn missing_camera_falls_back_to_global_default() {
        let product: Product =
            serde_json::from_str(r#"{"id":"t1","name":"Table","file":"t.glb"}"#).unwrap();
        assert_eq!(product.default_pose(), CameraPose::GLOBAL_DEFAULT);
    }

    #[test]
    fn dimension_summary_matches_card_format() {
        let dims = Dimensions {
            width: 2.0,
            height: 0.85,
            depth: 0.95,
        };
        assert_eq!(dims.summary(), "2.00m (W) x 0.85m (H) x 0.95m (D)");
    }
}
