use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;
use walkdir::WalkDir;

use crate::catalog::Catalog;

const MODEL_EXTENSIONS: &[&str] = &["glb", "gltf", "usdz"];

/// Strip query/fragment suffixes and directory prefixes from an asset
/// reference so catalog entries and on-disk files compare by file name.
pub fn normalize_asset_key(asset: &str) -> String {
    let trimmed = asset.trim();
    let without_query = trimmed
        .split_once(['?', '#'])
        .map(|(head, _)| head)
        .unwrap_or(trimmed);
    let replaced = without_query.replace('\\', "/");
    let segment = replaced.rsplit('/').next().unwrap_or(&replaced);
    segment.to_ascii_lowercase()
}

/// Index of model files found under an asset root, keyed by normalized
/// file name. Used to audit catalog references before serving them.
#[derive(Debug, Default, Clone)]
pub struct AssetLibrary {
    files: HashMap<String, PathBuf>,
}

impl AssetLibrary {
    pub fn scan_root(root: &Path) -> Result<Self> {
        let mut library = AssetLibrary::default();
        if !root.exists() {
            return Ok(library);
        }
        for entry in WalkDir::new(root).into_iter() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::warn!("failed to traverse {}: {err}", root.display());
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(ext) = entry.path().extension() else {
                continue;
            };
            let Some(ext) = ext.to_str() else {
                continue;
            };
            if MODEL_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
            {
                library.insert(entry.path());
            }
        }
        Ok(library)
    }

    fn insert(&mut self, path: &Path) {
        let key = normalize_asset_key(&path.file_name().unwrap_or_default().to_string_lossy());
        match self.files.get(&key) {
            Some(previous) => {
                log::warn!(
                    "duplicate asset file name '{}' (keeping {}, skipping {})",
                    key,
                    previous.display(),
                    path.display()
                );
            }
            None => {
                self.files.insert(key, path.to_path_buf());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn resolve(&self, asset: &str) -> Option<&Path> {
        self.files
            .get(&normalize_asset_key(asset))
            .map(PathBuf::as_path)
    }

    pub fn contains(&self, asset: &str) -> bool {
        self.resolve(asset).is_some()
    }

    /// Check every asset reference the catalog can ask the rendering
    /// surface to load. Missing files are reported, never fatal; remote
    /// URLs cannot be audited locally and are listed separately.
    pub fn audit(&self, catalog: &Catalog) -> AssetAudit {
        let mut audit = AssetAudit::default();
        for product in catalog.products() {
            let mut refs: Vec<&str> = Vec::new();
            if let Some(primary) = product.primary_asset_ref() {
                refs.push(primary);
            }
            for variant in &product.variants {
                if let Some(asset) = variant.usable_asset() {
                    refs.push(asset);
                }
            }
            for asset in refs {
                if asset.contains("://") {
                    audit.remote.push(asset.to_string());
                } else if self.contains(asset) {
                    audit.present.push(asset.to_string());
                } else {
                    audit.missing.push(asset.to_string());
                }
            }
        }
        audit
    }
}

/// Outcome of checking catalog references against the scanned library.
#[derive(Debug, Default, Clone, Serialize)]
pub struct AssetAudit {
    pub present: Vec<String>,
    pub missing: Vec<String>,
    pub remote: Vec<String>,
}

impl AssetAudit {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn asset_keys_normalize_paths_and_queries() {
        assert_eq!(normalize_asset_key("models/Sofa_Black.GLB"), "sofa_black.glb");
        assert_eq!(normalize_asset_key("sofa.glb?v=3"), "sofa.glb");
        assert_eq!(normalize_asset_key("a\\b\\chair.gltf#frag"), "chair.gltf");
    }

    #[test]
    fn scan_indexes_model_files_and_audits_catalog() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("sofa_black.glb"), b"glTF")?;
        fs::create_dir(dir.path().join("lamps"))?;
        fs::write(dir.path().join("lamps/lamp.glb"), b"glTF")?;
        fs::write(dir.path().join("notes.txt"), b"ignored")?;

        let library = AssetLibrary::scan_root(dir.path())?;
        assert_eq!(library.len(), 2);
        assert!(library.contains("models/sofa_black.glb"));

        let catalog = Catalog::from_json(
            r#"[
                {"id":"sofa1","name":"Sofa","file":"sofa_black.glb"},
                {"id":"lamp1","name":"Lamp","file":"lamp.glb"},
                {"id":"rug1","name":"Rug","file":"rug.glb"},
                {"id":"cdn1","name":"Remote","file":"https://cdn.example/chair.glb"}
            ]"#,
            "audit",
        )
        .unwrap();
        let audit = library.audit(&catalog);
        assert_eq!(audit.present.len(), 2);
        assert_eq!(audit.missing, vec!["rug.glb".to_string()]);
        assert_eq!(audit.remote.len(), 1);
        assert!(!audit.is_clean());
        Ok(())
    }

    #[test]
    fn missing_root_yields_an_empty_library() -> Result<()> {
        let library = AssetLibrary::scan_root(Path::new("/nonexistent/asset/root"))?;
        assert!(library.is_empty());
        Ok(())
    }
}
