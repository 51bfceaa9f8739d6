use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use showroom_stream::Theme;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("reading preferences {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing preferences {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("writing preferences {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PrefsDocument {
    #[serde(default)]
    theme: Theme,
}

/// JSON-backed store for the persisted theme choice. Writes only happen
/// when the value actually changed since the last save.
#[derive(Debug, Clone)]
pub struct ThemePrefs {
    theme: Theme,
    dirty: bool,
    backing_path: Option<PathBuf>,
}

impl Default for ThemePrefs {
    fn default() -> Self {
        ThemePrefs {
            theme: Theme::Day,
            dirty: false,
            backing_path: None,
        }
    }
}

impl ThemePrefs {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("showroom").join("prefs.json"))
    }

    /// Missing files are not an error; they mean the default theme.
    pub fn load(path: Option<&Path>) -> Result<Self, PrefsError> {
        let mut prefs = ThemePrefs {
            theme: Theme::Day,
            dirty: false,
            backing_path: path.map(Path::to_path_buf),
        };
        if let Some(p) = path {
            if p.exists() {
                let raw = fs::read_to_string(p).map_err(|source| PrefsError::Io {
                    path: p.display().to_string(),
                    source,
                })?;
                let document: PrefsDocument =
                    serde_json::from_str(&raw).map_err(|source| PrefsError::Parse {
                        path: p.display().to_string(),
                        source,
                    })?;
                prefs.theme = document.theme;
            }
        }
        Ok(prefs)
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        if self.theme != theme {
            self.theme = theme;
            self.dirty = true;
        }
    }

    pub fn save(&mut self) -> Result<(), PrefsError> {
        let Some(path) = self.backing_path.clone() else {
            // No configured backing file; treat as successful no-op.
            self.dirty = false;
            return Ok(());
        };

        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| PrefsError::Write {
                    path: parent.display().to_string(),
                    source,
                })?;
            }
        }

        let document = PrefsDocument { theme: self.theme };
        let serialized =
            serde_json::to_string_pretty(&document).map_err(|source| PrefsError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        fs::write(&path, serialized).map_err(|source| PrefsError::Write {
            path: path.display().to_string(),
            source,
        })?;
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_round_trips_through_the_backing_file() -> Result<(), PrefsError> {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("nested").join("prefs.json");

        let mut prefs = ThemePrefs::load(Some(&path))?;
        assert_eq!(prefs.theme(), Theme::Day);

        prefs.set_theme(Theme::Night);
        prefs.save()?;

        let reloaded = ThemePrefs::load(Some(&path))?;
        assert_eq!(reloaded.theme(), Theme::Night);
        Ok(())
    }

    #[test]
    fn unchanged_theme_is_not_marked_dirty() {
        let mut prefs = ThemePrefs::load(None).expect("load without backing file");
        prefs.set_theme(Theme::Day);
        assert!(!prefs.dirty);
        prefs.set_theme(Theme::Night);
        assert!(prefs.dirty);
    }

    #[test]
    fn malformed_preferences_are_a_parse_error() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("prefs.json");
        fs::write(&path, "{not json").expect("write file");
        assert!(matches!(
            ThemePrefs::load(Some(&path)),
            Err(PrefsError::Parse { .. })
        ));
    }
}
