use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit pdfium shared library.
pub const PDFIUM_LIBRARY_ENV: &str = "PDFPAGE_PDFIUM_LIBRARY";

/// Raster engine settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Exact path of the pdfium shared library, tried first.
    pub pdfium_library_path: Option<PathBuf>,
    /// Directories searched for the platform pdfium library name.
    pub pdfium_search_dirs: Vec<PathBuf>,
    /// Paint annotation appearances into rendered slices.
    pub render_annotations: bool,
    /// Paint interactive form fields into rendered slices.
    pub render_form_data: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pdfium_library_path: None,
            pdfium_search_dirs: Vec::new(),
            render_annotations: true,
            render_form_data: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineConfig {
    /// Load from a JSON file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("no engine config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Defaults, with the library path taken from `PDFPAGE_PDFIUM_LIBRARY` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(path) = std::env::var_os(PDFIUM_LIBRARY_ENV) {
            if !path.is_empty() {
                config.pdfium_library_path = Some(PathBuf::from(path));
            }
        }
        config
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
