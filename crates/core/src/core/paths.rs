//! Where the panel keeps its own settings.

use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "patchlings";
const CONFIG_FILE: &str = "panel.json";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
}

impl AppPaths {
    /// Resolve and create the settings directory.
    pub fn new() -> Result<Self, String> {
        let paths = Self::locate()?;
        fs::create_dir_all(&paths.config_dir)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        Ok(paths)
    }

    /// Resolve without touching the filesystem.
    pub fn locate() -> Result<Self, String> {
        let base = dirs::config_dir().ok_or("Could not determine config directory")?;
        Ok(Self::under(&base))
    }

    fn under(base: &Path) -> Self {
        Self {
            config_dir: base.join(APP_DIR),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }
}
