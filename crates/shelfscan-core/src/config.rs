use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Root application configuration, loaded from `~/.config/shelfscan/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub scan: ScanConfig,
    pub sources: SourcesConfig,
    pub shelving: ShelvingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub input_dir: String,
    pub output_dir: String,
    /// Where unclassifiable files go. Defaults to `<output_dir>/tmp`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarantine_dir: Option<String>,
    pub database_path: String,
    pub log_path: String,
    /// External schema script run when the database is first created.
    /// The built-in script is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Number of trailing pages searched for a printed ISBN.
    pub page_window: usize,
    pub ocr_language: String,
    pub dpi: u32,
    pub pdftoppm_program: String,
    pub pdfinfo_program: String,
    pub tesseract_program: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Bibliographic sources in fallback order.
    pub order: Vec<String>,
    pub series_lookup: bool,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub min_interval_ms: u64,
    /// Sources whose servers still need relaxed TLS settings.
    pub legacy_tls_sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShelvingConfig {
    /// Categories shelved by series instead of by imprint.
    pub serial_categories: Vec<String>,
    pub uncategorized_label: String,
    pub extension: String,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for PathsConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("shelfscan");
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));

        Self {
            input_dir: home.join("Scans").to_string_lossy().to_string(),
            output_dir: home.join("Books").to_string_lossy().to_string(),
            quarantine_dir: None,
            database_path: data_dir.join("shelfscan.db").to_string_lossy().to_string(),
            log_path: data_dir.join("shelfscan.log").to_string_lossy().to_string(),
            schema_path: None,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            page_window: 13,
            ocr_language: "jpn+eng".to_string(),
            dpi: 300,
            pdftoppm_program: "pdftoppm".to_string(),
            pdfinfo_program: "pdfinfo".to_string(),
            tesseract_program: "tesseract".to_string(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            order: vec![
                "honto".to_string(),
                "honto-ebook".to_string(),
                "openbd".to_string(),
                "ndl".to_string(),
            ],
            series_lookup: true,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) shelfscan/0.1".to_string(),
            timeout_secs: 20,
            min_interval_ms: 1000,
            legacy_tls_sources: vec!["honto".to_string(), "honto-ebook".to_string(), "ndl".to_string()],
        }
    }
}

impl Default for ShelvingConfig {
    fn default() -> Self {
        Self {
            serial_categories: vec!["漫画・コミック".to_string(), "ライトノベル".to_string()],
            uncategorized_label: "uncategorized".to_string(),
            extension: "pdf".to_string(),
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/shelfscan/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("SHELFSCAN_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("shelfscan")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    // ─── Derived paths ─────────────────────────────────────

    pub fn input_dir(&self) -> PathBuf {
        PathBuf::from(&self.paths.input_dir)
    }

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.paths.output_dir)
    }

    pub fn quarantine_dir(&self) -> PathBuf {
        match &self.paths.quarantine_dir {
            Some(dir) => PathBuf::from(dir),
            None => self.output_dir().join("tmp"),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.paths.database_path)
    }

    pub fn log_path(&self) -> PathBuf {
        PathBuf::from(&self.paths.log_path)
    }

    pub fn schema_path(&self) -> Option<PathBuf> {
        self.paths.schema_path.as_ref().map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.scan.page_window, 13);
        assert_eq!(cfg.sources.order.first().map(String::as_str), Some("honto"));
        assert!(cfg.shelving.serial_categories.contains(&"ライトノベル".to_string()));
        assert!(!cfg.paths.database_path.is_empty());
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = AppConfig::default();
        cfg.scan.page_window = 7;
        cfg.paths.quarantine_dir = Some("/srv/quarantine".to_string());
        cfg.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.scan.page_window, 7);
        assert_eq!(loaded.quarantine_dir(), PathBuf::from("/srv/quarantine"));
        assert_eq!(loaded.sources.order, cfg.sources.order);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[paths]\noutput_dir = \"/srv/books\"\n").unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.output_dir(), PathBuf::from("/srv/books"));
        assert_eq!(loaded.quarantine_dir(), PathBuf::from("/srv/books/tmp"));
        assert_eq!(loaded.scan.page_window, 13);
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let cfg = AppConfig::load_from(Path::new("/tmp/nonexistent_shelfscan_config.toml")).unwrap();
        assert_eq!(cfg.shelving.extension, "pdf");
    }
}
