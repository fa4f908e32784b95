//! Rune shapes configuration system
//!
//! Settings are read from `rune.toml`; environment variables override the file and
//! command-line flags override both.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File read by [`RuneConfig::load`] from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "rune.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RuneConfig {
    /// Comma-separated diagnostic categories (`layout`, `codegen`, `pack`, `fidelity`, `all`)
    pub diagnostics: Option<String>,
    /// Logical screen shapes are classified and extracted against
    pub viewport: ViewportConfig,
    /// Interface generation settings
    pub generate: GenerateConfig,
    /// Shape extraction settings
    pub extract: ExtractConfig,
    /// Fidelity comparison settings
    pub compare: CompareConfig,
    /// Remote document retrieval settings
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// Page title, also the manifest name
    pub title: String,
    /// Emit the viewport meta tag and narrow-screen rules
    pub responsive: bool,
    /// Emit `manifest.json`
    pub manifest: bool,
    /// Passed through to `body[data-theme]`
    pub theme: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub preserve_ids: bool,
    pub infer_functions: bool,
    pub stamp_timestamps: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    pub ignore_geometry: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// When non-empty, only URLs whose origin (`scheme://host[:port]`) is listed are fetched
    pub allowed_origins: Vec<String>,
    pub user_agent: String,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            title: "Generated Interface".to_string(),
            responsive: true,
            manifest: false,
            theme: "light".to_string(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            allowed_origins: Vec::new(),
            user_agent: format!("rune-shapes/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

fn parse_flag(val: &str) -> bool {
    val == "1" || val.eq_ignore_ascii_case("true")
}

/// Parses `WIDTHxHEIGHT` into a non-zero pair.
pub fn parse_viewport(val: &str) -> Option<(u32, u32)> {
    let (w, h) = val.trim().to_ascii_lowercase().split_once('x').map(|(w, h)| {
        (w.trim().parse::<u32>(), h.trim().parse::<u32>())
    })?;
    match (w, h) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => Some((w, h)),
        _ => None,
    }
}

impl RuneConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration from `path`, or the defaults when the file does not exist.
    /// A file that exists but does not parse is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if !path.as_ref().exists() {
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    pub fn merge_with_env(&mut self) {
        self.merge_with(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`, keyed by environment variable name. Values that do
    /// not parse are ignored.
    pub fn merge_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some((width, height)) = lookup("RUNE_VIEWPORT").as_deref().and_then(parse_viewport)
        {
            self.viewport = ViewportConfig { width, height };
        }

        // Generation
        if let Some(title) = lookup("RUNE_TITLE") {
            self.generate.title = title;
        }
        if let Some(val) = lookup("RUNE_RESPONSIVE") {
            self.generate.responsive = parse_flag(&val);
        }
        if let Some(val) = lookup("RUNE_MANIFEST") {
            self.generate.manifest = parse_flag(&val);
        }

        // Extraction and comparison
        if let Some(val) = lookup("RUNE_PRESERVE_IDS") {
            self.extract.preserve_ids = parse_flag(&val);
        }
        if let Some(val) = lookup("RUNE_INFER_FUNCTIONS") {
            self.extract.infer_functions = parse_flag(&val);
        }
        if let Some(val) = lookup("RUNE_IGNORE_GEOMETRY") {
            self.compare.ignore_geometry = parse_flag(&val);
        }

        if let Some(secs) = lookup("RUNE_FETCH_TIMEOUT").and_then(|v| v.trim().parse().ok()) {
            self.fetch.timeout_secs = secs;
        }
        if let Some(diagnostics) = lookup("RUNE_DIAGNOSTICS") {
            self.diagnostics = Some(diagnostics);
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// 1. Load from `rune.toml` (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_or_default(DEFAULT_CONFIG_FILE)?;
        config.merge_with_env();
        Ok(config)
    }

    /// Like [`RuneConfig::load`], but an explicit `path` must exist.
    pub fn load_with(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let mut config = Self::load_from_file(path)?;
                config.merge_with_env();
                Ok(config)
            }
            None => Self::load(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = RuneConfig::default();
        assert_eq!((config.viewport.width, config.viewport.height), (1920, 1080));
        assert!(config.generate.responsive);
        assert!(!config.generate.manifest);
        assert!(!config.extract.preserve_ids);
        assert_eq!(config.fetch.timeout_secs, 10);
    }

    #[test]
    fn test_toml_serialization() {
        let config = RuneConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: RuneConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let parsed: RuneConfig = toml::from_str(
            "[viewport]\nwidth = 1280\n\n[extract]\npreserve_ids = true\n",
        )
        .unwrap();
        assert_eq!(parsed.viewport.width, 1280);
        assert_eq!(parsed.viewport.height, 1080);
        assert!(parsed.extract.preserve_ids);
        assert_eq!(parsed.generate.title, "Generated Interface");
    }

    #[test]
    fn test_load_or_default() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("rune.toml");
        assert_eq!(
            RuneConfig::load_or_default(&missing).unwrap(),
            RuneConfig::default()
        );

        std::fs::write(&missing, "[viewport\nwidth = 1").unwrap();
        assert!(matches!(
            RuneConfig::load_or_default(&missing),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            RuneConfig::load_from_file(dir.path().join("absent.toml")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_merge_with_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("RUNE_VIEWPORT", "1280x720"),
            ("RUNE_TITLE", "Pet Board"),
            ("RUNE_MANIFEST", "true"),
            ("RUNE_PRESERVE_IDS", "1"),
            ("RUNE_IGNORE_GEOMETRY", "TRUE"),
            ("RUNE_FETCH_TIMEOUT", "not-a-number"),
        ]);
        let mut config = RuneConfig::default();
        config.merge_with(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!((config.viewport.width, config.viewport.height), (1280, 720));
        assert_eq!(config.generate.title, "Pet Board");
        assert!(config.generate.manifest);
        assert!(config.extract.preserve_ids);
        assert!(config.compare.ignore_geometry);
        assert_eq!(config.fetch.timeout_secs, 10);
    }

    #[test]
    fn test_merge_with_env() {
        unsafe {
            std::env::set_var("RUNE_INFER_FUNCTIONS", "true");
        }

        let mut config = RuneConfig::default();
        config.merge_with_env();
        assert!(config.extract.infer_functions);

        unsafe {
            std::env::remove_var("RUNE_INFER_FUNCTIONS");
        }
    }

    #[test]
    fn test_parse_viewport() {
        assert_eq!(parse_viewport("800X600"), Some((800, 600)));
        assert_eq!(parse_viewport("0x600"), None);
        assert_eq!(parse_viewport("wide"), None);
    }
}
