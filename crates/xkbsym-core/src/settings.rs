// Xkbsym Settings Module
// Handles user-configurable compiler settings

use std::path::{Path, PathBuf};

/// Default bound on nested include depth
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 15;

/// Settings that control compiler diagnostics and include handling
///
/// These settings are loaded from a TOML file (default: ~/.config/xkbsym/settings.toml):
///   [log]
///   verbosity = 5
///   [include]
///   max_depth = 15
#[derive(Debug, Clone)]
pub struct Settings {
    /// Compile verbosity; gates "verbose-N" diagnostics
    verbosity: i32,

    /// Maximum nesting of include statements
    max_include_depth: usize,
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid setting value: {0}")]
    InvalidValue(String),
}

/// TOML representation for deserializing settings
#[derive(Debug, Clone, serde::Deserialize, Default)]
struct SettingsToml {
    #[serde(default)]
    log: Option<LogSettings>,

    #[serde(default)]
    include: Option<IncludeSettings>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
struct LogSettings {
    #[serde(default)]
    verbosity: Option<i32>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
struct IncludeSettings {
    #[serde(default)]
    max_depth: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    /// Create settings with defaults
    pub fn new() -> Self {
        Self {
            verbosity: 0,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }

    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load settings from TOML string
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let toml_settings: SettingsToml =
            toml::from_str(content).map_err(|e| SettingsError::TomlParse(e.to_string()))?;

        let mut settings = Self::new();

        if let Some(log) = toml_settings.log {
            if let Some(verbosity) = log.verbosity {
                if verbosity < 0 {
                    return Err(SettingsError::InvalidValue(format!(
                        "verbosity must not be negative, got {}",
                        verbosity
                    )));
                }
                settings.verbosity = verbosity;
            }
        }

        if let Some(include) = toml_settings.include {
            if let Some(depth) = include.max_depth {
                if depth == 0 {
                    return Err(SettingsError::InvalidValue(
                        "include.max_depth must be at least 1".to_string(),
                    ));
                }
                settings.max_include_depth = depth;
            }
        }

        Ok(settings)
    }

    /// Get the default settings path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("xkbsym").join("settings.toml"))
    }

    /// Load from default location (~/.config/xkbsym/settings.toml)
    pub fn load_default() -> Result<Self, SettingsError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::from_file(path);
            }
        }
        // Return default settings if file doesn't exist
        Ok(Self::new())
    }

    /// Compile verbosity
    pub fn verbosity(&self) -> i32 {
        self.verbosity
    }

    /// Override the compile verbosity
    pub fn set_verbosity(&mut self, verbosity: i32) {
        self.verbosity = verbosity;
    }

    /// Maximum include nesting depth
    pub fn max_include_depth(&self) -> usize {
        self.max_include_depth
    }
}
