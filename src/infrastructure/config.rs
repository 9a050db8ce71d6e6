use crate::domain::{
    config::FileConfig,
    error::{SerialTermError, SerialTermResult},
};
use std::fs;
use std::path::{Path, PathBuf};

/// Loads the optional configuration file. The file is only ever read.
pub struct ConfigManager {
    config_path: PathBuf,
    explicit: bool,
}

impl ConfigManager {
    /// Configuration manager for the default location
    pub fn new() -> SerialTermResult<Self> {
        Ok(Self {
            config_path: Self::default_config_path()?,
            explicit: false,
        })
    }

    /// Configuration manager for a file named on the command line.
    /// Unlike the default location, this file must exist.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            explicit: true,
        }
    }

    /// Load configuration, falling back to defaults when the default file is absent
    pub fn load_config(&self) -> SerialTermResult<FileConfig> {
        if !self.explicit && !self.config_path.exists() {
            return Ok(FileConfig::default());
        }
        self.load_config_from_path(&self.config_path)
    }

    /// Load configuration from specific path
    pub fn load_config_from_path(&self, path: &Path) -> SerialTermResult<FileConfig> {
        let content = fs::read_to_string(path).map_err(|e| SerialTermError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| SerialTermError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    fn default_config_path() -> SerialTermResult<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| SerialTermError::Config {
            message: "Could not determine home directory".to_string(),
        })?;

        Ok(home.join(".config").join("serialterm").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_path_location() {
        if let Ok(manager) = ConfigManager::new() {
            assert!(manager.config_path().ends_with(".config/serialterm/config.toml"));
        }
    }

    #[test]
    fn test_missing_default_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager {
            config_path: dir.path().join("config.toml"),
            explicit: false,
        };
        assert_eq!(manager.load_config().unwrap(), FileConfig::default());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(dir.path().join("nope.toml"));
        assert!(matches!(manager.load_config(), Err(SerialTermError::Config { .. })));
    }

    #[test]
    fn test_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[logging]\nlevel = \"debug\"\n\n[defaults]\nbaud = 9600\nparity = \"even\"\ndtr = false\n",
        )
        .unwrap();

        let config = ConfigManager::with_path(&path).load_config().unwrap();
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
        assert_eq!(config.defaults.baud, Some(9600));
        assert_eq!(config.defaults.parity.as_deref(), Some("even"));
        assert_eq!(config.defaults.dtr, Some(false));
        assert_eq!(config.defaults.rts, None);
    }

    #[test]
    fn test_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[defaults]\nbaud = \"fast\"\n").unwrap();

        let result = ConfigManager::with_path(&path).load_config();
        assert!(matches!(result, Err(SerialTermError::Config { .. })));
    }
}
