use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::Config;
use crate::error::{Error, WindowResult};

/// Returns the config directory: `~/.config/spotter/`.
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".config").join("spotter"))
}

/// Returns the config file path: `~/.config/spotter/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Reads, parses and validates a config file.
pub fn try_load_from(path: &Path) -> WindowResult<Config> {
    let content = std::fs::read_to_string(path)?;
    let mut config: Config =
        toml::from_str(&content).map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
    config.validate();
    Ok(config)
}

/// Tries to load and parse `config.toml`.
pub fn try_load() -> WindowResult<Config> {
    let path = config_path().ok_or_else(|| Error::Config("could not determine config path".into()))?;
    try_load_from(&path)
}

/// Loads the configuration from disk, falling back to defaults.
///
/// After loading, values are clamped to safe ranges via [`Config::validate`].
/// A missing file silently returns defaults; other errors are logged.
pub fn load() -> Config {
    load_or_default(try_load)
}

fn load_or_default(try_load: impl FnOnce() -> WindowResult<Config>) -> Config {
    match try_load() {
        Ok(config) => config,
        Err(Error::Io(e)) if e.kind() == ErrorKind::NotFound => Config::default(),
        Err(e) => {
            tracing::warn!("using default config: {e}");
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_and_validates_file() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[matching]\nthreshold = 4.0\n").unwrap();

        // Act
        let config = try_load_from(&path).unwrap();

        // Assert
        assert_eq!(config.matching.threshold, 1.0);
    }

    #[test]
    fn parse_error_names_the_file() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[trigger\n").unwrap();

        // Act
        let err = try_load_from(&path).unwrap_err();

        // Assert
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        // Act
        let config = load_or_default(|| try_load_from(&path));

        // Assert
        assert_eq!(config, Config::default());
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        // Act
        let config = load_or_default(|| Err(Error::Config("broken".into())));

        // Assert
        assert_eq!(config, Config::default());
    }
}
