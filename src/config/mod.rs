//! Runtime settings
//!
//! Merged in order: built-in defaults, a TOML file, then `WELCOMED_*`
//! environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::db::DEFAULT_MAX_CONNECTIONS;

/// Config file read when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "welcomed.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "WELCOMED_";

/// Process settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// SQLite database path; None = in-memory
    pub database: Option<String>,
    /// Directory holding `images/` and `fonts/`
    pub assets_dir: PathBuf,
    pub max_connections: u32,
    /// How long a reset confirmation prompt stays up
    pub reset_prompt_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: Some("welcomed.db".to_string()),
            assets_dir: PathBuf::from("assets"),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            reset_prompt_secs: 5,
        }
    }
}

impl Settings {
    /// Load settings from `path` (or [`DEFAULT_CONFIG_FILE`]) and the environment.
    /// A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Self::figment(file).extract()
    }

    fn figment(file: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn reset_prompt(&self) -> Duration {
        Duration::from_secs(self.reset_prompt_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::figment(&dir.path().join("absent.toml"))
            .extract::<Settings>()
            .unwrap();
        assert_eq!(settings.database.as_deref(), Some("welcomed.db"));
        assert_eq!(settings.assets_dir, PathBuf::from("assets"));
        assert_eq!(settings.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(settings.reset_prompt(), Duration::from_secs(5));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("welcomed.toml");
        std::fs::write(
            &file,
            "database = \"/var/lib/welcomed/welcome.db\"\nreset_prompt_secs = 10\n",
        )
        .unwrap();

        let settings = Settings::figment(&file).extract::<Settings>().unwrap();
        assert_eq!(
            settings.database.as_deref(),
            Some("/var/lib/welcomed/welcome.db")
        );
        assert_eq!(settings.reset_prompt_secs, 10);
        assert_eq!(settings.assets_dir, PathBuf::from("assets"));
    }

    #[test]
    fn test_bad_value_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("welcomed.toml");
        std::fs::write(&file, "max_connections = \"lots\"\n").unwrap();

        assert!(Settings::figment(&file).extract::<Settings>().is_err());
    }
}
