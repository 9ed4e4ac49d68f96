use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::eyre::{Context, OptionExt, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_database")]
    database: String,
    #[serde(default)]
    pub tidal: TidalConfig,
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TidalConfig {
    pub api_base_url: String,
    pub country_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_base_url: String,
    pub accounts_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Seconds without a progress poll after which a job is abandoned
    pub inactivity_timeout_secs: u64,
    pub tracks_per_second: NonZeroU32,
    /// Upper bound on tracks taken from one source playlist
    pub max_tracks: Option<usize>,
    pub preview_size: usize,
    pub min_match_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub concurrency: usize,
    pub batch_size: usize,
    pub poll_interval_secs: u64,
    pub visibility_timeout_secs: u64,
    pub max_deliveries: u32,
    pub lease_ttl_secs: u64,
    /// Delay before a job that failed on infrastructure is offered again.
    /// Keep it well under the import inactivity timeout.
    pub retry_delay_secs: u64,
}

fn default_database() -> String {
    "~/.local/share/yoinklist/yoinklist.db".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database(),
            tidal: TidalConfig::default(),
            spotify: SpotifyConfig::default(),
            import: ImportConfig::default(),
            worker: WorkerConfig::default(),
        }
    }
}

impl Default for TidalConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://openapi.tidal.com/v2".to_string(),
            country_code: "US".to_string(),
        }
    }
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            api_base_url: "https://api.spotify.com/v1".to_string(),
            accounts_base_url: "https://accounts.spotify.com".to_string(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_secs: 600,
            tracks_per_second: NonZeroU32::MIN,
            max_tracks: None,
            preview_size: 5,
            min_match_score: 0.0,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            batch_size: 10,
            poll_interval_secs: 5,
            visibility_timeout_secs: 3600,
            max_deliveries: 3,
            lease_ttl_secs: 120,
            retry_delay_secs: 30,
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err(format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .wrap_err(format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("yoinklist").join("config.toml"))
    }

    /// Load config from the default location, falling back to defaults when no file exists
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Write a default config file, leaving an existing one untouched
    pub fn create_default() -> Result<PathBuf> {
        let path = Self::config_path().ok_or_eyre("No config directory on this platform")?;
        if path.exists() {
            tracing::info!("Config already exists at {}", path.display());
            return Ok(path);
        }
        Self::default().write_to(&path)?;
        Ok(path)
    }

    fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .wrap_err(format!("Failed to create {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).wrap_err("Failed to serialize config")?;
        std::fs::write(path, contents)
            .wrap_err(format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Expand ~ to home directory
    fn expand_path(&self, path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    pub fn database_path(&self) -> PathBuf {
        self.expand_path(&self.database)
    }

    /// Spotify app credentials, with environment variables as fallback
    pub fn spotify_credentials(&self) -> Option<(String, String)> {
        let client_id = self
            .spotify
            .client_id
            .clone()
            .or_else(|| std::env::var("SPOTIFY_CLIENT_ID").ok())?;
        let client_secret = self
            .spotify
            .client_secret
            .clone()
            .or_else(|| std::env::var("SPOTIFY_CLIENT_SECRET").ok())?;
        Some((client_id, client_secret))
    }
}

impl ImportConfig {
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }
}

impl WorkerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }

    pub fn lease_ttl(&self) -> Duration {
        Duration::from_secs(self.lease_ttl_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
database = "/tmp/yoink.db"

[import]
inactivity_timeout_secs = 30
max_tracks = 50
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();

        assert_eq!(config.database_path(), PathBuf::from("/tmp/yoink.db"));
        assert_eq!(config.import.inactivity_timeout(), Duration::from_secs(30));
        assert_eq!(config.import.max_tracks, Some(50));
        assert_eq!(config.import.tracks_per_second.get(), 1);
        assert_eq!(config.import.preview_size, 5);
        assert_eq!(config.worker.max_deliveries, 3);
        assert!(config.worker.retry_delay() < config.import.inactivity_timeout());
        assert_eq!(config.tidal.country_code, "US");
    }

    #[test]
    fn test_default_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        Config::default().write_to(&path).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.import.inactivity_timeout_secs, 600);
        assert_eq!(config.worker.concurrency, 2);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "database = [").unwrap();

        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn test_zero_tracks_per_second_is_rejected() {
        let result: Result<Config, _> = toml::from_str("[import]\ntracks_per_second = 0\n");
        assert!(result.is_err());
    }
}
