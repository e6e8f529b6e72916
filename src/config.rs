use crate::occurrence::FetchLimits;
use crate::{HexrichError, Result};
use h3o::Resolution;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub taxonomy: TaxonomyConfig,
    pub occurrence: OccurrenceConfig,
    pub grid: GridConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyConfig {
    /// Base URL of the taxonomy/occurrence service.
    pub base_url: String,
    /// Children requested per listing call.
    pub children_limit: usize,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OccurrenceConfig {
    /// Records requested per occurrence page.
    pub page_size: usize,
    /// Hard cap on records fetched per selected group.
    pub max_records: usize,
    /// Re-attempts per page on recoverable failures.
    pub max_retries: usize,
    /// Concurrent group fetches during fan-out.
    pub parallel_fetches: usize,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// H3 resolution of the richness grid (0-15).
    pub resolution: u8,
    /// Character budget for the per-cell species preview.
    pub sample_label_budget: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            taxonomy: TaxonomyConfig {
                base_url: "https://api.gbif.org/v1".to_string(),
                children_limit: 1000,
                request_timeout_secs: 30,
                connect_timeout_secs: 10,
            },
            occurrence: OccurrenceConfig {
                page_size: 300,
                max_records: 2000,
                max_retries: 2,
                parallel_fetches: 4,
                request_timeout_secs: 30,
            },
            grid: GridConfig {
                resolution: 4,
                sample_label_budget: 500,
            },
        }
    }
}

impl Config {
    /// Grid resolution as the typed h3o value.
    pub fn resolution(&self) -> Result<Resolution> {
        Resolution::try_from(self.grid.resolution)
            .map_err(|_| HexrichError::Config(format!(
                "invalid grid resolution {} (expected 0-15)",
                self.grid.resolution
            )))
    }

    pub fn fetch_limits(&self) -> FetchLimits {
        FetchLimits {
            page_size: self.occurrence.page_size,
            max_records: self.occurrence.max_records,
            max_retries: self.occurrence.max_retries,
            request_timeout: Duration::from_secs(self.occurrence.request_timeout_secs),
        }
    }
}

/// Default on-disk location: ~/.hexrich/config.toml
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".hexrich").join("config.toml"))
}

pub fn default_config() -> Config {
    Config::default()
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| HexrichError::Config(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<()> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| HexrichError::Config(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_the_service_constants() {
        let config = Config::default();
        assert_eq!(config.occurrence.page_size, 300);
        assert_eq!(config.occurrence.max_records, 2000);
        assert_eq!(config.taxonomy.children_limit, 1000);
        assert_eq!(config.grid.resolution, 4);
        assert_eq!(config.resolution().unwrap(), Resolution::Four);
    }

    #[test]
    fn round_trips_through_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.grid.resolution = 3;
        config.occurrence.parallel_fetches = 8;
        save_config(&path, &config).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.grid.resolution, 3);
        assert_eq!(loaded.occurrence.parallel_fetches, 8);
        assert_eq!(loaded.taxonomy.base_url, config.taxonomy.base_url);
    }

    #[test]
    fn out_of_range_resolution_is_a_config_error() {
        let mut config = Config::default();
        config.grid.resolution = 16;
        assert!(matches!(
            config.resolution(),
            Err(HexrichError::Config(_))
        ));
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is not toml = [").unwrap();
        assert!(matches!(load_config(&path), Err(HexrichError::Config(_))));
    }
}
