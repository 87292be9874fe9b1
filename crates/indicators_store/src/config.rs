use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use indicators_core::{IndicatorsError, IndicatorsResult};

const DEFAULT_CONFIG_NAME: &str = "indicators.json";
const DEFAULT_MAX_BATCH_ITEMS: usize = 10_000;
const DEFAULT_MAX_PAGE_SIZE: u64 = 1_000;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum DatabaseConfig {
    Sqlite { path: Option<String> },
    Postgres { url: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoolConfig {
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub connect_timeout_ms: Option<u64>,
    pub acquire_timeout_ms: Option<u64>,
    pub idle_timeout_ms: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_batch_items: Option<usize>,
    pub max_page_size: Option<u64>,
}

impl LimitsConfig {
    pub fn with_defaults() -> Self {
        Self {
            max_batch_items: Some(DEFAULT_MAX_BATCH_ITEMS),
            max_page_size: Some(DEFAULT_MAX_PAGE_SIZE),
        }
    }

    pub fn max_batch_items(&self) -> usize {
        self.max_batch_items.unwrap_or(DEFAULT_MAX_BATCH_ITEMS)
    }

    pub fn max_page_size(&self) -> u64 {
        self.max_page_size.unwrap_or(DEFAULT_MAX_PAGE_SIZE)
    }
}

/// What happens to `source` when a detailed age band is written again.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DetailedSourcePolicy {
    /// The update also replaces the stored source.
    #[default]
    Overwrite,
    /// The source written by the first insert is kept.
    Preserve,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndicatorsConfig {
    pub database: DatabaseConfig,
    pub pool: Option<PoolConfig>,
    pub limits: Option<LimitsConfig>,
    pub detailed_source_policy: Option<DetailedSourcePolicy>,
}

impl IndicatorsConfig {
    pub fn default_sqlite(path: impl Into<String>) -> Self {
        Self {
            database: DatabaseConfig::Sqlite {
                path: Some(path.into()),
            },
            pool: None,
            limits: Some(LimitsConfig::with_defaults()),
            detailed_source_policy: Some(DetailedSourcePolicy::Overwrite),
        }
    }

    pub fn load_or_init(base_dir: &Path, default_sqlite_path: &Path) -> IndicatorsResult<Self> {
        fs::create_dir_all(base_dir)
            .map_err(|err| IndicatorsError::storage(format!("create config dir: {err}")))?;
        let config_path = base_dir.join(DEFAULT_CONFIG_NAME);
        if config_path.exists() {
            let raw = fs::read_to_string(&config_path)
                .map_err(|err| IndicatorsError::storage(format!("read config: {err}")))?;
            let config: IndicatorsConfig = serde_json::from_str(&raw)
                .map_err(|err| IndicatorsError::validation(err.to_string()))?;
            return Ok(config);
        }
        let default = IndicatorsConfig::default_sqlite(default_sqlite_path.to_string_lossy());
        let payload = serde_json::to_string_pretty(&default)
            .map_err(|err| IndicatorsError::storage(format!("serialize config: {err}")))?;
        fs::write(&config_path, payload)
            .map_err(|err| IndicatorsError::storage(format!("write config: {err}")))?;
        Ok(default)
    }

    pub fn sqlite_path(&self, base_dir: &Path) -> IndicatorsResult<PathBuf> {
        match &self.database {
            DatabaseConfig::Sqlite { path } => {
                let path = path
                    .clone()
                    .unwrap_or_else(|| "indicators.sqlite".to_string());
                let candidate = PathBuf::from(path);
                if candidate.is_absolute() {
                    Ok(candidate)
                } else {
                    Ok(base_dir.join(candidate))
                }
            }
            _ => Err(IndicatorsError::validation("config is not sqlite backend")),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.database {
            DatabaseConfig::Sqlite { .. } => "sqlite",
            DatabaseConfig::Postgres { .. } => "postgres",
        }
    }

    pub fn connection_url(&self, base_dir: &Path) -> IndicatorsResult<String> {
        match &self.database {
            DatabaseConfig::Sqlite { .. } => {
                let path = self.sqlite_path(base_dir)?;
                Ok(format!("sqlite://{}?mode=rwc", path.display()))
            }
            DatabaseConfig::Postgres { url } => Ok(url.clone()),
        }
    }

    pub fn limits(&self) -> LimitsConfig {
        self.limits.clone().unwrap_or_else(LimitsConfig::with_defaults)
    }

    pub fn source_policy(&self) -> DetailedSourcePolicy {
        self.detailed_source_policy.unwrap_or_default()
    }
}
