use std::path::{Path, PathBuf};

use crate::{IndicatorStore, IndicatorsConfig, IndicatorsResult};

const DEFAULT_DB_NAME: &str = "indicators.sqlite";

pub fn load_or_init_config(base: &Path) -> IndicatorsResult<IndicatorsConfig> {
    let default_sqlite = base.join(DEFAULT_DB_NAME);
    IndicatorsConfig::load_or_init(base, &default_sqlite)
}

pub async fn open_store(base: &Path) -> IndicatorsResult<IndicatorStore> {
    let config = load_or_init_config(base)?;
    IndicatorStore::connect(&config, base).await
}

pub fn default_sqlite_path(base: &Path) -> PathBuf {
    base.join(DEFAULT_DB_NAME)
}
