pub mod collect;
pub mod export;
pub mod history;
pub mod init;
pub mod serve;
pub mod sessions;
pub mod status;
pub mod subjects;
pub mod version;

use anyhow::Context;
use playlog_core::AppConfig;
use playlog_store::{SqliteOpener, SqliteStore};
use playlog_telemetry::Paths;
use std::path::Path;

/// Data directory plus the parsed config it points at
pub(crate) fn load(config: Option<&Path>) -> anyhow::Result<(Paths, AppConfig)> {
    let paths = Paths::new()?;
    let config_path = paths.config_or_default(config);
    let app_config = AppConfig::load(&config_path)
        .with_context(|| format!("run `playlog init` or pass --config ({})", config_path.display()))?;
    Ok((paths, app_config))
}

pub(crate) fn opener(paths: &Paths, config: &AppConfig) -> SqliteOpener {
    SqliteOpener::new(config.database_path(&paths.data_dir))
}

/// Existing database only; read commands never create one
pub(crate) fn open_existing(paths: &Paths, config: &AppConfig) -> anyhow::Result<SqliteStore> {
    let opener = opener(paths, config);
    opener.open_existing()?.ok_or_else(|| {
        anyhow::anyhow!(
            "no database at {}; run `playlog collect` first",
            opener.db_path().display()
        )
    })
}

pub(crate) fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")
}
