use playlog_core::DEFAULT_CONFIG_TOML;
use playlog_telemetry::Paths;
use std::path::Path;

pub fn run(config: Option<&Path>) -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let target = paths.config_or_default(config);

    if write_default_config(&target)? {
        println!("✓ Wrote starter config to {}", target.display());
        println!("\nNext steps:");
        println!("  - add your players under [[players]]");
        println!("  - export STEAM_WEB_API_KEY, or set [source] kind = \"scraper\"");
        println!("  - run `playlog collect --once`");
    } else {
        println!("Config already exists at {}", target.display());
    }
    Ok(())
}

/// Returns false when a config is already present
fn write_default_config(target: &Path) -> anyhow::Result<bool> {
    if target.exists() {
        return Ok(false);
    }
    playlog_telemetry::atomic_write(target, DEFAULT_CONFIG_TOML.as_bytes())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_init_writes_config_into_data_dir() {
        let temp = TempDir::new().unwrap();
        std::env::set_var(playlog_telemetry::HOME_ENV, temp.path());

        let result = run(None);
        std::env::remove_var(playlog_telemetry::HOME_ENV);

        assert!(result.is_ok());
        let written = std::fs::read_to_string(temp.path().join("config.toml")).unwrap();
        assert!(written.contains("[polling]"));
        assert!(playlog_core::AppConfig::parse(&written).is_ok());
    }

    #[test]
    fn test_init_keeps_existing_config() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("custom.toml");
        std::fs::write(&target, "# mine\n").unwrap();

        assert!(!write_default_config(&target).unwrap());
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "# mine\n");
    }
}
