use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File as ConfigFile, FileFormat};
use eyre::{eyre, Context, Result};
use fs_err::{create_dir_all, File};
use punchclock_common::utils::{config_dir, data_dir};
use std::io::Write;

const EXAMPLE_CONFIG: &str = include_str!("../server.toml");

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    pub skew_threshold_minutes: i64,
}

impl Settings {
    pub fn builder() -> Result<ConfigBuilder<DefaultState>> {
        let db_path = data_dir().join("server.db");

        Ok(Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", 8090)?
            .set_default("db_path", db_path.to_str())?
            .set_default("skew_threshold_minutes", 2)?
            .add_source(
                Environment::with_prefix("punchclock")
                    .prefix_separator("_")
                    .separator("__"),
            ))
    }

    pub fn new() -> Result<Self> {
        let config_dir = config_dir();
        let config_file = config_dir.join("server.toml");

        let mut config_builder = Self::builder()?;
        config_builder = if config_file.exists() {
            config_builder.add_source(ConfigFile::from(config_file).format(FileFormat::Toml))
        } else {
            create_dir_all(&config_dir)
                .wrap_err_with(|| format!("Failed to create dir {config_dir:?}"))?;
            let mut file = File::create(config_file)?;
            file.write_all(EXAMPLE_CONFIG.as_bytes())
                .wrap_err("Failed to write default server config")?;
            config_builder
        };

        let mut settings: Settings = config_builder
            .build()?
            .try_deserialize()
            .map_err(|e| eyre!("Failed to deserialize config {}", e))?;

        settings.db_path = shellexpand::full(&settings.db_path)?.to_string();

        Ok(settings)
    }

    pub fn skew_threshold(&self) -> time::Duration {
        time::Duration::minutes(self.skew_threshold_minutes)
    }
}
