use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File as ConfigFile, FileFormat};
use eyre::{eyre, Context, Result};
use fs_err::{create_dir_all, File};
use punchclock_common::utils::{config_dir, data_dir};
use std::io::Write;
use std::time::Duration;

const EXAMPLE_CONFIG: &str = include_str!("../config.toml");

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct Settings {
    pub db_path: String,
    pub server_address: String,
    pub sync_timeout_secs: u64,
    pub probe_interval_secs: u64,
    pub cache_generation: String,
    pub cacheable_prefixes: Vec<String>,
    pub precache: Vec<String>,
    pub fallback_path: String,
}

impl Settings {
    pub fn builder() -> Result<ConfigBuilder<DefaultState>> {
        let db_path = data_dir().join("terminal.db");

        Ok(Config::builder()
            .set_default("db_path", db_path.to_str())?
            .set_default("server_address", "http://127.0.0.1:8090")?
            .set_default("sync_timeout_secs", 10)?
            .set_default("probe_interval_secs", 15)?
            .set_default("cache_generation", "punchclock-v1")?
            .set_default(
                "cacheable_prefixes",
                vec!["/static/", "/employees", "/terminals", "/entries"],
            )?
            .set_default("precache", vec!["/"])?
            .set_default("fallback_path", "/")?
            .add_source(
                Environment::with_prefix("punchclock")
                    .prefix_separator("_")
                    .separator("__"),
            ))
    }

    pub fn new() -> Result<Self> {
        let config_dir = config_dir();
        let data_dir = data_dir();

        create_dir_all(&config_dir)
            .wrap_err_with(|| format!("Failed to create dir {config_dir:?}"))?;
        create_dir_all(&data_dir).wrap_err_with(|| format!("Failed to create dir {data_dir:?}"))?;

        let config_file = config_dir.join("config.toml");

        let mut config_builder = Self::builder()?;
        config_builder = if config_file.exists() {
            config_builder.add_source(ConfigFile::from(config_file).format(FileFormat::Toml))
        } else {
            let mut file = File::create(config_file).wrap_err("Failed to create config file")?;
            file.write_all(EXAMPLE_CONFIG.as_bytes())
                .wrap_err("Failed to write default config file")?;
            config_builder
        };

        let mut settings: Settings = config_builder
            .build()?
            .try_deserialize()
            .map_err(|e| eyre!("Failed to deserialize {}", e))?;

        settings.db_path = expand_shell(&settings.db_path)?;

        Ok(settings)
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_secs(self.sync_timeout_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }
}

fn expand_shell(value: &str) -> Result<String> {
    Ok(shellexpand::full(value)?.to_string())
}
