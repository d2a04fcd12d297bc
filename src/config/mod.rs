use chrono::NaiveTime;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Broker credentials
///
/// `factor2` carries the current one-time second-factor value; generating
/// it is the job of an external authenticator, not this process.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub user: String,
    pub password: String,
    pub factor2: String,
    pub vendor_code: String,
    pub api_key: String,
    pub imei: String,
}

/// Application configuration, loaded from a YAML file with environment
/// overrides (prefix `TRENDBOT`, `__` separator)
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub symbols: Vec<String>,
    pub quantity: u32,
    pub exchange: String,
    /// Daily session start as "HH:MM:SS", combined with today's date when
    /// fetching bars
    pub start_time: String,
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub credentials: Credentials,
}

fn default_snapshot_dir() -> String {
    ".".to_string()
}

fn default_base_url() -> String {
    "https://api.shoonya.com/NorenWClientTP".to_string()
}

/// Load and validate configuration; any failure here is fatal at startup
pub fn load(path: &Path) -> anyhow::Result<Settings> {
    let config = Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(
            Environment::with_prefix("TRENDBOT")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let settings: Settings = config.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

impl Settings {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.symbols.is_empty() {
            anyhow::bail!("no symbols configured");
        }
        if self.quantity == 0 {
            anyhow::bail!("quantity must be greater than zero");
        }
        if self.exchange.trim().is_empty() {
            anyhow::bail!("exchange must not be empty");
        }
        self.session_start()?;
        Ok(())
    }

    /// Parse `start_time` as a time of day
    ///
    /// Must be exactly three colon-separated components forming a valid
    /// wall-clock time.
    pub fn session_start(&self) -> anyhow::Result<NaiveTime> {
        if self.start_time.split(':').count() != 3 {
            anyhow::bail!(
                "start_time must be formatted as HH:MM:SS, got {:?}",
                self.start_time
            );
        }
        NaiveTime::parse_from_str(&self.start_time, "%H:%M:%S").map_err(|e| {
            anyhow::anyhow!("start_time {:?} is not a valid time: {}", self.start_time, e)
        })
    }
}
