use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub http: Http,
    pub keys: Keys,
    pub log: Log,
    pub session: Session,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    /// TLS is enabled when both paths are set.
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Keys {
    pub private_key_path: String,
    pub public_key_path: String,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct Session {
    pub backend: String, // "redis" or "memory"
    pub redis_dsn: Option<String>,
    #[serde(default)]
    pub prefix: String,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub backend: String, // "mysql" or "memory"
    pub mysql_dsn: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    pub default_email: Option<String>,
    pub default_password: Option<String>,
}

fn default_max_connections() -> u32 {
    10
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

const ENV_PREFIX: &str = "CENSUS_AUTH";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
