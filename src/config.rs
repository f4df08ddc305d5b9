use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::SyncError;

pub const DEFAULT_ENV_FILE: &str = "env-vars.txt";
pub const DEFAULT_STATE_FILE: &str = "item-ids.txt";

/// Values read from the env file. Missing keys stay empty until [`SyncConfig::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncConfig {
    pub api_key: String,
    pub board_connector: String,
    pub board_customer_id: String,
    pub board_id: String,
    pub group_id: String,
    pub hr_connector: String,
    pub hr_customer_id: String,
    pub company_domain: String,
    /// Overrides the credential broker base URL when set.
    pub broker_base_url: Option<String>,
}

impl SyncConfig {
    /// Parse `KEY=value` lines. Unknown keys, blank lines and `#` comments are ignored.
    pub fn parse(contents: &str) -> Self {
        let mut config = SyncConfig::default();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().to_string();
            match key.trim() {
                "APIKEY" => config.api_key = value,
                "MONDAYCONNECTOR" => config.board_connector = value,
                "KOLLACUSTOMERID" | "CUSTOMERID" => config.board_customer_id = value,
                "BOARDID" => config.board_id = value,
                "GROUPID" => config.group_id = value,
                "BAMBOOCONNECTOR" => config.hr_connector = value,
                "BAMBOOCUSTOMERID" => config.hr_customer_id = value,
                "COMPANYDOMAIN" => config.company_domain = value,
                "KOLLABASEURL" => config.broker_base_url = Some(value),
                other => debug!(key = other, "ignoring unknown config key"),
            }
        }
        config
    }

    /// Reject the config if any required key is empty, naming all of them at once.
    pub fn validate(&self) -> Result<(), SyncError> {
        let required = [
            ("APIKEY", &self.api_key),
            ("MONDAYCONNECTOR", &self.board_connector),
            ("KOLLACUSTOMERID", &self.board_customer_id),
            ("BOARDID", &self.board_id),
            ("GROUPID", &self.group_id),
            ("BAMBOOCONNECTOR", &self.hr_connector),
            ("BAMBOOCUSTOMERID", &self.hr_customer_id),
            ("COMPANYDOMAIN", &self.company_domain),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(key, _)| *key)
            .collect();
        if !missing.is_empty() {
            return Err(SyncError::Config(format!(
                "missing required keys: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<SyncConfig, SyncError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        SyncError::Config(format!("failed to read {}: {e}", path.display()))
    })?;
    let config = SyncConfig::parse(&contents);
    debug!(
        path = %path.display(),
        board_connector = %config.board_connector,
        hr_connector = %config.hr_connector,
        company_domain = %config.company_domain,
        "loaded config"
    );
    config.validate()?;
    Ok(config)
}

pub fn default_env_path() -> PathBuf {
    PathBuf::from(DEFAULT_ENV_FILE)
}

pub fn default_state_path() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_FILE)
}
