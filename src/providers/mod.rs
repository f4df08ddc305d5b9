pub mod bamboo;
pub mod kolla;
pub mod monday;

use std::time::Duration;

use async_trait::async_trait;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::model::item::ItemDraft;
use crate::model::time_off::{DateWindow, TimeOffRequest};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait CredentialBroker: Send + Sync {
    /// Bearer token for `connector` on behalf of `customer_id`.
    async fn resolve_token(&self, connector: &str, customer_id: &str) -> Result<String, SyncError>;
}

/// What happened to an item the previous run created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The board no longer has the item; the reason is the board's own message.
    AlreadyGone(String),
}

#[async_trait]
pub trait Board: Send + Sync {
    async fn delete_item(&self, item_id: &str) -> Result<DeleteOutcome, SyncError>;
    /// Returns the id the board assigned to the new item.
    async fn create_item(&self, draft: &ItemDraft) -> Result<String, SyncError>;
    async fn account_info(&self) -> Result<serde_json::Value, SyncError>;
    async fn board_info(&self) -> Result<serde_json::Value, SyncError>;
}

#[async_trait]
pub trait TimeOffSource: Send + Sync {
    async fn fetch_time_off(&self, window: &DateWindow) -> Result<Vec<TimeOffRequest>, SyncError>;
}

/// Builds the remote clients once their tokens are known.
pub trait Connectors: Send + Sync {
    fn broker(&self) -> &dyn CredentialBroker;
    fn board(&self, token: String) -> Box<dyn Board>;
    fn time_off(&self, token: String) -> Box<dyn TimeOffSource>;
}

/// Production wiring: Kolla for credentials, Monday for the board, BambooHR for time off.
/// All three share one HTTP client.
pub struct HttpConnectors {
    client: reqwest::Client,
    broker: kolla::KollaBroker,
    board_id: String,
    group_id: String,
    company_domain: String,
}

impl HttpConnectors {
    pub fn new(config: &SyncConfig) -> Result<Self, SyncError> {
        let client = http_client()?;
        let mut broker = kolla::KollaBroker::new(client.clone(), config.api_key.clone());
        if let Some(base) = &config.broker_base_url {
            broker = broker.with_base_url(base.clone());
        }
        Ok(Self {
            client,
            broker,
            board_id: config.board_id.clone(),
            group_id: config.group_id.clone(),
            company_domain: config.company_domain.clone(),
        })
    }
}

impl Connectors for HttpConnectors {
    fn broker(&self) -> &dyn CredentialBroker {
        &self.broker
    }

    fn board(&self, token: String) -> Box<dyn Board> {
        Box::new(monday::MondayBoard::new(
            self.client.clone(),
            token,
            self.board_id.clone(),
            self.group_id.clone(),
        ))
    }

    fn time_off(&self, token: String) -> Box<dyn TimeOffSource> {
        Box::new(bamboo::BambooTimeOff::new(
            self.client.clone(),
            token,
            self.company_domain.clone(),
        ))
    }
}

pub fn http_client() -> Result<reqwest::Client, SyncError> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|e| SyncError::transport("Failed to build HTTP client", e))
}

pub(crate) fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
pub mod tests;
