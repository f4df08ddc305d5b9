use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::CredentialBroker;
use crate::error::SyncError;

const DEFAULT_BASE_URL: &str = "https://api.getkolla.com/connect/v1";

/// Credential broker client. Every connector's token is fetched through the
/// same API key.
pub struct KollaBroker {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl KollaBroker {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn credentials_url(&self, connector: &str) -> String {
        format!(
            "{}/connectors/{}/linkedaccounts/-:credentials",
            self.base_url,
            urlencoding::encode(connector)
        )
    }
}

#[derive(Serialize)]
struct CredentialsRequest<'a> {
    consumer_id: &'a str,
}

#[derive(Deserialize)]
struct CredentialsResponse {
    #[serde(default)]
    token: String,
    #[serde(default)]
    expiry_time: Option<String>,
}

fn parse_credentials(connector: &str, body: &str) -> Result<String, SyncError> {
    let creds: CredentialsResponse =
        serde_json::from_str(body).map_err(|e| credential_err(connector, e))?;
    if creds.token.is_empty() {
        return Err(credential_err(connector, "broker returned an empty token"));
    }
    if let Some(expiry) = &creds.expiry_time {
        debug!(connector, expiry = %expiry, "resolved credential");
    }
    Ok(creds.token)
}

fn credential_err(connector: &str, message: impl ToString) -> SyncError {
    SyncError::Credential {
        connector: connector.to_string(),
        message: message.to_string(),
    }
}

#[async_trait]
impl CredentialBroker for KollaBroker {
    #[instrument(skip(self, customer_id))]
    async fn resolve_token(&self, connector: &str, customer_id: &str) -> Result<String, SyncError> {
        let resp = self
            .client
            .post(self.credentials_url(connector))
            .bearer_auth(&self.api_key)
            .json(&CredentialsRequest {
                consumer_id: customer_id,
            })
            .send()
            .await
            .map_err(|e| credential_err(connector, e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| credential_err(connector, e))?;
        if !status.is_success() {
            return Err(credential_err(
                connector,
                format!("HTTP {status}: {}", body.trim()),
            ));
        }
        parse_credentials(connector, &body)
    }
}
