use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info};

use super::TimeOffSource;
use crate::error::SyncError;
use crate::model::time_off::{DateWindow, TimeOffRequest};

pub struct BambooTimeOff {
    client: reqwest::Client,
    auth_header: String,
    base_url: String,
}

impl BambooTimeOff {
    pub fn new(client: reqwest::Client, token: String, company_domain: String) -> Self {
        // BambooHR takes the API key as the basic-auth user with any password.
        let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{token}:x"));
        Self {
            client,
            auth_header: format!("Basic {encoded}"),
            base_url: format!(
                "https://api.bamboohr.com/api/gateway.php/{}/v1",
                urlencoding::encode(&company_domain)
            ),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn requests_url(&self) -> String {
        format!("{}/time_off/requests/", self.base_url)
    }
}

/// BambooHR returns a bare array; some proxies wrap it as `{"data": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RequestsPayload {
    Bare(Vec<RawRequest>),
    Wrapped { data: Vec<RawRequest> },
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawRequest {
    #[serde(deserialize_with = "lenient_string")]
    employee_id: String,
    #[serde(deserialize_with = "lenient_string")]
    name: String,
    #[serde(deserialize_with = "lenient_object")]
    status: RawStatus,
    #[serde(deserialize_with = "lenient_string")]
    start: String,
    #[serde(deserialize_with = "lenient_string")]
    end: String,
    #[serde(deserialize_with = "lenient_string")]
    created: String,
    #[serde(deserialize_with = "lenient_object")]
    amount: RawAmount,
    #[serde(deserialize_with = "lenient_object")]
    notes: RawNotes,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawStatus {
    #[serde(deserialize_with = "lenient_string")]
    status: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawAmount {
    #[serde(deserialize_with = "lenient_string")]
    unit: String,
    #[serde(deserialize_with = "lenient_string")]
    amount: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawNotes {
    #[serde(deserialize_with = "lenient_string")]
    employee: String,
    #[serde(deserialize_with = "lenient_string")]
    manager: String,
}

/// Strings stay strings, numbers are rendered, anything else becomes empty.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

/// An object decodes normally; `null`, `[]` and other shapes fall back to the default.
fn lenient_object<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned + Default,
{
    match Value::deserialize(deserializer)? {
        v @ Value::Object(_) => serde_json::from_value(v).map_err(serde::de::Error::custom),
        _ => Ok(T::default()),
    }
}

impl From<RawRequest> for TimeOffRequest {
    fn from(raw: RawRequest) -> Self {
        let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };
        TimeOffRequest {
            employee_id: raw.employee_id,
            name: raw.name,
            status: raw.status.status,
            start: raw.start,
            end: raw.end,
            created: raw.created,
            amount: raw.amount.amount,
            unit: raw.amount.unit,
            employee_note: non_empty(raw.notes.employee),
            manager_note: non_empty(raw.notes.manager),
        }
    }
}

pub fn parse_requests(body: &str) -> Result<Vec<TimeOffRequest>, SyncError> {
    let payload: RequestsPayload = serde_json::from_str(body)
        .map_err(|e| SyncError::decode("Failed to parse BambooHR response", e))?;
    let raw = match payload {
        RequestsPayload::Bare(items) | RequestsPayload::Wrapped { data: items } => items,
    };
    Ok(raw.into_iter().map(TimeOffRequest::from).collect())
}

#[async_trait]
impl TimeOffSource for BambooTimeOff {
    async fn fetch_time_off(&self, window: &DateWindow) -> Result<Vec<TimeOffRequest>, SyncError> {
        let (start, end) = (window.start_param(), window.end_param());
        debug!(%start, %end, "fetching time-off requests");

        let resp = self
            .client
            .get(self.requests_url())
            .query(&[("start", start.as_str()), ("end", end.as_str())])
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| SyncError::transport("BambooHR API request failed", e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SyncError::Http {
                context: "BambooHR time_off/requests".into(),
                status,
            });
        }
        let body = resp
            .text()
            .await
            .map_err(|e| SyncError::transport("Failed to read BambooHR response", e))?;

        let requests = parse_requests(&body)?;
        info!(count = requests.len(), "fetched time-off requests");
        Ok(requests)
    }
}
