use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use super::{Board, Connectors, CredentialBroker, DeleteOutcome, TimeOffSource};
use crate::error::SyncError;
use crate::model::item::ItemDraft;
use crate::model::time_off::{DateWindow, TimeOffRequest};

/// Every remote call made during a run, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Resolve { connector: String, customer_id: String },
    Delete(String),
    Create { name: String, columns: String, token: String },
    AccountInfo,
    BoardInfo,
    Fetch { start: String, end: String, token: String },
}

/// In-memory stand-in for Kolla, Monday and BambooHR.
#[derive(Clone, Default)]
pub struct MockConnectors {
    pub calls: Arc<Mutex<Vec<Call>>>,
    pub requests: Arc<Mutex<Option<Result<Vec<TimeOffRequest>, String>>>>,
    pub next_ids: Arc<Mutex<VecDeque<String>>>,
    pub fail_delete: Option<String>,
    /// Ids the board reports as no longer existing.
    pub gone_ids: Vec<String>,
    pub fail_create_after: Option<usize>,
    pub fail_resolve: Option<String>,
    pub fail_diagnostics: bool,
}

impl MockConnectors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_requests(self, requests: Vec<TimeOffRequest>) -> Self {
        *self.requests.lock().unwrap() = Some(Ok(requests));
        self
    }

    /// Simulate an HR payload that does not decode.
    pub fn with_malformed_requests(self) -> Self {
        *self.requests.lock().unwrap() = Some(Err("expected value at line 1 column 1".into()));
        self
    }

    pub fn with_created_ids(self, ids: &[&str]) -> Self {
        *self.next_ids.lock().unwrap() = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn creates(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Create { .. }))
            .collect()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl CredentialBroker for MockConnectors {
    async fn resolve_token(&self, connector: &str, customer_id: &str) -> Result<String, SyncError> {
        self.record(Call::Resolve {
            connector: connector.to_string(),
            customer_id: customer_id.to_string(),
        });
        if self.fail_resolve.as_deref() == Some(connector) {
            return Err(SyncError::Credential {
                connector: connector.to_string(),
                message: "unknown linked account".into(),
            });
        }
        Ok(format!("token-{connector}"))
    }
}

struct MockBoard {
    inner: MockConnectors,
    token: String,
}

#[async_trait]
impl Board for MockBoard {
    async fn delete_item(&self, item_id: &str) -> Result<DeleteOutcome, SyncError> {
        self.inner.record(Call::Delete(item_id.to_string()));
        if self.inner.fail_delete.as_deref() == Some(item_id) {
            return Err(SyncError::decode(
                "Failed to parse Monday delete_item response",
                "Not Authenticated",
            ));
        }
        if self.inner.gone_ids.iter().any(|id| id == item_id) {
            return Ok(DeleteOutcome::AlreadyGone("Item not found".into()));
        }
        Ok(DeleteOutcome::Deleted)
    }

    async fn create_item(&self, draft: &ItemDraft) -> Result<String, SyncError> {
        let created_so_far = self.inner.creates().len();
        if self.inner.fail_create_after == Some(created_so_far) {
            return Err(SyncError::decode(
                "Failed to parse Monday create_item response",
                "data.create_item.id is missing or not a string",
            ));
        }
        self.inner.record(Call::Create {
            name: draft.name.clone(),
            columns: draft.column_values_json().unwrap(),
            token: self.token.clone(),
        });
        let id = self
            .inner
            .next_ids
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| format!("new-{}", created_so_far + 1));
        Ok(id)
    }

    async fn account_info(&self) -> Result<Value, SyncError> {
        self.inner.record(Call::AccountInfo);
        if self.inner.fail_diagnostics {
            return Err(SyncError::decode("Failed to parse Monday account response", "boom"));
        }
        Ok(json!({ "users": [{ "account": { "id": 1, "tier": "pro" } }] }))
    }

    async fn board_info(&self) -> Result<Value, SyncError> {
        self.inner.record(Call::BoardInfo);
        if self.inner.fail_diagnostics {
            return Err(SyncError::decode("Failed to parse Monday board response", "boom"));
        }
        Ok(json!({ "boards": [{ "id": "123", "name": "Time off" }] }))
    }
}

struct MockTimeOff {
    inner: MockConnectors,
    token: String,
}

#[async_trait]
impl TimeOffSource for MockTimeOff {
    async fn fetch_time_off(&self, window: &DateWindow) -> Result<Vec<TimeOffRequest>, SyncError> {
        self.inner.record(Call::Fetch {
            start: window.start_param(),
            end: window.end_param(),
            token: self.token.clone(),
        });
        match self.inner.requests.lock().unwrap().clone() {
            Some(Ok(requests)) => Ok(requests),
            Some(Err(message)) => Err(SyncError::decode("Failed to parse BambooHR response", message)),
            None => Ok(Vec::new()),
        }
    }
}

impl Connectors for MockConnectors {
    fn broker(&self) -> &dyn CredentialBroker {
        self
    }

    fn board(&self, token: String) -> Box<dyn Board> {
        Box::new(MockBoard {
            inner: self.clone(),
            token,
        })
    }

    fn time_off(&self, token: String) -> Box<dyn TimeOffSource> {
        Box::new(MockTimeOff {
            inner: self.clone(),
            token,
        })
    }
}

/// Accept one connection on a local port, read the request and answer with
/// `status` and `body`. Returns the base URL to point a client at.
pub async fn serve_once(status: u16, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
    });
    format!("http://{addr}")
}

/// Client for [`serve_once`] tests; ignores any proxy set in the environment.
pub fn local_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Drain headers and a `Content-Length` body so closing the socket is clean.
async fn read_request(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
        let content_length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() >= header_end + 4 + content_length {
            return;
        }
    }
}

#[tokio::test]
async fn serve_once_answers_with_canned_response() {
    let url = serve_once(418, r#"{"ok":false}"#).await;
    let resp = local_client()
        .post(&url)
        .json(&json!({ "query": "{ me { id } }" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 418);
    assert_eq!(resp.text().await.unwrap(), r#"{"ok":false}"#);
}

#[tokio::test]
async fn mock_board_reports_gone_items() {
    let mocks = MockConnectors {
        gone_ids: vec!["101".into()],
        ..MockConnectors::new()
    };
    let board = mocks.board("t".into());
    assert!(matches!(
        board.delete_item("101").await.unwrap(),
        DeleteOutcome::AlreadyGone(_)
    ));
    assert_eq!(board.delete_item("102").await.unwrap(), DeleteOutcome::Deleted);
}

#[test]
fn pretty_indents_json() {
    let out = super::pretty(&json!({ "account": { "id": 1 } }));
    assert!(out.contains('\n'));
    assert!(out.contains("\"id\": 1"));
}

#[tokio::test]
async fn mock_board_hands_out_ids_in_order() {
    let mocks = MockConnectors::new().with_created_ids(&["a", "b"]);
    let board = mocks.board("t".into());
    let draft = ItemDraft::from_request(&TimeOffRequest::default());
    assert_eq!(board.create_item(&draft).await.unwrap(), "a");
    assert_eq!(board.create_item(&draft).await.unwrap(), "b");
    assert_eq!(board.create_item(&draft).await.unwrap(), "new-3");
}

#[tokio::test]
async fn mock_broker_fails_for_configured_connector() {
    let mocks = MockConnectors {
        fail_resolve: Some("bamboohr".into()),
        ..MockConnectors::new()
    };
    assert!(mocks.broker().resolve_token("monday", "c").await.is_ok());
    let err = mocks.broker().resolve_token("bamboohr", "c").await.unwrap_err();
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn http_connectors_build_from_config() {
    let config = crate::config::SyncConfig {
        api_key: "k".into(),
        board_id: "1".into(),
        group_id: "g".into(),
        company_domain: "acme".into(),
        broker_base_url: Some("http://localhost:1/v1".into()),
        ..Default::default()
    };
    assert!(super::HttpConnectors::new(&config).is_ok());
}
