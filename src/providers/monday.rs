use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{Board, DeleteOutcome};
use crate::error::SyncError;
use crate::model::item::ItemDraft;

const API_URL: &str = "https://api.monday.com/v2";

const DELETE_ITEM: &str = r#"mutation ($itemId: ID!) {
  delete_item(item_id: $itemId) { id }
}"#;

const CREATE_ITEM: &str = r#"mutation ($boardId: ID!, $groupId: String!, $itemName: String!, $columnValues: JSON!) {
  create_item(board_id: $boardId, group_id: $groupId, item_name: $itemName, column_values: $columnValues) { id }
}"#;

const ACCOUNT_INFO: &str = r#"query {
  users { account { id show_timeline_weekends tier slug plan { period } } }
}"#;

const BOARD_INFO: &str = r#"query ($boardIds: [ID!]) {
  boards(ids: $boardIds) { name state id groups { title id } columns { type } }
}"#;

pub struct MondayBoard {
    client: reqwest::Client,
    token: String,
    board_id: String,
    group_id: String,
    api_url: String,
}

impl MondayBoard {
    pub fn new(client: reqwest::Client, token: String, board_id: String, group_id: String) -> Self {
        Self {
            client,
            token,
            board_id,
            group_id,
            api_url: API_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_api_url(mut self, api_url: String) -> Self {
        self.api_url = api_url;
        self
    }

    /// POST one GraphQL document and hand back the raw status and body.
    async fn send(
        &self,
        operation: &str,
        query: &str,
        variables: Value,
    ) -> Result<(StatusCode, String), SyncError> {
        let body = json!({ "query": query, "variables": variables });
        let resp = self
            .client
            .post(&self.api_url)
            .header("Authorization", &self.token)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError::transport(format!("Monday {operation} request failed"), e))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| SyncError::transport(format!("Failed to read Monday {operation} response"), e))?;
        debug!(operation, %status, response = %text, "monday response");
        Ok((status, text))
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: Value,
    ) -> Result<T, SyncError> {
        let (status, text) = self.send(operation, query, variables).await?;
        if !status.is_success() {
            return Err(SyncError::Http {
                context: format!("Monday {operation}"),
                status,
            });
        }
        decode_response(operation, &text)
    }
}

#[derive(Deserialize)]
struct GqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GqlError>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    status_code: Option<Value>,
}

impl<T> GqlResponse<T> {
    fn messages(&self) -> Vec<String> {
        let mut messages: Vec<String> = self.errors.iter().map(|e| e.message.clone()).collect();
        messages.extend(self.error_message.clone());
        messages
    }

    fn is_not_found(&self) -> bool {
        let code_says_so = self.error_code.as_deref() == Some("ResourceNotFoundException")
            || self
                .errors
                .iter()
                .filter_map(|e| e.extensions.as_ref()?.get("code")?.as_str())
                .any(|code| code == "ResourceNotFoundException");
        let status_says_so = matches!(&self.status_code, Some(v) if v.as_u64() == Some(404));
        let message_says_so = self
            .messages()
            .iter()
            .any(|m| m.to_lowercase().contains("not found"));
        code_says_so || status_says_so || message_says_so
    }
}

#[derive(Deserialize)]
struct GqlError {
    message: String,
    #[serde(default)]
    extensions: Option<Value>,
}

#[derive(Deserialize)]
struct CreateItemData {
    create_item: Option<ItemRef>,
}

#[derive(Deserialize)]
struct DeleteItemData {
    delete_item: Option<ItemRef>,
}

#[derive(Deserialize)]
struct ItemRef {
    id: Value,
}

/// Unwrap `data`, turning any GraphQL-level error into a decode error.
fn decode_response<T: DeserializeOwned>(operation: &str, body: &str) -> Result<T, SyncError> {
    let context = format!("Failed to parse Monday {operation} response");
    let gql: GqlResponse<T> =
        serde_json::from_str(body).map_err(|e| SyncError::decode(&context, e))?;

    let messages = gql.messages();
    if !messages.is_empty() {
        return Err(SyncError::decode(&context, messages.join("; ")));
    }
    gql.data
        .ok_or_else(|| SyncError::decode(&context, "No data in Monday response"))
}

/// A missing item counts as deleted. Other GraphQL errors, undecodable bodies
/// and non-2xx statuses (except a 404 that explains itself) stay fatal.
fn interpret_delete(item_id: &str, status: StatusCode, body: &str) -> Result<DeleteOutcome, SyncError> {
    let context = "Failed to parse Monday delete_item response";
    let gql: GqlResponse<DeleteItemData> = match serde_json::from_str(body) {
        Ok(gql) => gql,
        Err(_) if !status.is_success() => {
            return Err(SyncError::Http {
                context: "Monday delete_item".into(),
                status,
            })
        }
        Err(e) => return Err(SyncError::decode(context, e)),
    };

    if gql.is_not_found() && (status.is_success() || status == StatusCode::NOT_FOUND) {
        let reason = gql.messages().join("; ");
        return Ok(DeleteOutcome::AlreadyGone(if reason.is_empty() {
            "Item not found".into()
        } else {
            reason
        }));
    }
    if !status.is_success() {
        return Err(SyncError::Http {
            context: "Monday delete_item".into(),
            status,
        });
    }

    let messages = gql.messages();
    if !messages.is_empty() {
        return Err(SyncError::decode(context, messages.join("; ")));
    }
    match gql.data {
        Some(DeleteItemData {
            delete_item: Some(_),
        }) => Ok(DeleteOutcome::Deleted),
        Some(DeleteItemData { delete_item: None }) => Ok(DeleteOutcome::AlreadyGone(format!(
            "board returned no item for {item_id}"
        ))),
        None => Err(SyncError::decode(context, "No data in Monday response")),
    }
}

fn created_item_id(data: CreateItemData) -> Result<String, SyncError> {
    match data.create_item.map(|item| item.id) {
        Some(Value::String(id)) => Ok(id),
        _ => Err(SyncError::decode(
            "Failed to parse Monday create_item response",
            "data.create_item.id is missing or not a string",
        )),
    }
}

#[async_trait]
impl Board for MondayBoard {
    async fn delete_item(&self, item_id: &str) -> Result<DeleteOutcome, SyncError> {
        let (status, text) = self
            .send("delete_item", DELETE_ITEM, json!({ "itemId": item_id }))
            .await?;
        interpret_delete(item_id, status, &text)
    }

    async fn create_item(&self, draft: &ItemDraft) -> Result<String, SyncError> {
        let column_values = draft
            .column_values_json()
            .map_err(|e| SyncError::decode("Failed to encode column values", e))?;
        let data: CreateItemData = self
            .execute(
                "create_item",
                CREATE_ITEM,
                json!({
                    "boardId": self.board_id,
                    "groupId": self.group_id,
                    "itemName": draft.name,
                    "columnValues": column_values,
                }),
            )
            .await?;
        created_item_id(data)
    }

    async fn account_info(&self) -> Result<Value, SyncError> {
        self.execute("account", ACCOUNT_INFO, json!({})).await
    }

    async fn board_info(&self) -> Result<Value, SyncError> {
        self.execute("board", BOARD_INFO, json!({ "boardIds": [self.board_id] }))
            .await
    }
}
