//! Question-answering conversations
//!
//! JSON endpoints answer with a `{code, message, data}` envelope; the
//! message export streams a file.

use serde::Deserialize;
use serde_json::json;

use crate::error::{ApiError, ApiResult};
use crate::http::{ApiClient, ApiRequest, Download};
use crate::types::{
    Conversation, ConversationCreate, ConversationDetail, ConversationMessage, ConversationQuery,
    ConversationUpdate, ExportFormat, ListResponse, MessageExchange,
};

#[derive(Debug, Deserialize)]
struct Deleted {
    #[serde(default)]
    deleted_messages: u64,
}

pub async fn list(client: &ApiClient, query: &ConversationQuery) -> ApiResult<ListResponse<Conversation>> {
    client
        .send_enveloped(ApiRequest::get("/conversations").params(query)?)
        .await
}

pub async fn create(client: &ApiClient, data: &ConversationCreate) -> ApiResult<Conversation> {
    client
        .send_enveloped(ApiRequest::post("/conversations").json(data)?)
        .await
}

/// The conversation with its full message history.
pub async fn get(client: &ApiClient, id: i64) -> ApiResult<ConversationDetail> {
    client
        .send_enveloped(ApiRequest::get(format!("/conversations/{}", id)))
        .await
}

pub async fn update(client: &ApiClient, id: i64, data: &ConversationUpdate) -> ApiResult<Conversation> {
    client
        .send_enveloped(ApiRequest::put(format!("/conversations/{}", id)).json(data)?)
        .await
}

/// Delete a conversation and its messages; returns how many messages went with it.
pub async fn delete(client: &ApiClient, id: i64) -> ApiResult<u64> {
    let deleted: Deleted = client
        .send_enveloped(ApiRequest::delete(format!("/conversations/{}", id)))
        .await?;
    Ok(deleted.deleted_messages)
}

/// Ask a question. The answer is generated before the call returns.
pub async fn send_message(client: &ApiClient, id: i64, content: &str) -> ApiResult<MessageExchange> {
    if content.trim().is_empty() {
        let err = ApiError::Validation("message cannot be empty".to_string());
        client.context().report(&err);
        return Err(err);
    }
    let request = ApiRequest::post(format!("/conversations/{}/messages", id))
        .json(&json!({ "content": content }))?;
    client.send_enveloped(request).await
}

pub async fn messages(
    client: &ApiClient,
    id: i64,
    page: u32,
    size: u32,
) -> ApiResult<ListResponse<ConversationMessage>> {
    let request = ApiRequest::get(format!("/conversations/{}/messages", id))
        .query("page", page)
        .query("size", size);
    client.send_enveloped(request).await
}

/// One assistant message rendered as a file.
pub async fn export_message(
    client: &ApiClient,
    conversation_id: i64,
    message_id: i64,
    format: ExportFormat,
) -> ApiResult<Download> {
    let path = format!(
        "/conversations/{}/messages/{}/export",
        conversation_id, message_id
    );
    client
        .download(ApiRequest::post(path).json(&json!({ "format": format }))?)
        .await
}

/// Every message of a conversation, fetched page by page.
pub async fn all_messages(client: &ApiClient, id: i64) -> ApiResult<Vec<ConversationMessage>> {
    const PAGE_SIZE: u32 = 200;
    let mut out = Vec::new();
    let mut page = 1;
    loop {
        let batch = messages(client, id, page, PAGE_SIZE).await?;
        let short = batch.items.len() < PAGE_SIZE as usize;
        out.extend(batch.items);
        if short || out.len() as u64 >= batch.total {
            return Ok(out);
        }
        page += 1;
    }
}
