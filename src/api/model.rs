//! Model versions and model nodes

use crate::error::ApiResult;
use crate::http::{ApiClient, ApiRequest};
use crate::types::{
    CodeTestRequest, CodeTestResult, ListResponse, ModelNode, ModelNodeCreate, ModelNodeUpdate,
    ModelVersion, ModelVersionCreate, ModelVersionUpdate, SkipLimit,
};

// ============================================================================
// Versions
// ============================================================================

pub async fn list_versions(
    client: &ApiClient,
    paging: SkipLimit,
    search: Option<&str>,
) -> ApiResult<ListResponse<ModelVersion>> {
    let request = ApiRequest::get("/model-versions")
        .params(&paging)?
        .query_opt("search", search);
    client.send_json(request).await
}

pub async fn get_version(client: &ApiClient, id: i64) -> ApiResult<ModelVersion> {
    client.send_json(ApiRequest::get(format!("/model-versions/{}", id))).await
}

/// Copying a base version's node tree can take a while.
pub async fn create_version(client: &ApiClient, data: &ModelVersionCreate) -> ApiResult<ModelVersion> {
    client
        .send_json(
            ApiRequest::post("/model-versions")
                .json(data)?
                .timeout(client.long_timeout()),
        )
        .await
}

pub async fn update_version(
    client: &ApiClient,
    id: i64,
    data: &ModelVersionUpdate,
) -> ApiResult<ModelVersion> {
    client
        .send_json(ApiRequest::put(format!("/model-versions/{}", id)).json(data)?)
        .await
}

pub async fn delete_version(client: &ApiClient, id: i64) -> ApiResult<()> {
    client.send_unit(ApiRequest::delete(format!("/model-versions/{}", id))).await
}

/// Make this the version used for calculations; the previous one is deactivated.
pub async fn activate_version(client: &ApiClient, id: i64) -> ApiResult<ModelVersion> {
    client
        .send_json(ApiRequest::put(format!("/model-versions/{}/activate", id)))
        .await
}

// ============================================================================
// Nodes
// ============================================================================

/// Children of `parent_id`, or the roots when `None`. Each node comes with
/// its subtree already loaded.
pub async fn list_nodes(
    client: &ApiClient,
    version_id: i64,
    parent_id: Option<i64>,
) -> ApiResult<ListResponse<ModelNode>> {
    let request = ApiRequest::get("/model-nodes")
        .query("version_id", version_id)
        .query_opt("parent_id", parent_id);
    client.send_json(request).await
}

pub async fn get_node(client: &ApiClient, id: i64) -> ApiResult<ModelNode> {
    client.send_json(ApiRequest::get(format!("/model-nodes/{}", id))).await
}

pub async fn create_node(client: &ApiClient, data: &ModelNodeCreate) -> ApiResult<ModelNode> {
    client.send_json(ApiRequest::post("/model-nodes").json(data)?).await
}

pub async fn update_node(client: &ApiClient, id: i64, data: &ModelNodeUpdate) -> ApiResult<ModelNode> {
    client
        .send_json(ApiRequest::put(format!("/model-nodes/{}", id)).json(data)?)
        .await
}

/// Deletes the whole subtree server-side.
pub async fn delete_node(client: &ApiClient, id: i64) -> ApiResult<()> {
    client.send_unit(ApiRequest::delete(format!("/model-nodes/{}", id))).await
}

pub async fn test_node_code(
    client: &ApiClient,
    id: i64,
    request: &CodeTestRequest,
) -> ApiResult<CodeTestResult> {
    client
        .send_json(ApiRequest::post(format!("/model-nodes/{}/test-code", id)).json(request)?)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Method, MockReply, MockTransport};
    use crate::session::{AppContext, MemoryStore, RecordingNotifier};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn setup() -> (ApiClient, Arc<MockTransport>) {
        let mock = Arc::new(MockTransport::new());
        let ctx = AppContext::new(
            Arc::new(MemoryStore::new()),
            Arc::new(RecordingNotifier::new()),
            Duration::ZERO,
        );
        let client = ApiClient::new(mock.clone(), Arc::new(ctx)).with_long_timeout(Duration::from_secs(90));
        (client, mock)
    }

    #[tokio::test]
    async fn test_create_version_uses_long_timeout() {
        let (client, mock) = setup();
        mock.on(
            Method::Post,
            "/model-versions",
            MockReply::json(201, json!({"id": 4, "version": "v2", "name": "2025 模型"})),
        );

        let version = create_version(
            &client,
            &ModelVersionCreate {
                version: "v2".to_string(),
                name: "2025 模型".to_string(),
                description: None,
                base_version_id: Some(1),
            },
        )
        .await
        .unwrap();

        assert_eq!(version.id, 4);
        let req = mock.last_request().unwrap();
        assert_eq!(req.timeout, Some(Duration::from_secs(90)));
        assert_eq!(req.json_body().unwrap()["base_version_id"], 1);
    }

    #[tokio::test]
    async fn test_list_roots_omits_parent() {
        let (client, mock) = setup();
        mock.on(Method::Get, "/model-nodes", MockReply::ok(json!({"items": [], "total": 0})));
        list_nodes(&client, 3, None).await.unwrap();

        let req = mock.last_request().unwrap();
        assert_eq!(req.query_value("version_id"), Some("3"));
        assert_eq!(req.query_value("parent_id"), None);
    }

    #[tokio::test]
    async fn test_delete_version_accepts_no_content() {
        let (client, mock) = setup();
        mock.on(Method::Delete, "/model-versions/2", MockReply::status(204));
        delete_version(&client, 2).await.unwrap();
    }
}
