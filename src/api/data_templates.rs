//! Data templates and dimension items

use crate::error::ApiResult;
use crate::http::{ApiClient, ApiRequest, FilePart};
use crate::types::{
    BatchResult, BatchUploadPreview, CopyTemplatesRequest, DataTemplate, DataTemplateCreate,
    DataTemplateQuery, DataTemplateUpdate, DimensionItem, DimensionItemQuery, HospitalSummary,
    ListResponse, MoveResponse, UploadFile,
};

pub async fn list(client: &ApiClient, query: &DataTemplateQuery) -> ApiResult<ListResponse<DataTemplate>> {
    client.send_json(ApiRequest::get("/data-templates").params(query)?).await
}

pub async fn get(client: &ApiClient, id: i64) -> ApiResult<DataTemplate> {
    client.send_json(ApiRequest::get(format!("/data-templates/{}", id))).await
}

pub async fn create(client: &ApiClient, data: &DataTemplateCreate) -> ApiResult<DataTemplate> {
    client.send_json(ApiRequest::post("/data-templates").json(data)?).await
}

pub async fn update(client: &ApiClient, id: i64, data: &DataTemplateUpdate) -> ApiResult<DataTemplate> {
    client
        .send_json(ApiRequest::put(format!("/data-templates/{}", id)).json(data)?)
        .await
}

pub async fn delete(client: &ApiClient, id: i64) -> ApiResult<()> {
    client.send_unit(ApiRequest::delete(format!("/data-templates/{}", id))).await
}

/// Swap sort order with the previous sibling. See `services::tree` for the
/// boundary-aware variant.
pub async fn move_up(client: &ApiClient, id: i64) -> ApiResult<MoveResponse> {
    client
        .send_json(ApiRequest::post(format!("/data-templates/{}/move-up", id)))
        .await
}

pub async fn move_down(client: &ApiClient, id: i64) -> ApiResult<MoveResponse> {
    client
        .send_json(ApiRequest::post(format!("/data-templates/{}/move-down", id)))
        .await
}

pub async fn toggle_core(client: &ApiClient, id: i64) -> ApiResult<DataTemplate> {
    client
        .send_json(ApiRequest::put(format!("/data-templates/{}/toggle-core", id)))
        .await
}

fn batch_request(path: &str, definition_files: &[UploadFile], sql_files: &[UploadFile]) -> ApiRequest {
    let parts = definition_files
        .iter()
        .map(|f| ("definition_files", f))
        .chain(sql_files.iter().map(|f| ("sql_files", f)));

    parts.fold(ApiRequest::post(path), |req, (field, file)| {
        req.file(FilePart {
            field: field.to_string(),
            file_name: file.file_name.clone(),
            bytes: file.bytes.clone(),
            mime: None,
        })
    })
}

/// Dry run: how uploaded files pair up with existing templates.
pub async fn preview_batch_upload(
    client: &ApiClient,
    definition_files: &[UploadFile],
    sql_files: &[UploadFile],
) -> ApiResult<BatchUploadPreview> {
    client
        .send_json(batch_request("/data-templates/batch-upload/preview", definition_files, sql_files))
        .await
}

pub async fn batch_upload(
    client: &ApiClient,
    definition_files: &[UploadFile],
    sql_files: &[UploadFile],
) -> ApiResult<BatchResult> {
    client
        .send_json(batch_request("/data-templates/batch-upload", definition_files, sql_files))
        .await
}

/// Hospitals whose templates can be copied from.
pub async fn copy_sources(client: &ApiClient) -> ApiResult<Vec<HospitalSummary>> {
    client.send_json(ApiRequest::get("/data-templates/hospitals/list")).await
}

pub async fn hospital_templates(client: &ApiClient, hospital_id: i64) -> ApiResult<Vec<DataTemplate>> {
    client
        .send_json(ApiRequest::get(format!("/data-templates/hospitals/{}/templates", hospital_id)))
        .await
}

pub async fn copy(client: &ApiClient, request: &CopyTemplatesRequest) -> ApiResult<BatchResult> {
    client.send_json(ApiRequest::post("/data-templates/copy").json(request)?).await
}

// ============================================================================
// Dimension items
// ============================================================================

/// Charge items mapped onto one model dimension.
pub async fn list_dimension_items(
    client: &ApiClient,
    query: &DimensionItemQuery,
) -> ApiResult<ListResponse<DimensionItem>> {
    client.send_json(ApiRequest::get("/dimension-items").params(query)?).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Method, MockReply, MockTransport, RequestBody};
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
        (ApiClient::new(mock.clone(), Arc::new(ctx)), mock)
    }

    #[tokio::test]
    async fn test_batch_upload_uses_two_file_fields() {
        let (client, mock) = setup();
        mock.on(
            Method::Post,
            "/data-templates/batch-upload/preview",
            MockReply::ok(json!({"items": [], "total": 0, "matched": 0, "partial": 0, "unmatched": 0})),
        );

        let defs = vec![UploadFile::new("TB_MZ.docx", vec![1])];
        let sqls = vec![UploadFile::new("TB_MZ.sql", vec![2]), UploadFile::new("TB_ZY.sql", vec![3])];
        preview_batch_upload(&client, &defs, &sqls).await.unwrap();

        let req = mock.last_request().unwrap();
        let RequestBody::Multipart { files, .. } = req.body else {
            panic!("expected multipart body");
        };
        let fields: Vec<&str> = files.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["definition_files", "sql_files", "sql_files"]);
    }

    #[tokio::test]
    async fn test_dimension_items_require_dimension() {
        let (client, mock) = setup();
        mock.on(Method::Get, "/dimension-items", MockReply::ok(json!({"items": [], "total": 0})));
        list_dimension_items(&client, &DimensionItemQuery::for_dimension(42))
            .await
            .unwrap();
        assert_eq!(mock.last_request().unwrap().query_value("dimension_id"), Some("42"));
    }
}
