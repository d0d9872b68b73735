//! Departments and charge items

use crate::error::ApiResult;
use crate::http::{ApiClient, ApiRequest};
use crate::types::{
    ChargeItem, ChargeItemInput, ChargeItemQuery, Department, DepartmentInput, DepartmentQuery,
    EvaluationToggle, ListResponse, MessageResponse,
};

// ============================================================================
// Departments
// ============================================================================

pub async fn list(client: &ApiClient, query: &DepartmentQuery) -> ApiResult<ListResponse<Department>> {
    client.send_json(ApiRequest::get("/departments").params(query)?).await
}

pub async fn get(client: &ApiClient, id: i64) -> ApiResult<Department> {
    client.send_json(ApiRequest::get(format!("/departments/{}", id))).await
}

pub async fn create(client: &ApiClient, data: &DepartmentInput) -> ApiResult<Department> {
    client.send_json(ApiRequest::post("/departments").json(data)?).await
}

pub async fn update(client: &ApiClient, id: i64, data: &DepartmentInput) -> ApiResult<Department> {
    client
        .send_json(ApiRequest::put(format!("/departments/{}", id)).json(data)?)
        .await
}

pub async fn delete(client: &ApiClient, id: i64) -> ApiResult<()> {
    client.send_unit(ApiRequest::delete(format!("/departments/{}", id))).await
}

/// Flip whether the department takes part in evaluation; returns the new state.
pub async fn toggle_evaluation(client: &ApiClient, id: i64) -> ApiResult<bool> {
    let toggle: EvaluationToggle = client
        .send_json(ApiRequest::put(format!("/departments/{}/toggle-evaluation", id)))
        .await?;
    Ok(toggle.is_active)
}

// ============================================================================
// Charge items
// ============================================================================

pub async fn list_charge_items(
    client: &ApiClient,
    query: &ChargeItemQuery,
) -> ApiResult<ListResponse<ChargeItem>> {
    client.send_json(ApiRequest::get("/charge-items").params(query)?).await
}

pub async fn get_charge_item(client: &ApiClient, id: i64) -> ApiResult<ChargeItem> {
    client.send_json(ApiRequest::get(format!("/charge-items/{}", id))).await
}

pub async fn create_charge_item(client: &ApiClient, data: &ChargeItemInput) -> ApiResult<ChargeItem> {
    client.send_json(ApiRequest::post("/charge-items").json(data)?).await
}

pub async fn update_charge_item(
    client: &ApiClient,
    id: i64,
    data: &ChargeItemInput,
) -> ApiResult<ChargeItem> {
    client
        .send_json(ApiRequest::put(format!("/charge-items/{}", id)).json(data)?)
        .await
}

pub async fn delete_charge_item(client: &ApiClient, id: i64) -> ApiResult<()> {
    client.send_unit(ApiRequest::delete(format!("/charge-items/{}", id))).await
}

/// Remove every charge item of the active hospital.
pub async fn clear_charge_items(client: &ApiClient) -> ApiResult<MessageResponse> {
    client.send_json(ApiRequest::delete("/charge-items/clear-all")).await
}

pub async fn charge_categories(client: &ApiClient) -> ApiResult<Vec<String>> {
    client.send_json(ApiRequest::get("/charge-items/categories/list")).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Method, MockReply, MockTransport};
    use crate::session::{AppContext, MemoryStore, RecordingNotifier};
    use crate::types::SortDirection;
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
    async fn test_list_departments_sorted() {
        let (client, mock) = setup();
        mock.on(
            Method::Get,
            "/departments",
            MockReply::ok(json!({"items": [
                {"id": 1, "his_code": "0101", "his_name": "心内科", "is_active": true}
            ], "total": 1})),
        );

        let query = DepartmentQuery {
            sort_by: Some("his_code".to_string()),
            sort_order: Some(SortDirection::Desc),
            ..Default::default()
        };
        let page = list(&client, &query).await.unwrap();
        assert_eq!(page.items[0].his_name, "心内科");

        let req = mock.last_request().unwrap();
        assert_eq!(req.query_value("sort_order"), Some("desc"));
        assert_eq!(req.query_value("page"), None);
    }

    #[tokio::test]
    async fn test_toggle_evaluation_returns_new_state() {
        let (client, mock) = setup();
        mock.on(
            Method::Put,
            "/departments/7/toggle-evaluation",
            MockReply::ok(json!({"is_active": false})),
        );
        assert!(!toggle_evaluation(&client, 7).await.unwrap());
    }

    #[tokio::test]
    async fn test_charge_categories() {
        let (client, mock) = setup();
        mock.on(
            Method::Get,
            "/charge-items/categories/list",
            MockReply::ok(json!(["检查费", "治疗费"])),
        );
        assert_eq!(charge_categories(&client).await.unwrap(), vec!["检查费", "治疗费"]);
    }
}
