//! AI classification tasks and the plans they produce
//!
//! Task endpoints answer with a `{code, message, data}` envelope, plan
//! endpoints with plain JSON.

use serde_json::json;

use crate::error::ApiResult;
use crate::http::{ApiClient, ApiRequest, CLASSIFICATION_CREATE_TIMEOUT};
use crate::types::classification::{TaskItems, TaskLogs};
use crate::types::{
    ClassificationPlan, ClassificationTask, ClassificationTaskCreate, ClassificationTaskUpdate,
    ListResponse, MessageResponse, PlanItem, PlanItemQuery, PlanItemUpdate, PlanQuery, PlanUpdate,
    SubmitPreview, SubmitResult, TaskLog, TaskProgress,
};

// ============================================================================
// Tasks
// ============================================================================

pub async fn list_tasks(client: &ApiClient) -> ApiResult<Vec<ClassificationTask>> {
    let page: TaskItems = client
        .send_enveloped(ApiRequest::get("/classification-tasks"))
        .await?;
    Ok(page.items)
}

/// Creation warms up the AI interface server-side, hence the longer timeout.
pub async fn create_task(
    client: &ApiClient,
    data: &ClassificationTaskCreate,
) -> ApiResult<ClassificationTask> {
    client
        .send_enveloped(
            ApiRequest::post("/classification-tasks")
                .json(data)?
                .timeout(CLASSIFICATION_CREATE_TIMEOUT),
        )
        .await
}

pub async fn get_task(client: &ApiClient, id: i64) -> ApiResult<ClassificationTask> {
    client
        .send_enveloped(ApiRequest::get(format!("/classification-tasks/{}", id)))
        .await
}

pub async fn rename_task(client: &ApiClient, id: i64, task_name: &str) -> ApiResult<ClassificationTask> {
    let body = ClassificationTaskUpdate {
        task_name: task_name.to_string(),
    };
    client
        .send_enveloped(ApiRequest::put(format!("/classification-tasks/{}", id)).json(&body)?)
        .await
}

pub async fn delete_task(client: &ApiClient, id: i64) -> ApiResult<()> {
    client
        .send_enveloped_ack(ApiRequest::delete(format!("/classification-tasks/{}", id)))
        .await
}

/// Resume a paused or failed task.
pub async fn continue_task(client: &ApiClient, id: i64) -> ApiResult<ClassificationTask> {
    client
        .send_enveloped(ApiRequest::post(format!("/classification-tasks/{}/continue", id)))
        .await
}

pub async fn task_progress(client: &ApiClient, id: i64) -> ApiResult<TaskProgress> {
    client
        .send_enveloped(ApiRequest::get(format!("/classification-tasks/{}/progress", id)))
        .await
}

pub async fn task_logs(client: &ApiClient, id: i64) -> ApiResult<Vec<TaskLog>> {
    let logs: TaskLogs = client
        .send_enveloped(ApiRequest::get(format!("/classification-tasks/{}/logs", id)))
        .await?;
    Ok(logs.logs)
}

/// Charge categories a task can be restricted to.
pub async fn charge_categories(client: &ApiClient) -> ApiResult<Vec<String>> {
    client
        .send_enveloped(ApiRequest::get("/classification-tasks/charge-categories"))
        .await
}

// ============================================================================
// Plans
// ============================================================================

pub async fn list_plans(client: &ApiClient, query: &PlanQuery) -> ApiResult<ListResponse<ClassificationPlan>> {
    client
        .send_json(ApiRequest::get("/classification-plans").params(query)?)
        .await
}

pub async fn get_plan(client: &ApiClient, id: i64) -> ApiResult<ClassificationPlan> {
    client
        .send_json(ApiRequest::get(format!("/classification-plans/{}", id)))
        .await
}

pub async fn update_plan(client: &ApiClient, id: i64, data: &PlanUpdate) -> ApiResult<ClassificationPlan> {
    client
        .send_json(ApiRequest::put(format!("/classification-plans/{}", id)).json(data)?)
        .await
}

pub async fn delete_plan(client: &ApiClient, id: i64) -> ApiResult<MessageResponse> {
    client
        .send_json(ApiRequest::delete(format!("/classification-plans/{}", id)))
        .await
}

pub async fn plan_items(
    client: &ApiClient,
    plan_id: i64,
    query: &PlanItemQuery,
) -> ApiResult<ListResponse<PlanItem>> {
    client
        .send_json(ApiRequest::get(format!("/classification-plans/{}/items", plan_id)).params(query)?)
        .await
}

/// Override the AI suggestion for one item.
pub async fn set_item_dimension(
    client: &ApiClient,
    plan_id: i64,
    item_id: i64,
    dimension_id: Option<i64>,
) -> ApiResult<PlanItem> {
    client
        .send_json(
            ApiRequest::put(format!("/classification-plans/{}/items/{}", plan_id, item_id))
                .json(&PlanItemUpdate { dimension_id })?,
        )
        .await
}

/// What submitting would add and overwrite.
pub async fn preview_submit(client: &ApiClient, plan_id: i64) -> ApiResult<SubmitPreview> {
    client
        .send_json(ApiRequest::post(format!("/classification-plans/{}/preview", plan_id)))
        .await
}

pub async fn submit_plan(client: &ApiClient, plan_id: i64) -> ApiResult<SubmitResult> {
    client
        .send_json(
            ApiRequest::post(format!("/classification-plans/{}/submit", plan_id))
                .json(&json!({"confirm": true}))?,
        )
        .await
}
