//! Calculation workflows, their steps and calculation tasks

use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::http::{ApiClient, ApiRequest};
use crate::types::{
    CalculationStep, CalculationTask, CalculationTaskCreate, CalculationTaskQuery,
    CalculationWorkflow, CodeTestAdhoc, ListResponse, MessageResponse, MoveResponse, StepCreate,
    StepTestResult, StepUpdate, WorkflowCopy, WorkflowCopyResult, WorkflowCreate, WorkflowQuery,
    WorkflowUpdate,
};

// ============================================================================
// Workflows
// ============================================================================

pub async fn list_workflows(
    client: &ApiClient,
    query: &WorkflowQuery,
) -> ApiResult<ListResponse<CalculationWorkflow>> {
    client
        .send_json(ApiRequest::get("/calculation-workflows").params(query)?)
        .await
}

pub async fn get_workflow(client: &ApiClient, id: i64) -> ApiResult<CalculationWorkflow> {
    client
        .send_json(ApiRequest::get(format!("/calculation-workflows/{}", id)))
        .await
}

pub async fn create_workflow(client: &ApiClient, data: &WorkflowCreate) -> ApiResult<CalculationWorkflow> {
    client
        .send_json(ApiRequest::post("/calculation-workflows").json(data)?)
        .await
}

pub async fn update_workflow(
    client: &ApiClient,
    id: i64,
    data: &WorkflowUpdate,
) -> ApiResult<CalculationWorkflow> {
    client
        .send_json(ApiRequest::put(format!("/calculation-workflows/{}", id)).json(data)?)
        .await
}

pub async fn delete_workflow(client: &ApiClient, id: i64) -> ApiResult<()> {
    client
        .send_unit(ApiRequest::delete(format!("/calculation-workflows/{}", id)))
        .await
}

/// Duplicate a workflow together with all of its steps.
pub async fn copy_workflow(client: &ApiClient, id: i64, data: &WorkflowCopy) -> ApiResult<WorkflowCopyResult> {
    client
        .send_json(ApiRequest::post(format!("/calculation-workflows/{}/copy", id)).json(data)?)
        .await
}

// ============================================================================
// Steps
// ============================================================================

pub async fn list_steps(client: &ApiClient, workflow_id: i64) -> ApiResult<ListResponse<CalculationStep>> {
    client
        .send_json(ApiRequest::get("/calculation-steps").query("workflow_id", workflow_id))
        .await
}

pub async fn get_step(client: &ApiClient, id: i64) -> ApiResult<CalculationStep> {
    client
        .send_json(ApiRequest::get(format!("/calculation-steps/{}", id)))
        .await
}

pub async fn create_step(client: &ApiClient, data: &StepCreate) -> ApiResult<CalculationStep> {
    client.send_json(ApiRequest::post("/calculation-steps").json(data)?).await
}

pub async fn update_step(client: &ApiClient, id: i64, data: &StepUpdate) -> ApiResult<CalculationStep> {
    client
        .send_json(ApiRequest::put(format!("/calculation-steps/{}", id)).json(data)?)
        .await
}

pub async fn delete_step(client: &ApiClient, id: i64) -> ApiResult<()> {
    client
        .send_unit(ApiRequest::delete(format!("/calculation-steps/{}", id)))
        .await
}

pub async fn move_step_up(client: &ApiClient, id: i64) -> ApiResult<MoveResponse> {
    client
        .send_json(ApiRequest::post(format!("/calculation-steps/{}/move-up", id)))
        .await
}

pub async fn move_step_down(client: &ApiClient, id: i64) -> ApiResult<MoveResponse> {
    client
        .send_json(ApiRequest::post(format!("/calculation-steps/{}/move-down", id)))
        .await
}

/// Run a saved step's code against the server's data source.
pub async fn test_step(client: &ApiClient, id: i64, test_params: Option<Value>) -> ApiResult<StepTestResult> {
    client
        .send_json(
            ApiRequest::post(format!("/calculation-steps/{}/test", id))
                .json(&json!({"test_params": test_params}))?,
        )
        .await
}

/// Run unsaved code.
pub async fn test_code(client: &ApiClient, request: &CodeTestAdhoc) -> ApiResult<StepTestResult> {
    client
        .send_json(ApiRequest::post("/calculation-steps/test-code").json(request)?)
        .await
}

// ============================================================================
// Tasks
// ============================================================================

pub async fn create_task(client: &ApiClient, data: &CalculationTaskCreate) -> ApiResult<CalculationTask> {
    client
        .send_json(
            ApiRequest::post("/calculation/tasks")
                .json(data)?
                .timeout(client.long_timeout()),
        )
        .await
}

pub async fn list_tasks(
    client: &ApiClient,
    query: &CalculationTaskQuery,
) -> ApiResult<ListResponse<CalculationTask>> {
    client
        .send_json(ApiRequest::get("/calculation/tasks").params(query)?)
        .await
}

/// Tasks are addressed by their string `task_id`, not the numeric row id.
pub async fn get_task(client: &ApiClient, task_id: &str) -> ApiResult<CalculationTask> {
    client
        .send_json(ApiRequest::get(format!("/calculation/tasks/{}", task_id)))
        .await
}

/// Only pending or running tasks can be cancelled.
pub async fn cancel_task(client: &ApiClient, task_id: &str) -> ApiResult<MessageResponse> {
    client
        .send_json(ApiRequest::post(format!("/calculation/tasks/{}/cancel", task_id)))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::http::{Method, MockReply, MockTransport};
    use crate::session::{AppContext, MemoryStore, RecordingNotifier};
    use crate::types::CodeType;
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
    async fn test_create_task_uses_long_timeout() {
        let (client, mock) = setup();
        mock.on(
            Method::Post,
            "/calculation/tasks",
            MockReply::ok(json!({
                "id": 1, "task_id": "a1b2", "model_version_id": 2,
                "period": "2025-01", "status": "pending", "progress": "0"
            })),
        );

        let task = create_task(
            &client,
            &CalculationTaskCreate {
                model_version_id: 2,
                workflow_id: Some(5),
                department_ids: None,
                period: "2025-01".to_string(),
                description: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(task.task_id, "a1b2");
        let req = mock.last_request().unwrap();
        assert_eq!(req.timeout, Some(client.long_timeout()));
        assert!(req.json_body().unwrap().get("department_ids").is_none());
    }

    #[tokio::test]
    async fn test_cancel_finished_task_is_validation_error() {
        let (client, mock) = setup();
        mock.on(
            Method::Post,
            "/calculation/tasks/a1b2/cancel",
            MockReply::json(400, json!({"detail": "只能取消排队中或运行中的任务"})),
        );
        assert_eq!(
            cancel_task(&client, "a1b2").await.unwrap_err(),
            ApiError::Validation("只能取消排队中或运行中的任务".to_string())
        );
    }

    #[tokio::test]
    async fn test_adhoc_code_test() {
        let (client, mock) = setup();
        mock.on(
            Method::Post,
            "/calculation-steps/test-code",
            MockReply::ok(json!({"success": false, "duration_ms": 12, "error": "syntax error"})),
        );

        let result = test_code(
            &client,
            &CodeTestAdhoc {
                code_type: CodeType::Sql,
                code_content: "SELEC 1".to_string(),
                data_source_id: Some(1),
                test_params: None,
            },
        )
        .await
        .unwrap();

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("syntax error"));
    }
}
