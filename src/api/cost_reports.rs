//! Cost reports and reference values

use crate::error::ApiResult;
use crate::http::{ApiClient, ApiRequest};
use crate::types::{
    CostReport, CostReportCreate, CostReportQuery, CostReportUpdate, ListResponse, MessageResponse,
    ReferenceValue, ReferenceValueCreate, ReferenceValueQuery, ReferenceValueUpdate,
};

// ============================================================================
// Cost reports
// ============================================================================

pub async fn list(client: &ApiClient, query: &CostReportQuery) -> ApiResult<ListResponse<CostReport>> {
    client.send_json(ApiRequest::get("/cost-reports").params(query)?).await
}

pub async fn get(client: &ApiClient, id: i64) -> ApiResult<CostReport> {
    client.send_json(ApiRequest::get(format!("/cost-reports/{}", id))).await
}

pub async fn create(client: &ApiClient, data: &CostReportCreate) -> ApiResult<CostReport> {
    client.send_json(ApiRequest::post("/cost-reports").json(data)?).await
}

pub async fn update(client: &ApiClient, id: i64, data: &CostReportUpdate) -> ApiResult<CostReport> {
    client
        .send_json(ApiRequest::put(format!("/cost-reports/{}", id)).json(data)?)
        .await
}

pub async fn delete(client: &ApiClient, id: i64) -> ApiResult<()> {
    client.send_unit(ApiRequest::delete(format!("/cost-reports/{}", id))).await
}

/// Delete every report matching `period` / `department_code`.
pub async fn clear_filtered(client: &ApiClient, query: &CostReportQuery) -> ApiResult<MessageResponse> {
    let filter = CostReportQuery {
        period: query.period.clone(),
        department_code: query.department_code.clone(),
        ..Default::default()
    };
    client
        .send_json(ApiRequest::delete("/cost-reports/clear-filtered/batch").params(&filter)?)
        .await
}

/// Periods (`YYYY-MM`) that have cost reports.
pub async fn periods(client: &ApiClient) -> ApiResult<Vec<String>> {
    client.send_json(ApiRequest::get("/cost-reports/periods")).await
}

// ============================================================================
// Reference values
// ============================================================================

pub async fn list_reference_values(
    client: &ApiClient,
    query: &ReferenceValueQuery,
) -> ApiResult<ListResponse<ReferenceValue>> {
    client.send_json(ApiRequest::get("/reference-values").params(query)?).await
}

/// All reference values of one period, for report comparison.
pub async fn reference_values_by_period(client: &ApiClient, period: &str) -> ApiResult<Vec<ReferenceValue>> {
    client
        .send_json(ApiRequest::get(format!("/reference-values/by-period/{}", period)))
        .await
}

pub async fn reference_value_periods(client: &ApiClient) -> ApiResult<Vec<String>> {
    client.send_json(ApiRequest::get("/reference-values/periods")).await
}

pub async fn get_reference_value(client: &ApiClient, id: i64) -> ApiResult<ReferenceValue> {
    client.send_json(ApiRequest::get(format!("/reference-values/{}", id))).await
}

pub async fn create_reference_value(
    client: &ApiClient,
    data: &ReferenceValueCreate,
) -> ApiResult<ReferenceValue> {
    client.send_json(ApiRequest::post("/reference-values").json(data)?).await
}

pub async fn update_reference_value(
    client: &ApiClient,
    id: i64,
    data: &ReferenceValueUpdate,
) -> ApiResult<ReferenceValue> {
    client
        .send_json(ApiRequest::put(format!("/reference-values/{}", id)).json(data)?)
        .await
}

pub async fn delete_reference_value(client: &ApiClient, id: i64) -> ApiResult<()> {
    client.send_unit(ApiRequest::delete(format!("/reference-values/{}", id))).await
}

pub async fn clear_reference_period(client: &ApiClient, period: &str) -> ApiResult<MessageResponse> {
    client
        .send_json(ApiRequest::delete(format!("/reference-values/period/{}/clear-all", period)))
        .await
}

pub async fn clear_reference_values(client: &ApiClient) -> ApiResult<MessageResponse> {
    client.send_json(ApiRequest::delete("/reference-values/clear-all")).await
}
