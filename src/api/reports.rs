//! Analysis reports, dimension analyses and cost benchmarks
//!
//! These endpoints answer with plain JSON, no envelope.

use crate::error::{ApiError, ApiResult};
use crate::http::{ApiClient, ApiRequest, Download};
use crate::types::{
    AnalysisReport, AnalysisReportCreate, AnalysisReportQuery, AnalysisReportUpdate,
    BusinessContent, CostBenchmark, CostBenchmarkCreate, CostBenchmarkFilter, CostBenchmarkQuery,
    CostBenchmarkUpdate, DimensionAnalysis, DimensionAnalysisBatch, DimensionAnalysisBatchQuery,
    DimensionAnalysisFilter, DimensionAnalysisQuery, DimensionAnalysisSave, DimensionDrillDown,
    ListResponse, MessageResponse, ReportPreviewQuery, ValueDistribution, round_benchmark,
};

fn reject(client: &ApiClient, message: String) -> ApiError {
    let err = ApiError::Validation(message);
    client.context().report(&err);
    err
}

// ============================================================================
// Analysis reports
// ============================================================================

pub async fn list(client: &ApiClient, query: &AnalysisReportQuery) -> ApiResult<ListResponse<AnalysisReport>> {
    client
        .send_json(ApiRequest::get("/analysis-reports").params(query)?)
        .await
}

pub async fn get(client: &ApiClient, id: i64) -> ApiResult<AnalysisReport> {
    client
        .send_json(ApiRequest::get(format!("/analysis-reports/{}", id)))
        .await
}

pub async fn create(client: &ApiClient, data: &AnalysisReportCreate) -> ApiResult<AnalysisReport> {
    client.send_json(ApiRequest::post("/analysis-reports").json(data)?).await
}

pub async fn update(client: &ApiClient, id: i64, data: &AnalysisReportUpdate) -> ApiResult<AnalysisReport> {
    client
        .send_json(ApiRequest::put(format!("/analysis-reports/{}", id)).json(data)?)
        .await
}

pub async fn delete(client: &ApiClient, id: i64) -> ApiResult<MessageResponse> {
    client
        .send_json(ApiRequest::delete(format!("/analysis-reports/{}", id)))
        .await
}

/// Dimensions ranked by value for the report's department and period.
pub async fn value_distribution(client: &ApiClient, id: i64) -> ApiResult<ValueDistribution> {
    client
        .send_json(ApiRequest::get(format!("/analysis-reports/{}/value-distribution", id)))
        .await
}

/// Top charge items under each of the report's leading dimensions.
pub async fn business_content(client: &ApiClient, id: i64) -> ApiResult<BusinessContent> {
    client
        .send_json(ApiRequest::get(format!("/analysis-reports/{}/business-content", id)))
        .await
}

pub async fn report_drilldown(client: &ApiClient, id: i64, node_id: i64) -> ApiResult<DimensionDrillDown> {
    client
        .send_json(ApiRequest::get(format!(
            "/analysis-reports/{}/dimension-drilldown/{}",
            id, node_id
        )))
        .await
}

/// Drill into a calculation result. Department 0 is the whole hospital.
pub async fn task_drilldown(
    client: &ApiClient,
    task_id: &str,
    department_id: i64,
    node_id: i64,
) -> ApiResult<DimensionDrillDown> {
    let request = ApiRequest::get("/analysis-reports/dimension-drilldown")
        .query("task_id", task_id)
        .query("department_id", department_id)
        .query("node_id", node_id);
    client.send_json(request).await
}

// Previews serve a report that has not been saved yet.

pub async fn preview_value_distribution(
    client: &ApiClient,
    query: &ReportPreviewQuery,
) -> ApiResult<ValueDistribution> {
    client
        .send_json(ApiRequest::get("/analysis-reports/preview/value-distribution").params(query)?)
        .await
}

pub async fn preview_business_content(
    client: &ApiClient,
    query: &ReportPreviewQuery,
) -> ApiResult<BusinessContent> {
    client
        .send_json(ApiRequest::get("/analysis-reports/preview/business-content").params(query)?)
        .await
}

pub async fn preview_drilldown(
    client: &ApiClient,
    query: &ReportPreviewQuery,
    node_id: i64,
) -> ApiResult<DimensionDrillDown> {
    let request = ApiRequest::get("/analysis-reports/preview/dimension-drilldown")
        .params(query)?
        .query("node_id", node_id);
    client.send_json(request).await
}

// ============================================================================
// Dimension analyses
// ============================================================================

/// The written analysis for one department/dimension, if any.
///
/// Most dimensions have none, so a 404 is `Ok(None)` and nobody is notified.
pub async fn dimension_analysis(
    client: &ApiClient,
    query: &DimensionAnalysisQuery,
) -> ApiResult<Option<DimensionAnalysis>> {
    let request = ApiRequest::get("/dimension-analyses")
        .params(query)?
        .silent_not_found();
    match client.send_json(request).await {
        Ok(analysis) => Ok(Some(analysis)),
        Err(ApiError::NotFound(_)) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Current and long-term analyses for many nodes at once.
pub async fn dimension_analyses_for(
    client: &ApiClient,
    query: &DimensionAnalysisBatchQuery,
) -> ApiResult<DimensionAnalysisBatch> {
    if query.node_ids.is_empty() {
        return Ok(DimensionAnalysisBatch::default());
    }
    client
        .send_json(ApiRequest::post("/dimension-analyses/batch-query").json(query)?)
        .await
}

/// Create the analysis or replace the one already stored for the same
/// department, node and period.
pub async fn save_dimension_analysis(
    client: &ApiClient,
    data: &DimensionAnalysisSave,
) -> ApiResult<DimensionAnalysis> {
    if data.content.trim().is_empty() {
        return Err(reject(client, "analysis content cannot be empty".to_string()));
    }
    client
        .send_json(ApiRequest::post("/dimension-analyses").json(data)?)
        .await
}

pub async fn update_dimension_analysis(
    client: &ApiClient,
    id: i64,
    content: &str,
) -> ApiResult<DimensionAnalysis> {
    if content.trim().is_empty() {
        return Err(reject(client, "analysis content cannot be empty".to_string()));
    }
    let request = ApiRequest::put(format!("/dimension-analyses/{}", id))
        .json(&serde_json::json!({ "content": content }))?;
    client.send_json(request).await
}

pub async fn delete_dimension_analysis(client: &ApiClient, id: i64) -> ApiResult<MessageResponse> {
    client
        .send_json(ApiRequest::delete(format!("/dimension-analyses/{}", id)))
        .await
}

pub async fn list_dimension_analyses(
    client: &ApiClient,
    filter: &DimensionAnalysisFilter,
) -> ApiResult<Vec<DimensionAnalysis>> {
    client
        .send_json(ApiRequest::get("/dimension-analyses/list").params(filter)?)
        .await
}

// ============================================================================
// Cost benchmarks
// ============================================================================

pub async fn cost_benchmarks(
    client: &ApiClient,
    query: &CostBenchmarkQuery,
) -> ApiResult<ListResponse<CostBenchmark>> {
    client
        .send_json(ApiRequest::get("/cost-benchmarks").params(query)?)
        .await
}

pub async fn cost_benchmark(client: &ApiClient, id: i64) -> ApiResult<CostBenchmark> {
    client
        .send_json(ApiRequest::get(format!("/cost-benchmarks/{}", id)))
        .await
}

pub async fn create_cost_benchmark(
    client: &ApiClient,
    data: &CostBenchmarkCreate,
) -> ApiResult<CostBenchmark> {
    let Some(value) = round_benchmark(data.benchmark_value) else {
        return Err(reject(
            client,
            format!("benchmark value must be positive, got {}", data.benchmark_value),
        ));
    };
    let body = CostBenchmarkCreate {
        benchmark_value: value,
        ..data.clone()
    };
    client
        .send_json(ApiRequest::post("/cost-benchmarks").json(&body)?)
        .await
}

pub async fn update_cost_benchmark(
    client: &ApiClient,
    id: i64,
    data: &CostBenchmarkUpdate,
) -> ApiResult<CostBenchmark> {
    let mut body = data.clone();
    if let Some(raw) = data.benchmark_value {
        let value = round_benchmark(raw).ok_or_else(|| {
            reject(client, format!("benchmark value must be positive, got {}", raw))
        })?;
        body.benchmark_value = Some(value);
    }
    client
        .send_json(ApiRequest::put(format!("/cost-benchmarks/{}", id)).json(&body)?)
        .await
}

pub async fn delete_cost_benchmark(client: &ApiClient, id: i64) -> ApiResult<MessageResponse> {
    client
        .send_json(ApiRequest::delete(format!("/cost-benchmarks/{}", id)))
        .await
}

// ============================================================================
// Exports
// ============================================================================

/// Cost benchmarks as an Excel workbook.
pub async fn export_cost_benchmarks(client: &ApiClient, filter: &CostBenchmarkFilter) -> ApiResult<Download> {
    client
        .download(ApiRequest::get("/cost-benchmarks/export").params(filter)?)
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

    fn setup() -> (ApiClient, Arc<MockTransport>, Arc<RecordingNotifier>) {
        let mock = Arc::new(MockTransport::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let ctx = AppContext::new(Arc::new(MemoryStore::new()), notifier.clone(), Duration::ZERO);
        (ApiClient::new(mock.clone(), Arc::new(ctx)), mock, notifier)
    }

    #[tokio::test]
    async fn test_missing_dimension_analysis_is_none() {
        let (client, mock, notifier) = setup();
        mock.on(
            Method::Get,
            "/dimension-analyses",
            MockReply::json(404, json!({"detail": "未找到分析"})),
        );

        let query = DimensionAnalysisQuery {
            department_id: 3,
            node_id: 40,
            period: Some("2025-01".to_string()),
        };
        assert_eq!(dimension_analysis(&client, &query).await.unwrap(), None);
        assert!(notifier.notices().is_empty());
        assert_eq!(mock.last_request().unwrap().query_value("node_id"), Some("40"));
    }

    #[tokio::test]
    async fn test_value_distribution_decimals() {
        let (client, mock, _) = setup();
        mock.on(
            Method::Get,
            "/analysis-reports/2/value-distribution",
            MockReply::ok(json!({
                "items": [{"rank": 1, "node_id": 7, "dimension_name": "门诊诊察", "value": "1200.50", "workload": 30}],
                "total_value": "1200.50"
            })),
        );
        let dist = value_distribution(&client, 2).await.unwrap();
        assert_eq!(dist.items[0].value, 1200.5);
        assert_eq!(dist.total_value, 1200.5);
    }

    #[tokio::test]
    async fn test_batch_analyses_keyed_by_node() {
        let (client, mock, _) = setup();
        mock.on(
            Method::Post,
            "/dimension-analyses/batch-query",
            MockReply::ok(json!({
                "current_analyses": {
                    "40": {"id": 1, "department_id": 3, "node_id": 40, "period": "2025-01", "content": "本月上升"}
                },
                "long_term_analyses": {
                    "41": {"id": 2, "department_id": 3, "node_id": 41, "period": null, "content": "长期稳定"}
                }
            })),
        );

        let query = DimensionAnalysisBatchQuery {
            department_id: 3,
            node_ids: vec![40, 41],
            period: Some("2025-01".to_string()),
        };
        let batch = dimension_analyses_for(&client, &query).await.unwrap();
        assert_eq!(batch.current(40).map(|a| a.content.as_str()), Some("本月上升"));
        assert_eq!(batch.current(41), None);
        assert_eq!(batch.long_term(41).and_then(|a| a.period.clone()), None);
        assert!(batch.long_term(41).is_some());

        let empty = DimensionAnalysisBatchQuery {
            department_id: 3,
            node_ids: Vec::new(),
            period: None,
        };
        assert_eq!(
            dimension_analyses_for(&client, &empty).await.unwrap(),
            DimensionAnalysisBatch::default()
        );
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test]
    async fn test_long_term_analysis_saved_with_null_period() {
        let (client, mock, notifier) = setup();
        mock.on(
            Method::Post,
            "/dimension-analyses",
            MockReply::ok(json!({"id": 5, "department_id": 3, "node_id": 41, "period": null, "content": "长期稳定"})),
        );

        let data = DimensionAnalysisSave {
            department_id: 3,
            node_id: 41,
            period: None,
            content: "长期稳定".to_string(),
        };
        let saved = save_dimension_analysis(&client, &data).await.unwrap();
        assert_eq!(saved.id, 5);
        assert_eq!(mock.last_request().unwrap().json_body().unwrap()["period"], json!(null));

        let err = update_dimension_analysis(&client, 5, " ").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(notifier.notices().len(), 1);
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test]
    async fn test_preview_drilldown_query() {
        let (client, mock, _) = setup();
        mock.on(
            Method::Get,
            "/analysis-reports/preview/dimension-drilldown",
            MockReply::ok(json!({
                "dimension_name": "门诊诊察",
                "items": [{
                    "period": "2025-01", "department_code": "0101", "department_name": "心内科",
                    "item_code": "110200001", "item_name": "普通门诊诊查费", "unit_price": "10.00",
                    "amount": "3000.00", "quantity": "300"
                }],
                "total_amount": "3000.00",
                "total_quantity": 300
            })),
        );

        let query = ReportPreviewQuery {
            department_id: 3,
            period: "2025-01".to_string(),
            task_id: None,
        };
        let drill = preview_drilldown(&client, &query, 40).await.unwrap();
        assert_eq!(drill.items[0].amount, drill.total_amount);
        let request = mock.last_request().unwrap();
        assert_eq!(request.query_value("node_id"), Some("40"));
        assert_eq!(request.query_value("period"), Some("2025-01"));
        assert_eq!(request.query_value("task_id"), None);
    }

    #[tokio::test]
    async fn test_business_content_groups_by_dimension() {
        let (client, mock, _) = setup();
        mock.on(
            Method::Get,
            "/analysis-reports/2/business-content",
            MockReply::ok(json!({"dimensions": [{
                "dimension_name": "医生序列-门诊-诊察",
                "items": [{"item_code": "A", "item_name": "诊查费", "amount": 100, "quantity": "10"}]
            }]})),
        );
        let content = business_content(&client, 2).await.unwrap();
        assert_eq!(content.dimensions[0].items[0].quantity, 10.0);
        assert_eq!(content.message, None);
    }

    #[tokio::test]
    async fn test_cost_benchmark_rounded_and_checked() {
        let (client, mock, notifier) = setup();
        mock.on(
            Method::Post,
            "/cost-benchmarks",
            MockReply::ok(json!({
                "id": 9, "department_code": "0101", "department_name": "心内科", "version_id": 1,
                "version_name": "2025版", "dimension_code": "D01", "dimension_name": "门诊诊察",
                "benchmark_value": "12.35"
            })),
        );

        let mut data = CostBenchmarkCreate {
            department_code: "0101".to_string(),
            department_name: "心内科".to_string(),
            version_id: 1,
            version_name: "2025版".to_string(),
            dimension_code: "D01".to_string(),
            dimension_name: "门诊诊察".to_string(),
            benchmark_value: 12.349,
        };
        let created = create_cost_benchmark(&client, &data).await.unwrap();
        assert_eq!(created.benchmark_value, 12.35);
        assert_eq!(mock.last_request().unwrap().json_body().unwrap()["benchmark_value"], json!(12.35));

        data.benchmark_value = 0.001;
        assert!(create_cost_benchmark(&client, &data).await.is_err());
        let update = CostBenchmarkUpdate {
            benchmark_value: Some(-1.0),
            ..Default::default()
        };
        assert!(update_cost_benchmark(&client, 9, &update).await.is_err());
        assert_eq!(mock.request_count(), 1);
        assert_eq!(notifier.notices().len(), 2);
    }

    #[tokio::test]
    async fn test_cost_benchmark_list_flattens_filter() {
        let (client, mock, _) = setup();
        mock.on(
            Method::Get,
            "/cost-benchmarks",
            MockReply::ok(json!({"total": 0, "items": []})),
        )
        .on(
            Method::Delete,
            "/cost-benchmarks/9",
            MockReply::ok(json!({"message": "成本基准删除成功"})),
        );

        let query = CostBenchmarkQuery {
            page: Some(2),
            size: None,
            filter: CostBenchmarkFilter {
                version_id: Some(1),
                keyword: Some("心内".to_string()),
                ..Default::default()
            },
        };
        cost_benchmarks(&client, &query).await.unwrap();
        let request = mock.last_request().unwrap();
        assert_eq!(request.query_value("page"), Some("2"));
        assert_eq!(request.query_value("version_id"), Some("1"));
        assert_eq!(request.query_value("keyword"), Some("心内"));

        let ack = delete_cost_benchmark(&client, 9).await.unwrap();
        assert_eq!(ack.message, "成本基准删除成功");
    }
}
