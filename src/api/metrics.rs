//! Metric projects, topics and metrics
//!
//! All endpoints here use the `{code, message, data}` envelope. Reorder and
//! delete go through `services::tree`, which adds the permutation check and
//! the impact step; the functions below are the raw calls.

use crate::error::ApiResult;
use crate::http::{ApiClient, ApiRequest};
use crate::types::metric::{MetricReorder, ProjectReorder, TopicReorder};
use crate::types::{
    AffectedMetrics, ListResponse, Metric, MetricInput, MetricProject, MetricProjectInput,
    MetricQuery, MetricRelation, MetricRelationCreate, MetricRelationList, MetricTopic,
    MetricTopicInput, MetricTree, ProjectDeleteResult, TopicDeleteResult,
};

// ============================================================================
// Projects
// ============================================================================

pub async fn list_projects(client: &ApiClient) -> ApiResult<ListResponse<MetricProject>> {
    client.send_enveloped(ApiRequest::get("/metric-projects")).await
}

pub async fn get_project(client: &ApiClient, id: i64) -> ApiResult<MetricProject> {
    client
        .send_enveloped(ApiRequest::get(format!("/metric-projects/{}", id)))
        .await
}

pub async fn create_project(client: &ApiClient, data: &MetricProjectInput) -> ApiResult<MetricProject> {
    client
        .send_enveloped(ApiRequest::post("/metric-projects").json(data)?)
        .await
}

pub async fn update_project(
    client: &ApiClient,
    id: i64,
    data: &MetricProjectInput,
) -> ApiResult<MetricProject> {
    client
        .send_enveloped(ApiRequest::put(format!("/metric-projects/{}", id)).json(data)?)
        .await
}

/// Cascades to the project's topics and metrics.
pub async fn delete_project(client: &ApiClient, id: i64) -> ApiResult<ProjectDeleteResult> {
    client
        .send_enveloped(ApiRequest::delete(format!("/metric-projects/{}", id)))
        .await
}

pub async fn reorder_projects(client: &ApiClient, project_ids: &[i64]) -> ApiResult<()> {
    client
        .send_enveloped_ack(
            ApiRequest::put("/metric-projects/reorder").json(&ProjectReorder { project_ids })?,
        )
        .await
}

// ============================================================================
// Topics
// ============================================================================

pub async fn list_topics(client: &ApiClient, project_id: Option<i64>) -> ApiResult<ListResponse<MetricTopic>> {
    client
        .send_enveloped(ApiRequest::get("/metric-topics").query_opt("project_id", project_id))
        .await
}

pub async fn get_topic(client: &ApiClient, id: i64) -> ApiResult<MetricTopic> {
    client
        .send_enveloped(ApiRequest::get(format!("/metric-topics/{}", id)))
        .await
}

pub async fn create_topic(client: &ApiClient, data: &MetricTopicInput) -> ApiResult<MetricTopic> {
    client
        .send_enveloped(ApiRequest::post("/metric-topics").json(data)?)
        .await
}

pub async fn update_topic(client: &ApiClient, id: i64, data: &MetricTopicInput) -> ApiResult<MetricTopic> {
    client
        .send_enveloped(ApiRequest::put(format!("/metric-topics/{}", id)).json(data)?)
        .await
}

pub async fn delete_topic(client: &ApiClient, id: i64) -> ApiResult<TopicDeleteResult> {
    client
        .send_enveloped(ApiRequest::delete(format!("/metric-topics/{}", id)))
        .await
}

pub async fn reorder_topics(client: &ApiClient, topic_ids: &[i64]) -> ApiResult<()> {
    client
        .send_enveloped_ack(ApiRequest::put("/metric-topics/reorder").json(&TopicReorder { topic_ids })?)
        .await
}

// ============================================================================
// Metrics
// ============================================================================

/// Projects, topics and metrics as one nested tree.
pub async fn tree(client: &ApiClient) -> ApiResult<MetricTree> {
    client.send_enveloped(ApiRequest::get("/metrics/tree")).await
}

pub async fn list_metrics(client: &ApiClient, query: &MetricQuery) -> ApiResult<ListResponse<Metric>> {
    client
        .send_enveloped(ApiRequest::get("/metrics").params(query)?)
        .await
}

pub async fn get_metric(client: &ApiClient, id: i64) -> ApiResult<Metric> {
    client.send_enveloped(ApiRequest::get(format!("/metrics/{}", id))).await
}

pub async fn create_metric(client: &ApiClient, data: &MetricInput) -> ApiResult<Metric> {
    client.send_enveloped(ApiRequest::post("/metrics").json(data)?).await
}

pub async fn update_metric(client: &ApiClient, id: i64, data: &MetricInput) -> ApiResult<Metric> {
    client
        .send_enveloped(ApiRequest::put(format!("/metrics/{}", id)).json(data)?)
        .await
}

/// Without `force` the server refuses when other metrics reference this one.
pub async fn delete_metric(client: &ApiClient, id: i64, force: bool) -> ApiResult<()> {
    client
        .send_enveloped_ack(ApiRequest::delete(format!("/metrics/{}", id)).query("force", force))
        .await
}

pub async fn reorder_metrics(client: &ApiClient, topic_id: i64, metric_ids: &[i64]) -> ApiResult<()> {
    client
        .send_enveloped_ack(
            ApiRequest::put("/metrics/reorder").json(&MetricReorder { topic_id, metric_ids })?,
        )
        .await
}

/// Metrics that reference `id` and would lose a relation on delete.
pub async fn affected_metrics(client: &ApiClient, id: i64) -> ApiResult<AffectedMetrics> {
    client
        .send_enveloped(ApiRequest::get(format!("/metrics/{}/affected", id)))
        .await
}

// ============================================================================
// Relations
// ============================================================================

pub async fn relations(client: &ApiClient, metric_id: i64) -> ApiResult<MetricRelationList> {
    client
        .send_enveloped(ApiRequest::get(format!("/metrics/{}/relations", metric_id)))
        .await
}

pub async fn add_relation(
    client: &ApiClient,
    metric_id: i64,
    data: &MetricRelationCreate,
) -> ApiResult<MetricRelation> {
    client
        .send_enveloped(ApiRequest::post(format!("/metrics/{}/relations", metric_id)).json(data)?)
        .await
}

pub async fn remove_relation(client: &ApiClient, metric_id: i64, related_id: i64) -> ApiResult<()> {
    client
        .send_enveloped_ack(ApiRequest::delete(format!(
            "/metrics/{}/relations/{}",
            metric_id, related_id
        )))
        .await
}
