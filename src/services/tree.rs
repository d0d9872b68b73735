//! Hierarchical tree mutations
//!
//! Metric projects -> topics -> metrics and model version node trees.
//! Reorders are checked against a fresh sibling snapshot before anything is
//! sent; deletes are split into an impact step and an apply step so the
//! caller can show what will be lost before committing.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::api;
use crate::error::{ApiError, ApiResult};
use crate::http::ApiClient;
use crate::types::{AffectedMetric, DataTemplate, DataTemplateQuery, MetricTree, MetricTreeNode, ModelNode};

/// Largest page the data-template listing accepts
const TEMPLATE_PAGE_SIZE: u32 = 1000;

// ============================================================================
// Tree fetch
// ============================================================================

/// Projects, topics and metrics in display order.
pub async fn metric_tree(client: &ApiClient) -> ApiResult<MetricTree> {
    let mut tree = api::metrics::tree(client).await?;
    sort_metric_nodes(&mut tree.items);
    Ok(tree)
}

fn sort_metric_nodes(nodes: &mut [MetricTreeNode]) {
    nodes.sort_by_key(|n| (n.sort_order, n.id));
    for node in nodes.iter_mut() {
        if let Some(children) = node.children.as_mut() {
            sort_metric_nodes(children);
        }
    }
}

/// Root nodes of a model version with their subtrees.
pub async fn model_tree(client: &ApiClient, version_id: i64) -> ApiResult<Vec<ModelNode>> {
    let mut roots = api::model::list_nodes(client, version_id, None).await?.items;
    sort_model_nodes(&mut roots);
    Ok(roots)
}

fn sort_model_nodes(nodes: &mut [ModelNode]) {
    nodes.sort_by_key(|n| (n.sort_order, n.id));
    for node in nodes.iter_mut() {
        if let Some(children) = node.children.as_mut() {
            sort_model_nodes(children);
        }
    }
}

// ============================================================================
// Reorder
// ============================================================================

/// One sibling group of the metric tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderScope {
    /// Projects of the active hospital
    Projects,
    Topics { project_id: i64 },
    Metrics { topic_id: i64 },
}

impl ReorderScope {
    /// Current ids of this sibling group, in display order.
    pub fn siblings(&self, tree: &MetricTree) -> ApiResult<Vec<i64>> {
        let ids = |nodes: &[MetricTreeNode]| nodes.iter().map(|n| n.id).collect::<Vec<_>>();
        match *self {
            ReorderScope::Projects => Ok(ids(&tree.items)),
            ReorderScope::Topics { project_id } => tree
                .items
                .iter()
                .find(|p| p.id == project_id)
                .map(|p| ids(p.children()))
                .ok_or_else(|| ApiError::NotFound(format!("metric project {}", project_id))),
            ReorderScope::Metrics { topic_id } => tree
                .items
                .iter()
                .flat_map(|p| p.children())
                .find(|t| t.id == topic_id)
                .map(|t| ids(t.children()))
                .ok_or_else(|| ApiError::NotFound(format!("metric topic {}", topic_id))),
        }
    }
}

/// `true` when `ordered` holds exactly the ids of `current`, each once.
pub fn is_permutation(current: &[i64], ordered: &[i64]) -> bool {
    if current.len() != ordered.len() {
        return false;
    }
    let expected: HashSet<i64> = current.iter().copied().collect();
    let mut seen = HashSet::with_capacity(ordered.len());
    ordered.iter().all(|id| expected.contains(id) && seen.insert(*id))
}

/// Replace the order of one sibling group. Partial lists are rejected.
pub async fn reorder(client: &ApiClient, scope: ReorderScope, ordered: &[i64]) -> ApiResult<()> {
    let tree = api::metrics::tree(client).await?;
    let current = scope.siblings(&tree).inspect_err(|err| client.context().report(err))?;

    if !is_permutation(&current, ordered) {
        let err = ApiError::Validation(format!(
            "new order must list each of the {} siblings exactly once",
            current.len()
        ));
        client.context().report(&err);
        return Err(err);
    }

    match scope {
        ReorderScope::Projects => api::metrics::reorder_projects(client, ordered).await?,
        ReorderScope::Topics { .. } => api::metrics::reorder_topics(client, ordered).await?,
        ReorderScope::Metrics { topic_id } => {
            api::metrics::reorder_metrics(client, topic_id, ordered).await?
        }
    }
    info!(scope = ?scope, count = ordered.len(), "Reordered siblings");
    Ok(())
}

// ============================================================================
// Two-phase delete
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteTarget {
    Project(i64),
    Topic(i64),
    Metric(i64),
    ModelNode(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Impact {
    /// Children removed together with a project or topic
    Cascade { topics: u64, metrics: u64 },
    /// Metrics holding a relation to the target
    Dependents {
        affected: Vec<AffectedMetric>,
        can_delete: bool,
    },
    /// Nodes below a model node
    Subtree { descendants: u64 },
}

/// What a delete would take with it
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactReport {
    pub target: DeleteTarget,
    pub impact: Impact,
}

impl ImpactReport {
    /// Whether anything besides the target itself is affected.
    pub fn requires_ack(&self) -> bool {
        match &self.impact {
            Impact::Cascade { topics, metrics } => topics + metrics > 0,
            Impact::Dependents { affected, .. } => !affected.is_empty(),
            Impact::Subtree { descendants } => *descendants > 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    Deleted {
        target: DeleteTarget,
        topics: u64,
        metrics: u64,
        nodes: u64,
    },
    /// Nothing was sent; the impact has to be acknowledged first
    NeedsAck(ImpactReport),
}

pub async fn compute_impact(client: &ApiClient, target: DeleteTarget) -> ApiResult<ImpactReport> {
    let impact = match target {
        DeleteTarget::Project(id) => {
            let project = api::metrics::get_project(client, id).await?;
            Impact::Cascade {
                topics: project.topic_count,
                metrics: project.metric_count,
            }
        }
        DeleteTarget::Topic(id) => {
            let topic = api::metrics::get_topic(client, id).await?;
            Impact::Cascade {
                topics: 0,
                metrics: topic.metric_count,
            }
        }
        DeleteTarget::Metric(id) => {
            let affected = api::metrics::affected_metrics(client, id).await?;
            Impact::Dependents {
                affected: affected.items,
                can_delete: affected.can_delete,
            }
        }
        DeleteTarget::ModelNode(id) => {
            let node = api::model::get_node(client, id).await?;
            Impact::Subtree {
                descendants: node.descendant_count(),
            }
        }
    };
    debug!(delete_target = ?target, impact = ?impact, "Computed delete impact");
    Ok(ImpactReport { target, impact })
}

/// Delete the target of `report`. Without `acknowledged`, a report that
/// affects anything else returns `NeedsAck` and sends nothing.
pub async fn apply_delete(
    client: &ApiClient,
    report: &ImpactReport,
    acknowledged: bool,
) -> ApiResult<DeleteOutcome> {
    if report.requires_ack() && !acknowledged {
        return Ok(DeleteOutcome::NeedsAck(report.clone()));
    }

    let target = report.target;
    let (topics, metrics, nodes) = match (target, &report.impact) {
        (DeleteTarget::Project(id), _) => {
            let result = api::metrics::delete_project(client, id).await?;
            (result.deleted_topics, result.deleted_metrics, 0)
        }
        (DeleteTarget::Topic(id), _) => {
            let result = api::metrics::delete_topic(client, id).await?;
            (0, result.deleted_metrics, 0)
        }
        (DeleteTarget::Metric(id), _) => {
            api::metrics::delete_metric(client, id, report.requires_ack()).await?;
            (0, 1, 0)
        }
        (DeleteTarget::ModelNode(id), impact) => {
            api::model::delete_node(client, id).await?;
            let descendants = match impact {
                Impact::Subtree { descendants } => *descendants,
                _ => 0,
            };
            (0, 0, descendants + 1)
        }
    };

    info!(delete_target = ?target, topics, metrics, nodes, "Deleted");
    Ok(DeleteOutcome::Deleted {
        target,
        topics,
        metrics,
        nodes,
    })
}

/// Impact and apply in one call.
pub async fn delete_node(client: &ApiClient, target: DeleteTarget, force: bool) -> ApiResult<DeleteOutcome> {
    let report = compute_impact(client, target).await?;
    apply_delete(client, &report, force).await
}

// ============================================================================
// Move up / down
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    /// Already first (up) or last (down); nothing was sent
    AtBoundary,
}

/// Swap a data template with its neighbour in sort order.
pub async fn move_template(client: &ApiClient, id: i64, direction: MoveDirection) -> ApiResult<MoveOutcome> {
    let query = DataTemplateQuery {
        page: Some(1),
        size: Some(TEMPLATE_PAGE_SIZE),
        sort_by: Some("sort_order".to_string()),
        sort_order: Some("asc".to_string()),
        ..Default::default()
    };
    let templates = api::data_templates::list(client, &query).await?.items;
    let Some(template) = templates.iter().find(|t| t.id == id) else {
        let err = ApiError::NotFound(format!("data template {}", id));
        client.context().report(&err);
        return Err(err);
    };

    if !has_neighbour(&templates, template, direction) {
        debug!(id, ?direction, "Template already at boundary");
        return Ok(MoveOutcome::AtBoundary);
    }

    let response = match direction {
        MoveDirection::Up => api::data_templates::move_up(client, id).await?,
        MoveDirection::Down => api::data_templates::move_down(client, id).await?,
    };
    if !response.success {
        let err = ApiError::Validation(response.message);
        client.context().report(&err);
        return Err(err);
    }
    Ok(MoveOutcome::Moved)
}

fn has_neighbour(templates: &[DataTemplate], template: &DataTemplate, direction: MoveDirection) -> bool {
    templates.iter().any(|t| match direction {
        MoveDirection::Up => t.sort_order < template.sort_order,
        MoveDirection::Down => t.sort_order > template.sort_order,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Method, MockReply, MockTransport};
    use crate::session::{AppContext, MemoryStore, RecordingNotifier};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;

    fn setup() -> (ApiClient, Arc<MockTransport>, Arc<RecordingNotifier>) {
        let mock = Arc::new(MockTransport::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let ctx = AppContext::new(Arc::new(MemoryStore::new()), notifier.clone(), Duration::ZERO);
        (ApiClient::new(mock.clone(), Arc::new(ctx)), mock, notifier)
    }

    fn metric(id: i64, sort_order: i64) -> Value {
        json!({"id": id, "name": format!("指标{}", id), "node_type": "metric", "sort_order": sort_order})
    }

    fn tree_reply() -> MockReply {
        MockReply::ok(json!({"code": 200, "data": {
            "items": [
                {"id": 2, "name": "质量", "node_type": "project", "sort_order": 1, "children": []},
                {"id": 1, "name": "运营", "node_type": "project", "sort_order": 0, "children": [
                    {"id": 10, "name": "效率", "node_type": "topic", "sort_order": 0,
                     "children": [metric(101, 1), metric(100, 0), metric(102, 2)]}
                ]}
            ]
        }}))
    }

    #[tokio::test]
    async fn test_metric_tree_sorted_by_sort_order() {
        let (client, mock, _) = setup();
        mock.on(Method::Get, "/metrics/tree", tree_reply());

        let tree = metric_tree(&client).await.unwrap();
        assert_eq!(tree.items[0].id, 1);
        let metrics: Vec<i64> = tree.items[0].children()[0].children().iter().map(|m| m.id).collect();
        assert_eq!(metrics, vec![100, 101, 102]);
    }

    #[test]
    fn test_permutation_check() {
        assert!(is_permutation(&[1, 2, 3], &[3, 1, 2]));
        assert!(!is_permutation(&[1, 2, 3], &[1, 2]));
        assert!(!is_permutation(&[1, 2, 3], &[1, 2, 2]));
        assert!(!is_permutation(&[1, 2, 3], &[1, 2, 4]));
        assert!(is_permutation(&[], &[]));
    }

    #[tokio::test]
    async fn test_reorder_metrics_sends_full_permutation() {
        let (client, mock, _) = setup();
        mock.always(Method::Get, "/metrics/tree", tree_reply())
            .on(Method::Put, "/metrics/reorder", MockReply::ok(json!({"code": 200})));

        reorder(&client, ReorderScope::Metrics { topic_id: 10 }, &[102, 100, 101])
            .await
            .unwrap();
        assert_eq!(
            mock.last_request().unwrap().json_body().cloned(),
            Some(json!({"topic_id": 10, "metric_ids": [102, 100, 101]}))
        );
    }

    #[tokio::test]
    async fn test_fetch_after_reorder_returns_submitted_order() {
        let (client, mock, _) = setup();
        let reordered = MockReply::ok(json!({"code": 200, "data": {
            "items": [
                {"id": 1, "name": "运营", "node_type": "project", "sort_order": 0, "children": [
                    {"id": 10, "name": "效率", "node_type": "topic", "sort_order": 0,
                     "children": [metric(100, 1), metric(101, 2), metric(102, 0)]}
                ]}
            ]
        }}));
        mock.on(Method::Get, "/metrics/tree", tree_reply())
            .on(Method::Put, "/metrics/reorder", MockReply::ok(json!({"code": 200})))
            .on(Method::Get, "/metrics/tree", reordered);

        let submitted = [102, 100, 101];
        reorder(&client, ReorderScope::Metrics { topic_id: 10 }, &submitted)
            .await
            .unwrap();

        let tree = metric_tree(&client).await.unwrap();
        let scope = ReorderScope::Metrics { topic_id: 10 };
        assert_eq!(scope.siblings(&tree).unwrap(), submitted.to_vec());
        assert_eq!(mock.requests_to(Method::Get, "/metrics/tree").len(), 2);
    }

    #[tokio::test]
    async fn test_partial_reorder_rejected_without_request() {
        let (client, mock, notifier) = setup();
        mock.always(Method::Get, "/metrics/tree", tree_reply());

        let err = reorder(&client, ReorderScope::Projects, &[1]).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(mock.requests_to(Method::Put, "/metric-projects/reorder").is_empty());
        assert_eq!(notifier.notices().len(), 1);

        let err = reorder(&client, ReorderScope::Topics { project_id: 99 }, &[10])
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_metric_with_dependents_needs_ack() {
        let (client, mock, _) = setup();
        mock.always(
            Method::Get,
            "/metrics/100/affected",
            MockReply::ok(json!({"code": 200, "data": {
                "items": [{"id": 7, "name_cn": "床位周转率", "relation_type": "component"}],
                "total": 1,
                "can_delete": true
            }})),
        )
        .on(Method::Delete, "/metrics/100", MockReply::ok(json!({"code": 200})));

        let outcome = delete_node(&client, DeleteTarget::Metric(100), false).await.unwrap();
        let DeleteOutcome::NeedsAck(report) = outcome else {
            panic!("expected NeedsAck, got {:?}", outcome);
        };
        let Impact::Dependents { affected, .. } = &report.impact else {
            panic!("expected dependents");
        };
        assert_eq!(affected[0].id, 7);
        assert!(mock.requests_to(Method::Delete, "/metrics/100").is_empty());

        let outcome = apply_delete(&client, &report, true).await.unwrap();
        assert!(matches!(outcome, DeleteOutcome::Deleted { metrics: 1, .. }));
        assert_eq!(mock.last_request().unwrap().query_value("force"), Some("true"));
    }

    #[tokio::test]
    async fn test_metric_without_dependents_deletes_unforced() {
        let (client, mock, _) = setup();
        mock.on(
            Method::Get,
            "/metrics/5/affected",
            MockReply::ok(json!({"code": 200, "data": {"items": [], "total": 0}})),
        )
        .on(Method::Delete, "/metrics/5", MockReply::ok(json!({"code": 200})));

        let outcome = delete_node(&client, DeleteTarget::Metric(5), false).await.unwrap();
        assert!(matches!(outcome, DeleteOutcome::Deleted { .. }));
        assert_eq!(mock.last_request().unwrap().query_value("force"), Some("false"));
    }

    #[tokio::test]
    async fn test_project_delete_reports_cascade() {
        let (client, mock, _) = setup();
        mock.on(
            Method::Get,
            "/metric-projects/1",
            MockReply::ok(json!({"code": 200, "data": {
                "id": 1, "name": "运营", "topic_count": 2, "metric_count": 5
            }})),
        )
        .on(
            Method::Delete,
            "/metric-projects/1",
            MockReply::ok(json!({"code": 200, "data": {"deleted_topics": 2, "deleted_metrics": 5}})),
        );

        let report = compute_impact(&client, DeleteTarget::Project(1)).await.unwrap();
        assert_eq!(report.impact, Impact::Cascade { topics: 2, metrics: 5 });
        assert!(report.requires_ack());

        let outcome = apply_delete(&client, &report, true).await.unwrap();
        assert_eq!(
            outcome,
            DeleteOutcome::Deleted {
                target: DeleteTarget::Project(1),
                topics: 2,
                metrics: 5,
                nodes: 0
            }
        );
    }

    #[tokio::test]
    async fn test_model_node_impact_counts_descendants() {
        let (client, mock, _) = setup();
        let leaf = |id: i64| json!({"id": id, "version_id": 1, "name": "叶", "code": format!("L{}", id), "node_type": "dimension"});
        mock.on(
            Method::Get,
            "/model-nodes/3",
            MockReply::ok(json!({
                "id": 3, "version_id": 1, "name": "医生", "code": "DR", "node_type": "sequence",
                "children": [
                    {"id": 4, "version_id": 1, "name": "门诊", "code": "MZ", "node_type": "dimension",
                     "children": [leaf(6), leaf(7)]},
                    leaf(5)
                ]
            })),
        )
        .on(Method::Delete, "/model-nodes/3", MockReply::status(204));

        let outcome = delete_node(&client, DeleteTarget::ModelNode(3), true).await.unwrap();
        assert!(matches!(outcome, DeleteOutcome::Deleted { nodes: 5, .. }));
    }

    fn templates_reply() -> MockReply {
        MockReply::ok(json!({
            "items": [
                {"id": 1, "table_name": "t_a", "table_name_cn": "甲", "sort_order": 1},
                {"id": 2, "table_name": "t_b", "table_name_cn": "乙", "sort_order": 2},
                {"id": 3, "table_name": "t_c", "table_name_cn": "丙", "sort_order": 3}
            ],
            "total": 3
        }))
    }

    #[tokio::test]
    async fn test_move_at_boundary_sends_nothing() {
        let (client, mock, notifier) = setup();
        mock.always(Method::Get, "/data-templates", templates_reply());

        assert_eq!(
            move_template(&client, 1, MoveDirection::Up).await.unwrap(),
            MoveOutcome::AtBoundary
        );
        assert_eq!(
            move_template(&client, 3, MoveDirection::Down).await.unwrap(),
            MoveOutcome::AtBoundary
        );
        assert_eq!(mock.request_count(), 2);
        assert!(notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_move_down_swaps_with_next() {
        let (client, mock, _) = setup();
        mock.always(Method::Get, "/data-templates", templates_reply())
            .on(Method::Post, "/data-templates/2/move-down", MockReply::ok(json!({"message": "下移成功"})));

        assert_eq!(
            move_template(&client, 2, MoveDirection::Down).await.unwrap(),
            MoveOutcome::Moved
        );
        let listed = mock.requests_to(Method::Get, "/data-templates");
        assert_eq!(listed[0].query_value("sort_by"), Some("sort_order"));
    }
}
