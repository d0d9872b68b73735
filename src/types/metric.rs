//! Metric projects, topics, metrics and their relations

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Atomic,
    Composite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    Component,
    Derived,
    Related,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricProject {
    pub id: i64,
    #[serde(default)]
    pub hospital_id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub topic_count: u64,
    #[serde(default)]
    pub metric_count: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricProjectInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ProjectDeleteResult {
    #[serde(default)]
    pub deleted_topics: u64,
    #[serde(default)]
    pub deleted_metrics: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricTopic {
    pub id: i64,
    pub project_id: i64,
    #[serde(default)]
    pub project_name: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub metric_count: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricTopicInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TopicDeleteResult {
    #[serde(default)]
    pub deleted_metrics: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub id: i64,
    pub topic_id: i64,
    #[serde(default)]
    pub topic_name: Option<String>,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub project_name: Option<String>,
    pub name_cn: String,
    #[serde(default)]
    pub name_en: Option<String>,
    pub metric_type: MetricType,
    #[serde(default)]
    pub metric_level: Option<String>,
    #[serde(default)]
    pub business_caliber: Option<String>,
    #[serde(default)]
    pub technical_caliber: Option<String>,
    #[serde(default)]
    pub source_tables: Option<Vec<String>>,
    #[serde(default)]
    pub dimension_tables: Option<Vec<String>>,
    #[serde(default)]
    pub dimensions: Option<Vec<String>>,
    #[serde(default)]
    pub data_source_id: Option<i64>,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub related_metric_count: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_cn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_en: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_type: Option<MetricType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_caliber: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical_caliber: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_tables: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension_tables: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_type: Option<MetricType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeNodeType {
    Project,
    Topic,
    Metric,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetricTreeNode {
    pub id: i64,
    pub name: String,
    pub node_type: TreeNodeType,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub metric_type: Option<MetricType>,
    #[serde(default)]
    pub children: Option<Vec<MetricTreeNode>>,
}

impl MetricTreeNode {
    pub fn children(&self) -> &[MetricTreeNode] {
        self.children.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetricTree {
    pub items: Vec<MetricTreeNode>,
    #[serde(default)]
    pub total_projects: u64,
    #[serde(default)]
    pub total_topics: u64,
    #[serde(default)]
    pub total_metrics: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetricRelation {
    pub id: i64,
    pub source_metric_id: i64,
    #[serde(default)]
    pub source_metric_name: Option<String>,
    pub target_metric_id: i64,
    #[serde(default)]
    pub target_metric_name: Option<String>,
    pub relation_type: RelationType,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricRelationCreate {
    pub target_metric_id: i64,
    pub relation_type: RelationType,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricRelationList {
    pub items: Vec<MetricRelation>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub as_source_count: u64,
    #[serde(default)]
    pub as_target_count: u64,
}

/// Metric that depends on the one being deleted
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AffectedMetric {
    pub id: i64,
    pub name_cn: String,
    #[serde(default)]
    pub topic_name: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
    pub relation_type: RelationType,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AffectedMetrics {
    pub items: Vec<AffectedMetric>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "default_true")]
    pub can_delete: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ProjectReorder<'a> {
    pub project_ids: &'a [i64],
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TopicReorder<'a> {
    pub topic_ids: &'a [i64],
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct MetricReorder<'a> {
    pub topic_id: i64,
    pub metric_ids: &'a [i64],
}
