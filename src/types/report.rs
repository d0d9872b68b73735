//! Analysis reports, dimension analyses, cost benchmarks and export requests

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::common::lenient_f64;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalysisReport {
    pub id: i64,
    #[serde(default)]
    pub hospital_id: Option<i64>,
    pub department_id: i64,
    #[serde(default)]
    pub department_code: String,
    #[serde(default)]
    pub department_name: String,
    pub period: String,
    #[serde(default)]
    pub current_issues: Option<String>,
    #[serde(default)]
    pub future_plans: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReportCreate {
    pub department_id: i64,
    pub period: String,
    pub current_issues: Option<String>,
    pub future_plans: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisReportUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_issues: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub future_plans: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisReportQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ValueDistributionItem {
    pub rank: u32,
    pub node_id: i64,
    pub dimension_name: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub value: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub workload: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ValueDistribution {
    pub items: Vec<ValueDistributionItem>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_value: f64,
    #[serde(default)]
    pub message: Option<String>,
}

// ============================================================================
// Business content and drill-down
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BusinessContentItem {
    pub item_code: String,
    pub item_name: String,
    #[serde(default)]
    pub item_category: Option<String>,
    #[serde(default)]
    pub unit_price: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub amount: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub quantity: f64,
}

/// Top charge items of one of the report's leading dimensions
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DimensionBusinessContent {
    /// Full path of the dimension
    pub dimension_name: String,
    pub items: Vec<BusinessContentItem>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BusinessContent {
    pub dimensions: Vec<DimensionBusinessContent>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DrillDownItem {
    pub period: String,
    pub department_code: String,
    pub department_name: String,
    pub item_code: String,
    pub item_name: String,
    #[serde(default)]
    pub item_category: Option<String>,
    #[serde(default)]
    pub unit_price: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub amount: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub quantity: f64,
}

/// Charge items behind one leaf dimension
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DimensionDrillDown {
    pub dimension_name: String,
    pub items: Vec<DrillDownItem>,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_amount: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_quantity: f64,
    #[serde(default)]
    pub message: Option<String>,
}

/// Department and period of a report not yet saved. Without a task the
/// latest completed calculation is used.
#[derive(Debug, Clone, Serialize)]
pub struct ReportPreviewQuery {
    pub department_id: i64,
    pub period: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

// ============================================================================
// Dimension analyses
// ============================================================================

/// Written analysis of one dimension. Without a period it is the
/// department's long-term analysis.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DimensionAnalysis {
    pub id: i64,
    pub department_id: i64,
    pub node_id: i64,
    #[serde(default)]
    pub period: Option<String>,
    pub content: String,
    #[serde(default)]
    pub department_name: Option<String>,
    #[serde(default)]
    pub node_name: Option<String>,
    #[serde(default)]
    pub updated_by_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DimensionAnalysisSave {
    pub department_id: i64,
    pub node_id: i64,
    pub period: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DimensionAnalysisBatchQuery {
    pub department_id: i64,
    pub node_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
}

/// Analyses keyed by node id
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DimensionAnalysisBatch {
    #[serde(default)]
    pub current_analyses: HashMap<String, DimensionAnalysis>,
    #[serde(default)]
    pub long_term_analyses: HashMap<String, DimensionAnalysis>,
}

impl DimensionAnalysisBatch {
    pub fn current(&self, node_id: i64) -> Option<&DimensionAnalysis> {
        self.current_analyses.get(&node_id.to_string())
    }

    pub fn long_term(&self, node_id: i64) -> Option<&DimensionAnalysis> {
        self.long_term_analyses.get(&node_id.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    Current,
    LongTerm,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DimensionAnalysisFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_type: Option<AnalysisKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DimensionAnalysisQuery {
    pub department_id: i64,
    pub node_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
}

// ============================================================================
// Cost benchmarks
// ============================================================================

/// Reference cost of one dimension for a department under a model version
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CostBenchmark {
    pub id: i64,
    pub department_code: String,
    pub department_name: String,
    pub version_id: i64,
    pub version_name: String,
    pub dimension_code: String,
    pub dimension_name: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub benchmark_value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CostBenchmarkCreate {
    pub department_code: String,
    pub department_name: String,
    pub version_id: i64,
    pub version_name: String,
    pub dimension_code: String,
    pub dimension_name: String,
    pub benchmark_value: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CostBenchmarkUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmark_value: Option<f64>,
}

/// Rounded to cents; the server rejects values that are not positive.
pub fn round_benchmark(value: f64) -> Option<f64> {
    let rounded = (value * 100.0).round() / 100.0;
    (rounded.is_finite() && rounded > 0.0).then_some(rounded)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CostBenchmarkQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(flatten)]
    pub filter: CostBenchmarkFilter,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CostBenchmarkFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Markdown,
    Pdf,
    Excel,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Excel => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }
}
