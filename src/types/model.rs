//! Cost model versions and their node tree

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    pub id: i64,
    pub version: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelVersionCreate {
    pub version: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Copy the node tree of this version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_version_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ModelVersionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelNodeType {
    Sequence,
    Dimension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalcType {
    Statistical,
    Calculational,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelNode {
    pub id: i64,
    pub version_id: i64,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub sort_order: i64,
    pub name: String,
    pub code: String,
    pub node_type: ModelNodeType,
    #[serde(default)]
    pub is_leaf: bool,
    #[serde(default)]
    pub calc_type: Option<CalcType>,
    #[serde(default, deserialize_with = "super::common::lenient_opt_f64")]
    pub weight: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub business_guide: Option<String>,
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub children: Option<Vec<ModelNode>>,
}

impl ModelNode {
    pub fn children(&self) -> &[ModelNode] {
        self.children.as_deref().unwrap_or_default()
    }

    /// Number of nodes below this one, at any depth.
    pub fn descendant_count(&self) -> u64 {
        self.children()
            .iter()
            .map(|c| 1 + c.descendant_count())
            .sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelNodeCreate {
    pub version_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
    pub name: String,
    pub code: String,
    pub node_type: ModelNodeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_leaf: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calc_type: Option<CalcType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_guide: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ModelNodeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_type: Option<ModelNodeType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_leaf: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calc_type: Option<CalcType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_guide: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CodeTestRequest {
    pub script: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_params: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodeTestResult {
    pub success: bool,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub execution_time: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descendant_count_is_recursive() {
        let node: ModelNode = serde_json::from_value(json!({
            "id": 1, "version_id": 1, "name": "医生", "code": "doc", "node_type": "sequence",
            "children": [
                {"id": 2, "version_id": 1, "parent_id": 1, "name": "门诊", "code": "op", "node_type": "dimension",
                 "children": [
                    {"id": 4, "version_id": 1, "parent_id": 2, "name": "诊察", "code": "op-1", "node_type": "dimension", "weight": "0.35"}
                 ]},
                {"id": 3, "version_id": 1, "parent_id": 1, "name": "住院", "code": "ip", "node_type": "dimension"}
            ]
        }))
        .unwrap();

        assert_eq!(node.descendant_count(), 3);
        assert_eq!(node.children()[0].children()[0].weight, Some(0.35));
    }
}
