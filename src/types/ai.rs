//! AI configuration: the per-hospital classification config, the pool of
//! model interfaces, and the prompt modules that pick one of them

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::common::lenient_opt_f64;

// ============================================================================
// Classification config
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AiConfig {
    pub id: i64,
    pub api_endpoint: String,
    pub model_name: String,
    /// Key with all but the edges masked
    #[serde(default)]
    pub api_key_masked: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    pub prompt_template: String,
    pub call_delay: f64,
    pub daily_limit: u32,
    pub batch_size: u32,
}

/// Create-or-update body; a `None` key keeps the stored one.
#[derive(Debug, Clone, Serialize)]
pub struct AiConfigSave {
    pub api_endpoint: String,
    pub model_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    pub prompt_template: String,
    pub call_delay: f64,
    pub daily_limit: u32,
    pub batch_size: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AiConfigTestResult {
    pub success: bool,
    #[serde(default)]
    pub dimension_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub response_time: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiUsageStats {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub today_calls: u64,
    pub daily_limit: u64,
    pub avg_duration: f64,
    pub estimated_cost: f64,
    pub period_days: u32,
}

// ============================================================================
// Interfaces
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AiInterface {
    pub id: i64,
    pub name: String,
    pub api_endpoint: String,
    pub model_name: String,
    #[serde(default)]
    pub api_key_masked: String,
    pub call_delay: f64,
    pub daily_limit: u32,
    pub is_active: bool,
    /// Names of the prompt modules using this interface
    #[serde(default)]
    pub referenced_modules: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AiInterfaceCreate {
    pub name: String,
    pub api_endpoint: String,
    pub model_name: String,
    pub api_key: String,
    pub call_delay: f64,
    pub daily_limit: u32,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AiInterfaceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_delay: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Settings tried before saving. Without a key, `interface_id` names the
/// interface whose stored key is used.
#[derive(Debug, Clone, Serialize)]
pub struct AiInterfaceTrial {
    pub api_endpoint: String,
    pub model_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface_id: Option<i64>,
    pub test_message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AiInterfaceTestResult {
    pub success: bool,
    #[serde(default)]
    pub response_content: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub response_time: Option<f64>,
    #[serde(default)]
    pub error_message: Option<String>,
}

// ============================================================================
// Prompt modules
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AiInterfaceSummary {
    pub id: i64,
    pub name: String,
    pub model_name: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AiPromptModule {
    pub id: i64,
    pub module_code: String,
    pub module_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ai_interface_id: Option<i64>,
    #[serde(default)]
    pub ai_interface: Option<AiInterfaceSummary>,
    pub temperature: f64,
    #[serde(default)]
    pub placeholders: Vec<Value>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    pub user_prompt: String,
    #[serde(default)]
    pub is_configured: bool,
}

/// Module changes. `ai_interface_id: Some(None)` detaches the interface.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AiPromptModuleUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_interface_id: Option<Option<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_prompt: Option<String>,
}
