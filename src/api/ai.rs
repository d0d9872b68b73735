//! AI config, interfaces and prompt modules
//!
//! All three answer with a `{code, message, data}` envelope.

use serde::Deserialize;
use serde_json::json;

use crate::error::{ApiError, ApiResult};
use crate::http::{ApiClient, ApiRequest};
use crate::types::{
    AiConfig, AiConfigSave, AiConfigTestResult, AiInterface, AiInterfaceCreate,
    AiInterfaceTestResult, AiInterfaceTrial, AiInterfaceUpdate, AiPromptModule,
    AiPromptModuleUpdate, ApiUsageStats, Envelope, ListResponse,
};

#[derive(Debug, Deserialize)]
struct Items<T> {
    items: Vec<T>,
}

fn reject(client: &ApiClient, message: String) -> ApiError {
    let err = ApiError::Validation(message);
    client.context().report(&err);
    err
}

// ============================================================================
// Classification config
// ============================================================================

/// The hospital's config, `None` before one is saved.
pub async fn config(client: &ApiClient) -> ApiResult<Option<AiConfig>> {
    let envelope: Envelope<AiConfig> = client.send_json(ApiRequest::get("/ai-config")).await?;
    envelope
        .ensure_ok()
        .inspect_err(|err| client.context().report(err))?;
    Ok(envelope.data)
}

pub async fn save_config(client: &ApiClient, data: &AiConfigSave) -> ApiResult<AiConfig> {
    if !(0.1..=10.0).contains(&data.call_delay) {
        return Err(reject(client, format!("call delay {}s outside 0.1-10s", data.call_delay)));
    }
    if !(1..=1000).contains(&data.batch_size) {
        return Err(reject(client, format!("batch size {} outside 1-1000", data.batch_size)));
    }
    client
        .send_enveloped(ApiRequest::post("/ai-config").json(data)?)
        .await
}

/// Classify one sample item with the saved config.
pub async fn test_config(client: &ApiClient, test_item_name: &str) -> ApiResult<AiConfigTestResult> {
    client
        .send_enveloped(
            ApiRequest::post("/ai-config/test").json(&json!({ "test_item_name": test_item_name }))?,
        )
        .await
}

pub async fn usage_stats(client: &ApiClient, days: u32) -> ApiResult<ApiUsageStats> {
    client
        .send_enveloped(ApiRequest::get("/ai-config/usage-stats").query("days", days))
        .await
}

// ============================================================================
// Interfaces
// ============================================================================

pub async fn list_interfaces(client: &ApiClient) -> ApiResult<ListResponse<AiInterface>> {
    client.send_enveloped(ApiRequest::get("/ai-interfaces")).await
}

pub async fn get_interface(client: &ApiClient, id: i64) -> ApiResult<AiInterface> {
    client
        .send_enveloped(ApiRequest::get(format!("/ai-interfaces/{}", id)))
        .await
}

pub async fn create_interface(client: &ApiClient, data: &AiInterfaceCreate) -> ApiResult<AiInterface> {
    client
        .send_enveloped(ApiRequest::post("/ai-interfaces").json(data)?)
        .await
}

pub async fn update_interface(
    client: &ApiClient,
    id: i64,
    data: &AiInterfaceUpdate,
) -> ApiResult<AiInterface> {
    client
        .send_enveloped(ApiRequest::put(format!("/ai-interfaces/{}", id)).json(data)?)
        .await
}

/// Refused by the server while a prompt module still uses the interface.
pub async fn delete_interface(client: &ApiClient, id: i64) -> ApiResult<()> {
    client
        .send_enveloped_ack(ApiRequest::delete(format!("/ai-interfaces/{}", id)))
        .await
}

pub async fn test_interface(
    client: &ApiClient,
    id: i64,
    test_message: &str,
) -> ApiResult<AiInterfaceTestResult> {
    let request = ApiRequest::post(format!("/ai-interfaces/{}/test", id))
        .json(&json!({ "test_message": test_message }))?;
    client.send_enveloped(request).await
}

pub async fn test_interface_settings(
    client: &ApiClient,
    trial: &AiInterfaceTrial,
) -> ApiResult<AiInterfaceTestResult> {
    if trial.api_key.is_none() && trial.interface_id.is_none() {
        return Err(reject(
            client,
            "an API key or a saved interface is needed to test".to_string(),
        ));
    }
    client
        .send_enveloped(ApiRequest::post("/ai-interfaces/test-config").json(trial)?)
        .await
}

// ============================================================================
// Prompt modules
// ============================================================================

pub async fn list_prompt_modules(client: &ApiClient) -> ApiResult<Vec<AiPromptModule>> {
    let page: Items<AiPromptModule> = client
        .send_enveloped(ApiRequest::get("/ai-prompt-modules"))
        .await?;
    Ok(page.items)
}

pub async fn prompt_module(client: &ApiClient, module_code: &str) -> ApiResult<AiPromptModule> {
    let path = format!("/ai-prompt-modules/{}", urlencoding::encode(module_code));
    client.send_enveloped(ApiRequest::get(path)).await
}

pub async fn update_prompt_module(
    client: &ApiClient,
    module_code: &str,
    data: &AiPromptModuleUpdate,
) -> ApiResult<AiPromptModule> {
    if let Some(t) = data.temperature.filter(|t| !(0.0..=2.0).contains(t)) {
        return Err(reject(client, format!("temperature {} outside 0-2", t)));
    }
    if data.user_prompt.as_deref().is_some_and(|p| p.trim().is_empty()) {
        return Err(reject(client, "user prompt cannot be empty".to_string()));
    }
    let path = format!("/ai-prompt-modules/{}", urlencoding::encode(module_code));
    client.send_enveloped(ApiRequest::put(path).json(data)?).await
}
