//! Hospitals and the active-hospital context

use tracing::{debug, info};

use crate::error::ApiResult;
use crate::http::{ApiClient, ApiRequest};
use crate::types::{
    Hospital, HospitalActivation, HospitalCreate, HospitalQuery, HospitalUpdate, ListResponse,
};

pub async fn list(client: &ApiClient, query: &HospitalQuery) -> ApiResult<ListResponse<Hospital>> {
    client.send_json(ApiRequest::get("/hospitals").params(query)?).await
}

pub async fn get(client: &ApiClient, id: i64) -> ApiResult<Hospital> {
    client.send_json(ApiRequest::get(format!("/hospitals/{}", id))).await
}

pub async fn create(client: &ApiClient, data: &HospitalCreate) -> ApiResult<Hospital> {
    client.send_json(ApiRequest::post("/hospitals").json(data)?).await
}

pub async fn update(client: &ApiClient, id: i64, data: &HospitalUpdate) -> ApiResult<Hospital> {
    client
        .send_json(ApiRequest::put(format!("/hospitals/{}", id)).json(data)?)
        .await
}

pub async fn delete(client: &ApiClient, id: i64) -> ApiResult<()> {
    client.send_unit(ApiRequest::delete(format!("/hospitals/{}", id))).await
}

/// Hospitals the current user may activate.
pub async fn accessible(client: &ApiClient) -> ApiResult<Vec<Hospital>> {
    client.send_json(ApiRequest::get("/hospitals/accessible")).await
}

/// Activate a hospital on the server and make it the current context.
pub async fn activate(client: &ApiClient, id: i64) -> ApiResult<Hospital> {
    let activation: HospitalActivation = client
        .send_json(ApiRequest::post(format!("/hospitals/{}/activate", id)))
        .await?;

    let ctx = client.context();
    let hospital = ctx
        .accessible_hospitals()
        .into_iter()
        .find(|h| h.id == id)
        .unwrap_or_else(|| Hospital {
            id: activation.hospital_id,
            code: String::new(),
            name: activation.hospital_name.clone(),
            is_active: true,
            created_at: None,
            updated_at: None,
        });
    ctx.set_current_hospital(hospital.clone())?;
    Ok(hospital)
}

/// Load accessible hospitals; a single one is activated silently when no
/// hospital is active yet.
pub async fn fetch_accessible(client: &ApiClient) -> ApiResult<Vec<Hospital>> {
    let hospitals = accessible(client).await?;
    let ctx = client.context();
    ctx.set_accessible_hospitals(hospitals.clone());
    debug!("{} accessible hospitals", hospitals.len());

    if let [only] = hospitals.as_slice() {
        if !ctx.is_hospital_activated() {
            info!(hospital_id = only.id, "Auto-activating the only accessible hospital");
            activate(client, only.id).await?;
        }
    }
    Ok(hospitals)
}

/// Forget the active hospital locally.
pub fn clear_current(client: &ApiClient) -> ApiResult<()> {
    client.context().clear_current_hospital()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Method, MockReply, MockTransport};
    use crate::session::{AppContext, MemoryStore, RecordingNotifier};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn client_with(store: Arc<MemoryStore>, mock: Arc<MockTransport>) -> ApiClient {
        let ctx = AppContext::restore(store, Arc::new(RecordingNotifier::new()), Duration::ZERO).unwrap();
        ApiClient::new(mock, Arc::new(ctx))
    }

    #[tokio::test]
    async fn test_single_hospital_auto_activates_and_survives_reload() {
        let store = Arc::new(MemoryStore::new());
        let mock = Arc::new(MockTransport::new());
        mock.always(
            Method::Get,
            "/hospitals/accessible",
            MockReply::ok(json!([{"id": 4, "code": "RMYY", "name": "人民医院", "is_active": true}])),
        )
        .on(
            Method::Post,
            "/hospitals/4/activate",
            MockReply::ok(json!({"hospital_id": 4, "hospital_name": "人民医院", "message": "ok"})),
        )
        .always(Method::Get, "/departments", MockReply::ok(json!({"items": [], "total": 0})));

        let client = client_with(store.clone(), mock.clone());
        client.context().store_login("tok").unwrap();
        fetch_accessible(&client).await.unwrap();
        assert_eq!(client.context().current_hospital_id(), Some(4));

        // Simulated reload: fresh context from the same storage
        let reloaded = client_with(store.clone(), mock.clone());
        assert_eq!(reloaded.context().current_hospital().unwrap().code, "RMYY");
        reloaded.send_unit(ApiRequest::get("/departments")).await.unwrap();
        let last = mock.last_request().unwrap();
        assert_eq!(last.header_value("X-Hospital-ID"), Some("4"));

        // Already active: no second activation
        fetch_accessible(&reloaded).await.unwrap();
        assert_eq!(mock.requests_to(Method::Post, "/hospitals/4/activate").len(), 1);
    }

    #[tokio::test]
    async fn test_several_hospitals_need_explicit_choice() {
        let mock = Arc::new(MockTransport::new());
        mock.on(
            Method::Get,
            "/hospitals/accessible",
            MockReply::ok(json!([
                {"id": 1, "code": "A", "name": "甲院"},
                {"id": 2, "code": "B", "name": "乙院"}
            ])),
        )
        .on(
            Method::Post,
            "/hospitals/2/activate",
            MockReply::ok(json!({"hospital_id": 2, "hospital_name": "乙院"})),
        );

        let client = client_with(Arc::new(MemoryStore::new()), mock.clone());
        fetch_accessible(&client).await.unwrap();
        assert!(!client.context().is_hospital_activated());

        let chosen = activate(&client, 2).await.unwrap();
        assert_eq!(chosen.code, "B");
        clear_current(&client).unwrap();
        assert!(!client.context().is_hospital_activated());
    }

    #[tokio::test]
    async fn test_list_forwards_filters() {
        let mock = Arc::new(MockTransport::new());
        mock.on(Method::Get, "/hospitals", MockReply::ok(json!({"items": [], "total": 0})));
        let client = client_with(Arc::new(MemoryStore::new()), mock.clone());

        let query = HospitalQuery {
            page: Some(1),
            size: Some(10),
            search: Some("人民".to_string()),
            is_active: None,
        };
        list(&client, &query).await.unwrap();
        let req = mock.last_request().unwrap();
        assert_eq!(req.query_value("search"), Some("人民"));
        assert_eq!(req.query_value("is_active"), None);
    }
}
