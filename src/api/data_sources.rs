//! Data source registry
//!
//! Every endpoint answers with a `{code, message, data}` envelope.

use crate::error::{ApiError, ApiResult};
use crate::http::{ApiClient, ApiRequest};
use crate::types::data_source::EnabledFlag;
use crate::types::{
    ConnectionTestResult, DataSource, DataSourceCreate, DataSourceQuery, DataSourceUpdate,
    ListResponse, PoolStatus,
};

pub async fn list(client: &ApiClient, query: &DataSourceQuery) -> ApiResult<ListResponse<DataSource>> {
    client
        .send_enveloped(ApiRequest::get("/data-sources").params(query)?)
        .await
}

/// Pool bounds are checked locally before anything is sent.
pub async fn create(client: &ApiClient, data: &DataSourceCreate) -> ApiResult<DataSource> {
    if !data.pool_is_valid() {
        let err = ApiError::Validation(format!(
            "invalid connection pool: min {} max {} timeout {}s",
            data.pool_size_min, data.pool_size_max, data.pool_timeout
        ));
        client.context().report(&err);
        return Err(err);
    }
    client
        .send_enveloped(ApiRequest::post("/data-sources").json(data)?)
        .await
}

pub async fn get(client: &ApiClient, id: i64) -> ApiResult<DataSource> {
    client
        .send_enveloped(ApiRequest::get(format!("/data-sources/{}", id)))
        .await
}

pub async fn update(client: &ApiClient, id: i64, data: &DataSourceUpdate) -> ApiResult<DataSource> {
    client
        .send_enveloped(ApiRequest::put(format!("/data-sources/{}", id)).json(data)?)
        .await
}

pub async fn delete(client: &ApiClient, id: i64) -> ApiResult<()> {
    client
        .send_enveloped_ack(ApiRequest::delete(format!("/data-sources/{}", id)))
        .await
}

/// Connect with the stored credentials. A failed connection is `Ok` with `success: false`.
pub async fn test_connection(client: &ApiClient, id: i64) -> ApiResult<ConnectionTestResult> {
    client
        .send_enveloped(ApiRequest::post(format!("/data-sources/{}/test", id)))
        .await
}

/// Connect with unsaved settings.
pub async fn test_config(client: &ApiClient, data: &DataSourceCreate) -> ApiResult<ConnectionTestResult> {
    client
        .send_enveloped(ApiRequest::post("/data-sources/test-connection").json(data)?)
        .await
}

/// Flip the enabled flag; returns the new state.
pub async fn toggle(client: &ApiClient, id: i64) -> ApiResult<bool> {
    let flag: EnabledFlag = client
        .send_enveloped(ApiRequest::put(format!("/data-sources/{}/toggle", id)))
        .await?;
    Ok(flag.is_enabled)
}

pub async fn set_default(client: &ApiClient, id: i64) -> ApiResult<()> {
    client
        .send_enveloped_ack(ApiRequest::put(format!("/data-sources/{}/set-default", id)))
        .await
}

pub async fn pool_status(client: &ApiClient, id: i64) -> ApiResult<PoolStatus> {
    client
        .send_enveloped(ApiRequest::get(format!("/data-sources/{}/pool-status", id)))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Method, MockReply, MockTransport};
    use crate::session::{AppContext, MemoryStore, RecordingNotifier};
    use crate::types::{ConnectionStatus, DbType};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn setup() -> (ApiClient, Arc<MockTransport>, Arc<RecordingNotifier>) {
        let mock = Arc::new(MockTransport::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let ctx = AppContext::new(Arc::new(MemoryStore::new()), notifier.clone(), Duration::ZERO);
        (ApiClient::new(mock.clone(), Arc::new(ctx)), mock, notifier)
    }

    fn new_source(min: u32, max: u32) -> DataSourceCreate {
        DataSourceCreate {
            name: "HIS".to_string(),
            db_type: DbType::Sqlserver,
            host: "10.0.0.5".to_string(),
            port: 1433,
            database_name: "his".to_string(),
            username: "reader".to_string(),
            password: "secret".to_string(),
            schema_name: None,
            connection_params: None,
            is_default: false,
            is_enabled: true,
            description: None,
            pool_size_min: min,
            pool_size_max: max,
            pool_timeout: 30,
        }
    }

    #[tokio::test]
    async fn test_list_unwraps_envelope_and_sends_filters() {
        let (client, mock, _) = setup();
        mock.on(
            Method::Get,
            "/data-sources",
            MockReply::ok(json!({"code": 200, "message": "success", "data": {
                "total": 1,
                "items": [{
                    "id": 4, "name": "HIS", "db_type": "sqlserver", "host": "10.0.0.5", "port": 1433,
                    "database_name": "his", "username": "reader", "is_default": true,
                    "is_enabled": true, "connection_status": "online"
                }]
            }})),
        );

        let query = DataSourceQuery {
            db_type: Some(DbType::Sqlserver),
            is_enabled: Some(true),
            ..Default::default()
        };
        let page = list(&client, &query).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].connection_status, Some(ConnectionStatus::Online));

        let request = mock.last_request().unwrap();
        assert_eq!(request.query_value("db_type"), Some("sqlserver"));
        assert_eq!(request.query_value("is_enabled"), Some("true"));
    }

    #[tokio::test]
    async fn test_inverted_pool_rejected_before_sending() {
        let (client, mock, notifier) = setup();
        let err = create(&client, &new_source(10, 2)).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(mock.request_count(), 0);
        assert_eq!(notifier.notices().len(), 1);
    }

    #[tokio::test]
    async fn test_toggle_returns_new_state() {
        let (client, mock, _) = setup();
        mock.on(
            Method::Put,
            "/data-sources/4/toggle",
            MockReply::ok(json!({"code": 200, "message": "状态切换成功", "data": {"is_enabled": false}})),
        )
        .on(
            Method::Get,
            "/data-sources/4/pool-status",
            MockReply::ok(json!({"code": 200, "data": {
                "pool_size": 10, "active_connections": 2, "idle_connections": 8, "waiting_requests": 0,
                "total_connections_created": 12, "total_connections_closed": 2
            }})),
        );

        assert!(!toggle(&client, 4).await.unwrap());
        let status = pool_status(&client, 4).await.unwrap();
        assert_eq!(status.active_connections + status.idle_connections, status.pool_size);
    }
}
