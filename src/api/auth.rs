//! Login and current user

use tracing::info;

use crate::error::ApiResult;
use crate::http::{ApiClient, ApiRequest};
use crate::types::{LoginRequest, TokenResponse, UserInfo};

/// Exchange credentials for a bearer token, then load and cache the user.
pub async fn login(client: &ApiClient, username: &str, password: &str) -> ApiResult<UserInfo> {
    let request = ApiRequest::post("/auth/login")
        .public()
        .json(&LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        })?;
    let token: TokenResponse = client.send_json(request).await?;
    client.context().store_login(&token.access_token)?;

    let user = me(client).await?;
    client.context().store_user(user.clone())?;
    info!(user_id = user.id, "Signed in as {}", user.username);
    Ok(user)
}

pub async fn me(client: &ApiClient) -> ApiResult<UserInfo> {
    client.send_json(ApiRequest::get("/auth/me")).await
}

/// Refresh the cached user from the server.
pub async fn refresh_user(client: &ApiClient) -> ApiResult<UserInfo> {
    let user = me(client).await?;
    client.context().store_user(user.clone())?;
    Ok(user)
}

/// Forget the local session. The backend keeps no session to revoke.
pub fn logout(client: &ApiClient) -> ApiResult<()> {
    client.context().logout()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Method, MockReply, MockTransport};
    use crate::session::{keys, AppContext, MemoryStore, RecordingNotifier, StateStore};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_login_stores_token_and_user() {
        let mock = Arc::new(MockTransport::new());
        let store = Arc::new(MemoryStore::new());
        let ctx = Arc::new(AppContext::new(
            store.clone(),
            Arc::new(RecordingNotifier::new()),
            Duration::ZERO,
        ));
        let client = ApiClient::new(mock.clone(), ctx.clone());

        mock.on(
            Method::Post,
            "/auth/login",
            MockReply::ok(json!({"access_token": "jwt-1", "token_type": "bearer"})),
        )
        .on(
            Method::Get,
            "/auth/me",
            MockReply::ok(json!({"id": 5, "username": "zhang", "role_type": "hospital_user", "menu_permissions": ["/departments"]})),
        );

        let user = login(&client, "zhang", "pw").await.unwrap();
        assert_eq!(user.id, 5);
        assert_eq!(store.get(keys::ACCESS_TOKEN).unwrap().as_deref(), Some("jwt-1"));
        assert!(ctx.has_menu_permission("/departments"));

        let me_request = mock.requests_to(Method::Get, "/auth/me").remove(0);
        assert_eq!(me_request.header_value("Authorization"), Some("Bearer jwt-1"));

        let login_body = mock.requests_to(Method::Post, "/auth/login")[0].json_body().cloned();
        assert_eq!(login_body, Some(json!({"username": "zhang", "password": "pw"})));
    }

    #[tokio::test]
    async fn test_failed_login_leaves_session_empty() {
        let mock = Arc::new(MockTransport::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let ctx = Arc::new(AppContext::new(
            Arc::new(MemoryStore::new()),
            notifier.clone(),
            Duration::ZERO,
        ));
        let client = ApiClient::new(mock.clone(), ctx.clone());
        mock.on(
            Method::Post,
            "/auth/login",
            MockReply::json(401, json!({"detail": "Incorrect username or password"})),
        );

        assert!(login(&client, "x", "y").await.is_err());
        assert!(!ctx.is_logged_in());
        // Wrong credentials are not an expired session
        assert!(!ctx.is_redirecting());
        assert_eq!(notifier.messages(), vec!["Incorrect username or password".to_string()]);
        assert_eq!(notifier.redirect_count(), 0);
    }
}
