//! Authenticated API client
//!
//! Attaches the bearer token, active hospital and a request id to every
//! request, and routes failures through the application context:
//! 401 goes to the deduplicated logout path, everything else becomes one
//! user notice.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{parse_content_disposition, ApiRequest, ApiResponse, Download, Transport};
use crate::error::{ApiError, ApiResult};
use crate::session::AppContext;
use crate::types::Envelope;

pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_HOSPITAL_ID: &str = "X-Hospital-ID";
pub const HEADER_REQUEST_ID: &str = "X-Request-ID";

/// Classification task creation runs an AI warm-up on the server
pub const CLASSIFICATION_CREATE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    ctx: Arc<AppContext>,
    long_timeout: Duration,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, ctx: Arc<AppContext>) -> Self {
        Self {
            transport,
            ctx,
            long_timeout: Duration::from_secs(120),
        }
    }

    pub fn with_long_timeout(mut self, timeout: Duration) -> Self {
        self.long_timeout = timeout;
        self
    }

    pub fn context(&self) -> &Arc<AppContext> {
        &self.ctx
    }

    /// Timeout for model-version and calculation-task creation
    pub fn long_timeout(&self) -> Duration {
        self.long_timeout
    }

    /// Send a request and classify non-2xx answers.
    pub async fn execute(&self, mut request: ApiRequest) -> ApiResult<ApiResponse> {
        let request_id = Uuid::new_v4().to_string();
        if !request.public {
            if let Some(token) = self.ctx.token() {
                request = request.header(HEADER_AUTHORIZATION, format!("Bearer {}", token));
            }
        }
        if let Some(hospital_id) = self.ctx.current_hospital_id() {
            request = request.header(HEADER_HOSPITAL_ID, hospital_id);
        }
        request = request.header(HEADER_REQUEST_ID, &request_id);

        debug!(
            request_id = %request_id,
            transport = self.transport.name(),
            "{} {}",
            request.method,
            request.path
        );

        let response = match self.transport.send(&request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(request_id = %request_id, "{} {} failed: {}", request.method, request.path, err);
                self.ctx.report(&err);
                return Err(err);
            }
        };

        if response.is_success() {
            return Ok(response);
        }

        let err = if request.public && response.status == 401 {
            ApiError::credentials_rejected(&response.body)
        } else {
            ApiError::from_response(response.status, &response.body)
        };
        warn!(
            request_id = %request_id,
            status = response.status,
            "{} {} rejected: {}",
            request.method,
            request.path,
            err
        );

        match &err {
            ApiError::Unauthorized => {
                self.ctx.handle_unauthorized();
            }
            ApiError::NotFound(_) if request.silent_not_found => {}
            _ => self.ctx.report(&err),
        }
        Err(err)
    }

    fn decode<T: DeserializeOwned>(&self, response: &ApiResponse) -> ApiResult<T> {
        response.json().inspect_err(|err| self.ctx.report(err))
    }

    /// Send and decode a plain JSON body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        let response = self.execute(request).await?;
        self.decode(&response)
    }

    /// Send and unwrap a `{code, message, data}` envelope.
    pub async fn send_enveloped<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        let response = self.execute(request).await?;
        let envelope: Envelope<T> = self.decode(&response)?;
        envelope.into_data().inspect_err(|err| self.ctx.report(err))
    }

    /// Send to an enveloped endpoint that answers without `data`.
    pub async fn send_enveloped_ack(&self, request: ApiRequest) -> ApiResult<()> {
        let response = self.execute(request).await?;
        let envelope: Envelope<serde_json::Value> = self.decode(&response)?;
        envelope.ensure_ok().inspect_err(|err| self.ctx.report(err))
    }

    /// Send and ignore the response body.
    pub async fn send_unit(&self, request: ApiRequest) -> ApiResult<()> {
        self.execute(request).await.map(|_| ())
    }

    /// Send and keep the raw body plus server-provided filename.
    pub async fn download(&self, request: ApiRequest) -> ApiResult<Download> {
        let response = self.execute(request).await?;
        Ok(Download {
            file_name: response
                .header("content-disposition")
                .and_then(parse_content_disposition),
            content_type: response.header("content-type").map(str::to_string),
            bytes: response.body,
        })
    }
}
