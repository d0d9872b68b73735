//! Production transport on top of reqwest

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use super::{ApiRequest, ApiResponse, Method, RequestBody, Transport};
use crate::error::{ApiError, ApiResult};

pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn multipart(files: &[super::FilePart], fields: &[(String, String)]) -> ApiResult<Form> {
        let mut form = Form::new();
        for (key, value) in fields {
            form = form.text(key.clone(), value.clone());
        }
        for file in files {
            let mut part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
            if let Some(mime) = &file.mime {
                part = part
                    .mime_str(mime)
                    .map_err(|e| ApiError::Validation(format!("invalid MIME type {}: {}", mime, e)))?;
            }
            form = form.part(file.field.clone(), part);
        }
        Ok(form)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> ApiResult<ApiResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, self.url(&request.path));
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart { files, fields } => {
                builder.multipart(Self::multipart(files, fields)?)
            }
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Network(format!("request timed out: {} {}", request.method, request.path))
            } else {
                ApiError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(format!("failed to read response body: {}", e)))?
            .to_vec();

        debug!("{} {} -> {} ({} bytes)", request.method, request.path, status, body.len());

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }

    fn name(&self) -> &str {
        "reqwest"
    }
}
