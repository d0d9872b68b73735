//! HTTP plumbing for the backend REST API
//!
//! Uses reqwest for production, a scripted mock for tests.

mod client;
mod download;
mod mock;
mod reqwest_transport;

pub use client::{
    ApiClient, CLASSIFICATION_CREATE_TIMEOUT, HEADER_AUTHORIZATION, HEADER_HOSPITAL_ID,
    HEADER_REQUEST_ID,
};
pub use download::{parse_content_disposition, Download};
pub use mock::{MockReply, MockTransport};
pub use reqwest_transport::ReqwestTransport;

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File attached to a multipart upload
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart {
        files: Vec<FilePart>,
        fields: Vec<(String, String)>,
    },
}

/// Transport-independent request description.
///
/// `path` is relative to the API base URL, e.g. `/cost-reports/import/parse`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
    /// Overrides the transport default
    pub timeout: Option<Duration>,
    /// A 404 is an expected answer, not something to notify about
    pub silent_not_found: bool,
    /// Sent without credentials; a 401 means rejected credentials, not an
    /// expired session
    pub public: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::Empty,
            timeout: None,
            silent_not_found: false,
            public: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn query_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    /// Flatten a serializable struct into query pairs.
    ///
    /// `null` fields are skipped, arrays become repeated keys.
    pub fn params<T: Serialize>(mut self, params: &T) -> ApiResult<Self> {
        let value = serde_json::to_value(params)
            .map_err(|e| ApiError::Validation(format!("invalid query parameters: {}", e)))?;
        let Value::Object(map) = value else {
            return Err(ApiError::Validation(
                "query parameters must serialize to an object".to_string(),
            ));
        };
        for (key, value) in map {
            match value {
                Value::Null => {}
                Value::Array(items) => {
                    for item in items {
                        if let Some(s) = scalar_to_string(&item) {
                            self.query.push((key.clone(), s));
                        }
                    }
                }
                other => {
                    if let Some(s) = scalar_to_string(&other) {
                        self.query.push((key, s));
                    }
                }
            }
        }
        Ok(self)
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> ApiResult<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::Validation(format!("invalid request body: {}", e)))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn file(mut self, part: FilePart) -> Self {
        match &mut self.body {
            RequestBody::Multipart { files, .. } => files.push(part),
            _ => {
                self.body = RequestBody::Multipart {
                    files: vec![part],
                    fields: Vec::new(),
                }
            }
        }
        self
    }

    pub fn form_field(mut self, key: &str, value: impl ToString) -> Self {
        let pair = (key.to_string(), value.to_string());
        match &mut self.body {
            RequestBody::Multipart { fields, .. } => fields.push(pair),
            _ => {
                self.body = RequestBody::Multipart {
                    files: Vec::new(),
                    fields: vec![pair],
                }
            }
        }
        self
    }

    pub fn header(mut self, name: &str, value: impl ToString) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn silent_not_found(mut self) -> Self {
        self.silent_not_found = true;
        self
    }

    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            RequestBody::Json(v) => Some(v),
            _ => None,
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Raw response; header names are lowercase.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn json<T: DeserializeOwned>(&self) -> ApiResult<T> {
        // 204 and empty bodies decode as JSON null
        let body: &[u8] = if self.body.is_empty() { b"null" } else { &self.body };
        serde_json::from_slice(body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}

/// Sends requests to the backend (reqwest, mock, etc.)
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one request. Only a missing response is an `Err`; any HTTP
    /// status comes back as `Ok`.
    async fn send(&self, request: &ApiRequest) -> ApiResult<ApiResponse>;

    /// Get transport name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Filter {
        page: u32,
        keyword: Option<String>,
        is_active: Option<bool>,
        ids: Vec<i64>,
    }

    #[test]
    fn test_params_flatten_skips_nulls_and_repeats_arrays() {
        let req = ApiRequest::get("/departments")
            .params(&Filter {
                page: 2,
                keyword: None,
                is_active: Some(true),
                ids: vec![4, 5],
            })
            .unwrap();

        assert_eq!(req.query_value("page"), Some("2"));
        assert_eq!(req.query_value("keyword"), None);
        assert_eq!(req.query_value("is_active"), Some("true"));
        let ids: Vec<&str> = req
            .query
            .iter()
            .filter(|(k, _)| k == "ids")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(ids, vec!["4", "5"]);
    }

    #[test]
    fn test_params_rejects_non_object() {
        let err = ApiRequest::get("/x").params(&vec![1, 2]).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_multipart_accumulates_parts() {
        let req = ApiRequest::post("/data-templates/batch-upload")
            .file(FilePart {
                field: "definition_files".to_string(),
                file_name: "a.docx".to_string(),
                bytes: vec![1],
                mime: None,
            })
            .file(FilePart {
                field: "sql_files".to_string(),
                file_name: "a.sql".to_string(),
                bytes: vec![2],
                mime: None,
            })
            .form_field("overwrite", true);

        match req.body {
            RequestBody::Multipart { files, fields } => {
                assert_eq!(files.len(), 2);
                assert_eq!(fields, vec![("overwrite".to_string(), "true".to_string())]);
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_response_header_lookup_is_case_insensitive() {
        let resp = ApiResponse::new(200, Vec::new()).with_header("Content-Disposition", "attachment");
        assert_eq!(resp.header("content-disposition"), Some("attachment"));
        assert_eq!(resp.header("CONTENT-DISPOSITION"), Some("attachment"));
    }

    #[test]
    fn test_empty_body_decodes_as_unit() {
        let resp = ApiResponse::new(204, Vec::new());
        let decoded: Option<Value> = resp.json().unwrap();
        assert!(decoded.is_none());
    }
}
