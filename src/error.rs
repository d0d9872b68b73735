//! Error taxonomy for backend calls
//!
//! Errors are classified from the HTTP status and the machine-readable
//! `error_code` field of the error envelope. The human-readable message is
//! only ever displayed, never inspected.

use serde::Deserialize;
use thiserror::Error;

/// Machine-readable subtype codes carried in the `error_code` envelope field.
pub mod codes {
    pub const HOSPITAL_NOT_ACTIVATED: &str = "HOSPITAL_NOT_ACTIVATED";
    pub const HOSPITAL_ACCESS_DENIED: &str = "HOSPITAL_ACCESS_DENIED";
    pub const IMPORT_SESSION_EXPIRED: &str = "IMPORT_SESSION_EXPIRED";
}

/// Client-side error for every backend interaction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// 400/422 - validation or business-rule violation
    #[error("{0}")]
    Validation(String),

    /// 400 with `HOSPITAL_NOT_ACTIVATED`
    #[error("Please activate a hospital first")]
    HospitalNotActivated,

    /// 401 - missing or expired credential
    #[error("Login expired, please log in again")]
    Unauthorized,

    /// 403 - no permission for the operation
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// 403 with `HOSPITAL_ACCESS_DENIED`
    #[error("Access to this hospital is denied")]
    HospitalAccessDenied,

    /// 404 - missing resource
    #[error("Not found: {0}")]
    NotFound(String),

    /// Import session unknown or expired on the server
    #[error("Import session expired, please upload the file again")]
    SessionExpired,

    /// 5xx and any other unexpected status
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// No response received
    #[error("Network error: {0}")]
    Network(String),

    /// Response body could not be decoded or violates a contract invariant
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Illegal import wizard transition
    #[error("Import wizard: {0}")]
    Wizard(String),

    /// Local persistent storage failure
    #[error("Storage error: {0}")]
    Storage(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Error envelope as returned by the backend.
///
/// `detail` is a string for business errors and a list of field errors for
/// request validation failures.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
}

impl ErrorBody {
    fn parse(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    fn message(&self, status: u16) -> String {
        match &self.detail {
            Some(serde_json::Value::String(s)) if !s.is_empty() => return s.clone(),
            Some(serde_json::Value::Array(items)) => {
                let parts: Vec<String> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                    .map(str::to_string)
                    .collect();
                if !parts.is_empty() {
                    return parts.join("; ");
                }
            }
            _ => {}
        }
        self.message
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("request failed with status {}", status))
    }
}

impl ApiError {
    /// Classify a non-2xx response.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let parsed = ErrorBody::parse(body);
        let code = parsed.error_code.as_deref();
        let message = parsed.message(status);

        if code == Some(codes::IMPORT_SESSION_EXPIRED) {
            return ApiError::SessionExpired;
        }

        match status {
            400 | 422 => match code {
                Some(codes::HOSPITAL_NOT_ACTIVATED) => ApiError::HospitalNotActivated,
                _ => ApiError::Validation(message),
            },
            401 => ApiError::Unauthorized,
            403 => match code {
                Some(codes::HOSPITAL_ACCESS_DENIED) => ApiError::HospitalAccessDenied,
                _ => ApiError::Forbidden(message),
            },
            404 => ApiError::NotFound(message),
            _ => ApiError::Server { status, message },
        }
    }

    /// 401 on an unauthenticated endpoint (wrong username or password).
    pub fn credentials_rejected(body: &[u8]) -> Self {
        ApiError::Validation(ErrorBody::parse(body).message(401))
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::InvalidResponse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn test_validation_error_uses_detail_string() {
        let err = ApiError::from_response(400, &body(json!({"detail": "文件格式不支持"})));
        assert_eq!(err, ApiError::Validation("文件格式不支持".to_string()));
    }

    #[test]
    fn test_field_errors_are_joined() {
        let err = ApiError::from_response(
            422,
            &body(json!({"detail": [{"msg": "field required"}, {"msg": "value is not a valid integer"}]})),
        );
        assert_eq!(
            err,
            ApiError::Validation("field required; value is not a valid integer".to_string())
        );
    }

    #[test]
    fn test_hospital_not_activated_needs_error_code() {
        let coded = ApiError::from_response(
            400,
            &body(json!({"detail": "请先激活医疗机构", "error_code": "HOSPITAL_NOT_ACTIVATED"})),
        );
        assert_eq!(coded, ApiError::HospitalNotActivated);

        // Same text without the code stays a plain validation error
        let uncoded = ApiError::from_response(400, &body(json!({"detail": "请先激活医疗机构"})));
        assert!(matches!(uncoded, ApiError::Validation(_)));
    }

    #[test]
    fn test_forbidden_subtypes() {
        let denied = ApiError::from_response(
            403,
            &body(json!({"detail": "x", "error_code": "HOSPITAL_ACCESS_DENIED"})),
        );
        assert_eq!(denied, ApiError::HospitalAccessDenied);

        let plain = ApiError::from_response(403, &body(json!({"detail": "仅系统管理员可访问"})));
        assert_eq!(plain, ApiError::Forbidden("仅系统管理员可访问".to_string()));
    }

    #[test]
    fn test_unauthorized_and_not_found() {
        assert_eq!(ApiError::from_response(401, b""), ApiError::Unauthorized);
        let nf = ApiError::from_response(404, &body(json!({"detail": "指标不存在"})));
        assert!(nf.is_not_found());
    }

    #[test]
    fn test_credentials_rejected_keeps_detail() {
        let err = ApiError::credentials_rejected(&body(json!({"detail": "Incorrect username or password"})));
        assert_eq!(err, ApiError::Validation("Incorrect username or password".to_string()));
    }

    #[test]
    fn test_session_expired_code_wins_over_status() {
        let err = ApiError::from_response(
            400,
            &body(json!({"detail": "会话已过期或不存在", "error_code": "IMPORT_SESSION_EXPIRED"})),
        );
        assert!(err.is_session_expired());
    }

    #[test]
    fn test_server_error_with_unparseable_body() {
        let err = ApiError::from_response(502, b"<html>Bad Gateway</html>");
        assert_eq!(
            err,
            ApiError::Server {
                status: 502,
                message: "request failed with status 502".to_string()
            }
        );
    }

    #[test]
    fn test_envelope_message_fallback() {
        let err = ApiError::from_response(500, &body(json!({"code": 500, "message": "数据库连接失败"})));
        assert_eq!(
            err,
            ApiError::Server {
                status: 500,
                message: "数据库连接失败".to_string()
            }
        );
    }
}
