//! Response shapes shared across endpoints

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ApiError, ApiResult};

/// Paged list `{items, total}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u64,
}

impl<T> Default for ListResponse<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }
}

/// `{code, message, data}` wrapper used by the metric and classification APIs
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Fail when the envelope carries a non-success `code`.
    pub fn ensure_ok(&self) -> ApiResult<()> {
        match self.code {
            Some(code) if code != 0 && !(200..300).contains(&code) => Err(ApiError::Server {
                status: u16::try_from(code).unwrap_or(500),
                message: self.message.clone().unwrap_or_default(),
            }),
            _ => Ok(()),
        }
    }

    pub fn into_data(self) -> ApiResult<T> {
        self.ensure_ok()?;
        self.data
            .ok_or_else(|| ApiError::InvalidResponse("envelope without data".to_string()))
    }
}

/// `{message}` acknowledgement returned by delete/clear endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub deleted_count: Option<u64>,
}

/// `skip`/`limit` paging
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SkipLimit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Accept a decimal given either as a JSON number or as a string.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(f64),
        Str(String),
    }

    match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Num(n) => Ok(n),
        NumOrStr::Str(s) if s.trim().is_empty() => Ok(0.0),
        NumOrStr::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Optional variant of [`lenient_f64`].
pub fn lenient_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(f64),
        Str(String),
    }

    match Option::<NumOrStr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumOrStr::Num(n)) => Ok(Some(n)),
        Some(NumOrStr::Str(s)) if s.trim().is_empty() => Ok(None),
        Some(NumOrStr::Str(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Amounts {
        #[serde(deserialize_with = "lenient_f64")]
        cost: f64,
        #[serde(default, deserialize_with = "lenient_opt_f64")]
        extra: Option<f64>,
    }

    #[test]
    fn test_decimal_as_string_or_number() {
        let a: Amounts = serde_json::from_value(json!({"cost": "1234.50", "extra": 3})).unwrap();
        assert_eq!(a.cost, 1234.5);
        assert_eq!(a.extra, Some(3.0));

        let b: Amounts = serde_json::from_value(json!({"cost": 7, "extra": null})).unwrap();
        assert_eq!(b.cost, 7.0);
        assert_eq!(b.extra, None);

        let c: Amounts = serde_json::from_value(json!({"cost": 1})).unwrap();
        assert_eq!(c.extra, None);
    }

    #[test]
    fn test_envelope_error_code() {
        let env: Envelope<serde_json::Value> =
            serde_json::from_value(json!({"code": 404, "message": "项目不存在", "data": null})).unwrap();
        assert_eq!(
            env.into_data().unwrap_err(),
            ApiError::Server {
                status: 404,
                message: "项目不存在".to_string()
            }
        );
    }

    #[test]
    fn test_envelope_without_code() {
        let env: Envelope<Vec<i32>> = serde_json::from_value(json!({"data": [1, 2]})).unwrap();
        assert_eq!(env.into_data().unwrap(), vec![1, 2]);
    }
}
