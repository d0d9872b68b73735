//! Server-session spreadsheet imports
//!
//! Cost reports, reference values and dimension items share one protocol:
//! four POSTs under a common base, with the uploaded workbook held
//! server-side under a session id. A domain only names its base, required
//! fields and wire types; the blanket [`ImportDomain`] impl does the HTTP.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{ImportDomain, ImportSession};
use crate::error::ApiResult;
use crate::http::{ApiClient, ApiRequest, FilePart};
use crate::types::{
    ExecuteResponse, ExtractResponse, FieldMapping, MatchStrategy, ParseOptions, ParseResponse,
    PreviewResponse, PreviewRow, PreviewTally, UploadFile, ValueMapping,
};

/// The four endpoints of one spreadsheet import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEndpoints {
    base: String,
}

impl ImportEndpoints {
    pub fn under(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn parse(&self) -> String {
        format!("{}/parse", self.base)
    }

    pub fn extract_values(&self) -> String {
        format!("{}/extract-values", self.base)
    }

    pub fn preview(&self) -> String {
        format!("{}/preview", self.base)
    }

    pub fn execute(&self) -> String {
        format!("{}/execute", self.base)
    }
}

pub trait SpreadsheetImport: Send + Sync {
    type Mapping: ValueMapping + Serialize + Clone + Send + Sync;
    type Item: PreviewRow + Serialize + DeserializeOwned + Clone + Send + Sync;
    type Stats: PreviewTally + DeserializeOwned + Clone + Send + Sync;

    fn name(&self) -> &str;

    fn endpoints(&self) -> ImportEndpoints;

    fn required_fields(&self, strategy: MatchStrategy) -> Vec<&'static str>;

    /// Additional keys merged into the extract-values body.
    fn extra_extract_params(&self) -> Map<String, Value> {
        Map::new()
    }
}

#[async_trait]
impl<T: SpreadsheetImport> ImportDomain for T {
    type Input = UploadFile;
    type Mapping = T::Mapping;
    type Item = T::Item;
    type Stats = T::Stats;

    fn name(&self) -> &str {
        SpreadsheetImport::name(self)
    }

    fn required_fields(&self, strategy: MatchStrategy) -> Vec<&'static str> {
        SpreadsheetImport::required_fields(self, strategy)
    }

    async fn parse(
        &self,
        client: &ApiClient,
        file: &UploadFile,
        options: &ParseOptions,
    ) -> ApiResult<ParseResponse> {
        debug!(domain = SpreadsheetImport::name(self), "Uploading {}", file.file_name);
        let request = ApiRequest::post(self.endpoints().parse())
            .file(FilePart {
                field: "file".to_string(),
                file_name: file.file_name.clone(),
                bytes: file.bytes.clone(),
                mime: None,
            })
            .query_opt("sheet_name", options.sheet_name.as_deref())
            .query_opt("skip_rows", options.skip_rows)
            .query_opt("header_row", options.header_row);
        client.send_json(request).await
    }

    async fn extract_values(
        &self,
        client: &ApiClient,
        session: &ImportSession<'_, UploadFile>,
        field_mapping: &FieldMapping,
        strategy: MatchStrategy,
    ) -> ApiResult<ExtractResponse> {
        let mut body = self.extra_extract_params();
        body.insert("session_id".to_string(), json!(session.id));
        body.insert("field_mapping".to_string(), json!(field_mapping));
        body.insert("match_by".to_string(), json!(strategy));
        let request = ApiRequest::post(self.endpoints().extract_values())
            .json(&body)?
            .silent_not_found();
        client.send_json(request).await
    }

    async fn preview(
        &self,
        client: &ApiClient,
        session: &ImportSession<'_, UploadFile>,
        mappings: &[T::Mapping],
    ) -> ApiResult<PreviewResponse<T::Item, T::Stats>> {
        let request = ApiRequest::post(self.endpoints().preview())
            .json(&json!({
                "session_id": session.id,
                "value_mapping": mappings,
            }))?
            .silent_not_found();
        client.send_json(request).await
    }

    async fn execute(
        &self,
        client: &ApiClient,
        session: &ImportSession<'_, UploadFile>,
        _previewed: &[T::Item],
        confirmed: Option<&[T::Item]>,
    ) -> ApiResult<ExecuteResponse> {
        let mut body = json!({ "session_id": session.id });
        if let Some(items) = confirmed {
            body["confirmed_items"] = serde_json::to_value(items)?;
        }
        let request = ApiRequest::post(self.endpoints().execute())
            .json(&body)?
            .silent_not_found();
        client.send_json(request).await
    }
}
