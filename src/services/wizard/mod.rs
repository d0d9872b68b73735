//! Staged import
//!
//! Every import domain walks the same four stages:
//! parse -> extract-values -> preview -> execute. Between stages the server
//! (or, for domains that stage nothing server-side, the plug-in itself)
//! keeps the parsed input under a session id; the wizard tracks which stage
//! the user is in and refuses calls that would skip a stage.
//!
//! Domains plug in through [`ImportDomain`]. Spreadsheet domains implement
//! [`SpreadsheetImport`] and get the HTTP protocol for free; data templates
//! and classification plans bring their own stage calls.

mod classification;
mod domains;
mod spreadsheet;
mod templates;

pub use classification::ClassificationImport;
pub use domains::{CostReportImport, DimensionItemImport, ReferenceValueImport};
pub use spreadsheet::{ImportEndpoints, SpreadsheetImport};
pub use templates::DataTemplateImport;

use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::http::ApiClient;
use crate::types::{
    ExecuteResponse, ExtractResponse, FieldMapping, MatchStrategy, ParseOptions, ParseResponse,
    PreviewResponse, PreviewRow, PreviewStatus, PreviewTally, ValueMapping,
};

// ============================================================================
// Stages
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WizardStage {
    Idle,
    Parsed,
    ValuesExtracted,
    PreviewReady,
    Executed,
    Failed,
}

impl WizardStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            WizardStage::Idle => "idle",
            WizardStage::Parsed => "parsed",
            WizardStage::ValuesExtracted => "values extracted",
            WizardStage::PreviewReady => "preview ready",
            WizardStage::Executed => "executed",
            WizardStage::Failed => "failed",
        }
    }

    /// Stages the user can navigate back to.
    fn is_rewindable(&self) -> bool {
        matches!(
            self,
            WizardStage::Idle | WizardStage::Parsed | WizardStage::ValuesExtracted
        )
    }
}

impl fmt::Display for WizardStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardAction {
    Parse,
    ExtractValues,
    GeneratePreview,
    Execute,
}

impl fmt::Display for WizardAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WizardAction::Parse => "parse",
            WizardAction::ExtractValues => "extract values",
            WizardAction::GeneratePreview => "generate preview",
            WizardAction::Execute => "execute",
        })
    }
}

/// `(from, action, to)`; anything not listed is rejected.
pub const TRANSITIONS: &[(WizardStage, WizardAction, WizardStage)] = &[
    (WizardStage::Idle, WizardAction::Parse, WizardStage::Parsed),
    // Re-parse with another sheet or header row
    (WizardStage::Parsed, WizardAction::Parse, WizardStage::Parsed),
    // Re-upload after an expired session
    (WizardStage::Failed, WizardAction::Parse, WizardStage::Parsed),
    (WizardStage::Parsed, WizardAction::ExtractValues, WizardStage::ValuesExtracted),
    (WizardStage::ValuesExtracted, WizardAction::GeneratePreview, WizardStage::PreviewReady),
    (WizardStage::PreviewReady, WizardAction::Execute, WizardStage::Executed),
];

/// Stage reached by `action` from `from`, if the move is allowed.
pub fn next_stage(from: WizardStage, action: WizardAction) -> Option<WizardStage> {
    TRANSITIONS
        .iter()
        .find(|(f, a, _)| *f == from && *a == action)
        .map(|(_, _, to)| *to)
}

// ============================================================================
// Domain plug-in
// ============================================================================

/// Open import session handed to the stage calls after parse
#[derive(Debug, Clone, Copy)]
pub struct ImportSession<'a, I> {
    pub id: &'a str,
    /// What was parsed, for plug-ins that resend it on later stages
    pub input: &'a I,
}

#[async_trait]
pub trait ImportDomain: Send + Sync {
    /// What the user hands to the parse stage
    type Input: Clone + Send + Sync;
    /// User decision for one unique value
    type Mapping: ValueMapping + Serialize + Clone + Send + Sync;
    /// One preview row
    type Item: PreviewRow + Serialize + DeserializeOwned + Clone + Send + Sync;
    /// Preview statistics block
    type Stats: PreviewTally + DeserializeOwned + Clone + Send + Sync;

    /// Domain name, for logs
    fn name(&self) -> &str;

    /// Target fields that must be mapped before values can be extracted.
    fn required_fields(&self, strategy: MatchStrategy) -> Vec<&'static str>;

    /// Whether execute can commit a subset of the previewed rows.
    fn supports_partial_execute(&self) -> bool {
        true
    }

    async fn parse(
        &self,
        client: &ApiClient,
        input: &Self::Input,
        options: &ParseOptions,
    ) -> ApiResult<ParseResponse>;

    async fn extract_values(
        &self,
        client: &ApiClient,
        session: &ImportSession<'_, Self::Input>,
        field_mapping: &FieldMapping,
        strategy: MatchStrategy,
    ) -> ApiResult<ExtractResponse>;

    async fn preview(
        &self,
        client: &ApiClient,
        session: &ImportSession<'_, Self::Input>,
        mappings: &[Self::Mapping],
    ) -> ApiResult<PreviewResponse<Self::Item, Self::Stats>>;

    /// `confirmed: None` imports every non-error row of `previewed`.
    async fn execute(
        &self,
        client: &ApiClient,
        session: &ImportSession<'_, Self::Input>,
        previewed: &[Self::Item],
        confirmed: Option<&[Self::Item]>,
    ) -> ApiResult<ExecuteResponse>;
}

// ============================================================================
// Wizard
// ============================================================================

pub struct ImportWizard<D: ImportDomain> {
    domain: D,
    client: ApiClient,
    stage: WizardStage,
    session_id: Option<String>,
    input: Option<D::Input>,
    parsed: Option<ParseResponse>,
    field_mapping: FieldMapping,
    match_strategy: MatchStrategy,
    extracted: Option<ExtractResponse>,
    value_mappings: Vec<D::Mapping>,
    preview: Option<PreviewResponse<D::Item, D::Stats>>,
    result: Option<ExecuteResponse>,
    failure: Option<String>,
}

impl<D: ImportDomain> ImportWizard<D> {
    pub fn new(domain: D, client: ApiClient) -> Self {
        Self {
            domain,
            client,
            stage: WizardStage::Idle,
            session_id: None,
            input: None,
            parsed: None,
            field_mapping: FieldMapping::new(),
            match_strategy: MatchStrategy::default(),
            extracted: None,
            value_mappings: Vec::new(),
            preview: None,
            result: None,
            failure: None,
        }
    }

    pub fn domain(&self) -> &D {
        &self.domain
    }

    pub fn stage(&self) -> WizardStage {
        self.stage
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn parsed(&self) -> Option<&ParseResponse> {
        self.parsed.as_ref()
    }

    pub fn field_mapping(&self) -> &FieldMapping {
        &self.field_mapping
    }

    pub fn match_strategy(&self) -> MatchStrategy {
        self.match_strategy
    }

    pub fn extracted(&self) -> Option<&ExtractResponse> {
        self.extracted.as_ref()
    }

    pub fn value_mappings(&self) -> &[D::Mapping] {
        &self.value_mappings
    }

    pub fn preview(&self) -> Option<&PreviewResponse<D::Item, D::Stats>> {
        self.preview.as_ref()
    }

    pub fn result(&self) -> Option<&ExecuteResponse> {
        self.result.as_ref()
    }

    /// Why the wizard is in `Failed`.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn can(&self, action: WizardAction) -> bool {
        next_stage(self.stage, action).is_some()
    }

    // ------------------------------------------------------------------------
    // Stage calls
    // ------------------------------------------------------------------------

    /// Parse the input and open an import session.
    pub async fn parse(&mut self, input: &D::Input, options: &ParseOptions) -> ApiResult<&ParseResponse> {
        let target = self.begin(WizardAction::Parse)?;
        let result = self.domain.parse(&self.client, input, options).await;
        let parsed = self.settle(WizardAction::Parse, result)?;

        self.clear_after(WizardStage::Idle);
        self.session_id = Some(parsed.session_id.clone());
        self.input = Some(input.clone());
        self.field_mapping = parsed.suggested_mapping.clone();
        self.failure = None;
        info!(
            domain = self.domain.name(),
            session_id = %parsed.session_id,
            rows = parsed.total_rows,
            "Parsed import input"
        );
        self.stage = target;
        Ok(self.parsed.insert(parsed))
    }

    /// Submit the field mapping and fetch distinct values with candidates.
    pub async fn extract_values(
        &mut self,
        field_mapping: FieldMapping,
        strategy: MatchStrategy,
    ) -> ApiResult<&ExtractResponse> {
        let target = self.begin(WizardAction::ExtractValues)?;
        self.check_field_mapping(&field_mapping, strategy)?;

        let result = {
            let session = self.session()?;
            self.domain
                .extract_values(&self.client, &session, &field_mapping, strategy)
                .await
        };
        let extracted = self.settle(WizardAction::ExtractValues, result)?;

        self.clear_after(WizardStage::Parsed);
        self.field_mapping = field_mapping;
        self.match_strategy = strategy;
        debug!(
            domain = self.domain.name(),
            unique_values = extracted.unique_values.len(),
            "Extracted values"
        );
        self.stage = target;
        Ok(self.extracted.insert(extracted))
    }

    /// Submit value mappings and fetch the row-level preview.
    pub async fn generate_preview(
        &mut self,
        mappings: Vec<D::Mapping>,
    ) -> ApiResult<&PreviewResponse<D::Item, D::Stats>> {
        let target = self.begin(WizardAction::GeneratePreview)?;
        self.check_value_mappings(&mappings)?;

        let result = {
            let session = self.session()?;
            self.domain.preview(&self.client, &session, &mappings).await
        };
        let preview = self.settle(WizardAction::GeneratePreview, result)?;

        let stats = &preview.statistics;
        if !stats.is_consistent() {
            return Err(self.reject(ApiError::InvalidResponse(format!(
                "preview total {} does not match category sum {}",
                stats.total(),
                stats
                    .category_sum()
                    .map_or_else(|| "(overflow)".to_string(), |sum| sum.to_string())
            ))));
        }

        self.clear_after(WizardStage::ValuesExtracted);
        self.value_mappings = mappings;
        info!(
            domain = self.domain.name(),
            rows = preview.preview_items.len(),
            total = preview.statistics.total(),
            "Preview ready"
        );
        self.stage = target;
        Ok(self.preview.insert(preview))
    }

    /// Commit the import. Never retried: a timeout leaves the outcome unknown
    /// and the caller has to check the data before trying again.
    pub async fn execute(&mut self, confirmed: Option<Vec<D::Item>>) -> ApiResult<&ExecuteResponse> {
        let target = self.begin(WizardAction::Execute)?;
        let has_error_rows = confirmed
            .iter()
            .flatten()
            .any(|item| item.status() == PreviewStatus::Error);
        if has_error_rows {
            return Err(self.reject(ApiError::Validation(
                "rows with errors cannot be imported".to_string(),
            )));
        }
        if let Some(items) = &confirmed {
            if !self.domain.supports_partial_execute() && items.len() != self.importable_rows() {
                return Err(self.reject(ApiError::Validation(format!(
                    "{} imports commit every previewed row",
                    self.domain.name()
                ))));
            }
        }

        let result = {
            let session = self.session()?;
            let previewed = self
                .preview
                .as_ref()
                .map_or(&[][..], |p| p.preview_items.as_slice());
            self.domain
                .execute(&self.client, &session, previewed, confirmed.as_deref())
                .await
        };
        let outcome = self.settle(WizardAction::Execute, result)?;

        let report = &outcome.report;
        if outcome.success {
            info!(
                domain = self.domain.name(),
                imported = report.success_count,
                updated = report.update_count,
                skipped = report.skip_count,
                errors = report.error_count,
                "Import finished"
            );
            self.stage = target;
        } else {
            warn!(
                domain = self.domain.name(),
                errors = report.error_count,
                "Import rejected by server"
            );
            self.fail(format!("import failed with {} errors", report.error_count));
        }
        Ok(self.result.insert(outcome))
    }

    /// Go back to an earlier stage, discarding everything after it.
    /// Going back to `Idle` drops the session; a new parse is then required.
    pub fn back_to(&mut self, stage: WizardStage) -> ApiResult<()> {
        let allowed = match self.stage {
            WizardStage::Executed | WizardStage::Failed => stage == WizardStage::Idle,
            current => stage.is_rewindable() && stage < current,
        };
        if !allowed {
            return Err(self.reject(ApiError::Wizard(format!(
                "cannot go back to {} from {}",
                stage, self.stage
            ))));
        }

        self.clear_after(stage);
        if stage == WizardStage::Idle {
            self.session_id = None;
            self.input = None;
            self.parsed = None;
            self.field_mapping.clear();
            self.failure = None;
        }
        debug!(domain = self.domain.name(), "Back to {}", stage);
        self.stage = stage;
        Ok(())
    }

    /// Start over.
    pub fn reset(&mut self) {
        self.clear_after(WizardStage::Idle);
        self.session_id = None;
        self.input = None;
        self.parsed = None;
        self.field_mapping.clear();
        self.failure = None;
        self.stage = WizardStage::Idle;
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn begin(&self, action: WizardAction) -> ApiResult<WizardStage> {
        next_stage(self.stage, action).ok_or_else(|| {
            self.reject(ApiError::Wizard(format!(
                "cannot {} while {}",
                action, self.stage
            )))
        })
    }

    fn session(&self) -> ApiResult<ImportSession<'_, D::Input>> {
        match (&self.session_id, &self.input) {
            (Some(id), Some(input)) => Ok(ImportSession {
                id: id.as_str(),
                input,
            }),
            _ => Err(self.reject(ApiError::Wizard("no import session".to_string()))),
        }
    }

    /// Preview rows execute would import when nothing is deselected.
    fn importable_rows(&self) -> usize {
        self.preview.as_ref().map_or(0, |p| {
            p.preview_items
                .iter()
                .filter(|item| item.status() != PreviewStatus::Error)
                .count()
        })
    }

    /// Report a locally detected problem and hand it back.
    fn reject(&self, err: ApiError) -> ApiError {
        self.client.context().report(&err);
        err
    }

    /// Apply the failure rules to a stage call's result.
    fn settle<T>(&mut self, action: WizardAction, result: ApiResult<T>) -> ApiResult<T> {
        match result {
            Ok(value) => Ok(value),
            // Stage requests after parse are sent with silent 404s; an unknown
            // session shows up as 404 and is reported here as expired instead.
            Err(ApiError::NotFound(_)) if action != WizardAction::Parse => {
                let err = self.reject(ApiError::SessionExpired);
                self.expire();
                Err(err)
            }
            Err(ApiError::SessionExpired) => {
                self.expire();
                Err(ApiError::SessionExpired)
            }
            Err(err) => {
                debug!(domain = self.domain.name(), "{} failed, staying at {}: {}", action, self.stage, err);
                Err(err)
            }
        }
    }

    fn expire(&mut self) {
        warn!(
            domain = self.domain.name(),
            session_id = self.session_id.as_deref().unwrap_or("-"),
            "Import session expired"
        );
        self.session_id = None;
        self.input = None;
        self.fail("import session expired, re-upload required".to_string());
    }

    fn fail(&mut self, reason: String) {
        self.failure = Some(reason);
        self.stage = WizardStage::Failed;
    }

    /// Drop state produced by stages after `stage`.
    fn clear_after(&mut self, stage: WizardStage) {
        if stage < WizardStage::ValuesExtracted {
            self.extracted = None;
            self.match_strategy = MatchStrategy::default();
        }
        if stage < WizardStage::PreviewReady {
            self.value_mappings.clear();
            self.preview = None;
        }
        self.result = None;
    }

    fn check_field_mapping(&self, mapping: &FieldMapping, strategy: MatchStrategy) -> ApiResult<()> {
        let headers: HashSet<&str> = self
            .parsed
            .as_ref()
            .map(|p| p.headers.iter().map(String::as_str).collect())
            .unwrap_or_default();

        if let Some((field, column)) = mapping.iter().find(|(_, col)| !headers.contains(col.as_str())) {
            return Err(self.reject(ApiError::Validation(format!(
                "column '{}' mapped to '{}' is not in the file",
                column, field
            ))));
        }

        let missing: Vec<&str> = self
            .domain
            .required_fields(strategy)
            .into_iter()
            .filter(|f| !mapping.contains_key(*f))
            .collect();
        if !missing.is_empty() {
            return Err(self.reject(ApiError::Validation(format!(
                "required fields not mapped: {}",
                missing.join(", ")
            ))));
        }
        Ok(())
    }

    fn check_value_mappings(&self, mappings: &[D::Mapping]) -> ApiResult<()> {
        let Some(extracted) = &self.extracted else {
            return Err(self.reject(ApiError::Wizard("values were not extracted".to_string())));
        };

        let known = |m: &D::Mapping| {
            extracted.unique_values.iter().any(|u| {
                u.value == m.value()
                    && match m.source() {
                        Some(source) => u.source.as_deref().map_or(true, |s| s == source),
                        None => true,
                    }
            })
        };

        match mappings.iter().find(|m| !known(m)) {
            Some(unknown) => Err(self.reject(ApiError::Validation(format!(
                "'{}' is not one of the extracted values",
                unknown.value()
            )))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Method, MockReply, MockTransport, RequestBody};
    use crate::session::{AppContext, MemoryStore, RecordingNotifier};
    use crate::types::{DepartmentValueMapping, DimensionValueMapping, UploadFile};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;

    fn setup() -> (ApiClient, Arc<MockTransport>, Arc<RecordingNotifier>) {
        let mock = Arc::new(MockTransport::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let ctx = AppContext::new(Arc::new(MemoryStore::new()), notifier.clone(), Duration::ZERO);
        (ApiClient::new(mock.clone(), Arc::new(ctx)), mock, notifier)
    }

    fn workbook() -> UploadFile {
        UploadFile::new("成本报表.xlsx", b"PK\x03\x04".to_vec())
    }

    fn parse_reply() -> MockReply {
        MockReply::ok(json!({
            "session_id": "s-1",
            "sheet_names": ["Sheet1"],
            "current_sheet": "Sheet1",
            "headers": ["月份", "科室名称", "人员经费"],
            "preview_data": [["2025-01", "心内科", "1000"]],
            "total_rows": 3,
            "skip_rows": 0,
            "header_row": 1,
            "suggested_mapping": {"period": "月份", "department_name": "科室名称", "personnel_cost": "人员经费"}
        }))
    }

    fn extract_reply() -> MockReply {
        MockReply::ok(json!({
            "unique_values": [
                {"value": "心内科", "count": 1, "suggested_departments": [
                    {"id": 1, "code": "0101", "name": "心内科", "score": 1.0}
                ]},
                {"value": "内科", "count": 1, "suggested_departments": [
                    {"id": 2, "code": "0102", "name": "内科一病区", "score": 0.6},
                    {"id": 3, "code": "0103", "name": "内科二病区", "score": 0.5}
                ]},
                {"value": "未知科室", "count": 1, "suggested_departments": []}
            ],
            "system_departments": [
                {"id": 1, "code": "0101", "name": "心内科"},
                {"id": 2, "code": "0102", "name": "内科一病区"},
                {"id": 3, "code": "0103", "name": "内科二病区"}
            ]
        }))
    }

    fn preview_item(code: &str, name: &str, status: &str) -> Value {
        json!({
            "period": "2025-01", "department_code": code, "department_name": name,
            "excel_department_name": name, "personnel_cost": "1000.00",
            "material_cost": 0, "medicine_cost": 0, "depreciation_cost": 0, "other_cost": 0,
            "status": status, "message": ""
        })
    }

    fn preview_reply(stats: Value) -> MockReply {
        MockReply::ok(json!({
            "preview_items": [
                preview_item("0101", "心内科", "new"),
                preview_item("0102", "内科一病区", "update"),
                preview_item("", "未知科室", "skip")
            ],
            "statistics": stats
        }))
    }

    fn consistent_stats() -> Value {
        json!({"total": 3, "new_count": 1, "update_count": 1, "skip_count": 1, "error_count": 0})
    }

    /// Parse + extract with the suggested mapping.
    async fn wizard_at_values(client: &ApiClient, mock: &MockTransport) -> ImportWizard<CostReportImport> {
        mock.on(Method::Post, "/cost-reports/import/parse", parse_reply())
            .on(Method::Post, "/cost-reports/import/extract-values", extract_reply());
        let mut wizard = ImportWizard::new(CostReportImport, client.clone());
        wizard.parse(&workbook(), &ParseOptions::default()).await.unwrap();
        let mapping = wizard.field_mapping().clone();
        wizard.extract_values(mapping, MatchStrategy::Name).await.unwrap();
        wizard
    }

    fn decide(wizard: &ImportWizard<CostReportImport>) -> Vec<DepartmentValueMapping> {
        wizard
            .extracted()
            .unwrap()
            .unique_values
            .iter()
            .map(|v| DepartmentValueMapping {
                value: v.value.clone(),
                department_code: v
                    .exact_match()
                    .or_else(|| v.best_candidate())
                    .map(|c| c.code.clone()),
            })
            .collect()
    }

    #[test]
    fn test_transition_table() {
        assert_eq!(next_stage(WizardStage::Idle, WizardAction::Parse), Some(WizardStage::Parsed));
        assert_eq!(next_stage(WizardStage::Idle, WizardAction::Execute), None);
        assert_eq!(next_stage(WizardStage::Parsed, WizardAction::GeneratePreview), None);
        assert_eq!(next_stage(WizardStage::Executed, WizardAction::Execute), None);
        assert_eq!(next_stage(WizardStage::Failed, WizardAction::Parse), Some(WizardStage::Parsed));
    }

    #[tokio::test]
    async fn test_three_row_cost_report_import() {
        let (client, mock, notifier) = setup();
        let mut wizard = wizard_at_values(&client, &mock).await;
        assert_eq!(wizard.stage(), WizardStage::ValuesExtracted);

        let mappings = decide(&wizard);
        assert_eq!(mappings[0].department_code.as_deref(), Some("0101"));
        assert_eq!(mappings[1].department_code.as_deref(), Some("0102"));
        assert_eq!(mappings[2].department_code, None);

        mock.on(Method::Post, "/cost-reports/import/preview", preview_reply(consistent_stats()))
            .on(
                Method::Post,
                "/cost-reports/import/execute",
                MockReply::ok(json!({"success": true, "report": {
                    "success_count": 1, "update_count": 1, "skip_count": 1, "error_count": 0, "errors": []
                }})),
            );

        let preview = wizard.generate_preview(mappings).await.unwrap();
        assert_eq!(preview.preview_items.len(), 3);
        assert_eq!(preview.statistics.total, 3);

        let outcome = wizard.execute(None).await.unwrap();
        let report = &outcome.report;
        assert_eq!(
            report.success_count + report.update_count + report.skip_count + report.error_count,
            3
        );
        assert_eq!(wizard.stage(), WizardStage::Executed);
        assert!(notifier.notices().is_empty());

        let parse_reqs = mock.requests_to(Method::Post, "/cost-reports/import/parse");
        let RequestBody::Multipart { files, .. } = &parse_reqs[0].body else {
            panic!("parse must upload multipart");
        };
        assert_eq!(files[0].field, "file");

        let extract = mock.requests_to(Method::Post, "/cost-reports/import/extract-values")[0]
            .json_body()
            .cloned()
            .unwrap();
        assert_eq!(extract["session_id"], "s-1");
        assert_eq!(extract["match_by"], "name");
        assert_eq!(extract["field_mapping"]["department_name"], "科室名称");

        let preview_body = mock.requests_to(Method::Post, "/cost-reports/import/preview")[0]
            .json_body()
            .cloned()
            .unwrap();
        assert_eq!(preview_body["value_mapping"][2], json!({"value": "未知科室", "department_code": null}));

        let execute_body = mock.last_request().unwrap().json_body().cloned().unwrap();
        assert_eq!(execute_body, json!({"session_id": "s-1"}));
    }

    #[tokio::test]
    async fn test_stage_cannot_be_skipped() {
        let (client, mock, notifier) = setup();
        let mut wizard = ImportWizard::new(CostReportImport, client);

        let err = wizard
            .extract_values(FieldMapping::new(), MatchStrategy::Code)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Wizard(_)));
        assert_eq!(wizard.stage(), WizardStage::Idle);
        assert_eq!(mock.request_count(), 0);
        assert_eq!(notifier.notices().len(), 1);
    }

    #[tokio::test]
    async fn test_field_mapping_checked_before_extract() {
        let (client, mock, _) = setup();
        mock.on(Method::Post, "/cost-reports/import/parse", parse_reply());
        let mut wizard = ImportWizard::new(CostReportImport, client);
        wizard.parse(&workbook(), &ParseOptions::default()).await.unwrap();

        let mut unknown_column = FieldMapping::new();
        unknown_column.insert("department_name".to_string(), "部门".to_string());
        let err = wizard
            .extract_values(unknown_column, MatchStrategy::Name)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let mut missing_required = FieldMapping::new();
        missing_required.insert("period".to_string(), "月份".to_string());
        let err = wizard
            .extract_values(missing_required, MatchStrategy::Name)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::Validation("required fields not mapped: department_name".to_string())
        );

        assert_eq!(wizard.stage(), WizardStage::Parsed);
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test]
    async fn test_mapping_must_reference_extracted_value() {
        let (client, mock, _) = setup();
        let mut wizard = wizard_at_values(&client, &mock).await;

        let err = wizard
            .generate_preview(vec![DepartmentValueMapping {
                value: "外科".to_string(),
                department_code: Some("0201".to_string()),
            }])
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(wizard.stage(), WizardStage::ValuesExtracted);
        assert!(mock.requests_to(Method::Post, "/cost-reports/import/preview").is_empty());
    }

    #[tokio::test]
    async fn test_inconsistent_statistics_rejected() {
        let (client, mock, notifier) = setup();
        let mut wizard = wizard_at_values(&client, &mock).await;
        mock.on(
            Method::Post,
            "/cost-reports/import/preview",
            preview_reply(json!({"total": 4, "new_count": 1, "update_count": 1, "skip_count": 1, "error_count": 0})),
        );

        let mappings = decide(&wizard);
        let err = wizard.generate_preview(mappings).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
        assert_eq!(wizard.stage(), WizardStage::ValuesExtracted);
        assert!(wizard.preview().is_none());
        assert_eq!(notifier.notices().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_session_fails_wizard_and_requires_reupload() {
        let (client, mock, notifier) = setup();
        let mut wizard = wizard_at_values(&client, &mock).await;
        mock.on(
            Method::Post,
            "/cost-reports/import/preview",
            MockReply::json(404, json!({"detail": "会话不存在"})),
        );

        let mappings = decide(&wizard);
        let err = wizard.generate_preview(mappings).await.unwrap_err();
        assert_eq!(err, ApiError::SessionExpired);
        assert_eq!(wizard.stage(), WizardStage::Failed);
        assert_eq!(wizard.session_id(), None);
        assert!(wizard.failure().unwrap().contains("re-upload"));
        assert_eq!(notifier.messages(), vec![ApiError::SessionExpired.to_string()]);

        assert!(!wizard.can(WizardAction::GeneratePreview));
        assert!(wizard.can(WizardAction::Parse));
    }

    #[tokio::test]
    async fn test_expired_session_code_on_execute() {
        let (client, mock, notifier) = setup();
        let mut wizard = wizard_at_values(&client, &mock).await;
        mock.on(Method::Post, "/cost-reports/import/preview", preview_reply(consistent_stats()))
            .on(
                Method::Post,
                "/cost-reports/import/execute",
                MockReply::json(400, json!({"detail": "会话已过期", "error_code": "IMPORT_SESSION_EXPIRED"})),
            );

        let mappings = decide(&wizard);
        wizard.generate_preview(mappings).await.unwrap();
        assert_eq!(wizard.execute(None).await.unwrap_err(), ApiError::SessionExpired);
        assert_eq!(wizard.stage(), WizardStage::Failed);
        assert_eq!(notifier.notices().len(), 1);
        // Never retried
        assert_eq!(mock.requests_to(Method::Post, "/cost-reports/import/execute").len(), 1);
    }

    #[tokio::test]
    async fn test_server_error_keeps_stage_for_retry() {
        let (client, mock, _) = setup();
        mock.on(Method::Post, "/cost-reports/import/parse", parse_reply())
            .on(
                Method::Post,
                "/cost-reports/import/extract-values",
                MockReply::json(500, json!({"detail": "提取唯一值失败"})),
            )
            .on(Method::Post, "/cost-reports/import/extract-values", extract_reply());

        let mut wizard = ImportWizard::new(CostReportImport, client);
        wizard.parse(&workbook(), &ParseOptions::default()).await.unwrap();
        let mapping = wizard.field_mapping().clone();

        let err = wizard
            .extract_values(mapping.clone(), MatchStrategy::Name)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Server { status: 500, .. }));
        assert_eq!(wizard.stage(), WizardStage::Parsed);
        assert_eq!(wizard.session_id(), Some("s-1"));

        wizard.extract_values(mapping, MatchStrategy::Name).await.unwrap();
        assert_eq!(wizard.stage(), WizardStage::ValuesExtracted);
    }

    #[tokio::test]
    async fn test_unsuccessful_execute_fails_wizard() {
        let (client, mock, _) = setup();
        let mut wizard = wizard_at_values(&client, &mock).await;
        mock.on(Method::Post, "/cost-reports/import/preview", preview_reply(consistent_stats()))
            .on(
                Method::Post,
                "/cost-reports/import/execute",
                MockReply::ok(json!({"success": false, "report": {
                    "success_count": 0, "error_count": 2,
                    "errors": [{"period": "2025-01", "department_code": "0101", "reason": "重复记录"}]
                }})),
            );

        let mappings = decide(&wizard);
        wizard.generate_preview(mappings).await.unwrap();
        let outcome = wizard.execute(None).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(wizard.stage(), WizardStage::Failed);
        assert!(wizard.result().is_some());
    }

    #[tokio::test]
    async fn test_confirmed_error_rows_rejected() {
        let (client, mock, _) = setup();
        let mut wizard = wizard_at_values(&client, &mock).await;
        mock.on(Method::Post, "/cost-reports/import/preview", preview_reply(consistent_stats()));
        let mappings = decide(&wizard);
        wizard.generate_preview(mappings).await.unwrap();

        let mut items = wizard.preview().unwrap().preview_items.clone();
        items[0].status = PreviewStatus::Error;
        let err = wizard.execute(Some(items.clone())).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(wizard.stage(), WizardStage::PreviewReady);

        mock.on(
            Method::Post,
            "/cost-reports/import/execute",
            MockReply::ok(json!({"success": true, "report": {"success_count": 1}})),
        );
        wizard.execute(Some(items[1..2].to_vec())).await.unwrap();
        let body = mock.last_request().unwrap().json_body().cloned().unwrap();
        assert_eq!(body["confirmed_items"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_confirmed_subset_with_resolved_ambiguity_and_error_row() {
        let (client, mock, notifier) = setup();
        let mut wizard = wizard_at_values(&client, &mock).await;

        // "内科" has two candidates and no exact match: the user picks the second
        let ambiguous = &wizard.extracted().unwrap().unique_values[1];
        assert_eq!(ambiguous.unambiguous_candidate(), None);
        let mappings = vec![
            DepartmentValueMapping {
                value: "心内科".to_string(),
                department_code: Some("0101".to_string()),
            },
            DepartmentValueMapping {
                value: "内科".to_string(),
                department_code: Some(ambiguous.candidates[1].code.clone()),
            },
            DepartmentValueMapping {
                value: "未知科室".to_string(),
                department_code: None,
            },
        ];

        let mut error_row = preview_item("", "未知科室", "error");
        error_row["message"] = json!("no matching department");
        mock.on(
            Method::Post,
            "/cost-reports/import/preview",
            MockReply::ok(json!({
                "preview_items": [
                    preview_item("0101", "心内科", "new"),
                    preview_item("0103", "内科二病区", "new"),
                    error_row
                ],
                "statistics": {"total": 3, "new_count": 2, "update_count": 0, "skip_count": 0, "error_count": 1}
            })),
        )
        .on(
            Method::Post,
            "/cost-reports/import/execute",
            MockReply::ok(json!({"success": true, "report": {
                "success_count": 2, "update_count": 0, "skip_count": 0, "error_count": 0, "errors": []
            }})),
        );

        let preview = wizard.generate_preview(mappings).await.unwrap();
        assert_eq!(preview.statistics.error_count, 1);
        assert_eq!(preview.preview_items[2].message, "no matching department");
        let confirmed: Vec<_> = preview
            .preview_items
            .iter()
            .filter(|item| item.status() != PreviewStatus::Error)
            .cloned()
            .collect();

        let outcome = wizard.execute(Some(confirmed)).await.unwrap();
        assert_eq!(outcome.report.success_count, 2);
        assert_eq!(outcome.report.error_count, 0);
        assert_eq!(wizard.stage(), WizardStage::Executed);
        assert!(notifier.notices().is_empty());

        let preview_body = mock.requests_to(Method::Post, "/cost-reports/import/preview")[0]
            .json_body()
            .cloned()
            .unwrap();
        assert_eq!(preview_body["value_mapping"][1]["department_code"], "0103");

        let body = mock.last_request().unwrap().json_body().cloned().unwrap();
        let sent = body["confirmed_items"].as_array().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1]["department_code"], "0103");
        assert!(sent.iter().all(|item| item["department_name"] != "未知科室"));
    }

    #[tokio::test]
    async fn test_back_navigation_discards_later_state() {
        let (client, mock, notifier) = setup();
        let mut wizard = wizard_at_values(&client, &mock).await;
        mock.on(Method::Post, "/cost-reports/import/preview", preview_reply(consistent_stats()));
        let mappings = decide(&wizard);
        wizard.generate_preview(mappings).await.unwrap();

        wizard.back_to(WizardStage::Parsed).unwrap();
        assert_eq!(wizard.stage(), WizardStage::Parsed);
        assert!(wizard.extracted().is_none());
        assert!(wizard.preview().is_none());
        assert!(wizard.value_mappings().is_empty());
        assert_eq!(wizard.session_id(), Some("s-1"));

        assert!(wizard.back_to(WizardStage::PreviewReady).is_err());
        assert_eq!(notifier.notices().len(), 1);

        wizard.back_to(WizardStage::Idle).unwrap();
        assert_eq!(wizard.session_id(), None);
        assert!(wizard.parsed().is_none());
        assert!(!wizard.can(WizardAction::ExtractValues));
    }

    #[tokio::test]
    async fn test_dimension_import_sends_version_and_checks_source() {
        let (client, mock, _) = setup();
        mock.on(
            Method::Post,
            "/dimension-items/smart-import/parse",
            MockReply::ok(json!({
                "session_id": "d-1", "headers": ["收费编码", "维度预案"],
                "suggested_mapping": {"item_code": "收费编码", "dimension_plan": "维度预案"}
            })),
        )
        .on(
            Method::Post,
            "/dimension-items/smart-import/extract-values",
            MockReply::ok(json!({
                "unique_values": [{"value": "检查", "source": "dimension_plan", "count": 4, "suggested_dimensions": []}],
                "system_dimensions": []
            })),
        );

        let mut wizard = ImportWizard::new(DimensionItemImport { model_version_id: 7 }, client);
        wizard
            .parse(&UploadFile::new("维度.xlsx", vec![0]), &ParseOptions::default())
            .await
            .unwrap();
        let mapping = wizard.field_mapping().clone();
        wizard.extract_values(mapping, MatchStrategy::Code).await.unwrap();

        let body = mock.last_request().unwrap().json_body().cloned().unwrap();
        assert_eq!(body["model_version_id"], 7);

        let wrong_source = DimensionValueMapping {
            value: "检查".to_string(),
            source: "expert_opinion".to_string(),
            dimension_codes: vec!["D01".to_string()],
        };
        let err = wizard.generate_preview(vec![wrong_source]).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
