//! Classification plan submission as an import
//!
//! A plan already holds AI-suggested dimensions for its charge items, so
//! there is no file: parse loads the plan items, each item becomes one
//! unique value (keyed by item id) whose candidate is its current dimension,
//! preview writes changed choices back to the plan and asks the server
//! what submitting would add or overwrite, and execute submits the plan.
//! Submission is all-or-nothing.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{ImportDomain, ImportSession};
use crate::api::classification;
use crate::error::{ApiError, ApiResult};
use crate::http::ApiClient;
use crate::types::{
    ClassificationPreviewItem, EntityCandidate, ExecuteResponse, ExtractResponse, FieldMapping,
    ImportReport, ImportStatistics, MatchStrategy, ParseOptions, ParseResponse, PlanItem,
    PlanItemMapping, PlanItemQuery, PreviewResponse, PreviewStatus, RowError, SubmitPreviewItem,
    UniqueValueMatch,
};

const PAGE_SIZE: u32 = 1000;
const PREVIEW_ROWS: usize = 20;

/// Submit one classification plan into the dimension mappings
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassificationImport;

impl ClassificationImport {
    async fn items(client: &ApiClient, plan_id: i64) -> ApiResult<Vec<PlanItem>> {
        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let query = PlanItemQuery {
                page: Some(page),
                size: Some(PAGE_SIZE),
                ..Default::default()
            };
            let batch = classification::plan_items(client, plan_id, &query).await?;
            let fetched = batch.items.len();
            items.extend(batch.items);
            if fetched < PAGE_SIZE as usize || items.len() as u64 >= batch.total {
                return Ok(items);
            }
            page += 1;
        }
    }

    fn invalid(client: &ApiClient, message: String) -> ApiError {
        let err = ApiError::Validation(message);
        client.context().report(&err);
        err
    }
}

fn preview_row(item: &SubmitPreviewItem, status: PreviewStatus) -> ClassificationPreviewItem {
    ClassificationPreviewItem {
        item_id: item.item_id,
        charge_item_name: item.item_name.clone(),
        dimension_id: Some(item.dimension_id),
        dimension_name: Some(item.dimension_name.clone()),
        dimension_path: Some(item.dimension_path.clone()),
        old_dimension_name: item.old_dimension_name.clone(),
        status,
        message: String::new(),
    }
}

#[async_trait]
impl ImportDomain for ClassificationImport {
    /// Plan id
    type Input = i64;
    type Mapping = PlanItemMapping;
    type Item = ClassificationPreviewItem;
    type Stats = ImportStatistics;

    fn name(&self) -> &str {
        "classification"
    }

    fn required_fields(&self, _strategy: MatchStrategy) -> Vec<&'static str> {
        Vec::new()
    }

    fn supports_partial_execute(&self) -> bool {
        false
    }

    async fn parse(
        &self,
        client: &ApiClient,
        plan_id: &i64,
        _options: &ParseOptions,
    ) -> ApiResult<ParseResponse> {
        let items = Self::items(client, *plan_id).await?;
        if items.is_empty() {
            return Err(Self::invalid(client, format!("plan {} has no items", plan_id)));
        }

        let preview_data = items
            .iter()
            .take(PREVIEW_ROWS)
            .map(|item| {
                vec![
                    json!(item.id),
                    json!(item.charge_item_code),
                    json!(item.charge_item_name),
                    json!(item.final_dimension_name),
                    json!(item.ai_confidence),
                ]
            })
            .collect();
        Ok(ParseResponse {
            session_id: plan_id.to_string(),
            sheet_names: Vec::new(),
            current_sheet: None,
            headers: vec![
                "item_id".into(),
                "charge_item_code".into(),
                "charge_item_name".into(),
                "dimension".into(),
                "ai_confidence".into(),
            ],
            preview_data,
            total_rows: items.len() as u64,
            skip_rows: 0,
            header_row: None,
            suggested_mapping: FieldMapping::new(),
        })
    }

    async fn extract_values(
        &self,
        client: &ApiClient,
        session: &ImportSession<'_, i64>,
        _field_mapping: &FieldMapping,
        _strategy: MatchStrategy,
    ) -> ApiResult<ExtractResponse> {
        let items = Self::items(client, *session.input).await?;
        let unique_values = items
            .into_iter()
            .map(|item| {
                let candidate = item.final_dimension_id.map(|id| EntityCandidate {
                    id,
                    code: id.to_string(),
                    name: item.final_dimension_name.clone().unwrap_or_default(),
                    full_path: item.final_dimension_path.clone(),
                    score: if item.is_adjusted { Some(1.0) } else { item.ai_confidence },
                });
                UniqueValueMatch {
                    value: item.charge_item_name,
                    source: Some(item.id.to_string()),
                    count: 1,
                    candidates: candidate.into_iter().collect(),
                }
            })
            .collect();
        Ok(ExtractResponse {
            unique_values,
            candidate_entities: Vec::new(),
        })
    }

    async fn preview(
        &self,
        client: &ApiClient,
        session: &ImportSession<'_, i64>,
        mappings: &[PlanItemMapping],
    ) -> ApiResult<PreviewResponse<ClassificationPreviewItem, ImportStatistics>> {
        let plan_id = *session.input;
        let items: HashMap<i64, PlanItem> = Self::items(client, plan_id)
            .await?
            .into_iter()
            .map(|item| (item.id, item))
            .collect();

        let mut changes = Vec::new();
        for mapping in mappings {
            let item = mapping.item_id().and_then(|id| items.get(&id));
            let Some(item) = item else {
                return Err(Self::invalid(
                    client,
                    format!("'{}' is not an item of plan {}", mapping.value, plan_id),
                ));
            };
            if mapping.dimension_id != item.final_dimension_id {
                changes.push((item.id, mapping.dimension_id));
            }
        }
        for (item_id, dimension_id) in &changes {
            classification::set_item_dimension(client, plan_id, *item_id, *dimension_id).await?;
        }
        debug!(plan_id, changed = changes.len(), "Plan items updated");

        let summary = classification::preview_submit(client, plan_id).await?;
        let listed = summary.new_items.len() as u64 + summary.overwrite_items.len() as u64;
        let classified = summary.new_count.checked_add(summary.overwrite_count);
        if classified.map_or(true, |sum| sum > summary.total_items)
            || listed != summary.new_count + summary.overwrite_count
        {
            let err = ApiError::InvalidResponse(format!(
                "submit preview of plan {} counts {} new and {} overwritten of {}",
                plan_id, summary.new_count, summary.overwrite_count, summary.total_items
            ));
            client.context().report(&err);
            return Err(err);
        }

        let mut rows: Vec<ClassificationPreviewItem> = summary
            .new_items
            .iter()
            .map(|item| preview_row(item, PreviewStatus::New))
            .chain(
                summary
                    .overwrite_items
                    .iter()
                    .map(|item| preview_row(item, PreviewStatus::Update)),
            )
            .collect();

        let mut unassigned: Vec<&PlanItem> = items
            .values()
            .filter(|item| !rows.iter().any(|row| row.item_id == item.id))
            .collect();
        unassigned.sort_by_key(|item| item.id);
        rows.extend(unassigned.into_iter().map(|item| ClassificationPreviewItem {
            item_id: item.id,
            charge_item_name: item.charge_item_name.clone(),
            dimension_id: None,
            dimension_name: None,
            dimension_path: None,
            old_dimension_name: None,
            status: PreviewStatus::Skip,
            message: "no dimension assigned".to_string(),
        }));

        let statistics = ImportStatistics {
            total: summary.total_items,
            new_count: summary.new_count,
            update_count: summary.overwrite_count,
            skip_count: summary.total_items - summary.new_count - summary.overwrite_count,
            error_count: 0,
        };
        Ok(PreviewResponse {
            preview_items: rows,
            statistics,
        })
    }

    async fn execute(
        &self,
        client: &ApiClient,
        session: &ImportSession<'_, i64>,
        _previewed: &[ClassificationPreviewItem],
        _confirmed: Option<&[ClassificationPreviewItem]>,
    ) -> ApiResult<ExecuteResponse> {
        let plan_id = *session.input;
        let result = classification::submit_plan(client, plan_id).await?;
        info!(
            plan_id,
            new = result.new_count,
            overwritten = result.overwrite_count,
            "Plan submitted"
        );

        let errors = if result.success {
            Vec::new()
        } else {
            let mut key = BTreeMap::new();
            key.insert("plan_id".to_string(), Value::from(plan_id));
            vec![RowError {
                key,
                reason: result.message.clone(),
            }]
        };
        Ok(ExecuteResponse {
            success: result.success,
            report: ImportReport {
                success_count: result.new_count,
                update_count: result.overwrite_count,
                skip_count: 0,
                error_count: errors.len() as u64,
                errors,
            },
        })
    }
}
