//! Batch data-template import
//!
//! The server has no session for templates: definition documents and SQL
//! files are paired by table name and sent whole to
//! `batch-upload/preview`, then to `batch-upload`. Parse and extract run
//! locally on the file names; each table becomes one unique value whose
//! only candidate is the table itself, and mapping it to nothing leaves
//! the table out.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{ImportDomain, ImportSession};
use crate::api::data_templates;
use crate::error::{ApiError, ApiResult};
use crate::http::ApiClient;
use crate::types::{
    BatchResult, DataTemplate, DataTemplatePreviewItem, DataTemplateQuery, EntityCandidate,
    EntityValueMapping, ExecuteResponse, ExtractResponse, FieldMapping, ImportReport,
    ImportStatistics, MatchStrategy, ParseOptions, ParseResponse, PreviewResponse, PreviewStatus,
    RowError, TemplateFiles, UniqueValueMatch, UploadFile,
};

const PAGE_SIZE: u32 = 1000;

/// Data template definitions and SQL
#[derive(Debug, Clone, Copy, Default)]
pub struct DataTemplateImport;

/// Files found for one table
#[derive(Debug, Default)]
struct TableFiles {
    table_name_cn: Option<String>,
    definition: Option<String>,
    sql: Option<String>,
}

fn stem(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}

fn is_table_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `交接班记录(TB_CIS_JJBJL).md` -> `("交接班记录", "TB_CIS_JJBJL")`; full-width
/// brackets are accepted too.
fn definition_table(file_name: &str) -> Option<(String, String)> {
    let name = stem(file_name);
    let inner = name.strip_suffix(')').or_else(|| name.strip_suffix('）'))?;
    let open = inner.rfind(['(', '（'])?;
    let table = &inner[open..];
    let table = table
        .strip_prefix('(')
        .or_else(|| table.strip_prefix('（'))?;
    let table_name_cn = inner[..open].trim();
    if table_name_cn.is_empty() || !is_table_name(table) {
        return None;
    }
    Some((table_name_cn.to_string(), table.to_string()))
}

/// `TB_CIS_JJBJL.sql` -> `TB_CIS_JJBJL`
fn sql_table(file_name: &str) -> Option<String> {
    let name = stem(file_name);
    is_table_name(name).then(|| name.to_string())
}

impl DataTemplateImport {
    fn invalid(client: &ApiClient, message: String) -> ApiError {
        let err = ApiError::Validation(message);
        client.context().report(&err);
        err
    }

    /// Pair files by table name, rejecting names the server would ignore.
    fn tables(client: &ApiClient, files: &TemplateFiles) -> ApiResult<BTreeMap<String, TableFiles>> {
        if files.is_empty() {
            return Err(Self::invalid(client, "no template files given".to_string()));
        }

        let mut tables: BTreeMap<String, TableFiles> = BTreeMap::new();
        for file in &files.definition_files {
            let Some((table_name_cn, table)) = definition_table(&file.file_name) else {
                return Err(Self::invalid(
                    client,
                    format!(
                        "'{}' is not named 中文名(TABLE_NAME).ext",
                        file.file_name
                    ),
                ));
            };
            let entry = tables.entry(table.clone()).or_default();
            if entry.definition.is_some() {
                return Err(Self::invalid(
                    client,
                    format!("more than one definition file for {}", table),
                ));
            }
            entry.table_name_cn = Some(table_name_cn);
            entry.definition = Some(file.file_name.clone());
        }
        for file in &files.sql_files {
            let Some(table) = sql_table(&file.file_name) else {
                return Err(Self::invalid(
                    client,
                    format!("'{}' is not named TABLE_NAME.sql", file.file_name),
                ));
            };
            let entry = tables.entry(table.clone()).or_default();
            if entry.sql.is_some() {
                return Err(Self::invalid(client, format!("more than one SQL file for {}", table)));
            }
            entry.sql = Some(file.file_name.clone());
        }
        Ok(tables)
    }

    async fn existing(client: &ApiClient) -> ApiResult<HashMap<String, DataTemplate>> {
        let mut existing = HashMap::new();
        let mut page = 1;
        loop {
            let query = DataTemplateQuery {
                page: Some(page),
                size: Some(PAGE_SIZE),
                ..Default::default()
            };
            let batch = data_templates::list(client, &query).await?;
            let fetched = batch.items.len();
            existing.extend(batch.items.into_iter().map(|t| (t.table_name.clone(), t)));
            if fetched < PAGE_SIZE as usize || existing.len() as u64 >= batch.total {
                return Ok(existing);
            }
            page += 1;
        }
    }

    /// Only the files named by `names`.
    fn select(files: &TemplateFiles, names: &HashSet<&str>) -> TemplateFiles {
        let pick = |list: &[UploadFile]| {
            list.iter()
                .filter(|f| names.contains(f.file_name.as_str()))
                .cloned()
                .collect()
        };
        TemplateFiles {
            definition_files: pick(&files.definition_files),
            sql_files: pick(&files.sql_files),
        }
    }
}

fn report_from(result: &BatchResult) -> ImportReport {
    let action = |detail: &Value| detail.get("action").and_then(Value::as_str).map(str::to_string);
    let updated = result
        .details
        .iter()
        .filter(|d| action(d).as_deref() == Some("updated"))
        .count() as u64;
    let errors = result
        .details
        .iter()
        .filter(|d| action(d).as_deref() == Some("failed"))
        .map(|d| {
            let mut key = BTreeMap::new();
            key.insert(
                "table_name".to_string(),
                d.get("table_name").cloned().unwrap_or(Value::Null),
            );
            RowError {
                key,
                reason: d
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }
        })
        .collect();

    ImportReport {
        success_count: result.success_count.saturating_sub(updated),
        update_count: updated,
        skip_count: result.skipped_count,
        error_count: result.failed_count,
        errors,
    }
}

#[async_trait]
impl ImportDomain for DataTemplateImport {
    type Input = TemplateFiles;
    type Mapping = EntityValueMapping;
    type Item = DataTemplatePreviewItem;
    type Stats = ImportStatistics;

    fn name(&self) -> &str {
        "data-templates"
    }

    fn required_fields(&self, _strategy: MatchStrategy) -> Vec<&'static str> {
        Vec::new()
    }

    async fn parse(
        &self,
        client: &ApiClient,
        files: &TemplateFiles,
        _options: &ParseOptions,
    ) -> ApiResult<ParseResponse> {
        let tables = Self::tables(client, files)?;
        let mut rows = Vec::with_capacity(files.len());
        for (table, found) in &tables {
            if let Some(name) = &found.definition {
                rows.push(vec![json!(name), json!("definition"), json!(table)]);
            }
            if let Some(name) = &found.sql {
                rows.push(vec![json!(name), json!("sql"), json!(table)]);
            }
        }

        Ok(ParseResponse {
            session_id: format!("batch-{}", uuid::Uuid::new_v4()),
            sheet_names: Vec::new(),
            current_sheet: None,
            headers: vec!["file_name".into(), "kind".into(), "table_name".into()],
            total_rows: rows.len() as u64,
            preview_data: rows,
            skip_rows: 0,
            header_row: None,
            suggested_mapping: FieldMapping::new(),
        })
    }

    async fn extract_values(
        &self,
        client: &ApiClient,
        session: &ImportSession<'_, TemplateFiles>,
        _field_mapping: &FieldMapping,
        _strategy: MatchStrategy,
    ) -> ApiResult<ExtractResponse> {
        let tables = Self::tables(client, session.input)?;
        let existing = Self::existing(client).await?;

        let unique_values = tables
            .iter()
            .map(|(table, found)| {
                let current = existing.get(table);
                UniqueValueMatch {
                    value: table.clone(),
                    source: None,
                    count: u64::from(found.definition.is_some()) + u64::from(found.sql.is_some()),
                    candidates: vec![EntityCandidate {
                        id: current.map_or(0, |t| t.id),
                        code: table.clone(),
                        name: found
                            .table_name_cn
                            .clone()
                            .or_else(|| current.map(|t| t.table_name_cn.clone()))
                            .unwrap_or_else(|| table.clone()),
                        full_path: None,
                        score: Some(1.0),
                    }],
                }
            })
            .collect();
        let candidate_entities = existing
            .values()
            .map(|t| EntityCandidate {
                id: t.id,
                code: t.table_name.clone(),
                name: t.table_name_cn.clone(),
                full_path: None,
                score: None,
            })
            .collect();

        Ok(ExtractResponse {
            unique_values,
            candidate_entities,
        })
    }

    async fn preview(
        &self,
        client: &ApiClient,
        session: &ImportSession<'_, TemplateFiles>,
        mappings: &[EntityValueMapping],
    ) -> ApiResult<PreviewResponse<DataTemplatePreviewItem, ImportStatistics>> {
        if let Some(renamed) = mappings
            .iter()
            .find(|m| m.entity_code.as_deref().is_some_and(|code| code != m.value))
        {
            return Err(Self::invalid(
                client,
                format!("{} can only be imported under its own table name", renamed.value),
            ));
        }

        let tables = Self::tables(client, session.input)?;
        let excluded: HashSet<&str> = mappings
            .iter()
            .filter(|m| m.entity_code.is_none())
            .map(|m| m.value.as_str())
            .collect();
        let included: HashSet<&str> = tables
            .iter()
            .filter(|(table, _)| !excluded.contains(table.as_str()))
            .flat_map(|(_, found)| found.definition.iter().chain(found.sql.iter()))
            .map(String::as_str)
            .collect();
        if included.is_empty() {
            return Err(Self::invalid(client, "every table was left out".to_string()));
        }

        let upload = Self::select(session.input, &included);
        let existing = Self::existing(client).await?;
        let batch =
            data_templates::preview_batch_upload(client, &upload.definition_files, &upload.sql_files)
                .await?;

        let categories = batch
            .matched
            .checked_add(batch.partial)
            .and_then(|sum| sum.checked_add(batch.unmatched));
        if batch.total != batch.items.len() as u64 || categories != Some(batch.total) {
            let err = ApiError::InvalidResponse(format!(
                "batch preview lists {} tables but reports {}",
                batch.items.len(),
                batch.total
            ));
            client.context().report(&err);
            return Err(err);
        }

        let mut items: Vec<DataTemplatePreviewItem> = batch
            .items
            .into_iter()
            .map(|item| {
                let status = if item.status == "unmatched" {
                    PreviewStatus::Error
                } else if existing.contains_key(&item.table_name) {
                    PreviewStatus::Update
                } else {
                    PreviewStatus::New
                };
                DataTemplatePreviewItem {
                    table_name: item.table_name,
                    table_name_cn: item.table_name_cn,
                    definition_file_name: item.definition_file_name,
                    sql_file_name: item.sql_file_name,
                    status,
                    message: item.message.unwrap_or_default(),
                }
            })
            .collect();
        items.extend(
            tables
                .into_iter()
                .filter(|(table, _)| excluded.contains(table.as_str()))
                .map(|(table, found)| DataTemplatePreviewItem {
                    table_name: table,
                    table_name_cn: found.table_name_cn,
                    definition_file_name: found.definition,
                    sql_file_name: found.sql,
                    status: PreviewStatus::Skip,
                    message: "left out".to_string(),
                }),
        );

        let count = |status: PreviewStatus| items.iter().filter(|i| i.status == status).count() as u64;
        let statistics = ImportStatistics {
            total: items.len() as u64,
            new_count: count(PreviewStatus::New),
            update_count: count(PreviewStatus::Update),
            skip_count: count(PreviewStatus::Skip),
            error_count: count(PreviewStatus::Error),
        };
        debug!(tables = statistics.total, "Batch template preview");
        Ok(PreviewResponse {
            preview_items: items,
            statistics,
        })
    }

    async fn execute(
        &self,
        client: &ApiClient,
        session: &ImportSession<'_, TemplateFiles>,
        previewed: &[DataTemplatePreviewItem],
        confirmed: Option<&[DataTemplatePreviewItem]>,
    ) -> ApiResult<ExecuteResponse> {
        let rows = confirmed.unwrap_or(previewed);
        let names: HashSet<&str> = rows
            .iter()
            .filter(|row| matches!(row.status, PreviewStatus::New | PreviewStatus::Update))
            .flat_map(|row| row.definition_file_name.iter().chain(row.sql_file_name.iter()))
            .map(String::as_str)
            .collect();
        let upload = Self::select(session.input, &names);
        if upload.is_empty() {
            return Err(Self::invalid(client, "no tables selected for import".to_string()));
        }

        let result =
            data_templates::batch_upload(client, &upload.definition_files, &upload.sql_files).await?;
        let report = report_from(&result);
        info!(
            files = upload.len(),
            created = report.success_count,
            updated = report.update_count,
            failed = report.error_count,
            "Template batch uploaded"
        );
        Ok(ExecuteResponse {
            success: result.failed_count == 0,
            report,
        })
    }
}
