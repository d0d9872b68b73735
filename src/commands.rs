//! Subcommand handlers for the hvc binary

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use hospital_value_client::api;
use hospital_value_client::http::ApiClient;
use hospital_value_client::services::render::{self, TabularRow};
use hospital_value_client::services::tree::{self, DeleteOutcome, DeleteTarget, Impact, MoveDirection, MoveOutcome, ReorderScope};
use hospital_value_client::services::wizard::{
    ClassificationImport, CostReportImport, DataTemplateImport, DimensionItemImport, ImportDomain,
    ImportWizard, ReferenceValueImport,
};
use hospital_value_client::services::menus;
use hospital_value_client::types::{
    CostBenchmarkFilter, DepartmentValueMapping, DimensionValueMapping, EntityCandidate,
    EntityValueMapping, MatchStrategy, ParseOptions, PlanItemMapping, PreviewRow, PreviewStatus,
    TemplateFiles, UniqueValueMatch, UploadFile,
};

use crate::cli::{
    Command, ExportCommand, HospitalCommand, ImportArgs, ImportKind, MetricCommand, MetricKind,
    ModelCommand, ScopeArg, TemplateCommand,
};

pub async fn run(client: &ApiClient, command: Command) -> Result<()> {
    match command {
        Command::Login { username, password } => login(client, &username, password).await,
        Command::Logout => {
            api::auth::logout(client)?;
            println!("Signed out");
            Ok(())
        }
        Command::Whoami => whoami(client),
        Command::Hospitals(cmd) => hospitals(client, cmd).await,
        Command::Menus { permissions } => {
            if permissions {
                print_json(&menus::permission_menu_tree())
            } else {
                print_json(&menus::visible_menus(client.context()))
            }
        }
        Command::Metrics(cmd) => metrics(client, cmd).await,
        Command::Model(cmd) => model(client, cmd).await,
        Command::Templates(cmd) => {
            let (id, direction) = match cmd {
                TemplateCommand::MoveUp { id } => (id, MoveDirection::Up),
                TemplateCommand::MoveDown { id } => (id, MoveDirection::Down),
            };
            match tree::move_template(client, id, direction).await? {
                MoveOutcome::Moved => println!("Moved template {}", id),
                MoveOutcome::AtBoundary => println!("Template {} is already at the edge", id),
            }
            Ok(())
        }
        Command::Import(args) => import(client, args).await,
        Command::Export(ExportCommand::CostBenchmarks {
            version_id,
            department_code,
            out_dir,
        }) => {
            let filter = CostBenchmarkFilter {
                version_id,
                department_code,
                ..Default::default()
            };
            let file = api::reports::export_cost_benchmarks(client, &filter).await?;
            let path = file.save_to(&out_dir, "cost-benchmarks.xlsx")?;
            println!("Saved {}", path.display());
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// Session
// ============================================================================

async fn login(client: &ApiClient, username: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => rpassword::prompt_password("Password: ").context("Failed to read password")?,
    };
    let user = api::auth::login(client, username, &password).await?;
    println!("Signed in as {}", user.display_name());

    let hospitals = api::hospitals::fetch_accessible(client).await?;
    match client.context().current_hospital() {
        Some(hospital) => println!("Active hospital: {}", hospital.name),
        None if !hospitals.is_empty() => println!("Activate a hospital with `hvc hospitals activate <id>`"),
        None => {}
    }
    Ok(())
}

fn whoami(client: &ApiClient) -> Result<()> {
    let ctx = client.context();
    let Some(user) = ctx.user() else {
        println!("Not signed in");
        return Ok(());
    };
    let role = user.role_type.map(|r| r.as_str()).unwrap_or("-");
    println!("{} ({})", user.display_name(), role);
    match ctx.current_hospital() {
        Some(h) => println!("Hospital: {} [{}]", h.name, h.id),
        None => println!("Hospital: none"),
    }
    Ok(())
}

async fn hospitals(client: &ApiClient, cmd: HospitalCommand) -> Result<()> {
    match cmd {
        HospitalCommand::List => {
            let hospitals = api::hospitals::fetch_accessible(client).await?;
            let current = client.context().current_hospital_id();
            let rows: Vec<Vec<String>> = hospitals
                .iter()
                .map(|h| {
                    vec![
                        if current == Some(h.id) { "*" } else { "" }.to_string(),
                        h.id.to_string(),
                        h.code.clone(),
                        h.name.clone(),
                    ]
                })
                .collect();
            print!("{}", render::table(&["", "id", "code", "name"], &rows));
        }
        HospitalCommand::Activate { id } => {
            api::hospitals::fetch_accessible(client).await?;
            let hospital = api::hospitals::activate(client, id).await?;
            println!("Active hospital: {}", hospital.name);
        }
        HospitalCommand::Clear => {
            api::hospitals::clear_current(client)?;
            println!("No active hospital");
        }
    }
    Ok(())
}

// ============================================================================
// Trees
// ============================================================================

async fn metrics(client: &ApiClient, cmd: MetricCommand) -> Result<()> {
    match cmd {
        MetricCommand::Tree => {
            let metric_tree = tree::metric_tree(client).await?;
            print!("{}", render::metric_outline(&metric_tree));
        }
        MetricCommand::Reorder { scope, parent, ids } => {
            let scope = match (scope, parent) {
                (ScopeArg::Projects, _) => ReorderScope::Projects,
                (ScopeArg::Topics, Some(project_id)) => ReorderScope::Topics { project_id },
                (ScopeArg::Metrics, Some(topic_id)) => ReorderScope::Metrics { topic_id },
                (_, None) => anyhow::bail!("--parent is required for topics and metrics"),
            };
            tree::reorder(client, scope, &ids).await?;
            println!("Order saved");
        }
        MetricCommand::Delete { kind, id, force } => {
            let target = match kind {
                MetricKind::Project => DeleteTarget::Project(id),
                MetricKind::Topic => DeleteTarget::Topic(id),
                MetricKind::Metric => DeleteTarget::Metric(id),
            };
            report_delete(tree::delete_node(client, target, force).await?);
        }
    }
    Ok(())
}

async fn model(client: &ApiClient, cmd: ModelCommand) -> Result<()> {
    match cmd {
        ModelCommand::Tree { version_id } => {
            let roots = tree::model_tree(client, version_id).await?;
            print!("{}", render::model_outline(&roots));
        }
        ModelCommand::DeleteNode { id, force } => {
            report_delete(tree::delete_node(client, DeleteTarget::ModelNode(id), force).await?);
        }
    }
    Ok(())
}

fn report_delete(outcome: DeleteOutcome) {
    match outcome {
        DeleteOutcome::Deleted {
            topics,
            metrics,
            nodes,
            ..
        } => println!("Deleted (topics: {}, metrics: {}, nodes: {})", topics, metrics, nodes),
        DeleteOutcome::NeedsAck(report) => {
            match report.impact {
                Impact::Cascade { topics, metrics } => {
                    println!("This also deletes {} topics and {} metrics.", topics, metrics)
                }
                Impact::Dependents { affected, .. } => {
                    println!("{} metrics reference this one:", affected.len());
                    for m in affected {
                        println!("  {} #{}", m.name_cn, m.id);
                    }
                }
                Impact::Subtree { descendants } => {
                    println!("This also deletes {} nodes below it.", descendants)
                }
            }
            println!("Nothing was deleted. Re-run with --force to confirm.");
        }
    }
}

// ============================================================================
// Import
// ============================================================================

/// Builds the value mapping for a unique value from the chosen candidate.
trait AutoMapping: Sized {
    fn from_choice(value: &UniqueValueMatch, choice: Option<&EntityCandidate>) -> Self;
}

impl AutoMapping for DepartmentValueMapping {
    fn from_choice(value: &UniqueValueMatch, choice: Option<&EntityCandidate>) -> Self {
        Self {
            value: value.value.clone(),
            department_code: choice.map(|c| c.code.clone()),
        }
    }
}

impl AutoMapping for DimensionValueMapping {
    fn from_choice(value: &UniqueValueMatch, choice: Option<&EntityCandidate>) -> Self {
        Self {
            value: value.value.clone(),
            source: value.source.clone().unwrap_or_default(),
            dimension_codes: choice.map(|c| vec![c.code.clone()]).unwrap_or_default(),
        }
    }
}

impl AutoMapping for EntityValueMapping {
    fn from_choice(value: &UniqueValueMatch, choice: Option<&EntityCandidate>) -> Self {
        Self {
            value: value.value.clone(),
            entity_code: choice.map(|c| c.code.clone()),
        }
    }
}

impl AutoMapping for PlanItemMapping {
    fn from_choice(value: &UniqueValueMatch, choice: Option<&EntityCandidate>) -> Self {
        Self {
            value: value.value.clone(),
            source: value.source.clone().unwrap_or_default(),
            dimension_id: choice.map(|c| c.id),
        }
    }
}

async fn import(client: &ApiClient, args: ImportArgs) -> Result<()> {
    match args.kind {
        ImportKind::CostReports => {
            let workbook = workbook(&args).await?;
            run_import(client, CostReportImport, workbook, &args).await
        }
        ImportKind::ReferenceValues => {
            let workbook = workbook(&args).await?;
            run_import(client, ReferenceValueImport, workbook, &args).await
        }
        ImportKind::DimensionItems => {
            let model_version_id = args
                .model_version_id
                .context("--model-version-id is required for dimension-items")?;
            let workbook = workbook(&args).await?;
            run_import(client, DimensionItemImport { model_version_id }, workbook, &args).await
        }
        ImportKind::DataTemplates => {
            let files = template_files(&args.files).await?;
            run_import(client, DataTemplateImport, files, &args).await
        }
        ImportKind::Classification => {
            let plan_id = args.plan_id.context("--plan-id is required for classification")?;
            run_import(client, ClassificationImport, plan_id, &args).await
        }
    }
}

async fn read_upload(path: &Path) -> Result<UploadFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.xlsx".to_string());
    Ok(UploadFile::new(file_name, bytes))
}

async fn workbook(args: &ImportArgs) -> Result<UploadFile> {
    match args.files.as_slice() {
        [path] => read_upload(path).await,
        other => anyhow::bail!("expected one workbook, got {} files", other.len()),
    }
}

/// `.sql` files go in as SQL, everything else as definition documents.
async fn template_files(paths: &[PathBuf]) -> Result<TemplateFiles> {
    let mut files = TemplateFiles::default();
    for path in paths {
        let file = read_upload(path).await?;
        let is_sql = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"));
        if is_sql {
            files.sql_files.push(file);
        } else {
            files.definition_files.push(file);
        }
    }
    Ok(files)
}

/// Candidate for one unique value. Exact and sole matches are taken as is;
/// anything else is asked about, or left unmapped when not interactive.
fn choose(value: &UniqueValueMatch, interactive: bool) -> Result<Option<&EntityCandidate>> {
    if let Some(candidate) = value.unambiguous_candidate() {
        return Ok(Some(candidate));
    }
    if value.candidates.is_empty() || !interactive {
        return Ok(None);
    }

    println!("'{}' ({} rows) has several candidates:", value.value, value.count);
    for (i, candidate) in value.candidates.iter().enumerate() {
        let score = candidate
            .score
            .map(|s| format!(" ({})", s))
            .unwrap_or_default();
        let path = candidate.full_path.as_deref().unwrap_or(&candidate.name);
        println!("  {}) {} {}{}", i + 1, candidate.code, path, score);
    }
    loop {
        let answer = prompt("Pick a number, blank to leave it unmapped: ")?;
        if answer.is_empty() {
            return Ok(None);
        }
        match answer.parse::<usize>() {
            Ok(n) if (1..=value.candidates.len()).contains(&n) => {
                return Ok(Some(&value.candidates[n - 1]))
            }
            _ => println!("Not one of the choices"),
        }
    }
}

/// `"2, 5 7"` -> `[2, 5, 7]`
fn parse_row_list(raw: &str) -> Result<Vec<usize>> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<usize>()
                .with_context(|| format!("'{}' is not a row number", part))
        })
        .collect()
}

/// Non-error preview rows minus the 1-based `excluded` row numbers.
fn confirmed_rows<I: PreviewRow + Clone>(items: &[I], excluded: &[usize]) -> Result<Vec<I>> {
    if let Some(row) = excluded.iter().find(|&&n| n == 0 || n > items.len()) {
        anyhow::bail!("row {} is not in the preview (1-{})", row, items.len());
    }
    Ok(items
        .iter()
        .enumerate()
        .filter(|(i, item)| item.status() != PreviewStatus::Error && !excluded.contains(&(i + 1)))
        .map(|(_, item)| item.clone())
        .collect())
}

async fn run_import<D>(client: &ApiClient, domain: D, input: D::Input, args: &ImportArgs) -> Result<()>
where
    D: ImportDomain,
    D::Mapping: AutoMapping,
    D::Item: TabularRow,
{
    let strategy: MatchStrategy = args.match_by.parse().map_err(anyhow::Error::msg)?;
    let options = ParseOptions {
        sheet_name: args.sheet.clone(),
        skip_rows: args.skip_rows,
        header_row: args.header_row,
    };
    let interactive = !args.yes;

    let mut wizard = ImportWizard::new(domain, client.clone());

    let parsed = wizard.parse(&input, &options).await?;
    println!("{} rows, columns: {}", parsed.total_rows, parsed.headers.join(", "));

    let mut mapping = wizard.field_mapping().clone();
    for (field, column) in &args.mappings {
        mapping.insert(field.clone(), column.clone());
    }
    for (field, column) in &mapping {
        println!("  {} <- {}", field, column);
    }

    let extracted = wizard.extract_values(mapping, strategy).await?;
    let mut unmapped = Vec::new();
    let mut mappings: Vec<D::Mapping> = Vec::with_capacity(extracted.unique_values.len());
    for value in &extracted.unique_values {
        let choice = choose(value, interactive)?;
        if choice.is_none() {
            unmapped.push(value.value.as_str());
        }
        mappings.push(D::Mapping::from_choice(value, choice));
    }
    println!("{} distinct values, {} left unmapped", mappings.len(), unmapped.len());
    if !unmapped.is_empty() {
        println!("  unmapped (their rows are skipped): {}", unmapped.join(", "));
    }

    let preview = wizard.generate_preview(mappings).await?;
    print!("{}", render::preview_table(preview));
    if let Some(path) = &args.preview_csv {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        render::write_csv(&preview.preview_items, file)?;
        println!("Preview written to {}", path.display());
    }

    let mut excluded = args.exclude_rows.clone();
    if interactive {
        let answer = prompt("Rows to leave out (e.g. 2,5), blank for none: ")?;
        excluded.extend(parse_row_list(&answer)?);
    }
    let confirmed = confirmed_rows(&preview.preview_items, &excluded)?;
    if confirmed.is_empty() {
        println!("Nothing to import");
        return Ok(());
    }
    if interactive && !confirm(&format!("Import {} rows?", confirmed.len()))? {
        println!("Import cancelled");
        return Ok(());
    }

    let outcome = wizard.execute(Some(confirmed)).await?;
    print!("{}", render::report_table(&outcome.report));
    if !outcome.success {
        anyhow::bail!("Import failed");
    }
    info!(domain = wizard.domain().name(), "Import finished");
    Ok(())
}

fn prompt(question: &str) -> Result<String> {
    print!("{}", question);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().to_string())
}

fn confirm(question: &str) -> Result<bool> {
    let answer = prompt(&format!("{} [y/N] ", question))?;
    Ok(matches!(answer.as_str(), "y" | "Y" | "yes"))
}
