//! Plain-text rendering of trees, preview tables and import reports

use std::io::Write;

use crate::types::{
    ClassificationPreviewItem, CostReportPreviewItem, DataTemplatePreviewItem,
    DimensionImportPreviewItem, ImportReport, MetricTree, MetricTreeNode, ModelNode,
    PreviewResponse, PreviewTally, ReferenceValuePreviewItem,
};

// ============================================================================
// Tree outlines
// ============================================================================

/// Indented outline of the metric tree, one node per line.
pub fn metric_outline(tree: &MetricTree) -> String {
    fn visit(nodes: &[MetricTreeNode], depth: usize, out: &mut String) {
        for node in nodes {
            let kind = match node.metric_type {
                Some(t) => format!("{:?}", t).to_lowercase(),
                None => format!("{:?}", node.node_type).to_lowercase(),
            };
            out.push_str(&format!("{}{} [{}] #{}\n", "  ".repeat(depth), node.name, kind, node.id));
            visit(node.children(), depth + 1, out);
        }
    }

    let mut out = String::new();
    visit(&tree.items, 0, &mut out);
    out
}

/// Indented outline of a model version's node tree.
pub fn model_outline(roots: &[ModelNode]) -> String {
    fn visit(nodes: &[ModelNode], depth: usize, out: &mut String) {
        for node in nodes {
            let weight = node
                .weight
                .map(|w| format!(" weight={}", w))
                .unwrap_or_default();
            out.push_str(&format!(
                "{}{} ({}){} #{}\n",
                "  ".repeat(depth),
                node.name,
                node.code,
                weight,
                node.id
            ));
            visit(node.children(), depth + 1, out);
        }
    }

    let mut out = String::new();
    visit(roots, 0, &mut out);
    out
}

// ============================================================================
// Tables
// ============================================================================

/// A row that can be shown in a table or exported as CSV
pub trait TabularRow {
    fn headers() -> &'static [&'static str];
    fn cells(&self) -> Vec<String>;
}

/// Terminal columns taken by one character: 0 for combining marks, 2 for
/// East Asian wide and fullwidth forms, 1 otherwise.
fn char_width(c: char) -> usize {
    match c as u32 {
        0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF | 0xFE20..=0xFE2F => 0,
        0x303F => 1,
        0x1100..=0x115F
        | 0x2E80..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6
        | 0x20000..=0x3FFFD => 2,
        _ => 1,
    }
}

fn display_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

fn pad(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(display_width(s));
    format!("{}{}", s, " ".repeat(fill))
}

/// Column-aligned table with a header rule.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(display_width(cell));
        }
    }

    let line = |cells: Vec<String>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| pad(c, *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = line(headers.iter().map(|h| h.to_string()).collect());
    out.push('\n');
    out.push_str(&line(widths.iter().map(|w| "-".repeat(*w)).collect()));
    out.push('\n');
    for row in rows {
        out.push_str(&line(row.clone()));
        out.push('\n');
    }
    out
}

pub fn rows_table<R: TabularRow>(rows: &[R]) -> String {
    let cells: Vec<Vec<String>> = rows.iter().map(R::cells).collect();
    table(R::headers(), &cells)
}

/// Numbered preview rows followed by the statistics line. Row numbers are
/// 1-based and are what `--exclude-row` refers to.
pub fn preview_table<R: TabularRow, S: PreviewTally>(preview: &PreviewResponse<R, S>) -> String {
    let headers: Vec<&str> = std::iter::once("#").chain(R::headers().iter().copied()).collect();
    let rows: Vec<Vec<String>> = preview
        .preview_items
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut cells = vec![(i + 1).to_string()];
            cells.extend(row.cells());
            cells
        })
        .collect();
    let mut out = table(&headers, &rows);
    out.push_str(&format!("total: {}\n", preview.statistics.total()));
    out
}

/// Execute report: counts, then the failed rows with their reasons.
pub fn report_table(report: &ImportReport) -> String {
    let mut out = table(
        &["imported", "updated", "skipped", "errors"],
        &[vec![
            report.success_count.to_string(),
            report.update_count.to_string(),
            report.skip_count.to_string(),
            report.error_count.to_string(),
        ]],
    );
    if !report.errors.is_empty() {
        out.push('\n');
        let rows: Vec<Vec<String>> = report
            .errors
            .iter()
            .map(|e| vec![e.key_label(), e.reason.clone()])
            .collect();
        out.push_str(&table(&["row", "reason"], &rows));
    }
    out
}

/// Write rows as CSV with a header line.
pub fn write_csv<R: TabularRow, W: Write>(rows: &[R], writer: W) -> csv::Result<()> {
    let mut csv = csv::WriterBuilder::new().from_writer(writer);
    csv.write_record(R::headers())?;
    for row in rows {
        csv.write_record(row.cells())?;
    }
    csv.flush()?;
    Ok(())
}

fn money(v: f64) -> String {
    format!("{:.2}", v)
}

fn opt_money(v: Option<f64>) -> String {
    v.map(money).unwrap_or_default()
}

impl TabularRow for CostReportPreviewItem {
    fn headers() -> &'static [&'static str] {
        &[
            "status", "period", "department_code", "department_name", "source_name",
            "personnel", "material", "medicine", "depreciation", "other", "message",
        ]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.status.as_str().to_string(),
            self.period.clone(),
            self.department_code.clone(),
            self.department_name.clone(),
            self.excel_department_name.clone(),
            money(self.personnel_cost),
            money(self.material_cost),
            money(self.medicine_cost),
            money(self.depreciation_cost),
            money(self.other_cost),
            self.message.clone(),
        ]
    }
}

impl TabularRow for ReferenceValuePreviewItem {
    fn headers() -> &'static [&'static str] {
        &[
            "status", "period", "department_code", "department_name", "source_name",
            "reference", "doctor", "nurse", "tech", "message",
        ]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.status.as_str().to_string(),
            self.period.clone(),
            self.department_code.clone(),
            self.department_name.clone(),
            self.excel_department_name.clone(),
            money(self.reference_value),
            opt_money(self.doctor_reference_value),
            opt_money(self.nurse_reference_value),
            opt_money(self.tech_reference_value),
            self.message.clone(),
        ]
    }
}

impl TabularRow for DimensionImportPreviewItem {
    fn headers() -> &'static [&'static str] {
        &["status", "item_code", "item_name", "dimension", "path", "source", "message"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.status.as_str().to_string(),
            self.item_code.clone(),
            self.item_name.clone(),
            format!("{} {}", self.dimension_code, self.dimension_name).trim().to_string(),
            self.dimension_path.clone(),
            format!("{}={}", self.source, self.source_value),
            self.message.clone(),
        ]
    }
}

impl TabularRow for DataTemplatePreviewItem {
    fn headers() -> &'static [&'static str] {
        &["status", "table_name", "table_name_cn", "definition", "sql", "message"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.status.as_str().to_string(),
            self.table_name.clone(),
            self.table_name_cn.clone().unwrap_or_default(),
            self.definition_file_name.clone().unwrap_or_default(),
            self.sql_file_name.clone().unwrap_or_default(),
            self.message.clone(),
        ]
    }
}

impl TabularRow for ClassificationPreviewItem {
    fn headers() -> &'static [&'static str] {
        &["status", "item_id", "charge_item_name", "dimension", "replaces", "message"]
    }

    fn cells(&self) -> Vec<String> {
        let dimension = self
            .dimension_path
            .clone()
            .filter(|p| !p.is_empty())
            .or_else(|| self.dimension_name.clone())
            .unwrap_or_default();
        vec![
            self.status.as_str().to_string(),
            self.item_id.to_string(),
            self.charge_item_name.clone(),
            dimension,
            self.old_dimension_name.clone().unwrap_or_default(),
            self.message.clone(),
        ]
    }
}
