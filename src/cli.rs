//! CLI argument parsing for the hvc binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "hvc", about = "Hospital value accounting administration client", version)]
pub struct Cli {
    /// Override HVC_API_URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Sign in and store the session
    Login {
        #[arg(short, long)]
        username: String,
        /// Read from the terminal when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user and active hospital
    Whoami,
    /// Hospital context
    #[command(subcommand)]
    Hospitals(HospitalCommand),
    /// Navigation menu for the current user
    Menus {
        /// Print the role permission tree instead
        #[arg(long)]
        permissions: bool,
    },
    /// Metric projects, topics and metrics
    #[command(subcommand)]
    Metrics(MetricCommand),
    /// Cost model node trees
    #[command(subcommand)]
    Model(ModelCommand),
    /// Data template ordering
    #[command(subcommand)]
    Templates(TemplateCommand),
    /// Run a spreadsheet import
    Import(ImportArgs),
    /// Download exports
    #[command(subcommand)]
    Export(ExportCommand),
}

#[derive(Subcommand)]
pub enum HospitalCommand {
    /// Hospitals you may activate
    List,
    /// Make a hospital the active context
    Activate { id: i64 },
    /// Drop the active hospital
    Clear,
}

#[derive(Subcommand)]
pub enum MetricCommand {
    /// Print the project/topic/metric tree
    Tree,
    /// Set the order of one sibling group; every sibling id must be listed
    Reorder {
        #[arg(long, value_enum)]
        scope: ScopeArg,
        /// Parent project (topics) or topic (metrics)
        #[arg(long)]
        parent: Option<i64>,
        #[arg(required = true, num_args = 1..)]
        ids: Vec<i64>,
    },
    /// Delete a project, topic or metric
    Delete {
        #[arg(value_enum)]
        kind: MetricKind,
        id: i64,
        /// Delete even when other items are affected
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScopeArg {
    Projects,
    Topics,
    Metrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MetricKind {
    Project,
    Topic,
    Metric,
}

#[derive(Subcommand)]
pub enum ModelCommand {
    /// Print the node tree of a model version
    Tree { version_id: i64 },
    /// Delete a node and its subtree
    DeleteNode {
        id: i64,
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum TemplateCommand {
    MoveUp { id: i64 },
    MoveDown { id: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImportKind {
    CostReports,
    ReferenceValues,
    DimensionItems,
    DataTemplates,
    Classification,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    #[arg(value_enum)]
    pub kind: ImportKind,
    /// One workbook; for data-templates any number of definition documents
    /// and `.sql` files; none for classification
    pub files: Vec<PathBuf>,
    #[arg(long)]
    pub sheet: Option<String>,
    #[arg(long)]
    pub skip_rows: Option<u32>,
    /// 1-based header row
    #[arg(long)]
    pub header_row: Option<u32>,
    /// Override a suggested column, as `field=column`
    #[arg(long = "map", value_parser = parse_mapping)]
    pub mappings: Vec<(String, String)>,
    #[arg(long, default_value = "code")]
    pub match_by: String,
    /// Required for dimension-items
    #[arg(long)]
    pub model_version_id: Option<i64>,
    /// Classification plan to submit
    #[arg(long)]
    pub plan_id: Option<i64>,
    /// 1-based preview row to leave out; repeatable
    #[arg(long = "exclude-row")]
    pub exclude_rows: Vec<usize>,
    /// Also write the preview rows to this CSV file
    #[arg(long)]
    pub preview_csv: Option<PathBuf>,
    /// Execute without asking
    #[arg(short, long)]
    pub yes: bool,
}

fn parse_mapping(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((field, column)) if !field.trim().is_empty() && !column.trim().is_empty() => {
            Ok((field.trim().to_string(), column.trim().to_string()))
        }
        _ => Err(format!("expected field=column, got '{}'", raw)),
    }
}

#[derive(Subcommand)]
pub enum ExportCommand {
    /// Cost benchmarks workbook
    CostBenchmarks {
        #[arg(long)]
        version_id: Option<i64>,
        #[arg(long)]
        department_code: Option<String>,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_login_parses() {
        let cli = Cli::parse_from(["hvc", "login", "-u", "admin", "--password", "x"]);
        assert!(matches!(cli.command, Command::Login { ref username, .. } if username == "admin"));
    }

    #[test]
    fn test_cli_import_with_overrides() {
        let cli = Cli::parse_from([
            "hvc",
            "import",
            "dimension-items",
            "维度.xlsx",
            "--model-version-id",
            "3",
            "--map",
            "item_code=收费编码",
            "--match-by",
            "name",
            "-y",
        ]);
        let Command::Import(args) = cli.command else {
            panic!("expected import");
        };
        assert_eq!(args.kind, ImportKind::DimensionItems);
        assert_eq!(args.model_version_id, Some(3));
        assert_eq!(args.mappings, vec![("item_code".to_string(), "收费编码".to_string())]);
        assert_eq!(args.match_by, "name");
        assert_eq!(args.files, vec![PathBuf::from("维度.xlsx")]);
        assert!(args.yes);
    }

    #[test]
    fn test_cli_template_files_and_exclusions() {
        let cli = Cli::parse_from([
            "hvc",
            "import",
            "data-templates",
            "门诊挂号(TB_MZ_GH).md",
            "TB_MZ_GH.sql",
            "--exclude-row",
            "2",
            "--exclude-row",
            "5",
        ]);
        let Command::Import(args) = cli.command else {
            panic!("expected import");
        };
        assert_eq!(args.files.len(), 2);
        assert_eq!(args.exclude_rows, vec![2, 5]);

        let cli = Cli::parse_from(["hvc", "import", "classification", "--plan-id", "9"]);
        let Command::Import(args) = cli.command else {
            panic!("expected import");
        };
        assert!(args.files.is_empty());
        assert_eq!(args.plan_id, Some(9));
    }

    #[test]
    fn test_cli_bad_mapping_rejected() {
        assert!(Cli::try_parse_from(["hvc", "import", "cost-reports", "a.xlsx", "--map", "nocolumn"]).is_err());
    }

    #[test]
    fn test_cli_metric_reorder_parses() {
        let cli = Cli::parse_from(["hvc", "metrics", "reorder", "--scope", "metrics", "--parent", "7", "3", "1", "2"]);
        let Command::Metrics(MetricCommand::Reorder { scope, parent, ids }) = cli.command else {
            panic!("expected reorder");
        };
        assert_eq!(scope, ScopeArg::Metrics);
        assert_eq!(parent, Some(7));
        assert_eq!(ids, vec![3, 1, 2]);
    }
}
