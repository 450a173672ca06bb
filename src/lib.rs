//! templopt - template registry optimizer
//!
//! Finds and eliminates duplicate template files (BLAKE3 fingerprints,
//! deterministic canonical selection, backup before delete), scores
//! components for compliance and runs phased maintenance pipelines.

pub mod actions;
pub mod cli;
pub mod compliance;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod scanner;

use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::actions::{
    build_plan, clean, execute, preview, EliminationMode, EliminationResult, ExecuteOptions,
};
use crate::cli::{
    Cli, Commands, DedupeAction, ExecuteArgs, OutputFormat, PipelineAction, QaAction, ScanArgs,
};
use crate::compliance::{
    test_all, test_type, validate_naming, validate_structure, QaReport, QaRun, QA_REPORT_FILE,
};
use crate::config::Config;
use crate::duplicates::{
    find_near_duplicates, group_duplicates, DuplicateDatabase, DuplicateGroup, GroupingStats,
    SimilarityEdge,
};
use crate::error::ExitCode;
use crate::orchestrator::{OrchestrationReport, Orchestrator, RunMode};
use crate::output::{
    dashboard, read_report, write_report, CsvOutput, JsonOutput, OptimizationReport,
    OptimizationStats, OPTIMIZATION_REPORT_FILE,
};
use crate::progress::{Progress, ProgressCallback};
use crate::scanner::{scan_with_progress, ScanOutcome};

/// Run the parsed command line and report the process exit code.
///
/// # Errors
///
/// Returns an error for unusable configuration, a missing template root,
/// a refused or failed elimination and unwritable reports.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(root) = cli.root {
        config.templates_root = root;
    }
    log::debug!(
        "Log level {}, template root {}",
        logging::current_level_name(),
        config.templates_root.display()
    );

    let app = App {
        config,
        quiet: cli.quiet,
    };
    match cli.command {
        Commands::Dedupe(args) => app.dedupe(args.action.unwrap_or(DedupeAction::Dashboard)),
        Commands::Qa(args) => app.qa(args.action.unwrap_or(QaAction::Dashboard)),
        Commands::Pipeline(args) => app.pipeline(args.action.unwrap_or(PipelineAction::Dashboard)),
    }
}

struct App {
    config: Config,
    quiet: bool,
}

/// A scan and everything derived from it.
struct Detection {
    outcome: ScanOutcome,
    groups: Vec<DuplicateGroup>,
    stats: GroupingStats,
    near: Vec<SimilarityEdge>,
}

fn print(text: &str) {
    println!("{}", text);
}

impl App {
    fn root(&self) -> &Path {
        &self.config.templates_root
    }

    fn progress(&self) -> Arc<dyn ProgressCallback> {
        Arc::new(Progress::new(self.quiet))
    }

    fn report_path(&self, file: &str) -> std::path::PathBuf {
        self.config.report_dir.join(file)
    }

    fn detect(&self, deep: bool) -> Result<Detection> {
        let outcome = scan_with_progress(
            self.root(),
            &self.config.walker_config(),
            Some(self.progress()),
        )
        .with_context(|| format!("failed to scan {}", self.root().display()))?;
        let (groups, stats) = group_duplicates(&outcome.records);
        let near = if deep {
            find_near_duplicates(
                &outcome.records,
                &groups,
                &self.config.dedupe.near_duplicate_extensions,
            )
        } else {
            Vec::new()
        };
        Ok(Detection {
            outcome,
            groups,
            stats,
            near,
        })
    }

    fn save_optimization(
        &self,
        detection_stats: &GroupingStats,
        near: usize,
        elimination: Option<EliminationResult>,
    ) -> Result<OptimizationReport> {
        let report = OptimizationReport::new(
            OptimizationStats::from_grouping(detection_stats, near),
            elimination,
        );
        write_report(&self.report_path(OPTIMIZATION_REPORT_FILE), &report)
            .context("failed to write optimization report")?;
        Ok(report)
    }

    fn dedupe(&self, action: DedupeAction) -> Result<ExitCode> {
        match action {
            DedupeAction::Scan(args) => self.dedupe_scan(&args),
            DedupeAction::Analyze => self.dedupe_analyze(),
            DedupeAction::Preview => self.dedupe_preview(),
            DedupeAction::Execute(args) => self.dedupe_execute(&args),
            DedupeAction::Clean => {
                let result = clean(self.root(), &self.config.walker_config());
                print(&dashboard::clean_summary(&result));
                Ok(if result.errors.is_empty() {
                    ExitCode::Success
                } else {
                    ExitCode::PartialSuccess
                })
            }
            DedupeAction::Dashboard => self.dedupe_dashboard(),
        }
    }

    fn dedupe_scan(&self, args: &ScanArgs) -> Result<ExitCode> {
        let found = self.detect(args.deep || self.config.dedupe.deep_scan)?;
        let warnings = found.outcome.warnings.len();
        let code = if found.groups.is_empty() {
            ExitCode::NoDuplicates
        } else if warnings > 0 {
            ExitCode::PartialSuccess
        } else {
            ExitCode::Success
        };

        let summary = dashboard::scan_summary(&found.groups, &found.stats, found.near.len(), warnings);
        match args.output {
            OutputFormat::Text => print(&summary),
            OutputFormat::Json => {
                let output =
                    JsonOutput::new(&found.groups, &found.stats, found.near.len(), warnings, code);
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                output
                    .write_to(&mut handle)
                    .context("failed to write JSON output")?;
                eprintln!("{}", summary);
            }
            OutputFormat::Csv => {
                let stdout = io::stdout();
                CsvOutput::new(&found.groups)
                    .write_to(stdout.lock())
                    .context("failed to write CSV output")?;
                eprintln!("{}", summary);
            }
        }
        Ok(code)
    }

    fn dedupe_analyze(&self) -> Result<ExitCode> {
        let found = self.detect(true)?;
        let database = DuplicateDatabase::build(&found.outcome, &found.groups, &found.near);
        write_report(&DuplicateDatabase::path_in(&self.config.report_dir), &database)
            .context("failed to write duplicate database")?;
        let report = self.save_optimization(&found.stats, found.near.len(), None)?;

        print(&dashboard::scan_summary(
            &found.groups,
            &found.stats,
            found.near.len(),
            found.outcome.warnings.len(),
        ));
        print("");
        print(&dashboard::optimization_dashboard(&report, Some(&database)));
        Ok(ExitCode::Success)
    }

    fn dedupe_preview(&self) -> Result<ExitCode> {
        let found = self.detect(false)?;
        let plan = build_plan(found.groups, EliminationMode::Preview);
        let result = preview(&plan, self.root(), &self.config.walker_config());
        let report = self.save_optimization(&found.stats, 0, Some(result.clone()))?;

        print(&dashboard::elimination_summary(&result));
        print("");
        print(&dashboard::optimization_dashboard(&report, None));
        Ok(ExitCode::Success)
    }

    fn dedupe_execute(&self, args: &ExecuteArgs) -> Result<ExitCode> {
        if !args.yes {
            anyhow::bail!(
                "refusing to delete without --yes; review `templopt dedupe preview` first"
            );
        }

        let found = self.detect(false)?;
        let plan = build_plan(found.groups, EliminationMode::Execute);
        let options = ExecuteOptions::new(self.config.backup_dir.clone())
            .with_backup(self.config.dedupe.backup_required && !args.no_backup)
            .with_walker(self.config.walker_config());

        match execute(&plan, self.root(), &options) {
            Ok(result) => {
                let code = if result.all_succeeded() {
                    ExitCode::Success
                } else {
                    ExitCode::PartialSuccess
                };
                let report = self.save_optimization(&found.stats, 0, Some(result.clone()))?;
                print(&dashboard::elimination_summary(&result));
                print("");
                print(&dashboard::optimization_dashboard(&report, None));
                Ok(code)
            }
            Err(e) => {
                let failed = EliminationResult {
                    mode: EliminationMode::Execute,
                    errors: vec![e.to_string()],
                    ..EliminationResult::default()
                };
                self.save_optimization(&found.stats, 0, Some(failed.clone()))?;
                print(&dashboard::elimination_summary(&failed));
                Err(e).context("elimination aborted")
            }
        }
    }

    fn dedupe_dashboard(&self) -> Result<ExitCode> {
        let path = self.report_path(OPTIMIZATION_REPORT_FILE);
        if !path.is_file() {
            print("No optimization report yet; run `templopt dedupe analyze` first.");
            return Ok(ExitCode::Success);
        }
        let report: OptimizationReport = read_report(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let db_path = DuplicateDatabase::path_in(&self.config.report_dir);
        let database: Option<DuplicateDatabase> = if db_path.is_file() {
            match read_report(&db_path) {
                Ok(db) => Some(db),
                Err(e) => {
                    log::warn!("Ignoring unreadable duplicate database: {}", e);
                    None
                }
            }
        } else {
            None
        };
        print(&dashboard::optimization_dashboard(&report, database.as_ref()));
        Ok(ExitCode::Success)
    }

    fn report_qa(&self, run: &QaRun) -> Result<ExitCode> {
        write_report(&self.report_path(QA_REPORT_FILE), &run.report())
            .context("failed to write QA report")?;
        print(&dashboard::qa_run(run));
        Ok(if run.summary.failed == 0 {
            ExitCode::Success
        } else {
            ExitCode::PartialSuccess
        })
    }

    fn qa(&self, action: QaAction) -> Result<ExitCode> {
        let options = self.config.score_options();
        match action {
            QaAction::TestAll => {
                let run = test_all(self.root(), &options).context("quality assurance failed")?;
                self.report_qa(&run)
            }
            QaAction::TestType { component_type } => {
                let run = test_type(self.root(), component_type, &options)
                    .context("quality assurance failed")?;
                self.report_qa(&run)
            }
            QaAction::ValidateNaming { name } => {
                let outcome = validate_naming(&name, &options);
                print(&dashboard::naming_result(&name, &outcome));
                Ok(if outcome.passed {
                    ExitCode::Success
                } else {
                    ExitCode::PartialSuccess
                })
            }
            QaAction::ValidateStructure {
                path,
                component_type,
            } => {
                let check = validate_structure(&path, component_type);
                print(&dashboard::structure_result(&path, &check));
                Ok(if check.outcome.passed {
                    ExitCode::Success
                } else {
                    ExitCode::PartialSuccess
                })
            }
            QaAction::Dashboard => {
                let path = self.report_path(QA_REPORT_FILE);
                if !path.is_file() {
                    print("No QA report yet; run `templopt qa test-all` first.");
                    return Ok(ExitCode::Success);
                }
                let report: QaReport = read_report(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                print(&dashboard::qa_dashboard(&report));
                Ok(ExitCode::Success)
            }
        }
    }

    fn pipeline(&self, action: PipelineAction) -> Result<ExitCode> {
        let (mode, run) = match action {
            PipelineAction::Full(run) => (RunMode::Full, run),
            PipelineAction::Analysis(run) => (RunMode::Analysis, run),
            PipelineAction::Installation(run) => (RunMode::Installation, run),
            PipelineAction::Qa(run) => (RunMode::Qa, run),
            PipelineAction::Custom(args) => (RunMode::Custom(args.phases), args.run),
            PipelineAction::Dashboard => return self.pipeline_dashboard(),
        };

        let report = Orchestrator::new(self.config.clone(), self.root())
            .with_dry_run(run.dry_run)
            .with_progress(self.progress())
            .run(&mode);
        print(&dashboard::execution_report(&report));

        Ok(if report.is_aborted() {
            ExitCode::Aborted
        } else if report.failed_phases().next().is_some() {
            ExitCode::PartialSuccess
        } else {
            ExitCode::Success
        })
    }

    fn pipeline_dashboard(&self) -> Result<ExitCode> {
        let path = OrchestrationReport::path_in(&self.config.report_dir);
        if !path.is_file() {
            print("No execution report yet; run `templopt pipeline full` first.");
            return Ok(ExitCode::Success);
        }
        let report: OrchestrationReport = read_report(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        print(&dashboard::execution_report(&report));
        Ok(ExitCode::Success)
    }
}
