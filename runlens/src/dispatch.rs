// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError,
    errors::Result,
    output::{OutputContext, OutputOpts, OutputWriter, clap_styles},
    reporter::HumanReporter,
};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, SecondsFormat, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use runlens_core::{
    config::{DefaultConfigWarnings, RunlensConfig},
    directives::{ManifestDirectiveSource, RequestDirectiveSource, StaticDirectiveSource},
    engine::{CorrelationEngine, FileInput, RunOptions},
    wait::WaitOutcome,
};
use runlens_metadata::RunlensExitCode;
use std::{io::Write, time::SystemTime};
use tracing::{debug, info};

/// Correlates HTTP runner attempt logs and test reports into per-request
/// results.
#[derive(Debug, Parser)]
#[command(version, styles = clap_styles::style())]
pub struct RunlensApp {
    #[command(flatten)]
    output: OutputOpts,

    #[command(flatten)]
    config_opts: ConfigOpts,

    #[command(subcommand)]
    command: Command,
}

impl RunlensApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the process exit code.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        let workspace_root = self.config_opts.workspace_root()?;
        let config = self.config_opts.make_config(&workspace_root)?;

        match self.command {
            Command::Correlate(opts) => opts.exec(&config, output, output_writer),
            Command::Baseline => {
                let engine = CorrelationEngine::new(&config);
                let mut writer = output_writer.stdout_writer();
                if let Some(baseline) = engine.capture_baseline() {
                    writeln!(writer, "{}", format_baseline(baseline))
                        .map_err(ExpectedError::write_output_error)?;
                } else {
                    debug!("no test report in {}", config.store().reports_dir());
                }
                writer.flush().map_err(ExpectedError::write_output_error)?;
                Ok(RunlensExitCode::OK)
            }
        }
    }
}

#[derive(Debug, Args)]
struct ConfigOpts {
    /// Workspace root [default: current directory]
    #[arg(long, global = true, value_name = "DIR")]
    workspace: Option<Utf8PathBuf>,

    /// Config file [default: workspace-root/.config/runlens.toml]
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,
}

impl ConfigOpts {
    fn workspace_root(&self) -> Result<Utf8PathBuf> {
        if let Some(workspace) = &self.workspace {
            return Ok(workspace.clone());
        }
        let current_dir =
            std::env::current_dir().map_err(ExpectedError::workspace_root_invalid)?;
        Utf8PathBuf::try_from(current_dir)
            .map_err(|error| ExpectedError::workspace_root_invalid(error.into_io_error()))
    }

    /// Creates a runlens config with the given options.
    fn make_config(&self, workspace_root: &Utf8Path) -> Result<RunlensConfig> {
        RunlensConfig::from_sources(
            workspace_root,
            self.config_file.as_deref(),
            &mut DefaultConfigWarnings,
        )
        .map_err(ExpectedError::from)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Correlate attempt logs with the latest test report
    ///
    /// Each source file is paired with the --log given in the same position.
    /// Unless --no-wait is passed, runlens first waits for the runner to rewrite
    /// its latest report.
    Correlate(CorrelateOpts),

    /// Print the modification time of the latest test report
    ///
    /// Capture this before starting the runner and pass it to
    /// `correlate --since`. Prints nothing if no report exists yet.
    Baseline,
}

#[derive(Debug, Args)]
struct CorrelateOpts {
    /// Request-source files that were executed
    #[arg(required = true, value_name = "SOURCE")]
    sources: Vec<Utf8PathBuf>,

    /// JSONL attempt log for each source file, in order
    #[arg(long = "log", required = true, value_name = "PATH")]
    logs: Vec<Utf8PathBuf>,

    /// JSON manifest of test directive counts per source file
    #[arg(long, value_name = "PATH")]
    directives: Option<Utf8PathBuf>,

    /// Read this report instead of locating the latest one
    #[arg(long, value_name = "PATH")]
    report: Option<Utf8PathBuf>,

    /// Report modification time before the run started (RFC 3339)
    ///
    /// Without this, any existing report counts as up to date.
    #[arg(long, value_name = "TIMESTAMP")]
    since: Option<String>,

    /// Do not wait for the report to be rewritten
    #[arg(long)]
    no_wait: bool,

    /// Output format
    #[arg(
        long,
        short = 'T',
        value_enum,
        default_value_t,
        value_name = "FMT"
    )]
    message_format: MessageFormat,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
enum MessageFormat {
    #[default]
    Human,
    Json,
}

impl CorrelateOpts {
    fn exec(
        self,
        config: &RunlensConfig,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        if self.sources.len() != self.logs.len() {
            return Err(ExpectedError::LogCountMismatch {
                sources: self.sources.len(),
                logs: self.logs.len(),
            });
        }
        let baseline = self.since.as_deref().map(parse_baseline).transpose()?;

        let directives: Box<dyn RequestDirectiveSource> = match &self.directives {
            Some(path) => Box::new(ManifestDirectiveSource::from_path(path)?),
            None => Box::new(StaticDirectiveSource::default()),
        };
        let inputs: Vec<_> = self
            .sources
            .into_iter()
            .zip(self.logs)
            .map(|(source, log)| FileInput::new(source, log))
            .collect();
        let options = RunOptions {
            wait: !self.no_wait,
            baseline,
            report_path: self.report,
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| ExpectedError::RuntimeBuildError { error })?;
        let engine = CorrelationEngine::new(config);
        let run = runtime.block_on(engine.run(&inputs, directives.as_ref(), options, ctrl_c()))?;

        if let Some(WaitOutcome::Updated { elapsed }) = run.wait_outcome {
            info!("test report updated after {elapsed:?}");
        }

        let mut writer = output_writer.stdout_writer();
        match self.message_format {
            MessageFormat::Human => {
                HumanReporter::new(output.stdout_colorized(), output.verbose)
                    .write_summary(&run.summary, &mut writer)
                    .map_err(ExpectedError::write_output_error)?;
            }
            MessageFormat::Json => {
                serde_json::to_writer_pretty(&mut writer, &run.summary)
                    .map_err(|err| ExpectedError::SerializeSummaryError { err })?;
                writeln!(writer)
                    .and_then(|()| writer.flush())
                    .map_err(ExpectedError::write_output_error)?;
            }
        }

        if run.summary.is_success() {
            Ok(RunlensExitCode::OK)
        } else {
            Err(ExpectedError::RunFailed)
        }
    }
}

/// Resolves when the user presses Ctrl-C.
async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        // Without a signal handler, never cancel.
        std::future::pending::<()>().await;
    }
}

fn parse_baseline(input: &str) -> Result<SystemTime> {
    DateTime::parse_from_rfc3339(input)
        .map(SystemTime::from)
        .map_err(|err| ExpectedError::invalid_since(input, err))
}

fn format_baseline(baseline: SystemTime) -> String {
    DateTime::<Utc>::from(baseline).to_rfc3339_opts(SecondsFormat::Nanos, true)
}
