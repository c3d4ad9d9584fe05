use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use camino::Utf8Path;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use report_harvester::app::{App, RunOptions};
use report_harvester::config::{ConfigLoader, ResolvedConfig};
use report_harvester::domain::ReportId;
use report_harvester::error::HarvestError;
use report_harvester::fetch::{HttpPdfFetcher, PdfFetcher};
use report_harvester::output::{
    JsonOutput, LogSink, OutputMode, print_audit_summary, print_run_summary,
};
use report_harvester::runner::CancelFlag;
use report_harvester::store::MetadataStore;
use report_harvester::validate::{HttpUrlValidator, UrlValidator};

#[derive(Parser)]
#[command(name = "report-harvest")]
#[command(about = "Bulk-download PDF reports listed in a tabular source and track per-record status")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Validate, download and record every source record")]
    Run(RunArgs),
    #[command(about = "Check the metadata store against the source table")]
    Audit,
}

#[derive(Args)]
struct RunArgs {
    #[arg(long)]
    workers: Option<usize>,
}

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(report) => {
            eprintln!("{report:?}");
            if let Some(harvest) = report.downcast_ref::<HarvestError>() {
                return ExitCode::from(map_exit_code(harvest));
            }
            ExitCode::from(1)
        }
    }
}

fn map_exit_code(error: &HarvestError) -> u8 {
    match error {
        HarvestError::MissingConfig
        | HarvestError::ConfigRead(_)
        | HarvestError::ConfigParse(_)
        | HarvestError::SourceRead { .. }
        | HarvestError::SourceColumn { .. } => 2,
        HarvestError::HttpClient(_)
        | HarvestError::FetchHttp(_)
        | HarvestError::FetchStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let config = ConfigLoader::resolve(cli.config.as_deref()).into_diagnostic()?;

    match cli.command {
        Commands::Run(args) => run_pipeline(args, &config, output_mode),
        Commands::Audit => run_audit(&config, output_mode),
    }
}

fn run_pipeline(
    args: RunArgs,
    config: &ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<ExitCode> {
    let validator = HttpUrlValidator::new(config.validate_timeout_secs).into_diagnostic()?;
    let fetcher = HttpPdfFetcher::new(config.fetch_timeout_secs).into_diagnostic()?;
    let store = MetadataStore::new(config.store_path.clone());
    let app = App::new(store, validator, fetcher);

    let cancel = CancelFlag::new();
    install_sigint_handler();
    watch_for_interrupt(cancel.clone());

    let options = RunOptions {
        workers: args.workers,
    };
    match output_mode {
        OutputMode::Json => {
            let result = app
                .run(config, options, &cancel, &JsonOutput)
                .into_diagnostic()?;
            JsonOutput::print_run(&result).into_diagnostic()?;
        }
        OutputMode::Text => {
            let result = app
                .run(config, options, &cancel, &LogSink)
                .into_diagnostic()?;
            print_run_summary(&result);
        }
    }

    if cancel.is_cancelled() {
        eprintln!("interrupted: remaining records were not processed");
        return Ok(ExitCode::from(130));
    }
    Ok(ExitCode::SUCCESS)
}

fn run_audit(config: &ResolvedConfig, output_mode: OutputMode) -> miette::Result<ExitCode> {
    let store = MetadataStore::new(config.store_path.clone());
    let app = App::new(store, NopValidator, NopFetcher);

    match output_mode {
        OutputMode::Json => {
            let result = app.audit(config, &JsonOutput).into_diagnostic()?;
            JsonOutput::print_audit(&result).into_diagnostic()?;
        }
        OutputMode::Text => {
            let result = app.audit(config, &LogSink).into_diagnostic()?;
            print_audit_summary(&result);
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Bridges the async-signal world to the pool's cancellation flag: the
/// handler only flips an atomic, and this watcher turns it into a cancel
/// plus a user-visible notice.
fn watch_for_interrupt(cancel: CancelFlag) {
    thread::spawn(move || {
        loop {
            if INTERRUPTED.load(Ordering::SeqCst) {
                eprintln!("interrupt received; finishing in-flight records");
                cancel.cancel();
                break;
            }
            thread::sleep(Duration::from_millis(100));
        }
    });
}

#[cfg(unix)]
fn install_sigint_handler() {
    extern "C" fn on_sigint(_signal: libc::c_int) {
        INTERRUPTED.store(true, Ordering::SeqCst);
    }
    let handler = on_sigint as extern "C" fn(libc::c_int);
    unsafe {
        libc::signal(libc::SIGINT, handler as libc::sighandler_t);
    }
}

#[cfg(not(unix))]
fn install_sigint_handler() {}

struct NopValidator;
struct NopFetcher;

impl UrlValidator for NopValidator {
    fn is_fetchable_pdf(&self, _url: &str) -> bool {
        false
    }
}

impl PdfFetcher for NopFetcher {
    fn fetch(
        &self,
        _url: &str,
        _id: &ReportId,
        _destination_dir: &Utf8Path,
    ) -> Result<camino::Utf8PathBuf, HarvestError> {
        Err(HarvestError::FetchHttp(
            "fetcher not configured".to_string(),
        ))
    }
}
