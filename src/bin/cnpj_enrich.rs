use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};

use camino::Utf8PathBuf;
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use cnpj_enrich::app::{Enricher, ProgressSink};
use cnpj_enrich::checkpoint::FileProgressStore;
use cnpj_enrich::config::ConfigLoader;
use cnpj_enrich::error::EnrichError;
use cnpj_enrich::output::{ConsoleProgress, JsonOutput, OutputMode, print_summary};
use cnpj_enrich::pacing::{Pacer, SystemClock};
use cnpj_enrich::registry::ReceitaHttpClient;
use cnpj_enrich::spreadsheet::extract_cnpjs;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[derive(Parser)]
#[command(name = "cnpj-enrich")]
#[command(about = "Enrich a spreadsheet of CNPJs with ReceitaWS company data")]
#[command(version, author)]
struct Cli {
    /// JSON config file (defaults to ./cnpj-enrich.json when present)
    #[arg(long)]
    config: Option<String>,

    /// Input spreadsheet with a `cnpj` column
    #[arg(long)]
    input: Option<Utf8PathBuf>,

    /// Output spreadsheet, rewritten at every checkpoint
    #[arg(long)]
    output: Option<Utf8PathBuf>,

    #[arg(long)]
    non_interactive: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<EnrichError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &EnrichError) -> u8 {
    match error {
        EnrichError::MissingCnpjColumn(_)
        | EnrichError::ConfigRead(_)
        | EnrichError::ConfigParse(_)
        | EnrichError::InvalidConfig(_) => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let mut config = ConfigLoader::load(cli.config.as_deref())?;
    if cli.input.is_some() {
        config.input = cli.input;
    }
    if cli.output.is_some() {
        config.output = cli.output;
    }
    let config = ConfigLoader::resolve_config(config)?;

    let ids = extract_cnpjs(&config.input)?;

    if let Err(err) = ctrlc::set_handler(|| {
        INTERRUPTED.store(true, Ordering::SeqCst);
        eprintln!("\nInterrupt received, stopping after the current CNPJ...");
    }) {
        warn!(error = %err, "failed to install Ctrl-C handler");
    }

    let client = ReceitaHttpClient::new(&config.base_url, config.timeout, config.retry.clone())?;
    let store = FileProgressStore::new(config.output.clone(), config.checkpoint.clone());
    let pacer = Pacer::new(SystemClock::new(), config.delay);
    let mut enricher = Enricher::new(client, store, pacer, config.checkpoint_every);

    let output = config.output.display().to_string();
    let progress = ConsoleProgress::for_mode(output_mode, ids.len());
    let sink: &dyn ProgressSink = match &progress {
        Some(progress) => progress,
        None => &JsonOutput,
    };

    let result = enricher.run(&ids, sink, &INTERRUPTED);
    if let Some(progress) = &progress {
        progress.finish();
    }
    match result {
        Ok(summary) => {
            match output_mode {
                OutputMode::Interactive => print_summary(&summary, &output),
                OutputMode::NonInteractive => {
                    JsonOutput::print_summary(&summary).map_err(|err| EnrichError::Filesystem(err.to_string()))?
                }
            }
            Ok(())
        }
        Err(err) => {
            eprintln!("Run aborted. Progress saved up to the last checkpoint in {output}");
            Err(err.into())
        }
    }
}
