mod advisory;
mod analysis;
mod config;
mod document;
mod heuristics;
mod ocr;
mod pdf_extract;
mod report;
mod simulation;
mod stats;

use clap::{Parser, Subcommand, ValueEnum};
use config::{Config, DEFAULT_CONFIG_PATH};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "fatura-solar",
    about = "Read utility invoices and estimate a solar installation"
)]
struct Cli {
    /// Configuration file (default: ./fatura-solar.toml when present)
    #[arg(long, short, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze invoices (PDF, image or text), one after another
    Analyze {
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Print the text acquired from a document
    Text {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Create or edit the configuration file
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default configuration
    Init,
    /// Set a dotted key, e.g. `simulation.sizing_model insolation_table`
    Set { key: String, value: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // init tracing; stdout is reserved for reports
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Analyze { files, format } => {
            let cfg = Config::load_or_default(cli.config.as_deref())?;
            run_analyze(&files, format, &cfg)
        }
        Command::Text { file } => {
            let cfg = Config::load_or_default(cli.config.as_deref())?;
            let acquired = document::acquire_text(&file, &cfg.ocr)?;
            info!(source = ?acquired.source, chars = acquired.text.len(), "Acquired text");
            println!("{}", acquired.text);
            Ok(())
        }
        Command::Config(cmd) => {
            let path = cli
                .config
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
            match cmd {
                ConfigCommand::Init => {
                    Config::write_default(&path)?;
                    info!(path = %path.display(), "Wrote default configuration");
                }
                ConfigCommand::Set { key, value } => Config::update_value(&path, &key, &value)?,
            }
            Ok(())
        }
    }
}

fn run_analyze(
    files: &[PathBuf],
    format: OutputFormat,
    cfg: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut documents = Vec::with_capacity(files.len());
    let mut failed = 0usize;

    for path in files {
        let span = tracing::info_span!("document", file = %path.display());
        let _guard = span.enter();

        match document::acquire_text(path, &cfg.ocr) {
            Ok(acquired) => {
                info!(source = ?acquired.source, chars = acquired.text.len(), "Acquired text");
                documents.push((path.display().to_string(), acquired.text));
            }
            Err(e) => {
                error!(error = %e, "Could not read document");
                failed += 1;
            }
        }
    }

    let analyses = analysis::analyze_batch(
        documents.iter().map(|(source, text)| (source.as_str(), text.as_str())),
        cfg,
    );

    match format {
        OutputFormat::Json => println!("{}", report::to_json(&analyses)?),
        OutputFormat::Text => print_reports(&analyses, &cfg.extraction.currency_marker),
    }

    info!(analyzed = analyses.len(), failed, "Batch complete");
    if analyses.is_empty() {
        return Err(format!("none of the {failed} document(s) could be read").into());
    }
    Ok(())
}

fn print_reports(analyses: &[analysis::Analysis], currency: &str) {
    for (i, a) in analyses.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("== Solar report: {}", file_name(&a.source));
        for line in report::report_lines(a, currency) {
            println!("{line}");
        }
        if let Some(chart) = report::chart_series(&a.record.history) {
            println!("{}:", chart.title);
            for (label, kwh) in chart.labels.iter().zip(&chart.values) {
                println!("  {label:>6} {kwh:>7}");
            }
        }
    }
}

fn file_name(source: &str) -> &str {
    Path::new(source)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(source)
}
