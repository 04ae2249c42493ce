use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use u_eda::config::AnalysisConfig;
use u_eda::csv_parser::CsvParser;
use u_eda::error::EdaError;
use u_eda::pipeline::run_full_analysis;

#[derive(Parser, Debug)]
#[command(name = "u-eda")]
#[command(about = "Exploratory data analysis with an HTML report", long_about = None)]
#[command(version)]
struct Cli {
    /// CSV file to analyze
    data: PathBuf,

    /// Analysis configuration (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Write the full JSON result here (defaults to stdout)
    #[arg(long)]
    json: Option<PathBuf>,

    /// Write the HTML report here
    #[arg(long)]
    html: Option<PathBuf>,

    /// Field delimiter
    #[arg(short, long, default_value_t = ',')]
    delimiter: char,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Runs one analysis. The JSON result goes to `--json` or, without it, to `stdout`.
fn run(cli: &Cli, stdout: &mut impl Write) -> Result<(), EdaError> {
    if !cli.delimiter.is_ascii() {
        return Err(EdaError::InvalidConfig(format!(
            "delimiter must be a single ASCII character, got '{}'",
            cli.delimiter
        )));
    }

    let config = AnalysisConfig::from_json(&std::fs::read_to_string(&cli.config)?)?;
    let df = CsvParser::new()
        .delimiter(cli.delimiter as u8)
        .parse_file(&cli.data)?;
    tracing::info!(
        rows = df.row_count(),
        columns = df.column_count(),
        path = %cli.data.display(),
        "loaded dataset"
    );

    let result = run_full_analysis(&df, config)?;

    if let Some(path) = &cli.html {
        std::fs::write(path, &result.report_html)?;
        tracing::info!(path = %path.display(), "wrote HTML report");
    }
    let json = result.to_json_pretty()?;
    match &cli.json {
        Some(path) => {
            std::fs::write(path, json)?;
            tracing::info!(path = %path.display(), "wrote JSON result");
        }
        None => writeln!(stdout, "{json}")?,
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli, &mut std::io::stdout().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
