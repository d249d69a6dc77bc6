use std::cell::Cell;
use std::path::{Path, PathBuf};

use clap::Parser;
use log::{debug, info};
use markbook_export::connection::{fetch_assessments, AssessmentQuery};
use markbook_export::decode::{decode_payload, parse_payload, Mode};
use markbook_export::export::{
    generate_comments_export, generate_markbook_export, generate_overview_export, ExportPaths,
};
use markbook_export::prompt;
use markbook_export::raw::RawPayload;
use markbook_export::{ApiCredentials, ExportError, Result};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

const PROGRESS_EVERY: usize = 500;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Export assessment tasks, marks and comments into markbook import files."
)]
struct Cli {
    /// First due date to include (YYYY-MM-DD). Prompted for when omitted.
    #[arg(long, requires = "end_date")]
    start_date: Option<String>,

    /// Last due date to include (YYYY-MM-DD). Prompted for when omitted.
    #[arg(long, requires = "start_date")]
    end_date: Option<String>,

    /// Year group between 7 and 13. Prompted for when omitted.
    #[arg(long)]
    year_group: Option<String>,

    /// What to export. Prompted for when omitted.
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Read a previously saved API response instead of calling the API.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Where the raw API response is saved.
    #[arg(long, default_value = "data.json")]
    raw_output: PathBuf,

    /// Directory the export files are written to.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // also installs the bridge for the library's `log` records
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<()> {
    // clap rejects a start date without an end date and vice versa
    let (start_date, end_date) = match (&cli.start_date, &cli.end_date) {
        (Some(start), Some(end)) => prompt::parse_date_range(start, end)?,
        _ => prompt::prompt_date_range()?,
    };
    let year_group = match &cli.year_group {
        Some(year) => prompt::parse_year_group(year)?,
        None => prompt::prompt_year_group()?,
    };
    let mode = match cli.mode {
        Some(mode) => mode,
        None => prompt::prompt_mode()?,
    };

    let payload: RawPayload = match &cli.input {
        Some(path) => {
            info!("reading saved response from {}", path.display());
            parse_payload(&std::fs::read_to_string(path)?)?
        }
        None => {
            let credentials = ApiCredentials::credentials()?;
            let query = AssessmentQuery::new(start_date, end_date);
            let response = fetch_assessments(&credentials, &query)?;
            save_raw(&cli.raw_output, &response.body)?;
            if !response.is_success() {
                return Err(ExportError::ApiStatus(response.status));
            }
            serde_json::from_value(response.body)?
        }
    };

    let processed = Cell::new(0usize);
    let result = decode_payload(payload, mode, || {
        processed.set(processed.get() + 1);
        if processed.get() % PROGRESS_EVERY == 0 {
            debug!("processed {} records", processed.get());
        }
    })?;
    result.verify_count()?;

    let assessments = result.filter_by_year_and_date(year_group, start_date, end_date);
    info!(
        "{} of {} assessments belong to year {} between {} and {}",
        assessments.len(),
        result.data.len(),
        year_group,
        start_date,
        end_date
    );

    std::fs::create_dir_all(&cli.output_dir)?;
    let paths = ExportPaths::new(&cli.output_dir, year_group, start_date, end_date);
    let written = match mode {
        Mode::MarkbookExport => generate_markbook_export(&assessments, &paths)?,
        Mode::CommentsExport => generate_comments_export(&assessments, &paths)?,
        Mode::TasksOverview => generate_overview_export(&assessments, &paths)?,
    };

    for path in &written {
        println!("Generated {}", path.display());
    }
    Ok(())
}

fn save_raw(path: &Path, body: &Value) -> Result<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), body)?;
    info!("saved raw API response to {}", path.display());
    Ok(())
}
