use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Every way a fetch, decode or export run can fail.
///
/// Only the variants raised by the pipeline itself (`CountMismatch` and
/// `Conflict`) describe data problems; the rest wrap the collaborators.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Reading the payload or writing an export file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The payload is not valid JSON or does not match the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The delimited writer rejected a row.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The request to the assessment API could not be completed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with something other than 200.
    #[error("API request failed with status code {0}, see the raw payload dump for details")]
    ApiStatus(u16),

    /// Reading or storing credentials in the system keyring failed.
    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// The interactive prompt could not read from the terminal.
    #[error("prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    /// `HOST` or `AUTH` is unavailable from every source.
    #[error("{0} is not set in the environment, .env file or keyring")]
    MissingCredentials(&'static str),

    /// A user supplied date is not in `YYYY-MM-DD` form.
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    /// The requested date range is empty or reversed.
    #[error("start date {start} must be before end date {end}")]
    InvalidDateRange { start: String, end: String },

    /// The requested year group is outside the school's range.
    #[error("year group must be between 7 and 13, got {0}")]
    InvalidYearGroup(String),

    /// An assessment carries a due date that is not ISO-8601 with an offset.
    #[error("assessment {id} has an unparseable due date '{value}'")]
    InvalidDueDate { id: String, value: String },

    /// The API's claimed total disagrees with the decoded assessments.
    #[error("metadata count {claimed} does not match {decoded} decoded assessments")]
    CountMismatch { claimed: i64, decoded: usize },

    /// Two rows share an identity but differ elsewhere; writing either would
    /// corrupt the markbook.
    #[error("conflicting {export} rows for key {key}:\n  existing: {existing}\n  incoming: {incoming}")]
    Conflict {
        export: &'static str,
        key: String,
        existing: String,
        incoming: String,
    },
}
