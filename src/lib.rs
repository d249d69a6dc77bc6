//! # Markbook Export Library
//!
//! This library turns assessment records from a school-management API into the tab and comma
//! delimited files a markbook import tool consumes.
//!
//! ## Core Features
//!
//! - **Decoding:** Maps the API's loosely shaped JSON (optional work types, rubrics, folder codes
//!   sent as a string or a list, self-assessment artefacts) into a small canonical model.
//! - **Marks:** Parses the display marks (`"43 / 55"`, `"86.42 %"`, `"Not Assessed"`) once into a
//!   tagged [`Mark`].
//! - **Filtering:** Selects the assessments of one year group within a due-date window, and checks
//!   the API's claimed count against what was decoded.
//! - **Exports:** Writes tasks, marks, comments and overview files with duplicate suppression and
//!   conflict detection. A conflict stops the run before any file is written.
//! - **Collaborators:** Credentials from `.env`, the environment or the system keyring, a single
//!   blocking API request, and interactive prompts for the run parameters.
//!
//! ## Usage
//!
//! ```no_run
//! use markbook_export::decode::{decode_payload, parse_payload, Mode};
//! use markbook_export::export::{generate_markbook_export, ExportPaths};
//! use markbook_export::prompt::parse_date_range;
//!
//! # fn main() -> markbook_export::Result<()> {
//! let (start, end) = parse_date_range("2023-01-01", "2023-06-30")?;
//! let payload = parse_payload(&std::fs::read_to_string("data.json")?)?;
//! let result = decode_payload(payload, Mode::MarkbookExport, || {})?;
//! result.verify_count()?;
//!
//! let assessments = result.filter_by_year_and_date(9, start, end);
//! generate_markbook_export(&assessments, &ExportPaths::new(".", 9, start, end))?;
//! # Ok(())
//! # }
//! ```
pub mod connection; // Single request to the assessment API.
pub mod credentials; // Loads and stores the API host and token.
pub mod decode; // Raw payload -> canonical model.
mod error;
pub mod export; // Markbook import files.
pub mod mark;
pub mod model;
pub mod prompt; // Interactive run parameters.
pub mod raw; // Wire shape of the API payload.

// Exports key structures for external use.
pub use credentials::ApiCredentials;
pub use decode::Mode;
pub use error::{ExportError, Result};
pub use mark::Mark;
pub use model::{Assessment, FetchResult, Folder, Metadata, Participant};
