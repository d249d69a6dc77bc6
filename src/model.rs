// Canonical records built from one API response. Nothing here is mutated after
// `decode` constructs it.
use crate::error::{ExportError, Result};
use crate::mark::Mark;
use chrono::NaiveDate;
use serde::Serialize;

/// The kind of assessment, e.g. "Assessment task", "Test", "Exam".
///
/// Both fields are `None` when the API sends no work type at all.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct WorkType {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// A year level such as 7 or 13. The id is unique, the name is not.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct YearLevel {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// A folder is a class, e.g. 7PE1 or 13DAT2.
///
/// Fields:
/// - `name`: human readable course plus a trailing section token, e.g.
///   "9 My Subject Name 1C".
/// - `codes`: every class code attached to the folder. The API sends either a
///   single code or a list; an absent code leaves this empty.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct Folder {
    pub id: Option<String>,
    pub name: String,
    pub codes: Vec<String>,
    pub year_levels: Vec<YearLevel>,
}

impl Folder {
    /// Course name used by the markbook: the folder name without its last
    /// whitespace-delimited token ("9 My Subject Name 1C" -> "9 My Subject Name").
    pub fn course_name(&self) -> &str {
        course_name(&self.name)
    }

    /// Whether any class code belongs to `year`, e.g. "7PE1" for year 7.
    pub fn in_year(&self, year: u32) -> bool {
        let prefix = year.to_string();
        self.codes.iter().any(|code| code.starts_with(&prefix))
    }
}

pub fn course_name(folder_name: &str) -> &str {
    folder_name
        .rsplit_once(char::is_whitespace)
        .map_or("", |(course, _section)| course)
}

/// A student (learner) or teacher (instructor).
///
/// `external_id` is the student number the markbook keys on.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct Person {
    pub id: Option<String>,
    pub external_id: Option<String>,
    pub title: Option<String>,
    pub first_name: Option<String>,
    pub preferred_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct Descriptor {
    pub id: Option<String>,
    pub description: Option<String>,
    pub max_value: Option<f64>,
    pub sequence: Option<i64>,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct Indicator {
    pub id: Option<String>,
    pub name: Option<String>,
    pub max_value: Option<f64>,
    pub descriptors: Vec<Descriptor>,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct Capability {
    pub id: Option<String>,
    pub name: Option<String>,
    pub max_value: Option<f64>,
    pub indicators: Vec<Indicator>,
}

/// Scoring template: capabilities -> indicators -> descriptors. May be empty.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct Rubric {
    pub capabilities: Vec<Capability>,
}

/// The descriptor a student achieved for one indicator.
///
/// `descriptor` is the all-`None` placeholder when the API omitted it, so the
/// participant tree keeps the template's shape.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct ParticipantIndicator {
    pub id: Option<String>,
    pub name: Option<String>,
    pub max_value: Option<f64>,
    pub descriptor: Descriptor,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct ParticipantCapability {
    pub id: Option<String>,
    pub name: Option<String>,
    pub max_value: Option<f64>,
    pub indicators: Vec<ParticipantIndicator>,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct ParticipantRubric {
    pub capabilities: Vec<ParticipantCapability>,
}

/// A student's outcome within an assessment.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct Participant {
    pub learner: Person,
    pub mark: Mark,
    pub normalised_mark: Option<f64>,
    pub comment: String,
    pub date: Option<NaiveDate>,
    pub instructor: Option<Person>,
    pub rubric: ParticipantRubric,
}

impl Participant {
    /// Student number used in every export; empty when the API has none.
    pub fn student_number(&self) -> &str {
        self.learner.external_id.as_deref().unwrap_or_default()
    }
}

/// One gradable task assigned to a folder.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Assessment {
    pub id: String,
    pub title: String,
    pub assessment_type: Option<String>,
    pub common_assessment: Option<bool>,
    pub work_type: WorkType,
    pub folder: Folder,
    pub subject_code: Option<String>,
    pub project: Option<String>,
    pub weighted: bool,
    pub weight: Option<f64>,
    pub due_date: NaiveDate,
    pub rubric: Rubric,
    pub participants: Vec<Participant>,
}

impl Assessment {
    /// An assessment without a positive weight does not count towards a grade.
    pub fn is_substantive(&self) -> bool {
        self.weighted && self.weight.is_some_and(|w| w != 0.0)
    }
}

/// Totals reported by the API alongside the data.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub count: i64,
    pub cursor: Option<String>,
}

/// Decoded contents of one API response.
///
/// `metadata.count` is adjusted during decoding for every record that was
/// excluded, so after a correct decode it equals `data.len()`.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct FetchResult {
    pub data: Vec<Assessment>,
    pub metadata: Metadata,
}

impl FetchResult {
    /// Checks the decoded assessments against the adjusted API count.
    ///
    /// A mismatch means the API changed shape or the decoder is wrong; the run
    /// must stop rather than export a partial markbook.
    pub fn verify_count(&self) -> Result<()> {
        if usize::try_from(self.metadata.count).ok() == Some(self.data.len()) {
            Ok(())
        } else {
            Err(ExportError::CountMismatch {
                claimed: self.metadata.count,
                decoded: self.data.len(),
            })
        }
    }

    /// Assessments belonging to `year` whose due date lies within
    /// `[start_date, end_date]`, in their original order.
    ///
    /// The API returns tasks for every year group and its date filter is
    /// deliberately loose around daylight saving, so both checks happen here.
    pub fn filter_by_year_and_date(
        &self,
        year: u32,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Vec<Assessment> {
        self.data
            .iter()
            .filter(|a| a.folder.in_year(year))
            .filter(|a| start_date <= a.due_date && a.due_date <= end_date)
            .cloned()
            .collect()
    }

    /// Assessments belonging to `year`, in their original order.
    pub fn filter_by_year(&self, year: u32) -> Vec<Assessment> {
        self.data
            .iter()
            .filter(|a| a.folder.in_year(year))
            .cloned()
            .collect()
    }
}
