//! Markbook import files.
//!
//! Each formatter first derives every row from the filtered assessments,
//! checking for duplicates and conflicts, and only then are files opened. A
//! conflict therefore stops the run before anything is written.
use crate::error::{ExportError, Result};
use crate::mark::{Mark, NOT_ASSESSED};
use crate::model::Assessment;
use chrono::{Datelike, NaiveDate};
use lazy_static::lazy_static;
use log::{debug, error, info};
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::fs::File;
use std::hash::Hash;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const TASK_KIND: &str = "Test / Examination";
pub const COURSEWORK_CATEGORY: &str = "Coursework / IA";
pub const NO_COMMENT: &str = "NO COMMENT PROVIDED";

pub const TASKS_HEADER: [&str; 18] = [
    "coursework_task",
    "task_kind",
    "coursework_category",
    "description",
    "academic_year",
    "course",
    "weighting",
    "mark_out_of",
    "dmy_set_date",
    "dmy_due_date",
    "into_markbook_flag",
    "record_marks_flag",
    "grade_only",
    "criteria_only",
    "status_flag",
    "release_marks_flag",
    "task_dropdown_flag",
    "do_not_allow_comments",
];

pub const MARKS_HEADER: [&str; 6] = [
    "student_number",
    "coursework_task",
    "raw_mark",
    "raw_mark_date",
    "course",
    "academic_year",
];

pub const COMMENTS_HEADER: [&str; 5] = [
    "student_number",
    "course",
    "coursework_task",
    "raw_mark",
    "comment",
];

pub const OVERVIEW_HEADER: [&str; 7] = [
    "coursework_task",
    "course",
    "class_code",
    "work_type",
    "academic_year",
    "weighting",
    "dmy_due_date",
];

const TAB: u8 = b'\t';
const COMMA: u8 = b',';

lazy_static! {
    static ref BRACED: Regex = Regex::new(r"\{[^}]*\}").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Strips `{...}` spans, collapses whitespace runs and trims:
/// "Essay {draft} Test" -> "Essay Test".
pub fn sanitize_title(title: &str) -> String {
    let without_braces = BRACED.replace_all(title, "");
    WHITESPACE
        .replace_all(&without_braces, " ")
        .trim()
        .to_string()
}

/// Modified tasks (adjusted for individual students) are imported separately.
pub fn is_modified(title: &str) -> bool {
    title.to_uppercase().contains("MODIFIED")
}

fn format_weight(weight: Option<f64>) -> String {
    weight.map(|w| w.to_string()).unwrap_or_default()
}

/// One line of the tasks file. Field order is the import tool's column order.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TaskRow {
    pub coursework_task: String,
    pub task_kind: &'static str,
    pub coursework_category: &'static str,
    pub description: &'static str,
    pub academic_year: i32,
    pub course: String,
    pub weighting: String,
    pub mark_out_of: String,
    pub dmy_set_date: NaiveDate,
    pub dmy_due_date: NaiveDate,
    pub into_markbook_flag: u8,
    pub record_marks_flag: u8,
    pub grade_only: u8,
    pub criteria_only: u8,
    pub status_flag: u8,
    pub release_marks_flag: u8,
    pub task_dropdown_flag: u8,
    pub do_not_allow_comments: u8,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarkRow {
    pub student_number: String,
    pub coursework_task: String,
    pub raw_mark: String,
    pub raw_mark_date: NaiveDate,
    pub course: String,
    pub academic_year: i32,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CommentRow {
    pub student_number: String,
    pub course: String,
    pub coursework_task: String,
    pub raw_mark: String,
    pub comment: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct OverviewRow {
    pub coursework_task: String,
    pub course: String,
    pub class_code: String,
    pub work_type: String,
    pub academic_year: i32,
    pub weighting: String,
    pub dmy_due_date: NaiveDate,
}

/// Rows split across the output files of one export.
#[derive(Debug, Clone, PartialEq)]
pub struct Streams<R> {
    pub regular: Vec<R>,
    pub modified: Vec<R>,
    pub not_assessed: Vec<R>,
}

impl<R> Default for Streams<R> {
    fn default() -> Self {
        Streams {
            regular: Vec::new(),
            modified: Vec::new(),
            not_assessed: Vec::new(),
        }
    }
}

impl<R> Streams<R> {
    pub fn len(&self) -> usize {
        self.regular.len() + self.modified.len() + self.not_assessed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Tracks admitted rows for one export.
///
/// A row whose exact key was already admitted is a harmless duplicate (the
/// same task listed in two folders of one course). A row that shares an
/// identity with an admitted row but differs in its exact key is a conflict.
struct Ledger<K, I, R> {
    export: &'static str,
    admitted: HashSet<K>,
    identities: HashMap<I, R>,
}

impl<K, I, R> Ledger<K, I, R>
where
    K: Hash + Eq,
    I: Hash + Eq + Debug,
    R: Clone + Debug,
{
    fn new(export: &'static str) -> Self {
        Ledger {
            export,
            admitted: HashSet::new(),
            identities: HashMap::new(),
        }
    }

    /// `Ok(true)` when the row is new and must be written, `Ok(false)` for an
    /// exact duplicate.
    fn admit(&mut self, exact: K, identity: I, row: &R) -> Result<bool> {
        if self.admitted.contains(&exact) {
            return Ok(false);
        }
        if let Some(existing) = self.identities.get(&identity) {
            error!(
                "conflicting {} rows for {:?}: {:?} vs {:?}",
                self.export, identity, existing, row
            );
            return Err(ExportError::Conflict {
                export: self.export,
                key: format!("{:?}", identity),
                existing: format!("{:?}", existing),
                incoming: format!("{:?}", row),
            });
        }
        self.admitted.insert(exact);
        self.identities.insert(identity, row.clone());
        Ok(true)
    }
}

/// Builds the tasks file rows.
///
/// The mark-out-of figure comes from the first participant with a scored mark;
/// an assessment where nobody was assessed is left out.
pub fn task_rows(assessments: &[Assessment]) -> Result<Streams<TaskRow>> {
    let mut streams = Streams::default();
    let mut ledger = Ledger::new("tasks");

    for assessment in assessments {
        let Some(mark_out_of) = assessment
            .participants
            .iter()
            .find_map(|p| p.mark.out_of())
        else {
            debug!("no assessed participants for task {}", assessment.id);
            continue;
        };

        let title = sanitize_title(&assessment.title);
        let course = assessment.folder.course_name().to_string();
        let row = TaskRow {
            coursework_task: title.clone(),
            task_kind: TASK_KIND,
            coursework_category: COURSEWORK_CATEGORY,
            description: "",
            academic_year: assessment.due_date.year(),
            course: course.clone(),
            weighting: format_weight(assessment.weight),
            mark_out_of: mark_out_of.to_string(),
            // no separate set date upstream
            dmy_set_date: assessment.due_date,
            dmy_due_date: assessment.due_date,
            into_markbook_flag: 1,
            record_marks_flag: 1,
            grade_only: 0,
            criteria_only: 0,
            status_flag: 0,
            release_marks_flag: 0,
            task_dropdown_flag: 0,
            do_not_allow_comments: 0,
        };

        let exact = (
            row.coursework_task.clone(),
            row.task_kind,
            row.coursework_category,
            row.academic_year,
            row.course.clone(),
            row.weighting.clone(),
            row.mark_out_of.clone(),
        );
        if !ledger.admit(exact, (title, course), &row)? {
            continue;
        }

        if is_modified(&row.coursework_task) {
            streams.modified.push(row);
        } else {
            streams.regular.push(row);
        }
    }

    Ok(streams)
}

/// Builds the marks file rows, one per assessed student per task.
///
/// Students marked "Not Assessed" go to their own stream so the import can
/// flag them; unrecognised marks are dropped.
pub fn mark_rows(assessments: &[Assessment]) -> Result<Streams<MarkRow>> {
    let mut streams = Streams::default();
    let mut ledger = Ledger::new("marks");

    for assessment in assessments {
        let title = sanitize_title(&assessment.title);
        let course = assessment.folder.course_name();
        let modified = is_modified(&title);

        for participant in &assessment.participants {
            let raw_mark = match &participant.mark {
                Mark::NotAssessed => NOT_ASSESSED,
                Mark::Unrecognised(text) => {
                    debug!(
                        "skipping unrecognised mark {:?} for {} in task {}",
                        text,
                        participant.student_number(),
                        assessment.id
                    );
                    continue;
                }
                scored => scored.achieved().unwrap_or_default(),
            };

            let row = MarkRow {
                student_number: participant.student_number().to_string(),
                coursework_task: title.clone(),
                raw_mark: raw_mark.to_string(),
                raw_mark_date: assessment.due_date,
                course: course.to_string(),
                academic_year: assessment.due_date.year(),
            };
            let identity = (
                row.student_number.clone(),
                row.coursework_task.clone(),
                row.course.clone(),
            );
            if !ledger.admit(row.clone(), identity, &row)? {
                continue;
            }

            if modified {
                streams.modified.push(row);
            } else if participant.mark == Mark::NotAssessed {
                streams.not_assessed.push(row);
            } else {
                streams.regular.push(row);
            }
        }
    }

    Ok(streams)
}

/// Builds the comments file rows. Titles are kept as entered and nothing is
/// deduplicated.
pub fn comment_rows(assessments: &[Assessment]) -> Vec<CommentRow> {
    assessments
        .iter()
        .flat_map(|assessment| {
            assessment.participants.iter().filter_map(move |participant| {
                let raw_mark = participant.mark.achieved()?;
                let comment = if participant.comment.is_empty() {
                    NO_COMMENT.to_string()
                } else {
                    participant.comment.clone()
                };
                Some(CommentRow {
                    student_number: participant.student_number().to_string(),
                    course: assessment.folder.course_name().to_string(),
                    coursework_task: assessment.title.clone(),
                    raw_mark: raw_mark.to_string(),
                    comment,
                })
            })
        })
        .collect()
}

/// One line per distinct task, for checking what the API returned.
pub fn overview_rows(assessments: &[Assessment]) -> Vec<OverviewRow> {
    let mut seen = HashSet::new();
    assessments
        .iter()
        .map(|assessment| OverviewRow {
            coursework_task: sanitize_title(&assessment.title),
            course: assessment.folder.course_name().to_string(),
            class_code: assessment.folder.codes.join("/"),
            work_type: assessment.work_type.name.clone().unwrap_or_default(),
            academic_year: assessment.due_date.year(),
            weighting: format_weight(assessment.weight),
            dmy_due_date: assessment.due_date,
        })
        .filter(|row| seen.insert(row.clone()))
        .collect()
}

/// Writes a header line followed by `rows`. Lines end in CRLF, as the import
/// tool expects.
pub fn write_rows<W, R>(writer: W, delimiter: u8, header: &[&str], rows: &[R]) -> Result<()>
where
    W: Write,
    R: Serialize,
{
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer);
    csv_writer.write_record(header)?;
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn write_file<R: Serialize>(
    path: &Path,
    delimiter: u8,
    header: &[&str],
    rows: &[R],
) -> Result<PathBuf> {
    let file = File::create(path)?;
    write_rows(BufWriter::new(file), delimiter, header, rows)?;
    info!("wrote {} rows to {}", rows.len(), path.display());
    Ok(path.to_path_buf())
}

/// Output file names for one run: `{year}_{start}_{end}_<kind>.<ext>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPaths {
    dir: PathBuf,
    prefix: String,
}

impl ExportPaths {
    pub fn new(dir: impl Into<PathBuf>, year_group: u32, start: NaiveDate, end: NaiveDate) -> Self {
        ExportPaths {
            dir: dir.into(),
            prefix: format!("{}_{}_{}", year_group, start, end),
        }
    }

    fn file(&self, kind: &str, extension: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.{}", self.prefix, kind, extension))
    }

    pub fn tasks(&self) -> PathBuf {
        self.file("tasks", "txt")
    }

    pub fn tasks_modified(&self) -> PathBuf {
        self.file("tasks_modified", "txt")
    }

    pub fn marks(&self) -> PathBuf {
        self.file("marks", "txt")
    }

    pub fn marks_modified(&self) -> PathBuf {
        self.file("marks_modified", "txt")
    }

    pub fn marks_not_assessed(&self) -> PathBuf {
        self.file("marks_not_assessed", "txt")
    }

    pub fn comments(&self) -> PathBuf {
        self.file("comments", "csv")
    }

    pub fn overview(&self) -> PathBuf {
        self.file("overview", "txt")
    }
}

/// Writes the tasks and marks files. Both row sets are checked for conflicts
/// before the first file is created.
pub fn generate_markbook_export(
    assessments: &[Assessment],
    paths: &ExportPaths,
) -> Result<Vec<PathBuf>> {
    let tasks = task_rows(assessments)?;
    let marks = mark_rows(assessments)?;

    Ok(vec![
        write_file(&paths.tasks(), TAB, &TASKS_HEADER, &tasks.regular)?,
        write_file(&paths.tasks_modified(), TAB, &TASKS_HEADER, &tasks.modified)?,
        write_file(&paths.marks(), TAB, &MARKS_HEADER, &marks.regular)?,
        write_file(&paths.marks_modified(), TAB, &MARKS_HEADER, &marks.modified)?,
        write_file(
            &paths.marks_not_assessed(),
            TAB,
            &MARKS_HEADER,
            &marks.not_assessed,
        )?,
    ])
}

pub fn generate_comments_export(
    assessments: &[Assessment],
    paths: &ExportPaths,
) -> Result<Vec<PathBuf>> {
    let rows = comment_rows(assessments);
    Ok(vec![write_file(
        &paths.comments(),
        COMMA,
        &COMMENTS_HEADER,
        &rows,
    )?])
}

pub fn generate_overview_export(
    assessments: &[Assessment],
    paths: &ExportPaths,
) -> Result<Vec<PathBuf>> {
    let rows = overview_rows(assessments);
    Ok(vec![write_file(
        &paths.overview(),
        TAB,
        &OVERVIEW_HEADER,
        &rows,
    )?])
}
