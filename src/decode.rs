use crate::error::{ExportError, Result};
use crate::mark::Mark;
use crate::model::{
    Assessment, Capability, Descriptor, FetchResult, Folder, Indicator, Metadata, Participant,
    ParticipantCapability, ParticipantIndicator, ParticipantRubric, Person, Rubric, WorkType,
    YearLevel,
};
use crate::raw::{
    RawAssessment, RawCapability, RawDescriptor, RawFolder, RawFolderCode, RawId, RawIndicator,
    RawParticipant, RawParticipantRubric, RawPayload, RawPerson, RawRubric,
};
use chrono::{DateTime, FixedOffset, NaiveDate};
use clap::ValueEnum;
use log::{debug, info, warn};
use std::fmt;

/// What the run is going to export. Decoding differs between modes: the
/// overview only needs task metadata, so participants are not decoded and no
/// record is excluded.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Tasks and marks files for the markbook import.
    MarkbookExport,
    /// Student comments file.
    CommentsExport,
    /// One line per task, participants ignored.
    TasksOverview,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::MarkbookExport, Mode::CommentsExport, Mode::TasksOverview];

    pub fn label(&self) -> &'static str {
        match self {
            Mode::MarkbookExport => "Markbook export",
            Mode::CommentsExport => "Comments export",
            Mode::TasksOverview => "All tasks overview",
        }
    }

    fn decodes_participants(&self) -> bool {
        *self != Mode::TasksOverview
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parses the API's JSON text into the raw schema.
pub fn parse_payload(json: &str) -> Result<RawPayload> {
    Ok(serde_json::from_str(json)?)
}

/// Converts a raw API response into canonical assessments.
///
/// Records without participants, and records that carry no weight, are
/// dropped and the metadata count is decremented for each, so that the result
/// satisfies `FetchResult::verify_count` whenever the API's count was right.
///
/// `interaction` is called once per raw record and can drive a progress
/// indicator.
pub fn decode_payload<F>(payload: RawPayload, mode: Mode, interaction: F) -> Result<FetchResult>
where
    F: Fn(),
{
    let mut metadata = Metadata {
        count: payload.metadata.count,
        cursor: payload.metadata.cursor.map(|c| c.to_string()),
    };
    let total = payload.data.len();

    let mut assessments = Vec::with_capacity(total);
    for raw in payload.data {
        interaction();
        match decode_assessment(raw, mode)? {
            Some(assessment) => assessments.push(assessment),
            None => metadata.count -= 1,
        }
    }

    info!(
        "decoded {} of {} assessments ({} mode)",
        assessments.len(),
        total,
        mode
    );
    Ok(FetchResult {
        data: assessments,
        metadata,
    })
}

/// Decodes one raw assessment. `Ok(None)` means the record is excluded from
/// the run and the caller must adjust its count.
pub fn decode_assessment(raw: RawAssessment, mode: Mode) -> Result<Option<Assessment>> {
    let id = id_string(raw.id).unwrap_or_default();

    let work_type = raw.work_type.map_or_else(WorkType::default, |w| WorkType {
        id: id_string(w.id),
        name: w.name,
    });
    let folder = decode_folder(raw.folder.unwrap_or_default());

    let mut participants = Vec::new();
    if mode.decodes_participants() {
        let raw_participants = raw.participants.unwrap_or_default();
        if raw_participants.is_empty() {
            debug!("excluding assessment {}: no participants", id);
            return Ok(None);
        }
        participants = raw_participants
            .into_iter()
            .filter_map(decode_participant)
            .collect();
    }

    let due_date = parse_offset_date(&raw.due_date).ok_or_else(|| ExportError::InvalidDueDate {
        id: id.clone(),
        value: raw.due_date.clone(),
    })?;

    let assessment = Assessment {
        id,
        title: raw.title.unwrap_or_default(),
        assessment_type: raw.assessment_type,
        common_assessment: raw.common_assessment,
        work_type,
        folder,
        subject_code: raw.subject_code,
        project: raw.project,
        weighted: raw.weighted.unwrap_or(false),
        weight: raw.weight,
        due_date,
        rubric: raw.rubric.map(decode_rubric).unwrap_or_default(),
        participants,
    };

    if mode.decodes_participants() && !assessment.is_substantive() {
        debug!(
            "excluding assessment {}: weight {:?}, weighted {}",
            assessment.id, assessment.weight, assessment.weighted
        );
        return Ok(None);
    }

    Ok(Some(assessment))
}

/// Keeps the wall-clock date in the source offset. An instant just after local
/// midnight in one zone lands on the previous day in another; the markbook
/// import already tolerates this.
fn parse_offset_date(value: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::<FixedOffset>::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z"))
        .ok()
        .map(|dt| dt.date_naive())
}

fn id_string(id: Option<RawId>) -> Option<String> {
    id.map(|id| id.to_string())
}

fn decode_folder(raw: RawFolder) -> Folder {
    let codes = match raw.code {
        Some(RawFolderCode::Single(code)) => vec![code],
        Some(RawFolderCode::Many(codes)) => codes,
        None => Vec::new(),
    };
    Folder {
        id: id_string(raw.id),
        name: raw.name.unwrap_or_default(),
        codes,
        year_levels: raw
            .year_level
            .unwrap_or_default()
            .into_iter()
            .map(|y| YearLevel {
                id: id_string(y.id),
                name: y.name,
            })
            .collect(),
    }
}

fn decode_person(raw: RawPerson) -> Person {
    Person {
        id: id_string(raw.id),
        external_id: id_string(raw.external_id),
        title: raw.title,
        first_name: raw.first_name,
        preferred_name: raw.preferred_name,
        last_name: raw.last_name,
    }
}

/// Builds a participant, or `None` when the record must be skipped: no
/// feedback yet, no learner to key the row on, or feedback the teacher left on
/// their own entry.
fn decode_participant(raw: RawParticipant) -> Option<Participant> {
    let feedback = raw.feedback?;
    let Some(learner) = raw.learner.map(decode_person) else {
        warn!("skipping participant without a learner");
        return None;
    };
    let instructor = raw.instructor.map(decode_person);

    // external ids are compared after normalization, so 12345 matches "12345"
    let self_assessed = |person: &Option<Person>| {
        person
            .as_ref()
            .is_some_and(|p| p.external_id == learner.external_id)
    };
    let feedback_instructor = feedback.instructor.map(decode_person);
    if self_assessed(&instructor) || self_assessed(&feedback_instructor) {
        debug!(
            "skipping self-assessed participant {:?}",
            learner.external_id
        );
        return None;
    }

    Some(Participant {
        learner,
        mark: feedback.mark.as_deref().map(Mark::parse).unwrap_or_default(),
        normalised_mark: feedback.normalised_mark,
        comment: feedback.comment.unwrap_or_default(),
        date: raw
            .response
            .and_then(|r| r.date)
            .and_then(|d| parse_offset_date(&d)),
        instructor,
        rubric: raw.rubric.map(decode_participant_rubric).unwrap_or_default(),
    })
}

fn decode_descriptor(raw: RawDescriptor) -> Descriptor {
    Descriptor {
        id: id_string(raw.id),
        description: raw.description,
        max_value: raw.max_value,
        sequence: raw.sequence,
    }
}

fn decode_indicator(raw: RawIndicator) -> Indicator {
    Indicator {
        id: id_string(raw.id),
        name: raw.name,
        max_value: raw.max_value,
        descriptors: raw
            .descriptors
            .unwrap_or_default()
            .into_iter()
            .map(decode_descriptor)
            .collect(),
    }
}

fn decode_capability(raw: RawCapability) -> Capability {
    Capability {
        id: id_string(raw.id),
        name: raw.name,
        max_value: raw.max_value,
        indicators: raw
            .indicators
            .unwrap_or_default()
            .into_iter()
            .map(decode_indicator)
            .collect(),
    }
}

fn decode_rubric(raw: RawRubric) -> Rubric {
    Rubric {
        capabilities: raw
            .capabilities
            .unwrap_or_default()
            .into_iter()
            .map(decode_capability)
            .collect(),
    }
}

fn decode_participant_rubric(raw: RawParticipantRubric) -> ParticipantRubric {
    let capabilities = raw
        .capabilities
        .unwrap_or_default()
        .into_iter()
        .map(|c| ParticipantCapability {
            id: id_string(c.id),
            name: c.name,
            max_value: c.max_value,
            indicators: c
                .indicators
                .unwrap_or_default()
                .into_iter()
                .map(|i| ParticipantIndicator {
                    id: id_string(i.id),
                    name: i.name,
                    max_value: i.max_value,
                    // placeholder keeps the list aligned with the template
                    descriptor: i.descriptor.map(decode_descriptor).unwrap_or_default(),
                })
                .collect(),
        })
        .collect();
    ParticipantRubric { capabilities }
}
