//! Wire shape of the assessment API payload.
//!
//! Every field the API may omit or send as `null` is an `Option`; nothing here
//! is validated. `decode` turns these records into the canonical model.
use serde::{Deserialize, Serialize};
use std::fmt;

/// The API mixes numeric and string identifiers, sometimes within one record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum RawId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawId::Number(n) => write!(f, "{}", n),
            RawId::Text(s) => f.write_str(s),
        }
    }
}

/// A folder's class code arrives either as one string or as a list.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum RawFolderCode {
    Single(String),
    Many(Vec<String>),
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RawPayload {
    #[serde(default)]
    pub data: Vec<RawAssessment>,
    pub metadata: RawMetadata,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RawMetadata {
    pub count: i64,
    #[serde(default)]
    pub cursor: Option<RawId>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawAssessment {
    pub id: Option<RawId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub assessment_type: Option<String>,
    #[serde(default)]
    pub common_assessment: Option<bool>,
    #[serde(default)]
    pub work_type: Option<RawWorkType>,
    #[serde(default)]
    pub folder: Option<RawFolder>,
    #[serde(default)]
    pub subject_code: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub weighted: Option<bool>,
    #[serde(default)]
    pub weight: Option<f64>,
    pub due_date: String,
    #[serde(default)]
    pub rubric: Option<RawRubric>,
    #[serde(default)]
    pub participants: Option<Vec<RawParticipant>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RawWorkType {
    pub id: Option<RawId>,
    pub name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawFolder {
    pub id: Option<RawId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub code: Option<RawFolderCode>,
    #[serde(default)]
    pub year_level: Option<Vec<RawYearLevel>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RawYearLevel {
    pub id: Option<RawId>,
    pub name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawPerson {
    pub id: Option<RawId>,
    #[serde(default)]
    pub external_id: Option<RawId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub preferred_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RawParticipant {
    #[serde(default)]
    pub learner: Option<RawPerson>,
    #[serde(default)]
    pub instructor: Option<RawPerson>,
    #[serde(default)]
    pub feedback: Option<RawFeedback>,
    #[serde(default)]
    pub response: Option<RawResponse>,
    #[serde(default)]
    pub rubric: Option<RawParticipantRubric>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawFeedback {
    #[serde(default)]
    pub mark: Option<String>,
    #[serde(default)]
    pub normalised_mark: Option<f64>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub instructor: Option<RawPerson>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RawResponse {
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RawRubric {
    #[serde(default)]
    pub capabilities: Option<Vec<RawCapability>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawCapability {
    pub id: Option<RawId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub max_value: Option<f64>,
    #[serde(default)]
    pub indicators: Option<Vec<RawIndicator>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawIndicator {
    pub id: Option<RawId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub max_value: Option<f64>,
    #[serde(default)]
    pub descriptors: Option<Vec<RawDescriptor>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawDescriptor {
    pub id: Option<RawId>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub max_value: Option<f64>,
    #[serde(default)]
    pub sequence: Option<i64>,
}

/// A participant's achieved values, mirroring the assessment's rubric.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RawParticipantRubric {
    #[serde(default)]
    pub capabilities: Option<Vec<RawParticipantCapability>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawParticipantCapability {
    pub id: Option<RawId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub max_value: Option<f64>,
    #[serde(default)]
    pub indicators: Option<Vec<RawParticipantIndicator>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawParticipantIndicator {
    pub id: Option<RawId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub max_value: Option<f64>,
    #[serde(default)]
    pub descriptor: Option<RawDescriptor>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn folder_code_accepts_scalar_and_list() {
        let single: RawFolder = serde_json::from_value(json!({"id": 1, "code": "7PE1"})).unwrap();
        assert_eq!(single.code, Some(RawFolderCode::Single("7PE1".to_string())));

        let many: RawFolder =
            serde_json::from_value(json!({"id": "f", "code": ["7PE1", "7PE2"]})).unwrap();
        assert_eq!(
            many.code,
            Some(RawFolderCode::Many(vec!["7PE1".to_string(), "7PE2".to_string()]))
        );

        let none: RawFolder = serde_json::from_value(json!({"id": "f", "code": null})).unwrap();
        assert_eq!(none.code, None);
    }

    #[test]
    fn ids_render_without_quotes() {
        let ids: Vec<RawId> = serde_json::from_value(json!([42, "abc"])).unwrap();
        assert_eq!(ids[0].to_string(), "42");
        assert_eq!(ids[1].to_string(), "abc");
    }

    #[test]
    fn missing_optional_fields_default_to_none() {
        let raw: RawAssessment = serde_json::from_value(json!({
            "id": 9,
            "dueDate": "2023-03-09T09:00:00+11:00"
        }))
        .unwrap();
        assert!(raw.work_type.is_none());
        assert!(raw.participants.is_none());
        assert!(raw.weight.is_none());
        assert_eq!(raw.due_date, "2023-03-09T09:00:00+11:00");
    }
}
