// HTTP access to the assessment API.
//
// One blocking GET per run. The API has no paging the exporter relies on, so
// the limit is set high enough to return a full term in one response.
use crate::credentials::ApiCredentials;
use crate::error::Result;
use chrono::NaiveDate;
use log::info;
use reqwest::blocking::Client;
use serde_json::{json, Value};

/// Maximum number of assessments requested in one call.
pub const REQUEST_LIMIT: u32 = 10000;

/// Work type the API filter is restricted to.
pub const WORK_TYPE_FILTER: &str = "Assessment task";

/// Parameters of one assessment request.
///
/// The date window is widened with fixed offsets (+11:00 at the start, +10:00
/// at the end) so that both daylight saving and standard time are covered. The
/// resulting extra records are removed by `FetchResult::filter_by_year_and_date`.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl AssessmentQuery {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        AssessmentQuery {
            start_date,
            end_date,
        }
    }

    /// The JSON document sent in the `filter` query parameter.
    pub fn filter(&self) -> Value {
        json!({
            "weighted": true,
            "workType": {"name": WORK_TYPE_FILTER},
            "dueDate": {
                "from": format!("{}T00:00:00+11:00", self.start_date.format("%Y-%m-%d")),
                "to": format!("{}T23:59:59+10:00", self.end_date.format("%Y-%m-%d")),
            }
        })
    }

    /// Query string pairs for the request.
    pub fn params(&self) -> Vec<(String, String)> {
        vec![
            ("filter".to_string(), self.filter().to_string()),
            ("limit".to_string(), REQUEST_LIMIT.to_string()),
        ]
    }
}

/// Raw answer from the API: status code plus the JSON body, whatever it holds.
///
/// The body is returned even for error statuses so it can be saved for
/// inspection before the status is checked.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Sends the assessment request with a single attempt.
///
/// The `Authorization` header carries the configured token verbatim; the API
/// does not use a bearer scheme.
pub fn fetch_assessments(
    credentials: &ApiCredentials,
    query: &AssessmentQuery,
) -> Result<ApiResponse> {
    let client = Client::new();
    info!(
        "requesting assessments due {} to {}",
        query.start_date, query.end_date
    );

    let response = client
        .get(&credentials.host)
        .header("Authorization", &credentials.auth)
        .header("Accept", "application/json")
        .header("Content-Type", "application/json")
        .query(&query.params())
        .send()?;

    let status = response.status().as_u16();
    let body: Value = response.json()?;
    info!("API answered with status {}", status);
    Ok(ApiResponse { status, body })
}
