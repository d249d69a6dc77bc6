use markbook_export::decode::{decode_payload, parse_payload, Mode};
use markbook_export::export::{
    generate_comments_export, generate_markbook_export, generate_overview_export, ExportPaths,
};
use markbook_export::prompt::parse_date_range;
use markbook_export::{ExportError, FetchResult};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn participant(external_id: &str, mark: &str, comment: &str) -> Value {
    json!({
        "learner": {
            "id": external_id,
            "externalId": external_id,
            "firstName": "Alex",
            "lastName": "Ng"
        },
        "instructor": {"id": "t1", "externalId": "T001"},
        "feedback": {"mark": mark, "comment": comment}
    })
}

fn assessment(
    id: i64,
    title: &str,
    code: Value,
    due: &str,
    weight: f64,
    participants: Value,
) -> Value {
    json!({
        "id": id,
        "title": title,
        "assessmentType": "Assessment",
        "commonAssessment": true,
        "workType": {"id": 3, "name": "Assessment task"},
        "folder": {
            "id": 10,
            "name": "9 English 1C",
            "code": code,
            "yearLevel": [{"id": 9, "name": "9"}]
        },
        "subjectCode": "ENG",
        "project": null,
        "weighted": true,
        "weight": weight,
        "dueDate": due,
        "rubric": null,
        "participants": participants
    })
}

fn payload_text(data: Vec<Value>) -> String {
    let count = data.len();
    json!({"data": data, "metadata": {"count": count, "cursor": null}}).to_string()
}

// the same task in two classes with different weightings
fn conflicting_weights() -> String {
    payload_text(vec![
        assessment(
            1,
            "Essay",
            json!("9ENG1"),
            "2023-03-09T09:00:00+11:00",
            20.0,
            json!([participant("S1", "4 / 5", "")]),
        ),
        assessment(
            2,
            "Essay",
            json!("9ENG2"),
            "2023-03-09T09:00:00+11:00",
            30.0,
            json!([participant("S2", "3 / 5", "")]),
        ),
    ])
}

fn decode(text: &str, mode: Mode) -> FetchResult {
    let payload = parse_payload(text).expect("payload parses");
    decode_payload(payload, mode, || {}).expect("payload decodes")
}

fn lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("export file readable")
        .lines()
        .map(String::from)
        .collect()
}

#[test]
fn markbook_export_writes_every_stream() {
    let text = payload_text(vec![
        assessment(
            1,
            "Persuasive Essay {T1}",
            json!("9ENG1"),
            "2023-03-09T09:00:00+11:00",
            20.0,
            json!([
                participant("S1", "43 / 55", "Good"),
                participant("S2", "Not Assessed", ""),
            ]),
        ),
        assessment(
            2,
            "Persuasive Essay MODIFIED",
            json!(["9ENG1", "9ENG2"]),
            "2023-03-10T09:00:00+11:00",
            20.0,
            json!([participant("S3", "70 %", "")]),
        ),
        // other year group, removed by the filter
        assessment(
            3,
            "Poetry",
            json!("10ENG1"),
            "2023-03-10T09:00:00+11:00",
            10.0,
            json!([participant("S4", "1 / 2", "")]),
        ),
        // no participants, excluded during decoding
        assessment(
            4,
            "Novel study",
            json!("9ENG1"),
            "2023-03-11T09:00:00+11:00",
            10.0,
            json!([]),
        ),
    ]);

    let result = decode(&text, Mode::MarkbookExport);
    result.verify_count().expect("count reconciled");
    assert_eq!(result.metadata.count, 3);

    let (start, end) = parse_date_range("2023-01-01", "2023-06-30").unwrap();
    let assessments = result.filter_by_year_and_date(9, start, end);
    assert_eq!(assessments.len(), 2);

    let dir = tempdir().expect("temporary directory");
    let paths = ExportPaths::new(dir.path(), 9, start, end);
    let written = generate_markbook_export(&assessments, &paths).expect("export written");
    assert_eq!(written.len(), 5);

    let tasks = lines(&paths.tasks());
    assert_eq!(tasks.len(), 2);
    assert!(tasks[1].starts_with(concat!(
        "Persuasive Essay\tTest / Examination\tCoursework / IA\t\t",
        "2023\t9 English\t20\t55\t"
    )));

    let tasks_modified = lines(&paths.tasks_modified());
    assert_eq!(tasks_modified.len(), 2);
    assert!(tasks_modified[1].contains("\t100\t"));

    assert_eq!(
        lines(&paths.marks()),
        [
            "student_number\tcoursework_task\traw_mark\traw_mark_date\tcourse\tacademic_year",
            "S1\tPersuasive Essay\t43\t2023-03-09\t9 English\t2023",
        ]
    );
    assert_eq!(
        lines(&paths.marks_not_assessed())[1],
        "S2\tPersuasive Essay\tNot Assessed\t2023-03-09\t9 English\t2023"
    );
    assert_eq!(
        lines(&paths.marks_modified())[1],
        "S3\tPersuasive Essay MODIFIED\t70\t2023-03-10\t9 English\t2023"
    );
}

#[test]
fn conflicting_weights_stop_before_any_file_is_written() {
    let text = conflicting_weights();
    let result = decode(&text, Mode::MarkbookExport);
    let (start, end) = parse_date_range("2023-01-01", "2023-12-31").unwrap();
    let assessments = result.filter_by_year_and_date(9, start, end);

    let dir = tempdir().expect("temporary directory");
    let paths = ExportPaths::new(dir.path(), 9, start, end);
    let err = generate_markbook_export(&assessments, &paths).unwrap_err();

    assert!(matches!(err, ExportError::Conflict { export: "tasks", .. }));
    assert!(err.to_string().contains("weighting: \"20\""));
    assert!(err.to_string().contains("weighting: \"30\""));
    assert!(!paths.tasks().exists());
    assert!(!paths.marks().exists());
}

#[test]
fn comments_export_uses_placeholder() {
    let text = payload_text(vec![assessment(
        1,
        "Essay {draft}",
        json!("9ENG1"),
        "2023-03-09T09:00:00+11:00",
        20.0,
        json!([
            participant("S1", "4 / 5", ""),
            participant("S2", "Not Assessed", "Away"),
        ]),
    )]);
    let result = decode(&text, Mode::CommentsExport);
    let (start, end) = parse_date_range("2023-01-01", "2023-12-31").unwrap();
    let assessments = result.filter_by_year_and_date(9, start, end);

    let dir = tempdir().expect("temporary directory");
    let paths = ExportPaths::new(dir.path(), 9, start, end);
    generate_comments_export(&assessments, &paths).expect("comments written");

    assert_eq!(
        lines(&paths.comments()),
        [
            "student_number,course,coursework_task,raw_mark,comment",
            "S1,9 English,Essay {draft},4,NO COMMENT PROVIDED",
        ]
    );
}

#[test]
fn overview_export_keeps_unweighted_tasks() {
    let mut unweighted = assessment(
        1,
        "Practice quiz",
        json!("9ENG1"),
        "2023-03-09T09:00:00+11:00",
        0.0,
        Value::Null,
    );
    unweighted["weighted"] = json!(false);
    let text = payload_text(vec![unweighted]);

    let result = decode(&text, Mode::TasksOverview);
    result.verify_count().expect("count reconciled");
    let (start, end) = parse_date_range("2023-01-01", "2023-12-31").unwrap();
    let assessments = result.filter_by_year_and_date(9, start, end);

    let dir = tempdir().expect("temporary directory");
    let paths = ExportPaths::new(dir.path(), 9, start, end);
    generate_overview_export(&assessments, &paths).expect("overview written");

    assert_eq!(
        lines(&paths.overview())[1],
        "Practice quiz\t9 English\t9ENG1\tAssessment task\t2023\t0\t2023-03-09"
    );
}

#[test]
fn api_count_mismatch_is_reported() {
    let data = vec![assessment(
        1,
        "Essay",
        json!("9ENG1"),
        "2023-03-09T09:00:00+11:00",
        20.0,
        json!([participant("S1", "4 / 5", "")]),
    )];
    let text = json!({"data": data, "metadata": {"count": 5, "cursor": null}}).to_string();
    let result = decode(&text, Mode::MarkbookExport);
    assert!(matches!(
        result.verify_count(),
        Err(ExportError::CountMismatch { claimed: 5, decoded: 1 })
    ));
}

fn export_binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_markbook_export"))
}

#[test]
fn binary_exits_with_failure_on_conflict() {
    let dir = tempdir().expect("temporary directory");
    let input = dir.path().join("saved.json");
    fs::write(&input, conflicting_weights()).expect("payload written");
    let out_dir = dir.path().join("out");

    let output = export_binary()
        .args(["--start-date", "2023-01-01", "--end-date", "2023-12-31"])
        .args(["--year-group", "9", "--mode", "markbook-export"])
        .arg("--input")
        .arg(&input)
        .arg("--output-dir")
        .arg(&out_dir)
        .output()
        .expect("binary runs");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: conflicting tasks rows"), "{stderr}");

    let (start, end) = parse_date_range("2023-01-01", "2023-12-31").unwrap();
    let paths = ExportPaths::new(&out_dir, 9, start, end);
    for path in [
        paths.tasks(),
        paths.tasks_modified(),
        paths.marks(),
        paths.marks_modified(),
        paths.marks_not_assessed(),
    ] {
        assert!(!path.exists(), "{} should not exist", path.display());
    }
}

#[test]
fn binary_rejects_half_a_date_range() {
    let dir = tempdir().expect("temporary directory");
    let output = export_binary()
        .args(["--start-date", "2023-01-01", "--year-group", "9"])
        .args(["--mode", "tasks-overview"])
        .arg("--output-dir")
        .arg(dir.path())
        .output()
        .expect("binary runs");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--end-date"), "{stderr}");
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}
