use edu_gradebook::{
    models::{
        domain::AttemptStatus,
        dto::{
            request::GradeWriteRequest,
            response::{AttemptsResponse, GradebookResponse, RosterResponse},
        },
    },
    services::{evaluation_report::EvaluationReport, GradebookSnapshot},
};

const ROSTER_JSON: &str = r#"{
    "students": [
        {"user_id": "s1", "first_name": "Camila", "last_name": "Rojas",
         "email": "camila@example.com"},
        {"user_id": "s2", "first_name": "Diego", "last_name": "Soto", "email": "diego@example.com"}
    ],
    "evaluations": [
        {"eval_id": "e1", "title": "Prueba 1", "type": "exam", "weight": 50, "total_points": 20,
         "due_date": "2024-05-10T12:00:00Z"},
        {"eval_id": "e2", "title": "Control 1", "type": "quiz", "weight": 50, "total_points": 10}
    ]
}"#;

const GRADEBOOK_JSON: &str = r#"{
    "entries": [
        {"entry_id": "g1", "student_id": "s1", "eval_id": "e1", "nota_10": 6.0, "score_raw": 17,
         "percentage": 85.0, "recorded_at": "2024-05-11T09:30:00Z", "notes": "Auto-graded"}
    ]
}"#;

const ATTEMPTS_JSON: &str = r#"{
    "attempts": [
        {"attempt_id": "a1", "student_id": "s1", "eval_id": "e1", "status": "graded",
         "score_raw": 17, "auto_graded": true},
        {"attempt_id": "a2", "student_id": "s2", "eval_id": "e1", "status": "in_progress"},
        {"attempt_id": "a3", "student_id": "s2", "eval_id": "e2", "status": "abandoned"}
    ]
}"#;

fn snapshot_from_wire() -> GradebookSnapshot {
    let roster: RosterResponse = serde_json::from_str(ROSTER_JSON).expect("roster should parse");
    let gradebook: GradebookResponse =
        serde_json::from_str(GRADEBOOK_JSON).expect("gradebook should parse");
    let attempts: AttemptsResponse =
        serde_json::from_str(ATTEMPTS_JSON).expect("attempts should parse");
    GradebookSnapshot::build("class-1", roster, gradebook.entries, attempts.attempts, 1)
}

#[test]
fn test_platform_payloads_build_a_snapshot() {
    let snapshot = snapshot_from_wire();

    assert_eq!(snapshot.students.len(), 2);
    assert_eq!(snapshot.evaluations[0].header_caption(), "exam • 50% • 20pts");
    assert!(snapshot.evaluations[0].due_date.is_some());
    assert_eq!(snapshot.entry_count(), 1);
    assert_eq!(snapshot.attempt_count(), 3);

    let unknown = snapshot
        .attempts()
        .find(|a| a.id == "a3")
        .expect("attempt a3 should be kept");
    assert_eq!(unknown.status, AttemptStatus::Unknown);
}

#[test]
fn test_snapshot_averages_from_platform_payloads() {
    let snapshot = snapshot_from_wire();

    assert_eq!(snapshot.student_average("s1"), Some(6.0));
    assert_eq!(snapshot.student_average("s2"), None);
    assert_eq!(snapshot.evaluation_average("e1"), Some(6.0));
}

#[test]
fn test_report_and_csv_from_platform_payloads() {
    let snapshot = snapshot_from_wire();
    let report = EvaluationReport::build(&snapshot, "e1").expect("report should build");

    assert_eq!(report.graded_count, 1);
    assert_eq!(report.completion_rate, Some(0.5));
    assert_eq!(report.distribution[5], 1);
    assert_eq!(
        report.to_csv(),
        "Student,Grade,Score,Percentage,Status\nCamila Rojas,6.0,17,85.0,graded"
    );
}

#[test]
fn test_grade_write_uses_platform_field_names() {
    let write = GradeWriteRequest {
        student_id: "s2".to_string(),
        raw_score: 11,
        note: None,
        attempt_id: Some("a2".to_string()),
    };

    let json = serde_json::to_value(&write).expect("write should serialize");
    assert_eq!(
        json,
        serde_json::json!({"student_id": "s2", "score": 11, "attempt_id": "a2"})
    );
}
