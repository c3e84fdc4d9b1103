//! Decoding the task source payload and evaluating it end to end.

use chrono::{TimeZone, Utc};
use habitguard_core::{evaluate, next_wake, TaskId, TaskSnapshot, WakeReason};

const PAYLOAD: &str = r#"{
  "blocked_websites": ["youtube.com", "https://reddit.com/r/all"],
  "tasks": [
    {"id": 1, "name": "Exercise", "deadline": "13:00", "active_days": 127, "records": []},
    {"id": 2, "name": "Read", "deadline": null},
    {"id": "journal", "name": "Journal", "deadline": "21:30:00",
     "records": [{"date": "2026-10-17", "status": "skipped"}]}
  ]
}"#;

#[test]
fn exercise_scenario_blocks_then_clears_after_completion() {
    let mut snapshot: TaskSnapshot = serde_json::from_str(PAYLOAD).expect("decode");
    let now = Utc.with_ymd_and_hms(2026, 10, 18, 13, 1, 0).unwrap();

    let state = evaluate(now, &snapshot.tasks, &snapshot.blocked_websites);
    assert_eq!(
        state.blocked_domains.iter().cloned().collect::<Vec<_>>(),
        vec!["reddit.com".to_string(), "youtube.com".to_string()]
    );
    assert!(state.active_task_ids.contains(&TaskId::from("1")));

    let plan = next_wake(now, &snapshot.tasks);
    assert_eq!(
        plan.reason,
        WakeReason::Deadline {
            task_id: TaskId::from("journal")
        }
    );

    let done: habitguard_core::TaskRecord =
        serde_json::from_str(r#"{"date": "2026-10-18", "status": "done"}"#).expect("record");
    snapshot.tasks[0].records.push(done);
    let later = Utc.with_ymd_and_hms(2026, 10, 18, 13, 5, 0).unwrap();
    let cleared = evaluate(later, &snapshot.tasks, &snapshot.blocked_websites);
    assert!(cleared.blocked_domains.is_empty());
    assert!(cleared.active_task_ids.is_empty());
}

#[test]
fn empty_payload_decodes_to_empty_snapshot() {
    let snapshot: TaskSnapshot = serde_json::from_str("{}").expect("decode");
    assert_eq!(snapshot, TaskSnapshot::default());
}
