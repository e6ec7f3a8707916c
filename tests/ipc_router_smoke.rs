mod test_support;

use serde_json::json;
use test_support::{request, seeded_routine, spawn_sidecar};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health.pointer("/ok"), Some(&json!(true)));
    assert!(health.pointer("/result/workspacePath").unwrap().is_null());

    let no_ws = request(&mut stdin, &mut reader, "2", "routines.list", json!({}));
    assert_eq!(no_ws.pointer("/error/code"), Some(&json!("no_workspace")));

    let routine_id = seeded_routine(&mut stdin, &mut reader, "routined-router-smoke");

    let calls = vec![
        ("setup.get", json!({})),
        ("dropdowns.departments", json!({})),
        ("dropdowns.academicYears", json!({ "departmentId": "cse" })),
        ("dropdowns.semesters", json!({ "academicYearId": "y1" })),
        ("dropdowns.batches", json!({ "semesterId": "s1" })),
        ("dropdowns.courseAssignments", json!({ "batchId": "b1" })),
        ("dropdowns.rooms", json!({})),
        ("dropdowns.timeSlots", json!({ "batchId": "b1" })),
        ("routines.list", json!({})),
        ("routines.get", json!({ "id": routine_id })),
        ("routineEntries.grid", json!({ "routineId": routine_id, "shift": "Morning" })),
        ("desk.open", json!({ "routineId": routine_id })),
        ("desk.grid", json!({})),
        ("desk.refresh", json!({})),
        ("desk.copy.options", json!({})),
        ("desk.routine.actions", json!({})),
        ("desk.routines.filter", json!({ "status": "draft" })),
        ("desk.routines.refresh", json!({})),
        ("desk.close", json!({})),
    ];
    for (i, (method, params)) in calls.into_iter().enumerate() {
        let id = format!("call-{}", i);
        let resp = request(&mut stdin, &mut reader, &id, method, params);
        assert_eq!(
            resp.get("ok").and_then(|v| v.as_bool()),
            Some(true),
            "{} failed: {}",
            method,
            resp
        );
    }

    let unknown = request(&mut stdin, &mut reader, "99", "routines.explode", json!({}));
    assert_eq!(unknown.pointer("/error/code"), Some(&json!("not_implemented")));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn malformed_line_gets_bad_json_and_loop_continues() {
    use std::io::{BufRead, Write};

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    writeln!(stdin, "{{not json").expect("write");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("json");
    assert_eq!(value.pointer("/error/code"), Some(&json!("bad_json")));

    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health.pointer("/ok"), Some(&json!(true)));
    drop(stdin);
    let _ = child.wait();
}
