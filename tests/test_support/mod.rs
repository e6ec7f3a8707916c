#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    spawn_sidecar_with_env(&[])
}

pub fn spawn_sidecar_with_env(envs: &[(&str, &str)]) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_routined");
    let mut cmd = Command::new(exe);
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .env_remove("ROUTINED_WORKSPACE")
        .env_remove("ROUTINED_UNDO_WINDOW_SECS")
        .env_remove("ROUTINED_SEARCH_DEBOUNCE_MS");
    for (k, v) in envs {
        cmd.env(k, v);
    }
    let mut child = cmd.spawn().expect("spawn routined");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

pub fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

pub fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or(serde_json::Value::Null)
}

/// Returns the `error` object of a failed response.
pub fn request_err(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    value.get("error").cloned().expect("error object")
}

/// One department chain with a Morning batch (b1) and a Day batch (b2).
pub fn catalog_bundle() -> serde_json::Value {
    json!({
        "departments": [{ "id": "cse", "name": "CSE" }],
        "academicYears": [{ "id": "y1", "departmentId": "cse", "name": "2026" }],
        "semesters": [{ "id": "s1", "academicYearId": "y1", "name": "Spring" }],
        "batches": [
            { "id": "b1", "semesterId": "s1", "name": "CSE-26A", "shift": "Morning" },
            { "id": "b2", "semesterId": "s1", "name": "CSE-26B", "shift": "Day" }
        ],
        "courses": [
            { "id": "phy", "code": "PHY101", "title": "Physics" },
            { "id": "chem", "code": "CHE101", "title": "Chemistry" },
            { "id": "math", "code": "MAT101", "title": "Mathematics" }
        ],
        "teachers": [
            { "id": "t1", "name": "Dr. Rahman" },
            { "id": "t2", "name": "Dr. Akter" },
            { "id": "t3", "name": "Dr. Hasan" }
        ],
        "courseAssignments": [
            { "id": "ca-phy", "batchId": "b1", "courseId": "phy", "teacherId": "t1" },
            { "id": "ca-chem", "batchId": "b1", "courseId": "chem", "teacherId": "t2" },
            { "id": "ca-math", "batchId": "b1", "courseId": "math", "teacherId": "t3" },
            { "id": "ca-phy-day", "batchId": "b2", "courseId": "phy", "teacherId": "t1" }
        ],
        "rooms": [
            { "id": "room-a", "name": "Room A" },
            { "id": "room-b", "name": "Room B" }
        ],
        "timeSlots": [
            { "id": "m1", "startTime": "08:00", "endTime": "08:50", "slotType": "Class", "shift": "Morning" },
            { "id": "m2", "startTime": "09:00", "endTime": "09:50", "slotType": "Class", "shift": "Morning" },
            { "id": "m-break", "startTime": "09:50", "endTime": "10:10", "slotType": "Break", "shift": "Morning" },
            { "id": "m3", "startTime": "10:10", "endTime": "11:00", "slotType": "Class", "shift": "Morning" },
            { "id": "d1", "startTime": "13:00", "endTime": "13:50", "slotType": "Class", "shift": "Day" }
        ]
    })
}

/// Selects a fresh workspace, imports the catalog and creates one draft
/// routine for batch b1. Returns the routine id.
pub fn seeded_routine(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    prefix: &str,
) -> String {
    let workspace = temp_dir(prefix);
    let _ = request_ok(
        stdin,
        reader,
        "seed-1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(stdin, reader, "seed-2", "catalog.import", catalog_bundle());
    let created = request_ok(
        stdin,
        reader,
        "seed-3",
        "routines.create",
        json!({ "title": "Spring Routine", "batchId": "b1", "semesterId": "s1" }),
    );
    created
        .pointer("/routine/id")
        .and_then(|v| v.as_str())
        .expect("routine id")
        .to_string()
}

pub fn add_entry(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    routine_id: &str,
    course_assignment_id: &str,
    room_id: &str,
    time_slot_id: &str,
    day: &str,
) -> serde_json::Value {
    request_ok(
        stdin,
        reader,
        id,
        "routineEntries.create",
        json!({
            "routineId": routine_id,
            "courseAssignmentId": course_assignment_id,
            "roomId": room_id,
            "timeSlotId": time_slot_id,
            "dayOfWeek": day,
            "entryType": "Lecture"
        }),
    )
}

/// Number of non-null cells on `day` in a `routineEntries.grid` result.
pub fn day_count(grid: &serde_json::Value, day: &str) -> usize {
    grid.pointer(&format!("/grid/{}", day))
        .and_then(|v| v.as_object())
        .map(|row| row.values().filter(|v| !v.is_null()).count())
        .unwrap_or(0)
}
