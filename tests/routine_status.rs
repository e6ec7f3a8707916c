mod test_support;

use serde_json::json;
use std::io::BufReader;
use std::process::{ChildStdin, ChildStdout};
use test_support::{add_entry, request_err, request_ok, seeded_routine, spawn_sidecar};

fn confirm(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    routine_id: &str,
) -> serde_json::Value {
    let prompt = request_ok(
        stdin,
        reader,
        &format!("{}-prompt", id),
        method,
        json!({ "routineId": routine_id }),
    );
    let token = prompt
        .pointer("/prompt/token")
        .and_then(|v| v.as_str())
        .expect("token")
        .to_string();
    request_ok(
        stdin,
        reader,
        id,
        "desk.confirm.resolve",
        json!({ "token": token, "accept": true }),
    )
}

fn actions(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    routine_id: &str,
) -> serde_json::Value {
    request_ok(
        stdin,
        reader,
        id,
        "desk.routine.actions",
        json!({ "routineId": routine_id }),
    )
}

#[test]
fn draft_publish_archive_delete_lifecycle() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let routine_id = seeded_routine(&mut stdin, &mut reader, "routined-status-cycle");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "desk.open",
        json!({ "routineId": routine_id }),
    );

    let draft = actions(&mut stdin, &mut reader, "2", &routine_id);
    assert_eq!(draft.get("status"), Some(&json!("draft")));
    assert_eq!(draft.get("actions"), Some(&json!(["publish", "delete"])));

    let prompt = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "desk.routine.publish",
        json!({}),
    );
    let message = prompt
        .pointer("/prompt/message")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    assert!(message.contains("email"));
    assert!(message.contains("PDF"));

    let published = confirm(&mut stdin, &mut reader, "4", "desk.routine.publish", &routine_id);
    assert_eq!(published.pointer("/notice/level"), Some(&json!("success")));
    assert_eq!(published.pointer("/view/statusLabel"), Some(&json!("Published")));
    let after = actions(&mut stdin, &mut reader, "5", &routine_id);
    assert_eq!(after.get("actions"), Some(&json!(["archive"])));

    let refused = request_err(
        &mut stdin,
        &mut reader,
        "6",
        "desk.routine.delete",
        json!({ "routineId": routine_id }),
    );
    assert_eq!(refused.get("code"), Some(&json!("precondition_failed")));

    let archived = confirm(&mut stdin, &mut reader, "7", "desk.routine.archive", &routine_id);
    assert_eq!(archived.pointer("/view/statusLabel"), Some(&json!("Archived")));
    assert_eq!(
        archived.pointer("/view/routine/status"),
        Some(&json!("archieved"))
    );
    let after = actions(&mut stdin, &mut reader, "8", &routine_id);
    assert_eq!(after.get("actions"), Some(&json!(["delete"])));

    let deleted = confirm(&mut stdin, &mut reader, "9", "desk.routine.delete", &routine_id);
    assert!(deleted.pointer("/view/routine").unwrap().is_null());
    let missing = request_err(
        &mut stdin,
        &mut reader,
        "10",
        "routines.get",
        json!({ "id": routine_id }),
    );
    assert_eq!(missing.get("code"), Some(&json!("not_found")));
}

#[test]
fn authority_rejects_out_of_order_transitions() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let routine_id = seeded_routine(&mut stdin, &mut reader, "routined-status-authority");

    let early = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "routines.archive",
        json!({ "id": routine_id }),
    );
    assert_eq!(early.get("code"), Some(&json!("invalid_transition")));
    assert_eq!(early.pointer("/details/from"), Some(&json!("draft")));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "routines.publish",
        json!({ "id": routine_id }),
    );
    let twice = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "routines.publish",
        json!({ "id": routine_id }),
    );
    assert_eq!(twice.get("code"), Some(&json!("invalid_transition")));

    let live = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "routines.delete",
        json!({ "id": routine_id }),
    );
    assert_eq!(live.get("code"), Some(&json!("invalid_state")));
}

#[test]
fn archived_routine_is_read_only() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let routine_id = seeded_routine(&mut stdin, &mut reader, "routined-status-readonly");
    let _ = add_entry(
        &mut stdin, &mut reader, "1", &routine_id, "ca-phy", "room-a", "m1", "Sunday",
    );
    for (id, method) in [("2", "routines.publish"), ("3", "routines.archive")] {
        let _ = request_ok(&mut stdin, &mut reader, id, method, json!({ "id": routine_id }));
    }

    let blocked = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "routineEntries.create",
        json!({
            "routineId": routine_id,
            "courseAssignmentId": "ca-chem",
            "roomId": "room-b",
            "timeSlotId": "m2",
            "dayOfWeek": "Sunday",
            "entryType": "Lecture"
        }),
    );
    assert_eq!(blocked.get("code"), Some(&json!("invalid_state")));

    let view = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "desk.open",
        json!({ "routineId": routine_id }),
    );
    assert_eq!(view.get("actions"), Some(&json!(["delete"])));
    let empty = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "desk.cell.click",
        json!({ "day": "Monday", "timeSlot": "08:00-08:50" }),
    );
    assert!(empty.get("modal").unwrap().is_null());

    let existing = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "desk.cell.click",
        json!({ "day": "Sunday", "timeSlot": "08:00-08:50", "click": "double" }),
    );
    let locked = existing
        .pointer("/modal/form/locked")
        .and_then(|v| v.as_array())
        .map(|a| a.len());
    assert_eq!(locked, Some(7));
    let refused = request_err(&mut stdin, &mut reader, "8", "desk.entry.delete", json!({}));
    assert_eq!(refused.get("code"), Some(&json!("read_only")));
}

#[test]
fn update_refuses_dates_that_create_a_room_clash() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let spring = seeded_routine(&mut stdin, &mut reader, "routined-update-clash");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "routines.update",
        json!({
            "id": spring, "title": "Spring Routine", "batchId": "b1", "semesterId": "s1",
            "effectiveFrom": "2026-01-01", "effectiveTo": "2026-03-31"
        }),
    );
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "routines.create",
        json!({
            "title": "Summer Routine", "batchId": "b1", "semesterId": "s1",
            "effectiveFrom": "2026-04-01", "effectiveTo": "2026-06-30"
        }),
    );
    let summer = created
        .pointer("/routine/id")
        .and_then(|v| v.as_str())
        .expect("routine id")
        .to_string();
    add_entry(&mut stdin, &mut reader, "3", &spring, "ca-phy", "room-a", "m1", "Monday");
    add_entry(&mut stdin, &mut reader, "4", &summer, "ca-chem", "room-a", "m1", "Monday");

    let clash = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "routines.update",
        json!({
            "id": summer, "title": "Summer Routine", "batchId": "b1", "semesterId": "s1",
            "effectiveFrom": "2026-03-01", "effectiveTo": "2026-06-30"
        }),
    );
    assert_eq!(clash.get("code"), Some(&json!("conflict")));
    assert_eq!(clash.pointer("/details/day"), Some(&json!("Monday")));

    let fetched = request_ok(&mut stdin, &mut reader, "6", "routines.get", json!({ "id": summer }));
    assert_eq!(fetched.pointer("/routine/effectiveFrom"), Some(&json!("2026-04-01")));
}
