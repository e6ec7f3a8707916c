mod test_support;

use serde_json::json;
use test_support::{add_entry, day_count, request_err, request_ok, seeded_routine, spawn_sidecar};

#[test]
fn copy_sunday_to_monday_mirrors_three_entries() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let routine_id = seeded_routine(&mut stdin, &mut reader, "routined-copy-basic");
    add_entry(&mut stdin, &mut reader, "1", &routine_id, "ca-phy", "room-a", "m1", "Sunday");
    add_entry(&mut stdin, &mut reader, "2", &routine_id, "ca-chem", "room-b", "m2", "Sunday");
    add_entry(&mut stdin, &mut reader, "3", &routine_id, "ca-math", "room-a", "m3", "Sunday");

    let copied = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "routineEntries.copy",
        json!({ "routineId": routine_id, "sourceDay": "Sunday", "targetDays": ["Monday"] }),
    );
    assert_eq!(copied.get("aborted"), Some(&json!(false)));
    assert_eq!(copied.get("totalCopied"), Some(&json!(3)));
    assert_eq!(copied.get("daysCompleted"), Some(&json!(["Monday"])));

    let grid = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "routineEntries.grid",
        json!({ "routineId": routine_id, "shift": "Morning" }),
    );
    assert_eq!(day_count(&grid, "Monday"), 3);
    for label in ["08:00-08:50", "09:00-09:50", "10:10-11:00"] {
        let sunday = grid.pointer(&format!("/grid/Sunday/{}/courseAssignment/id", label));
        let monday = grid.pointer(&format!("/grid/Monday/{}/courseAssignment/id", label));
        assert_eq!(sunday, monday, "slot {}", label);
        let room = grid.pointer(&format!("/grid/Monday/{}/room/id", label));
        assert_eq!(room, grid.pointer(&format!("/grid/Sunday/{}/room/id", label)));
    }
}

#[test]
fn copy_onto_many_days_creates_n_times_m_entries() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let routine_id = seeded_routine(&mut stdin, &mut reader, "routined-copy-many");
    add_entry(&mut stdin, &mut reader, "1", &routine_id, "ca-phy", "room-a", "m1", "Sunday");
    add_entry(&mut stdin, &mut reader, "2", &routine_id, "ca-chem", "room-b", "m2", "Sunday");

    let copied = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "routineEntries.copy",
        json!({
            "routineId": routine_id,
            "sourceDay": "Sunday",
            "targetDays": ["Tuesday", "Wednesday", "Thursday", "Friday"]
        }),
    );
    assert_eq!(copied.get("totalCopied"), Some(&json!(8)));
    let grid = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "routineEntries.grid",
        json!({ "routineId": routine_id, "shift": "Morning" }),
    );
    for day in ["Tuesday", "Wednesday", "Thursday", "Friday"] {
        assert_eq!(day_count(&grid, day), 2, "{}", day);
    }
    assert_eq!(day_count(&grid, "Monday"), 0);
}

#[test]
fn conflict_aborts_and_persists_nothing() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let routine_id = seeded_routine(&mut stdin, &mut reader, "routined-copy-conflict");
    add_entry(&mut stdin, &mut reader, "1", &routine_id, "ca-phy", "room-a", "m1", "Sunday");
    add_entry(&mut stdin, &mut reader, "2", &routine_id, "ca-chem", "room-b", "m2", "Sunday");
    add_entry(&mut stdin, &mut reader, "3", &routine_id, "ca-math", "room-a", "m2", "Wednesday");

    let before = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "routineEntries.grid",
        json!({ "routineId": routine_id, "shift": "Morning" }),
    );

    let aborted = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "routineEntries.copy",
        json!({
            "routineId": routine_id,
            "sourceDay": "Sunday",
            "targetDays": ["Monday", "Wednesday", "Thursday"]
        }),
    );
    assert_eq!(aborted.get("aborted"), Some(&json!(true)));
    assert_eq!(aborted.get("conflictDay"), Some(&json!("Wednesday")));
    assert!(aborted
        .get("conflictMessage")
        .and_then(|v| v.as_str())
        .is_some_and(|m| !m.is_empty()));
    assert_eq!(aborted.get("totalCopied"), Some(&json!(3)));

    let after = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "routineEntries.grid",
        json!({ "routineId": routine_id, "shift": "Morning" }),
    );
    assert_eq!(before, after);
}

#[test]
fn copy_rejects_source_in_targets_and_empty_source() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let routine_id = seeded_routine(&mut stdin, &mut reader, "routined-copy-bad");
    add_entry(&mut stdin, &mut reader, "1", &routine_id, "ca-phy", "room-a", "m1", "Sunday");

    let overlap = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "routineEntries.copy",
        json!({ "routineId": routine_id, "sourceDay": "Sunday", "targetDays": ["Sunday"] }),
    );
    assert_eq!(overlap.get("code"), Some(&json!("bad_params")));

    let empty = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "routineEntries.copy",
        json!({ "routineId": routine_id, "sourceDay": "Monday", "targetDays": ["Tuesday"] }),
    );
    assert_eq!(empty.get("code"), Some(&json!("bad_params")));

    let saturday = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "routineEntries.copy",
        json!({ "routineId": routine_id, "sourceDay": "Saturday", "targetDays": ["Monday"] }),
    );
    assert_eq!(saturday.get("code"), Some(&json!("bad_params")));
}

#[test]
fn copy_aborts_on_room_held_by_another_routine() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let first = seeded_routine(&mut stdin, &mut reader, "routined-copy-cross");
    add_entry(&mut stdin, &mut reader, "1", &first, "ca-chem", "room-a", "m2", "Monday");

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "routines.create",
        json!({ "title": "Summer Routine", "batchId": "b1", "semesterId": "s1" }),
    );
    let second = created
        .pointer("/routine/id")
        .and_then(|v| v.as_str())
        .expect("routine id")
        .to_string();
    add_entry(&mut stdin, &mut reader, "3", &second, "ca-math", "room-b", "m1", "Sunday");
    add_entry(&mut stdin, &mut reader, "4", &second, "ca-phy", "room-a", "m2", "Sunday");

    let copied = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "routineEntries.copy",
        json!({ "routineId": second, "sourceDay": "Sunday", "targetDays": ["Monday", "Tuesday"] }),
    );
    assert_eq!(copied.get("aborted"), Some(&json!(true)));
    assert_eq!(copied.get("conflictDay"), Some(&json!("Monday")));
    assert_eq!(copied.get("totalCopied"), Some(&json!(1)));
    let message = copied.get("conflictMessage").and_then(|v| v.as_str()).unwrap_or("");
    assert!(message.contains("Spring Routine"), "{}", message);

    let grid = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "routineEntries.grid",
        json!({ "routineId": second, "shift": "Morning" }),
    );
    assert_eq!(day_count(&grid, "Monday"), 0);
    assert_eq!(day_count(&grid, "Tuesday"), 0);
    assert_eq!(day_count(&grid, "Sunday"), 2);
}

#[test]
fn copy_limited_to_a_shift_skips_other_shift_entries() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let routine_id = seeded_routine(&mut stdin, &mut reader, "routined-copy-shift");
    add_entry(&mut stdin, &mut reader, "1", &routine_id, "ca-phy", "room-a", "m1", "Sunday");
    add_entry(&mut stdin, &mut reader, "2", &routine_id, "ca-phy-day", "room-a", "d1", "Sunday");

    let copied = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "routineEntries.copy",
        json!({
            "routineId": routine_id,
            "sourceDay": "Sunday",
            "targetDays": ["Monday"],
            "shift": "Morning"
        }),
    );
    assert_eq!(copied.get("totalCopied"), Some(&json!(1)));

    let day_grid = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "routineEntries.grid",
        json!({ "routineId": routine_id, "shift": "Day" }),
    );
    assert_eq!(day_count(&day_grid, "Sunday"), 1);
    assert_eq!(day_count(&day_grid, "Monday"), 0);
}
