mod test_support;

use serde_json::json;
use test_support::{add_entry, request_ok, seeded_routine, spawn_sidecar};

fn labels(view: &serde_json::Value) -> Vec<String> {
    view.pointer("/grid/columns")
        .and_then(|v| v.as_array())
        .map(|cols| {
            cols.iter()
                .filter_map(|c| c.get("label").and_then(|l| l.as_str()))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn shift_switch_changes_columns() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let routine_id = seeded_routine(&mut stdin, &mut reader, "routined-grid-shift");
    let _ = add_entry(
        &mut stdin, &mut reader, "1", &routine_id, "ca-phy", "room-a", "m1", "Sunday",
    );

    let morning = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "desk.open",
        json!({ "routineId": routine_id }),
    );
    assert_eq!(morning.get("shift"), Some(&json!("Morning")));
    assert_eq!(morning.pointer("/grid/phase"), Some(&json!("ready")));
    assert_eq!(
        labels(&morning),
        vec!["08:00-08:50", "09:00-09:50", "09:50-10:10", "10:10-11:00"]
    );
    assert_eq!(morning.pointer("/grid/rows").and_then(|r| r.as_array()).map(|r| r.len()), Some(6));
    assert_eq!(morning.pointer("/grid/rows/0/day"), Some(&json!("Sunday")));
    assert_eq!(morning.pointer("/grid/rows/0/cells/0/kind"), Some(&json!("entry")));
    assert_eq!(
        morning.pointer("/grid/rows/0/cells/0/courseCode"),
        Some(&json!("PHY101"))
    );
    assert_eq!(morning.pointer("/grid/rows/1/cells/0/kind"), Some(&json!("empty")));

    let day = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "desk.shift",
        json!({ "shift": "Day" }),
    );
    assert_eq!(day.get("shift"), Some(&json!("Day")));
    assert_eq!(labels(&day), vec!["13:00-13:50"]);
    assert_eq!(day.pointer("/grid/rows/0/cells/0/kind"), Some(&json!("empty")));

    let raw = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "routineEntries.grid",
        json!({ "routineId": routine_id, "shift": "Day" }),
    );
    let keys: Vec<&String> = raw
        .get("slots")
        .and_then(|v| v.as_object())
        .map(|m| m.keys().collect())
        .unwrap_or_default();
    assert_eq!(keys, vec!["13:00-13:50"]);
}

#[test]
fn shift_is_required_for_raw_grid() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let routine_id = seeded_routine(&mut stdin, &mut reader, "routined-grid-missing-shift");
    let resp = test_support::request(
        &mut stdin,
        &mut reader,
        "1",
        "routineEntries.grid",
        json!({ "routineId": routine_id }),
    );
    assert_eq!(resp.pointer("/error/code"), Some(&json!("bad_params")));
}
