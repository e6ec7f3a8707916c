use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE_NAME: &str = "routines.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

#[cfg(test)]
pub fn open_in_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS departments(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS academic_years(
            id TEXT PRIMARY KEY,
            department_id TEXT NOT NULL,
            name TEXT NOT NULL,
            FOREIGN KEY(department_id) REFERENCES departments(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS semesters(
            id TEXT PRIMARY KEY,
            academic_year_id TEXT NOT NULL,
            name TEXT NOT NULL,
            FOREIGN KEY(academic_year_id) REFERENCES academic_years(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS batches(
            id TEXT PRIMARY KEY,
            semester_id TEXT NOT NULL,
            name TEXT NOT NULL,
            shift TEXT NOT NULL,
            FOREIGN KEY(semester_id) REFERENCES semesters(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses(
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL,
            title TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS teachers(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS course_assignments(
            id TEXT PRIMARY KEY,
            batch_id TEXT NOT NULL,
            course_id TEXT NOT NULL,
            teacher_id TEXT NOT NULL,
            FOREIGN KEY(batch_id) REFERENCES batches(id),
            FOREIGN KEY(course_id) REFERENCES courses(id),
            FOREIGN KEY(teacher_id) REFERENCES teachers(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_course_assignments_batch ON course_assignments(batch_id)",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS rooms(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS time_slots(
            id TEXT PRIMARY KEY,
            label TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            slot_type TEXT NOT NULL,
            shift TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_time_slots_shift ON time_slots(shift, start_time)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS routines(
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            effective_from TEXT,
            effective_to TEXT,
            status TEXT NOT NULL,
            institution TEXT,
            semester_id TEXT,
            batch_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(semester_id) REFERENCES semesters(id),
            FOREIGN KEY(batch_id) REFERENCES batches(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_routines_status ON routines(status)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS routine_entries(
            id TEXT PRIMARY KEY,
            routine_id TEXT NOT NULL,
            course_assignment_id TEXT NOT NULL,
            room_id TEXT NOT NULL,
            time_slot_id TEXT NOT NULL,
            day_of_week TEXT NOT NULL,
            entry_type TEXT NOT NULL,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT,
            FOREIGN KEY(routine_id) REFERENCES routines(id) ON DELETE CASCADE,
            FOREIGN KEY(course_assignment_id) REFERENCES course_assignments(id),
            FOREIGN KEY(room_id) REFERENCES rooms(id),
            FOREIGN KEY(time_slot_id) REFERENCES time_slots(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_routine_entries_routine ON routine_entries(routine_id)",
        [],
    )?;
    // One live entry per cell. Soft-deleted rows are outside the index so a
    // restore can be refused cleanly when the cell was reused.
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_routine_entries_cell
         ON routine_entries(routine_id, day_of_week, time_slot_id)
         WHERE deleted_at IS NULL",
        [],
    )?;

    ensure_routine_entries_is_cancelled(conn)?;

    Ok(())
}

fn ensure_routine_entries_is_cancelled(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "routine_entries", "is_cancelled")? {
        return Ok(());
    }
    conn.execute(
        "ALTER TABLE routine_entries ADD COLUMN is_cancelled INTEGER NOT NULL DEFAULT 0",
        [],
    )?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
