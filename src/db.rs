use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE: &str = "absensi.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;
    // Several sidecars may share one workspace; wait for the writer lock instead of failing.
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            class_name TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_class ON students(class_name)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;

    // student_name/class_name/course are denormalized at write time.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS records(
            id TEXT PRIMARY KEY,
            date TEXT NOT NULL,
            student_id TEXT NOT NULL,
            student_name TEXT NOT NULL,
            class_name TEXT NOT NULL,
            status TEXT NOT NULL,
            course TEXT,
            type TEXT NOT NULL,
            FOREIGN KEY(student_id) REFERENCES students(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_records_student ON records(student_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_records_class_date ON records(class_name, date)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS dormitories(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS dormitory_students(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            dormitory_id TEXT NOT NULL,
            FOREIGN KEY(dormitory_id) REFERENCES dormitories(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_dormitory_students_dormitory ON dormitory_students(dormitory_id)",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS dormitory_permissions(
            id TEXT PRIMARY KEY,
            date TEXT NOT NULL,
            student_id TEXT NOT NULL,
            student_name TEXT NOT NULL,
            dormitory_id TEXT NOT NULL,
            dormitory_name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            FOREIGN KEY(student_id) REFERENCES dormitory_students(id),
            FOREIGN KEY(dormitory_id) REFERENCES dormitories(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_dormitory_permissions_student ON dormitory_permissions(student_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_dormitory_permissions_date ON dormitory_permissions(dormitory_id, date)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS profiles(
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL
        )",
        [],
    )?;
    // password_hash is an argon2 PHC string; it carries its own salt and params.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS credentials(
            profile_id TEXT PRIMARY KEY,
            password_hash TEXT NOT NULL,
            FOREIGN KEY(profile_id) REFERENCES profiles(id)
        )",
        [],
    )?;
    // Only a digest of the bearer token is stored.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS sessions(
            token_digest TEXT PRIMARY KEY,
            profile_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(profile_id) REFERENCES profiles(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sessions_created ON sessions(created_at)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS changes(
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            table_name TEXT NOT NULL,
            kind TEXT NOT NULL,
            row_id TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
pub fn open_memory() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    init_schema(&conn).expect("init schema");
    conn
}
