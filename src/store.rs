//! Typed access to the workspace tables.
//!
//! Every insert/delete also appends to the change feed within the same
//! transaction. Cascades are explicit (no ON DELETE CASCADE in the schema).

use crate::feed::{record_change, ChangeKind};
use crate::model::{
    AttendanceStatus, ClassName, Course, Dormitory, DormitoryPermission, DormitoryStudent, Record,
    RecordType, Student,
};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Invalid(String),
    #[error("insert into {table} failed: {source}")]
    Insert {
        table: &'static str,
        source: rusqlite::Error,
    },
    #[error("delete from {table} failed: {source}")]
    Delete {
        table: &'static str,
        source: rusqlite::Error,
    },
    #[error("transaction failed: {0}")]
    Tx(rusqlite::Error),
    #[error("commit failed: {0}")]
    Commit(rusqlite::Error),
    #[error(transparent)]
    Query(#[from] rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

fn insert_err(table: &'static str) -> impl Fn(rusqlite::Error) -> StoreError {
    move |source| StoreError::Insert { table, source }
}

fn delete_err(table: &'static str) -> impl Fn(rusqlite::Error) -> StoreError {
    move |source| StoreError::Delete { table, source }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Validates a `YYYY-MM-DD` date; an empty or missing value means today.
pub fn parse_date(raw: Option<&str>) -> StoreResult<String> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(|d| d.format("%Y-%m-%d").to_string())
            .map_err(|_| StoreError::Invalid(format!("date must be YYYY-MM-DD, got {s:?}"))),
    }
}

fn required_name(raw: &str, what: &str) -> StoreResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(StoreError::Invalid(format!("{what} must not be empty")));
    }
    Ok(name.to_string())
}

fn class_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<ClassName> {
    let raw: String = row.get(idx)?;
    ClassName::parse(&raw).ok_or(rusqlite::Error::InvalidColumnType(idx, raw, Type::Text))
}

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get(0)?,
        name: row.get(1)?,
        class_name: class_from_row(row, 2)?,
    })
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    let status: String = row.get(5)?;
    let kind: String = row.get(7)?;
    Ok(Record {
        id: row.get(0)?,
        date: row.get(1)?,
        student_id: row.get(2)?,
        student_name: row.get(3)?,
        class_name: class_from_row(row, 4)?,
        status: AttendanceStatus::parse(&status)
            .ok_or(rusqlite::Error::InvalidColumnType(5, status, Type::Text))?,
        course: row.get(6)?,
        record_type: RecordType::parse(&kind)
            .ok_or(rusqlite::Error::InvalidColumnType(7, kind, Type::Text))?,
    })
}

fn dormitory_permission_from_row(row: &Row<'_>) -> rusqlite::Result<DormitoryPermission> {
    Ok(DormitoryPermission {
        id: row.get(0)?,
        date: row.get(1)?,
        student_id: row.get(2)?,
        student_name: row.get(3)?,
        dormitory_id: row.get(4)?,
        dormitory_name: row.get(5)?,
        description: row.get(6)?,
    })
}

const RECORD_COLUMNS: &str = "id, date, student_id, student_name, class_name, status, course, type";
const DORMITORY_PERMISSION_COLUMNS: &str =
    "id, date, student_id, student_name, dormitory_id, dormitory_name, description";

// ---------------------------------------------------------------------------
// Students
// ---------------------------------------------------------------------------

pub fn list_students(conn: &Connection, class_name: Option<ClassName>) -> StoreResult<Vec<Student>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, class_name FROM students
         WHERE (?1 IS NULL OR class_name = ?1)
         ORDER BY name, id",
    )?;
    let rows = stmt
        .query_map([class_name.map(ClassName::key)], student_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_student(conn: &Connection, student_id: &str) -> StoreResult<Student> {
    conn.query_row(
        "SELECT id, name, class_name FROM students WHERE id = ?",
        [student_id],
        student_from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound("student"))
}

/// Case-insensitive substring search; queries shorter than two characters match nothing.
pub fn search_students(conn: &Connection, query: &str) -> StoreResult<Vec<Student>> {
    let q = query.trim().to_lowercase();
    if q.chars().count() < 2 {
        return Ok(Vec::new());
    }
    Ok(list_students(conn, None)?
        .into_iter()
        .filter(|s| s.name.to_lowercase().contains(&q))
        .collect())
}

pub fn insert_student(conn: &Connection, name: &str, class_name: ClassName) -> StoreResult<Student> {
    let mut created = insert_students_bulk(conn, &[name.to_string()], class_name)?;
    created.pop().ok_or(StoreError::NotFound("student"))
}

/// Inserts all names in one transaction; any failure rolls back the batch.
pub fn insert_students_bulk(
    conn: &Connection,
    names: &[String],
    class_name: ClassName,
) -> StoreResult<Vec<Student>> {
    let mut students = Vec::with_capacity(names.len());
    for name in names {
        students.push(Student {
            id: new_id(),
            name: required_name(name, "student name")?,
            class_name,
        });
    }

    let tx = conn.unchecked_transaction().map_err(StoreError::Tx)?;
    for s in &students {
        tx.execute(
            "INSERT INTO students(id, name, class_name) VALUES(?, ?, ?)",
            (&s.id, &s.name, s.class_name.key()),
        )
        .map_err(insert_err("students"))?;
        record_change(&tx, "students", ChangeKind::Insert, &s.id).map_err(insert_err("changes"))?;
    }
    tx.commit().map_err(StoreError::Commit)?;
    debug!(count = students.len(), class = class_name.key(), "students inserted");
    Ok(students)
}

/// Deletes the student and every record that references it.
pub fn delete_student(conn: &Connection, student_id: &str) -> StoreResult<usize> {
    let tx = conn.unchecked_transaction().map_err(StoreError::Tx)?;
    get_student(&tx, student_id)?;
    let record_ids: Vec<String> = {
        let mut stmt = tx.prepare("SELECT id FROM records WHERE student_id = ?")?;
        let ids = stmt
            .query_map([student_id], |r| r.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        ids
    };
    tx.execute("DELETE FROM records WHERE student_id = ?", [student_id])
        .map_err(delete_err("records"))?;
    for id in &record_ids {
        record_change(&tx, "records", ChangeKind::Delete, id).map_err(insert_err("changes"))?;
    }
    let n = tx
        .execute("DELETE FROM students WHERE id = ?", [student_id])
        .map_err(delete_err("students"))?;
    if n == 0 {
        return Err(StoreError::NotFound("student"));
    }
    record_change(&tx, "students", ChangeKind::Delete, student_id).map_err(insert_err("changes"))?;
    tx.commit().map_err(StoreError::Commit)?;
    debug!(student_id, records = record_ids.len(), "student deleted");
    Ok(record_ids.len())
}

// ---------------------------------------------------------------------------
// Courses
// ---------------------------------------------------------------------------

pub fn list_courses(conn: &Connection) -> StoreResult<Vec<Course>> {
    let mut stmt = conn.prepare("SELECT id, name FROM courses ORDER BY name, id")?;
    let rows = stmt
        .query_map([], |r| {
            Ok(Course {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn insert_course(conn: &Connection, name: &str) -> StoreResult<Course> {
    let course = Course {
        id: new_id(),
        name: required_name(name, "course name")?,
    };
    let tx = conn.unchecked_transaction().map_err(StoreError::Tx)?;
    tx.execute(
        "INSERT INTO courses(id, name) VALUES(?, ?)",
        (&course.id, &course.name),
    )
    .map_err(insert_err("courses"))?;
    record_change(&tx, "courses", ChangeKind::Insert, &course.id).map_err(insert_err("changes"))?;
    tx.commit().map_err(StoreError::Commit)?;
    Ok(course)
}

/// Records keep their own copy of the course name, so nothing cascades.
pub fn delete_course(conn: &Connection, course_id: &str) -> StoreResult<()> {
    let tx = conn.unchecked_transaction().map_err(StoreError::Tx)?;
    let n = tx
        .execute("DELETE FROM courses WHERE id = ?", [course_id])
        .map_err(delete_err("courses"))?;
    if n == 0 {
        return Err(StoreError::NotFound("course"));
    }
    record_change(&tx, "courses", ChangeKind::Delete, course_id).map_err(insert_err("changes"))?;
    tx.commit().map_err(StoreError::Commit)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

pub fn list_records(conn: &Connection) -> StoreResult<Vec<Record>> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM records ORDER BY date DESC, id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_records_for_student(conn: &Connection, student_id: &str) -> StoreResult<Vec<Record>> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM records WHERE student_id = ? ORDER BY date DESC, id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([student_id], record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_records_for_class(conn: &Connection, class_name: ClassName) -> StoreResult<Vec<Record>> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM records WHERE class_name = ? ORDER BY date DESC, id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([class_name.key()], record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn insert_record(conn: &Connection, r: &Record) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO records(id, date, student_id, student_name, class_name, status, course, type)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &r.id,
            &r.date,
            &r.student_id,
            &r.student_name,
            r.class_name.key(),
            r.status.key(),
            &r.course,
            r.record_type.key(),
        ),
    )
    .map_err(insert_err("records"))?;
    record_change(conn, "records", ChangeKind::Insert, &r.id).map_err(insert_err("changes"))?;
    Ok(())
}

/// A permission record: `permission` or `sick`, never `absent`, no course.
pub fn insert_permission_record(
    conn: &Connection,
    student_id: &str,
    date: &str,
    status: AttendanceStatus,
) -> StoreResult<Record> {
    if status == AttendanceStatus::Absent {
        return Err(StoreError::Invalid(
            "permission status must be permission or sick".to_string(),
        ));
    }
    let student = get_student(conn, student_id)?;
    let record = Record {
        id: new_id(),
        date: parse_date(Some(date))?,
        student_id: student.id,
        student_name: student.name,
        class_name: student.class_name,
        status,
        course: None,
        record_type: RecordType::Permission,
    };
    let tx = conn.unchecked_transaction().map_err(StoreError::Tx)?;
    insert_record(&tx, &record)?;
    tx.commit().map_err(StoreError::Commit)?;
    Ok(record)
}

#[derive(Debug, Clone)]
pub struct AttendanceEntry {
    pub student_id: String,
    pub status: AttendanceStatus,
}

/// One attendance record per entry. Every student must belong to `class_name`;
/// a single bad entry rejects the whole sheet.
pub fn insert_attendance_records(
    conn: &Connection,
    class_name: ClassName,
    course: &str,
    date: &str,
    entries: &[AttendanceEntry],
) -> StoreResult<Vec<Record>> {
    let course = required_name(course, "course")?;
    let date = parse_date(Some(date))?;
    if entries.is_empty() {
        return Err(StoreError::Invalid(
            "at least one student status is required".to_string(),
        ));
    }

    let tx = conn.unchecked_transaction().map_err(StoreError::Tx)?;
    let mut created = Vec::with_capacity(entries.len());
    for e in entries {
        let student = get_student(&tx, &e.student_id)?;
        if student.class_name != class_name {
            return Err(StoreError::Invalid(format!(
                "student {} is not in class {}",
                student.id,
                class_name.key()
            )));
        }
        let record = Record {
            id: new_id(),
            date: date.clone(),
            student_id: student.id,
            student_name: student.name,
            class_name,
            status: e.status,
            course: Some(course.clone()),
            record_type: RecordType::Attendance,
        };
        insert_record(&tx, &record)?;
        created.push(record);
    }
    tx.commit().map_err(StoreError::Commit)?;
    debug!(count = created.len(), class = class_name.key(), %date, "attendance submitted");
    Ok(created)
}

pub fn delete_record(conn: &Connection, record_id: &str) -> StoreResult<()> {
    let tx = conn.unchecked_transaction().map_err(StoreError::Tx)?;
    let n = tx
        .execute("DELETE FROM records WHERE id = ?", [record_id])
        .map_err(delete_err("records"))?;
    if n == 0 {
        return Err(StoreError::NotFound("record"));
    }
    record_change(&tx, "records", ChangeKind::Delete, record_id).map_err(insert_err("changes"))?;
    tx.commit().map_err(StoreError::Commit)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Dormitories
// ---------------------------------------------------------------------------

pub fn list_dormitories(conn: &Connection) -> StoreResult<Vec<Dormitory>> {
    let mut stmt = conn.prepare("SELECT id, name FROM dormitories ORDER BY name, id")?;
    let rows = stmt
        .query_map([], |r| {
            Ok(Dormitory {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_dormitory(conn: &Connection, dormitory_id: &str) -> StoreResult<Dormitory> {
    conn.query_row(
        "SELECT id, name FROM dormitories WHERE id = ?",
        [dormitory_id],
        |r| {
            Ok(Dormitory {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        },
    )
    .optional()?
    .ok_or(StoreError::NotFound("dormitory"))
}

pub fn insert_dormitory(conn: &Connection, name: &str) -> StoreResult<Dormitory> {
    let dormitory = Dormitory {
        id: new_id(),
        name: required_name(name, "dormitory name")?,
    };
    let tx = conn.unchecked_transaction().map_err(StoreError::Tx)?;
    tx.execute(
        "INSERT INTO dormitories(id, name) VALUES(?, ?)",
        (&dormitory.id, &dormitory.name),
    )
    .map_err(insert_err("dormitories"))?;
    record_change(&tx, "dormitories", ChangeKind::Insert, &dormitory.id)
        .map_err(insert_err("changes"))?;
    tx.commit().map_err(StoreError::Commit)?;
    Ok(dormitory)
}

fn ids_where(conn: &Connection, sql: &str, key: &str) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map([key], |r| r.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

/// Deletes the dormitory, its students and all of their permissions.
pub fn delete_dormitory(conn: &Connection, dormitory_id: &str) -> StoreResult<()> {
    let tx = conn.unchecked_transaction().map_err(StoreError::Tx)?;
    get_dormitory(&tx, dormitory_id)?;
    let permission_ids = ids_where(
        &tx,
        "SELECT p.id FROM dormitory_permissions p
         JOIN dormitory_students s ON s.id = p.student_id
         WHERE s.dormitory_id = ?1
         UNION
         SELECT id FROM dormitory_permissions WHERE dormitory_id = ?1",
        dormitory_id,
    )?;
    let student_ids = ids_where(
        &tx,
        "SELECT id FROM dormitory_students WHERE dormitory_id = ?",
        dormitory_id,
    )?;

    tx.execute(
        "DELETE FROM dormitory_permissions
         WHERE dormitory_id = ?1
            OR student_id IN (SELECT id FROM dormitory_students WHERE dormitory_id = ?1)",
        [dormitory_id],
    )
    .map_err(delete_err("dormitory_permissions"))?;
    for id in &permission_ids {
        record_change(&tx, "dormitory_permissions", ChangeKind::Delete, id)
            .map_err(insert_err("changes"))?;
    }
    tx.execute(
        "DELETE FROM dormitory_students WHERE dormitory_id = ?",
        [dormitory_id],
    )
    .map_err(delete_err("dormitory_students"))?;
    for id in &student_ids {
        record_change(&tx, "dormitory_students", ChangeKind::Delete, id)
            .map_err(insert_err("changes"))?;
    }
    let n = tx
        .execute("DELETE FROM dormitories WHERE id = ?", [dormitory_id])
        .map_err(delete_err("dormitories"))?;
    if n == 0 {
        return Err(StoreError::NotFound("dormitory"));
    }
    record_change(&tx, "dormitories", ChangeKind::Delete, dormitory_id)
        .map_err(insert_err("changes"))?;
    tx.commit().map_err(StoreError::Commit)?;
    debug!(
        dormitory_id,
        students = student_ids.len(),
        permissions = permission_ids.len(),
        "dormitory deleted"
    );
    Ok(())
}

pub fn list_dormitory_students(
    conn: &Connection,
    dormitory_id: Option<&str>,
) -> StoreResult<Vec<DormitoryStudent>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, dormitory_id FROM dormitory_students
         WHERE (?1 IS NULL OR dormitory_id = ?1)
         ORDER BY name, id",
    )?;
    let rows = stmt
        .query_map([dormitory_id], |r| {
            Ok(DormitoryStudent {
                id: r.get(0)?,
                name: r.get(1)?,
                dormitory_id: r.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn get_dormitory_student(conn: &Connection, student_id: &str) -> StoreResult<DormitoryStudent> {
    conn.query_row(
        "SELECT id, name, dormitory_id FROM dormitory_students WHERE id = ?",
        [student_id],
        |r| {
            Ok(DormitoryStudent {
                id: r.get(0)?,
                name: r.get(1)?,
                dormitory_id: r.get(2)?,
            })
        },
    )
    .optional()?
    .ok_or(StoreError::NotFound("dormitory student"))
}

pub fn insert_dormitory_students_bulk(
    conn: &Connection,
    names: &[String],
    dormitory_id: &str,
) -> StoreResult<Vec<DormitoryStudent>> {
    let dormitory = get_dormitory(conn, dormitory_id)?;
    let mut students = Vec::with_capacity(names.len());
    for name in names {
        students.push(DormitoryStudent {
            id: new_id(),
            name: required_name(name, "student name")?,
            dormitory_id: dormitory.id.clone(),
        });
    }

    let tx = conn.unchecked_transaction().map_err(StoreError::Tx)?;
    for s in &students {
        tx.execute(
            "INSERT INTO dormitory_students(id, name, dormitory_id) VALUES(?, ?, ?)",
            (&s.id, &s.name, &s.dormitory_id),
        )
        .map_err(insert_err("dormitory_students"))?;
        record_change(&tx, "dormitory_students", ChangeKind::Insert, &s.id)
            .map_err(insert_err("changes"))?;
    }
    tx.commit().map_err(StoreError::Commit)?;
    debug!(count = students.len(), dormitory = %dormitory.name, "dormitory students inserted");
    Ok(students)
}

pub fn delete_dormitory_student(conn: &Connection, student_id: &str) -> StoreResult<usize> {
    let tx = conn.unchecked_transaction().map_err(StoreError::Tx)?;
    get_dormitory_student(&tx, student_id)?;
    let permission_ids = ids_where(
        &tx,
        "SELECT id FROM dormitory_permissions WHERE student_id = ?",
        student_id,
    )?;
    tx.execute(
        "DELETE FROM dormitory_permissions WHERE student_id = ?",
        [student_id],
    )
    .map_err(delete_err("dormitory_permissions"))?;
    for id in &permission_ids {
        record_change(&tx, "dormitory_permissions", ChangeKind::Delete, id)
            .map_err(insert_err("changes"))?;
    }
    let n = tx
        .execute("DELETE FROM dormitory_students WHERE id = ?", [student_id])
        .map_err(delete_err("dormitory_students"))?;
    if n == 0 {
        return Err(StoreError::NotFound("dormitory student"));
    }
    record_change(&tx, "dormitory_students", ChangeKind::Delete, student_id)
        .map_err(insert_err("changes"))?;
    tx.commit().map_err(StoreError::Commit)?;
    Ok(permission_ids.len())
}

pub fn list_dormitory_permissions(conn: &Connection) -> StoreResult<Vec<DormitoryPermission>> {
    let sql = format!(
        "SELECT {DORMITORY_PERMISSION_COLUMNS} FROM dormitory_permissions ORDER BY date DESC, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], dormitory_permission_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_dormitory_permissions_on(conn: &Connection, date: &str) -> StoreResult<Vec<DormitoryPermission>> {
    let sql = format!(
        "SELECT {DORMITORY_PERMISSION_COLUMNS} FROM dormitory_permissions WHERE date = ? ORDER BY student_name, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([date], dormitory_permission_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn insert_dormitory_permission(
    conn: &Connection,
    student_id: &str,
    date: &str,
    description: &str,
) -> StoreResult<DormitoryPermission> {
    let student = get_dormitory_student(conn, student_id)?;
    let dormitory = get_dormitory(conn, &student.dormitory_id)?;
    let permission = DormitoryPermission {
        id: new_id(),
        date: parse_date(Some(date))?,
        student_id: student.id,
        student_name: student.name,
        dormitory_id: dormitory.id,
        dormitory_name: dormitory.name,
        description: description.trim().to_string(),
    };
    let tx = conn.unchecked_transaction().map_err(StoreError::Tx)?;
    tx.execute(
        "INSERT INTO dormitory_permissions(id, date, student_id, student_name, dormitory_id, dormitory_name, description)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        (
            &permission.id,
            &permission.date,
            &permission.student_id,
            &permission.student_name,
            &permission.dormitory_id,
            &permission.dormitory_name,
            &permission.description,
        ),
    )
    .map_err(insert_err("dormitory_permissions"))?;
    record_change(&tx, "dormitory_permissions", ChangeKind::Insert, &permission.id)
        .map_err(insert_err("changes"))?;
    tx.commit().map_err(StoreError::Commit)?;
    Ok(permission)
}

pub fn delete_dormitory_permission(conn: &Connection, permission_id: &str) -> StoreResult<()> {
    let tx = conn.unchecked_transaction().map_err(StoreError::Tx)?;
    let n = tx
        .execute("DELETE FROM dormitory_permissions WHERE id = ?", [permission_id])
        .map_err(delete_err("dormitory_permissions"))?;
    if n == 0 {
        return Err(StoreError::NotFound("dormitory permission"));
    }
    record_change(&tx, "dormitory_permissions", ChangeKind::Delete, permission_id)
        .map_err(insert_err("changes"))?;
    tx.commit().map_err(StoreError::Commit)?;
    Ok(())
}

/// Students of the dormitory who have no permission on `date`.
pub fn available_dormitory_students(
    conn: &Connection,
    dormitory_id: &str,
    date: &str,
) -> StoreResult<Vec<DormitoryStudent>> {
    get_dormitory(conn, dormitory_id)?;
    let date = parse_date(Some(date))?;
    let taken: HashSet<String> = list_dormitory_permissions_on(conn, &date)?
        .into_iter()
        .map(|p| p.student_id)
        .collect();
    Ok(list_dormitory_students(conn, Some(dormitory_id))?
        .into_iter()
        .filter(|s| !taken.contains(&s.id))
        .collect())
}
