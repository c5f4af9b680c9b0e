use crate::model::{AttendanceStatus, ClassName, DormitoryPermission, Record, Student};
use chrono::NaiveDate;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub absent_count: usize,
    pub permission_count: usize,
    pub sick_count: usize,
    pub total_by_record: usize,
    /// Distinct dates: several records on one date count as one day.
    pub total_by_day: usize,
}

pub fn count_days<'a, I>(dates: I) -> usize
where
    I: IntoIterator<Item = &'a str>,
{
    dates.into_iter().collect::<HashSet<_>>().len()
}

pub fn summarize<'a, I>(records: I) -> AttendanceSummary
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut summary = AttendanceSummary::default();
    let mut days: HashSet<&str> = HashSet::new();
    for r in records {
        match r.status {
            AttendanceStatus::Absent => summary.absent_count += 1,
            AttendanceStatus::Permission => summary.permission_count += 1,
            AttendanceStatus::Sick => summary.sick_count += 1,
        }
        summary.total_by_record += 1;
        days.insert(r.date.as_str());
    }
    summary.total_by_day = days.len();
    summary
}

// Filter params arrive straight from form fields: a blank value means "no filter".
fn blank_as_none<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

/// Accepts any `NaiveDate`-parseable day and stores it zero-padded, so string
/// comparison against record dates stays correct.
fn date_bound<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = blank_as_none(d)? else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map(|day| Some(day.format("%Y-%m-%d").to_string()))
        .map_err(|_| de::Error::custom(format!("date must be YYYY-MM-DD, got {raw:?}")))
}

fn class_filter<'de, D>(d: D) -> Result<Option<ClassName>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = blank_as_none(d)? else {
        return Ok(None);
    };
    ClassName::parse(&raw)
        .map(Some)
        .ok_or_else(|| de::Error::custom(format!("unknown class: {raw}")))
}

/// Inclusive `YYYY-MM-DD` bounds, compared as strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    #[serde(default, deserialize_with = "date_bound")]
    pub start: Option<String>,
    #[serde(default, deserialize_with = "date_bound")]
    pub end: Option<String>,
}

impl DateRange {
    pub fn contains(&self, date: &str) -> bool {
        if let Some(start) = self.start.as_deref() {
            if date < start {
                return false;
            }
        }
        if let Some(end) = self.end.as_deref() {
            if date > end {
                return false;
            }
        }
        true
    }
}

fn name_matches(name: &str, query: Option<&str>) -> bool {
    match query.map(str::trim) {
        Some(q) if !q.is_empty() => name.to_lowercase().contains(&q.to_lowercase()),
        _ => true,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReport {
    pub student: Student,
    pub summary: AttendanceSummary,
    pub records: Vec<Record>,
}

pub fn student_report(student: &Student, records: &[Record], range: &DateRange) -> StudentReport {
    let mut mine: Vec<Record> = records
        .iter()
        .filter(|r| r.student_id == student.id && range.contains(&r.date))
        .cloned()
        .collect();
    mine.sort_by(|a, b| b.date.cmp(&a.date));
    StudentReport {
        student: student.clone(),
        summary: summarize(&mine),
        records: mine,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassReportRow {
    pub student_id: String,
    pub student_name: String,
    #[serde(flatten)]
    pub summary: AttendanceSummary,
}

/// One row per student of `class_name` that has at least one record in range,
/// sorted by student name.
pub fn class_report(
    students: &[Student],
    records: &[Record],
    class_name: ClassName,
    range: &DateRange,
) -> Vec<ClassReportRow> {
    let mut by_student: BTreeMap<&str, Vec<&Record>> = BTreeMap::new();
    for r in records
        .iter()
        .filter(|r| r.class_name == class_name && range.contains(&r.date))
    {
        by_student.entry(r.student_id.as_str()).or_default().push(r);
    }

    let mut rows: Vec<ClassReportRow> = students
        .iter()
        .filter(|s| s.class_name == class_name)
        .filter_map(|s| {
            let mine = by_student.get(s.id.as_str())?;
            let summary = summarize(mine.iter().copied());
            (summary.total_by_record > 0).then(|| ClassReportRow {
                student_id: s.id.clone(),
                student_name: s.name.clone(),
                summary,
            })
        })
        .collect();
    rows.sort_by(|a, b| a.student_name.cmp(&b.student_name));
    rows
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFilter {
    #[serde(default, deserialize_with = "class_filter")]
    pub class_name: Option<ClassName>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub course: Option<String>,
    #[serde(flatten)]
    pub range: DateRange,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub query: Option<String>,
}

/// General report: every filter is optional; newest date first.
pub fn filter_records(records: &[Record], filter: &RecordFilter) -> Vec<Record> {
    let course = filter.course.as_deref().filter(|c| !c.is_empty());
    let mut out: Vec<Record> = records
        .iter()
        .filter(|r| filter.class_name.map_or(true, |c| r.class_name == c))
        .filter(|r| course.map_or(true, |c| r.course.as_deref() == Some(c)))
        .filter(|r| filter.range.contains(&r.date))
        .filter(|r| name_matches(&r.student_name, filter.query.as_deref()))
        .cloned()
        .collect();
    out.sort_by(|a, b| b.date.cmp(&a.date));
    out
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DormitoryFilter {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub dormitory_id: Option<String>,
    #[serde(flatten)]
    pub range: DateRange,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub query: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DormitoryReportRow {
    pub student_id: String,
    pub student_name: String,
    pub dormitory_name: String,
    pub total_by_record: usize,
    pub total_by_day: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DormitoryReport {
    pub permissions: Vec<DormitoryPermission>,
    pub students: Vec<DormitoryReportRow>,
}

pub fn dormitory_report(permissions: &[DormitoryPermission], filter: &DormitoryFilter) -> DormitoryReport {
    let dormitory_id = filter.dormitory_id.as_deref().filter(|d| !d.is_empty());
    let mut matched: Vec<DormitoryPermission> = permissions
        .iter()
        .filter(|p| dormitory_id.map_or(true, |d| p.dormitory_id == d))
        .filter(|p| filter.range.contains(&p.date))
        .filter(|p| name_matches(&p.student_name, filter.query.as_deref()))
        .cloned()
        .collect();
    matched.sort_by(|a, b| b.date.cmp(&a.date));

    let mut grouped: BTreeMap<&str, Vec<&DormitoryPermission>> = BTreeMap::new();
    for p in &matched {
        grouped.entry(p.student_id.as_str()).or_default().push(p);
    }
    let mut students: Vec<DormitoryReportRow> = grouped
        .into_values()
        .map(|ps| DormitoryReportRow {
            student_id: ps[0].student_id.clone(),
            student_name: ps[0].student_name.clone(),
            dormitory_name: ps[0].dormitory_name.clone(),
            total_by_record: ps.len(),
            total_by_day: count_days(ps.iter().map(|p| p.date.as_str())),
        })
        .collect();
    students.sort_by(|a, b| a.student_name.cmp(&b.student_name));

    DormitoryReport {
        permissions: matched,
        students,
    }
}
