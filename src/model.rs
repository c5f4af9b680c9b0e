use serde::{Deserialize, Serialize};

/// The six fixed academic cohorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClassName {
    Tamhidi1,
    Tamhidi2,
    Sanah1,
    Sanah2,
    Sanah3,
    Sanah4,
}

impl ClassName {
    pub const ALL: [ClassName; 6] = [
        ClassName::Tamhidi1,
        ClassName::Tamhidi2,
        ClassName::Sanah1,
        ClassName::Sanah2,
        ClassName::Sanah3,
        ClassName::Sanah4,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ClassName::Tamhidi1 => "tamhidi1",
            ClassName::Tamhidi2 => "tamhidi2",
            ClassName::Sanah1 => "sanah1",
            ClassName::Sanah2 => "sanah2",
            ClassName::Sanah3 => "sanah3",
            ClassName::Sanah4 => "sanah4",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ClassName::Tamhidi1 => "تمهيدي ١",
            ClassName::Tamhidi2 => "تمهيدي ٢",
            ClassName::Sanah1 => "السنة الأولى",
            ClassName::Sanah2 => "السنة الثانية",
            ClassName::Sanah3 => "السنة الثالثة",
            ClassName::Sanah4 => "السنة الرابعة",
        }
    }

    pub fn parse(raw: &str) -> Option<ClassName> {
        let t = raw.trim();
        ClassName::ALL
            .into_iter()
            .find(|c| c.key() == t || c.label() == t)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttendanceStatus {
    Absent,
    Permission,
    Sick,
}

impl AttendanceStatus {
    pub fn key(self) -> &'static str {
        match self {
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Permission => "permission",
            AttendanceStatus::Sick => "sick",
        }
    }

    pub fn parse(raw: &str) -> Option<AttendanceStatus> {
        match raw.trim() {
            "absent" => Some(AttendanceStatus::Absent),
            "permission" => Some(AttendanceStatus::Permission),
            "sick" => Some(AttendanceStatus::Sick),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordType {
    Attendance,
    Permission,
}

impl RecordType {
    pub fn key(self) -> &'static str {
        match self {
            RecordType::Attendance => "attendance",
            RecordType::Permission => "permission",
        }
    }

    pub fn parse(raw: &str) -> Option<RecordType> {
        match raw {
            "attendance" => Some(RecordType::Attendance),
            "permission" => Some(RecordType::Permission),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Admin,
    Academic,
    Dormitory,
}

impl Role {
    pub fn key(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Academic => "academic",
            Role::Dormitory => "dormitory",
        }
    }

    pub fn parse(raw: &str) -> Option<Role> {
        match raw.trim() {
            "admin" => Some(Role::Admin),
            "academic" => Some(Role::Academic),
            "dormitory" => Some(Role::Dormitory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub class_name: ClassName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub name: String,
}

/// An attendance or permission entry. Student name and class are copied in at
/// write time and never follow later edits to the student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub date: String,
    pub student_id: String,
    pub student_name: String,
    pub class_name: ClassName,
    pub status: AttendanceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(rename = "type")]
    pub record_type: RecordType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dormitory {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DormitoryStudent {
    pub id: String,
    pub name: String,
    pub dormitory_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DormitoryPermission {
    pub id: String,
    pub date: String,
    pub student_id: String,
    pub student_name: String,
    pub dormitory_id: String,
    pub dormitory_name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub role: Role,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn class_name_parses_key_and_label() {
        assert_eq!(ClassName::parse("sanah2"), Some(ClassName::Sanah2));
        assert_eq!(ClassName::parse("تمهيدي ١"), Some(ClassName::Tamhidi1));
        assert_eq!(ClassName::parse("sanah5"), None);
        for c in ClassName::ALL {
            assert_eq!(serde_json::to_value(c).unwrap(), json!(c.key()));
        }
    }

    #[test]
    fn record_serializes_type_and_skips_missing_course() {
        let r = Record {
            id: "r1".into(),
            date: "2024-01-01".into(),
            student_id: "s1".into(),
            student_name: "Ali".into(),
            class_name: ClassName::Sanah1,
            status: AttendanceStatus::Sick,
            course: None,
            record_type: RecordType::Permission,
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["type"], json!("permission"));
        assert_eq!(v["className"], json!("sanah1"));
        assert_eq!(v["status"], json!("sick"));
        assert!(v.get("course").is_none());
    }
}
