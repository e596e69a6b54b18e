use serde::Serialize;

/// Live whereabouts of a student, as last written by the gate or the clinic.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StudentStatus {
    In,
    Out,
    InClinic,
}

impl StudentStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            StudentStatus::In => "in",
            StudentStatus::Out => "out",
            StudentStatus::InClinic => "in_clinic",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "in" => Some(StudentStatus::In),
            "out" => Some(StudentStatus::Out),
            "in_clinic" => Some(StudentStatus::InClinic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Student {
    pub id: String,
    pub full_name: String,
    pub grade_level: String,
    pub class_id: Option<String>,
    pub parent_id: Option<String>,
    pub status: StudentStatus,
}
