use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Arrival classification persisted on the daily homeroom row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArrivalStatus {
    Present,
    Late,
    Absent,
}

impl ArrivalStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ArrivalStatus::Present => "present",
            ArrivalStatus::Late => "late",
            ArrivalStatus::Absent => "absent",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "present" => Some(ArrivalStatus::Present),
            "late" => Some(ArrivalStatus::Late),
            "absent" => Some(ArrivalStatus::Absent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DepartureStatus {
    Early,
    Normal,
    LateExit,
}

impl DepartureStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            DepartureStatus::Early => "early",
            DepartureStatus::Normal => "normal",
            DepartureStatus::LateExit => "late_exit",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "early" => Some(DepartureStatus::Early),
            "normal" => Some(DepartureStatus::Normal),
            "late_exit" => Some(DepartureStatus::LateExit),
            _ => None,
        }
    }
}

/// Either side of a tap classification, returned to the scanner.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Classification {
    Arrival(ArrivalStatus),
    Departure(DepartureStatus),
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Arrival(a) => a.to_db_str(),
            Classification::Departure(d) => d.to_db_str(),
        }
    }
}

/// One row per (student, date).
#[derive(Debug, Clone, Serialize)]
pub struct HomeroomAttendanceRecord {
    pub id: i64,
    pub student_id: String,
    pub date: NaiveDate,
    pub time_in: Option<NaiveDateTime>,
    pub time_out: Option<NaiveDateTime>,
    pub status: ArrivalStatus,
    pub departure: Option<DepartureStatus>,
}
