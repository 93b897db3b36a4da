use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

pub const DEFAULT_LOCATION: &str = "Office";
pub const MAX_REMARKS_LEN: usize = 200;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AttendanceStatus {
    Present,
    Late,
    HalfDay,
    Absent,
}

/// One side of a day: when, where and from which address the punch was made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Punch {
    pub at: DateTime<Utc>,
    pub location: String,
    pub origin_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: String,
    pub subject_id: u64,
    /// Snapshot of the employee's name when the record was opened.
    pub display_name: String,
    pub day: NaiveDate,
    pub check_in: Punch,
    pub check_out: Option<Punch>,
    pub elapsed_hours: f64,
    pub status: AttendanceStatus,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AttendanceRecord {
    pub fn is_checked_out(&self) -> bool {
        self.check_out.is_some()
    }

    /// Client-facing shape, with times rendered in the reference timezone.
    pub fn formatted(&self, offset: FixedOffset) -> FormattedRecord {
        FormattedRecord {
            id: self.id.clone(),
            employee_id: self.subject_id,
            employee_name: self.display_name.clone(),
            date: self.day.format("%Y-%m-%d").to_string(),
            check_in: self
                .check_in
                .at
                .with_timezone(&offset)
                .format("%H:%M:%S")
                .to_string(),
            check_out: self
                .check_out
                .as_ref()
                .map(|p| p.at.with_timezone(&offset).format("%H:%M:%S").to_string()),
            total_hours: self.elapsed_hours,
            status: self.status,
            remarks: self.remarks.clone(),
            check_in_location: self.check_in.location.clone(),
            check_out_location: self.check_out.as_ref().map(|p| p.location.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "5f0c6a52-1d7e-4c53-9a43-6c1b8f8f2a10",
    "employee_id": 1000,
    "employee_name": "John Doe",
    "date": "2026-01-05",
    "check_in": "09:45:00",
    "check_out": "18:00:00",
    "total_hours": 8.25,
    "status": "late",
    "remarks": "traffic",
    "check_in_location": "Office",
    "check_out_location": "Office"
}))]
pub struct FormattedRecord {
    pub id: String,
    pub employee_id: u64,
    pub employee_name: String,
    pub date: String,
    pub check_in: String,
    pub check_out: Option<String>,
    pub total_hours: f64,
    pub status: AttendanceStatus,
    pub remarks: Option<String>,
    pub check_in_location: String,
    pub check_out_location: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    #[test]
    fn status_uses_kebab_case_names() {
        assert_eq!(AttendanceStatus::HalfDay.to_string(), "half-day");
        assert_eq!(
            AttendanceStatus::from_str("half-day").unwrap(),
            AttendanceStatus::HalfDay
        );
        assert_eq!(
            serde_json::to_value(AttendanceStatus::Late).unwrap(),
            serde_json::json!("late")
        );
    }

    #[test]
    fn formatted_record_renders_local_times() {
        let check_in = Utc.with_ymd_and_hms(2026, 1, 5, 3, 45, 0).unwrap();
        let record = AttendanceRecord {
            id: "r1".into(),
            subject_id: 7,
            display_name: "Ada".into(),
            day: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            check_in: Punch {
                at: check_in,
                location: DEFAULT_LOCATION.into(),
                origin_address: None,
            },
            check_out: None,
            elapsed_hours: 0.0,
            status: AttendanceStatus::Present,
            remarks: None,
            created_at: check_in,
            updated_at: check_in,
        };

        let offset = FixedOffset::east_opt(6 * 3600).unwrap();
        let formatted = record.formatted(offset);
        assert_eq!(formatted.date, "2026-01-05");
        assert_eq!(formatted.check_in, "09:45:00");
        assert_eq!(formatted.check_out, None);
        assert_eq!(formatted.employee_id, 7);
    }
}
