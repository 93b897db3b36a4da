use crate::model::attendance::FormattedRecord;
use crate::model::identity::SubjectSummary;
use serde::Serialize;
use strum_macros::Display;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EventKind {
    Checkin,
    Checkout,
}

/// Payload pushed to dashboards after every check-in or check-out.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttendanceEvent {
    pub kind: EventKind,
    pub record: FormattedRecord,
    pub subject: SubjectSummary,
}

/// Everything a live connection can receive.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Connected { connection_id: String },
    AdminJoined { connection_id: String, message: String },
    EmployeeJoined { connection_id: String, subject_id: u64, message: String },
    AttendanceUpdate(AttendanceEvent),
}

impl ServerMessage {
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMessage::Connected { .. } => "connected",
            ServerMessage::AdminJoined { .. } => "admin_joined",
            ServerMessage::EmployeeJoined { .. } => "employee_joined",
            ServerMessage::AttendanceUpdate(_) => "attendance_update",
        }
    }

    /// Renders one server-sent-events frame.
    pub fn to_sse_frame(&self) -> String {
        let data = match self {
            ServerMessage::Connected { connection_id } => {
                serde_json::json!({ "connection_id": connection_id })
            }
            ServerMessage::AdminJoined {
                connection_id,
                message,
            } => serde_json::json!({
                "success": true,
                "connection_id": connection_id,
                "message": message,
            }),
            ServerMessage::EmployeeJoined {
                connection_id,
                subject_id,
                message,
            } => serde_json::json!({
                "success": true,
                "connection_id": connection_id,
                "subject_id": subject_id,
                "message": message,
            }),
            ServerMessage::AttendanceUpdate(event) => {
                serde_json::to_value(event).unwrap_or(serde_json::Value::Null)
            }
        };
        format!("event: {}\ndata: {}\n\n", self.event_name(), data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::AttendanceStatus;

    #[test]
    fn attendance_update_frame_carries_kind_record_and_subject() {
        let event = AttendanceEvent {
            kind: EventKind::Checkout,
            record: FormattedRecord {
                id: "r1".into(),
                employee_id: 3,
                employee_name: "Ada".into(),
                date: "2026-01-05".into(),
                check_in: "09:00:00".into(),
                check_out: Some("17:30:00".into()),
                total_hours: 8.5,
                status: AttendanceStatus::Present,
                remarks: None,
                check_in_location: "Office".into(),
                check_out_location: Some("Office".into()),
            },
            subject: SubjectSummary {
                display_name: "Ada".into(),
                subject_id: 3,
                department: Some("R&D".into()),
            },
        };

        let frame = ServerMessage::AttendanceUpdate(event).to_sse_frame();
        assert!(frame.starts_with("event: attendance_update\ndata: "));
        assert!(frame.ends_with("\n\n"));

        let json: serde_json::Value =
            serde_json::from_str(frame.lines().nth(1).unwrap().trim_start_matches("data: "))
                .unwrap();
        assert_eq!(json["kind"], "checkout");
        assert_eq!(json["record"]["total_hours"], 8.5);
        assert_eq!(json["subject"]["department"], "R&D");
    }
}
