use crate::api::attendance::{
    AllRecordsQuery, MyRecordsQuery, PunchPayload, RecordListResponse, StatsQuery, StatsResponse,
    TodayStatusResponse,
};
use crate::api::health::HealthResponse;
use crate::api::realtime::JoinSubjectPayload;
use crate::attendance::Pagination;
use crate::attendance::StatsPeriod;
use crate::attendance::stats::{
    DailyBreakdown, Overview, PerformerStats, PersonalStats, StatsSummary, StatusBreakdown,
};
use crate::model::attendance::{AttendanceStatus, FormattedRecord};
use crate::model::identity::SubjectSummary;
use crate::realtime::{AttendanceEvent, EventKind};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Tracker API",
        version = "1.0.0",
        description = r#"
## Employee Attendance Tracker

Daily check-in / check-out for employees with live updates for the admin dashboard.

### 🔹 Key Features
- **Attendance**
  - One record per employee per day, with hours and status derived at check-out
  - Personal history with monthly totals
  - Admin listing with filters and dashboard statistics
- **Realtime**
  - Server-sent events pushed to the admin room and to each employee's own channel

### 🕘 Status rules
- Under 4 worked hours: `half-day`
- Otherwise checked in after 09:30: `late`
- Otherwise: `present`

### 🔐 Security
Endpoints under `/api` are protected using **JWT Bearer authentication**.
Listing everyone's records and statistics requires the **Admin** role.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::my_records,
        crate::api::attendance::today,
        crate::api::attendance::all_records,
        crate::api::attendance::stats,

        crate::api::realtime::open_stream,
        crate::api::realtime::join_admin,
        crate::api::realtime::leave_admin,
        crate::api::realtime::join_subject,

        crate::api::health::health
    ),
    components(
        schemas(
            PunchPayload,
            MyRecordsQuery,
            AllRecordsQuery,
            StatsQuery,
            StatsPeriod,
            RecordListResponse,
            TodayStatusResponse,
            StatsResponse,
            Pagination,
            FormattedRecord,
            AttendanceStatus,
            StatsSummary,
            Overview,
            StatusBreakdown,
            DailyBreakdown,
            PerformerStats,
            PersonalStats,
            JoinSubjectPayload,
            AttendanceEvent,
            EventKind,
            SubjectSummary,
            HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Attendance tracking APIs"),
        (name = "Realtime", description = "Live attendance notifications"),
        (name = "Health", description = "Service status"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
