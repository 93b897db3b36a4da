use crate::attendance::stats::{PersonalStats, StatsSummary};
use crate::attendance::{AttendanceEngine, DateRange, PageRequest, Pagination, PunchRequest, StatsPeriod};
use crate::auth::auth::AuthUser;
use crate::model::attendance::{AttendanceStatus, FormattedRecord};
use crate::store::RecordFilter;
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PunchPayload {
    #[schema(example = "Office")]
    /// Where the punch happens; defaults to "Office"
    pub location: Option<String>,
    #[schema(example = "Client visit in the afternoon")]
    /// Free text, at most 200 characters
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct MyRecordsQuery {
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    #[param(value_type = Option<String>, format = "date")]
    /// Start of the range (inclusive); defaults to the current month
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2026-01-31", format = "date", value_type = Option<String>)]
    #[param(value_type = Option<String>, format = "date")]
    /// End of the range (inclusive)
    pub end_date: Option<NaiveDate>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    #[schema(example = 10)]
    /// Items per page
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct AllRecordsQuery {
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    #[param(value_type = Option<String>, format = "date")]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2026-01-31", format = "date", value_type = Option<String>)]
    #[param(value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
    #[schema(example = 1000)]
    /// Filter by employee ID
    pub employee_id: Option<u64>,
    #[schema(example = "late")]
    /// Filter by attendance status
    pub status: Option<AttendanceStatus>,
    #[schema(example = "john")]
    /// Case-insensitive match on the employee name
    pub search: Option<String>,
    #[schema(example = 1)]
    pub page: Option<u64>,
    #[schema(example = 20)]
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct StatsQuery {
    #[schema(example = "month")]
    /// today, week, month or year; ignored when both dates are given
    pub period: Option<StatsPeriod>,
    #[schema(format = "date", value_type = Option<String>)]
    #[param(value_type = Option<String>, format = "date")]
    pub start_date: Option<NaiveDate>,
    #[schema(format = "date", value_type = Option<String>)]
    #[param(value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
pub struct RecordListResponse {
    pub attendance: Vec<FormattedRecord>,
    pub pagination: Pagination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<PersonalStats>,
}

#[derive(Serialize, ToSchema)]
pub struct TodayStatusResponse {
    pub has_checked_in: bool,
    pub has_checked_out: bool,
    pub attendance: Option<FormattedRecord>,
}

#[derive(Serialize, ToSchema)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub summary: StatsSummary,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-31", format = "date", value_type = String)]
    pub end_date: NaiveDate,
}

fn origin_address(req: &HttpRequest) -> Option<String> {
    req.connection_info()
        .realip_remote_addr()
        .map(|addr| addr.to_string())
}

/// Explicit dates win; otherwise the month containing `today`.
fn resolve_range(start: Option<NaiveDate>, end: Option<NaiveDate>, today: NaiveDate) -> DateRange {
    match (start, end) {
        (Some(start), Some(end)) => DateRange::new(start, end),
        (Some(start), None) => DateRange::new(start, today.max(start)),
        (None, Some(end)) => DateRange::new(DateRange::month_of(end).start, end),
        (None, None) => DateRange::month_of(today),
    }
}

fn reject_inverted(range: &DateRange) -> actix_web::Result<()> {
    if range.start > range.end {
        return Err(actix_web::error::ErrorBadRequest(
            "start_date cannot be after end_date",
        ));
    }
    Ok(())
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/checkin",
    request_body(
        content = PunchPayload,
        description = "Optional location and remarks",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Check-in recorded", body = Object, example = json!({
            "success": true,
            "message": "Check-in recorded successfully.",
            "data": { "attendance": { "status": "present", "total_hours": 0.0 } }
        })),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 409, description = "Already checked in today", body = Object, example = json!({
            "success": false,
            "message": "You have already checked in today.",
            "data": { "attendance": {} }
        })),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
#[instrument(name = "api_check_in", skip_all, fields(user_id = auth.user_id))]
pub async fn check_in(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    req: HttpRequest,
    payload: Option<web::Json<PunchPayload>>,
) -> actix_web::Result<impl Responder> {
    let subject = auth.subject()?;
    let payload = payload.map(|p| p.into_inner()).unwrap_or_default();

    let record = engine
        .check_in(
            &subject,
            PunchRequest {
                location: payload.location,
                origin_address: origin_address(&req),
                remarks: payload.remarks,
            },
        )
        .await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Check-in recorded successfully.",
        "data": { "attendance": engine.format(&record) }
    })))
}

/// Check-out endpoint
#[utoipa::path(
    put,
    path = "/api/attendance/checkout",
    request_body(
        content = PunchPayload,
        description = "Optional location and remarks (replaces the check-in remarks when given)",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Check-out recorded", body = Object, example = json!({
            "success": true,
            "message": "Check-out recorded successfully.",
            "data": { "attendance": { "status": "late", "total_hours": 8.25 } }
        })),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 409, description = "Not checked in, or already checked out today"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
#[instrument(name = "api_check_out", skip_all, fields(user_id = auth.user_id))]
pub async fn check_out(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    req: HttpRequest,
    payload: Option<web::Json<PunchPayload>>,
) -> actix_web::Result<impl Responder> {
    let subject = auth.subject()?;
    let payload = payload.map(|p| p.into_inner()).unwrap_or_default();

    let record = engine
        .check_out(
            &subject,
            PunchRequest {
                location: payload.location,
                origin_address: origin_address(&req),
                remarks: payload.remarks,
            },
        )
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Check-out recorded successfully.",
        "data": { "attendance": engine.format(&record) }
    })))
}

/// Caller's own attendance records
#[utoipa::path(
    get,
    path = "/api/attendance/my-records",
    params(MyRecordsQuery),
    responses(
        (status = 200, description = "Paginated own records with totals", body = RecordListResponse),
        (status = 400, description = "Invalid date range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn my_records(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    query: web::Query<MyRecordsQuery>,
) -> actix_web::Result<impl Responder> {
    let subject = auth.subject()?;
    let range = resolve_range(query.start_date, query.end_date, engine.today());
    reject_inverted(&range)?;

    let filter = RecordFilter::for_subject(subject.subject_id).within(range);
    let page = engine
        .list_records(&filter, PageRequest::new(query.page, query.limit))
        .await?;
    let stats = engine.personal_stats(&filter).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": RecordListResponse {
            attendance: page.records.iter().map(|r| engine.format(r)).collect(),
            pagination: page.pagination,
            stats: Some(stats),
        }
    })))
}

/// Today's check-in/out state for the caller
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Today's status", body = TodayStatusResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
) -> actix_web::Result<impl Responder> {
    let subject = auth.subject()?;
    let status = engine.today_status(subject.subject_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": TodayStatusResponse {
            has_checked_in: status.checked_in,
            has_checked_out: status.checked_out,
            attendance: status.record.as_ref().map(|r| engine.format(r)),
        }
    })))
}

/// Every employee's records (admin)
#[utoipa::path(
    get,
    path = "/api/attendance/all",
    params(AllRecordsQuery),
    responses(
        (status = 200, description = "Paginated attendance list", body = RecordListResponse),
        (status = 400, description = "Invalid filter"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn all_records(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    query: web::Query<AllRecordsQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let range = resolve_range(query.start_date, query.end_date, engine.today());
    reject_inverted(&range)?;

    let query = query.into_inner();
    let filter = RecordFilter {
        subject_id: query.employee_id,
        range: Some(range),
        status: query.status,
        search: query.search.filter(|s| !s.trim().is_empty()),
    };
    let page = engine
        .list_records(&filter, PageRequest::new(query.page, Some(query.limit.unwrap_or(20))))
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": RecordListResponse {
            attendance: page.records.iter().map(|r| engine.format(r)).collect(),
            pagination: page.pagination,
            stats: None,
        }
    })))
}

/// Aggregated statistics for the admin dashboard
#[utoipa::path(
    get,
    path = "/api/attendance/stats",
    params(StatsQuery),
    responses(
        (status = 200, description = "Attendance statistics", body = StatsResponse),
        (status = 400, description = "Invalid range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn stats(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    query: web::Query<StatsQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let range = match (query.start_date, query.end_date) {
        (Some(start), Some(end)) => DateRange::new(start, end),
        _ => query
            .period
            .unwrap_or_default()
            .range_containing(engine.today()),
    };
    reject_inverted(&range)?;

    let summary = engine.compute_stats(range).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": StatsResponse {
            summary,
            start_date: range.start,
            end_date: range.end,
        }
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    #[test]
    fn range_defaults_to_current_month() {
        assert_eq!(
            resolve_range(None, None, day(2, 14)),
            DateRange::new(day(2, 1), day(2, 28))
        );
        assert_eq!(
            resolve_range(Some(day(1, 10)), None, day(2, 14)),
            DateRange::new(day(1, 10), day(2, 14))
        );
        assert_eq!(
            resolve_range(None, Some(day(3, 5)), day(2, 14)),
            DateRange::new(day(3, 1), day(3, 5))
        );
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(reject_inverted(&DateRange::new(day(2, 2), day(2, 1))).is_err());
        assert!(reject_inverted(&DateRange::new(day(2, 1), day(2, 1))).is_ok());
    }
}
