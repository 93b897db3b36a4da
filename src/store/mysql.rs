use super::{AttendanceStore, RecordFilter, StoreError};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, Punch};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{FromRow, MySqlPool};
use std::str::FromStr;

/*
CREATE TABLE attendance_records (
    id                  CHAR(36)        NOT NULL PRIMARY KEY,
    subject_id          BIGINT UNSIGNED NOT NULL,
    display_name        VARCHAR(191)    NOT NULL,
    day                 DATE            NOT NULL,
    check_in_at         DATETIME(3)     NOT NULL,
    check_in_location   VARCHAR(100)    NOT NULL DEFAULT 'Office',
    check_in_address    VARCHAR(64)     NULL,
    check_out_at        DATETIME(3)     NULL,
    check_out_location  VARCHAR(100)    NULL,
    check_out_address   VARCHAR(64)     NULL,
    elapsed_hours       DOUBLE          NOT NULL DEFAULT 0,
    status              VARCHAR(16)     NOT NULL DEFAULT 'present',
    remarks             VARCHAR(200)    NULL,
    created_at          DATETIME(3)     NOT NULL,
    updated_at          DATETIME(3)     NOT NULL,
    UNIQUE KEY uq_attendance_subject_day (subject_id, day),
    KEY idx_attendance_day (day)
);
*/

const SELECT_COLUMNS: &str = r#"
    SELECT id, subject_id, display_name, day,
           check_in_at, check_in_location, check_in_address,
           check_out_at, check_out_location, check_out_address,
           elapsed_hours, status, remarks, created_at, updated_at
    FROM attendance_records
"#;

// MySQL integrity constraint violation
const DUPLICATE_SQLSTATE: &str = "23000";

#[derive(FromRow)]
struct AttendanceRow {
    id: String,
    subject_id: u64,
    display_name: String,
    day: NaiveDate,
    check_in_at: NaiveDateTime,
    check_in_location: String,
    check_in_address: Option<String>,
    check_out_at: Option<NaiveDateTime>,
    check_out_location: Option<String>,
    check_out_address: Option<String>,
    elapsed_hours: f64,
    status: String,
    remarks: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = StoreError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let status = AttendanceStatus::from_str(&row.status)
            .map_err(|_| StoreError::Corrupt(format!("unknown status '{}'", row.status)))?;

        let check_out = row.check_out_at.map(|at| Punch {
            at: at.and_utc(),
            location: row.check_out_location.unwrap_or_default(),
            origin_address: row.check_out_address,
        });

        Ok(AttendanceRecord {
            id: row.id,
            subject_id: row.subject_id,
            display_name: row.display_name,
            day: row.day,
            check_in: Punch {
                at: row.check_in_at.and_utc(),
                location: row.check_in_location,
                origin_address: row.check_in_address,
            },
            check_out,
            elapsed_hours: row.elapsed_hours,
            status,
            remarks: row.remarks,
            created_at: row.created_at.and_utc(),
            updated_at: row.updated_at.and_utc(),
        })
    }
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Date(NaiveDate),
    Str(String),
}

fn where_clause(filter: &RecordFilter) -> (String, Vec<FilterValue>) {
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args = Vec::new();

    if let Some(subject_id) = filter.subject_id {
        where_sql.push_str(" AND subject_id = ?");
        args.push(FilterValue::U64(subject_id));
    }

    if let Some(range) = filter.range {
        where_sql.push_str(" AND day BETWEEN ? AND ?");
        args.push(FilterValue::Date(range.start));
        args.push(FilterValue::Date(range.end));
    }

    if let Some(status) = filter.status {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status.to_string()));
    }

    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        where_sql.push_str(" AND LOWER(display_name) LIKE ?");
        args.push(FilterValue::Str(like_pattern(search)));
    }

    (where_sql, args)
}

fn like_pattern(search: &str) -> String {
    let escaped = search
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn unavailable(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

pub struct MySqlAttendanceStore {
    pool: MySqlPool,
}

impl MySqlAttendanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch_rows(
        &self,
        filter: &RecordFilter,
        page: Option<(u64, u64)>,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let (where_sql, args) = where_clause(filter);
        let mut data_sql = format!(
            "{SELECT_COLUMNS}{where_sql} ORDER BY day DESC, check_in_at DESC"
        );
        if page.is_some() {
            data_sql.push_str(" LIMIT ? OFFSET ?");
        }

        let mut data_q = sqlx::query_as::<_, AttendanceRow>(&data_sql);
        for arg in args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(v),
                FilterValue::Date(d) => data_q.bind(d),
                FilterValue::Str(s) => data_q.bind(s),
            };
        }
        if let Some((skip, limit)) = page {
            data_q = data_q.bind(limit).bind(skip);
        }

        let rows = data_q.fetch_all(&self.pool).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch attendance records");
            unavailable(e)
        })?;

        rows.into_iter().map(AttendanceRecord::try_from).collect()
    }
}

#[async_trait]
impl AttendanceStore for MySqlAttendanceStore {
    fn backend_tag(&self) -> &'static str {
        "mysql"
    }

    async fn find_one(
        &self,
        subject_id: u64,
        day: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let sql = format!("{SELECT_COLUMNS} WHERE subject_id = ? AND day = ?");
        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(subject_id)
            .bind(day)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, subject_id, %day, "Failed to fetch attendance record");
                unavailable(e)
            })?;

        row.map(AttendanceRecord::try_from).transpose()
    }

    async fn insert(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance_records
                (id, subject_id, display_name, day,
                 check_in_at, check_in_location, check_in_address,
                 elapsed_hours, status, remarks, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(record.subject_id)
        .bind(&record.display_name)
        .bind(record.day)
        .bind(record.check_in.at.naive_utc())
        .bind(&record.check_in.location)
        .bind(&record.check_in.origin_address)
        .bind(record.elapsed_hours)
        .bind(record.status.as_ref())
        .bind(&record.remarks)
        .bind(record.created_at.naive_utc())
        .bind(record.updated_at.naive_utc())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                // Duplicate check-in for same day
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.code().as_deref() == Some(DUPLICATE_SQLSTATE) {
                        return Err(StoreError::Duplicate);
                    }
                }

                tracing::error!(error = %e, subject_id = record.subject_id, "Attendance insert failed");
                Err(unavailable(e))
            }
        }
    }

    async fn record_check_out(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        let check_out = record.check_out.as_ref();
        let result = sqlx::query(
            r#"
            UPDATE attendance_records
            SET check_out_at = ?,
                check_out_location = ?,
                check_out_address = ?,
                elapsed_hours = ?,
                status = ?,
                remarks = ?,
                updated_at = ?
            WHERE id = ? AND check_out_at IS NULL
            "#,
        )
        .bind(check_out.map(|p| p.at.naive_utc()))
        .bind(check_out.map(|p| p.location.clone()))
        .bind(check_out.and_then(|p| p.origin_address.clone()))
        .bind(record.elapsed_hours)
        .bind(record.status.as_ref())
        .bind(&record.remarks)
        .bind(record.updated_at.naive_utc())
        .bind(&record.id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, record_id = %record.id, "Attendance update failed");
            unavailable(e)
        })?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        // Nothing matched: another writer closed it first, or the row is gone.
        match self.find_one(record.subject_id, record.day).await? {
            Some(stored) if stored.id == record.id && stored.is_checked_out() => {
                Err(StoreError::AlreadyClosed)
            }
            _ => Err(StoreError::Corrupt(format!(
                "no attendance record {} to update",
                record.id
            ))),
        }
    }

    async fn query(
        &self,
        filter: &RecordFilter,
        skip: u64,
        limit: u64,
    ) -> Result<(Vec<AttendanceRecord>, u64), StoreError> {
        let (where_sql, args) = where_clause(filter);
        let count_sql = format!("SELECT COUNT(*) FROM attendance_records{where_sql}");

        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::Date(d) => count_q.bind(*d),
                FilterValue::Str(s) => count_q.bind(s.as_str()),
            };
        }

        let total = count_q.fetch_one(&self.pool).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to count attendance records");
            unavailable(e)
        })?;

        let records = self.fetch_rows(filter, Some((skip, limit))).await?;
        Ok((records, total.max(0) as u64))
    }

    async fn scan(&self, filter: &RecordFilter) -> Result<Vec<AttendanceRecord>, StoreError> {
        self.fetch_rows(filter, None).await
    }
}
