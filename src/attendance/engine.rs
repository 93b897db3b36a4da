use super::error::AttendanceError;
use super::rules::{DateRange, DayPolicy};
use super::stats::{self, StatsSummary};
use crate::model::attendance::{
    AttendanceRecord, AttendanceStatus, DEFAULT_LOCATION, FormattedRecord, MAX_REMARKS_LEN, Punch,
};
use crate::model::identity::SubjectIdentity;
use crate::realtime::{AttendanceEvent, AttendancePublisher, EventKind};
use crate::store::{AttendanceStore, RecordFilter, StoreError};
use crate::utils::clock::Clock;
use crate::utils::key_lock::KeyLocks;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

pub const DEFAULT_PER_PAGE: u64 = 10;
pub const MAX_PER_PAGE: u64 = 100;

/// What the caller sends along with a punch.
#[derive(Debug, Clone, Default)]
pub struct PunchRequest {
    pub location: Option<String>,
    pub origin_address: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TodayStatus {
    pub checked_in: bool,
    pub checked_out: bool,
    pub record: Option<AttendanceRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    pub fn new(page: Option<u64>, per_page: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Pagination {
    pub current_page: u64,
    pub per_page: u64,
    pub total_pages: u64,
    pub total_records: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(request: PageRequest, total_records: u64) -> Self {
        Self {
            current_page: request.page,
            per_page: request.per_page,
            total_pages: total_records.div_ceil(request.per_page),
            total_records,
            has_next_page: request.skip().saturating_add(request.per_page) < total_records,
            has_prev_page: request.page > 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordPage {
    pub records: Vec<AttendanceRecord>,
    pub pagination: Pagination,
}

/// Check-in/out rules on top of an injected store, with events fanned out after each write.
pub struct AttendanceEngine {
    store: Arc<dyn AttendanceStore>,
    publisher: Arc<dyn AttendancePublisher>,
    clock: Arc<dyn Clock>,
    policy: DayPolicy,
    locks: KeyLocks,
}

impl AttendanceEngine {
    pub fn new(
        store: Arc<dyn AttendanceStore>,
        publisher: Arc<dyn AttendancePublisher>,
        clock: Arc<dyn Clock>,
        policy: DayPolicy,
    ) -> Self {
        Self {
            store,
            publisher,
            clock,
            policy,
            locks: KeyLocks::new(),
        }
    }

    pub fn policy(&self) -> DayPolicy {
        self.policy
    }

    pub fn store_backend(&self) -> &'static str {
        self.store.backend_tag()
    }

    pub fn format(&self, record: &AttendanceRecord) -> FormattedRecord {
        record.formatted(self.policy.offset())
    }

    pub fn today(&self) -> chrono::NaiveDate {
        self.policy.day_of(self.clock.now())
    }

    #[instrument(name = "attendance_check_in", skip(self, identity, request), fields(subject_id = identity.subject_id))]
    pub async fn check_in(
        &self,
        identity: &SubjectIdentity,
        request: PunchRequest,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let location = normalize_location(request.location)?;
        let remarks = normalize_remarks(request.remarks)?;
        let now = self.clock.now();
        let day = self.policy.day_of(now);

        let _guard = self.locks.acquire(identity.subject_id, day).await;

        if let Some(existing) = self.store.find_one(identity.subject_id, day).await? {
            info!(%day, "Already checked in today");
            return Err(AttendanceError::DuplicateCheckIn(Box::new(
                self.format(&existing),
            )));
        }

        let record = AttendanceRecord {
            id: Uuid::new_v4().to_string(),
            subject_id: identity.subject_id,
            display_name: identity.display_name.clone(),
            day,
            check_in: Punch {
                at: now,
                location,
                origin_address: request.origin_address,
            },
            check_out: None,
            elapsed_hours: 0.0,
            status: AttendanceStatus::Present,
            remarks,
            created_at: now,
            updated_at: now,
        };

        match self.store.insert(&record).await {
            Ok(()) => {}
            Err(StoreError::Duplicate) => {
                // Lost a race against another process writing to the same store.
                let existing = self
                    .store
                    .find_one(identity.subject_id, day)
                    .await?
                    .ok_or(StoreError::Duplicate)?;
                return Err(AttendanceError::DuplicateCheckIn(Box::new(
                    self.format(&existing),
                )));
            }
            Err(e) => return Err(e.into()),
        }

        info!(record_id = %record.id, %day, "Check-in recorded");
        self.publish(EventKind::Checkin, identity, &record);
        Ok(record)
    }

    #[instrument(name = "attendance_check_out", skip(self, identity, request), fields(subject_id = identity.subject_id))]
    pub async fn check_out(
        &self,
        identity: &SubjectIdentity,
        request: PunchRequest,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let location = normalize_location(request.location)?;
        let remarks = normalize_remarks(request.remarks)?;
        let now = self.clock.now();
        let day = self.policy.day_of(now);

        let _guard = self.locks.acquire(identity.subject_id, day).await;

        let mut record = self
            .store
            .find_one(identity.subject_id, day)
            .await?
            .ok_or(AttendanceError::NotCheckedIn)?;

        if record.is_checked_out() {
            info!(%day, "Already checked out today");
            return Err(AttendanceError::AlreadyCheckedOut(Box::new(
                self.format(&record),
            )));
        }

        if now <= record.check_in.at {
            return Err(AttendanceError::validation(
                "Check-out time must be after check-in time.",
            ));
        }

        let (elapsed_hours, status) = self.policy.derive(record.check_in.at, now);
        record.check_out = Some(Punch {
            at: now,
            location,
            origin_address: request.origin_address,
        });
        record.elapsed_hours = elapsed_hours;
        record.status = status;
        if remarks.is_some() {
            record.remarks = remarks;
        }
        record.updated_at = now;

        match self.store.record_check_out(&record).await {
            Ok(()) => {}
            Err(StoreError::AlreadyClosed) => {
                // Another writer on the same store closed the day first.
                let stored = self
                    .store
                    .find_one(identity.subject_id, day)
                    .await?
                    .ok_or(StoreError::AlreadyClosed)?;
                info!(%day, "Check-out lost to a concurrent writer");
                return Err(AttendanceError::AlreadyCheckedOut(Box::new(
                    self.format(&stored),
                )));
            }
            Err(e) => return Err(e.into()),
        }

        info!(record_id = %record.id, elapsed_hours, %status, "Check-out recorded");
        self.publish(EventKind::Checkout, identity, &record);
        Ok(record)
    }

    pub async fn today_status(&self, subject_id: u64) -> Result<TodayStatus, AttendanceError> {
        let record = self.store.find_one(subject_id, self.today()).await?;
        Ok(TodayStatus {
            checked_in: record.is_some(),
            checked_out: record.as_ref().is_some_and(AttendanceRecord::is_checked_out),
            record,
        })
    }

    /// Filters first, then sorts newest day first, then cuts the requested page.
    pub async fn list_records(
        &self,
        filter: &RecordFilter,
        page: PageRequest,
    ) -> Result<RecordPage, AttendanceError> {
        let (records, total) = self
            .store
            .query(filter, page.skip(), page.per_page)
            .await?;
        debug!(total, returned = records.len(), "Listed attendance records");
        Ok(RecordPage {
            records,
            pagination: Pagination::new(page, total),
        })
    }

    /// Reads a snapshot; concurrent writes may or may not be included.
    pub async fn compute_stats(&self, range: DateRange) -> Result<StatsSummary, AttendanceError> {
        let filter = RecordFilter::default().within(range);
        let records = self.store.scan(&filter).await?;
        Ok(stats::aggregate(&records))
    }

    pub async fn personal_stats(
        &self,
        filter: &RecordFilter,
    ) -> Result<stats::PersonalStats, AttendanceError> {
        let records = self.store.scan(filter).await?;
        Ok(stats::summarize(&records))
    }

    fn publish(&self, kind: EventKind, identity: &SubjectIdentity, record: &AttendanceRecord) {
        self.publisher.publish(AttendanceEvent {
            kind,
            record: self.format(record),
            subject: identity.summary(),
        });
    }
}

fn normalize_location(location: Option<String>) -> Result<String, AttendanceError> {
    let location = location
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| DEFAULT_LOCATION.to_string());
    if location.chars().count() > 100 {
        return Err(AttendanceError::validation(
            "Location cannot exceed 100 characters",
        ));
    }
    Ok(location)
}

fn normalize_remarks(remarks: Option<String>) -> Result<Option<String>, AttendanceError> {
    let remarks = remarks
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());
    if let Some(r) = &remarks {
        if r.chars().count() > MAX_REMARKS_LEN {
            return Err(AttendanceError::validation(format!(
                "Remarks cannot exceed {MAX_REMARKS_LEN} characters"
            )));
        }
    }
    Ok(remarks)
}
