pub mod memory;
pub mod mysql;

use crate::attendance::rules::DateRange;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::cmp::Ordering;
use thiserror::Error;

pub use memory::MemoryAttendanceStore;
pub use mysql::MySqlAttendanceStore;

#[derive(Error, Debug)]
pub enum StoreError {
    /// A record already exists for the same employee and day.
    #[error("attendance record already exists for this day")]
    Duplicate,

    /// The record already carries a check-out.
    #[error("attendance record already checked out")]
    AlreadyClosed,

    #[error("attendance store unavailable: {0}")]
    Unavailable(String),

    #[error("attendance store returned malformed data: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub subject_id: Option<u64>,
    pub range: Option<DateRange>,
    pub status: Option<AttendanceStatus>,
    /// Case-insensitive substring of the display name.
    pub search: Option<String>,
}

impl RecordFilter {
    pub fn for_subject(subject_id: u64) -> Self {
        Self {
            subject_id: Some(subject_id),
            ..Self::default()
        }
    }

    pub fn within(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        if let Some(subject_id) = self.subject_id {
            if record.subject_id != subject_id {
                return false;
            }
        }
        if let Some(range) = &self.range {
            if !range.contains(record.day) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            if !record
                .display_name
                .to_lowercase()
                .contains(&search.to_lowercase())
            {
                return false;
            }
        }
        true
    }
}

/// Newest day first, then latest check-in first.
pub fn newest_first(a: &AttendanceRecord, b: &AttendanceRecord) -> Ordering {
    b.day
        .cmp(&a.day)
        .then_with(|| b.check_in.at.cmp(&a.check_in.at))
}

/// Where attendance records live. Implementations must refuse a second record for
/// the same `(subject_id, day)` with [`StoreError::Duplicate`].
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    async fn find_one(
        &self,
        subject_id: u64,
        day: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    async fn insert(&self, record: &AttendanceRecord) -> Result<(), StoreError>;

    /// Persists the check-out of `record`. The write only lands while the stored record
    /// is still open; otherwise it fails with [`StoreError::AlreadyClosed`] and nothing changes.
    async fn record_check_out(&self, record: &AttendanceRecord) -> Result<(), StoreError>;

    /// One page of matching records, newest first, plus the total match count.
    async fn query(
        &self,
        filter: &RecordFilter,
        skip: u64,
        limit: u64,
    ) -> Result<(Vec<AttendanceRecord>, u64), StoreError>;

    /// Every matching record, newest first.
    async fn scan(&self, filter: &RecordFilter) -> Result<Vec<AttendanceRecord>, StoreError>;
}
