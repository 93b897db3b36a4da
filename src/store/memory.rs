use super::{AttendanceStore, RecordFilter, StoreError, newest_first};
use crate::model::attendance::AttendanceRecord;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Process-lifetime store used when no database is configured. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryAttendanceStore {
    records: Mutex<HashMap<(u64, NaiveDate), AttendanceRecord>>,
}

impl MemoryAttendanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<(u64, NaiveDate), AttendanceRecord>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn matching(&self, filter: &RecordFilter) -> Result<Vec<AttendanceRecord>, StoreError> {
        let records = self.lock()?;
        let mut matched: Vec<AttendanceRecord> = records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        matched.sort_by(newest_first);
        Ok(matched)
    }
}

#[async_trait]
impl AttendanceStore for MemoryAttendanceStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn find_one(
        &self,
        subject_id: u64,
        day: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        Ok(self.lock()?.get(&(subject_id, day)).cloned())
    }

    async fn insert(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        let mut records = self.lock()?;
        let key = (record.subject_id, record.day);
        if records.contains_key(&key) {
            return Err(StoreError::Duplicate);
        }
        records.insert(key, record.clone());
        Ok(())
    }

    async fn record_check_out(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        let mut records = self.lock()?;
        match records.get_mut(&(record.subject_id, record.day)) {
            Some(existing) if existing.id == record.id && existing.is_checked_out() => {
                Err(StoreError::AlreadyClosed)
            }
            Some(existing) if existing.id == record.id => {
                *existing = record.clone();
                Ok(())
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
        let matched = self.matching(filter)?;
        let total = matched.len() as u64;
        let page = matched
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn scan(&self, filter: &RecordFilter) -> Result<Vec<AttendanceRecord>, StoreError> {
        self.matching(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::rules::DateRange;
    use crate::model::attendance::{AttendanceStatus, Punch};
    use chrono::{Duration, TimeZone, Utc};

    fn record(subject_id: u64, name: &str, day: NaiveDate, status: AttendanceStatus) -> AttendanceRecord {
        let at = Utc.from_utc_datetime(&day.and_hms_opt(9, 0, 0).unwrap());
        AttendanceRecord {
            id: format!("{subject_id}-{day}"),
            subject_id,
            display_name: name.to_string(),
            day,
            check_in: Punch {
                at,
                location: "Office".into(),
                origin_address: None,
            },
            check_out: None,
            elapsed_hours: 0.0,
            status,
            remarks: None,
            created_at: at,
            updated_at: at,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, d).unwrap()
    }

    #[tokio::test]
    async fn insert_refuses_same_subject_and_day() {
        let store = MemoryAttendanceStore::new();
        store
            .insert(&record(1, "Ada", day(2), AttendanceStatus::Present))
            .await
            .unwrap();

        let mut again = record(1, "Ada", day(2), AttendanceStatus::Present);
        again.id = "other".into();
        assert!(matches!(store.insert(&again).await, Err(StoreError::Duplicate)));

        store
            .insert(&record(2, "Grace", day(2), AttendanceStatus::Present))
            .await
            .unwrap();
        store
            .insert(&record(1, "Ada", day(3), AttendanceStatus::Present))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn check_out_requires_existing_open_record() {
        let store = MemoryAttendanceStore::new();
        let mut r = record(1, "Ada", day(2), AttendanceStatus::Present);
        assert!(matches!(
            store.record_check_out(&r).await,
            Err(StoreError::Corrupt(_))
        ));

        store.insert(&r).await.unwrap();
        r.check_out = Some(Punch {
            at: r.check_in.at + Duration::hours(8),
            location: "Office".into(),
            origin_address: None,
        });
        r.elapsed_hours = 8.0;
        store.record_check_out(&r).await.unwrap();
        let stored = store.find_one(1, day(2)).await.unwrap().unwrap();
        assert_eq!(stored.elapsed_hours, 8.0);

        let mut second = r.clone();
        second.elapsed_hours = 9.0;
        second.status = AttendanceStatus::Late;
        assert!(matches!(
            store.record_check_out(&second).await,
            Err(StoreError::AlreadyClosed)
        ));
        let stored = store.find_one(1, day(2)).await.unwrap().unwrap();
        assert_eq!(stored.elapsed_hours, 8.0);
        assert_eq!(stored.status, AttendanceStatus::Present);
    }

    #[tokio::test]
    async fn query_filters_sorts_then_paginates() {
        let store = MemoryAttendanceStore::new();
        for d in 1..=25 {
            store
                .insert(&record(1, "Ada Lovelace", day(d), AttendanceStatus::Present))
                .await
                .unwrap();
        }
        store
            .insert(&record(2, "Grace Hopper", day(5), AttendanceStatus::Late))
            .await
            .unwrap();

        let filter = RecordFilter {
            search: Some("LOVE".into()),
            ..RecordFilter::default()
        };
        let (page, total) = store.query(&filter, 20, 10).await.unwrap();
        assert_eq!(total, 25);
        assert_eq!(page.len(), 5);
        assert_eq!(page[0].day, day(5));
        assert_eq!(page[4].day, day(1));

        let late = RecordFilter {
            status: Some(AttendanceStatus::Late),
            ..RecordFilter::default()
        };
        let (page, total) = store.query(&late, 0, 10).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(page[0].subject_id, 2);

        let ranged = RecordFilter::for_subject(1).within(DateRange::new(day(10), day(12)));
        let rows = store.scan(&ranged).await.unwrap();
        assert_eq!(
            rows.iter().map(|r| r.day).collect::<Vec<_>>(),
            vec![day(12), day(11), day(10)]
        );
    }

    #[tokio::test]
    async fn same_day_ties_order_by_latest_check_in() {
        let store = MemoryAttendanceStore::new();
        let early = record(1, "Ada", day(2), AttendanceStatus::Present);
        let mut later = record(2, "Grace", day(2), AttendanceStatus::Present);
        later.check_in.at = later.check_in.at + Duration::minutes(30);
        store.insert(&early).await.unwrap();
        store.insert(&later).await.unwrap();

        let rows = store.scan(&RecordFilter::default()).await.unwrap();
        assert_eq!(rows[0].subject_id, 2);
        assert_eq!(rows[1].subject_id, 1);
    }
}
