use super::rules::round2;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use utoipa::ToSchema;

pub const TOP_PERFORMERS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct StatusBreakdown {
    pub present: u64,
    pub late: u64,
    pub half_day: u64,
    /// Records stored with the `absent` status. Punches never produce one and there is
    /// no employee directory to count missing days against, so this stays 0 unless such
    /// records are written into the store by other means.
    pub absent: u64,
}

impl StatusBreakdown {
    fn count(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Late => self.late += 1,
            AttendanceStatus::HalfDay => self.half_day += 1,
            AttendanceStatus::Absent => self.absent += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Overview {
    pub total_records: u64,
    /// Distinct employees with at least one record in range.
    pub active_employees: u64,
    pub total_hours: f64,
    pub average_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailyBreakdown {
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[serde(flatten)]
    pub counts: StatusBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PerformerStats {
    pub subject_id: u64,
    pub display_name: String,
    pub total_days: u64,
    pub present_days: u64,
    pub late_days: u64,
    pub half_days: u64,
    pub total_hours: f64,
}

impl PerformerStats {
    fn presence_ratio(&self) -> f64 {
        if self.total_days == 0 {
            0.0
        } else {
            self.present_days as f64 / self.total_days as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StatsSummary {
    pub overview: Overview,
    pub status_breakdown: StatusBreakdown,
    pub daily: Vec<DailyBreakdown>,
    pub top_performers: Vec<PerformerStats>,
}

/// Per-employee totals shown next to a personal record listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct PersonalStats {
    pub total_days: u64,
    pub present_days: u64,
    pub late_days: u64,
    pub half_days: u64,
    pub total_hours: f64,
}

pub fn summarize(records: &[AttendanceRecord]) -> PersonalStats {
    let mut stats = PersonalStats::default();
    for record in records {
        stats.total_days += 1;
        stats.total_hours += record.elapsed_hours;
        match record.status {
            AttendanceStatus::Present => stats.present_days += 1,
            AttendanceStatus::Late => stats.late_days += 1,
            AttendanceStatus::HalfDay => stats.half_days += 1,
            AttendanceStatus::Absent => {}
        }
    }
    stats.total_hours = round2(stats.total_hours);
    stats
}

/// Aggregates a snapshot of records.
///
/// The leaderboard is ranked by `present_days / total_days`, highest first. The sort is
/// stable, so employees with equal ratios keep the order in which they first appear in
/// `records`; the result therefore depends on the snapshot's order.
pub fn aggregate(records: &[AttendanceRecord]) -> StatsSummary {
    let mut breakdown = StatusBreakdown::default();
    let mut daily: BTreeMap<NaiveDate, StatusBreakdown> = BTreeMap::new();
    let mut subjects: HashSet<u64> = HashSet::new();
    let mut performers: Vec<PerformerStats> = Vec::new();
    let mut performer_index: HashMap<u64, usize> = HashMap::new();
    let mut total_hours = 0.0;

    for record in records {
        breakdown.count(record.status);
        daily.entry(record.day).or_default().count(record.status);
        subjects.insert(record.subject_id);
        total_hours += record.elapsed_hours;

        let idx = *performer_index.entry(record.subject_id).or_insert_with(|| {
            performers.push(PerformerStats {
                subject_id: record.subject_id,
                display_name: record.display_name.clone(),
                total_days: 0,
                present_days: 0,
                late_days: 0,
                half_days: 0,
                total_hours: 0.0,
            });
            performers.len() - 1
        });
        let performer = &mut performers[idx];
        performer.total_days += 1;
        performer.total_hours += record.elapsed_hours;
        match record.status {
            AttendanceStatus::Present => performer.present_days += 1,
            AttendanceStatus::Late => performer.late_days += 1,
            AttendanceStatus::HalfDay => performer.half_days += 1,
            AttendanceStatus::Absent => {}
        }
    }

    performers.sort_by(|a, b| b.presence_ratio().total_cmp(&a.presence_ratio()));
    performers.truncate(TOP_PERFORMERS);
    for performer in &mut performers {
        performer.total_hours = round2(performer.total_hours);
    }

    let total_records = records.len() as u64;
    StatsSummary {
        overview: Overview {
            total_records,
            active_employees: subjects.len() as u64,
            total_hours: round2(total_hours),
            average_hours: if total_records > 0 {
                round2(total_hours / total_records as f64)
            } else {
                0.0
            },
        },
        status_breakdown: breakdown,
        daily: daily
            .into_iter()
            .map(|(date, counts)| DailyBreakdown { date, counts })
            .collect(),
        top_performers: performers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::Punch;
    use chrono::{TimeZone, Utc};

    fn record(subject_id: u64, d: u32, status: AttendanceStatus, hours: f64) -> AttendanceRecord {
        let day = NaiveDate::from_ymd_opt(2026, 5, d).unwrap();
        let at = Utc.from_utc_datetime(&day.and_hms_opt(9, 0, 0).unwrap());
        AttendanceRecord {
            id: format!("{subject_id}/{d}"),
            subject_id,
            display_name: format!("emp-{subject_id}"),
            day,
            check_in: Punch {
                at,
                location: "Office".into(),
                origin_address: None,
            },
            check_out: None,
            elapsed_hours: hours,
            status,
            remarks: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn empty_snapshot_yields_zeroes() {
        let summary = aggregate(&[]);
        assert_eq!(summary.overview.total_records, 0);
        assert_eq!(summary.overview.average_hours, 0.0);
        assert!(summary.top_performers.is_empty());
        assert!(summary.daily.is_empty());
    }

    #[test]
    fn counts_statuses_hours_and_distinct_employees() {
        use AttendanceStatus::*;
        let records = vec![
            record(1, 2, Present, 8.0),
            record(1, 1, Late, 7.5),
            record(2, 2, HalfDay, 3.25),
            record(3, 1, Present, 9.0),
        ];
        let summary = aggregate(&records);

        assert_eq!(summary.overview.total_records, 4);
        assert_eq!(summary.overview.active_employees, 3);
        assert_eq!(summary.overview.total_hours, 27.75);
        assert_eq!(summary.overview.average_hours, 6.94);
        assert_eq!(
            summary.status_breakdown,
            StatusBreakdown {
                present: 2,
                late: 1,
                half_day: 1,
                absent: 0
            }
        );
        assert_eq!(summary.daily.len(), 2);
        assert_eq!(summary.daily[0].date, NaiveDate::from_ymd_opt(2026, 5, 1).unwrap());
        assert_eq!(summary.daily[0].counts.present, 1);
        assert_eq!(summary.daily[0].counts.late, 1);
    }

    #[test]
    fn leaderboard_ranks_by_presence_ratio_keeping_input_order_on_ties() {
        use AttendanceStatus::*;
        let records = vec![
            record(7, 3, Late, 8.0),
            record(8, 3, Present, 8.0),
            record(9, 3, Present, 8.0),
            record(7, 2, Present, 8.0),
            record(10, 3, HalfDay, 2.0),
        ];
        let board = aggregate(&records).top_performers;
        let order: Vec<u64> = board.iter().map(|p| p.subject_id).collect();
        assert_eq!(order, vec![8, 9, 7, 10]);
        assert_eq!(board[2].total_days, 2);
        assert_eq!(board[2].present_days, 1);
        assert_eq!(board[2].late_days, 1);
    }

    #[test]
    fn absent_counts_only_stored_absent_records() {
        use AttendanceStatus::*;
        let punched = aggregate(&[record(1, 1, Present, 8.0), record(2, 1, HalfDay, 2.0)]);
        assert_eq!(punched.status_breakdown.absent, 0);

        let imported = aggregate(&[record(1, 1, Present, 8.0), record(2, 1, Absent, 0.0)]);
        assert_eq!(imported.status_breakdown.absent, 1);
        assert_eq!(imported.daily[0].counts.absent, 1);
        assert_eq!(imported.overview.active_employees, 2);
    }

    #[test]
    fn leaderboard_is_capped() {
        let records: Vec<_> = (1..=8)
            .map(|s| record(s, 1, AttendanceStatus::Present, 8.0))
            .collect();
        let board = aggregate(&records).top_performers;
        assert_eq!(board.len(), TOP_PERFORMERS);
        assert_eq!(board[0].subject_id, 1);
    }

    #[test]
    fn personal_summary() {
        use AttendanceStatus::*;
        let records = vec![
            record(1, 1, Present, 8.5),
            record(1, 2, Late, 8.25),
            record(1, 3, HalfDay, 3.5),
        ];
        assert_eq!(
            summarize(&records),
            PersonalStats {
                total_days: 3,
                present_days: 1,
                late_days: 1,
                half_days: 1,
                total_hours: 20.25,
            }
        );
    }
}
