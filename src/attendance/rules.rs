use crate::model::attendance::AttendanceStatus;
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Offset, Timelike, Utc};
use serde::Deserialize;
use utoipa::ToSchema;

/// Anything shorter than this counts as a half day, whatever the arrival time.
pub const HALF_DAY_HOURS: f64 = 4.0;
pub const LATE_AFTER_HOUR: u32 = 9;
pub const LATE_AFTER_MINUTE: u32 = 30;

/// Hours between two punches, from whole elapsed minutes, rounded to 2 decimals.
pub fn elapsed_hours(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> f64 {
    let minutes = (check_out - check_in).num_minutes();
    round2(minutes as f64 / 60.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn is_late_arrival(local_check_in: DateTime<FixedOffset>) -> bool {
    let (hour, minute) = (local_check_in.hour(), local_check_in.minute());
    hour > LATE_AFTER_HOUR || (hour == LATE_AFTER_HOUR && minute > LATE_AFTER_MINUTE)
}

/// Order matters: a short day is a half day even when the arrival was on time.
pub fn classify(local_check_in: DateTime<FixedOffset>, elapsed_hours: f64) -> AttendanceStatus {
    if elapsed_hours < HALF_DAY_HOURS {
        AttendanceStatus::HalfDay
    } else if is_late_arrival(local_check_in) {
        AttendanceStatus::Late
    } else {
        AttendanceStatus::Present
    }
}

/// The single timezone every day bucket and the late rule are evaluated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayPolicy {
    offset: FixedOffset,
}

impl DayPolicy {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(Self::new)
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn local(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.offset)
    }

    pub fn day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.local(instant).date_naive()
    }

    /// Derives hours and status from the two punch instants.
    pub fn derive(&self, check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> (f64, AttendanceStatus) {
        let hours = elapsed_hours(check_in, check_out);
        (hours, classify(self.local(check_in), hours))
    }
}

impl Default for DayPolicy {
    fn default() -> Self {
        Self::utc()
    }
}

/// Inclusive range of day buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    pub fn month_of(day: NaiveDate) -> Self {
        let start = day.with_day(1).unwrap_or(day);
        let next_month = if start.month() == 12 {
            NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
        };
        let end = next_month
            .and_then(|d| d.pred_opt())
            .unwrap_or(start);
        Self { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    Today,
    Week,
    #[default]
    Month,
    Year,
}

impl StatsPeriod {
    /// Weeks run Sunday to Saturday.
    pub fn range_containing(self, today: NaiveDate) -> DateRange {
        match self {
            StatsPeriod::Today => DateRange::new(today, today),
            StatsPeriod::Week => {
                let start = today - Duration::days(i64::from(today.weekday().num_days_from_sunday()));
                DateRange::new(start, start + Duration::days(6))
            }
            StatsPeriod::Month => DateRange::month_of(today),
            StatsPeriod::Year => DateRange::new(
                NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
                NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today),
            ),
        }
    }
}
