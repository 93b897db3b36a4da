pub mod engine;
pub mod error;
pub mod rules;
pub mod stats;

pub use engine::{AttendanceEngine, PageRequest, Pagination, PunchRequest, RecordPage, TodayStatus};
pub use error::AttendanceError;
pub use rules::{DateRange, DayPolicy, StatsPeriod};
