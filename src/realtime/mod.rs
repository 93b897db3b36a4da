pub mod event;
pub mod notifier;
pub mod stream;

pub use event::{AttendanceEvent, EventKind, ServerMessage};
pub use notifier::{ADMIN_GROUP, AttendancePublisher, ConnectionId, Notifier, NotifierError};
