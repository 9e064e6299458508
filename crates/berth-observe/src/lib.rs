mod logger;
pub use logger::*;

mod events;
pub use events::{Event, EventKind, log_event, message_for};
