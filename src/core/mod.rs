pub mod clock;
pub mod events;

pub use clock::{Clock, ManualClock, SystemClock};
pub use events::{ErrorEvent, EventId, Severity, Stage};
