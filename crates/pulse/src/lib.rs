//! Pulse: the natural-language reminder scheduler. Parses an expression
//! like "tomorrow at 9am" into a `Schedule`, persists reminders in a JSON
//! document store, and polls for due occurrences on a fixed interval.

pub mod model;
pub mod parser;
pub mod scheduler;
pub mod store;

pub use model::{next_trigger_for_schedule, resolve_tz, Reminder, ReminderStatus, Schedule};
pub use parser::{parse_pulse_expression, ParseError};
pub use scheduler::{PulseScheduler, ReminderDeliveryHandler};
pub use store::{CreateReminderRequest, PulseError, PulseStore};
