pub mod controller;
pub mod presenter;
pub mod scheduler;
pub mod selection;
pub mod state;

pub use controller::{AlarmEvent, ReminderController, ReminderStatus, TickOutcome};
pub use presenter::{banner_lines, AlarmPresenter, Presentation};
pub use selection::select_due;
pub use state::{ActiveAlarm, AlarmState};
