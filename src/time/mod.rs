pub mod calendar;
pub mod schedule;

pub use calendar::{end_of_today, end_of_tomorrow, start_of_day};
pub use schedule::CronSchedule;
