/// Cron schedule for recurring sync runs
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use std::str::FromStr;

use crate::error::{Result, SyncError};

#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    schedule: Schedule,
    timezone: Tz,
}

impl CronSchedule {
    /// Parse a cron expression evaluated in `timezone`.
    ///
    /// Five-field expressions (minute first) fire at second 0; six or seven
    /// fields (seconds first, optional year) are used as given.
    pub fn parse(expression: &str, timezone: Tz) -> Result<Self> {
        let normalized = normalize(expression)?;
        let schedule = Schedule::from_str(&normalized)
            .map_err(|e| SyncError::InvalidSchedule(format!("{}: {}", expression, e)))?;

        Ok(CronSchedule {
            expression: expression.trim().to_string(),
            schedule,
            timezone,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Next fire time strictly after `after`
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule
            .after(&after.with_timezone(&self.timezone))
            .next()
            .map(|t| t.with_timezone(&Utc))
    }
}

fn normalize(expression: &str) -> Result<String> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    match fields.len() {
        5 => Ok(format!("0 {}", fields.join(" "))),
        6 | 7 => Ok(fields.join(" ")),
        n => Err(SyncError::InvalidSchedule(format!(
            "{}: expected 5, 6 or 7 fields, got {}",
            expression, n
        ))),
    }
}
