//! Scheduled jobs: one coroutine per cron descriptor, fully decoupled from
//! request handling.

use crate::error::ConfigError;
use crate::registry::CronDescriptor;
use chrono::Utc;
use cron::Schedule;
use std::str::FromStr;
use tracing::{debug, error, info, warn};

pub(crate) fn parse_pattern(pattern: &str) -> Result<Schedule, ConfigError> {
    Schedule::from_str(pattern).map_err(|e| ConfigError::InvalidCronPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Validate every descriptor, run the immediate executions, then start one
/// cadence coroutine per job. A bad pattern aborts startup before any job
/// has run.
pub(crate) fn start(descriptors: Vec<CronDescriptor>) -> Result<(), ConfigError> {
    let mut jobs = Vec::with_capacity(descriptors.len());
    for desc in descriptors {
        let schedule = parse_pattern(&desc.pattern)?;
        jobs.push((schedule, desc));
    }

    for (schedule, desc) in jobs {
        if desc.run_immediately {
            debug!(pattern = %desc.pattern, "cron immediate run");
            run_guarded(&desc);
        }
        info!(pattern = %desc.pattern, "cron job scheduled");
        may::go!(move || {
            loop {
                let now = Utc::now();
                let next = match schedule.after(&now).next() {
                    Some(t) => t,
                    None => {
                        warn!(pattern = %desc.pattern, "cron schedule has no future fire time");
                        break;
                    }
                };
                let wait = (next - now).to_std().unwrap_or_default();
                may::coroutine::sleep(wait);
                run_guarded(&desc);
            }
        });
    }
    Ok(())
}

/// A panicking tick must not kill the job's cadence.
fn run_guarded(desc: &CronDescriptor) {
    let handler = &desc.handler;
    if let Err(panic) =
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| (handler)()))
    {
        error!(pattern = %desc.pattern, panic = ?panic, "cron tick panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_pattern() {
        let err = parse_pattern("not a cron line").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidCronPattern { .. }
        ));
    }

    #[test]
    fn accepts_second_resolution_pattern() {
        let schedule = parse_pattern("*/5 * * * * *").unwrap();
        assert!(schedule.after(&Utc::now()).next().is_some());
    }
}
