use std::sync::Arc;
use std::thread;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Timelike, Utc};

use crate::backup::{MappingOutcome, MappingReport, Orchestrator};
use crate::error::GitvaultError;

/// Next instant at minute 0 of a wall-clock hour divisible by
/// `every_hours`, strictly after `after`. Mirrors a `0 */N * * *` cron line.
pub fn next_fire(after: DateTime<Utc>, every_hours: u32) -> DateTime<Utc> {
    let mut candidate = after
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(after);
    loop {
        candidate = candidate + Duration::hours(1);
        if candidate.hour() % every_hours == 0 {
            return candidate;
        }
    }
}

/// Blocking scheduler loop: one cycle immediately at start, then one at each
/// aligned interval. A cycle still running when the next tick arrives makes
/// the tick a no-op; ticks are never queued.
pub fn run(orchestrator: Arc<Orchestrator>, every_hours: u32) {
    tracing::info!("running startup backup cycle");
    report_cycle(orchestrator.run_cycle(None));
    loop {
        let next = next_fire(Utc::now(), every_hours);
        tracing::info!("next backup cycle at {}", next.to_rfc3339());
        let wait = (next - Utc::now()).to_std().unwrap_or(StdDuration::ZERO);
        thread::sleep(wait);
        match orchestrator.run_cycle(None) {
            Err(GitvaultError::Busy) => {
                tracing::warn!("previous backup cycle still running, skipping this tick");
            }
            result => report_cycle(result),
        }
    }
}

fn report_cycle(result: crate::error::Result<Vec<MappingReport>>) {
    match result {
        Ok(reports) => {
            for report in &reports {
                match &report.outcome {
                    MappingOutcome::Committed {
                        commit_id,
                        files_changed,
                        ..
                    } => tracing::info!(
                        "mapping {}: {} file(s) committed as {}",
                        report.mapping_name,
                        files_changed,
                        commit_id
                    ),
                    MappingOutcome::NoChange => {
                        tracing::info!("mapping {}: no changes", report.mapping_name)
                    }
                    MappingOutcome::Failed(err) => {
                        tracing::warn!("mapping {}: failed: {}", report.mapping_name, err)
                    }
                }
            }
        }
        Err(err) => tracing::error!("backup cycle failed: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn next_fire_aligns_to_the_interval_hour() {
        let after = Utc.with_ymd_and_hms(2026, 8, 30, 10, 15, 42).unwrap();
        let next = next_fire(after, 6);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, 0).unwrap());
    }

    #[test]
    fn next_fire_is_strictly_in_the_future_at_an_exact_boundary() {
        let after = Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, 0).unwrap();
        let next = next_fire(after, 6);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 8, 30, 18, 0, 0).unwrap());
    }

    #[test]
    fn next_fire_hourly_is_the_top_of_the_next_hour() {
        let after = Utc.with_ymd_and_hms(2026, 8, 30, 23, 59, 59).unwrap();
        let next = next_fire(after, 1);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 8, 31, 0, 0, 0).unwrap());
    }

    #[test]
    fn next_fire_daily_lands_on_midnight() {
        let after = Utc.with_ymd_and_hms(2026, 8, 30, 0, 30, 0).unwrap();
        let next = next_fire(after, 24);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 8, 31, 0, 0, 0).unwrap());
    }
}
