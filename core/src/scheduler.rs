//! Daily scheduler
//!
//! A single loop: compute the next fire time from the current time, sleep
//! until then, run the job to completion, repeat. Runs never overlap and a
//! failed run is logged, not retried.

use crate::config::ScheduleConfig;
use crate::Result;
use chrono::{DateTime, Duration, Local, LocalResult, NaiveDateTime, NaiveTime, TimeZone};
use std::future::Future;
use tracing::{error, info};

/// The first `hour:minute` strictly after `now`
pub fn next_fire_after(now: NaiveDateTime, schedule: ScheduleConfig) -> NaiveDateTime {
    let time = NaiveTime::from_hms_opt(schedule.hour.min(23), schedule.minute.min(59), 0)
        .unwrap_or_default();
    let today = now.date().and_time(time);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Map a local wall-clock time to an instant. Ambiguous times (clocks going
/// back) take the earlier instant; times inside a gap (clocks going forward)
/// move to the first valid minute after the gap.
pub fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    resolve_with(naive, |t| tz.from_local_datetime(t))
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}

/// Resolution rule over any local-time lookup. Searches at most one day past
/// `naive` for a valid minute.
pub fn resolve_with<T, F>(naive: NaiveDateTime, lookup: F) -> Option<T>
where
    F: Fn(&NaiveDateTime) -> LocalResult<T>,
{
    let mut candidate = naive;
    for _ in 0..=MAX_GAP_MINUTES {
        match lookup(&candidate) {
            LocalResult::Single(t) => return Some(t),
            LocalResult::Ambiguous(earliest, _) => return Some(earliest),
            LocalResult::None => candidate += Duration::minutes(1),
        }
    }
    None
}

const MAX_GAP_MINUTES: i64 = 24 * 60;

/// The slot to wait for next. A slot that already fired is never chosen
/// again, even if the timer woke slightly before it.
pub fn next_slot(
    now: NaiveDateTime,
    last_fire: Option<NaiveDateTime>,
    schedule: ScheduleConfig,
) -> NaiveDateTime {
    let reference = match last_fire {
        Some(fired) if fired >= now => fired,
        _ => now,
    };
    next_fire_after(reference, schedule)
}

/// Run `job` every day at `schedule`, forever.
pub async fn run_daily<F, Fut>(schedule: ScheduleConfig, mut job: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut last_fire: Option<NaiveDateTime> = None;
    loop {
        let now = Local::now();
        let next_naive = next_slot(now.naive_local(), last_fire, schedule);
        let next = resolve_local(&Local, next_naive);
        let wait = (next - now).to_std().unwrap_or_default();

        info!(
            target = "scheduler",
            next = %next.format("%Y-%m-%d %H:%M"),
            hours = %format!("{:.1}", wait.as_secs_f64() / 3600.0),
            "Next call scheduled"
        );
        tokio::time::sleep(wait).await;
        last_fire = Some(next_naive);

        info!(target = "scheduler", "Running scheduled briefing");
        match job().await {
            Ok(()) => info!(target = "scheduler", "Scheduled run completed"),
            Err(e) => error!(target = "scheduler", error = %e, "Scheduled run failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate};

    fn at(d: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, d)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    const EIGHT: ScheduleConfig = ScheduleConfig { hour: 8, minute: 0 };

    #[test]
    fn later_today() {
        assert_eq!(next_fire_after(at(19, 6, 30, 0), EIGHT), at(19, 8, 0, 0));
    }

    #[test]
    fn already_passed_rolls_to_tomorrow() {
        assert_eq!(next_fire_after(at(19, 9, 0, 0), EIGHT), at(20, 8, 0, 0));
    }

    #[test]
    fn exactly_now_rolls_to_tomorrow() {
        assert_eq!(next_fire_after(at(19, 8, 0, 0), EIGHT), at(20, 8, 0, 0));
    }

    #[test]
    fn month_boundary() {
        let now = NaiveDate::from_ymd_opt(2026, 10, 31)
            .unwrap()
            .and_hms_opt(23, 59, 0)
            .unwrap();
        let next = next_fire_after(now, ScheduleConfig { hour: 7, minute: 15 });
        assert_eq!(
            next,
            NaiveDate::from_ymd_opt(2026, 11, 1)
                .unwrap()
                .and_hms_opt(7, 15, 0)
                .unwrap()
        );
    }

    #[test]
    fn resolves_in_fixed_zone() {
        let tz = FixedOffset::west_opt(8 * 3600).unwrap();
        let t = resolve_local(&tz, at(19, 8, 0, 0));
        assert_eq!(t.naive_local(), at(19, 8, 0, 0));
    }

    // Local wall clock with a 02:00-03:00 gap on the 18th and a repeated
    // 01:00-02:00 hour on the 25th. Instants are the local time tagged with
    // which side of the transition they fall on.
    fn dst_lookup(t: &NaiveDateTime) -> LocalResult<(NaiveDateTime, u8)> {
        let gap_start = at(18, 2, 0, 0);
        let gap_end = at(18, 3, 0, 0);
        let overlap_start = at(25, 1, 0, 0);
        let overlap_end = at(25, 2, 0, 0);
        if *t >= gap_start && *t < gap_end {
            LocalResult::None
        } else if *t >= overlap_start && *t < overlap_end {
            LocalResult::Ambiguous((*t, 0), (*t, 1))
        } else {
            LocalResult::Single((*t, 0))
        }
    }

    #[test]
    fn gap_moves_to_first_valid_minute() {
        assert_eq!(
            resolve_with(at(18, 2, 30, 0), dst_lookup),
            Some((at(18, 3, 0, 0), 0))
        );
        assert_eq!(
            resolve_with(at(18, 2, 0, 0), dst_lookup),
            Some((at(18, 3, 0, 0), 0))
        );
    }

    #[test]
    fn ambiguous_time_takes_earlier_instant() {
        assert_eq!(
            resolve_with(at(25, 1, 30, 0), dst_lookup),
            Some((at(25, 1, 30, 0), 0))
        );
    }

    #[test]
    fn unresolvable_time_gives_up_after_a_day() {
        let never = |_: &NaiveDateTime| LocalResult::<()>::None;
        assert_eq!(resolve_with(at(19, 8, 0, 0), never), None);
    }

    #[test]
    fn fired_slot_is_not_chosen_again_when_waking_early() {
        // Timer woke a moment before the 08:00 slot it already ran
        let early = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_milli_opt(7, 59, 59, 900)
            .unwrap();
        assert_eq!(next_slot(early, None, EIGHT), at(19, 8, 0, 0));
        assert_eq!(
            next_slot(early, Some(at(19, 8, 0, 0)), EIGHT),
            at(20, 8, 0, 0)
        );
    }

    #[test]
    fn stale_last_fire_is_ignored() {
        assert_eq!(
            next_slot(at(20, 6, 0, 0), Some(at(19, 8, 0, 0)), EIGHT),
            at(20, 8, 0, 0)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_runs_are_a_day_apart() {
        use std::sync::{Arc, Mutex};

        let fired: Arc<Mutex<Vec<tokio::time::Instant>>> = Arc::default();
        let recorder = Arc::clone(&fired);
        let job = move || {
            let recorder = Arc::clone(&recorder);
            async move {
                recorder.lock().unwrap().push(tokio::time::Instant::now());
                Ok(())
            }
        };

        // Paused time advances virtual time through every sleep while the
        // wall clock barely moves, so only the guard keeps runs a day apart.
        let four_days = std::time::Duration::from_secs(4 * 86_400);
        let _ = tokio::time::timeout(four_days, run_daily(EIGHT, job)).await;

        let fired = fired.lock().unwrap();
        assert!(fired.len() >= 2, "only {} runs", fired.len());
        for pair in fired.windows(2) {
            assert!(pair[1] - pair[0] >= std::time::Duration::from_secs(23 * 3600));
        }
    }
}
