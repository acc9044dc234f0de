//! Event countdown: target resolution, remaining-time decomposition, and
//! the 1 Hz ticker that feeds the countdown panel.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_HOUR: i64 = 3_600_000;
const MS_PER_DAY: i64 = 86_400_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetParseError {
    #[error("invalid event date (expected YYYY-MM-DD): {0:?}")]
    Date(String),
    #[error("invalid event time (expected HH:MM, 24-hour): {0:?}")]
    Time(String),
}

/// The instant a countdown counts down to: a calendar date plus a local
/// clock time. Seconds are fixed at 00 by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventTarget {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl EventTarget {
    /// Parse a `YYYY-MM-DD` date and an `HH:MM` 24-hour time.
    pub fn parse(date: &str, time: &str) -> Result<Self, TargetParseError> {
        let date_str = date.trim();
        let time_str = time.trim();

        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .map_err(|_| TargetParseError::Date(date_str.to_string()))?;
        let time = NaiveTime::parse_from_str(time_str, "%H:%M")
            .map_err(|_| TargetParseError::Time(time_str.to_string()))?;

        Ok(Self { date, time })
    }

    /// Resolve to an absolute instant in the local timezone.
    ///
    /// Ambiguous wall-clock times (DST fold) resolve to the earliest
    /// instant; nonexistent ones (DST gap) yield `None` and the caller
    /// treats the target as already passed.
    pub fn instant(&self) -> Option<DateTime<Local>> {
        Local
            .from_local_datetime(&self.date.and_time(self.time))
            .earliest()
    }
}

impl std::fmt::Display for EventTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}",
            self.date.format("%Y-%m-%d"),
            self.time.format("%H:%M")
        )
    }
}

/// Time left until a target instant, decomposed for display.
///
/// When `expired` is set every numeric field is zero; otherwise the
/// fields decompose a positive millisecond delta, so
/// `days*86400 + hours*3600 + minutes*60 + seconds` equals the delta in
/// whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Remaining {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    pub expired: bool,
}

impl Remaining {
    pub const EXPIRED: Self = Self {
        days: 0,
        hours: 0,
        minutes: 0,
        seconds: 0,
        expired: true,
    };

    /// Pure decomposition of `target - now`. Deltas at or below zero are
    /// the terminal expired state.
    pub fn between<Tz: TimeZone>(now: &DateTime<Tz>, target: &DateTime<Tz>) -> Self {
        let delta_ms = target
            .clone()
            .signed_duration_since(now.clone())
            .num_milliseconds();

        if delta_ms <= 0 {
            return Self::EXPIRED;
        }

        Self {
            days: (delta_ms / MS_PER_DAY) as u64,
            hours: ((delta_ms / MS_PER_HOUR) % 24) as u64,
            minutes: ((delta_ms / MS_PER_MINUTE) % 60) as u64,
            seconds: ((delta_ms / MS_PER_SECOND) % 60) as u64,
            expired: false,
        }
    }

    /// Compact one-line form, e.g. `3d 04:05:06`.
    pub fn compact(&self) -> String {
        format!(
            "{}d {:02}:{:02}:{:02}",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

/// Scoped 1 Hz refresh for one mounted target.
///
/// The spawned task recomputes a [`Remaining`] snapshot every second and
/// pushes it over a channel; the UI loop drains to the latest snapshot on
/// each pass. Dropping the ticker aborts the task, so swapping in a new
/// target (or shutting down) cancels the old refresh without any
/// bookkeeping.
pub struct Ticker {
    rx: mpsc::UnboundedReceiver<Remaining>,
    handle: JoinHandle<()>,
}

impl Ticker {
    pub fn spawn(target: DateTime<Local>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            let mut ticks = interval(Duration::from_secs(1));
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticks.tick().await;
                if tx.send(Remaining::between(&Local::now(), &target)).is_err() {
                    break;
                }
            }
        });
        Self { rx, handle }
    }

    /// Latest snapshot since the last poll, if any arrived.
    pub fn poll(&mut self) -> Option<Remaining> {
        let mut latest = None;
        while let Ok(snapshot) = self.rx.try_recv() {
            latest = Some(snapshot);
        }
        latest
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Timelike, Utc};

    fn at_ms(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).single().unwrap()
    }

    #[test]
    fn decomposition_matches_whole_seconds() {
        let now = at_ms(1_700_000_000_000);
        for delta_ms in [
            1_000,
            59_000,
            60_000,
            3_599_000,
            3_600_000,
            86_399_000,
            86_400_000,
            90_061_000,
            987_654_321,
        ] {
            let target = at_ms(1_700_000_000_000 + delta_ms);
            let r = Remaining::between(&now, &target);

            assert!(!r.expired, "delta {delta_ms} must not be expired");
            assert!(r.hours < 24);
            assert!(r.minutes < 60);
            assert!(r.seconds < 60);
            assert_eq!(
                r.days * 86_400 + r.hours * 3_600 + r.minutes * 60 + r.seconds,
                (delta_ms / 1_000) as u64,
                "delta {delta_ms} decomposed wrong"
            );
        }
    }

    #[test]
    fn one_day_one_hour_one_minute_one_second() {
        let now = at_ms(0);
        let target = at_ms(90_061_000);
        let r = Remaining::between(&now, &target);
        assert_eq!((r.days, r.hours, r.minutes, r.seconds), (1, 1, 1, 1));
        assert!(!r.expired);
    }

    #[test]
    fn sub_second_delta_counts_as_zero_but_not_expired() {
        let now = at_ms(0);
        let r = Remaining::between(&now, &at_ms(999));
        assert_eq!((r.days, r.hours, r.minutes, r.seconds), (0, 0, 0, 0));
        assert!(!r.expired);
    }

    #[test]
    fn expired_at_and_after_target() {
        let now = at_ms(5_000);
        assert_eq!(Remaining::between(&now, &at_ms(5_000)), Remaining::EXPIRED);
        assert_eq!(Remaining::between(&now, &at_ms(0)), Remaining::EXPIRED);
    }

    #[test]
    fn recomputation_is_idempotent() {
        let now = at_ms(42_000);
        let target = at_ms(1_234_567);
        assert_eq!(
            Remaining::between(&now, &target),
            Remaining::between(&now, &target)
        );
    }

    #[test]
    fn compact_format() {
        let r = Remaining {
            days: 3,
            hours: 4,
            minutes: 5,
            seconds: 6,
            expired: false,
        };
        assert_eq!(r.compact(), "3d 04:05:06");
    }

    #[test]
    fn parse_accepts_date_and_hhmm() {
        let target = EventTarget::parse("2026-09-01", "18:30").unwrap();
        assert_eq!(target.date, NaiveDate::from_ymd_opt(2026, 9, 1).unwrap());
        assert_eq!(target.time.hour(), 18);
        assert_eq!(target.time.minute(), 30);
        assert_eq!(target.time.second(), 0);
        assert_eq!(target.to_string(), "2026-09-01 18:30");
    }

    #[test]
    fn parse_trims_whitespace() {
        assert!(EventTarget::parse(" 2026-09-01 ", " 18:30 ").is_ok());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            EventTarget::parse("next tuesday", "18:30"),
            Err(TargetParseError::Date(_))
        ));
        assert!(matches!(
            EventTarget::parse("2026-09-01", "6pm"),
            Err(TargetParseError::Time(_))
        ));
        assert!(matches!(
            EventTarget::parse("", ""),
            Err(TargetParseError::Date(_))
        ));
        assert!(matches!(
            EventTarget::parse("2026-13-40", "18:30"),
            Err(TargetParseError::Date(_))
        ));
        assert!(matches!(
            EventTarget::parse("2026-09-01", "25:61"),
            Err(TargetParseError::Time(_))
        ));
    }

    #[test]
    fn instant_combines_date_and_time() {
        let target = EventTarget::parse("2026-09-01", "12:00").unwrap();
        let instant = target.instant().expect("noon resolves everywhere");
        assert_eq!(instant.naive_local(), target.date.and_time(target.time));
    }

    #[tokio::test]
    async fn ticker_delivers_snapshots_and_drains_to_latest() {
        let target = Local::now() + chrono::Duration::seconds(90);
        let mut ticker = Ticker::spawn(target);

        // The interval's first tick fires immediately.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let snapshot = ticker.poll().expect("first snapshot arrives right away");
        assert!(!snapshot.expired);
        assert_eq!(snapshot.days, 0);
        assert!(ticker.poll().is_none(), "poll drains the channel");
    }

    #[tokio::test]
    async fn dropping_the_ticker_aborts_its_task() {
        let ticker = Ticker::spawn(Local::now() + chrono::Duration::seconds(90));
        let abort = ticker.handle.abort_handle();
        drop(ticker);

        for _ in 0..10 {
            if abort.is_finished() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("ticker task still running after drop");
    }
}
