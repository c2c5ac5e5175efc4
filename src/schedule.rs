//! Time source and the pure decisions built on the two persisted timestamps.

use crate::config::Config;
use crate::timeouts::{MS_PER_HOUR, MS_PER_MINUTE};
use chrono::{Local, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, delta: i64) {
        self.now.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// True when more than `check_interval_hours` passed since the last check-in,
/// or when the time check is disabled for debugging.
pub fn need_to_sign(now: i64, last_sign_time: i64, check_interval_hours: u64, skip: bool) -> bool {
    skip || now.saturating_sub(last_sign_time) > interval_ms(check_interval_hours, MS_PER_HOUR)
}

pub fn need_to_sign_with(config: &Config, now: i64, last_sign_time: i64) -> bool {
    need_to_sign(
        now,
        last_sign_time,
        config.schedule.check_interval_hours,
        config.debug.skip_time_check,
    )
}

/// A poll cycle runs only once the rate-limit window since `last_check_time` is over.
pub fn poll_due(now: i64, last_check_time: i64, auto_check_interval_minutes: u64) -> bool {
    now.saturating_sub(last_check_time) > interval_ms(auto_check_interval_minutes, MS_PER_MINUTE)
}

pub fn next_check_time(last_check_time: i64, auto_check_interval_minutes: u64) -> i64 {
    last_check_time.saturating_add(interval_ms(auto_check_interval_minutes, MS_PER_MINUTE))
}

pub fn minutes_between(later: i64, earlier: i64) -> i64 {
    later.saturating_sub(earlier).div_euclid(MS_PER_MINUTE)
}

pub fn format_time(timestamp_ms: i64) -> String {
    if timestamp_ms == 0 {
        return "N/A".to_string();
    }
    Local
        .timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

fn interval_ms(count: u64, unit: i64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX).saturating_mul(unit)
}
