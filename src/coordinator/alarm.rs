use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

pub const SIGN_IN_ALARM: &str = "autoSignInCheck";

/// Longest delay or period an alarm accepts; longer values are clamped.
pub const MAX_ALARM_PERIOD: Duration = Duration::from_secs(365 * 24 * 60 * 60);

pub type AlarmCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Named recurring timers. At most one timer runs per name.
#[derive(Default)]
pub struct AlarmRegistry {
    alarms: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl AlarmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn alarms(&self) -> MutexGuard<'_, HashMap<String, JoinHandle<()>>> {
        self.alarms.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Starts `callback` after `delay`, then every `period`. Replaces any
    /// alarm already registered under `name`.
    pub fn create(&self, name: &str, delay: Duration, period: Duration, callback: AlarmCallback) {
        let period = period.clamp(Duration::from_millis(1), MAX_ALARM_PERIOD);
        let delay = delay.min(MAX_ALARM_PERIOD);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + delay, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                callback().await;
            }
        });

        if let Some(previous) = self.alarms().insert(name.to_string(), handle) {
            previous.abort();
            tracing::debug!("Replaced alarm {}", name);
        }
    }

    pub fn clear(&self, name: &str) -> bool {
        match self.alarms().remove(name) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.alarms()
            .get(name)
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn active_count(&self) -> usize {
        self.alarms()
            .values()
            .filter(|handle| !handle.is_finished())
            .count()
    }
}

impl Drop for AlarmRegistry {
    fn drop(&mut self) {
        for (_, handle) in self.alarms().drain() {
            handle.abort();
        }
    }
}
