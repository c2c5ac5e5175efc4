mod common;

use auto_signin::browser::TabId;
use auto_signin::config::Config;
use auto_signin::coordinator::{
    LifecycleEvent, NOT_NEEDED_MESSAGE, OPEN_ATTEMPTED_MESSAGE, PollOutcome, SIGN_IN_ALARM,
};
use auto_signin::notify::notices;
use auto_signin::server::protocol::{CoordinatorRequest, Reply};
use auto_signin::state::{StateKey, Timestamps};
use auto_signin::timeouts::{MS_PER_HOUR, MS_PER_MINUTE};
use common::{FakeTabs, Harness, NOW, TabCall};
use std::time::Duration;

fn signed(last_sign_time: i64, last_check_time: i64) -> Timestamps {
    Timestamps {
        last_sign_time,
        last_check_time,
    }
}

#[tokio::test]
async fn test_never_signed_needs_sign_then_success_clears_it() {
    let h = Harness::new(Config::default(), Timestamps::default());
    assert!(h.coordinator.check_need_to_sign().await.unwrap());

    h.coordinator.report_success(None).await.unwrap();

    assert_eq!(h.timestamps().await.last_sign_time, NOW);
    assert!(!h.coordinator.check_need_to_sign().await.unwrap());
    assert_eq!(h.notifier.notices(), vec![notices::sign_in_success()]);
}

#[tokio::test]
async fn test_early_poll_leaves_timestamps_unchanged() {
    let before = signed(NOW - 30 * MS_PER_HOUR, NOW - 10 * MS_PER_MINUTE);
    let h = Harness::new(Config::default(), before);

    let outcome = h.coordinator.run_poll_cycle().await.unwrap();

    assert_eq!(outcome, PollOutcome::Skipped);
    assert_eq!(h.timestamps().await, before);
    assert!(h.tabs.calls().is_empty());
    assert!(h.notifier.notices().is_empty());
}

#[tokio::test]
async fn test_poll_at_exact_interval_is_still_skipped() {
    let before = signed(0, NOW - 60 * MS_PER_MINUTE);
    let h = Harness::new(Config::default(), before);

    assert_eq!(
        h.coordinator.run_poll_cycle().await.unwrap(),
        PollOutcome::Skipped
    );
    assert_eq!(h.timestamps().await, before);
}

#[tokio::test]
async fn test_due_poll_opens_sign_in_page() {
    let h = Harness::new(Config::default(), Timestamps::default());

    let outcome = h.coordinator.run_poll_cycle().await.unwrap();

    assert_eq!(outcome, PollOutcome::Opened);
    assert_eq!(h.timestamps().await, signed(0, NOW));
    assert_eq!(h.notifier.notices(), vec![notices::sign_in_needed()]);
    assert_eq!(
        h.tabs.calls(),
        vec![
            TabCall::Find("https://www.iamtxt.com".into()),
            TabCall::Open("https://www.iamtxt.com".into()),
        ]
    );
}

#[tokio::test]
async fn test_due_poll_focuses_existing_tab() {
    let h = Harness::with_tabs(
        Config::default(),
        Timestamps::default(),
        FakeTabs::with_existing("EXISTING"),
    );

    h.coordinator.run_poll_cycle().await.unwrap();

    assert_eq!(
        h.tabs.calls(),
        vec![
            TabCall::Find("https://www.iamtxt.com".into()),
            TabCall::Activate(TabId::new("EXISTING")),
        ]
    );
    assert_eq!(h.tabs.opens(), 0);
}

#[tokio::test]
async fn test_due_poll_without_need_only_stamps_check_time() {
    let h = Harness::new(Config::default(), signed(NOW - MS_PER_HOUR, 0));

    let outcome = h.coordinator.run_poll_cycle().await.unwrap();

    assert_eq!(outcome, PollOutcome::NotNeeded);
    assert_eq!(h.timestamps().await, signed(NOW - MS_PER_HOUR, NOW));
    assert!(h.tabs.calls().is_empty());
}

#[tokio::test]
async fn test_open_failure_becomes_notification() {
    let h = Harness::with_tabs(Config::default(), Timestamps::default(), FakeTabs::failing());

    let outcome = h.coordinator.run_poll_cycle().await.unwrap();

    assert_eq!(outcome, PollOutcome::Opened);
    assert_eq!(
        h.notifier.notices(),
        vec![notices::sign_in_needed(), notices::open_failed()]
    );
    assert_eq!(h.timestamps().await.last_check_time, NOW);
}

#[tokio::test]
async fn test_notifications_respect_toggle() {
    let mut config = Config::default();
    config.features.show_notification = false;
    let h = Harness::new(config, Timestamps::default());

    h.coordinator.run_poll_cycle().await.unwrap();
    h.coordinator.report_success(None).await.unwrap();
    h.coordinator
        .handle(
            CoordinatorRequest::ShowNotification {
                title: "t".into(),
                message: "m".into(),
            },
            None,
        )
        .await
        .unwrap();

    assert!(h.notifier.notices().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_report_success_is_idempotent_with_one_close_per_tab() {
    let mut config = Config::default();
    config.features.auto_close_after_success = true;
    let h = Harness::new(config, Timestamps::default());
    let tab = TabId::new("T1");

    h.coordinator.report_success(Some(&tab)).await.unwrap();
    h.clock.advance_ms(500);
    h.coordinator.report_success(Some(&tab)).await.unwrap();

    assert_eq!(h.timestamps().await.last_sign_time, NOW + 500);
    assert_eq!(h.coordinator.pending_close_count(), 1);
    assert!(h.tabs.closes().is_empty());

    tokio::time::sleep(Duration::from_millis(3001)).await;

    assert_eq!(h.tabs.closes(), vec![tab]);
    assert_eq!(h.coordinator.pending_close_count(), 0);
    assert_eq!(h.notifier.titles().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_no_close_without_origin_or_when_disabled() {
    let h = Harness::new(Config::default(), Timestamps::default());
    h.coordinator
        .report_success(Some(&TabId::new("T1")))
        .await
        .unwrap();

    let mut config = Config::default();
    config.features.auto_close_after_success = true;
    let h2 = Harness::new(config, Timestamps::default());
    h2.coordinator.report_success(None).await.unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(h.tabs.closes().is_empty());
    assert!(h2.tabs.closes().is_empty());
}

#[tokio::test]
async fn test_force_check() {
    let h = Harness::new(Config::default(), Timestamps::default());
    let reply = h
        .coordinator
        .handle(CoordinatorRequest::ForceSignIn, None)
        .await
        .unwrap();
    assert_eq!(reply, Reply::ack(true, OPEN_ATTEMPTED_MESSAGE));
    assert_eq!(h.tabs.opens(), 1);
    // Forced checks do not touch the poll timestamp.
    assert_eq!(h.timestamps().await.last_check_time, 0);

    let h = Harness::new(Config::default(), signed(NOW, 0));
    let reply = h
        .coordinator
        .handle(CoordinatorRequest::ForceSignIn, None)
        .await
        .unwrap();
    assert_eq!(reply, Reply::ack(false, NOT_NEEDED_MESSAGE));
    assert!(h.tabs.calls().is_empty());
}

#[tokio::test]
async fn test_skip_time_check_forces_need() {
    let mut config = Config::default();
    config.debug.skip_time_check = true;
    let h = Harness::new(config, signed(NOW, 0));
    assert!(h.coordinator.check_need_to_sign().await.unwrap());
}

#[tokio::test]
async fn test_request_handling() {
    let h = Harness::new(Config::default(), signed(5, 6));

    let reply = h
        .coordinator
        .handle(CoordinatorRequest::GetStorageValues, None)
        .await
        .unwrap();
    assert_eq!(reply, Reply::Timestamps(signed(5, 6)));

    let reply = h
        .coordinator
        .handle(CoordinatorRequest::GetConfig, None)
        .await
        .unwrap();
    assert!(matches!(reply, Reply::Config { config } if *config == Config::default()));

    h.coordinator
        .handle(
            CoordinatorRequest::SetStorageValue {
                key: StateKey::LastCheckTime,
                value: 42,
            },
            None,
        )
        .await
        .unwrap();
    let reply = h
        .coordinator
        .handle(CoordinatorRequest::ResetSignTime, None)
        .await
        .unwrap();
    assert_eq!(reply, Reply::ok());
    assert_eq!(h.timestamps().await, signed(0, 42));

    let reply = h
        .coordinator
        .handle(CoordinatorRequest::SignInSuccess, Some(TabId::new("T9")))
        .await
        .unwrap();
    assert_eq!(reply, Reply::ok());
    assert_eq!(h.timestamps().await.last_sign_time, NOW);
}

#[tokio::test(start_paused = true)]
async fn test_lifecycle_keeps_a_single_alarm() {
    let h = Harness::new(Config::default(), Timestamps::default());

    let first = h
        .coordinator
        .on_lifecycle(LifecycleEvent::Installed)
        .await
        .unwrap();
    let second = h
        .coordinator
        .on_lifecycle(LifecycleEvent::ProcessStart)
        .await
        .unwrap();
    h.coordinator
        .on_lifecycle(LifecycleEvent::BrowserStartup)
        .await
        .unwrap();

    assert_eq!(first, PollOutcome::Opened);
    assert_eq!(second, PollOutcome::Skipped);
    assert!(h.coordinator.alarms().is_active(SIGN_IN_ALARM));
    assert_eq!(h.coordinator.alarms().active_count(), 1);
    assert_eq!(h.tabs.opens(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_alarm_runs_poll_cycles() {
    let h = Harness::new(Config::default(), Timestamps::default());
    h.coordinator.setup_alarm();

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(h.timestamps().await.last_check_time, NOW);
    assert_eq!(h.tabs.opens(), 1);

    // One period later the wall clock has moved an hour and a bit too.
    h.clock.advance_ms(60 * MS_PER_MINUTE + 1);
    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(
        h.timestamps().await.last_check_time,
        NOW + 60 * MS_PER_MINUTE + 1
    );
    assert_eq!(h.tabs.opens(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_alarm_respects_check_on_any_website() {
    let mut config = Config::default();
    config.features.check_on_any_website = false;
    let h = Harness::new(config, Timestamps::default());
    h.coordinator.setup_alarm();

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(h.timestamps().await, Timestamps::default());
    assert!(h.tabs.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_dropping_coordinator_stops_alarm() {
    let h = Harness::new(Config::default(), Timestamps::default());
    h.coordinator.setup_alarm();
    let tabs = h.tabs.clone();
    drop(h);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(tabs.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unvalidated_huge_interval_keeps_alarm_alive() {
    let mut config = Config::default();
    config.schedule.auto_check_interval_minutes = u64::MAX;
    let h = Harness::new(config, signed(0, NOW));
    h.coordinator.setup_alarm();

    tokio::time::sleep(Duration::from_secs(61)).await;

    assert!(h.coordinator.alarms().is_active(SIGN_IN_ALARM));
    assert_eq!(h.timestamps().await, signed(0, NOW));
    assert!(h.tabs.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_pending_closes_runs_the_close() {
    let mut config = Config::default();
    config.features.auto_close_after_success = true;
    let h = Harness::new(config, Timestamps::default());
    let tab = TabId::new("CLI");

    h.coordinator.wait_for_pending_closes().await;

    let started = tokio::time::Instant::now();
    h.coordinator.report_success(Some(&tab)).await.unwrap();
    h.coordinator.wait_for_pending_closes().await;

    assert!(started.elapsed() >= Duration::from_millis(3000));
    assert_eq!(h.tabs.closes(), vec![tab]);
    assert_eq!(h.coordinator.pending_close_count(), 0);
}
