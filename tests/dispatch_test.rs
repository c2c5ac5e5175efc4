mod common;

use auto_signin::actor::{ActorDispatcher, AttemptOutcome};
use auto_signin::browser::{PageDom, PageLoad, TabId};
use auto_signin::config::Config;
use auto_signin::coordinator::PollOutcome;
use auto_signin::notify::notices;
use auto_signin::state::Timestamps;
use common::{FakePage, FakeTabs, Harness, NOW, TabCall};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const SIGN_IN_URL: &str = "https://www.iamtxt.com/user/signin";

fn sign_in_page() -> Arc<FakePage> {
    Arc::new(FakePage::new(SIGN_IN_URL, &[".signin"], "阅读愉快"))
}

fn loaded(tab: &str, page: &Arc<FakePage>) -> PageLoad {
    PageLoad::loaded(TabId::new(tab), page.clone() as Arc<dyn PageDom>)
}

fn focused(tab: &str, page: &Arc<FakePage>) -> PageLoad {
    PageLoad::focused(TabId::new(tab), page.clone() as Arc<dyn PageDom>)
}

#[tokio::test(start_paused = true)]
async fn test_one_actor_per_document_load() {
    let h = Harness::new(Config::default(), Timestamps::default());
    let dispatcher = ActorDispatcher::new(h.coordinator.clone());
    let page = sign_in_page();

    let first = dispatcher.dispatch(loaded("T1", &page)).await.unwrap();
    assert!(dispatcher.dispatch(loaded("T1", &page)).await.is_none());
    assert_eq!(dispatcher.running_count(), 1);

    assert_eq!(
        first.await.unwrap(),
        Some(AttemptOutcome::Success {
            marker: Some("阅读愉快".into())
        })
    );
    assert_eq!(dispatcher.running_count(), 0);
    assert!(dispatcher.dispatch(loaded("T1", &page)).await.is_none());
    assert_eq!(page.clicks(), 1);

    page.reload();
    let second = dispatcher.dispatch(loaded("T1", &page)).await.unwrap();
    second.await.unwrap();
    assert_eq!(page.clicks(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_other_sites_get_no_actor() {
    let h = Harness::new(Config::default(), Timestamps::default());
    let dispatcher = ActorDispatcher::new(h.coordinator.clone());
    let page = Arc::new(FakePage::new("https://example.com/", &[".signin"], "阅读愉快"));

    assert!(dispatcher.dispatch(loaded("T1", &page)).await.is_none());
    assert_eq!(dispatcher.running_count(), 0);
    assert_eq!(page.clicks(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_focus_runs_again_on_same_document() {
    let h = Harness::new(Config::default(), Timestamps::default());
    let dispatcher = ActorDispatcher::new(h.coordinator.clone());
    let page = sign_in_page();

    dispatcher
        .dispatch(loaded("T1", &page))
        .await
        .unwrap()
        .await
        .unwrap();
    dispatcher
        .dispatch(focused("T1", &page))
        .await
        .unwrap()
        .await
        .unwrap();

    assert_eq!(page.clicks(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_focus_waits_for_running_actor() {
    let h = Harness::new(Config::default(), Timestamps::default());
    let dispatcher = ActorDispatcher::new(h.coordinator.clone());
    let page = sign_in_page();

    let running = dispatcher.dispatch(loaded("T1", &page)).await.unwrap();
    assert!(dispatcher.dispatch(focused("T1", &page)).await.is_none());
    running.await.unwrap();

    assert_eq!(page.clicks(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_existing_tab_gets_checked_in_when_focused() {
    let h = Harness::with_tabs(
        Config::default(),
        Timestamps::default(),
        FakeTabs::with_existing("EXISTING"),
    );
    let page = sign_in_page();
    let (tx, rx) = mpsc::unbounded_channel();
    h.tabs.forward_focus(tx, page.clone());
    let dispatcher = Arc::new(ActorDispatcher::new(h.coordinator.clone()));
    tokio::spawn(dispatcher.clone().run(rx));

    let outcome = h.coordinator.run_poll_cycle().await.unwrap();
    assert_eq!(outcome, PollOutcome::Opened);
    assert_eq!(h.tabs.opens(), 0);

    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(page.clicks(), 1);
    assert_eq!(h.timestamps().await.last_sign_time, NOW);
    assert_eq!(
        h.notifier.notices(),
        vec![notices::sign_in_needed(), notices::sign_in_success()]
    );
    assert_eq!(
        h.tabs.calls(),
        vec![
            TabCall::Find("https://www.iamtxt.com".into()),
            TabCall::Activate(TabId::new("EXISTING")),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_loads_from_channel_start_actors() {
    let h = Harness::new(Config::default(), Timestamps::default());
    let (tx, rx) = mpsc::unbounded_channel();
    let dispatcher = Arc::new(ActorDispatcher::new(h.coordinator.clone()));
    tokio::spawn(dispatcher.clone().run(rx));

    let page = sign_in_page();
    tx.send(loaded("T1", &page)).unwrap();
    tx.send(loaded("T1", &page)).unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(page.clicks(), 1);
    assert_eq!(h.timestamps().await.last_sign_time, NOW);
}
