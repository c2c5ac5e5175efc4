use super::{AttemptOutcome, CoordinatorLink, LocalLink, PageActor};
use crate::browser::{LoadTrigger, PageLoad, TabId};
use crate::coordinator::Coordinator;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Default)]
struct Tracking {
    /// Last document of each tab a Page Actor was started for.
    documents: HashMap<TabId, String>,
    running: HashSet<TabId>,
}

/// Starts Page Actors for sign-in page loads reported by the browser.
///
/// A document gets at most one actor from load reports. A focus request from
/// the Coordinator starts another one on the same document, since it means a
/// check-in is still due. A tab never runs two actors at once.
pub struct ActorDispatcher {
    coordinator: Arc<Coordinator>,
    tracking: Arc<Mutex<Tracking>>,
}

impl ActorDispatcher {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self {
            coordinator,
            tracking: Arc::new(Mutex::new(Tracking::default())),
        }
    }

    pub async fn run(self: Arc<Self>, mut loads: mpsc::UnboundedReceiver<PageLoad>) {
        while let Some(load) = loads.recv().await {
            self.dispatch(load).await;
        }
    }

    /// Returns the actor task, or `None` when the load was ignored.
    pub async fn dispatch(&self, load: PageLoad) -> Option<JoinHandle<Option<AttemptOutcome>>> {
        let PageLoad { tab, page, trigger } = load;

        let url = match page.url().await {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Tab {} is gone: {}", tab, e);
                return None;
            }
        };
        if !url.starts_with(&self.coordinator.config().site.sign_in_url) {
            return None;
        }

        let document = match page.document_id().await {
            Ok(document) => document,
            Err(e) => {
                tracing::debug!("Could not identify the document in tab {}: {}", tab, e);
                return None;
            }
        };

        {
            let mut tracking = lock(&self.tracking);
            if tracking.running.contains(&tab) {
                tracing::debug!("Page actor already running in tab {}", tab);
                return None;
            }
            if trigger == LoadTrigger::Loaded
                && tracking.documents.get(&tab) == Some(&document)
            {
                return None;
            }
            tracking.running.insert(tab.clone());
            tracking.documents.insert(tab.clone(), document);
        }

        tracing::debug!("Starting page actor in tab {} ({:?})", tab, trigger);
        let link: Arc<dyn CoordinatorLink> =
            Arc::new(LocalLink::new(self.coordinator.clone(), Some(tab.clone())));
        let tracking = self.tracking.clone();

        Some(tokio::spawn(async move {
            let actor = Arc::new(PageActor::initialize(page, link).await);
            let outcome = match actor.run().await {
                Ok(Some(outcome)) => {
                    tracing::info!("Tab {}: {}", tab, outcome.describe());
                    Some(outcome)
                }
                Ok(None) => None,
                Err(e) => {
                    tracing::warn!("Page actor for tab {} failed: {}", tab, e);
                    None
                }
            };
            lock(&tracking).running.remove(&tab);
            outcome
        }))
    }

    pub fn running_count(&self) -> usize {
        lock(&self.tracking).running.len()
    }
}

fn lock(tracking: &Mutex<Tracking>) -> MutexGuard<'_, Tracking> {
    tracking.lock().unwrap_or_else(|e| e.into_inner())
}
