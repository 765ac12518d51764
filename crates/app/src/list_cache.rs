//! List cache — the last fetched patient list, kept fresh from the sync bus.
//!
//! The cache never merges: every load replaces the whole list. Bus events are
//! not applied either; each burst of events schedules one reload after a
//! fixed debounce delay.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use wecare_domain::event::SyncEvent;
use wecare_domain::patient::Patient;

use crate::ports::{PatientRepository, SyncPublisher};
use crate::services::patient_service::PatientService;
use crate::sync_bus::{Subscription, SyncBus};

/// Delay between the first event of a burst and the reload it triggers.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Snapshot of the cache as seen by the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListState {
    pub patients: Vec<Patient>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Cached patient list backed by a [`PatientService`].
pub struct ListCache<R, P> {
    service: Arc<PatientService<R, P>>,
    state: watch::Sender<ListState>,
    debounce: Duration,
}

impl<R, P> ListCache<R, P>
where
    R: PatientRepository + Send + Sync + 'static,
    P: SyncPublisher + Send + Sync + 'static,
{
    /// Create an empty cache. Nothing is fetched until [`load`](Self::load).
    pub fn new(service: Arc<PatientService<R, P>>, debounce: Duration) -> Self {
        let (state, _) = watch::channel(ListState::default());
        Self {
            service,
            state,
            debounce,
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn state(&self) -> ListState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<ListState> {
        self.state.subscribe()
    }

    /// Fetch the list and replace the cached one.
    ///
    /// A load that is cancelled midway leaves the previous list in place with
    /// `loading` cleared.
    pub async fn load(&self) {
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
        let _loading = LoadingGuard(&self.state);

        let outcome = self.service.list().await;

        self.state.send_modify(|state| {
            state.patients = outcome.value;
            state.error = outcome.error;
            state.loading = false;
        });
    }

    /// Reload whenever another context publishes on `bus`.
    ///
    /// Events arriving while a reload is pending are folded into it. Drop the
    /// returned [`Subscription`] when the view goes away.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn follow(self: &Arc<Self>, bus: &SyncBus) -> Subscription {
        let (tx, mut rx) = mpsc::unbounded_channel::<SyncEvent>();
        let listener = bus.subscribe(move |event| {
            let _ = tx.send(event);
        });

        let cache = Arc::clone(self);
        let debounce = self.debounce;
        let reloader = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                tracing::debug!(
                    ?event,
                    patient_id = ?event.patient_id(),
                    "sync event received, reload scheduled"
                );
                tokio::time::sleep(debounce).await;

                let mut coalesced = 0_usize;
                while rx.try_recv().is_ok() {
                    coalesced += 1;
                }
                tracing::debug!(coalesced, "reloading patient list");
                cache.load().await;
            }
        });

        listener.with_task(reloader)
    }
}

struct LoadingGuard<'a>(&'a watch::Sender<ListState>);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0
            .send_if_modified(|state| std::mem::replace(&mut state.loading, false));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use wecare_domain::patient::PatientStatus;

    use crate::services::patient_service::tests::{InMemoryPatientRepo, RecordingPublisher, jane};
    use crate::sync_bus::{BroadcastHub, DEFAULT_CHANNEL};

    type Repo = Arc<InMemoryPatientRepo>;

    struct Tab {
        service: Arc<PatientService<Repo, SyncBus>>,
        cache: Arc<ListCache<Repo, SyncBus>>,
        bus: SyncBus,
    }

    fn open_tab(hub: &BroadcastHub, repo: &Repo) -> Tab {
        let bus = hub.open(DEFAULT_CHANNEL);
        let service = Arc::new(PatientService::new(Arc::clone(repo), bus.clone()));
        let cache = Arc::new(ListCache::new(Arc::clone(&service), DEFAULT_DEBOUNCE));
        Tab {
            service,
            cache,
            bus,
        }
    }

    #[tokio::test]
    async fn should_replace_list_and_clear_loading_on_load() {
        let repo = Arc::new(InMemoryPatientRepo::default());
        let service = Arc::new(PatientService::new(
            Arc::clone(&repo),
            RecordingPublisher::default(),
        ));
        service.register(jane()).await.unwrap();
        let cache = ListCache::new(service, DEFAULT_DEBOUNCE);

        cache.load().await;

        let state = cache.state();
        assert!(!state.loading);
        assert!(state.error.is_none());
        assert_eq!(state.patients.len(), 1);
        assert_eq!(state.patients[0].status, PatientStatus::Pending);
    }

    #[tokio::test]
    async fn should_keep_error_message_and_empty_list_when_read_fails() {
        let repo = Arc::new(InMemoryPatientRepo::default());
        let service = Arc::new(PatientService::new(
            Arc::clone(&repo),
            RecordingPublisher::default(),
        ));
        service.register(jane()).await.unwrap();
        let cache = ListCache::new(service, DEFAULT_DEBOUNCE);
        cache.load().await;

        repo.fail.store(true, Ordering::SeqCst);
        cache.load().await;

        let state = cache.state();
        assert!(state.patients.is_empty());
        assert!(state.error.is_some());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn should_clear_loading_when_load_is_cancelled() {
        let repo = Arc::new(InMemoryPatientRepo::default());
        let service = Arc::new(PatientService::new(
            Arc::clone(&repo),
            RecordingPublisher::default(),
        ));
        service.register(jane()).await.unwrap();
        let cache = Arc::new(ListCache::new(service, DEFAULT_DEBOUNCE));
        cache.load().await;

        repo.stall.store(true, Ordering::SeqCst);
        let mut changes = cache.watch();
        let pending = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.load().await })
        };
        changes.changed().await.unwrap();
        assert!(cache.state().loading);

        pending.abort();
        assert!(pending.await.unwrap_err().is_cancelled());

        let state = cache.state();
        assert!(!state.loading);
        assert_eq!(state.patients.len(), 1);
    }

    #[tokio::test]
    async fn should_reload_when_other_context_publishes() {
        let hub = BroadcastHub::default();
        let repo: Repo = Arc::new(InMemoryPatientRepo::default());
        let writer = open_tab(&hub, &repo);
        let reader = open_tab(&hub, &repo);
        let _sub = reader.cache.follow(&reader.bus);
        let mut changes = reader.cache.watch();

        writer.service.register(jane()).await.unwrap();

        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                changes.changed().await.unwrap();
                if changes.borrow().patients.len() == 1 {
                    break;
                }
            }
        })
        .await
        .expect("reader should reload after the writer's event");
    }

    #[tokio::test(start_paused = true)]
    async fn should_coalesce_burst_into_single_reload() {
        let hub = BroadcastHub::default();
        let repo: Repo = Arc::new(InMemoryPatientRepo::default());
        let writer = open_tab(&hub, &repo);
        let reader = open_tab(&hub, &repo);
        let _sub = reader.cache.follow(&reader.bus);

        let id = writer.service.register(jane()).await.unwrap();
        let mut patient = writer.service.list().await.value.remove(0);
        patient.status = PatientStatus::Active;
        writer.service.update(patient).await.unwrap();
        writer.service.delete(id).await.unwrap();
        let reads_before = repo.reads.load(Ordering::SeqCst);

        tokio::time::sleep(DEFAULT_DEBOUNCE * 3).await;

        assert_eq!(repo.reads.load(Ordering::SeqCst), reads_before + 1);
        assert!(reader.cache.state().patients.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn should_not_reload_on_own_events() {
        let hub = BroadcastHub::default();
        let repo: Repo = Arc::new(InMemoryPatientRepo::default());
        let tab = open_tab(&hub, &repo);
        let _sub = tab.cache.follow(&tab.bus);

        tab.service.register(jane()).await.unwrap();
        tokio::time::sleep(DEFAULT_DEBOUNCE * 3).await;

        assert_eq!(repo.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_reloading_once_unsubscribed() {
        let hub = BroadcastHub::default();
        let repo: Repo = Arc::new(InMemoryPatientRepo::default());
        let writer = open_tab(&hub, &repo);
        let reader = open_tab(&hub, &repo);
        let sub = reader.cache.follow(&reader.bus);

        sub.unsubscribe();
        writer.service.register(jane()).await.unwrap();
        tokio::time::sleep(DEFAULT_DEBOUNCE * 3).await;

        assert_eq!(repo.reads.load(Ordering::SeqCst), 0);
    }
}
