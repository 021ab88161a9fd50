/// Coordinator module - sole owner of the site collection
///
/// Every read and mutation of the collection goes through `SiteCoordinator`:
/// - CRUD intents are applied in submission order under one lock
/// - Probes run as independent tasks and commit back by id
/// - Each change is published to subscribers and to the debounced writer
mod writer;


use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, mpsc, oneshot, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::CoordinatorError;
use crate::models::Site;
use crate::monitoring::{Fetcher, probe};
use crate::store::SiteStore;
use crate::validation::{normalize_url, validate_frequency};
use writer::{WriterCommand, spawn_writer};

/// Quiet window used when none is configured
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

const MAX_SAVE_DELAY_WINDOWS: u32 = 10;

#[derive(Default)]
struct State {
    sites: Vec<Site>,
    /// Running probes per site; an id with no entry has none
    in_flight: HashMap<Uuid, usize>,
}

impl State {
    fn position(&self, id: Uuid) -> Result<usize, CoordinatorError> {
        self.sites.iter().position(|s| s.id == id).ok_or(CoordinatorError::NotFound(id))
    }

    fn probe_started(&mut self, id: Uuid) {
        *self.in_flight.entry(id).or_default() += 1;
    }

    fn probe_finished(&mut self, id: Uuid) {
        if let Some(count) = self.in_flight.get_mut(&id) {
            *count -= 1;
            if *count == 0 {
                self.in_flight.remove(&id);
            }
        }
    }
}

struct Inner {
    state: RwLock<State>,
    store: Arc<dyn SiteStore>,
    fetcher: Arc<dyn Fetcher>,
    snapshots: watch::Sender<Vec<Site>>,
    writer: mpsc::UnboundedSender<WriterCommand>,
}

/// Handle to the authoritative site collection. Cheap to clone.
#[derive(Clone)]
pub struct SiteCoordinator {
    inner: Arc<Inner>,
}

impl SiteCoordinator {
    /// Create a coordinator with an empty collection and start its writer.
    /// Unsaved changes wait at most ten quiet windows.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(store: Arc<dyn SiteStore>, fetcher: Arc<dyn Fetcher>, debounce: Duration) -> Self {
        Self::with_save_timing(store, fetcher, debounce, debounce.saturating_mul(MAX_SAVE_DELAY_WINDOWS))
    }

    /// Like [`SiteCoordinator::new`], with an explicit bound on how long a
    /// change may stay unsaved while further changes keep arriving
    pub fn with_save_timing(
        store: Arc<dyn SiteStore>,
        fetcher: Arc<dyn Fetcher>,
        debounce: Duration,
        max_save_delay: Duration,
    ) -> Self {
        let (snapshots, snapshot_rx) = watch::channel(Vec::new());
        let (writer, command_rx) = mpsc::unbounded_channel();
        spawn_writer(store.clone(), snapshot_rx, command_rx, debounce, max_save_delay.max(debounce));

        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(State::default()),
                store,
                fetcher,
                snapshots,
                writer,
            }),
        }
    }

    /// Replace the in-memory collection with the stored one.
    ///
    /// Loading does not count as a change, so nothing is written back.
    pub async fn hydrate(&self) {
        let sites = self.inner.store.load().await;
        let mut state = self.inner.state.write().await;
        info!("Hydrated {} sites", sites.len());
        state.sites = sites;
        self.inner.snapshots.send_replace(state.sites.clone());
    }

    /// Persist pending changes, then reload from storage
    pub async fn refresh(&self) {
        self.flush().await;
        self.hydrate().await;
    }

    /// Validate input, append a new active site and probe it
    pub async fn add(&self, url: &str, frequency: u64) -> Result<Site, CoordinatorError> {
        let url = normalize_url(url)?;
        let frequency = validate_frequency(frequency)?;
        let site = Site::new(url, frequency);

        {
            let mut state = self.inner.state.write().await;
            state.sites.push(site.clone());
            state.probe_started(site.id);
            self.changed(&state);
        }

        info!(site = %site.id, url = %site.url, frequency, "Added site");
        self.spawn_probe(site.id);
        Ok(site)
    }

    /// Replace url and frequency of a site, keeping its id and status.
    ///
    /// Active sites are probed again.
    pub async fn update(
        &self,
        id: Uuid,
        url: &str,
        frequency: u64,
    ) -> Result<Site, CoordinatorError> {
        self.edit(id, url, Some(frequency)).await
    }

    /// [`SiteCoordinator::update`] where a missing frequency keeps the one
    /// the site already has
    pub async fn edit(
        &self,
        id: Uuid,
        url: &str,
        frequency: Option<u64>,
    ) -> Result<Site, CoordinatorError> {
        let url = normalize_url(url)?;
        let frequency = frequency.map(validate_frequency).transpose()?;

        let site = {
            let mut state = self.inner.state.write().await;
            let index = state.position(id)?;
            let current = &state.sites[index];
            let site = Site {
                url,
                frequency: frequency.unwrap_or(current.frequency),
                ..current.clone()
            };
            state.sites[index] = site.clone();
            if site.is_active {
                state.probe_started(id);
            }
            self.changed(&state);
            site
        };

        info!(site = %id, url = %site.url, frequency = site.frequency, "Updated site");
        if site.is_active {
            self.spawn_probe(id);
        }
        Ok(site)
    }

    /// Remove a site. A probe still running for it is discarded on completion.
    pub async fn delete(&self, id: Uuid) -> Result<Site, CoordinatorError> {
        let mut state = self.inner.state.write().await;
        let index = state.position(id)?;
        let site = state.sites.remove(index);
        self.changed(&state);

        info!(site = %id, url = %site.url, "Deleted site");
        Ok(site)
    }

    /// Pause an active site or resume a paused one. Resuming probes at once.
    pub async fn toggle_active(&self, id: Uuid) -> Result<Site, CoordinatorError> {
        let site = {
            let mut state = self.inner.state.write().await;
            let index = state.position(id)?;
            let site = &mut state.sites[index];
            site.is_active = !site.is_active;
            let site = site.clone();
            if site.is_active {
                state.probe_started(id);
            }
            self.changed(&state);
            site
        };

        info!(site = %id, active = site.is_active, "Toggled site");
        if site.is_active {
            self.spawn_probe(id);
        }
        Ok(site)
    }

    /// Probe one site now and wait for the committed result.
    ///
    /// Returns `None` when the site is unknown, paused, or the result was
    /// discarded.
    pub async fn check_now(&self, id: Uuid) -> Option<Site> {
        {
            let mut state = self.inner.state.write().await;
            let index = state.position(id).ok()?;
            if !state.sites[index].is_active {
                return None;
            }
            state.probe_started(id);
        }
        self.run_probe(id).await
    }

    /// Start probes for every active site that is due at `now` and has no
    /// probe running. Returns how many were started.
    pub async fn probe_due(&self, now: DateTime<Utc>) -> usize {
        let due: Vec<Uuid> = {
            let mut state = self.inner.state.write().await;
            let due: Vec<Uuid> = state
                .sites
                .iter()
                .filter(|s| s.is_due(now) && !state.in_flight.contains_key(&s.id))
                .map(|s| s.id)
                .collect();
            for id in &due {
                state.probe_started(*id);
            }
            due
        };

        for id in &due {
            self.spawn_probe(*id);
        }
        due.len()
    }

    /// Current collection in insertion order
    pub async fn sites(&self) -> Vec<Site> {
        self.inner.state.read().await.sites.clone()
    }

    pub async fn get(&self, id: Uuid) -> Option<Site> {
        self.inner.state.read().await.sites.iter().find(|s| s.id == id).cloned()
    }

    /// Number of probes started but not yet committed or discarded
    pub async fn probes_in_flight(&self) -> usize {
        self.inner.state.read().await.in_flight.values().sum()
    }

    /// Snapshot feed, re-emitted after every change to the collection
    pub fn subscribe(&self) -> watch::Receiver<Vec<Site>> {
        self.inner.snapshots.subscribe()
    }

    /// Save the current collection now and wait for the attempt to finish
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.inner.writer.send(WriterCommand::Flush(ack_tx)).is_err() {
            warn!("Site writer is not running, flush skipped");
            return;
        }
        let _ = ack_rx.await;
    }

    /// Publish the new collection and schedule a save. Called with the
    /// write lock held so snapshots go out in mutation order.
    fn changed(&self, state: &State) {
        self.inner.snapshots.send_replace(state.sites.clone());
        if self.inner.writer.send(WriterCommand::Changed).is_err() {
            warn!("Site writer is not running, change will not be persisted");
        }
    }

    fn spawn_probe(&self, id: Uuid) {
        let coordinator = self.clone();
        tokio::spawn(async move {
            coordinator.run_probe(id).await;
        });
    }

    /// Probe the current record for `id` and commit the outcome.
    ///
    /// The caller has already marked `id` as in flight.
    async fn run_probe(&self, id: Uuid) -> Option<Site> {
        let target = {
            let state = self.inner.state.read().await;
            state.sites.iter().find(|s| s.id == id && s.is_active).cloned()
        };

        let Some(target) = target else {
            self.inner.state.write().await.probe_finished(id);
            return None;
        };

        let probed = probe(&target, self.inner.fetcher.as_ref()).await;
        self.commit(probed).await
    }

    /// Write probe fields onto whatever record holds the id now.
    ///
    /// Dropped when the site is gone or paused, or when the result is older
    /// than what the record already carries.
    async fn commit(&self, probed: Site) -> Option<Site> {
        let mut state = self.inner.state.write().await;
        state.probe_finished(probed.id);

        let Some(index) = state.sites.iter().position(|s| s.id == probed.id) else {
            debug!(site = %probed.id, "Dropping probe result for deleted site");
            return None;
        };

        let current = &mut state.sites[index];
        if !current.is_active {
            debug!(site = %probed.id, "Dropping probe result for paused site");
            return None;
        }
        if current.last_pinged_at > probed.last_pinged_at {
            debug!(site = %probed.id, "Dropping stale probe result");
            return None;
        }

        current.is_success = probed.is_success;
        current.last_pinged_at = probed.last_pinged_at;
        let committed = current.clone();
        self.changed(&state);

        debug!(site = %committed.id, status = %committed.status(), "Committed probe result");
        Some(committed)
    }
}
