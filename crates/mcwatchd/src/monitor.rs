//! Monitor - one supervised poller task per tracked server.
//!
//! Each poller ticks on its own interval: query the provider, diff against
//! the server's observed state slot, replace the slot, then hand every
//! resulting event to the sink. Ticks of one poller never overlap. The set
//! of running pollers follows the tracking store: `track_on` admits a poller
//! with a fresh baseline, `track_off` stops it and drops its state.

use crate::observed::{BaselinePolicy, ObservedState, ObservedStateTable, Observation, StateSlot};
use crate::provider::StatusProvider;
use crate::registry::ServerRegistry;
use crate::sink::NotificationSink;
use crate::tracking::TrackingStore;
use mcwatch_shared::{ChannelId, NotificationEvent, ServerAddress, ServerId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// How long shutdown waits for each poller to wind down
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Collaborators shared by every poller
#[derive(Clone)]
pub struct MonitorContext {
    pub tracking: Arc<TrackingStore>,
    pub provider: Arc<dyn StatusProvider>,
    pub sink: Arc<dyn NotificationSink>,
    pub baseline: BaselinePolicy,
}

/// Poll-diff-emit cycle for one server
pub struct Poller {
    server: ServerId,
    address: ServerAddress,
    slot: StateSlot,
    ctx: MonitorContext,
}

impl Poller {
    pub fn new(server: ServerId, address: ServerAddress, slot: StateSlot, ctx: MonitorContext) -> Self {
        Self {
            server,
            address,
            slot,
            ctx,
        }
    }

    pub fn server(&self) -> &ServerId {
        &self.server
    }

    /// Run one tick and return the events it emitted
    pub async fn tick(&self) -> Vec<NotificationEvent> {
        let outcome = self.ctx.provider.query(&self.address).await;
        if let Err(failure) = &outcome {
            debug!("{} ({}) unreachable: {}", self.server, self.address, failure);
        }

        let kinds = self
            .slot
            .lock()
            .await
            .advance(Observation::from_query(&outcome), self.ctx.baseline);
        if kinds.is_empty() {
            return Vec::new();
        }

        let events: Vec<NotificationEvent> = kinds
            .into_iter()
            .map(|kind| NotificationEvent::new(self.server.clone(), kind))
            .collect();

        match self.ctx.tracking.get(&self.server).await {
            Some(channel) => {
                for event in &events {
                    if let Err(e) = self.ctx.sink.deliver(channel, event).await {
                        warn!(
                            "Dropping {:?} for {} (channel {}): {}",
                            event.kind, self.server, channel, e
                        );
                    }
                }
            }
            None => debug!(
                "{} is no longer tracked, dropping {} events",
                self.server,
                events.len()
            ),
        }

        events
    }
}

/// Tick `poller` every `interval` until told to stop.
///
/// Each tick runs as its own task so a panic inside it is contained and
/// logged; the loop waits for it before the next tick.
async fn run_poller(poller: Arc<Poller>, interval: Duration, mut stop: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("Polling {} every {}s", poller.server, interval.as_secs());

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = stop.changed() => break,
        }

        let mut tick = tokio::spawn({
            let poller = Arc::clone(&poller);
            async move { poller.tick().await }
        });

        tokio::select! {
            outcome = &mut tick => match outcome {
                Ok(events) if !events.is_empty() => {
                    debug!("{}: {} events this tick", poller.server, events.len());
                }
                Ok(_) => {}
                Err(e) if e.is_panic() => {
                    error!("Tick for {} panicked, continuing with next tick: {}", poller.server, e);
                }
                Err(e) => warn!("Tick for {} did not complete: {}", poller.server, e),
            },
            _ = stop.changed() => {
                tick.abort();
                break;
            }
        }
    }

    info!("Stopped polling {}", poller.server);
}

struct PollerHandle {
    stop: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl PollerHandle {
    fn is_running(&self) -> bool {
        !self.join.is_finished()
    }
}

/// Supervisor of all pollers
pub struct Monitor {
    registry: Arc<ServerRegistry>,
    observed: Arc<ObservedStateTable>,
    ctx: MonitorContext,
    interval: Duration,
    pollers: Mutex<HashMap<ServerId, PollerHandle>>,
    /// Set under the `pollers` lock once shutdown begins; nothing is admitted after
    closed: AtomicBool,
}

impl Monitor {
    pub fn new(
        registry: Arc<ServerRegistry>,
        observed: Arc<ObservedStateTable>,
        ctx: MonitorContext,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            observed,
            ctx,
            interval,
            pollers: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &ServerRegistry {
        &self.registry
    }

    pub fn tracking(&self) -> &TrackingStore {
        &self.ctx.tracking
    }

    pub fn provider(&self) -> &dyn StatusProvider {
        self.ctx.provider.as_ref()
    }

    /// Start pollers for everything in the tracking store
    pub async fn start(&self) {
        self.reconcile().await;
        let running = self.polling().await.len();
        info!("Monitor started: {} servers polled", running);
    }

    /// Bring the running pollers in line with the tracking store.
    ///
    /// Tracked servers missing from the registry are skipped.
    pub async fn reconcile(&self) {
        let tracked = self.ctx.tracking.entries().await;
        let mut pollers = self.pollers.lock().await;

        let stale: Vec<ServerId> = pollers
            .keys()
            .filter(|id| !tracked.contains_key(*id))
            .cloned()
            .collect();
        for id in stale {
            self.retire(&mut pollers, &id).await;
        }

        for id in tracked.keys() {
            if !self.registry.contains(id) {
                warn!("Tracked server '{}' is not in the registry, ignoring it", id);
                continue;
            }
            let running = pollers.get(id).map(PollerHandle::is_running).unwrap_or(false);
            if !running {
                self.admit(&mut pollers, id).await;
            }
        }
    }

    /// Start tracking a server in a channel. Returns the acknowledgment text.
    pub async fn track_on(&self, id: &ServerId, channel: ChannelId) -> String {
        let mut pollers = self.pollers.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            return format!("Could not track **{}**: mcwatchd is shutting down", id);
        }

        if let Err(e) = self.ctx.tracking.set(id, channel).await {
            warn!("Failed to persist tracking for {}: {}", id, e);
            return format!("Could not save tracking for **{}**: {}", id, e);
        }
        info!("Tracking {} in channel {}", id, channel);

        if !self.registry.contains(id) {
            return format!(
                "Tracking **{}** in channel {}, but it is not a configured server and will not be polled",
                id, channel
            );
        }

        if pollers.get(id).map(PollerHandle::is_running).unwrap_or(false) {
            return format!("Now sending **{}** notifications to channel {}", id, channel);
        }

        self.admit(&mut pollers, id).await;
        format!("Now tracking **{}** in channel {}", id, channel)
    }

    /// Stop tracking a server. Returns the acknowledgment text.
    pub async fn track_off(&self, id: &ServerId) -> String {
        let mut pollers = self.pollers.lock().await;

        match self.ctx.tracking.remove(id).await {
            Ok(existed) => {
                self.retire(&mut pollers, id).await;
                if existed {
                    info!("Stopped tracking {}", id);
                    format!("Stopped tracking **{}**", id)
                } else {
                    format!("**{}** was not being tracked", id)
                }
            }
            Err(e) => {
                warn!("Failed to persist untracking of {}: {}", id, e);
                format!("Could not save tracking for **{}**: {}", id, e)
            }
        }
    }

    pub async fn is_polling(&self, id: &ServerId) -> bool {
        self.pollers
            .lock()
            .await
            .get(id)
            .map(PollerHandle::is_running)
            .unwrap_or(false)
    }

    /// Ids with a live poller, sorted
    pub async fn polling(&self) -> Vec<ServerId> {
        let mut ids: Vec<ServerId> = self
            .pollers
            .lock()
            .await
            .iter()
            .filter(|(_, handle)| handle.is_running())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub async fn observed(&self, id: &ServerId) -> Option<ObservedState> {
        self.observed.get(id).await
    }

    /// Stop every poller and wait briefly for each to finish
    pub async fn shutdown(&self) {
        let drained: Vec<(ServerId, PollerHandle)> = {
            let mut pollers = self.pollers.lock().await;
            self.closed.store(true, Ordering::SeqCst);
            pollers.drain().collect()
        };
        info!("Stopping {} pollers", drained.len());

        for (id, handle) in drained {
            let _ = handle.stop.send(true);
            if tokio::time::timeout(SHUTDOWN_GRACE, handle.join).await.is_err() {
                warn!("Poller for {} did not stop within {:?}", id, SHUTDOWN_GRACE);
            }
            self.observed.discard(&id).await;
        }
    }

    async fn admit(&self, pollers: &mut HashMap<ServerId, PollerHandle>, id: &ServerId) {
        if self.closed.load(Ordering::SeqCst) {
            debug!("Not admitting {} after shutdown", id);
            return;
        }
        let Some(address) = self.registry.resolve(id).cloned() else {
            return;
        };

        // Replace any finished handle left behind
        if let Some(old) = pollers.remove(id) {
            let _ = old.stop.send(true);
        }

        let slot = self.observed.admit(id).await;
        let poller = Arc::new(Poller::new(id.clone(), address, slot, self.ctx.clone()));
        let (stop, stop_rx) = watch::channel(false);
        let join = tokio::spawn(run_poller(poller, self.interval, stop_rx));
        pollers.insert(id.clone(), PollerHandle { stop, join });
    }

    async fn retire(&self, pollers: &mut HashMap<ServerId, PollerHandle>, id: &ServerId) {
        if let Some(handle) = pollers.remove(id) {
            let _ = handle.stop.send(true);
            debug!("Signalled poller for {} to stop", id);
        }
        self.observed.discard(id).await;
    }
}
