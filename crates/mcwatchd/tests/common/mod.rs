//! Fakes shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use mcwatch_shared::{ChannelId, NotificationEvent, ServerAddress, ServerId, StatusSnapshot};
use mcwatchd::error::{Result, WatchError};
use mcwatchd::monitor::{Monitor, MonitorContext};
use mcwatchd::observed::{BaselinePolicy, ObservedStateTable};
use mcwatchd::provider::{QueryFailure, QueryResult, StatusProvider};
use mcwatchd::registry::ServerRegistry;
use mcwatchd::sink::NotificationSink;
use mcwatchd::tracking::TrackingStore;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const INTERVAL: Duration = Duration::from_secs(30);

/// One scripted answer of the fake provider
#[derive(Debug, Clone)]
pub enum Step {
    Online(Vec<&'static str>),
    Offline,
    Panic,
}

/// Provider answering from a per-host script; the last step repeats forever
#[derive(Default)]
pub struct ScriptedProvider {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    last: Mutex<HashMap<String, Step>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, host: &str, steps: impl IntoIterator<Item = Step>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(host.to_string())
            .or_default()
            .extend(steps);
    }

    fn next_step(&self, host: &str) -> Step {
        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(host)
            .and_then(VecDeque::pop_front);
        let mut last = self.last.lock().unwrap();
        match next {
            Some(step) => {
                last.insert(host.to_string(), step.clone());
                step
            }
            None => last.get(host).cloned().unwrap_or(Step::Offline),
        }
    }
}

#[async_trait]
impl StatusProvider for ScriptedProvider {
    async fn query(&self, address: &ServerAddress) -> QueryResult {
        // Locks are released inside next_step, so a scripted panic poisons nothing
        match self.next_step(address.host()) {
            Step::Online(players) => Ok(StatusSnapshot::with_players(players)),
            Step::Offline => Err(QueryFailure::new("connection refused")),
            Step::Panic => panic!("scripted provider panic"),
        }
    }
}

/// Sink that records deliveries and can be told to fail
#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<(ChannelId, NotificationEvent)>>,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn delivered(&self) -> Vec<(ChannelId, NotificationEvent)> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, channel: ChannelId, event: &NotificationEvent) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(WatchError::Delivery("sink is down".to_string()));
        }
        self.delivered.lock().unwrap().push((channel, event.clone()));
        Ok(())
    }
}

pub fn id(raw: &str) -> ServerId {
    ServerId::new(raw).unwrap()
}

/// Address whose host is the server id, so scripts can be keyed by id
pub fn address(raw: &str) -> ServerAddress {
    ServerAddress::new(raw, 25565).unwrap()
}

pub fn registry(ids: &[&str]) -> Arc<ServerRegistry> {
    Arc::new(ids.iter().map(|raw| (id(raw), address(raw))).collect())
}

/// Everything a monitor test needs, kept alive together
pub struct Harness {
    pub dir: TempDir,
    pub provider: Arc<ScriptedProvider>,
    pub sink: Arc<RecordingSink>,
    pub tracking: Arc<TrackingStore>,
    pub monitor: Arc<Monitor>,
}

impl Harness {
    pub async fn new(registered: &[&str]) -> Self {
        let dir = TempDir::new().unwrap();
        let tracking = Arc::new(TrackingStore::open(dir.path().join("tracking.json")).await);
        Self::with_store(dir, tracking, registered)
    }

    pub fn with_store(dir: TempDir, tracking: Arc<TrackingStore>, registered: &[&str]) -> Self {
        let provider = Arc::new(ScriptedProvider::new());
        let sink = Arc::new(RecordingSink::new());
        let monitor = Arc::new(Monitor::new(
            registry(registered),
            Arc::new(ObservedStateTable::new()),
            MonitorContext {
                tracking: Arc::clone(&tracking),
                provider: Arc::clone(&provider) as Arc<dyn StatusProvider>,
                sink: Arc::clone(&sink) as Arc<dyn NotificationSink>,
                baseline: BaselinePolicy::Silent,
            },
            INTERVAL,
        ));
        Self {
            dir,
            provider,
            sink,
            tracking,
            monitor,
        }
    }

    pub fn context(&self) -> MonitorContext {
        MonitorContext {
            tracking: Arc::clone(&self.tracking),
            provider: Arc::clone(&self.provider) as Arc<dyn StatusProvider>,
            sink: Arc::clone(&self.sink) as Arc<dyn NotificationSink>,
            baseline: BaselinePolicy::Silent,
        }
    }
}

/// Let `ticks` poll intervals pass (time is paused in these tests)
pub async fn advance(ticks: u32) {
    for _ in 0..ticks {
        tokio::time::sleep(INTERVAL).await;
    }
}
