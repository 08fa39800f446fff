//! Shared utilities for integration tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use link_resilience::controller::ControllerSettings;
use link_resilience::link::probe::{Probe, ProbeError, ProbeSample};
use link_resilience::link::{Link, NominalProfile, TierKind};
use link_resilience::observability::{FailoverEvent, FailoverObserver};
use link_resilience::ResilienceController;

/// Deterministic probe whose outcome is flipped by the test.
#[derive(Debug)]
pub struct ScriptedProbe {
    up: AtomicBool,
    latency_ms: AtomicU64,
    delay: Duration,
}

#[allow(dead_code)]
impl ScriptedProbe {
    pub fn new(up: bool, latency: Duration) -> Arc<Self> {
        Self::with_delay(up, latency, Duration::ZERO)
    }

    /// A probe that takes `delay` of wall time before answering.
    pub fn with_delay(up: bool, latency: Duration, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            up: AtomicBool::new(up),
            latency_ms: AtomicU64::new(latency.as_millis() as u64),
            delay,
        })
    }

    pub fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms.store(latency.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    async fn probe(&self) -> Result<ProbeSample, ProbeError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if !self.up.load(Ordering::SeqCst) {
            return Err(ProbeError::Simulated);
        }
        Ok(ProbeSample {
            latency: Some(Duration::from_millis(self.latency_ms.load(Ordering::SeqCst))),
            bandwidth_mbps: None,
            packet_loss_percent: 0.0,
        })
    }
}

/// Captures failover events in order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<FailoverEvent>>,
}

#[allow(dead_code)]
impl RecordingObserver {
    pub fn events(&self) -> Vec<FailoverEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl FailoverObserver for RecordingObserver {
    fn on_failover(&self, event: &FailoverEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub fn link(name: &str, priority: u32, kind: TierKind, probe: Arc<ScriptedProbe>) -> Link {
    let nominal = NominalProfile {
        latency: Duration::from_millis(40),
        bandwidth_mbps: 100.0 / priority as f64,
    };
    Link::new(name, priority, kind, nominal, probe)
}

/// Three healthy tiers with priorities 1, 2, 3 and fast scripted probes.
pub struct ThreeTiers {
    pub controller: Arc<ResilienceController>,
    pub probes: [Arc<ScriptedProbe>; 3],
    pub observer: Arc<RecordingObserver>,
}

#[allow(dead_code)]
pub fn three_tiers(interval: Duration) -> ThreeTiers {
    let probes = [
        ScriptedProbe::new(true, Duration::from_millis(20)),
        ScriptedProbe::new(true, Duration::from_millis(45)),
        ScriptedProbe::new(true, Duration::from_millis(70)),
    ];
    let observer = Arc::new(RecordingObserver::default());
    let links = vec![
        link("satellite", 1, TierKind::Satellite, probes[0].clone()),
        link("cellular", 2, TierKind::Cellular, probes[1].clone()),
        link("lora", 3, TierKind::Lora, probes[2].clone()),
    ];
    let settings = ControllerSettings {
        monitor_interval: interval,
        ..Default::default()
    };
    let controller = ResilienceController::new(links, settings)
        .unwrap()
        .with_observer(observer.clone());

    ThreeTiers {
        controller: Arc::new(controller),
        probes,
        observer,
    }
}
