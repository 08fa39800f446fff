//! Health probe strategies.
//!
//! A probe performs one reachability check for a tier. The owning [`Link`]
//! bounds it with the tier timeout and measures the round trip, so probes
//! only report what they know beyond that (modeled latency, bandwidth, loss).
//!
//! [`Link`]: crate::link::Link

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use rand::Rng;
use thiserror::Error;
use tokio::net::TcpStream;

use crate::config::ProbeSpec;

/// Errors produced by a single probe attempt.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("non-success status {0}")]
    Status(u16),

    #[error("simulated outage")]
    Simulated,

    #[error("probe panicked")]
    Panicked,
}

/// What a successful probe observed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProbeSample {
    /// Modeled latency; `None` means use the measured round trip.
    pub latency: Option<Duration>,
    /// Observed bandwidth; `None` means use the nominal figure.
    pub bandwidth_mbps: Option<f64>,
    pub packet_loss_percent: f64,
}

impl ProbeSample {
    /// A sample whose latency is the measured round trip.
    pub fn measured() -> Self {
        Self::default()
    }
}

/// A pluggable reachability check for one tier.
#[async_trait]
pub trait Probe: Send + Sync + fmt::Debug {
    async fn probe(&self) -> Result<ProbeSample, ProbeError>;
}

/// TCP connect round trip to a well-known endpoint.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    address: String,
}

impl TcpProbe {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[async_trait]
impl Probe for TcpProbe {
    async fn probe(&self) -> Result<ProbeSample, ProbeError> {
        let stream = TcpStream::connect(&self.address).await?;
        drop(stream);
        Ok(ProbeSample::measured())
    }
}

/// HTTP GET against an endpoint; any 2xx counts as reachable.
pub struct HttpProbe {
    uri: Uri,
    client: Client<HttpConnector, Body>,
}

impl HttpProbe {
    pub fn new(uri: Uri) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { uri, client }
    }
}

impl fmt::Debug for HttpProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpProbe").field("uri", &self.uri).finish()
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self) -> Result<ProbeSample, ProbeError> {
        let request = Request::builder()
            .method("GET")
            .uri(self.uri.clone())
            .header("user-agent", "link-resilience-probe")
            .body(Body::empty())
            .map_err(|e| ProbeError::Http(e.to_string()))?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| ProbeError::Http(e.to_string()))?;

        if response.status().is_success() {
            Ok(ProbeSample::measured())
        } else {
            Err(ProbeError::Status(response.status().as_u16()))
        }
    }
}

/// Always-on tier with a fixed profile, e.g. a LoRa fallback radio.
#[derive(Debug, Clone)]
pub struct StaticProbe {
    latency: Duration,
    bandwidth_mbps: f64,
    packet_loss_percent: f64,
}

impl StaticProbe {
    pub fn new(latency: Duration, bandwidth_mbps: f64, packet_loss_percent: f64) -> Self {
        Self {
            latency,
            bandwidth_mbps,
            packet_loss_percent,
        }
    }
}

#[async_trait]
impl Probe for StaticProbe {
    async fn probe(&self) -> Result<ProbeSample, ProbeError> {
        Ok(ProbeSample {
            latency: Some(self.latency),
            bandwidth_mbps: Some(self.bandwidth_mbps),
            packet_loss_percent: self.packet_loss_percent,
        })
    }
}

/// Randomized synthetic tier for bench setups without real uplinks.
#[derive(Debug, Clone)]
pub struct SimulatedProbe {
    latency: Duration,
    jitter: Duration,
    failure_rate: f64,
    bandwidth_mbps: f64,
}

impl SimulatedProbe {
    pub fn new(latency: Duration, jitter: Duration, failure_rate: f64, bandwidth_mbps: f64) -> Self {
        Self {
            latency,
            jitter,
            failure_rate: failure_rate.clamp(0.0, 1.0),
            bandwidth_mbps,
        }
    }

    fn draw(&self) -> Result<ProbeSample, ProbeError> {
        let mut rng = rand::thread_rng();
        if rng.gen_bool(self.failure_rate) {
            return Err(ProbeError::Simulated);
        }
        let jitter_ms = self.jitter.as_millis() as u64;
        let jitter = if jitter_ms > 0 {
            Duration::from_millis(rng.gen_range(0..=jitter_ms))
        } else {
            Duration::ZERO
        };
        Ok(ProbeSample {
            latency: Some(self.latency + jitter),
            bandwidth_mbps: Some(self.bandwidth_mbps * rng.gen_range(0.8..=1.0)),
            packet_loss_percent: 0.0,
        })
    }
}

#[async_trait]
impl Probe for SimulatedProbe {
    async fn probe(&self) -> Result<ProbeSample, ProbeError> {
        let sample = self.draw()?;
        if let Some(latency) = sample.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(sample)
    }
}

/// Build the probe described by a config entry.
pub fn build_probe(spec: &ProbeSpec) -> Result<Arc<dyn Probe>, String> {
    let probe: Arc<dyn Probe> = match spec {
        ProbeSpec::Tcp { address } => Arc::new(TcpProbe::new(address.clone())),
        ProbeSpec::Http { url } => {
            let uri: Uri = url
                .parse()
                .map_err(|e| format!("invalid probe URL '{}': {}", url, e))?;
            Arc::new(HttpProbe::new(uri))
        }
        ProbeSpec::Static {
            latency_ms,
            bandwidth_mbps,
            packet_loss_percent,
        } => Arc::new(StaticProbe::new(
            Duration::from_millis(*latency_ms),
            *bandwidth_mbps,
            *packet_loss_percent,
        )),
        ProbeSpec::Simulated {
            latency_ms,
            jitter_ms,
            failure_rate,
            bandwidth_mbps,
        } => Arc::new(SimulatedProbe::new(
            Duration::from_millis(*latency_ms),
            Duration::from_millis(*jitter_ms),
            *failure_rate,
            *bandwidth_mbps,
        )),
    };
    Ok(probe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_probe_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        let probe = TcpProbe::new(addr.to_string());
        assert!(probe.probe().await.is_ok());
    }

    #[tokio::test]
    async fn test_tcp_probe_refused() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe = TcpProbe::new(addr.to_string());
        assert!(matches!(probe.probe().await, Err(ProbeError::Connect(_))));
    }

    #[tokio::test]
    async fn test_static_probe_reports_profile() {
        let probe = StaticProbe::new(Duration::from_millis(180), 0.05, 5.0);
        let sample = probe.probe().await.unwrap();
        assert_eq!(sample.latency, Some(Duration::from_millis(180)));
        assert_eq!(sample.bandwidth_mbps, Some(0.05));
        assert_eq!(sample.packet_loss_percent, 5.0);
    }

    #[test]
    fn test_simulated_probe_bounds() {
        let always_down = SimulatedProbe::new(Duration::from_millis(5), Duration::ZERO, 1.0, 10.0);
        assert!(matches!(always_down.draw(), Err(ProbeError::Simulated)));

        let always_up = SimulatedProbe::new(Duration::from_millis(5), Duration::from_millis(3), 0.0, 10.0);
        for _ in 0..50 {
            let sample = always_up.draw().unwrap();
            let latency = sample.latency.unwrap();
            assert!(latency >= Duration::from_millis(5));
            assert!(latency <= Duration::from_millis(8));
            let bw = sample.bandwidth_mbps.unwrap();
            assert!((8.0..=10.0).contains(&bw));
        }
    }

    #[test]
    fn test_build_probe_rejects_bad_url() {
        let spec = ProbeSpec::Http {
            url: "not a url".to_string(),
        };
        assert!(build_probe(&spec).is_err());
    }
}
