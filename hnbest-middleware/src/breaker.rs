//! Failure-ratio circuit breaker over a rolling sampling window.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use hnbest_core::{
    HnError, Middleware, Transport, UpstreamRequest, UpstreamResponse, is_transient_outcome,
};
use hnbest_types::CircuitBreakerConfig;
use tokio::time::Instant;

const BUCKETS: u32 = 10;

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls pass through and are sampled.
    Closed,
    /// Calls fail fast.
    Open,
    /// One probe call decides whether to close or re-open.
    HalfOpen,
}

#[derive(Debug)]
enum Circuit {
    Closed,
    Open { until: Instant },
    HalfOpen { probing: bool },
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    start: Instant,
    total: u64,
    failures: u64,
}

/// Outcome counts bucketed over the sampling window.
#[derive(Debug)]
struct Window {
    span: Duration,
    width: Duration,
    buckets: VecDeque<Bucket>,
}

impl Window {
    fn new(span: Duration) -> Self {
        let width = (span / BUCKETS).max(Duration::from_millis(1));
        Self {
            span,
            width,
            buckets: VecDeque::with_capacity(BUCKETS as usize + 1),
        }
    }

    fn record(&mut self, now: Instant, failed: bool) {
        self.prune(now);
        let open_new = self
            .buckets
            .back()
            .is_none_or(|b| now >= b.start + self.width);
        if open_new {
            self.buckets.push_back(Bucket {
                start: now,
                total: 0,
                failures: 0,
            });
        }
        if let Some(b) = self.buckets.back_mut() {
            b.total += 1;
            if failed {
                b.failures += 1;
            }
        }
    }

    fn prune(&mut self, now: Instant) {
        while self
            .buckets
            .front()
            .is_some_and(|b| now >= b.start + self.span)
        {
            self.buckets.pop_front();
        }
    }

    fn totals(&self) -> (u64, u64) {
        self.buckets
            .iter()
            .fold((0, 0), |(t, f), b| (t + b.total, f + b.failures))
    }

    fn clear(&mut self) {
        self.buckets.clear();
    }
}

#[derive(Debug)]
struct BreakerState {
    circuit: Circuit,
    window: Window,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Sampled,
    Probe,
}

/// Transport wrapper that stops calling a failing upstream for a while.
///
/// While closed, each transient failure (connection error, timeout, 408, 429,
/// 5xx) and each success is sampled. Once the window holds at least
/// `minimum_throughput` calls and the failure share reaches `failure_ratio`,
/// the circuit opens and calls fail with `HnError::CircuitOpen` for
/// `break_duration`. The first call after that is a probe: success closes the
/// circuit, failure re-opens it. Other calls fail fast while the probe runs.
pub struct CircuitBreakerTransport {
    inner: Arc<dyn Transport>,
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
}

impl CircuitBreakerTransport {
    /// Wrap `inner` with the given breaker settings.
    #[must_use]
    pub fn new(inner: Arc<dyn Transport>, config: CircuitBreakerConfig) -> Self {
        Self {
            inner,
            config,
            state: Mutex::new(BreakerState {
                circuit: Circuit::Closed,
                window: Window::new(config.sampling_window),
            }),
        }
    }

    /// Current state. An open circuit whose break has elapsed reports `HalfOpen`.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        match self.lock().circuit {
            Circuit::Closed => CircuitState::Closed,
            Circuit::Open { until } if Instant::now() < until => CircuitState::Open,
            Circuit::Open { .. } | Circuit::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn admit(&self) -> Result<Admission, HnError> {
        let mut st = self.lock();
        let now = Instant::now();
        match st.circuit {
            Circuit::Closed => Ok(Admission::Sampled),
            Circuit::Open { until } if now < until => Err(HnError::CircuitOpen {
                reset_in_ms: u64::try_from((until - now).as_millis()).unwrap_or(u64::MAX),
            }),
            Circuit::Open { .. } | Circuit::HalfOpen { probing: false } => {
                st.circuit = Circuit::HalfOpen { probing: true };
                #[cfg(feature = "tracing")]
                tracing::info!(transport = self.inner.name(), "circuit half-open, probing");
                Ok(Admission::Probe)
            }
            Circuit::HalfOpen { probing: true } => Err(HnError::CircuitOpen { reset_in_ms: 0 }),
        }
    }

    fn record(&self, admission: Admission, failed: bool) {
        let mut st = self.lock();
        let now = Instant::now();
        match admission {
            Admission::Probe => {
                st.window.clear();
                if failed {
                    self.trip(&mut st, now);
                } else {
                    st.circuit = Circuit::Closed;
                    #[cfg(feature = "tracing")]
                    tracing::info!(transport = self.inner.name(), "circuit closed");
                }
            }
            Admission::Sampled => {
                if !matches!(st.circuit, Circuit::Closed) {
                    return;
                }
                st.window.record(now, failed);
                let (total, failures) = st.window.totals();
                #[allow(clippy::cast_precision_loss)]
                let ratio = failures as f64 / total as f64;
                if total >= self.config.minimum_throughput.max(1)
                    && ratio >= self.config.failure_ratio
                {
                    st.window.clear();
                    self.trip(&mut st, now);
                }
            }
        }
    }

    fn trip(&self, st: &mut BreakerState, now: Instant) {
        st.circuit = Circuit::Open {
            until: now + self.config.break_duration,
        };
        #[cfg(feature = "tracing")]
        tracing::warn!(
            transport = self.inner.name(),
            break_ms = u64::try_from(self.config.break_duration.as_millis()).unwrap_or(u64::MAX),
            "circuit opened"
        );
    }

    // A probe abandoned mid-flight hands the probe slot to the next caller.
    fn release_probe(&self) {
        let mut st = self.lock();
        if matches!(st.circuit, Circuit::HalfOpen { probing: true }) {
            st.circuit = Circuit::HalfOpen { probing: false };
        }
    }
}

struct ProbeGuard<'a> {
    breaker: &'a CircuitBreakerTransport,
    armed: bool,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.breaker.release_probe();
        }
    }
}

#[async_trait]
impl Transport for CircuitBreakerTransport {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn send(&self, req: &UpstreamRequest) -> Result<UpstreamResponse, HnError> {
        let admission = self.admit()?;
        let mut probe = ProbeGuard {
            breaker: self,
            armed: admission == Admission::Probe,
        };
        let outcome = self.inner.send(req).await;
        probe.armed = false;

        let failed = is_transient_outcome(&outcome);
        let unsampled = matches!(&outcome, Err(e) if e.is_fast_fail());
        if unsampled && admission == Admission::Probe {
            self.release_probe();
        } else if !unsampled {
            self.record(admission, failed);
        }
        outcome
    }
}

/// Middleware config for constructing a [`CircuitBreakerTransport`].
pub struct CircuitBreakerMiddleware {
    pub config: CircuitBreakerConfig,
}

impl CircuitBreakerMiddleware {
    #[must_use]
    pub const fn new(config: CircuitBreakerConfig) -> Self {
        Self { config }
    }
}

impl Middleware for CircuitBreakerMiddleware {
    fn apply(self: Box<Self>, inner: Arc<dyn Transport>) -> Arc<dyn Transport> {
        Arc::new(CircuitBreakerTransport::new(inner, self.config))
    }

    fn name(&self) -> &'static str {
        "CircuitBreakerTransport"
    }

    fn config_json(&self) -> serde_json::Value {
        serde_json::json!({
            "sampling_window_ms": self.config.sampling_window.as_millis(),
            "failure_ratio": self.config.failure_ratio,
            "minimum_throughput": self.config.minimum_throughput,
            "break_duration_ms": self.config.break_duration.as_millis(),
        })
    }
}
