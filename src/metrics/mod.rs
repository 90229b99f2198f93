//! Prometheus instrumentation.
//!
//! Collectors are process-wide. Embedders expose them by registering them on
//! their own registry with [`register_metrics`].


use lazy_static::lazy_static;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;

lazy_static! {
    pub static ref EVENTS_PUBLISHED: IntCounterVec = IntCounterVec::new(
        Opts::new("treecache_events_published", "Tree cache events dispatched to listeners"),
        &["event_type"]
    )
    .expect("metric can not be created");

    pub static ref OUTSTANDING_OPS: IntGauge = IntGauge::new(
        "treecache_outstanding_ops",
        "Watched reads issued and not yet answered"
    )
    .expect("metric can not be created");

    pub static ref LISTENER_ERRORS: IntCounter = IntCounter::new(
        "treecache_listener_errors",
        "Listener invocations that failed or panicked"
    )
    .expect("metric can not be created");

    pub static ref RPC_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("treecache_rpc_failures", "Watched reads answered with an unexpected code"),
        &["op"]
    )
    .expect("metric can not be created");
}

pub fn register_metrics(registry: &Registry) -> prometheus::Result<()> {
    registry.register(Box::new(EVENTS_PUBLISHED.clone()))?;
    registry.register(Box::new(OUTSTANDING_OPS.clone()))?;
    registry.register(Box::new(LISTENER_ERRORS.clone()))?;
    registry.register(Box::new(RPC_FAILURES.clone()))?;
    Ok(())
}
