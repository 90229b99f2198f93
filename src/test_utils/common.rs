use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing_subscriber::EnvFilter;

use crate::Result;
use crate::TreeCacheEvent;
use crate::TreeCacheEventType;
use crate::TreeCacheListener;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}

/// Forwards every received event into a channel the test can await on.
pub struct EventCollector {
    tx: mpsc::UnboundedSender<TreeCacheEvent>,
}

impl EventCollector {
    pub fn new() -> (Arc<Self>, EventStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), EventStream { rx })
    }
}

impl TreeCacheListener for EventCollector {
    fn on_event(
        &self,
        event: &TreeCacheEvent,
    ) -> Result<()> {
        let _ = self.tx.send(event.clone());
        Ok(())
    }
}

pub struct EventStream {
    rx: mpsc::UnboundedReceiver<TreeCacheEvent>,
}

impl EventStream {
    const WAIT: Duration = Duration::from_secs(5);

    /// Next event; panics when none arrives in time.
    pub async fn next(&mut self) -> TreeCacheEvent {
        match timeout(Self::WAIT, self.rx.recv()).await {
            Ok(Some(event)) => event,
            Ok(None) => panic!("event channel closed"),
            Err(_) => panic!("no event within {:?}", Self::WAIT),
        }
    }

    /// Asserts the next event's type and path.
    pub async fn expect(
        &mut self,
        event_type: TreeCacheEventType,
        path: Option<&str>,
    ) -> TreeCacheEvent {
        let event = self.next().await;
        assert_eq!(
            (event.event_type(), event.path()),
            (event_type, path),
            "unexpected event {event}"
        );
        event
    }

    /// Asserts nothing else arrives within `quiet`.
    pub async fn expect_none(
        &mut self,
        quiet: Duration,
    ) {
        if let Ok(Some(event)) = timeout(quiet, self.rx.recv()).await {
            panic!("unexpected event {event}");
        }
    }
}
