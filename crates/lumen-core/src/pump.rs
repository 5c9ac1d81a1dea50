use crate::concurrency::ShutdownSignal;
use lumen_runtime::{EngineEvent, EventKind, NativeEngine};
use std::cell::Cell;
use std::io;
use std::ptr;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

pub const EVENT_THREAD_NAME: &str = "lumen-events";

thread_local! {
    // Signal of the pump running on this thread; null elsewhere.
    static EVENT_THREAD_OF: Cell<*const ShutdownSignal> = const { Cell::new(ptr::null()) };
}

/// True while running on the event-pump thread that `signal` stops.
///
/// Pump threads of other hosts are not matched, so a consumer may drive a
/// second host's lifecycle.
pub(crate) fn on_event_thread_of(signal: &ShutdownSignal) -> bool {
    EVENT_THREAD_OF.with(|owner| ptr::eq(owner.get(), signal))
}

/// Receives every event the pump retrieves, on the pump thread.
pub trait EventConsumer: Send + 'static {
    fn on_event(&mut self, event: &EngineEvent);
}

impl<F> EventConsumer for F
where
    F: FnMut(&EngineEvent) + Send + 'static,
{
    fn on_event(&mut self, event: &EngineEvent) {
        self(event);
    }
}

/// Routes engine log messages and events into `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogConsumer;

impl EventConsumer for LogConsumer {
    fn on_event(&mut self, event: &EngineEvent) {
        if let Some(log) = &event.log {
            let text = log.text.trim_end();
            match log.level.as_str() {
                "fatal" | "error" => error!(target: "engine", "[{}] {}", log.prefix, text),
                "warn" => warn!(target: "engine", "[{}] {}", log.prefix, text),
                "info" => info!(target: "engine", "[{}] {}", log.prefix, text),
                "v" | "debug" => debug!(target: "engine", "[{}] {}", log.prefix, text),
                _ => trace!(target: "engine", "[{}] {}", log.prefix, text),
            }
            return;
        }
        if event.error < 0 {
            warn!(target: "engine", "event {} (error {})", event.kind, event.error);
        } else {
            debug!(target: "engine", "event {}", event.kind);
        }
    }
}

/// Forwards owned copies of events into a channel. A closed receiver is
/// ignored.
#[derive(Debug, Clone)]
pub struct ChannelConsumer {
    tx: Sender<EngineEvent>,
}

impl ChannelConsumer {
    pub fn new(tx: Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventConsumer for ChannelConsumer {
    fn on_event(&mut self, event: &EngineEvent) {
        let _ = self.tx.send(event.clone());
    }
}

/// The dedicated thread draining engine events.
pub struct EventPump {
    handle: JoinHandle<()>,
}

impl EventPump {
    /// Spawn the pump thread.
    ///
    /// The loop checks `signal` before each wait and again after it returns,
    /// so an event retrieved after shutdown was requested is dropped instead
    /// of delivered.
    pub fn start(
        engine: Arc<dyn NativeEngine>,
        signal: Arc<ShutdownSignal>,
        mut consumer: Box<dyn EventConsumer>,
        timeout: Option<Duration>,
    ) -> io::Result<Self> {
        let handle = thread::Builder::new()
            .name(EVENT_THREAD_NAME.to_owned())
            .spawn(move || {
                EVENT_THREAD_OF.with(|owner| owner.set(Arc::as_ptr(&signal)));
                debug!("event pump started");
                let mut delivered: u64 = 0;
                loop {
                    if signal.is_requested() {
                        break;
                    }
                    let event = engine.wait_event(timeout);
                    if signal.is_requested() {
                        break;
                    }
                    let Some(event) = event else {
                        continue;
                    };
                    if event.kind == EventKind::Shutdown {
                        debug!("engine reported shutdown");
                    }
                    consumer.on_event(&event);
                    delivered += 1;
                }
                debug!("event pump stopped after {delivered} events");
            })?;
        Ok(Self { handle })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the thread to exit. A panicking consumer is logged, not
    /// propagated.
    pub fn join(self) {
        if self.handle.join().is_err() {
            error!("event pump thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_runtime::{AppContext, EngineBackend, MockBackend};
    use std::sync::mpsc;
    use std::sync::Mutex;

    fn mock_engine() -> (Arc<lumen_runtime::MockProbe>, Arc<dyn NativeEngine>) {
        let backend = MockBackend::new();
        let probe = backend.probe();
        let engine = backend.create(&AppContext::default()).unwrap();
        (probe, engine)
    }

    #[test]
    fn delivers_events_in_order() {
        let (probe, engine) = mock_engine();
        let signal = Arc::new(ShutdownSignal::new());
        let (tx, rx) = mpsc::channel();

        let pump = EventPump::start(
            Arc::clone(&engine),
            Arc::clone(&signal),
            Box::new(ChannelConsumer::new(tx)),
            None,
        )
        .unwrap();

        probe.push_event(EngineEvent::new(EventKind::StartFile));
        probe.push_event(EngineEvent::new(EventKind::FileLoaded));

        let timeout = Duration::from_secs(5);
        assert_eq!(rx.recv_timeout(timeout).unwrap().kind, EventKind::StartFile);
        assert_eq!(rx.recv_timeout(timeout).unwrap().kind, EventKind::FileLoaded);

        signal.raise(engine.as_ref());
        pump.join();
    }

    #[test]
    fn exits_on_wake_with_silent_engine() {
        let (_probe, engine) = mock_engine();
        let signal = Arc::new(ShutdownSignal::new());
        let pump = EventPump::start(
            Arc::clone(&engine),
            Arc::clone(&signal),
            Box::new(LogConsumer),
            None,
        )
        .unwrap();

        signal.raise(engine.as_ref());
        pump.join();
    }

    #[test]
    fn exits_with_timeout_and_no_wakeup() {
        let (_probe, engine) = mock_engine();
        let signal = Arc::new(ShutdownSignal::new());
        let pump = EventPump::start(
            engine,
            Arc::clone(&signal),
            Box::new(LogConsumer),
            Some(Duration::from_millis(10)),
        )
        .unwrap();

        signal.request();
        pump.join();
    }

    #[test]
    fn event_after_shutdown_request_is_dropped() {
        let (probe, engine) = mock_engine();
        let signal = Arc::new(ShutdownSignal::new());
        signal.request();
        probe.push_event(EngineEvent::new(EventKind::StartFile));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let pump = EventPump::start(
            engine,
            signal,
            Box::new(move |e: &EngineEvent| sink.lock().unwrap().push(e.kind)),
            None,
        )
        .unwrap();
        pump.join();

        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn thread_is_named_and_flagged_for_its_own_signal() {
        let (probe, engine) = mock_engine();
        let signal = Arc::new(ShutdownSignal::new());
        let other = Arc::new(ShutdownSignal::new());
        let (tx, rx) = mpsc::channel();

        let own = Arc::clone(&signal);
        let foreign = Arc::clone(&other);
        let pump = EventPump::start(
            Arc::clone(&engine),
            Arc::clone(&signal),
            Box::new(move |_: &EngineEvent| {
                let name = thread::current().name().map(str::to_owned);
                let _ = tx.send((name, on_event_thread_of(&own), on_event_thread_of(&foreign)));
            }),
            None,
        )
        .unwrap();

        probe.push_event(EngineEvent::new(EventKind::Seek));
        let (name, flagged, foreign_flagged) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name.as_deref(), Some(EVENT_THREAD_NAME));
        assert!(flagged);
        assert!(!foreign_flagged);
        assert!(!on_event_thread_of(&signal));
        assert!(!on_event_thread_of(&other));

        signal.raise(engine.as_ref());
        pump.join();
    }
}
