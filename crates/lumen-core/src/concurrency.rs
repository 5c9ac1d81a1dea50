use lumen_runtime::NativeEngine;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative stop request for the event pump.
///
/// The flag alone is not enough: the pump may be blocked inside the engine's
/// event wait, so [`ShutdownSignal::raise`] pairs it with an engine wake-up.
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    requested: AtomicBool,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Only called when a new pump is about to start.
    pub fn clear(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Set the flag, then wake the engine so a blocked wait returns.
    pub fn raise(&self, engine: &dyn NativeEngine) {
        self.request();
        engine.wakeup();
    }
}

static INTERRUPT_REQUESTED: AtomicBool = AtomicBool::new(false);

pub fn install_signal_handler() {
    let _ = ctrlc::set_handler(move || {
        if INTERRUPT_REQUESTED.load(Ordering::SeqCst) {
            std::process::exit(130);
        }
        INTERRUPT_REQUESTED.store(true, Ordering::SeqCst);
        eprintln!("\ninterrupt received, stopping playback...");
    });
}

pub fn interrupt_requested() -> bool {
    INTERRUPT_REQUESTED.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_runtime::{AppContext, EngineBackend, MockBackend};

    #[test]
    fn request_and_clear() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_requested());
        signal.request();
        signal.request();
        assert!(signal.is_requested());
        signal.clear();
        assert!(!signal.is_requested());
    }

    #[test]
    fn raise_wakes_engine() {
        let backend = MockBackend::new();
        let probe = backend.probe();
        let engine = backend.create(&AppContext::default()).unwrap();

        let signal = ShutdownSignal::new();
        signal.raise(engine.as_ref());
        assert!(signal.is_requested());
        assert_eq!(probe.wakeups(), 1);
        assert!(engine.wait_event(None).is_none());
    }
}
