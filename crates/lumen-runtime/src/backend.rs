use crate::args::CommandArgs;
use crate::event::EngineEvent;
use crate::RuntimeError;
use lumen_schema::OptionBatch;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Opaque application context handed to the engine at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppContext {
    /// Client name used in diagnostics.
    pub client: String,
}

impl AppContext {
    pub fn new(client: &str) -> Self {
        Self {
            client: client.to_owned(),
        }
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new("lumen")
    }
}

/// One live engine instance.
///
/// All methods may be called from any thread, with two restrictions the host
/// enforces: only one thread calls `wait_event` at a time, and
/// `terminate_destroy` is called with no other call in flight.
pub trait NativeEngine: Send + Sync {
    fn set_option(&self, name: &str, value: &str) -> Result<(), RuntimeError>;

    fn request_log_messages(&self, level: &str) -> Result<(), RuntimeError>;

    fn command_string(&self, command: &str) -> Result<(), RuntimeError>;

    fn initialize(&self) -> Result<(), RuntimeError>;

    fn command(&self, args: &CommandArgs) -> Result<(), RuntimeError>;

    /// Block until an event arrives, the engine is woken, or `timeout`
    /// elapses (`None` waits indefinitely). Wake-ups and timeouts yield `None`.
    fn wait_event(&self, timeout: Option<Duration>) -> Option<EngineEvent>;

    /// Interrupt a pending or the next `wait_event`.
    fn wakeup(&self);

    /// Shut the engine down and release the handle. Later calls are no-ops.
    fn terminate_destroy(&self);

    /// Apply every option in `batch`, in order, stopping at the first failure.
    fn apply_batch(&self, batch: &OptionBatch) -> Result<(), RuntimeError> {
        for option in batch {
            trace!("set option {}={}", option.name, option.value);
            self.set_option(&option.name, &option.value)?;
        }
        Ok(())
    }
}

pub trait EngineBackend: Send + Sync {
    fn name(&self) -> &str;

    fn available(&self) -> bool;

    /// Allocate a new engine handle.
    fn create(&self, ctx: &AppContext) -> Result<Arc<dyn NativeEngine>, RuntimeError>;
}

pub fn select_backend(name: &str) -> Result<Box<dyn EngineBackend>, RuntimeError> {
    match name {
        "libmpv" => Ok(Box::new(crate::libmpv::LibMpvBackend::new())),
        "mock" => Ok(Box::new(crate::mock::MockBackend::new())),
        other => Err(RuntimeError::BackendUnavailable(other.to_owned())),
    }
}
