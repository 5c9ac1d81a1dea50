//! Native media engine seam for Lumen.
//!
//! This crate is the boundary to the playback engine the host does not own:
//! the pluggable `EngineBackend` / `NativeEngine` traits mirroring libmpv's
//! handle-based client API, scoped marshalling of command argument lists into
//! null-terminated C string vectors (`CommandArgs`), the event types the engine
//! produces, a run-time loaded libmpv backend, and an in-memory mock backend.

pub mod args;
pub mod backend;
pub mod event;
pub mod libmpv;
pub mod mock;

pub use args::{CommandArgs, MarshalError, MAX_COMMAND_ARGS};
pub use backend::{select_backend, AppContext, EngineBackend, NativeEngine};
pub use event::{EngineEvent, EventKind, LogMessage};
pub use mock::{MockBackend, MockProbe};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("backend '{0}' is not available on this system")]
    BackendUnavailable(String),
    #[error("failed to load engine library: {0}")]
    LibraryLoad(String),
    #[error("engine handle allocation failed: {0}")]
    CreateFailed(String),
    #[error("{call} failed ({code}): {message}")]
    Engine {
        call: &'static str,
        code: i32,
        message: String,
    },
    #[error("engine handle already terminated")]
    Terminated,
    #[error("string contains an interior NUL byte: {0:?}")]
    InvalidString(String),
}
