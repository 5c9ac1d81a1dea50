//! Lifecycle and concurrency host for a native media engine.
//!
//! This crate owns the single engine handle: `EngineHost` drives the
//! create → configure → init → command → destroy lifecycle through a
//! validated state machine, runs the dedicated event-pump thread with a
//! cooperative shutdown signal, marshals bounded command lists into native
//! calls, and separates fatal setup failures from recoverable errors.

pub mod concurrency;
pub mod dispatch;
pub mod fatal;
pub mod host;
pub mod lifecycle;
pub mod pump;

pub use concurrency::{install_signal_handler, interrupt_requested, ShutdownSignal};
pub use dispatch::{dispatch, dispatch_string};
pub use fatal::EXIT_FATAL;
pub use host::{EngineHost, HostOptions};
pub use lifecycle::{validate_transition, LifecycleState};
pub use pump::{ChannelConsumer, EventConsumer, EventPump, LogConsumer};

use lumen_runtime::{MarshalError, RuntimeError};
use lumen_schema::ProfileError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("engine is already created (state: {0})")]
    AlreadyInitialized(LifecycleState),
    #[error("engine is not created (state: {0})")]
    NotCreated(LifecycleState),
    #[error("engine is not initialized (state: {0})")]
    NotInitialized(LifecycleState),
    #[error("invalid profile: {0}")]
    InvalidProfile(#[from] ProfileError),
    #[error("too many command arguments: {count} (max {max})")]
    TooManyArguments { count: usize, max: usize },
    #[error("command argument {index} contains an interior NUL byte")]
    InvalidArgument { index: usize },
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },
    #[error("lifecycle operation called from the event thread")]
    CalledFromEventThread,
    #[error("command rejected: {0}")]
    CommandRejected(#[source] RuntimeError),
    #[error("option rejected: {0}")]
    OptionRejected(#[source] RuntimeError),
    #[error("engine creation failed: {0}")]
    EngineCreateFailed(#[source] RuntimeError),
    #[error("engine initialization failed: {0}")]
    EngineInitFailed(#[source] RuntimeError),
    #[error("failed to spawn event thread: {0}")]
    ThreadSpawnFailed(#[source] std::io::Error),
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
    #[error("engine state lock poisoned")]
    LockPoisoned,
}

impl CoreError {
    /// Failures the process cannot continue past: without an engine there is
    /// nothing to play with.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::EngineCreateFailed(_) | Self::EngineInitFailed(_) | Self::ThreadSpawnFailed(_)
        )
    }

    /// Rejected before any native call; state is unchanged.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::AlreadyInitialized(_)
                | Self::NotCreated(_)
                | Self::NotInitialized(_)
                | Self::InvalidProfile(_)
                | Self::TooManyArguments { .. }
                | Self::InvalidArgument { .. }
                | Self::CalledFromEventThread
        )
    }
}

impl From<MarshalError> for CoreError {
    fn from(e: MarshalError) -> Self {
        match e {
            MarshalError::TooManyArguments { count, max } => Self::TooManyArguments { count, max },
            MarshalError::InteriorNul { index } => Self::InvalidArgument { index },
        }
    }
}
