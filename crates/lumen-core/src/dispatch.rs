//! Command submission against a live engine.
//!
//! These functions do not check lifecycle state; `EngineHost` does that and
//! holds the handle slot for the duration of the call.

use crate::CoreError;
use lumen_runtime::{CommandArgs, NativeEngine};
use tracing::{trace, warn};

/// Marshal `args` into a null-terminated argument vector and submit it
/// synchronously. The marshalled strings are released when this returns,
/// whatever the outcome.
pub fn dispatch<S: AsRef<str>>(engine: &dyn NativeEngine, args: &[S]) -> Result<(), CoreError> {
    let argv = CommandArgs::marshal(args)?;
    trace!("command: {:?}", argv.to_strings());
    engine.command(&argv).map_err(|e| {
        warn!("command rejected: {e}");
        CoreError::CommandRejected(e)
    })
}

/// Submit one pre-formatted command line.
pub fn dispatch_string(engine: &dyn NativeEngine, command: &str) -> Result<(), CoreError> {
    trace!("command string: {command}");
    engine.command_string(command).map_err(|e| {
        warn!("command rejected: {e}");
        CoreError::CommandRejected(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_runtime::{AppContext, EngineBackend, MockBackend, MAX_COMMAND_ARGS};

    #[test]
    fn bound_checked_before_native_call() {
        let backend = MockBackend::new();
        let probe = backend.probe();
        let engine = backend.create(&AppContext::default()).unwrap();
        engine.initialize().unwrap();

        let args = vec!["x"; MAX_COMMAND_ARGS + 1];
        assert!(matches!(
            dispatch(engine.as_ref(), &args),
            Err(CoreError::TooManyArguments { count: 129, max: 128 })
        ));
        assert!(probe.commands().is_empty());
    }

    #[test]
    fn interior_nul_rejected() {
        let backend = MockBackend::new();
        let probe = backend.probe();
        let engine = backend.create(&AppContext::default()).unwrap();
        engine.initialize().unwrap();

        assert!(matches!(
            dispatch(engine.as_ref(), &["loadfile", "a\0b"]),
            Err(CoreError::InvalidArgument { index: 1 })
        ));
        assert!(probe.commands().is_empty());
    }

    #[test]
    fn engine_rejection_is_command_rejected() {
        let backend = MockBackend::new();
        let probe = backend.probe();
        let engine = backend.create(&AppContext::default()).unwrap();
        engine.initialize().unwrap();
        probe.reject_commands(true);

        let err = dispatch(engine.as_ref(), &["frobnicate"]).unwrap_err();
        assert!(matches!(err, CoreError::CommandRejected(_)));
        assert!(!err.is_fatal());

        let err = dispatch_string(engine.as_ref(), "frobnicate").unwrap_err();
        assert!(matches!(err, CoreError::CommandRejected(_)));
    }

    #[test]
    fn string_command_submitted() {
        let backend = MockBackend::new();
        let probe = backend.probe();
        let engine = backend.create(&AppContext::default()).unwrap();
        engine.initialize().unwrap();

        dispatch_string(engine.as_ref(), "cycle pause").unwrap();
        assert_eq!(probe.command_strings(), vec!["cycle pause".to_owned()]);
    }
}
