use crate::CoreError;
use lumen_schema::FatalPolicy;
use tracing::error;

/// Process exit code for unrecoverable engine setup failures.
pub const EXIT_FATAL: i32 = 3;

/// Apply `policy` to `err`: fatal errors end the process under
/// `FatalPolicy::Terminate`, everything else is handed back.
pub fn enforce(policy: FatalPolicy, err: CoreError) -> CoreError {
    if err.is_fatal() && policy == FatalPolicy::Terminate {
        terminate(&err);
    }
    err
}

pub fn terminate(err: &CoreError) -> ! {
    error!("fatal: {err}");
    eprintln!("lumen: fatal: {err}");
    std::process::exit(EXIT_FATAL);
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_runtime::RuntimeError;

    #[test]
    fn return_policy_hands_back_fatal_errors() {
        let err = enforce(
            FatalPolicy::Return,
            CoreError::EngineInitFailed(RuntimeError::Terminated),
        );
        assert!(matches!(err, CoreError::EngineInitFailed(_)));
    }

    #[test]
    fn non_fatal_errors_pass_under_terminate() {
        let err = enforce(
            FatalPolicy::Terminate,
            CoreError::CommandRejected(RuntimeError::Terminated),
        );
        assert!(matches!(err, CoreError::CommandRejected(_)));
    }
}
