use crate::CoreError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    #[default]
    Uninitialized,
    Created,
    Initialized,
    Destroyed,
}

impl LifecycleState {
    /// A handle exists.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Created | Self::Initialized)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Uninitialized => write!(f, "uninitialized"),
            LifecycleState::Created => write!(f, "created"),
            LifecycleState::Initialized => write!(f, "initialized"),
            LifecycleState::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// Check a lifecycle transition, returning the caller error the rejected
/// operation reports.
///
/// Destroying a handle that does not exist is not a transition; the host
/// treats it as a no-op before calling this.
pub fn validate_transition(from: LifecycleState, to: LifecycleState) -> Result<(), CoreError> {
    use LifecycleState::{Created, Destroyed, Initialized, Uninitialized};

    match (from, to) {
        (Uninitialized | Destroyed, Created)
        | (Created, Initialized)
        | (Created | Initialized, Destroyed) => Ok(()),
        (_, Created) => Err(CoreError::AlreadyInitialized(from)),
        (_, Initialized) => Err(CoreError::NotCreated(from)),
        _ => Err(CoreError::InvalidTransition { from, to }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleState::{Created, Destroyed, Initialized, Uninitialized};

    #[test]
    fn valid_transitions() {
        assert!(validate_transition(Uninitialized, Created).is_ok());
        assert!(validate_transition(Destroyed, Created).is_ok()); // fresh cycle
        assert!(validate_transition(Created, Initialized).is_ok());
        assert!(validate_transition(Created, Destroyed).is_ok());
        assert!(validate_transition(Initialized, Destroyed).is_ok());
    }

    #[test]
    fn invalid_transitions() {
        assert!(matches!(
            validate_transition(Created, Created),
            Err(CoreError::AlreadyInitialized(Created))
        ));
        assert!(matches!(
            validate_transition(Initialized, Created),
            Err(CoreError::AlreadyInitialized(Initialized))
        ));
        assert!(matches!(
            validate_transition(Uninitialized, Initialized),
            Err(CoreError::NotCreated(Uninitialized))
        ));
        assert!(matches!(
            validate_transition(Initialized, Initialized),
            Err(CoreError::NotCreated(Initialized))
        ));
        assert!(matches!(
            validate_transition(Destroyed, Initialized),
            Err(CoreError::NotCreated(Destroyed))
        ));
        assert!(validate_transition(Uninitialized, Destroyed).is_err());
        assert!(validate_transition(Initialized, Uninitialized).is_err());
    }

    #[test]
    fn live_states() {
        assert!(!Uninitialized.is_live());
        assert!(Created.is_live());
        assert!(Initialized.is_live());
        assert!(!Destroyed.is_live());
    }
}
