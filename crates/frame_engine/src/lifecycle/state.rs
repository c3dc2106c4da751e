//! Lifecycle states and the transitions between them

use thiserror::Error;

use crate::render::DeviceError;

/// Where the controller is in the resource lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// No device resources exist
    Uninitialized,
    /// Device-dependent resources exist; size-dependent ones do not
    DeviceReady,
    /// Everything needed to render exists
    SizeReady,
    /// The device was lost and its resources released
    Lost,
}

/// Something that moves the lifecycle between states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// Device-dependent resources created on a fresh device
    DeviceCreated,
    /// Window-size-dependent resources created
    SizeResourcesCreated,
    /// Window size changed and size-dependent resources were rebuilt
    SizeChanged,
    /// Device lost; device-dependent resources released
    DeviceLost,
    /// Device-dependent resources recreated on a restored device
    DeviceRestored,
    /// All resources released at application exit
    Shutdown,
}

impl LifecycleState {
    /// State after `event`, or `None` when the event is not valid here
    pub fn next(self, event: LifecycleEvent) -> Option<Self> {
        use LifecycleEvent as E;
        use LifecycleState as S;

        match (self, event) {
            (S::Uninitialized, E::DeviceCreated) => Some(S::DeviceReady),
            (S::DeviceReady, E::SizeResourcesCreated) => Some(S::SizeReady),
            (S::SizeReady, E::SizeChanged) => Some(S::SizeReady),
            (S::DeviceReady | S::SizeReady, E::DeviceLost) => Some(S::Lost),
            (S::Lost, E::DeviceRestored) => Some(S::DeviceReady),
            (_, E::Shutdown) => Some(S::Uninitialized),
            _ => None,
        }
    }

    /// Whether device-dependent resources are expected to exist
    pub fn has_device_resources(self) -> bool {
        matches!(self, Self::DeviceReady | Self::SizeReady)
    }

    /// Whether a frame may be rendered in this state
    pub fn can_render(self) -> bool {
        self == Self::SizeReady
    }
}

/// Lifecycle errors
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Event not valid in the current state; the state is unchanged
    #[error("Invalid lifecycle transition: {event:?} while {state:?}")]
    InvalidTransition {
        /// State at the time of the event
        state: LifecycleState,
        /// Rejected event
        event: LifecycleEvent,
    },

    /// Device failure
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Result type for lifecycle operations
pub type LifecycleResult<T> = Result<T, LifecycleError>;

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [LifecycleState; 4] = [
        LifecycleState::Uninitialized,
        LifecycleState::DeviceReady,
        LifecycleState::SizeReady,
        LifecycleState::Lost,
    ];

    #[test]
    fn test_startup_sequence() {
        let state = LifecycleState::Uninitialized
            .next(LifecycleEvent::DeviceCreated)
            .and_then(|s| s.next(LifecycleEvent::SizeResourcesCreated));
        assert_eq!(state, Some(LifecycleState::SizeReady));
    }

    #[test]
    fn test_recovery_sequence() {
        let state = LifecycleState::SizeReady
            .next(LifecycleEvent::DeviceLost)
            .and_then(|s| s.next(LifecycleEvent::DeviceRestored))
            .and_then(|s| s.next(LifecycleEvent::SizeResourcesCreated));
        assert_eq!(state, Some(LifecycleState::SizeReady));
    }

    #[test]
    fn test_size_change_only_when_ready() {
        assert_eq!(LifecycleState::SizeReady.next(LifecycleEvent::SizeChanged), Some(LifecycleState::SizeReady));
        assert_eq!(LifecycleState::DeviceReady.next(LifecycleEvent::SizeChanged), None);
        assert_eq!(LifecycleState::Lost.next(LifecycleEvent::SizeChanged), None);
        assert_eq!(LifecycleState::Uninitialized.next(LifecycleEvent::SizeChanged), None);
    }

    /// Creation on a device that was never lost goes through `DeviceCreated`, not `DeviceRestored`
    #[test]
    fn test_restore_requires_lost_device() {
        for state in ALL_STATES {
            let expected = (state == LifecycleState::Lost).then_some(LifecycleState::DeviceReady);
            assert_eq!(state.next(LifecycleEvent::DeviceRestored), expected);
        }
    }

    #[test]
    fn test_device_lost_needs_resources() {
        for state in ALL_STATES {
            let accepted = state.next(LifecycleEvent::DeviceLost).is_some();
            assert_eq!(accepted, state.has_device_resources());
        }
    }

    #[test]
    fn test_shutdown_from_anywhere() {
        for state in ALL_STATES {
            assert_eq!(state.next(LifecycleEvent::Shutdown), Some(LifecycleState::Uninitialized));
        }
    }

    #[test]
    fn test_only_size_ready_renders() {
        let renderable: Vec<_> = ALL_STATES.into_iter().filter(|s| s.can_render()).collect();
        assert_eq!(renderable, vec![LifecycleState::SizeReady]);
    }

    /// Device failures are the only errors that come from outside the state machine
    #[test]
    fn test_device_errors_pass_through() {
        let lost: LifecycleError = DeviceError::Lost.into();
        assert!(matches!(lost, LifecycleError::Device(DeviceError::Lost)));
        assert_eq!(lost.to_string(), DeviceError::Lost.to_string());

        let fatal: LifecycleError = DeviceError::Fatal("queue submit".to_string()).into();
        assert_eq!(fatal.to_string(), "Fatal device error: queue submit");
    }
}
