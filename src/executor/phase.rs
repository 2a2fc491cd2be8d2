//! Execution phases and the recorded trail of one execution

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecutionPhase {
    #[default]
    Idle,
    InputCollection,
    EmptyInputError,
    AwaitingResponse,
    Success,
    Reconciling,
    Failure,
    FallbackOrError,
}

impl ExecutionPhase {
    /// Whether `next` may directly follow `self`
    pub fn can_transition_to(self, next: ExecutionPhase) -> bool {
        use ExecutionPhase::*;
        matches!(
            (self, next),
            (Idle, InputCollection)
                // Unresolvable input or invalid descriptor aborts collection
                | (InputCollection, Idle)
                | (InputCollection, EmptyInputError)
                | (InputCollection, AwaitingResponse)
                | (EmptyInputError, Idle)
                | (AwaitingResponse, Success)
                | (AwaitingResponse, Failure)
                | (Success, Reconciling)
                | (Reconciling, Idle)
                | (Failure, FallbackOrError)
                | (FallbackOrError, Idle)
        )
    }

    /// Loading indication is shown only while waiting on the backend
    pub fn shows_loading(self) -> bool {
        self == ExecutionPhase::AwaitingResponse
    }
}

/// Ordered phases one execution passed through, starting at `Idle`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTrail {
    phases: Vec<ExecutionPhase>,
}

impl Default for PhaseTrail {
    fn default() -> Self {
        Self {
            phases: vec![ExecutionPhase::Idle],
        }
    }
}

impl PhaseTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> ExecutionPhase {
        self.phases
            .last()
            .copied()
            .unwrap_or_default()
    }

    /// Record the next phase. Illegal transitions are logged and still recorded.
    pub fn advance(&mut self, next: ExecutionPhase) {
        let current = self.current();
        if !current.can_transition_to(next) {
            tracing::warn!("Unexpected phase transition {:?} -> {:?}", current, next);
        }
        tracing::trace!("Phase {:?} -> {:?}", current, next);
        self.phases.push(next);
    }

    pub fn phases(&self) -> &[ExecutionPhase] {
        &self.phases
    }

    /// Whether every recorded step was a legal transition
    pub fn is_valid(&self) -> bool {
        self.phases
            .windows(2)
            .all(|pair| pair[0].can_transition_to(pair[1]))
    }

    pub fn is_finished(&self) -> bool {
        self.phases.len() > 1 && self.current() == ExecutionPhase::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ExecutionPhase::*;

    #[test]
    fn test_success_path() {
        let mut trail = PhaseTrail::new();
        for phase in [InputCollection, AwaitingResponse, Success, Reconciling, Idle] {
            trail.advance(phase);
        }
        assert!(trail.is_valid());
        assert!(trail.is_finished());
    }

    #[test]
    fn test_empty_input_path_never_waits() {
        let mut trail = PhaseTrail::new();
        for phase in [InputCollection, EmptyInputError, Idle] {
            trail.advance(phase);
        }
        assert!(trail.is_valid());
        assert!(!trail.phases().iter().any(|p| p.shows_loading()));
    }

    #[test]
    fn test_illegal_transition_detected() {
        let mut trail = PhaseTrail::new();
        trail.advance(InputCollection);
        trail.advance(Success);
        assert!(!trail.is_valid());
        assert!(!EmptyInputError.can_transition_to(AwaitingResponse));
    }

    #[test]
    fn test_new_trail_not_finished() {
        let trail = PhaseTrail::new();
        assert_eq!(trail.current(), Idle);
        assert!(!trail.is_finished());
    }
}
