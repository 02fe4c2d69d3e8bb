// src/relay/flow.rs

//! Per-message state machine.
//!
//! Pure and synchronous: the relay feeds it [`FlowInput`]s as things happen
//! and it refuses transitions that would skip or repeat a stage.

use std::fmt;

/// Stage of one inbound text message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Received,
    Validating,
    /// Input failed validation. Terminal.
    Rejected,
    Persisting,
    /// Scratch write failed. Terminal.
    PersistFailed,
    Launched,
    /// The worker could not be started. Terminal.
    LaunchFailed,
    Running,
    /// The worker exited. Terminal.
    Terminated,
}

impl FlowState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            FlowState::Rejected
                | FlowState::PersistFailed
                | FlowState::LaunchFailed
                | FlowState::Terminated
        )
    }
}

/// What just happened to the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowInput {
    Begin,
    InputValid,
    InputInvalid,
    Persisted,
    PersistError,
    WorkerStarted,
    LaunchError,
    WorkerExited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: FlowState,
    pub input: FlowInput,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no transition from {:?} on {:?}", self.from, self.input)
    }
}

impl std::error::Error for InvalidTransition {}

/// State of one message's pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFlow {
    state: FlowState,
}

impl Default for RequestFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestFlow {
    pub fn new() -> Self {
        Self {
            state: FlowState::Received,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Apply `input`. On an invalid transition the state is unchanged.
    pub fn advance(&mut self, input: FlowInput) -> Result<FlowState, InvalidTransition> {
        use FlowInput as I;
        use FlowState as S;

        let next = match (self.state, input) {
            (S::Received, I::Begin) => S::Validating,
            (S::Validating, I::InputInvalid) => S::Rejected,
            (S::Validating, I::InputValid) => S::Persisting,
            (S::Persisting, I::PersistError) => S::PersistFailed,
            (S::Persisting, I::Persisted) => S::Launched,
            (S::Launched, I::LaunchError) => S::LaunchFailed,
            (S::Launched, I::WorkerStarted) => S::Running,
            (S::Running, I::WorkerExited) => S::Terminated,
            (from, input) => return Err(InvalidTransition { from, input }),
        };

        self.state = next;
        Ok(next)
    }
}
