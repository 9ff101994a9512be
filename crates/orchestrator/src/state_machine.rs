use std::fmt;

use crate::error::{OrchestratorError, Result};

/// Where a single run currently is. Indices refer to the scheduled order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Planning,
    Scheduling,
    Executing(usize),
    Reviewing(usize),
    Done,
    PlanFailed,
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Done | RunPhase::PlanFailed)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::Planning => write!(f, "planning"),
            RunPhase::Scheduling => write!(f, "scheduling"),
            RunPhase::Executing(i) => write!(f, "executing({})", i),
            RunPhase::Reviewing(i) => write!(f, "reviewing({})", i),
            RunPhase::Done => write!(f, "done"),
            RunPhase::PlanFailed => write!(f, "plan_failed"),
        }
    }
}

pub struct RunStateMachine;

impl RunStateMachine {
    pub fn validate_transition(from: &RunPhase, to: &RunPhase) -> Result<()> {
        if Self::is_allowed(from, to) {
            Ok(())
        } else {
            Err(OrchestratorError::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            })
        }
    }

    fn is_allowed(from: &RunPhase, to: &RunPhase) -> bool {
        match (from, to) {
            (RunPhase::Planning, RunPhase::Scheduling | RunPhase::PlanFailed) => true,
            (RunPhase::Scheduling, RunPhase::Executing(0)) => true,
            (RunPhase::Executing(i), RunPhase::Reviewing(j)) => i == j,
            (RunPhase::Executing(i) | RunPhase::Reviewing(i), RunPhase::Executing(j)) => *j == i + 1,
            (RunPhase::Executing(_) | RunPhase::Reviewing(_), RunPhase::Done) => true,
            _ => false,
        }
    }

    pub fn can_transition(from: &RunPhase, to: &RunPhase) -> bool {
        Self::validate_transition(from, to).is_ok()
    }

    /// Move `phase` to `to`, rejecting anything the run lifecycle forbids.
    pub fn advance(phase: &mut RunPhase, to: RunPhase) -> Result<()> {
        Self::validate_transition(phase, &to)?;
        *phase = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        assert!(RunStateMachine::can_transition(
            &RunPhase::Planning,
            &RunPhase::Scheduling
        ));
        assert!(RunStateMachine::can_transition(
            &RunPhase::Planning,
            &RunPhase::PlanFailed
        ));
        assert!(RunStateMachine::can_transition(
            &RunPhase::Scheduling,
            &RunPhase::Executing(0)
        ));
        assert!(RunStateMachine::can_transition(
            &RunPhase::Executing(2),
            &RunPhase::Reviewing(2)
        ));
        assert!(RunStateMachine::can_transition(
            &RunPhase::Reviewing(2),
            &RunPhase::Executing(3)
        ));
        assert!(RunStateMachine::can_transition(
            &RunPhase::Executing(3),
            &RunPhase::Done
        ));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!RunStateMachine::can_transition(
            &RunPhase::Scheduling,
            &RunPhase::PlanFailed
        ));
        assert!(!RunStateMachine::can_transition(
            &RunPhase::Executing(0),
            &RunPhase::Executing(2)
        ));
        assert!(!RunStateMachine::can_transition(
            &RunPhase::Executing(1),
            &RunPhase::Reviewing(0)
        ));
        assert!(!RunStateMachine::can_transition(
            &RunPhase::Planning,
            &RunPhase::Done
        ));
        assert!(!RunStateMachine::can_transition(
            &RunPhase::Done,
            &RunPhase::Planning
        ));
    }

    #[test]
    fn test_advance() {
        let mut phase = RunPhase::Planning;
        RunStateMachine::advance(&mut phase, RunPhase::Scheduling).unwrap();
        assert_eq!(phase, RunPhase::Scheduling);

        let err = RunStateMachine::advance(&mut phase, RunPhase::Done).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid run phase transition from scheduling to done"
        );
        assert_eq!(phase, RunPhase::Scheduling);
        assert!(!phase.is_terminal());
    }
}
