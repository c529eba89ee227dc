//! Job lifecycle state machine.

use std::fmt;

/// Lifecycle status of a [`Job`](super::Job).
///
/// Status only moves forward: a finished job is never restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    /// The job has been built but its process not spawned.
    #[default]
    Unstarted,
    /// The process has been spawned and has not been reaped.
    Running,
    /// The process exited with the given code.
    ///
    /// Processes killed by a signal report `128 + signal`.
    Finished(i32),
}

impl JobStatus {
    /// Check if transition to target status is valid.
    ///
    /// Valid transitions:
    /// - Unstarted -> Running
    /// - Running -> Finished
    pub fn can_transition_to(&self, target: JobStatus) -> bool {
        use JobStatus::*;
        matches!((*self, target), (Unstarted, Running) | (Running, Finished(_)))
    }

    /// Attempt to transition to a new status.
    pub fn transition_to(&mut self, target: JobStatus) -> crate::Result<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(crate::error::PoshError::InvalidTransition {
                from: *self,
                to: target,
            })
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, JobStatus::Running)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Finished(_))
    }

    /// Exit code, once finished.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            JobStatus::Finished(code) => Some(*code),
            _ => None,
        }
    }

    /// Short lowercase name: `unstarted`, `running` or `finished`.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Unstarted => "unstarted",
            JobStatus::Running => "running",
            JobStatus::Finished(_) => "finished",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
