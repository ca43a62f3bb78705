use fleet_core::{RobotId, TaskId};
use serde::Serialize;
use thiserror::Error;

use crate::{RobotStatus, TaskStatus};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid dispatch configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown dispatch algorithm {0:?}")]
    UnknownAlgorithm(String),

    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    #[error("robot {0} not found")]
    RobotNotFound(RobotId),

    #[error("robot {0} is already registered")]
    DuplicateRobot(RobotId),

    #[error("task {task} cannot move from {from} to {to}")]
    InvalidTaskTransition {
        task: TaskId,
        from: TaskStatus,
        to:   TaskStatus,
    },

    #[error("robot {robot} cannot move from {from} to {to}")]
    InvalidRobotTransition {
        robot: RobotId,
        from:  RobotStatus,
        to:    RobotStatus,
    },

    /// The robot was claimed or became ineligible before the assignment
    /// could be applied.
    #[error("robot {0} is not available for assignment")]
    RobotUnavailable(RobotId),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatchError {
    /// HTTP-style status for the transport layer: 400 invalid input,
    /// 404 missing entity, 409 state conflict, 500 anything else.
    pub fn status_code(&self) -> u16 {
        match self {
            DispatchError::InvalidConfig(_) | DispatchError::UnknownAlgorithm(_) => 400,
            DispatchError::TaskNotFound(_) | DispatchError::RobotNotFound(_) => 404,
            DispatchError::DuplicateRobot(_)
            | DispatchError::InvalidTaskTransition { .. }
            | DispatchError::InvalidRobotTransition { .. }
            | DispatchError::RobotUnavailable(_) => 409,
            DispatchError::Io(_) => 500,
        }
    }

    /// The `{error: string}` payload.
    pub fn body(&self) -> ErrorBody {
        ErrorBody { error: self.to_string() }
    }
}

/// Serializable error payload returned to transport callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub type DispatchResult<T> = Result<T, DispatchError>;
