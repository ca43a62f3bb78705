use fleet_core::EventId;
use fleet_dispatch::{DispatchError, ErrorBody};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid simulation configuration: {0}")]
    InvalidConfig(String),

    /// The requested lifecycle change is not allowed in the current state.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("simulation clock is stopped")]
    ClockStopped,

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("event {event} failed: {reason}")]
    EventProcessing {
        event:  EventId,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimError {
    /// HTTP-style status: 400 invalid config, 404 missing simulation,
    /// 409 lifecycle conflict, 500 anything else.
    pub fn status_code(&self) -> u16 {
        match self {
            SimError::InvalidConfig(_) => 400,
            SimError::NotFound(_) => 404,
            SimError::Conflict(_) | SimError::ClockStopped => 409,
            SimError::Dispatch(e) => e.status_code(),
            SimError::EventProcessing { .. } | SimError::Io(_) => 500,
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody { error: self.to_string() }
    }
}

pub type SimResult<T> = Result<T, SimError>;
