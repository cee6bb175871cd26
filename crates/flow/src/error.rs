//! Flow lifecycle errors

use kairos_bus::WorkerError;
use kairos_core::EventName;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("no trigger mapping for event {0}")]
    UnmappedTrigger(EventName),

    #[error("terminal event {0} did not carry a plan batch")]
    MalformedTerminal(EventName),
}

impl From<FlowError> for WorkerError {
    fn from(err: FlowError) -> Self {
        WorkerError::new(err)
    }
}
