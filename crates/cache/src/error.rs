//! Strategy cache errors

use kairos_core::{RunAnchor, StrategyId, WorkerId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("no active run for strategy {strategy_id}")]
    NoActiveRun { strategy_id: StrategyId },

    #[error(
        "run already active for strategy {strategy_id}: active={active}, incoming={incoming}"
    )]
    RunAlreadyActive {
        strategy_id: StrategyId,
        active: RunAnchor,
        incoming: RunAnchor,
    },

    #[error("missing dependency for worker {consumer}: {dto}")]
    MissingDependency { consumer: WorkerId, dto: String },

    #[error("worker {0} has no registered capabilities")]
    UnknownWorker(WorkerId),
}

pub type Result<T> = std::result::Result<T, CacheError>;
