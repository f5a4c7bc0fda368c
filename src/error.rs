//! Crate error type covering precondition violations.
//!
//! Numeric edge cases (a single block's zero uncertainty, `-inf`
//! log-probabilities for out-of-support proposals) are designed behavior and
//! never reported here; see the module docs of [`crate::estimators`] and
//! [`crate::metropolis`].

use thiserror::Error;

/// Errors raised when a caller violates a documented precondition.
///
/// These are programmer/configuration errors detected at the first offending
/// call. The library never silently corrects them and never attempts partial
/// recovery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// An estimator was fed a block with no samples.
    #[error("estimator received an empty block; blocks must contain at least one sample")]
    EmptyBlock,

    /// A block estimate was requested with no blocks or empty blocks.
    #[error("block estimation needs n_blocks >= 1 and block_size >= 1, got n_blocks={n_blocks}, block_size={block_size}")]
    NoBlocks { n_blocks: usize, block_size: usize },

    /// The estimate and uncertainty output slices of a trace have different lengths.
    #[error("trace outputs disagree: {estimates} estimate slots vs {uncertainties} uncertainty slots")]
    TraceShape {
        estimates: usize,
        uncertainties: usize,
    },

    /// The sample range of a trace cannot be split into equally sized blocks.
    #[error("{n_states} states cannot be split into {n_blocks} equally sized blocks")]
    NotDivisible { n_states: usize, n_blocks: usize },

    /// A logarithmic temperature schedule was built with fewer than one step.
    #[error("a logarithmic schedule needs at least one step")]
    ScheduleTooShort,
}
