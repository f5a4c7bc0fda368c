/*!
Progressive block statistics ("blocking") for correlated Monte Carlo samples.

Raw samples out of a Markov chain are autocorrelated, so their naive standard
error is too optimistic. Blocking absorbs the autocorrelation: the chain is
cut into contiguous blocks, each block's mean is treated as one approximately
independent observation, and the standard error of the mean is computed over
the block means. [`BlockMean`] accumulates those block means progressively;
[`BlockVariance`] composes the same recursion to estimate a variable's
variance with uncertainty. [`average`] is the one-shot, non-progressive
counterpart.

A deliberate convention, shared by all estimators here: after a *single*
block the reported uncertainty is exactly zero, since no variance over block
means is estimable from one observation. Callers must treat the first block's
uncertainty as "not yet available" rather than "converged".

# Examples

```rust
use metrop::estimators::BlockMean;

let mut estimator = BlockMean::new();
let (mean, err) = estimator.push(&[0.1f64, 0.2, 0.3, 0.4])?;
assert!((mean - 0.25).abs() < 1e-12);
assert_eq!(err, 0.0);
let (mean, _) = estimator.push(&[0.2, 0.3, 0.2, 0.3])?;
assert!((mean - 0.25).abs() < 1e-12);
# Ok::<(), metrop::error::Error>(())
```
*/

use num_traits::Float;

use crate::error::Error;

/// One-shot sample mean with its direct standard error
/// `sqrt((<x^2> - <x>^2) / (N - 1))`.
///
/// An empty sample yields `(0, 0)`; a single sample yields `(x, 0)` (the
/// `N - 1` division is branch-guarded, matching the single-block convention).
pub fn average<T: Float>(sample: &[T]) -> (T, T) {
    let n = sample.len();
    if n == 0 {
        return (T::zero(), T::zero());
    }
    let nf = T::from(n).unwrap();
    let sum = sample.iter().fold(T::zero(), |acc, &x| acc + x);
    let mean = sum / nf;
    if n == 1 {
        return (mean, T::zero());
    }
    let sum_sq = sample.iter().fold(T::zero(), |acc, &x| acc + x * x);
    let variance = (sum_sq / nf - mean * mean) / T::from(n - 1).unwrap();
    (mean, variance.sqrt())
}

/// Progressive block-mean estimator.
///
/// Each [`push`](BlockMean::push) consumes one block of raw samples and
/// returns the cumulative `(mean, standard error)` over *all* blocks seen
/// since creation or the last [`reset`](BlockMean::reset). With block means
/// `A_k`, running sums `S = sum A_k`, `S2 = sum A_k^2` and block count `n`,
/// the estimate is `S/n` and the uncertainty
/// `sqrt((S2/n - (S/n)^2) / (n - 1))` for `n > 1`, zero for `n == 1`.
///
/// One estimator instance belongs to one estimation run; it is never shared.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockMean<T> {
    n_blocks: usize,
    running_sum: T,
    running_sum_sq: T,
}

impl<T: Float> Default for BlockMean<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Float> BlockMean<T> {
    pub fn new() -> Self {
        Self {
            n_blocks: 0,
            running_sum: T::zero(),
            running_sum_sq: T::zero(),
        }
    }

    /// Consumes one block and returns the cumulative `(mean, standard error)`.
    ///
    /// Errors with [`Error::EmptyBlock`] when the block holds no samples.
    pub fn push(&mut self, block: &[T]) -> Result<(T, T), Error> {
        let (_, estimate, uncertainty) = self.push_detailed(block)?;
        Ok((estimate, uncertainty))
    }

    /// Like [`push`](BlockMean::push), but also reports the current block's own
    /// mean, for convergence traces.
    pub fn push_detailed(&mut self, block: &[T]) -> Result<(T, T, T), Error> {
        if block.is_empty() {
            return Err(Error::EmptyBlock);
        }
        self.n_blocks += 1;
        let sum = block.iter().fold(T::zero(), |acc, &x| acc + x);
        let block_mean = sum / T::from(block.len()).unwrap();
        self.running_sum = self.running_sum + block_mean;
        self.running_sum_sq = self.running_sum_sq + block_mean * block_mean;

        let nf = T::from(self.n_blocks).unwrap();
        let estimate = self.running_sum / nf;
        if self.n_blocks == 1 {
            return Ok((block_mean, estimate, T::zero()));
        }
        let square_estimate = self.running_sum_sq / nf;
        let estimator_variance =
            (square_estimate - estimate * estimate) / T::from(self.n_blocks - 1).unwrap();
        Ok((block_mean, estimate, estimator_variance.sqrt()))
    }

    /// Number of blocks consumed so far.
    pub fn blocks(&self) -> usize {
        self.n_blocks
    }

    /// Discards all accumulated blocks, starting a fresh estimation run.
    pub fn reset(&mut self) {
        self.n_blocks = 0;
        self.running_sum = T::zero();
        self.running_sum_sq = T::zero();
    }
}

/// Progressive block estimator of a variable's variance.
///
/// Two passes per block: first the running mean over block means is updated,
/// then the squared deviations `(x - running_mean)^2` of the block's raw
/// samples are fed into a nested [`BlockMean`]. The returned pair follows the
/// same cumulative `(estimate, uncertainty)` contract.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockVariance<T> {
    n_blocks: usize,
    running_mean_sum: T,
    inner: BlockMean<T>,
    deviations_sq: Vec<T>,
}

impl<T: Float> Default for BlockVariance<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Float> BlockVariance<T> {
    pub fn new() -> Self {
        Self {
            n_blocks: 0,
            running_mean_sum: T::zero(),
            inner: BlockMean::new(),
            deviations_sq: Vec::new(),
        }
    }

    /// Consumes one block and returns the cumulative variance estimate with
    /// uncertainty.
    ///
    /// Errors with [`Error::EmptyBlock`] when the block holds no samples.
    pub fn push(&mut self, block: &[T]) -> Result<(T, T), Error> {
        if block.is_empty() {
            return Err(Error::EmptyBlock);
        }
        self.n_blocks += 1;
        let sum = block.iter().fold(T::zero(), |acc, &x| acc + x);
        let block_mean = sum / T::from(block.len()).unwrap();
        self.running_mean_sum = self.running_mean_sum + block_mean;
        let mean_estimate = self.running_mean_sum / T::from(self.n_blocks).unwrap();

        self.deviations_sq.clear();
        self.deviations_sq.extend(block.iter().map(|&x| {
            let s = x - mean_estimate;
            s * s
        }));
        self.inner.push(&self.deviations_sq)
    }

    /// Number of blocks consumed so far.
    pub fn blocks(&self) -> usize {
        self.n_blocks
    }

    /// Discards all accumulated blocks, starting a fresh estimation run.
    pub fn reset(&mut self) {
        self.n_blocks = 0;
        self.running_mean_sum = T::zero();
        self.inner.reset();
    }
}
