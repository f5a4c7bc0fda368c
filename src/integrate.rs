/*!
Monte Carlo integration over a Metropolis sampler.

An [`Integrator`] wraps a [`Metropolis`] sampler whose stationary density is
the weight function of the integral: with the chain distributed as `p`, the
plain sample average of `f(x)` estimates `∫ f(x) p(x) dx`. The integrand must
therefore be written against the *normalized* density the sampler targets.

Every operation reduces to "draw a block of states, map through `f`, reduce
with the block estimator":

- [`estimate`](Integrator::estimate): one block, one-shot mean with its direct
  standard error.
- [`estimate_blocks`](Integrator::estimate_blocks): cumulative progressive
  estimate over a fixed number of blocks.
- [`estimate_trace`](Integrator::estimate_trace): one cumulative pair per
  block, for convergence plots.
- [`integrate_to`](Integrator::integrate_to): keeps consuming blocks until a
  target uncertainty is reached.

The progressive estimator lives inside the integrator, so consecutive calls
continue one estimation run; use [`reset`](Integrator::reset) (or a fresh
integrator) to start over.

# Examples

```rust
use metrop::distributions::BoxUniform;
use metrop::integrate::Integrator;
use metrop::metropolis::Metropolis;
use metrop::transitions::UniformNear;
use rand::{rngs::SmallRng, SeedableRng};

let mut rng = SmallRng::seed_from_u64(42);
let sampler = Metropolis::new(0.5f64, BoxUniform::new(0.0, 1.0), UniformNear::new(0.4));
let mut integrator = Integrator::new(sampler);
integrator.sampler_mut().warmup(1_000, &mut rng);

// ∫ x^2 dx over [0, 1] = 1/3
let (estimate, uncertainty) = integrator.estimate_blocks(|x: &f64| x * x, 50, 200, &mut rng)?;
assert!((estimate - 1.0 / 3.0).abs() < 5.0 * uncertainty + 0.01);
# Ok::<(), metrop::error::Error>(())
```
*/

use num_traits::Float;
use rand::distributions::{Distribution, Standard};
use rand::Rng;

use crate::distributions::Target;
use crate::error::Error;
use crate::estimators::{average, BlockMean};
use crate::metropolis::Metropolis;
use crate::transitions::Transition;

/// Monte Carlo integrator over a [`Metropolis`] sampler.
#[derive(Debug, Clone)]
pub struct Integrator<S, T, D, Q> {
    sampler: Metropolis<S, T, D, Q>,
    estimator: BlockMean<T>,
}

impl<S, T, D, Q> Integrator<S, T, D, Q>
where
    S: Clone,
    T: Float,
    D: Target<S, T>,
    Q: Transition<S, T>,
    Standard: Distribution<T>,
{
    /// Wraps a sampler whose stationary distribution is the integral's weight
    /// function. Warm the sampler up beforehand, or through
    /// [`sampler_mut`](Integrator::sampler_mut).
    pub fn new(sampler: Metropolis<S, T, D, Q>) -> Self {
        Self {
            sampler,
            estimator: BlockMean::new(),
        }
    }

    /// One-shot estimate from a single block of `n_samples` draws: the plain
    /// sample mean with its direct standard error, bypassing the progressive
    /// estimator.
    pub fn estimate<F, R>(&mut self, mut f: F, n_samples: usize, rng: &mut R) -> (T, T)
    where
        F: FnMut(&S) -> T,
        R: Rng,
    {
        let mut ys = vec![T::zero(); n_samples];
        self.sampler.sample_map(&mut ys, &mut f, rng);
        average(&ys)
    }

    /// Progressive estimate over `n_blocks` blocks of `block_size` draws each;
    /// returns the cumulative `(estimate, uncertainty)` after the last block.
    ///
    /// Errors with [`Error::NoBlocks`] when either count is zero.
    pub fn estimate_blocks<F, R>(
        &mut self,
        mut f: F,
        n_blocks: usize,
        block_size: usize,
        rng: &mut R,
    ) -> Result<(T, T), Error>
    where
        F: FnMut(&S) -> T,
        R: Rng,
    {
        if n_blocks == 0 || block_size == 0 {
            return Err(Error::NoBlocks {
                n_blocks,
                block_size,
            });
        }
        let mut ys = vec![T::zero(); block_size];
        let mut result = (T::zero(), T::zero());
        for _ in 0..n_blocks {
            self.sampler.sample_map(&mut ys, &mut f, rng);
            result = self.estimator.push(&ys)?;
        }
        Ok(result)
    }

    /// Per-block convergence trace: fills `states` with the sampled chain and
    /// writes one cumulative `(estimate, uncertainty)` pair per block into the
    /// output slices. The block size is `states.len() / estimates.len()`.
    ///
    /// Errors with [`Error::TraceShape`] when the two output slices disagree
    /// and with [`Error::NotDivisible`] when the states cannot be split into
    /// `estimates.len()` equal blocks; sizes are never silently truncated.
    pub fn estimate_trace<F, R>(
        &mut self,
        mut f: F,
        estimates: &mut [T],
        uncertainties: &mut [T],
        states: &mut [S],
        rng: &mut R,
    ) -> Result<(), Error>
    where
        F: FnMut(&S) -> T,
        R: Rng,
    {
        let n_blocks = estimates.len();
        if uncertainties.len() != n_blocks {
            return Err(Error::TraceShape {
                estimates: n_blocks,
                uncertainties: uncertainties.len(),
            });
        }
        if n_blocks == 0 || states.len() % n_blocks != 0 {
            return Err(Error::NotDivisible {
                n_states: states.len(),
                n_blocks,
            });
        }
        let block_size = states.len() / n_blocks;
        if block_size == 0 {
            return Err(Error::NoBlocks {
                n_blocks,
                block_size,
            });
        }
        let mut ys = vec![T::zero(); block_size];
        let outputs = estimates.iter_mut().zip(uncertainties.iter_mut());
        for (chunk, (estimate, uncertainty)) in states.chunks_exact_mut(block_size).zip(outputs) {
            self.sampler.sample(chunk, rng);
            for (y, x) in ys.iter_mut().zip(chunk.iter()) {
                *y = f(x);
            }
            let (m, s) = self.estimator.push(&ys)?;
            *estimate = m;
            *uncertainty = s;
        }
        Ok(())
    }

    /// Consumes blocks of `block_size` draws until the cumulative uncertainty
    /// drops to `target_uncertainty` or below; returns the final
    /// `((estimate, uncertainty), blocks consumed)`.
    ///
    /// A priming block always runs before the threshold is first checked: the
    /// first block's uncertainty is zero by convention, so a tight threshold
    /// cannot short-circuit with no data. There is no internal iteration cap;
    /// an unreachable target makes this loop forever (callers wanting bounded
    /// runtime must wrap it).
    pub fn integrate_to<F, R>(
        &mut self,
        mut f: F,
        target_uncertainty: T,
        block_size: usize,
        rng: &mut R,
    ) -> Result<((T, T), usize), Error>
    where
        F: FnMut(&S) -> T,
        R: Rng,
    {
        if block_size == 0 {
            return Err(Error::NoBlocks {
                n_blocks: 1,
                block_size,
            });
        }
        let mut ys = vec![T::zero(); block_size];
        self.sampler.sample_map(&mut ys, &mut f, rng);
        self.estimator.push(&ys)?;
        let mut n_blocks = 1;
        loop {
            self.sampler.sample_map(&mut ys, &mut f, rng);
            let result = self.estimator.push(&ys)?;
            n_blocks += 1;
            if result.1 <= target_uncertainty {
                return Ok((result, n_blocks));
            }
        }
    }

    /// Discards the progressive estimator's history, starting a fresh
    /// estimation run with the same sampler.
    pub fn reset(&mut self) {
        self.estimator.reset();
    }

    pub fn sampler(&self) -> &Metropolis<S, T, D, Q> {
        &self.sampler
    }

    pub fn sampler_mut(&mut self) -> &mut Metropolis<S, T, D, Q> {
        &mut self.sampler
    }

    /// Consumes the integrator, yielding the sampler back.
    pub fn into_sampler(self) -> Metropolis<S, T, D, Q> {
        self.sampler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::BoxUniform;
    use crate::transitions::UniformNear;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn unit_uniform_integrator() -> Integrator<f64, f64, BoxUniform<f64>, UniformNear<f64>> {
        let sampler = Metropolis::new(0.5f64, BoxUniform::new(0.0, 1.0), UniformNear::new(0.4));
        Integrator::new(sampler)
    }

    #[test]
    fn constant_integrand_over_uniform_sampler() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut integrator = unit_uniform_integrator();
        integrator.sampler_mut().warmup(10_000, &mut rng);
        let (estimate, uncertainty) = integrator
            .estimate_blocks(|_: &f64| 1.0, 1_000, 10, &mut rng)
            .unwrap();
        assert!((estimate - 1.0).abs() < 1e-12);
        assert!(uncertainty.abs() < 1e-12);
    }

    #[test]
    fn one_shot_estimate_of_a_constant() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut integrator = unit_uniform_integrator();
        let (estimate, uncertainty) = integrator.estimate(|_: &f64| 2.5, 100, &mut rng);
        assert!((estimate - 2.5).abs() < 1e-12);
        assert!(uncertainty.abs() < 1e-9);
    }

    #[test]
    fn integrate_to_reaches_the_target() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut integrator = unit_uniform_integrator();
        integrator.sampler_mut().warmup(1_000, &mut rng);
        let ((estimate, uncertainty), n_blocks) = integrator
            .integrate_to(|x: &f64| *x, 0.001, 500, &mut rng)
            .unwrap();
        assert!(uncertainty <= 0.001);
        assert!((estimate - 0.5).abs() < 0.01, "estimate off: {estimate}");
        assert!(n_blocks >= 2);
    }

    #[test]
    fn trace_reports_cumulative_pairs_per_block() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut integrator = unit_uniform_integrator();
        integrator.sampler_mut().warmup(1_000, &mut rng);

        let mut estimates = vec![0.0f64; 20];
        let mut uncertainties = vec![-1.0f64; 20];
        let mut states = vec![0.0f64; 20 * 50];
        integrator
            .estimate_trace(
                |x: &f64| *x,
                &mut estimates,
                &mut uncertainties,
                &mut states,
                &mut rng,
            )
            .unwrap();

        // First block's uncertainty is the documented zero; later ones are
        // proper standard errors.
        assert_eq!(uncertainties[0], 0.0);
        assert!(uncertainties[1..].iter().all(|&u| u >= 0.0));
        assert!((estimates[19] - 0.5).abs() < 0.05);
        assert!(states.iter().all(|x| (0.0..=1.0).contains(x)));
    }

    #[test]
    fn trace_shape_violations_are_reported() {
        let mut rng = SmallRng::seed_from_u64(0);
        let mut integrator = unit_uniform_integrator();

        let mut estimates = vec![0.0f64; 4];
        let mut uncertainties = vec![0.0f64; 3];
        let mut states = vec![0.0f64; 40];
        assert_eq!(
            integrator.estimate_trace(
                |x: &f64| *x,
                &mut estimates,
                &mut uncertainties,
                &mut states,
                &mut rng,
            ),
            Err(Error::TraceShape {
                estimates: 4,
                uncertainties: 3
            })
        );

        let mut uncertainties = vec![0.0f64; 4];
        let mut states = vec![0.0f64; 41];
        assert_eq!(
            integrator.estimate_trace(
                |x: &f64| *x,
                &mut estimates,
                &mut uncertainties,
                &mut states,
                &mut rng,
            ),
            Err(Error::NotDivisible {
                n_states: 41,
                n_blocks: 4
            })
        );
    }

    #[test]
    fn reset_starts_a_new_estimation_run() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut integrator = unit_uniform_integrator();
        integrator
            .estimate_blocks(|x: &f64| *x, 5, 20, &mut rng)
            .unwrap();
        integrator.reset();

        // After a reset the next block is the first of a fresh run, so its
        // cumulative uncertainty is zero again.
        let (_, uncertainty) = integrator
            .estimate_blocks(|x: &f64| *x, 1, 20, &mut rng)
            .unwrap();
        assert_eq!(uncertainty, 0.0);

        // The sampler's history is kept across resets.
        assert_eq!(integrator.sampler().processed(), 120);
        let sampler = integrator.into_sampler();
        assert_eq!(sampler.processed(), 120);
    }

    #[test]
    fn zero_blocks_is_an_error() {
        let mut rng = SmallRng::seed_from_u64(0);
        let mut integrator = unit_uniform_integrator();
        assert_eq!(
            integrator.estimate_blocks(|x: &f64| *x, 0, 10, &mut rng),
            Err(Error::NoBlocks {
                n_blocks: 0,
                block_size: 10
            })
        );
        assert_eq!(
            integrator.estimate_blocks(|x: &f64| *x, 10, 0, &mut rng),
            Err(Error::NoBlocks {
                n_blocks: 10,
                block_size: 0
            })
        );
        assert_eq!(
            integrator.integrate_to(|x: &f64| *x, 0.1, 0, &mut rng),
            Err(Error::NoBlocks {
                n_blocks: 1,
                block_size: 0
            })
        );
    }
}
