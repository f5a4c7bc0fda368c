/*!
Metropolis-Hastings samplers.

[`Metropolis`] is the ordinary sampler: the current state's log-probability is
cached, so an expensive target is evaluated once per proposal. When the
proposal kernel declares itself symmetric (see
[`Transition::SYMMETRIC`](crate::transitions::Transition::SYMMETRIC)) the
acceptance ratio reduces to `logp(candidate) - logp(current)`; otherwise the
full proposal-corrected ratio is used. The branch is a compile-time constant
of the kernel type, decided per instantiation rather than per step.

[`StochasticMetropolis`] drives a *noisy* target
([`StochasticTarget`](crate::distributions::StochasticTarget)) whose
evaluation is re-sampled on every call. Nothing is cached: both the current
and the candidate log-probabilities are recomputed at every step, and the
retained state's `(log-probability, uncertainty)` pair is reported so callers
can track estimator noise along the trajectory. Simulated annealing
([`crate::annealing`]) is its main consumer.

Out-of-support candidates need no special casing anywhere: a `-inf` candidate
log-probability makes the ratio `-inf`, `exp` underflows to `0` and the draw
`U(0,1) < 0` always rejects. This is the intended mechanism for hard domain
constraints.

# Examples

```rust
use metrop::distributions::IsotropicGaussian;
use metrop::metropolis::Metropolis;
use metrop::transitions::GaussNear;
use rand::{rngs::SmallRng, SeedableRng};

let mut rng = SmallRng::seed_from_u64(42);
let mut sampler = Metropolis::new(vec![0.0f64, 0.0], IsotropicGaussian::new(1.0), GaussNear::new(0.5));
sampler.warmup(500, &mut rng);
let mut draws = vec![vec![0.0f64; 2]; 100];
let rate = sampler.sample(&mut draws, &mut rng);
assert!(rate > 0.0 && rate <= 1.0);
```
*/

use num_traits::Float;
use rand::distributions::{Distribution, Standard};
use rand::Rng;
use std::marker::PhantomData;

use crate::distributions::{StochasticTarget, Target};
use crate::transitions::Transition;

/// Metropolis-Hastings sampler with a cached state log-probability.
///
/// # Type Parameters
/// - `S`: the state space (anything the kernel can perturb).
/// - `T`: the floating-point probability field (`f32` or `f64`).
/// - `D`: the target distribution, a [`Target`].
/// - `Q`: the proposal kernel, a [`Transition`].
#[derive(Debug, Clone)]
pub struct Metropolis<S, T, D, Q> {
    target: D,
    proposal: Q,
    state: S,
    state_logp: T,
    accepted: usize,
    processed: usize,
}

impl<S, T, D, Q> Metropolis<S, T, D, Q>
where
    S: Clone,
    T: Float,
    D: Target<S, T>,
    Q: Transition<S, T>,
    Standard: Distribution<T>,
{
    /// Builds a sampler starting at `start`; the target's log-probability at
    /// `start` is evaluated once and cached.
    pub fn new(start: S, target: D, proposal: Q) -> Self {
        let state_logp = target.logp(&start);
        Self {
            target,
            proposal,
            state: start,
            state_logp,
            accepted: 0,
            processed: 0,
        }
    }

    fn log_accept_ratio(&self, candidate: &S, candidate_logp: T) -> T {
        if Q::SYMMETRIC {
            candidate_logp - self.state_logp
        } else {
            candidate_logp + self.proposal.logp(&self.state, candidate)
                - self.state_logp
                - self.proposal.logp(candidate, &self.state)
        }
    }

    /// Performs one Metropolis step and returns `(accepted, state after the
    /// step)`. Warm-up, plain sampling and transformed sampling all reduce to
    /// this one operation.
    pub fn step<R: Rng>(&mut self, rng: &mut R) -> (bool, &S) {
        let (accepted, _) = self.advance(rng);
        (accepted, &self.state)
    }

    /// Like [`step`](Metropolis::step), additionally reporting the retained
    /// state's cached log-probability.
    pub fn step_with_logp<R: Rng>(&mut self, rng: &mut R) -> (bool, &S, T) {
        let (accepted, logp) = self.advance(rng);
        (accepted, &self.state, logp)
    }

    fn advance<R: Rng>(&mut self, rng: &mut R) -> (bool, T) {
        let candidate = self.proposal.sample(&self.state, rng);
        let candidate_logp = self.target.logp(&candidate);
        let log_ratio = self.log_accept_ratio(&candidate, candidate_logp);
        let accepted = rng.gen::<T>() < log_ratio.exp();
        if accepted {
            self.state = candidate;
            self.state_logp = candidate_logp;
        }
        (accepted, self.state_logp)
    }

    /// Performs `steps` plain steps whose results are discarded. Acceptance
    /// bookkeeping is untouched: warm-up steps are not recorded.
    pub fn warmup<R: Rng>(&mut self, steps: usize, rng: &mut R) {
        for _ in 0..steps {
            self.step(rng);
        }
    }

    /// Performs `out.len()` steps, writing the post-step state into each slot
    /// (the first slot already reflects one step taken from the state at
    /// entry). Updates the lifetime acceptance counters and returns the
    /// overall acceptance rate.
    pub fn sample<R: Rng>(&mut self, out: &mut [S], rng: &mut R) -> f64 {
        for slot in out.iter_mut() {
            let (accepted, state) = self.step(rng);
            slot.clone_from(state);
            if accepted {
                self.accepted += 1;
            }
        }
        self.processed += out.len();
        self.acceptance_rate()
    }

    /// Like [`sample`](Metropolis::sample), storing `f(&state)` instead of the
    /// full state. The transform is applied after the accept/reject decision.
    pub fn sample_map<U, F, R>(&mut self, out: &mut [U], mut f: F, rng: &mut R) -> f64
    where
        F: FnMut(&S) -> U,
        R: Rng,
    {
        for slot in out.iter_mut() {
            let (accepted, state) = self.step(rng);
            *slot = f(state);
            if accepted {
                self.accepted += 1;
            }
        }
        self.processed += out.len();
        self.acceptance_rate()
    }

    /// Ratio of accepted to processed steps over all batch sampling calls.
    pub fn acceptance_rate(&self) -> f64 {
        if self.processed == 0 {
            return 0.0;
        }
        self.accepted as f64 / self.processed as f64
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Cached log-probability of the current state.
    pub fn state_logp(&self) -> T {
        self.state_logp
    }

    pub fn accepted(&self) -> usize {
        self.accepted
    }

    pub fn processed(&self) -> usize {
        self.processed
    }
}

/// Metropolis-Hastings sampler over a stochastic (noisy) target.
///
/// No log-probability is ever cached: the target is re-evaluated for both the
/// current state and the candidate at every step, trading extra computation
/// for unbiased handling of the evaluation noise.
#[derive(Debug, Clone)]
pub struct StochasticMetropolis<S, T, L, Q> {
    loss: L,
    proposal: Q,
    state: S,
    accepted: usize,
    processed: usize,
    phantom: PhantomData<T>,
}

impl<S, T, L, Q> StochasticMetropolis<S, T, L, Q>
where
    S: Clone,
    T: Float,
    L: StochasticTarget<S, T>,
    Q: Transition<S, T>,
    Standard: Distribution<T>,
{
    pub fn new(start: S, loss: L, proposal: Q) -> Self {
        Self {
            loss,
            proposal,
            state: start,
            accepted: 0,
            processed: 0,
            phantom: PhantomData,
        }
    }

    /// One stochastic Metropolis step. Returns `(accepted, state after the
    /// step, its log-probability, the log-probability's uncertainty)`; the
    /// last two refer to whichever state was retained and come from this
    /// step's fresh evaluations.
    pub fn step<R: Rng>(&mut self, rng: &mut R) -> (bool, &S, T, T) {
        let candidate = self.proposal.sample(&self.state, rng);
        let (candidate_logp, candidate_uncert) = self.loss.logp(&candidate);
        let (mut state_logp, mut state_uncert) = self.loss.logp(&self.state);
        let log_ratio = if Q::SYMMETRIC {
            candidate_logp - state_logp
        } else {
            candidate_logp + self.proposal.logp(&self.state, &candidate)
                - state_logp
                - self.proposal.logp(&candidate, &self.state)
        };
        let accepted = rng.gen::<T>() < log_ratio.exp();
        if accepted {
            self.state = candidate;
            state_logp = candidate_logp;
            state_uncert = candidate_uncert;
            self.accepted += 1;
        }
        self.processed += 1;
        (accepted, &self.state, state_logp, state_uncert)
    }

    /// Performs `steps` discarded steps.
    pub fn warmup<R: Rng>(&mut self, steps: usize, rng: &mut R) {
        for _ in 0..steps {
            self.step(rng);
        }
    }

    /// Ratio of accepted to processed steps over the sampler's lifetime.
    pub fn acceptance_rate(&self) -> f64 {
        if self.processed == 0 {
            return 0.0;
        }
        self.accepted as f64 / self.processed as f64
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Consumes the sampler, yielding the last retained state.
    pub fn into_state(self) -> S {
        self.state
    }
}
