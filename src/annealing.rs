/*!
Simulated annealing over a noisy loss function.

[`SimulatedAnnealing`] composes the stochastic Metropolis sampler
([`StochasticMetropolis`](crate::metropolis::StochasticMetropolis)) with a
decreasing temperature [`Schedule`] to minimize an expensive, noisy loss over
a parameter space. At temperature `T` the sampler targets `-loss(p) / T`, the
Boltzmann weight with the loss in the role of energy: lower loss is more
probable, and the temperature controls how freely the walk climbs uphill.

Because the target is noisy and rarely revisited, the loss is re-evaluated
for both the current and the candidate point at every proposal; no value is
cached across steps. The trajectory reports the *unnormalized* energy and
uncertainty, recovered by multiplying the sampler's log-probability pair by
`-T`.

# Examples

```rust
use metrop::annealing::{LogSchedule, Schedule};

let schedule = LogSchedule::new(10.0f64, 0.01, 10)?;
assert_eq!(schedule.value(0), 10.0);
assert!(!schedule.end(9));
assert!(schedule.end(10));
# Ok::<(), metrop::error::Error>(())
```
*/

use num_traits::Float;
use rand::distributions::{Distribution, Standard};
use rand::Rng;

use crate::distributions::StochasticTarget;
use crate::error::Error;
use crate::metropolis::StochasticMetropolis;
use crate::transitions::Transition;

/// A temperature schedule: the exploration loop runs one stage per `step`
/// until [`end`](Schedule::end) turns true, which is the sole termination
/// condition.
pub trait Schedule<T> {
    /// Temperature at the given schedule step.
    fn value(&self, step: usize) -> T;

    /// Whether the schedule is exhausted at the given step.
    fn end(&self, step: usize) -> bool;
}

/// Linear ramp `start + (end - start) * step / n_steps`. Expects
/// `n_steps >= 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearSchedule<T> {
    start: T,
    delta: T,
    n_steps: usize,
}

impl<T: Float> LinearSchedule<T> {
    pub fn new(start: T, end: T, n_steps: usize) -> Self {
        Self {
            start,
            delta: end - start,
            n_steps,
        }
    }
}

impl<T: Float> Schedule<T> for LinearSchedule<T> {
    fn value(&self, step: usize) -> T {
        self.start + self.delta * T::from(step).unwrap() / T::from(self.n_steps).unwrap()
    }

    fn end(&self, step: usize) -> bool {
        step >= self.n_steps
    }
}

/// Geometric decay `start * (end / start)^(step / (n_steps - 1))`, reaching
/// `end` exactly at the last stage. Requires `n_steps >= 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogSchedule<T> {
    start: T,
    ratio: T,
    last_step: T,
    n_steps: usize,
}

impl<T: Float> LogSchedule<T> {
    pub fn new(start: T, end: T, n_steps: usize) -> Result<Self, Error> {
        if n_steps < 1 {
            return Err(Error::ScheduleTooShort);
        }
        Ok(Self {
            start,
            ratio: end / start,
            last_step: T::from(n_steps - 1).unwrap(),
            n_steps,
        })
    }
}

impl<T: Float> Schedule<T> for LogSchedule<T> {
    fn value(&self, step: usize) -> T {
        if step == 0 {
            return self.start;
        }
        self.start * self.ratio.powf(T::from(step).unwrap() / self.last_step)
    }

    fn end(&self, step: usize) -> bool {
        step >= self.n_steps
    }
}

/// A noisy objective over the parameter space `P`: evaluation returns the
/// loss estimate together with its statistical uncertainty.
pub trait StochasticLoss<P, T> {
    fn evaluate(&mut self, params: &P) -> (T, T);
}

/// One trajectory entry: the parameter point after an exploration step, the
/// energy (loss) estimate retained for it, the estimate's uncertainty and the
/// stage temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnealStep<P, T> {
    pub params: P,
    pub energy: T,
    pub uncertainty: T,
    pub temperature: T,
}

/// Boltzmann log-weight of a loss at fixed temperature: `-loss / T`, with the
/// uncertainty scaled the same way.
struct Boltzmann<'a, L, T> {
    temperature: T,
    loss: &'a mut L,
}

impl<P, T, L> StochasticTarget<P, T> for Boltzmann<'_, L, T>
where
    T: Float,
    L: StochasticLoss<P, T>,
{
    fn logp(&mut self, params: &P) -> (T, T) {
        let (loss, uncert) = self.loss.evaluate(params);
        (-loss / self.temperature, -uncert / self.temperature)
    }
}

/// Simulated annealing driver over a [`StochasticLoss`] and a proposal
/// kernel on the parameter space.
#[derive(Debug, Clone)]
pub struct SimulatedAnnealing<L, Q> {
    loss: L,
    proposal: Q,
}

impl<L, Q> SimulatedAnnealing<L, Q> {
    pub fn new(loss: L, proposal: Q) -> Self {
        Self { loss, proposal }
    }

    /// Runs the anneal: emits the initial point as entry 0 at the schedule's
    /// initial temperature, then, for each schedule stage, fixes the
    /// temperature, runs `explore_steps` stochastic Metropolis steps with
    /// target `-loss / T` starting from the last retained point, and appends
    /// one entry per step. The trajectory therefore holds
    /// `n_stages * explore_steps + 1` entries.
    pub fn anneal<P, T, Sch, R>(
        &mut self,
        p0: P,
        explore_steps: usize,
        schedule: &Sch,
        rng: &mut R,
    ) -> Vec<AnnealStep<P, T>>
    where
        P: Clone,
        T: Float,
        L: StochasticLoss<P, T>,
        Q: Transition<P, T>,
        Sch: Schedule<T>,
        R: Rng,
        Standard: Distribution<T>,
    {
        let mut trajectory = Vec::new();
        let (energy, uncertainty) = self.loss.evaluate(&p0);
        trajectory.push(AnnealStep {
            params: p0.clone(),
            energy,
            uncertainty,
            temperature: schedule.value(0),
        });

        let mut current = p0;
        let mut stage = 0;
        while !schedule.end(stage) {
            let temperature = schedule.value(stage);
            let target = Boltzmann {
                temperature,
                loss: &mut self.loss,
            };
            let mut sampler = StochasticMetropolis::new(current, target, &self.proposal);
            for _ in 0..explore_steps {
                let (_, params, logp, uncert) = sampler.step(rng);
                trajectory.push(AnnealStep {
                    params: params.clone(),
                    energy: -logp * temperature,
                    uncertainty: -uncert * temperature,
                    temperature,
                });
            }
            current = sampler.into_state();
            stage += 1;
        }
        trajectory
    }

    /// Gives the loss back, e.g. to inspect caches it may have built.
    pub fn into_loss(self) -> L {
        self.loss
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transitions::GaussNear;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use rand_distr::Normal;

    #[test]
    fn log_schedule_endpoints_and_termination() {
        let schedule = LogSchedule::new(10.0f64, 0.01, 10).unwrap();
        assert_eq!(schedule.value(0), 10.0);
        assert!((schedule.value(9) - 0.01).abs() < 1e-12);
        for step in 0..10 {
            assert!(!schedule.end(step));
        }
        assert!(schedule.end(10));
        assert!(schedule.end(11));
    }

    #[test]
    fn log_schedule_needs_at_least_one_step() {
        assert_eq!(
            LogSchedule::<f64>::new(10.0, 0.01, 0),
            Err(Error::ScheduleTooShort)
        );
        // A single-stage schedule stays at the start temperature.
        let degenerate = LogSchedule::new(2.0f64, 0.5, 1).unwrap();
        assert_eq!(degenerate.value(0), 2.0);
        assert!(degenerate.end(1));
    }

    #[test]
    fn linear_schedule_ramp() {
        let schedule = LinearSchedule::new(8.0f64, 0.0, 4);
        assert_eq!(schedule.value(0), 8.0);
        assert_eq!(schedule.value(2), 4.0);
        assert_eq!(schedule.value(4), 0.0);
        assert!(!schedule.end(3));
        assert!(schedule.end(4));
    }

    /// Quadratic bowl with Gaussian evaluation noise.
    struct NoisyQuadratic {
        center: f64,
        noise: f64,
        rng: SmallRng,
    }

    impl StochasticLoss<f64, f64> for NoisyQuadratic {
        fn evaluate(&mut self, params: &f64) -> (f64, f64) {
            let normal = Normal::new(0.0, self.noise).unwrap();
            let d = params - self.center;
            (d * d + normal.sample(&mut self.rng), self.noise)
        }
    }

    #[test]
    fn trajectory_has_one_entry_per_step_plus_initial() {
        let loss = NoisyQuadratic {
            center: 1.0,
            noise: 0.01,
            rng: SmallRng::seed_from_u64(7),
        };
        let mut sa = SimulatedAnnealing::new(loss, GaussNear::new(0.3f64));
        let schedule = LogSchedule::new(5.0f64, 0.05, 10).unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        let trajectory = sa.anneal(0.0f64, 7, &schedule, &mut rng);

        assert_eq!(trajectory.len(), 10 * 7 + 1);
        assert_eq!(trajectory[0].params, 0.0);
        assert_eq!(trajectory[0].temperature, 5.0);
        // Stage temperatures appear in decreasing order.
        let temps: Vec<f64> = trajectory[1..].iter().map(|e| e.temperature).collect();
        assert!(temps.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn anneal_descends_toward_the_minimum() {
        let loss = NoisyQuadratic {
            center: 3.0,
            noise: 0.01,
            rng: SmallRng::seed_from_u64(11),
        };
        let mut sa = SimulatedAnnealing::new(loss, GaussNear::new(0.5f64));
        let schedule = LogSchedule::new(2.0f64, 0.01, 50).unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        let trajectory = sa.anneal(0.0f64, 20, &schedule, &mut rng);

        let last = trajectory.last().unwrap();
        assert!(
            (last.params - 3.0).abs() < 0.5,
            "did not settle near the minimum: {}",
            last.params
        );
        // The recovered energy undoes the -1/T scaling: near the bottom it is
        // close to the noise floor, far above the initial energy is ~9.
        assert!(last.energy < trajectory[0].energy);

        let loss = sa.into_loss();
        assert_eq!(loss.center, 3.0);
    }

    #[test]
    fn trajectory_energy_is_recovered_in_loss_units() {
        // Noise-free loss: every reported energy must equal the loss at the
        // reported parameters.
        struct Exact;
        impl StochasticLoss<f64, f64> for Exact {
            fn evaluate(&mut self, params: &f64) -> (f64, f64) {
                ((params - 2.0) * (params - 2.0), 0.0)
            }
        }

        let mut sa = SimulatedAnnealing::new(Exact, GaussNear::new(0.4f64));
        let schedule = LinearSchedule::new(1.0f64, 0.1, 5);
        let mut rng = SmallRng::seed_from_u64(3);
        let trajectory: Vec<AnnealStep<f64, f64>> = sa.anneal(0.5f64, 4, &schedule, &mut rng);

        assert_eq!(trajectory.len(), 5 * 4 + 1);
        for entry in &trajectory {
            let expected = (entry.params - 2.0) * (entry.params - 2.0);
            assert!((entry.energy - expected).abs() < 1e-9);
            assert_eq!(entry.uncertainty, 0.0);
        }
    }
}
