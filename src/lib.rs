/*!
# metrop

A compact library for Metropolis Monte Carlo sampling with progressive
block-statistics estimation and simulated annealing.

The pieces compose around three capability traits: a
[`Target`](distributions::Target) (log of an unnormalized density), a
[`Transition`](transitions::Transition) (conditional proposal kernel, with a
compile-time symmetry flag) and a state space (anything `Clone` the kernel
can perturb; scalars, arrays and `Vec`s work out of the box through
[`State`](transitions::State)). A caller builds a
[`Metropolis`](metropolis::Metropolis) sampler from the three, optionally
warms it up, and then either drives it directly, hands it to an
[`Integrator`](integrate::Integrator) for block-averaged integral estimates,
or, in its stochastic-loss flavor, wraps it in
[`SimulatedAnnealing`](annealing::SimulatedAnnealing) for global
optimization under a temperature schedule.

Everything is single-threaded and synchronous; the random number generator is
one shared resource passed by mutable reference into every sampling call, so
runs are reproducible from a seed.

## Example

Estimating `∫ x^2 dx` over `[0, 1]` by sampling the uniform weight with a
Metropolis chain:

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

let (estimate, uncertainty) = integrator.estimate_blocks(|x: &f64| x * x, 100, 100, &mut rng)?;
assert!((estimate - 1.0 / 3.0).abs() < 5.0 * uncertainty + 0.01);
# Ok::<(), metrop::error::Error>(())
```
*/

pub mod annealing;
pub mod distributions;
pub mod error;
pub mod estimators;
pub mod integrate;
pub mod metropolis;
pub mod transitions;
