/*!
Proposal kernels for Metropolis-type samplers.

A [`Transition`] draws a candidate point conditioned on the current one and
evaluates the log-density of that conditional draw. Kernels that are symmetric
(`logp(to, from) == logp(from, to)` for every pair) advertise it through the
associated [`Transition::SYMMETRIC`] constant, which lets the sampler skip the
reverse-proposal evaluation; the flag is resolved per instantiation, not per
step.

Three kernels are provided:

- [`UniformNear`]: adds an independent `U(-radius, radius)` offset to every
  coordinate.
- [`GaussNear`]: adds independent `N(0, stdev)` noise to every coordinate.
- [`Uniform`]: redraws every coordinate uniformly on `[a, b)`, ignoring the
  current point.

All kernels are generic over the state through the [`State`] trait, so the
same formulas apply to a scalar, a fixed-size array or a `Vec` of
coordinates.

# Examples

```rust
use metrop::transitions::{Transition, UniformNear};
use rand::{rngs::SmallRng, SeedableRng};

let mut rng = SmallRng::seed_from_u64(42);
let kernel = UniformNear::new(0.5);
let from = [0.0f64, 1.0];
let to = kernel.sample(&from, &mut rng);
assert!(kernel.logp(&to, &from).is_finite());
```
*/

use num_traits::Float;
use rand::distributions::uniform::SampleUniform;
use rand::distributions::{Distribution, Uniform as UniformDist};
use rand::Rng;
use rand_distr::{Normal, StandardNormal};
use std::f64::consts::PI;

/// A point a kernel can perturb: a scalar or a vector of coordinates over the
/// floating-point field `T`.
pub trait State<T>: Clone {
    /// Number of coordinates.
    fn dim(&self) -> usize;

    /// Builds a new point by applying `f` to every coordinate.
    fn map<F: FnMut(T) -> T>(&self, f: F) -> Self;

    /// Folds `f` over the coordinates of `self`.
    fn fold<B, F: FnMut(B, T) -> B>(&self, init: B, f: F) -> B;

    /// Folds `f` over paired coordinates of `self` and `other`.
    fn fold_with<B, F: FnMut(B, T, T) -> B>(&self, other: &Self, init: B, f: F) -> B;
}

impl<T: Float> State<T> for T {
    fn dim(&self) -> usize {
        1
    }

    fn map<F: FnMut(T) -> T>(&self, mut f: F) -> Self {
        f(*self)
    }

    fn fold<B, F: FnMut(B, T) -> B>(&self, init: B, mut f: F) -> B {
        f(init, *self)
    }

    fn fold_with<B, F: FnMut(B, T, T) -> B>(&self, other: &Self, init: B, mut f: F) -> B {
        f(init, *self, *other)
    }
}

impl<T: Float, const N: usize> State<T> for [T; N] {
    fn dim(&self) -> usize {
        N
    }

    fn map<F: FnMut(T) -> T>(&self, mut f: F) -> Self {
        let mut out = *self;
        for x in out.iter_mut() {
            *x = f(*x);
        }
        out
    }

    fn fold<B, F: FnMut(B, T) -> B>(&self, init: B, mut f: F) -> B {
        let mut acc = init;
        for &x in self.iter() {
            acc = f(acc, x);
        }
        acc
    }

    fn fold_with<B, F: FnMut(B, T, T) -> B>(&self, other: &Self, init: B, mut f: F) -> B {
        let mut acc = init;
        for (&a, &b) in self.iter().zip(other.iter()) {
            acc = f(acc, a, b);
        }
        acc
    }
}

impl<T: Float> State<T> for Vec<T> {
    fn dim(&self) -> usize {
        self.len()
    }

    fn map<F: FnMut(T) -> T>(&self, mut f: F) -> Self {
        self.iter().map(|&x| f(x)).collect()
    }

    fn fold<B, F: FnMut(B, T) -> B>(&self, init: B, mut f: F) -> B {
        let mut acc = init;
        for &x in self.iter() {
            acc = f(acc, x);
        }
        acc
    }

    fn fold_with<B, F: FnMut(B, T, T) -> B>(&self, other: &Self, init: B, mut f: F) -> B {
        let mut acc = init;
        for (&a, &b) in self.iter().zip(other.iter()) {
            acc = f(acc, a, b);
        }
        acc
    }
}

/// A conditional proposal distribution over the state space `S`.
///
/// `sample` must be drawable from every state that can occur; `logp` must be
/// finite wherever `sample` can land and `-inf` elsewhere, which defines the
/// proposal's support.
pub trait Transition<S, T: Float> {
    /// Whether the forward and reverse conditional densities always coincide.
    ///
    /// Symmetric kernels let the Metropolis ratio omit the proposal-density
    /// correction term.
    const SYMMETRIC: bool;

    /// Draws a candidate conditioned on `from`.
    fn sample<R: Rng>(&self, from: &S, rng: &mut R) -> S;

    /// Log-density of drawing `to` conditioned on `from`.
    fn logp(&self, to: &S, from: &S) -> T;
}

impl<S, T: Float, Q: Transition<S, T>> Transition<S, T> for &Q {
    const SYMMETRIC: bool = Q::SYMMETRIC;

    fn sample<R: Rng>(&self, from: &S, rng: &mut R) -> S {
        (**self).sample(from, rng)
    }

    fn logp(&self, to: &S, from: &S) -> T {
        (**self).logp(to, from)
    }
}

/// Symmetric kernel adding an independent `U(-radius, radius)` offset to each
/// coordinate.
///
/// `logp` is the constant `-d * ln(2 * radius)` when every coordinate
/// difference lies within `radius`, and `-inf` otherwise. `radius` must be
/// positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformNear<T> {
    radius: T,
}

impl<T: Float> UniformNear<T> {
    pub fn new(radius: T) -> Self {
        Self { radius }
    }
}

impl<S, T> Transition<S, T> for UniformNear<T>
where
    T: Float + SampleUniform,
    S: State<T>,
{
    const SYMMETRIC: bool = true;

    fn sample<R: Rng>(&self, from: &S, rng: &mut R) -> S {
        let offset = UniformDist::new(-self.radius, self.radius);
        from.map(|x| x + offset.sample(rng))
    }

    fn logp(&self, to: &S, from: &S) -> T {
        let inside = to.fold_with(from, true, |ok, t, f| ok && (t - f).abs() <= self.radius);
        if !inside {
            return T::neg_infinity();
        }
        -T::from(to.dim()).unwrap() * (self.radius + self.radius).ln()
    }
}

/// Symmetric kernel adding independent `N(0, stdev)` noise to each coordinate.
///
/// `logp` is the isotropic Gaussian log-density of the displacement. `stdev`
/// must be positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussNear<T> {
    stdev: T,
}

impl<T: Float> GaussNear<T> {
    pub fn new(stdev: T) -> Self {
        Self { stdev }
    }
}

impl<S, T> Transition<S, T> for GaussNear<T>
where
    T: Float,
    S: State<T>,
    StandardNormal: Distribution<T>,
{
    const SYMMETRIC: bool = true;

    fn sample<R: Rng>(&self, from: &S, rng: &mut R) -> S {
        let normal = Normal::new(T::zero(), self.stdev)
            .expect("Expecting creation of normal distribution to succeed.");
        from.map(|x| x + normal.sample(rng))
    }

    fn logp(&self, to: &S, from: &S) -> T {
        let half = T::from(0.5).unwrap();
        let two = T::from(2.0).unwrap();
        let sq_norm = to.fold_with(from, T::zero(), |acc, t, f| {
            let delta = t - f;
            acc + delta * delta
        });
        let prefix = -T::from(to.dim()).unwrap()
            * (half * (two * T::from(PI).unwrap()).ln() + self.stdev.ln());
        prefix - sq_norm / (two * self.stdev * self.stdev)
    }
}

/// Kernel redrawing each coordinate independently and uniformly on `[a, b)`,
/// ignoring the current point.
///
/// `logp` depends only on `to`: `-d * ln(b - a)` inside `[a, b]^d`, `-inf`
/// outside. The kernel is not symmetric in the two-argument sense, but its
/// independence from `from` makes the proposal terms cancel in the general
/// acceptance ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uniform<T> {
    a: T,
    b: T,
}

impl<T: Float> Uniform<T> {
    pub fn new(a: T, b: T) -> Self {
        Self { a, b }
    }
}

impl<S, T> Transition<S, T> for Uniform<T>
where
    T: Float + SampleUniform,
    S: State<T>,
{
    const SYMMETRIC: bool = false;

    fn sample<R: Rng>(&self, from: &S, rng: &mut R) -> S {
        let draw = UniformDist::new(self.a, self.b);
        from.map(|_| draw.sample(rng))
    }

    fn logp(&self, to: &S, _from: &S) -> T {
        let inside = to.fold(true, |ok, x| ok && x >= self.a && x <= self.b);
        if !inside {
            return T::neg_infinity();
        }
        -T::from(to.dim()).unwrap() * (self.b - self.a).ln()
    }
}
