/*!
Target distributions for Metropolis-type samplers.

A [`Target`] exposes the logarithm of an unnormalized density over a state
space; a [`StochasticTarget`] exposes a *noisy* log-density estimate together
with its statistical uncertainty (for example when the density is itself a
nested Monte Carlo estimate). The distinction matters to the sampler: a plain
target's log-probability can be cached across steps, a stochastic one must be
re-evaluated every time (see [`crate::metropolis`]).

Two concrete targets are provided for experiments and tests:
[`BoxUniform`], whose `-inf` log-density outside `[a, b]^d` is the standard
mechanism for enforcing hard domain constraints, and the unnormalized
[`IsotropicGaussian`].

# Examples

```rust
use metrop::distributions::{BoxUniform, Target};

let target = BoxUniform::new(0.0f64, 1.0);
assert_eq!(target.logp(&0.5f64), 0.0);
assert_eq!(target.logp(&1.5f64), f64::NEG_INFINITY);
```
*/

use num_traits::Float;

use crate::transitions::State;

/// An unnormalized target density over the state space `S`.
pub trait Target<S, T: Float> {
    /// Log of the unnormalized density at `state`; `-inf` outside the support.
    fn logp(&self, state: &S) -> T;
}

impl<S, T: Float, D: Target<S, T> + ?Sized> Target<S, T> for &D {
    fn logp(&self, state: &S) -> T {
        (**self).logp(state)
    }
}

/// A target whose log-density evaluation is itself a noisy estimate.
///
/// Evaluation takes `&mut self` because it typically consumes randomness or
/// runs a nested estimation. Returns the estimate together with its
/// statistical uncertainty.
pub trait StochasticTarget<S, T: Float> {
    fn logp(&mut self, state: &S) -> (T, T);
}

impl<S, T: Float, L: StochasticTarget<S, T> + ?Sized> StochasticTarget<S, T> for &mut L {
    fn logp(&mut self, state: &S) -> (T, T) {
        (**self).logp(state)
    }
}

/// Uniform density on the box `[a, b]^d`: log-density `0` inside, `-inf`
/// outside.
///
/// Pairing this target with any proposal turns the `-inf` acceptance ratio
/// into a guaranteed rejection, keeping the chain inside the box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxUniform<T> {
    a: T,
    b: T,
}

impl<T: Float> BoxUniform<T> {
    pub fn new(a: T, b: T) -> Self {
        Self { a, b }
    }
}

impl<S, T> Target<S, T> for BoxUniform<T>
where
    T: Float,
    S: State<T>,
{
    fn logp(&self, state: &S) -> T {
        let inside = state.fold(true, |ok, x| ok && x >= self.a && x <= self.b);
        if inside {
            T::zero()
        } else {
            T::neg_infinity()
        }
    }
}

/// Unnormalized isotropic Gaussian centered at the origin:
/// `logp(x) = -|x|^2 / (2 * std^2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsotropicGaussian<T> {
    pub std: T,
}

impl<T: Float> IsotropicGaussian<T> {
    pub fn new(std: T) -> Self {
        Self { std }
    }
}

impl<S, T> Target<S, T> for IsotropicGaussian<T>
where
    T: Float,
    S: State<T>,
{
    fn logp(&self, state: &S) -> T {
        let sq_norm = state.fold(T::zero(), |acc, x| acc + x * x);
        -T::from(0.5).unwrap() * sq_norm / (self.std * self.std)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn box_uniform_support() {
        let target = BoxUniform::new(-1.0f64, 1.0);
        assert_eq!(target.logp(&[0.0f64, 0.99]), 0.0);
        assert_eq!(target.logp(&[0.0f64, 1.01]), f64::NEG_INFINITY);
        assert_eq!(target.logp(&vec![-2.0f64]), f64::NEG_INFINITY);
    }

    #[test]
    fn isotropic_gaussian_logp() {
        let target = IsotropicGaussian::new(2.0f64);
        let lp: f64 = target.logp(&vec![1.0f64, 2.0, 3.0]);
        assert_abs_diff_eq!(lp, -0.5 * 14.0 / 4.0, epsilon = 1e-12);
    }
}
