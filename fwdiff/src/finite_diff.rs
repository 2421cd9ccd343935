//! Finite-difference estimates, for cross-checking forward mode.
//!
//! A forward difference has discretization error `O(h)` and rounding error
//! `O(ε/h)`, so the best step is near `sqrt(ε)`. A centered difference has
//! discretization error `O(h²)` and its best step is near `cbrt(ε)`. Both
//! scale the step with `1 + |x|` so the heuristic also holds away from zero.
//! Nothing here is used by the evaluator.

use std::convert::Infallible;

use log::debug;
use nalgebra::DVector;

use crate::composition::Composition;
use crate::error::FiniteDiffError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Forward,
    Centered,
}

impl Scheme {
    pub fn name(self) -> &'static str {
        match self {
            Scheme::Forward => "forward",
            Scheme::Centered => "centered",
        }
    }

    /// Step scale that balances discretization and rounding error for a
    /// well-scaled function.
    pub fn default_scale(self) -> f64 {
        match self {
            Scheme::Forward => f64::EPSILON.sqrt(),
            Scheme::Centered => f64::EPSILON.cbrt(),
        }
    }

    pub fn default_step(self, x: f64) -> f64 {
        scaled_step(x, self.default_scale())
    }

    pub fn try_estimate<F, E>(self, f: F, x: f64, h: f64) -> Result<f64, E>
    where
        F: Fn(f64) -> Result<f64, E>,
    {
        match self {
            Scheme::Forward => Ok((f(x + h)? - f(x)?) / h),
            Scheme::Centered => Ok((f(x + h)? - f(x - h)?) / (2.0 * h)),
        }
    }

    pub fn estimate<F: Fn(f64) -> f64>(self, f: F, x: f64, h: f64) -> f64 {
        match self.try_estimate(|x| Ok::<_, Infallible>(f(x)), x, h) {
            Ok(d) => d,
            Err(never) => match never {},
        }
    }
}

/// `(f(x + h) - f(x)) / h`
pub fn forward_difference<F: Fn(f64) -> f64>(f: F, x: f64, h: f64) -> f64 {
    Scheme::Forward.estimate(f, x, h)
}

/// `(f(x + h) - f(x - h)) / 2h`
pub fn centered_difference<F: Fn(f64) -> f64>(f: F, x: f64, h: f64) -> f64 {
    Scheme::Centered.estimate(f, x, h)
}

/// Step relative to the magnitude of `x`: `eps * (1 + |x|)`.
pub fn scaled_step(x: f64, eps: f64) -> f64 {
    eps * (1.0 + x.abs())
}

/// Absolute error of both schemes over a range of step sizes.
#[derive(Debug, Clone)]
pub struct StepStudy {
    x: f64,
    exact: f64,
    steps: DVector<f64>,
    forward: DVector<f64>,
    centered: DVector<f64>,
}

impl StepStudy {
    /// `count` steps spaced evenly in log scale from `1e-1` down to `1e-15`.
    pub fn log_spaced_steps(count: usize) -> DVector<f64> {
        const FIRST: f64 = -1.0;
        const LAST: f64 = -15.0;
        if count == 1 {
            return DVector::from_element(1, 10f64.powf(FIRST));
        }
        DVector::from_fn(count, |i, _| {
            let t = i as f64 / (count - 1) as f64;
            10f64.powf(FIRST + t * (LAST - FIRST))
        })
    }

    pub fn new<F, E>(f: F, x: f64, exact: f64, steps: DVector<f64>) -> Result<Self, E>
    where
        F: Fn(f64) -> Result<f64, E>,
        E: From<FiniteDiffError>,
    {
        if steps.is_empty() {
            return Err(FiniteDiffError::NoSteps.into());
        }
        if let Some(&h) = steps.iter().find(|h| !(h.is_finite() && **h > 0.0)) {
            return Err(FiniteDiffError::InvalidStep(h).into());
        }
        if !exact.is_finite() {
            return Err(FiniteDiffError::InvalidReference(exact).into());
        }

        let mut forward = DVector::zeros(steps.len());
        let mut centered = DVector::zeros(steps.len());
        for (i, &h) in steps.iter().enumerate() {
            forward[i] = (Scheme::Forward.try_estimate(&f, x, h)? - exact).abs();
            centered[i] = (Scheme::Centered.try_estimate(&f, x, h)? - exact).abs();
        }

        let study = StepStudy {
            x,
            exact,
            steps,
            forward,
            centered,
        };
        for scheme in [Scheme::Forward, Scheme::Centered] {
            let (h, err) = study.best_step(scheme);
            debug!("{} difference at x = {x}: best step {h:e}, error {err:e}", scheme.name());
        }
        Ok(study)
    }

    /// Study against the forward-mode derivative of `composition`.
    pub fn for_composition(
        composition: &Composition,
        x: f64,
        steps: DVector<f64>,
    ) -> Result<Self, FiniteDiffError> {
        let exact = composition.evaluate(x)?.derivative();
        StepStudy::new(
            |t| composition.value(t).map_err(FiniteDiffError::from),
            x,
            exact,
            steps,
        )
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn exact(&self) -> f64 {
        self.exact
    }

    pub fn steps(&self) -> &DVector<f64> {
        &self.steps
    }

    pub fn errors(&self, scheme: Scheme) -> &DVector<f64> {
        match scheme {
            Scheme::Forward => &self.forward,
            Scheme::Centered => &self.centered,
        }
    }

    /// `(h, forward error, centered error)` per step.
    pub fn rows(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.steps
            .iter()
            .zip(self.forward.iter())
            .zip(self.centered.iter())
            .map(|((&h, &f), &c)| (h, f, c))
    }

    /// Step with the smallest error, and that error.
    pub fn best_step(&self, scheme: Scheme) -> (f64, f64) {
        let errors = self.errors(scheme);
        let i = errors
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map_or(0, |(i, _)| i);
        (self.steps[i], errors[i])
    }
}
