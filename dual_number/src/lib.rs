//! A real number paired with its derivative with respect to one
//! distinguished input.
//!
//! The rules here are raw: they follow IEEE semantics and never check
//! domains. `ln` of a negative value gives NaN, division by zero gives an
//! infinity. Callers that need domain errors check operands first.

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Dual {
    value: f64,
    derivative: f64,
}

impl Dual {
    pub fn new(value: f64, derivative: f64) -> Self {
        Self { value, derivative }
    }

    /// The independent variable itself: dx/dx = 1.
    pub fn variable(value: f64) -> Self {
        Self { value, derivative: 1.0 }
    }

    pub fn constant(value: f64) -> Self {
        Self { value, derivative: 0.0 }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn derivative(&self) -> f64 {
        self.derivative
    }

    pub fn is_finite(&self) -> bool {
        self.value.is_finite() && self.derivative.is_finite()
    }
}

impl From<f64> for Dual {
    fn from(value: f64) -> Self {
        Dual::constant(value)
    }
}

impl Add for Dual {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Dual::new(self.value + rhs.value, self.derivative + rhs.derivative)
    }
}

impl Sub for Dual {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self + -rhs
    }
}

impl Mul for Dual {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Dual::new(
            self.value * rhs.value,
            self.derivative * rhs.value + self.value * rhs.derivative,
        )
    }
}

impl Div for Dual {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        self * rhs.recip()
    }
}

impl Neg for Dual {
    type Output = Self;

    fn neg(self) -> Self {
        Dual::new(-self.value, -self.derivative)
    }
}

impl Dual {
    /// Lifts a scalar function given its value `f` and slope `df` at
    /// `self.value`: `(f, df * derivative)`.
    fn chain(self, f: f64, df: f64) -> Self {
        Dual::new(f, df * self.derivative)
    }

    pub fn recip(self) -> Self {
        let r = self.value.recip();
        self.chain(r, -r * r)
    }

    pub fn sin(self) -> Self {
        let (s, c) = self.value.sin_cos();
        self.chain(s, c)
    }

    pub fn cos(self) -> Self {
        let (s, c) = self.value.sin_cos();
        self.chain(c, -s)
    }

    pub fn exp(self) -> Self {
        let e = self.value.exp();
        self.chain(e, e)
    }

    pub fn ln(self) -> Self {
        self.chain(self.value.ln(), self.value.recip())
    }

    /// `self^n` for a constant exponent.
    pub fn powf(self, n: f64) -> Self {
        if n == 0.0 {
            return Dual::constant(1.0);
        }
        self.chain(self.value.powf(n), n * self.value.powf(n - 1.0))
    }

    /// `self^rhs` where the exponent also depends on the input.
    pub fn powd(self, rhs: Self) -> Self {
        if rhs.derivative == 0.0 {
            return self.powf(rhs.value);
        }
        let val = self.value.powf(rhs.value);
        Dual::new(
            val,
            rhs.value * self.value.powf(rhs.value - 1.0) * self.derivative
                + val * self.value.ln() * rhs.derivative,
        )
    }
}

impl fmt::Display for Dual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.derivative.is_sign_negative() {
            write!(f, "{} - {}ε", self.value, -self.derivative)
        } else {
            write!(f, "{} + {}ε", self.value, self.derivative)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn variable_and_constant_seeds() {
        assert_eq!(Dual::variable(3.0), Dual::new(3.0, 1.0));
        assert_eq!(Dual::constant(3.0), Dual::new(3.0, 0.0));
        assert_eq!(Dual::from(2.5).derivative(), 0.0);
    }

    #[test]
    fn product_rule() {
        // d/dx x * (x + 2) = 2x + 2
        let x = Dual::variable(3.0);
        let y = x * (x + Dual::constant(2.0));
        assert_eq!(y.value(), 15.0);
        assert_eq!(y.derivative(), 8.0);
    }

    #[test]
    fn quotient_rule() {
        // d/dx 1/x = -1/x^2
        let y = Dual::constant(1.0) / Dual::variable(2.0);
        assert_relative_eq!(y.value(), 0.5);
        assert_relative_eq!(y.derivative(), -0.25);
    }

    #[test]
    fn reciprocal() {
        // d/dx 1/x^2 through recip of x * x
        let x = Dual::variable(2.0);
        let y = (x * x).recip();
        assert_relative_eq!(y.value(), 0.25);
        assert_relative_eq!(y.derivative(), -0.25);
        assert_eq!(Dual::variable(4.0) / Dual::variable(4.0), Dual::new(1.0, 0.0));
    }

    #[test]
    fn sub_and_neg() {
        let x = Dual::variable(1.5);
        let y = -(x - Dual::constant(4.0));
        assert_eq!(y, Dual::new(2.5, -1.0));
    }

    #[test]
    fn transcendental_rules() {
        let x0 = 0.8_f64;
        let x = Dual::variable(x0);
        assert_relative_eq!(x.sin().derivative(), x0.cos(), max_relative = 1e-15);
        assert_relative_eq!(x.cos().derivative(), -x0.sin(), max_relative = 1e-15);
        assert_relative_eq!(x.exp().derivative(), x0.exp(), max_relative = 1e-15);
        assert_relative_eq!(x.ln().derivative(), 1.0 / x0, max_relative = 1e-15);
    }

    #[test]
    fn constant_power() {
        let x = Dual::variable(2.0);
        let y = x.powf(3.0);
        assert_relative_eq!(y.value(), 8.0);
        assert_relative_eq!(y.derivative(), 12.0);
        assert_eq!(x.powf(0.0), Dual::constant(1.0));
    }

    #[test]
    fn dual_exponent_power() {
        // d/dx x^x = x^x (ln x + 1)
        let x0 = 1.7_f64;
        let x = Dual::variable(x0);
        let y = x.powd(x);
        assert_relative_eq!(y.value(), x0.powf(x0), max_relative = 1e-15);
        assert_relative_eq!(
            y.derivative(),
            x0.powf(x0) * (x0.ln() + 1.0),
            max_relative = 1e-14
        );
    }

    #[test]
    fn raw_rules_do_not_check_domains() {
        assert!(Dual::variable(-1.0).ln().value().is_nan());
        assert!(!Dual::variable(0.0).ln().is_finite());
    }

    #[test]
    fn display_shows_sign_of_derivative() {
        assert_eq!(Dual::new(1.0, 2.0).to_string(), "1 + 2ε");
        assert_eq!(Dual::new(1.0, -2.0).to_string(), "1 - 2ε");
    }
}
