//! Forward-mode evaluation of a [`Composition`].
//!
//! The evaluator keeps a tape with one entry per slot, seeds slot 0 with
//! `(x0, 1)` and folds over the steps, applying each operation's local rule
//! to values already on the tape. Domain checks run on operand values before
//! each rule is applied, so a failing step never yields a silent NaN.

use std::ops::{Add, Div, Mul, Neg, Sub};

use dual_number::Dual;
use log::{debug, trace};
use nalgebra::{DVector, SVector};
use num_dual::{Dual2_64, Dual64, DualNum};

use crate::composition::Composition;
use crate::error::{EvalError, EvalResult};
use crate::op::{Op, Operand};

/// Numbers the evaluator can push through a composition.
pub trait Tangent:
    Copy
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
{
    /// A value independent of the input.
    fn constant(c: f64) -> Self;
    /// The input itself, with unit first derivative.
    fn seed(x: f64) -> Self;
    fn re(&self) -> f64;
    fn is_finite(&self) -> bool;

    fn ln(self) -> Self;
    fn exp(self) -> Self;
    fn sin(self) -> Self;
    fn cos(self) -> Self;
    fn powf(self, n: f64) -> Self;
    fn powd(self, n: Self) -> Self;
}

impl Tangent for Dual {
    fn constant(c: f64) -> Self {
        Dual::constant(c)
    }

    fn seed(x: f64) -> Self {
        Dual::variable(x)
    }

    fn re(&self) -> f64 {
        self.value()
    }

    fn is_finite(&self) -> bool {
        Dual::is_finite(self)
    }

    fn ln(self) -> Self {
        Dual::ln(self)
    }

    fn exp(self) -> Self {
        Dual::exp(self)
    }

    fn sin(self) -> Self {
        Dual::sin(self)
    }

    fn cos(self) -> Self {
        Dual::cos(self)
    }

    fn powf(self, n: f64) -> Self {
        Dual::powf(self, n)
    }

    fn powd(self, n: Self) -> Self {
        Dual::powd(self, n)
    }
}

impl Tangent for Dual64 {
    fn constant(c: f64) -> Self {
        Dual64::from(c)
    }

    fn seed(x: f64) -> Self {
        Dual64::new(x, 1.0)
    }

    fn re(&self) -> f64 {
        self.re
    }

    fn is_finite(&self) -> bool {
        self.re.is_finite() && self.eps.is_finite()
    }

    fn ln(self) -> Self {
        <Self as DualNum<f64>>::ln(&self)
    }

    fn exp(self) -> Self {
        <Self as DualNum<f64>>::exp(&self)
    }

    fn sin(self) -> Self {
        <Self as DualNum<f64>>::sin(&self)
    }

    fn cos(self) -> Self {
        <Self as DualNum<f64>>::cos(&self)
    }

    fn powf(self, n: f64) -> Self {
        <Self as DualNum<f64>>::powf(&self, n)
    }

    fn powd(self, n: Self) -> Self {
        <Self as DualNum<f64>>::powd(&self, n)
    }
}

impl Tangent for Dual2_64 {
    fn constant(c: f64) -> Self {
        Dual2_64::from(c)
    }

    fn seed(x: f64) -> Self {
        Dual2_64::new(x, 1.0, 0.0)
    }

    fn re(&self) -> f64 {
        self.re
    }

    fn is_finite(&self) -> bool {
        self.re.is_finite() && self.v1.is_finite() && self.v2.is_finite()
    }

    fn ln(self) -> Self {
        <Self as DualNum<f64>>::ln(&self)
    }

    fn exp(self) -> Self {
        <Self as DualNum<f64>>::exp(&self)
    }

    fn sin(self) -> Self {
        <Self as DualNum<f64>>::sin(&self)
    }

    fn cos(self) -> Self {
        <Self as DualNum<f64>>::cos(&self)
    }

    fn powf(self, n: f64) -> Self {
        <Self as DualNum<f64>>::powf(&self, n)
    }

    fn powd(self, n: Self) -> Self {
        <Self as DualNum<f64>>::powd(&self, n)
    }
}

fn domain(op: &'static str, value: f64, reason: &'static str) -> EvalError {
    debug!("{op} rejected operand {value}: {reason}");
    EvalError::Domain { op, value, reason }
}

fn fetch<T: Tangent>(operand: Operand, tape: &[T]) -> T {
    match operand {
        Operand::Slot(slot) => tape[slot.index()],
        Operand::Const(c) => T::constant(c),
    }
}

fn pow<T: Tangent>(base: T, exponent: Operand, tape: &[T]) -> EvalResult<T> {
    let y = base.re();
    match exponent {
        Operand::Const(n) => {
            if y < 0.0 && n.fract() != 0.0 {
                return Err(domain("pow", y, "negative base with non-integer exponent"));
            }
            if y == 0.0 && n != 0.0 && n < 1.0 {
                return Err(domain("pow", y, "not differentiable at zero for exponent below one"));
            }
            Ok(base.powf(n))
        }
        Operand::Slot(slot) => {
            if y <= 0.0 {
                return Err(domain("pow", y, "input-dependent exponent needs a positive base"));
            }
            Ok(base.powd(tape[slot.index()]))
        }
    }
}

/// Applies one step's local rule to operands already on the tape.
fn step<T: Tangent>(op: &Op, tape: &[T]) -> EvalResult<T> {
    let get = |o: Operand| fetch(o, tape);
    let out = match *op {
        Op::Add(a, b) => get(a) + get(b),
        Op::Sub(a, b) => get(a) - get(b),
        Op::Mul(a, b) => get(a) * get(b),
        Op::Div(a, b) => {
            let d = get(b);
            if d.re() == 0.0 {
                return Err(domain("div", d.re(), "division by zero"));
            }
            get(a) / d
        }
        Op::Neg(a) => -get(a),
        Op::Pow { base, exponent } => pow(get(base), exponent, tape)?,
        Op::Log(a) => {
            let y = get(a);
            if y.re() <= 0.0 {
                return Err(domain("log", y.re(), "logarithm of a non-positive value"));
            }
            y.ln()
        }
        Op::Exp(a) => get(a).exp(),
        Op::Sin(a) => get(a).sin(),
        Op::Cos(a) => get(a).cos(),
    };

    if !out.is_finite() {
        let value = get(op.operands()[0]).re();
        debug!("{} produced a non-finite result at {value}", op.name());
        return Err(EvalError::NonFinite { op: op.name(), value });
    }
    Ok(out)
}

impl Composition {
    /// Runs the composition at `x0` with any [`Tangent`] number type.
    pub fn evaluate_with<T: Tangent>(&self, x0: f64) -> EvalResult<T> {
        if !x0.is_finite() {
            return Err(domain("input", x0, "evaluation point must be finite"));
        }
        let mut tape = Vec::with_capacity(self.len() + 1);
        tape.push(T::seed(x0));

        let tape = self.steps().iter().try_fold(tape, |mut tape, op| {
            let next = step(op, &tape)?;
            trace!("v{} = {op} -> {}", tape.len(), next.re());
            tape.push(next);
            Ok::<_, EvalError>(tape)
        })?;

        Ok(tape[self.output().index()])
    }

    /// Value and first derivative at `x0`.
    pub fn evaluate(&self, x0: f64) -> EvalResult<Dual> {
        self.evaluate_with::<Dual>(x0)
    }

    /// Plain value at `x0`, for callers that only need `f(x0)`.
    pub fn value(&self, x0: f64) -> EvalResult<f64> {
        self.evaluate(x0).map(|y| y.value())
    }

    /// Same as [`Composition::evaluate`] but through `num_dual`'s dual numbers.
    pub fn evaluate_num_dual(&self, x0: f64) -> EvalResult<(f64, f64)> {
        let y = self.evaluate_with::<Dual64>(x0)?;
        Ok((y.re, y.eps))
    }

    /// Value, first and second derivative at `x0`.
    pub fn second_derivative(&self, x0: f64) -> EvalResult<(f64, f64, f64)> {
        let y = self.evaluate_with::<Dual2_64>(x0)?;
        Ok((y.re, y.v1, y.v2))
    }

    /// Values and derivatives at a fixed number of independent points.
    pub fn evaluate_points<const N: usize>(
        &self,
        xs: &SVector<f64, N>,
    ) -> EvalResult<(SVector<f64, N>, SVector<f64, N>)> {
        let mut values = SVector::<f64, N>::zeros();
        let mut derivatives = SVector::<f64, N>::zeros();
        for (i, &x) in xs.iter().enumerate() {
            let y = self.evaluate(x)?;
            values[i] = y.value();
            derivatives[i] = y.derivative();
        }
        Ok((values, derivatives))
    }

    /// Values and derivatives at every point of `xs`.
    pub fn evaluate_many(&self, xs: &DVector<f64>) -> EvalResult<(DVector<f64>, DVector<f64>)> {
        let mut values = DVector::<f64>::zeros(xs.len());
        let mut derivatives = DVector::<f64>::zeros(xs.len());
        for (i, &x) in xs.iter().enumerate() {
            let y = self.evaluate(x)?;
            values[i] = y.value();
            derivatives[i] = y.derivative();
        }
        Ok((values, derivatives))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::Slot;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use std::f64::consts::PI;

    fn unary(op: fn(Operand) -> Op) -> Composition {
        let mut c = Composition::new();
        c.push(op(Slot::INPUT.into())).unwrap();
        c
    }

    const POINTS: [f64; 6] = [0.1, 0.37, 0.9, 1.9, 2.5, 7.3];

    #[test]
    fn input_is_seeded_with_unit_derivative() {
        let y = Composition::new().evaluate(4.2).unwrap();
        assert_eq!(y, Dual::new(4.2, 1.0));
    }

    #[test]
    fn unary_ops_match_closed_form() {
        let cases: [(fn(Operand) -> Op, fn(f64) -> f64, fn(f64) -> f64); 5] = [
            (Op::Sin, f64::sin, f64::cos),
            (Op::Cos, f64::cos, |x| -x.sin()),
            (Op::Exp, f64::exp, f64::exp),
            (Op::Log, f64::ln, |x| 1.0 / x),
            (Op::Neg, |x| -x, |_| -1.0),
        ];
        for (op, f, df) in cases {
            let c = unary(op);
            for x in POINTS {
                let y = c.evaluate(x).unwrap();
                assert_relative_eq!(y.value(), f(x), max_relative = 1e-12);
                assert_relative_eq!(y.derivative(), df(x), max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn binary_ops_with_constants() {
        for x in POINTS {
            let mut c = Composition::new();
            let a = c.mul(c.input(), 3.0).unwrap();
            let b = c.sub(a, 1.0).unwrap();
            let d = c.div(b, c.input()).unwrap();
            c.add(d, c.input()).unwrap();
            // (3x - 1)/x + x = 3 - 1/x + x
            let y = c.evaluate(x).unwrap();
            assert_relative_eq!(y.value(), 3.0 - 1.0 / x + x, max_relative = 1e-12);
            assert_relative_eq!(y.derivative(), 1.0 / (x * x) + 1.0, max_relative = 1e-12);
        }
    }

    #[test]
    fn product_rule() {
        let mut c = Composition::new();
        let s = c.sin(c.input()).unwrap();
        c.mul(s, c.input()).unwrap();
        for x in POINTS {
            let y = c.evaluate(x).unwrap();
            assert_relative_eq!(y.derivative(), x.cos() * x + x.sin(), max_relative = 1e-12);
        }
    }

    #[test]
    fn constant_power() {
        let mut c = Composition::new();
        c.pow(c.input(), PI).unwrap();
        for x in POINTS {
            let y = c.evaluate(x).unwrap();
            assert_relative_eq!(y.value(), x.powf(PI), max_relative = 1e-12);
            assert_relative_eq!(y.derivative(), PI * x.powf(PI - 1.0), max_relative = 1e-12);
        }
    }

    #[test]
    fn variable_power() {
        let mut c = Composition::new();
        c.pow(c.input(), c.input()).unwrap();
        for x in POINTS {
            let y = c.evaluate(x).unwrap();
            assert_relative_eq!(y.derivative(), x.powf(x) * (x.ln() + 1.0), max_relative = 1e-12);
        }
    }

    #[test]
    fn chain_rule_for_pairs() {
        let fs: [(fn(Operand) -> Op, fn(f64) -> f64, fn(f64) -> f64); 3] = [
            (Op::Sin, f64::sin, f64::cos),
            (Op::Exp, f64::exp, f64::exp),
            (Op::Cos, f64::cos, |x| -x.sin()),
        ];
        for (f_op, f, df) in fs {
            for (g_op, _, dg) in fs {
                let c = unary(f_op).then(&unary(g_op));
                for x in [0.1, 0.37, 0.9, 1.9] {
                    let y = c.evaluate(x).unwrap();
                    assert_relative_eq!(y.derivative(), dg(f(x)) * df(x), max_relative = 1e-12);
                }
            }
        }
    }

    #[test]
    fn evaluation_is_deterministic() {
        let c = Composition::notebook_example().repeat(2);
        let a = c.evaluate(1.9).unwrap();
        let b = c.evaluate(1.9).unwrap();
        assert_eq!(a.value().to_bits(), b.value().to_bits());
        assert_eq!(a.derivative().to_bits(), b.derivative().to_bits());
    }

    #[test]
    fn log_of_non_positive_is_a_domain_error() {
        let c = unary(Op::Log);
        for x in [0.0, -1.0] {
            assert!(matches!(
                c.evaluate(x),
                Err(EvalError::Domain { op: "log", .. })
            ));
        }
        // log(log(x)) fails on the intermediate, not the input
        let c = unary(Op::Log).then(&unary(Op::Log));
        assert!(matches!(
            c.evaluate(0.5),
            Err(EvalError::Domain { op: "log", value, .. }) if value < 0.0
        ));
    }

    #[test]
    fn pow_domain_errors() {
        let mut c = Composition::new();
        c.pow(c.input(), 0.5).unwrap();
        assert!(matches!(c.evaluate(-2.0), Err(EvalError::Domain { op: "pow", .. })));
        assert!(matches!(c.evaluate(0.0), Err(EvalError::Domain { op: "pow", .. })));

        let mut c = Composition::new();
        c.pow(c.input(), 3.0).unwrap();
        let y = c.evaluate(-2.0).unwrap();
        assert_relative_eq!(y.value(), -8.0);
        assert_relative_eq!(y.derivative(), 12.0);

        let mut c = Composition::new();
        c.pow(c.input(), c.input()).unwrap();
        assert!(matches!(c.evaluate(-2.0), Err(EvalError::Domain { op: "pow", .. })));
    }

    #[test]
    fn division_by_zero_is_a_domain_error() {
        let mut c = Composition::new();
        c.div(1.0, c.input()).unwrap();
        assert!(matches!(c.evaluate(0.0), Err(EvalError::Domain { op: "div", .. })));
    }

    #[test]
    fn overflow_is_reported() {
        let c = unary(Op::Exp);
        assert!(matches!(
            c.evaluate(1000.0),
            Err(EvalError::NonFinite { op: "exp", .. })
        ));
    }

    #[test]
    fn constants_never_leak_nan_or_infinity() {
        let mut c = Composition::new();
        assert!(matches!(
            c.mul(c.input(), f64::INFINITY),
            Err(EvalError::NonFiniteConstant { .. })
        ));
        // a finite but huge constant overflows at evaluation instead
        c.mul(c.input(), 1e308).unwrap();
        assert!(matches!(
            c.evaluate(10.0),
            Err(EvalError::NonFinite { op: "mul", value }) if value == 10.0
        ));
        assert_eq!(c.evaluate(0.5).unwrap(), Dual::new(0.5 * 1e308, 1e308));
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let c = unary(Op::Sin);
        assert!(matches!(c.evaluate(f64::NAN), Err(EvalError::Domain { op: "input", .. })));
    }

    #[test]
    fn num_dual_interpreter_agrees() {
        let c = Composition::notebook_example().repeat(2);
        for x in [1.7, 1.8, 1.9] {
            let y = c.evaluate(x).unwrap();
            let (v, d) = c.evaluate_num_dual(x).unwrap();
            assert_relative_eq!(v, y.value(), max_relative = 1e-12);
            assert_relative_eq!(d, y.derivative(), max_relative = 1e-12);
        }
    }

    #[test]
    fn second_derivative_of_sin() {
        let c = unary(Op::Sin);
        let (v, d1, d2) = c.second_derivative(0.7).unwrap();
        assert_relative_eq!(v, 0.7_f64.sin(), max_relative = 1e-14);
        assert_relative_eq!(d1, 0.7_f64.cos(), max_relative = 1e-14);
        assert_relative_eq!(d2, -0.7_f64.sin(), max_relative = 1e-14);
    }

    #[test]
    fn many_points() {
        let c = unary(Op::Exp);
        let xs = Vector3::new(0.0, 1.0, 2.0);
        let (v, d) = c.evaluate_points(&xs).unwrap();
        assert_relative_eq!(v, xs.map(f64::exp), max_relative = 1e-14);
        assert_relative_eq!(d, v);

        let xs = DVector::from_vec(vec![0.5, 1.5]);
        let (v, d) = c.evaluate_many(&xs).unwrap();
        assert_eq!(v.len(), 2);
        assert_relative_eq!(d, xs.map(f64::exp), max_relative = 1e-14);
    }

    #[test]
    fn many_points_propagates_first_failure() {
        let c = unary(Op::Log);
        let xs = DVector::from_vec(vec![1.0, -1.0, 2.0]);
        assert!(c.evaluate_many(&xs).is_err());
    }
}
