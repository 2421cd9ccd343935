use crate::error::{EvalError, EvalResult};
use crate::op::{Op, Operand, Slot};

/// An ordered list of elementary operations. Step `i` defines slot `i + 1`;
/// the last slot is the output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Composition {
    steps: Vec<Op>,
}

impl Composition {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn input(&self) -> Slot {
        Slot::INPUT
    }

    /// Slot holding the result. With no steps this is the input (identity).
    pub fn output(&self) -> Slot {
        Slot(self.steps.len())
    }

    pub fn steps(&self) -> &[Op] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Appends a step, rejecting operands that refer to slots not yet defined
    /// and constants that are infinite or NaN.
    pub fn push(&mut self, op: Op) -> EvalResult<Slot> {
        let defined = self.steps.len() + 1;
        for operand in op.operands() {
            match operand {
                Operand::Slot(Slot(slot)) if slot >= defined => {
                    return Err(EvalError::UndefinedSlot { slot, defined });
                }
                Operand::Const(value) if !value.is_finite() => {
                    return Err(EvalError::NonFiniteConstant {
                        op: op.name(),
                        value,
                    });
                }
                _ => {}
            }
        }
        self.steps.push(op);
        Ok(self.output())
    }

    /// Appends a step by operation name.
    pub fn apply(&mut self, name: &str, operands: &[Operand]) -> EvalResult<Slot> {
        let op = Op::from_name(name, operands)?;
        self.push(op)
    }

    pub fn add(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> EvalResult<Slot> {
        self.push(Op::Add(a.into(), b.into()))
    }

    pub fn sub(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> EvalResult<Slot> {
        self.push(Op::Sub(a.into(), b.into()))
    }

    pub fn mul(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> EvalResult<Slot> {
        self.push(Op::Mul(a.into(), b.into()))
    }

    pub fn div(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> EvalResult<Slot> {
        self.push(Op::Div(a.into(), b.into()))
    }

    pub fn neg(&mut self, a: impl Into<Operand>) -> EvalResult<Slot> {
        self.push(Op::Neg(a.into()))
    }

    pub fn pow(
        &mut self,
        base: impl Into<Operand>,
        exponent: impl Into<Operand>,
    ) -> EvalResult<Slot> {
        self.push(Op::Pow {
            base: base.into(),
            exponent: exponent.into(),
        })
    }

    pub fn log(&mut self, a: impl Into<Operand>) -> EvalResult<Slot> {
        self.push(Op::Log(a.into()))
    }

    pub fn exp(&mut self, a: impl Into<Operand>) -> EvalResult<Slot> {
        self.push(Op::Exp(a.into()))
    }

    pub fn sin(&mut self, a: impl Into<Operand>) -> EvalResult<Slot> {
        self.push(Op::Sin(a.into()))
    }

    pub fn cos(&mut self, a: impl Into<Operand>) -> EvalResult<Slot> {
        self.push(Op::Cos(a.into()))
    }

    /// `other ∘ self`: feeds this composition's output into `other`.
    pub fn then(&self, other: &Composition) -> Composition {
        let offset = self.steps.len();
        let input = self.output();
        let mut steps = self.steps.clone();
        steps.extend(
            other
                .steps
                .iter()
                .map(|op| op.map_operands(|o| o.shifted(offset, input))),
        );
        Composition { steps }
    }

    /// `n`-fold self composition, `g(g(...g(x)))`. Zero repeats is the identity.
    pub fn repeat(&self, n: usize) -> Composition {
        (0..n).fold(Composition::new(), |acc, _| acc.then(self))
    }

    /// `cos(x^pi) * log(x)`, the iterated map used throughout the notebook.
    pub fn notebook_example() -> Composition {
        let x = Operand::Slot(Slot::INPUT);
        Composition {
            steps: vec![
                Op::Pow {
                    base: x,
                    exponent: Operand::Const(std::f64::consts::PI),
                },
                Op::Cos(Slot(1).into()),
                Op::Log(x),
                Op::Mul(Slot(2).into(), Slot(3).into()),
            ],
        }
    }
}
