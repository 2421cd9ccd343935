//! Elementary operations and their operands.

use std::fmt;

use crate::error::{EvalError, EvalResult};

/// Handle to an intermediate value of a composition. `Slot(0)` is the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot(pub usize);

impl Slot {
    pub const INPUT: Slot = Slot(0);

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            write!(f, "x")
        } else {
            write!(f, "v{}", self.0)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Slot(Slot),
    /// Constant parameter; always carries derivative 0.
    Const(f64),
}

impl Operand {
    pub fn slot(&self) -> Option<Slot> {
        match self {
            Operand::Slot(s) => Some(*s),
            Operand::Const(_) => None,
        }
    }

    pub(crate) fn shifted(self, offset: usize, input: Slot) -> Self {
        match self {
            Operand::Slot(Slot(0)) => Operand::Slot(input),
            Operand::Slot(Slot(i)) => Operand::Slot(Slot(i + offset)),
            c => c,
        }
    }
}

impl From<Slot> for Operand {
    fn from(slot: Slot) -> Self {
        Operand::Slot(slot)
    }
}

impl From<f64> for Operand {
    fn from(c: f64) -> Self {
        Operand::Const(c)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Slot(s) => write!(f, "{s}"),
            Operand::Const(c) if *c == std::f64::consts::PI => write!(f, "pi"),
            Operand::Const(c) if *c == std::f64::consts::E => write!(f, "e"),
            Operand::Const(c) => write!(f, "{c}"),
        }
    }
}

/// One step of a composition. The set is closed: each variant knows its own
/// local differentiation rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Add(Operand, Operand),
    Sub(Operand, Operand),
    Mul(Operand, Operand),
    Div(Operand, Operand),
    Neg(Operand),
    Pow { base: Operand, exponent: Operand },
    Log(Operand),
    Exp(Operand),
    Sin(Operand),
    Cos(Operand),
}

pub const OP_NAMES: [&str; 10] = [
    "add", "sub", "mul", "div", "neg", "pow", "log", "exp", "sin", "cos",
];

impl Op {
    pub fn name(&self) -> &'static str {
        match self {
            Op::Add(..) => "add",
            Op::Sub(..) => "sub",
            Op::Mul(..) => "mul",
            Op::Div(..) => "div",
            Op::Neg(_) => "neg",
            Op::Pow { .. } => "pow",
            Op::Log(_) => "log",
            Op::Exp(_) => "exp",
            Op::Sin(_) => "sin",
            Op::Cos(_) => "cos",
        }
    }

    /// Builds an operation from its identifier.
    pub fn from_name(name: &str, operands: &[Operand]) -> EvalResult<Op> {
        let Some(op) = OP_NAMES.iter().copied().find(|n| *n == name) else {
            return Err(EvalError::UnsupportedOperation(name.to_string()));
        };
        let arity = match op {
            "neg" | "log" | "exp" | "sin" | "cos" => 1,
            _ => 2,
        };
        if operands.len() != arity {
            return Err(EvalError::Arity {
                op,
                expected: arity,
                found: operands.len(),
            });
        }
        let a = operands[0];
        let op = match name {
            "neg" => Op::Neg(a),
            "log" => Op::Log(a),
            "exp" => Op::Exp(a),
            "sin" => Op::Sin(a),
            "cos" => Op::Cos(a),
            "add" => Op::Add(a, operands[1]),
            "sub" => Op::Sub(a, operands[1]),
            "mul" => Op::Mul(a, operands[1]),
            "div" => Op::Div(a, operands[1]),
            _ => Op::Pow {
                base: a,
                exponent: operands[1],
            },
        };
        Ok(op)
    }

    pub fn operands(&self) -> Vec<Operand> {
        match *self {
            Op::Add(a, b) | Op::Sub(a, b) | Op::Mul(a, b) | Op::Div(a, b) => vec![a, b],
            Op::Pow { base, exponent } => vec![base, exponent],
            Op::Neg(a) | Op::Log(a) | Op::Exp(a) | Op::Sin(a) | Op::Cos(a) => vec![a],
        }
    }

    /// Rewrites every operand, keeping the variant.
    pub(crate) fn map_operands(self, mut f: impl FnMut(Operand) -> Operand) -> Op {
        match self {
            Op::Add(a, b) => Op::Add(f(a), f(b)),
            Op::Sub(a, b) => Op::Sub(f(a), f(b)),
            Op::Mul(a, b) => Op::Mul(f(a), f(b)),
            Op::Div(a, b) => Op::Div(f(a), f(b)),
            Op::Neg(a) => Op::Neg(f(a)),
            Op::Pow { base, exponent } => Op::Pow {
                base: f(base),
                exponent: f(exponent),
            },
            Op::Log(a) => Op::Log(f(a)),
            Op::Exp(a) => Op::Exp(f(a)),
            Op::Sin(a) => Op::Sin(f(a)),
            Op::Cos(a) => Op::Cos(f(a)),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        for operand in self.operands() {
            write!(f, " {operand}")?;
        }
        Ok(())
    }
}
