//! Builds a readable infix expression from a composition.
//!
//! This interpreter shares nothing with the numeric one except the list of
//! steps. It does not simplify or differentiate.

use std::fmt;

use crate::composition::Composition;
use crate::op::{Op, Operand};

// Binding strength, loosest first.
const SUM: u8 = 1;
const PRODUCT: u8 = 2;
const UNARY: u8 = 3;
const POWER: u8 = 4;
const ATOM: u8 = 5;

#[derive(Debug, Clone)]
struct Expr {
    text: String,
    prec: u8,
}

impl Expr {
    fn atom(text: String) -> Self {
        Expr { text, prec: ATOM }
    }

    fn at_least(&self, prec: u8) -> String {
        if self.prec >= prec {
            self.text.clone()
        } else {
            format!("({})", self.text)
        }
    }
}

fn operand(o: Operand, exprs: &[Expr]) -> Expr {
    match o {
        Operand::Slot(slot) => exprs[slot.index()].clone(),
        Operand::Const(c) if c < 0.0 => Expr {
            text: Operand::Const(c).to_string(),
            prec: UNARY,
        },
        c => Expr::atom(c.to_string()),
    }
}

fn render_step(op: &Op, exprs: &[Expr]) -> Expr {
    let get = |o| operand(o, exprs);
    let infix = |a: Operand, sym: &str, b: Operand, prec: u8, right_prec: u8| Expr {
        text: format!("{} {sym} {}", get(a).at_least(prec), get(b).at_least(right_prec)),
        prec,
    };
    let call = |name: &str, a: Operand| Expr::atom(format!("{name}({})", get(a).text));

    match *op {
        Op::Add(a, b) => infix(a, "+", b, SUM, SUM),
        Op::Sub(a, b) => infix(a, "-", b, SUM, PRODUCT),
        Op::Mul(a, b) => infix(a, "*", b, PRODUCT, PRODUCT),
        Op::Div(a, b) => infix(a, "/", b, PRODUCT, UNARY),
        Op::Neg(a) => Expr {
            text: format!("-{}", get(a).at_least(UNARY)),
            prec: UNARY,
        },
        Op::Pow { base, exponent } => Expr {
            text: format!("{}^{}", get(base).at_least(ATOM), get(exponent).at_least(POWER)),
            prec: POWER,
        },
        Op::Log(a) => call("log", a),
        Op::Exp(a) => call("exp", a),
        Op::Sin(a) => call("sin", a),
        Op::Cos(a) => call("cos", a),
    }
}

impl Composition {
    /// Infix expression of the output in terms of `x`.
    pub fn expression(&self) -> String {
        let mut exprs = vec![Expr::atom("x".to_string())];
        for op in self.steps() {
            let e = render_step(op, &exprs);
            exprs.push(e);
        }
        exprs[self.output().index()].text.clone()
    }
}

/// One `vN = op args` line per step, the format read back by `FromStr`.
impl fmt::Display for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.steps().iter().enumerate() {
            writeln!(f, "v{} = {op}", i + 1)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notebook_expression() {
        let g = Composition::notebook_example();
        assert_eq!(g.expression(), "cos(x^pi) * log(x)");
    }

    #[test]
    fn iterated_expression_substitutes_inner_result() {
        let g = Composition::notebook_example().repeat(2);
        assert_eq!(
            g.expression(),
            "cos((cos(x^pi) * log(x))^pi) * log(cos(x^pi) * log(x))"
        );
    }

    #[test]
    fn parenthesises_by_precedence() {
        let mut c = Composition::new();
        let a = c.add(c.input(), 1.0).unwrap();
        let b = c.mul(a, 2.0).unwrap();
        let d = c.sub(b, c.input()).unwrap();
        let n = c.neg(d).unwrap();
        c.div(n, a).unwrap();
        assert_eq!(c.expression(), "-((x + 1) * 2 - x) / (x + 1)");
    }

    #[test]
    fn identity_renders_input() {
        assert_eq!(Composition::new().expression(), "x");
        assert_eq!(Composition::new().to_string(), "");
    }

    #[test]
    fn listing() {
        let g = Composition::notebook_example();
        assert_eq!(
            g.to_string(),
            "v1 = pow x pi\nv2 = cos v1\nv3 = log x\nv4 = mul v2 v3\n"
        );
    }
}
