//! Line-oriented composition listings.
//!
//! ```text
//! # y = log(x) * cos(x^pi)
//! a = pow x pi
//! b = cos a
//! c = log x
//! y = mul b c
//! ```
//!
//! `x` names the input. Operands are earlier names, numeric literals, `pi` or
//! `e`. The last definition is the output.

use std::collections::HashMap;
use std::f64::consts::{E, PI};
use std::str::FromStr;

use crate::composition::Composition;
use crate::error::ParseError;
use crate::op::{Operand, Slot};

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn operand(token: &str, names: &HashMap<String, Slot>, line: usize) -> Result<Operand, ParseError> {
    if let Some(slot) = names.get(token) {
        return Ok(Operand::Slot(*slot));
    }
    match token {
        "pi" => return Ok(Operand::Const(PI)),
        "e" => return Ok(Operand::Const(E)),
        _ => {}
    }
    if is_identifier(token) {
        return Err(ParseError::UnknownName {
            line,
            name: token.to_string(),
        });
    }
    match token.parse::<f64>() {
        Ok(c) if c.is_finite() => Ok(Operand::Const(c)),
        _ => Err(ParseError::Syntax {
            line,
            message: format!("invalid operand `{token}`"),
        }),
    }
}

impl FromStr for Composition {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut composition = Composition::new();
        let mut names = HashMap::from([("x".to_string(), Slot::INPUT)]);

        for (i, raw) in s.lines().enumerate() {
            let line = i + 1;
            let code = match raw.split_once('#') {
                Some((code, _)) => code,
                None => raw,
            }
            .trim();
            if code.is_empty() {
                continue;
            }

            let Some((lhs, rhs)) = code.split_once('=') else {
                return Err(ParseError::Syntax {
                    line,
                    message: "expected `name = op operand...`".to_string(),
                });
            };
            let name = lhs.trim();
            if !is_identifier(name) || name == "pi" || name == "e" {
                return Err(ParseError::Syntax {
                    line,
                    message: format!("`{name}` cannot be defined"),
                });
            }
            if names.contains_key(name) {
                return Err(ParseError::Redefined {
                    line,
                    name: name.to_string(),
                });
            }

            let mut tokens = rhs.split_whitespace();
            let Some(op) = tokens.next() else {
                return Err(ParseError::Syntax {
                    line,
                    message: "missing operation".to_string(),
                });
            };
            let operands = tokens
                .map(|t| operand(t, &names, line))
                .collect::<Result<Vec<_>, _>>()?;

            let slot = composition
                .apply(op, &operands)
                .map_err(|source| ParseError::Eval { line, source })?;
            names.insert(name.to_string(), slot);
        }

        Ok(composition)
    }
}
