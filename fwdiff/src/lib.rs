//! Forward-mode differentiation of compositions of elementary operations.
//!
//! A [`Composition`] is an explicit list of tagged steps. Evaluating it at
//! `x0` pushes a `(value, derivative)` pair through every step, so the result
//! is exact up to rounding and its cost grows with the number of steps, not
//! with the size of a symbolic derivative.
//!
//! ```
//! use fwdiff::Composition;
//!
//! // y = cos(x^pi) * log(x)
//! let g = Composition::notebook_example();
//! let y = g.repeat(2).evaluate(1.9).unwrap();
//! assert!((y.value() - -1.5346823414986814).abs() < 1e-12);
//! assert!((y.derivative() - -34.03241959914048).abs() < 1e-10);
//! ```

pub mod composition;
pub mod error;
pub mod eval;
pub mod finite_diff;
pub mod op;
pub mod parse;
pub mod render;

pub use composition::Composition;
pub use dual_number::Dual;
pub use error::{EvalError, EvalResult, FiniteDiffError, ParseError};
pub use eval::Tangent;
pub use finite_diff::{Scheme, StepStudy, centered_difference, forward_difference, scaled_step};
pub use op::{Op, Operand, Slot};
