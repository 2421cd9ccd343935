use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("domain error in `{op}` at {value}: {reason}")]
    Domain {
        op: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("`{op}` produced a non-finite result from {value}")]
    NonFinite { op: &'static str, value: f64 },

    #[error("unsupported operation `{0}`")]
    UnsupportedOperation(String),

    #[error("`{op}` takes {expected} operand(s), got {found}")]
    Arity {
        op: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("operand refers to slot v{slot} but only {defined} slot(s) are defined")]
    UndefinedSlot { slot: usize, defined: usize },

    #[error("`{op}` was given the non-finite constant {value}")]
    NonFiniteConstant { op: &'static str, value: f64 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: unknown name `{name}`")]
    UnknownName { line: usize, name: String },

    #[error("line {line}: `{name}` is already defined")]
    Redefined { line: usize, name: String },

    #[error("line {line}: {source}")]
    Eval {
        line: usize,
        #[source]
        source: EvalError,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FiniteDiffError {
    #[error("step study needs at least one step")]
    NoSteps,

    #[error("step sizes must be positive and finite, got {0}")]
    InvalidStep(f64),

    #[error("exact derivative must be finite, got {0}")]
    InvalidReference(f64),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

pub type EvalResult<T> = Result<T, EvalError>;
