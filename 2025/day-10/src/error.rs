use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// A machine line that could not be turned into a [`crate::machine::Machine`].
#[derive(Debug, Error, Diagnostic)]
#[error("invalid machine on line {line}: {kind}")]
#[diagnostic(code(day_10::parse))]
pub struct ParseError {
    /// 1-based line number within the input.
    pub line: usize,
    pub kind: ParseErrorKind,
    #[source_code]
    src: String,
    #[label("here")]
    span: SourceSpan,
}

impl ParseError {
    pub(crate) fn new(
        line: usize,
        src: &str,
        span: std::ops::Range<usize>,
        kind: ParseErrorKind,
    ) -> Self {
        Self {
            line,
            kind,
            src: src.to_string(),
            span: span.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// Delimiters, light characters, integer tokens or trailing data.
    #[error("{0}")]
    Syntax(String),
    #[error("joltage requirements missing entries")]
    MissingJoltage,
    #[error("indicator lights ({lights}) and joltage counters ({counters}) mismatch")]
    LengthMismatch { lights: usize, counters: usize },
    #[error("button {button} references index {index} but the machine has {len} counters")]
    IndexOutOfRange {
        button: usize,
        index: usize,
        len: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum SolveError {
    #[error("no combination of button presses reaches the indicator pattern")]
    #[diagnostic(code(day_10::lights::inconsistent))]
    InconsistentLights,

    #[error("{free} free buttons would need 2^{free} combinations (limit is {limit})")]
    #[diagnostic(code(day_10::lights::too_many_free_buttons))]
    TooManyFreeButtons { free: usize, limit: usize },

    #[error("no exact solution for the joltage counters")]
    #[diagnostic(code(day_10::joltage::inconsistent))]
    InconsistentJoltage,

    #[error("non-integer solution: button {button} would need {value} presses")]
    #[diagnostic(code(day_10::joltage::non_integer))]
    NonInteger { button: usize, value: String },

    #[error("button press exceeds counter bound: button {button} needs {presses} presses, bound is {bound}")]
    #[diagnostic(code(day_10::joltage::bound_exceeded))]
    BoundExceeded {
        button: usize,
        presses: u64,
        bound: u64,
    },

    #[error("reduced joltage system does not fit in 128-bit integers")]
    #[diagnostic(code(day_10::joltage::overflow))]
    Overflow,

    #[error("no feasible joltage configuration")]
    #[diagnostic(
        code(day_10::joltage::infeasible),
        help("every assignment of the free buttons within their bounds was rejected")
    )]
    Infeasible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Lights,
    Joltage,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Lights => f.write_str("indicators"),
            Stage::Joltage => f.write_str("jolts"),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error("machine {index} {stage}")]
    #[diagnostic(code(day_10::machine))]
    Machine {
        /// 1-based position of the machine in the input.
        index: usize,
        stage: Stage,
        #[source]
        #[diagnostic_source]
        source: SolveError,
    },
}

impl Error {
    /// Wraps a solver failure with the machine's 1-based position.
    pub(crate) fn at(index: usize, stage: Stage) -> impl FnOnce(SolveError) -> Self {
        move |source| Error::Machine {
            index,
            stage,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn machine_failure_renders_solver_code_and_help() {
        let err = Error::at(3, Stage::Joltage)(SolveError::Infeasible);

        let inner = err.diagnostic_source().expect("wrapped solver diagnostic");
        assert_eq!(
            inner.code().map(|code| code.to_string()).as_deref(),
            Some("day_10::joltage::infeasible")
        );
        assert!(inner.help().is_some());
        assert_eq!(err.to_string(), "machine 3 jolts");
    }
}
