use miette::Diagnostic;
use thiserror::Error;

use crate::matrix::{MAX_ALLOWED_VALUE, MAX_MATRIX_SIZE, MIN_ALLOWED_VALUE, MIN_MATRIX_SIZE};
use crate::registry::{MAX_OPERATIONS_LIMIT, MIN_OPERATIONS_LIMIT};

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of [`Error`], one entry per failure family the
/// interpreter reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ErrorKind {
    #[strum(serialize = "IndexError")]
    Index,
    #[strum(serialize = "CapacityError")]
    Capacity,
    #[strum(serialize = "RangeError")]
    Range,
    #[strum(serialize = "ParseError")]
    Parse,
    #[strum(serialize = "ArgumentError")]
    Argument,
}

#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid operation index {index}. Please enter an index in the range of (0 - {}).", len.saturating_sub(1))]
    #[diagnostic(code(matcalc::index::operation))]
    OperationIndex { index: i64, len: usize },

    #[error("Cell ({row}, {col}) is outside of the {size}x{size} matrix")]
    #[diagnostic(code(matcalc::index::cell))]
    CellIndex { row: usize, col: usize, size: usize },

    #[error("You have exceeded the limit of {max} operations")]
    #[diagnostic(
        code(matcalc::capacity::exceeded),
        help("Delete an operation or raise the limit with `resize`.")
    )]
    CapacityExceeded { max: usize },

    #[error("A resize to {target} operations is pending, delete operations or cancel it first")]
    #[diagnostic(code(matcalc::capacity::shrink_pending))]
    ShrinkPending { target: usize },

    #[error("{len} operations do not fit the new limit of {target}, {} more must be deleted", len - target)]
    #[diagnostic(code(matcalc::capacity::insufficient_shrink))]
    InsufficientShrink { len: usize, target: usize },

    #[error("Value {value} in {unit} is out of the allowed range ({} - {})", MIN_ALLOWED_VALUE, MAX_ALLOWED_VALUE)]
    #[diagnostic(code(matcalc::range::value))]
    ValueOutOfRange { value: i64, unit: String },

    #[error("Invalid size {0}. Please enter a size in the range of ({min} - {max}).", min = MIN_MATRIX_SIZE, max = MAX_MATRIX_SIZE)]
    #[diagnostic(code(matcalc::range::matrix_size))]
    MatrixSize(i64),

    #[error("Number {0} is out of the valid range ({min} - {max})", min = MIN_OPERATIONS_LIMIT, max = MAX_OPERATIONS_LIMIT)]
    #[diagnostic(code(matcalc::range::max_operations))]
    MaxOperations(i64),

    #[error("The operation would need {count} input matrices, at most {max} are supported")]
    #[diagnostic(code(matcalc::range::input_count))]
    TooManyInputs { count: usize, max: usize },

    #[error("Expected {expected} matrices, got {got}")]
    #[diagnostic(code(matcalc::range::matrix_count))]
    MatrixCount { expected: usize, got: usize },

    #[error("Matrix shape mismatch: expected {expected}x{expected}, got {got}")]
    #[diagnostic(code(matcalc::range::shape))]
    Shape { expected: usize, got: String },

    #[error("Invalid number of arguments for \"{command}\": expected {expected}, got {got}")]
    #[diagnostic(
        code(matcalc::argument::count),
        help("Type `help` for the list of commands and their arguments.")
    )]
    Arguments {
        command: String,
        expected: usize,
        got: usize,
    },

    #[error("\"{0}\" is not a valid number")]
    #[diagnostic(code(matcalc::parse::number))]
    NotANumber(String),

    #[error("Expected {expected} values for the matrix, got {got}")]
    #[diagnostic(code(matcalc::parse::value_count))]
    ValueCount { expected: usize, got: usize },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::OperationIndex { .. } | Error::CellIndex { .. } => ErrorKind::Index,
            Error::CapacityExceeded { .. }
            | Error::ShrinkPending { .. }
            | Error::InsufficientShrink { .. } => ErrorKind::Capacity,
            Error::ValueOutOfRange { .. }
            | Error::MatrixSize(_)
            | Error::MaxOperations(_)
            | Error::TooManyInputs { .. }
            | Error::MatrixCount { .. }
            | Error::Shape { .. } => ErrorKind::Range,
            Error::NotANumber(_) | Error::ValueCount { .. } => ErrorKind::Parse,
            Error::Arguments { .. } => ErrorKind::Argument,
        }
    }
}

/// Parses a whole token as an integer, rejecting trailing garbage such as `12abc`.
pub fn parse_number(token: &str) -> Result<i64> {
    token
        .trim()
        .parse::<i64>()
        .map_err(|_| Error::NotANumber(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::positive("42", Ok(42))]
    #[case::negative("-1024", Ok(-1024))]
    #[case::padded(" 7 ", Ok(7))]
    #[case::trailing_garbage("12abc", Err(Error::NotANumber("12abc".to_string())))]
    #[case::empty("", Err(Error::NotANumber("".to_string())))]
    #[case::float("1.5", Err(Error::NotANumber("1.5".to_string())))]
    fn test_parse_number(#[case] input: &str, #[case] expected: Result<i64>) {
        assert_eq!(parse_number(input), expected);
    }

    #[rstest]
    #[case::operation_index(Error::OperationIndex { index: 9, len: 2 }, ErrorKind::Index)]
    #[case::capacity(Error::CapacityExceeded { max: 4 }, ErrorKind::Capacity)]
    #[case::shrink(Error::InsufficientShrink { len: 5, target: 3 }, ErrorKind::Capacity)]
    #[case::value(Error::ValueOutOfRange { value: 2000, unit: "scalar".to_string() }, ErrorKind::Range)]
    #[case::size(Error::MatrixSize(6), ErrorKind::Range)]
    #[case::parse(Error::NotANumber("x".to_string()), ErrorKind::Parse)]
    fn test_error_kind(#[case] error: Error, #[case] expected: ErrorKind) {
        assert_eq!(error.kind(), expected);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::OperationIndex { index: 5, len: 3 }.to_string(),
            "Invalid operation index 5. Please enter an index in the range of (0 - 2)."
        );
        assert_eq!(
            Error::ValueOutOfRange {
                value: 2000,
                unit: "scalar".to_string()
            }
            .to_string(),
            "Value 2000 in scalar is out of the allowed range (-1024 - 1000)"
        );
        assert_eq!(
            Error::InsufficientShrink { len: 5, target: 3 }.to_string(),
            "5 operations do not fit the new limit of 3, 2 more must be deleted"
        );
        assert_eq!(ErrorKind::Capacity.to_string(), "CapacityError");
    }

    #[rstest]
    #[case::matrix_size(
        Error::MatrixSize(9),
        "Invalid size 9. Please enter a size in the range of (1 - 5)."
    )]
    #[case::max_operations(
        Error::MaxOperations(101),
        "Number 101 is out of the valid range (2 - 100)"
    )]
    fn test_bounds_in_tuple_variant_messages(#[case] error: Error, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }
}
