use std::{fmt, rc::Rc};

use crate::{
    error::{Error, Result},
    matrix::{Matrix, check_size},
    operation::Operation,
    registry::Registry,
};

/// A validated `eval` call waiting for its input matrices.
///
/// The operation is captured by object, so the request stays meaningful while
/// the caller reads matrices.
#[derive(Debug, Clone)]
pub struct EvalRequest {
    index: usize,
    size: usize,
    operation: Rc<Operation>,
}

/// Result of an evaluation together with the formula it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub trace: String,
    pub result: Matrix,
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = \n{}", self.trace, self.result)
    }
}

impl EvalRequest {
    /// Resolves `index` in `registry` and validates the requested matrix size.
    pub fn new(registry: &Registry, index: i64, size: i64) -> Result<Self> {
        let operation = Rc::clone(registry.get(index)?);
        let size = check_size(size)?;

        Ok(Self {
            index: index as usize,
            size,
            operation,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Number of `size x size` matrices [`EvalRequest::run`] expects.
    pub fn input_count(&self) -> usize {
        self.operation.input_count()
    }

    pub fn run(&self, inputs: &[Matrix]) -> Result<Evaluation> {
        if let Some(matrix) = inputs.iter().find(|m| m.size() != self.size) {
            return Err(Error::Shape {
                expected: self.size,
                got: format!("{0}x{0}", matrix.size()),
            });
        }

        let trace = self.operation.trace(inputs)?;
        let result = self.operation.compute(inputs)?;
        tracing::debug!(index = self.index, size = self.size, "evaluated operation");

        Ok(Evaluation { trace, result })
    }
}

/// One-shot form of [`EvalRequest::new`] followed by [`EvalRequest::run`].
pub fn evaluate(registry: &Registry, index: i64, size: i64, inputs: &[Matrix]) -> Result<Evaluation> {
    EvalRequest::new(registry, index, size)?.run(inputs)
}
