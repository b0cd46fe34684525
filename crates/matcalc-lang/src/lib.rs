//! `matcalc-lang` is the core of the matcalc calculator: bounded square
//! matrices, composable operations over them, and the capacity-limited
//! registry that names operations by index.
//!
//! ## Example
//!
//! ```rust
//! use matcalc_lang::{Matrix, OperationKind, Registry, evaluate};
//!
//! let mut registry = Registry::new(5).unwrap();
//! let add = registry.create(OperationKind::Add, &[0, 0]).unwrap();
//!
//! let inputs = [
//!     Matrix::from_rows(vec![vec![1, 2], vec![3, 4]]).unwrap(),
//!     Matrix::from_rows(vec![vec![5, 6], vec![7, 8]]).unwrap(),
//! ];
//! let evaluation = evaluate(&registry, add as i64, 2, &inputs).unwrap();
//!
//! assert_eq!(
//!     evaluation.result,
//!     Matrix::from_rows(vec![vec![6, 8], vec![10, 12]]).unwrap()
//! );
//! ```
mod error;
mod evaluator;
mod matrix;
mod operation;
mod registry;

pub use error::{Error, ErrorKind, Result, parse_number};
pub use evaluator::{EvalRequest, Evaluation, evaluate};
pub use matrix::{
    MAX_ALLOWED_VALUE, MAX_MATRIX_SIZE, MIN_ALLOWED_VALUE, MIN_MATRIX_SIZE, Matrix, check_size,
    check_value,
};
pub use operation::{MAX_INPUT_MATRICES, Operands, Operation, OperationKind};
pub use registry::{
    MAX_OPERATIONS_LIMIT, MIN_OPERATIONS_LIMIT, Registry, Resize, check_max_operations,
};
