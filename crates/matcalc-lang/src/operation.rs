use std::{fmt, rc::Rc};

use crate::{
    error::{Error, Result},
    matrix::{Matrix, check_value},
};

/// Upper bound on the number of matrices a single evaluation may consume.
///
/// Composites sum the inputs of their operands, so sharing one operand on
/// both sides doubles the count at every level. One label letter per input.
pub const MAX_INPUT_MATRICES: usize = 26;

/// The verb-level tag of an [`Operation`], as typed at the prompt.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
pub enum OperationKind {
    #[strum(serialize = "iden")]
    Identity,
    #[strum(serialize = "tran")]
    Transpose,
    #[strum(serialize = "scal")]
    Scalar,
    #[strum(serialize = "add")]
    Add,
    #[strum(serialize = "sub")]
    Sub,
    #[strum(serialize = "comp")]
    Comp,
}

impl OperationKind {
    /// Number of integer arguments `create` expects for this kind.
    pub fn argument_count(&self) -> usize {
        match self {
            OperationKind::Identity | OperationKind::Transpose => 0,
            OperationKind::Scalar => 1,
            OperationKind::Add | OperationKind::Sub | OperationKind::Comp => 2,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            OperationKind::Add | OperationKind::Sub | OperationKind::Comp
        )
    }
}

/// Operand pair of a composite operation.
///
/// Operands are held by object, not by registry index, so a composite keeps
/// evaluating what it was built from even after the registry renumbers.
#[derive(Debug, Clone, PartialEq)]
pub struct Operands {
    lhs: Rc<Operation>,
    rhs: Rc<Operation>,
    input_count: usize,
}

impl Operands {
    fn new(lhs: Rc<Operation>, rhs: Rc<Operation>) -> Result<Self> {
        let input_count = lhs.input_count() + rhs.input_count();

        if input_count > MAX_INPUT_MATRICES {
            return Err(Error::TooManyInputs {
                count: input_count,
                max: MAX_INPUT_MATRICES,
            });
        }

        Ok(Self {
            lhs,
            rhs,
            input_count,
        })
    }

    pub fn lhs(&self) -> &Rc<Operation> {
        &self.lhs
    }

    pub fn rhs(&self) -> &Rc<Operation> {
        &self.rhs
    }

    fn split<'a, T>(&self, inputs: &'a [T]) -> (&'a [T], &'a [T]) {
        inputs.split_at(self.lhs.input_count())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Identity,
    Transpose,
    Scalar(i32),
    Add(Operands),
    Sub(Operands),
    Comp(Operands),
}

impl Operation {
    /// Creates a scalar multiplication, rejecting multipliers outside the element range.
    pub fn scalar(multiplier: i64) -> Result<Self> {
        check_value(multiplier, || "scalar".to_string()).map(Operation::Scalar)
    }

    pub fn add(lhs: Rc<Operation>, rhs: Rc<Operation>) -> Result<Self> {
        Operands::new(lhs, rhs).map(Operation::Add)
    }

    pub fn sub(lhs: Rc<Operation>, rhs: Rc<Operation>) -> Result<Self> {
        Operands::new(lhs, rhs).map(Operation::Sub)
    }

    /// `comp(lhs, rhs)` applies `rhs` first and feeds its result to `lhs`.
    pub fn comp(lhs: Rc<Operation>, rhs: Rc<Operation>) -> Result<Self> {
        Operands::new(lhs, rhs).map(Operation::Comp)
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Identity => OperationKind::Identity,
            Operation::Transpose => OperationKind::Transpose,
            Operation::Scalar(_) => OperationKind::Scalar,
            Operation::Add(_) => OperationKind::Add,
            Operation::Sub(_) => OperationKind::Sub,
            Operation::Comp(_) => OperationKind::Comp,
        }
    }

    pub fn operands(&self) -> Option<&Operands> {
        match self {
            Operation::Add(operands) | Operation::Sub(operands) | Operation::Comp(operands) => {
                Some(operands)
            }
            Operation::Identity | Operation::Transpose | Operation::Scalar(_) => None,
        }
    }

    /// Returns `true` if `other` is reachable through this operation's operands.
    pub fn depends_on(&self, other: &Rc<Operation>) -> bool {
        self.operands().is_some_and(|operands| {
            [operands.lhs(), operands.rhs()]
                .into_iter()
                .any(|operand| Rc::ptr_eq(operand, other) || operand.depends_on(other))
        })
    }

    /// Number of user supplied matrices one evaluation consumes.
    ///
    /// Leaves take one. Composites take the inputs of the left operand
    /// followed by the inputs of the right operand.
    pub fn input_count(&self) -> usize {
        self.operands()
            .map(|operands| operands.input_count)
            .unwrap_or(1)
    }

    /// Evaluates the operation, consuming `inputs` positionally.
    pub fn compute(&self, inputs: &[Matrix]) -> Result<Matrix> {
        self.check_input_count(inputs.len())?;
        self.apply(inputs)
    }

    fn apply(&self, inputs: &[Matrix]) -> Result<Matrix> {
        match self {
            Operation::Identity => Ok(inputs[0].clone()),
            Operation::Transpose => Ok(inputs[0].transpose()),
            Operation::Scalar(k) => inputs[0].scale(*k),
            Operation::Add(operands) => {
                let (lhs, rhs) = operands.split(inputs);
                operands.lhs.apply(lhs)?.add(&operands.rhs.apply(rhs)?)
            }
            Operation::Sub(operands) => {
                let (lhs, rhs) = operands.split(inputs);
                operands.lhs.apply(lhs)?.sub(&operands.rhs.apply(rhs)?)
            }
            Operation::Comp(operands) => {
                let (lhs, rhs) = operands.split(inputs);
                let mut lhs = lhs.to_vec();
                lhs[0] = operands.rhs.apply(rhs)?;
                operands.lhs.apply(&lhs)
            }
        }
    }

    /// The listing label, with inputs named `A`, `B`, ... in consumption order.
    pub fn formula(&self) -> String {
        let labels = (0..self.input_count())
            .map(|i| char::from(b'A' + i as u8).to_string())
            .collect::<Vec<_>>();

        self.render(&labels)
    }

    /// The formula with the actual input matrices substituted, for evaluation traces.
    pub fn trace(&self, inputs: &[Matrix]) -> Result<String> {
        self.check_input_count(inputs.len())?;
        let labels = inputs.iter().map(Matrix::inline).collect::<Vec<_>>();

        Ok(self.render(&labels))
    }

    fn render(&self, labels: &[String]) -> String {
        match self {
            Operation::Identity => labels[0].clone(),
            Operation::Transpose => format!("{}^T", group(&labels[0])),
            Operation::Scalar(k) => format!("{} * {}", k, group(&labels[0])),
            Operation::Add(operands) => {
                let (lhs, rhs) = operands.split(labels);
                format!(
                    "{} + {}",
                    group(&operands.lhs.render(lhs)),
                    group(&operands.rhs.render(rhs))
                )
            }
            Operation::Sub(operands) => {
                let (lhs, rhs) = operands.split(labels);
                format!(
                    "{} - {}",
                    group(&operands.lhs.render(lhs)),
                    group(&operands.rhs.render(rhs))
                )
            }
            Operation::Comp(operands) => {
                let (lhs, rhs) = operands.split(labels);
                let mut lhs = lhs.to_vec();
                lhs[0] = operands.rhs.render(rhs);
                operands.lhs.render(&lhs)
            }
        }
    }

    fn check_input_count(&self, got: usize) -> Result<()> {
        let expected = self.input_count();

        if got != expected {
            return Err(Error::MatrixCount { expected, got });
        }

        Ok(())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.formula())
    }
}

fn group(label: &str) -> String {
    if label.contains(' ') {
        format!("({})", label)
    } else {
        label.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn matrix(rows: Vec<Vec<i32>>) -> Matrix {
        Matrix::from_rows(rows).unwrap()
    }

    fn leaf(op: Operation) -> Rc<Operation> {
        Rc::new(op)
    }

    #[rstest]
    #[case::iden("iden", OperationKind::Identity)]
    #[case::tran("tran", OperationKind::Transpose)]
    #[case::scal("scal", OperationKind::Scalar)]
    #[case::add("add", OperationKind::Add)]
    #[case::sub("sub", OperationKind::Sub)]
    #[case::comp("comp", OperationKind::Comp)]
    fn test_kind_round_trips_through_its_verb(#[case] verb: &str, #[case] kind: OperationKind) {
        assert_eq!(verb.parse::<OperationKind>().unwrap(), kind);
        assert_eq!(kind.to_string(), verb);
    }

    #[rstest]
    #[case::in_range(-1024, Ok(Operation::Scalar(-1024)))]
    #[case::too_large(2000, Err(Error::ValueOutOfRange { value: 2000, unit: "scalar".to_string() }))]
    #[case::too_small(-1025, Err(Error::ValueOutOfRange { value: -1025, unit: "scalar".to_string() }))]
    fn test_scalar_range(#[case] k: i64, #[case] expected: Result<Operation>) {
        assert_eq!(Operation::scalar(k), expected);
    }

    #[test]
    fn test_leaf_compute() {
        let m = matrix(vec![vec![1, 2], vec![3, 4]]);

        assert_eq!(Operation::Identity.compute(std::slice::from_ref(&m)), Ok(m.clone()));
        assert_eq!(
            Operation::Transpose.compute(std::slice::from_ref(&m)),
            Ok(matrix(vec![vec![1, 3], vec![2, 4]]))
        );
        assert_eq!(
            Operation::Scalar(2).compute(std::slice::from_ref(&m)),
            Ok(matrix(vec![vec![2, 4], vec![6, 8]]))
        );
    }

    #[test]
    fn test_compute_rejects_wrong_number_of_matrices() {
        let m = Matrix::new(2).unwrap();
        assert_eq!(
            Operation::Identity.compute(&[m.clone(), m]),
            Err(Error::MatrixCount {
                expected: 1,
                got: 2
            })
        );
    }

    #[test]
    fn test_add_of_identity_and_transpose() {
        let add = Operation::add(leaf(Operation::Identity), leaf(Operation::Transpose)).unwrap();
        let inputs = [
            matrix(vec![vec![1, 2], vec![3, 4]]),
            matrix(vec![vec![5, 6], vec![7, 8]]),
        ];

        assert_eq!(add.input_count(), 2);
        assert_eq!(
            add.compute(&inputs),
            Ok(matrix(vec![vec![6, 9], vec![9, 12]]))
        );
    }

    #[test]
    fn test_sub_overflow_aborts_evaluation() {
        let sub = Operation::sub(leaf(Operation::Identity), leaf(Operation::Identity)).unwrap();
        let inputs = [
            matrix(vec![vec![-1000]]),
            matrix(vec![vec![1000]]),
        ];

        assert_eq!(
            sub.compute(&inputs),
            Err(Error::ValueOutOfRange {
                value: -2000,
                unit: "matrix cell (0, 0)".to_string()
            })
        );
    }

    #[test]
    fn test_comp_applies_rhs_first() {
        let comp = Operation::comp(leaf(Operation::Scalar(2)), leaf(Operation::Transpose)).unwrap();
        let x = matrix(vec![vec![9, 9], vec![9, 9]]);
        let y = matrix(vec![vec![1, 2], vec![3, 4]]);

        assert_eq!(comp.input_count(), 2);
        assert_eq!(
            comp.compute(&[x, y.clone()]),
            Operation::Scalar(2).compute(&[Operation::Transpose.compute(&[y]).unwrap()])
        );
    }

    #[test]
    fn test_nested_composites_consume_inputs_left_to_right() {
        let inner = leaf(Operation::add(leaf(Operation::Identity), leaf(Operation::Scalar(10))).unwrap());
        let outer = Operation::sub(Rc::clone(&inner), leaf(Operation::Transpose)).unwrap();
        let inputs = [
            matrix(vec![vec![1, 2], vec![3, 4]]),
            matrix(vec![vec![1, 0], vec![0, 1]]),
            matrix(vec![vec![0, 1], vec![0, 0]]),
        ];

        assert_eq!(outer.input_count(), 3);
        assert_eq!(
            outer.compute(&inputs),
            Ok(matrix(vec![vec![11, 2], vec![2, 14]]))
        );
    }

    #[test]
    fn test_input_count_limit() {
        let mut op = leaf(Operation::Identity);
        for _ in 0..4 {
            op = leaf(Operation::add(Rc::clone(&op), Rc::clone(&op)).unwrap());
        }
        assert_eq!(op.input_count(), 16);

        assert_eq!(
            Operation::add(Rc::clone(&op), Rc::clone(&op)),
            Err(Error::TooManyInputs {
                count: 32,
                max: MAX_INPUT_MATRICES
            })
        );
    }

    #[rstest]
    #[case::identity(Operation::Identity, "A")]
    #[case::transpose(Operation::Transpose, "A^T")]
    #[case::scalar(Operation::Scalar(-3), "-3 * A")]
    #[case::add(Operation::add(leaf(Operation::Identity), leaf(Operation::Transpose)).unwrap(), "A + B^T")]
    #[case::sub_of_scalar(Operation::sub(leaf(Operation::Scalar(2)), leaf(Operation::Identity)).unwrap(), "(2 * A) - B")]
    #[case::comp(Operation::comp(leaf(Operation::Transpose), leaf(Operation::Scalar(2))).unwrap(), "(2 * B)^T")]
    #[case::nested(
        Operation::sub(
            leaf(Operation::Identity),
            leaf(Operation::add(leaf(Operation::Identity), leaf(Operation::Identity)).unwrap())
        ).unwrap(),
        "A - (B + C)"
    )]
    fn test_formula(#[case] op: Operation, #[case] expected: &str) {
        assert_eq!(op.formula(), expected);
    }

    #[test]
    fn test_trace_substitutes_matrices() {
        let add = Operation::add(leaf(Operation::Identity), leaf(Operation::Transpose)).unwrap();
        let inputs = [
            matrix(vec![vec![1, 2], vec![3, 4]]),
            matrix(vec![vec![5, 6], vec![7, 8]]),
        ];

        assert_eq!(
            add.trace(&inputs),
            Ok("[[1,2],[3,4]] + [[5,6],[7,8]]^T".to_string())
        );
    }

    #[test]
    fn test_depends_on() {
        let id = leaf(Operation::Identity);
        let tr = leaf(Operation::Transpose);
        let add = leaf(Operation::add(Rc::clone(&id), Rc::clone(&id)).unwrap());
        let comp = Operation::comp(Rc::clone(&add), Rc::clone(&id)).unwrap();

        assert!(comp.depends_on(&id));
        assert!(comp.depends_on(&add));
        assert!(!comp.depends_on(&tr));
        assert!(!Operation::Identity.depends_on(&id));
    }
}
