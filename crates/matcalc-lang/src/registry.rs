//! The ordered, capacity-bounded list of user addressable operations.
use std::rc::Rc;

use crate::{
    error::{Error, Result},
    operation::{Operation, OperationKind},
};

pub const MIN_OPERATIONS_LIMIT: usize = 2;
pub const MAX_OPERATIONS_LIMIT: usize = 100;

/// Validates a capacity bound for the registry.
pub fn check_max_operations(value: i64) -> Result<usize> {
    if value < MIN_OPERATIONS_LIMIT as i64 || value > MAX_OPERATIONS_LIMIT as i64 {
        return Err(Error::MaxOperations(value));
    }

    Ok(value as usize)
}

/// Outcome of [`Registry::resize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resize {
    /// The new bound is in effect.
    Applied(usize),
    /// The registry holds more operations than `target`; `excess` of them must
    /// be deleted (or the resize cancelled) before the bound changes.
    Pending { target: usize, excess: usize },
}

/// Index-addressed operation store.
///
/// Display indices are positions in insertion order, so deleting an entry
/// renumbers every later entry. Composites hold their operands by object and
/// keep computing the same thing across renumbering.
#[derive(Debug, Clone)]
pub struct Registry {
    operations: Vec<Rc<Operation>>,
    max_operations: usize,
    pending_shrink: Option<usize>,
}

impl Registry {
    /// Creates a registry seeded with Identity (index 0) and Transpose (index 1).
    pub fn new(max_operations: usize) -> Result<Self> {
        let max_operations = check_max_operations(max_operations as i64)?;

        Ok(Self {
            operations: vec![Rc::new(Operation::Identity), Rc::new(Operation::Transpose)],
            max_operations,
            pending_shrink: None,
        })
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn max_operations(&self) -> usize {
        self.max_operations
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.max_operations
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<Operation>> {
        self.operations.iter()
    }

    /// Resolves a user supplied index.
    pub fn get(&self, index: i64) -> Result<&Rc<Operation>> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.operations.get(i))
            .ok_or(Error::OperationIndex {
                index,
                len: self.len(),
            })
    }

    /// Creates an operation of `kind` from its integer arguments and appends it.
    ///
    /// Composites take two operand indices, `scal` takes its multiplier, leaves
    /// take nothing. Checks run in order: argument count, operand indices,
    /// capacity, operation construction. A failing call leaves the registry
    /// untouched.
    pub fn create(&mut self, kind: OperationKind, args: &[i64]) -> Result<usize> {
        if args.len() != kind.argument_count() {
            return Err(Error::Arguments {
                command: kind.to_string(),
                expected: kind.argument_count(),
                got: args.len(),
            });
        }

        if kind.is_composite() {
            self.get(args[0])?;
            self.get(args[1])?;
        }

        self.check_capacity()?;

        let operation = match kind {
            OperationKind::Identity => Operation::Identity,
            OperationKind::Transpose => Operation::Transpose,
            OperationKind::Scalar => Operation::scalar(args[0])?,
            OperationKind::Add => Operation::add(self.operand(args[0])?, self.operand(args[1])?)?,
            OperationKind::Sub => Operation::sub(self.operand(args[0])?, self.operand(args[1])?)?,
            OperationKind::Comp => Operation::comp(self.operand(args[0])?, self.operand(args[1])?)?,
        };

        self.operations.push(Rc::new(operation));
        let index = self.len() - 1;
        tracing::debug!(%kind, index, "created operation");

        Ok(index)
    }

    /// Removes the operation at `index`, shifting every later index down by one.
    ///
    /// While a shrink is pending, the new bound is applied as soon as the
    /// registry fits it.
    pub fn delete(&mut self, index: i64) -> Result<Rc<Operation>> {
        self.get(index)?;
        let removed = self.operations.remove(index as usize);
        tracing::debug!(index, len = self.len(), "deleted operation");

        if let Some(target) = self.pending_shrink
            && self.len() <= target
        {
            self.apply_max(target);
        }

        Ok(removed)
    }

    /// Indices of the operations that reference the one at `index` as an operand.
    pub fn dependents(&self, index: i64) -> Result<Vec<usize>> {
        let target = self.get(index)?;

        Ok(self
            .operations
            .iter()
            .enumerate()
            .filter(|(_, operation)| operation.depends_on(target))
            .map(|(i, _)| i)
            .collect())
    }

    /// Changes the capacity bound.
    ///
    /// Growing, or shrinking to a bound the registry already fits, applies
    /// immediately. Otherwise the shrink stays pending until enough
    /// [`Registry::delete`] calls bring the length down, or until
    /// [`Registry::cancel_resize`].
    pub fn resize(&mut self, new_max: i64) -> Result<Resize> {
        let target = check_max_operations(new_max)?;

        if target >= self.len() {
            self.apply_max(target);
            return Ok(Resize::Applied(target));
        }

        self.pending_shrink = Some(target);
        tracing::debug!(target, len = self.len(), "shrink pending");

        Ok(Resize::Pending {
            target,
            excess: self.len() - target,
        })
    }

    pub fn pending_shrink(&self) -> Option<usize> {
        self.pending_shrink
    }

    /// Number of deletions still needed to satisfy the pending shrink.
    pub fn shrink_excess(&self) -> Option<usize> {
        self.pending_shrink
            .map(|target| self.len().saturating_sub(target))
    }

    /// Abandons a pending shrink; the bound stays what it was.
    pub fn cancel_resize(&mut self) {
        if let Some(target) = self.pending_shrink.take() {
            tracing::debug!(target, "shrink cancelled");
        }
    }

    /// Applies the pending shrink, failing if the registry still holds too many operations.
    pub fn commit_resize(&mut self) -> Result<usize> {
        match self.pending_shrink {
            Some(target) if self.len() > target => Err(Error::InsufficientShrink {
                len: self.len(),
                target,
            }),
            Some(target) => {
                self.apply_max(target);
                Ok(target)
            }
            None => Ok(self.max_operations),
        }
    }

    fn operand(&self, index: i64) -> Result<Rc<Operation>> {
        self.get(index).map(Rc::clone)
    }

    fn check_capacity(&self) -> Result<()> {
        if let Some(target) = self.pending_shrink {
            return Err(Error::ShrinkPending { target });
        }

        if self.is_full() {
            return Err(Error::CapacityExceeded {
                max: self.max_operations,
            });
        }

        Ok(())
    }

    fn apply_max(&mut self, max_operations: usize) {
        self.max_operations = max_operations;
        self.pending_shrink = None;
        tracing::debug!(max_operations, "capacity changed");
    }
}
