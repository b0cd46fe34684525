//! Bounded square integer matrices.
//!
//! Every element stored in or computed by a [`Matrix`] lies in
//! `MIN_ALLOWED_VALUE..=MAX_ALLOWED_VALUE`. Arithmetic never clamps: a result
//! cell outside the range fails the whole operation with
//! [`Error::ValueOutOfRange`] naming the offending cell.
use std::fmt;

use itertools::Itertools;

use crate::error::{Error, Result, parse_number};

pub const MAX_ALLOWED_VALUE: i32 = 1000;
pub const MIN_ALLOWED_VALUE: i32 = -1024;
pub const MIN_MATRIX_SIZE: usize = 1;
pub const MAX_MATRIX_SIZE: usize = 5;

/// Validates a requested matrix size.
pub fn check_size(size: i64) -> Result<usize> {
    if size < MIN_MATRIX_SIZE as i64 || size > MAX_MATRIX_SIZE as i64 {
        return Err(Error::MatrixSize(size));
    }

    Ok(size as usize)
}

/// Validates a single value against the allowed element range.
///
/// `unit` is only evaluated on failure and names what overflowed.
pub fn check_value(value: i64, unit: impl FnOnce() -> String) -> Result<i32> {
    if value < MIN_ALLOWED_VALUE as i64 || value > MAX_ALLOWED_VALUE as i64 {
        return Err(Error::ValueOutOfRange {
            value,
            unit: unit(),
        });
    }

    Ok(value as i32)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    size: usize,
    cells: Vec<i32>,
}

impl Matrix {
    /// Creates a zero-filled `size x size` matrix.
    pub fn new(size: usize) -> Result<Self> {
        let size = check_size(size as i64)?;

        Ok(Self {
            size,
            cells: vec![0; size * size],
        })
    }

    /// Builds a matrix from row-major `cells`, validating the size and every value.
    pub fn from_cells(size: usize, cells: Vec<i32>) -> Result<Self> {
        let size = check_size(size as i64)?;

        if cells.len() != size * size {
            return Err(Error::ValueCount {
                expected: size * size,
                got: cells.len(),
            });
        }

        for (i, value) in cells.iter().enumerate() {
            check_value(*value as i64, || cell_unit(i / size, i % size))?;
        }

        Ok(Self { size, cells })
    }

    pub fn from_rows(rows: Vec<Vec<i32>>) -> Result<Self> {
        let size = rows.len();

        if let Some(row) = rows.iter().find(|row| row.len() != size) {
            return Err(Error::Shape {
                expected: size,
                got: format!("a row of {} values", row.len()),
            });
        }

        Self::from_cells(size, rows.into_iter().flatten().collect())
    }

    /// Parses whitespace separated integers into a `size x size` matrix.
    pub fn parse(size: usize, text: &str) -> Result<Self> {
        let size = check_size(size as i64)?;
        let tokens = text.split_whitespace().collect_vec();

        if tokens.len() != size * size {
            return Err(Error::ValueCount {
                expected: size * size,
                got: tokens.len(),
            });
        }

        let cells = tokens
            .iter()
            .enumerate()
            .map(|(i, token)| Self::parse_cell(token, i / size, i % size))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { size, cells })
    }

    /// Parses one element token destined for `(row, col)`.
    pub fn parse_cell(token: &str, row: usize, col: usize) -> Result<i32> {
        check_value(parse_number(token)?, || cell_unit(row, col))
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, row: usize, col: usize) -> Result<i32> {
        self.offset(row, col).map(|i| self.cells[i])
    }

    pub fn set(&mut self, row: usize, col: usize, value: i32) -> Result<()> {
        let i = self.offset(row, col)?;
        self.cells[i] = check_value(value as i64, || cell_unit(row, col))?;
        Ok(())
    }

    pub fn rows(&self) -> impl Iterator<Item = &[i32]> {
        self.cells.chunks(self.size)
    }

    pub fn add(&self, rhs: &Matrix) -> Result<Matrix> {
        self.zip_with(rhs, |a, b| a + b)
    }

    pub fn sub(&self, rhs: &Matrix) -> Result<Matrix> {
        self.zip_with(rhs, |a, b| a - b)
    }

    pub fn scale(&self, scalar: i32) -> Result<Matrix> {
        self.map_cells(|value| value * scalar as i64)
    }

    pub fn transpose(&self) -> Matrix {
        let n = self.size;
        let cells = (0..n * n).map(|i| self.cells[(i % n) * n + i / n]).collect();

        Matrix { size: n, cells }
    }

    /// Single-line rendering used inside formulas, e.g. `[[1,2],[3,4]]`.
    pub fn inline(&self) -> String {
        format!(
            "[{}]",
            self.rows()
                .map(|row| format!("[{}]", row.iter().join(",")))
                .join(",")
        )
    }

    fn offset(&self, row: usize, col: usize) -> Result<usize> {
        if row >= self.size || col >= self.size {
            return Err(Error::CellIndex {
                row,
                col,
                size: self.size,
            });
        }

        Ok(row * self.size + col)
    }

    fn map_cells(&self, f: impl Fn(i64) -> i64) -> Result<Matrix> {
        let cells = self
            .cells
            .iter()
            .enumerate()
            .map(|(i, value)| {
                check_value(f(*value as i64), || {
                    cell_unit(i / self.size, i % self.size)
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Matrix {
            size: self.size,
            cells,
        })
    }

    fn zip_with(&self, rhs: &Matrix, f: impl Fn(i64, i64) -> i64) -> Result<Matrix> {
        if self.size != rhs.size {
            return Err(Error::Shape {
                expected: self.size,
                got: format!("{0}x{0}", rhs.size),
            });
        }

        let cells = self
            .cells
            .iter()
            .zip(rhs.cells.iter())
            .enumerate()
            .map(|(i, (a, b))| {
                check_value(f(*a as i64, *b as i64), || {
                    cell_unit(i / self.size, i % self.size)
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Matrix {
            size: self.size,
            cells,
        })
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            writeln!(f, "{}", row.iter().join(" "))?;
        }
        Ok(())
    }
}

fn cell_unit(row: usize, col: usize) -> String {
    format!("matrix cell ({}, {})", row, col)
}
