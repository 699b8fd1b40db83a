//! Fixed-dimension symbol grid

use serde::{Deserialize, Serialize};

use super::symbol::Symbol;

/// A cell coordinate, row-major from the top-left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Grid dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    pub rows: usize,
    pub cols: usize,
}

impl GridSize {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn cells(&self) -> usize {
        self.rows * self.cols
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }
}

impl std::fmt::Display for GridSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    #[error("Grid has no rows")]
    Empty,

    #[error("Row {row} has {found} columns, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Grid is {found}, expected {expected}")]
    WrongSize { expected: GridSize, found: GridSize },
}

/// Rectangular symbol grid, stored row-major
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<Symbol>>", into = "Vec<Vec<Symbol>>")]
pub struct Grid {
    size: GridSize,
    cells: Vec<Symbol>,
}

impl Grid {
    /// Grid filled with the placeholder symbol
    pub fn placeholder(size: GridSize) -> Self {
        Self {
            size,
            cells: vec![Symbol::Empty; size.cells()],
        }
    }

    /// Build from rows; every row must have the same length
    pub fn from_rows(rows: Vec<Vec<Symbol>>) -> Result<Self, GridError> {
        let expected = rows.first().map(Vec::len).ok_or(GridError::Empty)?;
        if expected == 0 {
            return Err(GridError::Empty);
        }

        let mut cells = Vec::with_capacity(rows.len() * expected);
        for (row, symbols) in rows.iter().enumerate() {
            if symbols.len() != expected {
                return Err(GridError::Ragged {
                    row,
                    expected,
                    found: symbols.len(),
                });
            }
            cells.extend_from_slice(symbols);
        }

        Ok(Self {
            size: GridSize::new(rows.len(), expected),
            cells,
        })
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    pub fn rows(&self) -> usize {
        self.size.rows
    }

    pub fn cols(&self) -> usize {
        self.size.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Symbol> {
        if self.size.contains(Position::new(row, col)) {
            self.cells.get(row * self.size.cols + col).copied()
        } else {
            None
        }
    }

    /// Iterate rows top to bottom
    pub fn iter_rows(&self) -> impl Iterator<Item = &[Symbol]> {
        self.cells.chunks(self.size.cols.max(1))
    }

    /// Ensure this grid has the expected dimensions
    pub fn check_size(&self, expected: GridSize) -> Result<(), GridError> {
        if self.size == expected {
            Ok(())
        } else {
            Err(GridError::WrongSize {
                expected,
                found: self.size,
            })
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.cells.iter().all(Symbol::is_placeholder)
    }

    pub fn count(&self, symbol: Symbol) -> usize {
        self.cells.iter().filter(|s| **s == symbol).count()
    }
}

impl TryFrom<Vec<Vec<Symbol>>> for Grid {
    type Error = GridError;

    fn try_from(rows: Vec<Vec<Symbol>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<Grid> for Vec<Vec<Symbol>> {
    fn from(grid: Grid) -> Self {
        grid.iter_rows().map(<[Symbol]>::to_vec).collect()
    }
}

impl std::fmt::Display for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.iter_rows() {
            let line: Vec<&str> = row.iter().map(Symbol::as_str).collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}
