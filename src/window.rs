//! Zero-copy sliding windows over an elevation grid.
//!
//! Only "valid" windows are produced: every window lies fully inside the
//! grid, so centres run over rows `r..n_rows-r` and columns `r..n_cols-r`.
//! Windows borrow the grid; nothing is copied.

use ndarray::iter::Windows;
use ndarray::{s, ArrayView2, Ix2};

use crate::error::{Result, ShelterError};

#[derive(Debug, Clone, Copy)]
pub struct WindowGrid<'a> {
    grid: ArrayView2<'a, f64>,
    radius: usize,
    rows: usize,
    cols: usize,
}

impl<'a> WindowGrid<'a> {
    /// Check once that at least one full window fits.
    pub fn new(grid: ArrayView2<'a, f64>, radius: usize) -> Result<Self> {
        let (n_rows, n_cols) = grid.dim();
        let side = 2 * radius + 1;
        if n_rows < side || n_cols < side {
            return Err(ShelterError::InputTooSmall {
                rows: n_rows,
                cols: n_cols,
                side,
            });
        }
        Ok(Self {
            grid,
            radius,
            rows: n_rows - 2 * radius,
            cols: n_cols - 2 * radius,
        })
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn side(&self) -> usize {
        2 * self.radius + 1
    }

    /// Number of valid centres as `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Window for interior position `(row, col)`, i.e. centred on grid cell
    /// `(row + r, col + r)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> ArrayView2<'a, f64> {
        debug_assert!(row < self.rows && col < self.cols);
        let side = self.side();
        self.grid.slice_move(s![row..row + side, col..col + side])
    }

    /// Lazy row-major sequence of every valid window. Can be called again
    /// for an identical pass.
    pub fn iter(&self) -> Windows<'_, f64, Ix2> {
        let side = self.side();
        self.grid.windows((side, side))
    }
}
