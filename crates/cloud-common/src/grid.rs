//! Row-major 2-D grid container.
//!
//! Every array that flows through the pipeline (brightness temperature,
//! geolocation, masks, labels) is a `Grid<T>`. Data is stored row 0 first,
//! so the flat index of `(row, col)` is `row * width + col`.

use thiserror::Error;

/// Returned when a flat buffer does not match the requested dimensions.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Grid shape mismatch: {len} values cannot form {height}x{width}")]
pub struct GridShapeError {
    pub len: usize,
    pub height: usize,
    pub width: usize,
}

/// A dense 2-D grid of values.
///
/// `len == height * width` holds for every grid; all constructors enforce it.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

impl<T> Grid<T> {
    /// Wrap an existing row-major buffer.
    pub fn from_vec(height: usize, width: usize, data: Vec<T>) -> Result<Self, GridShapeError> {
        if data.len() != height * width {
            return Err(GridShapeError {
                len: data.len(),
                height,
                width,
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build a grid by evaluating `f(row, col)` for every cell.
    pub fn from_fn(height: usize, width: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(height * width);
        for row in 0..height {
            for col in 0..width {
                data.push(f(row, col));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// `(height, width)`, matching the numpy convention used by the `.npy` artifacts.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True if `other` has identical dimensions.
    pub fn same_shape<U>(&self, other: &Grid<U>) -> bool {
        self.width == other.width && self.height == other.height
    }

    pub fn flat_index(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    /// Inverse of [`Grid::flat_index`].
    pub fn coords(&self, index: usize) -> (usize, usize) {
        (index / self.width, index % self.width)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.data.get(self.flat_index(row, col))
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Cell-wise conversion into a new grid of the same shape.
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Grid<U> {
        Grid {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(f).collect(),
        }
    }
}

impl<T: Clone> Grid<T> {
    /// A grid with every cell set to `value`.
    pub fn filled(height: usize, width: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; height * width],
        }
    }
}

impl Grid<bool> {
    /// Number of `true` cells.
    pub fn count_true(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }
}

impl Grid<u8> {
    /// Number of non-zero cells.
    pub fn count_nonzero(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }
}
