//! Dense row-major `f32` matrix used by every pipeline stage.

use crate::error::{FeatureError, Result};

/// Shape descriptor returned by the size calculators before allocation.
///
/// # Example
/// ```
/// use mf_core::matrix::{MatSize, Matrix};
/// let size = MatSize { rows: 50, cols: 13 };
/// let mat = Matrix::with_size(size).unwrap();
/// assert_eq!(mat.size(), size);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatSize {
    pub rows: usize,
    pub cols: usize,
}

impl MatSize {
    /// `true` if either dimension is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }
}

impl std::fmt::Display for MatSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// Row-major `rows × cols` buffer of `f32`, zero-initialized on creation.
///
/// The buffer is never resized; `reshape` only reinterprets the dimensions.
///
/// # Example
/// ```
/// use mf_core::matrix::Matrix;
/// let mut mat = Matrix::new(2, 3).unwrap();
/// mat.set(1, 2, 4.0);
/// assert_eq!(mat.get(1, 2), 4.0);
/// assert_eq!(mat.as_slice().len(), 6);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Matrix {
    /// Allocate a zeroed matrix.
    ///
    /// # Errors
    /// `InvalidArgument` if a dimension is zero, `NoMemory` if the buffer
    /// cannot be reserved.
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            log::error!("Refusing to create a {rows}x{cols} matrix");
            return Err(FeatureError::invalid(format!(
                "matrix dimensions must be non-zero, got {rows}x{cols}"
            )));
        }
        let len = rows.checked_mul(cols).ok_or_else(|| {
            FeatureError::NoMemory(format!("{rows}x{cols} overflows the address space"))
        })?;
        let data = zeroed_buffer(len)?;
        Ok(Self { rows, cols, data })
    }

    /// Allocate a zeroed matrix of the given shape.
    ///
    /// # Errors
    /// Same as [`Matrix::new`].
    pub fn with_size(size: MatSize) -> Result<Self> {
        Self::new(size.rows, size.cols)
    }

    /// Wrap an existing buffer.
    ///
    /// # Errors
    /// `InvalidArgument` if a dimension is zero or `data.len() != rows * cols`.
    ///
    /// # Example
    /// ```
    /// use mf_core::matrix::Matrix;
    /// let mat = Matrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    /// assert_eq!(mat.row(1), &[3.0, 4.0]);
    /// assert!(Matrix::from_vec(2, 2, vec![1.0]).is_err());
    /// ```
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        if rows == 0 || cols == 0 || Some(data.len()) != rows.checked_mul(cols) {
            return Err(FeatureError::invalid(format!(
                "{} elements cannot form a {rows}x{cols} matrix",
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[must_use]
    pub fn size(&self) -> MatSize {
        MatSize {
            rows: self.rows,
            cols: self.cols,
        }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Borrow row `r`.
    ///
    /// # Panics
    /// Panics if `r >= rows`.
    #[inline]
    #[must_use]
    pub fn row(&self, r: usize) -> &[f32] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Mutably borrow row `r`.
    ///
    /// # Panics
    /// Panics if `r >= rows`.
    #[inline]
    pub fn row_mut(&mut self, r: usize) -> &mut [f32] {
        let cols = self.cols;
        &mut self.data[r * cols..(r + 1) * cols]
    }

    /// Iterate over rows.
    pub fn rows_iter(&self) -> std::slice::ChunksExact<'_, f32> {
        self.data.chunks_exact(self.cols)
    }

    /// Iterate mutably over rows.
    pub fn rows_iter_mut(&mut self) -> std::slice::ChunksExactMut<'_, f32> {
        self.data.chunks_exact_mut(self.cols)
    }

    /// # Panics
    /// Panics if the position is out of bounds.
    #[inline]
    #[must_use]
    pub fn get(&self, r: usize, c: usize) -> f32 {
        debug_assert!(c < self.cols);
        self.data[r * self.cols + c]
    }

    /// # Panics
    /// Panics if the position is out of bounds.
    #[inline]
    pub fn set(&mut self, r: usize, c: usize, value: f32) {
        debug_assert!(c < self.cols);
        self.data[r * self.cols + c] = value;
    }

    /// Reset every element to zero.
    pub fn fill_zero(&mut self) {
        self.data.fill(0.0);
    }

    /// Reinterpret the buffer with new dimensions, without moving any element.
    ///
    /// # Errors
    /// `InvalidArgument` if `rows * cols` differs from the current element count.
    ///
    /// # Example
    /// ```
    /// use mf_core::matrix::Matrix;
    /// let mut mat = Matrix::new(32, 129).unwrap();
    /// mat.reshape(129, 32).unwrap();
    /// assert_eq!((mat.rows(), mat.cols()), (129, 32));
    /// ```
    pub fn reshape(&mut self, rows: usize, cols: usize) -> Result<()> {
        if rows == 0 || cols == 0 || Some(self.data.len()) != rows.checked_mul(cols) {
            return Err(FeatureError::invalid(format!(
                "cannot reshape {} into {rows}x{cols}",
                self.size()
            )));
        }
        self.rows = rows;
        self.cols = cols;
        Ok(())
    }
}

/// Reserve a zeroed `f32` buffer, reporting allocation failure instead of aborting.
///
/// # Errors
/// `NoMemory` if the allocator refuses the request.
pub fn zeroed_buffer(len: usize) -> Result<Vec<f32>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len).map_err(|e| {
        log::error!("Alloc buffer of {len} floats failed: {e}");
        FeatureError::NoMemory(format!("{len} floats: {e}"))
    })?;
    data.resize(len, 0.0);
    Ok(data)
}
