//! Square row-major matrix buffers and the serial loop-order kernels.
//!
//! Every kernel call owns three fresh buffers: A filled with 1.0, B whose
//! row `i` holds `i + 1`, and a zeroed C. They are dropped when the call
//! returns, so nothing leaks from one measurement into the next.

pub mod line_ikj;
pub mod naive_ijk;

use crate::error::MatmulError;

/// Flat `n × n` matrix of `f64`, row-major with stride `n`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    data: Vec<f64>,
    n: usize,
}

impl Matrix {
    pub fn zeros(n: usize) -> Self {
        Self::filled(n, 0.0)
    }

    pub fn filled(n: usize, value: f64) -> Self {
        Self {
            data: vec![value; n * n],
            n,
        }
    }

    /// Row `i` holds the constant `i + 1`.
    pub fn row_indexed(n: usize) -> Self {
        let data = (0..n)
            .flat_map(|i| std::iter::repeat_n((i + 1) as f64, n))
            .collect();
        Self { data, n }
    }

    /// Row length, which is also the number of rows.
    pub fn dim(&self) -> usize {
        self.n
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.n + j]
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n..(i + 1) * self.n]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Fails with [`MatmulError::DirtyAccumulator`] unless every element is 0.0.
    pub fn ensure_zeroed(&self) -> Result<(), MatmulError> {
        if self.data.iter().all(|&x| x == 0.0) {
            Ok(())
        } else {
            Err(MatmulError::DirtyAccumulator)
        }
    }
}

/// The three buffers of one kernel call.
#[derive(Debug)]
pub struct Operands {
    pub a: Matrix,
    pub b: Matrix,
    pub c: Matrix,
}

impl Operands {
    /// Allocate and initialize A, B and C for an `n × n` product.
    pub fn new(n: usize) -> Self {
        Self {
            a: Matrix::filled(n, 1.0),
            b: Matrix::row_indexed(n),
            c: Matrix::zeros(n),
        }
    }

    /// Split into the read-only operands and the writable result.
    pub fn split(&mut self) -> (&[f64], &[f64], &mut [f64]) {
        (self.a.as_slice(), self.b.as_slice(), self.c.as_mut_slice())
    }

    pub fn into_result(self) -> Matrix {
        self.c
    }
}

/// Resolve the `(m_ar, m_br)` pair to a single square dimension.
///
/// All three matrices share one stride, so the pair must agree. Zero is
/// rejected, and so is any size whose `n × n` buffer of `f64` would exceed
/// the `isize::MAX` bytes a single allocation may span.
pub fn square_dim(m_ar: usize, m_br: usize) -> Result<usize, MatmulError> {
    let addressable = m_ar
        .checked_mul(m_ar)
        .and_then(|elems| elems.checked_mul(std::mem::size_of::<f64>()))
        .is_some_and(|bytes| bytes <= isize::MAX as usize);
    if m_ar == 0 || m_ar != m_br || !addressable {
        return Err(MatmulError::InvalidDimension { m_ar, m_br });
    }
    Ok(m_ar)
}

/// Value every element of C takes for the fixed operands: `n(n+1)/2`.
pub fn expected_element(n: usize) -> f64 {
    (n * (n + 1) / 2) as f64
}
