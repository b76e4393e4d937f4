//! The five kernels under test, behind one entry point.
//!
//! [`Kernel::run`] validates the dimensions, allocates and initializes
//! fresh operands, times only the multiply itself, and hands back the
//! result matrix. A and B are released when `run` returns, C travels out
//! in the [`Product`].

use crate::blocked::tiled::matmul_blocked;
use crate::error::MatmulError;
use crate::matrix::line_ikj::matmul_line;
use crate::matrix::naive_ijk::matmul_naive_ijk;
use crate::matrix::{Matrix, Operands, square_dim};
use crate::threaded::line_cols::matmul_line_cols;
use crate::threaded::line_rows::matmul_line_rows;
use crate::threaded::thread_pool;
use std::fmt;
use std::time::{Duration, Instant};

/// One multiplication strategy and its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    /// i-j-k, dot product in the inner loop.
    Naive,
    /// i-k-j, streaming row updates.
    Line,
    /// i-k-j tiled into `block_size` cubes.
    Block { block_size: usize },
    /// i-k-j with rows of C split across `threads` workers (0 = all cores).
    LineParallelRows { threads: usize },
    /// i-k-j with each row update's columns split across `threads` workers.
    LineParallelCols { threads: usize },
}

/// Output of one kernel call.
#[derive(Debug)]
pub struct Product {
    pub matrix: Matrix,
    /// Wall time of the multiply, excluding allocation and setup.
    pub elapsed: Duration,
}

impl Kernel {
    /// Menu labels in selection order, starting at 1.
    pub const MENU: [&'static str; 5] = [
        "Multiplication",
        "Line Multiplication",
        "Block Multiplication",
        "Line Multiplication (multi-core v1)",
        "Line Multiplication (multi-core v2)",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Kernel::Naive => "naive",
            Kernel::Line => "line",
            Kernel::Block { .. } => "block",
            Kernel::LineParallelRows { .. } => "line-parallel-rows",
            Kernel::LineParallelCols { .. } => "line-parallel-cols",
        }
    }

    /// Whether `selection` names one of the menu entries.
    pub fn is_selection(selection: u32) -> bool {
        (1..=Self::MENU.len() as u32).contains(&selection)
    }

    /// Whether selecting this kernel needs a block size from the user.
    pub fn needs_block_size(selection: u32) -> bool {
        selection == 3
    }

    /// Map a menu selection (1-5) to a kernel. Returns `None` for anything else.
    pub fn from_selection(selection: u32, block_size: usize, threads: usize) -> Option<Kernel> {
        match selection {
            1 => Some(Kernel::Naive),
            2 => Some(Kernel::Line),
            3 => Some(Kernel::Block { block_size }),
            4 => Some(Kernel::LineParallelRows { threads }),
            5 => Some(Kernel::LineParallelCols { threads }),
            _ => None,
        }
    }

    /// Compute C = A × B for the fixed operands.
    ///
    /// # Errors
    ///
    /// - [`MatmulError::InvalidDimension`] unless `m_ar == m_br > 0`
    /// - [`MatmulError::InvalidBlockSize`] for a zero block size
    /// - [`MatmulError::ThreadPool`] if a parallel kernel cannot start workers
    pub fn run(&self, m_ar: usize, m_br: usize) -> Result<Product, MatmulError> {
        let n = square_dim(m_ar, m_br)?;
        if let Kernel::Block { block_size: 0 } = self {
            return Err(MatmulError::InvalidBlockSize(0));
        }
        log::debug!("running {} kernel on {n}x{n}", self.name());

        let mut ops = Operands::new(n);
        let elapsed = match *self {
            Kernel::Naive => {
                let (a, b, c) = ops.split();
                timed(|| matmul_naive_ijk(a, b, c, n))
            }
            Kernel::Line => {
                ops.c.ensure_zeroed()?;
                let (a, b, c) = ops.split();
                timed(|| matmul_line(a, b, c, n))
            }
            Kernel::Block { block_size } => {
                let (a, b, c) = ops.split();
                timed(|| matmul_blocked(a, b, c, n, block_size))
            }
            Kernel::LineParallelRows { threads } => {
                ops.c.ensure_zeroed()?;
                let pool = thread_pool(threads)?;
                let (a, b, c) = ops.split();
                timed(|| matmul_line_rows(&pool, a, b, c, n))
            }
            Kernel::LineParallelCols { threads } => {
                ops.c.ensure_zeroed()?;
                let pool = thread_pool(threads)?;
                let (a, b, c) = ops.split();
                timed(|| matmul_line_cols(&pool, a, b, c, n))
            }
        };

        Ok(Product {
            matrix: ops.into_result(),
            elapsed,
        })
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kernel::Block { block_size } => write!(f, "{} (block {block_size})", self.name()),
            Kernel::LineParallelRows { threads } | Kernel::LineParallelCols { threads } => {
                write!(f, "{} ({threads} threads)", self.name())
            }
            _ => f.write_str(self.name()),
        }
    }
}

fn timed(f: impl FnOnce()) -> Duration {
    let start = Instant::now();
    f();
    start.elapsed()
}
