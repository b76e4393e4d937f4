//! Dense square matrix multiplication, five ways, measured.
//!
//! Every kernel computes the same C = A × B for `n × n` matrices of `f64`
//! with fixed operands (A all ones, row `i` of B equal to `i + 1`), so each
//! element of C is `n(n+1)/2`. What differs is the memory-access order:
//!
//! - **Naive** i-j-k: dot product in the inner loop, strides down B.
//! - **Line** i-k-j: streams rows of B and C.
//! - **Block**: line order tiled for cache.
//! - **Line parallel rows / cols**: line order on a rayon pool, split over
//!   rows of C or over the columns of each row update.
//!
//! Calls are wrapped in a [`counters::Session`] that reads L1 and L2
//! data-cache misses from hardware counters around the kernel.
//!
//! ## Usage
//!
//! ```
//! use matprod::Kernel;
//!
//! let product = Kernel::Block { block_size: 2 }.run(4, 4).unwrap();
//! assert!(product.matrix.as_slice().iter().all(|&x| x == 10.0));
//! ```

pub mod blocked;
pub mod counters;
pub mod error;
pub mod kernels;
pub mod matrix;
pub mod report;
pub mod sweep;
pub mod threaded;

pub use error::{CounterError, MatmulError, Severity, SweepError};
pub use kernels::{Kernel, Product};
pub use matrix::Matrix;
